use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ghidra_bridge::executor::{DEFAULT_PRIMARY_URL, DEFAULT_SECONDARY_URL, ExecutorConfig};
use ghidra_bridge::llm::{DEFAULT_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_TEMPERATURE, OllamaConfig, PhaseModelConfig};
use ghidra_bridge::orchestrator::{OrchestratorConfig, PhaseKind};
use ghidra_bridge::registry::ToolRegistry;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub ollama: OllamaSection,
    pub ghidra: GhidraSection,
    pub orchestrator: OrchestratorSection,
    /// TOML tool catalogue replacing the built-in one
    pub registry_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaSection {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Phase name -> model, e.g. `analysis: qwen2.5-coder`
    pub phase_models: HashMap<String, String>,
}

impl Default for OllamaSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 120,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            phase_models: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GhidraSection {
    pub primary_url: String,
    pub secondary_url: Option<String>,
    pub timeout_secs: u64,
    pub mock_mode: bool,
}

impl Default for GhidraSection {
    fn default() -> Self {
        Self {
            primary_url: DEFAULT_PRIMARY_URL.to_string(),
            secondary_url: Some(DEFAULT_SECONDARY_URL.to_string()),
            timeout_secs: 30,
            mock_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSection {
    pub max_iterations: usize,
    pub enable_review: bool,
    pub enable_verification: bool,
    pub enable_learning: bool,
    pub prompt_budget_tokens: usize,
    pub backend_attempts: u32,
    pub retry_backoff_ms: u64,
    pub share_capabilities: bool,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        let defaults = OrchestratorConfig::default();
        Self {
            max_iterations: defaults.max_iterations,
            enable_review: defaults.enable_review,
            enable_verification: defaults.enable_verification,
            enable_learning: defaults.enable_learning,
            prompt_budget_tokens: defaults.prompt_budget_tokens,
            backend_attempts: defaults.backend_attempts,
            retry_backoff_ms: defaults.retry_backoff.as_millis() as u64,
            share_capabilities: defaults.share_capabilities,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            ollama: OllamaSection::default(),
            ghidra: GhidraSection::default(),
            orchestrator: OrchestratorSection::default(),
            registry_path: None,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Option<T> {
    match value.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            log::warn!("Ignoring {}={}: not a number", name, value);
            None
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply environment overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Apply environment overrides from `lookup`
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("OLLAMA_URL") {
            self.ollama.base_url = url;
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            self.ollama.model = model;
        }
        if let Some(secs) = lookup("OLLAMA_TIMEOUT").and_then(|v| parse_number("OLLAMA_TIMEOUT", &v)) {
            self.ollama.timeout_secs = secs;
        }
        if let Some(url) = lookup("GHIDRA_MCP_URL") {
            self.ghidra.primary_url = url;
        }
        if let Some(url) = lookup("GHIDRA_MCP_FALLBACK_URL") {
            // Empty disables the secondary endpoint
            self.ghidra.secondary_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Some(secs) = lookup("GHIDRA_MCP_TIMEOUT").and_then(|v| parse_number("GHIDRA_MCP_TIMEOUT", &v)) {
            self.ghidra.timeout_secs = secs;
        }
        if let Some(mock) = lookup("GHIDRA_MOCK_MODE") {
            self.ghidra.mock_mode = parse_flag(&mock);
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = Some(level);
        }
        if let Some(n) = lookup("MAX_ITERATIONS").and_then(|v| parse_number("MAX_ITERATIONS", &v)) {
            self.orchestrator.max_iterations = n;
        }
    }

    /// Apply command-line overrides
    pub fn apply_overrides(
        &mut self,
        ollama_url: Option<&str>,
        ghidra_url: Option<&str>,
        model: Option<&str>,
        mock: bool,
    ) {
        if let Some(url) = ollama_url {
            self.ollama.base_url = url.to_string();
        }
        if let Some(url) = ghidra_url {
            self.ghidra.primary_url = url.to_string();
        }
        if let Some(model) = model {
            self.ollama.model = model.to_string();
        }
        if mock {
            self.ghidra.mock_mode = true;
        }
    }

    pub fn ollama_config(&self) -> OllamaConfig {
        OllamaConfig::default()
            .with_base_url(&self.ollama.base_url)
            .with_timeout(Duration::from_secs(self.ollama.timeout_secs))
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::default()
            .with_primary(&self.ghidra.primary_url)
            .with_secondary(self.ghidra.secondary_url.clone())
            .with_timeout(Duration::from_secs(self.ghidra.timeout_secs))
    }

    fn model_config(&self, model: &str) -> PhaseModelConfig {
        let config = PhaseModelConfig::new(model).with_temperature(self.ollama.temperature);
        match self.ollama.max_tokens {
            Some(max_tokens) => config.with_max_tokens(max_tokens),
            None => config,
        }
    }

    pub fn orchestrator_config(&self) -> Result<OrchestratorConfig> {
        let section = &self.orchestrator;
        let mut config = OrchestratorConfig::default()
            .with_max_iterations(section.max_iterations)
            .with_review(section.enable_review)
            .with_verification(section.enable_verification)
            .with_learning(section.enable_learning)
            .with_prompt_budget(section.prompt_budget_tokens)
            .with_backend_attempts(section.backend_attempts)
            .with_retry_backoff(Duration::from_millis(section.retry_backoff_ms))
            .with_backend_timeout(Duration::from_secs(self.ollama.timeout_secs))
            .with_shared_capabilities(section.share_capabilities)
            .with_model(self.model_config(&self.ollama.model));

        for (name, model) in &self.ollama.phase_models {
            let phase = PhaseKind::parse(name).ok_or_else(|| eyre!("Unknown phase '{}' in ollama.phase_models", name))?;
            config = config.with_phase_model(phase, self.model_config(model));
        }
        Ok(config)
    }

    /// The configured catalogue, or the built-in one
    pub fn registry(&self) -> Result<ToolRegistry> {
        match &self.registry_path {
            Some(path) => ToolRegistry::from_file(path)
                .with_context(|| format!("Failed to load tool catalogue from {}", path.display())),
            None => Ok(ToolRegistry::builtin()),
        }
    }
}
