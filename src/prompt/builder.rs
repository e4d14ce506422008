//! Budgeted prompt assembly

use serde::Serialize;

use crate::error::{BridgeError, Result};
use crate::extract::DIRECTIVE_MARKER;
use crate::llm::estimate_tokens;
use crate::orchestrator::PhaseKind;

use super::budget::{fit_entries, truncate_to_tokens};
use super::render::PromptRenderer;
use super::templates::{self, SYSTEM_TEMPLATE, SYSTEM_TEMPLATE_NAME, USER_TEMPLATE, USER_TEMPLATE_NAME};

/// Default prompt budget in estimated tokens
pub const DEFAULT_PROMPT_BUDGET: usize = 8000;

/// Tokens reserved for headings and fixed text of the user template
const FRAME_TOKENS: usize = 64;

/// A rendered phase prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn estimated_tokens(&self) -> usize {
        estimate_tokens(&self.system) + estimate_tokens(&self.user)
    }
}

/// Inputs for one phase prompt
#[derive(Debug, Clone, Default)]
pub struct PromptVars<'a> {
    pub query: &'a str,
    pub iteration: usize,
    pub max_iterations: usize,
    /// Opaque block from the context provider
    pub memory: Option<&'a str>,
    /// Rendered records of earlier iterations, oldest first
    pub history: Vec<String>,
    /// Rendered records of the current iteration, oldest first
    pub current: Vec<String>,
}

#[derive(Serialize)]
struct SystemContext<'a> {
    instruction: &'a str,
    tools: &'a str,
    marker: &'a str,
}

#[derive(Serialize)]
struct UserContext<'a> {
    memory: String,
    query: &'a str,
    iteration: usize,
    max_iterations: usize,
    history: String,
    current: String,
    task: &'a str,
}

/// Builds phase prompts within a token budget
///
/// The system prompt and request are always included. The remaining budget
/// goes to the current iteration's records first, then the memory block,
/// then earlier iterations, newest first.
pub struct PromptBuilder {
    renderer: PromptRenderer,
    budget_tokens: usize,
}

impl PromptBuilder {
    pub fn new(budget_tokens: usize) -> Result<Self> {
        let mut renderer = PromptRenderer::new();
        renderer.register_template(SYSTEM_TEMPLATE_NAME, SYSTEM_TEMPLATE)?;
        renderer.register_template(USER_TEMPLATE_NAME, USER_TEMPLATE)?;
        Ok(Self {
            renderer,
            budget_tokens,
        })
    }

    /// Replace the system or user template with `source`
    pub fn with_template(mut self, name: &str, source: &str) -> Result<Self> {
        if name != SYSTEM_TEMPLATE_NAME && name != USER_TEMPLATE_NAME {
            return Err(BridgeError::Template(format!("Unknown prompt template '{}'", name)));
        }
        self.renderer.register_template(name, source)?;
        Ok(self)
    }

    pub fn budget_tokens(&self) -> usize {
        self.budget_tokens
    }

    /// Render the system and user prompt for `phase`
    ///
    /// `tools` is the catalogue description, shown only to phases that may
    /// issue commands.
    pub fn build(&self, phase: PhaseKind, tools: &str, vars: &PromptVars<'_>) -> Result<Prompt> {
        let system = self.renderer.render_named(
            SYSTEM_TEMPLATE_NAME,
            &SystemContext {
                instruction: templates::instruction(phase),
                tools: if templates::offers_tools(phase) { tools } else { "" },
                marker: DIRECTIVE_MARKER,
            },
        )?;

        let task = templates::task(phase);
        let fixed = estimate_tokens(&system) + estimate_tokens(vars.query) + estimate_tokens(task) + FRAME_TOKENS;
        let mut remaining = self.budget_tokens.saturating_sub(fixed);

        let current = fit_entries(&vars.current, remaining);
        remaining = remaining.saturating_sub(estimate_tokens(&current));

        let memory = vars
            .memory
            .map(|m| truncate_to_tokens(m.trim(), remaining))
            .unwrap_or_default();
        remaining = remaining.saturating_sub(estimate_tokens(&memory));

        let history = fit_entries(&vars.history, remaining);

        let user = self.renderer.render_named(
            USER_TEMPLATE_NAME,
            &UserContext {
                memory,
                query: vars.query,
                iteration: vars.iteration,
                max_iterations: vars.max_iterations,
                history,
                current,
                task,
            },
        )?;

        let prompt = Prompt { system, user };
        log::debug!(
            "Built {} prompt: ~{} tokens of {}",
            phase,
            prompt.estimated_tokens(),
            self.budget_tokens
        );
        Ok(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars<'a>() -> PromptVars<'a> {
        PromptVars {
            query: "What does main do?",
            iteration: 1,
            max_iterations: 5,
            ..Default::default()
        }
    }

    #[test]
    fn test_planning_prompt_lists_tools() {
        let builder = PromptBuilder::new(DEFAULT_PROMPT_BUDGET).unwrap();
        let prompt = builder
            .build(PhaseKind::Planning, "- list_functions(): List functions", &vars())
            .unwrap();

        assert!(prompt.system.contains("- list_functions(): List functions"));
        assert!(prompt.system.contains("EXECUTE: command_name("));
        assert!(prompt.user.contains("## Request\nWhat does main do?"));
        assert!(prompt.user.contains("1 of 5"));
        assert!(!prompt.user.contains("## Memory"));
        assert!(!prompt.user.contains("## Progress so far"));
    }

    #[test]
    fn test_analysis_prompt_hides_tools() {
        let builder = PromptBuilder::new(DEFAULT_PROMPT_BUDGET).unwrap();
        let prompt = builder
            .build(PhaseKind::Analysis, "- list_functions(): List functions", &vars())
            .unwrap();
        assert!(!prompt.system.contains("list_functions"));
        assert!(!prompt.system.contains("EXECUTE:"));
    }

    #[test]
    fn test_sections_included() {
        let builder = PromptBuilder::new(DEFAULT_PROMPT_BUDGET).unwrap();
        let vars = PromptVars {
            memory: Some("main was renamed before"),
            history: vec!["### Iteration 1 / analysis\nold".to_string()],
            current: vec!["### Iteration 2 / planning\nplan".to_string()],
            iteration: 2,
            ..vars()
        };
        let prompt = builder.build(PhaseKind::Execution, "", &vars).unwrap();

        let memory = prompt.user.find("## Memory").unwrap();
        let request = prompt.user.find("## Request").unwrap();
        let history = prompt.user.find("## Progress so far").unwrap();
        let current = prompt.user.find("## This iteration").unwrap();
        let task = prompt.user.find("## Task").unwrap();
        assert!(memory < request && request < history && history < current && current < task);
    }

    #[test]
    fn test_history_dropped_before_current() {
        let builder = PromptBuilder::new(600).unwrap();
        let vars = PromptVars {
            history: (0..20).map(|i| format!("history {} {}", i, "h".repeat(200))).collect(),
            current: vec![format!("current {}", "c".repeat(200))],
            ..vars()
        };
        let prompt = builder.build(PhaseKind::Analysis, "", &vars).unwrap();

        assert!(prompt.user.contains("current cccc"));
        assert!(prompt.user.contains("history 19"));
        assert!(!prompt.user.contains("history 0 "));
        assert!(prompt.user.contains("earlier entries omitted"));
        assert!(prompt.estimated_tokens() <= 600 + 10);
    }

    #[test]
    fn test_memory_counted_against_budget() {
        let builder = PromptBuilder::new(400).unwrap();
        let memory = "m".repeat(10_000);
        let vars = PromptVars {
            memory: Some(&memory),
            ..vars()
        };
        let prompt = builder.build(PhaseKind::Review, "", &vars).unwrap();
        assert!(prompt.user.contains("[... truncated]"));
        assert!(prompt.estimated_tokens() <= 400);
    }
}
