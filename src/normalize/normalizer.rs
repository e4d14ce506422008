//! Resolution of raw invocations against the tool registry

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::address::{canonicalize_address, is_hex, parse_integer};
use super::naming::{closest_name, to_snake_case};
use crate::extract::{DIRECTIVE_MARKER, RawArgument, RawInvocation, SurfaceForm};
use crate::registry::{ParamKind, ParamSpec, ToolRegistry, ToolSpec};

/// Maximum edit distance for a "did you mean" suggestion
const SUGGESTION_DISTANCE: usize = 3;

/// Why an invocation could not be turned into a command
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    #[error("Unknown command '{name}'{}", did_you_mean(.suggestion))]
    UnknownCommand { name: String, suggestion: Option<String> },

    #[error("Command '{command}' is missing required parameter '{parameter}'")]
    MissingParameter { command: String, parameter: String },
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (did you mean '{}'?)", s))
        .unwrap_or_default()
}

/// A validated command, ready for the executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedCommand {
    /// Canonical registry name
    pub name: String,
    /// Canonical parameter name -> canonical value
    pub args: BTreeMap<String, String>,
    /// Span of the invocation this command came from
    pub source_span: Range<usize>,
}

impl NormalizedCommand {
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).map(String::as_str)
    }

    /// Render in the primary directive syntax
    pub fn to_directive(&self) -> String {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, escape(v)))
            .collect();
        format!("{} {}({})", DIRECTIVE_MARKER, self.name, args.join(", "))
    }

    /// The equivalent raw invocation, keeping the original span
    pub fn to_invocation(&self) -> RawInvocation {
        RawInvocation {
            span: self.source_span.clone(),
            name: self.name.clone(),
            args: self
                .args
                .iter()
                .map(|(k, v)| RawArgument::keyed(k.clone(), v.clone()))
                .collect(),
            form: SurfaceForm::Directive,
        }
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

/// Maps raw invocations onto registry entries
#[derive(Debug, Clone)]
pub struct Normalizer {
    registry: Arc<ToolRegistry>,
}

impl Normalizer {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Resolve a name as written to a registry entry
    pub fn resolve_name(&self, name: &str) -> Result<&ToolSpec, Rejection> {
        let name = name.trim();
        if let Some(spec) = self.registry.get(name) {
            return Ok(spec);
        }

        let snake = to_snake_case(name);
        if let Some(spec) = self.registry.get(&snake) {
            log::debug!("Resolved command '{}' as '{}'", name, spec.name);
            return Ok(spec);
        }

        // Namespaced forms such as `ghidra.decompile_function`
        if let Some((_, last)) = name.rsplit_once(['.', '/', ':'])
            && let Some(spec) = self.registry.get(&to_snake_case(last))
        {
            log::debug!("Resolved command '{}' as '{}'", name, spec.name);
            return Ok(spec);
        }

        let suggestion =
            closest_name(&snake, self.registry.names(), SUGGESTION_DISTANCE).map(str::to_string);
        Err(Rejection::UnknownCommand {
            name: name.to_string(),
            suggestion,
        })
    }

    /// Turn a raw invocation into a validated command
    pub fn normalize(&self, raw: &RawInvocation) -> Result<NormalizedCommand, Rejection> {
        let spec = self.resolve_name(&raw.name)?;
        let mut args = BTreeMap::new();

        for arg in &raw.args {
            let param = match &arg.key {
                Some(key) => match resolve_param(spec, key) {
                    Some(param) => param,
                    None => {
                        log::warn!("Dropping unknown parameter '{}' for '{}'", key, spec.name);
                        continue;
                    }
                },
                None => match spec.params.iter().find(|p| !args.contains_key(&p.name)) {
                    Some(param) => param,
                    None => {
                        log::warn!("Dropping extra positional argument '{}' for '{}'", arg.value, spec.name);
                        continue;
                    }
                },
            };

            if args.contains_key(&param.name) {
                log::warn!("Ignoring repeated parameter '{}' for '{}'", param.name, spec.name);
                continue;
            }

            match canonical_value(param, &arg.value) {
                Some(value) => {
                    args.insert(param.name.clone(), value);
                }
                None => {
                    log::warn!(
                        "Dropping invalid {:?} value '{}' for '{}.{}'",
                        param.kind,
                        arg.value,
                        spec.name,
                        param.name
                    );
                }
            }
        }

        if let Some(missing) = spec.required_params().find(|p| !args.contains_key(&p.name)) {
            return Err(Rejection::MissingParameter {
                command: spec.name.clone(),
                parameter: missing.name.clone(),
            });
        }

        Ok(NormalizedCommand {
            name: spec.name.clone(),
            args,
            source_span: raw.span.clone(),
        })
    }

    /// Feedback for the model about a rejection, with the expected signature
    pub fn explain(&self, rejection: &Rejection) -> String {
        let mut text = rejection.to_string();
        let command = match rejection {
            Rejection::UnknownCommand { suggestion, .. } => suggestion.as_deref(),
            Rejection::MissingParameter { command, .. } => Some(command.as_str()),
        };
        if let Some(spec) = command.and_then(|c| self.registry.get(c)) {
            let _ = write!(text, ". Expected: {}", spec.signature());
        }
        text
    }
}

/// Exact name, then alias, then the snake_case form of the key
fn resolve_param<'a>(spec: &'a ToolSpec, key: &str) -> Option<&'a ParamSpec> {
    let key = key.trim();
    spec.params
        .iter()
        .find(|p| p.name == key)
        .or_else(|| spec.params.iter().find(|p| p.answers_to(key)))
        .or_else(|| {
            let snake = to_snake_case(key);
            spec.params.iter().find(|p| p.answers_to(&snake))
        })
}

fn canonical_value(param: &ParamSpec, value: &str) -> Option<String> {
    if value.trim().is_empty() {
        return None;
    }
    match param.kind {
        ParamKind::String => Some(value.to_string()),
        ParamKind::Integer => parse_integer(value).map(|n| n.to_string()),
        ParamKind::Address => {
            let address = canonicalize_address(value);
            if !is_hex(&address) {
                log::debug!("Address value '{}' is not hexadecimal; passing through", address);
            }
            Some(address)
        }
    }
}
