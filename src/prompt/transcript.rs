//! Rendering phase records as prompt context

use std::fmt::Write;

use crate::executor::{ExecutionOutcome, OutcomeStatus};
use crate::extract::RawInvocation;
use crate::normalize::Normalizer;
use crate::orchestrator::{PhaseKind, PhaseRecord};

/// Longest command result shown to the model
pub const MAX_RESULT_CHARS: usize = 4000;

fn status_label(status: OutcomeStatus) -> &'static str {
    match status {
        OutcomeStatus::Success => "ok",
        OutcomeStatus::ToolError => "tool error",
        OutcomeStatus::TransportError => "unreachable",
        OutcomeStatus::Unsupported => "unsupported",
    }
}

/// The invocation as the model wrote it
fn raw_call(raw: &RawInvocation) -> String {
    let args: Vec<String> = raw
        .args
        .iter()
        .map(|a| match &a.key {
            Some(key) => format!("{}={:?}", key, a.value),
            None => format!("{:?}", a.value),
        })
        .collect();
    format!("{}({})", raw.name, args.join(", "))
}

fn clip(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n[... {} more bytes]", &text[..end], text.len() - end)
}

fn render_outcome(out: &mut String, outcome: &ExecutionOutcome) {
    let _ = writeln!(out, "  -> {} ({})", status_label(outcome.status), outcome.endpoint);
    let text = outcome.text();
    if !text.trim().is_empty() {
        for line in clip(text.trim(), MAX_RESULT_CHARS).lines() {
            let _ = writeln!(out, "     {}", line);
        }
    }
}

/// Render one phase record as a transcript entry
///
/// Execution records list their commands and results instead of the raw
/// output, since the output is the commands themselves.
pub fn render_record(record: &PhaseRecord, normalizer: &Normalizer) -> String {
    let mut out = format!("### Iteration {} / {}", record.iteration, record.kind);
    if record.degraded {
        out.push_str(" (no endpoint reachable)");
    }
    out.push('\n');

    if record.kind != PhaseKind::Execution {
        out.push_str(record.output.trim());
        out.push('\n');
    }

    if record.kind == PhaseKind::Execution && record.invocations.is_empty() {
        out.push_str("No commands were found.\n");
    }

    for invocation in &record.invocations {
        match &invocation.normalized {
            Ok(command) => {
                let _ = writeln!(out, "{}", command.to_directive());
                match &invocation.outcome {
                    Some(outcome) => render_outcome(&mut out, outcome),
                    None => out.push_str("  -> not run\n"),
                }
            }
            Err(rejection) => {
                let _ = writeln!(
                    out,
                    "{}\n  -> rejected: {}",
                    raw_call(&invocation.raw),
                    normalizer.explain(rejection)
                );
            }
        }
    }

    if record.interrupted {
        out.push_str("[interrupted]\n");
    }
    out.trim_end().to_string()
}
