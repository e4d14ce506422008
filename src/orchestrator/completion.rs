//! Completion predicates: is the query answered?

use super::phase::PhaseKind;

/// Decides from a judging phase's text whether the query is answered
///
/// Called with the output of the last judging phase of an iteration
/// (Analysis, Review or Verification, whichever ran last). Anything that
/// is not a clear yes must return `false`.
pub trait CompletionPredicate: Send + Sync {
    fn is_complete(&self, phase: PhaseKind, output: &str) -> bool;
}

impl<F> CompletionPredicate for F
where
    F: Fn(PhaseKind, &str) -> bool + Send + Sync,
{
    fn is_complete(&self, phase: PhaseKind, output: &str) -> bool {
        self(phase, output)
    }
}

const POSITIVE_LINES: [&str; 5] = ["STOP", "COMPLETE", "DONE", "ANSWERED", "VERIFIED"];
const POSITIVE_TAGS: [&str; 4] = ["[COMPLETE]", "[DONE]", "[STOP]", "[ANSWERED]"];
const NEGATIVE_LINES: [&str; 2] = ["CONTINUE", "NOT DONE"];
const NEGATIVE_PHRASES: [&str; 4] = ["INCOMPLETE", "NOT COMPLETE", "NOT ANSWERED", "[CONTINUE]"];

/// Default predicate: keyword verdicts
///
/// A verdict word on a line of its own (`STOP`, `COMPLETE`, `DONE`,
/// `ANSWERED`, `VERIFIED`), or a tag such as `[COMPLETE]`, means complete.
/// `CONTINUE` or `INCOMPLETE` style cues mean not complete, and so do
/// conflicting or missing cues.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewVerdict;

impl ReviewVerdict {
    /// Strip markdown decoration and trailing punctuation from a verdict line
    fn bare(line: &str) -> String {
        line.trim()
            .trim_matches(|c: char| matches!(c, '*' | '`' | '#' | '"' | '\'' | '_' | '>' | '-'))
            .trim()
            .trim_end_matches(['.', '!', ':'])
            .trim()
            .to_uppercase()
    }
}

impl CompletionPredicate for ReviewVerdict {
    fn is_complete(&self, phase: PhaseKind, output: &str) -> bool {
        let upper = output.to_uppercase();
        let lines: Vec<String> = output.lines().map(Self::bare).collect();

        let positive = lines.iter().any(|l| POSITIVE_LINES.contains(&l.as_str()))
            || POSITIVE_TAGS.iter().any(|t| upper.contains(t));
        let negative = lines.iter().any(|l| NEGATIVE_LINES.contains(&l.as_str()))
            || NEGATIVE_PHRASES.iter().any(|p| upper.contains(p));

        if positive && negative {
            log::warn!("Conflicting completion cues in {} output; continuing", phase);
        }
        positive && !negative
    }
}
