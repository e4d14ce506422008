//! Phase records, transcript and loop state

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::executor::{ExecutionOutcome, OutcomeStatus};
use crate::extract::RawInvocation;
use crate::llm::PhaseModelConfig;
use crate::normalize::{NormalizedCommand, Rejection};

/// One stage of the orchestration loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    Planning,
    Execution,
    Analysis,
    Review,
    Verification,
    Learning,
}

impl PhaseKind {
    pub const ALL: [PhaseKind; 6] = [
        PhaseKind::Planning,
        PhaseKind::Execution,
        PhaseKind::Analysis,
        PhaseKind::Review,
        PhaseKind::Verification,
        PhaseKind::Learning,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseKind::Planning => "planning",
            PhaseKind::Execution => "execution",
            PhaseKind::Analysis => "analysis",
            PhaseKind::Review => "review",
            PhaseKind::Verification => "verification",
            PhaseKind::Learning => "learning",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s.to_lowercase())
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An invocation found during a phase and what became of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRecord {
    pub raw: RawInvocation,
    /// The validated command, or why there is none
    pub normalized: Result<NormalizedCommand, Rejection>,
    /// `None` when rejected, or when the query was cancelled first
    pub outcome: Option<ExecutionOutcome>,
}

impl InvocationRecord {
    pub fn command(&self) -> Option<&NormalizedCommand> {
        self.normalized.as_ref().ok()
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        self.normalized.as_ref().err()
    }
}

/// Everything one phase did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub kind: PhaseKind,
    /// 1-based iteration the phase ran in
    pub iteration: usize,
    /// Model configuration used for the phase
    pub config: PhaseModelConfig,
    pub prompt: String,
    /// Raw model output
    pub output: String,
    pub invocations: Vec<InvocationRecord>,
    /// Every executed command failed with a transport error
    #[serde(default)]
    pub degraded: bool,
    /// Finalized early because of cancellation
    #[serde(default)]
    pub interrupted: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PhaseRecord {
    pub fn new(kind: PhaseKind, iteration: usize, config: PhaseModelConfig, prompt: String) -> Self {
        let now = Utc::now();
        Self {
            kind,
            iteration,
            config,
            prompt,
            output: String::new(),
            invocations: Vec::new(),
            degraded: false,
            interrupted: false,
            started_at: now,
            finished_at: now,
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    /// Close the record, deriving the degraded flag from its outcomes
    pub fn finish(mut self) -> Self {
        let outcomes: Vec<&ExecutionOutcome> =
            self.invocations.iter().filter_map(|i| i.outcome.as_ref()).collect();
        self.degraded = !outcomes.is_empty()
            && outcomes
                .iter()
                .all(|o| o.status == OutcomeStatus::TransportError);
        self.finished_at = Utc::now();
        self
    }

    /// Outcomes of the commands executed in this phase
    pub fn outcomes(&self) -> impl Iterator<Item = &ExecutionOutcome> {
        self.invocations.iter().filter_map(|i| i.outcome.as_ref())
    }
}

/// Ordered, append-only history of one query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    records: Vec<PhaseRecord>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: PhaseRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[PhaseRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&PhaseRecord> {
        self.records.last()
    }

    /// Most recent record of a phase kind
    pub fn last_of(&self, kind: PhaseKind) -> Option<&PhaseRecord> {
        self.records.iter().rev().find(|r| r.kind == kind)
    }

    /// Most recent record of a phase kind within one iteration
    pub fn in_iteration(&self, iteration: usize, kind: PhaseKind) -> Option<&PhaseRecord> {
        self.records
            .iter()
            .rev()
            .find(|r| r.iteration == iteration && r.kind == kind)
    }
}

/// Why a query stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TerminationReason {
    /// The completion predicate reported the query answered
    Answered,
    /// The configured iteration limit was reached
    IterationLimitReached,
    /// The model backend kept failing
    BackendUnavailable { phase: PhaseKind, message: String },
    /// A phase prompt could not be rendered
    PromptUnavailable { phase: PhaseKind, message: String },
    /// The caller cancelled the query
    Cancelled,
}

impl TerminationReason {
    pub fn status(&self) -> TerminalStatus {
        match self {
            TerminationReason::Answered | TerminationReason::IterationLimitReached => TerminalStatus::Done,
            TerminationReason::BackendUnavailable { .. } | TerminationReason::PromptUnavailable { .. } => {
                TerminalStatus::Failed
            }
            TerminationReason::Cancelled => TerminalStatus::Cancelled,
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::Answered => write!(f, "answered"),
            TerminationReason::IterationLimitReached => write!(f, "iteration limit reached"),
            TerminationReason::BackendUnavailable { phase, message } => {
                write!(f, "backend unavailable during {}: {}", phase, message)
            }
            TerminationReason::PromptUnavailable { phase, message } => {
                write!(f, "could not build the {} prompt: {}", phase, message)
            }
            TerminationReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Terminal status reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalStatus {
    Done,
    Failed,
    Cancelled,
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalStatus::Done => write!(f, "done"),
            TerminalStatus::Failed => write!(f, "failed"),
            TerminalStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// State of one running query, owned by the orchestrator
#[derive(Debug, Clone)]
pub struct LoopState {
    phase: PhaseKind,
    iteration: usize,
    termination: Option<TerminationReason>,
    transcript: Transcript,
}

impl Default for LoopState {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopState {
    /// Fresh state: Planning, iteration 1
    pub fn new() -> Self {
        Self {
            phase: PhaseKind::Planning,
            iteration: 1,
            termination: None,
            transcript: Transcript::new(),
        }
    }

    pub fn phase(&self) -> PhaseKind {
        self.phase
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn termination(&self) -> Option<&TerminationReason> {
        self.termination.as_ref()
    }

    pub fn is_terminated(&self) -> bool {
        self.termination.is_some()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub(crate) fn enter(&mut self, phase: PhaseKind) {
        log::debug!("Iteration {}: {} -> {}", self.iteration, self.phase, phase);
        self.phase = phase;
    }

    pub(crate) fn next_iteration(&mut self) {
        self.iteration += 1;
        self.phase = PhaseKind::Planning;
    }

    pub(crate) fn record(&mut self, record: PhaseRecord) {
        self.transcript.push(record);
    }

    /// Set the termination reason; the first one wins
    pub(crate) fn terminate(&mut self, reason: TerminationReason) {
        if self.termination.is_none() {
            log::info!("Query terminated after {} iteration(s): {}", self.iteration, reason);
            self.termination = Some(reason);
        }
    }

    pub(crate) fn into_parts(self) -> (Option<TerminationReason>, Transcript, usize) {
        (self.termination, self.transcript, self.iteration)
    }
}

/// What a query produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub query: String,
    pub status: TerminalStatus,
    pub reason: TerminationReason,
    /// Iterations started
    pub iterations: usize,
    /// Final Analysis text on `Done`, with invocations removed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    pub transcript: Transcript,
}

impl QueryResult {
    pub fn is_done(&self) -> bool {
        self.status == TerminalStatus::Done
    }

    /// Last phase record, for diagnosing failures
    pub fn last_record(&self) -> Option<&PhaseRecord> {
        self.transcript.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::EndpointRole;
    use crate::extract::{RawInvocation, SurfaceForm};

    fn outcome(status: OutcomeStatus) -> ExecutionOutcome {
        ExecutionOutcome {
            command: "list_functions".to_string(),
            status,
            payload: None,
            message: Some("x".to_string()),
            endpoint: EndpointRole::Primary,
        }
    }

    fn invocation(outcome: Option<ExecutionOutcome>) -> InvocationRecord {
        InvocationRecord {
            raw: RawInvocation {
                span: 0..10,
                name: "list_functions".to_string(),
                args: Vec::new(),
                form: SurfaceForm::Directive,
            },
            normalized: Err(Rejection::UnknownCommand {
                name: "list_functions".to_string(),
                suggestion: None,
            }),
            outcome,
        }
    }

    fn record(kind: PhaseKind, iteration: usize) -> PhaseRecord {
        PhaseRecord::new(kind, iteration, PhaseModelConfig::default(), String::new())
    }

    #[test]
    fn test_phase_kind_parse() {
        assert_eq!(PhaseKind::parse("Planning"), Some(PhaseKind::Planning));
        assert_eq!(PhaseKind::parse("verification"), Some(PhaseKind::Verification));
        assert_eq!(PhaseKind::parse("dreaming"), None);
        assert_eq!(PhaseKind::Learning.to_string(), "learning");
    }

    #[test]
    fn test_degraded_when_all_transport_errors() {
        let mut rec = record(PhaseKind::Execution, 1);
        rec.invocations = vec![
            invocation(Some(outcome(OutcomeStatus::TransportError))),
            invocation(Some(outcome(OutcomeStatus::TransportError))),
            invocation(None),
        ];
        assert!(rec.finish().degraded);
    }

    #[test]
    fn test_not_degraded_with_partial_success() {
        let mut rec = record(PhaseKind::Execution, 1);
        rec.invocations = vec![
            invocation(Some(outcome(OutcomeStatus::TransportError))),
            invocation(Some(outcome(OutcomeStatus::Success))),
        ];
        assert!(!rec.finish().degraded);
    }

    #[test]
    fn test_not_degraded_without_outcomes() {
        assert!(!record(PhaseKind::Execution, 1).finish().degraded);
    }

    #[test]
    fn test_transcript_lookup() {
        let mut transcript = Transcript::new();
        transcript.push(record(PhaseKind::Planning, 1).with_output("plan 1"));
        transcript.push(record(PhaseKind::Analysis, 1).with_output("analysis 1"));
        transcript.push(record(PhaseKind::Planning, 2).with_output("plan 2"));

        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.last_of(PhaseKind::Planning).unwrap().output, "plan 2");
        assert_eq!(
            transcript.in_iteration(1, PhaseKind::Planning).unwrap().output,
            "plan 1"
        );
        assert!(transcript.in_iteration(2, PhaseKind::Analysis).is_none());
    }

    #[test]
    fn test_termination_status() {
        assert_eq!(TerminationReason::Answered.status(), TerminalStatus::Done);
        assert_eq!(TerminationReason::IterationLimitReached.status(), TerminalStatus::Done);
        assert_eq!(
            TerminationReason::BackendUnavailable {
                phase: PhaseKind::Planning,
                message: "down".to_string()
            }
            .status(),
            TerminalStatus::Failed
        );
        assert_eq!(TerminationReason::Cancelled.status(), TerminalStatus::Cancelled);
    }

    #[test]
    fn test_loop_state_transitions() {
        let mut state = LoopState::new();
        assert_eq!(state.phase(), PhaseKind::Planning);
        assert_eq!(state.iteration(), 1);

        state.enter(PhaseKind::Execution);
        state.record(record(PhaseKind::Execution, 1));
        state.next_iteration();
        assert_eq!(state.phase(), PhaseKind::Planning);
        assert_eq!(state.iteration(), 2);

        state.terminate(TerminationReason::Cancelled);
        state.terminate(TerminationReason::Answered);
        assert_eq!(state.termination(), Some(&TerminationReason::Cancelled));
        assert_eq!(state.transcript().len(), 1);
    }

    #[test]
    fn test_termination_reason_serialization() {
        let reason = TerminationReason::BackendUnavailable {
            phase: PhaseKind::Analysis,
            message: "connection refused".to_string(),
        };
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["reason"], "backend_unavailable");
        assert_eq!(json["phase"], "analysis");
    }
}
