//! Phase orchestration loop
//!
//! One `Orchestrator` drives one query at a time through
//! Planning -> Execution -> Analysis -> [Review] -> [Verification], repeating
//! until the completion predicate is satisfied or the iteration limit is
//! reached. The Learning phase, when enabled, runs once before `Done`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::executor::{ExecutionOutcome, ToolApi, ToolExecutor};
use crate::extract::{RawInvocation, extract_invocations, strip_invocations};
use crate::llm::{BackendError, ModelBackend, PhaseModelConfig};
use crate::normalize::Normalizer;
use crate::prompt::{DEFAULT_PROMPT_BUDGET, PromptBuilder, PromptVars, render_record};

use super::completion::{CompletionPredicate, ReviewVerdict};
use super::context::ContextProvider;
use super::phase::{
    InvocationRecord, LoopState, PhaseKind, PhaseRecord, QueryResult, TerminalStatus, TerminationReason,
    Transcript,
};

/// Configuration for the Orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound on iterations; at least 1
    pub max_iterations: usize,
    pub enable_review: bool,
    pub enable_verification: bool,
    pub enable_learning: bool,
    /// Prompt budget in estimated tokens
    pub prompt_budget_tokens: usize,
    /// Attempts per model call, including the first
    pub backend_attempts: u32,
    /// Backoff after the first failed attempt; grows linearly
    pub retry_backoff: Duration,
    /// Timeout of a single model call
    pub backend_timeout: Duration,
    /// Keep the endpoint capability memo across queries
    pub share_capabilities: bool,
    /// Model configuration used by phases without an override
    pub model: PhaseModelConfig,
    pub phase_models: HashMap<PhaseKind, PhaseModelConfig>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            enable_review: true,
            enable_verification: false,
            enable_learning: false,
            prompt_budget_tokens: DEFAULT_PROMPT_BUDGET,
            backend_attempts: 3,
            retry_backoff: Duration::from_millis(500),
            backend_timeout: Duration::from_secs(120),
            share_capabilities: false,
            model: PhaseModelConfig::default(),
            phase_models: HashMap::new(),
        }
    }
}

impl OrchestratorConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_review(mut self, enabled: bool) -> Self {
        self.enable_review = enabled;
        self
    }

    pub fn with_verification(mut self, enabled: bool) -> Self {
        self.enable_verification = enabled;
        self
    }

    pub fn with_learning(mut self, enabled: bool) -> Self {
        self.enable_learning = enabled;
        self
    }

    pub fn with_prompt_budget(mut self, tokens: usize) -> Self {
        self.prompt_budget_tokens = tokens;
        self
    }

    pub fn with_backend_attempts(mut self, attempts: u32) -> Self {
        self.backend_attempts = attempts.max(1);
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    pub fn with_shared_capabilities(mut self, shared: bool) -> Self {
        self.share_capabilities = shared;
        self
    }

    pub fn with_model(mut self, model: PhaseModelConfig) -> Self {
        self.model = model;
        self
    }

    pub fn with_phase_model(mut self, phase: PhaseKind, model: PhaseModelConfig) -> Self {
        self.phase_models.insert(phase, model);
        self
    }

    /// Model configuration for `phase`, labelled with the phase name
    pub fn phase_config(&self, phase: PhaseKind) -> PhaseModelConfig {
        self.phase_models
            .get(&phase)
            .unwrap_or(&self.model)
            .clone()
            .with_label(phase.as_str())
    }

    /// Phases of one iteration, in order
    pub fn iteration_phases(&self) -> Vec<PhaseKind> {
        let mut phases = vec![PhaseKind::Planning, PhaseKind::Execution, PhaseKind::Analysis];
        if self.enable_review {
            phases.push(PhaseKind::Review);
        }
        if self.enable_verification {
            phases.push(PhaseKind::Verification);
        }
        phases
    }

    /// Phase whose output the completion predicate reads
    pub fn judging_phase(&self) -> PhaseKind {
        if self.enable_verification {
            PhaseKind::Verification
        } else if self.enable_review {
            PhaseKind::Review
        } else {
            PhaseKind::Analysis
        }
    }
}

/// How a phase ended
enum PhaseStep {
    Completed(PhaseRecord),
    Interrupted(PhaseRecord),
    Failed(TerminationReason),
}

/// Why a model call produced no text
enum CallError {
    Cancelled,
    Backend(BackendError),
}

/// Drives queries through the phase state machine
pub struct Orchestrator<B, A>
where
    B: ModelBackend,
    A: ToolApi,
{
    backend: Arc<B>,
    executor: ToolExecutor<A>,
    normalizer: Normalizer,
    prompts: PromptBuilder,
    /// Catalogue description shown to command-issuing phases
    tools: String,
    context: Option<Arc<dyn ContextProvider>>,
    predicate: Box<dyn CompletionPredicate>,
    config: OrchestratorConfig,
}

impl<B, A> Orchestrator<B, A>
where
    B: ModelBackend,
    A: ToolApi,
{
    pub fn new(backend: Arc<B>, executor: ToolExecutor<A>, config: OrchestratorConfig) -> Result<Self> {
        let registry = executor.registry().clone();
        let tools = registry.describe();
        Ok(Self {
            backend,
            normalizer: Normalizer::new(registry),
            executor,
            prompts: PromptBuilder::new(config.prompt_budget_tokens)?,
            tools,
            context: None,
            predicate: Box::new(ReviewVerdict),
            config,
        })
    }

    pub fn with_context(mut self, context: Arc<dyn ContextProvider>) -> Self {
        self.context = Some(context);
        self
    }

    /// Replace the built-in system or user prompt template
    pub fn with_template(mut self, name: &str, source: &str) -> Result<Self> {
        self.prompts = self.prompts.with_template(name, source)?;
        Ok(self)
    }

    pub fn with_predicate(mut self, predicate: impl CompletionPredicate + 'static) -> Self {
        self.predicate = Box::new(predicate);
        self
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn executor(&self) -> &ToolExecutor<A> {
        &self.executor
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run one query to a terminal state
    ///
    /// Every failure ends up in the returned `QueryResult`, together with the
    /// transcript recorded up to that point.
    pub async fn run(&mut self, query: &str, cancel: &CancellationToken) -> QueryResult {
        if !self.config.share_capabilities {
            self.executor.reset_capabilities();
        }
        log::info!("Starting query: {}", query);

        let mut state = LoopState::new();
        let phases = self.config.iteration_phases();
        let judge = self.config.judging_phase();

        'iterations: loop {
            let iteration = state.iteration();
            log::info!("Iteration {}/{}", iteration, self.config.max_iterations);

            for &phase in &phases {
                if cancel.is_cancelled() {
                    state.terminate(TerminationReason::Cancelled);
                    break 'iterations;
                }
                state.enter(phase);
                match self.run_phase(phase, query, &state, cancel).await {
                    PhaseStep::Completed(record) => state.record(record),
                    PhaseStep::Interrupted(record) => {
                        state.record(record);
                        state.terminate(TerminationReason::Cancelled);
                        break 'iterations;
                    }
                    PhaseStep::Failed(reason) => {
                        state.terminate(reason);
                        break 'iterations;
                    }
                }
            }

            let verdict = state
                .transcript()
                .in_iteration(iteration, judge)
                .map(|r| self.predicate.is_complete(judge, &r.output))
                .unwrap_or(false);

            let reason = if verdict {
                TerminationReason::Answered
            } else if iteration >= self.config.max_iterations {
                log::warn!("Iteration limit of {} reached", self.config.max_iterations);
                TerminationReason::IterationLimitReached
            } else {
                state.next_iteration();
                continue;
            };

            if self.config.enable_learning {
                if cancel.is_cancelled() {
                    state.terminate(TerminationReason::Cancelled);
                    break;
                }
                state.enter(PhaseKind::Learning);
                match self.run_phase(PhaseKind::Learning, query, &state, cancel).await {
                    PhaseStep::Completed(record) => {
                        if let Some(context) = &self.context {
                            context.remember(query, &record.output).await;
                        }
                        state.record(record);
                    }
                    PhaseStep::Interrupted(record) => {
                        state.record(record);
                        state.terminate(TerminationReason::Cancelled);
                        break;
                    }
                    // The answer already stands; losing the summary is not fatal
                    PhaseStep::Failed(reason) => log::warn!("Learning phase failed: {}", reason),
                }
            }

            state.terminate(reason);
            break;
        }

        self.finish(query, state)
    }

    fn finish(&self, query: &str, state: LoopState) -> QueryResult {
        let (reason, transcript, iterations) = state.into_parts();
        // Every break out of the loop sets a reason
        let reason = reason.unwrap_or(TerminationReason::Cancelled);
        let status = reason.status();
        let answer = match status {
            TerminalStatus::Done => transcript
                .last_of(PhaseKind::Analysis)
                .map(|r| strip_invocations(&r.output)),
            _ => None,
        };
        log::info!("Query finished: {} ({})", status, reason);

        QueryResult {
            query: query.to_string(),
            status,
            reason,
            iterations,
            answer,
            transcript,
        }
    }

    /// Rendered records of earlier iterations and of the current one
    fn render_context(&self, transcript: &Transcript, iteration: usize) -> (Vec<String>, Vec<String>) {
        let (current, history): (Vec<&PhaseRecord>, Vec<&PhaseRecord>) = transcript
            .records()
            .iter()
            .partition(|r| r.iteration == iteration);
        let render = |records: Vec<&PhaseRecord>| -> Vec<String> {
            records.into_iter().map(|r| render_record(r, &self.normalizer)).collect()
        };
        (render(history), render(current))
    }

    async fn run_phase(
        &self,
        phase: PhaseKind,
        query: &str,
        state: &LoopState,
        cancel: &CancellationToken,
    ) -> PhaseStep {
        let iteration = state.iteration();
        let memory = match &self.context {
            Some(context) => context.context(query, phase).await,
            None => None,
        };
        let (history, current) = self.render_context(state.transcript(), iteration);
        let vars = PromptVars {
            query,
            iteration,
            max_iterations: self.config.max_iterations,
            memory: memory.as_deref(),
            history,
            current,
        };
        let prompt = match self.prompts.build(phase, &self.tools, &vars) {
            Ok(prompt) => prompt,
            Err(e) => {
                log::error!("{} prompt failed: {}", phase, e);
                return PhaseStep::Failed(TerminationReason::PromptUnavailable {
                    phase,
                    message: e.to_string(),
                });
            }
        };

        let config = self.config.phase_config(phase).with_system_prompt(prompt.system);
        let mut record = PhaseRecord::new(phase, iteration, config.clone(), prompt.user);

        let reply = self.generate(&config, &record.prompt, cancel).await;
        match reply {
            Ok(output) => record.output = output,
            Err(CallError::Cancelled) => {
                log::info!("Cancelled during {} model call", phase);
                record.interrupted = true;
                return PhaseStep::Interrupted(record.finish());
            }
            Err(CallError::Backend(e)) => {
                log::error!("{} phase failed: {}", phase, e);
                return PhaseStep::Failed(TerminationReason::BackendUnavailable {
                    phase,
                    message: e.to_string(),
                });
            }
        }

        if phase == PhaseKind::Execution {
            let plan = state
                .transcript()
                .in_iteration(iteration, PhaseKind::Planning)
                .map(|r| r.output.as_str());
            let raw = Self::collect_invocations(&record.output, plan);
            record.invocations = raw
                .into_iter()
                .map(|raw| self.normalize(raw))
                .collect();

            if !self.execute_all(&mut record.invocations, cancel).await {
                record.interrupted = true;
                return PhaseStep::Interrupted(record.finish());
            }
        }

        let record = record.finish();
        if record.degraded {
            log::warn!("No tool endpoint was reachable during iteration {}", iteration);
        }
        PhaseStep::Completed(record)
    }

    /// Invocations from the Execution output, else from the plan
    fn collect_invocations(output: &str, plan: Option<&str>) -> Vec<RawInvocation> {
        let found: Vec<RawInvocation> = extract_invocations(output).collect();
        if !found.is_empty() {
            return found;
        }
        match plan {
            Some(plan) => {
                let planned: Vec<RawInvocation> = extract_invocations(plan).collect();
                if !planned.is_empty() {
                    log::info!("Execution output had no commands; using {} from the plan", planned.len());
                }
                planned
            }
            None => found,
        }
    }

    fn normalize(&self, raw: RawInvocation) -> InvocationRecord {
        let normalized = self.normalizer.normalize(&raw);
        if let Err(rejection) = &normalized {
            log::warn!("Rejected '{}': {}", raw.name, rejection);
        }
        InvocationRecord {
            raw,
            normalized,
            outcome: None,
        }
    }

    /// Execute commands in written order; `false` when cancelled first
    async fn execute_all(&self, invocations: &mut [InvocationRecord], cancel: &CancellationToken) -> bool {
        for invocation in invocations.iter_mut() {
            let Ok(command) = &invocation.normalized else {
                continue;
            };
            if cancel.is_cancelled() {
                return false;
            }
            let outcome: Option<ExecutionOutcome> = tokio::select! {
                _ = cancel.cancelled() => None,
                outcome = self.executor.execute(command) => Some(outcome),
            };
            match outcome {
                Some(outcome) => {
                    log::info!("{} -> {:?} via {}", outcome.command, outcome.status, outcome.endpoint);
                    invocation.outcome = Some(outcome);
                }
                None => return false,
            }
        }
        true
    }

    /// Model call with timeout, retries and cancellation
    async fn generate(
        &self,
        config: &PhaseModelConfig,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<String, CallError> {
        let attempts = self.config.backend_attempts.max(1);
        let mut attempt = 1;
        loop {
            let call = tokio::time::timeout(self.config.backend_timeout, self.backend.generate(config, prompt));
            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(CallError::Cancelled),
                result = call => result,
            };
            let error = match result {
                Ok(Ok(text)) => return Ok(text),
                Ok(Err(e)) => e,
                Err(_) => BackendError::Timeout(self.config.backend_timeout),
            };

            if !error.is_retryable() || attempt >= attempts {
                return Err(CallError::Backend(error));
            }
            let backoff = self.config.retry_backoff * attempt;
            log::warn!(
                "{} call failed (attempt {}/{}): {}; retrying in {:?}",
                config.label,
                attempt,
                attempts,
                error,
                backoff
            );
            tokio::select! {
                _ = cancel.cancelled() => return Err(CallError::Cancelled),
                _ = tokio::time::sleep(backoff) => {}
            }
            attempt += 1;
        }
    }
}
