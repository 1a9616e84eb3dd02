//! Collector: drives the fixed-order question sequence and performs the
//! single terminal dispatch to the analysis pipeline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info};

use crate::error::DispatchError;
use crate::pipeline::signal::extract_recommendation;
use crate::pipeline::types::{AnalysisConfig, DispatchRequest, PipelineResult, PipelineRunner};

use super::prompts::{error_message, opening_prompt, reprompt, success_message, TERMINATED_MESSAGE};
use super::state::{ConversationState, Phase, Selections};

/// Default upper bound on a single pipeline run.
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(600);

fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Walks a [`ConversationState`] through every slot and dispatches once.
///
/// The collector holds no per-conversation data, so one instance can be
/// shared (behind an `Arc`) by any number of sessions, each owning its own
/// state.
pub struct Collector {
    runner: Arc<dyn PipelineRunner>,
    base_config: AnalysisConfig,
    dispatch_timeout: Duration,
    today: fn() -> NaiveDate,
}

impl Collector {
    pub fn new(runner: Arc<dyn PipelineRunner>, base_config: AnalysisConfig) -> Self {
        Self {
            runner,
            base_config,
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
            today: local_today,
        }
    }

    /// Set the dispatch timeout.
    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }

    /// Replace the clock used to resolve "today".
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn runner_name(&self) -> &str {
        self.runner.name()
    }

    /// Text to show when a session starts.
    pub fn opening_prompt(&self) -> String {
        opening_prompt()
    }

    /// Handle one user turn and return the reply.
    ///
    /// Never fails: rejected answers re-prompt the same slot, pipeline
    /// failures become an error reply, and input after the conversation is
    /// over gets a fixed message without touching the state.
    pub async fn submit_answer(&self, state: &mut ConversationState, raw: &str) -> String {
        let slot = match state.phase() {
            Phase::Terminated => {
                debug!("Input received after conversation ended");
                return TERMINATED_MESSAGE.to_string();
            }
            // Only reachable with a state restored from a snapshot taken
            // between the last answer and dispatch.
            Phase::Dispatching => {
                let reply = self.dispatch(state.selections()).await;
                state.terminate();
                return reply;
            }
            Phase::Step(slot) => slot,
        };

        let answer = match slot.parse(raw, (self.today)()) {
            Ok(answer) => answer,
            Err(e) => {
                debug!(%slot, error = %e, "Answer rejected, re-prompting");
                return reprompt(slot, &e);
            }
        };

        debug!(%slot, ?answer, "Answer accepted");
        state.accept(answer);

        match state.current_slot() {
            Some(next) => next.prompt().to_string(),
            None => {
                let reply = self.dispatch(state.selections()).await;
                state.terminate();
                reply
            }
        }
    }

    /// Build the merged config, run the pipeline once, and format the reply.
    async fn dispatch(&self, selections: &Selections) -> String {
        let completed = match selections.complete() {
            Ok(c) => c,
            Err(missing) => {
                return error_message(&DispatchError::Incomplete(missing.to_string()));
            }
        };

        let request = DispatchRequest {
            config: self.base_config.with_selections(
                completed.research_depth,
                &completed.quick_model,
                &completed.deep_model,
            ),
            analysts: completed.analysts,
            ticker: completed.ticker,
            analysis_date: completed.analysis_date,
        };

        info!(
            ticker = %request.ticker,
            date = %request.analysis_date,
            analysts = ?request.analysts,
            depth = completed.research_depth,
            runner = self.runner.name(),
            "Dispatching analysis"
        );

        let started = Instant::now();
        let outcome = self.run_contained(&request).await;

        match outcome {
            Ok(result) => {
                let recommendation = match result.recommendation.trim() {
                    "" => extract_recommendation(&result.raw_decision),
                    label => label.to_string(),
                };
                info!(
                    ticker = %request.ticker,
                    recommendation = %recommendation,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Analysis complete"
                );
                success_message(&request.ticker, &result.raw_decision, &recommendation)
            }
            Err(e) => {
                error!(
                    ticker = %request.ticker,
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Analysis failed"
                );
                error_message(&e)
            }
        }
    }

    /// Run the pipeline on its own task so a panicking runner becomes a
    /// dispatch error. Dropping the set on timeout or cancellation aborts
    /// the task.
    async fn run_contained(&self, request: &DispatchRequest) -> Result<PipelineResult, DispatchError> {
        let runner = Arc::clone(&self.runner);
        let job = request.clone();
        let mut tasks = JoinSet::new();
        tasks.spawn(async move { runner.run(&job).await });

        match tokio::time::timeout(self.dispatch_timeout, tasks.join_next()).await {
            Ok(Some(Ok(outcome))) => outcome,
            Ok(Some(Err(e))) => Err(DispatchError::Failed {
                runner: self.runner.name().to_string(),
                reason: join_failure(e),
            }),
            Ok(None) => Err(DispatchError::Failed {
                runner: self.runner.name().to_string(),
                reason: "task vanished before completing".to_string(),
            }),
            Err(_) => Err(DispatchError::TimedOut {
                timeout: self.dispatch_timeout,
            }),
        }
    }
}

fn join_failure(e: JoinError) -> String {
    if !e.is_panic() {
        return e.to_string();
    }
    let payload = e.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("panicked: {message}")
}
