//! Bounded ReAct loop: ask the model, run the tool it names, feed back the
//! observation, until it answers or a bound is hit.
//!
//! Both bounds are cooperative. The iteration count and the elapsed time are
//! checked before every model call, and each model call or tool run is given
//! only the time that remains. Resolution and coverage sampling after the loop
//! are bounded by the backend client's own timeout, not by this budget.
//! Grammar failures end the loop as a tagged outcome, never an error; only
//! transport failures are returned as `Err`.

use std::time::Duration;
use tokio::time::Instant;

use super::prompt::{Prompt, FINAL_ANSWER_NUDGE};
use super::react::{self, AgentStep, ReactParseError};
use crate::config::EarlyStopping;
use crate::error::RouteError;
use crate::geo::{GeoBackend, Region};
use crate::llm::CompletionService;
use crate::tools::{Catalog, Invocation, InvocationRecorder, Tool};

pub const FORCED_STOP_ANSWER: &str = "Agent stopped due to iteration limit or time limit.";

#[derive(Debug, Clone)]
pub struct LoopLimits {
    pub max_iterations: usize,
    pub max_execution: Duration,
    pub early_stopping: EarlyStopping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    IterationLimit,
    TimeLimit,
}

/// How the loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopOutcome {
    /// The model gave a final answer.
    Finished { answer: String, raw: String },
    /// A bound was hit; `answer` is the best effort available.
    Stopped {
        reason: StopReason,
        answer: String,
        raw: String,
    },
    /// A model turn did not follow the grammar.
    Unparseable { raw: String, error: ReactParseError },
}

/// Everything one loop run produced.
#[derive(Debug, Clone)]
pub struct LoopReport {
    pub outcome: LoopOutcome,
    /// Capabilities that ran, in call order. The last one is trusted.
    pub invocations: Vec<Invocation>,
    /// Tool names the model asked for that the catalog does not offer.
    pub rejected_tools: Vec<String>,
    pub model_calls: usize,
}

/// Drives one routing call's conversation with the model.
pub struct ReactLoop<'a> {
    pub llm: &'a dyn CompletionService,
    pub backend: &'a dyn GeoBackend,
    pub catalog: &'a Catalog,
    pub limits: &'a LoopLimits,
    pub temperature: f32,
}

impl ReactLoop<'_> {
    pub async fn run(&self, prompt: &Prompt, region: &Region) -> Result<LoopReport, RouteError> {
        let started = Instant::now();
        let recorder = InvocationRecorder::new();
        let tools = self.catalog.bind(region, self.backend, &recorder);
        let tool_names = self.catalog.names().join(", ");

        let mut scratchpad = String::new();
        let mut rejected_tools = Vec::new();
        let mut model_calls = 0;
        let mut last_raw = String::new();

        let outcome = loop {
            if model_calls >= self.limits.max_iterations {
                log::warn!(
                    "ReactLoop: iteration limit ({}) reached",
                    self.limits.max_iterations
                );
                break self
                    .stop_early(prompt, &scratchpad, started, &mut model_calls, last_raw)
                    .await?;
            }

            let Some(remaining) = self.remaining(started) else {
                log::warn!("ReactLoop: time limit reached after {} call(s)", model_calls);
                break Self::forced(StopReason::TimeLimit, last_raw);
            };

            let request = prompt.request(&scratchpad, self.temperature);
            let raw = match tokio::time::timeout(remaining, self.llm.complete(request)).await {
                Ok(result) => result?,
                Err(_) => {
                    log::warn!("ReactLoop: model call cut off by time limit");
                    break Self::forced(StopReason::TimeLimit, last_raw);
                }
            };
            model_calls += 1;

            let step = match react::parse(&raw) {
                Ok(step) => step,
                Err(error) => {
                    log::warn!("ReactLoop: could not parse model output: {}", error);
                    break LoopOutcome::Unparseable { raw, error };
                }
            };

            match step {
                AgentStep::Finish { answer } => {
                    log::info!("ReactLoop: final answer after {} call(s)", model_calls);
                    break LoopOutcome::Finished { answer, raw };
                }
                AgentStep::Action { tool, input } => {
                    let observation = match tools.iter().find(|t| t.name() == tool) {
                        Some(bound) => {
                            let Some(remaining) = self.remaining(started) else {
                                log::warn!("ReactLoop: no time left to run {}", tool);
                                break Self::forced(StopReason::TimeLimit, raw);
                            };
                            let result = match tokio::time::timeout(remaining, bound.run(input))
                                .await
                            {
                                Ok(result) => result?,
                                Err(_) => {
                                    log::warn!("ReactLoop: {} cut off by time limit", tool);
                                    break Self::forced(StopReason::TimeLimit, raw);
                                }
                            };
                            format!(
                                "Computed the {} layer ({}) for the selected region.",
                                bound.capability.label, result.handle
                            )
                        }
                        None => {
                            log::warn!("ReactLoop: model asked for unknown tool {}", tool);
                            let observation = format!(
                                "{} is not a valid tool, try one of [{}].",
                                tool, tool_names
                            );
                            rejected_tools.push(tool);
                            observation
                        }
                    };

                    scratchpad.push_str(raw.trim_end());
                    scratchpad.push_str("\nObservation: ");
                    scratchpad.push_str(&observation);
                    scratchpad.push_str("\nThought:");
                    last_raw = raw;
                }
            }
        };

        drop(tools);
        Ok(LoopReport {
            outcome,
            invocations: recorder.into_invocations(),
            rejected_tools,
            model_calls,
        })
    }

    fn remaining(&self, started: Instant) -> Option<Duration> {
        self.limits
            .max_execution
            .checked_sub(started.elapsed())
            .filter(|d| !d.is_zero())
    }

    fn forced(reason: StopReason, raw: String) -> LoopOutcome {
        LoopOutcome::Stopped {
            reason,
            answer: FORCED_STOP_ANSWER.to_string(),
            raw,
        }
    }

    /// Iteration limit hit: optionally ask once more for a best-guess answer.
    async fn stop_early(
        &self,
        prompt: &Prompt,
        scratchpad: &str,
        started: Instant,
        model_calls: &mut usize,
        last_raw: String,
    ) -> Result<LoopOutcome, RouteError> {
        if self.limits.early_stopping == EarlyStopping::Force {
            return Ok(Self::forced(StopReason::IterationLimit, last_raw));
        }
        let Some(remaining) = self.remaining(started) else {
            return Ok(Self::forced(StopReason::TimeLimit, last_raw));
        };

        let nudged = format!("{}{}", scratchpad, FINAL_ANSWER_NUDGE);
        let request = prompt.request(&nudged, self.temperature);
        let raw = match tokio::time::timeout(remaining, self.llm.complete(request)).await {
            Ok(result) => result?,
            Err(_) => return Ok(Self::forced(StopReason::TimeLimit, last_raw)),
        };
        *model_calls += 1;

        let answer = react::final_answer(&raw).unwrap_or_else(|| raw.trim().to_string());
        Ok(LoopOutcome::Stopped {
            reason: StopReason::IterationLimit,
            answer,
            raw,
        })
    }
}
