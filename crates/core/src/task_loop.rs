//! Autonomous multi-step task execution.
//!
//! Unlike the recovery loop there is no fixed attempt cap: the loop keeps
//! going while the model makes forward progress, and only consecutive
//! execution failures are bounded. An optional total-step bound can be
//! configured for callers that want a hard ceiling.

use crate::parser::{parse_task_response, TaskResponse, TASK_COMPLETED_SENTINEL};
use crate::prompts::PromptFactory;
use crate::traits::{CommandRunner, ModelClient};
use crate::types::{StepOutcome, SystemContext, TaskStep};
use std::sync::Arc;
use tracing::{info, warn};

/// Consecutive-failure bound for one task.
pub const DEFAULT_MAX_TASK_ERRORS: u32 = 3;

/// Terminal result of one autonomous task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed(String),
    Failed(String),
}

pub struct TaskLoop<M, R> {
    model: Arc<M>,
    runner: Arc<R>,
    max_consecutive_errors: u32,
    max_steps: Option<usize>,
}

impl<M, R> TaskLoop<M, R>
where
    M: ModelClient,
    R: CommandRunner,
{
    pub fn new(
        model: Arc<M>,
        runner: Arc<R>,
        max_consecutive_errors: u32,
        max_steps: Option<usize>,
    ) -> Self {
        Self {
            model,
            runner,
            max_consecutive_errors,
            max_steps,
        }
    }

    /// Run the task until the model signals completion, a fatal response
    /// arrives, the consecutive-failure bound trips, or the optional step
    /// bound is hit.
    pub async fn run(&self, task: &str, context: &SystemContext) -> TaskOutcome {
        let mut steps: Vec<TaskStep> = Vec::new();
        let mut consecutive_errors: u32 = 0;
        let mut last_error: Option<String> = None;

        info!("starting task: {}", task);
        loop {
            if let Some(bound) = self.max_steps {
                if steps.len() >= bound {
                    warn!("task step bound of {} reached", bound);
                    return TaskOutcome::Failed(format!("Task aborted after {} steps", bound));
                }
            }

            let user_input = if steps.is_empty() { task } else { "" };
            let prompt = PromptFactory::autonomous_task(
                user_input,
                context,
                last_error.as_deref(),
                task,
                &steps,
            );
            let raw = match self.model.query(&prompt).await {
                Ok(raw) => raw,
                Err(e) => return TaskOutcome::Failed(format!("Error: {}", e)),
            };

            match parse_task_response(&raw) {
                TaskResponse::Fatal(line) => {
                    warn!("model reported fatal error: {}", line);
                    return TaskOutcome::Failed(line);
                }
                TaskResponse::Completed => {
                    info!("task completed after {} steps", steps.len());
                    return TaskOutcome::Completed(TASK_COMPLETED_SENTINEL.to_string());
                }
                TaskResponse::Command(command) => {
                    info!("task step {}: {}", steps.len() + 1, command);
                    match self.runner.run(&command).await {
                        Ok(output) => {
                            steps.push(TaskStep {
                                command,
                                outcome: StepOutcome::Output(output),
                            });
                            consecutive_errors = 0;
                            last_error = None;
                        }
                        Err(error) => {
                            warn!("task step failed: {}", error);
                            consecutive_errors += 1;
                            last_error = Some(error.0.clone());
                            steps.push(TaskStep {
                                command,
                                outcome: StepOutcome::Error(error.0),
                            });
                            if consecutive_errors >= self.max_consecutive_errors {
                                return TaskOutcome::Failed(format!(
                                    "Task failed after {} retries",
                                    self.max_consecutive_errors
                                ));
                            }
                        }
                    }
                }
                TaskResponse::Unexpected(line) => {
                    return TaskOutcome::Failed(format!("Unexpected response: {}", line));
                }
            }
        }
    }
}
