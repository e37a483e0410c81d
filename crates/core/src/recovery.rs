//! Error-recovery state machine for failed commands.
//!
//! An explicit bounded loop rather than recursion: each iteration feeds the
//! model the full ordered list of failed attempts, executes the suggested
//! fix, and either finishes or continues with a decremented budget. A
//! corrected command consumes the original budget; it never opens a fresh
//! one.

use crate::parser::parse_directive;
use crate::prompts::PromptFactory;
use crate::session::SessionHistory;
use crate::traits::{CommandRunner, ModelClient};
use crate::types::{AttemptRecord, Directive, SystemContext};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default retry budget for one recovery session.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Terminal result of one recovery session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    Succeeded(String),
    Failed(String),
}

pub struct ErrorRecovery<M, R> {
    model: Arc<M>,
    runner: Arc<R>,
    max_retries: u32,
    prev_cmds_limit: usize,
}

impl<M, R> ErrorRecovery<M, R>
where
    M: ModelClient,
    R: CommandRunner,
{
    pub fn new(model: Arc<M>, runner: Arc<R>, max_retries: u32, prev_cmds_limit: usize) -> Self {
        Self {
            model,
            runner,
            max_retries,
            prev_cmds_limit,
        }
    }

    /// Drive the retry loop for a command that already failed once.
    ///
    /// Terminates on the first successful execution, on an exhausted
    /// budget, or as soon as the model answers with text instead of a
    /// command.
    pub async fn run(
        &self,
        user_input: &str,
        context: &SystemContext,
        history: &SessionHistory,
        command: &str,
        error: &str,
    ) -> RecoveryOutcome {
        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut command = command.to_string();
        let mut error = error.to_string();
        let mut remaining = self.max_retries;

        loop {
            if remaining == 0 {
                warn!("recovery budget exhausted for '{}'", command);
                return RecoveryOutcome::Failed(error);
            }
            info!("retrying after error: {} (retries left: {})", error, remaining);
            attempts.push(AttemptRecord {
                command: command.clone(),
                error: error.clone(),
            });

            let prompt = PromptFactory::error_retry(
                user_input,
                context,
                history,
                self.prev_cmds_limit,
                &error,
                &attempts,
            );
            let raw = match self.model.query(&prompt).await {
                Ok(raw) => raw,
                Err(e) => return RecoveryOutcome::Failed(e.to_string()),
            };
            match parse_directive(&raw) {
                Directive::Text(explanation) => {
                    debug!("model declined to produce a fix");
                    return RecoveryOutcome::Failed(explanation);
                }
                Directive::Command(fixed) => {
                    info!("model suggested fix: {}", fixed);
                    match self.runner.run(&fixed).await {
                        Ok(output) => return RecoveryOutcome::Succeeded(output),
                        Err(new_error) => {
                            command = fixed;
                            error = new_error.0;
                            remaining -= 1;
                        }
                    }
                }
            }
        }
    }
}
