//! Top-level per-turn handling: classify, prompt, parse, execute, record.
//!
//! Exactly one history entry is appended per turn, including a whole
//! recovery session, and the history is re-bounded afterwards. All
//! failures are folded into the returned [`TurnOutcome`]; nothing escapes
//! as a fault and the engine never terminates the process.

use crate::intent::classify;
use crate::parser::{clean_first_line, parse_directive};
use crate::prompts::PromptFactory;
use crate::recovery::{ErrorRecovery, RecoveryOutcome, DEFAULT_MAX_RETRIES};
use crate::session::SessionState;
use crate::task_loop::{TaskLoop, TaskOutcome, DEFAULT_MAX_TASK_ERRORS};
use crate::traits::{CommandRunner, ModelClient};
use crate::types::{Directive, HistoryEntry, Intent, SystemContext};
use std::sync::Arc;
use tracing::{debug, warn};

/// Tunables threaded from configuration into the turn pipeline.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// History entries rendered into prompts, 0..=10.
    pub prev_cmds_limit: usize,
    /// Retry budget for one error-recovery session.
    pub max_error_retries: u32,
    /// Consecutive-failure bound inside an autonomous task.
    pub max_task_errors: u32,
    /// Optional hard ceiling on autonomous task steps; unbounded when unset.
    pub max_task_steps: Option<usize>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            prev_cmds_limit: 5,
            max_error_retries: DEFAULT_MAX_RETRIES,
            max_task_errors: DEFAULT_MAX_TASK_ERRORS,
            max_task_steps: None,
        }
    }
}

/// What the caller should show for one completed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnReply {
    /// A command ran (possibly after recovery) and produced output.
    Executed { command: String, output: String },
    /// A command ran and recovery could not save it.
    ExecutionFailed { command: String, error: String },
    /// Plain text from the model; nothing was executed.
    Answer(String),
    TaskCompleted(String),
    TaskFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub intent: Intent,
    pub reply: TurnReply,
}

pub struct TurnEngine<M, R> {
    model: Arc<M>,
    runner: Arc<R>,
    settings: EngineSettings,
}

impl<M, R> TurnEngine<M, R>
where
    M: ModelClient,
    R: CommandRunner,
{
    pub fn new(model: Arc<M>, runner: Arc<R>, settings: EngineSettings) -> Self {
        Self {
            model,
            runner,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Classify and handle one line of free-text input.
    pub async fn handle_input(
        &self,
        state: &mut SessionState,
        input: &str,
        context: &SystemContext,
    ) -> TurnOutcome {
        let intent = classify(input, state.last_error.as_deref());
        debug!("classified input as {}", intent);
        match intent {
            Intent::SingleCommand => self.handle_single_command(state, input, context).await,
            Intent::Question => self.handle_question(state, input, context).await,
            Intent::ErrorRetry => self.handle_error_retry(state, input, context).await,
            Intent::AutonomousTask => self.handle_autonomous_task(state, input, context).await,
        }
    }

    /// Run the error-recovery state machine for a command that already
    /// failed, updating `last_error`. Used by the raw-command path that
    /// bypasses classification; no history entry is recorded.
    pub async fn recover(
        &self,
        state: &mut SessionState,
        context: &SystemContext,
        command: &str,
        error: &str,
    ) -> RecoveryOutcome {
        let outcome = self
            .recovery()
            .run(command, context, &state.history, command, error)
            .await;
        match &outcome {
            RecoveryOutcome::Succeeded(_) => state.last_error = None,
            RecoveryOutcome::Failed(message) => state.last_error = Some(message.clone()),
        }
        outcome
    }

    fn recovery(&self) -> ErrorRecovery<M, R> {
        ErrorRecovery::new(
            self.model.clone(),
            self.runner.clone(),
            self.settings.max_error_retries,
            self.settings.prev_cmds_limit,
        )
    }

    /// Query the model and fold a gateway failure into a plain-text
    /// directive; the engine does not distinguish it from a declining
    /// answer.
    async fn query_directive(&self, prompt: &str) -> (String, Directive) {
        match self.model.query(prompt).await {
            Ok(raw) => (clean_first_line(&raw), parse_directive(&raw)),
            Err(e) => {
                warn!("model query failed: {}", e);
                let text = e.to_string();
                (text.clone(), Directive::Text(text))
            }
        }
    }

    async fn handle_single_command(
        &self,
        state: &mut SessionState,
        input: &str,
        context: &SystemContext,
    ) -> TurnOutcome {
        let prompt = PromptFactory::single_command(
            input,
            context,
            &state.history,
            self.settings.prev_cmds_limit,
        );
        let (line, directive) = self.query_directive(&prompt).await;

        let reply = match directive {
            Directive::Command(command) => match self.runner.run(&command).await {
                Ok(output) => {
                    state.last_error = None;
                    TurnReply::Executed { command, output }
                }
                Err(error) => {
                    match self
                        .recovery()
                        .run(input, context, &state.history, &command, &error.0)
                        .await
                    {
                        RecoveryOutcome::Succeeded(output) => {
                            state.last_error = None;
                            TurnReply::Executed { command, output }
                        }
                        RecoveryOutcome::Failed(final_error) => {
                            state.last_error = Some(final_error.clone());
                            TurnReply::ExecutionFailed {
                                command,
                                error: final_error,
                            }
                        }
                    }
                }
            },
            Directive::Text(text) => TurnReply::Answer(text),
        };

        record(state, input, Intent::SingleCommand, line, &reply);
        TurnOutcome {
            intent: Intent::SingleCommand,
            reply,
        }
    }

    async fn handle_question(
        &self,
        state: &mut SessionState,
        input: &str,
        context: &SystemContext,
    ) -> TurnOutcome {
        let prompt = PromptFactory::question(
            input,
            context,
            &state.history,
            self.settings.prev_cmds_limit,
        );
        // Questions never execute anything, whatever the model answers.
        let (line, _) = self.query_directive(&prompt).await;
        let reply = TurnReply::Answer(line.clone());

        record(state, input, Intent::Question, line, &reply);
        TurnOutcome {
            intent: Intent::Question,
            reply,
        }
    }

    async fn handle_error_retry(
        &self,
        state: &mut SessionState,
        input: &str,
        context: &SystemContext,
    ) -> TurnOutcome {
        let error = state.last_error.clone().unwrap_or_default();
        let prompt = PromptFactory::error_retry(
            input,
            context,
            &state.history,
            self.settings.prev_cmds_limit,
            &error,
            &[],
        );
        let (line, directive) = self.query_directive(&prompt).await;

        let reply = match directive {
            Directive::Command(command) => match self.runner.run(&command).await {
                Ok(output) => {
                    state.last_error = None;
                    TurnReply::Executed { command, output }
                }
                Err(error) => {
                    state.last_error = Some(error.0.clone());
                    TurnReply::ExecutionFailed {
                        command,
                        error: error.0,
                    }
                }
            },
            Directive::Text(text) => TurnReply::Answer(text),
        };

        record(state, input, Intent::ErrorRetry, line, &reply);
        TurnOutcome {
            intent: Intent::ErrorRetry,
            reply,
        }
    }

    async fn handle_autonomous_task(
        &self,
        state: &mut SessionState,
        input: &str,
        context: &SystemContext,
    ) -> TurnOutcome {
        let task_loop = TaskLoop::new(
            self.model.clone(),
            self.runner.clone(),
            self.settings.max_task_errors,
            self.settings.max_task_steps,
        );
        let (message, reply) = match task_loop.run(input, context).await {
            TaskOutcome::Completed(message) => {
                (message.clone(), TurnReply::TaskCompleted(message))
            }
            TaskOutcome::Failed(message) => (message.clone(), TurnReply::TaskFailed(message)),
        };

        record(state, input, Intent::AutonomousTask, message, &reply);
        TurnOutcome {
            intent: Intent::AutonomousTask,
            reply,
        }
    }
}

/// Append the single history entry for a completed turn. Task sub-steps
/// are never surfaced here, so autonomous turns carry no execution result.
fn record(
    state: &mut SessionState,
    input: &str,
    intent: Intent,
    ai_response: String,
    reply: &TurnReply,
) {
    let execution_result = match reply {
        TurnReply::Executed { output, .. } => Some(output.clone()),
        TurnReply::ExecutionFailed { error, .. } => Some(format!("Error: {}", error)),
        TurnReply::Answer(_) | TurnReply::TaskCompleted(_) | TurnReply::TaskFailed(_) => None,
    };
    state.history.record(HistoryEntry {
        user_input: input.to_string(),
        intent,
        ai_response,
        execution_result,
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::session::HISTORY_LIMIT;
    use crate::traits::{ExecError, ModelError};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedModel {
        responses: Mutex<VecDeque<Result<String, ModelError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(responses: Vec<Result<String, ModelError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn query(&self, prompt: &str) -> Result<String, ModelError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(ModelError::Backend {
                        backend: "mock".to_string(),
                        message: "script exhausted".to_string(),
                    })
                })
        }
    }

    struct ScriptedRunner {
        results: Mutex<VecDeque<Result<String, ExecError>>>,
    }

    impl ScriptedRunner {
        fn new(results: Vec<Result<String, ExecError>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
            }
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, _command: &str) -> Result<String, ExecError> {
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ExecError("script exhausted".to_string())))
        }
    }

    fn context() -> SystemContext {
        SystemContext {
            os_name: "Linux".to_string(),
            os_version: "6.8".to_string(),
            cpu_count: 4,
            cpu_usage_percent: 1.0,
            total_memory_mb: 8000,
            available_memory_mb: 4000,
        }
    }

    fn engine(
        responses: Vec<Result<String, ModelError>>,
        results: Vec<Result<String, ExecError>>,
    ) -> TurnEngine<ScriptedModel, ScriptedRunner> {
        TurnEngine::new(
            Arc::new(ScriptedModel::new(responses)),
            Arc::new(ScriptedRunner::new(results)),
            EngineSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_single_command_success() {
        let engine = engine(
            vec![Ok("CMD: 'echo hi'".to_string())],
            vec![Ok("hi\n".to_string())],
        );
        let mut state = SessionState::new();

        let outcome = engine.handle_input(&mut state, "say hi", &context()).await;

        assert_eq!(outcome.intent, Intent::SingleCommand);
        assert_eq!(
            outcome.reply,
            TurnReply::Executed {
                command: "echo hi".to_string(),
                output: "hi\n".to_string()
            }
        );
        assert_eq!(state.history.len(), 1);
        let entry = &state.history.entries()[0];
        assert_eq!(entry.ai_response, "CMD: 'echo hi'");
        assert_eq!(entry.execution_result.as_deref(), Some("hi\n"));
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn test_failed_recovery_records_one_entry() {
        // Initial command fails, the model's first retry answer is text, so
        // the whole recovery session fails: still exactly one history entry.
        let engine = engine(
            vec![
                Ok("CMD: 'cat gone'".to_string()),
                Ok("That file cannot be read".to_string()),
            ],
            vec![Err(ExecError("No such file".to_string()))],
        );
        let mut state = SessionState::new();

        let outcome = engine
            .handle_input(&mut state, "show gone", &context())
            .await;

        assert_eq!(
            outcome.reply,
            TurnReply::ExecutionFailed {
                command: "cat gone".to_string(),
                error: "That file cannot be read".to_string()
            }
        );
        assert_eq!(state.history.len(), 1);
        assert_eq!(
            state.history.entries()[0].execution_result.as_deref(),
            Some("Error: That file cannot be read")
        );
        assert_eq!(
            state.last_error.as_deref(),
            Some("That file cannot be read")
        );
    }

    #[tokio::test]
    async fn test_recovery_success_clears_last_error() {
        let engine = engine(
            vec![
                Ok("CMD: 'cat gone'".to_string()),
                Ok("CMD: 'cat ./gone'".to_string()),
            ],
            vec![
                Err(ExecError("No such file".to_string())),
                Ok("contents".to_string()),
            ],
        );
        let mut state = SessionState::new();

        let outcome = engine
            .handle_input(&mut state, "show gone", &context())
            .await;

        assert_eq!(
            outcome.reply,
            TurnReply::Executed {
                command: "cat gone".to_string(),
                output: "contents".to_string()
            }
        );
        assert!(state.last_error.is_none());
        assert_eq!(state.history.len(), 1);
    }

    #[tokio::test]
    async fn test_text_answer_records_no_execution_result() {
        let engine = engine(vec![Ok("Just use tab completion".to_string())], vec![]);
        let mut state = SessionState::new();

        let outcome = engine.handle_input(&mut state, "ls", &context()).await;

        assert_eq!(
            outcome.reply,
            TurnReply::Answer("Just use tab completion".to_string())
        );
        assert!(state.history.entries()[0].execution_result.is_none());
    }

    #[tokio::test]
    async fn test_question_leaves_last_error_untouched() {
        let engine = engine(vec![Ok("It is a kernel".to_string())], vec![]);
        let mut state = SessionState::new();
        state.last_error = Some("old error".to_string());

        let outcome = engine
            .handle_input(&mut state, "what is linux", &context())
            .await;

        assert_eq!(outcome.intent, Intent::Question);
        assert_eq!(outcome.reply, TurnReply::Answer("It is a kernel".to_string()));
        assert_eq!(state.last_error.as_deref(), Some("old error"));
    }

    #[tokio::test]
    async fn test_gateway_failure_becomes_an_answer() {
        let engine = engine(
            vec![Err(ModelError::Backend {
                backend: "groq".to_string(),
                message: "timeout".to_string(),
            })],
            vec![],
        );
        let mut state = SessionState::new();

        let outcome = engine.handle_input(&mut state, "ls", &context()).await;

        assert_eq!(outcome.reply, TurnReply::Answer("groq: timeout".to_string()));
        assert_eq!(state.history.len(), 1);
    }

    #[tokio::test]
    async fn test_error_retry_turn_executes_once_without_nested_recovery() {
        let engine = engine(
            vec![Ok("CMD: 'mount /dev/sda1'".to_string())],
            vec![Err(ExecError("permission denied".to_string()))],
        );
        let mut state = SessionState::new();
        state.last_error = Some("mount failed".to_string());

        let outcome = engine
            .handle_input(&mut state, "fix that mount", &context())
            .await;

        assert_eq!(outcome.intent, Intent::ErrorRetry);
        assert_eq!(
            outcome.reply,
            TurnReply::ExecutionFailed {
                command: "mount /dev/sda1".to_string(),
                error: "permission denied".to_string()
            }
        );
        assert_eq!(state.last_error.as_deref(), Some("permission denied"));
    }

    #[tokio::test]
    async fn test_autonomous_turn_records_message_without_result() {
        let engine = engine(vec![Ok("Task completed".to_string())], vec![]);
        let mut state = SessionState::new();

        let outcome = engine
            .handle_input(&mut state, "create a new project", &context())
            .await;

        assert_eq!(outcome.intent, Intent::AutonomousTask);
        assert_eq!(
            outcome.reply,
            TurnReply::TaskCompleted("Task completed".to_string())
        );
        let entry = &state.history.entries()[0];
        assert_eq!(entry.ai_response, "Task completed");
        assert!(entry.execution_result.is_none());
    }

    #[tokio::test]
    async fn test_history_stays_bounded_across_turns() {
        let responses: Vec<_> = (0..15).map(|n| Ok(format!("answer {}", n))).collect();
        let engine = engine(responses, vec![]);
        let mut state = SessionState::new();

        for _ in 0..15 {
            engine
                .handle_input(&mut state, "what is this", &context())
                .await;
        }
        assert_eq!(state.history.len(), HISTORY_LIMIT);
        assert_eq!(state.history.entries()[0].ai_response, "answer 5");
    }

    #[tokio::test]
    async fn test_raw_recover_updates_last_error() {
        let engine = engine(
            vec![Ok("CMD: 'mkdir -p /tmp/x'".to_string())],
            vec![Ok(String::new())],
        );
        let mut state = SessionState::new();

        let outcome = engine
            .recover(&mut state, &context(), "mkdir /tmp/x/y", "No such directory")
            .await;

        assert_eq!(outcome, RecoveryOutcome::Succeeded(String::new()));
        assert!(state.last_error.is_none());
        // The raw path records no history entry.
        assert!(state.history.is_empty());
    }
}
