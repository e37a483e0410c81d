//! Prompt construction for every intent variant.
//!
//! All turn-level variants share one preamble: identity, host snapshot,
//! recent dialogue, and the strict one-line output contract. The
//! autonomous-task prompt is a separate factory with its own contract.

use crate::session::SessionHistory;
use crate::types::{AttemptRecord, StepOutcome, SystemContext, TaskStep};

/// Execution results and step outputs are cut to this many characters
/// before being interpolated into a prompt.
pub const RESULT_PREVIEW_CHARS: usize = 100;

pub(crate) fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Render the last `limit` history entries as alternating dialogue lines.
pub fn format_history(history: &SessionHistory, limit: usize) -> String {
    let recent = history.recent(limit);
    if recent.is_empty() {
        return "No recent interactions.".to_string();
    }
    let mut lines = Vec::new();
    for entry in recent {
        lines.push(format!("User: {}", entry.user_input));
        lines.push(format!("AiSH: {}", entry.ai_response));
        if let Some(result) = &entry.execution_result {
            lines.push(format!(
                "Result: {}",
                truncate_chars(result, RESULT_PREVIEW_CHARS)
            ));
        }
    }
    lines.join("\n")
}

pub struct PromptFactory;

impl PromptFactory {
    fn base(context: &SystemContext, history: &SessionHistory, limit: usize) -> String {
        format!(
            "You are AiSH, an AI-driven shell assistant running on a real machine.\n\
             System Info: {}\n\
             Recent interactions:\n\
             {}\n\
             Instructions:\n\
             - Use system info and recent interactions to adapt commands and responses.\n\
             - Return exactly one line: either \"CMD: '<command>'\" for an executable command or plain text for answers.\n\
             - Do not include <think> tags, explanations, or multi-line responses.\n",
            context.render(),
            format_history(history, limit),
        )
    }

    /// Prompt asking the model to interpret the input as one shell command.
    pub fn single_command(
        user_input: &str,
        context: &SystemContext,
        history: &SessionHistory,
        limit: usize,
    ) -> String {
        format!(
            "{}Goal: Interpret the user input as a single shell command.\n\
             - Return exactly one line in the format: CMD: '<command>'\n\
             - Enclose the command in single quotes.\n\
             - Do not add any other text or extra lines.\n\
             - Pick the directory-listing tool that matches the OS ('ls' or 'dir') and honor the home directory (~) when asked.\n\
             User Input: {}\n",
            Self::base(context, history, limit),
            user_input
        )
    }

    /// Prompt asking for a concise textual answer, no command.
    pub fn question(
        user_input: &str,
        context: &SystemContext,
        history: &SessionHistory,
        limit: usize,
    ) -> String {
        format!(
            "{}Goal: Answer a question without executing a command.\n\
             User Input: {}\n\
             Provide a concise text response.",
            Self::base(context, history, limit),
            user_input
        )
    }

    /// Prompt asking for a corrected command after a failure. When
    /// `attempts` is non-empty the model sees every prior failed variant in
    /// order, not just the latest.
    pub fn error_retry(
        user_input: &str,
        context: &SystemContext,
        history: &SessionHistory,
        limit: usize,
        error: &str,
        attempts: &[AttemptRecord],
    ) -> String {
        let mut prompt = format!(
            "{}Goal: Retry a failed command.\n\
             Previous Error: '{}'\n\
             Original Input: {}\n",
            Self::base(context, history, limit),
            error,
            user_input
        );
        if !attempts.is_empty() {
            prompt.push_str("Previous attempts in this session:\n");
            for (n, attempt) in attempts.iter().enumerate() {
                prompt.push_str(&format!(
                    "{}. CMD: {} -> Error: {}\n",
                    n + 1,
                    attempt.command,
                    attempt.error
                ));
            }
        }
        prompt.push_str(
            "Analyze the error and return a corrected command in the format: CMD: '<corrected_command>'\n\
             - Enclose the command in single quotes.\n\
             - If you cannot correct the command, reply with an explanation without the CMD format.\n",
        );
        prompt
    }

    /// Separate factory for the autonomous task loop: evolving step history
    /// plus the `CMD:` / completion-sentinel contract. `user_input` is only
    /// non-empty on the first iteration.
    pub fn autonomous_task(
        user_input: &str,
        context: &SystemContext,
        last_error: Option<&str>,
        task: &str,
        steps: &[TaskStep],
    ) -> String {
        let mut prompt = format!(
            "You are AiSH, an AI-driven shell assistant running on a real machine. Your goal is to:\n\
             - Autonomously process tasks by breaking them into executable shell commands.\n\
             - Return exactly one line: either 'CMD: <command>' for the next step or 'Task completed' if done.\n\
             - Do not include explanations, multi-line responses, or invalid commands.\n\
             System Info: {}\n\
             Instructions:\n\
             - Use real shell commands (e.g., 'echo', 'ls', 'dir') that match the OS.\n\
             - Avoid simulation; every 'CMD:' must be executable.\n\
             - If a file or resource is missing, create it first.\n\
             - Progress the task step-by-step, one 'CMD:' at a time.\n",
            context.render()
        );
        if !steps.is_empty() {
            prompt.push_str("Completed Steps:\n");
            for (n, step) in steps.iter().enumerate() {
                prompt.push_str(&format!("{}. CMD: {}\n", n + 1, step.command));
                match &step.outcome {
                    StepOutcome::Output(output) => prompt.push_str(&format!(
                        "Output: {}\n",
                        truncate_chars(output, RESULT_PREVIEW_CHARS)
                    )),
                    StepOutcome::Error(error) => {
                        prompt.push_str(&format!("Error: {}\n", error))
                    }
                }
            }
        }
        if let Some(error) = last_error {
            prompt.push_str(&format!(
                "\nError Feedback:\n\
                 Last command failed: '{}'. Analyze the error and return the next 'CMD:' to fix it.\n",
                error
            ));
        }
        prompt.push_str(&format!(
            "\nCurrent Task: {}\n\
             Return exactly one line: 'CMD: <command>' or 'Task completed'.",
            task
        ));
        prompt.push_str(&format!("\nUser Input: {}", user_input));
        prompt
    }
}
