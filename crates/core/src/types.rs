//! Core type definitions for the AiSH turn pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classified category of one user utterance. Computed fresh every turn
/// from the utterance and the presence of a previous error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    SingleCommand,
    Question,
    ErrorRetry,
    AutonomousTask,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Intent::SingleCommand => "single_command",
            Intent::Question => "question",
            Intent::ErrorRetry => "error_retry",
            Intent::AutonomousTask => "autonomous_task",
        };
        f.write_str(name)
    }
}

/// Host snapshot captured once per turn and interpolated into prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemContext {
    pub os_name: String,
    pub os_version: String,
    pub cpu_count: usize,
    pub cpu_usage_percent: f32,
    pub total_memory_mb: u64,
    pub available_memory_mb: u64,
}

impl SystemContext {
    /// Single-line rendering used inside prompts.
    pub fn render(&self) -> String {
        format!(
            "OS: {} {} | CPU: {} cores @ {:.1}% | Memory: {} MB total, {} MB available",
            self.os_name,
            self.os_version,
            self.cpu_count,
            self.cpu_usage_percent,
            self.total_memory_mb,
            self.available_memory_mb
        )
    }
}

/// One completed turn as remembered by the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub user_input: String,
    pub intent: Intent,
    pub ai_response: String,
    /// `None` when nothing was executed (answers, autonomous tasks).
    pub execution_result: Option<String>,
}

/// One failed try inside a single recovery session. Never outlives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub command: String,
    pub error: String,
}

/// One executed step of an autonomous task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStep {
    pub command: String,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Output(String),
    Error(String),
}

/// Parsed meaning of one model response line. An unparseable line becomes
/// `Text` with the raw line, never a silent no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Command(String),
    Text(String),
}
