//! AiSH core: intent classification, prompt construction, directive
//! parsing, and the retry/task orchestration state machines.
//!
//! Collaborators (model backends, the shell executor) are reached through
//! the [`traits`] seams; everything here is deterministic given those.

pub mod intent;
pub mod parser;
pub mod prompts;
pub mod recovery;
pub mod session;
pub mod task_loop;
pub mod traits;
pub mod turn;
pub mod types;

pub use intent::classify;
pub use parser::{
    clean_first_line, parse_directive, parse_task_response, strip_think_blocks, TaskResponse,
    TASK_COMPLETED_SENTINEL,
};
pub use prompts::{format_history, PromptFactory, RESULT_PREVIEW_CHARS};
pub use recovery::{ErrorRecovery, RecoveryOutcome, DEFAULT_MAX_RETRIES};
pub use session::{SessionHistory, SessionState, HISTORY_LIMIT};
pub use task_loop::{TaskLoop, TaskOutcome, DEFAULT_MAX_TASK_ERRORS};
pub use traits::{CommandRunner, ExecError, ModelClient, ModelError};
pub use turn::{EngineSettings, TurnEngine, TurnOutcome, TurnReply};
pub use types::{
    AttemptRecord, Directive, HistoryEntry, Intent, StepOutcome, SystemContext, TaskStep,
};
