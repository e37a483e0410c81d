//! Abstract seams between the turn pipeline and its collaborators.
//!
//! The orchestrators only ever see these traits, so they can be exercised
//! with scripted mocks and wired to the real gateway and shell executor by
//! the application.

use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by the model gateway after fallback handling.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("{backend}: {message}")]
    Backend { backend: String, message: String },

    #[error("unknown backend: {0}")]
    UnknownBackend(String),
}

/// A failed command execution; carries the captured stderr text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ExecError(pub String);

/// Something that turns a prompt into raw model text.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn query(&self, prompt: &str) -> Result<String, ModelError>;
}

/// Something that runs one shell command line synchronously from the
/// caller's point of view: stdout on success, stderr on failure.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> Result<String, ExecError>;
}
