//! Model backends and the gateway with fallback routing.

mod gateway;
mod ollama;
mod openai_compatible;
mod traits;

pub use gateway::ModelGateway;
pub use ollama::OllamaBackend;
pub use openai_compatible::OpenAiCompatibleBackend;
pub use traits::{ChatBackend, ProviderError};
