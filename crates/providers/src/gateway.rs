//! Backend selection with one-shot fallback.

use crate::traits::ChatBackend;
use aish_core::{ModelClient, ModelError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Routes prompts to the configured backend and consults the fallback
/// backend exactly once when the primary fails. Both failing surfaces the
/// fallback's error.
pub struct ModelGateway {
    backends: HashMap<String, Arc<dyn ChatBackend>>,
    current: String,
    fallback: Option<String>,
}

impl ModelGateway {
    pub fn new(current: impl Into<String>, fallback: Option<String>) -> Self {
        Self {
            backends: HashMap::new(),
            current: current.into(),
            fallback,
        }
    }

    /// Register a backend under its own name.
    pub fn register(&mut self, backend: Arc<dyn ChatBackend>) {
        self.backends.insert(backend.name().to_string(), backend);
    }

    pub fn current_backend(&self) -> &str {
        &self.current
    }

    async fn complete_with(&self, name: &str, prompt: &str) -> Result<String, ModelError> {
        let backend = self
            .backends
            .get(name)
            .ok_or_else(|| ModelError::UnknownBackend(name.to_string()))?;
        backend
            .complete(prompt)
            .await
            .map_err(|e| ModelError::Backend {
                backend: name.to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl ModelClient for ModelGateway {
    async fn query(&self, prompt: &str) -> Result<String, ModelError> {
        debug!("querying backend '{}'", self.current);
        match self.complete_with(&self.current, prompt).await {
            Ok(text) => Ok(text),
            Err(primary_error) => {
                let fallback = self
                    .fallback
                    .as_deref()
                    .filter(|name| *name != self.current);
                match fallback {
                    Some(name) => {
                        warn!(
                            "backend '{}' failed ({}), trying fallback '{}'",
                            self.current, primary_error, name
                        );
                        self.complete_with(name, prompt).await
                    }
                    None => Err(primary_error),
                }
            }
        }
    }
}
