use crate::traits::{ChatBackend, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

/// Local inference backend speaking the Ollama `/api/generate` protocol.
pub struct OllamaBackend {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));

        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Http(format!("failed to reach Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!("{}: {}", status, text)));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let content = json["response"]
            .as_str()
            .ok_or_else(|| ProviderError::Parse("no response field".to_string()))?;

        Ok(content.trim().to_string())
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_name_is_fixed() {
        let backend = OllamaBackend::new("http://localhost:11434", "llama3");
        assert_eq!(backend.name(), "ollama");
    }
}
