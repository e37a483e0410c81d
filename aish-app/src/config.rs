//! YAML configuration, created with defaults on first run.
//!
//! Lives at `$AISH_CONFIG`, falling back to `~/.aish.yaml`. Unknown keys
//! are tolerated and missing keys take their defaults, so the file
//! survives upgrades. API keys are stored as plain strings.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub assistant: AssistantConfig,
    pub online: OnlineConfig,
    pub offline: OfflineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// History entries rendered into prompts, 0..=10.
    pub prev_cmds_limit: usize,
    pub prompt_theme: PromptTheme,
    pub mode: Mode,
    /// Retry budget for one error-recovery session.
    pub error_retries: u32,
    /// Optional hard ceiling on autonomous task steps.
    pub max_task_steps: Option<usize>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            prev_cmds_limit: 5,
            prompt_theme: PromptTheme::Default,
            mode: Mode::Online,
            error_retries: 3,
            max_task_steps: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptTheme {
    Default,
    Pwd,
    Mood,
}

impl PromptTheme {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::Default),
            "pwd" => Some(Self::Pwd),
            "mood" => Some(Self::Mood),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Online,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OnlineConfig {
    pub current: String,
    pub fallback: Option<String>,
    pub apis: BTreeMap<String, ApiConfig>,
}

impl Default for OnlineConfig {
    fn default() -> Self {
        let mut apis = BTreeMap::new();
        apis.insert(
            "groq".to_string(),
            ApiConfig {
                base_url: "https://api.groq.com/openai/v1".to_string(),
                api_key: String::new(),
                model: "llama-3.3-70b-versatile".to_string(),
            },
        );
        apis.insert(
            "gemini".to_string(),
            ApiConfig {
                base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
                api_key: String::new(),
                model: "gemini-2.0-flash".to_string(),
            },
        );
        apis.insert(
            "openrouter".to_string(),
            ApiConfig {
                base_url: "https://openrouter.ai/api/v1".to_string(),
                api_key: String::new(),
                model: String::new(),
            },
        );
        Self {
            current: "groq".to_string(),
            fallback: Some("gemini".to_string()),
            apis,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineConfig {
    pub base_url: String,
    pub model: String,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
        }
    }
}

impl Config {
    pub fn path() -> PathBuf {
        if let Ok(custom) = std::env::var("AISH_CONFIG") {
            return PathBuf::from(custom);
        }
        match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(".aish.yaml"),
            None => PathBuf::from(".aish.yaml"),
        }
    }

    pub fn exists() -> bool {
        Self::path().exists()
    }

    /// Load the config, writing defaults to disk on first run.
    pub fn load() -> Result<Self> {
        let path = Self::path();
        if !path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::path();
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.assistant.prev_cmds_limit > 10 {
            bail!("prev_cmds_limit must be between 0 and 10");
        }
        if !self.online.apis.contains_key(&self.online.current) {
            bail!("current backend '{}' is not configured", self.online.current);
        }
        if let Some(fallback) = &self.online.fallback {
            if !self.online.apis.contains_key(fallback) {
                bail!("fallback backend '{}' is not configured", fallback);
            }
        }
        Ok(())
    }

    pub fn engine_settings(&self) -> aish_core::EngineSettings {
        aish_core::EngineSettings {
            prev_cmds_limit: self.assistant.prev_cmds_limit.min(10),
            max_error_retries: self.assistant.error_retries,
            max_task_errors: aish_core::DEFAULT_MAX_TASK_ERRORS,
            max_task_steps: self.assistant.max_task_steps,
        }
    }
}
