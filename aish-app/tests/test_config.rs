use aish_app::config::{Config, Mode, PromptTheme};

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.assistant.prev_cmds_limit, 5);
    assert_eq!(config.assistant.error_retries, 3);
    assert_eq!(config.assistant.mode, Mode::Online);
    assert_eq!(config.assistant.prompt_theme, PromptTheme::Default);
    assert!(config.assistant.max_task_steps.is_none());
    assert_eq!(config.online.current, "groq");
    assert_eq!(config.online.fallback.as_deref(), Some("gemini"));
    assert!(config.online.apis.contains_key("openrouter"));
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_yaml_fills_in_defaults() {
    let yaml = r#"
assistant:
  mode: offline
  prev_cmds_limit: 2
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.assistant.mode, Mode::Offline);
    assert_eq!(config.assistant.prev_cmds_limit, 2);
    // Untouched sections keep their defaults.
    assert_eq!(config.assistant.error_retries, 3);
    assert_eq!(config.online.current, "groq");
    assert_eq!(config.offline.base_url, "http://localhost:11434");
}

#[test]
fn test_backend_table_parsing() {
    let yaml = r#"
online:
  current: openrouter
  fallback: groq
  apis:
    groq:
      base_url: https://api.groq.com/openai/v1
      api_key: gsk-test
      model: llama-3.3-70b-versatile
    openrouter:
      base_url: https://openrouter.ai/api/v1
      api_key: sk-or-test
      model: qwen/qwen-2.5-72b
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.online.current, "openrouter");
    let api = &config.online.apis["openrouter"];
    assert_eq!(api.api_key, "sk-or-test");
    assert_eq!(api.model, "qwen/qwen-2.5-72b");
    assert!(config.validate().is_ok());
}

#[test]
fn test_validation_rejects_out_of_range_limit() {
    let mut config = Config::default();
    config.assistant.prev_cmds_limit = 11;
    assert!(config.validate().is_err());
}

#[test]
fn test_validation_rejects_unknown_backends() {
    let mut config = Config::default();
    config.online.current = "nope".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.online.fallback = Some("nope".to_string());
    assert!(config.validate().is_err());
}

#[test]
fn test_engine_settings_mirror_config() {
    let mut config = Config::default();
    config.assistant.prev_cmds_limit = 3;
    config.assistant.error_retries = 5;
    config.assistant.max_task_steps = Some(40);

    let settings = config.engine_settings();
    assert_eq!(settings.prev_cmds_limit, 3);
    assert_eq!(settings.max_error_retries, 5);
    assert_eq!(settings.max_task_steps, Some(40));
}

#[test]
fn test_yaml_round_trip() {
    let mut config = Config::default();
    config.assistant.prompt_theme = PromptTheme::Mood;
    config.assistant.max_task_steps = Some(25);
    config.online.current = "openrouter".to_string();

    let yaml = serde_yaml::to_string(&config).unwrap();
    let loaded: Config = serde_yaml::from_str(&yaml).unwrap();

    assert_eq!(loaded.assistant.prompt_theme, PromptTheme::Mood);
    assert_eq!(loaded.assistant.max_task_steps, Some(25));
    assert_eq!(loaded.online.current, "openrouter");
}

#[test]
fn test_load_creates_default_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("aish.yaml");
    std::env::set_var("AISH_CONFIG", &path);

    assert!(!Config::exists());
    let config = Config::load().unwrap();
    assert!(path.exists());
    assert_eq!(config.online.current, "groq");

    // A second load reads the file that was just written.
    let reloaded = Config::load().unwrap();
    assert_eq!(reloaded.online.current, "groq");

    std::env::remove_var("AISH_CONFIG");
}
