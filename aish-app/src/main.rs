//! AiSH interactive shell entry point.

use aish_app::config::{Config, Mode, PromptTheme};
use aish_core::{
    CommandRunner, RecoveryOutcome, SessionState, SystemContext, TurnEngine, TurnOutcome,
    TurnReply,
};
use aish_executor::ShellExecutor;
use aish_providers::{ModelGateway, OllamaBackend, OpenAiCompatibleBackend};
use anyhow::Result;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

type Engine = TurnEngine<ModelGateway, ShellExecutor>;

enum SlashAction {
    Continue,
    Exit,
    /// Configuration changed in a way that affects the gateway or engine.
    ReloadEngine,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut config = Config::load()?;
    let runner = Arc::new(ShellExecutor::new());
    let mut engine = build_engine(&config, runner.clone());
    let mut state = SessionState::new();
    let mut verbose = false;

    print_banner(&aish_executor::capture_context());

    loop {
        print!("{}", prompt_text(&config, &state));
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            // EOF (Ctrl+D); an interrupt at this wait simply kills the
            // process, abandoning nothing but the input read.
            println!();
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix('/') {
            match handle_slash_command(command.trim(), &mut config, &mut verbose) {
                SlashAction::Continue => {}
                SlashAction::Exit => break,
                SlashAction::ReloadEngine => engine = build_engine(&config, runner.clone()),
            }
            continue;
        }

        if let Some(raw) = input.strip_prefix('!') {
            run_raw_command(raw.trim(), &engine, runner.as_ref(), &mut state, verbose).await;
            continue;
        }

        let context = aish_executor::capture_context();
        let outcome = engine.handle_input(&mut state, input, &context).await;
        render_outcome(&outcome, verbose);
    }

    println!("🛑 Exiting AiSH...");
    Ok(())
}

fn build_engine(config: &Config, runner: Arc<ShellExecutor>) -> Engine {
    TurnEngine::new(
        Arc::new(build_gateway(config)),
        runner,
        config.engine_settings(),
    )
}

fn build_gateway(config: &Config) -> ModelGateway {
    match config.assistant.mode {
        Mode::Offline => {
            let mut gateway = ModelGateway::new("ollama", None);
            gateway.register(Arc::new(OllamaBackend::new(
                config.offline.base_url.clone(),
                config.offline.model.clone(),
            )));
            gateway
        }
        Mode::Online => {
            let mut gateway = ModelGateway::new(
                config.online.current.clone(),
                config.online.fallback.clone(),
            );
            for (name, api) in &config.online.apis {
                let api_key = if api.api_key.is_empty() {
                    None
                } else {
                    Some(api.api_key.clone())
                };
                gateway.register(Arc::new(OpenAiCompatibleBackend::new(
                    name.clone(),
                    api.base_url.clone(),
                    api_key,
                    api.model.clone(),
                )));
            }
            gateway
        }
    }
}

async fn run_raw_command(
    raw: &str,
    engine: &Engine,
    runner: &ShellExecutor,
    state: &mut SessionState,
    verbose: bool,
) {
    let mut parts = raw.split_whitespace();
    if parts.next() == Some("cd") {
        // cd must change this process's directory, not a child shell's.
        let rest: Vec<&str> = parts.collect();
        let target = match rest.as_slice() {
            [] => std::env::var("HOME").unwrap_or_else(|_| "/".to_string()),
            [dir] => (*dir).to_string(),
            _ => {
                let message = "cd: too many arguments".to_string();
                eprintln!("❌ {}", message);
                state.last_error = Some(message);
                return;
            }
        };
        match std::env::set_current_dir(&target) {
            Ok(()) => state.last_error = None,
            Err(e) => {
                let message = format!("cd: {}", e);
                eprintln!("❌ {}", message);
                state.last_error = Some(message);
            }
        }
        return;
    }

    if verbose {
        println!("📢 Executing: {}", raw);
    }
    match runner.run(raw).await {
        Ok(output) => {
            println!("{}", output.trim_end());
            state.last_error = None;
        }
        Err(error) => {
            let context = aish_executor::capture_context();
            match engine.recover(state, &context, raw, &error.0).await {
                RecoveryOutcome::Succeeded(output) => println!("{}", output.trim_end()),
                RecoveryOutcome::Failed(message) => eprintln!("❌ Error: {}", message),
            }
        }
    }
}

fn render_outcome(outcome: &TurnOutcome, verbose: bool) {
    if verbose {
        println!("[intent: {}]", outcome.intent);
    }
    match &outcome.reply {
        TurnReply::Executed { command, output } => {
            if verbose {
                println!("📢 Executed: {}", command);
            }
            println!("{}", output.trim_end());
        }
        TurnReply::ExecutionFailed { command, error } => {
            if verbose {
                println!("📢 Executed: {}", command);
            }
            eprintln!("❌ Error: {}", error);
        }
        TurnReply::Answer(text) => println!("ℹ️  {}", text),
        TurnReply::TaskCompleted(message) => println!("✅ {}", message),
        TurnReply::TaskFailed(message) => eprintln!("❌ {}", message),
    }
}

fn prompt_text(config: &Config, state: &SessionState) -> String {
    match config.assistant.prompt_theme {
        PromptTheme::Default => "AiSH> ".to_string(),
        PromptTheme::Pwd => {
            let cwd = std::env::current_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "?".to_string());
            format!("AiSH {}> ", cwd)
        }
        PromptTheme::Mood => {
            if state.last_error.is_none() {
                "AiSH 😊> ".to_string()
            } else {
                "AiSH 😞> ".to_string()
            }
        }
    }
}

fn print_banner(context: &SystemContext) {
    println!("╔═╗┬╔═╗╦ ╦");
    println!("╠═╣│╚═╗╠═╣");
    println!("╩ ╩┴╚═╝╩ ╩");
    println!("=== 🌟 AiSH v{} ===", env!("CARGO_PKG_VERSION"));
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    let cwd = std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "?".to_string());
    println!("💻 OS   : {} {}", context.os_name, context.os_version);
    println!(
        "⚙️  CPU  : {} cores @ {:.1}%",
        context.cpu_count, context.cpu_usage_percent
    );
    println!(
        "📦 RAM  : {} MB total, {} MB free",
        context.total_memory_mb, context.available_memory_mb
    );
    println!("🖥️  User : {}", user);
    println!("📂 Dir  : {}", cwd);
    println!("⏰ Time : {}", chrono::Local::now().format("%H:%M:%S"));
    println!("Type '/help' for commands. '!cmd' runs a raw shell command. Ctrl+C exits.");
    println!();
}

fn print_help(verbose: bool) {
    println!("AiSH Commands:");
    println!("/help or /h      - Show this help");
    println!("/verbose or /v   - Toggle verbose mode (current: {})", verbose);
    println!("/config or /c    - Configure settings (api, prev_cmds, mode)");
    println!("/prompt [theme]  - Set prompt theme (default, pwd, mood)");
    println!("/exit or /e      - Exit AiSH");
    println!("!cmd             - Execute raw shell command");
    println!("Ctrl+C           - Exit");
}

fn print_config(config: &Config) {
    let mode = match config.assistant.mode {
        Mode::Online => "online",
        Mode::Offline => "offline",
    };
    println!("Mode: {}", mode);
    println!("Current API: {}", config.online.current);
    println!(
        "Fallback API: {}",
        config.online.fallback.as_deref().unwrap_or("none")
    );
    let apis: Vec<&str> = config.online.apis.keys().map(String::as_str).collect();
    println!("Available APIs: {}", apis.join(", "));
    println!("Previous commands in prompts: {}", config.assistant.prev_cmds_limit);
    println!("Error retries: {}", config.assistant.error_retries);
    println!();
    println!("Usage:");
    println!("  /config api current <api_name>");
    println!("  /config api fallback <api_name>");
    println!("  /config api edit <api_name> <key|model> <value>");
    println!("  /config prev_cmds <0-10>");
    println!("  /config mode <online|offline>");
}

fn save_config(config: &Config) {
    if let Err(e) = config.save() {
        eprintln!("❌ Failed to save configuration: {}", e);
    }
}

fn handle_slash_command(command: &str, config: &mut Config, verbose: &mut bool) -> SlashAction {
    let parts: Vec<&str> = command.split_whitespace().collect();
    match parts.as_slice() {
        [] | ["help"] | ["h"] => {
            print_help(*verbose);
            SlashAction::Continue
        }
        ["verbose"] | ["v"] => {
            *verbose = !*verbose;
            println!("Verbose mode: {}", verbose);
            SlashAction::Continue
        }
        ["exit"] | ["e"] | ["quit"] => SlashAction::Exit,
        ["prompt"] => {
            println!("Usage: /prompt <default|pwd|mood>");
            SlashAction::Continue
        }
        ["prompt", theme] => {
            match PromptTheme::parse(theme) {
                Some(parsed) => {
                    config.assistant.prompt_theme = parsed;
                    save_config(config);
                    println!("Prompt theme set to: {}", theme);
                }
                None => println!("Invalid theme. Available themes: default, pwd, mood"),
            }
            SlashAction::Continue
        }
        ["config", rest @ ..] | ["c", rest @ ..] => handle_config_command(rest, config),
        _ => {
            println!("Unknown command: /{}", command);
            SlashAction::Continue
        }
    }
}

fn handle_config_command(parts: &[&str], config: &mut Config) -> SlashAction {
    match parts {
        [] => {
            print_config(config);
            SlashAction::Continue
        }
        ["api", "current", name] => {
            if config.online.apis.contains_key(*name) {
                config.online.current = (*name).to_string();
                save_config(config);
                println!("Current API set to: {}", name);
                SlashAction::ReloadEngine
            } else {
                println!("Invalid API name. Use /config to list available APIs.");
                SlashAction::Continue
            }
        }
        ["api", "fallback", name] => {
            if config.online.apis.contains_key(*name) {
                config.online.fallback = Some((*name).to_string());
                save_config(config);
                println!("Fallback API set to: {}", name);
                SlashAction::ReloadEngine
            } else {
                println!("Invalid API name. Use /config to list available APIs.");
                SlashAction::Continue
            }
        }
        ["api", "edit", name, field, value @ ..] if !value.is_empty() => {
            let value = value.join(" ");
            match config.online.apis.get_mut(*name) {
                Some(api) => match *field {
                    "key" => {
                        api.api_key = value;
                        save_config(config);
                        println!("API key for {} updated.", name);
                        SlashAction::ReloadEngine
                    }
                    "model" => {
                        api.model = value;
                        save_config(config);
                        println!("Model for {} updated.", name);
                        SlashAction::ReloadEngine
                    }
                    _ => {
                        println!("Invalid field: {}. Valid fields: key, model", field);
                        SlashAction::Continue
                    }
                },
                None => {
                    println!("Invalid API name. Use /config to list available APIs.");
                    SlashAction::Continue
                }
            }
        }
        ["prev_cmds", value] => {
            match value.parse::<usize>() {
                Ok(limit) if limit <= 10 => {
                    config.assistant.prev_cmds_limit = limit;
                    save_config(config);
                    println!("Previous commands limit set to {}", limit);
                    return SlashAction::ReloadEngine;
                }
                _ => println!("Invalid number. Use 0 to 10."),
            }
            SlashAction::Continue
        }
        ["mode", mode] => {
            match *mode {
                "online" => config.assistant.mode = Mode::Online,
                "offline" => config.assistant.mode = Mode::Offline,
                _ => {
                    println!("Invalid mode. Use online or offline.");
                    return SlashAction::Continue;
                }
            }
            save_config(config);
            println!("Mode set to: {}", mode);
            SlashAction::ReloadEngine
        }
        _ => {
            println!("Usage: /config [api|prev_cmds|mode] ...");
            SlashAction::Continue
        }
    }
}
