//! Doctor command - verify system requirements and configuration.

use crate::chunking::TextSplitter;
use crate::cli::Output;
use crate::config::{GenerationProviderKind, Settings, TranscriptProvider};
use crate::generation::{connect_generation, ModelBinding, PLACEHOLDER_API_KEY};
use console::style;
use std::process::Command;

/// Prompt used for the live generation check.
const LIVE_TEST_PROMPT: &str = "Say 'Hello, API test successful!'";

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Spor Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("External Tools").bold());
    let tool_check = match check_tool("yt-dlp", install_hint_ytdlp()) {
        check if settings.transcript.provider == TranscriptProvider::Youtube => check,
        check if check.status == CheckStatus::Ok => check,
        _ => CheckResult::warning(
            "yt-dlp",
            "not found (not needed for the file transcript provider)",
            install_hint_ytdlp(),
        ),
    };
    tool_check.print();
    checks.push(tool_check);

    println!();

    println!("{}", style("API Configuration").bold());
    let key_env = &settings.generation.api_key_env;
    let key_check = check_generation_key(
        key_env,
        std::env::var(key_env).ok().as_deref(),
        &settings.generation.provider,
    );
    key_check.print();
    let key_usable = key_check.status != CheckStatus::Error;
    checks.push(key_check);

    let embedding_check = check_embedding_key(settings);
    embedding_check.print();
    checks.push(embedding_check);

    println!();

    println!("{}", style("Generation").bold());
    if key_usable {
        let spinner = Output::spinner("Testing candidate models...");
        let generation_checks = check_generation(settings).await;
        spinner.finish_and_clear();
        for check in &generation_checks {
            check.print();
        }
        checks.extend(generation_checks);
    } else {
        let skipped = CheckResult::warning(
            "Model",
            "skipped",
            &format!("Fix {} first", settings.generation.api_key_env),
        );
        skipped.print();
        checks.push(skipped);
    }

    println!();

    println!("{}", style("Configuration").bold());
    let chunking_check = check_chunking(settings);
    chunking_check.print();
    checks.push(chunking_check);

    let config_check = check_config_file();
    config_check.print();
    checks.push(config_check);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Spor.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Spor is ready to use.");
    }

    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str, hint: &str) -> CheckResult {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();
            CheckResult::ok(name, &version)
        }
        Ok(_) => CheckResult::error(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(name, "not found", hint)
        }
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

/// Check the generation API key's presence and shape.
fn check_generation_key(
    env_name: &str,
    value: Option<&str>,
    provider: &GenerationProviderKind,
) -> CheckResult {
    let hint = format!("Set it in your environment or a .env file: {}=...", env_name);
    let key = value.map(str::trim).unwrap_or_default();

    if key.is_empty() {
        return CheckResult::error(env_name, "not set", &hint);
    }
    if key == PLACEHOLDER_API_KEY {
        return CheckResult::error(env_name, "still set to the placeholder value", &hint);
    }
    if *provider == GenerationProviderKind::Gemini && !key.starts_with("AIza") {
        return CheckResult::warning(
            env_name,
            "set but format looks unusual",
            "Google API keys start with 'AIza'",
        );
    }

    CheckResult::ok(env_name, &format!("configured ({})", mask(key)))
}

/// Check the embedding provider's key.
fn check_embedding_key(settings: &Settings) -> CheckResult {
    if settings.embedding.provider != "openai" {
        return CheckResult::ok(
            "Embeddings",
            &format!("{} (local, no key needed)", settings.embedding.provider),
        );
    }

    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => {
            CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", mask(key.trim())))
        }
        _ => CheckResult::error(
            "OPENAI_API_KEY",
            "not set (needed for embeddings)",
            "Set with: export OPENAI_API_KEY='sk-...' or use embedding.provider = \"hashing\"",
        ),
    }
}

/// Bind a model and send one live request.
async fn check_generation(settings: &Settings) -> Vec<CheckResult> {
    let client = match connect_generation(&settings.generation).await {
        Ok(client) => client,
        Err(e) => {
            return vec![CheckResult::error(
                "Model",
                &e.to_string(),
                "Check generation settings",
            )]
        }
    };

    match client.binding() {
        ModelBinding::Bound { model } => {
            let mut results = vec![CheckResult::ok("Model", &format!("bound to {}", model))];
            let reply = client
                .generate(LIVE_TEST_PROMPT, settings.generation.temperature, 32)
                .await;
            results.push(match reply.failure {
                None => CheckResult::ok("Live request", &reply.text),
                Some(category) => CheckResult::error(
                    "Live request",
                    &format!("{} ({})", reply.text, category),
                    "The model was bound but a real request failed",
                ),
            });
            results
        }
        ModelBinding::Unconfigured { reason } => vec![CheckResult::error(
            "Model",
            &reason.to_string(),
            &format!(
                "Tried: {}. Check the API key and generation.models",
                settings.generation.models.join(", ")
            ),
        )],
    }
}

fn check_chunking(settings: &Settings) -> CheckResult {
    let chunking = &settings.chunking;
    match TextSplitter::try_new(chunking.chunk_size, chunking.chunk_overlap) {
        Ok(_) => CheckResult::ok(
            "Chunking",
            &format!("{} chars, {} overlap", chunking.chunk_size, chunking.chunk_overlap),
        ),
        Err(e) => CheckResult::error("Chunking", &e.to_string(), "Fix the [chunking] section"),
    }
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: spor config init",
        )
    }
}

/// Show only the first and last few characters of a secret.
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "***".to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}
