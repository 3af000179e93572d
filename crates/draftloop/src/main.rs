mod config;
mod report;
mod search;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use draftloop_agent::{CompletionConfig, GeminiClient, TavilySearch};
use draftloop_core::{LoopRunner, RunContext};
use draftloop_logging::{init_tracing, LogEvent, LogFormat, Logger};

use config::{CliOverrides, ProjectConfig, Settings};

#[derive(Parser, Debug)]
#[command(
    name = "draftloop",
    about = "Generate, critique and revise blog drafts until they pass review",
    version,
    author
)]
struct Cli {
    /// Blog topic (or reads from prompt.md if not provided)
    #[arg(short, long)]
    prompt: Option<String>,

    /// Path to prompt file (default: ./prompt.md)
    #[arg(long, default_value = "prompt.md")]
    prompt_file: PathBuf,

    /// Maximum evaluation rounds (overrides MAX_REVISIONS)
    #[arg(short = 'n', long)]
    max_revisions: Option<i64>,

    /// Completion model
    #[arg(short, long)]
    model: Option<String>,

    /// Tone requested from the generator
    #[arg(long)]
    tone: Option<String>,

    /// Skip the contextual blog search
    #[arg(long)]
    no_search: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatChoice,

    /// Also append every loop event as JSON lines to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Output final result as JSON
    #[arg(long)]
    json_output: bool,

    /// Dry run: show resolved settings without calling any service
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the environment may already be populated
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let log_format: LogFormat = cli.log_format.into();
    init_tracing("warn", log_format);

    let working_dir = std::env::current_dir().context("Failed to get current directory")?;
    let prompt = get_prompt(&cli, &working_dir)?;

    let file_config = ProjectConfig::discover(&working_dir)?;
    let overrides = CliOverrides {
        max_revisions: cli.max_revisions,
        model: cli.model.clone(),
        tone: cli.tone.clone(),
        no_search: cli.no_search,
    };
    let settings = Settings::resolve(&overrides, &file_config, |name| std::env::var(name).ok())?;

    if cli.dry_run {
        print_dry_run(&prompt, &settings);
        return Ok(());
    }

    let logger = match cli.log_file {
        Some(ref path) => Logger::with_file(log_format, path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?,
        None => Logger::new(log_format),
    };
    let logger = Arc::new(logger);

    let client = GeminiClient::new(&settings.api_key, CompletionConfig::new(&settings.model))
        .context("Failed to create completion client")?;

    // Contextual search is best effort and runs before the loop
    let search_output = match settings.search_api_key {
        Some(ref key) => {
            let provider = TavilySearch::new(key)
                .context("Failed to create search client")?
                .with_max_results(settings.search_max_results);
            Some(search::contextual_search(&provider, &prompt, &logger).await)
        }
        None => {
            let reason = settings
                .search_disabled_reason
                .clone()
                .unwrap_or_else(|| "search disabled".to_string());
            logger.log(&LogEvent::SearchSkipped { reason });
            None
        }
    };
    // stderr keeps --json-output clean on stdout
    if let Some(ref output) = search_output {
        eprintln!("{}", output);
        eprintln!();
    }

    let context = RunContext::new(prompt, settings.budget);
    let runner = LoopRunner::new(&client, &client, Arc::clone(&logger)).with_tone(&settings.tone);
    let outcome = runner.run(context).await?;

    if cli.json_output {
        let json = serde_json::to_string_pretty(&outcome)?;
        println!("{}", json);
    } else {
        report::print_outcome(&outcome);
    }

    std::process::exit(outcome.exit_code());
}

fn get_prompt(cli: &Cli, working_dir: &Path) -> Result<String> {
    // Prefer --prompt flag
    if let Some(ref prompt) = cli.prompt {
        return Ok(prompt.clone());
    }

    let prompt_path = if cli.prompt_file.is_absolute() {
        cli.prompt_file.clone()
    } else {
        working_dir.join(&cli.prompt_file)
    };

    if prompt_path.exists() {
        let content =
            std::fs::read_to_string(&prompt_path).context("Failed to read prompt file")?;
        Ok(content.trim().to_string())
    } else {
        anyhow::bail!(
            "No prompt provided. Use --prompt or create a {} file",
            cli.prompt_file.display()
        )
    }
}

fn print_dry_run(prompt: &str, settings: &Settings) {
    let preview: String = prompt.chars().take(100).collect();
    println!("=== Dry Run ===");
    if preview.len() < prompt.len() {
        println!("Prompt: {}...", preview);
    } else {
        println!("Prompt: {}", prompt);
    }
    println!("Model: {}", settings.model);
    println!("Tone: {}", settings.tone);
    println!("Max revisions: {}", settings.budget.get());
    match settings.search_disabled_reason {
        Some(ref reason) => println!("Search: off ({})", reason),
        None => println!("Search: up to {} results", settings.search_max_results),
    }
}
