mod ai;
mod analysis;
mod cli;
mod config;
mod error;
mod orchestrator;
mod period;
mod scheduler;
mod slack;
mod source;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use orchestrator::Orchestrator;
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Validate CLI arguments
    if let Err(e) = cli.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let config_path = match cli.config {
        Some(ref path) => path.clone(),
        None => Config::default_config_path()?,
    };

    // Handle subcommands
    if let Some(ref command) = cli.command {
        init_logging("warn", cli.verbosity_level());
        return handle_command(command, &config_path);
    }

    let config = match Config::load_from(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!(
                "\nCredentials can be set in {} or in the {}, {} and {} environment variables.",
                config_path.display(),
                config::DUNE_API_KEY_ENV,
                config::GEMINI_API_KEY_ENV,
                config::SLACK_WEBHOOK_URL_ENV
            );
            std::process::exit(1);
        }
    };

    init_logging(&config.log_level, cli.verbosity_level());
    install_panic_hook();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        metrics = config.metrics.len(),
        "Starting metrics-digest"
    );

    run(config, &cli).await
}

async fn run(config: Config, cli: &Cli) -> anyhow::Result<()> {
    let schedule = config.schedule.parse()?;
    let orchestrator = Orchestrator::new(&config).context("failed to build API clients")?;

    if cli.dry_run {
        let today = Utc::now().date_naive();
        for (name, prompt) in orchestrator.preview_prompts(today).await {
            println!("{}\n{}", name, "=".repeat(60));
            match prompt {
                Ok(prompt) => println!("{}", prompt),
                Err(e) => println!("❌ Error: {}", e),
            }
            println!();
        }
        return Ok(());
    }

    match schedule {
        Some(schedule) if !cli.once => {
            tokio::select! {
                result = scheduler::run_scheduled(&orchestrator, &schedule, config.fail_fast) => {
                    result.context("scheduled run failed")?;
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received shutdown signal, exiting");
                }
            }
        }
        _ => {
            let report = orchestrator.run_once().await.context("digest run failed")?;
            let failed = report.outcomes.iter().filter(|o| o.is_failure()).count();
            for outcome in report.outcomes.iter().filter(|o| o.is_failure()) {
                tracing::warn!(metric = outcome.metric(), "Metric reported as failed");
            }
            tracing::info!(
                delivered = report.delivered,
                metrics = report.outcomes.len(),
                failed,
                "Single run finished"
            );
        }
    }

    Ok(())
}

fn handle_command(command: &Commands, config_path: &Path) -> anyhow::Result<()> {
    match command {
        Commands::Init { force } => {
            if config_path.exists() && !force {
                eprintln!("Config file already exists at: {}", config_path.display());
                eprintln!("Use --force to overwrite");
                std::process::exit(1);
            }

            Config::create_default(config_path)?;
            println!("✓ Created config file at: {}", config_path.display());
            println!("\nBefore the first run:");
            println!("  1. Set dune_api_key, gemini_api_key and slack_webhook_url");
            println!(
                "     (or the {}, {} and {} environment variables)",
                config::DUNE_API_KEY_ENV,
                config::GEMINI_API_KEY_ENV,
                config::SLACK_WEBHOOK_URL_ENV
            );
            println!("  2. Replace the example [[metrics]] entry with your queries");
            println!("  3. Optionally add a [schedule] cron expression");
        }
        Commands::Config => {
            let config = Config::effective(config_path)?;
            let toml_str = toml::to_string_pretty(&config.redacted())?;
            println!("Current configuration ({}):\n", config_path.display());
            println!("{}", toml_str);
            if let Err(e) = config.validate() {
                println!("⚠ {}", e);
            }
        }
        Commands::Periods { today } => {
            let config = Config::read_from(config_path)?;
            let today = today.unwrap_or_else(|| Utc::now().date_naive());
            println!("Reference date: {}\n", today);
            for metric in &config.metrics {
                println!("{}: {}", metric.name, metric.period.describe(today));
            }
        }
    }
    Ok(())
}

fn init_logging(default_level: &str, verbosity: Option<&str>) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(verbosity.unwrap_or(default_level))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();
}

/// Log panics through tracing, then hand over to the default hook
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let message = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());

        tracing::error!(%location, panic = %message, "Panic");
        default_hook(info);
    }));
}
