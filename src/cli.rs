use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "metrics-digest")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "AI-analyzed metrics digests posted to Slack",
    long_about = "metrics-digest runs saved analytics queries, asks a Gemini model to compare \
                  each metric with its historical trend and posts the results to a Slack \
                  channel, once or on a cron schedule."
)]
pub struct Cli {
    /// Path to config file (default: ~/.config/metrics-digest/config.toml)
    #[arg(short, long, value_name = "FILE", env = "METRICS_DIGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Run a single digest and exit, ignoring any configured schedule
    #[arg(long)]
    pub once: bool,

    /// Fetch data and print prompts without calling the model or Slack
    #[arg(long)]
    pub dry_run: bool,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize configuration file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration with credentials masked
    Config,

    /// Print the historical period phrase of every metric
    Periods {
        /// Reference date (YYYY-MM-DD, default: today in UTC)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

impl Cli {
    /// Validate CLI arguments
    pub fn validate(&self) -> Result<(), String> {
        if self.command.is_some() && (self.once || self.dry_run) {
            return Err("--once and --dry-run cannot be combined with a subcommand".to_string());
        }

        Ok(())
    }

    /// Log filter directive implied by -v flags, if any
    pub fn verbosity_level(&self) -> Option<&'static str> {
        match self.verbose {
            0 => None,
            1 => Some("debug"),
            _ => Some("trace"),
        }
    }
}
