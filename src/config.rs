use crate::error::{DigestError, Result};
use crate::period::{HistoricalPeriod, NamedPeriod};
use crate::scheduler::Schedule;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DUNE_API_KEY_ENV: &str = "DUNE_API_KEY";
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const SLACK_WEBHOOK_URL_ENV: &str = "SLACK_WEBHOOK_URL";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Dune API key
    #[serde(default)]
    pub dune_api_key: String,

    /// Gemini API key
    #[serde(default)]
    pub gemini_api_key: String,

    /// Slack incoming webhook URL
    #[serde(default)]
    pub slack_webhook_url: String,

    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Exit on the first failed scheduled run instead of waiting for the next one
    #[serde(default)]
    pub fail_fast: bool,

    /// Model settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Recurrence; without a cron expression the digest runs once
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// API host overrides (proxies, test servers)
    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// Metrics to analyze, reported in this order
    #[serde(default)]
    pub metrics: Vec<MetricDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model")]
    pub name: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Cron expression (5 fields, or 6/7 with seconds and year)
    pub cron: Option<String>,

    /// IANA timezone the expression is evaluated in
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub dune: Option<String>,
    pub gemini: Option<String>,
}

/// A metric backed by a saved query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDescriptor {
    /// Display name
    pub name: String,

    /// Saved query to run
    pub query_id: u64,

    /// Link shown in the digest
    #[serde(default)]
    pub url: String,

    /// How often the underlying data updates
    #[serde(default = "default_frequency")]
    pub frequency: String,

    /// Maximum number of result rows sent to the model
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Extra guidance appended to the prompt
    pub instruction: Option<String>,

    /// Window the latest value is compared against
    pub period: HistoricalPeriod,
}

impl Config {
    /// Load configuration from a specific path, apply environment overrides
    /// and validate
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = Self::effective(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file and apply environment overrides, without validating
    pub fn effective(path: &Path) -> Result<Self> {
        Self::effective_with(path, |key| std::env::var(key).ok())
    }

    fn effective_with<F>(path: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::read_from(path)?;
        config.apply_env_overrides(lookup);
        Ok(config)
    }

    /// Parse a config file without validating it
    pub fn read_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DigestError::config(format!(
                "Config file not found at: {} (run `metrics-digest init` to create one)",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| DigestError::config("Could not determine home directory"))?;
        Ok(home.join(".config").join("metrics-digest").join("config.toml"))
    }

    /// Write the default configuration file to `path`
    pub fn create_default(path: &Path) -> Result<Self> {
        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config = Self::default();
        let toml_string = toml::to_string_pretty(&config)?;
        fs::write(path, toml_string)?;

        Ok(config)
    }

    /// Replace credentials with non-empty values found by `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let overrides = [
            (DUNE_API_KEY_ENV, &mut self.dune_api_key),
            (GEMINI_API_KEY_ENV, &mut self.gemini_api_key),
            (SLACK_WEBHOOK_URL_ENV, &mut self.slack_webhook_url),
        ];

        for (key, field) in overrides {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *field = value;
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let credentials = [
            ("dune_api_key", DUNE_API_KEY_ENV, &self.dune_api_key),
            ("gemini_api_key", GEMINI_API_KEY_ENV, &self.gemini_api_key),
            ("slack_webhook_url", SLACK_WEBHOOK_URL_ENV, &self.slack_webhook_url),
        ];
        for (name, env, value) in credentials {
            if value.trim().is_empty() {
                return Err(DigestError::MissingConfig(format!(
                    "{} is required (or set {})",
                    name, env
                )));
            }
        }

        let url = &self.slack_webhook_url;
        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Err(DigestError::config("slack_webhook_url must be an http(s) URL"));
        }

        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(DigestError::config("model.temperature must be between 0 and 2"));
        }

        if self.model.max_output_tokens == 0 {
            return Err(DigestError::config("model.max_output_tokens must be > 0"));
        }

        if self.metrics.is_empty() {
            return Err(DigestError::config("at least one [[metrics]] entry is required"));
        }

        for metric in &self.metrics {
            if metric.name.trim().is_empty() {
                return Err(DigestError::config(format!(
                    "metric with query_id {} has an empty name",
                    metric.query_id
                )));
            }
            if metric.limit == 0 {
                return Err(DigestError::config(format!(
                    "metric '{}': limit must be > 0",
                    metric.name
                )));
            }
        }

        self.schedule.parse()?;

        Ok(())
    }

    /// Copy of this config with credentials masked, for display
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        config.dune_api_key = mask(&config.dune_api_key);
        config.gemini_api_key = mask(&config.gemini_api_key);
        config.slack_webhook_url = mask(&config.slack_webhook_url);
        config
    }
}

impl ScheduleConfig {
    /// Parse the configured recurrence; `None` means run once
    pub fn parse(&self) -> Result<Option<Schedule>> {
        match self.cron.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(expression) => Schedule::parse(expression, &self.timezone).map(Some),
            None => {
                // Timezone is checked even without a cron expression
                crate::scheduler::parse_timezone(&self.timezone)?;
                Ok(None)
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dune_api_key: String::new(),
            gemini_api_key: String::new(),
            slack_webhook_url: String::new(),
            log_level: default_log_level(),
            fail_fast: false,
            model: ModelConfig::default(),
            schedule: ScheduleConfig::default(),
            endpoints: EndpointConfig::default(),
            metrics: vec![MetricDescriptor {
                name: "Example metric".to_string(),
                query_id: 0,
                url: "https://dune.com/queries/0".to_string(),
                frequency: default_frequency(),
                limit: default_limit(),
                instruction: None,
                period: HistoricalPeriod::Named {
                    period: NamedPeriod::LastMonth,
                },
            }],
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: None,
            timezone: default_timezone(),
        }
    }
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        "********".to_string()
    }
}

// Serde default functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_output_tokens() -> u32 {
    2048
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_frequency() -> String {
    "daily".to_string()
}

fn default_limit() -> u32 {
    100
}
