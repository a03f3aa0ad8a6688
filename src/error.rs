use thiserror::Error;

/// Main error type for metrics-digest
#[derive(Error, Debug)]
pub enum DigestError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parsing errors
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// HTTP/API errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Data source errors
    #[error("Data source error: {0}")]
    DataSource(String),

    /// Gemini API errors
    #[error("Gemini API error: {0}")]
    GeminiApi(String),

    /// Slack delivery errors
    #[error("Slack error: {0}")]
    Slack(String),

    /// Invalid cron expression or timezone
    #[error("Schedule error: {0}")]
    Schedule(String),

    /// Missing configuration
    #[error("Missing required configuration: {0}")]
    MissingConfig(String),
}

/// Result type alias for metrics-digest operations
pub type Result<T> = std::result::Result<T, DigestError>;

impl DigestError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new data source error
    pub fn data_source<S: Into<String>>(msg: S) -> Self {
        Self::DataSource(msg.into())
    }

    /// Create a new Gemini API error
    pub fn gemini_api<S: Into<String>>(msg: S) -> Self {
        Self::GeminiApi(msg.into())
    }

    /// Create a new Slack error
    pub fn slack<S: Into<String>>(msg: S) -> Self {
        Self::Slack(msg.into())
    }

    /// Create a new schedule error
    pub fn schedule<S: Into<String>>(msg: S) -> Self {
        Self::Schedule(msg.into())
    }
}
