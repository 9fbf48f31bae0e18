use thiserror::Error;

/// Main error type for eng-digest
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

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A collaborator API answered with an error
    #[error("{service} API error: {message}")]
    Api {
        service: &'static str,
        message: String,
    },

    /// Claude API errors
    #[error("Claude API error: {0}")]
    ClaudeApi(String),

    /// Caching errors
    #[error("Cache error: {0}")]
    Cache(#[from] sled::Error),

    /// Timestamp parsing errors
    #[error("Date parse error: {0}")]
    DateParse(#[from] chrono::ParseError),

    /// A concurrent summary task panicked or was cancelled
    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Missing configuration
    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    /// Regex errors
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// Result type alias for eng-digest operations
pub type Result<T> = std::result::Result<T, DigestError>;

impl DigestError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new collaborator API error
    pub fn api<S: Into<String>>(service: &'static str, msg: S) -> Self {
        Self::Api {
            service,
            message: msg.into(),
        }
    }

    /// Create a new Claude API error
    pub fn claude_api<S: Into<String>>(msg: S) -> Self {
        Self::ClaudeApi(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = DigestError::api("Jira", "status 401: unauthorized");
        assert_eq!(err.to_string(), "Jira API error: status 401: unauthorized");
    }

    #[test]
    fn test_config_error_display() {
        let err = DigestError::config("no projects configured");
        assert_eq!(err.to_string(), "Configuration error: no projects configured");
    }
}
