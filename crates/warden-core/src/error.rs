//! Configuration error types shared by the Warden binaries.

use thiserror::Error;

/// Configuration errors. All of them are fatal at start-up.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to read configuration: {0}")]
    Read(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_detail() {
        let err = ConfigError::Invalid("query.batch_size: must be > 0".into());
        assert!(err.to_string().contains("query.batch_size"));
    }
}
