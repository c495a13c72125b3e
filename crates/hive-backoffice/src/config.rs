//! Back-office configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! development defaults.

use serde::{Deserialize, Serialize};
use std::env;

/// Back-office service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackofficeConfig {
    /// SQLite database file path
    pub database_path: String,

    /// Secret for signing bearer tokens
    pub jwt_secret: String,

    /// Bearer token lifetime in seconds (default: 24 hours)
    pub token_lifetime_secs: i64,

    /// Login attempts allowed per identity per window
    pub login_max_attempts: u64,

    /// Login rate-limit window in seconds
    pub login_window_secs: u64,

    /// SMS code sends allowed per user per window
    pub sms_max_attempts: u64,

    /// SMS rate-limit window in seconds
    pub sms_window_secs: u64,
}

impl BackofficeConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = BackofficeConfig {
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "./hive.db".to_string()),

            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                // In production this MUST be set via environment variable
                "hive-backoffice-dev-secret-change-in-production".to_string()
            }),

            token_lifetime_secs: env::var("TOKEN_LIFETIME_SECS")
                .unwrap_or_else(|_| "86400".to_string()) // 24 hours
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TOKEN_LIFETIME_SECS".to_string()))?,

            login_max_attempts: env::var("LOGIN_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("LOGIN_MAX_ATTEMPTS".to_string()))?,

            login_window_secs: env::var("LOGIN_WINDOW_SECS")
                .unwrap_or_else(|_| "900".to_string()) // 15 minutes
                .parse()
                .map_err(|_| ConfigError::InvalidValue("LOGIN_WINDOW_SECS".to_string()))?,

            sms_max_attempts: env::var("SMS_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SMS_MAX_ATTEMPTS".to_string()))?,

            sms_window_secs: env::var("SMS_WINDOW_SECS")
                .unwrap_or_else(|_| "300".to_string()) // 5 minutes
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SMS_WINDOW_SECS".to_string()))?,
        };

        Ok(config)
    }

    /// Configuration for tests: short windows, throwaway secret.
    pub fn for_tests() -> Self {
        BackofficeConfig {
            database_path: ":memory:".to_string(),
            jwt_secret: "test-secret".to_string(),
            token_lifetime_secs: 3600,
            login_max_attempts: 10,
            login_window_secs: 900,
            sms_max_attempts: 3,
            sms_window_secs: 300,
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
