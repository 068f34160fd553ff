//! Configuration management for the loan billing engine
//!
//! This module handles loading and validating configuration from environment variables,
//! with support for different environments (development, staging, production).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Parse environment from string
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }

    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Get the environment name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Current environment
    pub environment: Environment,

    /// Server port
    pub port: u16,

    /// Maximum database connections
    pub db_max_connections: u32,

    /// CORS allowed origins
    pub cors_allowed_origins: Option<String>,

    /// Log level (RUST_LOG)
    pub log_level: String,

    /// Interest rate charged on new loans, e.g. 0.10 for 10%
    pub interest_rate: Decimal,

    /// Upper bound for one transactional workflow
    pub transaction_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .map(|s| Environment::from_str(&s))
            .unwrap_or(Ok(Environment::Development))?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .unwrap_or(5);

        let cors_allowed_origins =
            require_cors_in_production(&environment, env::var("CORS_ALLOWED_ORIGINS").ok())?;

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let interest_rate =
            parse_interest_rate(&env::var("INTEREST_RATE").unwrap_or_else(|_| "0.10".to_string()))?;

        let transaction_timeout = parse_transaction_timeout(
            &env::var("TRANSACTION_TIMEOUT_SECS").unwrap_or_else(|_| "5".to_string()),
        )?;

        Ok(Config {
            database_url,
            environment,
            port,
            db_max_connections,
            cors_allowed_origins,
            log_level,
            interest_rate,
            transaction_timeout,
        })
    }

    /// Get database URL (useful for logging masked version)
    pub fn database_url_masked(&self) -> String {
        // Mask password in database URL for logging
        if let Some(at_pos) = self.database_url.find('@') {
            if let Some(colon_pos) = self.database_url[..at_pos].rfind(':') {
                let prefix = &self.database_url[..colon_pos + 1];
                let suffix = &self.database_url[at_pos..];
                return format!("{}****{}", prefix, suffix);
            }
        }
        self.database_url.clone()
    }
}

/// Production must name its origins; the permissive CORS fallback is for local runs only
fn require_cors_in_production(
    environment: &Environment,
    origins: Option<String>,
) -> Result<Option<String>, ConfigError> {
    let origins = origins.filter(|o| !o.trim().is_empty());
    if environment.is_production() && origins.is_none() {
        return Err(ConfigError::MissingEnvVar(
            "CORS_ALLOWED_ORIGINS".to_string(),
        ));
    }
    Ok(origins)
}

fn parse_interest_rate(raw: &str) -> Result<Decimal, ConfigError> {
    let rate = Decimal::from_str(raw.trim())
        .map_err(|_| ConfigError::InvalidValue(format!("INTEREST_RATE '{}' is not a decimal", raw)))?;
    if rate < Decimal::ZERO {
        return Err(ConfigError::InvalidValue(format!(
            "INTEREST_RATE must not be negative, got {}",
            raw
        )));
    }
    Ok(rate)
}

fn parse_transaction_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue(format!(
            "TRANSACTION_TIMEOUT_SECS must be a positive number of seconds, got '{}'",
            raw
        ))),
    }
}
