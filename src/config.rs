//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;

/// Signing key used outside production when JWT_SECRET is unset
const DEVELOPMENT_JWT_SECRET: &str = "banking-admin-development-secret-change-me";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// HS256 signing key for bearer tokens
    pub jwt_secret: String,

    /// Token lifetime in hours
    pub jwt_expiration_hours: i64,

    /// Apply migrations/ at start-up
    pub run_migrations: bool,

    /// Insert demo customers and accounts into an empty store
    pub seed_sample_data: bool,

    /// Emit JSON log lines instead of text
    pub json_logs: bool,

    /// Browser origins allowed by CORS; `*` allows any origin
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?;

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = parse_or(&lookup, "PORT", 8080)?;

        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());
        let is_production = environment == "production";

        let jwt_secret = match lookup("JWT_SECRET") {
            Some(secret) if !secret.is_empty() => secret,
            _ if is_production => return Err(ConfigError::MissingEnv("JWT_SECRET")),
            _ => DEVELOPMENT_JWT_SECRET.to_string(),
        };

        let jwt_expiration_hours: i64 = parse_or(&lookup, "JWT_EXPIRATION_HOURS", 24)?;
        if jwt_expiration_hours <= 0 {
            return Err(ConfigError::InvalidValue("JWT_EXPIRATION_HOURS"));
        }

        let run_migrations = parse_bool_or(&lookup, "RUN_MIGRATIONS", true)?;

        let seed_sample_data = parse_bool_or(&lookup, "SEED_SAMPLE_DATA", !is_production)?;

        let json_logs = lookup("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json"));

        let cors_allowed_origins = parse_origins(lookup("CORS_ALLOWED_ORIGINS").as_deref());

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            jwt_secret,
            jwt_expiration_hours,
            run_migrations,
            seed_sample_data,
            json_logs,
            cors_allowed_origins,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue(name)),
        None => Ok(default),
    }
}

fn parse_bool_or<F>(lookup: &F, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name).as_deref().map(str::trim) {
        None => Ok(default),
        Some("1") | Some("true") | Some("yes") => Ok(true),
        Some("0") | Some("false") | Some("no") => Ok(false),
        Some(_) => Err(ConfigError::InvalidValue(name)),
    }
}

/// Comma-separated origin list; unset or blank means any origin
fn parse_origins(raw: Option<&str>) -> Vec<String> {
    let origins: Vec<String> = raw
        .unwrap_or("*")
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect();

    if origins.is_empty() {
        vec!["*".to_string()]
    } else {
        origins
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
