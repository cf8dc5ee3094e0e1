//! Environment variable handling.

use crate::types::IcdbConfig;
use icdb_common_core::FetchMode;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable errors.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("required environment variable not set: {var}")]
    NotSet { var: String },

    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("failed to load .env file: {0}")]
    DotenvError(#[from] dotenvy::Error),
}

/// Environment variable names.
pub mod vars {
    // Overrides
    pub const ICDB_ALGORITHM: &str = "ICDB_ALGORITHM";
    pub const ICDB_WORKERS: &str = "ICDB_WORKERS";
    pub const ICDB_FETCH_SIZE: &str = "ICDB_FETCH_SIZE";
    pub const ICDB_FETCH_MODE: &str = "ICDB_FETCH_MODE";
    pub const ICDB_DATABASE: &str = "ICDB_DATABASE";
    pub const ICDB_ICRL: &str = "ICDB_ICRL";

    // Configuration
    pub const ICDB_CONFIG_PATH: &str = "ICDB_CONFIG_PATH";
    pub const ICDB_ENV: &str = "ICDB_ENV";
}

/// Environment configuration.
pub struct Environment {
    _guard: (),
}

impl Environment {
    /// Initialize environment from .env files.
    pub fn init() -> Result<Self, EnvError> {
        // Later files override earlier ones.
        let _ = dotenvy::from_filename(".env");
        let _ = dotenvy::from_filename(".env.local");

        if let Ok(env) = env::var(vars::ICDB_ENV) {
            let _ = dotenvy::from_filename(format!(".env.{}", env));
        }

        Ok(Self { _guard: () })
    }

    /// Get a required string variable.
    pub fn require(var: &str) -> Result<String, EnvError> {
        env::var(var).map_err(|_| EnvError::NotSet { var: var.to_string() })
    }

    /// Get an optional string variable.
    pub fn get(var: &str) -> Option<String> {
        env::var(var).ok()
    }

    /// Get a variable with a default value.
    pub fn get_or(var: &str, default: &str) -> String {
        env::var(var).unwrap_or_else(|_| default.to_string())
    }

    /// Get a boolean variable.
    pub fn get_bool(var: &str) -> Option<bool> {
        env::var(var)
            .ok()
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
    }

    /// Get an integer variable.
    pub fn get_int<T: std::str::FromStr>(var: &str) -> Result<Option<T>, EnvError> {
        parse_int(var, env::var(var).ok())
    }
}

fn parse_int<T: std::str::FromStr>(var: &str, value: Option<String>) -> Result<Option<T>, EnvError> {
    match value {
        Some(v) => v.trim().parse().map(Some).map_err(|_| EnvError::InvalidValue {
            var: var.to_string(),
            message: "expected integer".to_string(),
        }),
        None => Ok(None),
    }
}

/// Apply `ICDB_*` overrides from the process environment.
pub fn apply_overrides(config: &mut IcdbConfig) -> Result<(), EnvError> {
    apply_overrides_with(config, |var| env::var(var).ok())
}

/// Apply `ICDB_*` overrides using `lookup` as the variable source.
pub fn apply_overrides_with<F>(config: &mut IcdbConfig, lookup: F) -> Result<(), EnvError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(algorithm) = lookup(vars::ICDB_ALGORITHM) {
        config.verification.algorithm = algorithm.parse().map_err(|e: icdb_crypto::CryptoError| {
            EnvError::InvalidValue {
                var: vars::ICDB_ALGORITHM.to_string(),
                message: e.to_string(),
            }
        })?;
    }

    if let Some(workers) = parse_int(vars::ICDB_WORKERS, lookup(vars::ICDB_WORKERS))? {
        config.verification.workers = workers;
    }

    if let Some(fetch_size) = parse_int(vars::ICDB_FETCH_SIZE, lookup(vars::ICDB_FETCH_SIZE))? {
        config.verification.fetch_size = fetch_size;
    }

    if let Some(mode) = lookup(vars::ICDB_FETCH_MODE) {
        config.verification.fetch_mode = match mode.trim().to_lowercase().as_str() {
            "lazy" => FetchMode::Lazy,
            "eager" => FetchMode::Eager,
            other => {
                return Err(EnvError::InvalidValue {
                    var: vars::ICDB_FETCH_MODE.to_string(),
                    message: format!("expected lazy or eager, got {other}"),
                })
            }
        };
    }

    if let Some(path) = lookup(vars::ICDB_DATABASE) {
        config.database.path = PathBuf::from(path);
    }

    if let Some(path) = lookup(vars::ICDB_ICRL) {
        config.verification.icrl_path = PathBuf::from(path);
    }

    Ok(())
}
