//! Command implementations.

mod execute;
mod icrl;
mod sign;

pub use execute::{ExecuteCommand, VerifyCommand};
pub use icrl::{IcrlCommand, RevokeCommand};
pub use sign::SignCommand;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use icdb_common_config::{IcdbConfig, VerificationConfig};
use icdb_common_core::ConvertedQuery;
use icdb_crypto::Signer;
use icdb_database::{DatabasePool, PoolConfig, SqliteSource};
use icdb_icrl::Icrl;
use icdb_verify::{QueryVerifier, VerifierConfig};

use crate::error::CliError;

/// Engine settings from the `verification` config section.
pub fn verifier_config(settings: &VerificationConfig) -> VerifierConfig {
    VerifierConfig {
        algorithm: settings.algorithm,
        workers: settings.workers,
        fetch_size: settings.fetch_size,
        fetch_mode: settings.fetch_mode,
        validate_icrl: settings.validate_icrl,
    }
}

/// Signer for the configured algorithm.
pub fn signer(config: &IcdbConfig) -> Result<Signer, CliError> {
    let algorithm = config.verification.algorithm;
    let keys = config.keys.key_material(algorithm)?;
    Ok(Signer::for_algorithm(algorithm, &keys)?)
}

pub fn open_icrl(config: &IcdbConfig) -> Result<Icrl, CliError> {
    Ok(Icrl::open(&config.verification.icrl_path)?)
}

/// Open the protected database and wire a verifier over it.
pub async fn connect(config: &IcdbConfig) -> Result<(DatabasePool, QueryVerifier), CliError> {
    let pool_config = PoolConfig::builder()
        .database_path(config.database.path.to_string_lossy())
        .max_connections(config.database.max_connections)
        .wal_mode(config.database.wal_mode)
        .busy_timeout(Duration::from_millis(config.database.busy_timeout_ms))
        .build()?;
    let pool = DatabasePool::new(pool_config).await?;

    let verifier = QueryVerifier::new(
        Arc::new(SqliteSource::from_pool(&pool)),
        Arc::new(signer(config)?),
        Arc::new(open_icrl(config)?),
        verifier_config(&config.verification),
    );
    Ok((pool, verifier))
}

/// Read a converted query from a JSON or YAML file.
pub fn load_query(path: &Path) -> Result<ConvertedQuery, CliError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let invalid = |message: String| CliError::QueryFile {
        path: path.to_path_buf(),
        message,
    };

    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&contents).map_err(|e| invalid(e.to_string())),
        _ => serde_yaml::from_str(&contents).map_err(|e| invalid(e.to_string())),
    }
}
