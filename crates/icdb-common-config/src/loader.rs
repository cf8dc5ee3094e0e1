//! Configuration file loading and parsing.

use crate::env;
use crate::types::{IcdbConfig, KeyConfig};
use icdb_crypto::{AlgorithmType, KeyFamily, KeyMaterial, MacKey, RsaKey};
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directory holding the project configuration.
pub const CONFIG_DIR: &str = ".icdb";

/// Configuration file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.yaml";

const ENV_PATTERN: &str = r"\$\{([^}:]+)(?::-([^}]*))?\}";

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read config: {source}")]
    ReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("invalid YAML at line {}: {message}", line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    ParseError { line: Option<usize>, message: String },

    #[error("validation error: {message}")]
    ValidationError { message: String },

    #[error("environment variable not found: {var}")]
    EnvVarNotFound { var: String },

    #[error(transparent)]
    Env(#[from] env::EnvError),
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }
}

/// Configuration loader.
pub struct ConfigLoader {
    base_path: PathBuf,
}

impl ConfigLoader {
    /// Create a loader for the given project directory.
    pub fn new(project_dir: impl AsRef<Path>) -> Self {
        Self {
            base_path: project_dir.as_ref().to_path_buf(),
        }
    }

    /// Path of `.icdb/config.yaml` under the project directory.
    pub fn config_path(&self) -> PathBuf {
        self.base_path.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Load configuration from `.icdb/config.yaml`, or defaults if absent.
    pub fn load(&self) -> Result<IcdbConfig, ConfigError> {
        let config_path = self.config_path();

        if !config_path.exists() {
            return Ok(IcdbConfig::default());
        }

        self.load_file(&config_path)
    }

    /// Load configuration from an explicit file, which must exist.
    pub fn load_file(&self, path: &Path) -> Result<IcdbConfig, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        self.parse(&contents)
    }

    /// Load (from `path` or the project file), apply `ICDB_*` environment
    /// overrides and validate the result.
    pub fn load_effective(&self, path: Option<&Path>) -> Result<IcdbConfig, ConfigError> {
        let mut config = match path {
            Some(path) => self.load_file(path)?,
            None => self.load()?,
        };
        env::apply_overrides(&mut config)?;
        self.validate_settings(&config)?;
        Ok(config)
    }

    /// Parse YAML text after environment expansion, then validate.
    pub fn parse(&self, contents: &str) -> Result<IcdbConfig, ConfigError> {
        let expanded = self.expand_env_vars(contents)?;

        let config: IcdbConfig = serde_yaml::from_str(&expanded).map_err(|e| ConfigError::ParseError {
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })?;

        self.validate(&config)?;
        Ok(config)
    }

    /// Expand environment variables in the form `${VAR}` or `${VAR:-default}`.
    fn expand_env_vars(&self, content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();
        let re = Regex::new(ENV_PATTERN).map_err(|e| ConfigError::ParseError {
            line: None,
            message: e.to_string(),
        })?;

        for cap in re.captures_iter(content) {
            let Some(full_match) = cap.get(0) else {
                continue;
            };
            let var_name = &cap[1];
            let default = cap.get(2).map(|m| m.as_str());

            let value = match std::env::var(var_name) {
                Ok(v) => v,
                Err(_) => match default {
                    Some(d) => d.to_string(),
                    None => {
                        return Err(ConfigError::EnvVarNotFound {
                            var: var_name.to_string(),
                        })
                    }
                },
            };

            result = result.replace(full_match.as_str(), &value);
        }

        Ok(result)
    }

    /// Validate numeric settings and the key material for the configured
    /// algorithm.
    pub fn validate(&self, config: &IcdbConfig) -> Result<(), ConfigError> {
        self.validate_settings(config)?;
        config.keys.key_material(config.verification.algorithm)?;
        Ok(())
    }

    fn validate_settings(&self, config: &IcdbConfig) -> Result<(), ConfigError> {
        if config.verification.workers == 0 {
            return Err(ConfigError::invalid("verification.workers must be greater than 0"));
        }

        if config.verification.fetch_size == 0 {
            return Err(ConfigError::invalid("verification.fetch_size must be greater than 0"));
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::invalid("database.max_connections must be greater than 0"));
        }

        Ok(())
    }

    /// Save configuration to `.icdb/config.yaml`.
    pub fn save(&self, config: &IcdbConfig) -> Result<(), ConfigError> {
        let config_dir = self.base_path.join(CONFIG_DIR);
        std::fs::create_dir_all(&config_dir)?;

        let yaml = serde_yaml::to_string(config).map_err(|e| ConfigError::ParseError {
            line: None,
            message: e.to_string(),
        })?;

        std::fs::write(config_dir.join(CONFIG_FILE), yaml)?;
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_default())
    }
}

impl KeyConfig {
    /// Decode the key material needed by `algorithm`.
    pub fn key_material(&self, algorithm: AlgorithmType) -> Result<KeyMaterial, ConfigError> {
        let decode = |e: icdb_crypto::CryptoError| ConfigError::invalid(format!("keys: {e}"));

        match algorithm.key_family() {
            KeyFamily::Rsa => {
                let rsa = self
                    .rsa
                    .as_ref()
                    .ok_or_else(|| ConfigError::invalid(format!("keys.rsa is required for {algorithm}")))?;
                let key = RsaKey::from_hex(&rsa.modulus, &rsa.public_exponent, rsa.private_exponent.as_deref())
                    .map_err(decode)?;
                Ok(KeyMaterial::default().with_rsa(key))
            }
            KeyFamily::Mac => {
                let mac = self
                    .mac_key
                    .as_deref()
                    .ok_or_else(|| ConfigError::invalid(format!("keys.mac_key is required for {algorithm}")))?;
                Ok(KeyMaterial::default().with_mac(MacKey::from_hex(mac).map_err(decode)?))
            }
        }
    }
}
