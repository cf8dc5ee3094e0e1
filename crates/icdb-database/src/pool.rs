use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Failed to create connection pool: {0}")]
    Creation(#[from] sqlx::Error),

    #[error("Pool health check failed: {0}")]
    HealthCheck(String),

    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Path to the protected SQLite database
    pub database_path: String,
    pub max_connections: u32,
    /// Idle connection timeout (`None` keeps connections forever)
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
    pub wal_mode: bool,
    /// Busy timeout for a locked database
    pub busy_timeout: Duration,
}

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            database_path: "icdb.sqlite".to_string(),
            max_connections: 5,
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
            wal_mode: true,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl PoolConfig {
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::default()
    }

    /// Single-connection in-memory database; the data lives as long as the
    /// connection, so it never idles out.
    pub fn in_memory() -> Self {
        Self {
            database_path: ":memory:".to_string(),
            max_connections: 1,
            idle_timeout: None,
            max_lifetime: None,
            wal_mode: false,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_connections == 0 {
            return Err(PoolError::InvalidConfig(
                "max_connections must be at least 1".to_string(),
            ));
        }

        if self.database_path.trim().is_empty() {
            return Err(PoolError::InvalidConfig("database path is empty".to_string()));
        }

        Ok(())
    }
}

#[derive(Default)]
pub struct PoolConfigBuilder {
    config: PoolConfig,
}

impl PoolConfigBuilder {
    pub fn database_path(mut self, path: impl Into<String>) -> Self {
        self.config.database_path = path.into();
        self
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.config.max_connections = max;
        self
    }

    pub fn wal_mode(mut self, enabled: bool) -> Self {
        self.config.wal_mode = enabled;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.config.busy_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<PoolConfig, PoolError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Connection pool over the protected database.
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    #[instrument(skip(config), fields(path = %config.database_path))]
    pub async fn new(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;

        let connect_options = Self::build_connect_options(&config)?;

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(config.max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect_with(connect_options)
            .await?;

        info!(max_connections = config.max_connections, "database pool created");

        let db_pool = Self { pool };
        db_pool.health_check().await?;

        Ok(db_pool)
    }

    fn build_connect_options(config: &PoolConfig) -> Result<SqliteConnectOptions, PoolError> {
        let mut options = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.database_path))
            .map_err(|e| PoolError::InvalidConfig(e.to_string()))?
            .create_if_missing(true)
            .busy_timeout(config.busy_timeout);

        if config.wal_mode {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        Ok(options)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), PoolError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PoolError::HealthCheck(e.to_string()))?;

        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn close(&self) {
        info!("closing database pool");
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_in_memory_pool() {
        let pool = DatabasePool::new(PoolConfig::in_memory()).await.unwrap();

        assert!(!pool.is_closed());
        pool.health_check().await.unwrap();
        pool.close().await;
        assert!(pool.is_closed());
    }

    #[tokio::test]
    async fn test_file_pool_creates_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("protected.sqlite");
        let config = PoolConfig::builder()
            .database_path(path.to_string_lossy())
            .max_connections(2)
            .build()
            .unwrap();

        let pool = DatabasePool::new(config).await.unwrap();
        assert!(path.exists());

        let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(pool.pool())
            .await
            .unwrap();
        assert_eq!(mode, "wal");
        pool.close().await;
    }

    #[tokio::test]
    async fn test_wal_mode_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let config = PoolConfig::builder()
            .database_path(dir.path().join("rollback.sqlite").to_string_lossy())
            .wal_mode(false)
            .build()
            .unwrap();

        let pool = DatabasePool::new(config).await.unwrap();
        let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(pool.pool())
            .await
            .unwrap();
        assert_eq!(mode, "delete");
        pool.close().await;
    }

    #[test]
    fn test_config_validation() {
        let result = PoolConfig::builder().max_connections(0).build();
        assert!(matches!(result, Err(PoolError::InvalidConfig(_))));

        assert!(PoolConfig::builder().database_path(" ").build().is_err());
    }

    #[test]
    fn test_pool_builder() {
        let config = PoolConfig::builder()
            .database_path(":memory:")
            .max_connections(3)
            .wal_mode(false)
            .busy_timeout(Duration::from_millis(250))
            .build()
            .unwrap();

        assert_eq!(config.max_connections, 3);
        assert!(!config.wal_mode);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
    }
}
