//! Persistence facade for the root folder record.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deckvault_core::ConfigStore;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::error::ConfigError;
use crate::validate::validate_root_folder_id;

const CREATE_CONFIG_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS deckvault_config (
        id SMALLINT PRIMARY KEY DEFAULT 1 CHECK (id = 1),
        root_folder_id TEXT NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
";

const UPSERT_ROOT_SQL: &str = r"
    INSERT INTO deckvault_config (id, root_folder_id, updated_at)
    VALUES (1, $1, now())
    ON CONFLICT (id) DO UPDATE
    SET root_folder_id = EXCLUDED.root_folder_id,
        updated_at = EXCLUDED.updated_at
";

const SELECT_ROOT_SQL: &str = r"
    SELECT root_folder_id, updated_at
    FROM deckvault_config
    WHERE id = 1
";

/// The currently configured root destination folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootFolderConfig {
    /// Opaque drive-service folder identifier.
    pub folder_id: String,
    /// When the bootstrap controller last wrote the record.
    pub updated_at: DateTime<Utc>,
}

/// Concrete configuration store backed by `PostgreSQL`.
///
/// The record is a single row; the bootstrap controller is the only writer.
#[derive(Clone)]
pub struct ConfigService {
    pool: PgPool,
}

impl ConfigService {
    /// Initialise the store over an existing pool, applying the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be applied.
    pub async fn new(pool: PgPool) -> Result<Self> {
        sqlx::query(CREATE_CONFIG_SQL)
            .execute(&pool)
            .await
            .context("failed to create configuration table")?;
        Ok(Self { pool })
    }

    /// Connect to the database and initialise the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or the
    /// schema cannot be applied.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .context("failed to connect to PostgreSQL for the configuration store")?;
        Self::new(pool).await
    }

    /// Validate and persist a new root folder id.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRootFolder` for a bad id, or
    /// `ConfigError::Persistence` when the write fails.
    pub async fn set_root(&self, raw_folder_id: &str) -> Result<RootFolderConfig, ConfigError> {
        let folder_id = validate_root_folder_id(raw_folder_id)?;
        sqlx::query(UPSERT_ROOT_SQL)
            .bind(folder_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|err| ConfigError::Persistence { source: err.into() })?;
        info!(root_folder_id = %folder_id, "root folder configuration updated");
        Ok(RootFolderConfig {
            folder_id,
            updated_at: Utc::now(),
        })
    }

    /// Read the current root folder record, if any bootstrap has run.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Persistence` when the read fails.
    pub async fn root(&self) -> Result<Option<RootFolderConfig>, ConfigError> {
        let row = sqlx::query(SELECT_ROOT_SQL)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| ConfigError::Persistence { source: err.into() })?;
        row.map(|row| {
            Ok(RootFolderConfig {
                folder_id: row
                    .try_get("root_folder_id")
                    .map_err(|err: sqlx::Error| ConfigError::Persistence { source: err.into() })?,
                updated_at: row
                    .try_get("updated_at")
                    .map_err(|err: sqlx::Error| ConfigError::Persistence { source: err.into() })?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl ConfigStore for ConfigService {
    async fn set_root_folder(&self, folder_id: &str) -> Result<()> {
        self.set_root(folder_id).await?;
        Ok(())
    }

    async fn root_folder(&self) -> Result<Option<String>> {
        Ok(self.root().await?.map(|config| config.folder_id))
    }
}
