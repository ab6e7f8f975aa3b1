//! Server configuration database operations

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::sql::{SQL_GET_CONFIG, SQL_UPSERT_CONFIG};
use crate::constants::{
    CONFIG_KEY_SMTP_PASSWORD, CONFIG_KEY_SMTP_PORT, CONFIG_KEY_SMTP_SENDER,
    CONFIG_KEY_SMTP_SERVER, CONFIG_KEY_SMTP_USER,
};
use crate::errors::{ConfigurationError, PersistenceError};
use crate::notify::{RawSmtpSettings, SmtpSettings, SmtpSettingsSource};

/// Database interface for server configuration
#[derive(Clone)]
pub struct ConfigDb {
    pool: SqlitePool,
}

impl ConfigDb {
    /// Create a new ConfigDb instance
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a configuration value, or `None` if the key is absent
    pub async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let value = sqlx::query_scalar::<_, String>(SQL_GET_CONFIG)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    /// Set a configuration value, inserting the key if needed
    pub async fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        sqlx::query(SQL_UPSERT_CONFIG)
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Load the stored SMTP parameters without validating them
    ///
    /// Absent keys read as empty strings.
    pub async fn load_smtp_raw(&self) -> Result<RawSmtpSettings, PersistenceError> {
        Ok(RawSmtpSettings {
            server: self.get(CONFIG_KEY_SMTP_SERVER).await?.unwrap_or_default(),
            port: self.get(CONFIG_KEY_SMTP_PORT).await?.unwrap_or_default(),
            user: self.get(CONFIG_KEY_SMTP_USER).await?.unwrap_or_default(),
            password: self.get(CONFIG_KEY_SMTP_PASSWORD).await?.unwrap_or_default(),
            sender: self.get(CONFIG_KEY_SMTP_SENDER).await?.unwrap_or_default(),
        })
    }

    /// Persist validated SMTP parameters in one transaction
    pub async fn save_smtp(&self, settings: &SmtpSettings) -> Result<(), PersistenceError> {
        let raw = RawSmtpSettings::from(settings);
        let pairs = [
            (CONFIG_KEY_SMTP_SERVER, raw.server),
            (CONFIG_KEY_SMTP_PORT, raw.port),
            (CONFIG_KEY_SMTP_USER, raw.user),
            (CONFIG_KEY_SMTP_PASSWORD, raw.password),
            (CONFIG_KEY_SMTP_SENDER, raw.sender),
        ];

        let mut tx = self.pool.begin().await?;
        for (key, value) in pairs {
            sqlx::query(SQL_UPSERT_CONFIG)
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(())
    }
}

#[async_trait]
impl SmtpSettingsSource for ConfigDb {
    async fn smtp_settings(&self) -> Result<SmtpSettings, ConfigurationError> {
        let raw = self
            .load_smtp_raw()
            .await
            .map_err(|e| ConfigurationError::Unavailable(e.to_string()))?;
        raw.resolve()
    }
}
