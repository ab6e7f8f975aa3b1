//! Transfer record database operations

use courier_common::Manifest;
use courier_common::validators::validate_fingerprint;
use sqlx::sqlite::SqlitePool;

use crate::db::sql;
use crate::errors::PersistenceError;

/// A transfer record from the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub id: String,
    pub artifact_name: String,
    pub recipient_email: String,
    pub sender_email: String,
    pub manifest: Manifest,
    pub total_size: u64,
    pub fingerprint: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub downloaded: bool,
    pub downloaded_at: Option<i64>,
}

impl TransferRecord {
    /// Expired once `now` reaches `expires_at`
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// Row type for transfer queries
type TransferRow = (
    String,
    String,
    String,
    String,
    String,
    i64,
    String,
    i64,
    i64,
    bool,
    Option<i64>,
);

impl TryFrom<TransferRow> for TransferRecord {
    type Error = PersistenceError;

    fn try_from(row: TransferRow) -> Result<Self, Self::Error> {
        let manifest = Manifest::from_json(&row.4).map_err(|e| PersistenceError::Corrupt {
            id: row.0.clone(),
            reason: format!("manifest: {e}"),
        })?;
        let total_size = u64::try_from(row.5).map_err(|_| PersistenceError::Corrupt {
            id: row.0.clone(),
            reason: format!("negative total_size {}", row.5),
        })?;
        validate_fingerprint(&row.6).map_err(|e| PersistenceError::Corrupt {
            id: row.0.clone(),
            reason: format!("fingerprint: {e:?}"),
        })?;

        Ok(Self {
            id: row.0,
            artifact_name: row.1,
            recipient_email: row.2,
            sender_email: row.3,
            manifest,
            total_size,
            fingerprint: row.6,
            created_at: row.7,
            expires_at: row.8,
            downloaded: row.9,
            downloaded_at: row.10,
        })
    }
}

fn rows_to_records(rows: Vec<TransferRow>) -> Result<Vec<TransferRecord>, PersistenceError> {
    rows.into_iter().map(TransferRecord::try_from).collect()
}

/// Database access for transfer records
#[derive(Clone)]
pub struct TransferDb {
    pool: SqlitePool,
}

impl TransferDb {
    /// Create a new TransferDb instance
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new transfer record
    ///
    /// The `downloaded` flag of the passed record is ignored; new records always
    /// start undelivered. Fails with `IdCollision` if the id is live or was
    /// retired by an earlier sweep.
    pub async fn create(&self, record: &TransferRecord) -> Result<(), PersistenceError> {
        let manifest_json =
            record
                .manifest
                .to_json()
                .map_err(|e| PersistenceError::Corrupt {
                    id: record.id.clone(),
                    reason: format!("manifest: {e}"),
                })?;
        let total_size = i64::try_from(record.total_size).map_err(|_| PersistenceError::Corrupt {
            id: record.id.clone(),
            reason: "total_size exceeds i64".to_string(),
        })?;

        let result = sqlx::query(sql::SQL_INSERT_TRANSFER)
            .bind(&record.id)
            .bind(&record.artifact_name)
            .bind(&record.recipient_email)
            .bind(&record.sender_email)
            .bind(manifest_json)
            .bind(total_size)
            .bind(&record.fingerprint)
            .bind(record.created_at)
            .bind(record.expires_at)
            .bind(&record.id)
            .execute(&self.pool)
            .await;

        match result {
            // Nothing inserted: the id was retired
            Ok(done) if done.rows_affected() == 0 => {
                Err(PersistenceError::IdCollision(record.id.clone()))
            }
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(PersistenceError::IdCollision(record.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get a transfer by id
    pub async fn get(&self, id: &str) -> Result<Option<TransferRecord>, PersistenceError> {
        let row: Option<TransferRow> = sqlx::query_as(sql::SQL_SELECT_TRANSFER)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TransferRecord::try_from).transpose()
    }

    /// Atomically flip `downloaded` from false to true
    ///
    /// Returns true only for the single call that performed the transition.
    pub async fn mark_downloaded_if_first(
        &self,
        id: &str,
        now: i64,
    ) -> Result<bool, PersistenceError> {
        let result = sqlx::query(sql::SQL_MARK_DOWNLOADED_IF_FIRST)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// List all transfers with `expires_at < now`
    pub async fn list_expired(&self, now: i64) -> Result<Vec<TransferRecord>, PersistenceError> {
        let rows: Vec<TransferRow> = sqlx::query_as(sql::SQL_SELECT_EXPIRED_TRANSFERS)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        rows_to_records(rows)
    }

    /// List the most recent transfers, newest first
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<TransferRecord>, PersistenceError> {
        let rows: Vec<TransferRow> = sqlx::query_as(sql::SQL_SELECT_RECENT_TRANSFERS)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows_to_records(rows)
    }

    /// Delete a transfer and retire its id
    ///
    /// Idempotent: deleting an absent id is not an error. Returns true if a
    /// record was deleted.
    pub async fn delete(&self, id: &str, now: i64) -> Result<bool, PersistenceError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(sql::SQL_DELETE_TRANSFER)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = result.rows_affected() > 0;

        if deleted {
            sqlx::query(sql::SQL_RETIRE_ID)
                .bind(id)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(deleted)
    }
}
