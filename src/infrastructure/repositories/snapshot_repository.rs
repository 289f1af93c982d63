//! Snapshot Repository Implementation
//!
//! PostgreSQL and in-memory implementations of the SnapshotStore trait.
//! Versions are numbered per document starting at 1.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sqlx::PgPool;

use crate::domain::{Identity, SnapshotChange, SnapshotRecord, SnapshotStore};
use crate::shared::error::AppError;

/// Database row representation matching the tool_versions table schema.
#[derive(Debug, sqlx::FromRow)]
struct SnapshotRow {
    document_id: String,
    version_number: i32,
    changed_by: String,
    change_description: String,
    created_at: DateTime<Utc>,
}

impl SnapshotRow {
    fn into_record(self) -> SnapshotRecord {
        SnapshotRecord {
            document_id: self.document_id,
            version_number: self.version_number,
            changed_by: Identity::new(self.changed_by),
            change_description: self.change_description,
            created_at: self.created_at,
        }
    }
}

/// PostgreSQL snapshot repository.
#[derive(Clone)]
pub struct PgSnapshotRepository {
    pool: PgPool,
}

impl PgSnapshotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotStore for PgSnapshotRepository {
    async fn save_snapshot(
        &self,
        document_id: &str,
        change: &SnapshotChange,
    ) -> Result<SnapshotRecord, AppError> {
        let mut tx = self.pool.begin().await?;

        // Serializes version numbering per document until commit
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query_as::<_, SnapshotRow>(
            r#"
            INSERT INTO tool_versions (document_id, version_number, changed_by, change_description, content)
            SELECT $1, COALESCE(MAX(version_number), 0) + 1, $2, $3, $4
            FROM tool_versions
            WHERE document_id = $1
            RETURNING document_id, version_number, changed_by, change_description, created_at
            "#,
        )
        .bind(document_id)
        .bind(change.changed_by.as_str())
        .bind(&change.description)
        .bind(&change.content)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            document_id = %document_id,
            version = row.version_number,
            "Snapshot saved"
        );

        Ok(row.into_record())
    }

    async fn list_versions(&self, document_id: &str) -> Result<Vec<SnapshotRecord>, AppError> {
        let rows = sqlx::query_as::<_, SnapshotRow>(
            r#"
            SELECT document_id, version_number, changed_by, change_description, created_at
            FROM tool_versions
            WHERE document_id = $1
            ORDER BY version_number ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SnapshotRow::into_record).collect())
    }
}

/// Process-local snapshot store, used when no database is configured.
#[derive(Default)]
pub struct InMemorySnapshotStore {
    versions: DashMap<String, Vec<SnapshotRecord>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save_snapshot(
        &self,
        document_id: &str,
        change: &SnapshotChange,
    ) -> Result<SnapshotRecord, AppError> {
        let mut versions = self.versions.entry(document_id.to_string()).or_default();
        let record = SnapshotRecord {
            document_id: document_id.to_string(),
            version_number: versions.len() as i32 + 1,
            changed_by: change.changed_by.clone(),
            change_description: change.description.clone(),
            created_at: Utc::now(),
        };
        versions.push(record.clone());
        Ok(record)
    }

    async fn list_versions(&self, document_id: &str) -> Result<Vec<SnapshotRecord>, AppError> {
        Ok(self
            .versions
            .get(document_id)
            .map(|v| v.clone())
            .unwrap_or_default())
    }
}
