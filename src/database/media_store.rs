use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::content::{AssociatedMedia, ContentError, ContentType, MediaStore, SourceRecord};

pub struct PgMediaStore {
    pool: PgPool,
}

impl PgMediaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_media(row: sqlx::postgres::PgRow) -> Result<AssociatedMedia, ContentError> {
        let raw_type: String = row.try_get("content_type")?;
        let content_type = ContentType::parse(&raw_type)
            .ok_or_else(|| ContentError::Store(format!("unknown content type: {}", raw_type)))?;

        let source_records: Vec<SourceRecord> = row
            .try_get::<Option<serde_json::Value>, _>("source_records")?
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| ContentError::Store(format!("bad provenance records: {}", e)))?
            .unwrap_or_default();

        Ok(AssociatedMedia {
            id: row.try_get("id")?,
            parent_id: row.try_get("parent_id")?,
            content_type,
            location: row.try_get("location")?,
            size: row.try_get("size")?,
            version: row.try_get("version")?,
            source_records,
            access_tier: None,
        })
    }
}

#[async_trait]
impl MediaStore for PgMediaStore {
    async fn get_media_by_parent_id(
        &self,
        parent_id: &str,
        version: Option<&str>,
    ) -> Result<Vec<AssociatedMedia>, ContentError> {
        let rows = sqlx::query(
            "SELECT id, parent_id, content_type, location, size, version, source_records \
             FROM associated_media \
             WHERE parent_id = $1 AND ($2::text IS NULL OR version = $2)",
        )
        .bind(parent_id)
        .bind(version)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_media).collect()
    }

    async fn get_media_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Vec<AssociatedMedia>, ContentError> {
        let rows = sqlx::query(
            "SELECT id, parent_id, content_type, location, size, version, source_records \
             FROM associated_media \
             WHERE external_id = $1",
        )
        .bind(external_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_media).collect()
    }
}
