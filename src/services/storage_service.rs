use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::FileUpload;
use crate::database::Repository;
use crate::filter::FilterData;

#[derive(Debug, Clone, Deserialize)]
pub struct UploadInput {
    pub filename: String,
    pub content_type: Option<String>,
    #[serde(default)]
    pub size_bytes: i64,
    #[serde(default)]
    pub total_rows: i32,
    /// First rows of the parsed file; feeds the widget `file` data source
    #[serde(default)]
    pub preview_data: Value,
}

pub struct StorageService {
    pool: PgPool,
}

impl StorageService {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self { pool: DatabaseManager::pool().await? })
    }

    fn uploads(&self, tenant_id: Uuid) -> Repository<FileUpload> {
        Repository::new("file_uploads", self.pool.clone(), tenant_id)
    }

    pub async fn list(&self, tenant_id: Uuid, filter: FilterData) -> Result<Vec<FileUpload>, DatabaseError> {
        self.uploads(tenant_id).select_any(filter).await
    }

    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<FileUpload, DatabaseError> {
        self.uploads(tenant_id).select_by_id(id).await
    }

    pub async fn register(&self, tenant_id: Uuid, input: UploadInput) -> Result<FileUpload, DatabaseError> {
        let preview = if input.preview_data.is_array() { input.preview_data } else { Value::Array(vec![]) };
        let row = sqlx::query_as::<_, FileUpload>(
            r#"
            INSERT INTO file_uploads (tenant_id, filename, content_type, size_bytes, total_rows, preview_data)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&input.filename)
        .bind(&input.content_type)
        .bind(input.size_bytes)
        .bind(input.total_rows)
        .bind(&preview)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<(), DatabaseError> {
        let done = sqlx::query(
            "UPDATE file_uploads SET is_active = FALSE, updated_at = now() WHERE id = $1 AND tenant_id = $2 AND is_active = TRUE",
        )
        .bind(id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;
        if done.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("File not found".to_string()));
        }
        Ok(())
    }
}
