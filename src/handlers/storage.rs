use axum::{extract::Path, response::IntoResponse, Extension, Json};
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::AuthUser;
use crate::services::storage_service::{StorageService, UploadInput};

/// GET /api/storage
pub async fn list(Extension(user): Extension<AuthUser>) -> Result<impl IntoResponse, ApiError> {
    let service = StorageService::new().await?;
    let uploads = service.list(user.tenant_id, FilterData::default()).await?;
    Ok(Json(json!({ "success": true, "data": uploads })))
}

/// GET /api/storage/:id
pub async fn get(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let service = StorageService::new().await?;
    let upload = service.get(user.tenant_id, id).await?;
    Ok(Json(json!({ "success": true, "data": upload })))
}

/// POST /api/storage - register upload metadata and preview rows
pub async fn register(
    Extension(user): Extension<AuthUser>,
    Json(input): Json<UploadInput>,
) -> Result<impl IntoResponse, ApiError> {
    if input.filename.trim().is_empty() {
        return Err(ApiError::bad_request("filename is required"));
    }
    let service = StorageService::new().await?;
    let upload = service.register(user.tenant_id, input).await?;
    Ok(Json(json!({ "success": true, "data": upload })))
}

/// DELETE /api/storage/:id
pub async fn delete(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let service = StorageService::new().await?;
    service.delete(user.tenant_id, id).await?;
    Ok(Json(json!({ "success": true, "message": "File removed" })))
}
