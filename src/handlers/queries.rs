use axum::{extract::Path, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::AuthUser;
use crate::services::saved_query_service::{SavedQueryInput, SavedQueryService};

#[derive(Debug, Deserialize, Default)]
pub struct ExecuteRequest {
    pub cache_ttl_secs: Option<i64>,
}

/// GET /api/query-builders
pub async fn list(Extension(user): Extension<AuthUser>) -> Result<impl IntoResponse, ApiError> {
    let service = SavedQueryService::new().await?;
    let queries = service.list(user.tenant_id, FilterData::default()).await?;
    Ok(Json(json!({ "success": true, "data": queries })))
}

/// GET /api/query-builders/:id
pub async fn get(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let service = SavedQueryService::new().await?;
    let query = service.get(user.tenant_id, id).await?;
    Ok(Json(json!({ "success": true, "data": query })))
}

/// POST /api/query-builders - definitions are compiled at save time so a
/// bad filter fails here, not at execution
pub async fn create(
    Extension(user): Extension<AuthUser>,
    Json(input): Json<SavedQueryInput>,
) -> Result<impl IntoResponse, ApiError> {
    if input.name.trim().is_empty() {
        return Err(ApiError::bad_request("query name is required"));
    }
    crate::services::saved_query_service::validate_definition(&input.table_name, &input.filter)?;
    let service = SavedQueryService::new().await?;
    let query = service.create(user.tenant_id, input).await?;
    Ok(Json(json!({ "success": true, "data": query })))
}

/// PUT /api/query-builders/:id
pub async fn update(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<SavedQueryInput>,
) -> Result<impl IntoResponse, ApiError> {
    crate::services::saved_query_service::validate_definition(&input.table_name, &input.filter)?;
    let service = SavedQueryService::new().await?;
    let query = service.update(user.tenant_id, id, input).await?;
    Ok(Json(json!({ "success": true, "data": query })))
}

/// DELETE /api/query-builders/:id
pub async fn delete(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let service = SavedQueryService::new().await?;
    service.delete(user.tenant_id, id).await?;
    Ok(Json(json!({ "success": true, "message": "Saved query removed" })))
}

/// POST /api/query-builders/:id/execute
pub async fn execute(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    body: Option<Json<ExecuteRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let ttl = body.and_then(|b| b.0.cache_ttl_secs);
    let service = SavedQueryService::new().await?;
    let response = service.execute(user.tenant_id, id, ttl).await?;
    Ok(Json(json!({
        "success": true,
        "data": response.data,
        "metadata": response.metadata,
        "cached": response.cached,
    })))
}
