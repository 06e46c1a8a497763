use axum::{extract::Path, response::IntoResponse, Extension, Json};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::ml_slot_service::{MlSlotService, SlotInput};

/// GET /api/ml-slots - slot usage against the plan ceiling
pub async fn overview(Extension(user): Extension<AuthUser>) -> Result<impl IntoResponse, ApiError> {
    let service = MlSlotService::new().await?;
    let overview = service.overview(user.tenant_id).await?;
    Ok(Json(json!({ "success": true, "data": overview })))
}

/// POST /api/ml-slots
pub async fn create(
    Extension(user): Extension<AuthUser>,
    Json(input): Json<SlotInput>,
) -> Result<impl IntoResponse, ApiError> {
    let service = MlSlotService::new().await?;
    let slot = service.create(user.tenant_id, input).await?;
    Ok(Json(json!({ "success": true, "data": slot })))
}

/// DELETE /api/ml-slots/:id - free the slot, keep its history
pub async fn deactivate(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let service = MlSlotService::new().await?;
    service.deactivate(user.tenant_id, id).await?;
    Ok(Json(json!({ "success": true, "message": "Slot deactivated" })))
}

/// POST /api/ml-slots/:id/usage
pub async fn record_usage(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(detail): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let service = MlSlotService::new().await?;
    let usage = service.record_usage(user.tenant_id, id, detail).await?;
    Ok(Json(json!({ "success": true, "data": usage })))
}

/// GET /api/ml-slots/:id/usage
pub async fn usage_history(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let service = MlSlotService::new().await?;
    let history = service.usage_history(user.tenant_id, id).await?;
    Ok(Json(json!({ "success": true, "data": history })))
}
