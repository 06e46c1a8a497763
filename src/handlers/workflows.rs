use axum::{extract::Path, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::AuthUser;
use crate::services::workflow_service::{TemplateInput, WorkflowInput, WorkflowService};

#[derive(Debug, Deserialize)]
pub struct InstantiateRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

// Task templates (/api/advanced-tasks)

/// GET /api/advanced-tasks
pub async fn list_templates(Extension(user): Extension<AuthUser>) -> Result<impl IntoResponse, ApiError> {
    let service = WorkflowService::new().await?;
    let templates = service.list_templates(user.tenant_id, FilterData::default()).await?;
    Ok(Json(json!({ "success": true, "data": templates })))
}

/// POST /api/advanced-tasks
pub async fn create_template(
    Extension(user): Extension<AuthUser>,
    Json(input): Json<TemplateInput>,
) -> Result<impl IntoResponse, ApiError> {
    if input.name.trim().is_empty() {
        return Err(ApiError::bad_request("template name is required"));
    }
    let service = WorkflowService::new().await?;
    let template = service.create_template(user.tenant_id, input).await?;
    Ok(Json(json!({ "success": true, "data": template })))
}

/// DELETE /api/advanced-tasks/:id
pub async fn delete_template(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let service = WorkflowService::new().await?;
    service.delete_template(user.tenant_id, id).await?;
    Ok(Json(json!({ "success": true, "message": "Template removed" })))
}

/// POST /api/advanced-tasks/:id/instantiate - spawn a draft workflow from a
/// template
pub async fn instantiate(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<InstantiateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let service = WorkflowService::new().await?;
    let workflow = service.instantiate_template(user.tenant_id, id, &body.name).await?;
    Ok(Json(json!({ "success": true, "data": workflow })))
}

// Workflows (/api/complete-workflows)

/// GET /api/complete-workflows
pub async fn list(Extension(user): Extension<AuthUser>) -> Result<impl IntoResponse, ApiError> {
    let service = WorkflowService::new().await?;
    let workflows = service.list_workflows(user.tenant_id, FilterData::default()).await?;
    Ok(Json(json!({ "success": true, "data": workflows })))
}

/// POST /api/complete-workflows/search
pub async fn search(
    Extension(user): Extension<AuthUser>,
    Json(filter): Json<FilterData>,
) -> Result<impl IntoResponse, ApiError> {
    let service = WorkflowService::new().await?;
    let workflows = service.list_workflows(user.tenant_id, filter).await?;
    Ok(Json(json!({ "success": true, "data": workflows })))
}

/// GET /api/complete-workflows/:id
pub async fn get(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let service = WorkflowService::new().await?;
    let workflow = service.get_workflow(user.tenant_id, id).await?;
    Ok(Json(json!({ "success": true, "data": workflow })))
}

/// POST /api/complete-workflows
pub async fn create(
    Extension(user): Extension<AuthUser>,
    Json(input): Json<WorkflowInput>,
) -> Result<impl IntoResponse, ApiError> {
    if input.name.trim().is_empty() {
        return Err(ApiError::bad_request("workflow name is required"));
    }
    let service = WorkflowService::new().await?;
    let workflow = service.create_workflow(user.tenant_id, input).await?;
    Ok(Json(json!({ "success": true, "data": workflow })))
}

/// PUT /api/complete-workflows/:id
pub async fn update(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<WorkflowInput>,
) -> Result<impl IntoResponse, ApiError> {
    let service = WorkflowService::new().await?;
    let workflow = service.update_workflow(user.tenant_id, id, input).await?;
    Ok(Json(json!({ "success": true, "data": workflow })))
}

/// DELETE /api/complete-workflows/:id
pub async fn delete(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let service = WorkflowService::new().await?;
    service.delete_workflow(user.tenant_id, id).await?;
    Ok(Json(json!({ "success": true, "message": "Workflow removed" })))
}

/// POST /api/complete-workflows/:id/status - drive the status machine
pub async fn transition(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let service = WorkflowService::new().await?;
    let workflow = service.transition(user.tenant_id, id, &body.status).await?;
    Ok(Json(json!({ "success": true, "data": workflow })))
}
