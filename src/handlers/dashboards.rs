use axum::{extract::Path, response::IntoResponse, Extension, Json};
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::AuthUser;
use crate::services::dashboard_service::{DashboardInput, DashboardService, WidgetInput};

/// GET /api/dashboards
pub async fn list(Extension(user): Extension<AuthUser>) -> Result<impl IntoResponse, ApiError> {
    let service = DashboardService::new().await?;
    let dashboards = service.list(user.tenant_id, FilterData::default()).await?;
    Ok(Json(json!({ "success": true, "data": dashboards })))
}

/// POST /api/dashboards/search - list with the platform filter language
pub async fn search(
    Extension(user): Extension<AuthUser>,
    Json(filter): Json<FilterData>,
) -> Result<impl IntoResponse, ApiError> {
    let service = DashboardService::new().await?;
    let dashboards = service.list(user.tenant_id, filter).await?;
    Ok(Json(json!({ "success": true, "data": dashboards })))
}

/// GET /api/dashboards/:id
pub async fn get(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let service = DashboardService::new().await?;
    let dashboard = service.get(user.tenant_id, id).await?;
    let widgets = service.list_widgets(user.tenant_id, id).await?;
    Ok(Json(json!({ "success": true, "data": { "dashboard": dashboard, "widgets": widgets } })))
}

/// POST /api/dashboards
pub async fn create(
    Extension(user): Extension<AuthUser>,
    Json(input): Json<DashboardInput>,
) -> Result<impl IntoResponse, ApiError> {
    if input.name.trim().is_empty() {
        return Err(ApiError::bad_request("dashboard name is required"));
    }
    let service = DashboardService::new().await?;
    let dashboard = service.create(user.tenant_id, input).await?;
    Ok(Json(json!({ "success": true, "data": dashboard })))
}

/// PUT /api/dashboards/:id
pub async fn update(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<DashboardInput>,
) -> Result<impl IntoResponse, ApiError> {
    let service = DashboardService::new().await?;
    let dashboard = service.update(user.tenant_id, id, input).await?;
    Ok(Json(json!({ "success": true, "data": dashboard })))
}

/// DELETE /api/dashboards/:id
pub async fn delete(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let service = DashboardService::new().await?;
    service.delete(user.tenant_id, id).await?;
    Ok(Json(json!({ "success": true, "message": "Dashboard removed" })))
}

/// POST /api/dashboards/:id/widgets
pub async fn create_widget(
    Extension(user): Extension<AuthUser>,
    Path(dashboard_id): Path<Uuid>,
    Json(input): Json<WidgetInput>,
) -> Result<impl IntoResponse, ApiError> {
    let service = DashboardService::new().await?;
    let widget = service.create_widget(user.tenant_id, dashboard_id, input).await?;
    Ok(Json(json!({ "success": true, "data": widget })))
}

/// PUT /api/dashboards/widgets/:id
pub async fn update_widget(
    Extension(user): Extension<AuthUser>,
    Path(widget_id): Path<Uuid>,
    Json(input): Json<WidgetInput>,
) -> Result<impl IntoResponse, ApiError> {
    let service = DashboardService::new().await?;
    let widget = service.update_widget(user.tenant_id, widget_id, input).await?;
    Ok(Json(json!({ "success": true, "data": widget })))
}

/// DELETE /api/dashboards/widgets/:id
pub async fn delete_widget(
    Extension(user): Extension<AuthUser>,
    Path(widget_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let service = DashboardService::new().await?;
    service.delete_widget(user.tenant_id, widget_id).await?;
    Ok(Json(json!({ "success": true, "message": "Widget removed" })))
}

/// GET /api/dashboards/widgets/:id/data - resolve the data source and run
/// the widget pipeline. Always 200; failures ride in the payload so a broken
/// tile renders an error state instead of failing the page.
pub async fn widget_data(
    Extension(user): Extension<AuthUser>,
    Path(widget_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let service = DashboardService::new().await?;
    let payload = service.widget_data(user.tenant_id, widget_id).await;
    Ok(Json(payload))
}
