use axum::{extract::Path, response::IntoResponse, Extension, Json};
use serde_json::json;
use uuid::Uuid;

use crate::connector::{ConnectionKind, ConnectionSpec, ConnectorService, QueryRequest};
use crate::error::ApiError;
use crate::middleware::AuthUser;

const SQL_KINDS: &[ConnectionKind] = &[
    ConnectionKind::Postgresql,
    ConnectionKind::Mysql,
    ConnectionKind::Sqlserver,
];

const API_KINDS: &[ConnectionKind] = &[ConnectionKind::RestApi, ConnectionKind::Webhook];

/// GET /api/database-connections - SQL-kind connections, credentials stripped
pub async fn list_database(Extension(user): Extension<AuthUser>) -> Result<impl IntoResponse, ApiError> {
    let service = ConnectorService::new().await?;
    let connections = service.list_connections(user.tenant_id, Some(SQL_KINDS)).await?;
    Ok(Json(json!({ "success": true, "data": connections })))
}

/// GET /api/api-connections - REST/webhook connections
pub async fn list_api(Extension(user): Extension<AuthUser>) -> Result<impl IntoResponse, ApiError> {
    let service = ConnectorService::new().await?;
    let connections = service.list_connections(user.tenant_id, Some(API_KINDS)).await?;
    Ok(Json(json!({ "success": true, "data": connections })))
}

/// POST /api/database-connections - probe and persist a new connection.
/// A failed probe fails the whole request; nothing is written.
pub async fn create(
    Extension(user): Extension<AuthUser>,
    Json(spec): Json<ConnectionSpec>,
) -> Result<impl IntoResponse, ApiError> {
    let service = ConnectorService::new().await?;
    let connection = service.create_connection(user.tenant_id, spec).await?;
    Ok(Json(json!({
        "success": true,
        "data": {
            "id": connection.id,
            "name": connection.name,
            "kind": connection.kind,
            "last_tested_at": connection.last_tested_at,
            "test_result": connection.test_result,
        },
        "message": "Connection created and tested"
    })))
}

/// POST /api/database-connections/test - probe without persisting
pub async fn test(
    Extension(_user): Extension<AuthUser>,
    Json(spec): Json<ConnectionSpec>,
) -> Result<impl IntoResponse, ApiError> {
    let service = ConnectorService::new().await?;
    let outcome = service.test_connection(&spec).await;
    Ok(Json(json!({ "success": outcome.success, "data": outcome })))
}

/// POST /api/database-connections/:id/test - re-probe a stored connection
pub async fn retest(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let service = ConnectorService::new().await?;
    let outcome = service.retest(user.tenant_id, id).await?;
    Ok(Json(json!({ "success": outcome.success, "data": outcome })))
}

/// GET /api/database-connections/:id/tables
pub async fn tables(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let service = ConnectorService::new().await?;
    let tables = service.list_tables(user.tenant_id, id).await?;
    Ok(Json(json!({ "success": true, "data": tables })))
}

/// POST /api/database-connections/query - run a query, cache-aware
pub async fn query(
    Extension(user): Extension<AuthUser>,
    Json(request): Json<QueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let service = ConnectorService::new().await?;
    let response = service.execute_query(user.tenant_id, request).await?;
    Ok(Json(json!({
        "success": true,
        "data": response.data,
        "metadata": response.metadata,
        "cached": response.cached,
        "cached_at": response.cached_at,
        "executed_at": response.executed_at,
    })))
}

/// DELETE /api/database-connections/:id - soft delete
pub async fn delete(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let service = ConnectorService::new().await?;
    service.deactivate(user.tenant_id, id).await?;
    Ok(Json(json!({ "success": true, "message": "Connection removed" })))
}
