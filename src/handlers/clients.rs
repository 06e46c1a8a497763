use axum::{extract::Path, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::client::Client;
use crate::database::Repository;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct ClientInput {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document: Option<String>,
    pub notes: Option<String>,
}

/// GET /api/clients
pub async fn list(Extension(user): Extension<AuthUser>) -> Result<impl IntoResponse, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let clients = Repository::<Client>::new("clients", pool, user.tenant_id)
        .select_any(FilterData::default())
        .await?;
    Ok(Json(json!({ "success": true, "data": clients })))
}

/// POST /api/clients/search
pub async fn search(
    Extension(user): Extension<AuthUser>,
    Json(filter): Json<FilterData>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let clients = Repository::<Client>::new("clients", pool, user.tenant_id)
        .select_any(filter)
        .await?;
    Ok(Json(json!({ "success": true, "data": clients })))
}

/// GET /api/clients/:id
pub async fn get(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let client = Repository::<Client>::new("clients", pool, user.tenant_id)
        .select_by_id(id)
        .await?;
    Ok(Json(json!({ "success": true, "data": client })))
}

/// POST /api/clients
pub async fn create(
    Extension(user): Extension<AuthUser>,
    Json(input): Json<ClientInput>,
) -> Result<impl IntoResponse, ApiError> {
    if input.name.trim().is_empty() {
        return Err(ApiError::bad_request("client name is required"));
    }
    let pool = DatabaseManager::pool().await?;
    let client = sqlx::query_as::<_, Client>(
        r#"
        INSERT INTO clients (tenant_id, name, email, phone, document, notes)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(user.tenant_id)
    .bind(&input.name)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(&input.document)
    .bind(&input.notes)
    .fetch_one(&pool)
    .await
    .map_err(DatabaseError::Sqlx)?;
    Ok(Json(json!({ "success": true, "data": client })))
}

/// PUT /api/clients/:id
pub async fn update(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<ClientInput>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let client = sqlx::query_as::<_, Client>(
        r#"
        UPDATE clients SET name = $1, email = $2, phone = $3, document = $4, notes = $5, updated_at = now()
        WHERE id = $6 AND tenant_id = $7 AND is_active = TRUE
        RETURNING *
        "#,
    )
    .bind(&input.name)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(&input.document)
    .bind(&input.notes)
    .bind(id)
    .bind(user.tenant_id)
    .fetch_optional(&pool)
    .await
    .map_err(DatabaseError::Sqlx)?
    .ok_or_else(|| ApiError::not_found("Client not found"))?;
    Ok(Json(json!({ "success": true, "data": client })))
}

/// DELETE /api/clients/:id
pub async fn delete(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let done = sqlx::query(
        "UPDATE clients SET is_active = FALSE, updated_at = now() WHERE id = $1 AND tenant_id = $2 AND is_active = TRUE",
    )
    .bind(id)
    .bind(user.tenant_id)
    .execute(&pool)
    .await
    .map_err(DatabaseError::Sqlx)?;
    if done.rows_affected() == 0 {
        return Err(ApiError::not_found("Client not found"));
    }
    Ok(Json(json!({ "success": true, "message": "Client removed" })))
}
