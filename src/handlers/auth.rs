use axum::{response::IntoResponse, Extension, Json};
use serde_json::json;

use crate::error::ApiError;
use crate::middleware::AuthUser;

/// GET /api/auth/whoami - current token's identity
pub async fn whoami(Extension(user): Extension<AuthUser>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(json!({
        "success": true,
        "data": {
            "user_id": user.user_id,
            "tenant_id": user.tenant_id,
            "email": user.email,
            "role": user.role,
        }
    })))
}
