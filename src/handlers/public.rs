use axum::{response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{self, Claims};
use crate::database::manager::DatabaseManager;
use crate::database::models::User;
use crate::error::ApiError;
use crate::services::trial_service::{TrialService, TrialSignup};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email address or CPF; digits-only input is treated as CPF
    pub identifier: String,
    pub password: String,
}

/// POST /api/auth/login - exchange credentials for a JWT
pub async fn login(Json(body): Json<LoginRequest>) -> Result<impl IntoResponse, ApiError> {
    let identifier = body.identifier.trim();
    if identifier.is_empty() || body.password.is_empty() {
        return Err(ApiError::bad_request("identifier and password are required"));
    }

    let pool = DatabaseManager::pool().await?;

    let is_email = identifier.contains('@');
    let user = if is_email {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(identifier.to_lowercase())
            .fetch_optional(&pool)
            .await
            .map_err(crate::database::manager::DatabaseError::Sqlx)?
    } else {
        let cpf: String = identifier.chars().filter(|c| c.is_ascii_digit()).collect();
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE cpf = $1")
            .bind(cpf)
            .fetch_optional(&pool)
            .await
            .map_err(crate::database::manager::DatabaseError::Sqlx)?
    };

    let user = user.ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    let valid = bcrypt::verify(&body.password, &user.password_hash)
        .map_err(|e| ApiError::internal_server_error(format!("verification failed: {}", e)))?;
    if !valid {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }
    if !user.is_active {
        return Err(ApiError::forbidden(
            "Account pending verification. Confirm your email and phone to activate it.",
        ));
    }

    let claims = Claims::new(user.tenant_id, user.id, user.email.clone(), user.role.clone());
    let token = auth::generate_token(&claims)
        .map_err(|e| ApiError::internal_server_error(format!("token generation failed: {}", e)))?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "token": token,
            "user": {
                "id": user.id,
                "email": user.email,
                "first_name": user.first_name,
                "last_name": user.last_name,
                "role": user.role,
                "tenant_id": user.tenant_id,
            }
        }
    })))
}

/// POST /api/trial/signup - provision a trial tenant and admin user
pub async fn trial_signup(Json(body): Json<TrialSignup>) -> Result<impl IntoResponse, ApiError> {
    let service = TrialService::new().await?;
    let account = service.signup(body).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "tenant_id": account.tenant_id,
            "user_id": account.user_id,
            "trial_ends_at": account.trial_ends_at,
        },
        "message": "Trial account created. Check your email and phone for verification codes."
    })))
}
