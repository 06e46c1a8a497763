use axum::{extract::Path, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::verification_service::{Channel, VerificationService};

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub channel: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct ChannelRequest {
    pub channel: String,
}

/// For the unauthenticated steps of trial onboarding the user id travels in
/// the body; the account cannot log in before it is verified.
#[derive(Debug, Deserialize)]
pub struct PublicVerifyRequest {
    pub user_id: Uuid,
    pub channel: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct PublicChannelRequest {
    pub user_id: Uuid,
    pub channel: String,
}

fn parse_channel(s: &str) -> Result<Channel, ApiError> {
    Channel::parse(s).ok_or_else(|| ApiError::bad_request("channel must be 'email' or 'phone'"))
}

/// POST /api/verification/send-email - issue a code for the current user
pub async fn send_email(Extension(user): Extension<AuthUser>) -> Result<impl IntoResponse, ApiError> {
    let service = VerificationService::new().await?;
    let outcome = service.send_code(user.user_id, Channel::Email).await?;
    Ok(Json(json!({ "success": true, "data": outcome })))
}

/// POST /api/verification/send-phone
pub async fn send_phone(Extension(user): Extension<AuthUser>) -> Result<impl IntoResponse, ApiError> {
    let service = VerificationService::new().await?;
    let outcome = service.send_code(user.user_id, Channel::Phone).await?;
    Ok(Json(json!({ "success": true, "data": outcome })))
}

/// POST /api/verification/verify (public; used during trial onboarding)
pub async fn verify_public(Json(body): Json<PublicVerifyRequest>) -> Result<impl IntoResponse, ApiError> {
    let channel = parse_channel(&body.channel)?;
    let service = VerificationService::new().await?;
    service.verify_code(body.user_id, channel, body.code.trim()).await?;
    Ok(Json(json!({ "success": true, "message": "Verified" })))
}

/// POST /api/verification/verify-auth (authenticated variant)
pub async fn verify_auth(
    Extension(user): Extension<AuthUser>,
    Json(body): Json<VerifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let channel = parse_channel(&body.channel)?;
    let service = VerificationService::new().await?;
    service.verify_code(user.user_id, channel, body.code.trim()).await?;
    Ok(Json(json!({ "success": true, "message": "Verified" })))
}

/// POST /api/verification/resend (public; used during trial onboarding)
pub async fn resend_public(Json(body): Json<PublicChannelRequest>) -> Result<impl IntoResponse, ApiError> {
    let channel = parse_channel(&body.channel)?;
    let service = VerificationService::new().await?;
    let outcome = service.resend_code(body.user_id, channel).await?;
    Ok(Json(json!({ "success": true, "data": outcome })))
}

/// POST /api/verification/resend-auth
pub async fn resend_auth(
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ChannelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let channel = parse_channel(&body.channel)?;
    let service = VerificationService::new().await?;
    let outcome = service.resend_code(user.user_id, channel).await?;
    Ok(Json(json!({ "success": true, "data": outcome })))
}

/// GET /api/verification/status
pub async fn status(Extension(user): Extension<AuthUser>) -> Result<impl IntoResponse, ApiError> {
    let service = VerificationService::new().await?;
    let status = service.status(user.user_id).await?;
    Ok(Json(json!({ "success": true, "data": status })))
}

/// GET /api/verification/status/:user_id (public polling during onboarding)
pub async fn status_by_id(Path(user_id): Path<Uuid>) -> Result<impl IntoResponse, ApiError> {
    let service = VerificationService::new().await?;
    let status = service.status(user_id).await?;
    Ok(Json(json!({ "success": true, "data": status })))
}

/// POST /api/verification/cleanup (admin)
pub async fn cleanup(Extension(_user): Extension<AuthUser>) -> Result<impl IntoResponse, ApiError> {
    let service = VerificationService::new().await?;
    let removed = service.cleanup_expired().await?;
    Ok(Json(json!({ "success": true, "data": { "removed": removed } })))
}
