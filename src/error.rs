// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 429 Too Many Requests
    TooManyRequests(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (external system issues)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::TooManyRequests(_) => 429,
            ApiError::InternalServerError(_) => 500,
            ApiError::BadGateway(_) => 502,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::ValidationError(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::TooManyRequests(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::BadGateway(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::TooManyRequests(_) => "TOO_MANY_REQUESTS",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::BadGateway(_) => "BAD_GATEWAY",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "success": false,
            "error": self.message(),
            "code": self.error_code()
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        ApiError::ValidationError(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        ApiError::TooManyRequests(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert module error types to ApiError
impl From<crate::database::manager::DatabaseError> for ApiError {
    fn from(err: crate::database::manager::DatabaseError) -> Self {
        match err {
            crate::database::manager::DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            crate::database::manager::DatabaseError::ConfigMissing(_) => {
                ApiError::service_unavailable("Database not configured")
            }
            crate::database::manager::DatabaseError::InvalidDatabaseUrl => {
                ApiError::service_unavailable("Database not configured")
            }
            crate::database::manager::DatabaseError::QueryError(msg) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database query error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            crate::database::manager::DatabaseError::Sqlx(sqlx_err) => {
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<crate::filter::error::FilterError> for ApiError {
    fn from(err: crate::filter::error::FilterError) -> Self {
        ApiError::validation_error(err.to_string())
    }
}

impl From<crate::connector::types::ConnectorError> for ApiError {
    fn from(err: crate::connector::types::ConnectorError) -> Self {
        use crate::connector::types::ConnectorError;
        match err {
            ConnectorError::NotFound(msg) => ApiError::not_found(msg),
            ConnectorError::InvalidSpec(msg) => ApiError::validation_error(msg),
            ConnectorError::UnsupportedKind(kind) => {
                ApiError::validation_error(format!("Unsupported connection kind: {}", kind))
            }
            ConnectorError::QueryRejected(msg) => ApiError::forbidden(msg),
            // Driver and remote errors surface their message, matching the
            // original platform's behavior.
            other => ApiError::bad_gateway(other.to_string()),
        }
    }
}

impl From<crate::services::verification_service::VerificationError> for ApiError {
    fn from(err: crate::services::verification_service::VerificationError) -> Self {
        use crate::services::verification_service::VerificationError;
        match err {
            VerificationError::CodeAlreadySent { .. } => ApiError::too_many_requests(err.to_string()),
            VerificationError::CodeNotFound => ApiError::not_found(err.to_string()),
            VerificationError::MaxAttemptsExceeded => ApiError::too_many_requests(err.to_string()),
            VerificationError::InvalidCode { .. } => ApiError::bad_request(err.to_string()),
            VerificationError::UserNotFound => ApiError::not_found(err.to_string()),
            VerificationError::ContactMissing(_) => ApiError::bad_request(err.to_string()),
            VerificationError::Database(e) => ApiError::from(crate::database::manager::DatabaseError::Sqlx(e)),
        }
    }
}

impl From<crate::services::trial_service::TrialError> for ApiError {
    fn from(err: crate::services::trial_service::TrialError) -> Self {
        use crate::services::trial_service::TrialError;
        match err {
            TrialError::Validation(msg) => ApiError::validation_error(msg),
            TrialError::DuplicateEmail => ApiError::conflict(err.to_string()),
            TrialError::DuplicateCpf => ApiError::conflict(err.to_string()),
            TrialError::DuplicateSlug => ApiError::conflict(err.to_string()),
            TrialError::Hash(msg) => {
                tracing::error!("Password hashing error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            TrialError::Database(e) => ApiError::from(crate::database::manager::DatabaseError::Sqlx(e)),
        }
    }
}

impl From<crate::services::workflow_service::WorkflowError> for ApiError {
    fn from(err: crate::services::workflow_service::WorkflowError) -> Self {
        use crate::services::workflow_service::WorkflowError;
        match err {
            WorkflowError::NotFound => ApiError::not_found(err.to_string()),
            WorkflowError::InvalidStatus(_) => ApiError::validation_error(err.to_string()),
            WorkflowError::InvalidTransition { .. } => ApiError::bad_request(err.to_string()),
            WorkflowError::Database(e) => ApiError::from(crate::database::manager::DatabaseError::Sqlx(e)),
        }
    }
}

impl From<crate::services::ml_slot_service::SlotError> for ApiError {
    fn from(err: crate::services::ml_slot_service::SlotError) -> Self {
        use crate::services::ml_slot_service::SlotError;
        match err {
            SlotError::NotFound => ApiError::not_found(err.to_string()),
            SlotError::LimitReached { .. } => ApiError::forbidden(err.to_string()),
            SlotError::LocationTaken(_) => ApiError::conflict(err.to_string()),
            SlotError::InvalidType(_) => ApiError::validation_error(err.to_string()),
            SlotError::Database(e) => ApiError::from(crate::database::manager::DatabaseError::Sqlx(e)),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
