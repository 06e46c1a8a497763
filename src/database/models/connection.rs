use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Stored credential/config record pointing at an external database or API.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExternalConnection {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub kind: String,
    pub config: serde_json::Value,
    pub description: Option<String>,
    pub last_tested_at: Option<DateTime<Utc>>,
    pub test_result: Option<serde_json::Value>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
