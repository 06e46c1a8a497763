use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Persisted query-builder definition: a table plus a filter expressed in
/// the platform filter language, bound to an external connection.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SavedQuery {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub connection_id: Uuid,
    pub name: String,
    pub table_name: String,
    pub filter: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
