use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Named, tenant-scoped allocation unit limiting how many intelligent
/// features a plan may activate.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MlSlot {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub slot_type: String,
    pub slot_name: String,
    pub slot_location: String,
    pub config: serde_json::Value,
    pub usage_count: i64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MlSlotUsage {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub tenant_id: Uuid,
    pub detail: serde_json::Value,
    pub used_at: DateTime<Utc>,
}
