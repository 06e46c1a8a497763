use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::{MlSlot, MlSlotUsage, Tenant};

/// Slot types a tenant may allocate intelligent features into.
const SLOT_TYPES: &[&str] = &["dashboard_widget", "report", "workflow_step", "prediction", "alert"];

#[derive(Debug, thiserror::Error)]
pub enum SlotError {
    #[error("Slot not found")]
    NotFound,

    #[error("ML slot limit reached ({limit})")]
    LimitReached { limit: i64 },

    #[error("A slot already exists at location {0}")]
    LocationTaken(String),

    #[error("Invalid slot type: {0}")]
    InvalidType(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotInput {
    pub slot_type: String,
    pub slot_name: String,
    pub slot_location: String,
    #[serde(default)]
    pub config: Value,
}

#[derive(Debug, Serialize)]
pub struct SlotOverview {
    pub plan: String,
    pub total_slots: i64,
    pub used_slots: i64,
    pub available_slots: i64,
    pub can_create_new: bool,
    pub slots: Vec<MlSlot>,
}

pub struct MlSlotService {
    pool: PgPool,
}

impl MlSlotService {
    pub async fn new() -> Result<Self, SlotError> {
        let pool = DatabaseManager::pool()
            .await
            .map_err(|e| SlotError::Database(sqlx::Error::Configuration(e.to_string().into())))?;
        Ok(Self { pool })
    }

    /// Slot usage against the tenant's plan ceiling.
    pub async fn overview(&self, tenant_id: Uuid) -> Result<SlotOverview, SlotError> {
        let tenant = self.load_tenant(tenant_id).await?;
        let limit = crate::config::config().plans.ml_slots_for(&tenant.plan);

        let slots = sqlx::query_as::<_, MlSlot>(
            "SELECT * FROM ml_slots WHERE tenant_id = $1 ORDER BY created_at DESC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        let used = slots.iter().filter(|s| s.is_active).count() as i64;
        Ok(SlotOverview {
            plan: tenant.plan,
            total_slots: limit,
            used_slots: used,
            available_slots: (limit - used).max(0),
            can_create_new: used < limit,
            slots,
        })
    }

    /// Allocate a slot, enforcing the plan ceiling and one active slot per
    /// location.
    pub async fn create(&self, tenant_id: Uuid, input: SlotInput) -> Result<MlSlot, SlotError> {
        if !SLOT_TYPES.contains(&input.slot_type.as_str()) {
            return Err(SlotError::InvalidType(input.slot_type));
        }

        let overview = self.overview(tenant_id).await?;
        if !overview.can_create_new {
            return Err(SlotError::LimitReached { limit: overview.total_slots });
        }

        let taken: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM ml_slots WHERE tenant_id = $1 AND slot_location = $2 AND is_active = TRUE",
        )
        .bind(tenant_id)
        .bind(&input.slot_location)
        .fetch_optional(&self.pool)
        .await?;
        if taken.is_some() {
            return Err(SlotError::LocationTaken(input.slot_location));
        }

        let row = sqlx::query_as::<_, MlSlot>(
            r#"
            INSERT INTO ml_slots (tenant_id, slot_type, slot_name, slot_location, config)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&input.slot_type)
        .bind(&input.slot_name)
        .bind(&input.slot_location)
        .bind(&input.config)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(tenant = %tenant_id, slot = %row.id, location = %row.slot_location, "ML slot allocated");
        Ok(row)
    }

    /// Free a slot. The row is kept for usage history.
    pub async fn deactivate(&self, tenant_id: Uuid, slot_id: Uuid) -> Result<(), SlotError> {
        let done = sqlx::query(
            "UPDATE ml_slots SET is_active = FALSE, updated_at = now() WHERE id = $1 AND tenant_id = $2 AND is_active = TRUE",
        )
        .bind(slot_id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;
        if done.rows_affected() == 0 {
            return Err(SlotError::NotFound);
        }
        Ok(())
    }

    /// Append a usage row and bump the slot's counters.
    pub async fn record_usage(&self, tenant_id: Uuid, slot_id: Uuid, detail: Value) -> Result<MlSlotUsage, SlotError> {
        let slot: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM ml_slots WHERE id = $1 AND tenant_id = $2 AND is_active = TRUE")
                .bind(slot_id)
                .bind(tenant_id)
                .fetch_optional(&self.pool)
                .await?;
        if slot.is_none() {
            return Err(SlotError::NotFound);
        }

        let usage = sqlx::query_as::<_, MlSlotUsage>(
            r#"
            INSERT INTO ml_slot_usage (slot_id, tenant_id, detail)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(slot_id)
        .bind(tenant_id)
        .bind(&detail)
        .fetch_one(&self.pool)
        .await?;

        sqlx::query(
            "UPDATE ml_slots SET usage_count = usage_count + 1, last_used_at = now(), updated_at = now() WHERE id = $1",
        )
        .bind(slot_id)
        .execute(&self.pool)
        .await?;

        Ok(usage)
    }

    pub async fn usage_history(&self, tenant_id: Uuid, slot_id: Uuid) -> Result<Vec<MlSlotUsage>, SlotError> {
        let rows = sqlx::query_as::<_, MlSlotUsage>(
            "SELECT * FROM ml_slot_usage WHERE slot_id = $1 AND tenant_id = $2 ORDER BY used_at DESC LIMIT 100",
        )
        .bind(slot_id)
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn load_tenant(&self, tenant_id: Uuid) -> Result<Tenant, SlotError> {
        sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1 AND is_active = TRUE")
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(SlotError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_slot_types() {
        assert!(SLOT_TYPES.contains(&"dashboard_widget"));
        assert!(SLOT_TYPES.contains(&"prediction"));
        assert!(!SLOT_TYPES.contains(&"quantum"));
    }
}
