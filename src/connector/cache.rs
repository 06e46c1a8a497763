use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use super::types::ConnectorError;
use crate::database::models::QueryCacheRow;

/// Database-backed query result cache keyed by (tenant_id, cache_key).
/// Concurrent writers race benignly; last writer wins on the upsert.
pub struct QueryCache {
    pool: PgPool,
}

impl QueryCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Deterministic key for callers that don't supply their own.
    pub fn derive_key(connection_id: Uuid, query: &str, parameters: &[Value]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(connection_id.as_bytes());
        hasher.update(query.as_bytes());
        for p in parameters {
            hasher.update(p.to_string().as_bytes());
        }
        let hash = hasher.finalize();
        format!("q_{:x}", hash)
    }

    /// Non-expired entry, or None.
    pub async fn lookup(&self, tenant_id: Uuid, cache_key: &str) -> Result<Option<QueryCacheRow>, ConnectorError> {
        let row = sqlx::query_as::<_, QueryCacheRow>(
            "SELECT * FROM query_cache WHERE tenant_id = $1 AND cache_key = $2 AND expires_at >= now()",
        )
        .bind(tenant_id)
        .bind(cache_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn store(
        &self,
        tenant_id: Uuid,
        cache_key: &str,
        result: &Value,
        ttl_secs: i64,
    ) -> Result<DateTime<Utc>, ConnectorError> {
        let expires_at = Utc::now() + Duration::seconds(ttl_secs);
        sqlx::query(
            r#"
            INSERT INTO query_cache (tenant_id, cache_key, result, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (tenant_id, cache_key)
            DO UPDATE SET result = EXCLUDED.result, expires_at = EXCLUDED.expires_at, updated_at = now()
            "#,
        )
        .bind(tenant_id)
        .bind(cache_key)
        .bind(result)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(expires_at)
    }

    /// Drop expired rows; returns how many were removed.
    pub async fn purge_expired(&self) -> Result<u64, ConnectorError> {
        let done = sqlx::query("DELETE FROM query_cache WHERE expires_at < now()")
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn derived_keys_are_stable_and_distinct() {
        let conn = Uuid::new_v4();
        let a = QueryCache::derive_key(conn, "SELECT 1", &[]);
        let b = QueryCache::derive_key(conn, "SELECT 1", &[]);
        let c = QueryCache::derive_key(conn, "SELECT 2", &[]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn parameters_change_the_key() {
        let conn = Uuid::new_v4();
        let a = QueryCache::derive_key(conn, "SELECT * FROM t WHERE x = $1", &[json!(1)]);
        let b = QueryCache::derive_key(conn, "SELECT * FROM t WHERE x = $1", &[json!(2)]);
        assert_ne!(a, b);
    }
}
