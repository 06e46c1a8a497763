use chrono::Utc;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::time::Instant;
use uuid::Uuid;

use super::cache::QueryCache;
use super::types::{
    ConnectionConfig, ConnectionKind, ConnectionSpec, ConnectorError, QueryData, QueryRequest, QueryResponse,
    TestOutcome,
};
use super::{http, mysql, postgres, sqlserver};
use crate::database::manager::DatabaseManager;
use crate::database::models::ExternalConnection;

/// Dispatches tenant-scoped connection records to the matching driver,
/// testing connectivity, executing queries and caching results.
pub struct ConnectorService {
    pool: PgPool,
    cache: QueryCache,
}

impl ConnectorService {
    pub async fn new() -> Result<Self, ConnectorError> {
        let pool = DatabaseManager::pool()
            .await
            .map_err(|e| ConnectorError::InvalidSpec(e.to_string()))?;
        Ok(Self::with_pool(pool))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self {
            cache: QueryCache::new(pool.clone()),
            pool,
        }
    }

    /// Validate, probe and persist a new connection. The row is only written
    /// when the probe succeeds; the probe outcome is stored with it.
    pub async fn create_connection(
        &self,
        tenant_id: Uuid,
        spec: ConnectionSpec,
    ) -> Result<ExternalConnection, ConnectorError> {
        let kind = spec.validate()?;

        let outcome = self.test_spec(kind, &spec.config).await;
        if !outcome.success {
            return Err(ConnectorError::TestFailed(
                outcome.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        let config_json = serde_json::to_value(&spec.config).map_err(|e| ConnectorError::InvalidSpec(e.to_string()))?;
        let outcome_json = serde_json::to_value(&outcome).map_err(|e| ConnectorError::InvalidSpec(e.to_string()))?;

        let row = sqlx::query_as::<_, ExternalConnection>(
            r#"
            INSERT INTO external_connections
                (tenant_id, name, kind, config, description, last_tested_at, test_result, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&spec.name)
        .bind(kind.as_str())
        .bind(&config_json)
        .bind(&spec.description)
        .bind(outcome.tested_at)
        .bind(&outcome_json)
        .bind(spec.is_active)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(tenant = %tenant_id, connection = %row.id, kind = kind.as_str(), "created connection");
        Ok(row)
    }

    /// Probe a connection spec without persisting anything.
    pub async fn test_connection(&self, spec: &ConnectionSpec) -> TestOutcome {
        match spec.validate() {
            Ok(kind) => self.test_spec(kind, &spec.config).await,
            Err(e) => TestOutcome::failed(e.to_string()),
        }
    }

    /// Re-probe a stored connection and refresh its embedded test result.
    pub async fn retest(&self, tenant_id: Uuid, connection_id: Uuid) -> Result<TestOutcome, ConnectorError> {
        let conn = self.load(tenant_id, connection_id).await?;
        let kind = ConnectionKind::parse(&conn.kind)?;
        let config = parse_config(&conn.config)?;
        let outcome = self.test_spec(kind, &config).await;

        let outcome_json = serde_json::to_value(&outcome).map_err(|e| ConnectorError::InvalidSpec(e.to_string()))?;
        sqlx::query("UPDATE external_connections SET last_tested_at = $1, test_result = $2, updated_at = now() WHERE id = $3")
            .bind(outcome.tested_at)
            .bind(&outcome_json)
            .bind(connection_id)
            .execute(&self.pool)
            .await?;

        Ok(outcome)
    }

    async fn test_spec(&self, kind: ConnectionKind, config: &ConnectionConfig) -> TestOutcome {
        let started = Instant::now();
        let result = match kind {
            ConnectionKind::Postgresql => postgres::test(config).await,
            ConnectionKind::Mysql => mysql::test(config).await,
            ConnectionKind::Sqlserver => sqlserver::test(config).await,
            ConnectionKind::RestApi => http::test_rest(config).await,
            ConnectionKind::Webhook => http::test_webhook(config).await,
        };
        let elapsed = started.elapsed().as_millis() as i64;

        match result {
            Ok(metadata) => TestOutcome::ok(elapsed, metadata),
            Err(e) => {
                tracing::warn!(kind = kind.as_str(), error = %e, "connection test failed");
                TestOutcome::failed(e.to_string())
            }
        }
    }

    /// Run a query through the matching driver, serving and refreshing the
    /// tenant's cache when a cache key is present.
    pub async fn execute_query(&self, tenant_id: Uuid, request: QueryRequest) -> Result<QueryResponse, ConnectorError> {
        if request.query.trim().is_empty() {
            return Err(ConnectorError::InvalidSpec("query is required".to_string()));
        }

        if let Some(cache_key) = &request.cache_key {
            if let Some(hit) = self.cache.lookup(tenant_id, cache_key).await? {
                tracing::debug!(tenant = %tenant_id, key = %cache_key, "query cache hit");
                return Ok(QueryResponse {
                    data: hit.result,
                    metadata: None,
                    cached: true,
                    cached_at: Some(hit.created_at),
                    executed_at: None,
                });
            }
        }

        let conn = self.load(tenant_id, request.connection_id).await?;
        let kind = ConnectionKind::parse(&conn.kind)?;
        let config = parse_config(&conn.config)?;

        let data = match kind {
            ConnectionKind::Postgresql => postgres::execute(&config, &request.query, &request.parameters).await?,
            ConnectionKind::Mysql => mysql::execute(&config, &request.query, &request.parameters).await?,
            ConnectionKind::Sqlserver => sqlserver::execute(&config, &request.query, &request.parameters).await?,
            ConnectionKind::RestApi => http::execute(&config, &request.query).await?,
            ConnectionKind::Webhook => {
                return Err(ConnectorError::QueryRejected(
                    "webhook connections do not execute queries".to_string(),
                ))
            }
        };

        let QueryData { rows, row_count, columns, execution_time_ms } = data;
        let rows_json = Value::Array(rows);

        if let Some(cache_key) = &request.cache_key {
            let ttl = request
                .cache_ttl_secs
                .unwrap_or(crate::config::config().connector.default_cache_ttl_secs);
            if let Err(e) = self.cache.store(tenant_id, cache_key, &rows_json, ttl).await {
                // A cache write failure never fails the query itself
                tracing::error!(tenant = %tenant_id, key = %cache_key, error = %e, "failed to cache query result");
            }
        }

        Ok(QueryResponse {
            data: rows_json,
            metadata: Some(json!({
                "row_count": row_count,
                "columns": columns,
                "execution_time_ms": execution_time_ms,
            })),
            cached: false,
            cached_at: None,
            executed_at: Some(Utc::now()),
        })
    }

    /// information_schema / SHOW TABLES per kind, uncached.
    pub async fn list_tables(&self, tenant_id: Uuid, connection_id: Uuid) -> Result<Vec<String>, ConnectorError> {
        let conn = self.load(tenant_id, connection_id).await?;
        let kind = ConnectionKind::parse(&conn.kind)?;
        let config = parse_config(&conn.config)?;

        match kind {
            ConnectionKind::Postgresql => postgres::list_tables(&config).await,
            ConnectionKind::Mysql => mysql::list_tables(&config).await,
            ConnectionKind::Sqlserver => sqlserver::list_tables(&config).await,
            _ => Err(ConnectorError::QueryRejected(format!(
                "table listing is not supported for {} connections",
                kind.as_str()
            ))),
        }
    }

    /// Active connections for a tenant, credentials stripped.
    pub async fn list_connections(&self, tenant_id: Uuid, kinds: Option<&[ConnectionKind]>) -> Result<Vec<Value>, ConnectorError> {
        let rows = sqlx::query_as::<_, ExternalConnection>(
            "SELECT * FROM external_connections WHERE tenant_id = $1 AND is_active = TRUE ORDER BY created_at DESC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        let out = rows
            .into_iter()
            .filter(|c| match kinds {
                Some(kinds) => ConnectionKind::parse(&c.kind).map(|k| kinds.contains(&k)).unwrap_or(false),
                None => true,
            })
            .map(|c| {
                let has_credentials = parse_config(&c.config)
                    .map(|cfg| cfg.has_credentials())
                    .unwrap_or(false);
                json!({
                    "id": c.id,
                    "name": c.name,
                    "kind": c.kind,
                    "description": c.description,
                    "last_tested_at": c.last_tested_at,
                    "test_result": c.test_result,
                    "is_active": c.is_active,
                    "created_at": c.created_at,
                    "has_credentials": has_credentials,
                })
            })
            .collect();
        Ok(out)
    }

    /// Soft-delete; the row stays for audit but stops resolving.
    pub async fn deactivate(&self, tenant_id: Uuid, connection_id: Uuid) -> Result<(), ConnectorError> {
        let done = sqlx::query(
            "UPDATE external_connections SET is_active = FALSE, updated_at = now() WHERE id = $1 AND tenant_id = $2 AND is_active = TRUE",
        )
        .bind(connection_id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;
        if done.rows_affected() == 0 {
            return Err(ConnectorError::NotFound(connection_id.to_string()));
        }
        Ok(())
    }

    async fn load(&self, tenant_id: Uuid, connection_id: Uuid) -> Result<ExternalConnection, ConnectorError> {
        sqlx::query_as::<_, ExternalConnection>(
            "SELECT * FROM external_connections WHERE id = $1 AND tenant_id = $2 AND is_active = TRUE",
        )
        .bind(connection_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ConnectorError::NotFound(connection_id.to_string()))
    }
}

fn parse_config(value: &Value) -> Result<ConnectionConfig, ConnectorError> {
    serde_json::from_value(value.clone())
        .map_err(|e| ConnectorError::InvalidSpec(format!("stored config is malformed: {}", e)))
}
