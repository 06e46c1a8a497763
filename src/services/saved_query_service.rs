use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::connector::{ConnectorError, ConnectorService, QueryCache, QueryRequest, QueryResponse};
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::SavedQuery;
use crate::database::Repository;
use crate::filter::{Filter, FilterData, ScopeOptions};

#[derive(Debug, Clone, Deserialize)]
pub struct SavedQueryInput {
    pub name: String,
    pub connection_id: Uuid,
    pub table_name: String,
    /// select/where/order/limit in the platform filter language
    #[serde(default)]
    pub filter: Value,
}

/// Persisted query-builder definitions. Execution compiles the stored
/// filter to SQL and runs it through the connector, so results flow through
/// the same cache as ad-hoc queries.
pub struct SavedQueryService {
    pool: PgPool,
}

impl SavedQueryService {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self { pool: DatabaseManager::pool().await? })
    }

    fn queries(&self, tenant_id: Uuid) -> Repository<SavedQuery> {
        Repository::new("saved_queries", self.pool.clone(), tenant_id)
    }

    pub async fn list(&self, tenant_id: Uuid, filter: FilterData) -> Result<Vec<SavedQuery>, DatabaseError> {
        self.queries(tenant_id).select_any(filter).await
    }

    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<SavedQuery, DatabaseError> {
        self.queries(tenant_id).select_by_id(id).await
    }

    pub async fn create(&self, tenant_id: Uuid, input: SavedQueryInput) -> Result<SavedQuery, DatabaseError> {
        // Compiling up front rejects malformed definitions at save time
        compile(&input.table_name, &input.filter).map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        let row = sqlx::query_as::<_, SavedQuery>(
            r#"
            INSERT INTO saved_queries (tenant_id, connection_id, name, table_name, filter)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(input.connection_id)
        .bind(&input.name)
        .bind(&input.table_name)
        .bind(&input.filter)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update(&self, tenant_id: Uuid, id: Uuid, input: SavedQueryInput) -> Result<SavedQuery, DatabaseError> {
        compile(&input.table_name, &input.filter).map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        let row = sqlx::query_as::<_, SavedQuery>(
            r#"
            UPDATE saved_queries
            SET name = $1, connection_id = $2, table_name = $3, filter = $4, updated_at = now()
            WHERE id = $5 AND tenant_id = $6 AND is_active = TRUE
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(input.connection_id)
        .bind(&input.table_name)
        .bind(&input.filter)
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Saved query not found".to_string()))?;
        Ok(row)
    }

    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<(), DatabaseError> {
        let done = sqlx::query(
            "UPDATE saved_queries SET is_active = FALSE, updated_at = now() WHERE id = $1 AND tenant_id = $2 AND is_active = TRUE",
        )
        .bind(id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;
        if done.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Saved query not found".to_string()));
        }
        Ok(())
    }

    /// Compile the stored definition to SQL and run it on the bound
    /// connection through the connector cache.
    pub async fn execute(&self, tenant_id: Uuid, id: Uuid, cache_ttl_secs: Option<i64>) -> Result<QueryResponse, ConnectorError> {
        let saved = self
            .get(tenant_id, id)
            .await
            .map_err(|e| ConnectorError::NotFound(e.to_string()))?;

        let sql = compile(&saved.table_name, &saved.filter)?;
        let connector = ConnectorService::with_pool(self.pool.clone());
        let cache_key = QueryCache::derive_key(saved.connection_id, &sql.query, &sql.params);

        connector
            .execute_query(
                tenant_id,
                QueryRequest {
                    connection_id: saved.connection_id,
                    query: sql.query,
                    parameters: sql.params,
                    cache_key: Some(cache_key),
                    cache_ttl_secs,
                },
            )
            .await
    }
}

/// Surface definition problems as spec errors before anything is stored.
pub fn validate_definition(table_name: &str, filter_json: &Value) -> Result<(), ConnectorError> {
    compile(table_name, filter_json).map(|_| ())
}

fn compile(table_name: &str, filter_json: &Value) -> Result<crate::filter::types::SqlResult, ConnectorError> {
    let filter_data: FilterData = if filter_json.is_null() {
        FilterData::default()
    } else {
        serde_json::from_value(filter_json.clone())
            .map_err(|e| ConnectorError::InvalidSpec(format!("invalid filter: {}", e)))?
    };

    let mut filter = Filter::new(table_name).map_err(|e| ConnectorError::InvalidSpec(e.to_string()))?;
    // External tables have no tenant_id or is_active columns
    filter.scope(ScopeOptions::none());
    filter
        .assign(filter_data)
        .map_err(|e| ConnectorError::InvalidSpec(e.to_string()))?;
    filter.to_sql().map_err(|e| ConnectorError::InvalidSpec(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compiles_definition_to_parameterized_sql() {
        let sql = compile(
            "orders",
            &json!({
                "select": ["id", "total"],
                "where": {"status": "paid", "total": {"$gte": 100}},
                "order": "created_at desc",
                "limit": 50
            }),
        )
        .unwrap();
        assert_eq!(
            sql.query,
            "SELECT \"id\", \"total\" FROM \"orders\" WHERE \"status\" = $1 AND \"total\" >= $2 ORDER BY \"created_at\" DESC LIMIT 50"
        );
        assert_eq!(sql.params, vec![json!("paid"), json!(100)]);
    }

    #[test]
    fn rejects_bad_table() {
        assert!(compile("orders; --", &Value::Null).is_err());
    }
}
