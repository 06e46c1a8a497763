use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{PgPool, Row};
use std::time::{Duration, Instant};

use super::types::{ConnectionConfig, ConnectorError, QueryData};
use crate::config;

fn connect_options(cfg: &ConnectionConfig) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(cfg.host.as_deref().unwrap_or("localhost"))
        .port(cfg.port.unwrap_or(5432))
        .ssl_mode(if cfg.ssl { PgSslMode::Require } else { PgSslMode::Disable });
    if let Some(database) = &cfg.database {
        options = options.database(database);
    }
    if let Some(username) = &cfg.username {
        options = options.username(username);
    }
    if let Some(password) = &cfg.password {
        options = options.password(password);
    }
    options
}

/// One short-lived, single-connection pool per call; callers never share
/// connections across requests.
async fn open(cfg: &ConnectionConfig) -> Result<PgPool, ConnectorError> {
    let timeout = Duration::from_secs(config::config().connector.connect_timeout_secs);
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(timeout)
        .connect_with(connect_options(cfg))
        .await?;
    Ok(pool)
}

pub async fn test(cfg: &ConnectionConfig) -> Result<Value, ConnectorError> {
    let pool = open(cfg).await?;
    let result = probe(&pool).await;
    pool.close().await;
    result
}

async fn probe(pool: &PgPool) -> Result<Value, ConnectorError> {
    let row = sqlx::query("SELECT version() AS version, current_database() AS database, current_user AS username")
        .fetch_one(pool)
        .await?;
    let version: String = row.try_get("version")?;
    let database: String = row.try_get("database")?;
    let username: String = row.try_get("username")?;
    let tables = tables_on(pool).await?;

    Ok(serde_json::json!({
        "version": version,
        "database": database,
        "user": username,
        "tables": tables,
    }))
}

pub async fn execute(cfg: &ConnectionConfig, query: &str, parameters: &[Value]) -> Result<QueryData, ConnectorError> {
    let pool = open(cfg).await?;
    let result = run_query(&pool, cfg, query, parameters).await;
    pool.close().await;
    result
}

async fn run_query(
    pool: &PgPool,
    cfg: &ConnectionConfig,
    query: &str,
    parameters: &[Value],
) -> Result<QueryData, ConnectorError> {
    let trimmed = query.trim().trim_end_matches(';');
    let started = Instant::now();

    if is_select(trimmed) {
        // Wrap the statement so every row comes back as one json value,
        // regardless of its column types.
        let wrapped = format!("SELECT row_to_json(q)::jsonb AS row FROM ({}) q", trimmed);
        let mut sql = sqlx::query(&wrapped);
        for p in parameters {
            sql = bind_value(sql, p);
        }
        let rows = sql.fetch_all(pool).await?;
        let values: Vec<Value> = rows
            .iter()
            .map(|row| row.try_get::<Value, _>("row").unwrap_or(Value::Null))
            .collect();
        Ok(QueryData::from_rows(values, started.elapsed().as_millis() as i64))
    } else if cfg.allow_writes {
        let mut sql = sqlx::query(trimmed);
        for p in parameters {
            sql = bind_value(sql, p);
        }
        let done = sql.execute(pool).await?;
        let mut data = QueryData::from_rows(vec![], started.elapsed().as_millis() as i64);
        data.row_count = done.rows_affected() as usize;
        Ok(data)
    } else {
        Err(ConnectorError::QueryRejected(
            "only SELECT statements are allowed on this connection".to_string(),
        ))
    }
}

fn is_select(query: &str) -> bool {
    let lowered = query.trim_start().to_ascii_lowercase();
    lowered.starts_with("select") || lowered.starts_with("with")
}

pub async fn list_tables(cfg: &ConnectionConfig) -> Result<Vec<String>, ConnectorError> {
    let pool = open(cfg).await?;
    let result = tables_on(&pool).await;
    pool.close().await;
    result
}

async fn tables_on(pool: &PgPool) -> Result<Vec<String>, ConnectorError> {
    let rows = sqlx::query(
        "SELECT table_name FROM information_schema.tables WHERE table_schema = 'public' ORDER BY table_name",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .iter()
        .filter_map(|row| row.try_get::<String, _>("table_name").ok())
        .collect())
}

fn bind_value<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        other => q.bind(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_detection() {
        assert!(is_select("SELECT 1"));
        assert!(is_select("  with t as (select 1) select * from t"));
        assert!(!is_select("DELETE FROM users"));
        assert!(!is_select("UPDATE t SET a = 1"));
    }
}
