use serde_json::Value;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::{Column, MySqlPool, Row};
use std::time::{Duration, Instant};

use super::types::{ConnectionConfig, ConnectorError, QueryData};
use crate::config;

fn connect_options(cfg: &ConnectionConfig) -> MySqlConnectOptions {
    let mut options = MySqlConnectOptions::new()
        .host(cfg.host.as_deref().unwrap_or("localhost"))
        .port(cfg.port.unwrap_or(3306))
        .ssl_mode(if cfg.ssl { MySqlSslMode::Required } else { MySqlSslMode::Disabled });
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

async fn open(cfg: &ConnectionConfig) -> Result<MySqlPool, ConnectorError> {
    let timeout = Duration::from_secs(config::config().connector.connect_timeout_secs);
    let pool = MySqlPoolOptions::new()
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

async fn probe(pool: &MySqlPool) -> Result<Value, ConnectorError> {
    let row = sqlx::query("SELECT version() AS version, database() AS db, current_user() AS username")
        .fetch_one(pool)
        .await?;
    let version: String = row.try_get("version")?;
    let database: Option<String> = row.try_get("db")?;
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
    pool: &MySqlPool,
    cfg: &ConnectionConfig,
    query: &str,
    parameters: &[Value],
) -> Result<QueryData, ConnectorError> {
    let trimmed = query.trim().trim_end_matches(';');
    let started = Instant::now();

    if is_readable(trimmed) {
        let mut sql = sqlx::query(trimmed);
        for p in parameters {
            sql = bind_value(sql, p);
        }
        let rows = sql.fetch_all(pool).await?;
        let values: Vec<Value> = rows.iter().map(row_to_json).collect();
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
            "only SELECT/SHOW statements are allowed on this connection".to_string(),
        ))
    }
}

fn bind_value<'q>(
    q: sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments> {
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

fn is_readable(query: &str) -> bool {
    let lowered = query.trim_start().to_ascii_lowercase();
    lowered.starts_with("select")
        || lowered.starts_with("with")
        || lowered.starts_with("show")
        || lowered.starts_with("explain")
}

pub async fn list_tables(cfg: &ConnectionConfig) -> Result<Vec<String>, ConnectorError> {
    let pool = open(cfg).await?;
    let result = tables_on(&pool).await;
    pool.close().await;
    result
}

async fn tables_on(pool: &MySqlPool) -> Result<Vec<String>, ConnectorError> {
    let rows = sqlx::query("SHOW TABLES").fetch_all(pool).await?;
    Ok(rows
        .iter()
        .filter_map(|row| row.try_get::<String, _>(0).ok())
        .collect())
}

/// MySQL has no row_to_json equivalent, so columns decode individually with
/// a best-effort type ladder.
fn row_to_json(row: &MySqlRow) -> Value {
    let mut out = serde_json::Map::new();
    for (i, column) in row.columns().iter().enumerate() {
        out.insert(column.name().to_string(), column_to_json(row, i));
    }
    Value::Object(out)
}

fn column_to_json(row: &MySqlRow, i: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(i) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(i) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(i) {
        return v.map(|dt| Value::String(dt.to_string())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Value>, _>(i) {
        return v.unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(i) {
        return v.map(Value::String).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(i) {
        return v
            .map(|b| Value::String(String::from_utf8_lossy(&b).into_owned()))
            .unwrap_or(Value::Null);
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readable_detection() {
        assert!(is_readable("SHOW TABLES"));
        assert!(is_readable("select 1"));
        assert!(!is_readable("DROP TABLE users"));
    }
}
