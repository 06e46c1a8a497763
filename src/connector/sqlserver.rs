use serde_json::Value;
use std::time::{Duration, Instant};
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use super::types::{ConnectionConfig, ConnectorError, QueryData};
use crate::config;

type SqlServerClient = Client<Compat<TcpStream>>;

fn client_config(cfg: &ConnectionConfig) -> Config {
    let mut config = Config::new();
    config.host(cfg.host.as_deref().unwrap_or("localhost"));
    config.port(cfg.port.unwrap_or(1433));
    if let Some(database) = &cfg.database {
        config.database(database);
    }
    config.authentication(AuthMethod::sql_server(
        cfg.username.as_deref().unwrap_or(""),
        cfg.password.as_deref().unwrap_or(""),
    ));
    if cfg.ssl {
        config.encryption(EncryptionLevel::Required);
        config.trust_cert();
    } else {
        config.encryption(EncryptionLevel::NotSupported);
    }
    config
}

async fn open(cfg: &ConnectionConfig) -> Result<SqlServerClient, ConnectorError> {
    let config = client_config(cfg);
    let addr = config.get_addr();
    let timeout = Duration::from_secs(config::config().connector.connect_timeout_secs);
    let tcp = tokio::time::timeout(timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "connection timed out"))??;
    tcp.set_nodelay(true)?;
    let client = Client::connect(config, tcp.compat_write()).await?;
    Ok(client)
}

pub async fn test(cfg: &ConnectionConfig) -> Result<Value, ConnectorError> {
    let mut client = open(cfg).await?;

    let row = client
        .query(
            "SELECT @@VERSION AS version, DB_NAME() AS db, SYSTEM_USER AS username",
            &[],
        )
        .await?
        .into_row()
        .await?;

    let (version, database, username) = match row {
        Some(row) => (
            row.get::<&str, _>("version").unwrap_or("").to_string(),
            row.get::<&str, _>("db").unwrap_or("").to_string(),
            row.get::<&str, _>("username").unwrap_or("").to_string(),
        ),
        None => (String::new(), String::new(), String::new()),
    };
    let tables = tables_on(&mut client).await?;
    // tiberius has no async close; dropping the client tears the socket down
    drop(client);

    Ok(serde_json::json!({
        "version": version,
        "database": database,
        "user": username,
        "tables": tables,
    }))
}

pub async fn execute(cfg: &ConnectionConfig, query: &str, parameters: &[Value]) -> Result<QueryData, ConnectorError> {
    let mut client = open(cfg).await?;
    let result = run_query(&mut client, cfg, query, parameters).await;
    drop(client);
    result
}

async fn run_query(
    client: &mut SqlServerClient,
    cfg: &ConnectionConfig,
    query: &str,
    parameters: &[Value],
) -> Result<QueryData, ConnectorError> {
    let trimmed = query.trim().trim_end_matches(';');
    let started = Instant::now();

    let params: Vec<SqlParam> = parameters.iter().map(SqlParam::from_json).collect();
    let param_refs: Vec<&dyn tiberius::ToSql> = params.iter().map(|p| p as &dyn tiberius::ToSql).collect();

    if is_select(trimmed) {
        let stream = client.query(trimmed, &param_refs).await?;
        let result_sets = stream.into_results().await?;
        let rows = result_sets.into_iter().next().unwrap_or_default();
        let values: Vec<Value> = rows.iter().map(row_to_json).collect();
        Ok(QueryData::from_rows(values, started.elapsed().as_millis() as i64))
    } else if cfg.allow_writes {
        let done = client.execute(trimmed, &param_refs).await?;
        let affected: u64 = done.rows_affected().iter().sum();
        let mut data = QueryData::from_rows(vec![], started.elapsed().as_millis() as i64);
        data.row_count = affected as usize;
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
    let mut client = open(cfg).await?;
    let result = tables_on(&mut client).await;
    drop(client);
    result
}

async fn tables_on(client: &mut SqlServerClient) -> Result<Vec<String>, ConnectorError> {
    let stream = client
        .query(
            "SELECT table_name FROM information_schema.tables WHERE table_type = 'BASE TABLE' ORDER BY table_name",
            &[],
        )
        .await?;
    let rows = stream.into_first_result().await?;
    Ok(rows
        .iter()
        .filter_map(|row| row.get::<&str, _>(0).map(|s| s.to_string()))
        .collect())
}

/// Owned parameter wrapper so arbitrary JSON values can bind through the
/// driver's @P placeholders.
enum SqlParam {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlParam {
    fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => SqlParam::Null,
            Value::Bool(b) => SqlParam::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlParam::Int(i)
                } else {
                    SqlParam::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => SqlParam::Text(s.clone()),
            other => SqlParam::Text(other.to_string()),
        }
    }
}

impl tiberius::ToSql for SqlParam {
    fn to_sql(&self) -> ColumnData<'_> {
        match self {
            SqlParam::Null => ColumnData::I64(None),
            SqlParam::Bool(b) => ColumnData::Bit(Some(*b)),
            SqlParam::Int(i) => ColumnData::I64(Some(*i)),
            SqlParam::Float(f) => ColumnData::F64(Some(*f)),
            SqlParam::Text(s) => ColumnData::String(Some(s.as_str().into())),
        }
    }
}

fn row_to_json(row: &tiberius::Row) -> Value {
    let mut out = serde_json::Map::new();
    for (column, data) in row.cells() {
        out.insert(column.name().to_string(), cell_to_json(data));
    }
    Value::Object(out)
}

fn cell_to_json(data: &ColumnData<'_>) -> Value {
    match data {
        ColumnData::Bit(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::U8(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::I16(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::I32(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::I64(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::F32(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::F64(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::String(v) => v
            .as_ref()
            .map(|s| Value::String(s.to_string()))
            .unwrap_or(Value::Null),
        ColumnData::Guid(v) => v.map(|g| Value::String(g.to_string())).unwrap_or(Value::Null),
        // Remaining temporal/decimal types are not decoded; the platform
        // treats them as opaque
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_params_map_to_sql_types() {
        assert!(matches!(SqlParam::from_json(&Value::Null), SqlParam::Null));
        assert!(matches!(SqlParam::from_json(&serde_json::json!(42)), SqlParam::Int(42)));
        assert!(matches!(SqlParam::from_json(&serde_json::json!(true)), SqlParam::Bool(true)));
        assert!(matches!(SqlParam::from_json(&serde_json::json!("x")), SqlParam::Text(_)));
    }
}
