use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Invalid connection spec: {0}")]
    InvalidSpec(String),

    #[error("Connection not found or inactive: {0}")]
    NotFound(String),

    #[error("Unsupported connection kind: {0}")]
    UnsupportedKind(String),

    #[error("Query rejected: {0}")]
    QueryRejected(String),

    #[error("Connection test failed: {0}")]
    TestFailed(String),

    #[error("{0}")]
    Driver(#[from] sqlx::Error),

    #[error("{0}")]
    SqlServer(#[from] tiberius::error::Error),

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    Postgresql,
    Mysql,
    Sqlserver,
    RestApi,
    Webhook,
}

impl ConnectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionKind::Postgresql => "postgresql",
            ConnectionKind::Mysql => "mysql",
            ConnectionKind::Sqlserver => "sqlserver",
            ConnectionKind::RestApi => "rest_api",
            ConnectionKind::Webhook => "webhook",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ConnectorError> {
        match s {
            "postgresql" => Ok(ConnectionKind::Postgresql),
            "mysql" => Ok(ConnectionKind::Mysql),
            "sqlserver" => Ok(ConnectionKind::Sqlserver),
            "rest_api" => Ok(ConnectionKind::RestApi),
            "webhook" => Ok(ConnectionKind::Webhook),
            other => Err(ConnectorError::UnsupportedKind(other.to_string())),
        }
    }

    /// SQL engines accept queries and table listing; API kinds do not.
    pub fn is_sql(&self) -> bool {
        matches!(self, ConnectionKind::Postgresql | ConnectionKind::Mysql | ConnectionKind::Sqlserver)
    }
}

/// Connection settings blob. Field usage varies by kind: host/port/database/
/// username/password/ssl for SQL engines, api_url/api_key/headers for REST,
/// webhook_url/webhook_secret for webhooks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub ssl: bool,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub headers: Option<std::collections::HashMap<String, String>>,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    /// Opt-in for non-SELECT statements on SQL kinds
    #[serde(default)]
    pub allow_writes: bool,
}

impl ConnectionConfig {
    pub fn has_credentials(&self) -> bool {
        self.password.is_some() || self.api_key.is_some() || self.webhook_secret.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionSpec {
    pub name: String,
    pub kind: String,
    pub config: ConnectionConfig,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

impl ConnectionSpec {
    /// Check the fields the chosen kind actually needs.
    pub fn validate(&self) -> Result<ConnectionKind, ConnectorError> {
        if self.name.trim().is_empty() {
            return Err(ConnectorError::InvalidSpec("name is required".to_string()));
        }
        let kind = ConnectionKind::parse(&self.kind)?;
        match kind {
            ConnectionKind::Postgresql | ConnectionKind::Mysql | ConnectionKind::Sqlserver => {
                if self.config.host.as_deref().unwrap_or("").is_empty() {
                    return Err(ConnectorError::InvalidSpec("host is required for SQL connections".to_string()));
                }
                if self.config.database.as_deref().unwrap_or("").is_empty() {
                    return Err(ConnectorError::InvalidSpec("database is required for SQL connections".to_string()));
                }
                if self.config.username.as_deref().unwrap_or("").is_empty() {
                    return Err(ConnectorError::InvalidSpec("username is required for SQL connections".to_string()));
                }
            }
            ConnectionKind::RestApi => {
                if self.config.api_url.as_deref().unwrap_or("").is_empty() {
                    return Err(ConnectorError::InvalidSpec("api_url is required for REST connections".to_string()));
                }
            }
            ConnectionKind::Webhook => {
                if self.config.webhook_url.as_deref().unwrap_or("").is_empty() {
                    return Err(ConnectorError::InvalidSpec("webhook_url is required for webhooks".to_string()));
                }
            }
        }
        Ok(kind)
    }
}

/// Outcome of a connectivity probe, persisted alongside the connection row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub tested_at: DateTime<Utc>,
}

impl TestOutcome {
    pub fn ok(response_time_ms: i64, metadata: Value) -> Self {
        Self {
            success: true,
            response_time_ms: Some(response_time_ms),
            metadata: Some(metadata),
            error: None,
            tested_at: Utc::now(),
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            success: false,
            response_time_ms: None,
            metadata: None,
            error: Some(error),
            tested_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub connection_id: Uuid,
    pub query: String,
    #[serde(default)]
    pub parameters: Vec<Value>,
    pub cache_key: Option<String>,
    pub cache_ttl_secs: Option<i64>,
}

/// Rows plus execution metadata from a single driver call.
#[derive(Debug, Clone, Serialize)]
pub struct QueryData {
    pub rows: Vec<Value>,
    pub row_count: usize,
    pub columns: Vec<String>,
    pub execution_time_ms: i64,
}

impl QueryData {
    pub fn from_rows(rows: Vec<Value>, execution_time_ms: i64) -> Self {
        let columns = rows
            .first()
            .and_then(|r| r.as_object())
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default();
        Self {
            row_count: rows.len(),
            columns,
            rows,
            execution_time_ms,
        }
    }
}

/// What execute_query hands back to callers.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_spec() -> ConnectionSpec {
        ConnectionSpec {
            name: "warehouse".into(),
            kind: "postgresql".into(),
            config: ConnectionConfig {
                host: Some("db.example.com".into()),
                database: Some("analytics".into()),
                username: Some("reader".into()),
                password: Some("secret".into()),
                ..Default::default()
            },
            is_active: true,
            description: None,
        }
    }

    #[test]
    fn validates_sql_spec() {
        assert_eq!(sql_spec().validate().unwrap(), ConnectionKind::Postgresql);
    }

    #[test]
    fn rejects_missing_host() {
        let mut spec = sql_spec();
        spec.config.host = None;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn rejects_unknown_kind() {
        let mut spec = sql_spec();
        spec.kind = "mongodb".into();
        assert!(matches!(spec.validate(), Err(ConnectorError::UnsupportedKind(_))));
    }

    #[test]
    fn rest_spec_needs_api_url() {
        let spec = ConnectionSpec {
            name: "crm".into(),
            kind: "rest_api".into(),
            config: ConnectionConfig::default(),
            is_active: true,
            description: None,
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn query_data_derives_columns_from_first_row() {
        let data = QueryData::from_rows(
            vec![serde_json::json!({"a": 1, "b": 2}), serde_json::json!({"a": 3, "b": 4})],
            12,
        );
        assert_eq!(data.row_count, 2);
        assert_eq!(data.columns, vec!["a".to_string(), "b".to_string()]);
    }
}
