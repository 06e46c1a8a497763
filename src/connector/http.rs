use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::time::{Duration, Instant};

use super::types::{ConnectionConfig, ConnectorError, QueryData};
use crate::config;

fn client() -> Result<reqwest::Client, ConnectorError> {
    let timeout = Duration::from_secs(config::config().connector.request_timeout_secs);
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(client)
}

fn build_headers(cfg: &ConnectionConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Content-Type", HeaderValue::from_static("application/json"));
    if let Some(extra) = &cfg.headers {
        for (k, v) in extra {
            if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(k.as_bytes()), HeaderValue::from_str(v)) {
                headers.insert(name, value);
            }
        }
    }
    if let Some(api_key) = &cfg.api_key {
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", api_key)) {
            headers.insert("Authorization", value);
        }
    }
    headers
}

/// Probe a REST API base URL. Anything below 500 counts as reachable.
pub async fn test_rest(cfg: &ConnectionConfig) -> Result<Value, ConnectorError> {
    let api_url = cfg
        .api_url
        .as_deref()
        .ok_or_else(|| ConnectorError::InvalidSpec("api_url is required".to_string()))?;

    let response = client()?.get(api_url).headers(build_headers(cfg)).send().await?;
    let status = response.status();
    if status.is_server_error() {
        return Err(ConnectorError::TestFailed(format!("remote returned {}", status)));
    }

    let body = response.text().await.unwrap_or_default();
    let preview_bytes = config::config().connector.preview_bytes;
    let preview: String = body.chars().take(preview_bytes).collect();

    Ok(serde_json::json!({
        "status": status.as_u16(),
        "data_preview": preview,
    }))
}

/// Probe a webhook endpoint with a small signed test payload.
pub async fn test_webhook(cfg: &ConnectionConfig) -> Result<Value, ConnectorError> {
    let webhook_url = cfg
        .webhook_url
        .as_deref()
        .ok_or_else(|| ConnectorError::InvalidSpec("webhook_url is required".to_string()))?;

    let payload = serde_json::json!({
        "test": true,
        "timestamp": Utc::now().to_rfc3339(),
        "source": "atlas",
    });

    let mut request = client()?.post(webhook_url).json(&payload);
    if let Some(secret) = &cfg.webhook_secret {
        request = request.header("X-Webhook-Secret", secret);
    }

    let response = request.send().await?;
    let status = response.status();
    if status.is_server_error() {
        return Err(ConnectorError::TestFailed(format!("remote returned {}", status)));
    }

    let body: Value = response.json().await.unwrap_or(Value::Null);
    Ok(serde_json::json!({
        "status": status.as_u16(),
        "test_payload": payload,
        "response": body,
    }))
}

/// Fetch rows from a REST source. The "query" is an endpoint path appended
/// to the configured base URL; a JSON array response becomes the row set.
pub async fn execute(cfg: &ConnectionConfig, endpoint: &str) -> Result<QueryData, ConnectorError> {
    let api_url = cfg
        .api_url
        .as_deref()
        .ok_or_else(|| ConnectorError::InvalidSpec("api_url is required".to_string()))?;
    let full_url = format!("{}{}", api_url.trim_end_matches('/'), normalize_endpoint(endpoint));

    let started = Instant::now();
    let response = client()?
        .get(&full_url)
        .headers(build_headers(cfg))
        .send()
        .await?
        .error_for_status()?;

    let body: Value = response.json().await?;
    let rows = match body {
        Value::Array(items) => items,
        other => vec![other],
    };
    Ok(QueryData::from_rows(rows, started.elapsed().as_millis() as i64))
}

fn normalize_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_normalization() {
        assert_eq!(normalize_endpoint(""), "");
        assert_eq!(normalize_endpoint("users"), "/users");
        assert_eq!(normalize_endpoint("/users"), "/users");
        assert_eq!(normalize_endpoint("  orders?page=2  "), "/orders?page=2");
    }

    #[test]
    fn headers_carry_bearer_key() {
        let cfg = ConnectionConfig {
            api_key: Some("abc123".into()),
            ..Default::default()
        };
        let headers = build_headers(&cfg);
        assert_eq!(headers.get("Authorization").unwrap(), "Bearer abc123");
    }
}
