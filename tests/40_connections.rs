mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

fn auth_token() -> Result<String> {
    let claims = atlas_api::auth::Claims::new(
        uuid::Uuid::new_v4(),
        uuid::Uuid::new_v4(),
        "it@example.com".into(),
        "admin".into(),
    );
    Ok(atlas_api::auth::generate_token(&claims)?)
}

#[tokio::test]
async fn create_connection_with_unreachable_host_persists_nothing() -> Result<()> {
    if !common::db_available() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let token = auth_token()?;

    let res = client
        .post(format!("{}/api/database-connections", server.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "name": "unreachable",
            "kind": "postgresql",
            "config": {
                "host": "192.0.2.1",
                "port": 5432,
                "database": "nope",
                "username": "nobody",
                "password": "nothing"
            }
        }))
        .send()
        .await?;

    // The probe fails, so the whole create fails
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(payload["success"], json!(false));

    // And nothing was persisted for this tenant
    let res = client
        .get(format!("{}/api/database-connections", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(payload["data"].as_array().map(|a| a.len()).unwrap_or(99), 0);

    Ok(())
}

#[tokio::test]
async fn connection_spec_validation_errors_are_descriptive() -> Result<()> {
    if !common::db_available() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let token = auth_token()?;

    // Unknown kind
    let res = client
        .post(format!("{}/api/database-connections", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "name": "x", "kind": "mongodb", "config": {} }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Missing host
    let res = client
        .post(format!("{}/api/database-connections", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "name": "x", "kind": "mysql", "config": { "database": "d", "username": "u" } }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let payload = res.json::<serde_json::Value>().await?;
    assert!(payload["error"].as_str().unwrap_or("").contains("host"));

    Ok(())
}

#[tokio::test]
async fn query_requires_existing_connection() -> Result<()> {
    if !common::db_available() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let token = auth_token()?;

    let res = client
        .post(format!("{}/api/database-connections/query", server.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "connection_id": uuid::Uuid::new_v4(),
            "query": "SELECT 1"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    Ok(())
}
