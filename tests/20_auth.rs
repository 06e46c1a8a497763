mod common;

use anyhow::Result;
use reqwest::StatusCode;

// Protected surface must reject anonymous and malformed credentials before
// any handler logic runs.

#[tokio::test]
async fn protected_routes_require_bearer_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    for path in [
        "/api/auth/whoami",
        "/api/dashboards",
        "/api/database-connections",
        "/api/complete-workflows",
        "/api/ml-slots",
        "/api/storage",
    ] {
        let res = client.get(format!("{}{}", server.base_url, path)).send().await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "expected 401 for {}", path);

        let payload = res.json::<serde_json::Value>().await?;
        assert_eq!(payload["success"], serde_json::json!(false));
        assert_eq!(payload["code"], "UNAUTHORIZED");
    }

    Ok(())
}

#[tokio::test]
async fn garbage_token_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/auth/whoami", server.base_url))
        .header("Authorization", "Bearer not.a.real.token")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn whoami_round_trips_token_claims() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let tenant_id = uuid::Uuid::new_v4();
    let user_id = uuid::Uuid::new_v4();
    let claims = atlas_api::auth::Claims::new(tenant_id, user_id, "it@example.com".into(), "admin".into());
    let token = atlas_api::auth::generate_token(&claims)?;

    let res = client
        .get(format!("{}/api/auth/whoami", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let payload = res.json::<serde_json::Value>().await?;
    assert!(payload["success"].as_bool().unwrap_or(false));
    assert_eq!(payload["data"]["tenant_id"], serde_json::json!(tenant_id.to_string()));
    assert_eq!(payload["data"]["user_id"], serde_json::json!(user_id.to_string()));
    assert_eq!(payload["data"]["role"], "admin");

    Ok(())
}

#[tokio::test]
async fn login_requires_identifier_and_password() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/auth/login", server.base_url))
        .json(&serde_json::json!({ "identifier": "", "password": "" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(payload["success"], serde_json::json!(false));

    Ok(())
}
