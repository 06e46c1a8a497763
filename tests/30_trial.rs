mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

// Signup validation runs before any write; these cases must come back as
// clean 400s. They still need a database because the service checks for
// duplicates first.

fn signup_body() -> serde_json::Value {
    json!({
        "first_name": "Ana",
        "last_name": "Silva",
        "cpf": "123.456.789-01",
        "email": "ana@example.com",
        "phone": "(11) 98765-4321",
        "password": "hunter22",
        "accepted_terms": true,
        "accepted_privacy": true
    })
}

#[tokio::test]
async fn signup_rejects_short_cpf() -> Result<()> {
    if !common::db_available() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let mut body = signup_body();
    body["cpf"] = json!("123");

    let res = client
        .post(format!("{}/api/trial/signup", server.base_url))
        .json(&body)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(payload["success"], json!(false));
    assert!(payload["error"].as_str().unwrap_or("").contains("CPF"));

    Ok(())
}

#[tokio::test]
async fn signup_rejects_unaccepted_terms() -> Result<()> {
    if !common::db_available() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let mut body = signup_body();
    body["accepted_terms"] = json!(false);

    let res = client
        .post(format!("{}/api/trial/signup", server.base_url))
        .json(&body)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn signup_rejects_short_password() -> Result<()> {
    if !common::db_available() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let mut body = signup_body();
    body["password"] = json!("abc");

    let res = client
        .post(format!("{}/api/trial/signup", server.base_url))
        .json(&body)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let payload = res.json::<serde_json::Value>().await?;
    assert!(payload["error"].as_str().unwrap_or("").to_lowercase().contains("password"));

    Ok(())
}
