use axum::{routing::get, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod auth;
mod config;
mod connector;
mod database;
mod error;
mod filter;
mod handlers;
mod middleware;
mod pipeline;
mod services;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    // Initialize configuration (this loads the config singleton)
    let config = crate::config::config();

    tracing_subscriber::fmt::init();
    tracing::info!("Starting Atlas API in {:?} mode", config.environment);

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("ATLAS_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("Atlas API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app() -> Router {
    let protected = Router::new()
        .merge(auth_routes())
        .merge(verification_routes())
        .merge(client_routes())
        .merge(connection_routes())
        .merge(query_builder_routes())
        .merge(dashboard_routes())
        .merge(workflow_routes())
        .merge(ml_slot_routes())
        .merge(storage_routes())
        .layer(axum::middleware::from_fn(middleware::jwt_auth_middleware));

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        .merge(protected)
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn public_routes() -> Router {
    use axum::routing::post;
    use handlers::{public, verification};

    Router::new()
        .route("/api/auth/login", post(public::login))
        .route("/api/trial/signup", post(public::trial_signup))
        // Trial onboarding verifies before the account can log in
        .route("/api/verification/verify", post(verification::verify_public))
        .route("/api/verification/resend", post(verification::resend_public))
        .route("/api/verification/status/:user_id", get(verification::status_by_id))
}

fn auth_routes() -> Router {
    use handlers::auth;

    Router::new().route("/api/auth/whoami", get(auth::whoami))
}

fn verification_routes() -> Router {
    use axum::routing::post;
    use handlers::verification;

    let admin = Router::new()
        .route("/api/verification/cleanup", post(verification::cleanup))
        .layer(axum::middleware::from_fn(middleware::require_admin));

    Router::new()
        .route("/api/verification/send-email", post(verification::send_email))
        .route("/api/verification/send-phone", post(verification::send_phone))
        .route("/api/verification/verify-auth", post(verification::verify_auth))
        .route("/api/verification/resend-auth", post(verification::resend_auth))
        .route("/api/verification/status", get(verification::status))
        .merge(admin)
}

fn client_routes() -> Router {
    use axum::routing::post;
    use handlers::clients;

    Router::new()
        .route("/api/clients", get(clients::list).post(clients::create))
        .route("/api/clients/search", post(clients::search))
        .route(
            "/api/clients/:id",
            get(clients::get).put(clients::update).delete(clients::delete),
        )
}

fn connection_routes() -> Router {
    use axum::routing::post;
    use handlers::connections;

    Router::new()
        // SQL engines
        .route(
            "/api/database-connections",
            get(connections::list_database).post(connections::create),
        )
        .route("/api/database-connections/test", post(connections::test))
        .route("/api/database-connections/query", post(connections::query))
        .route(
            "/api/database-connections/:id",
            axum::routing::delete(connections::delete),
        )
        .route("/api/database-connections/:id/test", post(connections::retest))
        .route("/api/database-connections/:id/tables", get(connections::tables))
        // REST APIs and webhooks share the connector surface
        .route("/api/api-connections", get(connections::list_api).post(connections::create))
        .route("/api/api-connections/test", post(connections::test))
        .route("/api/api-connections/:id", axum::routing::delete(connections::delete))
        .route("/api/api-connections/:id/test", post(connections::retest))
}

fn query_builder_routes() -> Router {
    use axum::routing::post;
    use handlers::queries;

    Router::new()
        .route("/api/query-builders", get(queries::list).post(queries::create))
        .route(
            "/api/query-builders/:id",
            get(queries::get).put(queries::update).delete(queries::delete),
        )
        .route("/api/query-builders/:id/execute", post(queries::execute))
}

fn dashboard_routes() -> Router {
    use axum::routing::post;
    use handlers::dashboards;

    Router::new()
        .route("/api/dashboards", get(dashboards::list).post(dashboards::create))
        .route("/api/dashboards/search", post(dashboards::search))
        .route(
            "/api/dashboards/widgets/:id",
            axum::routing::put(dashboards::update_widget).delete(dashboards::delete_widget),
        )
        .route("/api/dashboards/widgets/:id/data", get(dashboards::widget_data))
        .route(
            "/api/dashboards/:id",
            get(dashboards::get).put(dashboards::update).delete(dashboards::delete),
        )
        .route("/api/dashboards/:id/widgets", post(dashboards::create_widget))
}

fn workflow_routes() -> Router {
    use axum::routing::post;
    use handlers::workflows;

    Router::new()
        // Task templates
        .route(
            "/api/advanced-tasks",
            get(workflows::list_templates).post(workflows::create_template),
        )
        .route("/api/advanced-tasks/:id", axum::routing::delete(workflows::delete_template))
        .route("/api/advanced-tasks/:id/instantiate", post(workflows::instantiate))
        // Workflows
        .route("/api/complete-workflows", get(workflows::list).post(workflows::create))
        .route("/api/complete-workflows/search", post(workflows::search))
        .route(
            "/api/complete-workflows/:id",
            get(workflows::get).put(workflows::update).delete(workflows::delete),
        )
        .route("/api/complete-workflows/:id/status", post(workflows::transition))
}

fn ml_slot_routes() -> Router {
    use axum::routing::post;
    use handlers::ml_slots;

    Router::new()
        .route("/api/ml-slots", get(ml_slots::overview).post(ml_slots::create))
        .route("/api/ml-slots/:id", axum::routing::delete(ml_slots::deactivate))
        .route(
            "/api/ml-slots/:id/usage",
            get(ml_slots::usage_history).post(ml_slots::record_usage),
        )
}

fn storage_routes() -> Router {
    use handlers::storage;

    Router::new()
        .route("/api/storage", get(storage::list).post(storage::register))
        .route("/api/storage/:id", get(storage::get).delete(storage::delete))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Atlas API",
            "version": version,
            "description": "Multi-tenant business automation backend with universal data connectors",
            "endpoints": {
                "home": "/ (public)",
                "auth": "/api/auth/login (public), /api/auth/whoami (protected)",
                "trial": "/api/trial/signup (public)",
                "verification": "/api/verification/* (mixed)",
                "clients": "/api/clients/* (protected)",
                "database_connections": "/api/database-connections/* (protected)",
                "api_connections": "/api/api-connections/* (protected)",
                "query_builders": "/api/query-builders/* (protected)",
                "dashboards": "/api/dashboards/* (protected)",
                "advanced_tasks": "/api/advanced-tasks/* (protected)",
                "complete_workflows": "/api/complete-workflows/* (protected)",
                "ml_slots": "/api/ml-slots/* (protected)",
                "storage": "/api/storage (protected)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::manager::DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
