use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::connector::{ConnectorService, QueryCache, QueryRequest};
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{Dashboard, DashboardWidget, FileUpload};
use crate::database::Repository;
use crate::filter::FilterData;
use crate::pipeline::{self, WidgetAggregation, WidgetFilter};

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardInput {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub layout: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WidgetInput {
    pub title: String,
    #[serde(default = "default_widget_type")]
    pub widget_type: String,
    #[serde(default)]
    pub position: Value,
    #[serde(default)]
    pub data_source: Value,
    #[serde(default)]
    pub config: Value,
}

fn default_widget_type() -> String {
    "table".to_string()
}

/// The widget's `data_source` JSON, tagged by "type".
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum DataSource {
    Query {
        connection_id: Uuid,
        query: String,
        #[serde(default)]
        parameters: Vec<Value>,
        refresh_interval: Option<i64>,
    },
    Static {
        #[serde(default)]
        static_data: Vec<Value>,
    },
    File {
        file_id: Uuid,
    },
}

pub struct DashboardService {
    pool: PgPool,
}

impl DashboardService {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self { pool: DatabaseManager::pool().await? })
    }

    fn dashboards(&self, tenant_id: Uuid) -> Repository<Dashboard> {
        Repository::new("dashboards", self.pool.clone(), tenant_id)
    }

    fn widgets(&self, tenant_id: Uuid) -> Repository<DashboardWidget> {
        Repository::new("dashboard_widgets", self.pool.clone(), tenant_id)
    }

    pub async fn list(&self, tenant_id: Uuid, filter: FilterData) -> Result<Vec<Dashboard>, DatabaseError> {
        self.dashboards(tenant_id).select_any(filter).await
    }

    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Dashboard, DatabaseError> {
        self.dashboards(tenant_id).select_by_id(id).await
    }

    pub async fn create(&self, tenant_id: Uuid, input: DashboardInput) -> Result<Dashboard, DatabaseError> {
        let row = sqlx::query_as::<_, Dashboard>(
            r#"
            INSERT INTO dashboards (tenant_id, name, description, layout)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.layout)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update(&self, tenant_id: Uuid, id: Uuid, input: DashboardInput) -> Result<Dashboard, DatabaseError> {
        let row = sqlx::query_as::<_, Dashboard>(
            r#"
            UPDATE dashboards SET name = $1, description = $2, layout = $3, updated_at = now()
            WHERE id = $4 AND tenant_id = $5 AND is_active = TRUE
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.layout)
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Dashboard not found".to_string()))?;
        Ok(row)
    }

    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<(), DatabaseError> {
        let done = sqlx::query(
            "UPDATE dashboards SET is_active = FALSE, updated_at = now() WHERE id = $1 AND tenant_id = $2 AND is_active = TRUE",
        )
        .bind(id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;
        if done.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Dashboard not found".to_string()));
        }
        Ok(())
    }

    pub async fn list_widgets(&self, tenant_id: Uuid, dashboard_id: Uuid) -> Result<Vec<DashboardWidget>, DatabaseError> {
        let filter = FilterData {
            where_clause: Some(json!({ "dashboard_id": dashboard_id.to_string() })),
            order: Some(json!("created_at asc")),
            ..Default::default()
        };
        self.widgets(tenant_id).select_any(filter).await
    }

    pub async fn create_widget(
        &self,
        tenant_id: Uuid,
        dashboard_id: Uuid,
        input: WidgetInput,
    ) -> Result<DashboardWidget, DatabaseError> {
        // The dashboard must exist and belong to the tenant
        self.get(tenant_id, dashboard_id).await?;

        let row = sqlx::query_as::<_, DashboardWidget>(
            r#"
            INSERT INTO dashboard_widgets (dashboard_id, tenant_id, title, widget_type, position, data_source, config)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(dashboard_id)
        .bind(tenant_id)
        .bind(&input.title)
        .bind(&input.widget_type)
        .bind(&input.position)
        .bind(&input.data_source)
        .bind(&input.config)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update_widget(
        &self,
        tenant_id: Uuid,
        widget_id: Uuid,
        input: WidgetInput,
    ) -> Result<DashboardWidget, DatabaseError> {
        let row = sqlx::query_as::<_, DashboardWidget>(
            r#"
            UPDATE dashboard_widgets
            SET title = $1, widget_type = $2, position = $3, data_source = $4, config = $5, updated_at = now()
            WHERE id = $6 AND tenant_id = $7 AND is_active = TRUE
            RETURNING *
            "#,
        )
        .bind(&input.title)
        .bind(&input.widget_type)
        .bind(&input.position)
        .bind(&input.data_source)
        .bind(&input.config)
        .bind(widget_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Widget not found".to_string()))?;
        Ok(row)
    }

    pub async fn delete_widget(&self, tenant_id: Uuid, widget_id: Uuid) -> Result<(), DatabaseError> {
        let done = sqlx::query(
            "UPDATE dashboard_widgets SET is_active = FALSE, updated_at = now() WHERE id = $1 AND tenant_id = $2 AND is_active = TRUE",
        )
        .bind(widget_id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;
        if done.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Widget not found".to_string()));
        }
        Ok(())
    }

    /// Resolve a widget's data source, then run the in-memory pipeline over
    /// the rows. Any failure collapses to {success:false, error} with empty
    /// data, so one broken tile never takes the dashboard down.
    pub async fn widget_data(&self, tenant_id: Uuid, widget_id: Uuid) -> Value {
        match self.widget_data_inner(tenant_id, widget_id).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(tenant = %tenant_id, widget = %widget_id, error = %e, "widget data failed");
                json!({
                    "success": false,
                    "data": [],
                    "metadata": { "total_rows": 0, "columns": [], "data_types": {} },
                    "error": e,
                })
            }
        }
    }

    async fn widget_data_inner(&self, tenant_id: Uuid, widget_id: Uuid) -> Result<Value, String> {
        let widget = self
            .widgets(tenant_id)
            .select_by_id(widget_id)
            .await
            .map_err(|e| e.to_string())?;

        let source: DataSource =
            serde_json::from_value(widget.data_source.clone()).map_err(|e| format!("invalid data source: {}", e))?;

        let started = std::time::Instant::now();
        let (mut rows, cached) = match source {
            DataSource::Query { connection_id, query, parameters, refresh_interval } => {
                let connector = ConnectorService::new().await.map_err(|e| e.to_string())?;
                let cache_key = QueryCache::derive_key(connection_id, &query, &parameters);
                let response = connector
                    .execute_query(
                        tenant_id,
                        QueryRequest {
                            connection_id,
                            query,
                            parameters,
                            cache_key: Some(cache_key),
                            cache_ttl_secs: refresh_interval,
                        },
                    )
                    .await
                    .map_err(|e| e.to_string())?;
                let rows = match response.data {
                    Value::Array(items) => items,
                    other => vec![other],
                };
                (rows, response.cached)
            }
            DataSource::Static { static_data } => (static_data, false),
            DataSource::File { file_id } => {
                let upload = Repository::<FileUpload>::new("file_uploads", self.pool.clone(), tenant_id)
                    .select_by_id(file_id)
                    .await
                    .map_err(|e| e.to_string())?;
                let rows = match upload.preview_data {
                    Value::Array(items) => items,
                    _ => vec![],
                };
                (rows, false)
            }
        };

        if let Some(filters) = widget.config.get("filters").filter(|v| !v.is_null()) {
            let filters: Vec<WidgetFilter> =
                serde_json::from_value(filters.clone()).map_err(|e| format!("invalid filters: {}", e))?;
            rows = pipeline::apply_filters(rows, &filters);
        }

        if let Some(aggregations) = widget.config.get("aggregations").filter(|v| !v.is_null()) {
            let aggregations: Vec<WidgetAggregation> =
                serde_json::from_value(aggregations.clone()).map_err(|e| format!("invalid aggregations: {}", e))?;
            rows = pipeline::apply_aggregations(rows, &aggregations);
        }

        let data_types = rows.first().map(pipeline::infer_types).unwrap_or_default();
        let columns: Vec<String> = rows
            .first()
            .and_then(|r| r.as_object())
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default();
        let total_rows = rows.len();

        Ok(json!({
            "success": true,
            "data": rows,
            "metadata": {
                "total_rows": total_rows,
                "columns": columns,
                "data_types": data_types,
                "execution_time_ms": started.elapsed().as_millis() as i64,
                "cached": cached,
            },
        }))
    }
}
