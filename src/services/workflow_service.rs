use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::{TaskTemplate, Workflow};
use crate::database::Repository;
use crate::filter::FilterData;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Workflow not found")]
    NotFound,

    #[error("Unknown status: {0}")]
    InvalidStatus(String),

    #[error("Cannot move a {from} workflow to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStatus {
    Draft,
    Active,
    Paused,
    Archived,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Draft => "draft",
            WorkflowStatus::Active => "active",
            WorkflowStatus::Paused => "paused",
            WorkflowStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Result<Self, WorkflowError> {
        match s {
            "draft" => Ok(WorkflowStatus::Draft),
            "active" => Ok(WorkflowStatus::Active),
            "paused" => Ok(WorkflowStatus::Paused),
            "archived" => Ok(WorkflowStatus::Archived),
            other => Err(WorkflowError::InvalidStatus(other.to_string())),
        }
    }

    /// draft -> active -> paused -> active; active|paused -> archived.
    /// Archived is terminal.
    pub fn can_transition_to(&self, next: WorkflowStatus) -> bool {
        use WorkflowStatus::*;
        matches!(
            (self, next),
            (Draft, Active) | (Active, Paused) | (Paused, Active) | (Active, Archived) | (Paused, Archived)
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateInput {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowInput {
    pub name: String,
    pub template_id: Option<Uuid>,
    #[serde(default)]
    pub definition: Value,
}

pub struct WorkflowService {
    pool: PgPool,
}

impl WorkflowService {
    pub async fn new() -> Result<Self, WorkflowError> {
        let pool = DatabaseManager::pool()
            .await
            .map_err(|e| WorkflowError::Database(sqlx::Error::Configuration(e.to_string().into())))?;
        Ok(Self { pool })
    }

    fn templates(&self, tenant_id: Uuid) -> Repository<TaskTemplate> {
        Repository::new("task_templates", self.pool.clone(), tenant_id)
    }

    fn workflows(&self, tenant_id: Uuid) -> Repository<Workflow> {
        Repository::new("workflows", self.pool.clone(), tenant_id)
    }

    // Task templates

    pub async fn list_templates(&self, tenant_id: Uuid, filter: FilterData) -> Result<Vec<TaskTemplate>, WorkflowError> {
        self.templates(tenant_id)
            .select_any(filter)
            .await
            .map_err(db_error)
    }

    pub async fn create_template(&self, tenant_id: Uuid, input: TemplateInput) -> Result<TaskTemplate, WorkflowError> {
        let row = sqlx::query_as::<_, TaskTemplate>(
            r#"
            INSERT INTO task_templates (tenant_id, name, description, fields)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.fields)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn delete_template(&self, tenant_id: Uuid, id: Uuid) -> Result<(), WorkflowError> {
        let done = sqlx::query(
            "UPDATE task_templates SET is_active = FALSE, updated_at = now() WHERE id = $1 AND tenant_id = $2 AND is_active = TRUE",
        )
        .bind(id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;
        if done.rows_affected() == 0 {
            return Err(WorkflowError::NotFound);
        }
        Ok(())
    }

    /// Create a draft workflow pre-filled from a template's fields.
    pub async fn instantiate_template(&self, tenant_id: Uuid, template_id: Uuid, name: &str) -> Result<Workflow, WorkflowError> {
        let template = self
            .templates(tenant_id)
            .select_by_id(template_id)
            .await
            .map_err(|_| WorkflowError::NotFound)?;

        self.create_workflow(
            tenant_id,
            WorkflowInput {
                name: name.to_string(),
                template_id: Some(template.id),
                definition: json!({ "fields": template.fields }),
            },
        )
        .await
    }

    // Workflows

    pub async fn list_workflows(&self, tenant_id: Uuid, filter: FilterData) -> Result<Vec<Workflow>, WorkflowError> {
        self.workflows(tenant_id)
            .select_any(filter)
            .await
            .map_err(db_error)
    }

    pub async fn get_workflow(&self, tenant_id: Uuid, id: Uuid) -> Result<Workflow, WorkflowError> {
        self.workflows(tenant_id)
            .select_by_id(id)
            .await
            .map_err(|_| WorkflowError::NotFound)
    }

    pub async fn create_workflow(&self, tenant_id: Uuid, input: WorkflowInput) -> Result<Workflow, WorkflowError> {
        let row = sqlx::query_as::<_, Workflow>(
            r#"
            INSERT INTO workflows (tenant_id, template_id, name, status, definition)
            VALUES ($1, $2, $3, 'draft', $4)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(input.template_id)
        .bind(&input.name)
        .bind(&input.definition)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update_workflow(&self, tenant_id: Uuid, id: Uuid, input: WorkflowInput) -> Result<Workflow, WorkflowError> {
        let row = sqlx::query_as::<_, Workflow>(
            r#"
            UPDATE workflows SET name = $1, definition = $2, updated_at = now()
            WHERE id = $3 AND tenant_id = $4 AND is_active = TRUE
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.definition)
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(WorkflowError::NotFound)?;
        Ok(row)
    }

    pub async fn delete_workflow(&self, tenant_id: Uuid, id: Uuid) -> Result<(), WorkflowError> {
        let done = sqlx::query(
            "UPDATE workflows SET is_active = FALSE, updated_at = now() WHERE id = $1 AND tenant_id = $2 AND is_active = TRUE",
        )
        .bind(id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;
        if done.rows_affected() == 0 {
            return Err(WorkflowError::NotFound);
        }
        Ok(())
    }

    /// Move a workflow through its status machine, rejecting transitions the
    /// machine does not allow.
    pub async fn transition(&self, tenant_id: Uuid, id: Uuid, next: &str) -> Result<Workflow, WorkflowError> {
        let next_status = WorkflowStatus::parse(next)?;
        let workflow = self.get_workflow(tenant_id, id).await?;
        let current = WorkflowStatus::parse(&workflow.status)?;

        if !current.can_transition_to(next_status) {
            return Err(WorkflowError::InvalidTransition {
                from: current.as_str().to_string(),
                to: next_status.as_str().to_string(),
            });
        }

        let row = sqlx::query_as::<_, Workflow>(
            r#"
            UPDATE workflows SET status = $1, updated_at = now()
            WHERE id = $2 AND tenant_id = $3 AND is_active = TRUE
            RETURNING *
            "#,
        )
        .bind(next_status.as_str())
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(WorkflowError::NotFound)?;

        tracing::info!(workflow = %id, from = current.as_str(), to = next_status.as_str(), "workflow transitioned");
        Ok(row)
    }
}

fn db_error(e: crate::database::manager::DatabaseError) -> WorkflowError {
    match e {
        crate::database::manager::DatabaseError::Sqlx(e) => WorkflowError::Database(e),
        other => WorkflowError::Database(sqlx::Error::Configuration(other.to_string().into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_transitions() {
        use WorkflowStatus::*;
        assert!(Draft.can_transition_to(Active));
        assert!(Active.can_transition_to(Paused));
        assert!(Paused.can_transition_to(Active));
        assert!(Active.can_transition_to(Archived));
        assert!(Paused.can_transition_to(Archived));
    }

    #[test]
    fn forbidden_transitions() {
        use WorkflowStatus::*;
        assert!(!Draft.can_transition_to(Paused));
        assert!(!Draft.can_transition_to(Archived));
        assert!(!Archived.can_transition_to(Active));
        assert!(!Archived.can_transition_to(Draft));
        assert!(!Active.can_transition_to(Draft));
        assert!(!Active.can_transition_to(Active));
    }

    #[test]
    fn status_parse_roundtrip() {
        for s in ["draft", "active", "paused", "archived"] {
            assert_eq!(WorkflowStatus::parse(s).unwrap().as_str(), s);
        }
        assert!(WorkflowStatus::parse("running").is_err());
    }
}
