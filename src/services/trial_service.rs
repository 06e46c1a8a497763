use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::verification_service::{Channel, VerificationService};
use crate::database::manager::DatabaseManager;
use crate::database::models::{Tenant, User};

#[derive(Debug, thiserror::Error)]
pub enum TrialError {
    #[error("{0}")]
    Validation(String),

    #[error("This email is already registered")]
    DuplicateEmail,

    #[error("This CPF is already registered")]
    DuplicateCpf,

    #[error("This workspace name is already taken")]
    DuplicateSlug,

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrialSignup {
    pub first_name: String,
    pub last_name: String,
    pub cpf: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    #[serde(default)]
    pub accepted_terms: bool,
    #[serde(default)]
    pub accepted_privacy: bool,
}

#[derive(Debug, Serialize)]
pub struct TrialAccount {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub trial_ends_at: chrono::DateTime<Utc>,
}

pub struct TrialService {
    pool: PgPool,
}

impl TrialService {
    pub async fn new() -> Result<Self, TrialError> {
        let pool = DatabaseManager::pool()
            .await
            .map_err(|e| TrialError::Database(sqlx::Error::Configuration(e.to_string().into())))?;
        Ok(Self::with_pool(pool))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Provision a trial workspace: one tenant plus its admin user in a
    /// single transaction, so a failure leaves no orphan tenant behind.
    pub async fn signup(&self, signup: TrialSignup) -> Result<TrialAccount, TrialError> {
        let signup = validate_signup(signup)?;

        // Duplicate checks run before any write so the caller gets a
        // descriptive error instead of a constraint violation
        let existing: Option<(bool,)> = sqlx::query_as("SELECT TRUE FROM users WHERE email = $1")
            .bind(&signup.email)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(TrialError::DuplicateEmail);
        }

        let existing: Option<(bool,)> = sqlx::query_as("SELECT TRUE FROM users WHERE cpf = $1")
            .bind(&signup.cpf)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(TrialError::DuplicateCpf);
        }

        let password_hash =
            bcrypt::hash(&signup.password, bcrypt::DEFAULT_COST).map_err(|e| TrialError::Hash(e.to_string()))?;

        let trial_days = crate::config::config().trial.trial_days;
        let trial_ends_at = Utc::now() + Duration::days(trial_days);
        let slug = derive_slug(&signup.first_name, &signup.last_name, &signup.cpf);

        let mut tx = self.pool.begin().await?;

        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants (name, slug, plan, status, trial_ends_at)
            VALUES ($1, $2, 'standard', 'trial', $3)
            RETURNING *
            "#,
        )
        .bind(format!("{} {}", signup.first_name, signup.last_name))
        .bind(&slug)
        .bind(trial_ends_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.constraint() == Some("tenants_slug_key") => TrialError::DuplicateSlug,
            _ => TrialError::Database(e),
        })?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users
                (tenant_id, email, cpf, phone, password_hash, role, first_name, last_name, is_trial, is_active)
            VALUES ($1, $2, $3, $4, $5, 'admin', $6, $7, TRUE, FALSE)
            RETURNING *
            "#,
        )
        .bind(tenant.id)
        .bind(&signup.email)
        .bind(&signup.cpf)
        .bind(&signup.phone)
        .bind(&password_hash)
        .bind(&signup.first_name)
        .bind(&signup.last_name)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(tenant = %tenant.id, user = %user.id, "trial account provisioned");

        // Verification codes go out after the commit; a delivery hiccup must
        // not undo the signup
        match VerificationService::new().await {
            Ok(verification) => {
                let (email_sent, phone_sent) = futures::future::join(
                    verification.send_code(user.id, Channel::Email),
                    verification.send_code(user.id, Channel::Phone),
                )
                .await;
                if let Err(e) = email_sent {
                    tracing::error!(user = %user.id, error = %e, "failed to issue email verification code");
                }
                if let Err(e) = phone_sent {
                    tracing::error!(user = %user.id, error = %e, "failed to issue phone verification code");
                }
            }
            Err(e) => tracing::error!(error = %e, "verification service unavailable after signup"),
        }

        Ok(TrialAccount {
            tenant_id: tenant.id,
            user_id: user.id,
            trial_ends_at,
        })
    }
}

fn validate_signup(mut signup: TrialSignup) -> Result<TrialSignup, TrialError> {
    signup.cpf = signup.cpf.chars().filter(|c| c.is_ascii_digit()).collect();
    signup.phone = signup.phone.chars().filter(|c| c.is_ascii_digit()).collect();
    signup.email = signup.email.trim().to_lowercase();

    if signup.first_name.trim().is_empty() || signup.last_name.trim().is_empty() {
        return Err(TrialError::Validation("First and last name are required".to_string()));
    }
    if signup.cpf.len() != 11 {
        return Err(TrialError::Validation("CPF must have 11 digits".to_string()));
    }
    if !signup.email.contains('@') || !signup.email.contains('.') {
        return Err(TrialError::Validation("Invalid email".to_string()));
    }
    if signup.phone.len() < 10 {
        return Err(TrialError::Validation("Phone must have at least 10 digits".to_string()));
    }
    let min_len = crate::config::config().trial.min_password_len;
    if signup.password.len() < min_len {
        return Err(TrialError::Validation(format!(
            "Password must have at least {} characters",
            min_len
        )));
    }
    if !signup.accepted_terms {
        return Err(TrialError::Validation("You must accept the Terms of Use".to_string()));
    }
    if !signup.accepted_privacy {
        return Err(TrialError::Validation("You must accept the Privacy Policy".to_string()));
    }
    Ok(signup)
}

/// Unique, url-safe workspace slug from the owner's name plus a CPF tail.
fn derive_slug(first_name: &str, last_name: &str, cpf: &str) -> String {
    let base: String = format!("{}-{}", first_name, last_name)
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let base = base.trim_matches('-').to_string();
    let tail = &cpf[cpf.len().saturating_sub(4)..];
    format!("{}-{}", base, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup() -> TrialSignup {
        TrialSignup {
            first_name: "Ana".into(),
            last_name: "Silva".into(),
            cpf: "123.456.789-01".into(),
            email: "Ana@Example.com".into(),
            phone: "(11) 98765-4321".into(),
            password: "hunter22".into(),
            accepted_terms: true,
            accepted_privacy: true,
        }
    }

    #[test]
    fn normalizes_cpf_phone_email() {
        let s = validate_signup(signup()).unwrap();
        assert_eq!(s.cpf, "12345678901");
        assert_eq!(s.phone, "11987654321");
        assert_eq!(s.email, "ana@example.com");
    }

    #[test]
    fn rejects_short_cpf() {
        let mut s = signup();
        s.cpf = "123".into();
        assert!(matches!(validate_signup(s), Err(TrialError::Validation(_))));
    }

    #[test]
    fn rejects_missing_terms() {
        let mut s = signup();
        s.accepted_terms = false;
        assert!(validate_signup(s).is_err());
    }

    #[test]
    fn rejects_short_password() {
        let mut s = signup();
        s.password = "abc".into();
        assert!(validate_signup(s).is_err());
    }

    #[test]
    fn slug_is_url_safe_and_suffixed() {
        assert_eq!(derive_slug("Ana", "Silva", "12345678901"), "ana-silva-8901");
        assert_eq!(derive_slug("João", "dos Santos", "00000000042"), "jo-o-dos-santos-0042");
    }
}
