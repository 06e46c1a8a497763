use chrono::{Duration, Utc};
use rand::Rng;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::delivery::CodeDelivery;
use crate::database::manager::DatabaseManager;
use crate::database::models::{User, VerificationCode};

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("A code was already sent. Wait {minutes_remaining} minute(s) before requesting another.")]
    CodeAlreadySent { minutes_remaining: i64 },

    #[error("Code not found or expired. Request a new code.")]
    CodeNotFound,

    #[error("Too many incorrect attempts. Request a new code.")]
    MaxAttemptsExceeded,

    #[error("Incorrect code. {remaining} attempt(s) remaining.")]
    InvalidCode { remaining: i32 },

    #[error("User not found")]
    UserNotFound,

    #[error("No {0} on the user profile")]
    ContactMissing(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Email,
    Phone,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Phone => "phone",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "email" => Some(Channel::Email),
            "phone" => Some(Channel::Phone),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SendOutcome {
    pub code_id: Uuid,
    pub expires_in_secs: i64,
}

#[derive(Debug, Serialize)]
pub struct VerificationStatus {
    pub email_verified: bool,
    pub phone_verified: bool,
    pub has_email: bool,
    pub has_phone: bool,
}

pub struct VerificationService {
    pool: PgPool,
    delivery: CodeDelivery,
}

impl VerificationService {
    pub async fn new() -> Result<Self, VerificationError> {
        let pool = DatabaseManager::pool()
            .await
            .map_err(|e| VerificationError::Database(sqlx::Error::Configuration(e.to_string().into())))?;
        Ok(Self::with_pool(pool))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self {
            pool,
            delivery: CodeDelivery::from_env(),
        }
    }

    /// Issue a fresh code for the channel, refusing while an unexpired one
    /// is outstanding. Delivery failures are logged, never bubbled; the code
    /// row is the source of truth.
    pub async fn send_code(&self, user_id: Uuid, channel: Channel) -> Result<SendOutcome, VerificationError> {
        let user = self.load_user(user_id).await?;
        let contact = match channel {
            Channel::Email => user.email.clone(),
            Channel::Phone => user
                .phone
                .clone()
                .ok_or_else(|| VerificationError::ContactMissing("phone".to_string()))?,
        };

        if let Some(existing) = self.active_code(user_id, channel).await? {
            let seconds = (existing.expires_at - Utc::now()).num_seconds().max(0);
            return Err(VerificationError::CodeAlreadySent {
                minutes_remaining: (seconds + 59) / 60,
            });
        }

        let code = generate_code();
        let ttl = crate::config::config().verification.code_ttl_secs;
        let expires_at = Utc::now() + Duration::seconds(ttl);

        let row = sqlx::query_as::<_, VerificationCode>(
            r#"
            INSERT INTO verification_codes (user_id, channel, code, contact, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(channel.as_str())
        .bind(&code)
        .bind(&contact)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        match channel {
            Channel::Email => self.delivery.send_email(&contact, &code).await,
            Channel::Phone => self.delivery.send_sms(&contact, &code).await,
        }

        Ok(SendOutcome {
            code_id: row.id,
            expires_in_secs: ttl,
        })
    }

    /// Check a code. Attempts are counted before comparison, so the limit
    /// holds even when a later attempt carries the right code.
    pub async fn verify_code(&self, user_id: Uuid, channel: Channel, input: &str) -> Result<(), VerificationError> {
        let record = self
            .active_code(user_id, channel)
            .await?
            .ok_or(VerificationError::CodeNotFound)?;

        let max_attempts = crate::config::config().verification.max_attempts;
        if record.attempts >= max_attempts {
            return Err(VerificationError::MaxAttemptsExceeded);
        }

        sqlx::query("UPDATE verification_codes SET attempts = attempts + 1 WHERE id = $1")
            .bind(record.id)
            .execute(&self.pool)
            .await?;

        if record.code != input {
            let remaining = max_attempts - (record.attempts + 1);
            return Err(VerificationError::InvalidCode { remaining });
        }

        sqlx::query("UPDATE verification_codes SET verified = TRUE WHERE id = $1")
            .bind(record.id)
            .execute(&self.pool)
            .await?;

        let flag = match channel {
            Channel::Email => "email_verified",
            Channel::Phone => "phone_verified",
        };
        sqlx::query(&format!("UPDATE users SET {} = TRUE, updated_at = now() WHERE id = $1", flag))
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        self.try_activate_trial(user_id).await;
        Ok(())
    }

    /// Invalidate outstanding codes for the channel, then issue a new one.
    pub async fn resend_code(&self, user_id: Uuid, channel: Channel) -> Result<SendOutcome, VerificationError> {
        sqlx::query(
            "UPDATE verification_codes SET verified = TRUE WHERE user_id = $1 AND channel = $2 AND NOT verified",
        )
        .bind(user_id)
        .bind(channel.as_str())
        .execute(&self.pool)
        .await?;

        self.send_code(user_id, channel).await
    }

    pub async fn status(&self, user_id: Uuid) -> Result<VerificationStatus, VerificationError> {
        let user = self.load_user(user_id).await?;
        Ok(VerificationStatus {
            email_verified: user.email_verified,
            phone_verified: user.phone_verified,
            has_email: !user.email.is_empty(),
            has_phone: user.phone.as_deref().map(|p| !p.is_empty()).unwrap_or(false),
        })
    }

    /// Drop expired unverified codes; returns how many were removed.
    pub async fn cleanup_expired(&self) -> Result<u64, VerificationError> {
        let done = sqlx::query("DELETE FROM verification_codes WHERE NOT verified AND expires_at < now()")
            .execute(&self.pool)
            .await?;
        let removed = done.rows_affected();
        tracing::info!(removed, "cleaned up expired verification codes");
        Ok(removed)
    }

    async fn active_code(&self, user_id: Uuid, channel: Channel) -> Result<Option<VerificationCode>, VerificationError> {
        let row = sqlx::query_as::<_, VerificationCode>(
            r#"
            SELECT * FROM verification_codes
            WHERE user_id = $1 AND channel = $2 AND NOT verified AND expires_at > now()
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(channel.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn load_user(&self, user_id: Uuid) -> Result<User, VerificationError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(VerificationError::UserNotFound)
    }

    /// Trial accounts activate once email is verified and phone is verified
    /// or absent. Failures here never break the verification flow.
    async fn try_activate_trial(&self, user_id: Uuid) {
        let result = sqlx::query(
            r#"
            UPDATE users SET is_active = TRUE, updated_at = now()
            WHERE id = $1
              AND is_trial
              AND NOT is_active
              AND email_verified
              AND (phone_verified OR phone IS NULL)
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() > 0 => {
                tracing::info!(user = %user_id, "trial account activated after verification");
            }
            Ok(_) => {}
            Err(e) => tracing::error!(user = %user_id, error = %e, "trial activation check failed"),
        }
    }
}

fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert!(!code.starts_with('0'));
        }
    }

    #[test]
    fn channel_parsing() {
        assert_eq!(Channel::parse("email"), Some(Channel::Email));
        assert_eq!(Channel::parse("phone"), Some(Channel::Phone));
        assert_eq!(Channel::parse("fax"), None);
    }
}
