use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(tenant_id: Uuid, user_id: Uuid, email: String, role: String) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            tenant_id,
            user_id,
            email,
            role,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT_SECRET not configured")]
    MissingSecret,
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

fn secret() -> Result<String, JwtError> {
    std::env::var("JWT_SECRET").map_err(|_| JwtError::MissingSecret)
}

/// Sign a token for an authenticated user.
pub fn generate_token(claims: &Claims) -> Result<String, JwtError> {
    let secret = secret()?;
    let token = encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))?;
    Ok(token)
}

/// Validate a bearer token and return its claims.
pub fn validate_token(token: &str) -> Result<Claims, JwtError> {
    let secret = secret()?;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_roundtrip() {
        std::env::set_var("JWT_SECRET", "test-secret");
        let claims = Claims::new(Uuid::new_v4(), Uuid::new_v4(), "a@b.com".into(), "admin".into());
        let token = generate_token(&claims).unwrap();
        let decoded = validate_token(&token).unwrap();
        assert_eq!(decoded.user_id, claims.user_id);
        assert_eq!(decoded.tenant_id, claims.tenant_id);
        assert_eq!(decoded.role, "admin");
    }

    #[test]
    fn garbage_token_rejected() {
        std::env::set_var("JWT_SECRET", "test-secret");
        assert!(validate_token("not.a.token").is_err());
    }
}
