use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub connector: ConnectorConfig,
    pub verification: VerificationConfig,
    pub trial: TrialConfig,
    pub plans: PlanConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
    pub enable_slow_query_warning: bool,
    pub slow_query_threshold_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub max_list_limit: i32,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub jwt_expiry_hours: u64,
}

/// Timeouts and cache behavior for the universal connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub default_cache_ttl_secs: i64,
    pub preview_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    pub code_ttl_secs: i64,
    pub max_attempts: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialConfig {
    pub trial_days: i64,
    pub min_password_len: usize,
}

/// Per-plan ML slot ceilings. The original platform kept these in a static
/// config map rather than the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    pub standard_ml_slots: i64,
    pub professional_ml_slots: i64,
    pub enterprise_ml_slots: i64,
}

impl PlanConfig {
    pub fn ml_slots_for(&self, plan: &str) -> i64 {
        match plan {
            "professional" => self.professional_ml_slots,
            "enterprise" => self.enterprise_ml_slots,
            _ => self.standard_ml_slots,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECT_TIMEOUT") {
            self.database.connect_timeout_secs = v.parse().unwrap_or(self.database.connect_timeout_secs);
        }
        if let Ok(v) = env::var("DATABASE_SLOW_QUERY_THRESHOLD_MS") {
            self.database.slow_query_threshold_ms = v.parse().unwrap_or(self.database.slow_query_threshold_ms);
        }

        if let Ok(v) = env::var("API_MAX_LIST_LIMIT") {
            self.api.max_list_limit = v.parse().unwrap_or(self.api.max_list_limit);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        if let Ok(v) = env::var("CONNECTOR_CONNECT_TIMEOUT") {
            self.connector.connect_timeout_secs = v.parse().unwrap_or(self.connector.connect_timeout_secs);
        }
        if let Ok(v) = env::var("CONNECTOR_REQUEST_TIMEOUT") {
            self.connector.request_timeout_secs = v.parse().unwrap_or(self.connector.request_timeout_secs);
        }
        if let Ok(v) = env::var("CONNECTOR_DEFAULT_CACHE_TTL") {
            self.connector.default_cache_ttl_secs = v.parse().unwrap_or(self.connector.default_cache_ttl_secs);
        }

        if let Ok(v) = env::var("VERIFICATION_CODE_TTL") {
            self.verification.code_ttl_secs = v.parse().unwrap_or(self.verification.code_ttl_secs);
        }
        if let Ok(v) = env::var("VERIFICATION_MAX_ATTEMPTS") {
            self.verification.max_attempts = v.parse().unwrap_or(self.verification.max_attempts);
        }

        if let Ok(v) = env::var("TRIAL_DAYS") {
            self.trial.trial_days = v.parse().unwrap_or(self.trial.trial_days);
        }

        if let Ok(v) = env::var("PLAN_STANDARD_ML_SLOTS") {
            self.plans.standard_ml_slots = v.parse().unwrap_or(self.plans.standard_ml_slots);
        }
        if let Ok(v) = env::var("PLAN_PROFESSIONAL_ML_SLOTS") {
            self.plans.professional_ml_slots = v.parse().unwrap_or(self.plans.professional_ml_slots);
        }
        if let Ok(v) = env::var("PLAN_ENTERPRISE_ML_SLOTS") {
            self.plans.enterprise_ml_slots = v.parse().unwrap_or(self.plans.enterprise_ml_slots);
        }

        self
    }

    fn base(environment: Environment) -> Self {
        Self {
            environment,
            database: DatabaseConfig {
                max_connections: 10,
                connect_timeout_secs: 30,
                enable_slow_query_warning: true,
                slow_query_threshold_ms: 100,
            },
            api: ApiConfig {
                max_list_limit: 1000,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                jwt_expiry_hours: 24 * 7, // 1 week
            },
            connector: ConnectorConfig {
                connect_timeout_secs: 10,
                request_timeout_secs: 30,
                default_cache_ttl_secs: 300,
                preview_bytes: 200,
            },
            verification: VerificationConfig {
                code_ttl_secs: 600,
                max_attempts: 3,
            },
            trial: TrialConfig {
                trial_days: 7,
                min_password_len: 6,
            },
            plans: PlanConfig {
                standard_ml_slots: 3,
                professional_ml_slots: 10,
                enterprise_ml_slots: 30,
            },
        }
    }

    fn development() -> Self {
        Self::base(Environment::Development)
    }

    fn staging() -> Self {
        let mut config = Self::base(Environment::Staging);
        config.database.max_connections = 20;
        config.database.slow_query_threshold_ms = 500;
        config.api.max_list_limit = 500;
        config.security.cors_origins = vec!["https://staging.example.com".to_string()];
        config.security.jwt_expiry_hours = 24;
        config
    }

    fn production() -> Self {
        let mut config = Self::base(Environment::Production);
        config.database.max_connections = 50;
        config.database.slow_query_threshold_ms = 1000;
        config.api.max_list_limit = 100;
        config.api.enable_request_logging = false;
        config.security.cors_origins = vec!["https://app.example.com".to_string()];
        config.security.jwt_expiry_hours = 4;
        config
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_defaults() {
        let config = AppConfig::development();
        assert_eq!(config.api.max_list_limit, 1000);
        assert_eq!(config.connector.default_cache_ttl_secs, 300);
        assert_eq!(config.verification.max_attempts, 3);
        assert_eq!(config.trial.trial_days, 7);
    }

    #[test]
    fn production_tightens_limits() {
        let config = AppConfig::production();
        assert_eq!(config.api.max_list_limit, 100);
        assert_eq!(config.security.jwt_expiry_hours, 4);
        assert!(!config.api.enable_request_logging);
    }

    #[test]
    fn plan_slot_ceilings() {
        let plans = AppConfig::development().plans;
        assert_eq!(plans.ml_slots_for("standard"), 3);
        assert_eq!(plans.ml_slots_for("professional"), 10);
        assert_eq!(plans.ml_slots_for("enterprise"), 30);
        // unknown plans fall back to the standard ceiling
        assert_eq!(plans.ml_slots_for("legacy"), 3);
    }
}
