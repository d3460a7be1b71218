//! Process configuration, read once from the environment at start-up.

use crate::db::DbConfig;

pub const DEFAULT_JWT_SECRET: &str = "default-jwt-secret-change-in-production";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub jwt_secret: String,
    pub jwt_audience: Option<String>,
    /// Explicit CORS origins; empty means the development defaults.
    pub allowed_origins: Vec<String>,
    /// `None` when `DATABASE_URL` is unset: the in-memory store is used.
    pub database: Option<DbConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set to a secure, unique value in production")]
    InsecureJwtSecret,

    #[error("Invalid HOST/PORT configuration: {0}")]
    InvalidAddress(String),
}

impl AppConfig {
    pub fn from_env() -> Self {
        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .or_else(|| std::env::var("FRONTEND_ORIGIN").ok().map(|o| vec![o]))
            .unwrap_or_default();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3001),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            jwt_secret: std::env::var("JWT_SECRET")
                .unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string()),
            jwt_audience: std::env::var("JWT_AUDIENCE").ok().filter(|s| !s.is_empty()),
            allowed_origins,
            database: std::env::var("DATABASE_URL")
                .is_ok()
                .then(DbConfig::default),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Refuse configurations that must never reach production.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.is_production()
            && (self.jwt_secret.is_empty() || self.jwt_secret == DEFAULT_JWT_SECRET)
        {
            return Err(ConfigError::InsecureJwtSecret);
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(format!("{}:{}", self.host, self.port)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(environment: &str, secret: &str) -> AppConfig {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 3001,
            environment: environment.to_string(),
            jwt_secret: secret.to_string(),
            jwt_audience: None,
            allowed_origins: vec![],
            database: None,
        }
    }

    #[test]
    fn test_production_rejects_default_secret() {
        assert!(config("production", DEFAULT_JWT_SECRET).validate().is_err());
        assert!(config("production", "").validate().is_err());
        assert!(config("production", "a-real-secret").validate().is_ok());
    }

    #[test]
    fn test_development_allows_default_secret() {
        assert!(config("development", DEFAULT_JWT_SECRET).validate().is_ok());
    }

    #[test]
    fn test_socket_addr_parses() {
        let addr = config("development", "x").socket_addr().unwrap();
        assert_eq!(addr.port(), 3001);

        let mut bad = config("development", "x");
        bad.host = "not a host".to_string();
        assert!(bad.socket_addr().is_err());
    }
}
