//! API configuration

use serde::Deserialize;

use core_kernel::Currency;

/// Which adapters back the stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// Process-local maps; data is lost on restart
    Memory,
}

/// API configuration
///
/// Every field has a default, so any subset of `API_*` variables may be set.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub storage: StorageBackend,
    /// Currency applied to expenses that do not name one
    pub default_currency: Currency,
    /// Log level
    pub log_level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/expenses".to_string(),
            db_max_connections: 10,
            db_min_connections: 2,
            storage: StorageBackend::Postgres,
            default_currency: Currency::USD,
            log_level: "info".to_string(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.jwt_expiration_secs, 3600);
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.default_currency, Currency::USD);
    }

    #[test]
    fn test_partial_source_keeps_defaults() {
        let config: ApiConfig = config::Config::builder()
            .set_override("port", 9090)
            .unwrap()
            .set_override("storage", "memory")
            .unwrap()
            .set_override("default_currency", "EUR")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.default_currency, Currency::EUR);
        assert_eq!(config.host, "0.0.0.0");
    }
}
