use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub entitlement: EntitlementConfig,
    pub signing: SigningConfig,
    pub security: SecurityConfig,
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
    pub connection_timeout: u64,
    pub enable_query_logging: bool,
}

/// Remote entitlement service settings. The timeout bounds the single
/// blocking call made per resolution; transport failures collapse to
/// "not entitled", so a hang here would otherwise stall the whole response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitlementConfig {
    pub base_url: String,
    pub api_version: EntitlementApiVersion,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntitlementApiVersion {
    /// Query by party/org id, checks grant type `View`.
    V3,
    /// Per-product call with bearer token, checks `view`/`download`.
    V4,
}

/// URL-signing settings. The three expiry classes are a deliberate
/// security/usability trade-off: crawlers queue fetches for days, video
/// players re-request within the hour, everything else is short-lived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningConfig {
    pub storage_endpoint: String,
    pub bucket: String,
    pub cdn_base_url: String,
    pub signing_secret: String,
    pub default_expiry_secs: u64,
    pub video_expiry_secs: u64,
    pub bot_expiry_secs: u64,
    pub landing_page_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub enable_cors: bool,
    /// Roles allowed to bypass the entitlement gate entirely.
    pub privileged_roles: Vec<String>,
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
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging = v.parse().unwrap_or(self.database.enable_query_logging);
        }

        // Entitlement overrides
        if let Ok(v) = env::var("ENTITLEMENT_BASE_URL") {
            self.entitlement.base_url = v;
        }
        if let Ok(v) = env::var("ENTITLEMENT_API_VERSION") {
            self.entitlement.api_version = match v.as_str() {
                "v3" | "V3" | "3" => EntitlementApiVersion::V3,
                _ => EntitlementApiVersion::V4,
            };
        }
        if let Ok(v) = env::var("ENTITLEMENT_TIMEOUT_SECS") {
            self.entitlement.timeout_secs = v.parse().unwrap_or(self.entitlement.timeout_secs);
        }

        // Signing overrides
        if let Ok(v) = env::var("STORAGE_ENDPOINT") {
            self.signing.storage_endpoint = v;
        }
        if let Ok(v) = env::var("STORAGE_BUCKET") {
            self.signing.bucket = v;
        }
        if let Ok(v) = env::var("CDN_BASE_URL") {
            self.signing.cdn_base_url = v;
        }
        if let Ok(v) = env::var("SIGNING_SECRET") {
            self.signing.signing_secret = v;
        }
        if let Ok(v) = env::var("SIGNING_DEFAULT_EXPIRY_SECS") {
            self.signing.default_expiry_secs = v.parse().unwrap_or(self.signing.default_expiry_secs);
        }
        if let Ok(v) = env::var("SIGNING_VIDEO_EXPIRY_SECS") {
            self.signing.video_expiry_secs = v.parse().unwrap_or(self.signing.video_expiry_secs);
        }
        if let Ok(v) = env::var("SIGNING_BOT_EXPIRY_SECS") {
            self.signing.bot_expiry_secs = v.parse().unwrap_or(self.signing.bot_expiry_secs);
        }
        if let Ok(v) = env::var("LANDING_PAGE_BASE_URL") {
            self.signing.landing_page_base_url = v;
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_PRIVILEGED_ROLES") {
            self.security.privileged_roles = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
                enable_query_logging: true,
            },
            entitlement: EntitlementConfig {
                base_url: "http://localhost:4010/entitlement".to_string(),
                api_version: EntitlementApiVersion::V4,
                timeout_secs: 5,
            },
            signing: SigningConfig {
                storage_endpoint: "http://localhost:9000".to_string(),
                bucket: "folio-content-dev".to_string(),
                cdn_base_url: "http://localhost:9001".to_string(),
                signing_secret: "dev-signing-secret".to_string(),
                default_expiry_secs: 15 * 60,
                video_expiry_secs: 60 * 60,
                bot_expiry_secs: 3 * 24 * 60 * 60,
                landing_page_base_url: "http://localhost:5173/content".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: "dev-jwt-secret".to_string(),
                enable_cors: true,
                privileged_roles: vec!["content-admin".to_string(), "ingest-service".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
                enable_query_logging: true,
            },
            entitlement: EntitlementConfig {
                base_url: "https://entitlement.staging.example.com".to_string(),
                api_version: EntitlementApiVersion::V4,
                timeout_secs: 5,
            },
            signing: SigningConfig {
                storage_endpoint: "https://storage.staging.example.com".to_string(),
                bucket: "folio-content-staging".to_string(),
                cdn_base_url: "https://cdn.staging.example.com".to_string(),
                signing_secret: String::new(),
                default_expiry_secs: 15 * 60,
                video_expiry_secs: 60 * 60,
                bot_expiry_secs: 3 * 24 * 60 * 60,
                landing_page_base_url: "https://staging.example.com/content".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                enable_cors: true,
                privileged_roles: vec!["content-admin".to_string(), "ingest-service".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
                enable_query_logging: false,
            },
            entitlement: EntitlementConfig {
                base_url: "https://entitlement.example.com".to_string(),
                api_version: EntitlementApiVersion::V4,
                timeout_secs: 5,
            },
            signing: SigningConfig {
                storage_endpoint: "https://storage.example.com".to_string(),
                bucket: "folio-content".to_string(),
                cdn_base_url: "https://cdn.example.com".to_string(),
                signing_secret: String::new(),
                default_expiry_secs: 15 * 60,
                video_expiry_secs: 60 * 60,
                bot_expiry_secs: 3 * 24 * 60 * 60,
                landing_page_base_url: "https://www.example.com/content".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                enable_cors: true,
                privileged_roles: vec!["content-admin".to_string()],
            },
        }
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
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.entitlement.timeout_secs, 5);
        assert!(config.signing.bot_expiry_secs > config.signing.video_expiry_secs);
        assert!(config.signing.video_expiry_secs > config.signing.default_expiry_secs);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(matches!(config.entitlement.api_version, EntitlementApiVersion::V4));
        assert!(!config.database.enable_query_logging);
    }
}
