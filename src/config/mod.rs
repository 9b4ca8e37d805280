use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub app: AppConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub jwt_issuer: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,
    pub url: String,
    pub ttl_secs: u64,
    pub key_prefix: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub welcome_message: String,
    pub vpn_host: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("database.max_connections", 10)?
            .set_default("auth.jwt_expiry_hours", 1)?
            .set_default("auth.jwt_issuer", "tollgate")?
            .set_default("cache.enabled", false)?
            .set_default("cache.url", "redis://127.0.0.1:6379")?
            .set_default("cache.ttl_secs", 300)?
            .set_default("cache.key_prefix", "tollgate")?
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (with TOLLGATE__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("TOLLGATE").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                base_url: "http://localhost:3000".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://tollgate.db".to_string(),
                max_connections: 10,
            },
            auth: AuthConfig {
                jwt_secret: "change-me-in-production".to_string(),
                jwt_expiry_hours: 1,
                jwt_issuer: "tollgate".to_string(),
            },
            cache: CacheConfig::default(),
            app: AppConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "redis://127.0.0.1:6379".to_string(),
            ttl_secs: 300,
            key_prefix: "tollgate".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            welcome_message: "Tollgate billing API".to_string(),
            vpn_host: "vpn.example.com".to_string(),
        }
    }
}
