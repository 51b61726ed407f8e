use common::config::{AccessConfig, ConverterConfig, UploadConfig};
use config::{Config, ConfigError, Environment, File};
use ipnet::IpNet;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Reported by the health endpoint, e.g. "development" or "production".
    pub environment: String,
    pub cors: CorsConfig,
    /// Proxies allowed to set `X-Forwarded-For` / `X-Real-IP`. When empty the
    /// socket peer address identifies the client.
    #[serde(default)]
    pub trusted_proxies: Vec<IpNet>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Token lifetime. Default: 168 (7 days).
    pub token_ttl_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub access: AccessConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.environment", "development")?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("server.trusted_proxies", Vec::<String>::new())?
            .set_default("auth.token_ttl_hours", 168)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., RESUMES__AUTH__JWT_SECRET)
            // Lists are comma separated (e.g., RESUMES__SERVER__TRUSTED_PROXIES=10.0.0.0/8)
            .add_source(
                Environment::with_prefix("RESUMES")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors.allow_origins")
                    .with_list_parse_key("server.trusted_proxies"),
            )
            .build()?;

        s.try_deserialize()
    }
}
