use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub dispatch: DispatchSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// When unset the portal runs on the in-memory store.
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> u64 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
    /// Enables the /v1/auth/token mint endpoint. Never set in production.
    #[serde(default)]
    pub allow_dev_tokens: bool,
}

/// Settings for the flight-plan generation bridge.
#[derive(Debug, Deserialize, Clone)]
pub struct DispatchSettings {
    /// Base URL of the external planning service.
    pub provider_base_url: String,
    /// Origin of the provider pages allowed to push plan identifiers.
    pub trusted_origin: String,
    /// Origin we hand to the provider as the return address for pushes.
    pub portal_origin: String,
    #[serde(default = "default_resolution_timeout")]
    pub resolution_timeout_seconds: u64,
    #[serde(default = "default_close_grace")]
    pub close_grace_seconds: u64,
}

fn default_resolution_timeout() -> u64 {
    120
}

fn default_close_grace() -> u64 {
    10
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Base file first, then the environment-specific overlay
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, kept out of version control
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `CREWDECK__SERVER__PORT=9000`
            .add_source(config::Environment::with_prefix("CREWDECK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
