use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::matching::MatchRules;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub registry: RegistrySettings,
    #[serde(default)]
    pub routing: RoutingSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub publisher: PublisherSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrySettings {
    #[serde(default)]
    pub backend: RegistryBackend,
    pub database_url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingProvider {
    #[default]
    Osrm,
    Haversine,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoutingSettings {
    #[serde(default)]
    pub provider: RoutingProvider,
    #[serde(default = "default_osrm_url")]
    pub osrm_url: String,
    #[serde(default = "default_routing_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            provider: RoutingProvider::default(),
            osrm_url: default_osrm_url(),
            timeout_secs: default_routing_timeout_secs(),
        }
    }
}

fn default_osrm_url() -> String { "http://router.project-osrm.org".to_string() }
fn default_routing_timeout_secs() -> u64 { 5 }

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_window_minutes")]
    pub window_minutes: i64,
    #[serde(default = "default_max_pickup_distance_km")]
    pub max_pickup_distance_km: f64,
    #[serde(default = "default_max_concurrent_lookups")]
    pub max_concurrent_lookups: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            window_minutes: default_window_minutes(),
            max_pickup_distance_km: default_max_pickup_distance_km(),
            max_concurrent_lookups: default_max_concurrent_lookups(),
        }
    }
}

fn default_window_minutes() -> i64 { 10 }
fn default_max_pickup_distance_km() -> f64 { 2.0 }
fn default_max_concurrent_lookups() -> usize { 8 }

#[derive(Debug, Clone, Deserialize)]
pub struct PublisherSettings {
    #[serde(default = "default_publisher_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_publisher_max_entries")]
    pub max_entries: u64,
}

impl Default for PublisherSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_publisher_ttl_secs(),
            max_entries: default_publisher_max_entries(),
        }
    }
}

fn default_publisher_ttl_secs() -> u64 { 3600 }
fn default_publisher_max_entries() -> u64 { 10_000 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "compact".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with CARPOOL__)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., CARPOOL__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("CARPOOL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("CARPOOL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

impl MatchingSettings {
    /// Match rules, with the routing timeout bounding each distance lookup
    pub fn rules(&self, routing: &RoutingSettings) -> MatchRules {
        MatchRules {
            window: chrono::Duration::minutes(self.window_minutes),
            max_pickup_distance_km: self.max_pickup_distance_km,
            lookup_timeout: Duration::from_secs(routing.timeout_secs),
            max_concurrent_lookups: self.max_concurrent_lookups,
        }
    }
}

/// Apply the conventional `DATABASE_URL` variable on top of file settings
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => Config::builder()
            .add_source(settings)
            .set_override("registry.database_url", url)?
            .build(),
        Err(_) => Ok(settings),
    }
}
