use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::core::Comparators;
use crate::models::WeightConfig;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub database: Option<DatabaseSettings>,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub appwrite: Option<AppwriteSettings>,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub invitations: InvitationSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    /// Redis is optional; without it the service reads straight from the store
    pub redis_url: Option<String>,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppwriteSettings {
    pub endpoint: String,
    pub api_key: String,
    pub project_id: String,
    pub database_id: String,
    #[serde(default = "default_notifications_collection")]
    pub notifications_collection: String,
}

fn default_notifications_collection() -> String { "notifications".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_limit")]
    pub default_limit: u16,
    #[serde(default = "default_max_limit")]
    pub max_limit: u16,
    /// Leave inactive profiles out of the candidate pool
    #[serde(default = "default_true")]
    pub active_only: bool,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            active_only: default_true(),
        }
    }
}

fn default_limit() -> u16 { 50 }
fn default_max_limit() -> u16 { 500 }
fn default_true() -> bool { true }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
    #[serde(default)]
    pub comparators: Comparators,
}

/// Weights used until an administrator saves a config
#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_location_weight")]
    pub location: f64,
    #[serde(default = "default_interests_weight")]
    pub interests: f64,
    #[serde(default = "default_background_weight")]
    pub background: f64,
    #[serde(default = "default_availability_weight")]
    pub availability: f64,
    #[serde(default = "default_frequency_weight")]
    pub frequency: f64,
    #[serde(default = "default_timing_weight")]
    pub timing: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            location: default_location_weight(),
            interests: default_interests_weight(),
            background: default_background_weight(),
            availability: default_availability_weight(),
            frequency: default_frequency_weight(),
            timing: default_timing_weight(),
        }
    }
}

impl From<&WeightsConfig> for WeightConfig {
    fn from(value: &WeightsConfig) -> Self {
        WeightConfig {
            location: value.location,
            interests: value.interests,
            background: value.background,
            availability: value.availability,
            frequency: value.frequency,
            timing: value.timing,
        }
    }
}

fn default_location_weight() -> f64 { 40.0 }
fn default_interests_weight() -> f64 { 25.0 }
fn default_background_weight() -> f64 { 25.0 }
fn default_availability_weight() -> f64 { 5.0 }
fn default_frequency_weight() -> f64 { 2.5 }
fn default_timing_weight() -> f64 { 2.5 }

#[derive(Debug, Clone, Deserialize)]
pub struct InvitationSettings {
    #[serde(default = "default_link_base")]
    pub link_base: String,
    /// Longest an invite waits on the notifier
    #[serde(default = "default_notify_timeout_ms")]
    pub notify_timeout_ms: u64,
}

impl Default for InvitationSettings {
    fn default() -> Self {
        Self {
            link_base: default_link_base(),
            notify_timeout_ms: default_notify_timeout_ms(),
        }
    }
}

fn default_link_base() -> String { crate::core::invitations::DEFAULT_LINK_BASE.to_string() }
fn default_notify_timeout_ms() -> u64 { crate::core::invitations::DEFAULT_NOTIFY_TIMEOUT.as_millis() as u64 }

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
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with VMATCH)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., VMATCH__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("VMATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = apply_env_overrides(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("VMATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Apply well-known environment variables on top of the layered config.
/// `DATABASE_URL` wins over `database.url`; `VMATCH_APPWRITE__*` fill the
/// Appwrite section.
fn apply_env_overrides(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(database_url) = env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", database_url)?;
    }

    let appwrite_vars = [
        ("VMATCH_APPWRITE__ENDPOINT", "appwrite.endpoint"),
        ("VMATCH_APPWRITE__API_KEY", "appwrite.api_key"),
        ("VMATCH_APPWRITE__PROJECT_ID", "appwrite.project_id"),
        ("VMATCH_APPWRITE__DATABASE_ID", "appwrite.database_id"),
    ];
    for (var, key) in appwrite_vars {
        if let Ok(value) = env::var(var) {
            builder = builder.set_override(key, value)?;
        }
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{is_valid_sum, TextMatch};
    use std::io::Write;

    #[test]
    fn test_default_weights() {
        let weights = WeightsConfig::default();
        assert_eq!(weights.location, 40.0);
        assert_eq!(weights.interests, 25.0);
        assert_eq!(weights.background, 25.0);
        assert_eq!(weights.availability, 5.0);
        assert_eq!(weights.frequency, 2.5);
        assert_eq!(weights.timing, 2.5);
        assert!(is_valid_sum(&WeightConfig::from(&weights)));
    }

    #[test]
    fn test_default_logging() {
        let logging = LoggingSettings::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, "json");
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("vmatch-{}.toml", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[server]
host = "127.0.0.1"
port = 9000

[scoring.weights]
location = 60.0
interests = 20.0
background = 15.0
availability = 3.0
frequency = 1.0
timing = 1.0

[scoring.comparators]
location = "ignore_case"

[invitations]
link_base = "https://volunteer.example/requests"
"#
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.scoring.weights.location, 60.0);
        assert_eq!(settings.scoring.comparators.location, TextMatch::IgnoreCase);
        assert_eq!(settings.scoring.comparators.background, TextMatch::Contains);
        assert_eq!(settings.invitations.link_base, "https://volunteer.example/requests");
        assert_eq!(settings.invitations.notify_timeout_ms, 3000);
        assert!(settings.database.is_none());
        assert!(settings.appwrite.is_none());
        assert_eq!(settings.matching.default_limit, 50);
    }
}
