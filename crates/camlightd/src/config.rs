//! Configuration file parsing and structures.
//!
//! camlightd uses declarative TOML configuration: daemon-level sections
//! (logging, API) plus one optional section per integration. The
//! `[automation]` section only seeds the initial settings; the live values
//! are owned by the settings store and edited over the API.

use serde::Deserialize;
use std::path::Path;
use std::path::PathBuf;

use tracing_subscriber::filter::LevelFilter;

use crate::engine::AutomationSettings;

/// Top-level configuration structure
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub api: ApiConfig,

    /// Initial automation settings, until changed over the API.
    #[serde(default)]
    pub automation: AutomationSettings,

    #[serde(default)]
    pub integrations: IntegrationsConfig,
}

#[derive(
    Debug, Default, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,
}

fn default_listen() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8573
}

/// HTTP API configuration
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    /// Address to listen on
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_api_port(),
        }
    }
}

/// Integration configuration container
#[derive(Debug, Default, Deserialize)]
pub struct IntegrationsConfig {
    /// Key light fixtures controlled over their REST endpoint
    #[serde(default)]
    pub keylight: Option<KeyLightConfig>,

    /// Camera-activity source subscribed over MQTT
    #[serde(default)]
    pub camera_mqtt: Option<CameraMqttConfig>,
}

fn default_poll_interval() -> u64 {
    5
}

/// Configuration for the key light integration
#[derive(Debug, Clone, Deserialize)]
pub struct KeyLightConfig {
    /// Seconds between state polls of each fixture
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Fixtures to manage; there is no runtime discovery
    #[serde(default)]
    pub fixtures: Vec<FixtureConfig>,
}

fn default_true() -> bool {
    true
}

/// One statically configured light fixture
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureConfig {
    /// Stable identity used in logs, bookkeeping, and the API
    pub id: String,

    /// host:port of the fixture's REST endpoint
    pub endpoint: String,

    /// Whether this fixture participates in automation
    #[serde(default = "default_true")]
    pub managed: bool,
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "camlightd".to_string()
}

/// Configuration for the MQTT camera-activity source
#[derive(Debug, Clone, Deserialize)]
pub struct CameraMqttConfig {
    /// MQTT broker hostname or IP address
    pub broker: String,

    /// MQTT broker port
    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    /// MQTT client ID
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Topic carrying the camera-activity payload
    pub topic: String,

    /// JSON key holding the activity value; bare payloads need no key
    #[serde(default)]
    pub value_key: Option<String>,

    /// Optional username for authentication
    #[serde(default)]
    pub username: Option<String>,

    /// Optional password for authentication
    #[serde(default)]
    pub password: Option<String>,
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Err(e) = self.automation.validate() {
            return Err(ConfigError::Invalid(format!("automation: {}", e)));
        }

        if let Some(keylight) = &self.integrations.keylight {
            if keylight.poll_interval_secs == 0 {
                return Err(ConfigError::Invalid(
                    "integrations.keylight.poll_interval_secs must be at least 1".to_string(),
                ));
            }

            let mut seen = std::collections::HashSet::new();
            for fixture in &keylight.fixtures {
                if fixture.id.is_empty() || fixture.endpoint.is_empty() {
                    return Err(ConfigError::Invalid(
                        "fixtures need a non-empty id and endpoint".to_string(),
                    ));
                }
                if !seen.insert(fixture.id.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "duplicate fixture id '{}'",
                        fixture.id
                    )));
                }
            }
        }

        if let Some(camera) = &self.integrations.camera_mqtt {
            if camera.topic.is_empty() {
                return Err(ConfigError::Invalid(
                    "integrations.camera_mqtt.topic must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.api.port, default_api_port());
        assert!(config.automation.lights_on_with_camera);
        assert!(config.integrations.keylight.is_none());
        assert!(config.integrations.camera_mqtt.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [logging]
            level = "debug"

            [api]
            listen = "0.0.0.0"
            port = 9000

            [automation]
            lights_on_with_camera = true
            boost_brightness_on_camera = true
            boost_percent = 25

            [integrations.keylight]
            poll_interval_secs = 2

            [[integrations.keylight.fixtures]]
            id = "desk-left"
            endpoint = "192.168.1.40:9123"

            [[integrations.keylight.fixtures]]
            id = "desk-right"
            endpoint = "192.168.1.41:9123"
            managed = false

            [integrations.camera_mqtt]
            broker = "localhost"
            topic = "camlightd/camera"
            value_key = "active"
            username = "camlightd"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.automation.boost_percent, 25);

        let keylight = config.integrations.keylight.as_ref().unwrap();
        assert_eq!(keylight.poll_interval_secs, 2);
        assert_eq!(keylight.fixtures.len(), 2);
        assert!(keylight.fixtures[0].managed);
        assert!(!keylight.fixtures[1].managed);

        let camera = config.integrations.camera_mqtt.as_ref().unwrap();
        assert_eq!(camera.port, 1883);
        assert_eq!(camera.client_id, "camlightd");
        assert_eq!(camera.topic, "camlightd/camera");
    }

    #[test]
    fn test_validate_rejects_out_of_range_boost_percent() {
        let toml = r#"
            [automation]
            lights_on_with_camera = true
            boost_brightness_on_camera = true
            boost_percent = 130
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("boost_percent"));
    }

    #[test]
    fn test_validate_rejects_duplicate_fixture_ids() {
        let toml = r#"
            [integrations.keylight]

            [[integrations.keylight.fixtures]]
            id = "desk"
            endpoint = "192.168.1.40:9123"

            [[integrations.keylight.fixtures]]
            id = "desk"
            endpoint = "192.168.1.41:9123"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate fixture id"));
    }

    #[test]
    fn test_from_file_reads_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("camlightd.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"
            [logging]
            level = "warn"

            [integrations.camera_mqtt]
            broker = "localhost"
            topic = "webcam/in-use"
            "#
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert_eq!(
            config.integrations.camera_mqtt.unwrap().topic,
            "webcam/in-use"
        );
    }

    #[test]
    fn test_from_file_missing_file_error() {
        let result = Config::from_file("/nonexistent/camlightd.toml");
        assert!(matches!(result, Err(ConfigError::Io(_, _))));
    }
}
