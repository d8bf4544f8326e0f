//! Link configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no file
//! at the default location) yields a subscriber for `XP-S76-Debug` on a
//! local broker.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::client::{ClientSettings, Endpoint};
use crate::session::ReconnectPolicy;
use crate::telemetry::DEFAULT_FIELD;
use crate::transport::mqtt::BrokerAddress;
use crate::transport::{ConnectOptions, Credentials, QoS};

/// Looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_PATH: &str = "pubsub-link.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LinkConfig {
    #[serde(default)]
    pub broker: BrokerSection,
    #[serde(default)]
    pub reconnect: ReconnectSection,
    #[serde(default)]
    pub consumer: ConsumerSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrokerSection {
    /// Broker URL: tcp://, mqtt://, ssl:// or mqtts://
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_topic")]
    pub topic: String,
    /// 0, 1 or 2
    #[serde(default)]
    pub qos: u8,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
    /// Environment variable containing username
    pub username_env: Option<String>,
    /// Environment variable containing password
    pub password_env: Option<String>,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            address: default_address(),
            topic: default_topic(),
            qos: 0,
            keep_alive_secs: default_keep_alive(),
            username_env: None,
            password_env: None,
        }
    }
}

fn default_address() -> String {
    "tcp://127.0.0.1:1883".to_string()
}

fn default_topic() -> String {
    "XP-S76-Debug".to_string()
}

fn default_keep_alive() -> u64 {
    60
}

/// Delay schedule between connect attempts; empty means retry at once
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReconnectSection {
    #[serde(default)]
    pub backoff_ms: Vec<u64>,
    #[serde(default)]
    pub sustained_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsumerSection {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Frame field printed by the consumer
    #[serde(default = "default_field")]
    pub field: String,
}

impl Default for ConsumerSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            field: default_field(),
        }
    }
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_field() -> String {
    DEFAULT_FIELD.to_string()
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LinkConfig {
    /// Load and validate configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: LinkConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else [`DEFAULT_CONFIG_PATH`] if it exists, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::load_from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker.topic.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "broker.topic must not be empty".to_string(),
            ));
        }
        BrokerAddress::parse(&self.broker.address)
            .map_err(|e| ConfigError::InvalidConfig(format!("broker.address: {e}")))?;
        self.qos()?;
        if self.consumer.field.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "consumer.field must not be empty".to_string(),
            ));
        }
        if self.consumer.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "consumer.poll_interval_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn qos(&self) -> Result<QoS, ConfigError> {
        QoS::try_from(self.broker.qos)
            .map_err(|e| ConfigError::InvalidConfig(format!("broker.qos: {e}")))
    }

    pub fn endpoint(&self) -> Result<Endpoint, ConfigError> {
        Ok(Endpoint::new(
            self.broker.address.clone(),
            self.broker.topic.clone(),
            self.qos()?,
        ))
    }

    /// Credentials from the environment, if configured
    ///
    /// A configured but unset username variable is an error; an unset
    /// password variable means an empty password.
    pub fn credentials(&self) -> Result<Option<Credentials>, ConfigError> {
        let Some(username_env) = &self.broker.username_env else {
            return Ok(None);
        };
        let username = Self::get_env_var_required(username_env)?;
        let password = Self::get_env_var_optional(self.broker.password_env.as_ref())
            .unwrap_or_default();
        Ok(Some(Credentials { username, password }))
    }

    pub fn connect_options(&self) -> Result<ConnectOptions, ConfigError> {
        Ok(ConnectOptions {
            keep_alive: Duration::from_secs(self.broker.keep_alive_secs),
            credentials: self.credentials()?,
            ..ConnectOptions::default()
        })
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(
            self.reconnect.backoff_ms.clone(),
            self.reconnect.sustained_delay_ms,
        )
    }

    pub fn client_settings(&self) -> Result<ClientSettings, ConfigError> {
        Ok(ClientSettings {
            connect: self.connect_options()?,
            reconnect: self.reconnect_policy(),
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.consumer.poll_interval_ms)
    }

    fn get_env_var_optional(env_var_name: Option<&String>) -> Option<String> {
        env_var_name.and_then(|name| std::env::var(name).ok())
    }

    fn get_env_var_required(env_var_name: &str) -> Result<String, ConfigError> {
        std::env::var(env_var_name)
            .map_err(|_| ConfigError::EnvVarNotFound(env_var_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: LinkConfig = toml::from_str("").unwrap();
        assert_eq!(config, LinkConfig::default());
        assert_eq!(config.broker.address, "tcp://127.0.0.1:1883");
        assert_eq!(config.broker.topic, "XP-S76-Debug");
        assert_eq!(config.consumer.field, "altitude_pilot");
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_config() {
        let toml_content = r#"
[broker]
address = "mqtts://broker.example.com"
topic = "sim/telemetry"
qos = 1
keep_alive_secs = 30

[reconnect]
backoff_ms = [100, 500]
sustained_delay_ms = 2000

[consumer]
poll_interval_ms = 250
field = "airspeed_kts"
"#;

        let config: LinkConfig = toml::from_str(toml_content).unwrap();
        assert!(config.validate().is_ok());

        let endpoint = config.endpoint().unwrap();
        assert_eq!(endpoint.topic, "sim/telemetry");
        assert_eq!(endpoint.qos, QoS::AtLeastOnce);

        let policy = config.reconnect_policy();
        assert_eq!(policy.delay_for(2), Duration::from_millis(500));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));

        let options = config.connect_options().unwrap();
        assert_eq!(options.keep_alive, Duration::from_secs(30));
        assert!(options.credentials.is_none());
    }

    #[test]
    fn test_invalid_qos_rejected() {
        let config: LinkConfig = toml::from_str("[broker]\nqos = 3\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_topic_rejected() {
        let config: LinkConfig = toml::from_str("[broker]\ntopic = \"\"\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let config: LinkConfig = toml::from_str("[consumer]\npoll_interval_ms = 0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("poll_interval_ms"));
    }

    #[test]
    fn test_bad_address_rejected() {
        let config: LinkConfig = toml::from_str("[broker]\naddress = \"http://x\"\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("broker.address"));
    }

    #[test]
    fn test_missing_username_variable() {
        let config: LinkConfig =
            toml::from_str("[broker]\nusername_env = \"PUBSUB_LINK_TEST_UNSET_USER\"\n").unwrap();
        assert!(matches!(
            config.credentials(),
            Err(ConfigError::EnvVarNotFound(ref name)) if name == "PUBSUB_LINK_TEST_UNSET_USER"
        ));
    }
}
