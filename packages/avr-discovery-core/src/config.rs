//! Plain configuration values consumed by the publishing engine.
//!
//! Defaulting from the command line and environment happens in the binary;
//! the core only receives resolved values.

use serde::{Deserialize, Serialize};

/// Default MQTT topic prefix for receiver state/command topics.
pub const DEFAULT_MQTT_PREFIX: &str = "denon";

/// Default Home Assistant discovery prefix.
pub const DEFAULT_HASS_PREFIX: &str = "homeassistant";

/// Broker connection and topic settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Prefix of zone state/command topics.
    pub prefix: String,
    /// Publish discovery payloads with the retain flag.
    #[serde(default)]
    pub retain: bool,
}

impl MqttConfig {
    /// Broker URL for display, e.g. `mqtt://localhost:1883`.
    pub fn url(&self) -> String {
        format!("mqtt://{}:{}", self.host, self.port)
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            username: "user".to_string(),
            password: "password".to_string(),
            prefix: DEFAULT_MQTT_PREFIX.to_string(),
            retain: false,
        }
    }
}

/// Home Assistant discovery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HassConfig {
    /// Discovery topic prefix.
    pub prefix: String,
    /// Name entities after the zone only instead of `{receiver} {zone}`.
    #[serde(default)]
    pub short_names: bool,
}

impl Default for HassConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_HASS_PREFIX.to_string(),
            short_names: false,
        }
    }
}
