//! Application configuration.
//!
//! Supports loading from YAML files with environment variable overrides.
//! Command line flags are applied on top in `main.rs`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use avr_discovery_core::{HassConfig, MqttConfig, DEFAULT_HASS_PREFIX, DEFAULT_MQTT_PREFIX};
use serde::Deserialize;

/// Application configuration loaded from YAML with environment overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Receivers JSON file.
    /// Override: `DMQTT_FILE`
    pub file: PathBuf,

    /// MQTT broker host.
    /// Override: `DMQTT_HOST`
    pub host: String,

    /// MQTT broker port.
    /// Override: `DMQTT_PORT`
    pub port: u16,

    /// Override: `DMQTT_USER`
    pub username: String,

    /// Override: `DMQTT_PASSWORD`
    pub password: String,

    /// Prefix of receiver state/command topics.
    /// Override: `DMQTT_PREFIX`
    pub prefix: String,

    /// Home Assistant discovery prefix.
    /// Override: `DMQTT_HASS_PREFIX`
    pub hass_prefix: String,

    /// Output file for the universal media player config.
    /// Override: `DMQTT_HASS_OUTPUT`
    pub output: PathBuf,

    /// Name entities after the zone only.
    /// Override: `DMQTT_SHORT_NAMES`
    pub short_names: bool,

    /// Entity catalog JSON file.
    pub entities: PathBuf,

    /// Publish discovery payloads retained.
    pub retain: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mqtt = MqttConfig::default();
        Self {
            file: PathBuf::from("receivers.json"),
            host: mqtt.host,
            port: mqtt.port,
            username: mqtt.username,
            password: mqtt.password,
            prefix: DEFAULT_MQTT_PREFIX.to_string(),
            hass_prefix: DEFAULT_HASS_PREFIX.to_string(),
            output: PathBuf::from("media_player.yaml"),
            short_names: false,
            entities: PathBuf::from("hass-mqtt-config.json"),
            retain: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("DMQTT_FILE") {
            self.file = PathBuf::from(val);
        }
        if let Some(val) = var("DMQTT_HOST") {
            self.host = val;
        }
        if let Some(val) = var("DMQTT_PORT") {
            match val.parse() {
                Ok(port) => self.port = port,
                Err(_) => log::warn!("Ignoring invalid DMQTT_PORT: {}", val),
            }
        }
        if let Some(val) = var("DMQTT_USER") {
            self.username = val;
        }
        if let Some(val) = var("DMQTT_PASSWORD") {
            self.password = val;
        }
        if let Some(val) = var("DMQTT_PREFIX") {
            self.prefix = val;
        }
        if let Some(val) = var("DMQTT_HASS_PREFIX") {
            self.hass_prefix = val;
        }
        if let Some(val) = var("DMQTT_HASS_OUTPUT") {
            self.output = PathBuf::from(val);
        }
        if let Some(val) = var("DMQTT_SHORT_NAMES") {
            self.short_names = parse_flag(&val);
        }
    }

    /// Converts to the core broker settings.
    pub fn to_mqtt_config(&self) -> MqttConfig {
        MqttConfig {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            prefix: self.prefix.clone(),
            retain: self.retain,
        }
    }

    /// Converts to the core Home Assistant settings.
    pub fn to_hass_config(&self) -> HassConfig {
        HassConfig {
            prefix: self.hass_prefix.clone(),
            short_names: self.short_names,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_match_cli_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.file, PathBuf::from("receivers.json"));
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 1883);
        assert_eq!(config.username, "user");
        assert_eq!(config.password, "password");
        assert_eq!(config.prefix, "denon");
        assert_eq!(config.hass_prefix, "homeassistant");
        assert_eq!(config.output, PathBuf::from("media_player.yaml"));
        assert!(!config.short_names);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: AppConfig =
            serde_yaml::from_str("host: broker.lan\nport: 8883\nshort_names: true\n").unwrap();
        assert_eq!(config.host, "broker.lan");
        assert_eq!(config.port, 8883);
        assert!(config.short_names);
        assert_eq!(config.prefix, "denon");
        assert_eq!(config.output, PathBuf::from("media_player.yaml"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(Some(&dir.path().join("absent.yaml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port: not-a-number").unwrap();

        let err = AppConfig::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn environment_overrides_yaml_values() {
        let env: HashMap<&str, &str> = [
            ("DMQTT_HOST", "mqtt.example"),
            ("DMQTT_PORT", "1884"),
            ("DMQTT_USER", "ha"),
            ("DMQTT_PASSWORD", "secret"),
            ("DMQTT_PREFIX", "avr"),
            ("DMQTT_HASS_PREFIX", "hass"),
            ("DMQTT_HASS_OUTPUT", "/config/players.yaml"),
            ("DMQTT_FILE", "/config/receivers.json"),
            ("DMQTT_SHORT_NAMES", "true"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig {
            host: "from-yaml".into(),
            ..Default::default()
        };
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.host, "mqtt.example");
        assert_eq!(config.port, 1884);
        assert_eq!(config.username, "ha");
        assert_eq!(config.password, "secret");
        assert_eq!(config.prefix, "avr");
        assert_eq!(config.hass_prefix, "hass");
        assert_eq!(config.output, PathBuf::from("/config/players.yaml"));
        assert_eq!(config.file, PathBuf::from("/config/receivers.json"));
        assert!(config.short_names);
    }

    #[test]
    fn invalid_port_override_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| (key == "DMQTT_PORT").then(|| "many".to_string()));
        assert_eq!(config.port, 1883);
    }

    #[test]
    fn converts_to_core_config() {
        let config = AppConfig {
            prefix: "avr".into(),
            hass_prefix: "hass".into(),
            short_names: true,
            retain: true,
            ..Default::default()
        };

        let mqtt = config.to_mqtt_config();
        assert_eq!(mqtt.prefix, "avr");
        assert!(mqtt.retain);
        assert_eq!(mqtt.url(), "mqtt://localhost:1883");

        let hass = config.to_hass_config();
        assert_eq!(hass.prefix, "hass");
        assert!(hass.short_names);
    }
}
