//! denon-mqtt-ha - Home Assistant discovery publisher for AV receivers.
//!
//! Reads a receivers file, publishes one MQTT device discovery payload per
//! receiver zone, writes a `universal` media player block per zone to a YAML
//! file, then disconnects and exits.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use avr_discovery_core::{load_receivers, start, EntityCatalog, ErrorCode, LoggingEventEmitter};
use clap::Parser;

use crate::config::AppConfig;

/// Publishes Home Assistant MQTT discovery for Denon/Marantz receivers.
#[derive(Parser, Debug)]
#[command(name = "denon-mqtt-ha")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "DMQTT_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Receivers JSON file [default: receivers.json].
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// MQTT broker host [default: localhost].
    #[arg(short, long, value_name = "HOST")]
    mqtt: Option<String>,

    /// MQTT username [default: user].
    #[arg(short, long)]
    username: Option<String>,

    /// MQTT password [default: password].
    #[arg(short, long)]
    password: Option<String>,

    /// MQTT broker port [default: 1883].
    #[arg(long)]
    port: Option<u16>,

    /// Prefix of receiver state/command topics [default: denon].
    #[arg(long)]
    prefix: Option<String>,

    /// Home Assistant discovery prefix [default: homeassistant].
    #[arg(long, value_name = "PREFIX")]
    hass: Option<String>,

    /// Output file for the media player config [default: media_player.yaml].
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Name entities after the zone only.
    #[arg(long)]
    short_names: bool,

    /// Entity catalog JSON file [default: hass-mqtt-config.json].
    #[arg(long, value_name = "FILE")]
    entities: Option<PathBuf>,

    /// Publish discovery payloads with the retain flag.
    #[arg(long)]
    retain: bool,
}

impl Args {
    /// Applies command line overrides on top of file and environment values.
    fn apply_to(self, config: &mut AppConfig) {
        if let Some(file) = self.file {
            config.file = file;
        }
        if let Some(host) = self.mqtt {
            config.host = host;
        }
        if let Some(username) = self.username {
            config.username = username;
        }
        if let Some(password) = self.password {
            config.password = password;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(prefix) = self.prefix {
            config.prefix = prefix;
        }
        if let Some(hass) = self.hass {
            config.hass_prefix = hass;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(entities) = self.entities {
            config.entities = entities;
        }
        config.short_names |= self.short_names;
        config.retain |= self.retain;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::args_os().len() <= 1 && std::env::var_os("DMQTT_HOST").is_none() {
        anyhow::bail!("Must set DMQTT_HOST environment variable or provide command line parameters");
    }

    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("denon-mqtt-ha v{}", env!("CARGO_PKG_VERSION"));

    let mut config =
        AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply_to(&mut config);

    log::info!(
        "Configuration: receivers={}, broker={}:{}, hass_prefix={}, output={}",
        config.file.display(),
        config.host,
        config.port,
        config.hass_prefix,
        config.output.display()
    );

    let receivers = load_receivers(&config.file)
        .await
        .with_context(|| format!("Failed to load receivers from {}", config.file.display()))?;
    let catalog = EntityCatalog::load(&config.entities)
        .await
        .with_context(|| format!("Failed to load entities from {}", config.entities.display()))?;

    log::info!(
        "Loaded {} receiver(s) and {} entity template(s)",
        receivers.len(),
        catalog.len()
    );

    let summary = start(
        receivers,
        catalog,
        &config.to_mqtt_config(),
        config.to_hass_config(),
        &config.output,
        Arc::new(LoggingEventEmitter),
    )
    .await
    .map_err(|e| {
        log::error!("Run failed [{}]", e.code());
        e
    })
    .context("Failed to publish receiver configuration")?;

    log::info!(
        "Published {} zone(s) for {} receiver(s); media player config written to {}",
        summary.zones,
        summary.receivers,
        config.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_config() {
        let args = Args::parse_from([
            "denon-mqtt-ha",
            "-m",
            "broker.lan",
            "--port",
            "8883",
            "--hass",
            "ha",
            "-o",
            "players.yaml",
            "--short-names",
        ]);

        let mut config = AppConfig {
            host: "from-file".into(),
            prefix: "from-file".into(),
            ..Default::default()
        };
        args.apply_to(&mut config);

        assert_eq!(config.host, "broker.lan");
        assert_eq!(config.port, 8883);
        assert_eq!(config.hass_prefix, "ha");
        assert_eq!(config.output, PathBuf::from("players.yaml"));
        assert!(config.short_names);
        // Untouched values keep the lower layer.
        assert_eq!(config.prefix, "from-file");
        assert!(!config.retain);
    }

    #[test]
    fn absent_bool_flags_keep_config_values() {
        let args = Args::parse_from(["denon-mqtt-ha"]);
        let mut config = AppConfig {
            short_names: true,
            ..Default::default()
        };
        args.apply_to(&mut config);
        assert!(config.short_names);
    }
}
