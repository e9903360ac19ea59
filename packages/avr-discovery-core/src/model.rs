//! Receiver data model and receiver-list loading.
//!
//! A receiver file is a JSON array of [`Receiver`] records. Indexes may be
//! written either as strings (`"1"`) or as numbers (`1`); both forms are
//! accepted so files produced by older tooling keep working.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised while reading or validating the receiver list.
#[derive(Debug, Error)]
pub enum InputError {
    /// The receiver file could not be read.
    #[error("Failed to read receiver file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The receiver file is not a valid JSON array of receivers.
    #[error("Error parsing receiver file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A receiver has an empty `id`.
    #[error("Receiver '{0}' has an empty id")]
    EmptyReceiverId(String),

    /// Zone indexes are 1-based.
    #[error("Receiver '{0}' has a zone with index 0 (zone indexes start at 1)")]
    ZeroZoneIndex(String),

    /// Two zones of the same receiver share an index.
    #[error("Receiver '{receiver}' declares zone {index} more than once")]
    DuplicateZone { receiver: String, index: u32 },
}

/// Convenient Result alias for input loading.
pub type InputResult<T> = Result<T, InputError>;

// ─────────────────────────────────────────────────────────────────────────────
// Data Model
// ─────────────────────────────────────────────────────────────────────────────

/// A physical AV receiver with its sources and output zones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receiver {
    /// Human-readable receiver name (e.g. "Living Room AVR").
    pub name: String,
    /// Stable identifier used to derive every topic and entity id.
    pub id: String,
    /// Network address of the receiver. Carried through, never contacted.
    pub ip: String,
    /// Inputs the receiver can route to a zone.
    #[serde(default)]
    pub sources: Vec<Source>,
    /// Output zones, in publish order.
    #[serde(default)]
    pub zones: Vec<Zone>,
}

/// An input the receiver can route to a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(deserialize_with = "deserialize_index")]
    pub index: u32,
    pub display: String,
    /// Value used in automation templates and select options.
    pub code: String,
}

/// An independently controllable output of a receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// 1-based position. Zone 1 is the main zone.
    #[serde(deserialize_with = "deserialize_index")]
    pub index: u32,
    pub name: String,
    /// Source codes selectable in this zone, in display order.
    #[serde(default)]
    pub sources: Vec<String>,
}

impl Zone {
    /// Returns the topic/entity zone identifier for this zone.
    pub fn zone_id(&self) -> String {
        zone_id(self.index)
    }
}

/// Index of the main zone.
pub const MAIN_ZONE_INDEX: u32 = 1;

/// Zone identifier of the main zone.
pub const MAIN_ZONE_ID: &str = "main_zone";

/// Maps a 1-based zone index to its identifier.
///
/// `1` is `main_zone`, every other index `n` is `zone{n}`.
pub fn zone_id(index: u32) -> String {
    if index == MAIN_ZONE_INDEX {
        MAIN_ZONE_ID.to_string()
    } else {
        format!("zone{}", index)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Topics
// ─────────────────────────────────────────────────────────────────────────────

/// State topic for a zone: `{prefix}/{receiver_id}/{zone_id}/state`.
pub fn state_topic(prefix: &str, receiver_id: &str, zone_id: &str) -> String {
    format!("{}/{}/{}/state", prefix, receiver_id, zone_id)
}

/// Command topic for a zone: `{prefix}/{receiver_id}/{zone_id}/command`.
pub fn command_topic(prefix: &str, receiver_id: &str, zone_id: &str) -> String {
    format!("{}/{}/{}/command", prefix, receiver_id, zone_id)
}

/// Availability topic shared by every zone of a receiver (the main zone state topic).
pub fn availability_topic(prefix: &str, receiver_id: &str) -> String {
    state_topic(prefix, receiver_id, MAIN_ZONE_ID)
}

/// Device discovery topic: `{hass_prefix}/device/{device_id}/config`.
pub fn discovery_topic(hass_prefix: &str, device_id: &str) -> String {
    format!("{}/device/{}/config", hass_prefix, device_id)
}

// ─────────────────────────────────────────────────────────────────────────────
// Loading
// ─────────────────────────────────────────────────────────────────────────────

/// Reads and validates a receiver list from a JSON file.
pub async fn load_receivers(path: &Path) -> InputResult<Vec<Receiver>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| InputError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let receivers = parse_receivers(&content).map_err(|e| match e {
        ParseFailure::Json(source) => InputError::Parse {
            path: path.to_path_buf(),
            source,
        },
        ParseFailure::Invalid(err) => err,
    })?;

    log::info!(
        "[Input] Loaded {} receiver(s) from {}",
        receivers.len(),
        path.display()
    );
    Ok(receivers)
}

enum ParseFailure {
    Json(serde_json::Error),
    Invalid(InputError),
}

fn parse_receivers(content: &str) -> Result<Vec<Receiver>, ParseFailure> {
    let receivers: Vec<Receiver> = serde_json::from_str(content).map_err(ParseFailure::Json)?;
    validate_receivers(&receivers).map_err(ParseFailure::Invalid)?;
    Ok(receivers)
}

/// Checks structural rules that serde cannot express.
pub fn validate_receivers(receivers: &[Receiver]) -> InputResult<()> {
    let mut seen_ids = HashSet::new();

    for receiver in receivers {
        if receiver.id.trim().is_empty() {
            return Err(InputError::EmptyReceiverId(receiver.name.clone()));
        }

        if !seen_ids.insert(receiver.id.as_str()) {
            // Entity ids collide downstream, but the receiver list is caller-owned.
            log::warn!(
                "[Input] Receiver id '{}' appears more than once; entities will overwrite each other",
                receiver.id
            );
        }

        let mut zone_indexes = HashSet::new();
        for zone in &receiver.zones {
            if zone.index == 0 {
                return Err(InputError::ZeroZoneIndex(receiver.id.clone()));
            }
            if !zone_indexes.insert(zone.index) {
                return Err(InputError::DuplicateZone {
                    receiver: receiver.id.clone(),
                    index: zone.index,
                });
            }
        }
    }

    Ok(())
}

/// Accepts an index written as a JSON number or a numeric string.
fn deserialize_index<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    struct IndexVisitor;

    impl<'de> Visitor<'de> for IndexVisitor {
        type Value = u32;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a non-negative integer or a numeric string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u32, E> {
            u32::try_from(v).map_err(|_| E::custom(format!("index {} is out of range", v)))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u32, E> {
            u32::try_from(v).map_err(|_| E::custom(format!("index {} is out of range", v)))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u32, E> {
            v.trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid index '{}'", v)))
        }
    }

    deserializer.deserialize_any(IndexVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECEIVERS_JSON: &str = r#"[
        {
            "name": "AVR",
            "id": "avr_id",
            "ip": "192.168.1.34",
            "sources": [
                { "index": "1", "display": "DVD", "code": "DVD" },
                { "index": 2, "display": "CD", "code": "CD" }
            ],
            "zones": [
                { "index": "1", "name": "Main", "sources": ["DVD", "CD"] },
                { "index": 2, "name": "Zone2", "sources": ["CD"] }
            ]
        }
    ]"#;

    #[test]
    fn zone_id_maps_main_and_numbered_zones() {
        assert_eq!(zone_id(1), "main_zone");
        assert_eq!(zone_id(2), "zone2");
        assert_eq!(zone_id(3), "zone3");
        assert_eq!(zone_id(42), "zone42");
    }

    #[test]
    fn topics_follow_prefix_layout() {
        assert_eq!(
            state_topic("denon", "avr_id", "main_zone"),
            "denon/avr_id/main_zone/state"
        );
        assert_eq!(
            command_topic("denon", "avr_id", "zone2"),
            "denon/avr_id/zone2/command"
        );
        assert_eq!(
            availability_topic("denon", "avr_id"),
            "denon/avr_id/main_zone/state"
        );
        assert_eq!(
            discovery_topic("homeassistant", "avr_id_main_zone"),
            "homeassistant/device/avr_id_main_zone/config"
        );
    }

    #[test]
    fn parses_string_and_numeric_indexes() {
        let receivers = match parse_receivers(RECEIVERS_JSON) {
            Ok(r) => r,
            Err(_) => panic!("fixture should parse"),
        };
        assert_eq!(receivers.len(), 1);

        let avr = &receivers[0];
        assert_eq!(avr.sources[0].index, 1);
        assert_eq!(avr.sources[1].index, 2);
        assert_eq!(avr.zones[0].index, 1);
        assert_eq!(avr.zones[0].zone_id(), MAIN_ZONE_ID);
        assert_eq!(avr.zones[1].zone_id(), "zone2");
        assert_eq!(avr.zones[1].sources, vec!["CD".to_string()]);
    }

    #[test]
    fn rejects_zero_zone_index() {
        let json = r#"[{ "name": "AVR", "id": "avr", "ip": "", "zones": [
            { "index": 0, "name": "Main", "sources": [] }
        ]}]"#;
        assert!(matches!(
            parse_receivers(json),
            Err(ParseFailure::Invalid(InputError::ZeroZoneIndex(_)))
        ));
    }

    #[test]
    fn rejects_duplicate_zone_index() {
        let json = r#"[{ "name": "AVR", "id": "avr", "ip": "", "zones": [
            { "index": "2", "name": "A", "sources": [] },
            { "index": 2, "name": "B", "sources": [] }
        ]}]"#;
        assert!(matches!(
            parse_receivers(json),
            Err(ParseFailure::Invalid(InputError::DuplicateZone { index: 2, .. }))
        ));
    }

    #[test]
    fn rejects_empty_receiver_id() {
        let json = r#"[{ "name": "AVR", "id": "  ", "ip": "" }]"#;
        assert!(matches!(
            parse_receivers(json),
            Err(ParseFailure::Invalid(InputError::EmptyReceiverId(_)))
        ));
    }

    #[test]
    fn rejects_non_numeric_index() {
        let json = r#"[{ "name": "AVR", "id": "avr", "ip": "", "zones": [
            { "index": "main", "name": "Main", "sources": [] }
        ]}]"#;
        assert!(matches!(parse_receivers(json), Err(ParseFailure::Json(_))));
    }

    #[tokio::test]
    async fn load_receivers_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receivers.json");
        std::fs::write(&path, RECEIVERS_JSON).unwrap();

        let receivers = load_receivers(&path).await.unwrap();
        assert_eq!(receivers[0].id, "avr_id");
        assert_eq!(receivers[0].zones.len(), 2);
    }

    #[tokio::test]
    async fn load_receivers_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_receivers(&dir.path().join("missing.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, InputError::Read { .. }));
    }

    #[tokio::test]
    async fn load_receivers_reports_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receivers.json");
        std::fs::write(&path, r#"{ "not": "an array" }"#).unwrap();

        let err = load_receivers(&path).await.unwrap_err();
        assert!(matches!(err, InputError::Parse { .. }));
    }
}
