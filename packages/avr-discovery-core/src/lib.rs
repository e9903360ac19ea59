//! AVR Discovery Core - Home Assistant discovery publishing for AV receivers.
//!
//! This crate turns a list of Denon-style receivers into Home Assistant MQTT
//! device discovery payloads (one per zone) and a matching set of `universal`
//! media player YAML blocks. It is used by the `denon-mqtt-ha` binary.
//!
//! # Architecture
//!
//! - [`model`]: Receiver, source and zone types, topic naming, input loading
//! - [`catalog`]: Entity templates grouped by Home Assistant component kind
//! - [`discovery`]: Per-zone discovery payload and entity field derivation
//! - [`media_player`]: Universal media player config block renderer
//! - [`publisher`]: Publishes every zone of one receiver
//! - [`coordinator`]: Runs all receivers over one transport and output file
//! - [`transport`]: Publish transport trait and the MQTT implementation
//! - [`sink`]: Output config file
//! - [`events`]: Domain events for progress reporting
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`Transport`](transport::Transport): Publishing payloads to topics
//! - [`ConfigSink`](sink::ConfigSink): Writing media player blocks
//! - [`EventEmitter`](events::EventEmitter): Emitting domain events

#![warn(clippy::all)]

pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod discovery;
pub mod error;
pub mod events;
pub mod media_player;
pub mod model;
pub mod publisher;
pub mod sink;
pub mod transport;

#[cfg(test)]
mod test_support;

// Re-export commonly used types at the crate root
pub use catalog::{EntityCatalog, EntityKind, EntityTemplate};
pub use config::{HassConfig, MqttConfig, DEFAULT_HASS_PREFIX, DEFAULT_MQTT_PREFIX};
pub use coordinator::{start, RunCoordinator, RunSummary};
pub use discovery::{DiscoveryPayload, ZoneContext};
pub use error::{ErrorCode, PublishError, ReceiverFailure, RunError, RunResult};
pub use events::{EventEmitter, LoggingEventEmitter, NoopEventEmitter, PublishEvent};
pub use media_player::{MediaPlayerBlock, MEDIA_PLAYER_BINDINGS};
pub use model::{load_receivers, Receiver, Source, Zone};
pub use publisher::{DevicePublisher, PublishContext};
pub use sink::{ConfigSink, FileConfigSink};
pub use transport::{MqttTransport, Transport, TransportError};
