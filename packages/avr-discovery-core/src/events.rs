//! Publish lifecycle events and the emitter abstraction.
//!
//! Components report progress through an injected [`EventEmitter`] instead of
//! writing to a global logger, so callers decide where events go and tests
//! can capture them.

use serde::Serialize;

/// Progress of a publishing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PublishEvent {
    /// The transport is connected.
    #[serde(rename_all = "camelCase")]
    Connected { host: String, port: u16 },

    /// The output file was emptied.
    #[serde(rename_all = "camelCase")]
    OutputTruncated { path: String },

    /// A device publisher began working through a receiver's zones.
    #[serde(rename_all = "camelCase")]
    ReceiverStarted { receiver_id: String, zones: usize },

    /// A zone's discovery payload was handed to the transport.
    #[serde(rename_all = "camelCase")]
    DiscoveryPublished {
        topic: String,
        device_name: String,
        components: usize,
    },

    /// A zone's media player block was appended to the output file.
    #[serde(rename_all = "camelCase")]
    MediaPlayerWritten { device_id: String, bytes: usize },

    /// A receiver finished, successfully or not.
    #[serde(rename_all = "camelCase")]
    ReceiverFinished { receiver_id: String, ok: bool },

    /// The transport was closed.
    Disconnected,
}

/// Trait for reporting publish events without knowledge of the destination.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: PublishEvent);
}

/// Discards every event.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit(&self, _event: PublishEvent) {}
}

/// Forwards events to `tracing`.
///
/// Lifecycle milestones are logged at info, per-zone detail at debug.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit(&self, event: PublishEvent) {
        match &event {
            PublishEvent::Connected { host, port } => {
                tracing::info!(%host, port, "Connected to MQTT");
            }
            PublishEvent::ReceiverStarted { receiver_id, zones } => {
                tracing::info!(%receiver_id, zones, "Publishing configuration");
            }
            PublishEvent::ReceiverFinished { receiver_id, ok } => {
                if *ok {
                    tracing::info!(%receiver_id, "Receiver published");
                } else {
                    tracing::warn!(%receiver_id, "Receiver failed");
                }
            }
            PublishEvent::Disconnected => {
                tracing::info!("Disconnected from MQTT");
            }
            _ => {
                tracing::debug!(?event, "publish_event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingEmitter;

    #[test]
    fn recording_emitter_keeps_order() {
        let emitter = RecordingEmitter::default();
        emitter.emit(PublishEvent::ReceiverStarted {
            receiver_id: "avr".into(),
            zones: 2,
        });
        emitter.emit(PublishEvent::Disconnected);

        let events = emitter.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], PublishEvent::Disconnected);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(PublishEvent::MediaPlayerWritten {
            device_id: "avr_main_zone".into(),
            bytes: 10,
        })
        .unwrap();
        assert_eq!(json["type"], "mediaPlayerWritten");
        assert_eq!(json["deviceId"], "avr_main_zone");
    }

    #[test]
    fn builtin_emitters_accept_events() {
        NoopEventEmitter.emit(PublishEvent::Disconnected);
        LoggingEventEmitter.emit(PublishEvent::OutputTruncated {
            path: "media_player.yaml".into(),
        });
    }
}
