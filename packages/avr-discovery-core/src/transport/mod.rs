//! Publish transport abstraction.
//!
//! The publishing engine only needs three things from a transport: publish a
//! text payload to a topic, report a terminal failure, and close. Keeping this
//! behind a trait lets the coordinator be tested without a broker.
//!
//! - `mqtt` - [`MqttTransport`], the `rumqttc`-backed implementation

use async_trait::async_trait;
use thiserror::Error;

pub mod mqtt;

pub use mqtt::MqttTransport;

/// Errors reported by a transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Could not establish the connection.
    #[error("Failed to connect: {0}")]
    Connect(String),

    /// The connection broke after it was established.
    #[error("Connection lost: {0}")]
    Connection(String),

    /// A publish request was rejected.
    #[error("Publish failed: {0}")]
    Publish(String),

    /// The connection could not be closed cleanly.
    #[error("Failed to close connection: {0}")]
    Close(String),
}

/// Convenient Result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// A connected message transport shared by all device publishers.
///
/// Implementations must allow concurrent `publish` calls from several tasks.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Publishes a payload to a topic.
    async fn publish(&self, topic: &str, payload: String) -> TransportResult<()>;

    /// Resolves with the terminal error if the connection breaks.
    ///
    /// Never resolves while the connection is healthy or after a clean close.
    async fn failed(&self) -> TransportError;

    /// Flushes pending publishes and disconnects.
    async fn close(&self) -> TransportResult<()>;
}
