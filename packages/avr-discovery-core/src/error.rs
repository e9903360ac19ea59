//! Centralized error types for the publishing engine.
//!
//! Each module defines the errors of its own concern (`InputError`,
//! `CatalogError`, `TransportError`, `SinkError`); this module adds the
//! per-receiver [`PublishError`], the run-level [`RunError`], and the
//! [`ErrorCode`] trait that gives every error a stable machine-readable code.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::model::InputError;
use crate::sink::SinkError;
use crate::transport::TransportError;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code for logs and exit reporting.
    fn code(&self) -> &'static str;
}

impl ErrorCode for InputError {
    fn code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "receivers_unreadable",
            Self::Parse { .. } => "receivers_malformed",
            Self::EmptyReceiverId(_) => "receiver_id_empty",
            Self::ZeroZoneIndex(_) => "zone_index_zero",
            Self::DuplicateZone { .. } => "zone_index_duplicate",
        }
    }
}

impl ErrorCode for CatalogError {
    fn code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "catalog_unreadable",
            Self::Parse(_) => "catalog_malformed",
            Self::DuplicateId(_) => "catalog_duplicate_id",
            Self::MissingBinding { .. } => "catalog_missing_binding",
        }
    }
}

impl ErrorCode for TransportError {
    fn code(&self) -> &'static str {
        match self {
            Self::Connect(_) => "transport_connect_failed",
            Self::Connection(_) => "transport_connection_lost",
            Self::Publish(_) => "transport_publish_failed",
            Self::Close(_) => "transport_close_failed",
        }
    }
}

impl ErrorCode for SinkError {
    fn code(&self) -> &'static str {
        match self {
            Self::Truncate { .. } => "output_truncate_failed",
            Self::Append { .. } => "output_append_failed",
        }
    }
}

/// A zone of one receiver could not be published.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The discovery payload could not be serialized.
    #[error("Failed to serialize discovery payload for {device_id}: {source}")]
    Serialize {
        device_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// The transport rejected the discovery payload.
    #[error("Failed to publish discovery payload for {device_id}: {source}")]
    Transport {
        device_id: String,
        #[source]
        source: TransportError,
    },

    /// The media player block could not be written.
    #[error("Failed to write media player config for {device_id}: {source}")]
    Sink {
        device_id: String,
        #[source]
        source: SinkError,
    },
}

impl ErrorCode for PublishError {
    fn code(&self) -> &'static str {
        match self {
            Self::Serialize { .. } => "payload_serialize_failed",
            Self::Transport { source, .. } => source.code(),
            Self::Sink { source, .. } => source.code(),
        }
    }
}

/// A receiver whose publisher failed, with the reason.
#[derive(Debug)]
pub struct ReceiverFailure {
    pub receiver_id: String,
    pub error: PublishError,
}

/// Errors that end a publishing run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The receiver list was rejected.
    #[error(transparent)]
    Input(#[from] InputError),

    /// The entity catalog was rejected.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The output file could not be prepared; nothing was published.
    #[error("Output file unavailable: {0}")]
    Output(#[source] SinkError),

    /// The transport failed to connect, broke mid-run, or failed to close.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// One or more receivers failed to publish.
    #[error("{} receiver(s) failed to publish: {}", .failures.len(), describe_failures(.failures))]
    Publish { failures: Vec<ReceiverFailure> },
}

impl ErrorCode for RunError {
    fn code(&self) -> &'static str {
        match self {
            Self::Input(e) => e.code(),
            Self::Catalog(e) => e.code(),
            Self::Output(e) => e.code(),
            Self::Transport(e) => e.code(),
            Self::Publish { .. } => "publish_failed",
        }
    }
}

fn describe_failures(failures: &[ReceiverFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.receiver_id, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

pub use crate::catalog::CatalogResult;
pub use crate::model::InputResult;
pub use crate::sink::SinkResult;
pub use crate::transport::TransportResult;

/// Result alias for a single receiver's publish.
pub type PublishResult<T> = Result<T, PublishError>;

/// Result alias for a whole run.
pub type RunResult<T> = Result<T, RunError>;
