//! Shared fixtures and in-memory collaborators for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::catalog::EntityCatalog;
use crate::events::{EventEmitter, PublishEvent};
use crate::model::{Receiver, Source, Zone};
use crate::sink::{ConfigSink, SinkError, SinkResult};
use crate::transport::{Transport, TransportError, TransportResult};

/// The catalog shipped with the repository.
pub const CATALOG_JSON: &str = include_str!("../../../hass-mqtt-config.json");

pub fn catalog() -> EntityCatalog {
    EntityCatalog::from_json_str(CATALOG_JSON).expect("shipped catalog parses")
}

/// Builds a receiver with DVD/CD sources and one zone per name (indexes 1..).
pub fn receiver(name: &str, id: &str, zones: &[&str]) -> Receiver {
    Receiver {
        name: name.to_string(),
        id: id.to_string(),
        ip: "192.168.1.100".to_string(),
        sources: vec![
            Source {
                index: 1,
                display: "DVD".into(),
                code: "DVD".into(),
            },
            Source {
                index: 2,
                display: "CD".into(),
                code: "CD".into(),
            },
        ],
        zones: zones
            .iter()
            .enumerate()
            .map(|(i, zone)| Zone {
                index: i as u32 + 1,
                name: zone.to_string(),
                sources: vec!["DVD".into(), "CD".into()],
            })
            .collect(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────────────────────────────────────

/// Records publishes in memory.
#[derive(Default)]
pub struct MockTransport {
    pub published: Mutex<Vec<(String, String)>>,
    /// Topics whose publish fails.
    pub fail_topics: Vec<String>,
    pub closed: AtomicBool,
    /// Breaks the connection right after this many successful publishes.
    pub break_after_publishes: Option<usize>,
    /// When set, `failed()` resolves once this is notified.
    pub(crate) terminal: Notify,
    pub(crate) terminal_armed: AtomicBool,
}

impl MockTransport {
    pub fn failing_on(topic: &str) -> Self {
        Self {
            fail_topics: vec![topic.to_string()],
            ..Default::default()
        }
    }

    /// Makes `failed()` resolve with a connection error.
    pub fn break_connection(&self) {
        self.terminal_armed.store(true, Ordering::SeqCst);
        self.terminal.notify_waiters();
    }

    pub fn topics(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(topic, _)| topic.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn publish(&self, topic: &str, payload: String) -> TransportResult<()> {
        if self.fail_topics.iter().any(|t| t == topic) {
            return Err(TransportError::Publish(format!("rejected {}", topic)));
        }
        let count = {
            let mut published = self.published.lock().unwrap();
            published.push((topic.to_string(), payload));
            published.len()
        };
        if self.break_after_publishes == Some(count) {
            self.break_connection();
        }
        Ok(())
    }

    async fn failed(&self) -> TransportError {
        loop {
            let notified = self.terminal.notified();
            if self.terminal_armed.load(Ordering::SeqCst) {
                return TransportError::Connection("broker went away".into());
            }
            notified.await;
        }
    }

    async fn close(&self) -> TransportResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sink
// ─────────────────────────────────────────────────────────────────────────────

/// Collects appended blocks in memory.
#[derive(Default)]
pub struct MemorySink {
    pub content: Mutex<String>,
    pub truncations: AtomicUsize,
    pub appends: AtomicUsize,
    pub fail_truncate: bool,
}

impl MemorySink {
    pub fn with_content(content: &str) -> Self {
        Self {
            content: Mutex::new(content.to_string()),
            ..Default::default()
        }
    }

    pub fn text(&self) -> String {
        self.content.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConfigSink for MemorySink {
    async fn truncate(&self) -> SinkResult<()> {
        if self.fail_truncate {
            return Err(SinkError::Truncate {
                path: "memory".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.truncations.fetch_add(1, Ordering::SeqCst);
        self.content.lock().unwrap().clear();
        Ok(())
    }

    async fn append(&self, block: &str) -> SinkResult<()> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        self.content.lock().unwrap().push_str(block);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// Keeps every emitted event.
#[derive(Default)]
pub struct RecordingEmitter {
    pub events: Mutex<Vec<PublishEvent>>,
}

impl RecordingEmitter {
    pub fn events(&self) -> Vec<PublishEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventEmitter for RecordingEmitter {
    fn emit(&self, event: PublishEvent) {
        self.events.lock().unwrap().push(event);
    }
}
