//! Run coordination: one shared transport, one output file, N receivers.
//!
//! Ordering rules:
//!
//! 1. The output is truncated before any publisher is created. If that fails,
//!    nothing is published.
//! 2. All device publishers run concurrently on the current task. Zones of one
//!    receiver stay in order; blocks of different receivers may interleave.
//! 3. A terminal transport error aborts the run immediately, including one
//!    raised while the last publisher was finishing.
//! 4. Otherwise the transport is closed once every publisher has finished, and
//!    every receiver failure is reported.

use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;

use crate::catalog::EntityCatalog;
use crate::config::{HassConfig, MqttConfig};
use crate::error::{ReceiverFailure, RunError, RunResult};
use crate::events::{EventEmitter, PublishEvent};
use crate::model::Receiver;
use crate::publisher::{DevicePublisher, PublishContext};
use crate::sink::{ConfigSink, FileConfigSink};
use crate::transport::{MqttTransport, Transport};

/// Outcome of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub receivers: usize,
    pub zones: usize,
}

/// Drives device publishers over a shared transport and output sink.
pub struct RunCoordinator {
    mqtt_prefix: String,
    hass: HassConfig,
    catalog: Arc<EntityCatalog>,
    emitter: Arc<dyn EventEmitter>,
}

impl RunCoordinator {
    /// Creates a coordinator after checking the catalog against the media
    /// player bindings.
    pub fn new(
        mqtt_prefix: impl Into<String>,
        hass: HassConfig,
        catalog: EntityCatalog,
        emitter: Arc<dyn EventEmitter>,
    ) -> RunResult<Self> {
        catalog.validate()?;
        Ok(Self {
            mqtt_prefix: mqtt_prefix.into(),
            hass,
            catalog: Arc::new(catalog),
            emitter,
        })
    }

    /// Publishes every receiver over an already connected transport.
    pub async fn run(
        &self,
        receivers: Vec<Receiver>,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn ConfigSink>,
    ) -> RunResult<RunSummary> {
        if let Err(e) = sink.truncate().await {
            log::error!("[Coordinator] Cannot prepare {}: {}", sink.describe(), e);
            self.close_transport(transport.as_ref()).await.ok();
            return Err(RunError::Output(e));
        }
        self.emitter.emit(PublishEvent::OutputTruncated {
            path: sink.describe(),
        });

        let ctx = PublishContext {
            mqtt_prefix: self.mqtt_prefix.clone(),
            hass: self.hass.clone(),
            catalog: Arc::clone(&self.catalog),
            transport: Arc::clone(&transport),
            sink,
            emitter: Arc::clone(&self.emitter),
        };
        let publishers: Vec<_> = receivers
            .into_iter()
            .map(|receiver| DevicePublisher::new(receiver, ctx.clone()))
            .collect();

        let all = join_all(publishers.iter().map(|publisher| async move {
            (publisher.receiver().id.clone(), publisher.publish().await)
        }));

        let outcomes = tokio::select! {
            biased;
            err = transport.failed() => {
                log::error!("[Coordinator] Transport failed, aborting run: {}", err);
                return Err(RunError::Transport(err));
            }
            outcomes = all => outcomes,
        };

        // A failure raised while the last publisher was finishing.
        if let Some(err) = transport.failed().now_or_never() {
            log::error!("[Coordinator] Transport failed, aborting run: {}", err);
            return Err(RunError::Transport(err));
        }

        let mut zones = 0;
        let mut failures = Vec::new();
        for (receiver_id, outcome) in outcomes {
            match outcome {
                Ok(count) => zones += count,
                Err(error) => {
                    log::error!("[Coordinator] Receiver {} failed: {}", receiver_id, error);
                    failures.push(ReceiverFailure { receiver_id, error });
                }
            }
        }

        let closed = self.close_transport(transport.as_ref()).await;

        if !failures.is_empty() {
            return Err(RunError::Publish { failures });
        }
        closed?;

        log::info!(
            "[Coordinator] Published {} zone(s) for {} receiver(s)",
            zones,
            publishers.len()
        );
        Ok(RunSummary {
            receivers: publishers.len(),
            zones,
        })
    }

    async fn close_transport(&self, transport: &dyn Transport) -> RunResult<()> {
        match transport.close().await {
            Ok(()) => {
                self.emitter.emit(PublishEvent::Disconnected);
                Ok(())
            }
            Err(e) => {
                log::warn!("[Coordinator] Failed to close transport: {}", e);
                Err(RunError::Transport(e))
            }
        }
    }
}

/// Connects to the broker and publishes every receiver.
///
/// The catalog is validated before connecting, so a catalog that does not
/// match the media player config never reaches the broker.
pub async fn start(
    receivers: Vec<Receiver>,
    catalog: EntityCatalog,
    mqtt: &MqttConfig,
    hass: HassConfig,
    output: &Path,
    emitter: Arc<dyn EventEmitter>,
) -> RunResult<RunSummary> {
    let coordinator = RunCoordinator::new(mqtt.prefix.clone(), hass, catalog, Arc::clone(&emitter))?;

    let transport = MqttTransport::connect(mqtt).await?;
    emitter.emit(PublishEvent::Connected {
        host: mqtt.host.clone(),
        port: mqtt.port,
    });

    coordinator
        .run(
            receivers,
            Arc::new(transport),
            Arc::new(FileConfigSink::new(output)),
        )
        .await
}
