//! Per-receiver discovery publishing.
//!
//! A [`DevicePublisher`] walks one receiver's zones in order. For each zone it
//! builds the discovery payload, publishes it, then appends the zone's media
//! player block to the shared output. Any failure stops the receiver at that
//! zone; earlier zones stay published.

use std::sync::Arc;

use crate::catalog::EntityCatalog;
use crate::config::HassConfig;
use crate::discovery::{DiscoveryPayload, ZoneContext};
use crate::error::{PublishError, PublishResult};
use crate::events::{EventEmitter, PublishEvent};
use crate::media_player::MediaPlayerBlock;
use crate::model::{self, Receiver, Zone};
use crate::sink::ConfigSink;
use crate::transport::Transport;

/// Collaborators shared by every device publisher in a run.
#[derive(Clone)]
pub struct PublishContext {
    /// Prefix of zone state/command topics.
    pub mqtt_prefix: String,
    pub hass: HassConfig,
    pub catalog: Arc<EntityCatalog>,
    pub transport: Arc<dyn Transport>,
    pub sink: Arc<dyn ConfigSink>,
    pub emitter: Arc<dyn EventEmitter>,
}

/// Publishes discovery and media player config for one receiver.
pub struct DevicePublisher {
    receiver: Receiver,
    ctx: PublishContext,
}

impl DevicePublisher {
    pub fn new(receiver: Receiver, ctx: PublishContext) -> Self {
        Self { receiver, ctx }
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    /// Builds the discovery payload for one of this receiver's zones.
    pub fn build_payload(&self, zone: &Zone) -> (ZoneContext, DiscoveryPayload) {
        let zone_ctx = ZoneContext::new(
            &self.receiver,
            zone,
            &self.ctx.mqtt_prefix,
            self.ctx.hass.short_names,
        );
        let payload = DiscoveryPayload::build(&zone_ctx, &self.ctx.catalog);
        (zone_ctx, payload)
    }

    /// Publishes every zone in order. Returns the number of zones published.
    pub async fn publish(&self) -> PublishResult<usize> {
        log::debug!(
            "[Publisher] Publishing configuration for {}",
            self.receiver.name
        );
        self.ctx.emitter.emit(PublishEvent::ReceiverStarted {
            receiver_id: self.receiver.id.clone(),
            zones: self.receiver.zones.len(),
        });

        let result = self.publish_zones().await;

        self.ctx.emitter.emit(PublishEvent::ReceiverFinished {
            receiver_id: self.receiver.id.clone(),
            ok: result.is_ok(),
        });
        result
    }

    async fn publish_zones(&self) -> PublishResult<usize> {
        for zone in &self.receiver.zones {
            self.publish_zone(zone).await?;
        }
        Ok(self.receiver.zones.len())
    }

    async fn publish_zone(&self, zone: &Zone) -> PublishResult<()> {
        let (zone_ctx, payload) = self.build_payload(zone);
        let device_id = zone_ctx.device_id.clone();

        let json = payload
            .to_json()
            .map_err(|source| PublishError::Serialize {
                device_id: device_id.clone(),
                source,
            })?;
        let topic = model::discovery_topic(&self.ctx.hass.prefix, &device_id);

        log::debug!(
            "[Publisher] Publishing discovery payload to topic {} for device {}",
            topic,
            zone_ctx.device_name
        );
        self.ctx
            .transport
            .publish(&topic, json)
            .await
            .map_err(|source| PublishError::Transport {
                device_id: device_id.clone(),
                source,
            })?;
        self.ctx.emitter.emit(PublishEvent::DiscoveryPublished {
            topic,
            device_name: zone_ctx.device_name.clone(),
            components: payload.cmps.len(),
        });

        log::debug!(
            "[Publisher] Writing media player configuration for {}",
            zone_ctx.device_name
        );
        let block =
            MediaPlayerBlock::new(&zone_ctx.comp_name, &device_id, &zone_ctx.zone_id).render();
        self.ctx
            .sink
            .append(&block)
            .await
            .map_err(|source| PublishError::Sink {
                device_id: device_id.clone(),
                source,
            })?;
        self.ctx.emitter.emit(PublishEvent::MediaPlayerWritten {
            device_id,
            bytes: block.len(),
        });

        Ok(())
    }
}
