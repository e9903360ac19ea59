//! MQTT transport on top of `rumqttc`.
//!
//! `rumqttc` splits a connection into an [`AsyncClient`] (request handle) and
//! an [`EventLoop`] that must be polled for anything to happen. The event loop
//! runs on its own task for the lifetime of the connection:
//!
//! - the first CONNACK (or connection error) completes [`MqttTransport::connect`]
//! - later connection errors are published on a `watch` channel and surface
//!   through [`Transport::failed`]; the caller decides what to do with them
//! - an outgoing DISCONNECT ends the task cleanly

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;

use super::{Transport, TransportError, TransportResult};
use crate::config::MqttConfig;

/// Capacity of the client request channel.
const REQUEST_CHANNEL_CAPACITY: usize = 32;

/// Keep-alive interval sent to the broker.
const KEEP_ALIVE_SECS: u64 = 30;

/// How long to wait for the broker's CONNACK.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Upper bound for a single packet. Discovery payloads for a zone with many
/// entities exceed the `rumqttc` default of 10 KiB.
const MAX_PACKET_SIZE: usize = 256 * 1024;

/// Prefix of the generated client id.
const CLIENT_ID_PREFIX: &str = "denon-mqtt-ha";

/// A connected MQTT session.
pub struct MqttTransport {
    client: AsyncClient,
    retain: bool,
    failure: watch::Receiver<Option<TransportError>>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl MqttTransport {
    /// Connects to the broker and waits for it to accept the session.
    pub async fn connect(config: &MqttConfig) -> TransportResult<Self> {
        let client_id = format!("{}-{}", CLIENT_ID_PREFIX, uuid::Uuid::new_v4().simple());

        let mut options = MqttOptions::new(client_id, config.host.clone(), config.port);
        options
            .set_credentials(config.username.clone(), config.password.clone())
            .set_keep_alive(Duration::from_secs(KEEP_ALIVE_SECS))
            .set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (failure_tx, failure_rx) = watch::channel(None);

        log::debug!("[MQTT] Connecting to {}", config.url());
        let driver = tokio::spawn(drive_event_loop(eventloop, ready_tx, failure_tx));

        let ready = tokio::time::timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS), ready_rx).await;
        let outcome = match ready {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(TransportError::Connect(
                "event loop stopped before the broker answered".into(),
            )),
            Err(_) => Err(TransportError::Connect(format!(
                "no answer from {} within {}s",
                config.url(),
                CONNECT_TIMEOUT_SECS
            ))),
        };

        if let Err(e) = outcome {
            driver.abort();
            return Err(e);
        }

        log::info!("[MQTT] Connected to {}", config.url());
        Ok(Self {
            client,
            retain: config.retain,
            failure: failure_rx,
            driver: Mutex::new(Some(driver)),
        })
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn publish(&self, topic: &str, payload: String) -> TransportResult<()> {
        self.client
            .publish(topic, QoS::AtMostOnce, self.retain, payload)
            .await
            .map_err(|e| TransportError::Publish(format!("{}: {}", topic, e)))
    }

    async fn failed(&self) -> TransportError {
        let mut rx = self.failure.clone();
        let failure = match rx.wait_for(Option::is_some).await {
            Ok(current) => current.clone(),
            Err(_) => None,
        };

        match failure {
            Some(err) => err,
            // Event loop ended cleanly; there is nothing left to fail.
            None => std::future::pending().await,
        }
    }

    async fn close(&self) -> TransportResult<()> {
        self.client
            .disconnect()
            .await
            .map_err(|e| TransportError::Close(e.to_string()))?;

        let driver = self.driver.lock().await.take();
        if let Some(driver) = driver {
            driver
                .await
                .map_err(|e| TransportError::Close(e.to_string()))?;
        }

        log::debug!("[MQTT] Disconnected");
        Ok(())
    }
}

/// Polls the event loop until the session ends.
async fn drive_event_loop(
    mut eventloop: EventLoop,
    ready: oneshot::Sender<TransportResult<()>>,
    failure: watch::Sender<Option<TransportError>>,
) {
    let mut ready = Some(ready);

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                let Some(tx) = ready.take() else {
                    continue;
                };
                if ack.code == ConnectReturnCode::Success {
                    let _ = tx.send(Ok(()));
                } else {
                    let _ = tx.send(Err(TransportError::Connect(format!(
                        "broker refused connection: {:?}",
                        ack.code
                    ))));
                    return;
                }
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                log::debug!("[MQTT] Disconnect sent, stopping event loop");
                return;
            }
            Ok(event) => {
                log::trace!("[MQTT] {:?}", event);
            }
            Err(e) => {
                match ready.take() {
                    Some(tx) => {
                        let _ = tx.send(Err(TransportError::Connect(e.to_string())));
                    }
                    None => {
                        log::error!("[MQTT] Connection error: {}", e);
                        let _ = failure.send(Some(TransportError::Connection(e.to_string())));
                    }
                }
                return;
            }
        }
    }
}
