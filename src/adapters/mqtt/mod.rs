//! MQTT bus transport.
//!
//! On the device [`MqttTransport`] implements [`BusTransport`] on top of the
//! ESP-IDF MQTT client (`esp_idf_svc::mqtt::client::EspMqttClient`).  The
//! client runs its own task; its event callback copies each event into a
//! bounded channel, and the poll loop drains that channel without blocking.
//!
//! ## Connection model
//!
//! 1. `connect()` starts a fresh client (clean session) and waits up to
//!    `io_timeout` for `Connected`.
//! 2. `subscribe()` requests QoS 0 and waits for the matching `Subscribed`.
//!    Messages arriving meanwhile are queued in the [`Inbox`](inbox::Inbox).
//! 3. `poll_message()` never blocks.  A `Disconnected` event drops the
//!    session; the caller decides when to reconnect.
//!
//! Keep-alive and socket timeouts are enforced by the ESP-IDF client from
//! `keep_alive_interval` and `network_timeout`.

pub mod inbox;

use std::time::Duration;

use crate::config::BrokerConfig;

#[cfg(target_os = "espidf")]
pub use esp::MqttTransport;

/// Largest inbound payload accepted after reassembly.
pub const MAX_INBOUND_PAYLOAD: usize = 16 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keepalive: Duration,
    pub io_timeout: Duration,
}

impl MqttSettings {
    /// Broker URL in the form the ESP-IDF client expects.
    pub fn url(&self) -> String {
        format!("mqtt://{}:{}", self.host, self.port)
    }
}

impl From<&BrokerConfig> for MqttSettings {
    fn from(b: &BrokerConfig) -> Self {
        Self {
            host: b.host.clone(),
            port: b.port,
            username: b.username.clone(),
            password: b.password.clone(),
            keepalive: Duration::from_secs(u64::from(b.keepalive_secs)),
            io_timeout: Duration::from_millis(u64::from(b.io_timeout_ms)),
        }
    }
}

#[cfg(target_os = "espidf")]
mod esp {
    use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
    use std::time::Instant;

    use esp_idf_svc::mqtt::client::{
        Details, EspMqttClient, EventPayload, MqttClientConfiguration, QoS,
    };
    use esp_idf_svc::sys::EspError;
    use log::{debug, info, warn};

    use super::inbox::{Fragment, Inbox, SessionEvent};
    use super::{MAX_INBOUND_PAYLOAD, MqttSettings};
    use crate::app::ports::{BusTransport, InboundMessage};
    use crate::error::TransportError;

    /// Events buffered between the client task and the poll loop.
    const EVENT_QUEUE_DEPTH: usize = 32;

    /// Upper bound on events handled per `poll_message`.
    const MAX_EVENTS_PER_POLL: usize = 8;

    fn translate(payload: EventPayload<'_, EspError>) -> Option<SessionEvent> {
        match payload {
            EventPayload::Connected(_) => Some(SessionEvent::Connected),
            EventPayload::Disconnected => Some(SessionEvent::Disconnected),
            EventPayload::Subscribed(id) => Some(SessionEvent::Subscribed(id)),
            EventPayload::Received {
                topic,
                data,
                details,
                ..
            } => {
                let fragment = match details {
                    Details::Complete => Fragment::Complete,
                    Details::InitialChunk(c) => Fragment::First {
                        total: c.total_data_size,
                    },
                    Details::SubsequentChunk(c) => Fragment::Next {
                        offset: c.current_data_offset,
                        total: c.total_data_size,
                    },
                };
                Some(SessionEvent::Received {
                    topic: topic.map(str::to_owned),
                    data: data.to_vec(),
                    fragment,
                })
            }
            EventPayload::Error(e) => {
                warn!("mqtt: client error: {}", e);
                Some(SessionEvent::Error)
            }
            _ => None,
        }
    }

    pub struct MqttTransport {
        settings: MqttSettings,
        client: Option<EspMqttClient<'static>>,
        events: Option<Receiver<SessionEvent>>,
        inbox: Inbox,
    }

    impl MqttTransport {
        pub fn new(settings: MqttSettings) -> Self {
            Self {
                settings,
                client: None,
                events: None,
                inbox: Inbox::new(MAX_INBOUND_PAYLOAD),
            }
        }

        pub fn is_open(&self) -> bool {
            self.client.is_some()
        }

        /// Drop the session after an error and hand the error back.
        fn fail(&mut self, e: TransportError) -> TransportError {
            self.client = None;
            self.events = None;
            self.inbox.clear();
            e
        }

        /// Block (bounded by `io_timeout`) until `want` accepts a control event.
        fn await_event<F>(&mut self, mut want: F) -> Result<SessionEvent, TransportError>
        where
            F: FnMut(&SessionEvent) -> bool,
        {
            let deadline = Instant::now() + self.settings.io_timeout;
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                let Some(events) = self.events.as_ref() else {
                    return Err(TransportError::NotConnected);
                };
                match events.recv_timeout(remaining) {
                    Ok(event) => {
                        if let Some(event) = self.inbox.route(event) {
                            if want(&event) {
                                return Ok(event);
                            }
                            debug!("mqtt: {:?} while waiting", event);
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        return Err(self.fail(TransportError::Timeout));
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        return Err(self.fail(TransportError::ConnectionLost));
                    }
                }
            }
        }
    }

    impl BusTransport for MqttTransport {
        fn connect(&mut self, client_id: &str) -> Result<(), TransportError> {
            self.disconnect();

            let (tx, rx) = mpsc::sync_channel(EVENT_QUEUE_DEPTH);
            let conf = MqttClientConfiguration {
                client_id: Some(client_id),
                username: self.settings.username.as_deref(),
                password: self.settings.password.as_deref(),
                keep_alive_interval: Some(self.settings.keepalive),
                network_timeout: self.settings.io_timeout,
                ..Default::default()
            };
            let url = self.settings.url();
            let client = EspMqttClient::new_cb(&url, &conf, move |event| {
                if let Some(e) = translate(event.payload()) {
                    if tx.try_send(e).is_err() {
                        warn!("mqtt: event queue full, event dropped");
                    }
                }
            })
            .map_err(|e| {
                warn!("mqtt: cannot start client for {}: {}", url, e);
                TransportError::ConnectFailed
            })?;
            self.client = Some(client);
            self.events = Some(rx);

            match self.await_event(|e| {
                matches!(
                    e,
                    SessionEvent::Connected | SessionEvent::Disconnected | SessionEvent::Error
                )
            }) {
                Ok(SessionEvent::Connected) => {
                    info!("mqtt: session open to {}", url);
                    Ok(())
                }
                Ok(_) | Err(TransportError::ConnectionLost) => {
                    Err(self.fail(TransportError::ConnectFailed))
                }
                Err(e) => Err(e),
            }
        }

        fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
            let Some(client) = self.client.as_mut() else {
                return Err(TransportError::NotConnected);
            };
            let id = match client.subscribe(topic, QoS::AtMostOnce) {
                Ok(id) => id,
                Err(e) => {
                    warn!("mqtt: subscribe to {} failed: {}", topic, e);
                    return Err(self.fail(TransportError::SubscribeFailed));
                }
            };

            match self.await_event(|e| {
                matches!(e, SessionEvent::Subscribed(i) if *i == id)
                    || matches!(e, SessionEvent::Disconnected)
            })? {
                SessionEvent::Subscribed(_) => {
                    debug!("mqtt: subscribed to {}", topic);
                    Ok(())
                }
                _ => Err(self.fail(TransportError::ConnectionLost)),
            }
        }

        fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
            let Some(client) = self.client.as_mut() else {
                return Err(TransportError::NotConnected);
            };
            match client.publish(topic, QoS::AtMostOnce, false, payload) {
                Ok(_) => Ok(()),
                Err(e) => {
                    warn!("mqtt: publish to {} failed: {}", topic, e);
                    Err(self.fail(TransportError::Io))
                }
            }
        }

        fn poll_message(&mut self) -> Result<Option<InboundMessage>, TransportError> {
            for _ in 0..MAX_EVENTS_PER_POLL {
                let Some(events) = self.events.as_ref() else {
                    return Err(TransportError::NotConnected);
                };
                let event = match events.try_recv() {
                    Ok(event) => event,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        return Err(self.fail(TransportError::ConnectionLost));
                    }
                };
                match self.inbox.route(event) {
                    Some(SessionEvent::Disconnected) => {
                        warn!("mqtt: broker session lost");
                        return Err(self.fail(TransportError::ConnectionLost));
                    }
                    Some(other) => debug!("mqtt: unsolicited {:?}", other),
                    None => {}
                }
            }
            if self.client.is_none() {
                return Err(TransportError::NotConnected);
            }
            Ok(self.inbox.pop())
        }

        fn disconnect(&mut self) {
            if self.client.take().is_some() {
                debug!("mqtt: session closed");
            }
            self.events = None;
            self.inbox.clear();
        }
    }
}
