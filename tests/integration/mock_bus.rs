//! Mock bus transport and event sink for integration tests.
//!
//! `MockBus` records every publish and serves inbound messages from a queue.
//! With `echo` enabled it behaves like the home-automation bridge: every
//! state command published to the set topic comes back on the state topic.

use std::collections::VecDeque;

use lightsync::app::events::{AppEvent, LightEvent};
use lightsync::app::ports::{BusTransport, EventSink, InboundMessage};
use lightsync::config::ControllerConfig;
use lightsync::drivers::encoder::PinLevels;
use lightsync::error::TransportError;
use lightsync::sync::{BusSync, ClientId, ReconnectPolicy, SyncContext};

pub const STATE_TOPIC: &str = "home/living_room_lamps/temp/state";
pub const SET_TOPIC: &str = "home/living_room_lamps/temp/set";
pub const SCENE_TOPIC: &str = "home/living_room_lamps/scene/set";

// ── MockBus ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockBus {
    pub echo: bool,
    pub inbox: VecDeque<InboundMessage>,
    pub published: Vec<(String, String)>,
    pub subscriptions: Vec<String>,
    pub connects: u32,
    /// Errors returned by the next `connect` calls, in order.
    pub connect_errors: VecDeque<TransportError>,
    /// Error returned by the next `poll_message` call.
    pub poll_error: Option<TransportError>,
    pub open: bool,
}

#[allow(dead_code)]
impl MockBus {
    pub fn echoing() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    pub fn push_state(&mut self, body: &str) {
        self.inbox.push_back(InboundMessage {
            topic: STATE_TOPIC.into(),
            payload: body.as_bytes().to_vec(),
        });
    }

    pub fn published_to(&self, topic: &str) -> Vec<&str> {
        self.published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, body)| body.as_str())
            .collect()
    }
}

impl BusTransport for MockBus {
    fn connect(&mut self, _client_id: &str) -> Result<(), TransportError> {
        self.connects += 1;
        if let Some(e) = self.connect_errors.pop_front() {
            return Err(e);
        }
        self.open = true;
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        self.subscriptions.push(topic.into());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::NotConnected);
        }
        let body = String::from_utf8_lossy(payload).into_owned();
        if self.echo && topic == SET_TOPIC {
            self.push_state(&body);
        }
        self.published.push((topic.into(), body));
        Ok(())
    }

    fn poll_message(&mut self) -> Result<Option<InboundMessage>, TransportError> {
        if let Some(e) = self.poll_error.take() {
            self.open = false;
            return Err(e);
        }
        Ok(self.inbox.pop_front())
    }

    fn disconnect(&mut self) {
        self.open = false;
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn published(&self) -> Vec<&LightEvent> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::Published(l) => Some(l),
                _ => None,
            })
            .collect()
    }

    pub fn external_updates(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::ExternalUpdate { changed: true, .. }))
            .count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Builders ──────────────────────────────────────────────────

pub fn bus_with(transport: MockBus, config: &ControllerConfig) -> BusSync<MockBus> {
    let mut client_id = ClientId::new();
    let _ = client_id.push_str("lightsync-test01");
    BusSync::new(
        transport,
        SyncContext {
            client_id,
            topics: config.topics.clone(),
        },
        ReconnectPolicy::from(&config.broker),
    )
}

/// Pin levels for one step of an encoder waveform.
#[allow(dead_code)]
pub fn levels(clk: bool, dt: bool, sw: bool) -> PinLevels {
    PinLevels { clk, dt, sw }
}
