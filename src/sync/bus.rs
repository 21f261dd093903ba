//! Bus synchronisation: publish local changes, apply remote state, and keep
//! the broker session alive.
//!
//! ## Echo suppression
//!
//! The device publishes to the set/scene topics and subscribes to the state
//! topic.  The broker (or a bridge behind it) mirrors every accepted command
//! back onto the state topic, so the first state message after a publish is
//! the device's own change coming back.  `ignore_next` swallows exactly that
//! one message.
//!
//! ## Connection lifecycle
//!
//! ```text
//!              connect + subscribe ok
//!  Disconnected ─────────────────────▶ Connected
//!       ▲                                  │
//!       └──────── check/publish error ─────┘  (+ one immediate reconnect)
//! ```
//!
//! While disconnected, [`BusSync::check`] makes at most one reconnect attempt
//! per `reconnect_interval_ms`.  Nothing is queued: a publish while
//! disconnected is dropped.

use log::{debug, info, warn};

use crate::app::light::LightState;
use crate::app::ports::{BusTransport, ticks_diff};
use crate::config::{BrokerConfig, TopicConfig};
use crate::error::{SyncError, TransportError};

use super::payload;

/// Broker client identifier, e.g. `lightsync-a1b2c3`.
pub type ClientId = heapless::String<32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Identity and routing handed to the sync layer at startup.
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub client_id: ClientId,
    pub topics: TopicConfig,
}

/// Reconnect pacing and degraded-state threshold.
///
/// `degraded_after_failures` counts failed connect attempts in a row.  The
/// transport error that triggers a reconnect is not itself a failure; a
/// successful connect resets the count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub interval_ms: u32,
    pub degraded_after_failures: u32,
}

impl From<&BrokerConfig> for ReconnectPolicy {
    fn from(b: &BrokerConfig) -> Self {
        Self {
            interval_ms: b.reconnect_interval_ms,
            degraded_after_failures: b.degraded_after_failures,
        }
    }
}

/// What one [`BusSync::check`] call did with inbound traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    /// Nothing was waiting.
    Idle,
    /// The expected echo of our own publish was discarded.
    EchoSuppressed,
    /// A remote state update reached the model.
    Applied {
        on: bool,
        color_temp: u16,
        changed: bool,
    },
    /// The message was malformed or on an unexpected topic.
    Discarded,
}

pub struct BusSync<T> {
    transport: T,
    ctx: SyncContext,
    policy: ReconnectPolicy,
    connection: ConnectionState,
    ignore_next: bool,
    consecutive_failures: u32,
    last_attempt_ms: Option<u32>,
}

impl<T: BusTransport> BusSync<T> {
    pub fn new(transport: T, ctx: SyncContext, policy: ReconnectPolicy) -> Self {
        Self {
            transport,
            ctx,
            policy,
            connection: ConnectionState::Disconnected,
            ignore_next: false,
            consecutive_failures: 0,
            last_attempt_ms: None,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    /// Connectivity has failed repeatedly; the caller decides what to do.
    pub fn is_degraded(&self) -> bool {
        self.consecutive_failures >= self.policy.degraded_after_failures
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Whether the next inbound message will be treated as our own echo.
    pub fn is_ignoring_next(&self) -> bool {
        self.ignore_next
    }

    pub fn client_id(&self) -> &str {
        self.ctx.client_id.as_str()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Open the session and subscribe to the state topic.
    pub fn connect(&mut self, now_ms: u32) -> Result<(), SyncError> {
        self.last_attempt_ms = Some(now_ms);
        self.transport.disconnect();

        let result = self
            .transport
            .connect(self.ctx.client_id.as_str())
            .and_then(|()| self.transport.subscribe(&self.ctx.topics.state));

        match result {
            Ok(()) => {
                self.connection = ConnectionState::Connected;
                self.consecutive_failures = 0;
                self.ignore_next = false;
                info!(
                    "bus: connected as {}, subscribed to {}",
                    self.ctx.client_id, self.ctx.topics.state
                );
                Ok(())
            }
            Err(e) => {
                self.transport.disconnect();
                self.connection = ConnectionState::Disconnected;
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                warn!(
                    "bus: connect failed ({}), {} consecutive failure(s)",
                    e, self.consecutive_failures
                );
                Err(e.into())
            }
        }
    }

    // ── Outbound ──────────────────────────────────────────────

    pub fn publish_state(&mut self, on: bool, color_temp: u16, now_ms: u32) -> Result<(), SyncError> {
        let body = payload::encode_state(on, color_temp)?;
        let topic = self.ctx.topics.set.clone();
        self.publish(&topic, &body, now_ms)
    }

    pub fn publish_scene(&mut self, name: &str, now_ms: u32) -> Result<(), SyncError> {
        let body = payload::encode_scene(name)?;
        let topic = self.ctx.topics.scene_set.clone();
        self.publish(&topic, &body, now_ms)
    }

    fn publish(&mut self, topic: &str, body: &[u8], now_ms: u32) -> Result<(), SyncError> {
        if !self.is_connected() {
            warn!("bus: not connected, dropping publish to {}", topic);
            return Err(SyncError::NotConnected);
        }

        self.ignore_next = true;
        match self.transport.publish(topic, body) {
            Ok(()) => {
                debug!("bus: published {} bytes to {}", body.len(), topic);
                Ok(())
            }
            Err(e) => {
                // Nothing went out, so no echo is coming.
                self.ignore_next = false;
                self.on_failure(e, now_ms);
                Err(e.into())
            }
        }
    }

    // ── Inbound ───────────────────────────────────────────────

    /// Service the session: handle at most one inbound message, or try to
    /// reconnect if the session is down and the reconnect interval elapsed.
    pub fn check(&mut self, light: &mut LightState, now_ms: u32) -> Result<Inbound, SyncError> {
        if !self.is_connected() {
            if self.reconnect_due(now_ms) {
                self.connect(now_ms)?;
            } else {
                return Err(SyncError::NotConnected);
            }
        }

        match self.transport.poll_message() {
            Ok(None) => Ok(Inbound::Idle),
            Ok(Some(msg)) => Ok(self.handle_message(&msg.topic, &msg.payload, light)),
            Err(e) => {
                self.on_failure(e, now_ms);
                Err(e.into())
            }
        }
    }

    fn handle_message(&mut self, topic: &str, body: &[u8], light: &mut LightState) -> Inbound {
        if topic != self.ctx.topics.state {
            debug!("bus: ignoring message on {}", topic);
            return Inbound::Discarded;
        }

        if self.ignore_next {
            self.ignore_next = false;
            debug!("bus: suppressed echo of own publish");
            return Inbound::EchoSuppressed;
        }

        let report = match payload::decode_state(body) {
            Ok(r) => r,
            Err(e) => {
                warn!(
                    "bus: {} on {}: {:?}",
                    e,
                    topic,
                    String::from_utf8_lossy(body)
                );
                return Inbound::Discarded;
            }
        };

        let on = report.state.is_on();
        let color_temp = report
            .color_temp
            .unwrap_or_else(|| i64::from(light.color_temp()));
        let changed = light.update_from_external(on, color_temp);
        if changed {
            info!(
                "bus: remote state applied -> on={} color_temp={}",
                light.is_on(),
                light.color_temp()
            );
        }
        Inbound::Applied {
            on: light.is_on(),
            color_temp: light.color_temp(),
            changed,
        }
    }

    // ── Internal ──────────────────────────────────────────────

    /// Drop to Disconnected and make exactly one reconnect attempt.
    fn on_failure(&mut self, error: TransportError, now_ms: u32) {
        warn!("bus: transport error ({}), reconnecting", error);
        self.connection = ConnectionState::Disconnected;
        if self.connect(now_ms).is_err() {
            warn!("bus: reconnect failed, staying disconnected");
        }
    }

    fn reconnect_due(&self, now_ms: u32) -> bool {
        self.last_attempt_ms
            .is_none_or(|last| ticks_diff(now_ms, last) >= self.policy.interval_ms)
    }
}
