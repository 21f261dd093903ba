//! Port traits: the boundary between controller logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller (domain)
//! ```
//!
//! Driven adapters (clock, pin sampler, bus transport, event sinks, config
//! storage) implement these traits.  The
//! [`Controller`](super::service::Controller) and
//! [`BusSync`](crate::sync::BusSync) consume them via generics, so the core
//! never touches hardware or sockets directly.

use crate::config::ControllerConfig;
use crate::drivers::encoder::PinLevels;
use crate::error::TransportError;

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Wraparound-safe difference between two millisecond tick readings.
///
/// Valid as long as the real interval is shorter than `u32::MAX` ms (~49 days).
#[inline]
pub fn ticks_diff(later: u32, earlier: u32) -> u32 {
    later.wrapping_sub(earlier)
}

/// Monotonic millisecond time source.  Readings wrap at `u32::MAX`.
pub trait Clock {
    fn now_ms(&self) -> u32;

    fn diff_ms(&self, later: u32, earlier: u32) -> u32 {
        ticks_diff(later, earlier)
    }
}

// ───────────────────────────────────────────────────────────────
// Input port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Reads the three encoder lines once per tick.
pub trait InputSampler {
    fn sample(&mut self) -> PinLevels;
}

// ───────────────────────────────────────────────────────────────
// Bus transport port (driven adapter: domain ↔ message broker)
// ───────────────────────────────────────────────────────────────

/// One message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Publish/subscribe transport.
///
/// Every method must return within a bounded time; implementations enforce
/// their own I/O timeout.  Failures are reported, never retried internally.
pub trait BusTransport {
    /// Open a session identified by `client_id`.
    fn connect(&mut self, client_id: &str) -> Result<(), TransportError>;

    /// Subscribe to `topic` on the open session.
    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    /// Send `payload` to `topic` (fire and forget).
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError>;

    /// Return the next received message, or `None` if nothing is waiting.
    /// Never blocks waiting for traffic.
    fn poll_message(&mut self) -> Result<Option<InboundMessage>, TransportError>;

    /// Tear down the session.  Safe to call when already disconnected.
    fn disconnect(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The controller reports structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists controller configuration.
///
/// Implementations MUST call [`ControllerConfig::validate`] before
/// persisting.  Invalid ranges are rejected with
/// [`ConfigError::ValidationFailed`], not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`ControllerConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<ControllerConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError>;
}

/// Errors from [`ConfigPort`] operations and config validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
