//! Unified error types for the light controller.
//!
//! Nothing here is fatal to the poll loop.  Transport errors drive the bus
//! connection state machine, payload errors discard a single inbound message,
//! and configuration errors are only raised at startup or when persisting.

use core::fmt;

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Failures reported by a [`BusTransport`](crate::app::ports::BusTransport).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The client could not be started or the broker did not accept the
    /// session in time.
    ConnectFailed,
    /// The broker rejected the subscription.
    SubscribeFailed,
    /// The client rejected a send.
    Io,
    /// A bounded I/O wait expired.
    Timeout,
    /// The peer closed the connection or stopped answering keep-alives.
    ConnectionLost,
    /// Operation requires an open session but none exists.
    NotConnected,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed => write!(f, "connect failed"),
            Self::SubscribeFailed => write!(f, "subscribe rejected"),
            Self::Io => write!(f, "send failed"),
            Self::Timeout => write!(f, "I/O timed out"),
            Self::ConnectionLost => write!(f, "connection lost"),
            Self::NotConnected => write!(f, "not connected"),
        }
    }
}

// ---------------------------------------------------------------------------
// Payload errors
// ---------------------------------------------------------------------------

/// Failures while encoding or decoding a wire payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadError {
    /// Inbound bytes are not a valid state document.
    Malformed,
    /// Outbound payload could not be serialised.
    Encode,
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed payload"),
            Self::Encode => write!(f, "payload encoding failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Bus sync errors
// ---------------------------------------------------------------------------

/// Errors surfaced by [`BusSync`](crate::sync::BusSync) to its caller.
///
/// By the time one of these is returned the sync layer has already logged it
/// and run its recovery step; callers only need it for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    /// The bus session is down; the message was dropped.
    NotConnected,
    /// The transport failed mid-operation.
    Transport(TransportError),
    /// An outbound payload could not be built.
    Payload(PayloadError),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "bus not connected"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Payload(e) => write!(f, "payload: {e}"),
        }
    }
}

impl From<TransportError> for SyncError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<PayloadError> for SyncError {
    fn from(e: PayloadError) -> Self {
        Self::Payload(e)
    }
}

impl std::error::Error for TransportError {}
impl std::error::Error for PayloadError {}
impl std::error::Error for SyncError {}
