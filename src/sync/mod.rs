//! Bus synchronisation layer.
//!
//! - [`payload`]: JSON documents exchanged with the broker
//! - [`bus`]: connection lifecycle, publishing, and echo suppression

pub mod bus;
pub mod payload;

pub use bus::{BusSync, ClientId, ConnectionState, Inbound, ReconnectPolicy, SyncContext};
