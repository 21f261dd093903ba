//! Application core: pure domain logic, zero I/O.
//!
//! The light model, the controller that drives it from encoder input, and
//! the events it reports.  All interaction with hardware and the network
//! happens through **port traits** defined in [`ports`], keeping this layer
//! fully testable without real peripherals or a broker.

pub mod commands;
pub mod events;
pub mod light;
pub mod ports;
pub mod service;
