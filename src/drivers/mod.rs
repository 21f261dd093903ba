//! Input decoding and GPIO drivers.

pub mod encoder;
pub mod sampler;
pub mod status_led;
