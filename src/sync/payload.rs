//! JSON wire payloads.
//!
//! ```text
//! state  (in/out):  {"state": "ON" | "OFF", "color_temp": <int>}
//! scene  (out):     {"scene": "<entity name>"}
//! ```
//!
//! Inbound state documents may carry extra keys (brightness, color_mode, …)
//! which are ignored.  `color_temp` may be missing or `null`, e.g. while the
//! group is off; `state` is required.

use serde::{Deserialize, Serialize};

use crate::error::PayloadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PowerState {
    On,
    Off,
}

impl From<bool> for PowerState {
    fn from(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

impl PowerState {
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

#[derive(Serialize)]
struct StateCommand {
    state: PowerState,
    color_temp: u16,
}

#[derive(Serialize)]
struct SceneCommand<'a> {
    scene: &'a str,
}

/// A decoded inbound state document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StateReport {
    pub state: PowerState,
    /// Raw value; the model clamps it into range.
    #[serde(default)]
    pub color_temp: Option<i64>,
}

pub fn encode_state(on: bool, color_temp: u16) -> Result<Vec<u8>, PayloadError> {
    serde_json::to_vec(&StateCommand {
        state: on.into(),
        color_temp,
    })
    .map_err(|_| PayloadError::Encode)
}

pub fn encode_scene(name: &str) -> Result<Vec<u8>, PayloadError> {
    serde_json::to_vec(&SceneCommand { scene: name }).map_err(|_| PayloadError::Encode)
}

pub fn decode_state(bytes: &[u8]) -> Result<StateReport, PayloadError> {
    serde_json::from_slice(bytes).map_err(|_| PayloadError::Malformed)
}
