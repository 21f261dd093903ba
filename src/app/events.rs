//! Input events, model notifications, and outbound application events.
//!
//! [`InputEvent`]s come out of the encoder state machine, [`LightEvent`]s
//! come out of the light model and are what the bus publishes, and
//! [`AppEvent`]s are what the [`Controller`](super::service::Controller)
//! reports through the [`EventSink`](super::ports::EventSink) port.

use crate::sync::ConnectionState;

/// Rotation direction of one encoder detent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    /// `+1` for clockwise, `-1` for counter-clockwise.
    pub const fn sign(self) -> i32 {
        match self {
            Self::Clockwise => 1,
            Self::CounterClockwise => -1,
        }
    }
}

/// Discrete user input decoded from the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// One detent of rotation.
    Rotate(Direction),
    /// A lone press, confirmed once the double-press window closed.
    Press,
    /// Two presses inside the double-press window.
    DoublePress,
}

/// A change the light model wants published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LightEvent {
    /// Power and/or color temperature changed.
    StateChanged { on: bool, color_temp: u16 },
    /// A scene was selected.
    SceneSelected { index: usize, name: String },
}

/// Structured events emitted by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The controller started (carries the initial state).
    Started { on: bool, color_temp: u16 },

    /// An input event was decoded from the encoder.
    Input(InputEvent),

    /// A notification left the model and was handed to the bus.
    Published(LightEvent),

    /// A notification left the model but could not be sent.
    PublishDropped(LightEvent),

    /// A remote state update was applied (or matched current state).
    ExternalUpdate {
        on: bool,
        color_temp: u16,
        changed: bool,
    },

    /// The bus connection changed state.
    Connection(ConnectionState),
}
