//! Intents the [`Controller`](super::service::Controller) applies to the
//! light model.
//!
//! Decoded encoder input maps one-to-one onto a command; keeping the mapping
//! here lets other inputs drive the same model later without touching the
//! encoder.

use super::events::{Direction, InputEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerCommand {
    /// One detent in the current mode (temperature step or scene step).
    Adjust(Direction),

    /// Flip power.
    TogglePower,

    /// Switch between temperature and scenes mode.
    ToggleMode,
}

impl From<InputEvent> for ControllerCommand {
    fn from(event: InputEvent) -> Self {
        match event {
            InputEvent::Rotate(direction) => Self::Adjust(direction),
            InputEvent::Press => Self::TogglePower,
            InputEvent::DoublePress => Self::ToggleMode,
        }
    }
}
