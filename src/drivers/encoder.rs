//! Rotary encoder decoder with single/double press disambiguation.
//!
//! ## Hardware
//!
//! KY-040 style encoder: `CLK`, `DT`, and an active-low push switch `SW`, all
//! with pull-ups.  The main loop samples the three lines every tick and feeds
//! them to [`EncoderInput::update`].  There is no debounce beyond edge
//! detection, so the loop must sample at 100 Hz or faster.
//!
//! ## Decoding
//!
//! | Input                      | Condition                                 | Event         |
//! |----------------------------|-------------------------------------------|---------------|
//! | `CLK` falling edge         | `DT != CLK`                               | `Rotate(CW)`  |
//! | `CLK` falling edge         | `DT == CLK`                               | `Rotate(CCW)` |
//! | `SW` falling edge          | previous press within the window          | `DoublePress` |
//! | window expires             | exactly one press seen                    | `Press`       |

use log::debug;

use crate::app::events::{Direction, InputEvent};
use crate::app::ports::ticks_diff;

/// One sample of the encoder lines (`true` = high).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinLevels {
    pub clk: bool,
    pub dt: bool,
    pub sw: bool,
}

impl PinLevels {
    /// All lines high: encoder at rest with pull-ups, switch released.
    pub const IDLE: Self = Self {
        clk: true,
        dt: true,
        sw: true,
    };
}

/// Events decoded from one sample.  At most one of each kind per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncoderEvents {
    pub rotation: Option<Direction>,
    pub press: Option<InputEvent>,
}

impl EncoderEvents {
    pub fn is_empty(&self) -> bool {
        self.rotation.is_none() && self.press.is_none()
    }

    /// Rotation first, then the press-class event.
    pub fn iter(&self) -> impl Iterator<Item = InputEvent> {
        self.rotation
            .map(InputEvent::Rotate)
            .into_iter()
            .chain(self.press)
    }
}

/// Press disambiguation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PressState {
    Idle,
    /// A first press was seen at `since_ms`; a single press fires when the
    /// window elapses without a second one.
    AwaitingDoublePress { since_ms: u32 },
}

pub struct EncoderInput {
    last_clk: bool,
    last_sw: bool,
    press: PressState,
    last_press_ms: Option<u32>,
    double_press_timeout_ms: u32,
}

impl EncoderInput {
    /// `initial` seeds edge detection so a line already low at boot does not
    /// register as an edge.
    pub fn new(initial: PinLevels, double_press_timeout_ms: u32) -> Self {
        Self {
            last_clk: initial.clk,
            last_sw: initial.sw,
            press: PressState::Idle,
            last_press_ms: None,
            double_press_timeout_ms,
        }
    }

    /// Whether a first press is waiting for the double-press window to close.
    pub fn is_awaiting_second_press(&self) -> bool {
        matches!(self.press, PressState::AwaitingDoublePress { .. })
    }

    /// Call once per tick with the current line levels.
    pub fn update(&mut self, levels: PinLevels, now_ms: u32) -> EncoderEvents {
        let mut events = EncoderEvents::default();

        // Rotation: falling edge on CLK.
        if self.last_clk && !levels.clk {
            let direction = if levels.dt != levels.clk {
                Direction::Clockwise
            } else {
                Direction::CounterClockwise
            };
            events.rotation = Some(direction);
        }
        self.last_clk = levels.clk;

        // Expire a waiting first press before looking at new edges, so a
        // press landing just after the window does not overwrite it.
        if let PressState::AwaitingDoublePress { since_ms } = self.press {
            if ticks_diff(now_ms, since_ms) >= self.double_press_timeout_ms {
                self.press = PressState::Idle;
                events.press = Some(InputEvent::Press);
            }
        }

        // Press: falling edge on SW.
        if self.last_sw && !levels.sw {
            let within_window = self
                .last_press_ms
                .is_some_and(|last| ticks_diff(now_ms, last) < self.double_press_timeout_ms);

            if within_window {
                debug!("encoder: double press at {}ms", now_ms);
                self.press = PressState::Idle;
                events.press = Some(InputEvent::DoublePress);
            } else {
                self.press = PressState::AwaitingDoublePress { since_ms: now_ms };
            }
            self.last_press_ms = Some(now_ms);
        }
        self.last_sw = levels.sw;

        events
    }
}
