//! Single-colour status LED driver.
//!
//! Shows bus connectivity: solid when connected, off when disconnected,
//! blinking while the connection is degraded.
//!
//! ## Dual-target design
//!
//! Generic over an `embedded-hal` output pin: an ESP-IDF `PinDriver` in
//! firmware, a recording fake in tests.  The logical state is tracked here,
//! so `toggle` does not need a stateful pin.

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::sync::ConnectionState;

/// Ticks per half-period of the degraded blink.
const BLINK_HALF_PERIOD_TICKS: u32 = 25;

pub struct StatusLed<P> {
    pin: P,
    lit: bool,
    blink_ticks: u32,
}

impl<P: OutputPin> StatusLed<P> {
    /// Take ownership of `pin` and drive it low.
    pub fn new(pin: P) -> Self {
        let mut led = Self {
            pin,
            lit: true,
            blink_ticks: 0,
        };
        led.off();
        led
    }

    pub fn on(&mut self) {
        self.set_state(true);
    }

    pub fn off(&mut self) {
        self.set_state(false);
    }

    pub fn toggle(&mut self) {
        self.set_state(!self.lit);
    }

    pub fn set_state(&mut self, lit: bool) {
        if lit == self.lit {
            return;
        }
        let result = if lit {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match result {
            Ok(()) => self.lit = lit,
            Err(e) => warn!("status_led: pin write failed: {:?}", e),
        }
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    /// Update the indicator once per poll tick.
    pub fn show(&mut self, connection: ConnectionState, degraded: bool) {
        if degraded {
            self.blink_ticks += 1;
            if self.blink_ticks >= BLINK_HALF_PERIOD_TICKS {
                self.blink_ticks = 0;
                self.toggle();
            }
            return;
        }
        self.blink_ticks = 0;
        self.set_state(connection == ConnectionState::Connected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;

    #[derive(Default)]
    struct RecordingPin {
        writes: Vec<bool>,
    }

    impl ErrorType for RecordingPin {
        type Error = Infallible;
    }

    impl OutputPin for RecordingPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.writes.push(false);
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Infallible> {
            self.writes.push(true);
            Ok(())
        }
    }

    #[test]
    fn starts_off() {
        let led = StatusLed::new(RecordingPin::default());
        assert!(!led.is_lit());
        assert_eq!(led.pin.writes, vec![false]);
    }

    #[test]
    fn toggle_flips_state() {
        let mut led = StatusLed::new(RecordingPin::default());
        led.toggle();
        assert!(led.is_lit());
        led.toggle();
        assert!(!led.is_lit());
    }

    #[test]
    fn redundant_writes_are_skipped() {
        let mut led = StatusLed::new(RecordingPin::default());
        led.on();
        led.on();
        assert_eq!(led.pin.writes, vec![false, true]);
    }

    #[test]
    fn follows_connection_state() {
        let mut led = StatusLed::new(RecordingPin::default());
        led.show(ConnectionState::Connected, false);
        assert!(led.is_lit());
        led.show(ConnectionState::Disconnected, false);
        assert!(!led.is_lit());
    }

    #[test]
    fn blinks_while_degraded() {
        let mut led = StatusLed::new(RecordingPin::default());
        for _ in 0..BLINK_HALF_PERIOD_TICKS {
            led.show(ConnectionState::Disconnected, true);
        }
        assert!(led.is_lit());
        for _ in 0..BLINK_HALF_PERIOD_TICKS {
            led.show(ConnectionState::Disconnected, true);
        }
        assert!(!led.is_lit());
    }
}
