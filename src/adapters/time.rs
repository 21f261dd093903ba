//! Monotonic millisecond clock.
//!
//! - **`target_os = "espidf"`**: `esp_timer_get_time()` (µs since boot),
//!   truncated to a wrapping `u32` millisecond counter.
//! - **`not(target_os = "espidf")`**: `std::time::Instant` for host tests
//!   and simulation.
//!
//! The `u32` reading wraps after ~49.7 days; consumers compare readings with
//! [`ticks_diff`](crate::app::ports::ticks_diff), never with `<`.

use crate::app::ports::Clock;

pub struct MonotonicClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot.
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        // SAFETY: esp_timer_get_time has no preconditions once the timer
        // service is running, which ESP-IDF guarantees before app_main.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since construction.
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u32 {
        // Truncation is the wrap.
        (self.uptime_us() / 1000) as u32
    }
}
