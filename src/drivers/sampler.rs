//! GPIO sampler for the encoder lines.
//!
//! Wraps three `embedded-hal` input pins (ESP-IDF `PinDriver`s in firmware,
//! fakes in tests) and implements [`InputSampler`].  A failed read is logged
//! and reported as high, which is the idle level with pull-ups, so a flaky
//! line can never fabricate an edge.

use embedded_hal::digital::InputPin;
use log::warn;

use crate::app::ports::InputSampler;
use crate::drivers::encoder::PinLevels;

pub struct GpioSampler<Clk, Dt, Sw> {
    clk: Clk,
    dt: Dt,
    sw: Sw,
}

impl<Clk, Dt, Sw> GpioSampler<Clk, Dt, Sw>
where
    Clk: InputPin,
    Dt: InputPin,
    Sw: InputPin,
{
    pub fn new(clk: Clk, dt: Dt, sw: Sw) -> Self {
        Self { clk, dt, sw }
    }

    fn read(pin: &mut impl InputPin, name: &str) -> bool {
        pin.is_high().unwrap_or_else(|e| {
            warn!("sampler: {} read failed: {:?}", name, e);
            true
        })
    }
}

impl<Clk, Dt, Sw> InputSampler for GpioSampler<Clk, Dt, Sw>
where
    Clk: InputPin,
    Dt: InputPin,
    Sw: InputPin,
{
    fn sample(&mut self) -> PinLevels {
        PinLevels {
            clk: Self::read(&mut self.clk, "CLK"),
            dt: Self::read(&mut self.dt, "DT"),
            sw: Self::read(&mut self.sw, "SW"),
        }
    }
}
