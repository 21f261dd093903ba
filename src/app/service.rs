//! Application service, the hexagonal core.
//!
//! [`Controller`] owns the encoder state machine, the light model, and the
//! bus sync layer.  It exposes a hardware-agnostic API: the caller samples
//! the pins, supplies the time, and passes an [`EventSink`]; everything else
//! flows through the [`BusTransport`] port held by [`BusSync`].
//!
//! ```text
//!  PinLevels ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                │        Controller        │
//!                │ Encoder · Light · BusSync│ ◀─▶ BusTransport
//!                └──────────────────────────┘
//! ```
//!
//! Each tick runs in a fixed order: decode input and publish what it
//! changed, service the bus, then flush any batched temperature change.

use log::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::drivers::encoder::{EncoderInput, PinLevels};
use crate::sync::{BusSync, ConnectionState, Inbound};

use super::commands::ControllerCommand;
use super::events::{AppEvent, LightEvent};
use super::light::LightState;
use super::ports::{BusTransport, ConfigError, EventSink};

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

pub struct Controller<T> {
    encoder: EncoderInput,
    light: LightState,
    bus: BusSync<T>,
    /// Connection state last reported to the sink.
    reported_connection: ConnectionState,
    tick_count: u64,
}

impl<T: BusTransport> Controller<T> {
    /// Build the controller.  `initial` is the first pin sample, used to
    /// seed edge detection.
    ///
    /// Does **not** connect; call [`start`](Self::start) next.
    pub fn new(
        config: &ControllerConfig,
        initial: PinLevels,
        bus: BusSync<T>,
    ) -> Result<Self, ConfigError> {
        let light = LightState::from_config(config)?;
        let encoder = EncoderInput::new(initial, config.double_press_timeout_ms);
        let reported_connection = bus.connection();
        Ok(Self {
            encoder,
            light,
            bus,
            reported_connection,
            tick_count: 0,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Report the initial state and open the bus session.
    ///
    /// A failed connect is not fatal; [`tick`](Self::tick) keeps retrying at
    /// the configured pace.
    pub fn start(&mut self, now_ms: u32, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Started {
            on: self.light.is_on(),
            color_temp: self.light.color_temp(),
        });
        info!(
            "Controller started: on={} color_temp={}",
            self.light.is_on(),
            self.light.color_temp()
        );
        match self.bus.connect(now_ms) {
            Ok(()) => info!("Controller: bus connected"),
            Err(e) => warn!("Controller: initial connect failed ({}), retrying from tick", e),
        }
        self.report_connection(sink);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one poll cycle with a fresh pin sample.
    pub fn tick(&mut self, levels: PinLevels, now_ms: u32, sink: &mut impl EventSink) {
        self.tick_count += 1;

        // 1. Input
        let events = self.encoder.update(levels, now_ms);
        for event in events.iter() {
            sink.emit(&AppEvent::Input(event));
            self.handle_command(event.into(), now_ms, sink);
        }

        // 2. Bus
        // Errors are already logged and recovered inside the sync layer.
        if let Ok(Inbound::Applied {
            on,
            color_temp,
            changed,
        }) = self.bus.check(&mut self.light, now_ms)
        {
            sink.emit(&AppEvent::ExternalUpdate {
                on,
                color_temp,
                changed,
            });
        }
        self.report_connection(sink);

        // 3. Batched updates
        if let Some(event) = self.light.check_pending_updates(now_ms) {
            self.publish(event, now_ms, sink);
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply one command to the model and publish whatever it produced.
    pub fn handle_command(
        &mut self,
        cmd: ControllerCommand,
        now_ms: u32,
        sink: &mut impl EventSink,
    ) {
        let notification = match cmd {
            ControllerCommand::Adjust(direction) => self.light.adjust(direction, now_ms),
            ControllerCommand::TogglePower => self.light.toggle(now_ms),
            ControllerCommand::ToggleMode => Some(self.light.toggle_mode()),
        };
        if let Some(event) = notification {
            self.publish(event, now_ms, sink);
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn light(&self) -> &LightState {
        &self.light
    }

    pub fn bus(&self) -> &BusSync<T> {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut BusSync<T> {
        &mut self.bus
    }

    /// Total poll cycles executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ── Internal ──────────────────────────────────────────────

    fn publish(&mut self, event: LightEvent, now_ms: u32, sink: &mut impl EventSink) {
        let result = match &event {
            LightEvent::StateChanged { on, color_temp } => {
                self.bus.publish_state(*on, *color_temp, now_ms)
            }
            LightEvent::SceneSelected { name, .. } => self.bus.publish_scene(name, now_ms),
        };
        match result {
            Ok(()) => sink.emit(&AppEvent::Published(event)),
            Err(e) => {
                debug!("Controller: notification dropped ({})", e);
                sink.emit(&AppEvent::PublishDropped(event));
            }
        }
        self.report_connection(sink);
    }

    fn report_connection(&mut self, sink: &mut impl EventSink) {
        let current = self.bus.connection();
        if current != self.reported_connection {
            self.reported_connection = current;
            sink.emit(&AppEvent::Connection(current));
        }
    }
}
