//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one structured line per application
//! event to the logger (UART / USB-CDC in production, stderr on host).

use log::{info, warn};

use crate::app::events::{AppEvent, LightEvent};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn describe(event: &LightEvent) -> String {
    match event {
        LightEvent::StateChanged { on, color_temp } => format!(
            "state={} color_temp={}",
            if *on { "ON" } else { "OFF" },
            color_temp
        ),
        LightEvent::SceneSelected { index, name } => format!("scene[{}]={}", index, name),
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { on, color_temp } => {
                info!("START | on={} color_temp={}", on, color_temp);
            }
            AppEvent::Input(input) => {
                info!("INPUT | {:?}", input);
            }
            AppEvent::Published(light) => {
                info!("PUB   | {}", describe(light));
            }
            AppEvent::PublishDropped(light) => {
                warn!("DROP  | {}", describe(light));
            }
            AppEvent::ExternalUpdate {
                on,
                color_temp,
                changed,
            } => {
                info!(
                    "SYNC  | on={} color_temp={} changed={}",
                    on, color_temp, changed
                );
            }
            AppEvent::Connection(state) => {
                info!("BUS   | {:?}", state);
            }
        }
    }
}
