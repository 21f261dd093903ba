//! lightsync firmware entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  GpioSampler    MqttTransport   LogEventSink   NvsConfigStore│
//! │  (InputSampler) (BusTransport)  (EventSink)    (ConfigPort)  │
//! │  MonotonicClock StatusLed       WiFi bring-up                │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ─────────────────────   │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │             Controller (pure logic)                    │  │
//! │  │  EncoderInput · LightState · BusSync                   │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{AnyIOPin, AnyOutputPin, PinDriver, Pull};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::reset::restart;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info, warn};

use lightsync::adapters::device_id;
use lightsync::adapters::log_sink::LogEventSink;
use lightsync::adapters::mqtt::{MqttSettings, MqttTransport};
use lightsync::adapters::nvs::NvsConfigStore;
use lightsync::adapters::time::MonotonicClock;
use lightsync::adapters::wifi::{self, WifiCredentials};
use lightsync::app::ports::{Clock, ConfigPort, InputSampler};
use lightsync::app::service::Controller;
use lightsync::config::ControllerConfig;
use lightsync::drivers::sampler::GpioSampler;
use lightsync::drivers::status_led::StatusLed;
use lightsync::pins;
use lightsync::sync::{BusSync, ReconnectPolicy, SyncContext};

/// Station join attempts before the device restarts.
const WIFI_ATTEMPTS: u32 = 3;

fn load_config() -> ControllerConfig {
    let loaded = NvsConfigStore::new().and_then(|store| store.load());
    match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Config load failed ({}), using defaults", e);
            ControllerConfig::default()
        }
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("lightsync v{}", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    // ── 2. Config from NVS (or defaults) ──────────────────────
    let config = load_config();

    // ── 3. Network ────────────────────────────────────────────
    let creds = match WifiCredentials::from_build_env() {
        Ok(c) => c,
        Err(e) => {
            error!("WiFi credentials unusable ({}), halting", e);
            loop {
                FreeRtos::delay_ms(1000);
            }
        }
    };
    // Held for the lifetime of the program; dropping it stops the driver.
    let _wifi = match wifi::bring_up(
        peripherals.modem,
        sysloop,
        nvs_partition,
        &creds,
        WIFI_ATTEMPTS,
    ) {
        Ok(w) => w,
        Err(e) => {
            error!("WiFi bring-up failed ({}), restarting", e);
            restart();
        }
    };

    // ── 4. GPIO ───────────────────────────────────────────────
    // SAFETY: each GPIO number is claimed exactly once, here, and none of
    // them is used by the modem or flash.
    let (clk, dt, sw, led_pin) = unsafe {
        (
            AnyIOPin::new(pins::ENCODER_CLK_GPIO),
            AnyIOPin::new(pins::ENCODER_DT_GPIO),
            AnyIOPin::new(pins::ENCODER_SW_GPIO),
            AnyOutputPin::new(pins::STATUS_LED_GPIO),
        )
    };
    let mut clk = PinDriver::input(clk)?;
    clk.set_pull(Pull::Up)?;
    let mut dt = PinDriver::input(dt)?;
    dt.set_pull(Pull::Up)?;
    let mut sw = PinDriver::input(sw)?;
    sw.set_pull(Pull::Up)?;

    let mut sampler = GpioSampler::new(clk, dt, sw);
    let mut led = StatusLed::new(PinDriver::output(led_pin)?);

    // ── 5. Bus + controller ───────────────────────────────────
    let client_id = device_id::client_id(&device_id::read_mac());
    info!("Client ID: {}", client_id);

    let transport = MqttTransport::new(MqttSettings::from(&config.broker));
    let bus = BusSync::new(
        transport,
        SyncContext {
            client_id,
            topics: config.topics.clone(),
        },
        ReconnectPolicy::from(&config.broker),
    );

    let clock = MonotonicClock::new();
    let mut sink = LogEventSink::new();
    let mut controller = Controller::new(&config, sampler.sample(), bus)?;
    controller.start(clock.now_ms(), &mut sink);

    info!("System ready. Entering poll loop.");

    // ── 6. Poll loop ──────────────────────────────────────────
    loop {
        let levels = sampler.sample();
        controller.tick(levels, clock.now_ms(), &mut sink);
        led.show(controller.bus().connection(), controller.bus().is_degraded());
        FreeRtos::delay_ms(config.poll_interval_ms);
    }
}
