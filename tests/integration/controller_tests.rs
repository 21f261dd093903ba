//! Integration tests for the encoder → light model → bus pipeline.
//!
//! Pin waveforms go in one end of the [`Controller`]; the assertions look at
//! what came out on the mock bus and what was reported to the sink.

use lightsync::app::events::{AppEvent, InputEvent, LightEvent};
use lightsync::app::light::LightMode;
use lightsync::app::service::Controller;
use lightsync::config::ControllerConfig;
use lightsync::drivers::encoder::PinLevels;
use lightsync::error::TransportError;
use lightsync::sync::ConnectionState;

use super::mock_bus::{MockBus, RecordingSink, SCENE_TOPIC, SET_TOPIC, bus_with, levels};

struct Rig {
    ctl: Controller<MockBus>,
    sink: RecordingSink,
    now: u32,
}

impl Rig {
    fn new(transport: MockBus) -> Self {
        Self::with_config(transport, ControllerConfig::default())
    }

    fn with_config(transport: MockBus, config: ControllerConfig) -> Self {
        let bus = bus_with(transport, &config);
        let mut ctl = Controller::new(&config, PinLevels::IDLE, bus).unwrap();
        let mut sink = RecordingSink::default();
        ctl.start(0, &mut sink);
        Self { ctl, sink, now: 0 }
    }

    fn tick_at(&mut self, now: u32, l: PinLevels) {
        self.now = now;
        self.ctl.tick(l, now, &mut self.sink);
    }

    /// Idle ticks every 10 ms up to and including `until`.
    fn idle_until(&mut self, until: u32) {
        let mut t = self.now + 10;
        while t <= until {
            self.tick_at(t, PinLevels::IDLE);
            t += 10;
        }
    }

    /// One detent: CLK falls at `at`, returns high 2 ms later.
    fn detent(&mut self, at: u32, clockwise: bool) {
        // Clockwise when DT differs from CLK at the falling edge.
        self.tick_at(at, levels(false, clockwise, true));
        self.tick_at(at + 2, PinLevels::IDLE);
    }

    /// Press and release the switch (release 20 ms later).
    fn press(&mut self, at: u32) {
        self.tick_at(at, levels(true, true, false));
        self.tick_at(at + 20, PinLevels::IDLE);
    }

    fn bus(&self) -> &MockBus {
        self.ctl.bus().transport()
    }

    fn bus_mut(&mut self) -> &mut MockBus {
        self.ctl.bus_mut().transport_mut()
    }
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn start_connects_and_subscribes() {
    let rig = Rig::new(MockBus::default());
    assert!(rig.ctl.bus().is_connected());
    assert_eq!(rig.bus().subscriptions, vec![super::mock_bus::STATE_TOPIC]);
    assert_eq!(
        rig.sink.events.last(),
        Some(&AppEvent::Connection(ConnectionState::Connected))
    );
    assert!(rig.bus().published.is_empty(), "boot must not publish");
}

// ── Batching ──────────────────────────────────────────────────

#[test]
fn ten_quick_detents_publish_once_with_cumulative_value() {
    let mut rig = Rig::new(MockBus::default());
    for i in 0..10 {
        rig.detent(i * 5, true);
    }
    assert!(rig.bus().published.is_empty(), "nothing before the quiet period");

    rig.idle_until(400);
    assert_eq!(
        rig.bus().published_to(SET_TOPIC),
        vec![r#"{"state":"ON","color_temp":420}"#]
    );
    assert_eq!(rig.ctl.light().color_temp(), 420);
}

#[test]
fn slow_detents_publish_each_step() {
    let mut rig = Rig::new(MockBus::default());
    rig.detent(0, true);
    rig.idle_until(200);
    rig.detent(210, true);
    rig.idle_until(400);
    assert_eq!(
        rig.bus().published_to(SET_TOPIC),
        vec![
            r#"{"state":"ON","color_temp":375}"#,
            r#"{"state":"ON","color_temp":380}"#,
        ]
    );
}

#[test]
fn forty_counter_clockwise_detents_reach_minimum() {
    let mut rig = Rig::new(MockBus::default());
    for i in 0..40 {
        rig.detent(i * 10, false);
    }
    rig.idle_until(800);
    assert_eq!(rig.ctl.light().color_temp(), 200);
    assert_eq!(
        rig.bus().published_to(SET_TOPIC).last(),
        Some(&r#"{"state":"ON","color_temp":200}"#)
    );
}

// ── Presses ───────────────────────────────────────────────────

#[test]
fn presses_100ms_apart_switch_mode() {
    let mut rig = Rig::new(MockBus::default());
    rig.press(1000);
    rig.press(1100);
    rig.idle_until(2000);

    let inputs: Vec<_> = rig
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Input(i) => Some(*i),
            _ => None,
        })
        .collect();
    assert_eq!(inputs, vec![InputEvent::DoublePress]);
    assert!(rig.ctl.light().is_on());
    assert_eq!(rig.ctl.light().mode(), LightMode::Scenes);
    assert_eq!(
        rig.bus().published_to(SCENE_TOPIC),
        vec![r#"{"scene":"scene.bright_day"}"#]
    );
}

#[test]
fn presses_500ms_apart_toggle_twice() {
    let mut rig = Rig::new(MockBus::default());
    rig.press(1000);
    rig.idle_until(1490);
    assert!(!rig.ctl.light().is_on());
    rig.press(1500);
    rig.idle_until(2500);

    assert!(rig.ctl.light().is_on());
    assert_eq!(
        rig.bus().published_to(SET_TOPIC),
        vec![
            r#"{"state":"OFF","color_temp":370}"#,
            r#"{"state":"ON","color_temp":370}"#,
        ]
    );
}

#[test]
fn scene_mode_rotation_publishes_immediately() {
    let mut rig = Rig::new(MockBus::default());
    rig.press(1000);
    rig.press(1100);
    rig.idle_until(1200);
    rig.detent(1210, false);

    assert_eq!(
        rig.bus().published_to(SCENE_TOPIC).last(),
        Some(&r#"{"scene":"scene.tv_time"}"#)
    );
    assert_eq!(rig.ctl.light().color_temp(), 370);
}

// ── Echo suppression ──────────────────────────────────────────

#[test]
fn echoed_publish_is_not_applied() {
    let mut rig = Rig::new(MockBus::echoing());
    rig.detent(0, true);
    rig.idle_until(500);

    assert_eq!(rig.bus().published_to(SET_TOPIC).len(), 1);
    assert!(rig.bus().inbox.is_empty(), "echo must have been consumed");
    assert_eq!(rig.sink.external_updates(), 0);
    assert!(
        !rig.sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::ExternalUpdate { .. })),
        "echo must not reach the model"
    );

    // The next message is someone else's change and is applied.
    rig.bus_mut().push_state(r#"{"state":"OFF","color_temp":300}"#);
    rig.idle_until(520);
    assert_eq!(rig.sink.external_updates(), 1);
    assert!(!rig.ctl.light().is_on());
    assert_eq!(rig.ctl.light().color_temp(), 300);
}

#[test]
fn remote_update_is_never_republished() {
    let mut rig = Rig::new(MockBus::default());
    rig.bus_mut().push_state(r#"{"state":"ON","color_temp":250}"#);
    rig.idle_until(500);

    assert_eq!(rig.ctl.light().color_temp(), 250);
    assert!(rig.bus().published.is_empty());
}

#[test]
fn noop_remote_update_changes_nothing() {
    let mut rig = Rig::new(MockBus::default());
    rig.bus_mut().push_state(r#"{"state":"ON","color_temp":370}"#);
    rig.idle_until(100);

    assert!(rig.sink.events.contains(&AppEvent::ExternalUpdate {
        on: true,
        color_temp: 370,
        changed: false
    }));
    assert_eq!(rig.sink.external_updates(), 0);
    assert!(rig.bus().published.is_empty());
}

#[test]
fn remote_update_cancels_pending_batch() {
    let mut rig = Rig::new(MockBus::default());
    rig.detent(0, true);
    rig.bus_mut().push_state(r#"{"state":"ON","color_temp":300}"#);
    rig.idle_until(500);

    assert_eq!(rig.ctl.light().color_temp(), 300);
    assert!(rig.bus().published.is_empty());
}

// ── Connectivity ──────────────────────────────────────────────

#[test]
fn transport_failure_reconnects_and_reports() {
    let mut rig = Rig::new(MockBus::default());
    rig.sink.clear();
    rig.bus_mut().poll_error = Some(TransportError::ConnectionLost);
    rig.idle_until(10);

    assert!(rig.ctl.bus().is_connected());
    assert_eq!(rig.bus().connects, 2);
    assert_eq!(rig.bus().subscriptions.len(), 2);
}

#[test]
fn publishes_while_offline_are_dropped_not_queued() {
    let mut bus = MockBus::default();
    bus.connect_errors.extend([TransportError::ConnectFailed; 2]);
    let mut rig = Rig::new(bus);
    assert!(!rig.ctl.bus().is_connected());

    rig.press(100);
    rig.idle_until(600);
    assert!(
        rig.sink
            .events
            .contains(&AppEvent::PublishDropped(LightEvent::StateChanged {
                on: false,
                color_temp: 370
            }))
    );

    // Second attempt at the 5 s pacing boundary fails, the third succeeds.
    rig.idle_until(10_000);
    assert!(rig.ctl.bus().is_connected());
    assert_eq!(rig.bus().connects, 3);
    assert!(rig.bus().published.is_empty());
    assert_eq!(
        rig.sink.events.last(),
        Some(&AppEvent::Connection(ConnectionState::Connected))
    );
}
