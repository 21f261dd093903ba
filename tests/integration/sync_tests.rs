//! Integration tests for [`BusSync`] against the mock transport: echo
//! suppression, inbound handling, and the reconnect / degraded policy.

use lightsync::app::light::LightState;
use lightsync::config::ControllerConfig;
use lightsync::error::{SyncError, TransportError};
use lightsync::sync::{BusSync, ConnectionState, Inbound};

use super::mock_bus::{MockBus, SCENE_TOPIC, bus_with};

fn connected() -> (BusSync<MockBus>, LightState) {
    let config = ControllerConfig::default();
    let mut bus = bus_with(MockBus::default(), &config);
    bus.connect(0).unwrap();
    (bus, LightState::from_config(&config).unwrap())
}

#[test]
fn scene_publish_also_suppresses_next_state_message() {
    let (mut bus, mut light) = connected();
    bus.publish_scene("scene.warm_evening", 0).unwrap();
    assert_eq!(
        bus.transport().published_to(SCENE_TOPIC),
        vec![r#"{"scene":"scene.warm_evening"}"#]
    );

    bus.transport_mut()
        .push_state(r#"{"state":"ON","color_temp":400}"#);
    assert_eq!(bus.check(&mut light, 1), Ok(Inbound::EchoSuppressed));
    assert_eq!(light.color_temp(), 370);
}

#[test]
fn one_message_per_check() {
    let (mut bus, mut light) = connected();
    bus.transport_mut()
        .push_state(r#"{"state":"ON","color_temp":300}"#);
    bus.transport_mut()
        .push_state(r#"{"state":"ON","color_temp":310}"#);

    bus.check(&mut light, 1).unwrap();
    assert_eq!(light.color_temp(), 300);
    assert_eq!(bus.transport().inbox.len(), 1);
    bus.check(&mut light, 2).unwrap();
    assert_eq!(light.color_temp(), 310);
    assert_eq!(bus.check(&mut light, 3), Ok(Inbound::Idle));
}

#[test]
fn malformed_message_is_dropped_and_next_is_applied() {
    let (mut bus, mut light) = connected();
    bus.transport_mut().push_state(r#"{"state":"MAYBE"}"#);
    bus.transport_mut().push_state(r#"{"state":"OFF"}"#);

    assert_eq!(bus.check(&mut light, 1), Ok(Inbound::Discarded));
    assert!(light.is_on());
    assert_eq!(
        bus.check(&mut light, 2),
        Ok(Inbound::Applied {
            on: false,
            color_temp: 370,
            changed: true
        })
    );
}

#[test]
fn malformed_echo_still_counts_as_the_echo() {
    let (mut bus, mut light) = connected();
    bus.publish_state(false, 370, 0).unwrap();
    bus.transport_mut().push_state("not json");
    assert_eq!(bus.check(&mut light, 1), Ok(Inbound::EchoSuppressed));
    assert!(!bus.is_ignoring_next());
}

#[test]
fn reconnect_clears_pending_echo() {
    let (mut bus, mut light) = connected();
    bus.publish_state(true, 380, 0).unwrap();
    assert!(bus.is_ignoring_next());

    bus.transport_mut().poll_error = Some(TransportError::Io);
    assert_eq!(
        bus.check(&mut light, 1),
        Err(SyncError::Transport(TransportError::Io))
    );
    assert!(bus.is_connected());
    assert!(!bus.is_ignoring_next());

    // First message on the fresh session is treated as real state.
    bus.transport_mut()
        .push_state(r#"{"state":"ON","color_temp":380}"#);
    assert!(matches!(
        bus.check(&mut light, 2),
        Ok(Inbound::Applied { changed: true, .. })
    ));
}

#[test]
fn failed_reconnect_leaves_bus_disconnected() {
    let (mut bus, mut light) = connected();
    bus.transport_mut().poll_error = Some(TransportError::ConnectionLost);
    bus.transport_mut()
        .connect_errors
        .push_back(TransportError::ConnectFailed);

    assert!(bus.check(&mut light, 100).is_err());
    assert_eq!(bus.connection(), ConnectionState::Disconnected);
    assert_eq!(bus.consecutive_failures(), 1);
    assert_eq!(bus.publish_state(true, 370, 101), Err(SyncError::NotConnected));
}

#[test]
fn degraded_after_configured_failures_and_recovers() {
    let mut config = ControllerConfig::default();
    config.broker.degraded_after_failures = 2;
    config.broker.reconnect_interval_ms = 1000;
    let mut transport = MockBus::default();
    transport
        .connect_errors
        .extend([TransportError::Timeout, TransportError::Timeout]);
    let mut bus = bus_with(transport, &config);
    let mut light = LightState::from_config(&config).unwrap();

    assert!(bus.connect(0).is_err());
    assert!(!bus.is_degraded());
    assert_eq!(bus.check(&mut light, 500), Err(SyncError::NotConnected));
    assert!(bus.check(&mut light, 1000).is_err());
    assert!(bus.is_degraded());

    assert_eq!(bus.check(&mut light, 2000), Ok(Inbound::Idle));
    assert!(!bus.is_degraded());
    assert_eq!(bus.transport().connects, 3);
}

#[test]
fn reconnect_pacing_survives_tick_wraparound() {
    let config = ControllerConfig::default();
    let mut transport = MockBus::default();
    transport.connect_errors.push_back(TransportError::ConnectFailed);
    let mut bus = bus_with(transport, &config);
    let mut light = LightState::from_config(&config).unwrap();

    let start = u32::MAX - 1000;
    assert!(bus.connect(start).is_err());
    assert_eq!(
        bus.check(&mut light, start.wrapping_add(4999)),
        Err(SyncError::NotConnected)
    );
    assert_eq!(bus.check(&mut light, start.wrapping_add(5000)), Ok(Inbound::Idle));
}
