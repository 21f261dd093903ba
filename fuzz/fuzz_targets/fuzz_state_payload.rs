//! Fuzz target: inbound state documents.
//!
//! Whatever arrives on the state topic, decoding must not panic and an
//! accepted document must leave the light model in range.
//!
//! cargo fuzz run fuzz_state_payload

#![no_main]

use libfuzzer_sys::fuzz_target;
use lightsync::app::light::LightState;
use lightsync::config::ControllerConfig;
use lightsync::sync::payload::decode_state;

fuzz_target!(|data: &[u8]| {
    let Ok(report) = decode_state(data) else {
        return;
    };
    let config = ControllerConfig::default();
    let Ok(mut light) = LightState::from_config(&config) else {
        return;
    };
    let temp = report
        .color_temp
        .unwrap_or(i64::from(light.color_temp()));
    light.update_from_external(report.state.is_on(), temp);
    assert!((config.light.min_temp..=config.light.max_temp).contains(&light.color_temp()));
});
