//! Controller configuration parameters
//!
//! All tunable parameters for the light controller.
//! Values can be overridden via NVS (non-volatile storage); broker and Wi-Fi
//! credentials default from build-time environment variables.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Color temperature range and adjustment granularity (mireds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightConfig {
    pub min_temp: u16,
    pub max_temp: u16,
    /// Temperature applied at boot, before any remote state arrives.
    pub default_temp: u16,
    /// Mireds per encoder detent.
    pub step: u16,
}

/// MQTT topic names.  The device subscribes to `state` and publishes to the
/// other two, never to the topic it listens on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicConfig {
    pub state: String,
    pub set: String,
    pub scene_set: String,
}

/// Broker connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keepalive_secs: u16,
    /// Upper bound for any single blocking socket operation.
    pub io_timeout_ms: u32,
    /// Minimum spacing between reconnect attempts while disconnected.
    pub reconnect_interval_ms: u32,
    /// Consecutive failures after which connectivity is reported as degraded.
    pub degraded_after_failures: u32,
}

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub light: LightConfig,

    // --- Timing ---
    /// Maximum gap between two presses that still counts as a double press.
    pub double_press_timeout_ms: u32,
    /// Quiet period before a batched temperature change is published.
    pub batch_delay_ms: u32,
    /// Poll loop interval (milliseconds)
    pub poll_interval_ms: u32,

    // --- Bus ---
    pub topics: TopicConfig,
    pub broker: BrokerConfig,

    /// Ordered scene entity names selectable in scenes mode.
    pub scenes: Vec<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            light: LightConfig {
                min_temp: 200,
                max_temp: 454,
                default_temp: 370,
                step: 5,
            },

            // Timing
            double_press_timeout_ms: 400,
            batch_delay_ms: 100,
            poll_interval_ms: 10, // 100 Hz, fast enough to catch encoder edges

            topics: TopicConfig {
                state: "home/living_room_lamps/temp/state".into(),
                set: "home/living_room_lamps/temp/set".into(),
                scene_set: "home/living_room_lamps/scene/set".into(),
            },
            broker: BrokerConfig {
                host: option_env!("LIGHTSYNC_MQTT_HOST")
                    .unwrap_or("192.168.1.10")
                    .into(),
                port: 1883,
                username: option_env!("LIGHTSYNC_MQTT_USER").map(Into::into),
                password: option_env!("LIGHTSYNC_MQTT_PASSWORD").map(Into::into),
                keepalive_secs: 60,
                io_timeout_ms: 2000,
                reconnect_interval_ms: 5000,
                degraded_after_failures: 3,
            },

            scenes: vec![
                "scene.bright_day".into(),
                "scene.warm_evening".into(),
                "scene.warmest_night".into(),
                "scene.tv_time".into(),
            ],
        }
    }
}

impl ControllerConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let l = &self.light;
        if l.min_temp >= l.max_temp {
            return Err(ConfigError::ValidationFailed(
                "light.min_temp must be < light.max_temp",
            ));
        }
        if l.step == 0 {
            return Err(ConfigError::ValidationFailed("light.step must be > 0"));
        }
        if l.step > l.max_temp - l.min_temp {
            return Err(ConfigError::ValidationFailed(
                "light.step must not exceed the temperature range",
            ));
        }
        if !(l.min_temp..=l.max_temp).contains(&l.default_temp) {
            return Err(ConfigError::ValidationFailed(
                "light.default_temp must lie within min_temp..=max_temp",
            ));
        }
        if !(50..=2000).contains(&self.double_press_timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "double_press_timeout_ms must be 50–2000",
            ));
        }
        if self.batch_delay_ms > 5000 {
            return Err(ConfigError::ValidationFailed(
                "batch_delay_ms must be 0–5000",
            ));
        }
        if !(1..=50).contains(&self.poll_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "poll_interval_ms must be 1–50",
            ));
        }
        if self.scenes.is_empty() {
            return Err(ConfigError::ValidationFailed("scenes must not be empty"));
        }
        if self.scenes.iter().any(String::is_empty) {
            return Err(ConfigError::ValidationFailed("scene names must not be empty"));
        }

        let t = &self.topics;
        if t.state.is_empty() || t.set.is_empty() || t.scene_set.is_empty() {
            return Err(ConfigError::ValidationFailed("topic names must not be empty"));
        }
        if t.state == t.set || t.state == t.scene_set {
            return Err(ConfigError::ValidationFailed(
                "topics.state must differ from the publish topics",
            ));
        }
        if [&t.state, &t.set, &t.scene_set]
            .iter()
            .any(|topic| topic.contains(['+', '#']))
        {
            return Err(ConfigError::ValidationFailed(
                "topic names must not contain wildcards",
            ));
        }

        let b = &self.broker;
        if b.host.is_empty() {
            return Err(ConfigError::ValidationFailed("broker.host must not be empty"));
        }
        if b.port == 0 {
            return Err(ConfigError::ValidationFailed("broker.port must be > 0"));
        }
        if b.password.is_some() && b.username.is_none() {
            return Err(ConfigError::ValidationFailed(
                "broker.password requires broker.username",
            ));
        }
        if !(100..=30_000).contains(&b.io_timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "broker.io_timeout_ms must be 100–30000",
            ));
        }
        if b.degraded_after_failures == 0 {
            return Err(ConfigError::ValidationFailed(
                "broker.degraded_after_failures must be > 0",
            ));
        }
        Ok(())
    }
}
