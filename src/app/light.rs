//! Light state model: power, color temperature, mode, and scene selection.
//!
//! The model never talks to the bus.  Operations that should reach the
//! outside world return a [`LightEvent`]; the caller publishes it.
//!
//! ## Notification policy
//!
//! | Operation            | Notification                                  |
//! |----------------------|-----------------------------------------------|
//! | `toggle`             | immediate (forced)                            |
//! | `toggle_mode`        | immediate (scene or state, per new mode)      |
//! | `adjust_scene`       | immediate                                     |
//! | `adjust_temp`        | batched until `batch_delay_ms` of quiet       |
//! | `update_from_external` | none (remote state is authoritative)        |
//!
//! A state notification equal to the last one sent is suppressed.

use log::debug;

use crate::app::events::{Direction, LightEvent};
use crate::app::ports::{ConfigError, ticks_diff};
use crate::config::ControllerConfig;

/// What the encoder currently adjusts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightMode {
    Temperature,
    Scenes,
}

pub struct LightState {
    on: bool,
    color_temp: u16,
    mode: LightMode,
    scene_index: usize,

    min_temp: u16,
    max_temp: u16,
    step: u16,
    scenes: Vec<String>,

    // Batching
    batch_delay_ms: u32,
    last_notified: (bool, u16),
    pending: bool,
    last_change_ms: u32,
}

impl LightState {
    /// Build the model from a validated configuration.
    pub fn from_config(config: &ControllerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let l = &config.light;
        Ok(Self {
            on: true,
            color_temp: l.default_temp,
            mode: LightMode::Temperature,
            scene_index: 0,
            min_temp: l.min_temp,
            max_temp: l.max_temp,
            step: l.step,
            scenes: config.scenes.clone(),
            batch_delay_ms: config.batch_delay_ms,
            last_notified: (true, l.default_temp),
            pending: false,
            last_change_ms: 0,
        })
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn color_temp(&self) -> u16 {
        self.color_temp
    }

    pub fn mode(&self) -> LightMode {
        self.mode
    }

    pub fn scene_index(&self) -> usize {
        self.scene_index
    }

    pub fn current_scene(&self) -> &str {
        &self.scenes[self.scene_index]
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    /// Whether a batched temperature change is waiting to be flushed.
    pub fn has_pending(&self) -> bool {
        self.pending
    }

    /// The `(on, color_temp)` pair most recently handed to the bus.
    pub fn last_notified(&self) -> (bool, u16) {
        self.last_notified
    }

    // ── User operations ───────────────────────────────────────

    /// Flip power.  Always published immediately.
    pub fn toggle(&mut self, now_ms: u32) -> Option<LightEvent> {
        self.on = !self.on;
        self.last_change_ms = now_ms;
        self.notify_now()
    }

    /// Switch between temperature and scenes mode.
    ///
    /// Entering scenes re-announces the selected scene; entering temperature
    /// re-announces the current state so the group leaves the scene.
    pub fn toggle_mode(&mut self) -> LightEvent {
        match self.mode {
            LightMode::Temperature => {
                self.mode = LightMode::Scenes;
                debug!("light: mode -> scenes");
                self.scene_event()
            }
            LightMode::Scenes => {
                self.mode = LightMode::Temperature;
                debug!("light: mode -> temperature");
                self.last_notified = (self.on, self.color_temp);
                self.pending = false;
                LightEvent::StateChanged {
                    on: self.on,
                    color_temp: self.color_temp,
                }
            }
        }
    }

    /// Apply one detent in the current mode.
    pub fn adjust(&mut self, direction: Direction, now_ms: u32) -> Option<LightEvent> {
        match self.mode {
            LightMode::Temperature => {
                self.adjust_temp(direction, now_ms);
                None
            }
            LightMode::Scenes => Some(self.adjust_scene(direction)),
        }
    }

    /// Step the color temperature, saturating at the configured bounds.
    /// The change is batched; see [`check_pending_updates`](Self::check_pending_updates).
    pub fn adjust_temp(&mut self, direction: Direction, now_ms: u32) -> u16 {
        let target = i32::from(self.color_temp) + direction.sign() * i32::from(self.step);
        self.color_temp = self.clamp_temp(i64::from(target));
        self.last_change_ms = now_ms;
        self.pending = true;
        self.color_temp
    }

    /// Step the scene selection, wrapping in both directions.
    pub fn adjust_scene(&mut self, direction: Direction) -> LightEvent {
        let len = self.scenes.len() as i64;
        let next = (self.scene_index as i64 + i64::from(direction.sign())).rem_euclid(len);
        self.scene_index = next as usize;
        self.scene_event()
    }

    // ── Remote updates ────────────────────────────────────────

    /// Apply state received from the bus.
    ///
    /// Remote state is authoritative: it becomes the last-notified value and
    /// cancels any pending batched change, so it is never echoed back out.
    /// Returns `true` if anything changed.
    pub fn update_from_external(&mut self, on: bool, color_temp: i64) -> bool {
        let color_temp = self.clamp_temp(color_temp);
        let changed = on != self.on || color_temp != self.color_temp;
        if changed {
            self.on = on;
            self.color_temp = color_temp;
            self.last_notified = (on, color_temp);
            self.pending = false;
        }
        changed
    }

    // ── Batching ──────────────────────────────────────────────

    /// Flush a batched change once `batch_delay_ms` has passed since the last
    /// adjustment.  Call every tick.
    pub fn check_pending_updates(&mut self, now_ms: u32) -> Option<LightEvent> {
        if !self.pending {
            return None;
        }
        if ticks_diff(now_ms, self.last_change_ms) < self.batch_delay_ms {
            return None;
        }
        self.notify_now()
    }

    // ── Internal ──────────────────────────────────────────────

    /// Emit the current state unless it matches what was last sent.
    /// Clears the pending flag either way.
    fn notify_now(&mut self) -> Option<LightEvent> {
        self.pending = false;
        let current = (self.on, self.color_temp);
        if current == self.last_notified {
            debug!("light: suppressed no-op notification {:?}", current);
            return None;
        }
        self.last_notified = current;
        Some(LightEvent::StateChanged {
            on: self.on,
            color_temp: self.color_temp,
        })
    }

    fn scene_event(&self) -> LightEvent {
        LightEvent::SceneSelected {
            index: self.scene_index,
            name: self.current_scene().to_owned(),
        }
    }

    fn clamp_temp(&self, value: i64) -> u16 {
        value.clamp(i64::from(self.min_temp), i64::from(self.max_temp)) as u16
    }
}
