use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::action::Action;

/// Pointer x below this (normalized screen width) steers left.
const POINTER_LEFT_ZONE: f32 = 0.38;
/// Pointer x above this steers right.
const POINTER_RIGHT_ZONE: f32 = 0.62;

/// Per-frame kart controls consumed by the kart simulations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KartControls {
    /// Steering in `[-1, 1]`, negative is left.
    pub steer: f32,
    /// Drift button held.
    pub drift: bool,
}

impl KartControls {
    pub fn new(steer: f32, drift: bool) -> Self {
        Self {
            steer: steer.clamp(-1.0, 1.0),
            drift,
        }
    }
}

/// Held-button state for the kart games, shared by keyboard, on-screen
/// buttons and a free pointer on the track canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct KartInput {
    pub left: bool,
    pub right: bool,
    pub drift: bool,
    pointer_active: bool,
    pointer_x: f32,
}

impl Default for KartInput {
    fn default() -> Self {
        Self {
            left: false,
            right: false,
            drift: false,
            pointer_active: false,
            pointer_x: 0.5,
        }
    }
}

impl KartInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a press or release. Returns false for actions karts ignore.
    pub fn apply(&mut self, action: Action, pressed: bool) -> bool {
        match action {
            Action::SteerLeft => self.left = pressed,
            Action::SteerRight => self.right = pressed,
            Action::Drift => self.drift = pressed,
            _ => return false,
        }
        true
    }

    /// Pointer pressed at normalized x in `[0, 1]`.
    pub fn pointer_down(&mut self, x: f32) {
        self.pointer_active = true;
        self.pointer_x = x.clamp(0.0, 1.0);
    }

    /// Pointer moved; ignored unless the pointer is down.
    pub fn pointer_move(&mut self, x: f32) {
        if self.pointer_active {
            self.pointer_x = x.clamp(0.0, 1.0);
        }
    }

    /// Pointer released or cancelled: recentre.
    pub fn pointer_up(&mut self) {
        self.pointer_active = false;
        self.pointer_x = 0.5;
    }

    pub fn pointer(&self) -> Option<f32> {
        self.pointer_active.then_some(self.pointer_x)
    }

    /// Mixed steering from keys and pointer zones, clamped to `[-1, 1]`.
    pub fn steer(&self) -> f32 {
        let mut steer = 0.0;
        if self.left {
            steer -= 1.0;
        }
        if self.right {
            steer += 1.0;
        }
        if self.pointer_active && self.pointer_x < POINTER_LEFT_ZONE {
            steer -= 1.0;
        }
        if self.pointer_active && self.pointer_x > POINTER_RIGHT_ZONE {
            steer += 1.0;
        }
        f32::clamp(steer, -1.0, 1.0)
    }

    pub fn controls(&self) -> KartControls {
        KartControls::new(self.steer(), self.drift)
    }

    /// Release everything (window blur, restart).
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Per-frame flight controls consumed by the dogfight simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlightControls {
    /// Roll command in `[-1, 1]`, positive banks right.
    pub roll: f32,
    /// Pitch command in `[-1, 1]`, positive noses up.
    pub pitch: f32,
    /// Yaw command in `[-1, 1]`, positive turns right.
    pub yaw: f32,
    /// Throttle lever in `[0, 1]`.
    pub throttle: f32,
    pub fire: bool,
    pub boost: bool,
}

impl Default for FlightControls {
    fn default() -> Self {
        Self {
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
            throttle: 0.6,
            fire: false,
            boost: false,
        }
    }
}

impl FlightControls {
    /// Clamp every axis into range.
    pub fn clamped(self) -> Self {
        Self {
            roll: self.roll.clamp(-1.0, 1.0),
            pitch: self.pitch.clamp(-1.0, 1.0),
            yaw: self.yaw.clamp(-1.0, 1.0),
            throttle: self.throttle.clamp(0.0, 1.0),
            ..self
        }
    }
}

/// Throttle lever travel per second while a throttle key is held.
const THROTTLE_RATE: f32 = 0.6;

/// Held state for the dogfight: touch stick, throttle lever, keys.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightInput {
    stick: Vec2,
    throttle: f32,
    pub fire: bool,
    pub boost: bool,
    pitch_up: bool,
    pitch_down: bool,
    roll_left: bool,
    roll_right: bool,
    throttle_up: bool,
    throttle_down: bool,
}

impl Default for FlightInput {
    fn default() -> Self {
        Self {
            stick: Vec2::ZERO,
            throttle: 0.6,
            fire: false,
            boost: false,
            pitch_up: false,
            pitch_down: false,
            roll_left: false,
            roll_right: false,
            throttle_up: false,
            throttle_down: false,
        }
    }
}

impl FlightInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, action: Action, pressed: bool) -> bool {
        match action {
            Action::Fire => self.fire = pressed,
            Action::Boost => self.boost = pressed,
            Action::PitchUp => self.pitch_up = pressed,
            Action::PitchDown => self.pitch_down = pressed,
            Action::RollLeft => self.roll_left = pressed,
            Action::RollRight => self.roll_right = pressed,
            Action::ThrottleUp => self.throttle_up = pressed,
            Action::ThrottleDown => self.throttle_down = pressed,
            _ => return false,
        }
        true
    }

    /// Virtual stick deflection; x rolls, y pitches. Clamped to the unit disc.
    pub fn set_stick(&mut self, v: Vec2) {
        self.stick = v.clamp_length_max(1.0);
    }

    pub fn release_stick(&mut self) {
        self.stick = Vec2::ZERO;
    }

    pub fn stick(&self) -> Vec2 {
        self.stick
    }

    /// Throttle lever position in `[0, 1]`.
    pub fn set_throttle(&mut self, v: f32) {
        self.throttle = v.clamp(0.0, 1.0);
    }

    pub fn throttle(&self) -> f32 {
        self.throttle
    }

    /// Integrate held throttle keys.
    pub fn tick(&mut self, dt: f32) {
        let dir = (self.throttle_up as i32 - self.throttle_down as i32) as f32;
        if dir != 0.0 {
            self.set_throttle(self.throttle + dir * THROTTLE_RATE * dt);
        }
    }

    pub fn controls(&self) -> FlightControls {
        let keys = Vec2::new(
            (self.roll_right as i32 - self.roll_left as i32) as f32,
            (self.pitch_up as i32 - self.pitch_down as i32) as f32,
        );
        // Keys win over the touch stick when both are in use.
        let axis = if keys != Vec2::ZERO {
            keys.clamp_length_max(1.0)
        } else {
            self.stick
        };
        FlightControls {
            roll: axis.x,
            pitch: axis.y,
            yaw: 0.0,
            throttle: self.throttle,
            fire: self.fire,
            boost: self.boost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steer_mixes_keys() {
        let mut input = KartInput::new();
        assert_eq!(input.steer(), 0.0);
        input.apply(Action::SteerLeft, true);
        assert_eq!(input.steer(), -1.0);
        input.apply(Action::SteerRight, true);
        assert_eq!(input.steer(), 0.0);
        input.apply(Action::SteerLeft, false);
        assert_eq!(input.steer(), 1.0);
    }

    #[test]
    fn pointer_zones() {
        let mut input = KartInput::new();
        input.pointer_move(0.1);
        assert_eq!(input.steer(), 0.0, "move without press is ignored");

        input.pointer_down(0.2);
        assert_eq!(input.steer(), -1.0);
        input.pointer_move(0.5);
        assert_eq!(input.steer(), 0.0);
        input.pointer_move(0.9);
        assert_eq!(input.steer(), 1.0);

        input.pointer_up();
        assert_eq!(input.pointer(), None);
        assert_eq!(input.steer(), 0.0);
    }

    #[test]
    fn pointer_and_key_clamp() {
        let mut input = KartInput::new();
        input.apply(Action::SteerRight, true);
        input.pointer_down(0.95);
        assert_eq!(input.steer(), 1.0);
    }

    #[test]
    fn kart_ignores_flight_actions() {
        let mut input = KartInput::new();
        assert!(!input.apply(Action::Fire, true));
        assert!(input.apply(Action::Drift, true));
        assert!(input.controls().drift);
        input.clear();
        assert!(!input.controls().drift);
    }

    #[test]
    fn stick_is_clamped_to_disc() {
        let mut input = FlightInput::new();
        input.set_stick(Vec2::new(3.0, 4.0));
        assert!((input.stick().length() - 1.0).abs() < 1e-6);
        input.release_stick();
        assert_eq!(input.stick(), Vec2::ZERO);
    }

    #[test]
    fn keys_override_stick() {
        let mut input = FlightInput::new();
        input.set_stick(Vec2::new(0.3, 0.0));
        input.apply(Action::PitchUp, true);
        let c = input.controls();
        assert_eq!(c.roll, 0.0);
        assert_eq!(c.pitch, 1.0);
    }

    #[test]
    fn up_key_and_stick_up_agree() {
        let map = crate::action::KeyMap::flight();
        for (key, stick) in [("ArrowUp", Vec2::Y), ("s", Vec2::NEG_Y), ("d", Vec2::X)] {
            let mut keys = FlightInput::new();
            let action = map.lookup(key).unwrap();
            keys.apply(action, true);

            let mut touch = FlightInput::new();
            touch.set_stick(stick);
            assert_eq!(keys.controls(), touch.controls(), "{key}");
        }
    }

    #[test]
    fn throttle_keys_integrate_and_clamp() {
        let mut input = FlightInput::new();
        input.apply(Action::ThrottleUp, true);
        for _ in 0..200 {
            input.tick(1.0 / 60.0);
        }
        assert_eq!(input.throttle(), 1.0);
        input.apply(Action::ThrottleUp, false);
        input.apply(Action::ThrottleDown, true);
        for _ in 0..300 {
            input.tick(1.0 / 60.0);
        }
        assert_eq!(input.throttle(), 0.0);
    }

    #[test]
    fn flight_controls_clamped() {
        let c = FlightControls {
            roll: 4.0,
            throttle: -1.0,
            ..FlightControls::default()
        }
        .clamped();
        assert_eq!(c.roll, 1.0);
        assert_eq!(c.throttle, 0.0);
    }
}
