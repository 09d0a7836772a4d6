use arcade_common::math::TAU;
use serde::{Deserialize, Serialize};

/// Lap progress past which a racer is armed for the next line crossing.
const HALF_LAP: f32 = 0.5;

/// How a crossing of the start line is detected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LapRule {
    /// The racer is within `window` radians of the start angle.
    StartWindow { window: f32, min_lap_time: f32 },
    /// `t` wraps from above `high` to below `low` in one frame.
    WrapCrossing {
        high: f32,
        low: f32,
        min_lap_time: f32,
    },
}

impl LapRule {
    /// Oval: 0.08 rad window, 1.8 s guard.
    pub fn start_window() -> Self {
        Self::StartWindow {
            window: 0.08,
            min_lap_time: 1.8,
        }
    }

    /// Ribbon circuit: 0.94 → 0.08.
    pub fn circuit() -> Self {
        Self::WrapCrossing {
            high: 0.94,
            low: 0.08,
            min_lap_time: 1.8,
        }
    }

    /// Free-roam battle: 0.85 → 0.15, wide enough for the coarse
    /// nearest-sample projection.
    pub fn battle() -> Self {
        Self::WrapCrossing {
            high: 0.85,
            low: 0.15,
            min_lap_time: 1.8,
        }
    }

    fn min_lap_time(&self) -> f32 {
        match *self {
            Self::StartWindow { min_lap_time, .. } | Self::WrapCrossing { min_lap_time, .. } => {
                min_lap_time
            }
        }
    }

    fn crossed(&self, prev_t: f32, t: f32) -> bool {
        match *self {
            Self::StartWindow { window, .. } => t.min(1.0 - t) * TAU < window,
            Self::WrapCrossing { high, low, .. } => prev_t > high && t < low,
        }
    }
}

/// Counts laps for one racer.
///
/// A lap counts only after the racer has passed the half-lap mark since the
/// last count, and only once `min_lap_time` has elapsed, so a racer
/// wobbling on the line never scores twice. Racers that start behind the
/// line (`t` past one half) must cross it once before their first lap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapCounter {
    rule: LapRule,
    laps_total: u32,
    completed: u32,
    armed: bool,
    since_lap: f32,
    finish_time: Option<f32>,
}

impl LapCounter {
    pub fn new(rule: LapRule, laps_total: u32) -> Self {
        Self {
            rule,
            laps_total: laps_total.max(1),
            completed: 0,
            armed: false,
            since_lap: 0.0,
            finish_time: None,
        }
    }

    pub fn rule(&self) -> LapRule {
        self.rule
    }

    pub fn completed(&self) -> u32 {
        self.completed
    }

    pub fn laps_total(&self) -> u32 {
        self.laps_total
    }

    /// The lap being driven, 1-based, capped at the total.
    pub fn current_lap(&self) -> u32 {
        (self.completed + 1).min(self.laps_total)
    }

    pub fn is_finished(&self) -> bool {
        self.finish_time.is_some()
    }

    /// Race time at which the final lap was completed.
    pub fn finish_time(&self) -> Option<f32> {
        self.finish_time
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Race progress in laps: completed laps plus `t`, with `t` counted as
    /// negative while the racer is still behind the line.
    pub fn progress(&self, t: f32) -> f32 {
        let t = if !self.armed && t >= HALF_LAP { t - 1.0 } else { t };
        self.completed as f32 + t
    }

    /// Feed one frame of movement. Returns true when a lap completed.
    pub fn update(&mut self, prev_t: f32, t: f32, dt: f32, race_time: f32) -> bool {
        if self.is_finished() {
            return false;
        }
        self.since_lap += dt;

        if !self.armed && prev_t < HALF_LAP && t >= HALF_LAP && t - prev_t < HALF_LAP {
            self.armed = true;
        }

        if !self.armed
            || self.since_lap <= self.rule.min_lap_time()
            || !self.rule.crossed(prev_t, t)
        {
            return false;
        }

        self.completed += 1;
        self.armed = false;
        self.since_lap = 0.0;
        if self.completed >= self.laps_total {
            self.finish_time = Some(race_time);
        }
        true
    }
}
