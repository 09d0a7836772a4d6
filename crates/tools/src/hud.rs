//! HUD text, formatted the way the games print it.

use serde::{Deserialize, Serialize};

/// Top speed on the speedometer dial.
pub const SPEED_DIAL: f32 = 320.0;

/// `"TIME 03.20"`: seconds with two decimals, zero-padded to five characters.
pub fn race_time(ms: u64) -> String {
    format!("TIME {:05.2}", ms as f64 / 1000.0)
}

/// Same as [`race_time`] from simulation seconds.
pub fn race_time_secs(secs: f32) -> String {
    race_time((secs.max(0.0) * 1000.0).round() as u64)
}

pub fn lap_label(lap: u32, total: u32) -> String {
    format!("LAP {}/{}", lap.min(total), total)
}

pub fn rank_label(rank: usize, racers: usize) -> String {
    format!("POS {rank}/{racers}")
}

/// English ordinal: 1st, 2nd, 3rd, 4th, 11th, 21st.
pub fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

/// `"SPEED 160"`: `speed` scaled so `max` reads 320, at least three digits.
pub fn speed_label(speed: f32, max: f32) -> String {
    let dial = if max > 0.0 {
        (speed.max(0.0) / max * SPEED_DIAL).round() as u32
    } else {
        0
    };
    format!("SPEED {dial:03}")
}

/// Colour band of an hp bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HpBand {
    Good,
    Warn,
    Danger,
}

impl HpBand {
    pub fn from_fraction(fraction: f32) -> Self {
        if fraction > 0.6 {
            Self::Good
        } else if fraction > 0.3 {
            Self::Warn
        } else {
            Self::Danger
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Warn => "warn",
            Self::Danger => "danger",
        }
    }
}

/// `"HP 072"` from a fraction of full health.
pub fn hp_label(fraction: f32) -> String {
    format!("HP {:03}", (fraction.clamp(0.0, 1.0) * 100.0).round() as u32)
}
