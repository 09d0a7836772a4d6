//! Tuning tables for the kart models.
//!
//! Each struct's `Default` is the most common preset; named constructors
//! give the others. Tuning files only list the fields they change.

use arcade_common::config::{ConfigError, Validate, require_positive, require_unit};
use serde::{Deserialize, Serialize};

/// Ribbon kart: the kart is pinned to the track centre line and steering
/// only moves it sideways.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KartTuning {
    pub start_speed: f32,
    pub base_speed: f32,
    /// Speed lost per unit of lateral offset.
    pub lateral_loss: f32,
    pub drift_penalty: f32,
    pub speed_response: f32,
    pub boost_decay: f32,
    pub steer_power: f32,
    pub drift_steer_power: f32,
    /// Per-frame multiplier on steer velocity.
    pub steer_damping: f32,
    pub drift_steer_damping: f32,
    pub steer_vel_limit: Option<f32>,
    /// Lateral units per second per unit of steer velocity.
    pub lateral_gain: f32,
    pub drift_lateral_gain: f32,
    /// Per-frame multiplier pulling the kart back to the centre line.
    pub lateral_decay: f32,
    pub drift_lateral_decay: f32,
    /// Wall sits this far inside the track edge.
    pub wall_inset: f32,
    pub wall_speed_factor: f32,
    pub wall_steer_factor: f32,
    /// Fraction of the wall distance where the rumble strip starts.
    pub rumble_ratio: Option<f32>,
    pub rumble_speed_factor: f32,
    /// Boost granted when a drift ends.
    pub drift_boost: f32,
    /// Distance for one lap of `t`; the track's own length when unset.
    pub lap_length: Option<f32>,
}

impl Default for KartTuning {
    fn default() -> Self {
        Self::oval()
    }
}

impl KartTuning {
    /// The 2D oval kart.
    pub fn oval() -> Self {
        Self {
            start_speed: 160.0,
            base_speed: 168.0,
            lateral_loss: 0.06,
            drift_penalty: 24.0,
            speed_response: 1.4,
            boost_decay: 5.2,
            steer_power: 2.35,
            drift_steer_power: 3.9,
            steer_damping: 0.86,
            drift_steer_damping: 0.92,
            steer_vel_limit: Some(1.5),
            lateral_gain: 22.0,
            drift_lateral_gain: 40.0,
            lateral_decay: 0.976,
            drift_lateral_decay: 0.998,
            wall_inset: 0.0,
            wall_speed_factor: 0.84,
            wall_steer_factor: 0.4,
            rumble_ratio: Some(0.72),
            rumble_speed_factor: 0.988,
            drift_boost: 96.0,
            lap_length: None,
        }
    }

    /// The 3D ribbon circuit. Its lateral gains were per frame at 60 Hz and
    /// are stored here per second.
    pub fn circuit() -> Self {
        Self {
            start_speed: 0.0,
            base_speed: 36.0,
            lateral_loss: 0.0,
            drift_penalty: 5.0,
            speed_response: 1.85,
            boost_decay: 4.6,
            steer_power: 1.48,
            drift_steer_power: 2.5,
            steer_damping: 0.84,
            drift_steer_damping: 0.92,
            steer_vel_limit: None,
            lateral_gain: 2.7 * 60.0,
            drift_lateral_gain: 4.3 * 60.0,
            lateral_decay: 0.95,
            drift_lateral_decay: 0.992,
            wall_inset: 0.9,
            wall_speed_factor: 0.84,
            wall_steer_factor: 0.45,
            rumble_ratio: None,
            rumble_speed_factor: 1.0,
            drift_boost: 18.0,
            lap_length: Some(410.0),
        }
    }
}

impl Validate for KartTuning {
    fn validate(&self) -> Result<(), ConfigError> {
        require_positive("base_speed", self.base_speed)?;
        require_positive("speed_response", self.speed_response)?;
        require_positive("lateral_gain", self.lateral_gain)?;
        require_positive("drift_lateral_gain", self.drift_lateral_gain)?;
        require_unit("steer_damping", self.steer_damping)?;
        require_unit("drift_steer_damping", self.drift_steer_damping)?;
        require_unit("lateral_decay", self.lateral_decay)?;
        require_unit("drift_lateral_decay", self.drift_lateral_decay)?;
        require_unit("wall_speed_factor", self.wall_speed_factor)?;
        require_unit("wall_steer_factor", self.wall_steer_factor)?;
        require_unit("rumble_speed_factor", self.rumble_speed_factor)?;
        if self.wall_inset < 0.0 {
            return Err(ConfigError::Invalid {
                field: "wall_inset",
                reason: format!("must be >= 0, got {}", self.wall_inset),
            });
        }
        if let Some(limit) = self.steer_vel_limit {
            require_positive("steer_vel_limit", limit)?;
        }
        if let Some(ratio) = self.rumble_ratio {
            require_unit("rumble_ratio", ratio)?;
        }
        if let Some(len) = self.lap_length {
            require_positive("lap_length", len)?;
        }
        Ok(())
    }
}

/// Free-roam kart that drives in world space and is only loosely held to
/// the track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreeKartTuning {
    pub start_speed: f32,
    pub start_lateral: f32,
    pub max_speed: f32,
    pub drift_max_speed: f32,
    pub speed_response: f32,
    pub min_speed: f32,
    pub speed_cap: f32,
    pub steer_power: f32,
    pub drift_steer_power: f32,
    /// Speed at which steering reaches its nominal strength.
    pub steer_reference_speed: f32,
    pub steer_factor_min: f32,
    pub steer_factor_max: f32,
    pub yaw_damping: f32,
    pub drift_yaw_damping: f32,
    /// Distance inside the track edge where the push-back starts.
    pub edge_margin: f32,
    pub push_back: f32,
    pub edge_speed_factor: f32,
    pub edge_yaw_factor: f32,
    /// Distance past the track edge where the off-road penalty starts.
    pub offroad_margin: f32,
    pub offroad_speed_factor: f32,
    /// Heading correction toward the track tangent, radians per second.
    pub align_assist: f32,
    pub charge_rate: f32,
    pub charge_max: f32,
    pub charge_threshold: f32,
    pub charge_bleed: f32,
    pub boost_base: f32,
    pub boost_per_charge: f32,
}

impl Default for FreeKartTuning {
    fn default() -> Self {
        Self {
            start_speed: 15.0,
            start_lateral: -2.2,
            max_speed: 46.0,
            drift_max_speed: 40.0,
            speed_response: 1.2,
            min_speed: 8.0,
            speed_cap: 55.0,
            steer_power: 1.5,
            drift_steer_power: 2.25,
            steer_reference_speed: 40.0,
            steer_factor_min: 0.5,
            steer_factor_max: 1.2,
            yaw_damping: 0.82,
            drift_yaw_damping: 0.88,
            edge_margin: 1.2,
            push_back: 0.45,
            edge_speed_factor: 0.86,
            edge_yaw_factor: 0.65,
            offroad_margin: 2.8,
            offroad_speed_factor: 0.82,
            align_assist: 0.65,
            charge_rate: 1.4,
            charge_max: 1.4,
            charge_threshold: 0.2,
            charge_bleed: 0.8,
            boost_base: 5.0,
            boost_per_charge: 6.0,
        }
    }
}

impl Validate for FreeKartTuning {
    fn validate(&self) -> Result<(), ConfigError> {
        require_positive("max_speed", self.max_speed)?;
        require_positive("drift_max_speed", self.drift_max_speed)?;
        require_positive("speed_cap", self.speed_cap)?;
        require_positive("steer_reference_speed", self.steer_reference_speed)?;
        require_unit("yaw_damping", self.yaw_damping)?;
        require_unit("drift_yaw_damping", self.drift_yaw_damping)?;
        require_unit("push_back", self.push_back)?;
        require_unit("edge_speed_factor", self.edge_speed_factor)?;
        require_unit("edge_yaw_factor", self.edge_yaw_factor)?;
        require_unit("offroad_speed_factor", self.offroad_speed_factor)?;
        if self.min_speed > self.speed_cap {
            return Err(ConfigError::Invalid {
                field: "min_speed",
                reason: format!("{} exceeds speed_cap {}", self.min_speed, self.speed_cap),
            });
        }
        if self.steer_factor_min > self.steer_factor_max {
            return Err(ConfigError::Invalid {
                field: "steer_factor_min",
                reason: format!(
                    "{} exceeds steer_factor_max {}",
                    self.steer_factor_min, self.steer_factor_max
                ),
            });
        }
        Ok(())
    }
}

/// A uniform speed range `[min, min + spread)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedRange {
    pub min: f32,
    pub spread: f32,
}

/// How rival bots choose their lateral line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LanePattern {
    /// Sine weave around the centre line, phased by lap progress.
    Weave { amplitude: f32 },
    /// Fixed lanes alternating sides: `±(base + (i % 3) * step)`.
    Staggered { base: f32, step: f32 },
}

/// Rival bot behavior on a ribbon or free-roam track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotTuning {
    pub base_speed: f32,
    /// Extra starting speed per grid slot.
    pub speed_step: f32,
    /// Initial cruise target; the starting speed when unset.
    pub cruise: Option<SpeedRange>,
    pub speed_response: f32,
    /// Per-frame probability of picking a new cruise target.
    pub retarget_chance: f32,
    pub retarget: Option<SpeedRange>,
    /// Amplitude of the slow speed wobble.
    pub speed_wave: f32,
    pub lanes: LanePattern,
    pub lane_response: f32,
    /// Distance kept from the track edge.
    pub edge_margin: f32,
    pub grid_start: f32,
    pub grid_spacing: f32,
    /// Bots closer than this to the player slow the player down.
    pub contact_radius: f32,
    pub contact_speed_factor: f32,
}

impl Default for BotTuning {
    fn default() -> Self {
        Self::circuit()
    }
}

impl BotTuning {
    /// Bots on the ribbon circuit: steady pace, weaving line, lined up
    /// behind the start.
    pub fn circuit() -> Self {
        Self {
            base_speed: 32.5,
            speed_step: 0.35,
            cruise: None,
            speed_response: 0.8,
            retarget_chance: 0.0,
            retarget: None,
            speed_wave: 0.06,
            lanes: LanePattern::Weave { amplitude: 1.7 },
            lane_response: 2.5,
            edge_margin: 1.0,
            grid_start: 0.75,
            grid_spacing: 0.06,
            contact_radius: 1.8,
            contact_speed_factor: 0.98,
        }
    }

    /// Bots in the free-roam battle: random cruise speeds on fixed lanes.
    pub fn battle() -> Self {
        Self {
            base_speed: 25.0,
            speed_step: 1.2,
            cruise: Some(SpeedRange {
                min: 26.0,
                spread: 6.0,
            }),
            speed_response: 0.8,
            retarget_chance: 0.015,
            retarget: Some(SpeedRange {
                min: 25.0,
                spread: 8.0,
            }),
            speed_wave: 0.0,
            lanes: LanePattern::Staggered {
                base: 1.6,
                step: 1.1,
            },
            lane_response: 2.5,
            edge_margin: 1.0,
            grid_start: 0.01,
            grid_spacing: 0.03,
            contact_radius: 1.8,
            contact_speed_factor: 0.98,
        }
    }

    /// Bots around the oval, scaled to its speeds and width.
    pub fn oval() -> Self {
        Self {
            base_speed: 150.0,
            speed_step: 4.0,
            cruise: Some(SpeedRange {
                min: 150.0,
                spread: 20.0,
            }),
            retarget_chance: 0.01,
            retarget: Some(SpeedRange {
                min: 145.0,
                spread: 30.0,
            }),
            lanes: LanePattern::Weave { amplitude: 18.0 },
            edge_margin: 8.0,
            grid_start: 0.9,
            grid_spacing: 0.02,
            contact_radius: 14.0,
            ..Self::circuit()
        }
    }
}

impl Validate for BotTuning {
    fn validate(&self) -> Result<(), ConfigError> {
        require_positive("base_speed", self.base_speed)?;
        require_positive("speed_response", self.speed_response)?;
        require_positive("lane_response", self.lane_response)?;
        require_unit("retarget_chance", self.retarget_chance)?;
        require_unit("contact_speed_factor", self.contact_speed_factor)?;
        require_unit("grid_start", self.grid_start)?;
        if self.contact_radius < 0.0 {
            return Err(ConfigError::Invalid {
                field: "contact_radius",
                reason: format!("must be >= 0, got {}", self.contact_radius),
            });
        }
        for (field, range) in [("cruise", self.cruise), ("retarget", self.retarget)] {
            if let Some(range) = range {
                require_positive(field, range.min)?;
            }
        }
        Ok(())
    }
}
