use arcade_common::config::{ConfigError, Validate, require_positive, require_unit};
use serde::{Deserialize, Serialize};

/// Aircraft, weapon and bot-pilot constants for a dogfight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightTuning {
    pub hp: f32,
    pub start_speed: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    /// Speed multiplier while boosting.
    pub boost_factor: f32,
    /// Boost energy drained and regained per second, out of 1.
    pub boost_drain: f32,
    pub boost_regen: f32,
    pub speed_response: f32,
    /// Turn rates at full deflection, radians per second.
    pub roll_rate: f32,
    pub pitch_rate: f32,
    pub yaw_rate: f32,
    /// Exponential smoothing rate of the control surfaces.
    pub control_response: f32,
    /// Collision sphere radius of an aircraft.
    pub body_radius: f32,
    pub collision_speed_factor: f32,
    pub collision_damage: f32,
    pub fire_interval: f32,
    pub muzzle_offset: f32,
    pub bullet_speed: f32,
    /// Share of the shooter's velocity a bullet inherits.
    pub bullet_inherit: f32,
    pub bullet_life: f32,
    pub bullet_radius: f32,
    pub bullet_damage: f32,
    /// Distance at which a bullet counts as hitting an aircraft.
    pub hit_radius: f32,
    pub effect_life: f32,
    /// Most bullets alive at once.
    pub bullet_capacity: usize,
    pub player_ammo: u32,
    pub ai: AiTuning,
}

impl Default for FlightTuning {
    fn default() -> Self {
        Self {
            hp: 100.0,
            start_speed: 220.0,
            min_speed: 140.0,
            max_speed: 320.0,
            boost_factor: 1.6,
            boost_drain: 0.35,
            boost_regen: 0.2,
            speed_response: 1.4,
            roll_rate: 2.6,
            pitch_rate: 1.4,
            yaw_rate: 0.7,
            control_response: 6.0,
            body_radius: 16.0,
            collision_speed_factor: 0.55,
            collision_damage: 12.0,
            fire_interval: 0.11,
            muzzle_offset: 28.0,
            bullet_speed: 900.0,
            bullet_inherit: 0.4,
            bullet_life: 1.9,
            bullet_radius: 2.5,
            bullet_damage: 8.0,
            hit_radius: 14.0,
            effect_life: 0.24,
            bullet_capacity: 512,
            player_ammo: 400,
            ai: AiTuning::default(),
        }
    }
}

impl Validate for FlightTuning {
    fn validate(&self) -> Result<(), ConfigError> {
        require_positive("hp", self.hp)?;
        require_positive("min_speed", self.min_speed)?;
        require_positive("max_speed", self.max_speed)?;
        require_positive("fire_interval", self.fire_interval)?;
        require_positive("bullet_speed", self.bullet_speed)?;
        require_positive("bullet_life", self.bullet_life)?;
        require_positive("hit_radius", self.hit_radius)?;
        require_positive("body_radius", self.body_radius)?;
        require_unit("collision_speed_factor", self.collision_speed_factor)?;
        require_unit("boost_drain", self.boost_drain)?;
        require_unit("boost_regen", self.boost_regen)?;
        if self.min_speed > self.max_speed {
            return Err(ConfigError::Invalid {
                field: "min_speed",
                reason: format!("{} exceeds max_speed {}", self.min_speed, self.max_speed),
            });
        }
        if self.bullet_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "bullet_capacity",
                reason: "must hold at least one bullet".into(),
            });
        }
        self.ai.validate()
    }
}

/// Bot pilot behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiTuning {
    /// Minimum cosine between nose and aim point before firing.
    pub aim_cos: f32,
    pub fire_range: f32,
    pub lead_iterations: u32,
    /// Distances ahead of the nose sampled for obstacles.
    pub probes: Vec<f32>,
    /// Clearance the probes try to keep from boxes.
    pub probe_margin: f32,
    pub floor_margin: f32,
    pub ceiling_margin: f32,
    pub wall_margin: f32,
    pub avoid_weight: f32,
    pub pitch_gain: f32,
    pub yaw_gain: f32,
    pub roll_gain: f32,
    /// Largest bank angle bots roll into, radians.
    pub max_bank: f32,
    pub throttle: f32,
    /// Bots boost toward targets farther than this.
    pub boost_range: f32,
}

impl Default for AiTuning {
    fn default() -> Self {
        Self {
            aim_cos: 0.985,
            fire_range: 900.0,
            lead_iterations: 2,
            probes: vec![60.0, 140.0, 240.0],
            probe_margin: 90.0,
            floor_margin: 160.0,
            ceiling_margin: 160.0,
            wall_margin: 320.0,
            avoid_weight: 1.8,
            pitch_gain: 2.5,
            yaw_gain: 2.0,
            roll_gain: 2.0,
            max_bank: 1.0,
            throttle: 0.75,
            boost_range: 1400.0,
        }
    }
}

impl Validate for AiTuning {
    fn validate(&self) -> Result<(), ConfigError> {
        require_unit("ai.aim_cos", self.aim_cos)?;
        require_positive("ai.fire_range", self.fire_range)?;
        require_unit("ai.throttle", self.throttle)?;
        for &probe in &self.probes {
            require_positive("ai.probes", probe)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_common::config::{ConfigFormat, parse_config};

    #[test]
    fn defaults_validate() {
        FlightTuning::default().validate().unwrap();
    }

    #[test]
    fn nested_ai_override() {
        let t: FlightTuning =
            parse_config("player_ammo: 50\nai:\n  fire_range: 600\n", ConfigFormat::Yaml).unwrap();
        assert_eq!(t.player_ammo, 50);
        assert_eq!(t.ai.fire_range, 600.0);
        assert_eq!(t.ai.aim_cos, 0.985);
        assert_eq!(t.hp, 100.0);
    }

    #[test]
    fn inverted_speed_range_rejected() {
        let t = FlightTuning {
            min_speed: 400.0,
            ..FlightTuning::default()
        };
        assert!(t.validate().is_err());
    }
}
