use arcade_common::math::wrap_pi;
use arcade_input::KartControls;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::track::Track;
use crate::tuning::FreeKartTuning;

/// Outcome of one free-roam step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FreeStep {
    pub drift_started: bool,
    pub drift_boost: Option<f32>,
    /// The kart was pushed back from the track edge.
    pub wall_hit: bool,
    pub prev_t: f32,
}

/// Heading whose forward vector is `dir` (`x = sin`, `z = cos`).
pub fn heading_of(dir: Vec2) -> f32 {
    dir.x.atan2(dir.y)
}

/// Kart driving freely on the ground plane.
///
/// The track only acts through its projection: edge push-back, the
/// off-road penalty, a gentle heading assist and lap progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeKart {
    pub pos: Vec2,
    pub heading: f32,
    pub speed: f32,
    pub yaw_vel: f32,
    pub drift_charge: f32,
    pub drifting: bool,
    /// Lap parameter of the nearest track sample.
    pub t: f32,
    /// Signed offset from the centre line at the last projection.
    pub lateral: f32,
}

impl FreeKart {
    /// Place the kart on the start line, offset sideways, facing along the
    /// track.
    pub fn on_grid(track: &impl Track, tuning: &FreeKartTuning) -> Self {
        let tangent = track.tangent(0.0);
        Self {
            pos: track.world_position(0.0, tuning.start_lateral),
            heading: heading_of(tangent),
            speed: tuning.start_speed,
            yaw_vel: 0.0,
            drift_charge: 0.0,
            drifting: false,
            t: 0.0,
            lateral: tuning.start_lateral,
        }
    }

    pub fn forward(&self) -> Vec2 {
        Vec2::new(self.heading.sin(), self.heading.cos())
    }

    pub fn step(
        &mut self,
        track: &impl Track,
        tuning: &FreeKartTuning,
        controls: KartControls,
        dt: f32,
    ) -> FreeStep {
        let steer = controls.steer.clamp(-1.0, 1.0);
        let drift = controls.drift && steer != 0.0;
        let mut out = FreeStep {
            drift_started: drift && !self.drifting,
            prev_t: self.t,
            ..FreeStep::default()
        };

        let max_speed = if drift {
            tuning.drift_max_speed
        } else {
            tuning.max_speed
        };
        self.speed += (max_speed - self.speed) * dt * tuning.speed_response;
        self.speed = self.speed.clamp(tuning.min_speed, tuning.speed_cap);

        let steer_power = if drift {
            tuning.drift_steer_power
        } else {
            tuning.steer_power
        };
        let speed_factor = (self.speed / tuning.steer_reference_speed)
            .clamp(tuning.steer_factor_min, tuning.steer_factor_max);
        self.yaw_vel += steer * steer_power * speed_factor * dt;
        self.yaw_vel *= if drift {
            tuning.drift_yaw_damping
        } else {
            tuning.yaw_damping
        };
        self.heading += self.yaw_vel;

        self.pos += self.forward() * self.speed * dt;

        let proj = track.project(self.pos);
        self.t = proj.t;
        self.lateral = proj.lateral;

        let half = track.half_width();
        let outside = proj.lateral.abs() - (half - tuning.edge_margin);
        if outside > 0.0 {
            self.pos -= proj.right * proj.lateral.signum() * outside * tuning.push_back;
            self.speed *= tuning.edge_speed_factor;
            self.yaw_vel *= tuning.edge_yaw_factor;
            out.wall_hit = true;
        }
        if proj.lateral.abs() > half + tuning.offroad_margin {
            self.speed *= tuning.offroad_speed_factor;
        }

        let desired = heading_of(proj.tangent);
        let align = wrap_pi(desired - self.heading).sin().clamp(-1.0, 1.0);
        self.heading += align * dt * tuning.align_assist;

        if drift {
            self.drift_charge = (self.drift_charge + dt * tuning.charge_rate).min(tuning.charge_max);
        } else if self.drifting && self.drift_charge > tuning.charge_threshold {
            let boost = tuning.boost_base + self.drift_charge * tuning.boost_per_charge;
            self.speed += boost;
            self.drift_charge = 0.0;
            out.drift_boost = Some(boost);
        } else {
            self.drift_charge = (self.drift_charge - dt * tuning.charge_bleed).max(0.0);
        }
        self.drifting = drift;
        out
    }

    pub fn slow(&mut self, factor: f32) {
        self.speed *= factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::SplineTrack;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn grid_position_faces_along_track() {
        let track = SplineTrack::battle_loop().unwrap();
        let kart = FreeKart::on_grid(&track, &FreeKartTuning::default());
        assert!(kart.forward().dot(track.tangent(0.0)) > 0.999);
        let proj = track.project(kart.pos);
        assert!((proj.lateral + 2.2).abs() < 0.05);
        assert_eq!(kart.speed, 15.0);
    }

    #[test]
    fn speed_stays_within_limits() {
        let track = SplineTrack::battle_loop().unwrap();
        let tuning = FreeKartTuning::default();
        let mut kart = FreeKart::on_grid(&track, &tuning);
        for i in 0..600 {
            let steer = if i % 90 < 45 { 1.0 } else { -1.0 };
            kart.step(&track, &tuning, KartControls::new(steer, i % 200 < 100), DT);
            let max_boost = tuning.boost_base + tuning.charge_max * tuning.boost_per_charge;
            assert!(kart.speed <= tuning.speed_cap + max_boost + 1e-3);
            assert!(kart.speed > 0.0);
        }
    }

    #[test]
    fn drift_release_pays_out_charge() {
        let track = SplineTrack::battle_loop().unwrap();
        let tuning = FreeKartTuning::default();
        let mut kart = FreeKart::on_grid(&track, &tuning);
        for _ in 0..30 {
            kart.step(&track, &tuning, KartControls::new(0.3, true), DT);
        }
        assert!(kart.drift_charge > 0.2);
        let charge = kart.drift_charge;
        let out = kart.step(&track, &tuning, KartControls::new(0.3, false), DT);
        let boost = out.drift_boost.unwrap();
        assert!((boost - (5.0 + charge * 6.0)).abs() < 1e-4);
        assert_eq!(kart.drift_charge, 0.0);
    }

    #[test]
    fn short_drift_bleeds_instead() {
        let track = SplineTrack::battle_loop().unwrap();
        let tuning = FreeKartTuning::default();
        let mut kart = FreeKart::on_grid(&track, &tuning);
        for _ in 0..5 {
            kart.step(&track, &tuning, KartControls::new(0.3, true), DT);
        }
        let out = kart.step(&track, &tuning, KartControls::new(0.3, false), DT);
        assert_eq!(out.drift_boost, None);
        assert!(kart.drift_charge < 5.0 * DT * 1.4);
    }

    #[test]
    fn edge_pushes_back() {
        let track = SplineTrack::battle_loop().unwrap();
        let tuning = FreeKartTuning::default();
        let mut kart = FreeKart::on_grid(&track, &tuning);
        kart.pos = track.world_position(0.0, 6.9);
        let out = kart.step(&track, &tuning, KartControls::default(), DT);
        assert!(out.wall_hit);
        assert!(track.project(kart.pos).lateral < 6.9);
    }

    #[test]
    fn heading_helper_matches_forward() {
        let dir = Vec2::new(1.0, 1.0).normalize();
        let kart = FreeKart {
            pos: Vec2::ZERO,
            heading: heading_of(dir),
            speed: 0.0,
            yaw_vel: 0.0,
            drift_charge: 0.0,
            drifting: false,
            t: 0.0,
            lateral: 0.0,
        };
        assert!(kart.forward().distance(dir) < 1e-6);
    }
}
