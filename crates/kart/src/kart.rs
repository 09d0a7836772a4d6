use arcade_input::KartControls;
use serde::{Deserialize, Serialize};

use crate::track::Track;
use crate::tuning::KartTuning;

/// What a single kart step did, for the race to turn into events.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KartStep {
    pub drift_started: bool,
    /// Boost granted by ending a drift this frame.
    pub drift_boost: Option<f32>,
    pub wall_hit: bool,
    pub prev_t: f32,
}

/// Ribbon kart: lap parameter plus a sideways offset from the centre line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kart {
    pub t: f32,
    pub lateral: f32,
    pub speed: f32,
    pub steer_vel: f32,
    pub drifting: bool,
    pub boost: f32,
}

impl Kart {
    pub fn new(tuning: &KartTuning) -> Self {
        Self {
            t: 0.0,
            lateral: 0.0,
            speed: tuning.start_speed,
            steer_vel: 0.0,
            drifting: false,
            boost: 0.0,
        }
    }

    /// Distance from the centre line at which the wall stops the kart.
    pub fn wall(track: &impl Track, tuning: &KartTuning) -> f32 {
        (track.half_width() - tuning.wall_inset).max(0.0)
    }

    /// Integrate one frame.
    ///
    /// Drifting needs both the drift button and a steering direction.
    /// Releasing a drift grants `drift_boost` once.
    pub fn step(
        &mut self,
        track: &impl Track,
        tuning: &KartTuning,
        controls: KartControls,
        dt: f32,
    ) -> KartStep {
        let steer = controls.steer.clamp(-1.0, 1.0);
        let drift = controls.drift && steer != 0.0;
        let mut out = KartStep {
            drift_started: drift && !self.drifting,
            prev_t: self.t,
            ..KartStep::default()
        };

        let (steer_power, damping, gain, decay) = if drift {
            (
                tuning.drift_steer_power,
                tuning.drift_steer_damping,
                tuning.drift_lateral_gain,
                tuning.drift_lateral_decay,
            )
        } else {
            (
                tuning.steer_power,
                tuning.steer_damping,
                tuning.lateral_gain,
                tuning.lateral_decay,
            )
        };

        self.steer_vel += steer * steer_power * dt;
        self.steer_vel *= damping;
        if let Some(limit) = tuning.steer_vel_limit {
            self.steer_vel = self.steer_vel.clamp(-limit, limit);
        }

        let loss = self.lateral.abs() * tuning.lateral_loss;
        let penalty = if drift { tuning.drift_penalty } else { 0.0 };
        self.speed += (tuning.base_speed - self.speed - loss - penalty) * dt * tuning.speed_response;
        self.speed += self.boost * dt;
        self.boost *= (-tuning.boost_decay * dt).exp();

        let distance = self.speed * dt;
        self.t = match tuning.lap_length {
            Some(len) => arcade_common::math::wrap01(self.t + distance / len),
            None => track.advance(self.t, distance),
        };

        self.lateral += self.steer_vel * gain * dt;
        let wall = Self::wall(track, tuning);
        if self.lateral.abs() > wall {
            self.lateral = wall.copysign(self.lateral);
            self.speed *= tuning.wall_speed_factor;
            self.steer_vel *= tuning.wall_steer_factor;
            out.wall_hit = true;
        }
        if let Some(ratio) = tuning.rumble_ratio {
            if self.lateral.abs() > wall * ratio {
                self.speed *= tuning.rumble_speed_factor;
            }
        }
        self.lateral *= decay;

        if self.drifting && !drift {
            self.boost += tuning.drift_boost;
            out.drift_boost = Some(tuning.drift_boost);
        }
        self.drifting = drift;
        out
    }

    /// Multiply speed, e.g. after bumping into a rival.
    pub fn slow(&mut self, factor: f32) {
        self.speed *= factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{EllipseTrack, SplineTrack};

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn straight_driving_approaches_base_speed() {
        let track = EllipseTrack::oval();
        let tuning = KartTuning::oval();
        let mut kart = Kart::new(&tuning);
        for _ in 0..600 {
            kart.step(&track, &tuning, KartControls::default(), DT);
        }
        assert!((kart.speed - 168.0).abs() < 0.5);
        assert_eq!(kart.lateral, 0.0);
    }

    #[test]
    fn lateral_never_exceeds_half_width() {
        let oval = EllipseTrack::oval();
        let circuit = SplineTrack::grand_loop().unwrap();
        for (tuning, half) in [
            (KartTuning::oval(), oval.half_width()),
            (KartTuning::circuit(), circuit.half_width()),
        ] {
            for steer in [-1.0, 0.0, 1.0] {
                for drift in [false, true] {
                    for dt in [0.001, DT, 0.033, 0.25] {
                        let mut kart = Kart::new(&tuning);
                        for _ in 0..400 {
                            if tuning.lap_length.is_some() {
                                kart.step(&circuit, &tuning, KartControls::new(steer, drift), dt);
                            } else {
                                kart.step(&oval, &tuning, KartControls::new(steer, drift), dt);
                            }
                            assert!(
                                kart.lateral.abs() <= half,
                                "lateral {} > {half} (steer {steer}, drift {drift}, dt {dt})",
                                kart.lateral
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn drifting_into_a_side_hits_the_wall() {
        let track = EllipseTrack::oval();
        let tuning = KartTuning::oval();
        let mut kart = Kart::new(&tuning);
        let mut hit = false;
        for _ in 0..600 {
            hit |= kart.step(&track, &tuning, KartControls::new(1.0, true), DT).wall_hit;
        }
        assert!(hit);
        assert!(kart.lateral > 0.0);
        assert!(kart.speed < 168.0);
    }

    #[test]
    fn drift_needs_steer() {
        let track = EllipseTrack::oval();
        let tuning = KartTuning::oval();
        let mut kart = Kart::new(&tuning);
        let out = kart.step(&track, &tuning, KartControls::new(0.0, true), DT);
        assert!(!out.drift_started);
        assert!(!kart.drifting);

        let out = kart.step(&track, &tuning, KartControls::new(-1.0, true), DT);
        assert!(out.drift_started);
        assert!(kart.drifting);
    }

    #[test]
    fn drift_release_boosts_once() {
        let track = SplineTrack::grand_loop().unwrap();
        let tuning = KartTuning::circuit();
        let mut kart = Kart::new(&tuning);
        for _ in 0..30 {
            kart.step(&track, &tuning, KartControls::new(1.0, true), DT);
        }
        let out = kart.step(&track, &tuning, KartControls::new(1.0, false), DT);
        assert_eq!(out.drift_boost, Some(18.0));
        assert!(kart.boost > 17.0);
        let out = kart.step(&track, &tuning, KartControls::new(1.0, false), DT);
        assert_eq!(out.drift_boost, None);
    }

    #[test]
    fn boost_decays() {
        let track = EllipseTrack::oval();
        let tuning = KartTuning::oval();
        let mut kart = Kart::new(&tuning);
        kart.boost = 96.0;
        for _ in 0..120 {
            kart.step(&track, &tuning, KartControls::default(), DT);
        }
        assert!(kart.boost < 96.0 * (-5.0f32).exp());
    }

    #[test]
    fn circuit_uses_fixed_lap_length() {
        let track = SplineTrack::grand_loop().unwrap();
        let tuning = KartTuning::circuit();
        let mut kart = Kart::new(&tuning);
        kart.speed = 41.0;
        kart.step(&track, &tuning, KartControls::default(), 0.01);
        assert!((kart.t - kart.speed * 0.01 / 410.0).abs() < 1e-4);
    }
}
