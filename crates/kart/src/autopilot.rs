//! Scripted drivers for headless runs and demos.

use arcade_common::math::wrap_pi;
use arcade_input::KartControls;

use crate::free::{FreeKart, heading_of};
use crate::kart::Kart;
use crate::segment::SegmentTrack;
use crate::sprint::{SprintKart, SprintTuning};
use crate::track::Track;

/// Fraction of the wall distance the ribbon autopilot tolerates before
/// steering back.
const RIBBON_DEADBAND: f32 = 0.25;
/// World units ahead of the kart the free-roam autopilot aims at.
const LOOK_AHEAD: f32 = 9.0;
/// Steering per radian of heading error.
const HEADING_GAIN: f32 = 2.0;
/// Lane offset the sprint autopilot tolerates.
const SPRINT_DEADBAND: f32 = 0.3;
/// Curves sharper than this are taken drifting.
const SPRINT_DRIFT_CURVE: f32 = 0.5;

/// Hold the ribbon kart near the centre line.
pub fn ribbon_controls(kart: &Kart, wall: f32) -> KartControls {
    let band = wall * RIBBON_DEADBAND;
    let steer = if kart.lateral > band {
        -1.0
    } else if kart.lateral < -band {
        1.0
    } else {
        0.0
    };
    KartControls::new(steer, false)
}

/// Chase a point a little way up the track. Drifts through sharp turns.
pub fn free_controls(kart: &FreeKart, track: &impl Track) -> KartControls {
    let target_t = track.advance(kart.t, LOOK_AHEAD);
    let to_target = track.point(target_t) - kart.pos;
    if to_target.length_squared() < 1e-6 {
        return KartControls::default();
    }
    let error = wrap_pi(heading_of(to_target) - kart.heading);
    KartControls::new(error * HEADING_GAIN, error.abs() > 0.6)
}

/// Stay near the middle of the road and drift through the sharp bends.
pub fn sprint_controls(kart: &SprintKart, track: &SegmentTrack, tuning: &SprintTuning) -> KartControls {
    let steer = if kart.x > SPRINT_DEADBAND {
        -1.0
    } else if kart.x < -SPRINT_DEADBAND {
        1.0
    } else {
        0.0
    };
    let curve = track.curve_at(kart.z + tuning.curve_lookahead);
    KartControls::new(steer, curve.abs() > SPRINT_DRIFT_CURVE)
}
