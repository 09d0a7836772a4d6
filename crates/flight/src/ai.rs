//! Bot pilots: target choice, lead aiming, obstacle avoidance and the
//! conversion of a desired heading into stick commands.

use arcade_common::EntityId;
use arcade_input::FlightControls;
use glam::Vec3;

use crate::aircraft::Aircraft;
use crate::arena::Arena;
use crate::tuning::{AiTuning, FlightTuning};

/// Nearest living aircraft on another team.
pub fn pick_target(me: &Aircraft, all: &[Aircraft]) -> Option<usize> {
    all.iter()
        .enumerate()
        .filter(|(_, other)| other.alive && other.team != me.team)
        .min_by(|(_, a), (_, b)| {
            let da = a.position().distance_squared(me.position());
            let db = b.position().distance_squared(me.position());
            da.total_cmp(&db)
        })
        .map(|(i, _)| i)
}

/// Where to point so a bullet fired now meets a target holding its
/// velocity. Each iteration refines the flight time.
pub fn lead_point(
    shooter: Vec3,
    shooter_vel: Vec3,
    target: Vec3,
    target_vel: Vec3,
    tuning: &FlightTuning,
    iterations: u32,
) -> Vec3 {
    let bullet_speed = tuning.bullet_speed + shooter_vel.length() * tuning.bullet_inherit;
    let mut aim = target;
    for _ in 0..iterations {
        let time = (aim - shooter).length() / bullet_speed;
        aim = target + target_vel * time;
    }
    aim
}

/// Push away from boxes near a few points ahead of the nose and from the
/// floor, ceiling and walls. Zero when the way ahead is clear.
pub fn avoidance(pos: Vec3, forward: Vec3, arena: &Arena, ai: &AiTuning) -> Vec3 {
    let mut push = Vec3::ZERO;
    for &distance in &ai.probes {
        let probe = pos + forward * distance;
        for (_, aabb) in arena.nearby(probe, ai.probe_margin) {
            let away = probe - aabb.closest_point(probe);
            let gap = away.length();
            if gap >= ai.probe_margin {
                continue;
            }
            let dir = if gap > 1e-3 {
                away / gap
            } else {
                // Probe inside the box: go around it sideways.
                let out = probe - aabb.center();
                Vec3::new(out.x, 0.0, out.z).normalize_or(Vec3::Y)
            };
            push += dir * (1.0 - gap / ai.probe_margin);
        }

        let above_floor = probe.y - arena.floor();
        if above_floor < ai.floor_margin {
            push += Vec3::Y * (1.0 - above_floor.max(0.0) / ai.floor_margin);
        }
        let below_ceiling = arena.ceiling() - probe.y;
        if below_ceiling < ai.ceiling_margin {
            push -= Vec3::Y * (1.0 - below_ceiling.max(0.0) / ai.ceiling_margin);
        }
        let half = arena.half_size();
        for (coord, axis) in [(probe.x, Vec3::X), (probe.z, Vec3::Z)] {
            let to_wall = half - coord.abs();
            if to_wall < ai.wall_margin {
                push -= axis * coord.signum() * (1.0 - to_wall.max(0.0) / ai.wall_margin);
            }
        }
    }
    push
}

/// Stick targets that turn `aircraft` toward `desired`.
///
/// Pitch and yaw follow the desired direction in the local frame; roll
/// banks into horizontal turns up to `max_bank`.
pub fn steer_toward(aircraft: &Aircraft, desired: Vec3, ai: &AiTuning) -> (f32, f32, f32) {
    let local = aircraft.transform.to_local(desired.normalize_or(aircraft.forward()));
    let ahead = local.x.max(0.05);
    let pitch = (local.y.atan2(ahead) * ai.pitch_gain).clamp(-1.0, 1.0);
    let yaw = (local.z.atan2(ahead) * ai.yaw_gain).clamp(-1.0, 1.0);

    let bank_target = (local.z.atan2(ahead)).clamp(-ai.max_bank, ai.max_bank);
    let right = aircraft.transform.right();
    // A dropped right wing points the local +Z below the horizon.
    let bank = (-right.y).clamp(-1.0, 1.0).asin();
    let roll = ((bank_target - bank) * ai.roll_gain).clamp(-1.0, 1.0);
    (roll, pitch, yaw)
}

/// A bot's decision for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BotCommand {
    pub controls: FlightControls,
    pub target: Option<EntityId>,
}

/// Decide controls for `all[me]`.
pub fn think(me: usize, all: &[Aircraft], arena: &Arena, tuning: &FlightTuning) -> BotCommand {
    let ai = &tuning.ai;
    let pilot = &all[me];
    let pos = pilot.position();
    let forward = pilot.forward();

    let target = pick_target(pilot, all).map(|i| &all[i]);
    let (to_target, aim_dir, range) = match target {
        Some(t) => {
            let aim = lead_point(pos, pilot.velocity, t.position(), t.velocity, tuning, ai.lead_iterations);
            let to_aim = aim - pos;
            (to_aim, to_aim.normalize_or(forward), to_aim.length())
        }
        // Nobody left: circle the arena centre at cruise height.
        None => {
            let centre = Vec3::new(0.0, (arena.floor() + arena.ceiling()) * 0.5, 0.0);
            (centre - pos, forward, f32::INFINITY)
        }
    };

    let avoid = avoidance(pos, forward, arena, ai);
    let desired = (to_target.normalize_or(forward) + avoid * ai.avoid_weight).normalize_or(forward);
    let (roll, pitch, yaw) = steer_toward(pilot, desired, ai);

    let aligned = forward.dot(aim_dir) >= ai.aim_cos;
    let fire = target.is_some() && aligned && range <= ai.fire_range && pilot.can_fire();
    let boost = range > ai.boost_range && pilot.boost_energy > 0.5;

    BotCommand {
        controls: FlightControls {
            roll,
            pitch,
            yaw,
            throttle: ai.throttle,
            fire,
            boost,
        },
        target: target.map(|t| t.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircraft::Team;
    use crate::arena::Aabb;
    use glam::Quat;

    fn craft(id: u32, team: Team, pos: Vec3) -> Aircraft {
        Aircraft::new(EntityId(id), team, pos, Quat::IDENTITY, &FlightTuning::default(), None)
    }

    fn open() -> Arena {
        Arena::new(2400.0, 0.0, 1600.0, Vec::new()).unwrap()
    }

    #[test]
    fn picks_nearest_living_enemy() {
        let me = craft(0, Team::Blue, Vec3::new(0.0, 500.0, 0.0));
        let mut far = craft(1, Team::Red, Vec3::new(900.0, 500.0, 0.0));
        let near = craft(2, Team::Red, Vec3::new(300.0, 500.0, 0.0));
        let friend = craft(3, Team::Blue, Vec3::new(10.0, 500.0, 0.0));
        let all = vec![me.clone(), far.clone(), near.clone(), friend];
        assert_eq!(pick_target(&me, &all), Some(2));

        let mut dead_near = near;
        dead_near.alive = false;
        far.alive = true;
        let all = vec![me.clone(), far, dead_near];
        assert_eq!(pick_target(&me, &all), Some(1));
    }

    #[test]
    fn lead_point_sits_ahead_of_a_crossing_target() {
        let tuning = FlightTuning::default();
        let aim = lead_point(
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::new(900.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 200.0),
            &tuning,
            2,
        );
        // One second of flight, refined once more.
        assert!(aim.z > 190.0 && aim.z < 210.0);
        assert_eq!(aim.x, 900.0);
    }

    #[test]
    fn avoidance_lifts_off_the_floor() {
        let ai = AiTuning::default();
        let push = avoidance(Vec3::new(0.0, 60.0, 0.0), Vec3::X, &open(), &ai);
        assert!(push.y > 0.0);
        let push = avoidance(Vec3::new(0.0, 1500.0, 0.0), Vec3::X, &open(), &ai);
        assert!(push.y < 0.0);
        let clear = avoidance(Vec3::new(0.0, 800.0, 0.0), Vec3::X, &open(), &ai);
        assert_eq!(clear, Vec3::ZERO);
    }

    #[test]
    fn avoidance_turns_away_from_walls_and_boxes() {
        let ai = AiTuning::default();
        let push = avoidance(Vec3::new(2000.0, 800.0, 0.0), Vec3::X, &open(), &ai);
        assert!(push.x < 0.0);

        let tower = Aabb::from_center(Vec3::new(200.0, 400.0, 60.0), Vec3::new(40.0, 400.0, 40.0));
        let arena = Arena::new(2400.0, 0.0, 1600.0, vec![tower]).unwrap();
        let push = avoidance(Vec3::new(0.0, 500.0, 0.0), Vec3::X, &arena, &ai);
        assert!(push.z < 0.0);
    }

    #[test]
    fn steering_signs_follow_local_frame() {
        let ai = AiTuning::default();
        let a = craft(0, Team::Blue, Vec3::new(0.0, 500.0, 0.0));
        let (_, pitch, yaw) = steer_toward(&a, Vec3::new(1.0, 0.5, 0.0), &ai);
        assert!(pitch > 0.0);
        assert_eq!(yaw, 0.0);
        let (roll, _, yaw) = steer_toward(&a, Vec3::new(1.0, 0.0, 0.5), &ai);
        assert!(yaw > 0.0);
        assert!(roll > 0.0);
    }

    #[test]
    fn fires_only_when_aligned_and_in_range() {
        let tuning = FlightTuning::default();
        let arena = open();
        let me = craft(0, Team::Blue, Vec3::new(0.0, 800.0, 0.0));
        let mut ahead = craft(1, Team::Red, Vec3::new(600.0, 800.0, 0.0));
        ahead.velocity = Vec3::ZERO;
        let cmd = think(0, &[me.clone(), ahead.clone()], &arena, &tuning);
        assert!(cmd.controls.fire);
        assert_eq!(cmd.target, Some(EntityId(1)));

        let mut far = ahead.clone();
        far.transform.position.x = 1500.0;
        assert!(!think(0, &[me.clone(), far], &arena, &tuning).controls.fire);

        let mut off_axis = ahead;
        off_axis.transform.position = Vec3::new(300.0, 800.0, 300.0);
        assert!(!think(0, &[me, off_axis], &arena, &tuning).controls.fire);
    }
}
