use arcade_common::math::{TAU, wrap01};
use arcade_common::{EntityId, SimRng};
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::lap::{LapCounter, LapRule};
use crate::track::Track;
use crate::tuning::{BotTuning, LanePattern, SpeedRange};

fn roll(rng: &mut SimRng, range: SpeedRange) -> f32 {
    range.min + rng.next_f32() * range.spread
}

/// Computer-driven kart that follows the centre line at its own pace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RivalKart {
    pub id: EntityId,
    pub t: f32,
    pub lateral: f32,
    pub speed: f32,
    pub target_speed: f32,
    /// Fixed lane for staggered bots, zero for weaving ones.
    pub lane: f32,
    pub laps: LapCounter,
    rng: SimRng,
}

impl RivalKart {
    /// Line up `count` bots behind the start, ids starting at `first_id`.
    pub fn spawn_grid(
        count: u32,
        first_id: u32,
        tuning: &BotTuning,
        rule: LapRule,
        laps_total: u32,
        rng: &mut SimRng,
    ) -> Vec<Self> {
        (0..count)
            .map(|i| {
                let mut rng = rng.fork();
                let speed = tuning.base_speed + i as f32 * tuning.speed_step;
                let target_speed = match tuning.cruise {
                    Some(range) => roll(&mut rng, range),
                    None => speed,
                };
                let lane = match tuning.lanes {
                    LanePattern::Weave { .. } => 0.0,
                    LanePattern::Staggered { base, step } => {
                        let side = if i % 2 == 1 { 1.0 } else { -1.0 };
                        side * (base + (i % 3) as f32 * step)
                    }
                };
                Self {
                    id: EntityId::new(first_id + i),
                    t: wrap01(tuning.grid_start + i as f32 * tuning.grid_spacing),
                    lateral: lane,
                    speed,
                    target_speed,
                    lane,
                    laps: LapCounter::new(rule, laps_total),
                    rng,
                }
            })
            .collect()
    }

    /// Advance one frame. Returns true when the bot completed a lap.
    pub fn step(
        &mut self,
        track: &impl Track,
        tuning: &BotTuning,
        lap_length: f32,
        dt: f32,
        race_time: f32,
    ) -> bool {
        if self.laps.is_finished() {
            return false;
        }
        let prev_t = self.t;

        self.speed += (self.target_speed - self.speed) * dt * tuning.speed_response;
        let wave = (race_time * 1.2 + self.speed).sin() * tuning.speed_wave;
        self.t = wrap01(self.t + (self.speed + wave) * dt / lap_length);

        if let Some(range) = tuning.retarget {
            if self.rng.chance(tuning.retarget_chance) {
                self.target_speed = roll(&mut self.rng, range);
            }
        }

        let ideal = match tuning.lanes {
            LanePattern::Weave { amplitude } => (self.t * TAU + self.speed).sin() * amplitude,
            LanePattern::Staggered { .. } => self.lane,
        };
        let limit = (track.half_width() - tuning.edge_margin).max(0.0);
        self.lateral += (ideal - self.lateral) * dt * tuning.lane_response;
        self.lateral = self.lateral.clamp(-limit, limit);

        self.laps.update(prev_t, self.t, dt, race_time)
    }

    pub fn position(&self, track: &impl Track) -> Vec2 {
        track.world_position(self.t, self.lateral)
    }

    pub fn progress(&self) -> f32 {
        self.laps.progress(self.t)
    }

    pub fn rng_state(&self) -> u64 {
        self.rng.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::SplineTrack;

    #[test]
    fn grid_matches_presets() {
        let mut rng = SimRng::new(5);
        let bots = RivalKart::spawn_grid(3, 1, &BotTuning::circuit(), LapRule::circuit(), 1, &mut rng);
        assert_eq!(bots.len(), 3);
        assert_eq!(bots[0].id, EntityId(1));
        assert!((bots[2].t - 0.87).abs() < 1e-5);
        assert!((bots[1].speed - 32.85).abs() < 1e-4);
        assert_eq!(bots[1].target_speed, bots[1].speed);

        let bots = RivalKart::spawn_grid(4, 1, &BotTuning::battle(), LapRule::battle(), 3, &mut rng);
        assert!((bots[0].lane + 1.6).abs() < 1e-5);
        assert!((bots[1].lane - 2.7).abs() < 1e-5);
        assert!((bots[2].lane + 3.8).abs() < 1e-5);
        for bot in &bots {
            assert!((26.0..32.0).contains(&bot.target_speed));
        }
    }

    #[test]
    fn lateral_stays_inside_margin() {
        let track = SplineTrack::grand_loop().unwrap();
        let tuning = BotTuning {
            lanes: LanePattern::Weave { amplitude: 40.0 },
            ..BotTuning::circuit()
        };
        let mut rng = SimRng::new(1);
        let mut bots = RivalKart::spawn_grid(2, 1, &tuning, LapRule::circuit(), 3, &mut rng);
        for frame in 0..2000 {
            for bot in &mut bots {
                bot.step(&track, &tuning, 410.0, 1.0 / 60.0, frame as f32 / 60.0);
                assert!(bot.lateral.abs() <= track.half_width() - 1.0 + 1e-5);
            }
        }
    }

    #[test]
    fn same_seed_same_bots() {
        let track = SplineTrack::battle_loop().unwrap();
        let tuning = BotTuning::battle();
        let run = |seed| {
            let mut rng = SimRng::new(seed);
            let mut bots = RivalKart::spawn_grid(3, 1, &tuning, LapRule::battle(), 3, &mut rng);
            for frame in 0..600 {
                for bot in &mut bots {
                    bot.step(&track, &tuning, track.length(), 1.0 / 60.0, frame as f32 / 60.0);
                }
            }
            bots
        };
        assert_eq!(run(9), run(9));
        assert_ne!(run(9), run(10));
    }

    #[test]
    fn bots_complete_laps() {
        let track = SplineTrack::battle_loop().unwrap();
        let tuning = BotTuning::battle();
        let mut rng = SimRng::new(2);
        let mut bots = RivalKart::spawn_grid(1, 1, &tuning, LapRule::battle(), 3, &mut rng);
        let bot = &mut bots[0];
        let mut laps = 0;
        for frame in 0..(60 * 40) {
            if bot.step(&track, &tuning, track.length(), 1.0 / 60.0, frame as f32 / 60.0) {
                laps += 1;
            }
        }
        assert!(laps >= 2, "laps {laps}");
        assert_eq!(laps, bot.laps.completed());
    }
}
