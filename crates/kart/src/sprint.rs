//! Sprint racer on a pseudo-3D segment track.
//!
//! The player holds a normalized lane position `x` (`±1` at the road edge)
//! and a distance `z`. Drifting charges a power meter that pays out as a
//! speed kick plus burst; a full burst meter triggers a timed top-speed
//! boost.

use arcade_common::config::{ConfigError, Validate, require_positive, require_unit};
use arcade_common::{EntityId, SimRng};
use arcade_input::KartControls;
use arcade_kernel::{Simulation, StateHasher};
use serde::{Deserialize, Serialize};

use crate::race::PLAYER;
use crate::segment::SegmentTrack;

/// Frame delta cap used by the sprint front-end.
pub const SPRINT_MAX_DT: f32 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SprintBotTuning {
    /// Cruise speed as a fraction of max: `base + (slot % 3) * step`.
    pub speed_base: f32,
    pub speed_step: f32,
    /// Random extra on the starting speed fraction.
    pub start_spread: f32,
    pub speed_response: f32,
    pub retarget_chance: f32,
    /// New lane targets fall in `±lane_range`.
    pub lane_range: f32,
    pub lane_response: f32,
    /// Starting lanes spread evenly over `±grid_lane`.
    pub grid_lane: f32,
    /// Distance between bots on the grid, the first one ahead of the player.
    pub grid_spacing: f32,
}

impl Default for SprintBotTuning {
    fn default() -> Self {
        Self {
            speed_base: 0.58,
            speed_step: 0.08,
            start_spread: 0.27,
            speed_response: 0.8,
            retarget_chance: 0.018,
            lane_range: 0.9,
            lane_response: 0.8,
            grid_lane: 0.8,
            grid_spacing: 620.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SprintTuning {
    pub max_speed: f32,
    /// Starting speed as a fraction of max.
    pub start_speed: f32,
    pub laps: u32,
    pub speed_response: f32,
    /// Target speed multiplier while a burst runs.
    pub burst_speed: f32,
    /// `|x|` beyond which the car is off-road.
    pub offroad_limit: f32,
    pub offroad_speed: f32,
    pub turn_rate: f32,
    pub drift_turn_factor: f32,
    /// Drift power per second with and without steering.
    pub drift_charge_steer: f32,
    pub drift_charge_straight: f32,
    /// Minimum drift power that pays out on release.
    pub release_threshold: f32,
    /// Burst gained per unit of released drift power.
    pub release_burst: f32,
    /// Speed kick per unit of drift power, as a fraction of max.
    pub release_kick: f32,
    /// Cap on speed after a kick, as a fraction of max.
    pub release_speed_cap: f32,
    pub curve_pull: f32,
    /// How far ahead the curve pull reads the track.
    pub curve_lookahead: f32,
    pub x_limit: f32,
    pub burst_bleed: f32,
    pub burst_trigger: f32,
    pub burst_duration: f32,
    pub pickup_burst: f32,
    pub pickup_reach: f32,
    pub pickup_lane: f32,
    pub contact_reach: f32,
    pub contact_lane: f32,
    pub contact_speed_factor: f32,
    pub contact_nudge: f32,
    pub bots: SprintBotTuning,
}

impl Default for SprintTuning {
    fn default() -> Self {
        Self {
            max_speed: crate::segment::SEGMENT_LENGTH * 3.5,
            start_speed: 0.4,
            laps: 3,
            speed_response: 1.25,
            burst_speed: 1.18,
            offroad_limit: 1.06,
            offroad_speed: 0.68,
            turn_rate: 2.35,
            drift_turn_factor: 1.6,
            drift_charge_steer: 0.75,
            drift_charge_straight: 0.35,
            release_threshold: 0.05,
            release_burst: 0.5,
            release_kick: 0.1,
            release_speed_cap: 1.1,
            curve_pull: 0.7,
            curve_lookahead: 900.0,
            x_limit: 1.28,
            burst_bleed: 0.025,
            burst_trigger: 0.995,
            burst_duration: 2.6,
            pickup_burst: 0.3,
            pickup_reach: 140.0,
            pickup_lane: 0.24,
            contact_reach: 120.0,
            contact_lane: 0.18,
            contact_speed_factor: 0.95,
            contact_nudge: 0.02,
            bots: SprintBotTuning::default(),
        }
    }
}

impl Validate for SprintTuning {
    fn validate(&self) -> Result<(), ConfigError> {
        require_positive("max_speed", self.max_speed)?;
        require_positive("speed_response", self.speed_response)?;
        require_positive("turn_rate", self.turn_rate)?;
        require_positive("x_limit", self.x_limit)?;
        require_positive("burst_duration", self.burst_duration)?;
        require_unit("burst_trigger", self.burst_trigger)?;
        require_unit("contact_speed_factor", self.contact_speed_factor)?;
        require_unit("bots.retarget_chance", self.bots.retarget_chance)?;
        require_positive("bots.speed_response", self.bots.speed_response)?;
        if self.laps == 0 {
            return Err(ConfigError::Invalid {
                field: "laps",
                reason: "a race needs at least one lap".into(),
            });
        }
        Ok(())
    }
}

/// What one sprint step did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SprintStep {
    /// Drift power released this frame.
    pub drift_boost: Option<f32>,
    pub laps_completed: u32,
    pub burst_started: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintKart {
    pub x: f32,
    pub z: f32,
    pub speed: f32,
    /// Lap being driven, starting at 1. Past the total once finished.
    pub lap: u32,
    pub finished: bool,
    pub drift_power: f32,
    pub drifting: bool,
    pub burst: f32,
    pub burst_timer: f32,
}

impl SprintKart {
    pub fn new(tuning: &SprintTuning) -> Self {
        Self {
            x: 0.0,
            z: 0.0,
            speed: tuning.max_speed * tuning.start_speed,
            lap: 1,
            finished: false,
            drift_power: 0.0,
            drifting: false,
            burst: 0.0,
            burst_timer: 0.0,
        }
    }

    pub fn is_bursting(&self) -> bool {
        self.burst_timer > 0.0
    }

    /// Distance covered since the start.
    pub fn progress(&self, track_length: f32) -> f32 {
        (self.lap - 1) as f32 * track_length + self.z
    }

    /// Drive one frame. Unlike the ribbon kart, drift charges even without
    /// steering, only slower.
    pub fn step(
        &mut self,
        track: &SegmentTrack,
        tuning: &SprintTuning,
        controls: KartControls,
        dt: f32,
    ) -> SprintStep {
        let mut out = SprintStep::default();
        let steer = controls.steer.clamp(-1.0, 1.0);
        let max = tuning.max_speed;

        let mut target = if self.is_bursting() {
            max * tuning.burst_speed
        } else {
            max
        };
        if self.x.abs() > tuning.offroad_limit {
            target *= tuning.offroad_speed;
        }
        self.speed += (target - self.speed) * dt * tuning.speed_response;

        let mut turn_rate = tuning.turn_rate;
        if controls.drift {
            turn_rate *= tuning.drift_turn_factor;
            let charge = if steer != 0.0 {
                tuning.drift_charge_steer
            } else {
                tuning.drift_charge_straight
            };
            self.drift_power = (self.drift_power + dt * charge).min(1.0);
        } else if self.drift_power > tuning.release_threshold {
            let power = self.drift_power;
            self.burst = (self.burst + power * tuning.release_burst).min(1.0);
            self.speed = (self.speed + max * tuning.release_kick * power)
                .min(max * tuning.release_speed_cap);
            self.drift_power = 0.0;
            out.drift_boost = Some(power);
        }
        self.drifting = controls.drift;

        let pull = track.curve_at(self.z + tuning.curve_lookahead) * tuning.curve_pull;
        let speed_ratio = self.speed / max;
        self.x += (steer * turn_rate - pull) * dt * speed_ratio;
        self.x = self.x.clamp(-tuning.x_limit, tuning.x_limit);

        self.z += self.speed * dt;
        let length = track.length();
        while self.z >= length {
            self.z -= length;
            self.lap += 1;
            out.laps_completed += 1;
            if self.lap > tuning.laps {
                self.finished = true;
            }
        }

        self.burst = (self.burst - dt * tuning.burst_bleed).max(0.0);
        if self.burst >= tuning.burst_trigger && self.burst_timer <= 0.0 {
            self.burst = 0.0;
            self.burst_timer = tuning.burst_duration;
            out.burst_started = true;
        }
        self.burst_timer = (self.burst_timer - dt).max(0.0);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintBot {
    pub id: EntityId,
    /// Grid slot; picks the cruise speed band.
    pub slot: u32,
    pub x: f32,
    pub target_x: f32,
    pub z: f32,
    pub speed: f32,
    pub lap: u32,
}

impl SprintBot {
    fn spawn(slot: u32, count: u32, tuning: &SprintTuning, rng: &mut SimRng) -> Self {
        let bots = &tuning.bots;
        let spread = slot as f32 / count.saturating_sub(1).max(1) as f32;
        let target_x = rng.range(-bots.grid_lane, bots.grid_lane);
        let speed = tuning.max_speed * (bots.speed_base + rng.next_f32() * bots.start_spread);
        Self {
            id: EntityId::new(slot + 1),
            slot,
            x: -bots.grid_lane + spread * 2.0 * bots.grid_lane,
            target_x,
            z: (slot + 1) as f32 * bots.grid_spacing,
            speed,
            lap: 1,
        }
    }

    fn step(&mut self, track_length: f32, tuning: &SprintTuning, rng: &mut SimRng, dt: f32) {
        let bots = &tuning.bots;
        let cruise = tuning.max_speed * (bots.speed_base + (self.slot % 3) as f32 * bots.speed_step);
        self.speed += (cruise - self.speed) * dt * bots.speed_response;
        self.z += self.speed * dt;
        if rng.chance(bots.retarget_chance) {
            self.target_x = rng.range(-bots.lane_range, bots.lane_range);
        }
        self.x += (self.target_x - self.x) * dt * bots.lane_response;
        while self.z >= track_length {
            self.z -= track_length;
            self.lap += 1;
        }
    }

    pub fn progress(&self, track_length: f32) -> f32 {
        (self.lap - 1) as f32 * track_length + self.z
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SprintEvent {
    DriftBoost { power: f32 },
    BurstStarted,
    PickupCollected { pickup: usize },
    Contact { bot: EntityId },
    LapCompleted { lap: u32 },
    Finished { time: f32, rank: usize },
}

/// One sprint race: the player against cruising bots.
#[derive(Debug, Clone)]
pub struct SprintRace {
    track: SegmentTrack,
    tuning: SprintTuning,
    player: SprintKart,
    bots: Vec<SprintBot>,
    taken: Vec<bool>,
    rng: SimRng,
    elapsed: f32,
    finish_time: Option<f32>,
}

impl SprintRace {
    pub fn new(track: SegmentTrack, tuning: SprintTuning, bots: u32, seed: u64) -> Self {
        let mut rng = SimRng::new(seed);
        let bots: Vec<_> = (0..bots)
            .map(|slot| SprintBot::spawn(slot, bots, &tuning, &mut rng))
            .collect();
        tracing::debug!(
            bots = bots.len(),
            length = track.length(),
            laps = tuning.laps,
            seed,
            "sprint assembled"
        );
        Self {
            player: SprintKart::new(&tuning),
            taken: vec![false; track.pickups().len()],
            track,
            tuning,
            bots,
            rng,
            elapsed: 0.0,
            finish_time: None,
        }
    }

    pub fn track(&self) -> &SegmentTrack {
        &self.track
    }

    pub fn tuning(&self) -> &SprintTuning {
        &self.tuning
    }

    pub fn player(&self) -> &SprintKart {
        &self.player
    }

    pub fn bots(&self) -> &[SprintBot] {
        &self.bots
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn finish_time(&self) -> Option<f32> {
        self.finish_time
    }

    pub fn racer_count(&self) -> usize {
        self.bots.len() + 1
    }

    /// Lap shown on the HUD, capped at the total.
    pub fn display_lap(&self) -> u32 {
        self.player.lap.min(self.tuning.laps)
    }

    pub fn is_taken(&self, pickup: usize) -> bool {
        self.taken.get(pickup).copied().unwrap_or(false)
    }

    /// Racer ids ordered by distance covered.
    pub fn standings(&self) -> Vec<(EntityId, f32)> {
        let length = self.track.length();
        let mut rows = Vec::with_capacity(self.racer_count());
        rows.push((PLAYER, self.player.progress(length)));
        rows.extend(self.bots.iter().map(|b| (b.id, b.progress(length))));
        rows.sort_by(|a, b| b.1.total_cmp(&a.1));
        rows
    }

    pub fn player_rank(&self) -> usize {
        self.standings()
            .iter()
            .position(|(id, _)| *id == PLAYER)
            .map_or(1, |i| i + 1)
    }

    pub fn autopilot(&self) -> KartControls {
        crate::autopilot::sprint_controls(&self.player, &self.track, &self.tuning)
    }

    fn collect_pickups(&mut self, events: &mut Vec<SprintEvent>) {
        let length = self.track.length();
        let p = &mut self.player;
        for &index in &self.track.segment_at(p.z).pickups {
            if self.taken[index] {
                continue;
            }
            let pickup = self.track.pickups()[index];
            let dz = (pickup.z % length - p.z).abs();
            if dz < self.tuning.pickup_reach && (pickup.lane - p.x).abs() < self.tuning.pickup_lane {
                self.taken[index] = true;
                p.burst = (p.burst + self.tuning.pickup_burst).min(1.0);
                tracing::debug!(pickup = index, burst = p.burst, "pickup collected");
                events.push(SprintEvent::PickupCollected { pickup: index });
            }
        }
    }
}

impl Simulation for SprintRace {
    type Input = KartControls;
    type Event = SprintEvent;

    fn step(&mut self, controls: &KartControls, dt: f32, events: &mut Vec<SprintEvent>) {
        if self.player.finished {
            return;
        }
        self.elapsed += dt;

        let out = self.player.step(&self.track, &self.tuning, *controls, dt);
        if let Some(power) = out.drift_boost {
            tracing::debug!(power, "drift boost");
            events.push(SprintEvent::DriftBoost { power });
        }
        for i in 0..out.laps_completed {
            let lap = self.player.lap - out.laps_completed + i;
            tracing::debug!(lap, "lap completed");
            events.push(SprintEvent::LapCompleted { lap });
        }
        if out.burst_started {
            tracing::debug!("burst started");
            events.push(SprintEvent::BurstStarted);
        }

        self.collect_pickups(events);

        let length = self.track.length();
        let half = length * 0.5;
        for bot in &mut self.bots {
            bot.step(length, &self.tuning, &mut self.rng, dt);
            let mut dz = bot.z - self.player.z;
            if dz < -half {
                dz += length;
            }
            if dz > half {
                dz -= length;
            }
            if dz.abs() < self.tuning.contact_reach
                && (bot.x - self.player.x).abs() < self.tuning.contact_lane
            {
                self.player.speed *= self.tuning.contact_speed_factor;
                self.player.x += if dz > 0.0 {
                    -self.tuning.contact_nudge
                } else {
                    self.tuning.contact_nudge
                };
                events.push(SprintEvent::Contact { bot: bot.id });
            }
        }

        if self.player.finished && self.finish_time.is_none() {
            self.finish_time = Some(self.elapsed);
            let rank = self.player_rank();
            tracing::info!(time = self.elapsed, rank, racers = self.racer_count(), "sprint finished");
            events.push(SprintEvent::Finished {
                time: self.elapsed,
                rank,
            });
        }
    }

    fn is_finished(&self) -> bool {
        self.player.finished
    }

    fn state_hash(&self) -> u64 {
        let p = &self.player;
        let mut h = StateHasher::new();
        h.f32(self.elapsed)
            .f32s(&[p.x, p.z, p.speed, p.drift_power, p.burst, p.burst_timer])
            .u32(p.lap)
            .bool(p.finished)
            .u64(self.rng.state());
        for bot in &self.bots {
            h.f32s(&[bot.x, bot.target_x, bot.z, bot.speed]).u32(bot.lap);
        }
        for &taken in &self.taken {
            h.bool(taken);
        }
        h.finish()
    }
}
