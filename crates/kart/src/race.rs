use arcade_common::config::{ConfigError, Validate};
use arcade_common::{EntityId, SimRng};
use arcade_input::KartControls;
use arcade_kernel::{Simulation, StateHasher};
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::autopilot;
use crate::bot::RivalKart;
use crate::free::FreeKart;
use crate::kart::Kart;
use crate::lap::{LapCounter, LapRule};
use crate::track::{EllipseTrack, SplineTrack, Track, TrackError};
use crate::tuning::{BotTuning, FreeKartTuning, KartTuning};

/// The player always races as id 0; bots follow from 1.
pub const PLAYER: EntityId = EntityId(0);

/// Something that happened during a race frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RaceEvent {
    DriftStarted,
    DriftBoost { amount: f32 },
    WallHit,
    LapCompleted { racer: EntityId, lap: u32 },
    Finished { racer: EntityId, time: f32, rank: usize },
}

/// Race options shared by every track. Unset fields fall back to the
/// track's preset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    pub laps: Option<u32>,
    pub bots: Option<u32>,
    pub seed: u64,
    pub kart: Option<KartTuning>,
    pub free_kart: Option<FreeKartTuning>,
    pub bot: Option<BotTuning>,
}

impl Validate for RaceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.laps == Some(0) {
            return Err(ConfigError::Invalid {
                field: "laps",
                reason: "a race needs at least one lap".into(),
            });
        }
        if let Some(kart) = &self.kart {
            kart.validate()?;
        }
        if let Some(kart) = &self.free_kart {
            kart.validate()?;
        }
        if let Some(bot) = &self.bot {
            bot.validate()?;
        }
        Ok(())
    }
}

/// The player's kart model.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerKart {
    Ribbon { kart: Kart, tuning: KartTuning },
    Free { kart: FreeKart, tuning: FreeKartTuning },
}

impl PlayerKart {
    pub fn t(&self) -> f32 {
        match self {
            Self::Ribbon { kart, .. } => kart.t,
            Self::Free { kart, .. } => kart.t,
        }
    }

    pub fn speed(&self) -> f32 {
        match self {
            Self::Ribbon { kart, .. } => kart.speed,
            Self::Free { kart, .. } => kart.speed,
        }
    }

    pub fn lateral(&self) -> f32 {
        match self {
            Self::Ribbon { kart, .. } => kart.lateral,
            Self::Free { kart, .. } => kart.lateral,
        }
    }

    pub fn is_drifting(&self) -> bool {
        match self {
            Self::Ribbon { kart, .. } => kart.drifting,
            Self::Free { kart, .. } => kart.drifting,
        }
    }

    pub fn position(&self, track: &impl Track) -> Vec2 {
        match self {
            Self::Ribbon { kart, .. } => track.world_position(kart.t, kart.lateral),
            Self::Free { kart, .. } => kart.pos,
        }
    }

    fn slow(&mut self, factor: f32) {
        match self {
            Self::Ribbon { kart, .. } => kart.slow(factor),
            Self::Free { kart, .. } => kart.slow(factor),
        }
    }

    fn hash_into(&self, h: &mut StateHasher) {
        match self {
            Self::Ribbon { kart, .. } => {
                h.u32(0)
                    .f32s(&[kart.t, kart.lateral, kart.speed, kart.steer_vel, kart.boost])
                    .bool(kart.drifting);
            }
            Self::Free { kart, .. } => {
                h.u32(1)
                    .f32s(&[
                        kart.pos.x,
                        kart.pos.y,
                        kart.heading,
                        kart.speed,
                        kart.yaw_vel,
                        kart.drift_charge,
                        kart.t,
                    ])
                    .bool(kart.drifting);
            }
        }
    }
}

/// One row of the race order.
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub racer: EntityId,
    pub laps: u32,
    pub progress: f32,
    pub finish_time: Option<f32>,
}

/// A kart race: the player against rival bots on one track.
///
/// The race stops updating once the player finishes; bots that have not
/// finished by then keep their place by progress.
#[derive(Debug, Clone)]
pub struct Race<T: Track> {
    track: T,
    player: PlayerKart,
    player_laps: LapCounter,
    bots: Vec<RivalKart>,
    bot_tuning: BotTuning,
    lap_length: f32,
    elapsed: f32,
    finished: bool,
}

impl<T: Track> Race<T> {
    /// Race with a ribbon-model player.
    pub fn ribbon(
        track: T,
        tuning: KartTuning,
        rule: LapRule,
        bot_tuning: BotTuning,
        laps: u32,
        bots: u32,
        seed: u64,
    ) -> Self {
        let lap_length = tuning.lap_length.unwrap_or_else(|| track.length());
        let player = PlayerKart::Ribbon {
            kart: Kart::new(&tuning),
            tuning,
        };
        Self::assemble(track, player, rule, bot_tuning, lap_length, laps, bots, seed)
    }

    /// Race with a free-roam player.
    pub fn free(
        track: T,
        tuning: FreeKartTuning,
        rule: LapRule,
        bot_tuning: BotTuning,
        laps: u32,
        bots: u32,
        seed: u64,
    ) -> Self {
        let lap_length = track.length();
        let player = PlayerKart::Free {
            kart: FreeKart::on_grid(&track, &tuning),
            tuning,
        };
        Self::assemble(track, player, rule, bot_tuning, lap_length, laps, bots, seed)
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        track: T,
        player: PlayerKart,
        rule: LapRule,
        bot_tuning: BotTuning,
        lap_length: f32,
        laps: u32,
        bots: u32,
        seed: u64,
    ) -> Self {
        let mut rng = SimRng::new(seed);
        let bots = RivalKart::spawn_grid(bots, 1, &bot_tuning, rule, laps, &mut rng);
        tracing::debug!(
            bots = bots.len(),
            laps,
            lap_length,
            seed,
            "race assembled"
        );
        Self {
            track,
            player,
            player_laps: LapCounter::new(rule, laps),
            bots,
            bot_tuning,
            lap_length,
            elapsed: 0.0,
            finished: false,
        }
    }

    pub fn track(&self) -> &T {
        &self.track
    }

    pub fn player(&self) -> &PlayerKart {
        &self.player
    }

    pub fn player_laps(&self) -> &LapCounter {
        &self.player_laps
    }

    pub fn bots(&self) -> &[RivalKart] {
        &self.bots
    }

    /// Seconds since the start, frozen once the player finishes.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn lap_length(&self) -> f32 {
        self.lap_length
    }

    pub fn racer_count(&self) -> usize {
        self.bots.len() + 1
    }

    pub fn player_position(&self) -> Vec2 {
        self.player.position(&self.track)
    }

    /// Finished racers by finish time, then everyone else by progress.
    pub fn standings(&self) -> Vec<Standing> {
        let mut rows = Vec::with_capacity(self.racer_count());
        rows.push(Standing {
            racer: PLAYER,
            laps: self.player_laps.completed(),
            progress: self.player_laps.progress(self.player.t()),
            finish_time: self.player_laps.finish_time(),
        });
        rows.extend(self.bots.iter().map(|bot| Standing {
            racer: bot.id,
            laps: bot.laps.completed(),
            progress: bot.progress(),
            finish_time: bot.laps.finish_time(),
        }));
        rows.sort_by(|a, b| match (a.finish_time, b.finish_time) {
            (Some(ta), Some(tb)) => ta.total_cmp(&tb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => b.progress.total_cmp(&a.progress),
        });
        rows
    }

    /// 1-based rank of `racer`.
    pub fn rank_of(&self, racer: EntityId) -> Option<usize> {
        self.standings()
            .iter()
            .position(|s| s.racer == racer)
            .map(|i| i + 1)
    }

    pub fn player_rank(&self) -> usize {
        self.rank_of(PLAYER).unwrap_or(1)
    }

    /// Controls a scripted driver would give this frame.
    pub fn autopilot(&self) -> KartControls {
        match &self.player {
            PlayerKart::Ribbon { kart, tuning } => {
                autopilot::ribbon_controls(kart, Kart::wall(&self.track, tuning))
            }
            PlayerKart::Free { kart, .. } => autopilot::free_controls(kart, &self.track),
        }
    }
}

impl Race<EllipseTrack> {
    /// The 2D oval: one lap, start-window lap detection.
    pub fn oval(config: &RaceConfig) -> Self {
        Self::ribbon(
            EllipseTrack::oval(),
            config.kart.clone().unwrap_or_else(KartTuning::oval),
            LapRule::start_window(),
            config.bot.clone().unwrap_or_else(BotTuning::oval),
            config.laps.unwrap_or(1),
            config.bots.unwrap_or(0),
            config.seed,
        )
    }
}

impl Race<SplineTrack> {
    /// The ribbon circuit: one lap against three weaving bots.
    pub fn circuit(config: &RaceConfig) -> Result<Self, TrackError> {
        Ok(Self::ribbon(
            SplineTrack::grand_loop()?,
            config.kart.clone().unwrap_or_else(KartTuning::circuit),
            LapRule::circuit(),
            config.bot.clone().unwrap_or_else(BotTuning::circuit),
            config.laps.unwrap_or(1),
            config.bots.unwrap_or(3),
            config.seed,
        ))
    }

    /// The free-roam battle: three laps against lane-holding bots.
    pub fn battle(config: &RaceConfig) -> Result<Self, TrackError> {
        Ok(Self::free(
            SplineTrack::battle_loop()?,
            config.free_kart.clone().unwrap_or_default(),
            LapRule::battle(),
            config.bot.clone().unwrap_or_else(BotTuning::battle),
            config.laps.unwrap_or(3),
            config.bots.unwrap_or(5),
            config.seed,
        ))
    }
}

impl<T: Track> Simulation for Race<T> {
    type Input = KartControls;
    type Event = RaceEvent;

    fn step(&mut self, controls: &KartControls, dt: f32, events: &mut Vec<RaceEvent>) {
        if self.finished {
            return;
        }
        self.elapsed += dt;

        let (drift_started, drift_boost, wall_hit, prev_t) = match &mut self.player {
            PlayerKart::Ribbon { kart, tuning } => {
                let out = kart.step(&self.track, tuning, *controls, dt);
                (out.drift_started, out.drift_boost, out.wall_hit, out.prev_t)
            }
            PlayerKart::Free { kart, tuning } => {
                let out = kart.step(&self.track, tuning, *controls, dt);
                (out.drift_started, out.drift_boost, out.wall_hit, out.prev_t)
            }
        };
        if drift_started {
            events.push(RaceEvent::DriftStarted);
        }
        if let Some(amount) = drift_boost {
            tracing::debug!(amount, "drift boost");
            events.push(RaceEvent::DriftBoost { amount });
        }
        if wall_hit {
            events.push(RaceEvent::WallHit);
        }

        let mut newly_finished = Vec::new();
        if self
            .player_laps
            .update(prev_t, self.player.t(), dt, self.elapsed)
        {
            let lap = self.player_laps.completed();
            tracing::debug!(racer = %PLAYER, lap, "lap completed");
            events.push(RaceEvent::LapCompleted { racer: PLAYER, lap });
            if self.player_laps.is_finished() {
                newly_finished.push(PLAYER);
            }
        }

        let player_pos = self.player.position(&self.track);
        let contact_sq = self.bot_tuning.contact_radius * self.bot_tuning.contact_radius;
        for bot in &mut self.bots {
            if bot.step(&self.track, &self.bot_tuning, self.lap_length, dt, self.elapsed) {
                let lap = bot.laps.completed();
                tracing::debug!(racer = %bot.id, lap, "lap completed");
                events.push(RaceEvent::LapCompleted { racer: bot.id, lap });
                if bot.laps.is_finished() {
                    newly_finished.push(bot.id);
                }
            }
            if bot.position(&self.track).distance_squared(player_pos) < contact_sq {
                self.player.slow(self.bot_tuning.contact_speed_factor);
            }
        }

        if newly_finished.is_empty() {
            return;
        }
        let standings = self.standings();
        for racer in newly_finished {
            let Some(row) = standings.iter().position(|s| s.racer == racer) else {
                continue;
            };
            let time = standings[row].finish_time.unwrap_or(self.elapsed);
            events.push(RaceEvent::Finished {
                racer,
                time,
                rank: row + 1,
            });
            if racer == PLAYER {
                self.finished = true;
                tracing::info!(time, rank = row + 1, racers = standings.len(), "race finished");
            } else {
                tracing::debug!(racer = %racer, time, rank = row + 1, "bot finished");
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn state_hash(&self) -> u64 {
        let mut h = StateHasher::new();
        h.f32(self.elapsed).bool(self.finished);
        self.player.hash_into(&mut h);
        h.u32(self.player_laps.completed());
        for bot in &self.bots {
            h.u32(bot.id.0)
                .f32s(&[bot.t, bot.lateral, bot.speed, bot.target_speed])
                .u32(bot.laps.completed())
                .u64(bot.rng_state());
        }
        h.finish()
    }
}
