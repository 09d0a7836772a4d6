use std::f32::consts::PI;

use arcade_common::config::{ConfigError, Validate};
use arcade_common::{EntityId, SimRng};
use arcade_input::FlightControls;
use arcade_kernel::{Simulation, StateHasher};
use glam::Quat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ai::{self, BotCommand};
use crate::aircraft::{Aircraft, Team};
use crate::arena::{Arena, ArenaLayout};
use crate::combat::{Bullet, BulletFate, BulletPool, Effect, update_effects};
use crate::tuning::FlightTuning;

/// The player always flies as id 0, first on team Blue.
pub const PLAYER: EntityId = EntityId(0);

/// Most aircraft a single arena holds.
pub const MAX_AIRCRAFT: u32 = 16;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("a dogfight needs at least one opponent")]
    NoOpponents,

    #[error("{requested} aircraft requested, an arena holds at most {max}")]
    TooManyAircraft { requested: u32, max: u32 },

    #[error("invalid arena: half size {half_size}, floor {floor}, ceiling {ceiling}")]
    InvalidArena { half_size: f32, floor: f32, ceiling: f32 },

    #[error("unknown arena layout {0:?}")]
    UnknownLayout(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Red opponents.
    pub bots: u32,
    /// Blue bots flying with the player.
    pub wingmen: u32,
    pub layout: ArenaLayout,
    pub seed: u64,
    pub tuning: Option<FlightTuning>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            bots: 3,
            wingmen: 0,
            layout: ArenaLayout::default(),
            seed: 0,
            tuning: None,
        }
    }
}

impl Validate for MatchConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match &self.tuning {
            Some(tuning) => tuning.validate(),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    Victory,
    Defeat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    Fired { shooter: EntityId },
    Hit { shooter: EntityId, target: EntityId, damage: f32, hp: f32 },
    /// `by` is `None` when the aircraft flew into something.
    Destroyed { target: EntityId, by: Option<EntityId> },
    /// First frame of a contact, when its damage lands. A plane pinned
    /// against a surface does not repeat it.
    Collided { aircraft: EntityId },
    MatchOver { outcome: MatchOutcome },
}

/// A match: the player and optional wingmen against a team of bots.
///
/// Aircraft ids equal their index, so `aircraft()[id.index()]` is always
/// the aircraft with that id.
#[derive(Debug, Clone)]
pub struct Dogfight {
    arena: Arena,
    tuning: FlightTuning,
    aircraft: Vec<Aircraft>,
    bullets: BulletPool,
    effects: Vec<Effect>,
    elapsed: f32,
    kills: u32,
    outcome: Option<MatchOutcome>,
}

impl Dogfight {
    pub fn new(config: &MatchConfig) -> Result<Self, MatchError> {
        config.validate()?;
        check_roster(config.wingmen, config.bots)?;
        let tuning = config.tuning.clone().unwrap_or_default();
        let mut rng = SimRng::new(config.seed);
        let arena = Arena::generate(config.layout, &mut rng);
        Ok(Self::assemble(arena, tuning, config.wingmen, config.bots))
    }

    /// A match in a hand-built arena.
    pub fn in_arena(arena: Arena, tuning: FlightTuning, wingmen: u32, bots: u32) -> Result<Self, MatchError> {
        tuning.validate()?;
        check_roster(wingmen, bots)?;
        Ok(Self::assemble(arena, tuning, wingmen, bots))
    }

    fn assemble(arena: Arena, tuning: FlightTuning, wingmen: u32, bots: u32) -> Self {
        let blue = 1 + wingmen;
        let mut aircraft = Vec::with_capacity((blue + bots) as usize);
        for slot in 0..blue {
            let id = EntityId(aircraft.len() as u32);
            let ammo = (slot == 0).then_some(tuning.player_ammo);
            let pos = arena.spawn_point(false, slot, blue);
            aircraft.push(Aircraft::new(id, Team::Blue, pos, Quat::IDENTITY, &tuning, ammo));
        }
        // Red starts on +X facing back toward Blue.
        let facing_blue = Quat::from_rotation_y(PI);
        for slot in 0..bots {
            let id = EntityId(aircraft.len() as u32);
            let pos = arena.spawn_point(true, slot, bots);
            aircraft.push(Aircraft::new(id, Team::Red, pos, facing_blue, &tuning, None));
        }
        tracing::debug!(blue, red = bots, obstacles = arena.obstacles().len(), "dogfight assembled");
        Self {
            bullets: BulletPool::new(tuning.bullet_capacity),
            arena,
            tuning,
            aircraft,
            effects: Vec::new(),
            elapsed: 0.0,
            kills: 0,
            outcome: None,
        }
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn tuning(&self) -> &FlightTuning {
        &self.tuning
    }

    pub fn aircraft(&self) -> &[Aircraft] {
        &self.aircraft
    }

    pub fn player(&self) -> &Aircraft {
        &self.aircraft[PLAYER.index()]
    }

    pub fn bullets(&self) -> &BulletPool {
        &self.bullets
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Enemies the player shot down.
    pub fn kills(&self) -> u32 {
        self.kills
    }

    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    pub fn alive(&self, team: Team) -> usize {
        self.aircraft
            .iter()
            .filter(|a| a.alive && a.team == team)
            .count()
    }

    /// Controls the bot pilot would choose for the player, for headless runs.
    pub fn autopilot(&self) -> FlightControls {
        ai::think(PLAYER.index(), &self.aircraft, &self.arena, &self.tuning).controls
    }

    fn fly(&mut self, player: &FlightControls, dt: f32, events: &mut Vec<CombatEvent>) {
        // Every bot decides against the same snapshot before anyone moves.
        let commands: Vec<Option<BotCommand>> = (0..self.aircraft.len())
            .map(|i| {
                (i != PLAYER.index() && self.aircraft[i].alive)
                    .then(|| ai::think(i, &self.aircraft, &self.arena, &self.tuning))
            })
            .collect();

        for (plane, command) in self.aircraft.iter_mut().zip(commands) {
            if !plane.alive {
                continue;
            }
            let controls = match command {
                Some(cmd) => {
                    plane.target = cmd.target;
                    cmd.controls
                }
                None => *player,
            };
            plane.apply_controls(&controls, &self.tuning, dt);
            plane.tick_cooldown(dt);

            if plane.integrate(&self.arena, &self.tuning, dt).is_some() {
                events.push(CombatEvent::Collided { aircraft: plane.id });
                if !plane.alive {
                    tracing::info!(aircraft = %plane.id, "crashed");
                    events.push(CombatEvent::Destroyed {
                        target: plane.id,
                        by: None,
                    });
                    continue;
                }
            }

            if !controls.fire {
                continue;
            }
            if let Some((position, velocity)) = plane.fire(&self.tuning) {
                let spawned = self.bullets.spawn(Bullet {
                    owner: plane.id,
                    team: plane.team,
                    position,
                    velocity,
                    life: self.tuning.bullet_life,
                });
                if spawned {
                    events.push(CombatEvent::Fired { shooter: plane.id });
                }
            }
        }
    }

    fn resolve_bullets(&mut self, dt: f32, events: &mut Vec<CombatEvent>) {
        let removed = self.bullets.update(
            dt,
            &self.arena,
            &self.aircraft,
            self.tuning.bullet_radius,
            self.tuning.hit_radius,
        );
        for (bullet, fate) in removed {
            match fate {
                BulletFate::Hit { target } => {
                    self.effects.push(Effect {
                        position: bullet.position,
                        life: self.tuning.effect_life,
                        team: bullet.team,
                    });
                    let Some(plane) = self.aircraft.get_mut(target.index()) else {
                        continue;
                    };
                    // A second bullet in the same frame finds the wreck.
                    if !plane.alive {
                        continue;
                    }
                    let destroyed = plane.damage(self.tuning.bullet_damage);
                    tracing::debug!(shooter = %bullet.owner, target = %target, hp = plane.hp, "hit");
                    events.push(CombatEvent::Hit {
                        shooter: bullet.owner,
                        target,
                        damage: self.tuning.bullet_damage,
                        hp: plane.hp,
                    });
                    if destroyed {
                        tracing::info!(target = %target, by = %bullet.owner, "shot down");
                        events.push(CombatEvent::Destroyed {
                            target,
                            by: Some(bullet.owner),
                        });
                        if bullet.owner == PLAYER {
                            self.kills += 1;
                        }
                    }
                }
                BulletFate::Obstacle => self.effects.push(Effect {
                    position: bullet.position,
                    life: self.tuning.effect_life,
                    team: bullet.team,
                }),
                BulletFate::Expired | BulletFate::OutOfBounds => {}
            }
        }
    }

    fn decide(&self) -> Option<MatchOutcome> {
        if !self.player().alive {
            Some(MatchOutcome::Defeat)
        } else if self.alive(Team::Red) == 0 {
            Some(MatchOutcome::Victory)
        } else {
            None
        }
    }
}

fn check_roster(wingmen: u32, bots: u32) -> Result<(), MatchError> {
    if bots == 0 {
        return Err(MatchError::NoOpponents);
    }
    let requested = wingmen.saturating_add(bots).saturating_add(1);
    if requested > MAX_AIRCRAFT {
        return Err(MatchError::TooManyAircraft {
            requested,
            max: MAX_AIRCRAFT,
        });
    }
    Ok(())
}

impl Simulation for Dogfight {
    type Input = FlightControls;
    type Event = CombatEvent;

    fn step(&mut self, controls: &FlightControls, dt: f32, events: &mut Vec<CombatEvent>) {
        if self.outcome.is_some() {
            return;
        }
        self.elapsed += dt;
        self.fly(controls, dt, events);
        self.resolve_bullets(dt, events);
        update_effects(&mut self.effects, dt);
        tracing::trace!(bullets = self.bullets.len(), effects = self.effects.len(), "dogfight frame");

        if let Some(outcome) = self.decide() {
            tracing::info!(?outcome, time = self.elapsed, kills = self.kills, "match over");
            self.outcome = Some(outcome);
            events.push(CombatEvent::MatchOver { outcome });
        }
    }

    fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    fn state_hash(&self) -> u64 {
        let mut h = StateHasher::new();
        let outcome = match self.outcome {
            None => 0,
            Some(MatchOutcome::Victory) => 1,
            Some(MatchOutcome::Defeat) => 2,
        };
        h.f32(self.elapsed).u32(outcome).u32(self.kills);
        for o in self.arena.obstacles() {
            h.f32s(&[o.min.x, o.min.y, o.min.z, o.max.x, o.max.y, o.max.z]);
        }
        for a in &self.aircraft {
            let p = a.transform.position;
            let r = a.transform.rotation;
            h.u32(a.id.0)
                .f32s(&[p.x, p.y, p.z, r.x, r.y, r.z, r.w])
                .f32s(&[a.velocity.x, a.velocity.y, a.velocity.z, a.speed])
                .f32s(&[a.roll, a.pitch, a.yaw, a.hp, a.cooldown, a.boost_energy])
                .u32(a.ammo.unwrap_or(u32::MAX))
                .bool(a.alive)
                .bool(a.colliding);
        }
        h.u64(self.bullets.len() as u64);
        for b in self.bullets.iter() {
            h.u32(b.owner.0).f32s(&[
                b.position.x,
                b.position.y,
                b.position.z,
                b.velocity.x,
                b.velocity.y,
                b.velocity.z,
                b.life,
            ]);
        }
        h.u64(self.effects.len() as u64);
        h.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    const DT: f32 = 1.0 / 60.0;

    fn open(bots: u32) -> Dogfight {
        Dogfight::new(&MatchConfig {
            bots,
            layout: ArenaLayout::Open,
            seed: 5,
            ..MatchConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn teams_spawn_facing_each_other() {
        let df = Dogfight::new(&MatchConfig {
            wingmen: 1,
            ..MatchConfig::default()
        })
        .unwrap();
        let planes = df.aircraft();
        assert_eq!(planes.len(), 5);
        assert_eq!(planes[0].id, PLAYER);
        assert_eq!(planes[0].team, Team::Blue);
        assert_eq!(planes[0].ammo, Some(400));
        assert_eq!(planes[1].team, Team::Blue);
        assert_eq!(planes[1].ammo, None);
        for red in &planes[2..] {
            assert_eq!(red.team, Team::Red);
            assert_eq!(red.ammo, None);
            assert!(red.position().x > 0.0);
            assert!(red.forward().x < -0.99);
        }
        assert!(planes[0].position().x < 0.0);
        assert!(planes.iter().enumerate().all(|(i, a)| a.id.index() == i));
    }

    #[test]
    fn rejects_empty_and_crowded_matches() {
        let none = Dogfight::new(&MatchConfig {
            bots: 0,
            ..MatchConfig::default()
        });
        assert!(matches!(none, Err(MatchError::NoOpponents)));
        let crowd = Dogfight::new(&MatchConfig {
            bots: 12,
            wingmen: 4,
            ..MatchConfig::default()
        });
        assert!(matches!(
            crowd,
            Err(MatchError::TooManyAircraft { requested: 17, max: 16 })
        ));
    }

    #[test]
    fn bad_tuning_is_a_config_error() {
        let config = MatchConfig {
            tuning: Some(FlightTuning {
                bullet_capacity: 0,
                ..FlightTuning::default()
            }),
            ..MatchConfig::default()
        };
        assert!(matches!(Dogfight::new(&config), Err(MatchError::Config(_))));
    }

    #[test]
    fn bots_close_in_and_open_fire() {
        let mut df = open(3);
        let mut events = Vec::new();
        for _ in 0..60 * 20 {
            let controls = df.autopilot();
            df.step(&controls, DT, &mut events);
            if df.is_finished() {
                break;
            }
        }
        let bot_shots = events
            .iter()
            .filter(|e| matches!(e, CombatEvent::Fired { shooter } if *shooter != PLAYER))
            .count();
        assert!(bot_shots > 0);
        assert!(df.bullets().len() <= df.tuning().bullet_capacity);
    }

    #[test]
    fn player_kill_wins_the_match() {
        let mut df = open(1);
        let bot = df.aircraft[1].position();
        df.aircraft[1].hp = df.tuning.bullet_damage;
        df.bullets.spawn(Bullet {
            owner: PLAYER,
            team: Team::Blue,
            position: bot - Vec3::X * 30.0,
            velocity: Vec3::X * 900.0,
            life: 1.0,
        });

        let mut events = Vec::new();
        df.step(&FlightControls::default(), DT, &mut events);
        assert!(events.contains(&CombatEvent::Destroyed {
            target: EntityId(1),
            by: Some(PLAYER),
        }));
        assert_eq!(df.kills(), 1);
        assert_eq!(df.outcome(), Some(MatchOutcome::Victory));
        assert_eq!(
            events.last(),
            Some(&CombatEvent::MatchOver {
                outcome: MatchOutcome::Victory
            })
        );
        assert_eq!(df.effects().len(), 1);
    }

    #[test]
    fn losing_the_player_is_defeat_and_freezes_the_match() {
        let mut df = open(2);
        df.aircraft[0].damage(1000.0);
        let mut events = Vec::new();
        df.step(&FlightControls::default(), DT, &mut events);
        assert_eq!(df.outcome(), Some(MatchOutcome::Defeat));

        let hash = df.state_hash();
        events.clear();
        df.step(&FlightControls::default(), DT, &mut events);
        assert!(events.is_empty());
        assert_eq!(df.state_hash(), hash);
    }

    #[test]
    fn same_seed_same_hash() {
        let run = |seed| {
            let mut df = Dogfight::new(&MatchConfig {
                seed,
                ..MatchConfig::default()
            })
            .unwrap();
            let mut events = Vec::new();
            for _ in 0..300 {
                let controls = df.autopilot();
                df.step(&controls, DT, &mut events);
            }
            df.state_hash()
        };
        assert_eq!(run(9), run(9));
        assert_ne!(run(9), run(10));
    }
}
