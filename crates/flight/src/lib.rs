//! Flight dogfight simulation: a boxed arena with static obstacles, fighter
//! physics, a bounded bullet pool and bot pilots.
//!
//! # Invariants
//! - Hit points and gun cooldowns never go below zero.
//! - A bullet leaves the pool exactly once, with one reported fate.
//! - Bots decide from the state at the start of a frame, in index order,
//!   and draw no randomness, so a match replays exactly from its seed.

pub mod ai;
pub mod aircraft;
pub mod arena;
pub mod combat;
pub mod dogfight;
pub mod spatial;
pub mod tuning;

pub use aircraft::{Aircraft, Team};
pub use arena::{Aabb, Arena, ArenaLayout};
pub use combat::{Bullet, BulletFate, BulletPool, Effect};
pub use dogfight::{CombatEvent, Dogfight, MatchConfig, MatchError, MatchOutcome, PLAYER};
pub use spatial::ObstacleGrid;
pub use tuning::{AiTuning, FlightTuning};
