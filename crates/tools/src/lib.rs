//! Tooling around the simulations: HUD text the games display and
//! inspectors that summarise a running race or match.
//!
//! # Invariants
//! - Everything here reads simulation state; nothing mutates it.

pub mod hud;
pub mod inspector;

pub use hud::HpBand;
pub use inspector::{Inspector, MatchSummary, RaceSummary, ReplayReport, SprintSummary};
