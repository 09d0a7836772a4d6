//! Shared types and utilities for the arcade simulations.
//!
//! # Invariants
//! - Nothing in here reads the wall clock or an unseeded RNG.

pub mod config;
pub mod math;
pub mod rng;
pub mod types;

pub use config::{ConfigError, ConfigFormat, Validate, load_config, parse_config};
pub use rng::SimRng;
pub use types::{EntityId, Transform};
