//! Kart racing simulations: the ribbon and free-roam drift models, closed
//! tracks, lap counting, rival bots, race standings, and the pseudo-3D
//! segment sprint.
//!
//! # Invariants
//! - A ribbon kart's lateral offset never exceeds the track half-width.
//! - A lap counter increments at most once per revolution and never inside
//!   its minimum lap time.
//! - Track geometry is built once and never mutated by a race.
//! - All randomness comes from a seeded `SimRng`, so a race replays exactly.

pub mod autopilot;
pub mod bot;
pub mod free;
pub mod kart;
pub mod lap;
pub mod race;
pub mod segment;
pub mod sprint;
pub mod track;
pub mod tuning;

pub use bot::RivalKart;
pub use free::FreeKart;
pub use kart::Kart;
pub use lap::{LapCounter, LapRule};
pub use race::{PLAYER, PlayerKart, Race, RaceConfig, RaceEvent, Standing};
pub use segment::{SegmentTrack, TrackProfile};
pub use sprint::{SprintEvent, SprintKart, SprintRace, SprintTuning};
pub use track::{EllipseTrack, SplineTrack, Track, TrackError, TrackProjection};
pub use tuning::{BotTuning, FreeKartTuning, KartTuning};
