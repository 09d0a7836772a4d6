//! Input layer: raw key names and pointer positions become actions, and
//! actions mutate explicit per-game input state.
//!
//! # Invariants
//! - Simulations consume `KartControls` / `FlightControls`, never raw events.
//! - Input state is plain data, owned by the host and passed by reference.

pub mod action;
pub mod state;

pub use action::{Action, KeyMap};
pub use state::{FlightControls, FlightInput, KartControls, KartInput};
