//! Frame kernel: the update half of the per-frame loop.
//!
//! # Invariants
//! - A simulation step is pure with respect to its input and `dt`.
//! - Every frame a session advances is recorded on its input tape, so a
//!   replay from the same starting state reproduces the same state hash.

pub mod clock;
pub mod hash;
pub mod session;

pub use clock::{DEFAULT_MAX_DT, FrameClock, StepSample, StepTimer};
pub use hash::StateHasher;
pub use session::{InputTape, ReplayError, Session, Simulation, Stamped, TapeFrame};
