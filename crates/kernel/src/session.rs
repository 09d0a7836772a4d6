use serde::{Deserialize, Serialize};

use std::time::Instant;

use crate::clock::{FrameClock, StepTimer};

/// A per-frame arcade simulation: a race, a sprint, a dogfight.
///
/// All mutable game state lives in the implementor and is only changed
/// through `step`. Presentation reads it back after each step.
pub trait Simulation {
    /// Controls for one frame.
    type Input: Clone;
    /// Things that happened during a frame (laps, hits, boosts), for sound
    /// cues, banners and logs on the host side.
    type Event;

    fn step(&mut self, input: &Self::Input, dt: f32, events: &mut Vec<Self::Event>);

    /// True once the race or match is over. Steps after that are no-ops.
    fn is_finished(&self) -> bool;

    /// Hash over every field that influences future frames.
    fn state_hash(&self) -> u64;
}

/// An event tagged with the tick that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stamped<E> {
    pub tick: u64,
    pub event: E,
}

/// One recorded frame: the controls and the clamped delta it ran with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TapeFrame<I> {
    pub input: I,
    pub dt: f32,
}

/// Append-only record of every frame a session advanced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputTape<I> {
    frames: Vec<TapeFrame<I>>,
}

impl<I> Default for InputTape<I> {
    fn default() -> Self {
        Self { frames: Vec::new() }
    }
}

impl<I> InputTape<I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, input: I, dt: f32) {
        self.frames.push(TapeFrame { input, dt });
    }

    pub fn frames(&self) -> &[TapeFrame<I>] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total simulated time on the tape.
    pub fn duration(&self) -> f64 {
        self.frames.iter().map(|f| f.dt as f64).sum()
    }
}

/// Errors from replaying a tape.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ReplayError {
    #[error("tape frame {index} has invalid dt {dt}")]
    InvalidFrame { index: usize, dt: f32 },
    #[error("state hash mismatch after replay: expected {expected:#x}, got {actual:#x}")]
    HashMismatch { expected: u64, actual: u64 },
}

/// Drives one simulation frame by frame.
///
/// The session owns the simulation, counts ticks, stamps events and records
/// the input tape. It is the update half of the host's
/// update → render → reschedule loop.
pub struct Session<S: Simulation> {
    sim: S,
    clock: FrameClock,
    tick: u64,
    elapsed: f64,
    events: Vec<Stamped<S::Event>>,
    tape: InputTape<S::Input>,
    scratch: Vec<S::Event>,
}

impl<S: Simulation + std::fmt::Debug> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("sim", &self.sim)
            .field("tick", &self.tick)
            .field("elapsed", &self.elapsed)
            .field("events", &self.events.len())
            .field("tape_frames", &self.tape.len())
            .finish()
    }
}

impl<S: Simulation> Session<S> {
    pub fn new(sim: S) -> Self {
        Self::with_clock(sim, FrameClock::default())
    }

    pub fn with_clock(sim: S, clock: FrameClock) -> Self {
        Self {
            sim,
            clock,
            tick: 0,
            elapsed: 0.0,
            events: Vec::new(),
            tape: InputTape::new(),
            scratch: Vec::new(),
        }
    }

    pub fn sim(&self) -> &S {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut S {
        &mut self.sim
    }

    pub fn into_sim(self) -> S {
        self.sim
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds so far.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn tape(&self) -> &InputTape<S::Input> {
        &self.tape
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[Stamped<S::Event>] {
        &self.events
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<Stamped<S::Event>> {
        std::mem::take(&mut self.events)
    }

    pub fn is_finished(&self) -> bool {
        self.sim.is_finished()
    }

    pub fn state_hash(&self) -> u64 {
        self.sim.state_hash()
    }

    /// Advance one frame with a raw delta; the delta is clamped first.
    /// Returns the number of events the frame produced.
    pub fn advance(&mut self, input: S::Input, dt: f32) -> usize {
        let dt = self.clock.clamp(dt);
        self.step_recorded(input, dt)
    }

    /// Advance one frame from a host timestamp in seconds.
    pub fn advance_at(&mut self, input: S::Input, now_secs: f64) -> usize {
        let dt = self.clock.advance(now_secs);
        self.step_recorded(input, dt)
    }

    /// `advance`, with the step's wall-clock cost recorded against the
    /// tick it produced.
    pub fn advance_timed(&mut self, input: S::Input, dt: f32, timer: &mut StepTimer) -> usize {
        let start = Instant::now();
        let produced = self.advance(input, dt);
        timer.record(self.tick, start.elapsed());
        produced
    }

    fn step_recorded(&mut self, input: S::Input, dt: f32) -> usize {
        self.tick += 1;
        self.elapsed += dt as f64;
        self.sim.step(&input, dt, &mut self.scratch);
        self.tape.push(input, dt);

        let produced = self.scratch.len();
        let tick = self.tick;
        self.events
            .extend(self.scratch.drain(..).map(|event| Stamped { tick, event }));
        tracing::trace!(tick, dt, produced, "frame advanced");
        produced
    }

    /// Run `frames` fixed-delta frames, asking `input_fn` for each frame's
    /// controls. Stops early when the simulation finishes.
    pub fn run_fixed<F>(&mut self, frames: u64, dt: f32, mut input_fn: F) -> u64
    where
        F: FnMut(&S) -> S::Input,
    {
        let mut ran = 0;
        while ran < frames && !self.sim.is_finished() {
            let input = input_fn(&self.sim);
            self.advance(input, dt);
            ran += 1;
        }
        ran
    }

    /// Rebuild a session by feeding a recorded tape into a fresh simulation.
    pub fn replay(sim: S, tape: &InputTape<S::Input>) -> Result<Self, ReplayError> {
        Self::replay_with_clock(sim, FrameClock::default(), tape)
    }

    /// Replay under a specific clock, for games recorded with a larger
    /// frame cap.
    pub fn replay_with_clock(
        sim: S,
        clock: FrameClock,
        tape: &InputTape<S::Input>,
    ) -> Result<Self, ReplayError> {
        let mut session = Self::with_clock(sim, clock);
        for (index, frame) in tape.frames().iter().enumerate() {
            if !frame.dt.is_finite() || frame.dt < 0.0 || frame.dt > session.clock.max_dt() {
                return Err(ReplayError::InvalidFrame {
                    index,
                    dt: frame.dt,
                });
            }
            session.step_recorded(frame.input.clone(), frame.dt);
        }
        Ok(session)
    }

    /// Replay a tape and check the final state hash.
    pub fn verify_replay(
        sim: S,
        tape: &InputTape<S::Input>,
        expected_hash: u64,
    ) -> Result<Self, ReplayError> {
        Self::verify_replay_with_clock(sim, FrameClock::default(), tape, expected_hash)
    }

    /// `verify_replay` under the clock the tape was recorded with.
    pub fn verify_replay_with_clock(
        sim: S,
        clock: FrameClock,
        tape: &InputTape<S::Input>,
        expected_hash: u64,
    ) -> Result<Self, ReplayError> {
        let session = Self::replay_with_clock(sim, clock, tape)?;
        let actual = session.state_hash();
        if actual != expected_hash {
            return Err(ReplayError::HashMismatch {
                expected: expected_hash,
                actual,
            });
        }
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::StateHasher;
    use std::time::Duration;

    /// Point mass on a line that stops at `goal`.
    #[derive(Debug, Clone)]
    struct Runner {
        x: f32,
        goal: f32,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum RunnerEvent {
        Arrived,
    }

    impl Simulation for Runner {
        type Input = f32;
        type Event = RunnerEvent;

        fn step(&mut self, speed: &f32, dt: f32, events: &mut Vec<RunnerEvent>) {
            if self.is_finished() {
                return;
            }
            self.x += speed * dt;
            if self.is_finished() {
                events.push(RunnerEvent::Arrived);
            }
        }

        fn is_finished(&self) -> bool {
            self.x >= self.goal
        }

        fn state_hash(&self) -> u64 {
            StateHasher::new().f32(self.x).finish()
        }
    }

    fn runner() -> Runner {
        Runner { x: 0.0, goal: 1.0 }
    }

    #[test]
    fn advance_clamps_and_counts() {
        let mut s = Session::new(runner());
        s.advance(1.0, 10.0);
        assert_eq!(s.tick(), 1);
        assert!((s.sim().x - 0.033).abs() < 1e-6);
        assert_eq!(s.tape().len(), 1);
        assert_eq!(s.tape().frames()[0].dt, 0.033);
    }

    #[test]
    fn events_are_stamped_with_tick() {
        let mut s = Session::new(runner());
        let ran = s.run_fixed(1000, 1.0 / 60.0, |_| 30.0);
        assert!(s.is_finished());
        assert!(ran < 1000);
        let events = s.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tick, ran);
        assert_eq!(events[0].event, RunnerEvent::Arrived);
    }

    #[test]
    fn drain_events_clears_log() {
        let mut s = Session::new(runner());
        s.run_fixed(1000, 1.0 / 60.0, |_| 30.0);
        assert_eq!(s.drain_events().len(), 1);
        assert!(s.events().is_empty());
    }

    #[test]
    fn replay_reproduces_hash() {
        let mut s = Session::new(runner());
        let mut k = 0.0;
        s.run_fixed(20, 1.0 / 60.0, |_| {
            k += 0.5;
            k
        });
        let replayed = Session::verify_replay(runner(), s.tape(), s.state_hash()).unwrap();
        assert_eq!(replayed.tick(), s.tick());
        assert_eq!(replayed.events().len(), s.events().len());
    }

    #[test]
    fn replay_rejects_bad_dt() {
        let mut tape = InputTape::new();
        tape.push(1.0, 0.01);
        tape.push(1.0, f32::NAN);
        let err = Session::replay(runner(), &tape).unwrap_err();
        assert!(matches!(err, ReplayError::InvalidFrame { index: 1, .. }));
    }

    #[test]
    fn replay_detects_divergence() {
        let mut s = Session::new(runner());
        s.run_fixed(5, 1.0 / 60.0, |_| 1.0);
        let err = Session::verify_replay(runner(), s.tape(), s.state_hash() ^ 1).unwrap_err();
        assert!(matches!(err, ReplayError::HashMismatch { .. }));
    }

    #[test]
    fn verify_uses_the_recording_clock() {
        let far = || Runner { x: 0.0, goal: 10.0 };
        let long = FrameClock::new(0.05);
        let mut s = Session::with_clock(far(), long.clone());
        s.run_fixed(10, 0.05, |_| 1.0);
        assert_eq!(s.tape().frames()[0].dt, 0.05);

        let err = Session::verify_replay(far(), s.tape(), s.state_hash()).unwrap_err();
        assert!(matches!(err, ReplayError::InvalidFrame { index: 0, .. }));
        let replayed =
            Session::verify_replay_with_clock(far(), long, s.tape(), s.state_hash()).unwrap();
        assert_eq!(replayed.tick(), 10);
    }

    #[test]
    fn timed_steps_are_keyed_by_tick() {
        let mut s = Session::new(Runner { x: 0.0, goal: 100.0 });
        let mut timer = StepTimer::new(4, Duration::MAX);
        for _ in 0..10 {
            s.advance_timed(1.0, 1.0 / 60.0, &mut timer);
        }
        // Untimed frames advance the session but leave the profile alone.
        s.advance(1.0, 1.0 / 60.0);

        assert_eq!(timer.steps(), 10);
        let ticks: Vec<u64> = timer.samples().map(|sample| sample.tick).collect();
        assert_eq!(ticks, vec![7, 8, 9, 10]);
        assert_eq!(timer.over_budget(), 0);
        let slowest = timer.slowest().unwrap();
        assert!((7..=10).contains(&slowest.tick));
        assert_eq!(s.tick(), 11);
    }

    #[test]
    fn tape_serializes() {
        let mut tape = InputTape::new();
        tape.push(2.5f32, 0.016);
        let json = serde_json::to_string(&tape).unwrap();
        let back: InputTape<f32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tape);
        assert!((back.duration() - 0.016).abs() < 1e-6);
    }

    #[test]
    fn advance_at_uses_clock() {
        let mut s = Session::new(runner());
        s.advance_at(0.5, 100.0);
        s.advance_at(0.5, 100.02);
        assert_eq!(s.tick(), 2);
        assert_eq!(s.tape().frames()[0].dt, 0.0);
        assert!((s.tape().frames()[1].dt - 0.02).abs() < 1e-4);
    }
}
