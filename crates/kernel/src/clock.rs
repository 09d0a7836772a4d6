use std::collections::VecDeque;
use std::time::Duration;

/// Largest frame delta the kart games accept (about two 60 Hz frames).
pub const DEFAULT_MAX_DT: f32 = 0.033;

/// Turns host timestamps into clamped frame deltas.
///
/// A tab that was backgrounded for ten seconds must not integrate ten
/// seconds of physics in one step, so deltas are capped at `max_dt`.
#[derive(Debug, Clone)]
pub struct FrameClock {
    max_dt: f32,
    prev: Option<f64>,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DT)
    }
}

impl FrameClock {
    pub fn new(max_dt: f32) -> Self {
        Self { max_dt, prev: None }
    }

    pub fn max_dt(&self) -> f32 {
        self.max_dt
    }

    /// Feed the host timestamp in seconds; returns the clamped delta.
    ///
    /// The first call only primes the clock and returns zero. Timestamps
    /// that go backwards also yield zero.
    pub fn advance(&mut self, now_secs: f64) -> f32 {
        let dt = match self.prev {
            Some(prev) => (now_secs - prev).max(0.0) as f32,
            None => 0.0,
        };
        self.prev = Some(now_secs);
        self.clamp(dt)
    }

    pub fn clamp(&self, dt: f32) -> f32 {
        if dt.is_finite() {
            dt.clamp(0.0, self.max_dt)
        } else {
            0.0
        }
    }

    pub fn reset(&mut self) {
        self.prev = None;
    }
}

/// Wall-clock cost of the simulation step that produced `tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSample {
    pub tick: u64,
    pub cost: Duration,
}

/// Host-side profile of a session: the most recent step costs, keyed by
/// the tick each one produced, plus a lifetime count of steps that ran
/// past the frame budget.
#[derive(Debug, Clone)]
pub struct StepTimer {
    window: VecDeque<StepSample>,
    capacity: usize,
    budget: Duration,
    steps: u64,
    over_budget: u64,
}

impl StepTimer {
    /// Keep the last `capacity` steps; a step slower than `budget` would
    /// have cost the host a frame.
    pub fn new(capacity: usize, budget: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            budget,
            steps: 0,
            over_budget: 0,
        }
    }

    /// Budget of one frame at `hz`.
    pub fn at_rate(capacity: usize, hz: f32) -> Self {
        Self::new(capacity, Duration::from_secs_f32(1.0 / hz.max(1.0)))
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Record a step. Returns true when it overran the budget.
    pub fn record(&mut self, tick: u64, cost: Duration) -> bool {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(StepSample { tick, cost });
        self.steps += 1;
        let over = cost > self.budget;
        if over {
            self.over_budget += 1;
            tracing::debug!(tick, ?cost, budget = ?self.budget, "step over budget");
        }
        over
    }

    /// Samples in the window, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = &StepSample> {
        self.window.iter()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Steps recorded since creation, including those that left the window.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn over_budget(&self) -> u64 {
        self.over_budget
    }

    pub fn average(&self) -> Duration {
        if self.window.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.window.iter().map(|s| s.cost).sum();
        total / self.window.len() as u32
    }

    /// Costliest step in the window; the earliest tick wins a tie.
    pub fn slowest(&self) -> Option<StepSample> {
        self.window
            .iter()
            .copied()
            .reduce(|worst, s| if s.cost > worst.cost { s } else { worst })
    }
}
