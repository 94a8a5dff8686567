/*!
 * Scheduler state for one batch run.
 *
 * Owned by the controller and mutated only between awaits, so no
 * synchronization is needed.
 */

use crate::errors::ItemError;

/// Lower bound for the concurrency ceiling
pub const CEILING_FLOOR: usize = 1;

/// AIMD bookkeeping for one batch run.
#[derive(Debug, Clone)]
pub struct SchedulerState {
    /// Current admitted-concurrency limit
    ceiling: usize,

    /// Hard upper bound, fixed at batch start
    cap: usize,

    /// Number of in-flight items
    active: usize,

    /// Consecutive successes since the last ceiling change
    success_streak: usize,

    /// Successes needed before the ceiling grows by one
    streak_threshold: usize,

    /// Highest number of in-flight items observed
    peak_active: usize,

    /// Latched fatal error; once set nothing else is admitted
    fatal: Option<ItemError>,
}

impl SchedulerState {
    /// Create the state for a batch; the ceiling starts at the cap.
    pub fn new(cap: usize, streak_threshold: usize) -> Self {
        let cap = cap.max(CEILING_FLOOR);
        Self {
            ceiling: cap,
            cap,
            active: 0,
            success_streak: 0,
            streak_threshold: streak_threshold.max(1),
            peak_active: 0,
            fatal: None,
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn success_streak(&self) -> usize {
        self.success_streak
    }

    pub fn peak_active(&self) -> usize {
        self.peak_active
    }

    pub fn fatal(&self) -> Option<&ItemError> {
        self.fatal.as_ref()
    }

    /// Whether one more item may be admitted right now.
    pub fn can_admit(&self) -> bool {
        self.fatal.is_none() && self.active < self.ceiling
    }

    /// Account for an admitted item.
    pub fn on_admit(&mut self) {
        debug_assert!(self.active < self.ceiling);
        self.active += 1;
        self.peak_active = self.peak_active.max(self.active);
    }

    /// Account for an item whose handling finished.
    pub fn on_settled(&mut self) {
        self.active = self.active.saturating_sub(1);
    }

    /// Additive increase. Returns true when the ceiling grew.
    pub fn record_success(&mut self) -> bool {
        self.success_streak += 1;
        if self.success_streak >= self.streak_threshold && self.ceiling < self.cap {
            self.ceiling += 1;
            self.success_streak = 0;
            return true;
        }
        false
    }

    /// Multiplicative decrease: `max(1, ceil(ceiling / 2))`.
    /// Returns true when the ceiling shrank.
    pub fn record_rate_limit(&mut self) -> bool {
        self.success_streak = 0;
        let previous = self.ceiling;
        self.ceiling = previous.div_ceil(2).max(CEILING_FLOOR);
        self.ceiling < previous
    }

    /// An ordinary failure breaks the run of consecutive successes.
    pub fn record_failure(&mut self) {
        self.success_streak = 0;
    }

    /// Latch the first fatal error; later ones are ignored.
    pub fn latch_fatal(&mut self, error: ItemError) {
        if self.fatal.is_none() {
            self.fatal = Some(error);
        }
    }

    pub fn take_fatal(&mut self) -> Option<ItemError> {
        self.fatal.take()
    }
}
