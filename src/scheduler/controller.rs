/*!
 * Adaptive concurrency controller.
 *
 * Drives a list of work items to completion with an AIMD concurrency
 * ceiling. All items of a batch are polled as interleaved futures on the
 * controller's own task; `SchedulerState` is only touched between awaits.
 */

use futures::FutureExt;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use super::cancellation::{CancellationGate, POLL_INTERVAL};
use super::classifier::{classify, Classification};
use super::progress::ProgressReporter;
use super::state::SchedulerState;
use super::work_item::{WorkContext, WorkItem};
use crate::errors::{ItemError, SchedulerError};

/// Tuning knobs for the controller
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Retries allowed per item after a rate limit
    pub max_retries: u32,

    /// Backoff unit; retry `n` waits `retry_base_delay * n`
    pub retry_base_delay: Duration,

    /// Consecutive successes before the ceiling grows by one
    pub success_streak_threshold: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay: Duration::from_millis(1000),
            success_streak_threshold: 3,
        }
    }
}

/// Outcome of a batch that was not halted by a fatal error
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Items handed to the scheduler
    pub total: usize,
    /// Items that completed successfully
    pub succeeded: usize,
    /// Items retired as failed
    pub failed: usize,
    /// Items that stopped because they observed cancellation
    pub cancelled: usize,
    /// Items never run (cancellation before admission)
    pub skipped: usize,
    /// Rate-limit retries scheduled
    pub retries: usize,
    /// Ceiling when the batch ended
    pub final_ceiling: usize,
    /// Highest number of items in flight at once
    pub peak_active: usize,
}

impl BatchSummary {
    pub fn is_complete(&self) -> bool {
        self.succeeded == self.total
    }
}

type InFlight = BoxFuture<'static, (WorkItem, WorkContext, Result<(), ItemError>)>;
type Backoff = BoxFuture<'static, WorkItem>;

/// The adaptive-concurrency job scheduler
#[derive(Debug, Clone, Default)]
pub struct AdaptiveScheduler {
    config: SchedulerConfig,
    reporter: ProgressReporter,
    gate: CancellationGate,
}

impl AdaptiveScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            reporter: ProgressReporter::disabled(),
            gate: CancellationGate::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_gate(mut self, gate: CancellationGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn gate(&self) -> &CancellationGate {
        &self.gate
    }

    pub fn reporter(&self) -> &ProgressReporter {
        &self.reporter
    }

    /// Run a batch with at most `cap` items in flight.
    ///
    /// Resolves once every item is terminal, or once cancellation was
    /// requested and nothing is in flight anymore. Fails only when an item
    /// reported a fatal configuration error, after in-flight items drained.
    pub async fn run(&self, items: Vec<WorkItem>, cap: usize) -> Result<BatchSummary, SchedulerError> {
        let mut state = SchedulerState::new(cap, self.config.success_streak_threshold);
        let mut summary = BatchSummary {
            total: items.len(),
            ..Default::default()
        };
        let mut queue: VecDeque<WorkItem> = items.into();
        let mut in_flight: FuturesUnordered<InFlight> = FuturesUnordered::new();
        let mut backoff: FuturesUnordered<Backoff> = FuturesUnordered::new();
        let mut poll = tokio::time::interval(POLL_INTERVAL);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Starting batch of {} items with concurrency cap {}",
            summary.total,
            state.cap()
        );

        loop {
            self.admit(&mut state, &mut queue, &mut in_flight);

            if state.active() == 0 {
                let drained = queue.is_empty() && backoff.is_empty();
                if drained || state.fatal().is_some() || self.gate.is_cancelled() {
                    break;
                }
            }

            tokio::select! {
                Some((item, ctx, outcome)) = in_flight.next(), if !in_flight.is_empty() => {
                    state.on_settled();
                    self.settle(&mut state, &mut summary, &mut backoff, item, ctx, outcome);
                    if state.fatal().is_some() {
                        queue.clear();
                        backoff = FuturesUnordered::new();
                    }
                }
                Some(item) = backoff.next(), if !backoff.is_empty() => {
                    debug!("Re-queued '{}' (retry {})", item.id(), item.attempt());
                    queue.push_back(item);
                }
                _ = self.gate.cancelled(), if !self.gate.is_cancelled() => {
                    info!("Cancellation requested, waiting for {} in-flight items", state.active());
                }
                // Trips the abort signal once the predicate flips
                _ = poll.tick(), if self.gate.has_check() && !self.gate.token().is_cancelled() => {
                    if self.gate.is_cancelled() {
                        info!("Cancellation requested, waiting for {} in-flight items", state.active());
                    }
                }
                else => break,
            }
        }

        summary.final_ceiling = state.ceiling();
        summary.peak_active = state.peak_active();
        summary.skipped = summary
            .total
            .saturating_sub(summary.succeeded + summary.failed + summary.cancelled);

        if let Some(fatal) = state.take_fatal() {
            error!("Batch halted: {}", fatal.user_message());
            return Err(SchedulerError::Fatal(fatal));
        }

        if self.gate.is_cancelled() {
            info!(
                "Batch cancelled: {} succeeded, {} failed, {} not started",
                summary.succeeded,
                summary.failed,
                summary.skipped + summary.cancelled
            );
        } else {
            info!(
                "Batch finished: {} succeeded, {} failed, {} retries",
                summary.succeeded, summary.failed, summary.retries
            );
        }
        Ok(summary)
    }

    fn admit(
        &self,
        state: &mut SchedulerState,
        queue: &mut VecDeque<WorkItem>,
        in_flight: &mut FuturesUnordered<InFlight>,
    ) {
        while state.can_admit() && !self.gate.is_cancelled() {
            let Some(item) = queue.pop_front() else {
                break;
            };

            state.on_admit();
            self.reporter.start(item.id());
            debug!(
                "Admitted '{}' (attempt {}, {}/{} in flight)",
                item.id(),
                item.attempt(),
                state.active(),
                state.ceiling()
            );

            let ctx = WorkContext::new(
                item.shared_id(),
                item.attempt(),
                self.reporter.clone(),
                self.gate.clone(),
            );
            let work = item.work();
            in_flight.push(
                async move {
                    let outcome = work.execute(ctx.clone()).await;
                    (item, ctx, outcome)
                }
                .boxed(),
            );
        }
    }

    fn settle(
        &self,
        state: &mut SchedulerState,
        summary: &mut BatchSummary,
        backoff: &mut FuturesUnordered<Backoff>,
        item: WorkItem,
        ctx: WorkContext,
        outcome: Result<(), ItemError>,
    ) {
        let error = match outcome {
            Ok(()) => {
                summary.succeeded += 1;
                self.reporter.done(item.id(), ctx.take_final_payload());
                if state.record_success() {
                    info!("Raised concurrency to {}/{}", state.ceiling(), state.cap());
                }
                return;
            }
            Err(error) if error.is_cancelled() => {
                summary.cancelled += 1;
                debug!("'{}' stopped after cancellation", item.id());
                return;
            }
            Err(error) => error,
        };

        match classify(&error) {
            Classification::Fatal => {
                error!("Fatal error on '{}': {}", item.id(), error);
                summary.failed += 1;
                self.reporter.failed(item.id(), Some(error.message.clone()));
                state.latch_fatal(error);
            }
            Classification::RateLimited if item.attempt() < self.config.max_retries => {
                let previous = state.ceiling();
                state.record_rate_limit();
                let item = item.next_attempt();
                let delay = self.config.retry_base_delay * item.attempt();
                warn!(
                    "Rate limited on '{}', concurrency {} -> {}, retry {}/{} in {:?}",
                    item.id(),
                    previous,
                    state.ceiling(),
                    item.attempt(),
                    self.config.max_retries,
                    delay
                );
                summary.retries += 1;
                backoff.push(
                    async move {
                        tokio::time::sleep(delay).await;
                        item
                    }
                    .boxed(),
                );
            }
            _ => {
                warn!("'{}' failed after {} retries: {}", item.id(), item.attempt(), error);
                state.record_failure();
                summary.failed += 1;
                self.reporter.failed(item.id(), Some(error.message));
            }
        }
    }
}
