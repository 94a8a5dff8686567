/*!
 * Adaptive-concurrency job scheduler.
 *
 * The scheduler drives a list of independent work items against a
 * rate-limited provider. It is split into several submodules:
 *
 * - `controller`: the admission loop and retry/fatal handling
 * - `state`: AIMD ceiling bookkeeping owned by one batch run
 * - `classifier`: maps normalized item errors to scheduling decisions
 * - `progress`: per-item throttled progress reporting
 * - `cancellation`: cooperative cancellation gate
 * - `work_item`: work items and the context handed to each attempt
 */

pub use self::cancellation::CancellationGate;
pub use self::classifier::{Classification, classify};
pub use self::controller::{AdaptiveScheduler, BatchSummary, SchedulerConfig};
pub use self::progress::{
    ChannelSink, ProgressEvent, ProgressPhase, ProgressReporter, ProgressSink,
    DEFAULT_PROGRESS_INTERVAL,
};
pub use self::state::SchedulerState;
pub use self::work_item::{Work, WorkContext, WorkItem};

pub mod cancellation;
pub mod classifier;
pub mod controller;
pub mod progress;
pub mod state;
pub mod work_item;
