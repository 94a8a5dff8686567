/*!
 * # fieldwise - batch field translation with adaptive concurrency
 *
 * A Rust library for translating many independent content fields into many
 * locales against a rate-limited text-generation API.
 *
 * ## Features
 *
 * - Adaptive concurrency (AIMD): the in-flight ceiling grows by one after a
 *   run of successes and is halved when the provider rate limits
 * - Bounded retries of rate-limited items with linear backoff, retried
 *   items go to the tail of the queue
 * - Batch-wide halt on fatal provider configuration errors
 * - Throttled progress events, so UIs are not flooded by streamed partials
 * - Cooperative cancellation through a polled gate and an abort signal
 *
 * ## Architecture
 *
 * - `scheduler`: the adaptive scheduler and its collaborators:
 *   - `scheduler::controller`: admission loop, retries, fatal handling
 *   - `scheduler::state`: AIMD ceiling bookkeeping
 *   - `scheduler::classifier`: maps item errors to scheduling decisions
 *   - `scheduler::progress`: throttled progress reporting
 *   - `scheduler::cancellation`: cancellation gate
 *   - `scheduler::work_item`: work items and their per-attempt context
 * - `translation`: field/locale work items built on a provider, and the
 *   static per-model concurrency profiles
 * - `providers`: provider trait and a mock provider
 * - `app_config`: configuration management
 * - `app_controller`: file-level orchestration used by the CLI
 * - `errors`: error types and normalization of provider errors
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

#![allow(clippy::uninlined_format_args)]

pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod providers;
pub mod scheduler;
pub mod translation;

pub use app_config::Config;
pub use errors::{AppError, ErrorKind, ItemError, ProviderError, SchedulerError};
pub use scheduler::{
    AdaptiveScheduler, BatchSummary, CancellationGate, ProgressEvent, ProgressPhase,
    ProgressReporter, ProgressSink, SchedulerConfig, WorkContext, WorkItem,
};
pub use translation::{
    translate_fields, FieldTranslation, ModelProfile, TranslationJob, TranslationResults,
};
