/*!
 * Work items and the per-attempt context handed to them.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::cancellation::CancellationGate;
use super::progress::ProgressReporter;
use crate::errors::ItemError;

/// An asynchronous, retry-safe unit of work.
///
/// Results are communicated through the context (partial reports and the
/// final payload) and through the implementor's own side effects.
#[async_trait]
pub trait Work: Send + Sync {
    async fn execute(&self, ctx: WorkContext) -> Result<(), ItemError>;
}

#[async_trait]
impl<F, Fut> Work for F
where
    F: Fn(WorkContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ItemError>> + Send + 'static,
{
    async fn execute(&self, ctx: WorkContext) -> Result<(), ItemError> {
        (self)(ctx).await
    }
}

/// One schedulable unit of work with a stable identity
#[derive(Clone)]
pub struct WorkItem {
    id: Arc<str>,
    attempt: u32,
    work: Arc<dyn Work>,
}

impl WorkItem {
    pub fn new(id: impl Into<String>, work: impl Work + 'static) -> Self {
        Self::from_shared(id, Arc::new(work))
    }

    pub fn from_shared(id: impl Into<String>, work: Arc<dyn Work>) -> Self {
        Self {
            id: Arc::from(id.into()),
            attempt: 0,
            work,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of retries already scheduled for this item
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub(crate) fn next_attempt(mut self) -> Self {
        self.attempt += 1;
        self
    }

    pub(crate) fn work(&self) -> Arc<dyn Work> {
        self.work.clone()
    }

    pub(crate) fn shared_id(&self) -> Arc<str> {
        self.id.clone()
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("id", &self.id)
            .field("attempt", &self.attempt)
            .finish()
    }
}

/// Context for a single attempt of a work item
#[derive(Clone, Debug)]
pub struct WorkContext {
    item_id: Arc<str>,
    attempt: u32,
    reporter: ProgressReporter,
    gate: CancellationGate,
    final_payload: Arc<Mutex<Option<String>>>,
}

impl WorkContext {
    pub fn new(
        item_id: Arc<str>,
        attempt: u32,
        reporter: ProgressReporter,
        gate: CancellationGate,
    ) -> Self {
        Self {
            item_id,
            attempt,
            reporter,
            gate,
            final_payload: Arc::new(Mutex::new(None)),
        }
    }

    pub fn id(&self) -> &str {
        &self.item_id
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Poll the cancellation gate; call before any side-effecting write.
    pub fn is_cancelled(&self) -> bool {
        self.gate.is_cancelled()
    }

    /// Signal to wire into outstanding network calls.
    pub fn abort_signal(&self) -> &CancellationToken {
        self.gate.token()
    }

    /// Report incremental output; throttled per item.
    pub fn report_partial(&self, payload: &str) -> bool {
        self.reporter.report(&self.item_id, payload)
    }

    /// Record the final output, forwarded with the `done` event.
    pub fn complete(&self, payload: impl Into<String>) {
        *self.final_payload.lock() = Some(payload.into());
    }

    pub(crate) fn take_final_payload(&self) -> Option<String> {
        self.final_payload.lock().take()
    }
}
