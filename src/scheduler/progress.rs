/*!
 * Progress reporting with per-item throttling.
 *
 * Work items may report partial output as often as they like. Partial
 * events arriving before the minimum interval has elapsed for that item
 * are dropped, not queued. Lifecycle events (`start`, `done`, `failed`)
 * are never throttled, so the final state always reaches the consumer.
 */

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;

/// Default minimum gap between two partial events of one item (~30/s)
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(33);

/// Lifecycle phase carried by a progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressPhase {
    Start,
    Partial,
    Done,
    Failed,
}

/// A progress notification for one work item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    /// Identity of the work item
    pub item_id: String,
    /// Lifecycle phase
    pub phase: ProgressPhase,
    /// Partial or final output, or an error message for `failed`
    pub payload: Option<String>,
}

/// Consumer of progress events
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Forwards events into an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelSink(pub UnboundedSender<ProgressEvent>);

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.0.send(event);
    }
}

struct ReporterInner {
    sink: Option<Arc<dyn ProgressSink>>,
    min_interval: Duration,
    last_emitted: Mutex<HashMap<String, Instant>>,
}

/// Throttling progress reporter, cheap to clone
#[derive(Clone)]
pub struct ProgressReporter {
    inner: Arc<ReporterInner>,
}

impl ProgressReporter {
    /// Create a reporter with an explicit throttle interval
    pub fn new(sink: Arc<dyn ProgressSink>, min_interval: Duration) -> Self {
        Self {
            inner: Arc::new(ReporterInner {
                sink: Some(sink),
                min_interval,
                last_emitted: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Create a reporter with the default throttle interval
    pub fn with_sink(sink: impl ProgressSink + 'static) -> Self {
        Self::new(Arc::new(sink), DEFAULT_PROGRESS_INTERVAL)
    }

    /// A reporter that drops everything
    pub fn disabled() -> Self {
        Self {
            inner: Arc::new(ReporterInner {
                sink: None,
                min_interval: DEFAULT_PROGRESS_INTERVAL,
                last_emitted: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.inner.min_interval
    }

    pub fn start(&self, item_id: &str) {
        self.forward(item_id, ProgressPhase::Start, None);
    }

    /// Report partial output. Returns true when the event was forwarded.
    pub fn report(&self, item_id: &str, payload: &str) -> bool {
        if self.inner.sink.is_none() {
            return false;
        }

        let now = Instant::now();
        {
            let mut last_emitted = self.inner.last_emitted.lock();
            if let Some(previous) = last_emitted.get(item_id) {
                if now.duration_since(*previous) < self.inner.min_interval {
                    return false;
                }
            }
            last_emitted.insert(item_id.to_string(), now);
        }

        self.forward(item_id, ProgressPhase::Partial, Some(payload.to_string()));
        true
    }

    pub fn done(&self, item_id: &str, payload: Option<String>) {
        self.inner.last_emitted.lock().remove(item_id);
        self.forward(item_id, ProgressPhase::Done, payload);
    }

    pub fn failed(&self, item_id: &str, message: Option<String>) {
        self.inner.last_emitted.lock().remove(item_id);
        self.forward(item_id, ProgressPhase::Failed, message);
    }

    fn forward(&self, item_id: &str, phase: ProgressPhase, payload: Option<String>) {
        if let Some(sink) = &self.inner.sink {
            sink.emit(ProgressEvent {
                item_id: item_id.to_string(),
                phase,
                payload,
            });
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::disabled()
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("enabled", &self.inner.sink.is_some())
            .field("min_interval", &self.inner.min_interval)
            .finish()
    }
}
