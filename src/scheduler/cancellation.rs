/*!
 * Cooperative cancellation gate.
 *
 * Combines a `CancellationToken` (the abort signal in-flight work can await)
 * with an optional caller-supplied predicate. The predicate is polled at
 * scheduling decisions and, while a batch runs, every `POLL_INTERVAL`. When it
 * reports cancellation the token is cancelled too, so in-flight work observes
 * it.
 */

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How often a running batch polls the predicate
pub const POLL_INTERVAL: Duration = Duration::from_millis(33);

type CancelCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// Polled cancellation flag plus abort signal
#[derive(Clone, Default)]
pub struct CancellationGate {
    token: CancellationToken,
    check: Option<CancelCheck>,
}

impl CancellationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a gate around an existing token, e.g. one shared with a UI.
    pub fn with_token(token: CancellationToken) -> Self {
        Self { token, check: None }
    }

    /// Add a predicate polled whenever the gate is consulted.
    pub fn with_check(mut self, check: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.check = Some(Arc::new(check));
        self
    }

    /// Poll the gate.
    pub fn is_cancelled(&self) -> bool {
        if self.token.is_cancelled() {
            return true;
        }
        match &self.check {
            Some(check) if check() => {
                self.token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Whether a predicate needs polling to be observed.
    pub fn has_check(&self) -> bool {
        self.check.is_some()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Abort signal for in-flight work.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Resolves once the abort signal fires. The predicate is not polled
    /// here; it trips the signal when `is_cancelled` sees it.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

impl fmt::Debug for CancellationGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationGate")
            .field("cancelled", &self.token.is_cancelled())
            .field("has_check", &self.check.is_some())
            .finish()
    }
}
