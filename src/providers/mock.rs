/*!
 * Mock provider implementation for tests and simulations.
 *
 * Simulates the behaviors the scheduler has to cope with:
 * - `MockProvider::working()` - always succeeds, streaming word by word
 * - `MockProvider::rate_limited_first(n)` - every field/locale is rate limited n times
 * - `MockProvider::intermittent(n)` - every nth call is rate limited
 * - `MockProvider::failing()` - every call fails with an ordinary error
 * - `MockProvider::wrong_endpoint()` / `streaming_rejected()` - batch-fatal errors
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{Provider, TranslationRequest};
use crate::errors::ProviderError;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Each field/locale pair is rate limited this many times before succeeding
    RateLimitedFirst { attempts: usize },
    /// Every nth call overall is rate limited
    Intermittent { rate_limit_every: usize },
    /// Always fails with a non-retryable item error
    Failing,
    /// Rejects the credential for the configured endpoint
    WrongEndpoint,
    /// Rejects streaming for the account
    StreamingRejected,
}

/// Mock provider for testing scheduling behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Delay before the first streamed chunk
    latency: Duration,
    /// Random extra delay in milliseconds, up to this value
    jitter_ms: u64,
    /// Delay between streamed chunks
    chunk_delay: Duration,
    /// Total calls, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Calls per field/locale pair, shared between clones
    calls_per_key: Arc<Mutex<HashMap<String, usize>>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            latency: Duration::ZERO,
            jitter_ms: 0,
            chunk_delay: Duration::ZERO,
            request_count: Arc::new(AtomicUsize::new(0)),
            calls_per_key: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn rate_limited_first(attempts: usize) -> Self {
        Self::new(MockBehavior::RateLimitedFirst { attempts })
    }

    pub fn intermittent(rate_limit_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent {
            rate_limit_every: rate_limit_every.max(1),
        })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn wrong_endpoint() -> Self {
        Self::new(MockBehavior::WrongEndpoint)
    }

    pub fn streaming_rejected() -> Self {
        Self::new(MockBehavior::StreamingRejected)
    }

    /// Simulated network latency before streaming starts
    pub fn with_latency(mut self, latency: Duration, jitter_ms: u64) -> Self {
        self.latency = latency;
        self.jitter_ms = jitter_ms;
        self
    }

    /// Simulated delay between streamed chunks
    pub fn with_chunk_delay(mut self, chunk_delay: Duration) -> Self {
        self.chunk_delay = chunk_delay;
        self
    }

    pub fn behavior(&self) -> MockBehavior {
        self.behavior
    }

    /// Total number of calls made so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Number of calls made for one field/locale pair
    pub fn calls_for(&self, field_path: &str, target_locale: &str) -> usize {
        self.calls_per_key
            .lock()
            .get(&Self::key(field_path, target_locale))
            .copied()
            .unwrap_or(0)
    }

    /// The text a successful call produces
    pub fn translated_text(request: &TranslationRequest) -> String {
        format!("[{}] {}", request.target_locale, request.text)
    }

    fn key(field_path: &str, target_locale: &str) -> String {
        format!("{}.{}", field_path, target_locale)
    }

    async fn pause(&self, delay: Duration, abort: &CancellationToken) -> Result<(), ProviderError> {
        if delay.is_zero() {
            return if abort.is_cancelled() {
                Err(ProviderError::Aborted)
            } else {
                Ok(())
            };
        }
        tokio::select! {
            _ = abort.cancelled() => Err(ProviderError::Aborted),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    fn check_behavior(&self, call_index: usize, key_calls: usize) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Working => Ok(()),
            MockBehavior::RateLimitedFirst { attempts } if key_calls <= attempts => {
                Err(ProviderError::ApiError {
                    status_code: 429,
                    code: Some("rate_limit_exceeded".to_string()),
                    message: format!("Simulated rate limit (call #{} for this field)", key_calls),
                })
            }
            MockBehavior::RateLimitedFirst { .. } => Ok(()),
            MockBehavior::Intermittent { rate_limit_every } => {
                let every = rate_limit_every.max(1);
                if call_index % every == every - 1 {
                    Err(ProviderError::RateLimitExceeded(format!(
                        "Simulated rate limit (request #{})",
                        call_index + 1
                    )))
                } else {
                    Ok(())
                }
            }
            MockBehavior::Failing => Err(ProviderError::ParseError(
                "Simulated malformed response".to_string(),
            )),
            MockBehavior::WrongEndpoint => Err(ProviderError::WrongEndpoint(
                "free API key used against the pro endpoint".to_string(),
            )),
            MockBehavior::StreamingRejected => Err(ProviderError::CapabilityRejected {
                capability: "streaming".to_string(),
                message: "Your organization must be verified to stream this model".to_string(),
            }),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn stream_translation(
        &self,
        request: &TranslationRequest,
        abort: &CancellationToken,
        on_delta: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> Result<String, ProviderError> {
        let call_index = self.request_count.fetch_add(1, Ordering::SeqCst);
        let key_calls = {
            let mut calls = self.calls_per_key.lock();
            let entry = calls
                .entry(Self::key(&request.field_path, &request.target_locale))
                .or_insert(0);
            *entry += 1;
            *entry
        };

        let jitter = if self.jitter_ms > 0 {
            Duration::from_millis(rand::random_range(0..=self.jitter_ms))
        } else {
            Duration::ZERO
        };
        self.pause(self.latency + jitter, abort).await?;

        self.check_behavior(call_index, key_calls)?;

        let translated = Self::translated_text(request);
        for chunk in translated.split_inclusive(' ') {
            self.pause(self.chunk_delay, abort).await?;
            on_delta(chunk);
        }
        Ok(translated)
    }
}
