/*!
 * Provider abstraction for text-generation APIs.
 *
 * Real vendor clients live outside this crate. They plug in by implementing
 * `Provider`; errors they return are normalized into `ItemError` before the
 * scheduler sees them.
 *
 * - `mock`: a configurable in-process provider for tests and simulations
 */

use async_trait::async_trait;
use std::fmt::Debug;
use tokio_util::sync::CancellationToken;

use crate::errors::ProviderError;

/// A single field translation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    /// Dotted path of the field being translated, e.g. "seo.title"
    pub field_path: String,
    /// Text in the source locale
    pub text: String,
    /// Source locale code
    pub source_locale: String,
    /// Target locale code
    pub target_locale: String,
}

/// Common trait for all text-generation providers
///
/// Implementations stream their output through `on_delta` and must stop
/// with `ProviderError::Aborted` once `abort` is cancelled.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Translate a request, streaming deltas, and return the full text
    async fn stream_translation(
        &self,
        request: &TranslationRequest,
        abort: &CancellationToken,
        on_delta: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> Result<String, ProviderError>;
}

pub mod mock;
