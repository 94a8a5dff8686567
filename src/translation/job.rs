/*!
 * Field translation batches.
 *
 * A `TranslationJob` turns source fields and target locales into one work
 * item per `(field, locale)` pair. Each item streams its translation
 * through a `Provider`, reports the growing text as partial progress and
 * commits the final text into a shared `TranslationResults` store, unless
 * the batch was cancelled in the meantime.
 */

use async_trait::async_trait;
use log::debug;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::{ItemError, SchedulerError};
use crate::providers::{Provider, TranslationRequest};
use crate::scheduler::{AdaptiveScheduler, BatchSummary, Work, WorkContext, WorkItem};

/// One field to translate into one locale
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldTranslation {
    /// Dotted field path, e.g. "seo.description"
    pub field_path: String,
    /// Target locale
    pub locale: String,
    /// Text in the source locale
    pub source_text: String,
}

impl FieldTranslation {
    pub fn new(
        field_path: impl Into<String>,
        locale: impl Into<String>,
        source_text: impl Into<String>,
    ) -> Self {
        Self {
            field_path: field_path.into(),
            locale: locale.into(),
            source_text: source_text.into(),
        }
    }

    /// Stable work item identity
    pub fn id(&self) -> String {
        format!("{}.{}", self.field_path, self.locale)
    }
}

/// Translated text keyed by field path, then locale
pub type TranslationMap = BTreeMap<String, BTreeMap<String, String>>;

/// Shared store the work items commit their results into
#[derive(Debug, Clone, Default)]
pub struct TranslationResults {
    entries: Arc<RwLock<TranslationMap>>,
}

impl TranslationResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a translation, replacing any earlier one for the pair
    pub fn insert(&self, field_path: &str, locale: &str, text: impl Into<String>) {
        self.entries
            .write()
            .entry(field_path.to_string())
            .or_default()
            .insert(locale.to_string(), text.into());
    }

    pub fn get(&self, field_path: &str, locale: &str) -> Option<String> {
        self.entries
            .read()
            .get(field_path)
            .and_then(|locales| locales.get(locale))
            .cloned()
    }

    /// Number of stored `(field, locale)` translations
    pub fn len(&self) -> usize {
        self.entries.read().values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> TranslationMap {
        self.entries.read().clone()
    }
}

/// Work for a single field translation
#[derive(Debug)]
struct FieldWork {
    field: FieldTranslation,
    source_locale: String,
    provider: Arc<dyn Provider>,
    results: TranslationResults,
}

#[async_trait]
impl Work for FieldWork {
    async fn execute(&self, ctx: WorkContext) -> Result<(), ItemError> {
        if ctx.is_cancelled() {
            return Err(ItemError::cancelled());
        }

        let request = TranslationRequest {
            field_path: self.field.field_path.clone(),
            text: self.field.source_text.clone(),
            source_locale: self.source_locale.clone(),
            target_locale: self.field.locale.clone(),
        };

        let streamed = Mutex::new(String::new());
        let on_delta = |chunk: &str| {
            let mut text = streamed.lock();
            text.push_str(chunk);
            ctx.report_partial(&text);
        };

        let translated = self
            .provider
            .stream_translation(&request, ctx.abort_signal(), &on_delta)
            .await
            .map_err(ItemError::from)?;

        // Let sibling items observe a cancellation before anything is written.
        tokio::task::yield_now().await;
        if ctx.is_cancelled() {
            debug!("Discarding translation of '{}' after cancellation", ctx.id());
            return Err(ItemError::cancelled());
        }

        self.results
            .insert(&self.field.field_path, &self.field.locale, translated.clone());
        ctx.complete(translated);
        Ok(())
    }
}

/// A batch of field translations sharing one provider and result store
#[derive(Debug, Clone)]
pub struct TranslationJob {
    provider: Arc<dyn Provider>,
    source_locale: String,
    fields: Vec<FieldTranslation>,
    results: TranslationResults,
}

impl TranslationJob {
    pub fn new(provider: Arc<dyn Provider>, source_locale: impl Into<String>) -> Self {
        Self {
            provider,
            source_locale: source_locale.into(),
            fields: Vec::new(),
            results: TranslationResults::new(),
        }
    }

    /// Expand source fields into one translation per target locale.
    ///
    /// Targets equal to the source locale, repeated targets and fields with
    /// blank source text are skipped. Order is field order, then locale order.
    pub fn plan<K, V>(
        fields: impl IntoIterator<Item = (K, V)>,
        source_locale: &str,
        target_locales: &[String],
    ) -> Vec<FieldTranslation>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut locales: Vec<&str> = Vec::with_capacity(target_locales.len());
        for locale in target_locales {
            let locale = locale.trim();
            if locale.is_empty()
                || locale.eq_ignore_ascii_case(source_locale)
                || locales.iter().any(|seen| seen.eq_ignore_ascii_case(locale))
            {
                continue;
            }
            locales.push(locale);
        }

        let mut planned = Vec::new();
        for (field_path, text) in fields {
            let field_path = field_path.into();
            let text = text.into();
            if text.trim().is_empty() {
                debug!("Skipping empty field '{}'", field_path);
                continue;
            }
            for locale in &locales {
                planned.push(FieldTranslation::new(field_path.clone(), *locale, text.clone()));
            }
        }
        planned
    }

    /// Add planned fields to the job
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldTranslation>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn push(&mut self, field: FieldTranslation) {
        self.fields.push(field);
    }

    pub fn fields(&self) -> &[FieldTranslation] {
        &self.fields
    }

    pub fn source_locale(&self) -> &str {
        &self.source_locale
    }

    /// Handle to the result store; clones share contents
    pub fn results(&self) -> TranslationResults {
        self.results.clone()
    }

    /// Build the scheduler's work items, in field order
    pub fn work_items(&self) -> Vec<WorkItem> {
        self.fields
            .iter()
            .map(|field| {
                WorkItem::new(
                    field.id(),
                    FieldWork {
                        field: field.clone(),
                        source_locale: self.source_locale.clone(),
                        provider: self.provider.clone(),
                        results: self.results.clone(),
                    },
                )
            })
            .collect()
    }

    /// Run every field through the scheduler with at most `cap` in flight
    pub async fn run(
        &self,
        scheduler: &AdaptiveScheduler,
        cap: usize,
    ) -> Result<BatchSummary, SchedulerError> {
        debug!(
            "Translating {} fields with provider '{}'",
            self.fields.len(),
            self.provider.name()
        );
        scheduler.run(self.work_items(), cap).await
    }
}

/// Plan and run a whole field translation batch.
///
/// Results committed before a fatal error are lost with the error; callers
/// that need them should build a `TranslationJob` and keep its results handle.
pub async fn translate_fields(
    provider: Arc<dyn Provider>,
    scheduler: &AdaptiveScheduler,
    fields: &BTreeMap<String, String>,
    source_locale: &str,
    target_locales: &[String],
    cap: usize,
) -> Result<(BatchSummary, TranslationMap), SchedulerError> {
    let planned = TranslationJob::plan(
        fields.iter().map(|(path, text)| (path.as_str(), text.as_str())),
        source_locale,
        target_locales,
    );
    let job = TranslationJob::new(provider, source_locale).with_fields(planned);
    let summary = job.run(scheduler, cap).await?;
    Ok((summary, job.results().snapshot()))
}
