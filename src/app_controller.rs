use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::Config;
use crate::errors::AppError;
use crate::providers::Provider;
use crate::scheduler::{
    AdaptiveScheduler, BatchSummary, CancellationGate, ProgressEvent, ProgressPhase,
    ProgressReporter, ProgressSink,
};
use crate::translation::TranslationJob;

// @module: Application controller for field file translation

/// Progress sink driving an indicatif progress bar
#[derive(Clone)]
pub struct ProgressBarSink {
    // @field: Bar with one tick per retired item
    bar: ProgressBar,
}

impl ProgressBarSink {
    pub fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }

    // @returns: Bar styled like the rest of the CLI
    pub fn styled_bar(len: u64) -> ProgressBar {
        let progress_bar = ProgressBar::new(len);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} fields ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl ProgressSink for ProgressBarSink {
    fn emit(&self, event: ProgressEvent) {
        match event.phase {
            ProgressPhase::Start => self.bar.set_message(event.item_id),
            ProgressPhase::Partial => {
                let preview = event.payload.unwrap_or_default();
                self.bar
                    .set_message(format!("{}: {}", event.item_id, truncate_text(&preview, 40)));
            }
            ProgressPhase::Done => self.bar.inc(1),
            ProgressPhase::Failed => {
                self.bar.println(format!(
                    "failed {}: {}",
                    event.item_id,
                    event.payload.unwrap_or_default()
                ));
                self.bar.inc(1);
            }
        }
    }
}

/// Main application controller for field translation
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    /// Create a new controller for test purposes with default configuration
    pub fn new_for_test() -> Result<Self> {
        Self::with_config(Config::default())
    }

    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Output file for an input file: `content.json` -> `content.translated.json`
    pub fn output_path(input_file: &Path) -> PathBuf {
        let stem = input_file
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "fields".to_string());
        input_file.with_file_name(format!("{}.translated.json", stem))
    }

    /// Read a JSON document of source fields.
    ///
    /// Nested objects are flattened into dotted paths; only string values are
    /// translatable, everything else is skipped.
    pub fn read_fields(input_file: &Path) -> Result<BTreeMap<String, String>, AppError> {
        let content = std::fs::read_to_string(input_file)?;
        let document: Value = serde_json::from_str(&content).map_err(|e| {
            AppError::File(format!("Invalid JSON in {}: {}", input_file.display(), e))
        })?;

        let Value::Object(_) = document else {
            return Err(AppError::File(format!(
                "Expected a JSON object of fields in {}",
                input_file.display()
            )));
        };

        let mut fields = BTreeMap::new();
        flatten_fields("", &document, &mut fields);
        Ok(fields)
    }

    /// Translate every field of `input_file` and write the results next to it.
    ///
    /// Cancelled batches still write the translations committed so far.
    pub async fn run(
        &self,
        input_file: &Path,
        provider: Arc<dyn Provider>,
        gate: CancellationGate,
        force_overwrite: bool,
    ) -> Result<BatchSummary> {
        let start_time = std::time::Instant::now();

        if !input_file.exists() {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }

        let output_path = Self::output_path(input_file);
        if output_path.exists() && !force_overwrite {
            return Err(anyhow!(
                "Output file already exists: {:?} (use -f to force overwrite)",
                output_path
            ));
        }

        let fields = Self::read_fields(input_file)?;
        let planned = TranslationJob::plan(
            fields,
            &self.config.source_locale,
            &self.config.target_locales,
        );
        if planned.is_empty() {
            warn!("Nothing to translate in {:?}", input_file);
        }

        let profile = self.config.translation.profile();
        let cap = self.config.translation.effective_cap();
        info!(
            "Translating {} fields into {} locales with {} ({}, {:?} profile, cap {})",
            planned.len(),
            self.config.target_locales.len(),
            self.config.translation.provider.display_name(),
            profile.model,
            profile.class,
            cap
        );

        let progress_bar = ProgressBarSink::styled_bar(planned.len() as u64);
        progress_bar.set_message("Translating");
        let reporter = ProgressReporter::new(
            Arc::new(ProgressBarSink::new(progress_bar.clone())),
            self.config.scheduler.progress_interval(),
        );
        let scheduler = AdaptiveScheduler::new(self.config.scheduler.to_scheduler_config())
            .with_reporter(reporter)
            .with_gate(gate);

        let job = TranslationJob::new(provider, self.config.source_locale.clone())
            .with_fields(planned);
        let outcome = job.run(&scheduler, cap).await;
        progress_bar.finish_and_clear();

        let summary = match outcome {
            Ok(summary) => summary,
            Err(err) => {
                let message = err.item_error().user_message();
                return Err(err).context(message);
            }
        };

        let results = job.results();
        if results.is_empty() {
            debug!("No translations committed, not writing {:?}", output_path);
        } else {
            let json = serde_json::to_string_pretty(&results.snapshot())
                .context("Failed to serialize translations to JSON")?;
            std::fs::write(&output_path, json)
                .context(format!("Failed to write translations to {:?}", output_path))?;
            info!("Wrote {} translations to {:?}", results.len(), output_path);
        }

        info!(
            "Done in {}: {} succeeded, {} failed, {} skipped, {} retries, final concurrency {}/{}",
            Self::format_duration(start_time.elapsed()),
            summary.succeeded,
            summary.failed,
            summary.skipped + summary.cancelled,
            summary.retries,
            summary.final_ceiling,
            cap
        );

        Ok(summary)
    }

    // @returns: Human readable duration
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        if total_seconds >= 60 {
            format!("{}m {}s", total_seconds / 60, total_seconds % 60)
        } else {
            format!("{:.1}s", duration.as_secs_f64())
        }
    }
}

fn flatten_fields(prefix: &str, value: &Value, fields: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_fields(&path, child, fields);
            }
        }
        Value::String(text) => {
            fields.insert(prefix.to_string(), text.clone());
        }
        _ => debug!("Skipping non-text field '{}'", prefix),
    }
}

// @returns: Text cut to at most `max_chars` characters
fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
