/*!
 * Integration tests for field translation batches
 */

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use fieldwise::errors::SchedulerError;
use fieldwise::providers::mock::MockProvider;
use fieldwise::scheduler::{AdaptiveScheduler, CancellationGate, ProgressPhase};
use fieldwise::translation::{FieldTranslation, TranslationJob, translate_fields};
use crate::common::RecordingSink;

fn locales(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|code| code.to_string()).collect()
}

fn sample_fields() -> Vec<(&'static str, &'static str)> {
    vec![
        ("title", "Welcome to our store"),
        ("body", "Free shipping on all orders"),
        ("seo.description", "The best store in town"),
    ]
}

#[tokio::test(start_paused = true)]
async fn test_job_withWorkingProvider_shouldTranslateEveryPair() {
    let sink = RecordingSink::new();
    let provider = Arc::new(MockProvider::working().with_latency(Duration::from_millis(100), 0));
    let planned = TranslationJob::plan(sample_fields(), "en", &locales(&["fr", "de", "it"]));
    let job = TranslationJob::new(provider.clone(), "en").with_fields(planned);

    let scheduler = AdaptiveScheduler::default().with_reporter(sink.reporter());
    let summary = job.run(&scheduler, 4).await.unwrap();

    assert_eq!(summary.total, 9);
    assert!(summary.is_complete());
    assert_eq!(provider.request_count(), 9);

    let results = job.results();
    assert_eq!(results.len(), 9);
    assert_eq!(results.get("seo.description", "it").as_deref(), Some("[it] The best store in town"));

    let done: Vec<String> = sink.ids(ProgressPhase::Done);
    assert!(done.contains(&"title.fr".to_string()));
    assert!(!sink.ids(ProgressPhase::Partial).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_job_withRateLimitedProvider_shouldRetryAndComplete() {
    let provider = Arc::new(MockProvider::rate_limited_first(1));
    let planned = TranslationJob::plan(sample_fields(), "en", &locales(&["fr", "de"]));
    let job = TranslationJob::new(provider.clone(), "en").with_fields(planned);

    let summary = job.run(&AdaptiveScheduler::default(), 4).await.unwrap();

    assert_eq!(summary.succeeded, 6);
    assert_eq!(summary.retries, 6);
    assert_eq!(provider.calls_for("body", "de"), 2);
    assert_eq!(job.results().len(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_job_withIntermittentRateLimits_shouldStillComplete() {
    let provider = Arc::new(MockProvider::intermittent(4));
    let fields: Vec<(String, String)> = (0..12)
        .map(|i| (format!("field{}", i), format!("Text number {}", i)))
        .collect();
    let planned = TranslationJob::plan(fields, "en", &locales(&["fr"]));
    let job = TranslationJob::new(provider, "en").with_fields(planned);

    let summary = job.run(&AdaptiveScheduler::default(), 6).await.unwrap();

    assert_eq!(summary.succeeded, 12);
    assert!(summary.retries > 0);
    assert!(summary.final_ceiling <= 6);
}

#[tokio::test]
async fn test_job_withFailingProvider_shouldRetireItemsAsFailed() {
    let sink = RecordingSink::new();
    let provider = Arc::new(MockProvider::failing());
    let job = TranslationJob::new(provider.clone(), "en")
        .with_fields(vec![FieldTranslation::new("title", "fr", "Hello")]);

    let scheduler = AdaptiveScheduler::default().with_reporter(sink.reporter());
    let summary = job.run(&scheduler, 2).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(provider.request_count(), 1);
    assert_eq!(sink.ids(ProgressPhase::Failed), vec!["title.fr"]);
    assert!(job.results().is_empty());
}

#[tokio::test]
async fn test_job_withWrongEndpoint_shouldHaltWithGuidance() {
    let provider = Arc::new(MockProvider::wrong_endpoint());
    let planned = TranslationJob::plan(sample_fields(), "en", &locales(&["fr", "de"]));
    let job = TranslationJob::new(provider.clone(), "en").with_fields(planned);

    let result = job.run(&AdaptiveScheduler::default(), 1).await;

    let Err(SchedulerError::Fatal(error)) = result else {
        panic!("expected the batch to halt");
    };
    assert!(error.user_message().contains("Wrong endpoint"));
    // cap 1: nothing else was admitted after the fatal error
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_job_cancelledMidStream_shouldNotCommitAbortedItems() {
    let gate = CancellationGate::new();
    let provider = Arc::new(
        MockProvider::working()
            .with_latency(Duration::from_millis(10), 0)
            .with_chunk_delay(Duration::from_millis(100)),
    );
    let planned = TranslationJob::plan(sample_fields(), "en", &locales(&["fr", "de"]));
    let job = TranslationJob::new(provider, "en").with_fields(planned);

    let trigger = gate.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    let scheduler = AdaptiveScheduler::default().with_gate(gate);
    let summary = job.run(&scheduler, 2).await.unwrap();

    assert_eq!(summary.cancelled, 2);
    assert_eq!(summary.skipped, 4);
    assert!(job.results().is_empty());
}

#[tokio::test]
async fn test_translate_fields_withSourceLocaleTarget_shouldSkipIt() {
    let mut fields = BTreeMap::new();
    fields.insert("title".to_string(), "Hello".to_string());
    fields.insert("empty".to_string(), "".to_string());

    let (summary, translations) = translate_fields(
        Arc::new(MockProvider::working()),
        &AdaptiveScheduler::default(),
        &fields,
        "en",
        &locales(&["en", "ja"]),
        4,
    )
    .await
    .unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(translations.len(), 1);
    assert_eq!(translations["title"]["ja"], "[ja] Hello");
}
