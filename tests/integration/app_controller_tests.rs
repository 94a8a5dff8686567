/*!
 * Integration tests for the file-level translation workflow
 */

use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use fieldwise::app_config::Config;
use fieldwise::app_controller::Controller;
use fieldwise::errors::SchedulerError;
use fieldwise::providers::mock::MockProvider;
use fieldwise::scheduler::CancellationGate;
use crate::common;

fn test_config() -> Config {
    let mut config = Config::default();
    config.target_locales = vec!["fr".to_string(), "es".to_string()];
    config.scheduler.retry_base_delay_ms = 10;
    config
}

/// Test the controller initialization with default config
#[test]
fn test_controller_initialization_withDefaultConfig_shouldSucceed() -> Result<()> {
    let controller = Controller::new_for_test()?;
    assert_eq!(controller.config().source_locale, "en");
    Ok(())
}

#[test]
fn test_controller_withInvalidConfig_shouldFail() {
    let mut config = Config::default();
    config.target_locales.clear();
    assert!(Controller::with_config(config).is_err());
}

#[test]
fn test_read_fields_withNestedDocument_shouldFlattenTextFields() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_fields(temp_dir.path(), "content.json")?;

    let fields = Controller::read_fields(&input)?;

    assert_eq!(fields.len(), 4);
    assert_eq!(fields["seo.description"], "The best store in town");
    assert!(!fields.contains_key("position"));
    Ok(())
}

#[test]
fn test_read_fields_withArrayDocument_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "content.json", r#"["a", "b"]"#)?;

    assert!(Controller::read_fields(&input).is_err());
    Ok(())
}

#[tokio::test]
async fn test_run_withWorkingProvider_shouldWriteTranslations() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_fields(temp_dir.path(), "content.json")?;
    let controller = Controller::with_config(test_config())?;

    let summary = controller
        .run(&input, Arc::new(MockProvider::working()), CancellationGate::new(), false)
        .await?;

    // "seo.keywords" is empty and skipped: 3 fields x 2 locales
    assert_eq!(summary.total, 6);
    assert!(summary.is_complete());

    let output = temp_dir.path().join("content.translated.json");
    let written: BTreeMap<String, BTreeMap<String, String>> =
        serde_json::from_str(&std::fs::read_to_string(&output)?)?;
    assert_eq!(written["title"]["es"], "[es] Welcome to our store");
    assert_eq!(written["seo.description"].len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_run_withExistingOutput_shouldRequireForce() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_fields(temp_dir.path(), "content.json")?;
    common::create_test_file(temp_dir.path(), "content.translated.json", "{}")?;
    let controller = Controller::with_config(test_config())?;

    let refused = controller
        .run(&input, Arc::new(MockProvider::working()), CancellationGate::new(), false)
        .await;
    assert!(refused.is_err());

    let forced = controller
        .run(&input, Arc::new(MockProvider::working()), CancellationGate::new(), true)
        .await?;
    assert!(forced.is_complete());
    Ok(())
}

#[tokio::test]
async fn test_run_withStreamingRejected_shouldFailWithoutOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_fields(temp_dir.path(), "content.json")?;
    let controller = Controller::with_config(test_config())?;

    let error = controller
        .run(&input, Arc::new(MockProvider::streaming_rejected()), CancellationGate::new(), false)
        .await
        .unwrap_err();

    assert!(error.downcast_ref::<SchedulerError>().is_some());
    assert!(format!("{}", error).contains("refused streaming"));
    assert!(!temp_dir.path().join("content.translated.json").exists());
    Ok(())
}

/// Cancelling the gate, as the CLI does on Ctrl-C, aborts fields mid-request
#[tokio::test(start_paused = true)]
async fn test_run_cancelledDuringRequests_shouldAbortInFlightFields() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_fields(temp_dir.path(), "content.json")?;
    let controller = Controller::with_config(test_config())?;
    let provider = MockProvider::working().with_latency(Duration::from_secs(10), 0);

    let gate = CancellationGate::new();
    let trigger = gate.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = tokio::time::Instant::now();
    let summary = controller.run(&input, Arc::new(provider), gate, false).await?;

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.cancelled + summary.skipped, summary.total);
    assert!(summary.cancelled > 0);
    assert!(!temp_dir.path().join("content.translated.json").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withMissingInput_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = Controller::with_config(test_config())?;

    let result = controller
        .run(
            &temp_dir.path().join("missing.json"),
            Arc::new(MockProvider::working()),
            CancellationGate::new(),
            false,
        )
        .await;
    assert!(result.is_err());
    Ok(())
}
