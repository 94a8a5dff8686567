/*!
 * Tests for error types and normalization of provider errors
 */

use fieldwise::errors::{AppError, ErrorKind, ItemError, ProviderError, SchedulerError, looks_fatal, looks_rate_limited};
use fieldwise::scheduler::{Classification, classify};

#[test]
fn test_providerError_requestFailed_shouldDisplayCorrectly() {
    let error = ProviderError::RequestFailed("Connection timeout".to_string());
    let display = format!("{}", error);
    assert!(display.contains("API request failed"));
    assert!(display.contains("Connection timeout"));
}

#[test]
fn test_providerError_apiError_shouldDisplayStatusAndMessage() {
    let error = ProviderError::ApiError {
        status_code: 429,
        code: None,
        message: "Too many requests".to_string(),
    };
    let display = format!("{}", error);
    assert!(display.contains("429"));
    assert!(display.contains("Too many requests"));
}

#[test]
fn test_itemError_fromRateLimitExceeded_shouldBeRateLimited() {
    let error: ItemError = ProviderError::RateLimitExceeded("Retry after 60s".to_string()).into();
    assert_eq!(error.kind, ErrorKind::RateLimited);
    assert_eq!(classify(&error), Classification::RateLimited);
}

#[test]
fn test_itemError_fromVendorRateLimitCodes_shouldBeRateLimited() {
    for code in ["rate_limit_exceeded", "rate_limit_error", "RESOURCE_EXHAUSTED", "too_many_requests"] {
        let error: ItemError = ProviderError::ApiError {
            status_code: 400,
            code: Some(code.to_string()),
            message: "request rejected".to_string(),
        }
        .into();
        assert_eq!(error.kind, ErrorKind::RateLimited, "code {}", code);
    }
}

#[test]
fn test_itemError_fromQuotaMessage_shouldBeRateLimited() {
    let error: ItemError = ProviderError::ApiError {
        status_code: 403,
        code: None,
        message: "Quota exceeded for this project".to_string(),
    }
    .into();
    assert_eq!(error.kind, ErrorKind::RateLimited);
}

#[test]
fn test_itemError_fromWrongEndpoint_shouldBeFatalWithGuidance() {
    let error: ItemError = ProviderError::WrongEndpoint("free API key used against the pro endpoint".to_string()).into();
    assert_eq!(error.kind, ErrorKind::FatalConfiguration);
    assert_eq!(classify(&error), Classification::Fatal);
    assert!(error.user_message().contains("Wrong endpoint"));
}

#[test]
fn test_itemError_fromStreamingRejection_shouldBeFatalWithGuidance() {
    let error: ItemError = ProviderError::CapabilityRejected {
        capability: "streaming".to_string(),
        message: "Your organization must be verified to stream this model".to_string(),
    }
    .into();
    assert_eq!(error.kind, ErrorKind::FatalConfiguration);
    assert!(error.user_message().contains("refused streaming"));
}

#[test]
fn test_itemError_fromApiErrorWithFatalMessage_shouldBeFatal() {
    let error: ItemError = ProviderError::ApiError {
        status_code: 400,
        code: None,
        message: "Your organization must be verified to stream this model".to_string(),
    }
    .into();
    assert_eq!(error.kind, ErrorKind::FatalConfiguration);
}

#[test]
fn test_itemError_fromParseError_shouldBeOrdinary() {
    let error: ItemError = ProviderError::ParseError("Invalid JSON".to_string()).into();
    assert_eq!(error.kind, ErrorKind::TransientItemFailure);
    assert_eq!(classify(&error), Classification::Ordinary);
}

#[test]
fn test_itemError_fromAborted_shouldBeCancelled() {
    let error: ItemError = ProviderError::Aborted.into();
    assert!(error.is_cancelled());
    assert_eq!(classify(&error), Classification::Ordinary);
}

#[test]
fn test_looksRateLimited_withPlainMessages_shouldMatchPhrasing() {
    assert!(looks_rate_limited(None, "Rate limit reached for gpt-4o"));
    assert!(looks_rate_limited(None, "429 Too Many Requests"));
    assert!(!looks_rate_limited(None, "Internal server error"));
    assert!(!looks_fatal("Internal server error"));
}

#[test]
fn test_schedulerError_fatal_shouldExposeItemError() {
    let error = SchedulerError::Fatal(ItemError::fatal("bad key"));
    assert_eq!(error.item_error().message, "bad key");
    assert!(format!("{}", error).contains("Batch halted"));
}

#[test]
fn test_appError_fromSchedulerError_shouldWrapCorrectly() {
    let app_error: AppError = SchedulerError::Fatal(ItemError::fatal("bad key")).into();
    assert!(matches!(app_error, AppError::Scheduler(_)));

    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json");
    let app_error: AppError = io_error.into();
    assert!(format!("{}", app_error).contains("File error"));
}
