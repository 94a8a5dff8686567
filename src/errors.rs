/*!
 * Error types for the fieldwise crate.
 *
 * Provider errors carry vendor-specific detail (status codes, error codes,
 * raw messages). Before they reach the scheduler they are normalized into
 * an `ItemError` whose `ErrorKind` belongs to a small closed set, so the
 * scheduler never has to look at vendor shapes.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use thiserror::Error;

/// Errors that can occur when talking to a provider API
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Vendor error code, when the body carried one
        code: Option<String>,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The credential belongs to a tier that must use a different endpoint
    #[error("Wrong endpoint for credential tier: {0}")]
    WrongEndpoint(String),

    /// The provider refuses a capability the whole batch depends on
    #[error("Capability '{capability}' rejected: {message}")]
    CapabilityRejected {
        /// Capability that was requested, e.g. "streaming"
        capability: String,
        /// Error message from the API
        message: String,
    },

    /// The request was aborted through the cancellation signal
    #[error("Request aborted")]
    Aborted,
}

/// Closed set of error kinds the scheduler reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Retryable; triggers backoff and halves the concurrency ceiling
    RateLimited,
    /// Non-retryable and batch-ending
    FatalConfiguration,
    /// Retired as failed without a retry from the scheduler
    TransientItemFailure,
    /// Cooperative cancellation was observed; not a failure
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RateLimited => "rate limited",
            Self::FatalConfiguration => "fatal configuration",
            Self::TransientItemFailure => "item failure",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// A normalized error produced by a work item.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ItemError {
    /// Normalized category
    pub kind: ErrorKind,
    /// Human-readable detail
    pub message: String,
}

impl ItemError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FatalConfiguration, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransientItemFailure, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "cancelled")
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }

    /// Message suitable for a single batch-level alert.
    pub fn user_message(&self) -> String {
        match self.kind {
            ErrorKind::RateLimited => {
                "The provider is rate limiting requests. Lower the concurrency or wait before retrying.".to_string()
            }
            ErrorKind::FatalConfiguration if WRONG_ENDPOINT_PATTERN.is_match(&self.message) => {
                format!(
                    "Wrong endpoint for this credential tier. Check that the API key matches the configured endpoint ({}).",
                    self.message
                )
            }
            ErrorKind::FatalConfiguration if STREAMING_PATTERN.is_match(&self.message) => {
                format!(
                    "The provider refused streaming for this account. Verify the organization or disable streaming ({}).",
                    self.message
                )
            }
            ErrorKind::FatalConfiguration => {
                format!("Provider configuration error: {}", self.message)
            }
            ErrorKind::TransientItemFailure => format!("Translation failed: {}", self.message),
            ErrorKind::Cancelled => "Translation cancelled.".to_string(),
        }
    }
}

/// Vendor error codes that mean "slow down"
const RATE_LIMIT_CODES: &[&str] = &[
    "rate_limit_exceeded",
    "rate_limit_error",
    "resource_exhausted",
    "too_many_requests",
];

static RATE_LIMIT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)rate[\s_-]?limit|too many requests|quota exceeded|resource[\s_]exhausted").unwrap()
});

static WRONG_ENDPOINT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)wrong endpoint|(free|pro) (api )?(key|account|tier).*endpoint").unwrap()
});

static STREAMING_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(organization|org)\b.*\b(verified|verification)\b.*\bstream|stream\w*\b.*\bnot (allowed|permitted|verified)").unwrap()
});

/// Returns true when a vendor code or message reads as a rate limit.
pub fn looks_rate_limited(code: Option<&str>, message: &str) -> bool {
    let code_matches = code
        .map(|c| RATE_LIMIT_CODES.contains(&c.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    code_matches || RATE_LIMIT_PATTERN.is_match(message)
}

/// Returns true when a message describes a batch-wide configuration problem.
pub fn looks_fatal(message: &str) -> bool {
    WRONG_ENDPOINT_PATTERN.is_match(message) || STREAMING_PATTERN.is_match(message)
}

impl From<ProviderError> for ItemError {
    fn from(error: ProviderError) -> Self {
        let message = error.to_string();
        match error {
            ProviderError::RateLimitExceeded(_) => Self::rate_limited(message),
            ProviderError::ApiError { status_code: 429, .. } => Self::rate_limited(message),
            ProviderError::ApiError { code, message: body, .. } => {
                if looks_rate_limited(code.as_deref(), &body) {
                    Self::rate_limited(message)
                } else if looks_fatal(&body) {
                    Self::fatal(message)
                } else {
                    Self::transient(message)
                }
            }
            ProviderError::WrongEndpoint(_)
            | ProviderError::CapabilityRejected { .. }
            | ProviderError::AuthenticationError(_) => Self::fatal(message),
            ProviderError::Aborted => Self::cancelled(),
            ProviderError::RequestFailed(detail) | ProviderError::ConnectionError(detail) => {
                if looks_rate_limited(None, &detail) {
                    Self::rate_limited(message)
                } else {
                    Self::transient(message)
                }
            }
            ProviderError::ParseError(_) => Self::transient(message),
        }
    }
}

/// Errors that end a whole batch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// A fatal configuration error was observed; the batch was halted
    #[error("Batch halted: {0}")]
    Fatal(ItemError),
}

impl SchedulerError {
    /// The error that latched the fatal state
    pub fn item_error(&self) -> &ItemError {
        match self {
            Self::Fatal(error) => error,
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error that halted a translation batch
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
