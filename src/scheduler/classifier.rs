/*!
 * Rate-limit classification of item errors.
 *
 * Errors arrive already normalized into `ErrorKind`, so this stays
 * vendor-agnostic.
 */

use crate::errors::{ErrorKind, ItemError};

/// What the scheduler should do with a failed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The batch cannot make progress; halt everything
    Fatal,
    /// Back off, shrink the ceiling and retry if budget remains
    RateLimited,
    /// Retire the item as failed
    Ordinary,
}

/// Classify a normalized item error.
pub fn classify(error: &ItemError) -> Classification {
    match error.kind {
        ErrorKind::FatalConfiguration => Classification::Fatal,
        ErrorKind::RateLimited => Classification::RateLimited,
        ErrorKind::TransientItemFailure | ErrorKind::Cancelled => Classification::Ordinary,
    }
}
