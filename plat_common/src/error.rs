//! Errors reported across the detector and price-lookup boundaries

use thiserror::Error;

/// Failure of the item detector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectionError {
    /// The detector has no credentials; raised before any network call.
    #[error("detector is not configured: {0}")]
    NotConfigured(String),
    /// The detector was unreachable or returned output that could not be used.
    #[error("failed to analyze image: {0}")]
    Failed(String),
}

/// Failure of a single price lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The market has no record for this slug.
    #[error("no market listing for '{0}'")]
    NotFound(String),
    /// Network, status or parse failure. Worth retrying.
    #[error("market lookup failed: {0}")]
    Transient(String),
}

impl LookupError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, LookupError::Transient(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown item category: '{0}' (expected prime_parts or relics)")]
pub struct ParseCategoryError(pub String);
