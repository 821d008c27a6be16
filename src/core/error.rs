//! Per-symbol failure taxonomy

use thiserror::Error;

/// Why a single symbol could not be fetched or stored.
///
/// These are reported per item and never abort a batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// The symbol is valid but the provider returned no rows.
    #[error("no data")]
    NoData,

    /// Network failure, bad HTTP status, provider error object or a malformed body.
    #[error("provider error: {detail}")]
    ProviderError { detail: String },

    /// Every attempt failed; `last` is the error from the final attempt.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<FetchError> },

    /// The series was fetched but could not be written to the cache.
    #[error("storage error: {detail}")]
    Storage { detail: String },
}

impl FetchError {
    pub fn provider(detail: impl Into<String>) -> Self {
        FetchError::ProviderError {
            detail: detail.into(),
        }
    }

    /// Short tag used in summaries and exports.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::NoData => "NoData",
            FetchError::ProviderError { .. } => "ProviderError",
            FetchError::RetriesExhausted { .. } => "RetriesExhausted",
            FetchError::Storage { .. } => "Storage",
        }
    }

    /// Whether `with_retry` should try again after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::NoData | FetchError::ProviderError { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retries_exhausted_keeps_last_error() {
        let err = FetchError::RetriesExhausted {
            attempts: 3,
            last: Box::new(FetchError::NoData),
        };
        assert_eq!(err.kind(), "RetriesExhausted");
        assert_eq!(err.to_string(), "retries exhausted after 3 attempts: no data");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_provider_error_display() {
        let err = FetchError::provider("HTTP 404 Not Found");
        assert_eq!(err.to_string(), "provider error: HTTP 404 Not Found");
        assert!(err.is_retryable());
    }
}
