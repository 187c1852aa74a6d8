//! Error types for the advisory engine, with retry classification.
//!
//! # Error Handling Philosophy
//!
//! Most failure modes inside the ranking core are *not* errors: a missing
//! BM25 backend or relevance model selects a degraded mode, malformed model
//! outputs default to empty collections, and a single failed rerank judgment
//! is isolated to its candidate. What remains is:
//!
//! | Error | Cause | Policy |
//! |-------|-------|--------|
//! | `InvalidCorpus` | Duplicate fragment identifiers | Fix the fragment source |
//! | `ConfigError` | Invalid engine configuration | Fix `longevity-rag.toml` |
//! | `BackendUnavailable` | Optional capability missing | Caller selects a degraded mode |
//! | `RelevanceModel` | One relevance judgment failed | Isolated by the reranker |
//! | `ApiError`, `NetworkError`, ... | Generation call failed | Propagated unmodified |
//!
//! # Retry Strategies
//!
//! Generation clients that talk to remote services consult
//! [`AdvisoryError::retry_strategy`]. The pipeline itself never retries.

use std::time::Duration;
use thiserror::Error;

/// Result type for advisory operations.
pub type Result<T> = std::result::Result<T, AdvisoryError>;

// ============================================================================
// Retry Strategy
// ============================================================================

/// Strategy for retrying a failed remote call.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    /// Retry with exponential backoff (for transient errors).
    ExponentialBackoff {
        /// Initial delay before first retry.
        base_delay: Duration,
        /// Maximum delay between retries.
        max_delay: Duration,
        /// Maximum number of attempts, including the first.
        max_attempts: u32,
    },

    /// Wait for a specific duration then retry once (for rate limits).
    WaitAndRetry {
        /// Duration to wait before retrying.
        wait: Duration,
    },

    /// Do not retry at all (permanent error).
    NoRetry,
}

impl RetryStrategy {
    /// Standard exponential backoff for network errors.
    pub fn network_backoff() -> Self {
        Self::ExponentialBackoff {
            base_delay: Duration::from_millis(125),
            max_delay: Duration::from_secs(30),
            max_attempts: 5,
        }
    }

    /// Standard exponential backoff for server errors.
    pub fn server_backoff() -> Self {
        Self::ExponentialBackoff {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            max_attempts: 3,
        }
    }

    /// Check if this strategy allows retrying.
    pub fn should_retry(&self) -> bool {
        !matches!(self, Self::NoRetry)
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while building or running the advisory pipeline.
#[derive(Debug, Error)]
pub enum AdvisoryError {
    /// API error from the generation service.
    #[error("API error: {0}")]
    ApiError(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Authentication error.
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// Network error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The evidence corpus violates an invariant.
    #[error("Invalid corpus: {0}")]
    InvalidCorpus(String),

    /// An optional ranking capability could not be constructed.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A relevance judgment failed.
    #[error("Relevance model error: {0}")]
    RelevanceModel(String),

    /// Unknown error.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<reqwest::Error> for AdvisoryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdvisoryError::Timeout
        } else if err.is_connect() {
            AdvisoryError::NetworkError(format!("Connection failed: {}", err))
        } else {
            AdvisoryError::NetworkError(err.to_string())
        }
    }
}

impl AdvisoryError {
    /// Get the appropriate retry strategy for this error.
    ///
    /// # Example
    ///
    /// ```
    /// use longevity_rag::AdvisoryError;
    ///
    /// let error = AdvisoryError::NetworkError("connection failed".to_string());
    /// assert!(error.retry_strategy().should_retry());
    /// ```
    pub fn retry_strategy(&self) -> RetryStrategy {
        match self {
            Self::NetworkError(_) | Self::Timeout => RetryStrategy::network_backoff(),

            Self::RateLimited(_) => RetryStrategy::WaitAndRetry {
                wait: Duration::from_secs(60),
            },

            Self::ApiError(msg)
                if msg.contains("500") || msg.contains("502") || msg.contains("503") =>
            {
                RetryStrategy::server_backoff()
            }

            Self::AuthError(_)
            | Self::ConfigError(_)
            | Self::InvalidCorpus(_)
            | Self::BackendUnavailable(_) => RetryStrategy::NoRetry,

            Self::ApiError(_)
            | Self::SerializationError(_)
            | Self::RelevanceModel(_)
            | Self::Unknown(_) => RetryStrategy::ExponentialBackoff {
                base_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(30),
                max_attempts: 2,
            },
        }
    }

    /// Check if this error is recoverable (can be retried).
    pub fn is_recoverable(&self) -> bool {
        self.retry_strategy().should_retry()
    }
}
