//! Metrics source abstraction.
//!
//! Defines the `MetricsSource` trait implemented by the Lixinger adapter, so
//! the pipeline can be driven by any source (including test doubles).

use async_trait::async_trait;
use std::fmt;

use super::{MetricRequest, RawDataset};

// ============================================================================
// Provider Error
// ============================================================================

/// Errors specific to data providers.
#[derive(Debug, Clone)]
pub enum ProviderError {
    /// Network error (connection failed, timeout)
    Network(String),
    /// Non-200 HTTP status
    Http { status: u16, body: String },
    /// Response parsed but carried no usable rows
    DataNotAvailable(String),
    /// Invalid request parameters
    InvalidRequest(String),
    /// Unparsable response or other provider-side failure
    Internal(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Http { status, body } => {
                write!(f, "HTTP {}", status)?;
                if !body.is_empty() {
                    write!(f, ": {}", body)?;
                }
                Ok(())
            }
            Self::DataNotAvailable(msg) => write!(f, "Data not available: {}", msg),
            Self::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    /// Build from a transport-level reqwest failure.
    pub fn from_transport(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Network("Request timeout".into())
        } else if e.is_connect() {
            Self::Network("Connection failed".into())
        } else {
            Self::Network(e.to_string())
        }
    }

    /// Transport-level failure (as opposed to a provider answer).
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

// ============================================================================
// Metrics Source Trait
// ============================================================================

/// A provider that answers one batched metrics request.
///
/// Implementations make exactly one attempt; there is no retry.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Provider name for logs (e.g. "lixinger")
    fn name(&self) -> &'static str;

    /// Fetch the requested metrics for all codes.
    ///
    /// Succeeds only with a non-empty dataset.
    async fn fetch(&self, request: &MetricRequest) -> Result<RawDataset, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::Http {
            status: 500,
            body: "oops".into(),
        };
        assert_eq!(err.to_string(), "HTTP 500: oops");

        let err = ProviderError::Http {
            status: 502,
            body: String::new(),
        };
        assert_eq!(err.to_string(), "HTTP 502");

        assert!(ProviderError::Network("timeout".into()).is_network());
        assert!(!ProviderError::DataNotAvailable("empty".into()).is_network());
    }
}
