//! Unified Timeout Configuration
//!
//! Model-call timeout derived from [`Config`] plus a helper that wraps async
//! operations and maps expiry onto [`GraderError::Timeout`]. The clone
//! timeout lives on the git fetcher and the connect timeout on the HTTP client.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::ai::timeout::{TimeoutConfig, with_timeout};
//!
//! let timeouts = TimeoutConfig::from_config(&config);
//! let response = with_timeout(
//!     timeouts.llm_request,
//!     provider.generate(&prompt),
//!     "LLM request"
//! ).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::config::Config;
use crate::constants::network as net_constants;
use crate::types::{GraderError, Result};

/// Timeouts applied around grading calls
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Timeout for one LLM API request (default: 5 minutes)
    pub llm_request: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            llm_request: Duration::from_secs(net_constants::DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl TimeoutConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            llm_request: config.llm.timeout(),
        }
    }
}

/// Execute an async operation with a timeout
///
/// Returns a timeout error if the operation doesn't complete within the specified duration.
/// The inner future is dropped on expiry.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(GraderError::timeout(operation_name, timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_config_defaults() {
        let config = TimeoutConfig::default();
        assert_eq!(config.llm_request.as_secs(), 300);
    }

    #[test]
    fn test_timeout_config_from_config() {
        let mut config = Config::default();
        config.llm.timeout_secs = 12;

        let timeouts = TimeoutConfig::from_config(&config);
        assert_eq!(timeouts.llm_request, Duration::from_secs(12));
    }

    #[tokio::test]
    async fn test_with_timeout_success() {
        let result = with_timeout(
            Duration::from_secs(1),
            async { Ok::<_, GraderError>(42) },
            "test operation",
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result = with_timeout(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, GraderError>(42)
            },
            "slow operation",
        )
        .await;
        assert!(matches!(result.unwrap_err(), GraderError::Timeout { .. }));
    }
}
