//! Timeout utilities for bounding external work.
//!
//! The call-graph helper is a separate program that may hang on hostile
//! input; everything that waits on it goes through [`with_timeout`].

use crate::error::{MaiwareError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error};

/// Default timeout for the external call-graph tool, in seconds
pub const DEFAULT_TOOL_TIMEOUT_SECONDS: u64 = 300; // 5 minutes

/// Timeout configuration for a bounded operation
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Maximum duration for the operation
    pub duration: Duration,
    /// Whether to log timeout errors
    pub log_warnings: bool,
    /// Operation name for logging
    pub operation_name: String,
}

impl TimeoutConfig {
    /// Create a new timeout configuration
    pub fn new(seconds: u64, operation: impl Into<String>) -> Self {
        Self {
            duration: Duration::from_secs(seconds),
            log_warnings: true,
            operation_name: operation.into(),
        }
    }

    /// Create a configuration from a millisecond bound (used by tests)
    pub fn from_millis(millis: u64, operation: impl Into<String>) -> Self {
        Self {
            duration: Duration::from_millis(millis),
            log_warnings: true,
            operation_name: operation.into(),
        }
    }

    /// Create a configuration from an explicit duration
    pub fn from_duration(duration: Duration, operation: impl Into<String>) -> Self {
        Self {
            duration,
            log_warnings: true,
            operation_name: operation.into(),
        }
    }
}

/// Execute an async operation with a timeout.
///
/// The future is dropped when the bound is exceeded, so any resources it
/// owns (e.g. a child process spawned with `kill_on_drop`) are released.
pub async fn with_timeout<T, F>(config: TimeoutConfig, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    debug!(
        "Starting operation '{}' with timeout of {:?}",
        config.operation_name, config.duration
    );

    match timeout(config.duration, future).await {
        Ok(result) => {
            debug!("Operation '{}' completed", config.operation_name);
            result
        }
        Err(_) => {
            if config.log_warnings {
                error!(
                    "Operation '{}' timed out after {:?}",
                    config.operation_name, config.duration
                );
            }

            Err(MaiwareError::Timeout {
                limit: config.duration,
            })
        }
    }
}
