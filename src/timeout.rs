//! Timeout helpers for async operations
//!
//! ```ignore
//! let output = with_timeout(Duration::from_secs(300), clone(repo), "git clone").await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::types::{DiscoveryError, Result};

/// Execute an async operation with a timeout
///
/// Returns `DiscoveryError::Timeout` if the operation doesn't complete in time.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(DiscoveryError::timeout(operation_name, timeout)),
    }
}

/// Variant for futures that do not return a `Result`
pub async fn with_timeout_map<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => Ok(result),
        Err(_) => Err(DiscoveryError::timeout(operation_name, timeout)),
    }
}
