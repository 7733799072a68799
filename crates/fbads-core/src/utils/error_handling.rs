//! Async operation wrapper
//!
//! Native operations resolve to `Result<T, E>` with whatever error type the
//! capability uses. These helpers translate a failure into [`Error`] with a
//! caller-supplied code and context label, keeping the original failure as
//! the error's cause.

use std::future::Future;
use std::time::Duration;

use crate::error::{Error, ErrorCode, Result};

/// Await a native operation, wrapping any failure into [`Error`]
///
/// # Parameters
///
/// - `operation`: the pending native operation
/// - `context`: label recorded as the error's originating component
/// - `code`: code assigned to a failure
///
/// # Returns
///
/// - `Ok(T)`: the resolved value, unchanged
/// - `Err(Error)`: `code` + `context` + the original message, with the
///   original failure attached as the cause
pub async fn with_error_handling<T, E, F>(operation: F, context: &str, code: ErrorCode) -> Result<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    match operation.await {
        Ok(value) => Ok(value),
        Err(err) => Err(Error::new(code, context, err.to_string()).with_cause(err)),
    }
}

/// [`with_error_handling`] with a deadline
///
/// An operation still pending after `limit` fails with [`ErrorCode::Timeout`].
/// A zero `limit` disables the deadline.
pub async fn with_timeout<T, E, F>(
    operation: F,
    context: &str,
    code: ErrorCode,
    limit: Duration,
) -> Result<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    if limit.is_zero() {
        return with_error_handling(operation, context, code).await;
    }

    match tokio::time::timeout(limit, with_error_handling(operation, context, code)).await {
        Ok(result) => result,
        Err(_) => Err(Error::timeout(
            context,
            format!("Operation timed out after {}ms", limit.as_millis()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NativeError;
    use std::error::Error as _;

    #[tokio::test]
    async fn test_resolved_value_passes_through() {
        let result = with_error_handling(
            async { Ok::<_, NativeError>("success") },
            "test",
            ErrorCode::NativeError,
        )
        .await;

        assert_eq!(result.unwrap(), "success");
    }

    #[tokio::test]
    async fn test_rejection_is_wrapped_with_cause() {
        let result = with_error_handling(
            async { Err::<bool, _>(NativeError::new("Original error")) },
            "InterstitialAdManager.showAd",
            ErrorCode::AdDisplayFailed,
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.code(), ErrorCode::AdDisplayFailed);
        assert_eq!(err.native_module(), "InterstitialAdManager.showAd");
        assert_eq!(err.message(), "Original error");
        let cause = err.source().expect("cause attached");
        assert_eq!(cause.to_string(), "Original error");
        assert!(cause.downcast_ref::<NativeError>().is_some());
    }

    #[tokio::test]
    async fn test_deadline_elapses_into_timeout() {
        let result = with_timeout(
            std::future::pending::<std::result::Result<bool, NativeError>>(),
            "slow",
            ErrorCode::AdLoadFailed,
            Duration::from_millis(20),
        )
        .await;

        assert_eq!(result.unwrap_err().code(), ErrorCode::Timeout);
    }

    #[tokio::test]
    async fn test_zero_limit_disables_deadline() {
        let result = with_timeout(
            async { Ok::<_, NativeError>(7) },
            "fast",
            ErrorCode::NativeError,
            Duration::ZERO,
        )
        .await;

        let value = tokio_test::assert_ok!(result);
        assert_eq!(value, 7);
    }
}
