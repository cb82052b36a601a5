//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap backend calls with a deadline
//! - Cancel the individual call cleanly on timeout
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - Only the in-flight future is dropped; shared clients stay usable

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// The deadline elapsed before the call completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline of {0:?} exceeded")]
pub struct DeadlineExceeded(pub Duration);

/// Run `fut`, abandoning it after `deadline`.
pub async fn with_deadline<F, T>(deadline: Duration, fut: F) -> Result<T, DeadlineExceeded>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| DeadlineExceeded(deadline))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_within_deadline() {
        let value = with_deadline(Duration::from_secs(1), async { 7 }).await;
        assert_eq!(value, Ok(7));
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let result = with_deadline(
            Duration::from_millis(50),
            tokio::time::sleep(Duration::from_secs(10)),
        )
        .await;
        assert_eq!(result, Err(DeadlineExceeded(Duration::from_millis(50))));
    }
}
