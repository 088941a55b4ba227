//! Bounded adapter operations
//!
//! Every awaitable call to the adapter goes through [`with_timeout`]. The work
//! future is dropped when the timer wins, which releases whatever read or
//! write it was holding before the error is returned.

use crate::error::ObdError;
use std::future::Future;
use std::time::Duration;

/// Race `fut` against `limit`; the loser is dropped.
pub async fn with_timeout<T, F>(operation: &str, limit: Duration, fut: F) -> Result<T, ObdError>
where
    F: Future<Output = Result<T, ObdError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ObdError::Timeout {
            operation: operation.to_string(),
            after_ms: limit.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct SetOnDrop(Arc<AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_work_wins() {
        let out = with_timeout("fast", Duration::from_millis(100), async { Ok(7) }).await;
        assert_eq!(out.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_wins_and_releases_work() {
        let released = Arc::new(AtomicBool::new(false));
        let guard = SetOnDrop(released.clone());
        let out: Result<(), _> = with_timeout("slow", Duration::from_millis(50), async move {
            let _held = guard;
            std::future::pending::<()>().await;
            Ok(())
        })
        .await;

        match out {
            Err(ObdError::Timeout { operation, after_ms }) => {
                assert_eq!(operation, "slow");
                assert_eq!(after_ms, 50);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_inner_error_passes_through() {
        let out: Result<(), _> =
            with_timeout("nodata", Duration::from_secs(1), async { Err(ObdError::NoData) }).await;
        assert!(matches!(out, Err(ObdError::NoData)));
    }
}
