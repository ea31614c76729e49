//! Bounded fan-out for module work
//!
//! Installs and builds spawn package-manager processes, so only a fixed
//! number may be outstanding at once.

use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use wsb_config::{acquire_semaphore_permit, create_semaphore};
use wsb_errors::Error;

/// Run `op` for every item with at most `limit` bodies in flight
///
/// Results come back in completion order. After the first failure the
/// semaphore is closed: bodies already running finish, bodies still waiting
/// for a permit never start, and the first error is returned.
///
/// # Errors
///
/// Returns the first error produced by `op`.
pub async fn run_bounded<I, F, Fut, T>(items: I, limit: usize, op: F) -> Result<Vec<T>, Error>
where
    I: IntoIterator,
    F: Fn(I::Item) -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let semaphore = create_semaphore(limit);

    let mut pending: FuturesUnordered<_> = items
        .into_iter()
        .map(|item| {
            let semaphore = semaphore.clone();
            let body = op(item);
            async move {
                let Ok(_permit) = acquire_semaphore_permit(semaphore.clone(), "batch").await
                else {
                    return None;
                };
                let result = body.await;
                if result.is_err() {
                    semaphore.close();
                }
                Some(result)
            }
        })
        .collect();

    let mut results = Vec::new();
    let mut first_error = None;
    while let Some(outcome) = pending.next().await {
        match outcome {
            Some(Ok(value)) => results.push(value),
            Some(Err(e)) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
            None => {}
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(results),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Barrier;

    #[tokio::test]
    async fn test_never_exceeds_limit() {
        for limit in 1..5 {
            let active = Arc::new(AtomicUsize::new(0));
            let peak = Arc::new(AtomicUsize::new(0));

            let results = run_bounded(0..13, limit, |i| {
                let active = active.clone();
                let peak = peak.clone();
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, Error>(i)
                }
            })
            .await
            .unwrap();

            assert_eq!(results.len(), 13);
            assert!(peak.load(Ordering::SeqCst) <= limit);
        }
    }

    #[tokio::test]
    async fn test_short_list_runs_fully_overlapped() {
        // Deadlocks unless all three bodies are in flight together
        let barrier = Arc::new(Barrier::new(3));
        let run = run_bounded(0..3, 4, |_| {
            let barrier = barrier.clone();
            async move {
                barrier.wait().await;
                Ok::<_, Error>(())
            }
        });
        tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("bodies did not overlap")
            .unwrap();
    }

    #[tokio::test]
    async fn test_failure_stops_new_work() {
        let started = Arc::new(AtomicUsize::new(0));
        let err = run_bounded(0..6, 1, |i| {
            let started = started.clone();
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                if i == 1 {
                    Err(Error::internal("boom"))
                } else {
                    Ok(i)
                }
            }
        })
        .await
        .unwrap_err();

        assert!(err.to_string().contains("boom"));
        assert_eq!(started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_in_flight_work_finishes_after_failure() {
        let finished = Arc::new(AtomicUsize::new(0));
        let result = run_bounded(0..2, 2, |i| {
            let finished = finished.clone();
            async move {
                if i == 0 {
                    return Err(Error::internal("first"));
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let results: Vec<()> = run_bounded(Vec::<u8>::new(), 3, |_| async { Ok(()) })
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
