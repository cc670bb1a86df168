use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Limits the number of in-flight requests against a single origin.
///
/// Obtain one per origin via [`Throttler::new`], then call [`Throttler::acquire`]
/// before each request. At most `max_concurrent` requests hold a permit at the
/// same time; the rest park in FIFO order until a permit is dropped.
#[derive(Debug)]
pub struct Throttler {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl Throttler {
    /// Create a new throttler that allows at most `max_concurrent` requests at a time.
    pub fn new(max_concurrent: usize) -> Arc<Self> {
        let max_concurrent = max_concurrent.max(1);
        Arc::new(Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        })
    }

    /// Wait for a concurrency slot.
    ///
    /// The returned permit must be held for the duration of the request. When it
    /// is dropped, the slot becomes available for another caller.
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .expect("semaphore is never closed")
    }

    /// Number of requests currently holding a permit.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.semaphore.available_permits()
    }

    #[must_use]
    pub const fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use core::time::Duration;

    #[tokio::test]
    async fn limits_concurrency() {
        let throttler = Throttler::new(2);
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let throttler = Arc::clone(&throttler);
                let active = Arc::clone(&active);
                let max_seen = Arc::clone(&max_seen);
                tokio::spawn(async move {
                    let _permit = throttler.acquire().await;
                    let current = active.fetch_add(1, Ordering::SeqCst) + 1;
                    _ = max_seen.fetch_max(current, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    _ = active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        _ = futures_util::future::join_all(tasks).await;

        assert!(max_seen.load(Ordering::SeqCst) <= 2);
        assert_eq!(throttler.in_flight(), 0);
    }

    #[tokio::test]
    async fn permit_release_frees_slot() {
        let throttler = Throttler::new(1);

        let permit = throttler.acquire().await;
        assert_eq!(throttler.in_flight(), 1);

        drop(permit);
        assert_eq!(throttler.in_flight(), 0);
    }

    #[test]
    fn zero_is_clamped_to_one() {
        let throttler = Throttler::new(0);
        assert_eq!(throttler.max_concurrent(), 1);
    }
}
