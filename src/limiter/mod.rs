//! Per-host politeness limits for outbound fetches.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

pub const DEFAULT_MAX_PER_HOST: usize = 2;

/// Bounds concurrent in-flight fetches per network host.
///
/// One counting semaphore per host key, created lazily on first use and kept
/// for the life of the process (host keys accumulate, there is no eviction).
/// Distinct hosts are limited independently; waiters for the same host are
/// not served in FIFO order.
pub struct DomainLimiter {
    max_per_host: usize,
    pools: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl DomainLimiter {
    pub fn new(max_per_host: usize) -> Self {
        Self {
            max_per_host,
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// Host key for a URL: the parsed host, or the whole URL string when no
    /// host can be extracted. Unparsable URLs still get a limiter rather
    /// than a crash.
    pub fn host_key(url: &str) -> String {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| url.to_string())
    }

    /// Acquire a permit for the URL's host, waiting if the host is at its
    /// concurrency limit. Blocks the task, never the thread.
    ///
    /// The permit is released when dropped, on every exit path including
    /// cancellation of the waiting task.
    pub async fn acquire(&self, url: &str) -> OwnedSemaphorePermit {
        let pool = self.pool(&Self::host_key(url));
        // The semaphore is never closed, so acquire_owned cannot fail.
        pool.acquire_owned().await.expect("semaphore closed")
    }

    fn pool(&self, key: &str) -> Arc<Semaphore> {
        let mut pools = self.pools.lock().expect("limiter mutex poisoned");
        pools
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.max_per_host)))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::time::{sleep, timeout, Instant};

    #[test]
    fn test_host_key_extracts_host() {
        assert_eq!(
            DomainLimiter::host_key("https://news.example.com/rss?page=1"),
            "news.example.com"
        );
        assert_eq!(
            DomainLimiter::host_key("http://example.com:8080/path"),
            "example.com"
        );
    }

    #[test]
    fn test_host_key_falls_back_to_raw_url() {
        assert_eq!(DomainLimiter::host_key("not a url"), "not a url");
        assert_eq!(DomainLimiter::host_key(""), "");
    }

    #[tokio::test]
    async fn test_permits_never_exceed_max_per_host() {
        let limiter = Arc::new(DomainLimiter::new(2));
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let limiter = limiter.clone();
            let active = active.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let _permit = limiter.acquire("https://news.example.com/page").await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(20)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_distinct_hosts_are_independent() {
        let limiter = Arc::new(DomainLimiter::new(1));

        let _a = limiter.acquire("https://a.example.com/").await;
        // A held permit for host A must not delay host B.
        let b = timeout(
            Duration::from_millis(100),
            limiter.acquire("https://b.example.com/"),
        )
        .await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_permit_released_on_drop() {
        let limiter = Arc::new(DomainLimiter::new(1));

        let permit = limiter.acquire("https://example.com/").await;
        drop(permit);

        let again = timeout(Duration::from_millis(100), limiter.acquire("https://example.com/")).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_permit_released_when_holder_errors() {
        async fn failing_fetch(limiter: &DomainLimiter) -> Result<(), String> {
            let _permit = limiter.acquire("https://example.com/").await;
            Err("network down".to_string())
        }

        let limiter = DomainLimiter::new(1);
        assert!(failing_fetch(&limiter).await.is_err());

        // The failed attempt must not leak its permit.
        let again = timeout(Duration::from_millis(100), limiter.acquire("https://example.com/")).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_waiter_does_not_consume_a_permit() {
        let limiter = Arc::new(DomainLimiter::new(1));

        let held = limiter.acquire("https://example.com/").await;

        let waiter = {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                let _permit = limiter.acquire("https://example.com/").await;
            })
        };
        sleep(Duration::from_millis(20)).await;
        waiter.abort();
        let _ = waiter.await;

        drop(held);
        let again = timeout(Duration::from_millis(100), limiter.acquire("https://example.com/")).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_serializes_same_host_fetches() {
        let limiter = Arc::new(DomainLimiter::new(2));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..6 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                let _permit = limiter.acquire("https://news.example.com/").await;
                sleep(Duration::from_millis(50)).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // 6 fetches at 50ms each, 2 at a time: at least 3 full batches.
        assert!(start.elapsed() >= Duration::from_millis(140));
    }
}
