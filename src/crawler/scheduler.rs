//! Request pacing
//!
//! This module handles:
//! - A randomized delay before every fetch dispatch
//! - Exponential backoff between retries
//! - A fetch client decorator that applies the delay transparently
//! - Bounded retry of transient fetch failures

use crate::config::PacingConfig;
use crate::crawler::fetcher::{FetchClient, FetchError, Page};
use crate::model::CrawlRequest;
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

/// Pacing policy consulted before each fetch
#[derive(Debug, Clone)]
pub struct Pacer {
    config: PacingConfig,
}

impl Pacer {
    pub fn new(config: PacingConfig) -> Self {
        Self { config }
    }

    /// A pacer that never waits
    pub fn disabled() -> Self {
        Self::new(PacingConfig {
            min_delay_ms: 0,
            max_delay_ms: 0,
            backoff_base_ms: 0,
            backoff_max_ms: 0,
        })
    }

    /// Randomized delay in `[min_delay_ms, max_delay_ms]`
    pub fn dispatch_delay(&self) -> Duration {
        let (min, max) = (self.config.min_delay_ms, self.config.max_delay_ms);
        if max <= min {
            return Duration::from_millis(min);
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }

    /// Backoff before the given retry attempt
    ///
    /// `min(base * 2^retry_count, max)`, saturating on overflow.
    pub fn backoff(&self, retry_count: u32) -> Duration {
        let factor = 1u64.checked_shl(retry_count).unwrap_or(u64::MAX);
        let millis = self
            .config
            .backoff_base_ms
            .saturating_mul(factor)
            .min(self.config.backoff_max_ms);
        Duration::from_millis(millis)
    }

    /// Sleeps for one dispatch delay
    pub async fn wait_for_dispatch(&self) {
        let delay = self.dispatch_delay();
        if !delay.is_zero() {
            tracing::trace!("Pacing request by {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }
}

/// Fetch client decorator that waits for the pacer before every request
pub struct PacedFetcher<F> {
    inner: F,
    pacer: Pacer,
}

impl<F> PacedFetcher<F> {
    pub fn new(inner: F, pacer: Pacer) -> Self {
        Self { inner, pacer }
    }
}

#[async_trait]
impl<F: FetchClient> FetchClient for PacedFetcher<F> {
    async fn fetch(&self, request: &CrawlRequest) -> Result<Page, FetchError> {
        self.pacer.wait_for_dispatch().await;
        self.inner.fetch(request).await
    }
}

/// Bounded retry of transient fetch failures
///
/// Every attempt is a new [`CrawlRequest`] value from [`CrawlRequest::retry`].
/// Permanent failures (e.g. HTTP 404) are returned immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub pacer: Pacer,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, pacer: Pacer) -> Self {
        Self { max_retries, pacer }
    }

    /// No retries at all
    pub fn none() -> Self {
        Self::new(0, Pacer::disabled())
    }

    pub async fn fetch(
        &self,
        client: &dyn FetchClient,
        request: CrawlRequest,
    ) -> Result<Page, FetchError> {
        let mut request = request;
        loop {
            match client.fetch(&request).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_transient() && request.retry_count < self.max_retries => {
                    let delay = self.pacer.backoff(request.retry_count);
                    tracing::warn!(
                        "Fetch of {} failed ({}), retry {}/{} in {:?}",
                        request.url,
                        e,
                        request.retry_count + 1,
                        self.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    request = request.retry();
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    fn create_test_config() -> PacingConfig {
        PacingConfig {
            min_delay_ms: 20,
            max_delay_ms: 40,
            backoff_base_ms: 100,
            backoff_max_ms: 1000,
        }
    }

    #[test]
    fn test_dispatch_delay_within_window() {
        let pacer = Pacer::new(create_test_config());
        for _ in 0..100 {
            let delay = pacer.dispatch_delay();
            assert!(delay >= Duration::from_millis(20));
            assert!(delay <= Duration::from_millis(40));
        }
    }

    #[test]
    fn test_fixed_delay_when_window_is_empty() {
        let pacer = Pacer::new(PacingConfig {
            min_delay_ms: 15,
            max_delay_ms: 15,
            ..create_test_config()
        });
        assert_eq!(pacer.dispatch_delay(), Duration::from_millis(15));
    }

    #[test]
    fn test_backoff_doubles_until_cap() {
        let pacer = Pacer::new(create_test_config());
        assert_eq!(pacer.backoff(0), Duration::from_millis(100));
        assert_eq!(pacer.backoff(1), Duration::from_millis(200));
        assert_eq!(pacer.backoff(3), Duration::from_millis(800));
        assert_eq!(pacer.backoff(4), Duration::from_millis(1000));
        assert_eq!(pacer.backoff(200), Duration::from_millis(1000));
    }

    #[test]
    fn test_disabled_pacer() {
        let pacer = Pacer::disabled();
        assert!(pacer.dispatch_delay().is_zero());
        assert!(pacer.backoff(5).is_zero());
    }

    struct CountingClient {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FetchClient for CountingClient {
        async fn fetch(&self, request: &CrawlRequest) -> Result<Page, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Page {
                url: request.url.clone(),
                status: 200,
                body: Vec::new(),
            })
        }
    }

    struct FlakyClient {
        calls: AtomicUsize,
        failures: usize,
        status: u16,
    }

    #[async_trait]
    impl FetchClient for FlakyClient {
        async fn fetch(&self, request: &CrawlRequest) -> Result<Page, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(request.retry_count as usize, call);
            if call < self.failures {
                return Err(FetchError::Http {
                    url: request.url.to_string(),
                    status: self.status,
                });
            }
            Ok(Page {
                url: request.url.clone(),
                status: 200,
                body: Vec::new(),
            })
        }
    }

    fn flaky(failures: usize, status: u16) -> FlakyClient {
        FlakyClient {
            calls: AtomicUsize::new(0),
            failures,
            status,
        }
    }

    fn request() -> CrawlRequest {
        CrawlRequest::catalog(Url::parse("https://example.com/?page=1").unwrap(), 1, false)
    }

    #[tokio::test]
    async fn test_no_retry_by_default() {
        let client = flaky(1, 503);
        let result = RetryPolicy::none().fetch(&client, request()).await;
        assert!(result.is_err());
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let client = flaky(2, 503);
        let policy = RetryPolicy::new(3, Pacer::disabled());
        assert!(policy.fetch(&client, request()).await.is_ok());
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let client = flaky(10, 503);
        let policy = RetryPolicy::new(2, Pacer::disabled());
        assert!(policy.fetch(&client, request()).await.is_err());
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let client = flaky(1, 404);
        let policy = RetryPolicy::new(5, Pacer::disabled());
        assert!(policy.fetch(&client, request()).await.is_err());
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_paced_fetcher_delegates() {
        let fetcher = PacedFetcher::new(
            CountingClient {
                calls: AtomicUsize::new(0),
            },
            Pacer::disabled(),
        );
        let request = CrawlRequest::detail(Url::parse("https://example.com/a").unwrap(), false);

        let page = fetcher.fetch(&request).await.unwrap();
        assert_eq!(page.url, request.url);
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 1);
    }
}
