/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Lazily refreshed credentials.
//!
//! [`CredentialsCache`] holds the last credentials a provider loaded. Credentials are reloaded
//! when they were explicitly expired, when either key is empty, or when they expire within the
//! expiry window. Reloads go through a [`RefreshCell`], so concurrent callers share one load.

use super::refresh::RefreshCell;
use super::{future, Credentials, ProvideCredentials, Result, SharedCredentialsProvider};
use crate::time_source::{SharedTimeSource, SystemTimeSource};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_EXPIRY_WINDOW: Duration = Duration::from_secs(10);

#[derive(Debug, Default)]
struct Slot {
    credentials: RwLock<Option<Credentials>>,
    expired: AtomicBool,
}

/// The credentials a single provider owns, plus the coalescing state for reloading them.
#[derive(Clone, Debug)]
pub struct CredentialsCache {
    slot: Arc<Slot>,
    refresh: RefreshCell<Result>,
    time_source: SharedTimeSource,
    expiry_window: Duration,
}

impl Default for CredentialsCache {
    fn default() -> Self {
        CredentialsCache {
            slot: Default::default(),
            refresh: RefreshCell::new(),
            time_source: Arc::new(SystemTimeSource),
            expiry_window: DEFAULT_EXPIRY_WINDOW,
        }
    }
}

impl CredentialsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `time_source` for "now", e.g. a clock-skew corrected source.
    pub fn with_time_source(mut self, time_source: SharedTimeSource) -> Self {
        self.time_source = time_source;
        self
    }

    /// Credentials expiring within `window` are reloaded before use.
    pub fn with_expiry_window(mut self, window: Duration) -> Self {
        self.expiry_window = window;
        self
    }

    pub fn expiry_window(&self) -> Duration {
        self.expiry_window
    }

    /// The last credentials loaded, whether or not they are still fresh.
    pub fn cached(&self) -> Option<Credentials> {
        self.slot
            .credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn fresh(&self) -> Option<Credentials> {
        if self.slot.expired.load(Ordering::Acquire) {
            return None;
        }
        let now = self.time_source.now();
        self.cached()
            .filter(|creds| !creds.needs_refresh(now, self.expiry_window))
    }

    /// Whether the next [`get_or_load`](Self::get_or_load) will reload.
    pub fn needs_refresh(&self) -> bool {
        self.fresh().is_none()
    }

    /// Marks the cached credentials as expired; the next `get_or_load` reloads.
    pub fn expire(&self) {
        self.slot.expired.store(true, Ordering::Release);
    }

    /// Returns fresh cached credentials or reloads them with `load`.
    pub async fn get_or_load<F, Fut>(&self, load: F) -> Result
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result>,
    {
        match self.fresh() {
            Some(credentials) => {
                debug!(provider = credentials.provider_name(), "serving cached credentials");
                Ok(credentials)
            }
            None => self.refresh(load).await,
        }
    }

    /// Reloads with `load`, or joins the reload already in flight.
    ///
    /// The cache is only updated on success; a failed load leaves the previous credentials and
    /// the expired flag untouched.
    pub async fn refresh<F, Fut>(&self, load: F) -> Result
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result>,
    {
        self.refresh
            .run(|| async {
                debug!("refreshing credentials");
                let result = load().await;
                match &result {
                    Ok(credentials) => {
                        *self
                            .slot
                            .credentials
                            .write()
                            .unwrap_or_else(PoisonError::into_inner) = Some(credentials.clone());
                        self.slot.expired.store(false, Ordering::Release);
                    }
                    Err(err) => warn!(error = %err, "failed to refresh credentials"),
                }
                result
            })
            .await
    }
}

/// Caches the credentials of another provider.
///
/// ```rust
/// use aws_types::credential::lazy_caching::LazyCachingCredentialsProvider;
/// use aws_types::credential::{provide_credentials_fn, Credentials};
/// use std::time::Duration;
///
/// let provider = LazyCachingCredentialsProvider::new(provide_credentials_fn(|| async {
///     // An async process to retrieve credentials would go here:
///     Ok(Credentials::from_keys("example", "example", None))
/// }))
/// .with_expiry_window(Duration::from_secs(30));
/// ```
#[derive(Clone, Debug)]
pub struct LazyCachingCredentialsProvider {
    load: SharedCredentialsProvider,
    cache: CredentialsCache,
}

impl LazyCachingCredentialsProvider {
    pub fn new(load: impl ProvideCredentials + 'static) -> Self {
        LazyCachingCredentialsProvider {
            load: Arc::new(load),
            cache: CredentialsCache::new(),
        }
    }

    pub fn with_time_source(mut self, time_source: SharedTimeSource) -> Self {
        self.cache = self.cache.with_time_source(time_source);
        self
    }

    pub fn with_expiry_window(mut self, window: Duration) -> Self {
        self.cache = self.cache.with_expiry_window(window);
        self
    }
}

impl ProvideCredentials for LazyCachingCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(
            self.cache
                .get_or_load(move || self.load.provide_credentials()),
        )
    }

    /// Reloads unconditionally, still coalesced with any reload in flight.
    fn refresh<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(
            self.cache
                .refresh(move || self.load.provide_credentials()),
        )
    }

    fn needs_refresh(&self) -> bool {
        self.cache.needs_refresh()
    }

    fn expire(&self) {
        self.cache.expire()
    }
}

#[cfg(test)]
mod test {
    use super::{CredentialsCache, LazyCachingCredentialsProvider};
    use crate::credential::{provide_credentials_fn, CredentialsError, ProvideCredentials};
    use crate::time_source::TestingTimeSource;
    use crate::Credentials;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};
    use tracing_test::traced_test;

    fn epoch_secs(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn credentials(expires_secs: u64) -> Credentials {
        Credentials::new("test", "test", None, Some(epoch_secs(expires_secs)), "test")
    }

    fn provider(
        time: &TestingTimeSource,
        results: Vec<crate::credential::Result>,
    ) -> (LazyCachingCredentialsProvider, Arc<AtomicUsize>) {
        let results = Arc::new(Mutex::new(results));
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let provider = LazyCachingCredentialsProvider::new(provide_credentials_fn(move || {
            let results = results.clone();
            counter.fetch_add(1, Ordering::SeqCst);
            async move { results.lock().unwrap().remove(0) }
        }))
        .with_time_source(Arc::new(time.clone()));
        (provider, loads)
    }

    async fn expect_creds(expires_secs: u64, provider: &LazyCachingCredentialsProvider) {
        let creds = provider
            .provide_credentials()
            .await
            .expect("expected credentials");
        assert_eq!(Some(epoch_secs(expires_secs)), creds.expiry());
    }

    #[tokio::test]
    #[traced_test]
    async fn refresh_expired_credentials() {
        let time = TestingTimeSource::new(epoch_secs(100));
        let (provider, loads) = provider(
            &time,
            vec![
                Ok(credentials(1000)),
                Ok(credentials(2000)),
                Ok(credentials(3000)),
            ],
        );
        expect_creds(1000, &provider).await;
        expect_creds(1000, &provider).await;
        time.set_time(epoch_secs(1500));
        expect_creds(2000, &provider).await;
        expect_creds(2000, &provider).await;
        // inside the 10 second expiry window
        time.set_time(epoch_secs(1995));
        expect_creds(3000, &provider).await;
        assert_eq!(loads.load(Ordering::SeqCst), 3);
        assert!(logs_contain("serving cached credentials"));
    }

    #[tokio::test]
    #[traced_test]
    async fn failed_refresh_keeps_needing_refresh() {
        let time = TestingTimeSource::new(epoch_secs(100));
        let (provider, _) = provider(
            &time,
            vec![
                Ok(credentials(1000)),
                Err(CredentialsError::not_loaded("gone")),
                Ok(credentials(3000)),
            ],
        );
        expect_creds(1000, &provider).await;
        provider.expire();
        assert!(provider.needs_refresh());
        let err = provider.provide_credentials().await.expect_err("load fails");
        assert_eq!(err.message(), "gone");
        assert!(provider.needs_refresh());
        assert!(logs_contain("failed to refresh credentials"));
        expect_creds(3000, &provider).await;
        assert!(!provider.needs_refresh());
    }

    #[tokio::test]
    async fn explicit_refresh_always_loads() {
        let time = TestingTimeSource::new(epoch_secs(100));
        let (provider, loads) =
            provider(&time, vec![Ok(credentials(1000)), Ok(credentials(2000))]);
        expect_creds(1000, &provider).await;
        let refreshed = provider.refresh().await.unwrap();
        assert_eq!(refreshed.expiry(), Some(epoch_secs(2000)));
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_gets_load_once() {
        let cache = CredentialsCache::new();
        let loads = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(tokio::sync::Notify::new());
        let mut tasks = Vec::new();
        for _ in 0..10 {
            let cache = cache.clone();
            let loads = loads.clone();
            let gate = gate.clone();
            tasks.push(tokio::spawn(async move {
                cache
                    .get_or_load(|| async move {
                        loads.fetch_add(1, Ordering::SeqCst);
                        gate.notified().await;
                        Ok(Credentials::from_keys("akid", "secret", None))
                    })
                    .await
            }));
        }
        while cache.refresh.waiting() < 9 {
            tokio::task::yield_now().await;
        }
        gate.notify_one();
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap().access_key_id(), "akid");
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(!cache.needs_refresh());
    }
}
