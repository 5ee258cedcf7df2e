/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use super::ChainEntry;
use crate::provider_config::ProviderConfig;
use aws_types::credential::lazy_caching::CredentialsCache;
use aws_types::credential::{
    self, future, CredentialsError, ProvideCredentials, SharedCredentialsProvider,
};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;

/// Credentials provider that checks a series of inner providers
///
/// Each provider will be checked in turn. The first provider that returns credentials with a
/// non-empty access key id is used. When every provider fails, the error of the last one is
/// returned.
///
/// The winning credentials are cached on the chain until they need a refresh. Concurrent calls
/// share a single walk of the chain.
///
/// ## Example
/// ```rust
/// use aws_config::meta::credential::chain::CredentialsProviderChain;
/// use aws_types::Credentials;
/// use aws_config::environment::EnvironmentVariableCredentialsProvider;
/// let provider = CredentialsProviderChain::first_try("Environment", EnvironmentVariableCredentialsProvider::new())
///     .or_else("Static", Credentials::from_keys("someacceskeyid", "somesecret", None));
/// ```
pub struct CredentialsProviderChain {
    providers: Vec<(Cow<'static, str>, SharedCredentialsProvider)>,
    cache: CredentialsCache,
}

impl CredentialsProviderChain {
    pub fn first_try(
        name: impl Into<Cow<'static, str>>,
        provider: impl ProvideCredentials + 'static,
    ) -> Self {
        CredentialsProviderChain {
            providers: vec![(name.into(), Arc::new(provider))],
            cache: CredentialsCache::new(),
        }
    }

    pub fn or_else(
        mut self,
        name: impl Into<Cow<'static, str>>,
        provider: impl ProvideCredentials + 'static,
    ) -> Self {
        self.providers.push((name.into(), Arc::new(provider)));
        self
    }

    /// Build a chain from `entries`, calling each factory with `conf`
    pub fn from_entries(entries: &[ChainEntry], conf: &ProviderConfig) -> Self {
        CredentialsProviderChain {
            providers: entries
                .iter()
                .map(|entry| (Cow::Owned(entry.name().to_string()), entry.instantiate(conf)))
                .collect(),
            cache: CredentialsCache::new().with_time_source(conf.time_source()),
        }
    }

    /// Build a chain from the default providers of `conf`
    pub fn from_config(conf: &ProviderConfig) -> Self {
        Self::from_entries(&conf.default_providers().get(), conf)
    }

    /// Cached credentials, or the result of walking the chain
    pub async fn resolve(&self) -> credential::Result {
        self.cache.get_or_load(|| self.credentials()).await
    }

    async fn credentials(&self) -> credential::Result {
        let mut last_error = None;
        for (name, provider) in &self.providers {
            let span = tracing::info_span!("load_credentials", provider = %name);
            match provider.provide_credentials().instrument(span).await {
                Ok(credentials) if !credentials.access_key_id().is_empty() => {
                    tracing::info!(provider = %name, "loaded credentials");
                    return Ok(credentials);
                }
                Ok(_) => {
                    tracing::debug!(provider = %name, "provider returned an empty access key id");
                    last_error = Some(CredentialsError::not_loaded(format!(
                        "{} returned an empty access key id",
                        name
                    )));
                }
                Err(err @ CredentialsError::CredentialsNotLoaded(_)) => {
                    tracing::debug!(provider = %name, error = %err, "provider in chain did not provide credentials");
                    last_error = Some(err);
                }
                Err(err) => {
                    tracing::warn!(provider = %name, error = %err, "provider failed to provide credentials");
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| CredentialsError::not_loaded("No providers")))
    }
}

impl fmt::Debug for CredentialsProviderChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.providers.iter().map(|(name, _)| name.as_ref()).collect();
        f.debug_struct("CredentialsProviderChain")
            .field("providers", &names)
            .finish()
    }
}

impl ProvideCredentials for CredentialsProviderChain {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.resolve())
    }

    /// Walks the chain again even if the cached winner is still fresh
    fn refresh<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.cache.refresh(move || self.credentials()))
    }

    fn needs_refresh(&self) -> bool {
        self.cache.needs_refresh()
    }

    /// Discard the cached credentials so the next call walks the chain again
    fn expire(&self) {
        self.cache.expire()
    }
}

#[cfg(test)]
mod test {
    use super::CredentialsProviderChain;
    use crate::environment::EnvironmentVariableCredentialsProvider;
    use crate::meta::credential::ChainEntry;
    use crate::provider_config::ProviderConfig;
    use aws_types::credential::{provide_credentials_fn, CredentialsError, ProvideCredentials};
    use aws_types::os_shim_internal::Env;
    use aws_types::Credentials;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing_test::traced_test;

    fn env_entries() -> Vec<ChainEntry> {
        vec![
            ChainEntry::factory("Environment", |conf: &ProviderConfig| {
                Arc::new(EnvironmentVariableCredentialsProvider::new_with_env(
                    "AWS",
                    conf.env(),
                ))
            }),
            ChainEntry::factory("Environment", |conf: &ProviderConfig| {
                Arc::new(EnvironmentVariableCredentialsProvider::new_with_env(
                    "AMAZON",
                    conf.env(),
                ))
            }),
        ]
    }

    fn conf(vars: &[(&str, &str)]) -> ProviderConfig {
        ProviderConfig::no_configuration().with_env(Env::from_slice(vars))
    }

    #[tokio::test]
    #[traced_test]
    async fn last_error_is_reported() {
        let chain = CredentialsProviderChain::from_entries(&env_entries(), &conf(&[]));
        let err = chain.resolve().await.expect_err("no variables");
        assert_eq!(err.to_string(), "Variable AMAZON_ACCESS_KEY_ID not set.");
        assert!(logs_contain("provider in chain did not provide credentials"));
    }

    #[tokio::test]
    async fn first_provider_wins() {
        let vars = [
            ("AWS_ACCESS_KEY_ID", "akid"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("AMAZON_ACCESS_KEY_ID", "amazon-akid"),
            ("AMAZON_SECRET_ACCESS_KEY", "amazon-secret"),
        ];
        let chain = CredentialsProviderChain::from_entries(&env_entries(), &conf(&vars));
        let creds = chain.resolve().await.expect("AWS variables");
        assert_eq!(creds.access_key_id(), "akid");
        assert_eq!(creds.secret_access_key(), "secret");

        let chain = CredentialsProviderChain::from_entries(&env_entries(), &conf(&vars[2..]));
        let creds = chain.resolve().await.expect("AMAZON variables");
        assert_eq!(creds.access_key_id(), "amazon-akid");
    }

    #[tokio::test]
    async fn empty_chain() {
        let chain = CredentialsProviderChain::from_entries(&[], &conf(&[]));
        let err = chain.resolve().await.expect_err("no providers");
        assert_eq!(err.to_string(), "No providers");
    }

    #[tokio::test]
    async fn empty_access_key_is_skipped() {
        let chain = CredentialsProviderChain::first_try(
            "Empty",
            Credentials::from_keys("", "secret", None),
        )
        .or_else("Static", Credentials::from_keys("akid", "secret", None));
        let creds = chain.resolve().await.expect("second provider");
        assert_eq!(creds.access_key_id(), "akid");
    }

    #[tokio::test]
    #[traced_test]
    async fn failures_do_not_stop_the_chain() {
        let chain = CredentialsProviderChain::first_try(
            "Broken",
            provide_credentials_fn(|| async {
                Err(CredentialsError::invalid_configuration("broken"))
            }),
        )
        .or_else("Static", Credentials::from_keys("akid", "secret", None));
        let creds = chain.resolve().await.expect("second provider");
        assert_eq!(creds.access_key_id(), "akid");
        assert!(logs_contain("provider failed to provide credentials"));
    }

    #[tokio::test]
    async fn concurrent_resolves_share_one_walk() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let chain = CredentialsProviderChain::first_try(
            "Counting",
            provide_credentials_fn(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    Ok(Credentials::from_keys("akid", "secret", None))
                }
            }),
        );
        let (first, second) = tokio::join!(chain.resolve(), chain.resolve());
        assert_eq!(first.expect("ok").access_key_id(), "akid");
        assert_eq!(second.expect("ok").access_key_id(), "akid");
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        chain.resolve().await.expect("cached");
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        chain.expire();
        chain.resolve().await.expect("reloaded");
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn default_providers_are_read_at_construction() {
        let conf = conf(&[]);
        conf.default_providers().set(vec![ChainEntry::credentials(
            Credentials::from_keys("first", "secret", None),
        )]);
        let chain = CredentialsProviderChain::from_config(&conf);
        conf.default_providers().set(vec![ChainEntry::credentials(
            Credentials::from_keys("second", "secret", None),
        )]);
        assert_eq!(chain.resolve().await.expect("ok").access_key_id(), "first");
        conf.default_providers().reset();
    }
}
