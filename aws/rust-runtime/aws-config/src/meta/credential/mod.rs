/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Provider chains and the list of providers a default chain is built from

pub mod chain;

pub use chain::CredentialsProviderChain;

use crate::provider_config::ProviderConfig;
use aws_types::credential::{Credentials, ProvideCredentials, SharedCredentialsProvider};
use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

type Factory = Arc<dyn Fn(&ProviderConfig) -> SharedCredentialsProvider + Send + Sync>;

#[derive(Clone)]
enum Source {
    Static(Credentials),
    Provider(SharedCredentialsProvider),
    Factory(Factory),
}

/// One entry of a provider chain
///
/// An entry is fixed credentials, a provider, or a factory that builds a provider from the
/// chain's [`ProviderConfig`] when the chain is constructed.
#[derive(Clone)]
pub struct ChainEntry {
    name: Cow<'static, str>,
    source: Source,
}

impl ChainEntry {
    pub fn credentials(credentials: Credentials) -> Self {
        ChainEntry {
            name: Cow::Borrowed("Static"),
            source: Source::Static(credentials),
        }
    }

    pub fn provider(
        name: impl Into<Cow<'static, str>>,
        provider: impl ProvideCredentials + 'static,
    ) -> Self {
        ChainEntry {
            name: name.into(),
            source: Source::Provider(Arc::new(provider)),
        }
    }

    /// ```rust
    /// use aws_config::environment::EnvironmentVariableCredentialsProvider;
    /// use aws_config::meta::credential::ChainEntry;
    /// use std::sync::Arc;
    ///
    /// let entry = ChainEntry::factory("Environment", |_conf| {
    ///     Arc::new(EnvironmentVariableCredentialsProvider::new())
    /// });
    /// ```
    pub fn factory(
        name: impl Into<Cow<'static, str>>,
        factory: impl Fn(&ProviderConfig) -> SharedCredentialsProvider + Send + Sync + 'static,
    ) -> Self {
        ChainEntry {
            name: name.into(),
            source: Source::Factory(Arc::new(factory)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn instantiate(&self, conf: &ProviderConfig) -> SharedCredentialsProvider {
        match &self.source {
            Source::Static(credentials) => Arc::new(credentials.clone()),
            Source::Provider(provider) => provider.clone(),
            Source::Factory(factory) => factory(conf),
        }
    }
}

impl From<Credentials> for ChainEntry {
    fn from(credentials: Credentials) -> Self {
        ChainEntry::credentials(credentials)
    }
}

impl fmt::Debug for ChainEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.source {
            Source::Static(_) => "Static",
            Source::Provider(_) => "Provider",
            Source::Factory(_) => "Factory",
        };
        f.debug_struct("ChainEntry")
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}

/// The entries a default chain is built from
///
/// Unless [`set`](DefaultProviders::set) is called this is the standard list of
/// [`default_provider::credential`](crate::default_provider::credential). The list is read when a
/// chain is constructed: changing it does not affect chains that already exist.
///
/// Clones share the list. A `DefaultProviders` travels in a
/// [`ProviderConfig`](crate::provider_config::ProviderConfig), so nothing outside that
/// configuration observes a change.
#[derive(Clone, Default)]
pub struct DefaultProviders(Arc<RwLock<Option<Vec<ChainEntry>>>>);

impl DefaultProviders {
    pub fn get(&self) -> Vec<ChainEntry> {
        match &*self.0.read().unwrap_or_else(PoisonError::into_inner) {
            Some(entries) => entries.clone(),
            None => crate::default_provider::credential::standard_entries(),
        }
    }

    pub fn set(&self, entries: Vec<ChainEntry>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = Some(entries);
    }

    /// Go back to the standard list
    pub fn reset(&self) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl fmt::Debug for DefaultProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.get().iter().map(|e| e.name().to_string()).collect();
        f.debug_tuple("DefaultProviders").field(&names).finish()
    }
}

#[cfg(test)]
mod test {
    use super::{ChainEntry, DefaultProviders};
    use aws_types::Credentials;

    fn names(providers: &DefaultProviders) -> Vec<String> {
        providers
            .get()
            .iter()
            .map(|entry| entry.name().to_string())
            .collect()
    }

    #[test]
    fn set_and_reset() {
        let providers = DefaultProviders::default();
        let standard = names(&providers);
        assert_eq!(standard.first().map(String::as_str), Some("Environment"));

        let shared = providers.clone();
        shared.set(vec![ChainEntry::credentials(Credentials::from_keys(
            "akid", "secret", None,
        ))]);
        assert_eq!(names(&providers), vec!["Static".to_string()]);

        providers.reset();
        assert_eq!(names(&shared), standard);
    }
}
