/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Configuration Options for Credential Providers

use crate::meta::credential::DefaultProviders;
use aws_types::os_shim_internal::{Env, Fs};
use aws_types::time_source::{SharedTimeSource, SystemTimeSource};
use aws_types::Region;
use smithy_http::connector::SharedHttpConnector;
use std::fmt;
use std::sync::Arc;

/// Configuration options for Credential Providers
///
/// Every provider builder offers a `configure` method which applies these options. This is
/// where the process environment, the filesystem, the HTTP connector and the clock are
/// injected, so tests can replace all of them.
///
/// The region is only needed by providers that call STS. When it is not set explicitly it is
/// read from `AWS_REGION`, then `AWS_DEFAULT_REGION`.
#[derive(Clone)]
pub struct ProviderConfig {
    env: Env,
    fs: Fs,
    connector: Option<SharedHttpConnector>,
    time_source: SharedTimeSource,
    region: Option<Region>,
    default_providers: DefaultProviders,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("env", &self.env)
            .field("fs", &self.fs)
            .field("connector", &self.connector)
            .field("region", &self.region)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::without_region()
    }
}

impl ProviderConfig {
    /// Create a default provider config with the region unset
    ///
    /// # Example
    /// ```rust
    /// use aws_config::provider_config::ProviderConfig;
    /// use aws_types::Region;
    /// let conf = ProviderConfig::without_region().with_region(Some(Region::new("us-east-1")));
    /// ```
    pub fn without_region() -> Self {
        ProviderConfig {
            env: Env::default(),
            fs: Fs::default(),
            connector: crate::connector::default_connector(),
            time_source: Arc::new(SystemTimeSource),
            region: None,
            default_providers: DefaultProviders::default(),
        }
    }

    /// An empty environment and filesystem, and no connector.
    #[cfg(test)]
    pub(crate) fn no_configuration() -> Self {
        ProviderConfig {
            env: Env::from_slice(&[]),
            fs: Fs::from_slice(&[]),
            connector: None,
            time_source: Arc::new(SystemTimeSource),
            region: None,
            default_providers: DefaultProviders::default(),
        }
    }

    pub(crate) fn env(&self) -> Env {
        self.env.clone()
    }

    pub(crate) fn fs(&self) -> Fs {
        self.fs.clone()
    }

    pub(crate) fn connector(&self) -> Option<SharedHttpConnector> {
        self.connector.clone()
    }

    pub(crate) fn time_source(&self) -> SharedTimeSource {
        self.time_source.clone()
    }

    pub(crate) fn default_providers(&self) -> &DefaultProviders {
        &self.default_providers
    }

    pub(crate) fn region(&self) -> Option<Region> {
        self.region.clone().or_else(|| {
            ["AWS_REGION", "AWS_DEFAULT_REGION"]
                .iter()
                .find_map(|var| self.env.get_non_empty(var))
                .map(Region::new)
        })
    }

    /// Override the region for the configuration
    pub fn with_region(mut self, region: Option<Region>) -> Self {
        self.region = region;
        self
    }

    #[doc(hidden)]
    pub fn with_fs(self, fs: Fs) -> Self {
        ProviderConfig { fs, ..self }
    }

    #[doc(hidden)]
    pub fn with_env(self, env: Env) -> Self {
        ProviderConfig { env, ..self }
    }

    /// Override the HTTP connector for this configuration
    pub fn with_connector(self, connector: SharedHttpConnector) -> Self {
        ProviderConfig {
            connector: Some(connector),
            ..self
        }
    }

    /// Override the clock used for expiry checks and request signing
    pub fn with_time_source(self, time_source: SharedTimeSource) -> Self {
        ProviderConfig {
            time_source,
            ..self
        }
    }

    /// Use `providers` wherever this configuration builds the default provider chain
    pub fn with_default_providers(self, default_providers: DefaultProviders) -> Self {
        ProviderConfig {
            default_providers,
            ..self
        }
    }
}
