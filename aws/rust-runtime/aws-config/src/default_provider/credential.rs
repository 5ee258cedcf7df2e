/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::container::ContainerCredentialsProvider;
use crate::credential_process::CredentialProcessProvider;
use crate::environment::EnvironmentVariableCredentialsProvider;
use crate::imds::ImdsCredentialsProvider;
use crate::meta::credential::{ChainEntry, CredentialsProviderChain};
use crate::profile::SharedIniFileProvider;
use crate::provider_config::ProviderConfig;
use crate::web_identity_token::TokenFileWebIdentityProvider;
use aws_types::credential::{future, ProvideCredentials};
use std::sync::Arc;

/// The standard default providers, in resolution order:
/// 1. `AWS_ACCESS_KEY_ID` and friends
/// 2. `AMAZON_ACCESS_KEY_ID` and friends
/// 3. the shared credentials and config files
/// 4. the container credentials endpoint
/// 5. the profile's `credential_process`
/// 6. a web identity token file
/// 7. EC2 instance metadata
pub(crate) fn standard_entries() -> Vec<ChainEntry> {
    vec![
        ChainEntry::factory("Environment", |conf| {
            Arc::new(EnvironmentVariableCredentialsProvider::new_with_env("AWS", conf.env()))
        }),
        ChainEntry::factory("Environment", |conf| {
            Arc::new(EnvironmentVariableCredentialsProvider::new_with_env(
                "AMAZON",
                conf.env(),
            ))
        }),
        ChainEntry::factory("Profile", |conf| {
            Arc::new(SharedIniFileProvider::builder().configure(conf).build())
        }),
        ChainEntry::factory("Container", |conf| {
            Arc::new(ContainerCredentialsProvider::builder().configure(conf).build())
        }),
        ChainEntry::factory("CredentialProcess", |conf| {
            Arc::new(CredentialProcessProvider::from_profile().configure(conf).build())
        }),
        ChainEntry::factory("WebIdentityToken", |conf| {
            Arc::new(TokenFileWebIdentityProvider::builder().configure(conf).build())
        }),
        ChainEntry::factory("Ec2InstanceMetadata", |conf| {
            Arc::new(ImdsCredentialsProvider::builder().configure(conf).build())
        }),
    ]
}

/// Default AWS Credential Provider Chain
///
/// A [`CredentialsProviderChain`] over the default providers of the [`ProviderConfig`]. Unless
/// they were replaced with [`DefaultProviders::set`](crate::meta::credential::DefaultProviders::set)
/// these are the environment, the profile files, the container endpoint, `credential_process`,
/// a web identity token file and instance metadata, in that order.
///
/// ## Example:
/// ```rust
/// use aws_config::default_provider::credential::DefaultCredentialsChain;
/// use aws_config::provider_config::ProviderConfig;
/// use aws_types::Region;
/// let provider = DefaultCredentialsChain::builder()
///     .configure(&ProviderConfig::without_region().with_region(Some(Region::new("us-west-1"))))
///     .build();
/// ```
#[derive(Debug)]
pub struct DefaultCredentialsChain(CredentialsProviderChain);

/// The default chain with no overrides
pub fn default_provider() -> DefaultCredentialsChain {
    Builder::default().build()
}

impl DefaultCredentialsChain {
    pub fn builder() -> Builder {
        Builder::default()
    }
}

impl ProvideCredentials for DefaultCredentialsChain {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        self.0.provide_credentials()
    }

    fn refresh<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        self.0.refresh()
    }

    fn needs_refresh(&self) -> bool {
        self.0.needs_refresh()
    }

    fn expire(&self) {
        self.0.expire()
    }
}

#[derive(Debug, Default)]
pub struct Builder {
    conf: Option<ProviderConfig>,
}

impl Builder {
    pub fn configure(mut self, conf: &ProviderConfig) -> Self {
        self.conf = Some(conf.clone());
        self
    }

    pub fn build(self) -> DefaultCredentialsChain {
        let conf = self.conf.unwrap_or_default();
        DefaultCredentialsChain(CredentialsProviderChain::from_config(&conf))
    }
}

#[cfg(test)]
mod test {
    use super::DefaultCredentialsChain;
    use crate::meta::credential::ChainEntry;
    use crate::provider_config::ProviderConfig;
    use aws_types::credential::ProvideCredentials;
    use aws_types::os_shim_internal::{Env, Fs};
    use aws_types::Credentials;
    use tracing_test::traced_test;

    fn chain(conf: &ProviderConfig) -> DefaultCredentialsChain {
        DefaultCredentialsChain::builder().configure(conf).build()
    }

    #[tokio::test]
    async fn prefer_environment() {
        let conf = ProviderConfig::no_configuration()
            .with_env(Env::from_slice(&[
                ("HOME", "/home"),
                ("AWS_ACCESS_KEY_ID", "env-akid"),
                ("AWS_SECRET_ACCESS_KEY", "env-secret"),
            ]))
            .with_fs(Fs::from_slice(&[(
                "/home/.aws/credentials",
                "[default]\naws_access_key_id = file-akid\naws_secret_access_key = file-secret",
            )]));
        let creds = chain(&conf).provide_credentials().await.expect("valid");
        assert_eq!(creds.access_key_id(), "env-akid");
        assert_eq!(creds.provider_name(), "Environment");
    }

    #[tokio::test]
    #[traced_test]
    async fn profile_static_keys() {
        let conf = ProviderConfig::no_configuration()
            .with_env(Env::from_slice(&[("HOME", "/home")]))
            .with_fs(Fs::from_slice(&[(
                "/home/.aws/credentials",
                "[default]\naws_access_key_id = file-akid\naws_secret_access_key = file-secret",
            )]));
        let creds = chain(&conf).provide_credentials().await.expect("valid");
        assert_eq!(creds.access_key_id(), "file-akid");
        assert_eq!(creds.provider_name(), "ProfileFile");
        assert!(logs_contain("loaded credentials"));
    }

    #[tokio::test]
    async fn nothing_configured() {
        let conf = ProviderConfig::no_configuration();
        let err = chain(&conf).provide_credentials().await.expect_err("no credentials");
        assert_eq!(err.to_string(), "no HTTP connector was configured");

        let conf = conf.with_env(Env::from_slice(&[("AWS_EC2_METADATA_DISABLED", "true")]));
        let err = chain(&conf).provide_credentials().await.expect_err("no credentials");
        assert_eq!(
            err.to_string(),
            "IMDS disabled by AWS_EC2_METADATA_DISABLED env var"
        );
    }

    #[tokio::test]
    async fn custom_default_providers() {
        let conf = ProviderConfig::no_configuration();
        conf.default_providers().set(vec![ChainEntry::credentials(
            Credentials::from_keys("custom", "secret", None),
        )]);
        let creds = chain(&conf).provide_credentials().await.expect("valid");
        assert_eq!(creds.access_key_id(), "custom");
        conf.default_providers().reset();
    }
}
