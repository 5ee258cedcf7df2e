/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Assume a role with STS, using credentials from another provider

use crate::profile::mfa_token::{ProvideMfaToken, SerializedMfaTokenProvider};
use crate::provider_config::ProviderConfig;
use crate::sts::client::{AssumeRoleRequest, SharedStsClient};
use crate::sts::util::{default_session_name, duration_seconds, AuxiliaryData, LazyStsClient};
use aws_types::credential::lazy_caching::CredentialsCache;
use aws_types::credential::{self, future, ProvideCredentials, SharedCredentialsProvider};
use aws_types::time_source::SharedTimeSource;
use smithy_types::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

const PROVIDER_NAME: &str = "AssumeRoleProvider";

/// Credentials provider that uses credentials provided by another provider to assume a role
/// through the AWS Security Token Service (STS).
///
/// The source provider is asked for credentials on every refresh, so a source that caches and
/// refreshes its own credentials is refreshed first whenever it has expired. Chains of roles
/// are built by using one `AssumeRoleProvider` as the source of another.
///
/// ```rust,no_run
/// use aws_config::sts::AssumeRoleProvider;
/// use aws_config::environment::EnvironmentVariableCredentialsProvider;
///
/// let provider = AssumeRoleProvider::builder("arn:aws:iam::123456789012:role/demo")
///     .session_name("testAR")
///     .build(EnvironmentVariableCredentialsProvider::new());
/// ```
#[derive(Debug)]
pub struct AssumeRoleProvider {
    source: SharedCredentialsProvider,
    request: AssumeRoleRequest,
    mfa: Option<(String, SerializedMfaTokenProvider)>,
    client: LazyStsClient,
    time_source: SharedTimeSource,
    cache: CredentialsCache,
    data: AuxiliaryData,
}

impl AssumeRoleProvider {
    /// Build a new role-assuming provider for the given role.
    ///
    /// The `role` argument should take the form an Amazon Resource Name (ARN) like
    ///
    /// ```text
    /// arn:aws:iam::123456789012:role/example
    /// ```
    pub fn builder(role: impl Into<String>) -> AssumeRoleProviderBuilder {
        AssumeRoleProviderBuilder::new(role.into())
    }

    /// Output of the last successful `AssumeRole` call other than the credentials, e.g.
    /// `AssumedRoleUser`
    pub fn data(&self) -> Option<Value> {
        self.data.get()
    }

    async fn load(&self) -> credential::Result {
        let source = self
            .source
            .provide_credentials()
            .instrument(tracing::info_span!("load_source_credentials"))
            .await?;
        let mut request = self.request.clone();
        if request.role_session_name.is_empty() {
            request.role_session_name = default_session_name(self.time_source.now());
        }
        if let Some((serial, tokens)) = &self.mfa {
            request.serial_number = Some(serial.clone());
            request.token_code = Some(tokens.token(serial).await?);
        }
        let client = self
            .client
            .get()
            .map_err(|err| err.into_credentials_error("AssumeRole"))?;
        tracing::debug!(role_arn = %request.role_arn, session_name = %request.role_session_name, "assuming role");
        let response = client
            .assume_role(&source, &request)
            .await
            .map_err(|err| {
                tracing::warn!(role_arn = %request.role_arn, error = %err, "failed to assume role");
                err.into_credentials_error("AssumeRole")
            })?;
        tracing::info!(role_arn = %request.role_arn, "assumed role");
        self.data.set(response.data());
        Ok(response.credentials(PROVIDER_NAME))
    }
}

impl ProvideCredentials for AssumeRoleProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.cache.get_or_load(move || self.load()))
    }

    fn refresh<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.cache.refresh(move || self.load()))
    }

    fn needs_refresh(&self) -> bool {
        self.cache.needs_refresh()
    }

    fn expire(&self) {
        self.cache.expire()
    }
}

/// A builder for [`AssumeRoleProvider`].
///
/// Construct one through [`AssumeRoleProvider::builder`].
#[derive(Debug)]
pub struct AssumeRoleProviderBuilder {
    request: AssumeRoleRequest,
    mfa: Option<(String, SerializedMfaTokenProvider)>,
    conf: Option<ProviderConfig>,
    sts_client: Option<SharedStsClient>,
}

impl AssumeRoleProviderBuilder {
    fn new(role_arn: String) -> Self {
        AssumeRoleProviderBuilder {
            request: AssumeRoleRequest {
                role_arn,
                ..Default::default()
            },
            mfa: None,
            conf: None,
            sts_client: None,
        }
    }

    /// Set a unique identifier that might be required when you assume a role in another account.
    pub fn external_id(mut self, id: impl Into<String>) -> Self {
        self.request.external_id = Some(id.into());
        self
    }

    /// Set an identifier for the assumed role session.
    ///
    /// Defaults to `aws-sdk-rust-<epoch millis>` taken when credentials are loaded.
    pub fn session_name(mut self, name: impl Into<String>) -> Self {
        self.request.role_session_name = name.into();
        self
    }

    /// Set the expiration time of the role session.
    ///
    /// When unset, the role's configured maximum session duration applies.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.request.duration_seconds = Some(duration_seconds(duration));
        self
    }

    /// An IAM policy in JSON format that further restricts the session.
    pub fn policy(mut self, policy: impl Into<String>) -> Self {
        self.request.policy = Some(policy.into());
        self
    }

    /// Require an MFA token code from `tokens` for the device `serial`.
    pub fn mfa(mut self, serial: impl Into<String>, tokens: impl ProvideMfaToken + 'static) -> Self {
        self.mfa = Some((
            serial.into(),
            SerializedMfaTokenProvider::new(Arc::new(tokens)),
        ));
        self
    }

    /// Use a specific STS client instead of building one from the provider configuration.
    pub fn sts_client(mut self, client: SharedStsClient) -> Self {
        self.sts_client = Some(client);
        self
    }

    /// Override the configuration used for this provider
    pub fn configure(mut self, conf: &ProviderConfig) -> Self {
        self.conf = Some(conf.clone());
        self
    }

    /// Build a credentials provider that assumes the role using credentials from `provider`.
    pub fn build(self, provider: impl ProvideCredentials + 'static) -> AssumeRoleProvider {
        let conf = self.conf.unwrap_or_default();
        AssumeRoleProvider {
            source: Arc::new(provider),
            request: self.request,
            mfa: self.mfa,
            time_source: conf.time_source(),
            cache: CredentialsCache::new().with_time_source(conf.time_source()),
            client: LazyStsClient::new(conf, self.sts_client),
            data: AuxiliaryData::default(),
        }
    }
}
