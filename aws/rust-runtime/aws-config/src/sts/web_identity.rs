/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::provider_config::ProviderConfig;
use crate::sts::client::{AssumeRoleWithWebIdentityRequest, SharedStsClient};
use crate::sts::util::{default_session_name, duration_seconds, AuxiliaryData, LazyStsClient};
use aws_types::credential::lazy_caching::CredentialsCache;
use aws_types::credential::{self, future, ProvideCredentials};
use aws_types::time_source::SharedTimeSource;
use smithy_types::Value;
use std::time::Duration;

const PROVIDER_NAME: &str = "WebIdentityCredentials";

/// Exchanges an OIDC or OAuth 2.0 token for credentials with `AssumeRoleWithWebIdentity`
///
/// The token is fixed when the provider is built. To read a token from a file that is rotated
/// in place, use [`TokenFileWebIdentityProvider`](crate::web_identity_token::TokenFileWebIdentityProvider).
#[derive(Debug)]
pub struct WebIdentityCredentialsProvider {
    request: AssumeRoleWithWebIdentityRequest,
    client: LazyStsClient,
    time_source: SharedTimeSource,
    cache: CredentialsCache,
    data: AuxiliaryData,
}

impl WebIdentityCredentialsProvider {
    pub fn builder(
        role_arn: impl Into<String>,
        web_identity_token: impl Into<String>,
    ) -> WebIdentityCredentialsProviderBuilder {
        WebIdentityCredentialsProviderBuilder {
            request: AssumeRoleWithWebIdentityRequest {
                role_arn: role_arn.into(),
                web_identity_token: web_identity_token.into(),
                ..Default::default()
            },
            conf: None,
            sts_client: None,
        }
    }

    /// Output of the last successful call other than the credentials, e.g.
    /// `SubjectFromWebIdentityToken`
    pub fn data(&self) -> Option<Value> {
        self.data.get()
    }

    async fn load(&self) -> credential::Result {
        let mut request = self.request.clone();
        if request.role_session_name.is_empty() {
            request.role_session_name = default_session_name(self.time_source.now());
        }
        let client = self
            .client
            .get()
            .map_err(|err| err.into_credentials_error("AssumeRoleWithWebIdentity"))?;
        let response = client
            .assume_role_with_web_identity(&request)
            .await
            .map_err(|err| err.into_credentials_error("AssumeRoleWithWebIdentity"))?;
        tracing::info!(role_arn = %request.role_arn, "assumed role with web identity");
        self.data.set(response.data());
        Ok(response.credentials(PROVIDER_NAME))
    }
}

impl ProvideCredentials for WebIdentityCredentialsProvider {
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

#[derive(Debug)]
pub struct WebIdentityCredentialsProviderBuilder {
    request: AssumeRoleWithWebIdentityRequest,
    conf: Option<ProviderConfig>,
    sts_client: Option<SharedStsClient>,
}

impl WebIdentityCredentialsProviderBuilder {
    pub fn session_name(mut self, name: impl Into<String>) -> Self {
        self.request.role_session_name = name.into();
        self
    }

    /// The domain of an OAuth 2.0 identity provider, e.g. `graph.facebook.com`. Omit for OIDC.
    pub fn provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.request.provider_id = Some(provider_id.into());
        self
    }

    pub fn policy(mut self, policy: impl Into<String>) -> Self {
        self.request.policy = Some(policy.into());
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.request.duration_seconds = Some(duration_seconds(duration));
        self
    }

    pub fn sts_client(mut self, client: SharedStsClient) -> Self {
        self.sts_client = Some(client);
        self
    }

    pub fn configure(mut self, conf: &ProviderConfig) -> Self {
        self.conf = Some(conf.clone());
        self
    }

    pub fn build(self) -> WebIdentityCredentialsProvider {
        let conf = self.conf.unwrap_or_default();
        WebIdentityCredentialsProvider {
            request: self.request,
            time_source: conf.time_source(),
            cache: CredentialsCache::new().with_time_source(conf.time_source()),
            client: LazyStsClient::new(conf, self.sts_client),
            data: AuxiliaryData::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::WebIdentityCredentialsProvider;
    use crate::provider_config::ProviderConfig;
    use crate::sts::client::test::{Call, RecordingStsClient};
    use crate::sts::client::AssumeRoleWithWebIdentityRequest;
    use aws_types::credential::ProvideCredentials;
    use std::sync::Arc;

    #[tokio::test]
    async fn token_is_exchanged() {
        let sts = Arc::new(RecordingStsClient::default());
        let provider =
            WebIdentityCredentialsProvider::builder("arn:aws:iam::123456789012:role/web", "jwt")
                .session_name("web-session")
                .provider_id("www.amazon.com")
                .configure(&ProviderConfig::no_configuration())
                .sts_client(sts.clone())
                .build();
        let creds = provider.provide_credentials().await.expect("exchanged");
        assert_eq!(creds.access_key_id(), "ASIA-web");
        assert_eq!(creds.provider_name(), "WebIdentityCredentials");
        assert_eq!(
            sts.calls(),
            vec![Call::WebIdentity(AssumeRoleWithWebIdentityRequest {
                role_arn: "arn:aws:iam::123456789012:role/web".to_string(),
                role_session_name: "web-session".to_string(),
                web_identity_token: "jwt".to_string(),
                provider_id: Some("www.amazon.com".to_string()),
                ..Default::default()
            })]
        );
        assert!(provider.data().is_some());
    }

    #[tokio::test]
    async fn missing_connector_is_a_configuration_error() {
        let provider =
            WebIdentityCredentialsProvider::builder("arn:aws:iam::123456789012:role/web", "jwt")
                .configure(&ProviderConfig::no_configuration())
                .build();
        let err = provider.provide_credentials().await.expect_err("no connector");
        assert_eq!(
            err.to_string(),
            "AssumeRoleWithWebIdentity failed: no HTTP connector was configured"
        );
    }
}
