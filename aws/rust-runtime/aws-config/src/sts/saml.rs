/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::provider_config::ProviderConfig;
use crate::sts::client::{AssumeRoleWithSamlRequest, SharedStsClient};
use crate::sts::util::{duration_seconds, AuxiliaryData, LazyStsClient};
use aws_types::credential::lazy_caching::CredentialsCache;
use aws_types::credential::{self, future, ProvideCredentials};
use smithy_types::Value;
use std::time::Duration;

const PROVIDER_NAME: &str = "SamlCredentials";

/// Exchanges a base64-encoded SAML authentication response for credentials with
/// `AssumeRoleWithSAML`
#[derive(Debug)]
pub struct SamlCredentialsProvider {
    request: AssumeRoleWithSamlRequest,
    client: LazyStsClient,
    cache: CredentialsCache,
    data: AuxiliaryData,
}

impl SamlCredentialsProvider {
    /// `principal_arn` names the SAML provider in IAM that describes the identity provider.
    pub fn builder(
        role_arn: impl Into<String>,
        principal_arn: impl Into<String>,
        saml_assertion: impl Into<String>,
    ) -> SamlCredentialsProviderBuilder {
        SamlCredentialsProviderBuilder {
            request: AssumeRoleWithSamlRequest {
                role_arn: role_arn.into(),
                principal_arn: principal_arn.into(),
                saml_assertion: saml_assertion.into(),
                ..Default::default()
            },
            conf: None,
            sts_client: None,
        }
    }

    pub fn data(&self) -> Option<Value> {
        self.data.get()
    }

    async fn load(&self) -> credential::Result {
        let client = self
            .client
            .get()
            .map_err(|err| err.into_credentials_error("AssumeRoleWithSAML"))?;
        let response = client
            .assume_role_with_saml(&self.request)
            .await
            .map_err(|err| err.into_credentials_error("AssumeRoleWithSAML"))?;
        tracing::info!(role_arn = %self.request.role_arn, "assumed role with SAML");
        self.data.set(response.data());
        Ok(response.credentials(PROVIDER_NAME))
    }
}

impl ProvideCredentials for SamlCredentialsProvider {
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
pub struct SamlCredentialsProviderBuilder {
    request: AssumeRoleWithSamlRequest,
    conf: Option<ProviderConfig>,
    sts_client: Option<SharedStsClient>,
}

impl SamlCredentialsProviderBuilder {
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

    pub fn build(self) -> SamlCredentialsProvider {
        let conf = self.conf.unwrap_or_default();
        SamlCredentialsProvider {
            request: self.request,
            cache: CredentialsCache::new().with_time_source(conf.time_source()),
            client: LazyStsClient::new(conf, self.sts_client),
            data: AuxiliaryData::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::SamlCredentialsProvider;
    use crate::provider_config::ProviderConfig;
    use crate::sts::client::test::{Call, RecordingStsClient};
    use aws_types::credential::ProvideCredentials;
    use std::sync::Arc;

    #[tokio::test]
    async fn assertion_is_exchanged() {
        let sts = Arc::new(RecordingStsClient::default());
        let provider = SamlCredentialsProvider::builder(
            "arn:aws:iam::123456789012:role/saml",
            "arn:aws:iam::123456789012:saml-provider/idp",
            "PHNhbWxwOlJlc3BvbnNlPg==",
        )
        .configure(&ProviderConfig::no_configuration())
        .sts_client(sts.clone())
        .build();
        let creds = provider.provide_credentials().await.expect("exchanged");
        assert_eq!(creds.access_key_id(), "ASIA-saml");
        match &sts.calls()[0] {
            Call::Saml(request) => {
                assert_eq!(
                    request.principal_arn,
                    "arn:aws:iam::123456789012:saml-provider/idp"
                );
                assert!(!format!("{:?}", request).contains("PHNhbWxw"));
            }
            other => panic!("unexpected call {:?}", other),
        }
    }
}
