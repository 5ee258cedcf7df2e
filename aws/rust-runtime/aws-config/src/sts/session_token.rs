/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::profile::mfa_token::{ProvideMfaToken, SerializedMfaTokenProvider};
use crate::provider_config::ProviderConfig;
use crate::sts::client::{GetSessionTokenRequest, SharedStsClient};
use crate::sts::util::{duration_seconds, AuxiliaryData, LazyStsClient};
use aws_types::credential::lazy_caching::CredentialsCache;
use aws_types::credential::{self, future, ProvideCredentials, SharedCredentialsProvider};
use smithy_types::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

const PROVIDER_NAME: &str = "SessionTokenProvider";

/// Temporary session credentials from `GetSessionToken`, signed with the credentials of
/// another provider
#[derive(Debug)]
pub struct SessionTokenProvider {
    source: SharedCredentialsProvider,
    request: GetSessionTokenRequest,
    mfa: Option<(String, SerializedMfaTokenProvider)>,
    client: LazyStsClient,
    cache: CredentialsCache,
    data: AuxiliaryData,
}

impl SessionTokenProvider {
    pub fn builder() -> SessionTokenProviderBuilder {
        SessionTokenProviderBuilder::default()
    }

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
        if let Some((serial, tokens)) = &self.mfa {
            request.serial_number = Some(serial.clone());
            request.token_code = Some(tokens.token(serial).await?);
        }
        let client = self
            .client
            .get()
            .map_err(|err| err.into_credentials_error("GetSessionToken"))?;
        let response = client
            .get_session_token(&source, &request)
            .await
            .map_err(|err| err.into_credentials_error("GetSessionToken"))?;
        tracing::info!("loaded session credentials");
        self.data.set(response.data());
        Ok(response.credentials(PROVIDER_NAME))
    }
}

impl ProvideCredentials for SessionTokenProvider {
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

#[derive(Debug, Default)]
pub struct SessionTokenProviderBuilder {
    request: GetSessionTokenRequest,
    mfa: Option<(String, SerializedMfaTokenProvider)>,
    conf: Option<ProviderConfig>,
    sts_client: Option<SharedStsClient>,
}

impl SessionTokenProviderBuilder {
    pub fn duration(mut self, duration: Duration) -> Self {
        self.request.duration_seconds = Some(duration_seconds(duration));
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

    pub fn sts_client(mut self, client: SharedStsClient) -> Self {
        self.sts_client = Some(client);
        self
    }

    pub fn configure(mut self, conf: &ProviderConfig) -> Self {
        self.conf = Some(conf.clone());
        self
    }

    /// Build a provider that signs `GetSessionToken` with credentials from `provider`.
    pub fn build(self, provider: impl ProvideCredentials + 'static) -> SessionTokenProvider {
        let conf = self.conf.unwrap_or_default();
        SessionTokenProvider {
            source: Arc::new(provider),
            request: self.request,
            mfa: self.mfa,
            cache: CredentialsCache::new().with_time_source(conf.time_source()),
            client: LazyStsClient::new(conf, self.sts_client),
            data: AuxiliaryData::default(),
        }
    }
}
