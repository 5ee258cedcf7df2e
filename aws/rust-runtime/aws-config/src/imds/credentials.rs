/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! IMDS Credentials Provider
//!
//! Loads the credentials of the instance profile role from
//! `/latest/meta-data/iam/security-credentials/<role>`.

use super::Client;
use crate::http_provider::{parse_response, HttpCredentialProvider, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT};
use crate::provider_config::ProviderConfig;
use aws_types::credential::lazy_caching::CredentialsCache;
use aws_types::credential::{self, future, CredentialsError, ProvideCredentials};
use aws_types::os_shim_internal::Env;
use std::time::Duration;
use tracing::Instrument;

const PROVIDER_NAME: &str = "Ec2InstanceMetadata";
const ROLE_PATH: &str = "/latest/meta-data/iam/security-credentials/";

/// IMDSv2 Credentials Provider
///
/// Disabled when `AWS_EC2_METADATA_DISABLED=true`. The endpoint can be overridden with
/// `AWS_EC2_METADATA_SERVICE_ENDPOINT`.
#[derive(Debug)]
pub struct ImdsCredentialsProvider {
    env: Env,
    client: Option<Client>,
    cache: CredentialsCache,
}

impl ImdsCredentialsProvider {
    pub fn builder() -> Builder {
        Builder::default()
    }

    async fn load(&self) -> credential::Result {
        if super::imds_disabled(&self.env) {
            return Err(CredentialsError::not_loaded(
                "IMDS disabled by AWS_EC2_METADATA_DISABLED env var",
            ));
        }
        let client = self.client.as_ref().ok_or_else(|| {
            CredentialsError::invalid_configuration("no HTTP connector was configured")
        })?;
        let creds = client
            .http()
            .with_retries(|| async move {
                let role = client.get(ROLE_PATH).await?;
                let role = role_name(role.body()).ok_or_else(|| {
                    CredentialsError::not_loaded("no IAM role is attached to this instance")
                })?;
                tracing::debug!(role = %role, "loading credentials for instance profile role");
                let response = client.get(&format!("{}{}", ROLE_PATH, role)).await?;
                parse_response(PROVIDER_NAME, &response)
            })
            .await?;
        tracing::info!("loaded credentials from IMDS");
        Ok(creds)
    }
}

/// First line of the role listing
fn role_name(body: &[u8]) -> Option<String> {
    let body = std::str::from_utf8(body).ok()?;
    body.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

impl ProvideCredentials for ImdsCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(
            self.cache
                .get_or_load(move || self.load())
                .instrument(tracing::info_span!("imds_load_credentials")),
        )
    }

    fn refresh<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(
            self.cache
                .refresh(move || self.load())
                .instrument(tracing::info_span!("imds_load_credentials")),
        )
    }

    fn needs_refresh(&self) -> bool {
        self.cache.needs_refresh()
    }

    fn expire(&self) {
        self.cache.expire()
    }
}

#[derive(Debug)]
pub struct Builder {
    conf: Option<ProviderConfig>,
    max_retries: usize,
    timeout: Duration,
}

impl Default for Builder {
    fn default() -> Self {
        Builder {
            conf: None,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Builder {
    pub fn configure(mut self, conf: &ProviderConfig) -> Self {
        self.conf = Some(conf.clone());
        self
    }

    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> ImdsCredentialsProvider {
        let (max_retries, timeout) = (self.max_retries, self.timeout);
        let conf = self.conf.unwrap_or_default();
        let env = conf.env();
        let client = conf.connector().map(|connector| {
            let http = HttpCredentialProvider::new(connector, PROVIDER_NAME)
                .with_max_retries(max_retries)
                .with_timeout(timeout);
            Client::new(http, super::endpoint(&env), conf.time_source())
        });
        ImdsCredentialsProvider {
            env,
            client,
            cache: CredentialsCache::new().with_time_source(conf.time_source()),
        }
    }
}
