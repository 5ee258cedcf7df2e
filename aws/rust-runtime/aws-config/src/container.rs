/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Credentials from a container metadata endpoint
//!
//! `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI` is appended as-is to `http://169.254.170.2`.
//! Otherwise `AWS_CONTAINER_CREDENTIALS_FULL_URI` is used, which must be `https`, or `http`
//! to a loopback or container metadata address. When `AWS_CONTAINER_AUTHORIZATION_TOKEN` is set
//! it is sent as the `Authorization` header.

use crate::http_provider::{HttpCredentialProvider, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT};
use crate::provider_config::ProviderConfig;
use aws_types::credential::lazy_caching::CredentialsCache;
use aws_types::credential::{self, future, CredentialsError, ProvideCredentials};
use aws_types::os_shim_internal::Env;
use http::{HeaderValue, Uri};
use smithy_http::connector::SharedHttpConnector;
use std::net::IpAddr;
use std::time::Duration;

const PROVIDER_NAME: &str = "ContainerCredentials";
const BASE_HOST: &str = "http://169.254.170.2";

const ENV_RELATIVE_URI: &str = "AWS_CONTAINER_CREDENTIALS_RELATIVE_URI";
const ENV_FULL_URI: &str = "AWS_CONTAINER_CREDENTIALS_FULL_URI";
const ENV_AUTHORIZATION: &str = "AWS_CONTAINER_AUTHORIZATION_TOKEN";

/// Container metadata addresses that may be reached over plain `http`
const ALLOWED_HTTP_HOSTS: &[&str] = &["localhost", "169.254.170.2", "169.254.170.23", "fd00:ec2::23"];

/// Credentials provider for containers, e.g. ECS tasks and EKS pods
#[derive(Debug)]
pub struct ContainerCredentialsProvider {
    env: Env,
    http: Option<HttpCredentialProvider>,
    cache: CredentialsCache,
}

impl ContainerCredentialsProvider {
    pub fn builder() -> Builder {
        Builder::default()
    }

    async fn load(&self) -> credential::Result {
        let uri = resolve_uri(&self.env)?;
        let auth = self
            .env
            .get_non_empty(ENV_AUTHORIZATION)
            .map(|token| {
                HeaderValue::from_str(&token).map_err(|err| {
                    CredentialsError::invalid_configuration(format!(
                        "{} is not a valid header value",
                        ENV_AUTHORIZATION
                    ))
                    .with_source(err)
                })
            })
            .transpose()?;
        let http = self.http.as_ref().ok_or_else(|| {
            CredentialsError::invalid_configuration("no HTTP connector was configured")
        })?;
        tracing::debug!(uri = %uri, "loading credentials from container endpoint");
        http.credentials(&uri, auth.as_ref()).await
    }
}

impl ProvideCredentials for ContainerCredentialsProvider {
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

    /// Retries after timeouts, socket errors, 5xx responses and unreadable 200 responses.
    /// Defaults to 3.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Timeout for each attempt. Defaults to one second.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> ContainerCredentialsProvider {
        let conf = self.conf.unwrap_or_default();
        let (max_retries, timeout) = (self.max_retries, self.timeout);
        ContainerCredentialsProvider {
            env: conf.env(),
            http: conf.connector().map(|connector: SharedHttpConnector| {
                HttpCredentialProvider::new(connector, PROVIDER_NAME)
                    .with_max_retries(max_retries)
                    .with_timeout(timeout)
            }),
            cache: CredentialsCache::new().with_time_source(conf.time_source()),
        }
    }
}

fn invalid_uri(message: String) -> CredentialsError {
    CredentialsError::invalid_configuration(message).with_code("ECSCredentialsProviderFailure")
}

fn resolve_uri(env: &Env) -> Result<Uri, CredentialsError> {
    if let Some(relative) = env.get_non_empty(ENV_RELATIVE_URI) {
        return format!("{}{}", BASE_HOST, relative)
            .parse::<Uri>()
            .map_err(|err| {
                invalid_uri(format!("Invalid {}: {}", ENV_RELATIVE_URI, err))
            });
    }
    let full = env.get_non_empty(ENV_FULL_URI).ok_or_else(|| {
        CredentialsError::not_loaded(format!(
            "Variable {} or {} must be set.",
            ENV_RELATIVE_URI, ENV_FULL_URI
        ))
    })?;
    let uri = full
        .parse::<Uri>()
        .map_err(|err| invalid_uri(format!("Invalid {}: {}", ENV_FULL_URI, err)))?;
    validate_full_uri(&uri)?;
    Ok(uri)
}

fn validate_full_uri(uri: &Uri) -> Result<(), CredentialsError> {
    let scheme = uri.scheme_str().unwrap_or_default();
    match scheme {
        "https" => Ok(()),
        "http" => {
            let host = uri
                .host()
                .unwrap_or_default()
                .trim_start_matches('[')
                .trim_end_matches(']');
            if is_allowed_http_host(host) {
                Ok(())
            } else {
                Err(invalid_uri(format!(
                    "Unsupported hostname: {}. Only loopback and container metadata hosts are allowed for http",
                    host
                )))
            }
        }
        other => Err(invalid_uri(format!(
            "Unsupported protocol: {}. {} must use http or https",
            other, ENV_FULL_URI
        ))),
    }
}

fn is_allowed_http_host(host: &str) -> bool {
    if ALLOWED_HTTP_HOSTS
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(host))
    {
        return true;
    }
    match host.parse::<IpAddr>() {
        Ok(ip) => ip.is_loopback(),
        Err(_) => false,
    }
}
