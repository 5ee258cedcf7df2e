/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use aws_types::credential::lazy_caching::CredentialsCache;
use aws_types::credential::{self, future, Credentials, CredentialsError, ProvideCredentials};
use aws_types::os_shim_internal::Env;

const PROVIDER_NAME: &str = "Environment";

/// Load Credentials from Environment Variables
///
/// With the default `AWS` prefix this reads `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and the
/// optional `AWS_SESSION_TOKEN`. Empty variables are treated as unset.
#[derive(Debug, Clone)]
pub struct EnvironmentVariableCredentialsProvider {
    env: Env,
    prefix: String,
    cache: CredentialsCache,
}

impl EnvironmentVariableCredentialsProvider {
    /// Reads `AWS_ACCESS_KEY_ID` and friends from the process environment.
    pub fn new() -> Self {
        Self::new_with_prefix("AWS")
    }

    /// Reads `<PREFIX>_ACCESS_KEY_ID` and friends. An empty prefix reads `ACCESS_KEY_ID`.
    pub fn new_with_prefix(prefix: impl Into<String>) -> Self {
        Self::new_with_env(prefix, Env::default())
    }

    #[doc(hidden)]
    pub fn new_with_env(prefix: impl Into<String>, env: Env) -> Self {
        EnvironmentVariableCredentialsProvider {
            env,
            prefix: prefix.into(),
            cache: CredentialsCache::new(),
        }
    }

    fn var_name(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}_{}", self.prefix, key)
        }
    }

    fn required(&self, key: &str) -> Result<String, CredentialsError> {
        let name = self.var_name(key);
        self.env
            .get_non_empty(&name)
            .ok_or_else(|| CredentialsError::not_loaded(format!("Variable {} not set.", name)))
    }

    async fn load(&self) -> credential::Result {
        let access_key = self.required("ACCESS_KEY_ID")?;
        let secret_key = self.required("SECRET_ACCESS_KEY")?;
        let session_token = self.env.get_non_empty(&self.var_name("SESSION_TOKEN"));
        Ok(Credentials::new(
            access_key,
            secret_key,
            session_token,
            None,
            PROVIDER_NAME,
        ))
    }
}

impl Default for EnvironmentVariableCredentialsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvideCredentials for EnvironmentVariableCredentialsProvider {
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
