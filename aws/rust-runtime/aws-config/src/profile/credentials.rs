/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Profile File Based Credentials
//!
//! Loading happens in two steps:
//!
//! 1. `repr` parses `~/.aws/credentials` (and `~/.aws/config` when enabled) and flattens the
//!    `source_profile` links of the selected profile into base credentials plus a list of roles.
//! 2. [`SharedIniFileProvider`] loads the base credentials and assumes each role in turn, signing
//!    every `AssumeRole` call with the credentials the previous step produced.

use crate::credential_process::run_credential_process;
use crate::profile::mfa_token::{ProvideMfaToken, SerializedMfaTokenProvider};
use crate::profile::parser::{self, LoadOptions, ProfileParseError};
use crate::provider_config::ProviderConfig;
use crate::sts::client::{AssumeRoleRequest, SharedStsClient};
use crate::sts::util::{default_session_name, LazyStsClient};
use aws_types::credential::lazy_caching::CredentialsCache;
use aws_types::credential::{self, future, Credentials, CredentialsError, ProvideCredentials};
use aws_types::os_shim_internal::{Env, Fs};
use aws_types::time_source::SharedTimeSource;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Instrument;

mod repr;

const PROVIDER_NAME: &str = "ProfileFile";

/// Credentials from the shared credentials and config files
///
/// The credentials file is read from the explicit path given to the builder, then
/// `AWS_SHARED_CREDENTIALS_FILE`, then `~/.aws/credentials`. When config loading is enabled
/// (explicitly or with `AWS_SDK_LOAD_CONFIG`) the config file is read as well. The profile is the
/// one given to the builder, then `AWS_PROFILE`, then `default`.
///
/// ### Static credentials
/// ```ini
/// [default]
/// aws_access_key_id = 123
/// aws_secret_access_key = 456
/// ```
///
/// ### Assume role credentials from a source profile
/// ```ini
/// [default]
/// role_arn = arn:aws:iam::123456789:role/RoleA
/// source_profile = base
/// mfa_serial = arn:aws:iam::123456789:mfa/me
///
/// [base]
/// aws_access_key_id = 123
/// aws_secret_access_key = 456
/// ```
///
/// Source profiles may themselves assume roles, or run a `credential_process`.
///
/// ```rust,no_run
/// use aws_config::profile::credentials::SharedIniFileProvider;
/// let provider = SharedIniFileProvider::builder().profile_name("dev").build();
/// ```
#[derive(Debug)]
pub struct SharedIniFileProvider {
    options: LoadOptions,
    env: Env,
    fs: Fs,
    assume_role_enabled: bool,
    mfa: SerializedMfaTokenProvider,
    client: LazyStsClient,
    time_source: SharedTimeSource,
    cache: CredentialsCache,
}

impl SharedIniFileProvider {
    pub fn builder() -> Builder {
        Builder::default()
    }

    async fn load(&self) -> credential::Result {
        let profile_set = parser::load(&self.env, &self.fs, &self.options)?;
        let chain = repr::resolve_chain(&profile_set, self.assume_role_enabled)?;
        tracing::info!(chain = ?chain, "constructed credential chain from profile");

        let mut creds = match chain.base {
            repr::BaseProvider::AccessKey(creds) => creds,
            repr::BaseProvider::CredentialProcess(command) => {
                run_credential_process(command, self.time_source.now())
                    .instrument(tracing::info_span!("load_base_credentials"))
                    .await
                    .map_err(|err| {
                        tracing::warn!(error = %err, "failed to load base credentials");
                        err
                    })?
            }
        };
        for role in &chain.chain {
            creds = self
                .assume_role(&creds, role)
                .instrument(tracing::info_span!("load_assume_role", role_arn = %role.role_arn))
                .await?;
            tracing::info!(role_arn = %role.role_arn, "loaded assume role credentials");
        }
        Ok(creds)
    }

    async fn assume_role(&self, creds: &Credentials, role: &repr::RoleArn<'_>) -> credential::Result {
        let mut request = AssumeRoleRequest {
            role_arn: role.role_arn.to_string(),
            role_session_name: role
                .session_name
                .map(str::to_string)
                .unwrap_or_else(|| default_session_name(self.time_source.now())),
            external_id: role.external_id.map(str::to_string),
            duration_seconds: role.duration_seconds,
            ..Default::default()
        };
        if let Some(serial) = role.mfa_serial {
            request.serial_number = Some(serial.to_string());
            request.token_code = Some(self.mfa.token(serial).await?);
        }
        let client = self
            .client
            .get()
            .map_err(|err| err.into_credentials_error("AssumeRole"))?;
        let response = client.assume_role(creds, &request).await.map_err(|err| {
            tracing::warn!(role_arn = %role.role_arn, error = %err, "failed to assume role");
            err.into_credentials_error("AssumeRole")
        })?;
        Ok(response.credentials(PROVIDER_NAME))
    }
}

impl ProvideCredentials for SharedIniFileProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(
            self.cache
                .get_or_load(move || self.load())
                .instrument(tracing::info_span!("load_credentials", provider = PROVIDER_NAME)),
        )
    }

    fn refresh<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(
            self.cache
                .refresh(move || self.load())
                .instrument(tracing::info_span!("load_credentials", provider = PROVIDER_NAME)),
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
    options: LoadOptions,
    assume_role_enabled: bool,
    mfa: Option<SerializedMfaTokenProvider>,
    conf: Option<ProviderConfig>,
    sts_client: Option<SharedStsClient>,
}

impl Default for Builder {
    fn default() -> Self {
        Builder {
            options: LoadOptions::default(),
            assume_role_enabled: true,
            mfa: None,
            conf: None,
            sts_client: None,
        }
    }
}

impl Builder {
    /// Use `profile_name` instead of `AWS_PROFILE` or `default`
    pub fn profile_name(mut self, profile_name: impl Into<String>) -> Self {
        self.options.profile = Some(profile_name.into());
        self
    }

    /// Read the credentials file from `path` instead of `AWS_SHARED_CREDENTIALS_FILE` or
    /// `~/.aws/credentials`
    pub fn credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.credentials_file = Some(path.into());
        self
    }

    /// Whether to read the config file too. Defaults to whether `AWS_SDK_LOAD_CONFIG` is set.
    pub fn load_config(mut self, load_config: bool) -> Self {
        self.options.load_config = Some(load_config);
        self
    }

    /// Fail on profiles with `role_arn` instead of assuming the role
    pub fn disable_assume_role(mut self, disable: bool) -> Self {
        self.assume_role_enabled = !disable;
        self
    }

    /// Supplies token codes for profiles with `mfa_serial`
    ///
    /// Requests for codes never overlap, even when several role assumptions need one.
    pub fn mfa_token_provider(mut self, tokens: impl ProvideMfaToken + 'static) -> Self {
        self.mfa = Some(SerializedMfaTokenProvider::new(Arc::new(tokens)));
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

    pub fn build(self) -> SharedIniFileProvider {
        let conf = self.conf.unwrap_or_default();
        SharedIniFileProvider {
            options: self.options,
            env: conf.env(),
            fs: conf.fs(),
            assume_role_enabled: self.assume_role_enabled,
            mfa: self.mfa.unwrap_or_default(),
            time_source: conf.time_source(),
            cache: CredentialsCache::new().with_time_source(conf.time_source()),
            client: LazyStsClient::new(conf, self.sts_client),
        }
    }
}

/// Failure to turn the profile files into credentials
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum ProfileFileError {
    NoHomeDirectory,
    CouldNotReadFile {
        path: String,
        cause: Arc<io::Error>,
    },
    CouldNotParseProfile(ProfileParseError),
    MissingProfile {
        profile: String,
    },
    MissingSourceProfile {
        profile: String,
    },
    CredentialLoop {
        profiles: Vec<String>,
        next: String,
    },
    AssumeRoleDisabled {
        profile: String,
    },
    MissingCredentials {
        profile: String,
    },
    MissingCredentialProcess {
        profile: String,
    },
    MissingWebIdentityToken {
        profile: String,
    },
    InvalidDurationSeconds {
        profile: String,
        value: String,
    },
}

impl Display for ProfileFileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ProfileFileError::NoHomeDirectory => {
                write!(f, "Cannot load credentials, HOME path not set")
            }
            ProfileFileError::CouldNotReadFile { path, cause } => {
                write!(f, "Failed to load shared credentials file {}: {}", path, cause)
            }
            ProfileFileError::CouldNotParseProfile(err) => {
                write!(f, "could not parse profile file: {}", err)
            }
            ProfileFileError::MissingProfile { profile } => {
                write!(f, "Profile {} not found", profile)
            }
            ProfileFileError::MissingSourceProfile { profile } => {
                write!(f, "source_profile is not set using profile {}", profile)
            }
            ProfileFileError::CredentialLoop { profiles, next } => write!(
                f,
                "Circular source_profile reference found: {} -> {}",
                profiles.join(" -> "),
                next
            ),
            ProfileFileError::AssumeRoleDisabled { profile } => write!(
                f,
                "Role assumption profiles are disabled. Failed to load profile {}",
                profile
            ),
            ProfileFileError::MissingCredentials { profile } => {
                write!(f, "Credentials not set for profile {}", profile)
            }
            ProfileFileError::MissingCredentialProcess { profile } => {
                write!(f, "Profile {} did not include credential process", profile)
            }
            ProfileFileError::MissingWebIdentityToken { profile } => write!(
                f,
                "Profile {} did not include web_identity_token_file",
                profile
            ),
            ProfileFileError::InvalidDurationSeconds { profile, value } => write!(
                f,
                "Invalid duration_seconds `{}` in profile {}",
                value, profile
            ),
        }
    }
}

impl Error for ProfileFileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ProfileFileError::CouldNotReadFile { cause, .. } => Some(cause.as_ref()),
            ProfileFileError::CouldNotParseProfile(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProfileFileError> for CredentialsError {
    fn from(err: ProfileFileError) -> Self {
        let message = err.to_string();
        let converted = match &err {
            // nothing to load here, another provider may still succeed
            ProfileFileError::NoHomeDirectory
            | ProfileFileError::CouldNotReadFile { .. }
            | ProfileFileError::MissingProfile { .. }
            | ProfileFileError::MissingCredentials { .. }
            | ProfileFileError::MissingCredentialProcess { .. }
            | ProfileFileError::MissingWebIdentityToken { .. } => {
                CredentialsError::not_loaded(message)
            }
            _ => CredentialsError::invalid_configuration(message),
        };
        converted.with_source(err)
    }
}
