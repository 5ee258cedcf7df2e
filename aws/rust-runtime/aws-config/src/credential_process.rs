/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Credentials from an external process
//!
//! The command either comes from the caller or from the `credential_process` key of the selected
//! profile. It is run through the platform shell and must print a JSON document like:
//! ```json
//! {
//!   "Version": 1,
//!   "AccessKeyId": "ASIARTESTID",
//!   "SecretAccessKey": "TESTSECRETKEY",
//!   "SessionToken": "TESTSESSIONTOKEN",
//!   "Expiration": "2022-05-02T18:36:00+00:00"
//! }
//! ```

use crate::json_credentials::{parse_json_credentials, JsonCredentials, RefreshableCredentials};
use crate::profile::credentials::ProfileFileError;
use crate::profile::parser::{self, LoadOptions};
use crate::provider_config::ProviderConfig;
use aws_types::credential::lazy_caching::CredentialsCache;
use aws_types::credential::{self, future, Credentials, CredentialsError, ProvideCredentials};
use aws_types::os_shim_internal::{Env, Fs};
use aws_types::time_source::SharedTimeSource;
use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;
use tokio::process::Command;

const PROVIDER_NAME: &str = "CredentialProcess";

/// Returns `command` with its arguments redacted
pub(crate) fn debug_fmt_command_string(command: &str) -> Cow<'_, str> {
    match command.find(char::is_whitespace) {
        Some(index) => Cow::Owned(format!("{} ** arguments redacted **", &command[0..index])),
        None => Cow::Borrowed(command),
    }
}

enum CommandSource {
    Explicit(String),
    Profile {
        options: LoadOptions,
        env: Env,
        fs: Fs,
    },
}

impl fmt::Debug for CommandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // arguments may contain secrets
            CommandSource::Explicit(command) => f
                .debug_tuple("Explicit")
                .field(&debug_fmt_command_string(command))
                .finish(),
            CommandSource::Profile { options, .. } => {
                f.debug_struct("Profile").field("options", options).finish()
            }
        }
    }
}

/// Credentials provider that runs an external process
///
/// ```rust,no_run
/// use aws_config::credential_process::CredentialProcessProvider;
/// let provider = CredentialProcessProvider::new("/opt/bin/fetch-credentials --profile dev");
/// ```
///
/// Use [`CredentialProcessProvider::from_profile`] to run the `credential_process` command of a
/// profile instead.
#[derive(Debug)]
pub struct CredentialProcessProvider {
    source: CommandSource,
    time_source: SharedTimeSource,
    cache: CredentialsCache,
}

impl CredentialProcessProvider {
    /// Run `command` through the shell
    pub fn new(command: impl Into<String>) -> Self {
        Self::new_with_config(command, &ProviderConfig::default())
    }

    #[doc(hidden)]
    pub fn new_with_config(command: impl Into<String>, conf: &ProviderConfig) -> Self {
        CredentialProcessProvider {
            source: CommandSource::Explicit(command.into()),
            time_source: conf.time_source(),
            cache: CredentialsCache::new().with_time_source(conf.time_source()),
        }
    }

    /// Run the `credential_process` command of the selected profile
    pub fn from_profile() -> ProfileCommandBuilder {
        ProfileCommandBuilder::default()
    }

    fn command(&self) -> Result<Cow<'_, str>, ProfileFileError> {
        match &self.source {
            CommandSource::Explicit(command) => Ok(Cow::Borrowed(command)),
            CommandSource::Profile { options, env, fs } => {
                let profiles = parser::load(env, fs, options)?;
                let name = profiles.selected_profile();
                let profile = profiles
                    .get_profile(name)
                    .ok_or_else(|| ProfileFileError::MissingProfile {
                        profile: name.to_string(),
                    })?;
                profile
                    .get_non_empty("credential_process")
                    .map(|command| Cow::Owned(command.to_string()))
                    .ok_or_else(|| ProfileFileError::MissingCredentialProcess {
                        profile: name.to_string(),
                    })
            }
        }
    }

    async fn load(&self) -> credential::Result {
        let command = self.command()?;
        run_credential_process(&command, self.time_source.now()).await
    }
}

impl ProvideCredentials for CredentialProcessProvider {
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

/// Builder for [`CredentialProcessProvider::from_profile`]
#[derive(Debug, Default)]
pub struct ProfileCommandBuilder {
    options: LoadOptions,
    conf: Option<ProviderConfig>,
}

impl ProfileCommandBuilder {
    /// Use `profile_name` instead of `AWS_PROFILE` or `default`
    pub fn profile_name(mut self, profile_name: impl Into<String>) -> Self {
        self.options.profile = Some(profile_name.into());
        self
    }

    pub fn credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.credentials_file = Some(path.into());
        self
    }

    pub fn load_config(mut self, load_config: bool) -> Self {
        self.options.load_config = Some(load_config);
        self
    }

    pub fn configure(mut self, conf: &ProviderConfig) -> Self {
        self.conf = Some(conf.clone());
        self
    }

    pub fn build(self) -> CredentialProcessProvider {
        let conf = self.conf.unwrap_or_default();
        CredentialProcessProvider {
            source: CommandSource::Profile {
                options: self.options,
                env: conf.env(),
                fs: conf.fs(),
            },
            time_source: conf.time_source(),
            cache: CredentialsCache::new().with_time_source(conf.time_source()),
        }
    }
}

fn process_error(message: &'static str) -> CredentialsError {
    CredentialsError::provider_error(message)
        .with_code("ProcessCredentialsProviderFailure")
        .with_retryable(false)
}

/// Run `command` and parse the credentials it prints, rejecting credentials expired at `now`
pub(crate) async fn run_credential_process(command: &str, now: SystemTime) -> credential::Result {
    tracing::debug!(command = %debug_fmt_command_string(command), "loading credentials from external process");
    let mut process = if cfg!(windows) {
        let mut process = Command::new("cmd.exe");
        process.args(&["/C", command]);
        process
    } else {
        let mut process = Command::new("sh");
        process.args(&["-c", command]);
        process
    };
    let output = process.output().await.map_err(|err| {
        CredentialsError::provider_error(format!(
            "Error retrieving credentials from external process: {}",
            err
        ))
        .with_source(err)
    })?;
    tracing::trace!(command = %command, status = ?output.status, "executed command (unredacted)");
    tracing::debug!(command = %debug_fmt_command_string(command), status = ?output.status, "executed command");

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        return Err(process_error("credential_process returned error").with_source(stderr));
    }
    let stdout = std::str::from_utf8(&output.stdout).map_err(|err| {
        CredentialsError::provider_error("credential_process output was not valid UTF-8")
            .with_source(err)
    })?;
    let credentials = parse_process_output(stdout)?;
    if let Some(expiration) = credentials.expiration {
        if expiration < now {
            return Err(process_error(
                "credential_process returned expired credentials",
            ));
        }
    }
    Ok(Credentials::new(
        credentials.access_key_id,
        credentials.secret_access_key,
        credentials.session_token,
        credentials.expiration,
        PROVIDER_NAME,
    ))
}

fn parse_process_output(stdout: &str) -> Result<RefreshableCredentials, CredentialsError> {
    let invalid = |err: String| {
        CredentialsError::provider_error(format!(
            "Error retrieving credentials from external process, could not parse response: {}",
            err
        ))
    };
    let document: serde_json::Value =
        serde_json::from_str(stdout).map_err(|err| invalid(err.to_string()))?;
    if document.get("Version").and_then(serde_json::Value::as_i64) != Some(1) {
        return Err(process_error(
            "credential_process does not return Version == 1",
        ));
    }
    match parse_json_credentials(stdout).map_err(|err| invalid(err.to_string()))? {
        JsonCredentials::RefreshableCredentials(credentials) => Ok(credentials),
        JsonCredentials::Error { code, message } => Err(invalid(format!("{}: {}", code, message))),
    }
}
