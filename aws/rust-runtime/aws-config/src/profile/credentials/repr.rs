/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Flattened representation of a profile's credential chain
//!
//! Resolution follows `source_profile` links until it reaches a profile that can produce
//! credentials on its own. The result is the base credentials plus the roles to assume with
//! them, innermost role first.

use super::ProfileFileError;
use crate::credential_process::debug_fmt_command_string;
use crate::profile::{Profile, ProfileSet};
use aws_types::credential::Credentials;
use std::fmt;

const PROVIDER_NAME: &str = "ProfileFile";

/// Credentials at the root of a role chain
pub(super) enum BaseProvider<'a> {
    AccessKey(Credentials),
    CredentialProcess(&'a str),
}

impl fmt::Debug for BaseProvider<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseProvider::AccessKey(creds) => f.debug_tuple("AccessKey").field(creds).finish(),
            BaseProvider::CredentialProcess(command) => f
                .debug_tuple("CredentialProcess")
                .field(&debug_fmt_command_string(command))
                .finish(),
        }
    }
}

/// A role to assume, read from a profile with `role_arn`
#[derive(Debug, PartialEq, Eq)]
pub(super) struct RoleArn<'a> {
    pub(super) role_arn: &'a str,
    pub(super) external_id: Option<&'a str>,
    pub(super) session_name: Option<&'a str>,
    pub(super) duration_seconds: Option<i32>,
    pub(super) mfa_serial: Option<&'a str>,
}

#[derive(Debug)]
pub(super) struct ProfileChain<'a> {
    pub(super) base: BaseProvider<'a>,
    pub(super) chain: Vec<RoleArn<'a>>,
}

mod keys {
    pub const ACCESS_KEY_ID: &str = "aws_access_key_id";
    pub const SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
    pub const SESSION_TOKEN: &str = "aws_session_token";
    pub const ROLE_ARN: &str = "role_arn";
    pub const SOURCE_PROFILE: &str = "source_profile";
    pub const EXTERNAL_ID: &str = "external_id";
    pub const SESSION_NAME: &str = "role_session_name";
    pub const DURATION_SECONDS: &str = "duration_seconds";
    pub const MFA_SERIAL: &str = "mfa_serial";
    pub const CREDENTIAL_PROCESS: &str = "credential_process";
}

/// Walk from the selected profile to a profile with its own credentials
///
/// In the selected profile `role_arn` takes priority over static keys. In source profiles a
/// complete pair of static keys takes priority over `role_arn`.
pub(super) fn resolve_chain(
    profile_set: &ProfileSet,
    assume_role_enabled: bool,
) -> Result<ProfileChain<'_>, ProfileFileError> {
    let mut visited: Vec<&str> = Vec::new();
    let mut chain = Vec::new();
    let mut name = profile_set.selected_profile();
    let base = loop {
        if visited.contains(&name) {
            return Err(ProfileFileError::CredentialLoop {
                profiles: visited.iter().map(|p| p.to_string()).collect(),
                next: name.to_string(),
            });
        }
        let profile = profile_set
            .get_profile(name)
            .ok_or_else(|| ProfileFileError::MissingProfile {
                profile: name.to_string(),
            })?;
        let is_source = !visited.is_empty();
        visited.push(name);

        match (
            profile.get_non_empty(keys::ROLE_ARN),
            static_credentials(profile),
        ) {
            (Some(_), Some(creds)) if is_source => break BaseProvider::AccessKey(creds),
            (Some(role_arn), _) => {
                if !assume_role_enabled {
                    return Err(ProfileFileError::AssumeRoleDisabled {
                        profile: name.to_string(),
                    });
                }
                let source = profile.get_non_empty(keys::SOURCE_PROFILE).ok_or_else(|| {
                    ProfileFileError::MissingSourceProfile {
                        profile: name.to_string(),
                    }
                })?;
                chain.push(role(profile, role_arn)?);
                tracing::debug!(profile = %name, source_profile = %source, "following source_profile");
                name = source;
            }
            (None, Some(creds)) => break BaseProvider::AccessKey(creds),
            (None, None) => match profile.get_non_empty(keys::CREDENTIAL_PROCESS) {
                Some(command) => break BaseProvider::CredentialProcess(command),
                None => {
                    return Err(ProfileFileError::MissingCredentials {
                        profile: name.to_string(),
                    })
                }
            },
        }
    };
    chain.reverse();
    Ok(ProfileChain { base, chain })
}

fn static_credentials(profile: &Profile) -> Option<Credentials> {
    let access_key = profile.get_non_empty(keys::ACCESS_KEY_ID)?;
    let secret_key = profile.get_non_empty(keys::SECRET_ACCESS_KEY)?;
    Some(Credentials::new(
        access_key,
        secret_key,
        profile.get_non_empty(keys::SESSION_TOKEN).map(str::to_string),
        None,
        PROVIDER_NAME,
    ))
}

fn role<'a>(profile: &'a Profile, role_arn: &'a str) -> Result<RoleArn<'a>, ProfileFileError> {
    let duration_seconds = profile
        .get_non_empty(keys::DURATION_SECONDS)
        .map(|value| {
            value
                .parse::<i32>()
                .map_err(|_| ProfileFileError::InvalidDurationSeconds {
                    profile: profile.name().to_string(),
                    value: value.to_string(),
                })
        })
        .transpose()?;
    Ok(RoleArn {
        role_arn,
        external_id: profile.get_non_empty(keys::EXTERNAL_ID),
        session_name: profile.get_non_empty(keys::SESSION_NAME),
        duration_seconds,
        mfa_serial: profile.get_non_empty(keys::MFA_SERIAL),
    })
}
