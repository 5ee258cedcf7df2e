/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::profile::credentials::ProfileFileError;
use aws_types::os_shim_internal::{Env, Fs};
use std::borrow::Cow;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

const DEFAULT_CREDENTIALS_PATH: &str = "~/.aws/credentials";
const DEFAULT_CONFIG_PATH: &str = "~/.aws/config";

/// Which of the two profile files a [`File`] came from. Section names are interpreted
/// differently in each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FileKind {
    Config,
    Credentials,
}

/// In-memory configuration file
#[derive(Debug)]
pub(crate) struct File {
    pub(crate) kind: FileKind,
    pub(crate) path: String,
    pub(crate) contents: String,
}

/// In-memory source of profile data
#[derive(Debug)]
pub(crate) struct Source {
    /// Contents and path of ~/.aws/credentials, when it exists
    pub(crate) credentials_file: Option<File>,

    /// Contents and path of ~/.aws/config, only read when config loading is enabled
    pub(crate) config_file: Option<File>,

    /// Profile to use
    ///
    /// An explicit choice, then `$AWS_PROFILE`, then `default`
    pub(crate) profile: Cow<'static, str>,
}

/// Overrides for where profiles are read from.
#[derive(Debug, Clone, Default)]
pub(crate) struct LoadOptions {
    /// Takes priority over `AWS_SHARED_CREDENTIALS_FILE`
    pub(crate) credentials_file: Option<PathBuf>,
    /// Takes priority over `AWS_PROFILE`
    pub(crate) profile: Option<String>,
    /// Whether to read the config file as well. Defaults to whether `AWS_SDK_LOAD_CONFIG` is set.
    pub(crate) load_config: Option<bool>,
}

impl LoadOptions {
    pub(crate) fn load_config(&self, env: &Env) -> bool {
        self.load_config
            .unwrap_or_else(|| env.get_non_empty("AWS_SDK_LOAD_CONFIG").is_some())
    }

    pub(crate) fn profile_name(&self, env: &Env) -> Cow<'static, str> {
        match &self.profile {
            Some(profile) => Cow::Owned(profile.clone()),
            None => env
                .get_non_empty("AWS_PROFILE")
                .map(Cow::Owned)
                .unwrap_or(Cow::Borrowed("default")),
        }
    }
}

/// Load a [Source](Source) from a given environment and filesystem.
///
/// A missing credentials file is only an error when the config file is not being loaded.
pub(crate) fn load(env: &Env, fs: &Fs, options: &LoadOptions) -> Result<Source, ProfileFileError> {
    let load_config = options.load_config(env);
    let credentials = tracing::info_span!("load_credentials_file").in_scope(|| {
        let path = resolve_path(
            env,
            options.credentials_file.as_deref(),
            "AWS_SHARED_CREDENTIALS_FILE",
            DEFAULT_CREDENTIALS_PATH,
        )?;
        read(fs, FileKind::Credentials, &path, !load_config)
    })?;
    let config = if load_config {
        tracing::info_span!("load_config_file").in_scope(|| {
            let path = resolve_path(env, None, "AWS_CONFIG_FILE", DEFAULT_CONFIG_PATH)?;
            read(fs, FileKind::Config, &path, false)
        })?
    } else {
        None
    };
    Ok(Source {
        credentials_file: credentials,
        config_file: config,
        profile: options.profile_name(env),
    })
}

/// An explicit path, then the path in `overridden_by_env_var`, then `default_path`, with `~`
/// expanded.
fn resolve_path(
    env: &Env,
    explicit: Option<&Path>,
    overridden_by_env_var: &str,
    default_path: &str,
) -> Result<PathBuf, ProfileFileError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => env
            .get_non_empty(overridden_by_env_var)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(default_path)),
    };
    let expanded = expand_home(&path, env)?;
    tracing::debug!(before = ?path, after = ?expanded, "home directory expanded");
    Ok(expanded)
}

fn read(
    fs: &Fs,
    kind: FileKind,
    path: &Path,
    required: bool,
) -> Result<Option<File>, ProfileFileError> {
    match fs.read_to_string(path) {
        Ok(contents) => {
            tracing::info!(path = %path.display(), size = contents.len(), "config file loaded");
            Ok(Some(File {
                kind,
                // lossy is OK here, the name of this file is just for debugging purposes
                path: path.to_string_lossy().into(),
                contents,
            }))
        }
        Err(err) if required => Err(ProfileFileError::CouldNotReadFile {
            path: path.to_string_lossy().into(),
            cause: Arc::new(err),
        }),
        Err(err) => {
            match err.kind() {
                ErrorKind::NotFound => {
                    tracing::info!(path = %path.display(), "config file not found")
                }
                _ => tracing::warn!(path = %path.display(), error = %err, "failed to read config file"),
            }
            Ok(None)
        }
    }
}

fn expand_home(path: &Path, env: &Env) -> Result<PathBuf, ProfileFileError> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(start)) if start == "~" => {
            let mut expanded = env.home_dir().ok_or(ProfileFileError::NoHomeDirectory)?;
            tracing::debug!(home = ?expanded, "performing home directory substitution");
            // rewrite the path using system-specific path separators
            for component in components {
                expanded.push(component);
            }
            Ok(expanded)
        }
        // Paths that don't begin with `~` come from configuration on the target platform and
        // already use its separators.
        _ => Ok(path.to_path_buf()),
    }
}
