/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::profile::credentials::ProfileFileError;
use aws_types::os_shim_internal::{Env, Fs};
use std::borrow::Cow;
use std::collections::HashMap;

mod normalize;
mod parse;
mod source;

pub use parse::ProfileParseError;
pub(crate) use source::LoadOptions;

/// Read and parse the profile files selected by `options`
///
/// The credentials file is always read, the config file only when config loading is enabled.
/// When both files define a profile of the same name, the credentials file's profile replaces
/// the config file's entirely: the two are never merged.
pub(crate) fn load(
    env: &Env,
    fs: &Fs,
    options: &LoadOptions,
) -> Result<ProfileSet, ProfileFileError> {
    let source = source::load(env, fs, options)?;
    ProfileSet::parse(source).map_err(|err| {
        tracing::warn!(err = %err, "failed to parse profile");
        ProfileFileError::CouldNotParseProfile(err)
    })
}

/// A set of profiles and the name of the selected one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSet {
    profiles: HashMap<String, Profile>,
    selected_profile: Cow<'static, str>,
}

impl ProfileSet {
    /// Create a new profile set directly from a HashMap
    ///
    /// This method creates a ProfileSet directly from a hashmap with no normalization.
    #[doc(hidden)]
    pub fn new(
        profiles: HashMap<String, HashMap<String, String>>,
        selected_profile: impl Into<Cow<'static, str>>,
    ) -> Self {
        let profiles = profiles
            .into_iter()
            .map(|(name, properties)| {
                let properties = properties
                    .into_iter()
                    .map(|(k, v)| (k.clone(), Property::new(k, v)))
                    .collect();
                (name.clone(), Profile::new(name, properties))
            })
            .collect();
        ProfileSet {
            profiles,
            selected_profile: selected_profile.into(),
        }
    }

    fn parse(source: source::Source) -> Result<Self, ProfileParseError> {
        let mut profiles = HashMap::new();
        if let Some(file) = &source.config_file {
            profiles.extend(normalize::normalize(parse::parse_profile_file(file)?, file.kind));
        }
        if let Some(file) = &source.credentials_file {
            let credentials_profiles =
                normalize::normalize(parse::parse_profile_file(file)?, file.kind);
            for (name, profile) in credentials_profiles {
                if profiles.contains_key(&name) {
                    tracing::debug!(
                        profile = %name,
                        "credentials file profile replaced the config file profile of the same name"
                    );
                }
                profiles.insert(name, profile);
            }
        }
        Ok(ProfileSet {
            profiles,
            selected_profile: source.profile,
        })
    }

    /// Retrieves a key-value pair from the currently selected profile
    pub fn get(&self, key: &str) -> Option<&str> {
        self.profiles
            .get(self.selected_profile.as_ref())
            .and_then(|profile| profile.get(key))
    }

    /// Retrieve a named profile from the profile set
    pub fn get_profile(&self, profile_name: &str) -> Option<&Profile> {
        self.profiles.get(profile_name)
    }

    /// Returns the name of the currently selected profile
    pub fn selected_profile(&self) -> &str {
        self.selected_profile.as_ref()
    }

    /// Returns true if no profiles are contained in this profile set
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Returns the names of the profiles in this profile set
    pub fn profiles(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_ref)
    }
}

/// An individual configuration profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    name: String,
    properties: HashMap<String, Property>,
}

impl Profile {
    /// Create a new profile
    pub fn new(name: impl Into<String>, properties: HashMap<String, Property>) -> Self {
        Self {
            name: name.into(),
            properties,
        }
    }

    /// The name of this profile
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a reference to the property named `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(|prop| prop.value())
    }

    /// Like [`get`](Self::get), but an empty value counts as missing
    pub(crate) fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|value| !value.is_empty())
    }
}

/// Key-Value property pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    key: String,
    value: String,
}

impl Property {
    /// Value of this property
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Name of this property
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Creates a new property
    pub fn new(key: String, value: String) -> Self {
        Property { key, value }
    }
}

#[cfg(test)]
mod test {
    use super::{load, LoadOptions};
    use aws_types::os_shim_internal::{Env, Fs};

    #[test]
    fn credentials_file_replaces_config_profile() {
        let env = Env::from_slice(&[("HOME", "/home"), ("AWS_SDK_LOAD_CONFIG", "true")]);
        let fs = Fs::from_slice(&[
            (
                "/home/.aws/config",
                "[profile dev]\nrole_arn = arn:aws:iam::123456789:role/Dev\nsource_profile = base\n\
                 [profile only-config]\nregion = us-east-2",
            ),
            (
                "/home/.aws/credentials",
                "[dev]\naws_access_key_id = AKID\naws_secret_access_key = SECRET",
            ),
        ]);
        let profiles = load(&env, &fs, &LoadOptions::default()).expect("valid profiles");
        let dev = profiles.get_profile("dev").expect("dev exists");
        assert_eq!(dev.get("aws_access_key_id"), Some("AKID"));
        // nothing from the config file's `dev` survives
        assert_eq!(dev.get("role_arn"), None);
        assert_eq!(
            profiles.get_profile("only-config").and_then(|p| p.get("region")),
            Some("us-east-2")
        );
        assert_eq!(profiles.selected_profile(), "default");
    }

    #[test]
    fn parse_errors_are_reported() {
        let env = Env::from_slice(&[("HOME", "/home")]);
        let fs = Fs::from_slice(&[("/home/.aws/credentials", "aws_access_key_id = AKID")]);
        let err = load(&env, &fs, &LoadOptions::default()).expect_err("invalid file");
        assert!(
            err.to_string().contains("Expected a profile definition"),
            "{}",
            err
        );
    }
}
