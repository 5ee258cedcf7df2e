/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::profile::parser::parse::RawProfileSet;
use crate::profile::parser::source::FileKind;
use crate::profile::parser::{Profile, Property};
use std::collections::HashMap;

const PROFILE_PREFIX: &str = "profile";

/// Normalize the raw sections of one file into profiles
///
/// This function follows the following rules:
/// - When the file is a config file, strip `profile` and trim whitespace (`profile foo` => `foo`)
/// - In config files, sections other than `default` MUST start with `profile `
/// - A profile named `profile default` takes priority over a profile named `default`
/// - Profile names and property keys are validated (see `validate_identifier`)
pub(super) fn normalize(raw_profile_set: RawProfileSet<'_>, kind: FileKind) -> HashMap<String, Profile> {
    let mut profiles = HashMap::new();
    let mut default_profile_has_profile_prefix = false;
    // `[profile default]` must win regardless of where it appears in the file
    let mut sections: Vec<_> = raw_profile_set.into_iter().collect();
    sections.sort_by_key(|(name, _)| *name == "default");
    for (section_name, properties) in sections {
        let profile_name = match (section_name, kind) {
            // credentials files don't perform any profile name normalization
            (any, FileKind::Credentials) => any,
            ("default", FileKind::Config) if default_profile_has_profile_prefix => {
                tracing::warn!("profile `default` ignored because `[profile default]` was found which takes priority");
                continue;
            }
            ("default", FileKind::Config) => "default",
            (other, FileKind::Config) => match other
                .strip_prefix(PROFILE_PREFIX)
                .filter(|rest| rest.starts_with(char::is_whitespace))
                .map(str::trim)
            {
                Some("default") => {
                    default_profile_has_profile_prefix = true;
                    "default"
                }
                Some(name) => name,
                None => {
                    tracing::warn!(profile = %other, "profile ignored: in config files, profiles MUST start with `profile `");
                    continue;
                }
            },
        };
        let profile_name = match validate_identifier(profile_name) {
            Some(name) => name,
            None => {
                tracing::warn!(profile = %profile_name, "profile ignored because `{}` was not a valid identifier", profile_name);
                continue;
            }
        };
        let profile = profiles
            .entry(profile_name.to_string())
            .or_insert_with(|| Profile::new(profile_name, HashMap::new()));
        for (key, value) in properties {
            match validate_identifier(key) {
                Some(key) => {
                    profile
                        .properties
                        .insert(key.to_owned(), Property::new(key.to_owned(), value.into()));
                }
                None => {
                    tracing::warn!(profile = %profile_name, key = ?key, "key ignored because `{}` was not a valid identifier", key);
                }
            }
        }
    }
    profiles
}

/// Validate that a string is a valid identifier
///
/// Identifiers must match `[A-Za-z0-9_\-/.%@:\+]+`
fn validate_identifier(input: &str) -> Option<&str> {
    let valid = !input.is_empty()
        && input.chars().all(|ch| {
            ch.is_ascii_alphanumeric()
                || matches!(ch, '_' | '-' | '/' | '.' | '%' | '@' | ':' | '+')
        });
    if valid {
        Some(input)
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::{normalize, validate_identifier};
    use crate::profile::parser::parse::RawProfileSet;
    use crate::profile::parser::source::FileKind;
    use std::borrow::Cow;
    use std::collections::HashMap;
    use tracing_test::traced_test;

    fn section<'a>(props: &[(&'a str, &'a str)]) -> HashMap<&'a str, Cow<'a, str>> {
        props
            .iter()
            .map(|(k, v)| (*k, Cow::Borrowed(*v)))
            .collect()
    }

    #[test]
    fn config_file_prefixes_are_stripped() {
        let mut raw: RawProfileSet = HashMap::new();
        raw.insert("profile foo", section(&[("region", "us-east-1")]));
        raw.insert("default", section(&[("region", "us-west-2")]));
        let profiles = normalize(raw, FileKind::Config);
        assert_eq!(profiles["foo"].get("region"), Some("us-east-1"));
        assert_eq!(profiles["default"].get("region"), Some("us-west-2"));
    }

    #[test]
    fn credentials_file_names_are_kept() {
        let mut raw: RawProfileSet = HashMap::new();
        raw.insert("foo", section(&[("aws_access_key_id", "a")]));
        let profiles = normalize(raw, FileKind::Credentials);
        assert_eq!(profiles["foo"].get("aws_access_key_id"), Some("a"));
    }

    #[test]
    #[traced_test]
    fn profile_default_wins() {
        let mut raw: RawProfileSet = HashMap::new();
        raw.insert("default", section(&[("region", "plain")]));
        raw.insert("profile default", section(&[("region", "prefixed")]));
        let profiles = normalize(raw, FileKind::Config);
        assert_eq!(profiles["default"].get("region"), Some("prefixed"));
        assert!(logs_contain("profile `default` ignored"));
    }

    #[test]
    #[traced_test]
    fn ignored_key_generates_warning() {
        let mut raw: RawProfileSet = HashMap::new();
        raw.insert("default", section(&[("invalid key", "value")]));
        let profiles = normalize(raw, FileKind::Config);
        assert_eq!(profiles["default"].get("invalid key"), None);
        assert!(logs_contain(
            "key ignored because `invalid key` was not a valid identifier"
        ));
    }

    #[test]
    #[traced_test]
    fn invalid_profile_generates_warning() {
        let mut raw: RawProfileSet = HashMap::new();
        raw.insert("foo", HashMap::new());
        raw.insert("profilebar", HashMap::new());
        let profiles = normalize(raw, FileKind::Config);
        assert!(profiles.is_empty());
        assert!(logs_contain("profile ignored"));
        assert!(logs_contain("profiles MUST start with `profile `"));
    }

    #[test]
    fn identifiers() {
        assert_eq!(validate_identifier("dev-account_1"), Some("dev-account_1"));
        assert_eq!(validate_identifier("user@example.com"), Some("user@example.com"));
        assert_eq!(validate_identifier("has space"), None);
        assert_eq!(validate_identifier(""), None);
    }
}
