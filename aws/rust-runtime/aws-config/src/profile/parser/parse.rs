/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Profile file parsing
//!
//! Parses a profile file into a raw, un-normalized representation: a map from section name to
//! the properties defined in that section. Sections look like `[name]`, properties like
//! `key = value`. Lines starting with `#` or `;` are comments, as is anything after a `#` or `;`
//! that follows whitespace on a property line. An indented line continues the previous
//! property; when that property's value was empty the continuation lines are sub-properties.

use crate::profile::parser::source::File;
use std::borrow::Cow;
use std::collections::HashMap;
use thiserror::Error;

/// Section name to the properties of that section.
pub(crate) type RawProfileSet<'a> = HashMap<&'a str, HashMap<&'a str, Cow<'a, str>>>;

/// Position of a parse error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    line_number: usize,
    path: String,
}

/// An error encountered while parsing a profile file
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("error parsing {} on line {}:\n  {}", .location.path, .location.line_number, .message)]
pub struct ProfileParseError {
    location: Location,
    message: String,
}

impl ProfileParseError {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn line_number(&self) -> usize {
        self.location.line_number
    }
}

enum State<'a> {
    Starting,
    ReadingProfile {
        profile: &'a str,
        property: Option<&'a str>,
        is_subproperty: bool,
    },
}

struct Parser<'a> {
    data: RawProfileSet<'a>,
    state: State<'a>,
    location: Location,
}

/// Parses `file` into sections and their properties.
pub(crate) fn parse_profile_file(file: &File) -> Result<RawProfileSet<'_>, ProfileParseError> {
    let mut parser = Parser {
        data: HashMap::new(),
        state: State::Starting,
        location: Location {
            line_number: 0,
            path: file.path.to_string(),
        },
    };
    parser.parse_profile(&file.contents)?;
    Ok(parser.data)
}

impl<'a> Parser<'a> {
    fn parse_profile(&mut self, file: &'a str) -> Result<(), ProfileParseError> {
        for (line_number, line) in file.lines().enumerate() {
            self.location.line_number = line_number + 1;
            if is_empty_line(line) || is_comment_line(line) {
                continue;
            }
            if line.starts_with(char::is_whitespace) {
                self.read_property_continuation(line)?;
            } else if line.starts_with('[') {
                self.read_profile_line(line)?;
            } else {
                self.read_property_line(line)?;
            }
        }
        Ok(())
    }

    fn make_error(&self, message: &str) -> ProfileParseError {
        ProfileParseError {
            location: self.location.clone(),
            message: message.into(),
        }
    }

    fn read_profile_line(&mut self, line: &'a str) -> Result<(), ProfileParseError> {
        let line = prepare_line(line, false);
        let profile_name = line
            .strip_prefix('[')
            .and_then(|line| line.strip_suffix(']'))
            .ok_or_else(|| self.make_error("Profile definition must end with ']'"))?
            .trim();
        self.data.entry(profile_name).or_default();
        self.state = State::ReadingProfile {
            profile: profile_name,
            property: None,
            is_subproperty: false,
        };
        Ok(())
    }

    fn read_property_line(&mut self, line: &'a str) -> Result<(), ProfileParseError> {
        let profile = match &self.state {
            State::Starting => return Err(self.make_error("Expected a profile definition")),
            State::ReadingProfile { profile, .. } => *profile,
        };
        let (key, value) =
            parse_property_line(line).map_err(|err| self.make_error(err.message()))?;
        self.data
            .entry(profile)
            .or_default()
            .insert(key, Cow::Borrowed(value));
        self.state = State::ReadingProfile {
            profile,
            property: Some(key),
            is_subproperty: value.is_empty(),
        };
        Ok(())
    }

    fn read_property_continuation(&mut self, line: &'a str) -> Result<(), ProfileParseError> {
        let (profile, property, is_subproperty) = match &self.state {
            State::ReadingProfile {
                profile,
                property: Some(property),
                is_subproperty,
            } => (*profile, *property, *is_subproperty),
            _ => return Err(self.make_error("Expected a profile or property definition")),
        };
        let line = prepare_line(line, true);
        if is_subproperty {
            parse_property_line(line).map_err(|err| {
                self.make_error(&format!("{} in sub-property", err.message()))
            })?;
        }
        let value = self
            .data
            .entry(profile)
            .or_default()
            .entry(property)
            .or_default();
        if value.is_empty() {
            *value = Cow::Borrowed(line);
        } else {
            let value = value.to_mut();
            value.push('\n');
            value.push_str(line);
        }
        Ok(())
    }
}

#[derive(Debug, Eq, PartialEq)]
enum PropertyError {
    NoEquals,
    NoName,
}

impl PropertyError {
    fn message(&self) -> &'static str {
        match self {
            PropertyError::NoEquals => "Expected an '=' sign defining a property",
            PropertyError::NoName => "Property did not have a name",
        }
    }
}

/// Splits `key = value`, stripping comments from the value.
fn parse_property_line(line: &str) -> Result<(&str, &str), PropertyError> {
    let line = prepare_line(line, true);
    let (key, value) = line.split_once('=').ok_or(PropertyError::NoEquals)?;
    let key = key.trim_matches(char::is_whitespace);
    if key.is_empty() {
        return Err(PropertyError::NoName);
    }
    Ok((key, value.trim_matches(char::is_whitespace)))
}

fn is_empty_line(line: &str) -> bool {
    line.trim().is_empty()
}

fn is_comment_line(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with('#') || line.starts_with(';')
}

/// Removes a trailing comment and surrounding whitespace.
///
/// On property lines a comment must be preceded by whitespace, so `secret=abc#def` keeps its
/// `#`. On section lines any `#` or `;` starts a comment.
fn prepare_line(line: &str, comments_need_whitespace: bool) -> &str {
    let line = line.trim_matches(|c| c == '\r' || c == '\n');
    let mut prev_char_whitespace = false;
    let mut comment_idx = None;
    for (idx, chr) in line.char_indices() {
        if (chr == '#' || chr == ';') && (!comments_need_whitespace || prev_char_whitespace) {
            comment_idx = Some(idx);
            break;
        }
        prev_char_whitespace = chr.is_whitespace();
    }
    comment_idx
        .map(|idx| &line[..idx])
        .unwrap_or(line)
        .trim_matches(char::is_whitespace)
}

#[cfg(test)]
mod test {
    use super::{parse_profile_file, prepare_line, RawProfileSet};
    use crate::profile::parser::source::{File, FileKind};
    use std::collections::HashMap;

    fn file(contents: &str) -> File {
        File {
            kind: FileKind::Credentials,
            path: "~/.aws/credentials".to_string(),
            contents: contents.to_string(),
        }
    }

    fn owned(raw: RawProfileSet<'_>) -> HashMap<String, HashMap<String, String>> {
        raw.into_iter()
            .map(|(name, props)| {
                (
                    name.to_string(),
                    props
                        .into_iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                )
            })
            .collect()
    }

    #[test]
    fn sections_properties_and_comments() {
        let file = file(
            "# leading comment\n\
             [default] ; trailing comment\n\
             aws_access_key_id = AKID\n\
             aws_secret_access_key = secret#with-hash ; comment\n\
             \n\
             [profile other]\n\
             region=us-west-2\n",
        );
        let parsed = owned(parse_profile_file(&file).expect("valid profile"));
        assert_eq!(parsed["default"]["aws_access_key_id"], "AKID");
        assert_eq!(
            parsed["default"]["aws_secret_access_key"],
            "secret#with-hash"
        );
        assert_eq!(parsed["profile other"]["region"], "us-west-2");
    }

    #[test]
    fn continuation_and_sub_properties() {
        let file = file(
            "[default]\n\
             description = first\n\
             \x20 second\n\
             s3 =\n\
             \x20 max_concurrent_requests = 20\n\
             \x20 addressing_style = path\n",
        );
        let parsed = owned(parse_profile_file(&file).expect("valid profile"));
        assert_eq!(parsed["default"]["description"], "first\nsecond");
        assert_eq!(
            parsed["default"]["s3"],
            "max_concurrent_requests = 20\naddressing_style = path"
        );
    }

    #[test]
    fn errors() {
        let err = parse_profile_file(&file("key = value")).expect_err("no profile");
        assert_eq!(err.message(), "Expected a profile definition");
        assert_eq!(err.line_number(), 1);

        let err = parse_profile_file(&file("[default")).expect_err("unterminated");
        assert_eq!(err.message(), "Profile definition must end with ']'");

        let err = parse_profile_file(&file("[default]\nno equals")).expect_err("no equals");
        assert_eq!(err.message(), "Expected an '=' sign defining a property");
        assert_eq!(err.line_number(), 2);

        let err = parse_profile_file(&file("[default]\n= value")).expect_err("no name");
        assert_eq!(err.message(), "Property did not have a name");

        let err = parse_profile_file(&file("[default]\n  continued")).expect_err("no property");
        assert_eq!(err.message(), "Expected a profile or property definition");

        let err =
            parse_profile_file(&file("[default]\ns3 =\n  not a property")).expect_err("bad sub");
        assert_eq!(
            err.message(),
            "Expected an '=' sign defining a property in sub-property"
        );
    }

    #[test]
    fn comment_rules() {
        assert_eq!(prepare_line("a = b # c", true), "a = b");
        assert_eq!(prepare_line("a = b#c", true), "a = b#c");
        assert_eq!(prepare_line("[foo]#c", false), "[foo]");
    }
}
