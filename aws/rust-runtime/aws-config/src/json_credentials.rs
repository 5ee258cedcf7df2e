/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Credential documents served by the container endpoint and instance metadata.

use serde_json::{Map, Value};
use smithy_types::instant::Format;
use smithy_types::Instant;
use std::time::SystemTime;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum InvalidJsonCredentials {
    #[error("invalid JSON in credentials response: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("credentials response was not a JSON object")]
    NotAnObject,
    #[error("expected a string for `{field}`")]
    InvalidField { field: &'static str },
    #[error("missing field `{0}` in credentials response")]
    MissingField(&'static str),
    #[error("invalid `Expiration` timestamp: {0}")]
    InvalidExpiration(String),
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct RefreshableCredentials {
    pub(crate) access_key_id: String,
    pub(crate) secret_access_key: String,
    pub(crate) session_token: Option<String>,
    pub(crate) expiration: Option<SystemTime>,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum JsonCredentials {
    RefreshableCredentials(RefreshableCredentials),
    Error { code: String, message: String },
}

/// Field lookup that ignores the case of the key.
fn field<'a>(object: &'a Map<String, Value>, name: &'static str) -> Option<&'a Value> {
    object
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

fn string_field(
    object: &Map<String, Value>,
    name: &'static str,
) -> Result<Option<String>, InvalidJsonCredentials> {
    match field(object, name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(InvalidJsonCredentials::InvalidField { field: name }),
    }
}

/// Parses a credentials document.
///
/// Keys are matched case-insensitively, `Token` and `SessionToken` are synonyms, and the
/// document may be wrapped in a `credentials` object. A `Code` other than `Success` turns the
/// document into an error.
pub(crate) fn parse_json_credentials(
    body: &str,
) -> Result<JsonCredentials, InvalidJsonCredentials> {
    let document: Value = serde_json::from_str(body)?;
    let mut object = document
        .as_object()
        .ok_or(InvalidJsonCredentials::NotAnObject)?;
    if let Some(Value::Object(inner)) = field(object, "Credentials") {
        object = inner;
    }

    if let Some(code) = string_field(object, "Code")? {
        if code != "Success" {
            let message = string_field(object, "Message")?.unwrap_or_default();
            return Ok(JsonCredentials::Error { code, message });
        }
    }

    let access_key_id = string_field(object, "AccessKeyId")?
        .ok_or(InvalidJsonCredentials::MissingField("AccessKeyId"))?;
    let secret_access_key = string_field(object, "SecretAccessKey")?
        .ok_or(InvalidJsonCredentials::MissingField("SecretAccessKey"))?;
    let session_token = match string_field(object, "Token")? {
        Some(token) => Some(token),
        None => string_field(object, "SessionToken")?,
    };
    let expiration = string_field(object, "Expiration")?
        .map(|expiration| {
            Instant::from_str(&expiration, Format::DateTime)
                .map(|instant| instant.to_system_time())
                .map_err(|_| InvalidJsonCredentials::InvalidExpiration(expiration))
        })
        .transpose()?;
    Ok(JsonCredentials::RefreshableCredentials(
        RefreshableCredentials {
            access_key_id,
            secret_access_key,
            session_token,
            expiration,
        },
    ))
}
