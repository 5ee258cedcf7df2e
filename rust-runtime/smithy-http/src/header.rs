/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Utilities for reading and writing header-located members.

use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid header `{name}`")]
pub struct InvalidHeader {
    name: String,
}

impl InvalidHeader {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Inserts `name: value`, replacing any previous value.
pub fn set_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), InvalidHeader> {
    let invalid = || InvalidHeader {
        name: name.to_string(),
    };
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
    let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
    headers.insert(header_name, header_value);
    Ok(())
}

/// Reads a single header as a string. Non-visible-ASCII values are treated as absent.
pub fn read_one<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Collects every header starting with `prefix` (case-insensitively), keyed by the remainder
/// of the header name.
pub fn headers_with_prefix(headers: &HeaderMap, prefix: &str) -> BTreeMap<String, String> {
    let prefix = prefix.to_ascii_lowercase();
    headers
        .iter()
        .filter_map(|(name, value)| {
            let rest = name.as_str().strip_prefix(prefix.as_str())?;
            if rest.is_empty() {
                return None;
            }
            Some((rest.to_string(), value.to_str().ok()?.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn prefix_headers_are_stripped() {
        let mut headers = HeaderMap::new();
        set_header(&mut headers, "X-Amz-Meta-Color", "red").unwrap();
        set_header(&mut headers, "x-amz-meta-size", "10").unwrap();
        set_header(&mut headers, "x-amz-meta-", "ignored").unwrap();
        set_header(&mut headers, "content-type", "text/plain").unwrap();
        let meta = headers_with_prefix(&headers, "X-Amz-Meta-");
        assert_eq!(meta.len(), 2);
        assert_eq!(meta.get("color").map(String::as_str), Some("red"));
        assert_eq!(meta.get("size").map(String::as_str), Some("10"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut headers = HeaderMap::new();
        let err = set_header(&mut headers, "x-foo", "line\nbreak").expect_err("newline");
        assert_eq!(err.name(), "x-foo");
        assert!(set_header(&mut headers, "bad header", "v").is_err());
        assert_eq!(read_one(&headers, "x-foo"), None);
    }
}
