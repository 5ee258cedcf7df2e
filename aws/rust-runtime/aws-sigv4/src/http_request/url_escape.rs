/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

/// Everything except the unreserved characters `A-Z a-z 0-9 - _ . ~`.
const BASE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub(super) fn percent_encode(value: &str) -> String {
    percent_encoding::utf8_percent_encode(value, BASE_SET).to_string()
}

/// Encodes each path segment, keeping the `/` separators.
pub(super) fn percent_encode_path(path: &str) -> String {
    path.split('/')
        .map(percent_encode)
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod test {
    use super::{percent_encode, percent_encode_path};

    #[test]
    fn unreserved_characters_pass_through() {
        assert_eq!(percent_encode("a-b_c.d~e"), "a-b_c.d~e");
        assert_eq!(percent_encode("a b/c=d"), "a%20b%2Fc%3Dd");
        assert_eq!(percent_encode("bår"), "b%C3%A5r");
    }

    #[test]
    fn paths_keep_separators() {
        assert_eq!(percent_encode_path("/foo%20bar/baz"), "/foo%2520bar/baz");
        assert_eq!(percent_encode_path("/"), "/");
    }
}
