/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Formatting values into URI labels and query strings.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything except RFC-3986 unreserved characters is encoded.
pub(crate) const URI_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Encodes a single URI label or query component.
pub fn fmt_string<T: AsRef<str>>(t: T) -> String {
    utf8_percent_encode(t.as_ref(), URI_ESCAPE).to_string()
}

/// Encodes a greedy (`{Key+}`) label: each path segment is encoded, `/` is kept.
pub fn fmt_greedy<T: AsRef<str>>(t: T) -> String {
    t.as_ref()
        .split('/')
        .map(fmt_string)
        .collect::<Vec<_>>()
        .join("/")
}

/// Substitutes `{Name}` or `{Name+}` in `template` with `value`. Returns `None` when the
/// template has no such placeholder.
pub fn substitute(template: &str, name: &str, value: &str) -> Option<String> {
    let plain = format!("{{{}}}", name);
    let greedy = format!("{{{}+}}", name);
    if template.contains(&greedy) {
        Some(template.replacen(&greedy, &fmt_greedy(value), 1))
    } else if template.contains(&plain) {
        Some(template.replacen(&plain, &fmt_string(value), 1))
    } else {
        None
    }
}

/// Returns the first placeholder left in `template`.
pub fn unfilled_label(template: &str) -> Option<&str> {
    let start = template.find('{')?;
    let end = template[start..].find('}')? + start;
    Some(template[start + 1..end].trim_end_matches('+'))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encodes_reserved_characters() {
        assert_eq!(fmt_string("a b/c?d=e&f"), "a%20b%2Fc%3Fd%3De%26f");
        assert_eq!(fmt_string("unreserved-_.~"), "unreserved-_.~");
        assert_eq!(fmt_string("bår"), "b%C3%A5r");
        assert_eq!(fmt_string("!'()*"), "%21%27%28%29%2A");
    }

    #[test]
    fn greedy_labels_keep_slashes() {
        assert_eq!(fmt_greedy("photos/2021/a b.jpg"), "photos/2021/a%20b.jpg");
    }

    #[test]
    fn substitution() {
        let uri = "/{Bucket}/{Key+}?tagging";
        let uri = substitute(uri, "Bucket", "my bucket").unwrap();
        assert_eq!(unfilled_label(&uri), Some("Key"));
        let uri = substitute(&uri, "Key", "a/b").unwrap();
        assert_eq!(uri, "/my%20bucket/a/b?tagging");
        assert_eq!(unfilled_label(&uri), None);
        assert_eq!(substitute("/{Other}", "Bucket", "x"), None);
    }

    #[test]
    fn empty_substitution_leaves_trailing_slash() {
        assert_eq!(
            substitute("/{Bucket}/{Key}", "Key", "").as_deref(),
            Some("/{Bucket}/")
        );
    }
}
