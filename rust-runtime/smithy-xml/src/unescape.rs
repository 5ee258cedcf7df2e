/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::decode::XmlError;
use std::borrow::Cow;

/// Resolves the predefined entities (`&lt;` `&gt;` `&amp;` `&quot;` `&apos;`) and numeric
/// character references (`&#123;`, `&#x7B;`).
pub(crate) fn unescape(s: &str) -> Result<Cow<'_, str>, XmlError> {
    if !s.contains('&') {
        return Ok(Cow::Borrowed(s));
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| XmlError::invalid_escape("unterminated entity"))?;
        let entity = &after[..semi];
        match entity {
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "amp" => out.push('&'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            other => out.push(char_reference(other)?),
        }
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(Cow::Owned(out))
}

fn char_reference(entity: &str) -> Result<char, XmlError> {
    let (digits, radix) = if let Some(hex) = entity.strip_prefix("#x") {
        (hex, 16)
    } else if let Some(dec) = entity.strip_prefix('#') {
        (dec, 10)
    } else {
        return Err(XmlError::invalid_escape(format!("unknown entity `{}`", entity)));
    };
    let code = u32::from_str_radix(digits, radix)
        .map_err(|_| XmlError::invalid_escape(format!("bad character reference `{}`", entity)))?;
    std::char::from_u32(code)
        .ok_or_else(|| XmlError::invalid_escape(format!("invalid char code {}", code)))
}
