/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Shape-directed conversion between [`Value`] trees and XML.

use super::{decode_base64, scalar_from_str, scalar_to_string, BuildError, ParseError};
use crate::shape::{ApiMetadata, Location, Shape, ShapeKind};
use smithy_types::Value;
use smithy_xml::decode::XmlElement;
use smithy_xml::encode::{ElWriter, ScopeWriter, XmlWriter};
use std::collections::BTreeMap;

const DEFAULT_LIST_MEMBER: &str = "member";

/// Writes `value` as a document rooted at `root_name`. Returns an empty string when the
/// structure has no body members to write.
pub(crate) fn to_xml(
    api: &ApiMetadata,
    shape: &Shape,
    root_name: &str,
    value: &Value,
) -> Result<String, BuildError> {
    if !has_body_members(shape, value) {
        return Ok(String::new());
    }
    let mut out = String::new();
    let mut writer = XmlWriter::new(&mut out);
    let mut root = writer.start_el(root_name);
    if let Some(ns) = shape.xml_namespace().or(api.xml_namespace.as_deref()) {
        root = root.write_ns(ns, None);
    }
    write_structure(root, api, shape, value, root_name)?;
    Ok(out)
}

fn has_body_members(shape: &Shape, value: &Value) -> bool {
    match shape.kind() {
        ShapeKind::Structure { .. } => shape.members().iter().any(|(name, member)| {
            member.location() == Location::Body
                && value.get(name).map(|v| !v.is_null()).unwrap_or(false)
        }),
        _ => !value.is_null(),
    }
}

fn write_structure(
    el: ElWriter<'_>,
    api: &ApiMetadata,
    shape: &Shape,
    value: &Value,
    path: &str,
) -> Result<(), BuildError> {
    let entries = value
        .as_map()
        .ok_or_else(|| BuildError::invalid(path, "expected a structure"))?;
    let present = |name: &str| entries.get(name).filter(|v| !v.is_null());
    let mut el = el;
    for (name, member) in shape.members() {
        if member.location() != Location::Body || !member.is_xml_attribute() {
            continue;
        }
        if let Some(v) = present(name) {
            let text = scalar_to_string(api, member, v, name)?;
            el = el.write_attribute(member.wire_name(name), &text);
        }
    }
    let mut scope = el.finish();
    for (name, member) in shape.members() {
        if member.location() != Location::Body || member.is_xml_attribute() {
            continue;
        }
        if let Some(v) = present(name) {
            write_member(&mut scope, api, member, name, v)?;
        }
    }
    scope.finish();
    Ok(())
}

fn write_member(
    scope: &mut ScopeWriter<'_>,
    api: &ApiMetadata,
    shape: &Shape,
    member_name: &str,
    value: &Value,
) -> Result<(), BuildError> {
    let wire = shape.wire_name(member_name);
    match (shape.kind(), shape.is_flattened()) {
        (ShapeKind::List { member }, true) => {
            let items = value
                .as_list()
                .ok_or_else(|| BuildError::invalid(member_name, "expected a list"))?;
            let tag = member.location_name().unwrap_or(wire);
            for item in items {
                write_value(scope.start_el(tag), api, member, item, member_name)?;
            }
            Ok(())
        }
        (ShapeKind::Map { key, value: value_shape }, true) => {
            let entries = value
                .as_map()
                .ok_or_else(|| BuildError::invalid(member_name, "expected a map"))?;
            for (k, v) in entries {
                let mut entry = scope.start_el(wire).finish();
                write_entry(&mut entry, api, key, value_shape, k, v, member_name)?;
                entry.finish();
            }
            Ok(())
        }
        _ => write_value(scope.start_el(wire), api, shape, value, member_name),
    }
}

fn write_entry(
    entry: &mut ScopeWriter<'_>,
    api: &ApiMetadata,
    key_shape: &Shape,
    value_shape: &Shape,
    key: &str,
    value: &Value,
    path: &str,
) -> Result<(), BuildError> {
    entry
        .start_el(key_shape.location_name().unwrap_or("key"))
        .finish()
        .data(key);
    write_value(
        entry.start_el(value_shape.location_name().unwrap_or("value")),
        api,
        value_shape,
        value,
        path,
    )
}

fn write_value(
    el: ElWriter<'_>,
    api: &ApiMetadata,
    shape: &Shape,
    value: &Value,
    path: &str,
) -> Result<(), BuildError> {
    let el = match shape.xml_namespace() {
        Some(ns) => el.write_ns(ns, None),
        None => el,
    };
    match shape.kind() {
        ShapeKind::Structure { .. } => write_structure(el, api, shape, value, path),
        ShapeKind::List { member } => {
            let items = value
                .as_list()
                .ok_or_else(|| BuildError::invalid(path, "expected a list"))?;
            let mut list = el.finish();
            let tag = member.location_name().unwrap_or(DEFAULT_LIST_MEMBER);
            for item in items {
                write_value(list.start_el(tag), api, member, item, path)?;
            }
            list.finish();
            Ok(())
        }
        ShapeKind::Map { key, value: value_shape } => {
            let entries = value
                .as_map()
                .ok_or_else(|| BuildError::invalid(path, "expected a map"))?;
            let mut map = el.finish();
            for (k, v) in entries {
                let mut entry = map.start_el("entry").finish();
                write_entry(&mut entry, api, key, value_shape, k, v, path)?;
                entry.finish();
            }
            map.finish();
            Ok(())
        }
        _ => {
            let text = scalar_to_string(api, shape, value, path)?;
            el.finish().data(&text);
            Ok(())
        }
    }
}

/// Reads `element` as `shape`.
pub(crate) fn from_xml(
    api: &ApiMetadata,
    shape: &Shape,
    element: &XmlElement,
    path: &str,
) -> Result<Value, ParseError> {
    match shape.kind() {
        ShapeKind::Structure { .. } => parse_structure(api, shape, element),
        ShapeKind::List { member } => {
            let tag = member.location_name().unwrap_or(DEFAULT_LIST_MEMBER);
            element
                .children_named(tag)
                .map(|item| from_xml(api, member, item, path))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List)
        }
        ShapeKind::Map { key, value } => {
            parse_entries(api, key, value, element.children_named("entry"), path)
        }
        ShapeKind::String if element.attr("encoding") == Some("base64") => {
            let bytes = decode_base64(element.text(), path)?;
            String::from_utf8(bytes)
                .map(Value::String)
                .map_err(|_| ParseError::invalid(path, "base64 value is not UTF-8"))
        }
        _ => scalar_from_str(api, shape, element.text(), path),
    }
}

fn parse_structure(
    api: &ApiMetadata,
    shape: &Shape,
    element: &XmlElement,
) -> Result<Value, ParseError> {
    let mut out = BTreeMap::new();
    for (name, member) in shape.members() {
        if member.location() != Location::Body {
            continue;
        }
        let wire = member.wire_name(name);
        if member.is_xml_attribute() {
            if let Some(attr) = element.attr(wire) {
                out.insert(name.clone(), scalar_from_str(api, member, attr, name)?);
            }
            continue;
        }
        let parsed = match (member.kind(), member.is_flattened()) {
            (ShapeKind::List { member: item }, true) => {
                let tag = item.location_name().unwrap_or(wire);
                let items = element
                    .children_named(tag)
                    .map(|el| from_xml(api, item, el, name))
                    .collect::<Result<Vec<_>, _>>()?;
                if items.is_empty() {
                    default_list(api)
                } else {
                    Some(Value::List(items))
                }
            }
            (ShapeKind::List { .. }, false) => match element.child(wire) {
                Some(list) => Some(from_xml(api, member, list, name)?),
                None => default_list(api),
            },
            (ShapeKind::Map { key, value }, true) => {
                let mut entries = element.children_named(wire).peekable();
                match entries.peek() {
                    Some(_) => Some(parse_entries(api, key, value, entries, name)?),
                    None => None,
                }
            }
            _ => match element.child(wire) {
                Some(child) => Some(from_xml(api, member, child, name)?),
                None => None,
            },
        };
        if let Some(value) = parsed {
            out.insert(name.clone(), value);
        }
    }
    Ok(Value::Map(out))
}

fn default_list(api: &ApiMetadata) -> Option<Value> {
    if api.xml_no_default_lists {
        None
    } else {
        Some(Value::List(Vec::new()))
    }
}

fn parse_entries<'a>(
    api: &ApiMetadata,
    key_shape: &Shape,
    value_shape: &Shape,
    entries: impl Iterator<Item = &'a XmlElement>,
    path: &str,
) -> Result<Value, ParseError> {
    let key_tag = key_shape.location_name().unwrap_or("key");
    let value_tag = value_shape.location_name().unwrap_or("value");
    let mut out = BTreeMap::new();
    for entry in entries {
        let key = entry
            .child_text(key_tag)
            .ok_or_else(|| ParseError::invalid(path, "map entry without a key"))?;
        let value = match entry.child(value_tag) {
            Some(value) => from_xml(api, value_shape, value, path)?,
            None => Value::Null,
        };
        out.insert(key.to_string(), value);
    }
    Ok(Value::Map(out))
}
