/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! HTTP bindings shared by the REST protocols: URI labels, query strings and headers.

use super::{scalar_from_str, scalar_to_string, BuildError, ParseError};
use crate::header::{headers_with_prefix, read_one, set_header};
use crate::label::{fmt_string, substitute, unfilled_label};
use crate::shape::{ApiMetadata, Location, Operation, Shape, ShapeKind};
use bytes::Bytes;
use http::HeaderMap;
use smithy_types::Value;
use std::collections::BTreeMap;

/// The non-body parts of a REST request.
#[derive(Debug)]
pub(crate) struct HttpBindings {
    pub(crate) uri: String,
    pub(crate) headers: HeaderMap,
}

/// Moves URI, query string and header members of `params` into the request line and headers.
pub(crate) fn serialize_bindings(
    api: &ApiMetadata,
    operation: &Operation,
    params: &Value,
) -> Result<HttpBindings, BuildError> {
    let (mut path, template_query) = match operation.request_uri.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query)),
        None => (operation.request_uri.clone(), None),
    };
    let mut query: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut headers = HeaderMap::new();

    for (name, member) in operation.input.members() {
        let value = match params.get(name) {
            Some(value) if !value.is_null() => value,
            _ => continue,
        };
        let wire = member.wire_name(name);
        match member.location() {
            Location::Uri => {
                let text = scalar_to_string(api, member, value, name)?;
                if let Some(filled) = substitute(&path, wire, &text) {
                    path = filled;
                }
            }
            Location::QueryString => write_query(api, member, name, wire, value, &mut query)?,
            Location::Header => {
                let text = match (member.kind(), value) {
                    (ShapeKind::List { member: item }, Value::List(items)) => items
                        .iter()
                        .map(|v| scalar_to_string(api, item, v, name))
                        .collect::<Result<Vec<_>, _>>()?
                        .join(","),
                    _ => scalar_to_string(api, member, value, name)?,
                };
                set_header(&mut headers, wire, &text)?;
            }
            Location::Headers => {
                let entries = value
                    .as_map()
                    .ok_or_else(|| BuildError::invalid(name, "expected a map"))?;
                let value_shape = match member.kind() {
                    ShapeKind::Map { value, .. } => &**value,
                    _ => member,
                };
                for (key, v) in entries {
                    let text = scalar_to_string(api, value_shape, v, name)?;
                    set_header(&mut headers, &format!("{}{}", wire, key), &text)?;
                }
            }
            Location::Body | Location::StatusCode => {}
        }
    }

    if let Some(label) = unfilled_label(&path) {
        return Err(BuildError::MissingLabel(label.to_string()));
    }

    let mut pairs: Vec<String> = template_query
        .filter(|q| !q.is_empty())
        .map(|q| vec![q.to_string()])
        .unwrap_or_default();
    for (key, values) in &query {
        for value in values {
            pairs.push(format!("{}={}", fmt_string(key), fmt_string(value)));
        }
    }
    let uri = if pairs.is_empty() {
        path
    } else {
        format!("{}?{}", path, pairs.join("&"))
    };
    Ok(HttpBindings { uri, headers })
}

fn write_query(
    api: &ApiMetadata,
    shape: &Shape,
    name: &str,
    wire: &str,
    value: &Value,
    query: &mut BTreeMap<String, Vec<String>>,
) -> Result<(), BuildError> {
    match (shape.kind(), value) {
        (ShapeKind::List { member }, Value::List(items)) => {
            let rendered = items
                .iter()
                .map(|item| scalar_to_string(api, member, item, name))
                .collect::<Result<Vec<_>, _>>()?;
            query.entry(wire.to_string()).or_default().extend(rendered);
        }
        (ShapeKind::Map { value: value_shape, .. }, Value::Map(entries)) => {
            for (key, v) in entries {
                write_query(api, value_shape, name, key, v, query)?;
            }
        }
        _ => {
            let rendered = scalar_to_string(api, shape, value, name)?;
            query.entry(wire.to_string()).or_default().push(rendered);
        }
    }
    Ok(())
}

/// Reads header and status code members of the output shape. Header maps are always present.
pub(crate) fn parse_bindings(
    api: &ApiMetadata,
    operation: &Operation,
    response: &http::Response<Bytes>,
) -> Result<BTreeMap<String, Value>, ParseError> {
    let mut out = BTreeMap::new();
    for (name, member) in operation.output.members() {
        let wire = member.wire_name(name);
        match member.location() {
            Location::Header => {
                let text = match read_one(response.headers(), wire) {
                    Some(text) => text,
                    None => continue,
                };
                let value = match member.kind() {
                    ShapeKind::List { member: item } => Value::List(
                        text.split(',')
                            .map(|part| scalar_from_str(api, item, part.trim(), name))
                            .collect::<Result<_, _>>()?,
                    ),
                    _ => scalar_from_str(api, member, text, name)?,
                };
                out.insert(name.clone(), value);
            }
            Location::Headers => {
                let value_shape = match member.kind() {
                    ShapeKind::Map { value, .. } => &**value,
                    _ => member,
                };
                let entries = headers_with_prefix(response.headers(), wire)
                    .into_iter()
                    .map(|(key, text)| Ok((key, scalar_from_str(api, value_shape, &text, name)?)))
                    .collect::<Result<BTreeMap<_, _>, ParseError>>()?;
                out.insert(name.clone(), Value::Map(entries));
            }
            Location::StatusCode => {
                out.insert(
                    name.clone(),
                    Value::Integer(i64::from(response.status().as_u16())),
                );
            }
            _ => {}
        }
    }
    Ok(out)
}

/// Assembles the final request from its bindings and body.
pub(crate) fn assemble(
    operation: &Operation,
    bindings: HttpBindings,
    body: Bytes,
) -> Result<http::Request<Bytes>, BuildError> {
    let mut request = http::Request::builder()
        .method(operation.http_method.clone())
        .uri(bindings.uri)
        .body(body)?;
    request.headers_mut().extend(bindings.headers);
    Ok(request)
}

#[cfg(test)]
mod test {
    use super::{parse_bindings, serialize_bindings};
    use crate::protocol::BuildError;
    use crate::shape::{ApiMetadata, Location, Operation, ProtocolName, Shape};
    use bytes::Bytes;
    use http::Method;
    use pretty_assertions::assert_eq;
    use smithy_types::{Instant, Value};
    use std::iter::FromIterator;

    fn api() -> ApiMetadata {
        ApiMetadata::new(ProtocolName::RestXml, "2006-03-01", "s3")
    }

    fn get_object() -> Operation {
        Operation::new("GetObject")
            .http(Method::GET, "/{Bucket}/{Key+}?versioning")
            .input(
                Shape::structure()
                    .member("Bucket", Shape::string().with_location(Location::Uri))
                    .member("Key", Shape::string().with_location(Location::Uri))
                    .member(
                        "Ids",
                        Shape::list(Shape::string())
                            .with_location(Location::QueryString)
                            .with_location_name("id"),
                    )
                    .member(
                        "Extra",
                        Shape::map(Shape::string(), Shape::string())
                            .with_location(Location::QueryString),
                    )
                    .member(
                        "Since",
                        Shape::timestamp()
                            .with_location(Location::Header)
                            .with_location_name("If-Modified-Since"),
                    )
                    .member(
                        "Metadata",
                        Shape::map(Shape::string(), Shape::string())
                            .with_location(Location::Headers)
                            .with_location_name("x-amz-meta-"),
                    ),
            )
    }

    #[test]
    fn labels_query_and_headers() {
        let params = Value::from_iter(vec![
            ("Bucket", Value::from("my bucket")),
            ("Key", Value::from("photos/a b.jpg")),
            ("Ids", Value::List(vec![Value::from("2"), Value::from("1")])),
            ("Extra", Value::from_iter(vec![("z", "last"), ("a", "first")])),
            ("Since", Value::Timestamp(Instant::from_epoch_seconds(1576540098))),
            ("Metadata", Value::from_iter(vec![("color", "red")])),
        ]);
        let bindings = serialize_bindings(&api(), &get_object(), &params).unwrap();
        assert_eq!(
            bindings.uri,
            "/my%20bucket/photos/a%20b.jpg?versioning&a=first&id=2&id=1&z=last"
        );
        assert_eq!(
            bindings.headers["if-modified-since"],
            "Mon, 16 Dec 2019 23:48:18 GMT"
        );
        assert_eq!(bindings.headers["x-amz-meta-color"], "red");
    }

    #[test]
    fn empty_label_leaves_trailing_slash() {
        let params = Value::from_iter(vec![("Bucket", "b"), ("Key", "")]);
        let bindings = serialize_bindings(&api(), &get_object(), &params).unwrap();
        assert_eq!(bindings.uri, "/b/?versioning");
    }

    #[test]
    fn missing_label_is_an_error() {
        let params = Value::from_iter(vec![("Key", "k")]);
        match serialize_bindings(&api(), &get_object(), &params) {
            Err(BuildError::MissingLabel(label)) => assert_eq!(label, "Bucket"),
            other => panic!("expected a missing label, got {:?}", other),
        }
    }

    #[test]
    fn output_headers_and_status() {
        let operation = Operation::new("HeadObject").output(
            Shape::structure()
                .member(
                    "Length",
                    Shape::integer()
                        .with_location(Location::Header)
                        .with_location_name("Content-Length"),
                )
                .member(
                    "Metadata",
                    Shape::map(Shape::string(), Shape::string())
                        .with_location(Location::Headers)
                        .with_location_name("x-amz-meta-"),
                )
                .member("Status", Shape::integer().with_location(Location::StatusCode))
                .member(
                    "Missing",
                    Shape::string()
                        .with_location(Location::Header)
                        .with_location_name("x-missing"),
                ),
        );
        let response = http::Response::builder()
            .status(206)
            .header("content-length", "12")
            .body(Bytes::new())
            .unwrap();
        let parsed = parse_bindings(&api(), &operation, &response).unwrap();
        assert_eq!(parsed.get("Length"), Some(&Value::Integer(12)));
        assert_eq!(parsed.get("Metadata"), Some(&Value::map()));
        assert_eq!(parsed.get("Status"), Some(&Value::Integer(206)));
        assert_eq!(parsed.get("Missing"), None);
    }
}
