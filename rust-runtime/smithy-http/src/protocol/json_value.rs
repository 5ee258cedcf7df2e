/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Shape-directed conversion between [`Value`] trees and JSON documents.

use super::{decode_base64, kind_name, parse_timestamp, BuildError, ParseError};
use crate::shape::{ApiMetadata, Location, Shape, ShapeKind};
use serde_json::{Map, Number, Value as Json};
use smithy_types::instant::Format;
use smithy_types::{Blob, Instant, Value};
use std::collections::BTreeMap;

/// Serializes `value` as `shape`. Structure members bound to HTTP locations are skipped.
pub(crate) fn serialize(
    api: &ApiMetadata,
    shape: &Shape,
    value: &Value,
    path: &str,
) -> Result<Json, BuildError> {
    let mismatch = || {
        BuildError::invalid(
            path,
            format!("cannot write {:?} as {}", value, kind_name(shape.kind())),
        )
    };
    let json = match (shape.kind(), value) {
        (ShapeKind::Structure { .. }, Value::Map(entries)) => {
            let mut out = Map::new();
            for (name, member) in shape.members() {
                if member.location() != Location::Body {
                    continue;
                }
                match entries.get(name) {
                    Some(v) if !v.is_null() => {
                        out.insert(
                            member.wire_name(name).to_string(),
                            serialize(api, member, v, name)?,
                        );
                    }
                    _ => {}
                }
            }
            Json::Object(out)
        }
        (ShapeKind::List { member }, Value::List(items)) => Json::Array(
            items
                .iter()
                .map(|item| serialize(api, member, item, path))
                .collect::<Result<_, _>>()?,
        ),
        (ShapeKind::Map { value: value_shape, .. }, Value::Map(entries)) => {
            let mut out = Map::new();
            for (k, v) in entries {
                if !v.is_null() {
                    out.insert(k.clone(), serialize(api, value_shape, v, path)?);
                }
            }
            Json::Object(out)
        }
        (ShapeKind::String, Value::String(s)) => Json::String(s.clone()),
        (ShapeKind::Integer, Value::Integer(i)) => Json::Number((*i).into()),
        (ShapeKind::Float, Value::Integer(i)) => Json::Number((*i).into()),
        (ShapeKind::Float, Value::Float(f)) => {
            Json::Number(Number::from_f64(*f).ok_or_else(mismatch)?)
        }
        (ShapeKind::Boolean, Value::Bool(b)) => Json::Bool(*b),
        (ShapeKind::Timestamp, Value::Timestamp(instant)) => {
            timestamp(instant, api.timestamp_format_for(shape)).ok_or_else(mismatch)?
        }
        (ShapeKind::Blob, Value::Blob(blob)) => Json::String(base64::encode(blob)),
        (ShapeKind::Blob, Value::String(s)) => Json::String(base64::encode(s)),
        _ => return Err(mismatch()),
    };
    Ok(json)
}

fn timestamp(instant: &Instant, format: Format) -> Option<Json> {
    match format {
        Format::EpochSeconds if instant.has_nanos() => {
            Number::from_f64(instant.epoch_fractional_seconds()).map(Json::Number)
        }
        Format::EpochSeconds => Some(Json::Number(instant.epoch_seconds().into())),
        other => Some(Json::String(instant.fmt(other))),
    }
}

/// Reads `json` as `shape`. `null` and unknown members are dropped.
pub(crate) fn parse(
    api: &ApiMetadata,
    shape: &Shape,
    json: &Json,
    path: &str,
) -> Result<Value, ParseError> {
    let mismatch = || {
        ParseError::invalid(
            path,
            format!("expected {}, found {}", kind_name(shape.kind()), json),
        )
    };
    let value = match (shape.kind(), json) {
        (_, Json::Null) => Value::Null,
        (ShapeKind::Structure { .. }, Json::Object(fields)) => {
            let mut out = BTreeMap::new();
            for (name, member) in shape.members() {
                if member.location() != Location::Body {
                    continue;
                }
                if let Some(field) = fields.get(member.wire_name(name)) {
                    let parsed = parse(api, member, field, name)?;
                    if !parsed.is_null() {
                        out.insert(name.clone(), parsed);
                    }
                }
            }
            Value::Map(out)
        }
        (ShapeKind::List { member }, Json::Array(items)) => Value::List(
            items
                .iter()
                .map(|item| parse(api, member, item, path))
                .collect::<Result<_, _>>()?,
        ),
        (ShapeKind::Map { value: value_shape, .. }, Json::Object(fields)) => Value::Map(
            fields
                .iter()
                .map(|(k, v)| Ok((k.clone(), parse(api, value_shape, v, path)?)))
                .collect::<Result<_, ParseError>>()?,
        ),
        (ShapeKind::String, Json::String(s)) => Value::String(s.clone()),
        (ShapeKind::Integer, Json::Number(n)) => {
            Value::Integer(n.as_i64().ok_or_else(mismatch)?)
        }
        (ShapeKind::Float, Json::Number(n)) => Value::Float(n.as_f64().ok_or_else(mismatch)?),
        (ShapeKind::Boolean, Json::Bool(b)) => Value::Bool(*b),
        (ShapeKind::Timestamp, Json::Number(n)) => match n.as_i64() {
            Some(secs) => Value::Timestamp(Instant::from_epoch_seconds(secs)),
            None => Value::Timestamp(
                Instant::from_str(&n.to_string(), Format::EpochSeconds).map_err(|_| mismatch())?,
            ),
        },
        (ShapeKind::Timestamp, Json::String(s)) => {
            Value::Timestamp(parse_timestamp(s, api.timestamp_format_for(shape), path)?)
        }
        (ShapeKind::Blob, Json::String(s)) => Value::Blob(Blob::new(decode_base64(s, path)?)),
        _ => return Err(mismatch()),
    };
    Ok(value)
}

#[cfg(test)]
mod test {
    use super::{parse, serialize};
    use crate::shape::{ApiMetadata, Location, ProtocolName, Shape};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;
    use smithy_types::instant::Format;
    use smithy_types::{Blob, Instant, Value};
    use std::iter::FromIterator;

    fn api() -> ApiMetadata {
        ApiMetadata::new(ProtocolName::Json, "2012-08-10", "dynamodb")
    }

    fn item_shape() -> Shape {
        Shape::structure()
            .member("Name", Shape::string().with_location_name("name"))
            .member("Count", Shape::integer())
            .member("Ratio", Shape::float())
            .member("Tags", Shape::list(Shape::string()))
            .member("Attrs", Shape::map(Shape::string(), Shape::boolean()))
            .member("When", Shape::timestamp())
            .member("Data", Shape::blob())
            .member("Trace", Shape::string().with_location(Location::Header))
    }

    #[test]
    fn serializes_body_members_by_wire_name() {
        let value = Value::from_iter(vec![
            ("Name", Value::from("bår")),
            ("Count", Value::from(3)),
            ("Tags", Value::List(vec![Value::from("a")])),
            ("Attrs", Value::from_iter(vec![("on", true)])),
            ("When", Value::Timestamp(Instant::from_epoch_seconds(1576540098))),
            ("Data", Value::Blob(Blob::new("foo"))),
            ("Trace", Value::from("skipped")),
            ("Ratio", Value::Null),
        ]);
        let json = serialize(&api(), &item_shape(), &value, "Item").unwrap();
        assert_eq!(
            json,
            json!({
                "name": "bår",
                "Count": 3,
                "Tags": ["a"],
                "Attrs": {"on": true},
                "When": 1576540098,
                "Data": "Zm9v"
            })
        );
    }

    #[test]
    fn timestamps_follow_resolved_format() {
        let fractional = Value::Timestamp(Instant::from_secs_and_nanos(1576540098, 500_000_000));
        assert_eq!(
            serialize(&api(), &Shape::timestamp(), &fractional, "T").unwrap(),
            json!(1576540098.5)
        );
        let iso = Shape::timestamp().with_timestamp_format(Format::DateTime);
        assert_eq!(
            serialize(&api(), &iso, &fractional, "T").unwrap(),
            json!("2019-12-16T23:48:18Z")
        );
        assert_eq!(
            parse(&api(), &Shape::timestamp(), &json!(1576540098.5), "T").unwrap(),
            fractional
        );
    }

    #[test]
    fn millisecond_timestamps_survive_a_json_trip() {
        let millis = Value::Timestamp(Instant::from_epoch_millis(1576540098123));
        let json = serialize(&api(), &Shape::timestamp(), &millis, "T").unwrap();
        let text = serde_json::to_string(&json).unwrap();
        assert_eq!(text, "1576540098.123");
        let reparsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            parse(&api(), &Shape::timestamp(), &reparsed, "T").unwrap(),
            millis
        );
    }

    #[test]
    fn parse_drops_nulls_and_unknown_fields() {
        let parsed = parse(
            &api(),
            &item_shape(),
            &json!({"name": "x", "Count": null, "Unknown": 1}),
            "Item",
        )
        .unwrap();
        assert_eq!(parsed, Value::from_iter(vec![("Name", "x")]));
    }

    #[test]
    fn type_mismatches_are_errors() {
        let err = serialize(&api(), &Shape::integer(), &Value::from("x"), "N").unwrap_err();
        assert_eq!(err.code(), "InvalidParameter");
        let err = parse(&api(), &Shape::integer(), &json!("x"), "N").unwrap_err();
        assert_eq!(err.code(), "SerializationError");
    }

    proptest! {
        #[test]
        fn structures_survive_a_json_trip(
            name in "\\PC*",
            count in any::<i64>(),
            tags in proptest::collection::vec("[a-z]{0,8}", 0..4),
            millis in -2_000_000_000_000i64..4_000_000_000_000,
        ) {
            let value = Value::from_iter(vec![
                ("Name", Value::from(name)),
                ("Count", Value::from(count)),
                ("Tags", Value::List(tags.into_iter().map(Value::from).collect())),
                ("When", Value::Timestamp(Instant::from_epoch_millis(millis))),
            ]);
            let shape = item_shape();
            let json = serialize(&api(), &shape, &value, "Item").unwrap();
            let text = serde_json::to_string(&json).unwrap();
            let reparsed: serde_json::Value = serde_json::from_str(&text).unwrap();
            prop_assert_eq!(parse(&api(), &shape, &reparsed, "Item").unwrap(), value);
        }
    }
}
