/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! The `query` protocol: form-encoded requests, XML responses.

use super::xml_value::from_xml;
use super::{
    header_request_id, status_message, BuildError, Marshaler, OperationOutput, ParseError,
    ServiceError,
};
use crate::shape::{ApiMetadata, Operation, Shape, ShapeKind};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::Method;
use smithy_query::{QueryValueWriter, QueryWriter};
use smithy_types::Value;
use smithy_xml::decode::{parse, XmlElement};

const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded; charset=utf-8";

#[derive(Debug, Clone, Copy)]
pub struct AwsQuery;

impl Marshaler for AwsQuery {
    fn build_request(
        &self,
        api: &ApiMetadata,
        operation: &Operation,
        params: &Value,
    ) -> Result<http::Request<Bytes>, BuildError> {
        let body = serialize_body(api, operation, params)?;
        Ok(http::Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(CONTENT_TYPE, CONTENT_TYPE_FORM)
            .body(Bytes::from(body))?)
    }

    fn extract_data(
        &self,
        api: &ApiMetadata,
        operation: &Operation,
        response: &http::Response<Bytes>,
    ) -> Result<OperationOutput, ParseError> {
        let text = String::from_utf8_lossy(response.body());
        if text.trim().is_empty() {
            return Ok(OperationOutput {
                data: Value::map(),
                request_id: header_request_id(response),
            });
        }
        let root = parse(&text)?;
        let data = match operation.result_wrapper.as_deref() {
            Some(wrapper) => match root.child(wrapper) {
                Some(result) => from_xml(api, &operation.output, result, wrapper)?,
                None => Value::map(),
            },
            None => from_xml(api, &operation.output, &root, &operation.name)?,
        };
        let request_id = modeled_request_id(&operation.output, &data)
            .or_else(|| body_request_id(&root))
            .or_else(|| header_request_id(response));
        Ok(OperationOutput { data, request_id })
    }

    fn extract_error(
        &self,
        _api: &ApiMetadata,
        _operation: &Operation,
        response: &http::Response<Bytes>,
    ) -> ServiceError {
        extract_xml_error(response)
    }
}

/// Reads an `<Error>` element from anywhere in an XML error body.
///
/// Shared with `rest-xml`, whose error documents have the same shape.
pub(crate) fn extract_xml_error(response: &http::Response<Bytes>) -> ServiceError {
    let status = response.status();
    let text = String::from_utf8_lossy(response.body());
    if text.contains("<UnknownOperationException") {
        return ServiceError::new(
            "UnknownOperation",
            Some("Unknown operation".to_string()),
            status.as_u16(),
        )
        .with_request_id(header_request_id(response));
    }
    let root = match parse(&text) {
        Ok(root) => root,
        Err(_) => {
            return ServiceError::new(status.as_str(), status_message(status), status.as_u16())
                .with_request_id(header_request_id(response))
        }
    };
    let error = root.find("Error").unwrap_or(&root);
    let request_id = body_request_id(&root).or_else(|| header_request_id(response));
    match error.child_text("Code") {
        Some(code) => ServiceError::new(
            code,
            error.child_text("Message").map(str::to_string),
            status.as_u16(),
        ),
        None => ServiceError::new(status.as_str(), None, status.as_u16()),
    }
    .with_request_id(request_id)
}

fn modeled_request_id(output: &Shape, data: &Value) -> Option<String> {
    ["RequestId", "requestId"]
        .iter()
        .filter(|name| output.member_shape(name).is_some())
        .find_map(|name| data.get(name).and_then(Value::as_str))
        .map(str::to_string)
}

fn body_request_id(root: &XmlElement) -> Option<String> {
    root.child_text("requestId")
        .or_else(|| root.child_text("RequestId"))
        .or_else(|| {
            root.child("ResponseMetadata")
                .and_then(|meta| meta.child_text("RequestId"))
        })
        .or_else(|| root.find("RequestId").map(XmlElement::text))
        .map(str::to_string)
}

fn serialize_body(
    api: &ApiMetadata,
    operation: &Operation,
    params: &Value,
) -> Result<String, BuildError> {
    let entries = params
        .as_map()
        .ok_or_else(|| BuildError::invalid(&operation.name, "expected a structure"))?;
    let mut body = String::new();
    let mut writer = QueryWriter::new(&mut body, &operation.name, &api.api_version);
    for (name, member) in operation.input.members() {
        if let Some(value) = entries.get(name).filter(|v| !v.is_null()) {
            serialize_value(api, writer.prefix(param_name(name, member)), member, value, name)?;
        }
    }
    writer.finish();
    Ok(body)
}

/// Flattened lists whose members carry a location name are named after the member.
fn param_name<'a>(name: &'a str, shape: &'a Shape) -> &'a str {
    match shape.kind() {
        ShapeKind::List { member } if shape.is_flattened() => member
            .location_name()
            .unwrap_or_else(|| shape.wire_name(name)),
        _ => shape.wire_name(name),
    }
}

fn serialize_value(
    api: &ApiMetadata,
    writer: QueryValueWriter<'_>,
    shape: &Shape,
    value: &Value,
    path: &str,
) -> Result<(), BuildError> {
    match (shape.kind(), value) {
        (ShapeKind::Structure { .. }, Value::Map(entries)) => {
            let mut writer = writer;
            for (name, member) in shape.members() {
                if let Some(v) = entries.get(name).filter(|v| !v.is_null()) {
                    serialize_value(api, writer.prefix(param_name(name, member)), member, v, name)?;
                }
            }
        }
        (ShapeKind::List { member }, Value::List(items)) => {
            let member_name = if shape.is_flattened() {
                None
            } else {
                member.location_name()
            };
            let mut list = writer.start_list(shape.is_flattened(), member_name);
            for item in items {
                serialize_value(api, list.entry(), member, item, path)?;
            }
            list.finish();
        }
        (ShapeKind::Map { key, value: value_shape }, Value::Map(entries)) => {
            let mut map = writer.start_map(
                shape.is_flattened(),
                key.location_name().unwrap_or("key"),
                value_shape.location_name().unwrap_or("value"),
            );
            for (k, v) in entries {
                serialize_value(api, map.entry(k), value_shape, v, path)?;
            }
            map.finish();
        }
        (ShapeKind::String, Value::String(s)) => writer.string(s),
        (ShapeKind::Integer, Value::Integer(i)) => writer.integer(*i),
        (ShapeKind::Float, Value::Float(f)) => writer.float(*f),
        (ShapeKind::Float, Value::Integer(i)) => writer.integer(*i),
        (ShapeKind::Boolean, Value::Bool(b)) => writer.boolean(*b),
        (ShapeKind::Timestamp, Value::Timestamp(instant)) => {
            writer.instant(instant, api.timestamp_format_for(shape))
        }
        (ShapeKind::Blob, Value::Blob(blob)) => writer.string(&base64::encode(blob)),
        (ShapeKind::Blob, Value::String(s)) => writer.string(&base64::encode(s)),
        (kind, value) => {
            return Err(BuildError::invalid(
                path,
                format!("cannot write {:?} as {}", value, super::kind_name(kind)),
            ))
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::AwsQuery;
    use crate::protocol::{Marshaler, OperationOutput};
    use crate::shape::{ApiMetadata, Operation, ProtocolName, Shape};
    use bytes::Bytes;
    use percent_encoding::percent_decode_str;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use smithy_types::{Blob, Instant, Value};
    use smithy_xml::encode::{ScopeWriter, XmlWriter};
    use std::iter::FromIterator;

    fn api() -> ApiMetadata {
        ApiMetadata::new(ProtocolName::Query, "2011-06-15", "sts")
    }

    fn response(status: u16, body: &str) -> http::Response<Bytes> {
        http::Response::builder()
            .status(status)
            .body(Bytes::from(body.to_string()))
            .unwrap()
    }

    fn body_of(operation: &Operation, params: &Value) -> String {
        let request = AwsQuery.build_request(&api(), operation, params).unwrap();
        assert_eq!(request.method(), http::Method::POST);
        assert_eq!(request.uri(), "/");
        assert_eq!(
            request.headers()["content-type"],
            "application/x-www-form-urlencoded; charset=utf-8"
        );
        String::from_utf8(request.body().to_vec()).unwrap()
    }

    #[test]
    fn members_serialize_in_declaration_order() {
        let operation = Operation::new("AssumeRole").input(
            Shape::structure()
                .member("RoleArn", Shape::string())
                .member("RoleSessionName", Shape::string())
                .member("DurationSeconds", Shape::integer())
                .member("ExternalId", Shape::string()),
        );
        let params = Value::from_iter(vec![
            ("RoleSessionName", Value::from("session name")),
            ("RoleArn", Value::from("arn:aws:iam::123:role/a")),
            ("DurationSeconds", Value::from(3600)),
            ("ExternalId", Value::from("")),
        ]);
        assert_eq!(
            body_of(&operation, &params),
            "Action=AssumeRole&Version=2011-06-15\
             &RoleArn=arn%3Aaws%3Aiam%3A%3A123%3Arole%2Fa\
             &RoleSessionName=session%20name\
             &DurationSeconds=3600\
             &ExternalId="
        );
    }

    #[test]
    fn lists_maps_and_nested_structures() {
        let tag = Shape::structure()
            .member("Key", Shape::string())
            .member("Value", Shape::string());
        let operation = Operation::new("TagThings").input(
            Shape::structure()
                .member("Tags", Shape::list(tag))
                .member("Empty", Shape::list(Shape::string()))
                .member(
                    "Ids",
                    Shape::list(Shape::string().with_location_name("Id")).with_flattened(true),
                )
                .member(
                    "Attributes",
                    Shape::map(
                        Shape::string().with_location_name("Name"),
                        Shape::string().with_location_name("Value"),
                    )
                    .with_flattened(true),
                )
                .member("When", Shape::timestamp()),
        );
        let params = Value::from_iter(vec![
            (
                "Tags",
                Value::List(vec![Value::from_iter(vec![("Key", "k"), ("Value", "v")])]),
            ),
            ("Empty", Value::List(vec![])),
            ("Ids", Value::List(vec![Value::from("a"), Value::from("b")])),
            ("Attributes", Value::from_iter(vec![("color", "red")])),
            ("When", Value::Timestamp(Instant::from_epoch_seconds(0))),
        ]);
        assert_eq!(
            body_of(&operation, &params),
            "Action=TagThings&Version=2011-06-15\
             &Tags.member.1.Key=k&Tags.member.1.Value=v\
             &Empty=\
             &Id.1=a&Id.2=b\
             &Attributes.1.Name=color&Attributes.1.Value=red\
             &When=1970-01-01T00%3A00%3A00Z"
        );
    }

    #[test]
    fn output_is_read_from_the_result_wrapper() {
        let operation = Operation::new("GetCallerIdentity")
            .result_wrapper("GetCallerIdentityResult")
            .output(
                Shape::structure()
                    .member("Account", Shape::string())
                    .member("Arn", Shape::string()),
            );
        let body = r#"<GetCallerIdentityResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <GetCallerIdentityResult>
    <Arn>arn:aws:iam::123456789012:user/Alice</Arn>
    <Account>123456789012</Account>
  </GetCallerIdentityResult>
  <ResponseMetadata>
    <RequestId>01234567-89ab-cdef-0123-456789abcdef</RequestId>
  </ResponseMetadata>
</GetCallerIdentityResponse>"#;
        let output = AwsQuery
            .extract_data(&api(), &operation, &response(200, body))
            .unwrap();
        assert_eq!(
            output,
            OperationOutput {
                data: Value::from_iter(vec![
                    ("Account", "123456789012"),
                    ("Arn", "arn:aws:iam::123456789012:user/Alice"),
                ]),
                request_id: Some("01234567-89ab-cdef-0123-456789abcdef".to_string()),
            }
        );
    }

    #[test]
    fn modeled_request_id_wins() {
        let operation = Operation::new("DescribeThing")
            .output(Shape::structure().member("requestId", Shape::string()));
        let body = "<DescribeThingResponse><requestId>modeled</requestId>\
                    <ResponseMetadata><RequestId>meta</RequestId></ResponseMetadata>\
                    </DescribeThingResponse>";
        let output = AwsQuery
            .extract_data(&api(), &operation, &response(200, body))
            .unwrap();
        assert_eq!(output.request_id.as_deref(), Some("modeled"));
        assert_eq!(output.data.get("requestId"), Some(&Value::from("modeled")));

        let unmodeled = Operation::new("DescribeThing");
        let body = "<DescribeThingResponse><requestId>top</requestId></DescribeThingResponse>";
        let output = AwsQuery
            .extract_data(&api(), &unmodeled, &response(200, body))
            .unwrap();
        assert_eq!(output.request_id.as_deref(), Some("top"));
    }

    #[test]
    fn errors_are_found_inside_wrappers() {
        let body = "<ErrorResponse><Error><Type>Sender</Type><Code>ExpiredToken</Code>\
                    <Message>The security token included in the request is expired</Message>\
                    </Error><RequestId>abc</RequestId></ErrorResponse>";
        let err = AwsQuery.extract_error(&api(), &Operation::new("Op"), &response(403, body));
        assert_eq!(err.code(), "ExpiredToken");
        assert_eq!(
            err.message(),
            Some("The security token included in the request is expired")
        );
        assert_eq!(err.request_id(), Some("abc"));
        assert_eq!(err.status_code(), 403);

        let nested = "<Response><Errors><Error><Code>Throttling</Code></Error></Errors></Response>";
        let err = AwsQuery.extract_error(&api(), &Operation::new("Op"), &response(400, nested));
        assert_eq!(err.code(), "Throttling");
        assert_eq!(err.message(), None);
        assert!(err.retryable());
    }

    #[test]
    fn unreadable_error_bodies_fall_back_to_status() {
        let err = AwsQuery.extract_error(&api(), &Operation::new("Op"), &response(503, ""));
        assert_eq!(err.code(), "503");
        assert_eq!(err.message(), Some("Service Unavailable"));

        let err = AwsQuery.extract_error(&api(), &Operation::new("Op"), &response(400, "<a><b>"));
        assert_eq!(err.code(), "400");
        assert_eq!(err.message(), Some("Bad Request"));

        let err = AwsQuery.extract_error(
            &api(),
            &Operation::new("Op"),
            &response(400, "<Root><NoCode/></Root>"),
        );
        assert_eq!(err.code(), "400");
        assert_eq!(err.message(), None);

        let err = AwsQuery.extract_error(
            &api(),
            &Operation::new("Op"),
            &response(400, "<UnknownOperationException/>"),
        );
        assert_eq!(err.code(), "UnknownOperation");
    }

    /// Element tree rebuilt from query parameter names, e.g. `Tags.member.1.Key`.
    #[derive(Default)]
    struct Element {
        text: String,
        children: Vec<(String, usize, Element)>,
    }

    impl Element {
        fn child(&mut self, name: &str, index: usize) -> &mut Element {
            let pos = match self
                .children
                .iter()
                .position(|(n, i, _)| n == name && *i == index)
            {
                Some(pos) => pos,
                None => {
                    self.children
                        .push((name.to_string(), index, Element::default()));
                    self.children.len() - 1
                }
            };
            &mut self.children[pos].2
        }

        fn write(&self, scope: &mut ScopeWriter<'_>) {
            for (name, _, element) in &self.children {
                let mut inner = scope.start_el(name).finish();
                if element.children.is_empty() {
                    inner.data(&element.text);
                } else {
                    element.write(&mut inner);
                    inner.finish();
                }
            }
        }
    }

    /// Renders a query request body as the XML response a service would send back for it.
    fn form_to_response(body: &str) -> String {
        let mut root = Element::default();
        for pair in body.split('&') {
            let (name, value) = pair.split_once('=').unwrap();
            if name == "Action" || name == "Version" {
                continue;
            }
            let mut path: Vec<(&str, usize)> = Vec::new();
            for segment in name.split('.') {
                match (segment.parse::<usize>(), path.last_mut()) {
                    (Ok(index), Some(last)) => last.1 = index,
                    _ => path.push((segment, 0)),
                }
            }
            let leaf = path
                .iter()
                .fold(&mut root, |element, (name, index)| element.child(name, *index));
            leaf.text = percent_decode_str(value).decode_utf8().unwrap().into_owned();
        }
        let mut doc = String::new();
        let mut writer = XmlWriter::new(&mut doc);
        let mut response = writer.start_el("RoundTripResponse").finish();
        let mut result = response.start_el("RoundTripResult").finish();
        root.write(&mut result);
        result.finish();
        response.finish();
        doc
    }

    fn round_trip_shape() -> Shape {
        let tag = Shape::structure()
            .member("Key", Shape::string())
            .member("Value", Shape::string());
        Shape::structure()
            .member("Name", Shape::string())
            .member("Count", Shape::integer())
            .member("Ratio", Shape::float())
            .member("Enabled", Shape::boolean())
            .member("Tags", Shape::list(tag))
            .member(
                "Ids",
                Shape::list(Shape::string().with_location_name("Id")).with_flattened(true),
            )
            .member("Labels", Shape::map(Shape::string(), Shape::integer()))
            .member(
                "Attributes",
                Shape::map(
                    Shape::string().with_location_name("Name"),
                    Shape::string().with_location_name("Value"),
                )
                .with_flattened(true),
            )
            .member("When", Shape::timestamp())
            .member("Data", Shape::blob())
    }

    #[test]
    fn form_parameters_rebuild_the_matching_document() {
        let body = "Action=Op&Version=1&Tags.member.1.Key=a%20b&Tags.member.2.Key=c\
                    &Empty=&Id.1=x%26y";
        assert_eq!(
            form_to_response(body),
            "<RoundTripResponse><RoundTripResult>\
             <Tags><member><Key>a b</Key></member><member><Key>c</Key></member></Tags>\
             <Empty></Empty><Id>x&amp;y</Id>\
             </RoundTripResult></RoundTripResponse>"
        );
    }

    proptest! {
        #[test]
        fn structures_survive_a_query_trip(
            name in "[a-zA-Z0-9 &<>'\"=.+%-]{0,12}",
            count in any::<i64>(),
            ratio in -1e6f64..1e6,
            enabled in any::<bool>(),
            tags in proptest::collection::vec(("[a-z]{1,6}", "[a-z0-9 ]{0,6}"), 0..3),
            ids in proptest::collection::vec("[a-z0-9]{0,6}", 1..4),
            labels in proptest::collection::btree_map("[a-z]{1,6}", any::<i64>(), 1..3),
            attributes in proptest::collection::btree_map("[a-z]{1,6}", "[a-z&<]{0,6}", 1..3),
            seconds in -2_000_000_000i64..250_000_000_000,
            data in proptest::collection::vec(any::<u8>(), 0..16),
        ) {
            let value = Value::from_iter(vec![
                ("Name", Value::from(name)),
                ("Count", Value::from(count)),
                ("Ratio", Value::Float(ratio)),
                ("Enabled", Value::Bool(enabled)),
                (
                    "Tags",
                    Value::List(
                        tags.into_iter()
                            .map(|(k, v)| Value::from_iter(vec![("Key", k), ("Value", v)]))
                            .collect(),
                    ),
                ),
                ("Ids", Value::List(ids.into_iter().map(Value::from).collect())),
                (
                    "Labels",
                    Value::Map(labels.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
                ),
                (
                    "Attributes",
                    Value::Map(attributes.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
                ),
                ("When", Value::Timestamp(Instant::from_epoch_seconds(seconds))),
                ("Data", Value::Blob(Blob::new(data))),
            ]);
            let shape = round_trip_shape();
            let operation = Operation::new("RoundTrip")
                .input(shape.clone())
                .output(shape)
                .result_wrapper("RoundTripResult");
            let body = body_of(&operation, &value);
            let output = AwsQuery
                .extract_data(&api(), &operation, &response(200, &form_to_response(&body)))
                .unwrap();
            prop_assert_eq!(output.data, value);
        }
    }
}
