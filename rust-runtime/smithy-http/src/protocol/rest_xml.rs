/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! The `rest-xml` protocol.

use super::aws_query::extract_xml_error;
use super::rest::{assemble, parse_bindings, serialize_bindings};
use super::xml_value::{from_xml, to_xml};
use super::{header_request_id, BuildError, Marshaler, OperationOutput, ParseError, ServiceError};
use crate::shape::{ApiMetadata, Operation, Shape, ShapeKind};
use bytes::Bytes;
use http::Method;
use smithy_types::Value;
use smithy_xml::decode::parse;

#[derive(Debug, Clone, Copy)]
pub struct RestXml;

impl Marshaler for RestXml {
    fn build_request(
        &self,
        api: &ApiMetadata,
        operation: &Operation,
        params: &Value,
    ) -> Result<http::Request<Bytes>, BuildError> {
        let bindings = serialize_bindings(api, operation, params)?;
        let body = if operation.http_method == Method::GET || operation.http_method == Method::HEAD
        {
            Bytes::new()
        } else {
            serialize_body(api, operation, params)?
        };
        assemble(operation, bindings, body)
    }

    fn extract_data(
        &self,
        api: &ApiMetadata,
        operation: &Operation,
        response: &http::Response<Bytes>,
    ) -> Result<OperationOutput, ParseError> {
        let mut data = parse_bindings(api, operation, response)?;
        let body = response.body();
        match operation.output.payload_member() {
            Some((name, member)) => {
                if let Some(value) = raw_payload(member, body) {
                    data.insert(name.to_string(), value);
                } else if !body.iter().all(u8::is_ascii_whitespace) {
                    let root = parse(&String::from_utf8_lossy(body))?;
                    data.insert(name.to_string(), from_xml(api, member, &root, name)?);
                }
            }
            None if !body.iter().all(u8::is_ascii_whitespace) => {
                let root = parse(&String::from_utf8_lossy(body))?;
                if let Value::Map(members) = from_xml(api, &operation.output, &root, &operation.name)? {
                    data.extend(members);
                }
            }
            None => {}
        }
        Ok(OperationOutput {
            data: Value::Map(data),
            request_id: header_request_id(response),
        })
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

/// Blob and string payloads are the body itself.
pub(crate) fn raw_payload(member: &Shape, body: &Bytes) -> Option<Value> {
    match member.kind() {
        ShapeKind::Blob => Some(Value::Blob(smithy_types::Blob::new(body.to_vec()))),
        ShapeKind::String => Some(Value::String(String::from_utf8_lossy(body).into_owned())),
        _ => None,
    }
}

/// Blob and string payload values written as the raw body.
pub(crate) fn raw_body(member: &Shape, value: &Value, path: &str) -> Result<Option<Bytes>, BuildError> {
    match (member.kind(), value) {
        (ShapeKind::Blob, Value::Blob(blob)) => Ok(Some(Bytes::copy_from_slice(blob.as_ref()))),
        (ShapeKind::Blob, Value::String(s)) | (ShapeKind::String, Value::String(s)) => {
            Ok(Some(Bytes::copy_from_slice(s.as_bytes())))
        }
        (ShapeKind::Blob, _) | (ShapeKind::String, _) => Err(BuildError::invalid(
            path,
            "payload must be a string or blob",
        )),
        _ => Ok(None),
    }
}

fn serialize_body(
    api: &ApiMetadata,
    operation: &Operation,
    params: &Value,
) -> Result<Bytes, BuildError> {
    match operation.input.payload_member() {
        Some((name, member)) => {
            let value = match params.get(name) {
                Some(value) if !value.is_null() => value,
                _ => return Ok(Bytes::new()),
            };
            if let Some(raw) = raw_body(member, value, name)? {
                return Ok(raw);
            }
            let root = member.wire_name(name);
            Ok(Bytes::from(to_xml(api, member, root, value)?))
        }
        None => {
            let default_root = format!("{}Request", operation.name);
            let root = operation
                .input
                .location_name()
                .unwrap_or(&default_root);
            Ok(Bytes::from(to_xml(api, &operation.input, root, params)?))
        }
    }
}

#[cfg(test)]
mod test {
    use super::RestXml;
    use crate::protocol::Marshaler;
    use crate::shape::{ApiMetadata, Location, Operation, ProtocolName, Shape};
    use bytes::Bytes;
    use http::Method;
    use pretty_assertions::assert_eq;
    use smithy_types::{Blob, Value};
    use std::iter::FromIterator;

    fn api() -> ApiMetadata {
        let mut api = ApiMetadata::new(ProtocolName::RestXml, "2006-03-01", "s3");
        api.xml_namespace = Some("http://s3.amazonaws.com/doc/2006-03-01/".to_string());
        api
    }

    fn bucket() -> Shape {
        Shape::string().with_location(Location::Uri)
    }

    #[test]
    fn structure_payload_uses_its_location_name() {
        let configuration = Shape::structure()
            .with_location_name("CreateBucketConfiguration")
            .member("LocationConstraint", Shape::string());
        let operation = Operation::new("CreateBucket")
            .http(Method::PUT, "/{Bucket}")
            .input(
                Shape::structure()
                    .member("Bucket", bucket())
                    .member("CreateBucketConfiguration", configuration)
                    .payload("CreateBucketConfiguration"),
            );
        let params = Value::from_iter(vec![
            ("Bucket", Value::from("my-bucket")),
            (
                "CreateBucketConfiguration",
                Value::from_iter(vec![("LocationConstraint", "us-west-2")]),
            ),
        ]);
        let request = RestXml.build_request(&api(), &operation, &params).unwrap();
        assert_eq!(request.method(), Method::PUT);
        assert_eq!(request.uri(), "/my-bucket");
        assert_eq!(
            request.body(),
            &Bytes::from_static(
                b"<CreateBucketConfiguration xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
                  <LocationConstraint>us-west-2</LocationConstraint>\
                  </CreateBucketConfiguration>"
            )
        );
    }

    #[test]
    fn body_members_use_the_request_root() {
        let operation = Operation::new("PutThing").http(Method::POST, "/things").input(
            Shape::structure()
                .member("Name", Shape::string())
                .member("Trace", Shape::string().with_location(Location::Header).with_location_name("x-trace")),
        );
        let params = Value::from_iter(vec![("Name", "n"), ("Trace", "t")]);
        let request = RestXml.build_request(&api(), &operation, &params).unwrap();
        assert_eq!(request.headers()["x-trace"], "t");
        assert_eq!(
            request.body(),
            &Bytes::from_static(
                b"<PutThingRequest xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\"><Name>n</Name></PutThingRequest>"
            )
        );

        let headers_only = Value::from_iter(vec![("Trace", "t")]);
        let request = RestXml.build_request(&api(), &operation, &headers_only).unwrap();
        assert!(request.body().is_empty());
    }

    #[test]
    fn get_requests_have_no_body() {
        let operation = Operation::new("ListThings")
            .http(Method::GET, "/things?list-type=2")
            .input(Shape::structure().member("Name", Shape::string()));
        let params = Value::from_iter(vec![("Name", "ignored")]);
        let request = RestXml.build_request(&api(), &operation, &params).unwrap();
        assert_eq!(request.uri(), "/things?list-type=2");
        assert!(request.body().is_empty());
    }

    #[test]
    fn blob_payloads_are_raw_bodies() {
        let operation = Operation::new("GetObject")
            .http(Method::GET, "/{Bucket}/{Key+}")
            .output(
                Shape::structure()
                    .member("Body", Shape::blob().with_streaming(true))
                    .member(
                        "ETag",
                        Shape::string().with_location(Location::Header).with_location_name("ETag"),
                    )
                    .payload("Body"),
            );
        let response = http::Response::builder()
            .header("etag", "\"abc\"")
            .header("x-amz-request-id", "req-1")
            .body(Bytes::from_static(b"<not-xml>"))
            .unwrap();
        let output = RestXml.extract_data(&api(), &operation, &response).unwrap();
        assert_eq!(output.data.get("Body"), Some(&Value::Blob(Blob::new("<not-xml>"))));
        assert_eq!(output.data.get("ETag"), Some(&Value::from("\"abc\"")));
        assert_eq!(output.request_id.as_deref(), Some("req-1"));
    }

    #[test]
    fn body_members_are_merged_with_bindings() {
        let operation = Operation::new("GetBucketLocation").output(
            Shape::structure()
                .member("LocationConstraint", Shape::string())
                .member("Status", Shape::integer().with_location(Location::StatusCode)),
        );
        let response = http::Response::builder()
            .body(Bytes::from_static(
                b"<LocationConstraintResult><LocationConstraint>eu-west-1</LocationConstraint></LocationConstraintResult>",
            ))
            .unwrap();
        let output = RestXml.extract_data(&api(), &operation, &response).unwrap();
        assert_eq!(
            output.data,
            Value::from_iter(vec![
                ("LocationConstraint", Value::from("eu-west-1")),
                ("Status", Value::from(200)),
            ])
        );
    }

    #[test]
    fn s3_style_errors() {
        let response = http::Response::builder()
            .status(404)
            .header("x-amz-request-id", "header-id")
            .body(Bytes::from_static(
                b"<Error><Code>NoSuchKey</Code><Message>The specified key does not exist.</Message>\
                  <RequestId>body-id</RequestId></Error>",
            ))
            .unwrap();
        let err = RestXml.extract_error(&api(), &Operation::new("GetObject"), &response);
        assert_eq!(err.code(), "NoSuchKey");
        assert_eq!(err.message(), Some("The specified key does not exist."));
        assert_eq!(err.request_id(), Some("body-id"));
        assert!(!err.retryable());

        let empty = http::Response::builder()
            .status(404)
            .header("x-amz-request-id", "header-id")
            .body(Bytes::new())
            .unwrap();
        let err = RestXml.extract_error(&api(), &Operation::new("HeadObject"), &empty);
        assert_eq!(err.code(), "404");
        assert_eq!(err.message(), Some("Not Found"));
        assert_eq!(err.request_id(), Some("header-id"));
    }

    #[test]
    fn malformed_xml_is_retryable() {
        let operation = Operation::new("GetBucketLocation")
            .output(Shape::structure().member("LocationConstraint", Shape::string()));
        let response = http::Response::builder()
            .body(Bytes::from_static(b"<LocationConstraintResult><LocationConstraint>eu"))
            .unwrap();
        let err = RestXml.extract_data(&api(), &operation, &response).unwrap_err();
        assert_eq!(err.code(), "XMLParserError");
        assert!(err.retryable());
    }
}
