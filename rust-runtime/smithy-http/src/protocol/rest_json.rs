/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! The `rest-json` protocol.

use super::aws_json::{extract_json_error, parse_body};
use super::json_value;
use super::rest::{assemble, parse_bindings, serialize_bindings};
use super::rest_xml::{raw_body, raw_payload};
use super::{header_request_id, BuildError, Marshaler, OperationOutput, ParseError, ServiceError};
use crate::header::set_header;
use crate::shape::{ApiMetadata, Operation, ShapeKind};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::Method;
use smithy_types::Value;

#[derive(Debug, Clone, Copy)]
pub struct RestJson;

impl Marshaler for RestJson {
    fn build_request(
        &self,
        api: &ApiMetadata,
        operation: &Operation,
        params: &Value,
    ) -> Result<http::Request<Bytes>, BuildError> {
        let mut bindings = serialize_bindings(api, operation, params)?;
        let method = &operation.http_method;
        if *method == Method::GET || *method == Method::HEAD || *method == Method::DELETE {
            return assemble(operation, bindings, Bytes::new());
        }
        let (body, content_type) = match operation.input.payload_member() {
            Some((name, member)) => {
                let content_type = match member.kind() {
                    ShapeKind::Blob => "binary/octet-stream",
                    _ => "application/json",
                };
                let body = match params.get(name).filter(|v| !v.is_null()) {
                    None => Bytes::new(),
                    Some(value) => match raw_body(member, value, name)? {
                        Some(raw) => raw,
                        None => Bytes::from(serde_json::to_vec(&json_value::serialize(
                            api, member, value, name,
                        )?)?),
                    },
                };
                (body, content_type)
            }
            None => {
                let json = json_value::serialize(api, &operation.input, params, &operation.name)?;
                (Bytes::from(serde_json::to_vec(&json)?), "application/json")
            }
        };
        if !bindings.headers.contains_key(CONTENT_TYPE) {
            set_header(&mut bindings.headers, CONTENT_TYPE.as_str(), content_type)?;
        }
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
                let value = match raw_payload(member, body) {
                    Some(raw) => Some(raw),
                    None => parse_body(api, member, body, name)?,
                };
                if let Some(value) = value {
                    data.insert(name.to_string(), value);
                }
            }
            None => {
                if let Some(Value::Map(members)) =
                    parse_body(api, &operation.output, body, &operation.name)?
                {
                    data.extend(members);
                }
            }
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
        extract_json_error(response)
    }
}
