/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! The `json` (JSON-RPC) protocol: every call is a `POST /` naming its operation in
//! `X-Amz-Target`.

use super::json_value;
use super::{header_request_id, status_message, BuildError, Marshaler, OperationOutput, ParseError, ServiceError};
use crate::header::read_one;
use crate::shape::{ApiMetadata, Operation};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::Method;
use smithy_types::Value;

const DEFAULT_JSON_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy)]
pub struct AwsJson;

impl Marshaler for AwsJson {
    fn build_request(
        &self,
        api: &ApiMetadata,
        operation: &Operation,
        params: &Value,
    ) -> Result<http::Request<Bytes>, BuildError> {
        let body = json_value::serialize(api, &operation.input, params, &operation.name)?;
        let content_type = format!(
            "application/x-amz-json-{}",
            api.json_version.as_deref().unwrap_or(DEFAULT_JSON_VERSION)
        );
        let mut builder = http::Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(CONTENT_TYPE, content_type);
        if let Some(prefix) = &api.target_prefix {
            builder = builder.header("X-Amz-Target", format!("{}.{}", prefix, operation.name));
        }
        Ok(builder.body(Bytes::from(serde_json::to_vec(&body)?))?)
    }

    fn extract_data(
        &self,
        api: &ApiMetadata,
        operation: &Operation,
        response: &http::Response<Bytes>,
    ) -> Result<OperationOutput, ParseError> {
        Ok(OperationOutput {
            data: parse_body(api, &operation.output, response.body(), &operation.name)?
                .unwrap_or_else(Value::map),
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

/// Parses a JSON body as `shape`. Blank bodies yield `None`.
pub(crate) fn parse_body(
    api: &ApiMetadata,
    shape: &crate::shape::Shape,
    body: &Bytes,
    path: &str,
) -> Result<Option<Value>, ParseError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let json: serde_json::Value = serde_json::from_slice(body)?;
    json_value::parse(api, shape, &json, path).map(Some)
}

/// Error extraction shared by the two JSON protocols.
///
/// The code comes from `__type`, `code` or `Code` in the body, keeping only the part after the
/// last `#`, or from the `x-amzn-errortype` header, keeping only the part before `:`.
pub(crate) fn extract_json_error(response: &http::Response<Bytes>) -> ServiceError {
    let status = response.status();
    let request_id = header_request_id(response);
    let header_code = read_one(response.headers(), "x-amzn-errortype")
        .and_then(|value| value.split(':').next())
        .filter(|code| !code.is_empty())
        .map(str::to_string);
    let body = response.body();
    if body.iter().all(u8::is_ascii_whitespace) {
        return ServiceError::new(
            header_code.unwrap_or_else(|| "UnknownError".to_string()),
            Some(status.as_str().to_string()),
            status.as_u16(),
        )
        .with_request_id(request_id);
    }
    let json: serde_json::Value = match serde_json::from_slice(body) {
        Ok(json) => json,
        Err(_) => {
            return ServiceError::new(
                header_code.unwrap_or_else(|| "UnknownError".to_string()),
                status_message(status),
                status.as_u16(),
            )
            .with_request_id(request_id)
        }
    };
    let field = |names: &[&str]| {
        names
            .iter()
            .find_map(|name| json.get(*name).and_then(serde_json::Value::as_str))
    };
    let code = field(&["__type", "code", "Code"])
        .and_then(|code| code.rsplit('#').next())
        .map(str::to_string)
        .or(header_code)
        .unwrap_or_else(|| "UnknownError".to_string());
    let message = if code == "RequestEntityTooLarge" {
        Some("Request body must be less than 1 MB".to_string())
    } else {
        field(&["message", "Message"]).map(str::to_string)
    };
    ServiceError::new(code, message, status.as_u16()).with_request_id(request_id)
}
