/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Request serialization and response parsing for the four wire protocols.
//!
//! Every protocol walks the operation's shape tree alongside a [`Value`] tree. Members with an
//! HTTP location (`uri`, `header`, `headers`, `querystring`, `statusCode`) are moved in and out
//! of the corresponding part of the message; everything else travels in the body.

use crate::header::InvalidHeader;
use crate::shape::{ApiMetadata, Operation, ProtocolName, Shape, ShapeKind};
use bytes::Bytes;
use smithy_types::instant::Format;
use smithy_types::{Blob, Instant, Value};
use smithy_xml::decode::XmlError;
use std::fmt;
use thiserror::Error;

pub mod aws_json;
pub mod aws_query;
mod json_value;
mod rest;
pub mod rest_json;
pub mod rest_xml;
mod xml_value;

/// A protocol's request builder and response parsers.
pub trait Marshaler: Send + Sync + fmt::Debug {
    /// Builds a request with a relative URI; the endpoint is applied separately.
    fn build_request(
        &self,
        api: &ApiMetadata,
        operation: &Operation,
        params: &Value,
    ) -> Result<http::Request<Bytes>, BuildError>;

    /// Parses a successful response into the operation's output.
    fn extract_data(
        &self,
        api: &ApiMetadata,
        operation: &Operation,
        response: &http::Response<Bytes>,
    ) -> Result<OperationOutput, ParseError>;

    /// Parses an error response. Never fails: unreadable bodies fall back to the status code.
    fn extract_error(
        &self,
        api: &ApiMetadata,
        operation: &Operation,
        response: &http::Response<Bytes>,
    ) -> ServiceError;
}

/// The marshaler for a protocol.
pub fn marshaler(protocol: ProtocolName) -> &'static dyn Marshaler {
    match protocol {
        ProtocolName::Query => &aws_query::AwsQuery,
        ProtocolName::RestXml => &rest_xml::RestXml,
        ProtocolName::RestJson => &rest_json::RestJson,
        ProtocolName::Json => &aws_json::AwsJson,
    }
}

/// Dispatches a response to `extract_data` or `extract_error` based on its status code.
pub fn parse_response(
    api: &ApiMetadata,
    operation: &Operation,
    response: &http::Response<Bytes>,
) -> Result<OperationOutput, OperationError> {
    let marshaler = marshaler(api.protocol);
    if response.status().is_success() {
        marshaler
            .extract_data(api, operation, response)
            .map_err(OperationError::Parse)
    } else {
        let error = marshaler.extract_error(api, operation, response);
        tracing::debug!(
            operation = %operation.name,
            status = error.status_code(),
            code = error.code(),
            request_id = ?error.request_id(),
            "service returned an error"
        );
        Err(OperationError::Service(error))
    }
}

/// Parsed output of a successful call.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationOutput {
    pub data: Value,
    pub request_id: Option<String>,
}

/// Failure while building a request.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid value for `{member}`: {message}")]
    InvalidParameter { member: String, message: String },
    #[error("missing value for URI label `{0}`")]
    MissingLabel(String),
    #[error(transparent)]
    InvalidHeader(#[from] InvalidHeader),
    #[error("failed to build request: {0}")]
    Http(#[from] http::Error),
    #[error("failed to serialize JSON body: {0}")]
    Json(#[from] serde_json::Error),
}

impl BuildError {
    pub(crate) fn invalid(member: impl Into<String>, message: impl Into<String>) -> Self {
        BuildError::InvalidParameter {
            member: member.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            BuildError::InvalidHeader(_) => "InvalidHeader",
            BuildError::MissingLabel(_) => "UriParameterError",
            _ => "InvalidParameter",
        }
    }
}

/// Failure while reading a response.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error("invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected value for `{member}`: {message}")]
    InvalidValue { member: String, message: String },
}

impl ParseError {
    pub(crate) fn invalid(member: impl Into<String>, message: impl Into<String>) -> Self {
        ParseError::InvalidValue {
            member: member.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ParseError::Xml(err) => err.code(),
            ParseError::Json(_) => "JSONParserError",
            ParseError::InvalidValue { .. } => "SerializationError",
        }
    }

    /// Truncated bodies are the usual cause of unreadable XML and JSON.
    pub fn retryable(&self) -> bool {
        match self {
            ParseError::Xml(err) => err.retryable(),
            ParseError::Json(err) => err.is_eof(),
            ParseError::InvalidValue { .. } => false,
        }
    }
}

const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "RequestThrottledException",
    "TooManyRequestsException",
    "ProvisionedThroughputExceededException",
    "RequestLimitExceeded",
    "PriorRequestNotComplete",
];

/// An error returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    code: String,
    message: Option<String>,
    request_id: Option<String>,
    status_code: u16,
}

impl ServiceError {
    pub fn new(code: impl Into<String>, message: Option<String>, status_code: u16) -> Self {
        ServiceError {
            code: code.into(),
            message,
            request_id: None,
            status_code,
        }
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn retryable(&self) -> bool {
        self.status_code >= 500 || THROTTLING_CODES.contains(&self.code.as_str())
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)?;
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ServiceError {}

/// Either a modeled service error or a response that could not be read.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("service error: {0}")]
    Service(ServiceError),
    #[error("failed to parse response: {0}")]
    Parse(ParseError),
}

impl OperationError {
    pub fn code(&self) -> &str {
        match self {
            OperationError::Service(err) => err.code(),
            OperationError::Parse(err) => err.code(),
        }
    }

    pub fn retryable(&self) -> bool {
        match self {
            OperationError::Service(err) => err.retryable(),
            OperationError::Parse(err) => err.retryable(),
        }
    }
}

/// Canonical reason phrase for a status code, used when an error body is unreadable.
pub(crate) fn status_message(status: http::StatusCode) -> Option<String> {
    status.canonical_reason().map(str::to_string)
}

/// Request id from the headers services use for it.
pub(crate) fn header_request_id(response: &http::Response<Bytes>) -> Option<String> {
    ["x-amzn-requestid", "x-amz-request-id"]
        .iter()
        .find_map(|name| crate::header::read_one(response.headers(), name))
        .map(str::to_string)
}

/// Renders a scalar for a header, URI label, query string or XML text node.
pub(crate) fn scalar_to_string(
    api: &ApiMetadata,
    shape: &Shape,
    value: &Value,
    member: &str,
) -> Result<String, BuildError> {
    let rendered = match (shape.kind(), value) {
        (ShapeKind::Timestamp, Value::Timestamp(instant)) => {
            instant.fmt(api.timestamp_format_for(shape))
        }
        (ShapeKind::Blob, Value::Blob(blob)) => base64::encode(blob),
        (ShapeKind::Blob, Value::String(s)) => base64::encode(s),
        (ShapeKind::Boolean, Value::Bool(b)) => b.to_string(),
        (ShapeKind::Integer, Value::Integer(i)) => i.to_string(),
        (ShapeKind::Float, Value::Float(f)) => f.to_string(),
        (ShapeKind::Float, Value::Integer(i)) => i.to_string(),
        (ShapeKind::String, Value::String(s)) => s.clone(),
        (ShapeKind::String, Value::Integer(i)) => i.to_string(),
        (ShapeKind::String, Value::Float(f)) => f.to_string(),
        (ShapeKind::String, Value::Bool(b)) => b.to_string(),
        (kind, value) => {
            return Err(BuildError::invalid(
                member,
                format!("cannot write {:?} as {}", value, kind_name(kind)),
            ))
        }
    };
    Ok(rendered)
}

/// Reads a scalar out of a header, XML text node or XML attribute.
pub(crate) fn scalar_from_str(
    api: &ApiMetadata,
    shape: &Shape,
    text: &str,
    member: &str,
) -> Result<Value, ParseError> {
    let value = match shape.kind() {
        ShapeKind::String => Value::String(text.to_string()),
        ShapeKind::Integer => Value::Integer(
            text.trim()
                .parse()
                .map_err(|_| ParseError::invalid(member, format!("`{}` is not an integer", text)))?,
        ),
        ShapeKind::Float => Value::Float(
            text.trim()
                .parse()
                .map_err(|_| ParseError::invalid(member, format!("`{}` is not a number", text)))?,
        ),
        ShapeKind::Boolean => Value::Bool(text.trim() == "true"),
        ShapeKind::Timestamp => Value::Timestamp(parse_timestamp(
            text,
            api.timestamp_format_for(shape),
            member,
        )?),
        ShapeKind::Blob => Value::Blob(Blob::new(decode_base64(text, member)?)),
        other => {
            return Err(ParseError::invalid(
                member,
                format!("{} is not a scalar", kind_name(other)),
            ))
        }
    };
    Ok(value)
}

/// Parses a timestamp in `format`, falling back to the other formats services are known to send.
pub(crate) fn parse_timestamp(text: &str, format: Format, member: &str) -> Result<Instant, ParseError> {
    let text = text.trim();
    if text.parse::<f64>().is_ok() {
        return Instant::from_str(text, Format::EpochSeconds)
            .map_err(|err| ParseError::invalid(member, err.to_string()));
    }
    [format, Format::DateTime, Format::HttpDate]
        .iter()
        .find_map(|format| Instant::from_str(text, *format).ok())
        .ok_or_else(|| ParseError::invalid(member, format!("`{}` is not a timestamp", text)))
}

pub(crate) fn decode_base64(text: &str, member: &str) -> Result<Vec<u8>, ParseError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    base64::decode(&compact).map_err(|err| ParseError::invalid(member, err.to_string()))
}

pub(crate) fn kind_name(kind: &ShapeKind) -> &'static str {
    match kind {
        ShapeKind::Structure { .. } => "structure",
        ShapeKind::List { .. } => "list",
        ShapeKind::Map { .. } => "map",
        ShapeKind::String => "string",
        ShapeKind::Integer => "integer",
        ShapeKind::Float => "float",
        ShapeKind::Boolean => "boolean",
        ShapeKind::Timestamp => "timestamp",
        ShapeKind::Blob => "blob",
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shape::Location;

    fn api() -> ApiMetadata {
        ApiMetadata::new(ProtocolName::RestXml, "2006-03-01", "s3")
    }

    #[test]
    fn scalars_render_per_location() {
        let api = api();
        let when = Value::Timestamp(Instant::from_epoch_seconds(1576540098));
        let header = Shape::timestamp().with_location(Location::Header);
        assert_eq!(
            scalar_to_string(&api, &header, &when, "When").unwrap(),
            "Mon, 16 Dec 2019 23:48:18 GMT"
        );
        assert_eq!(
            scalar_to_string(&api, &Shape::timestamp(), &when, "When").unwrap(),
            "2019-12-16T23:48:18Z"
        );
        assert_eq!(
            scalar_to_string(&api, &Shape::blob(), &Value::from("foo"), "B").unwrap(),
            "Zm9v"
        );
        let err = scalar_to_string(&api, &Shape::integer(), &Value::from("x"), "Count")
            .expect_err("type mismatch");
        assert_eq!(err.code(), "InvalidParameter");
    }

    #[test]
    fn scalars_parse_from_text() {
        let api = api();
        assert_eq!(
            scalar_from_str(&api, &Shape::integer(), " 42 ", "N").unwrap(),
            Value::Integer(42)
        );
        assert_eq!(
            scalar_from_str(&api, &Shape::boolean(), "false", "B").unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            scalar_from_str(&api, &Shape::timestamp(), "1576540098", "T").unwrap(),
            Value::Timestamp(Instant::from_epoch_seconds(1576540098))
        );
        assert_eq!(
            scalar_from_str(&api, &Shape::timestamp(), "Mon, 16 Dec 2019 23:48:18 GMT", "T")
                .unwrap(),
            Value::Timestamp(Instant::from_epoch_seconds(1576540098))
        );
        assert_eq!(
            scalar_from_str(&api, &Shape::blob(), "Zm9v\n", "B").unwrap(),
            Value::Blob(Blob::new("foo"))
        );
        assert!(scalar_from_str(&api, &Shape::integer(), "abc", "N").is_err());
    }

    #[test]
    fn service_error_retryability() {
        assert!(ServiceError::new("InternalError", None, 500).retryable());
        assert!(ServiceError::new("Throttling", None, 400).retryable());
        assert!(!ServiceError::new("ValidationError", None, 400).retryable());
        assert_eq!(
            ServiceError::new("NoSuchKey", Some("gone".into()), 404).to_string(),
            "NoSuchKey: gone"
        );
    }
}
