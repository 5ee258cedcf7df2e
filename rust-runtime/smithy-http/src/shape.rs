/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Read-only model of an API: shapes, operations and service metadata.
//!
//! Shapes are built once from API metadata and shared by every request. A member that refers
//! to a named shape is created with [`Shape::member_of`], which carries over the traits a member
//! inherits (`sensitive`, `streaming`, `timestampFormat`, `flattened`, XML namespace) while
//! leaving location traits for the member to set.

use http::Method;
use smithy_types::instant::Format;

/// Where a member lives in an HTTP message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Body,
    Uri,
    Header,
    /// A map member expanded into one header per key, prefixed by the member's location name.
    Headers,
    QueryString,
    StatusCode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    Structure {
        members: Vec<(String, Shape)>,
        payload: Option<String>,
    },
    List {
        member: Box<Shape>,
    },
    Map {
        key: Box<Shape>,
        value: Box<Shape>,
    },
    String,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Blob,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    kind: ShapeKind,
    location: Location,
    location_name: Option<String>,
    timestamp_format: Option<Format>,
    flattened: bool,
    sensitive: bool,
    streaming: bool,
    xml_attribute: bool,
    xml_namespace: Option<String>,
}

impl Shape {
    fn new(kind: ShapeKind) -> Self {
        Shape {
            kind,
            location: Location::Body,
            location_name: None,
            timestamp_format: None,
            flattened: false,
            sensitive: false,
            streaming: false,
            xml_attribute: false,
            xml_namespace: None,
        }
    }

    pub fn structure() -> Self {
        Shape::new(ShapeKind::Structure {
            members: Vec::new(),
            payload: None,
        })
    }

    pub fn list(member: Shape) -> Self {
        Shape::new(ShapeKind::List {
            member: Box::new(member),
        })
    }

    pub fn map(key: Shape, value: Shape) -> Self {
        Shape::new(ShapeKind::Map {
            key: Box::new(key),
            value: Box::new(value),
        })
    }

    pub fn string() -> Self {
        Shape::new(ShapeKind::String)
    }

    pub fn integer() -> Self {
        Shape::new(ShapeKind::Integer)
    }

    pub fn float() -> Self {
        Shape::new(ShapeKind::Float)
    }

    pub fn boolean() -> Self {
        Shape::new(ShapeKind::Boolean)
    }

    pub fn timestamp() -> Self {
        Shape::new(ShapeKind::Timestamp)
    }

    pub fn blob() -> Self {
        Shape::new(ShapeKind::Blob)
    }

    /// A member targeting the named shape `target`.
    pub fn member_of(target: &Shape) -> Self {
        Shape {
            kind: target.kind.clone(),
            location: Location::Body,
            location_name: None,
            timestamp_format: target.timestamp_format,
            flattened: target.flattened,
            sensitive: target.sensitive,
            streaming: target.streaming,
            xml_attribute: false,
            xml_namespace: target.xml_namespace.clone(),
        }
    }

    /// Appends a structure member. Ignored for non-structures.
    pub fn member(mut self, name: impl Into<String>, shape: Shape) -> Self {
        if let ShapeKind::Structure { members, .. } = &mut self.kind {
            members.push((name.into(), shape));
        }
        self
    }

    /// Marks the structure member `name` as the HTTP payload.
    pub fn payload(mut self, name: impl Into<String>) -> Self {
        if let ShapeKind::Structure { payload, .. } = &mut self.kind {
            *payload = Some(name.into());
        }
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn with_location_name(mut self, name: impl Into<String>) -> Self {
        self.location_name = Some(name.into());
        self
    }

    pub fn with_timestamp_format(mut self, format: Format) -> Self {
        self.timestamp_format = Some(format);
        self
    }

    pub fn with_flattened(mut self, flattened: bool) -> Self {
        self.flattened = flattened;
        self
    }

    pub fn with_sensitive(mut self, sensitive: bool) -> Self {
        self.sensitive = sensitive;
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_xml_attribute(mut self) -> Self {
        self.xml_attribute = true;
        self
    }

    pub fn with_xml_namespace(mut self, uri: impl Into<String>) -> Self {
        self.xml_namespace = Some(uri.into());
        self
    }

    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn location_name(&self) -> Option<&str> {
        self.location_name.as_deref()
    }

    pub fn timestamp_format(&self) -> Option<Format> {
        self.timestamp_format
    }

    pub fn is_flattened(&self) -> bool {
        self.flattened
    }

    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn is_xml_attribute(&self) -> bool {
        self.xml_attribute
    }

    pub fn xml_namespace(&self) -> Option<&str> {
        self.xml_namespace.as_deref()
    }

    /// Structure members in declaration order. Empty for non-structures.
    pub fn members(&self) -> &[(String, Shape)] {
        match &self.kind {
            ShapeKind::Structure { members, .. } => members,
            _ => &[],
        }
    }

    pub fn member_shape(&self, name: &str) -> Option<&Shape> {
        self.members()
            .iter()
            .find(|(member, _)| member == name)
            .map(|(_, shape)| shape)
    }

    /// The payload member, if this structure declares one.
    pub fn payload_member(&self) -> Option<(&str, &Shape)> {
        match &self.kind {
            ShapeKind::Structure {
                payload: Some(payload),
                ..
            } => self
                .member_shape(payload)
                .map(|shape| (payload.as_str(), shape)),
            _ => None,
        }
    }

    /// The wire name of a member: its location name, falling back to the member name.
    pub fn wire_name<'a>(&'a self, member_name: &'a str) -> &'a str {
        self.location_name.as_deref().unwrap_or(member_name)
    }
}

/// Wire protocol named in API metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolName {
    Query,
    RestXml,
    RestJson,
    Json,
}

impl ProtocolName {
    pub fn from_metadata_name(name: &str) -> Option<Self> {
        match name {
            "query" => Some(ProtocolName::Query),
            "rest-xml" => Some(ProtocolName::RestXml),
            "rest-json" => Some(ProtocolName::RestJson),
            "json" => Some(ProtocolName::Json),
            _ => None,
        }
    }

    /// Body timestamp format used when neither the shape nor the API declares one.
    pub fn default_timestamp_format(&self) -> Format {
        match self {
            ProtocolName::Json | ProtocolName::RestJson => Format::EpochSeconds,
            ProtocolName::Query | ProtocolName::RestXml => Format::DateTime,
        }
    }
}

/// Service-wide metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiMetadata {
    pub protocol: ProtocolName,
    pub api_version: String,
    pub signing_name: String,
    pub signature_version: String,
    pub target_prefix: Option<String>,
    pub json_version: Option<String>,
    pub timestamp_format: Option<Format>,
    pub xml_namespace: Option<String>,
    pub xml_no_default_lists: bool,
}

impl ApiMetadata {
    pub fn new(
        protocol: ProtocolName,
        api_version: impl Into<String>,
        signing_name: impl Into<String>,
    ) -> Self {
        ApiMetadata {
            protocol,
            api_version: api_version.into(),
            signing_name: signing_name.into(),
            signature_version: "v4".to_string(),
            target_prefix: None,
            json_version: None,
            timestamp_format: None,
            xml_namespace: None,
            xml_no_default_lists: false,
        }
    }

    /// Resolves the wire format of a timestamp shape.
    ///
    /// A format declared on the shape always wins. Otherwise headers use rfc822, query strings
    /// and URI labels use iso8601, and bodies use the API default, then the protocol default.
    pub fn timestamp_format_for(&self, shape: &Shape) -> Format {
        if let Some(format) = shape.timestamp_format {
            return format;
        }
        match shape.location {
            Location::Header | Location::Headers => Format::HttpDate,
            Location::QueryString | Location::Uri => Format::DateTime,
            Location::Body | Location::StatusCode => self
                .timestamp_format
                .unwrap_or_else(|| self.protocol.default_timestamp_format()),
        }
    }
}

/// A single operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub name: String,
    pub http_method: Method,
    pub request_uri: String,
    pub input: Shape,
    pub output: Shape,
    /// Name of the element wrapping the output in query protocol responses (`<OpResult>`).
    pub result_wrapper: Option<String>,
    /// Overrides the service signature version, e.g. `s3v4`.
    pub signature_version: Option<String>,
    /// Sent without a signature.
    pub unsigned: bool,
}

impl Operation {
    pub fn new(name: impl Into<String>) -> Self {
        Operation {
            name: name.into(),
            http_method: Method::POST,
            request_uri: "/".to_string(),
            input: Shape::structure(),
            output: Shape::structure(),
            result_wrapper: None,
            signature_version: None,
            unsigned: false,
        }
    }

    pub fn http(mut self, method: Method, request_uri: impl Into<String>) -> Self {
        self.http_method = method;
        self.request_uri = request_uri.into();
        self
    }

    pub fn input(mut self, input: Shape) -> Self {
        self.input = input;
        self
    }

    pub fn output(mut self, output: Shape) -> Self {
        self.output = output;
        self
    }

    pub fn result_wrapper(mut self, wrapper: impl Into<String>) -> Self {
        self.result_wrapper = Some(wrapper.into());
        self
    }

    pub fn signature_version(mut self, version: impl Into<String>) -> Self {
        self.signature_version = Some(version.into());
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    /// The signature version that applies to this operation.
    pub fn effective_signature_version<'a>(&'a self, api: &'a ApiMetadata) -> &'a str {
        self.signature_version
            .as_deref()
            .unwrap_or(&api.signature_version)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn members_inherit_traits_from_their_target() {
        let secret = Shape::string().with_sensitive(true);
        let created = Shape::timestamp().with_timestamp_format(Format::EpochSeconds);
        let input = Shape::structure()
            .member("Password", Shape::member_of(&secret))
            .member(
                "Created",
                Shape::member_of(&created)
                    .with_location(Location::Header)
                    .with_location_name("x-created"),
            )
            .member("Overridden", Shape::member_of(&secret).with_sensitive(false));
        assert!(input.member_shape("Password").unwrap().is_sensitive());
        assert!(!input.member_shape("Overridden").unwrap().is_sensitive());
        let created = input.member_shape("Created").unwrap();
        assert_eq!(created.location(), Location::Header);
        assert_eq!(created.timestamp_format(), Some(Format::EpochSeconds));
    }

    #[test]
    fn member_location_is_not_inherited() {
        let header = Shape::string()
            .with_location(Location::Header)
            .with_location_name("x-foo");
        let member = Shape::member_of(&header);
        assert_eq!(member.location(), Location::Body);
        assert_eq!(member.location_name(), None);
    }

    #[test]
    fn timestamp_format_resolution() {
        let json = ApiMetadata::new(ProtocolName::Json, "2012-08-10", "dynamodb");
        let xml = ApiMetadata::new(ProtocolName::RestXml, "2006-03-01", "s3");
        let body = Shape::timestamp();
        let header = Shape::timestamp().with_location(Location::Header);
        let query = Shape::timestamp().with_location(Location::QueryString);
        assert_eq!(json.timestamp_format_for(&body), Format::EpochSeconds);
        assert_eq!(xml.timestamp_format_for(&body), Format::DateTime);
        assert_eq!(json.timestamp_format_for(&header), Format::HttpDate);
        assert_eq!(xml.timestamp_format_for(&query), Format::DateTime);

        let mut declared = xml.clone();
        declared.timestamp_format = Some(Format::EpochSeconds);
        assert_eq!(declared.timestamp_format_for(&body), Format::EpochSeconds);
        assert_eq!(declared.timestamp_format_for(&header), Format::HttpDate);
        assert_eq!(
            xml.timestamp_format_for(&header.clone().with_timestamp_format(Format::DateTime)),
            Format::DateTime
        );
    }

    #[test]
    fn payload_member_lookup() {
        let input = Shape::structure()
            .member("Body", Shape::blob().with_streaming(true))
            .payload("Body");
        let (name, shape) = input.payload_member().unwrap();
        assert_eq!(name, "Body");
        assert!(shape.is_streaming());
        assert!(Shape::structure().payload_member().is_none());
    }
}
