/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use super::error::CanonicalRequestError;
use super::settings::{PayloadChecksumKind, SignatureLocation, SigningParams, UriEncoding};
use super::sign::{SignableBody, SignableRequest};
use super::url_escape::{percent_encode, percent_encode_path};
use crate::date_fmt::{format_date, format_date_time};
use crate::sign::sha256_hex_string;
use http::header::HOST;
use http::Method;
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

pub(crate) const HMAC_256: &str = "AWS4-HMAC-SHA256";

const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

pub(crate) mod header {
    pub(crate) const X_AMZ_CONTENT_SHA_256: &str = "x-amz-content-sha256";
    pub(crate) const X_AMZ_DATE: &str = "x-amz-date";
    pub(crate) const X_AMZ_SECURITY_TOKEN: &str = "x-amz-security-token";
}

pub(crate) mod param {
    pub(crate) const X_AMZ_ALGORITHM: &str = "X-Amz-Algorithm";
    pub(crate) const X_AMZ_CREDENTIAL: &str = "X-Amz-Credential";
    pub(crate) const X_AMZ_DATE: &str = "X-Amz-Date";
    pub(crate) const X_AMZ_EXPIRES: &str = "X-Amz-Expires";
    pub(crate) const X_AMZ_SECURITY_TOKEN: &str = "X-Amz-Security-Token";
    pub(crate) const X_AMZ_SIGNED_HEADERS: &str = "X-Amz-SignedHeaders";
    pub(crate) const X_AMZ_SIGNATURE: &str = "X-Amz-Signature";
}

/// Headers that are never part of a signature. Proxies and transports may add or rewrite them.
const UNSIGNABLE_HEADERS: &[&str] = &[
    "authorization",
    "content-type",
    "content-length",
    "user-agent",
    "expect",
    "x-amzn-trace-id",
    "presigned-expires",
];

/// Headers that move into the query string when presigning, under these names.
const HOISTED_HEADERS: &[(&str, &str)] = &[("content-type", "Content-Type"), ("content-md5", "Content-MD5")];

fn is_signable(name: &str) -> bool {
    !UNSIGNABLE_HEADERS.contains(&name)
}

#[derive(Debug, PartialEq)]
pub(crate) struct CanonicalRequest<'a> {
    pub(crate) method: &'a Method,
    pub(crate) path: String,
    pub(crate) params: String,
    /// Lowercase name to canonical value, sorted by name.
    pub(crate) headers: BTreeMap<String, String>,
    pub(crate) signed_headers: String,
    pub(crate) content_sha256: String,
    pub(crate) date_time: String,
    /// Presigning parameters to append to the request, without the signature.
    pub(crate) query_params: Vec<(String, String)>,
}

impl<'a> CanonicalRequest<'a> {
    /// Puts `req` into canonical form.
    ///
    /// When signing with headers, `host`, `x-amz-date`, `x-amz-security-token` (with a session
    /// token) and `x-amz-content-sha256` (with [`PayloadChecksumKind::XAmzSha256`]) are signed in
    /// addition to the request's own signable headers. When presigning, the `X-Amz-*` parameters,
    /// `Content-Type`, `Content-MD5` and any `x-amz-*` request headers are signed as query
    /// parameters instead.
    pub(crate) fn from(
        req: &'a SignableRequest<'a>,
        params: &SigningParams<'_>,
        expires_in: Option<u64>,
    ) -> Result<CanonicalRequest<'a>, CanonicalRequestError> {
        let settings = &params.settings;
        let presigning = settings.signature_location == SignatureLocation::QueryParams;
        let date_time = format_date_time(params.time);
        let content_sha256 = Self::payload_hash(req)?;

        let path = req.uri().path();
        let path = match settings.uri_encoding {
            UriEncoding::Double => percent_encode_path(path),
            UriEncoding::Single => path.to_string(),
        };
        let path = if path.is_empty() { "/".to_string() } else { path };

        let mut headers = BTreeMap::new();
        let mut hoisted = Vec::new();
        for name in req.headers().keys() {
            let name = name.as_str();
            if presigning {
                if let Some((_, param)) = HOISTED_HEADERS.iter().find(|(h, _)| *h == name) {
                    hoisted.push((param.to_string(), Self::header_value(req, name)?));
                    continue;
                }
                if name.starts_with("x-amz-") {
                    hoisted.push((name.to_string(), Self::header_value(req, name)?));
                    continue;
                }
            }
            if is_signable(name) {
                headers.insert(name.to_string(), Self::header_value(req, name)?);
            }
        }
        if !headers.contains_key(HOST.as_str()) {
            let authority = req
                .uri()
                .authority()
                .ok_or_else(CanonicalRequestError::missing_host)?;
            headers.insert(HOST.as_str().to_string(), authority.as_str().to_string());
        }
        if !presigning {
            headers.insert(header::X_AMZ_DATE.to_string(), date_time.clone());
            if let Some(token) = params.security_token {
                headers.insert(header::X_AMZ_SECURITY_TOKEN.to_string(), token.to_string());
            }
            if settings.payload_checksum_kind == PayloadChecksumKind::XAmzSha256 {
                headers.insert(
                    header::X_AMZ_CONTENT_SHA_256.to_string(),
                    content_sha256.clone(),
                );
            }
        }
        let signed_headers = headers.keys().cloned().collect::<Vec<_>>().join(";");

        let mut query_params = Vec::new();
        if presigning {
            let scope = Scope::new(params.time, params.region, params.service_name);
            query_params.push((param::X_AMZ_ALGORITHM.to_string(), HMAC_256.to_string()));
            query_params.push((
                param::X_AMZ_CREDENTIAL.to_string(),
                format!("{}/{}", params.access_key, scope),
            ));
            query_params.push((param::X_AMZ_DATE.to_string(), date_time.clone()));
            query_params.push((
                param::X_AMZ_EXPIRES.to_string(),
                expires_in.unwrap_or_default().to_string(),
            ));
            query_params.push((param::X_AMZ_SIGNED_HEADERS.to_string(), signed_headers.clone()));
            if let Some(token) = params.security_token {
                query_params.push((param::X_AMZ_SECURITY_TOKEN.to_string(), token.to_string()));
            }
            query_params.extend(hoisted);
        }

        Ok(CanonicalRequest {
            method: req.method(),
            path,
            params: Self::params(req, &query_params),
            headers,
            signed_headers,
            content_sha256,
            date_time,
            query_params,
        })
    }

    /// Computed once per signing; an `x-amz-content-sha256` header already on the request wins.
    fn payload_hash(req: &SignableRequest<'_>) -> Result<String, CanonicalRequestError> {
        if req.headers().contains_key(header::X_AMZ_CONTENT_SHA_256) {
            return Self::header_value(req, header::X_AMZ_CONTENT_SHA_256);
        }
        Ok(match req.body() {
            SignableBody::Bytes(data) => sha256_hex_string(data),
            SignableBody::Precomputed(digest) => digest.clone(),
            SignableBody::UnsignedPayload => UNSIGNED_PAYLOAD.to_string(),
        })
    }

    /// Joins every value of `name` with `,`, trimming each and collapsing runs of whitespace.
    fn header_value(req: &SignableRequest<'_>, name: &str) -> Result<String, CanonicalRequestError> {
        let mut values = Vec::new();
        for value in req.headers().get_all(name) {
            let value = value
                .to_str()
                .map_err(|_| CanonicalRequestError::invalid_header(name))?;
            values.push(value.split_whitespace().collect::<Vec<_>>().join(" "));
        }
        Ok(values.join(","))
    }

    /// Sorted by name, then value. Names and values are decoded, then re-encoded uniformly.
    fn params(req: &SignableRequest<'_>, extra: &[(String, String)]) -> String {
        let mut params: Vec<(String, String)> = req
            .uri()
            .query()
            .map(|query| {
                form_urlencoded::parse(query.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();
        params.extend(extra.iter().cloned());
        params.sort();
        params
            .iter()
            .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<'a> fmt::Display for CanonicalRequest<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.method)?;
        writeln!(f, "{}", self.path)?;
        writeln!(f, "{}", self.params)?;
        for (name, value) in &self.headers {
            writeln!(f, "{}:{}", name, value)?;
        }
        writeln!(f)?;
        writeln!(f, "{}", self.signed_headers)?;
        write!(f, "{}", self.content_sha256)
    }
}

#[derive(PartialEq, Debug, Clone)]
pub(crate) struct Scope<'a> {
    time: SystemTime,
    region: &'a str,
    service: &'a str,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(time: SystemTime, region: &'a str, service: &'a str) -> Self {
        Scope {
            time,
            region,
            service,
        }
    }
}

impl<'a> fmt::Display for Scope<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/aws4_request",
            format_date(self.time),
            self.region,
            self.service
        )
    }
}

#[derive(PartialEq, Debug)]
pub(crate) struct StringToSign<'a> {
    pub(crate) scope: Scope<'a>,
    pub(crate) time: SystemTime,
    pub(crate) hashed_creq: &'a str,
}

impl<'a> StringToSign<'a> {
    pub(crate) fn new(
        time: SystemTime,
        region: &'a str,
        service: &'a str,
        hashed_creq: &'a str,
    ) -> Self {
        Self {
            scope: Scope::new(time, region, service),
            time,
            hashed_creq,
        }
    }
}

impl<'a> fmt::Display for StringToSign<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{}\n{}\n{}",
            HMAC_256,
            format_date_time(self.time),
            self.scope,
            self.hashed_creq
        )
    }
}
