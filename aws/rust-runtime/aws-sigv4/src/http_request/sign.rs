/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use super::canonical_request::{header, param, CanonicalRequest, StringToSign, HMAC_256};
use super::error::{CanonicalRequestError, SigningError};
use super::settings::{SignatureLocation, SigningParams, DEFAULT_PRESIGN_EXPIRY, MAX_PRESIGN_EXPIRY};
use super::url_escape::percent_encode;
use super::PayloadChecksumKind;
use crate::sign::{calculate_signature, sha256_hex_string};
use crate::SigningOutput;
use http::header::{HeaderName, HeaderValue, InvalidHeaderValue};
use http::uri::PathAndQuery;
use http::{HeaderMap, Method, Uri};
use std::convert::TryFrom;

/// Represents all of the information necessary to sign an HTTP request.
#[derive(Debug)]
#[non_exhaustive]
pub struct SignableRequest<'a> {
    method: &'a Method,
    uri: &'a Uri,
    headers: &'a HeaderMap<HeaderValue>,
    body: SignableBody<'a>,
}

impl<'a> SignableRequest<'a> {
    pub fn new(
        method: &'a Method,
        uri: &'a Uri,
        headers: &'a HeaderMap<HeaderValue>,
        body: SignableBody<'a>,
    ) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
        }
    }

    pub fn uri(&self) -> &Uri {
        self.uri
    }

    pub fn method(&self) -> &Method {
        self.method
    }

    pub fn headers(&self) -> &HeaderMap<HeaderValue> {
        self.headers
    }

    pub fn body(&self) -> &SignableBody<'_> {
        &self.body
    }
}

impl<'a, B> From<&'a http::Request<B>> for SignableRequest<'a>
where
    B: 'a,
    B: AsRef<[u8]>,
{
    fn from(request: &'a http::Request<B>) -> SignableRequest<'a> {
        SignableRequest::new(
            request.method(),
            request.uri(),
            request.headers(),
            SignableBody::Bytes(request.body().as_ref()),
        )
    }
}

/// A signable HTTP request body
#[derive(Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum SignableBody<'a> {
    /// A body composed of a slice of bytes
    Bytes(&'a [u8]),

    /// An unsigned payload
    ///
    /// UnsignedPayload is used for streaming requests where the contents of the body cannot be
    /// known prior to signing
    UnsignedPayload,

    /// A precomputed body checksum. The checksum should be a SHA256 checksum of the body,
    /// lowercase hex encoded. Eg:
    /// `e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855`
    Precomputed(String),
}

/// Instructions for applying a signature to an HTTP request.
#[derive(Debug)]
pub struct SigningInstructions {
    headers: Option<HeaderMap<HeaderValue>>,
    params: Option<Vec<(String, String)>>,
}

impl SigningInstructions {
    fn new(headers: Option<HeaderMap<HeaderValue>>, params: Option<Vec<(String, String)>>) -> Self {
        Self { headers, params }
    }

    /// Headers to add to the request when signing with headers.
    pub fn headers(&self) -> Option<&HeaderMap<HeaderValue>> {
        self.headers.as_ref()
    }

    /// Query parameters to add to the request when presigning.
    pub fn params(&self) -> Option<&Vec<(String, String)>> {
        self.params.as_ref()
    }

    /// Applies the instructions to the given `request`.
    pub fn apply_to_request<B>(self, request: &mut http::Request<B>) -> Result<(), SigningError> {
        if let Some(new_headers) = self.headers {
            for (name, value) in new_headers.iter() {
                request.headers_mut().insert(name.clone(), value.clone());
            }
        }
        if let Some(params) = self.params {
            let uri = append_query(request.uri(), &params).map_err(CanonicalRequestError::from)?;
            *request.uri_mut() = uri;
        }
        Ok(())
    }
}

fn append_query(uri: &Uri, params: &[(String, String)]) -> Result<Uri, http::uri::InvalidUri> {
    let mut path_and_query = uri.path().to_string();
    let mut separator = '?';
    if let Some(query) = uri.query() {
        path_and_query.push('?');
        path_and_query.push_str(query);
        separator = '&';
    }
    for (name, value) in params {
        path_and_query.push(separator);
        path_and_query.push_str(&percent_encode(name));
        path_and_query.push('=');
        path_and_query.push_str(&percent_encode(value));
        separator = '&';
    }
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query.as_str())?);
    // Parts with a path but no scheme/authority always form a valid URI
    Ok(Uri::from_parts(parts).unwrap_or_else(|_| uri.clone()))
}

/// Produces a signature for the given `request` and returns instructions
/// that can be used to apply that signature to an HTTP request.
///
/// With [`SignatureLocation::QueryParams`] the request is presigned: the expiry must not exceed
/// [`MAX_PRESIGN_EXPIRY`] and defaults to [`DEFAULT_PRESIGN_EXPIRY`].
pub fn sign<'a>(
    request: SignableRequest<'a>,
    params: &'a SigningParams<'a>,
) -> Result<SigningOutput<SigningInstructions>, SigningError> {
    tracing::trace!(request = ?request, params = ?params, "signing request");
    match params.settings.signature_location {
        SignatureLocation::Headers => {
            let (signing_headers, signature) =
                calculate_signing_headers(&request, params)?.into_parts();
            Ok(SigningOutput::new(
                SigningInstructions::new(Some(signing_headers), None),
                signature,
            ))
        }
        SignatureLocation::QueryParams => {
            let expires_in = params.settings.expires_in.unwrap_or(DEFAULT_PRESIGN_EXPIRY);
            if expires_in > MAX_PRESIGN_EXPIRY {
                return Err(SigningError::invalid_expiry_time(expires_in));
            }
            let (params, signature) =
                calculate_signing_params(&request, params, expires_in.as_secs())?;
            Ok(SigningOutput::new(
                SigningInstructions::new(None, Some(params)),
                signature,
            ))
        }
    }
}

fn signature(creq: &CanonicalRequest<'_>, params: &SigningParams<'_>) -> (String, String) {
    let encoded_creq = sha256_hex_string(creq.to_string().as_bytes());
    let string_to_sign = StringToSign::new(
        params.time,
        params.region,
        params.service_name,
        &encoded_creq,
    )
    .to_string();
    let signature = calculate_signature(params.signing_key(), string_to_sign.as_bytes());
    tracing::trace!(
        canonical_request = %creq,
        string_to_sign = %string_to_sign,
        "calculated signature"
    );
    (signature, string_to_sign)
}

fn calculate_signing_params(
    request: &SignableRequest<'_>,
    params: &SigningParams<'_>,
    expires_in: u64,
) -> Result<(Vec<(String, String)>, String), SigningError> {
    let creq = CanonicalRequest::from(request, params, Some(expires_in))?;
    let (signature, _) = signature(&creq, params);
    let mut query_params = creq.query_params;
    query_params.push((param::X_AMZ_SIGNATURE.to_string(), signature.clone()));
    Ok((query_params, signature))
}

/// Calculates the headers that need to get added to the given `request`: `authorization`,
/// `x-amz-date`, and when applicable `x-amz-security-token` and `x-amz-content-sha256`.
fn calculate_signing_headers(
    request: &SignableRequest<'_>,
    params: &SigningParams<'_>,
) -> Result<SigningOutput<HeaderMap<HeaderValue>>, SigningError> {
    let creq = CanonicalRequest::from(request, params, None)?;
    let (signature, _) = signature(&creq, params);

    let mut headers = HeaderMap::new();
    add_header(&mut headers, header::X_AMZ_DATE, &creq.date_time, false)?;
    add_header(
        &mut headers,
        "authorization",
        &build_authorization_header(params, &creq, &signature),
        true,
    )?;
    if params.settings.payload_checksum_kind == PayloadChecksumKind::XAmzSha256 {
        add_header(
            &mut headers,
            header::X_AMZ_CONTENT_SHA_256,
            &creq.content_sha256,
            false,
        )?;
    }
    if let Some(security_token) = params.security_token {
        add_header(&mut headers, header::X_AMZ_SECURITY_TOKEN, security_token, true)?;
    }
    Ok(SigningOutput::new(headers, signature))
}

fn add_header(
    map: &mut HeaderMap<HeaderValue>,
    key: &'static str,
    value: &str,
    sensitive: bool,
) -> Result<(), CanonicalRequestError> {
    let mut value = HeaderValue::try_from(value)
        .map_err(|_: InvalidHeaderValue| CanonicalRequestError::invalid_header(key))?;
    value.set_sensitive(sensitive);
    map.insert(HeaderName::from_static(key), value);
    Ok(())
}

// Authorization: algorithm Credential=access key ID/credential scope, SignedHeaders=SignedHeaders, Signature=signature
fn build_authorization_header(
    params: &SigningParams<'_>,
    creq: &CanonicalRequest<'_>,
    signature: &str,
) -> String {
    let scope = super::canonical_request::Scope::new(params.time, params.region, params.service_name);
    format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        HMAC_256, params.access_key, scope, creq.signed_headers, signature
    )
}
