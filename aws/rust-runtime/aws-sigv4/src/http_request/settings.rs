/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use super::error::SigningError;
use crate::sign::SigningKeyCache;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime};

/// Presigned URLs are valid for at most a week.
pub const MAX_PRESIGN_EXPIRY: Duration = Duration::from_secs(604_800);

/// Expiry used when presigning without an explicit `expires_in`.
pub const DEFAULT_PRESIGN_EXPIRY: Duration = Duration::from_secs(900);

/// HTTP signing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct SigningSettings {
    /// How the URI path is encoded in the canonical request
    pub uri_encoding: UriEncoding,

    /// Add an additional checksum header
    pub payload_checksum_kind: PayloadChecksumKind,

    /// Where to put the signature
    pub signature_location: SignatureLocation,

    /// For presigned requests, how long the presigned request is valid for
    pub expires_in: Option<Duration>,

    pub signature_version: SignatureVersion,
}

impl Default for SigningSettings {
    fn default() -> Self {
        Self {
            uri_encoding: UriEncoding::Double,
            payload_checksum_kind: PayloadChecksumKind::NoHeader,
            signature_location: SignatureLocation::Headers,
            expires_in: None,
            signature_version: SignatureVersion::V4,
        }
    }
}

impl SigningSettings {
    /// Settings for `service` signed with `signature_version`.
    ///
    /// S3, and anything signed with `s3v4`, encodes the URI path once; every other service
    /// double-encodes it.
    pub fn for_service(service: &str, signature_version: SignatureVersion) -> Self {
        let uri_encoding = if service == "s3" || signature_version == SignatureVersion::S3v4 {
            UriEncoding::Single
        } else {
            UriEncoding::Double
        };
        Self {
            uri_encoding,
            signature_version,
            ..Default::default()
        }
    }

    /// Switches to query-parameter signing with the given expiry.
    pub fn presigned(mut self, expires_in: Duration) -> Self {
        self.signature_location = SignatureLocation::QueryParams;
        self.expires_in = Some(expires_in);
        self
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PayloadChecksumKind {
    /// Add x-amz-checksum-sha256 to the canonical request
    ///
    /// This setting is required for S3
    XAmzSha256,

    /// Do not add an additional header when creating the canonical request
    ///
    /// This is "normal mode" and will work for services other than S3
    NoHeader,
}

/// Config value to specify how to encode the request URL when signing.
///
/// We assume the URI will be encoded _once_ prior to transmission. Some services
/// do not decode the path prior to checking the signature, requiring clients to actually
/// _double-encode_ the URI in creating the canonical request in order to pass a signature check.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum UriEncoding {
    /// Re-encode the resulting URL (eg. %30 becomes `%2530)
    Double,

    /// Take the resulting URL as-is
    Single,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SignatureLocation {
    /// Place the signature in the `authorization` header
    Headers,
    /// Presign: place the signature in the query string
    QueryParams,
}

/// The signature versions this crate signs with. All of them use SigV4 arithmetic; they differ
/// in URI encoding.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SignatureVersion {
    V4,
    S3,
    S3v4,
}

impl SignatureVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureVersion::V4 => "v4",
            SignatureVersion::S3 => "s3",
            SignatureVersion::S3v4 => "s3v4",
        }
    }
}

impl fmt::Display for SignatureVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureVersion {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v4" => Ok(SignatureVersion::V4),
            "s3" => Ok(SignatureVersion::S3),
            "s3v4" => Ok(SignatureVersion::S3v4),
            other => Err(SigningError::unsupported_signer(other)),
        }
    }
}

/// Parameters to use when signing.
#[non_exhaustive]
pub struct SigningParams<'a> {
    pub(crate) access_key: &'a str,
    pub(crate) secret_key: &'a str,
    pub(crate) security_token: Option<&'a str>,
    pub(crate) region: &'a str,
    pub(crate) service_name: &'a str,
    pub(crate) time: SystemTime,
    pub(crate) settings: SigningSettings,
    pub(crate) key_cache: Option<&'a SigningKeyCache>,
}

impl fmt::Debug for SigningParams<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningParams")
            .field("access_key", &self.access_key)
            .field("secret_key", &"** redacted **")
            .field(
                "security_token",
                &self.security_token.map(|_| "** redacted **"),
            )
            .field("region", &self.region)
            .field("service_name", &self.service_name)
            .field("time", &self.time)
            .field("settings", &self.settings)
            .finish()
    }
}

impl<'a> SigningParams<'a> {
    /// Returns a builder that can create new `SigningParams`.
    pub fn builder() -> signing_params::Builder<'a> {
        Default::default()
    }

    pub fn region(&self) -> &str {
        self.region
    }

    pub fn service_name(&self) -> &str {
        self.service_name
    }

    pub(crate) fn signing_key(&self) -> crate::sign::SigningKey {
        match self.key_cache {
            Some(cache) => cache.get_or_generate(
                self.access_key,
                self.secret_key,
                self.time,
                self.region,
                self.service_name,
            ),
            None => crate::sign::generate_signing_key(
                self.secret_key,
                self.time,
                self.region,
                self.service_name,
            ),
        }
    }
}

/// Builder and error for creating [`SigningParams`]
pub mod signing_params {
    use super::{SigningParams, SigningSettings};
    use crate::sign::SigningKeyCache;
    use std::error::Error;
    use std::fmt;
    use std::time::SystemTime;

    /// [`SigningParams`] builder error
    #[derive(Debug)]
    pub struct BuildError {
        reason: &'static str,
    }

    impl BuildError {
        fn new(reason: &'static str) -> Self {
            Self { reason }
        }
    }

    impl fmt::Display for BuildError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.reason)
        }
    }

    impl Error for BuildError {}

    /// Builder that can create new [`SigningParams`]
    #[derive(Debug, Default)]
    pub struct Builder<'a> {
        access_key: Option<&'a str>,
        secret_key: Option<&'a str>,
        security_token: Option<&'a str>,
        region: Option<&'a str>,
        service_name: Option<&'a str>,
        time: Option<SystemTime>,
        settings: Option<SigningSettings>,
        key_cache: Option<&'a SigningKeyCache>,
    }

    impl<'a> Builder<'a> {
        pub fn access_key(mut self, access_key: &'a str) -> Self {
            self.access_key = Some(access_key);
            self
        }

        pub fn secret_key(mut self, secret_key: &'a str) -> Self {
            self.secret_key = Some(secret_key);
            self
        }

        pub fn security_token(mut self, security_token: &'a str) -> Self {
            self.security_token = Some(security_token);
            self
        }

        pub fn set_security_token(&mut self, security_token: Option<&'a str>) -> &mut Self {
            self.security_token = security_token;
            self
        }

        pub fn region(mut self, region: &'a str) -> Self {
            self.region = Some(region);
            self
        }

        pub fn service_name(mut self, service_name: &'a str) -> Self {
            self.service_name = Some(service_name);
            self
        }

        pub fn time(mut self, time: SystemTime) -> Self {
            self.time = Some(time);
            self
        }

        pub fn settings(mut self, settings: SigningSettings) -> Self {
            self.settings = Some(settings);
            self
        }

        /// Reuse derived signing keys across signings.
        pub fn key_cache(mut self, cache: &'a SigningKeyCache) -> Self {
            self.key_cache = Some(cache);
            self
        }

        /// Builds an instance of [`SigningParams`]. Will yield a [`BuildError`] if
        /// a required argument was not given.
        pub fn build(self) -> Result<SigningParams<'a>, BuildError> {
            Ok(SigningParams {
                access_key: self
                    .access_key
                    .ok_or_else(|| BuildError::new("access key is required"))?,
                secret_key: self
                    .secret_key
                    .ok_or_else(|| BuildError::new("secret key is required"))?,
                security_token: self.security_token,
                region: self
                    .region
                    .ok_or_else(|| BuildError::new("region is required"))?,
                service_name: self
                    .service_name
                    .ok_or_else(|| BuildError::new("service name is required"))?,
                time: self
                    .time
                    .ok_or_else(|| BuildError::new("time is required"))?,
                settings: self.settings.unwrap_or_default(),
                key_cache: self.key_cache,
            })
        }
    }
}
