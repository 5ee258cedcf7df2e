/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use std::error::Error;
use std::fmt;
use std::time::Duration;

#[derive(Debug)]
enum SigningErrorKind {
    FailedToCreateCanonicalRequest { source: CanonicalRequestError },
    InvalidExpiryTime { expires_in: Duration },
    UnsupportedSigner { name: String },
}

/// Error signing request
#[derive(Debug)]
pub struct SigningError {
    kind: SigningErrorKind,
}

impl SigningError {
    pub(crate) fn invalid_expiry_time(expires_in: Duration) -> Self {
        Self {
            kind: SigningErrorKind::InvalidExpiryTime { expires_in },
        }
    }

    pub(crate) fn unsupported_signer(name: impl Into<String>) -> Self {
        Self {
            kind: SigningErrorKind::UnsupportedSigner { name: name.into() },
        }
    }

    /// A stable identifier for the failure, e.g. `InvalidExpiryTime`.
    pub fn code(&self) -> &'static str {
        use SigningErrorKind::*;
        match &self.kind {
            FailedToCreateCanonicalRequest { source } => source.code(),
            InvalidExpiryTime { .. } => "InvalidExpiryTime",
            UnsupportedSigner { .. } => "UnsupportedSigner",
        }
    }

    /// Signing failures are input errors; retrying the same request cannot succeed.
    pub fn retryable(&self) -> bool {
        false
    }
}

impl fmt::Display for SigningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use SigningErrorKind::*;
        match &self.kind {
            FailedToCreateCanonicalRequest { .. } => {
                write!(f, "failed to create canonical request")
            }
            InvalidExpiryTime { expires_in } => write!(
                f,
                "Presigning does not support expiry time greater than a week with SigV4 signing \
                 (requested {} seconds)",
                expires_in.as_secs()
            ),
            UnsupportedSigner { name } => write!(
                f,
                "Presigning only supports S3 or SigV4 signing (requested `{}`)",
                name
            ),
        }
    }
}

impl Error for SigningError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            SigningErrorKind::FailedToCreateCanonicalRequest { source } => Some(source),
            _ => None,
        }
    }
}

impl From<CanonicalRequestError> for SigningError {
    fn from(source: CanonicalRequestError) -> Self {
        Self {
            kind: SigningErrorKind::FailedToCreateCanonicalRequest { source },
        }
    }
}

#[derive(Debug)]
enum CanonicalRequestErrorKind {
    InvalidHeader { name: String },
    MissingHost,
    InvalidUri { source: http::uri::InvalidUri },
}

/// The request could not be put into canonical form.
#[derive(Debug)]
pub struct CanonicalRequestError {
    kind: CanonicalRequestErrorKind,
}

impl CanonicalRequestError {
    pub(crate) fn invalid_header(name: impl Into<String>) -> Self {
        Self {
            kind: CanonicalRequestErrorKind::InvalidHeader { name: name.into() },
        }
    }

    pub(crate) fn missing_host() -> Self {
        Self {
            kind: CanonicalRequestErrorKind::MissingHost,
        }
    }

    pub fn code(&self) -> &'static str {
        match self.kind {
            CanonicalRequestErrorKind::InvalidHeader { .. } => "InvalidHeader",
            CanonicalRequestErrorKind::MissingHost => "MissingHost",
            CanonicalRequestErrorKind::InvalidUri { .. } => "InvalidUri",
        }
    }
}

impl fmt::Display for CanonicalRequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use CanonicalRequestErrorKind::*;
        match &self.kind {
            InvalidHeader { name } => write!(f, "header `{}` has an invalid value", name),
            MissingHost => write!(
                f,
                "the request has neither a host header nor an authority in its URI"
            ),
            InvalidUri { .. } => write!(f, "the signed URI is invalid"),
        }
    }
}

impl Error for CanonicalRequestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            CanonicalRequestErrorKind::InvalidUri { source } => Some(source),
            _ => None,
        }
    }
}

impl From<http::uri::InvalidUri> for CanonicalRequestError {
    fn from(source: http::uri::InvalidUri) -> Self {
        Self {
            kind: CanonicalRequestErrorKind::InvalidUri { source },
        }
    }
}
