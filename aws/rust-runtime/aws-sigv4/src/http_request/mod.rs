/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Utilities to sign HTTP requests.
//!
//! # Example: Signing an HTTP request
//!
//! ```rust
//! # fn test() -> Result<(), aws_sigv4::http_request::SigningError> {
//! use aws_sigv4::http_request::{sign, SignableRequest, SigningParams, SigningSettings};
//! use std::time::SystemTime;
//!
//! let mut request = http::Request::builder()
//!     .uri("https://some-endpoint.some-region.amazonaws.com")
//!     .body("")
//!     .unwrap();
//! let params = SigningParams::builder()
//!     .access_key("example access key")
//!     .secret_key("example secret key")
//!     .region("us-east-1")
//!     .service_name("exampleservice")
//!     .time(SystemTime::now())
//!     .settings(SigningSettings::default())
//!     .build()
//!     .unwrap();
//! let (instructions, _signature) = sign(SignableRequest::from(&request), &params)?.into_parts();
//! instructions.apply_to_request(&mut request)?;
//! # Ok(())
//! # }
//! ```

mod canonical_request;
mod error;
mod settings;
mod sign;
mod url_escape;

pub use error::{CanonicalRequestError, SigningError};
pub use settings::{
    signing_params, PayloadChecksumKind, SignatureLocation, SignatureVersion, SigningParams,
    SigningSettings, UriEncoding, DEFAULT_PRESIGN_EXPIRY, MAX_PRESIGN_EXPIRY,
};
pub use sign::{sign, SignableBody, SignableRequest, SigningInstructions};
