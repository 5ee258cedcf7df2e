/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Provides functions for calculating SigV4 signing keys and signatures, and for signing or
//! presigning HTTP requests.

#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

mod date_fmt;
pub mod http_request;
pub mod sign;

pub use date_fmt::{format_date, format_date_time};

/// Container for the signed output and the signature.
#[derive(Debug)]
pub struct SigningOutput<T> {
    output: T,
    signature: String,
}

impl<T> SigningOutput<T> {
    pub fn new(output: T, signature: String) -> Self {
        Self { output, signature }
    }

    pub fn output(&self) -> &T {
        &self.output
    }

    /// The signature as a lowercase hex string
    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn into_parts(self) -> (T, String) {
        (self.output, self.signature)
    }
}
