/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Types shared by the protocol marshalers: timestamps, blobs and the untyped [`Value`] tree
//! that operation parameters and results are expressed in.

pub mod instant;
mod value;

pub use crate::instant::Instant;
pub use crate::value::Value;

/// Binary data.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Blob {
    inner: Vec<u8>,
}

impl Blob {
    pub fn new<T: Into<Vec<u8>>>(input: T) -> Self {
        Blob {
            inner: input.into(),
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.inner
    }
}

impl AsRef<[u8]> for Blob {
    fn as_ref(&self) -> &[u8] {
        &self.inner
    }
}
