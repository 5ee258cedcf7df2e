/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! The seam between request construction and the transport that sends requests.

use bytes::Bytes;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type BoxError = Box<dyn Error + Send + Sync>;
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Sends a fully built request and returns the response.
pub trait HttpConnector: Send + Sync + fmt::Debug {
    fn call(
        &self,
        request: http::Request<Bytes>,
    ) -> BoxFuture<Result<http::Response<Bytes>, ConnectorError>>;
}

pub type SharedHttpConnector = Arc<dyn HttpConnector>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectorErrorKind {
    Timeout,
    Io,
    User,
    Other,
}

/// A request that did not produce a response.
#[derive(Debug)]
pub struct ConnectorError {
    kind: ConnectorErrorKind,
    source: BoxError,
}

impl ConnectorError {
    pub fn timeout(source: BoxError) -> Self {
        Self {
            kind: ConnectorErrorKind::Timeout,
            source,
        }
    }

    pub fn io(source: BoxError) -> Self {
        Self {
            kind: ConnectorErrorKind::Io,
            source,
        }
    }

    pub fn user(source: BoxError) -> Self {
        Self {
            kind: ConnectorErrorKind::User,
            source,
        }
    }

    pub fn other(source: BoxError) -> Self {
        Self {
            kind: ConnectorErrorKind::Other,
            source,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ConnectorErrorKind::Timeout
    }

    pub fn is_io(&self) -> bool {
        self.kind == ConnectorErrorKind::Io
    }

    pub fn is_user(&self) -> bool {
        self.kind == ConnectorErrorKind::User
    }
}

impl fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ConnectorErrorKind::Timeout => write!(f, "timeout: {}", self.source),
            ConnectorErrorKind::Io => write!(f, "io error: {}", self.source),
            ConnectorErrorKind::User => write!(f, "user error: {}", self.source),
            ConnectorErrorKind::Other => write!(f, "{}", self.source),
        }
    }
}

impl Error for ConnectorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.source.as_ref())
    }
}
