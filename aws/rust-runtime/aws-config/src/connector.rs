/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Functionality related to creating new HTTP Connectors

use bytes::Bytes;
use hyper::client::connect::Connect;
use smithy_http::connector::{BoxFuture, ConnectorError, HttpConnector, SharedHttpConnector};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// [`HttpConnector`] backed by a hyper client.
///
/// Every request is bounded by a timeout covering the connect, the response head and the body.
/// Exceeding it produces a [`ConnectorError`] for which `is_timeout()` is true.
#[derive(Clone)]
pub struct HyperConnector<C> {
    client: hyper::Client<C, hyper::Body>,
    timeout: Duration,
}

impl<C> fmt::Debug for HyperConnector<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperConnector")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl<C> HyperConnector<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    pub fn new(connector: C) -> Self {
        HyperConnector {
            client: hyper::Client::builder().build(connector),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl<C> HttpConnector for HyperConnector<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    fn call(
        &self,
        request: http::Request<Bytes>,
    ) -> BoxFuture<Result<http::Response<Bytes>, ConnectorError>> {
        let client = self.client.clone();
        let timeout = self.timeout;
        Box::pin(async move {
            let send = async {
                let response = client
                    .request(request.map(hyper::Body::from))
                    .await
                    .map_err(classify)?;
                let (parts, body) = response.into_parts();
                let body = hyper::body::to_bytes(body).await.map_err(classify)?;
                Ok(http::Response::from_parts(parts, body))
            };
            match tokio::time::timeout(timeout, send).await {
                Ok(result) => result,
                Err(elapsed) => Err(ConnectorError::timeout(Box::new(elapsed))),
            }
        })
    }
}

fn classify(err: hyper::Error) -> ConnectorError {
    if err.is_timeout() {
        ConnectorError::timeout(Box::new(err))
    } else if err.is_connect() || err.is_closed() || err.is_incomplete_message() {
        ConnectorError::io(Box::new(err))
    } else if err.is_user() {
        ConnectorError::user(Box::new(err))
    } else {
        ConnectorError::other(Box::new(err))
    }
}

/// The connector used when none is configured: HTTPS through rustls with the platform's root
/// certificates.
#[cfg(feature = "rustls")]
pub fn default_connector() -> Option<SharedHttpConnector> {
    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .build();
    Some(Arc::new(HyperConnector::new(https)))
}

/// Without TLS support only plain HTTP endpoints (instance metadata, container credentials)
/// can be reached.
#[cfg(not(feature = "rustls"))]
pub fn default_connector() -> Option<SharedHttpConnector> {
    Some(Arc::new(HyperConnector::new(
        hyper::client::HttpConnector::new(),
    )))
}
