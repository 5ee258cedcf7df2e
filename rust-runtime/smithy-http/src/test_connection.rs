/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Connector that replays canned responses and records what was sent.

use crate::connector::{BoxFuture, ConnectorError, HttpConnector};
use bytes::Bytes;
use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::{Arc, Mutex};

type Exchange = Result<http::Response<Bytes>, ConnectorError>;

/// Replays responses in order. Each call records its request so tests can assert on them.
#[derive(Debug, Clone, Default)]
pub struct TestConnection {
    responses: Arc<Mutex<VecDeque<Exchange>>>,
    requests: Arc<Mutex<Vec<http::Request<Bytes>>>>,
}

impl TestConnection {
    pub fn new(responses: Vec<Exchange>) -> Self {
        TestConnection {
            responses: Arc::new(Mutex::new(responses.into())),
            requests: Default::default(),
        }
    }

    /// Convenience constructor for a sequence of `(status, body)` responses.
    pub fn with_bodies(responses: Vec<(u16, &str)>) -> Self {
        Self::new(
            responses
                .into_iter()
                .map(|(status, body)| Ok(response(status, body)))
                .collect(),
        )
    }

    pub fn requests(&self) -> impl Deref<Target = Vec<http::Request<Bytes>>> + '_ {
        self.requests.lock().unwrap()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

/// Builds a response with the given status and body.
pub fn response(status: u16, body: &str) -> http::Response<Bytes> {
    http::Response::builder()
        .status(status)
        .body(Bytes::copy_from_slice(body.as_bytes()))
        .unwrap()
}

impl HttpConnector for TestConnection {
    fn call(
        &self,
        request: http::Request<Bytes>,
    ) -> BoxFuture<Result<http::Response<Bytes>, ConnectorError>> {
        self.requests.lock().unwrap().push(request);
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ConnectorError::other("no more test responses".into())));
        Box::pin(async move { next })
    }
}
