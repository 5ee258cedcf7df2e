/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! EC2 Instance Metadata Service (IMDS)
//!
//! Requests use an IMDSv2 session token when the service grants one. When the token request is
//! rejected with 403, 404 or 405 the client falls back to unauthenticated IMDSv1 requests.

pub mod credentials;

pub use credentials::ImdsCredentialsProvider;

use crate::http_provider::HttpCredentialProvider;
use aws_types::credential::CredentialsError;
use aws_types::os_shim_internal::Env;
use aws_types::time_source::SharedTimeSource;
use bytes::Bytes;
use http::{HeaderValue, Method, Response, StatusCode, Uri};
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;

pub(crate) mod env {
    pub const EC2_METADATA_DISABLED: &str = "AWS_EC2_METADATA_DISABLED";
    pub const ENDPOINT: &str = "AWS_EC2_METADATA_SERVICE_ENDPOINT";
}

const DEFAULT_ENDPOINT: &str = "http://169.254.169.254";
const TOKEN_PATH: &str = "/latest/api/token";
const TOKEN_TTL_HEADER: &str = "x-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_HEADER: &str = "x-aws-ec2-metadata-token";
const TOKEN_TTL: Duration = Duration::from_secs(21600);

/// `AWS_EC2_METADATA_DISABLED=true` turns off every IMDS lookup
pub(crate) fn imds_disabled(env: &Env) -> bool {
    match env.get(env::EC2_METADATA_DISABLED) {
        Ok(value) => value.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// The endpoint from `AWS_EC2_METADATA_SERVICE_ENDPOINT`, or `http://169.254.169.254`
pub(crate) fn endpoint(env: &Env) -> String {
    env.get_non_empty(env::ENDPOINT)
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
}

#[derive(Debug)]
struct Token {
    value: HeaderValue,
    expires: SystemTime,
}

#[derive(Debug)]
enum Session {
    V2(Token),
    V1,
}

#[derive(Debug)]
pub(crate) struct Client {
    http: HttpCredentialProvider,
    endpoint: String,
    time_source: SharedTimeSource,
    session: Mutex<Option<Session>>,
}

impl Client {
    pub(crate) fn new(
        http: HttpCredentialProvider,
        endpoint: impl Into<String>,
        time_source: SharedTimeSource,
    ) -> Self {
        Client {
            http,
            endpoint: endpoint.into(),
            time_source,
            session: Mutex::new(None),
        }
    }

    pub(crate) fn http(&self) -> &HttpCredentialProvider {
        &self.http
    }

    fn uri(&self, path: &str) -> Result<Uri, CredentialsError> {
        format!("{}{}", self.endpoint.trim_end_matches('/'), path)
            .parse::<Uri>()
            .map_err(|err| {
                CredentialsError::invalid_configuration(format!(
                    "invalid IMDS endpoint `{}`: {}",
                    self.endpoint, err
                ))
                .with_source(err)
            })
    }

    /// The token to send with metadata requests, or `None` for IMDSv1
    async fn token(&self) -> Result<Option<HeaderValue>, CredentialsError> {
        let mut session = self.session.lock().await;
        let now = self.time_source.now();
        match &*session {
            Some(Session::V2(token)) if token.expires > now => return Ok(Some(token.value.clone())),
            Some(Session::V1) => return Ok(None),
            _ => {}
        }
        let ttl = HeaderValue::from(TOKEN_TTL.as_secs());
        let response = self
            .http
            .send(Method::PUT, &self.uri(TOKEN_PATH)?, &[(TOKEN_TTL_HEADER, ttl)])
            .await?;
        match response.status() {
            status if status.is_success() => {
                let value = HeaderValue::from_maybe_shared(response.into_body()).map_err(|err| {
                    CredentialsError::unhandled(err).with_retryable(true)
                })?;
                *session = Some(Session::V2(Token {
                    value: value.clone(),
                    expires: now + TOKEN_TTL,
                }));
                Ok(Some(value))
            }
            StatusCode::FORBIDDEN | StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED => {
                tracing::debug!(status = ?response.status(), "IMDSv2 token unavailable, falling back to IMDSv1");
                *session = Some(Session::V1);
                Ok(None)
            }
            status => Err(CredentialsError::provider_error(format!(
                "failed to load IMDS session token: {:?}",
                status
            ))
            .with_retryable(status.is_server_error())),
        }
    }

    /// GET `path` from the metadata service
    ///
    /// Only successful responses are returned. A 401 discards the session token so the next
    /// request fetches a new one.
    pub(crate) async fn get(&self, path: &str) -> Result<Response<Bytes>, CredentialsError> {
        let token = self.token().await?;
        let headers: Vec<_> = token
            .map(|token| (TOKEN_HEADER, token))
            .into_iter()
            .collect();
        let response = self.http.send(Method::GET, &self.uri(path)?, &headers).await?;
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED => {
                *self.session.lock().await = None;
                Err(
                    CredentialsError::provider_error("IMDS session token was rejected")
                        .with_retryable(true),
                )
            }
            StatusCode::NOT_FOUND => Err(CredentialsError::not_loaded(format!(
                "IMDS path {} not found",
                path
            ))),
            status => Err(CredentialsError::provider_error(format!(
                "Non-success status from IMDS: {:?}",
                status
            ))
            .with_retryable(status.is_server_error())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{endpoint, imds_disabled, Client};
    use crate::http_provider::HttpCredentialProvider;
    use aws_types::os_shim_internal::Env;
    use aws_types::time_source::SystemTimeSource;
    use http::Method;
    use pretty_assertions::assert_eq;
    use smithy_http::test_connection::TestConnection;
    use std::sync::Arc;

    fn client(conn: &TestConnection) -> Client {
        Client::new(
            HttpCredentialProvider::new(Arc::new(conn.clone()), "Imds"),
            "http://169.254.169.254",
            Arc::new(SystemTimeSource),
        )
    }

    #[tokio::test]
    async fn token_is_reused() {
        let conn = TestConnection::with_bodies(vec![(200, "token"), (200, "a"), (200, "b")]);
        let client = client(&conn);
        client.get("/latest/a").await.expect("ok");
        client.get("/latest/b").await.expect("ok");
        let requests = conn.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].method(), Method::PUT);
        assert_eq!(requests[0].uri(), "http://169.254.169.254/latest/api/token");
        assert_eq!(
            requests[0].headers()["x-aws-ec2-metadata-token-ttl-seconds"],
            "21600"
        );
        for request in &requests[1..] {
            assert_eq!(request.method(), Method::GET);
            assert_eq!(request.headers()["x-aws-ec2-metadata-token"], "token");
        }
        assert_eq!(requests[2].uri(), "http://169.254.169.254/latest/b");
    }

    #[tokio::test]
    async fn falls_back_to_v1() {
        let conn = TestConnection::with_bodies(vec![(403, ""), (200, "a"), (200, "b")]);
        let client = client(&conn);
        client.get("/latest/a").await.expect("ok");
        client.get("/latest/b").await.expect("ok");
        let requests = conn.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[1].headers().get("x-aws-ec2-metadata-token").is_none());
        assert!(requests[2].headers().get("x-aws-ec2-metadata-token").is_none());
    }

    #[tokio::test]
    async fn rejected_token_is_discarded() {
        let conn = TestConnection::with_bodies(vec![
            (200, "first"),
            (401, ""),
            (200, "second"),
            (200, "a"),
        ]);
        let client = client(&conn);
        let err = client.get("/latest/a").await.expect_err("401");
        assert!(err.retryable());
        client.get("/latest/a").await.expect("new token");
        assert_eq!(conn.requests()[3].headers()["x-aws-ec2-metadata-token"], "second");
    }

    #[tokio::test]
    async fn bad_token_request_is_an_error() {
        let conn = TestConnection::with_bodies(vec![(400, "")]);
        let err = client(&conn).get("/latest/a").await.expect_err("400");
        assert!(!err.retryable());
        assert_eq!(conn.requests().len(), 1);
    }

    #[test]
    fn environment() {
        assert!(imds_disabled(&Env::from_slice(&[(
            "AWS_EC2_METADATA_DISABLED",
            "TRUE"
        )])));
        assert!(!imds_disabled(&Env::from_slice(&[])));
        assert_eq!(endpoint(&Env::from_slice(&[])), "http://169.254.169.254");
        assert_eq!(
            endpoint(&Env::from_slice(&[(
                "AWS_EC2_METADATA_SERVICE_ENDPOINT",
                "http://[fd00:ec2::254]"
            )])),
            "http://[fd00:ec2::254]"
        );
    }
}
