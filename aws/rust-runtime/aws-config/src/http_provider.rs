/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Generalized HTTP credential provider. Currently, this cannot be used directly and can only
//! be used via the container and instance metadata credential providers.

use crate::json_credentials::{parse_json_credentials, JsonCredentials, RefreshableCredentials};
use aws_types::credential::{self, Credentials, CredentialsError};
use bytes::Bytes;
use http::header::ACCEPT;
use http::{HeaderValue, Method, Response, Uri};
use smithy_http::connector::{ConnectorError, SharedHttpConnector};
use std::future::Future;
use std::time::Duration;

pub(crate) const DEFAULT_MAX_RETRIES: usize = 3;
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub(crate) struct HttpCredentialProvider {
    connector: SharedHttpConnector,
    provider_name: &'static str,
    max_retries: usize,
    timeout: Duration,
}

impl HttpCredentialProvider {
    pub(crate) fn new(connector: SharedHttpConnector, provider_name: &'static str) -> Self {
        HttpCredentialProvider {
            connector,
            provider_name,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Attempts after the first one. Only retryable failures are retried.
    pub(crate) fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub(crate) fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// GET `uri` and parse the credentials document in the response
    ///
    /// The following failures are retried:
    ///   - socket errors
    ///   - networking timeouts
    ///   - 5xx responses
    ///   - non-parseable 200 responses
    pub(crate) async fn credentials(
        &self,
        uri: &Uri,
        auth: Option<&HeaderValue>,
    ) -> credential::Result {
        self.with_retries(|| self.attempt(uri, auth)).await
    }

    /// Run `attempt` until it succeeds, fails with a non-retryable error, or `max_retries` is
    /// exhausted
    pub(crate) async fn with_retries<T, F, Fut>(&self, mut attempt: F) -> Result<T, CredentialsError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CredentialsError>>,
    {
        let mut retries = 0;
        loop {
            match attempt().await {
                Err(err) if err.retryable() && retries < self.max_retries => {
                    retries += 1;
                    tracing::debug!(
                        provider = self.provider_name,
                        attempt = retries,
                        error = %err,
                        "retrying credentials request"
                    );
                }
                result => return result,
            }
        }
    }

    /// Send one request. Shared with callers that need the raw response, e.g. to read the role
    /// name from instance metadata.
    pub(crate) async fn send(
        &self,
        method: Method,
        uri: &Uri,
        headers: &[(&'static str, HeaderValue)],
    ) -> Result<Response<Bytes>, CredentialsError> {
        let mut request = http::Request::builder()
            .method(method)
            .uri(uri.clone())
            .header(ACCEPT, "application/json");
        for (name, value) in headers {
            request = request.header(*name, value.clone());
        }
        let request = request.body(Bytes::new()).map_err(|err| {
            CredentialsError::invalid_configuration(format!("invalid credentials request: {}", err))
                .with_source(err)
        })?;
        let response = match tokio::time::timeout(self.timeout, self.connector.call(request)).await
        {
            Ok(response) => response,
            Err(_) => Err(ConnectorError::timeout(
                format!("no response after {:?}", self.timeout).into(),
            )),
        };
        response.map_err(|err| self.connector_error(err))
    }

    async fn attempt(&self, uri: &Uri, auth: Option<&HeaderValue>) -> credential::Result {
        let headers: Vec<_> = auth
            .map(|auth| ("authorization", auth.clone()))
            .into_iter()
            .collect();
        let response = self.send(Method::GET, uri, &headers).await?;
        parse_response(self.provider_name, &response)
    }

    fn connector_error(&self, err: ConnectorError) -> CredentialsError {
        if err.is_timeout() {
            CredentialsError::timed_out(self.timeout)
                .with_source(err)
                .with_retryable(true)
        } else {
            let retryable = err.is_io();
            CredentialsError::provider_error(format!(
                "failed to load credentials from {}: {}",
                self.provider_name, err
            ))
            .with_source(err)
            .with_retryable(retryable)
        }
    }
}

pub(crate) fn parse_response(
    provider_name: &'static str,
    response: &Response<Bytes>,
) -> credential::Result {
    if !response.status().is_success() {
        return Err(CredentialsError::provider_error(format!(
            "Non-success status from HTTP credential provider: {:?}",
            response.status()
        ))
        .with_retryable(response.status().is_server_error()));
    }
    let str_resp = std::str::from_utf8(response.body().as_ref())
        .map_err(|err| CredentialsError::unhandled(err).with_retryable(true))?;
    let json_creds = parse_json_credentials(str_resp)
        .map_err(|err| CredentialsError::unhandled(err).with_retryable(true))?;
    match json_creds {
        JsonCredentials::RefreshableCredentials(RefreshableCredentials {
            access_key_id,
            secret_access_key,
            session_token,
            expiration,
        }) => Ok(Credentials::new(
            access_key_id,
            secret_access_key,
            session_token,
            expiration,
            provider_name,
        )),
        JsonCredentials::Error { code, message } => Err(CredentialsError::provider_error(
            format!("failed to load credentials [{}]: {}", code, message),
        )
        .with_code(code)),
    }
}

#[cfg(test)]
mod test {
    use super::HttpCredentialProvider;
    use bytes::Bytes;
    use http::{HeaderValue, Uri};
    use smithy_http::connector::{BoxFuture, ConnectorError, HttpConnector};
    use smithy_http::test_connection::{response, TestConnection};
    use std::sync::Arc;
    use std::time::Duration;

    const CREDENTIALS: &str = r#"{
        "AccessKeyId" : "AKID",
        "SecretAccessKey" : "SECRET",
        "Token" : "TOKEN",
        "Expiration" : "2021-09-21T21:08:52Z"
    }"#;

    fn uri() -> Uri {
        Uri::from_static("http://169.254.170.2/credentials")
    }

    fn io_error() -> ConnectorError {
        ConnectorError::io("connection reset".into())
    }

    #[tokio::test]
    async fn auth_header_is_sent() {
        let conn = TestConnection::with_bodies(vec![(200, CREDENTIALS)]);
        let provider = HttpCredentialProvider::new(Arc::new(conn.clone()), "Test");
        let creds = provider
            .credentials(&uri(), Some(&HeaderValue::from_static("Basic secret")))
            .await
            .expect("valid credentials");
        assert_eq!(creds.access_key_id(), "AKID");
        assert_eq!(creds.session_token(), Some("TOKEN"));
        assert_eq!(creds.provider_name(), "Test");
        let requests = conn.requests();
        assert_eq!(requests[0].uri(), &uri());
        assert_eq!(requests[0].headers()["authorization"], "Basic secret");
        assert_eq!(requests[0].headers()["accept"], "application/json");
    }

    #[tokio::test]
    async fn retryable_failures_are_retried() {
        let conn = TestConnection::new(vec![
            Err(io_error()),
            Ok(response(503, "")),
            Ok(response(200, "not json")),
            Ok(response(200, CREDENTIALS)),
        ]);
        let provider = HttpCredentialProvider::new(Arc::new(conn.clone()), "Test");
        provider
            .credentials(&uri(), None)
            .await
            .expect("fourth attempt succeeds");
        assert_eq!(conn.requests().len(), 4);
        assert!(conn.requests()[0].headers().get("authorization").is_none());
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let conn = TestConnection::new(vec![
            Ok(response(500, "")),
            Ok(response(500, "")),
            Ok(response(500, "")),
        ]);
        let provider =
            HttpCredentialProvider::new(Arc::new(conn.clone()), "Test").with_max_retries(2);
        let err = provider.credentials(&uri(), None).await.expect_err("all failed");
        assert!(err.to_string().contains("500"), "{}", err);
        assert_eq!(conn.requests().len(), 3);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let conn = TestConnection::new(vec![
            Ok(response(404, "")),
            Ok(response(200, CREDENTIALS)),
        ]);
        let provider = HttpCredentialProvider::new(Arc::new(conn.clone()), "Test");
        provider.credentials(&uri(), None).await.expect_err("404");
        assert_eq!(conn.requests().len(), 1);

        let conn = TestConnection::with_bodies(vec![(
            200,
            r#"{"Code": "AccessDenied", "Message": "not allowed"}"#,
        )]);
        let provider = HttpCredentialProvider::new(Arc::new(conn.clone()), "Test");
        let err = provider.credentials(&uri(), None).await.expect_err("denied");
        assert_eq!(
            err.to_string(),
            "failed to load credentials [AccessDenied]: not allowed"
        );
        assert_eq!(err.code(), "AccessDenied");
    }

    #[derive(Debug)]
    struct NeverResponds;

    impl HttpConnector for NeverResponds {
        fn call(
            &self,
            _request: http::Request<Bytes>,
        ) -> BoxFuture<Result<http::Response<Bytes>, ConnectorError>> {
            Box::pin(pending_response())
        }
    }

    async fn pending_response() -> Result<http::Response<Bytes>, ConnectorError> {
        std::future::pending().await
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_are_retried_then_reported() {
        let provider = HttpCredentialProvider::new(Arc::new(NeverResponds), "Test")
            .with_timeout(Duration::from_millis(100))
            .with_max_retries(1);
        let err = provider.credentials(&uri(), None).await.expect_err("timed out");
        assert_eq!(err.code(), "CredentialsError");
        assert!(err.retryable());
    }
}
