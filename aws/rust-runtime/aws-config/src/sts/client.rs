/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! A small STS client speaking the query protocol
//!
//! Requests are built from the shape model with the query marshaler, signed with SigV4 and sent
//! through an [`HttpConnector`](smithy_http::connector::HttpConnector).

use crate::provider_config::ProviderConfig;
use aws_sigv4::http_request::signing_params::BuildError as SigningParamsError;
use aws_sigv4::http_request::{sign, SignableRequest, SigningError, SigningParams, SigningSettings};
use aws_sigv4::sign::SigningKeyCache;
use aws_types::credential::{Credentials, CredentialsError};
use aws_types::time_source::SharedTimeSource;
use aws_types::Region;
use bytes::Bytes;
use http::Uri;
use smithy_http::connector::{ConnectorError, SharedHttpConnector};
use smithy_http::endpoint::apply_endpoint;
use smithy_http::protocol::{self, BuildError, OperationError, OperationOutput, ParseError, ServiceError};
use smithy_http::shape::{ApiMetadata, Operation, ProtocolName, Shape};
use smithy_types::Value;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;

const API_VERSION: &str = "2011-06-15";
const SIGNING_NAME: &str = "sts";
const GLOBAL_REGION: &str = "us-east-1";

/// Future wrapper returned by [`StsClient`]
pub mod future {
    use super::{StsError, StsResponse};
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    type Output = Result<StsResponse, StsError>;

    /// Future returned by every [`StsClient`](super::StsClient) operation
    pub struct StsCall<'a>(Pin<Box<dyn Future<Output = Output> + Send + 'a>>);

    impl<'a> StsCall<'a> {
        pub fn new(future: impl Future<Output = Output> + Send + 'a) -> Self {
            StsCall(Box::pin(future))
        }

        pub fn ready(output: Output) -> Self {
            StsCall(Box::pin(std::future::ready(output)))
        }
    }

    impl Future for StsCall<'_> {
        type Output = Output;

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            self.0.as_mut().poll(cx)
        }
    }
}

/// The STS operations used by the credential providers
///
/// `get_session_token` and `assume_role` are signed with `credentials`. The two federation
/// operations are sent unsigned.
pub trait StsClient: Send + Sync + Debug {
    fn get_session_token<'a>(
        &'a self,
        credentials: &'a Credentials,
        request: &'a GetSessionTokenRequest,
    ) -> future::StsCall<'a>;

    fn assume_role<'a>(
        &'a self,
        credentials: &'a Credentials,
        request: &'a AssumeRoleRequest,
    ) -> future::StsCall<'a>;

    fn assume_role_with_web_identity<'a>(
        &'a self,
        request: &'a AssumeRoleWithWebIdentityRequest,
    ) -> future::StsCall<'a>;

    fn assume_role_with_saml<'a>(
        &'a self,
        request: &'a AssumeRoleWithSamlRequest,
    ) -> future::StsCall<'a>;
}

pub type SharedStsClient = Arc<dyn StsClient>;

fn redacted(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| "** redacted **")
}

fn set<T: Into<Value>>(params: &mut Value, key: &str, value: Option<T>) {
    if let Some(value) = value {
        params.insert(key, value);
    }
}

/// Input of `AssumeRole`
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AssumeRoleRequest {
    pub role_arn: String,
    pub role_session_name: String,
    pub external_id: Option<String>,
    pub duration_seconds: Option<i32>,
    pub policy: Option<String>,
    pub serial_number: Option<String>,
    pub token_code: Option<String>,
}

impl Debug for AssumeRoleRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssumeRoleRequest")
            .field("role_arn", &self.role_arn)
            .field("role_session_name", &self.role_session_name)
            .field("external_id", &self.external_id)
            .field("duration_seconds", &self.duration_seconds)
            .field("policy", &self.policy)
            .field("serial_number", &self.serial_number)
            .field("token_code", &redacted(&self.token_code))
            .finish()
    }
}

impl AssumeRoleRequest {
    fn to_params(&self) -> Value {
        let mut params = Value::map();
        params.insert("RoleArn", self.role_arn.as_str());
        params.insert("RoleSessionName", self.role_session_name.as_str());
        set(&mut params, "ExternalId", self.external_id.as_deref());
        set(&mut params, "DurationSeconds", self.duration_seconds);
        set(&mut params, "Policy", self.policy.as_deref());
        set(&mut params, "SerialNumber", self.serial_number.as_deref());
        set(&mut params, "TokenCode", self.token_code.as_deref());
        params
    }
}

/// Input of `GetSessionToken`
#[derive(Clone, Default, PartialEq, Eq)]
pub struct GetSessionTokenRequest {
    pub duration_seconds: Option<i32>,
    pub serial_number: Option<String>,
    pub token_code: Option<String>,
}

impl Debug for GetSessionTokenRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetSessionTokenRequest")
            .field("duration_seconds", &self.duration_seconds)
            .field("serial_number", &self.serial_number)
            .field("token_code", &redacted(&self.token_code))
            .finish()
    }
}

impl GetSessionTokenRequest {
    fn to_params(&self) -> Value {
        let mut params = Value::map();
        set(&mut params, "DurationSeconds", self.duration_seconds);
        set(&mut params, "SerialNumber", self.serial_number.as_deref());
        set(&mut params, "TokenCode", self.token_code.as_deref());
        params
    }
}

/// Input of `AssumeRoleWithWebIdentity`
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AssumeRoleWithWebIdentityRequest {
    pub role_arn: String,
    pub role_session_name: String,
    pub web_identity_token: String,
    pub provider_id: Option<String>,
    pub policy: Option<String>,
    pub duration_seconds: Option<i32>,
}

impl Debug for AssumeRoleWithWebIdentityRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssumeRoleWithWebIdentityRequest")
            .field("role_arn", &self.role_arn)
            .field("role_session_name", &self.role_session_name)
            .field("web_identity_token", &"** redacted **")
            .field("provider_id", &self.provider_id)
            .field("policy", &self.policy)
            .field("duration_seconds", &self.duration_seconds)
            .finish()
    }
}

impl AssumeRoleWithWebIdentityRequest {
    fn to_params(&self) -> Value {
        let mut params = Value::map();
        params.insert("RoleArn", self.role_arn.as_str());
        params.insert("RoleSessionName", self.role_session_name.as_str());
        params.insert("WebIdentityToken", self.web_identity_token.as_str());
        set(&mut params, "ProviderId", self.provider_id.as_deref());
        set(&mut params, "Policy", self.policy.as_deref());
        set(&mut params, "DurationSeconds", self.duration_seconds);
        params
    }
}

/// Input of `AssumeRoleWithSAML`
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AssumeRoleWithSamlRequest {
    pub role_arn: String,
    pub principal_arn: String,
    pub saml_assertion: String,
    pub policy: Option<String>,
    pub duration_seconds: Option<i32>,
}

impl Debug for AssumeRoleWithSamlRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssumeRoleWithSamlRequest")
            .field("role_arn", &self.role_arn)
            .field("principal_arn", &self.principal_arn)
            .field("saml_assertion", &"** redacted **")
            .field("policy", &self.policy)
            .field("duration_seconds", &self.duration_seconds)
            .finish()
    }
}

impl AssumeRoleWithSamlRequest {
    fn to_params(&self) -> Value {
        let mut params = Value::map();
        params.insert("RoleArn", self.role_arn.as_str());
        params.insert("PrincipalArn", self.principal_arn.as_str());
        params.insert("SAMLAssertion", self.saml_assertion.as_str());
        set(&mut params, "Policy", self.policy.as_deref());
        set(&mut params, "DurationSeconds", self.duration_seconds);
        params
    }
}

/// The temporary credentials returned by STS
#[derive(Clone, PartialEq, Eq)]
pub struct StsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: Option<SystemTime>,
}

impl Debug for StsCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("StsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &"** redacted **")
            .field("expiration", &self.expiration)
            .finish()
    }
}

impl StsCredentials {
    fn from_value(value: &Value) -> Option<Self> {
        let string = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);
        let expiration = match value.get("Expiration") {
            Some(Value::Timestamp(instant)) => Some(instant.to_system_time()),
            _ => None,
        };
        Some(StsCredentials {
            access_key_id: string("AccessKeyId")?,
            secret_access_key: string("SecretAccessKey")?,
            session_token: string("SessionToken")?,
            expiration,
        })
    }
}

/// A successful STS response
///
/// `data` holds every output member other than `Credentials`, e.g. `AssumedRoleUser`.
#[derive(Debug, Clone, PartialEq)]
pub struct StsResponse {
    credentials: StsCredentials,
    data: Value,
    request_id: Option<String>,
}

impl StsResponse {
    pub fn new(credentials: StsCredentials, data: Value) -> Self {
        StsResponse {
            credentials,
            data,
            request_id: None,
        }
    }

    fn from_output(output: OperationOutput) -> Result<Self, StsError> {
        let OperationOutput {
            mut data,
            request_id,
        } = output;
        let credentials = match &mut data {
            Value::Map(entries) => entries.remove("Credentials"),
            _ => None,
        };
        let credentials = credentials
            .as_ref()
            .and_then(StsCredentials::from_value)
            .ok_or(StsError::MissingCredentials)?;
        Ok(StsResponse {
            credentials,
            data,
            request_id,
        })
    }

    /// The returned credentials, attributed to `provider_name`
    pub fn credentials(&self, provider_name: &'static str) -> Credentials {
        Credentials::new(
            self.credentials.access_key_id.clone(),
            self.credentials.secret_access_key.clone(),
            Some(self.credentials.session_token.clone()),
            self.credentials.expiration,
            provider_name,
        )
    }

    pub fn sts_credentials(&self) -> &StsCredentials {
        &self.credentials
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}

/// Failure calling STS
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StsError {
    #[error("failed to build request: {0}")]
    Build(#[from] BuildError),
    #[error("invalid STS endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("failed to sign request: {0}")]
    Signing(#[source] SigningError),
    #[error("invalid signing parameters: {0}")]
    SigningParams(#[source] SigningParamsError),
    #[error("failed to send request: {0}")]
    Connector(#[source] ConnectorError),
    #[error("{0}")]
    Service(ServiceError),
    #[error("failed to parse response: {0}")]
    Parse(#[source] ParseError),
    #[error("the response did not contain credentials")]
    MissingCredentials,
    #[error("no HTTP connector was configured")]
    NoConnector,
}

impl From<OperationError> for StsError {
    fn from(err: OperationError) -> Self {
        match err {
            OperationError::Service(err) => StsError::Service(err),
            OperationError::Parse(err) => StsError::Parse(err),
        }
    }
}

impl StsError {
    pub fn code(&self) -> &str {
        match self {
            StsError::Build(err) => err.code(),
            StsError::InvalidEndpoint(_) => "InvalidEndpoint",
            StsError::Signing(err) => err.code(),
            StsError::SigningParams(_) => "SigningError",
            StsError::Connector(err) if err.is_timeout() => "TimeoutError",
            StsError::Connector(_) => "NetworkingError",
            StsError::Service(err) => err.code(),
            StsError::Parse(err) => err.code(),
            StsError::MissingCredentials => "MissingCredentials",
            StsError::NoConnector => "NoConnector",
        }
    }

    pub fn retryable(&self) -> bool {
        match self {
            StsError::Connector(err) => err.is_timeout() || err.is_io(),
            StsError::Service(err) => err.retryable(),
            StsError::Parse(err) => err.retryable(),
            _ => false,
        }
    }

    /// Converts into a [`CredentialsError`] naming the failed `operation`
    ///
    /// The STS error code and retryability are kept on the credentials error.
    pub fn into_credentials_error(self, operation: &str) -> CredentialsError {
        let message = format!("{} failed: {}", operation, self);
        match self {
            StsError::NoConnector => CredentialsError::invalid_configuration(message),
            other => {
                let code = other.code().to_string();
                let retryable = other.retryable();
                CredentialsError::provider_error(message)
                    .with_code(code)
                    .with_retryable(retryable)
                    .with_source(other)
            }
        }
    }
}

fn api_metadata() -> ApiMetadata {
    let mut api = ApiMetadata::new(ProtocolName::Query, API_VERSION, SIGNING_NAME);
    api.xml_namespace = Some("https://sts.amazonaws.com/doc/2011-06-15/".to_string());
    api
}

fn credentials_shape() -> Shape {
    Shape::structure()
        .member("AccessKeyId", Shape::string())
        .member("SecretAccessKey", Shape::string().with_sensitive(true))
        .member("SessionToken", Shape::string().with_sensitive(true))
        .member("Expiration", Shape::timestamp())
}

fn assumed_role_user_shape() -> Shape {
    Shape::structure()
        .member("AssumedRoleId", Shape::string())
        .member("Arn", Shape::string())
}

fn get_session_token_operation() -> Operation {
    Operation::new("GetSessionToken")
        .input(
            Shape::structure()
                .member("DurationSeconds", Shape::integer())
                .member("SerialNumber", Shape::string())
                .member("TokenCode", Shape::string()),
        )
        .output(Shape::structure().member("Credentials", credentials_shape()))
        .result_wrapper("GetSessionTokenResult")
}

fn assume_role_operation() -> Operation {
    Operation::new("AssumeRole")
        .input(
            Shape::structure()
                .member("RoleArn", Shape::string())
                .member("RoleSessionName", Shape::string())
                .member("Policy", Shape::string())
                .member("DurationSeconds", Shape::integer())
                .member("ExternalId", Shape::string())
                .member("SerialNumber", Shape::string())
                .member("TokenCode", Shape::string()),
        )
        .output(
            Shape::structure()
                .member("Credentials", credentials_shape())
                .member("AssumedRoleUser", assumed_role_user_shape())
                .member("PackedPolicySize", Shape::integer())
                .member("SourceIdentity", Shape::string()),
        )
        .result_wrapper("AssumeRoleResult")
}

fn assume_role_with_web_identity_operation() -> Operation {
    Operation::new("AssumeRoleWithWebIdentity")
        .input(
            Shape::structure()
                .member("RoleArn", Shape::string())
                .member("RoleSessionName", Shape::string())
                .member("WebIdentityToken", Shape::string().with_sensitive(true))
                .member("ProviderId", Shape::string())
                .member("Policy", Shape::string())
                .member("DurationSeconds", Shape::integer()),
        )
        .output(
            Shape::structure()
                .member("Credentials", credentials_shape())
                .member("SubjectFromWebIdentityToken", Shape::string())
                .member("AssumedRoleUser", assumed_role_user_shape())
                .member("PackedPolicySize", Shape::integer())
                .member("Provider", Shape::string())
                .member("Audience", Shape::string())
                .member("SourceIdentity", Shape::string()),
        )
        .result_wrapper("AssumeRoleWithWebIdentityResult")
        .unsigned()
}

fn assume_role_with_saml_operation() -> Operation {
    Operation::new("AssumeRoleWithSAML")
        .input(
            Shape::structure()
                .member("RoleArn", Shape::string())
                .member("PrincipalArn", Shape::string())
                .member("SAMLAssertion", Shape::string().with_sensitive(true))
                .member("Policy", Shape::string())
                .member("DurationSeconds", Shape::integer()),
        )
        .output(
            Shape::structure()
                .member("Credentials", credentials_shape())
                .member("AssumedRoleUser", assumed_role_user_shape())
                .member("PackedPolicySize", Shape::integer())
                .member("Subject", Shape::string())
                .member("SubjectType", Shape::string())
                .member("Issuer", Shape::string())
                .member("Audience", Shape::string())
                .member("NameQualifier", Shape::string())
                .member("SourceIdentity", Shape::string()),
        )
        .result_wrapper("AssumeRoleWithSAMLResult")
        .unsigned()
}

/// [`StsClient`] over the query protocol
///
/// Requests go to `https://sts.<region>.amazonaws.com`. Without a region the global endpoint
/// `https://sts.amazonaws.com` is used and requests are signed for `us-east-1`.
#[derive(Clone)]
pub struct StsQueryClient {
    connector: SharedHttpConnector,
    region: Option<Region>,
    endpoint: Option<Uri>,
    time_source: SharedTimeSource,
    key_cache: Arc<SigningKeyCache>,
}

impl Debug for StsQueryClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("StsQueryClient")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl StsQueryClient {
    pub fn new(connector: SharedHttpConnector, time_source: SharedTimeSource) -> Self {
        StsQueryClient {
            connector,
            region: None,
            endpoint: None,
            time_source,
            key_cache: Default::default(),
        }
    }

    /// Builds a client from the connector, clock and region of `conf`
    pub fn from_provider_config(conf: &ProviderConfig) -> Result<Self, StsError> {
        let connector = conf.connector().ok_or(StsError::NoConnector)?;
        Ok(Self::new(connector, conf.time_source()).with_region(conf.region()))
    }

    pub fn with_region(mut self, region: Option<Region>) -> Self {
        self.region = region;
        self
    }

    /// Send requests to `endpoint` instead of the regional STS endpoint
    pub fn with_endpoint(mut self, endpoint: Uri) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// The endpoint to call and the region to sign for
    fn resolve_endpoint(&self) -> Result<(Uri, String), StsError> {
        let signing_region = self
            .region
            .as_ref()
            .map(|region| region.as_ref().to_string())
            .unwrap_or_else(|| GLOBAL_REGION.to_string());
        let endpoint = match (&self.endpoint, &self.region) {
            (Some(endpoint), _) => endpoint.clone(),
            (None, Some(region)) => format!("https://sts.{}.amazonaws.com", region)
                .parse()
                .map_err(|err: http::uri::InvalidUri| StsError::InvalidEndpoint(err.to_string()))?,
            (None, None) => Uri::from_static("https://sts.amazonaws.com"),
        };
        Ok((endpoint, signing_region))
    }

    fn sign(
        &self,
        request: &mut http::Request<Bytes>,
        credentials: &Credentials,
        api: &ApiMetadata,
        region: &str,
    ) -> Result<(), StsError> {
        let mut builder = SigningParams::builder()
            .access_key(credentials.access_key_id())
            .secret_key(credentials.secret_access_key())
            .region(region)
            .service_name(&api.signing_name)
            .time(self.time_source.now())
            .settings(SigningSettings::default())
            .key_cache(&self.key_cache);
        builder.set_security_token(credentials.session_token());
        let params = builder.build().map_err(StsError::SigningParams)?;
        let (instructions, _signature) = sign(SignableRequest::from(&*request), &params)
            .map_err(StsError::Signing)?
            .into_parts();
        instructions
            .apply_to_request(request)
            .map_err(StsError::Signing)
    }

    async fn call(
        &self,
        operation: Operation,
        params: Value,
        credentials: Option<&Credentials>,
    ) -> Result<StsResponse, StsError> {
        let api = api_metadata();
        let mut request =
            protocol::marshaler(api.protocol).build_request(&api, &operation, &params)?;
        let (endpoint, signing_region) = self.resolve_endpoint()?;
        apply_endpoint(request.uri_mut(), &endpoint)
            .map_err(|err| StsError::InvalidEndpoint(err.to_string()))?;
        match credentials {
            Some(credentials) if !operation.unsigned => {
                self.sign(&mut request, credentials, &api, &signing_region)?
            }
            _ => {}
        }
        tracing::debug!(operation = %operation.name, uri = %request.uri(), "sending STS request");
        let response = self
            .connector
            .call(request)
            .await
            .map_err(StsError::Connector)?;
        let output = protocol::parse_response(&api, &operation, &response)?;
        tracing::debug!(operation = %operation.name, request_id = ?output.request_id, "STS call succeeded");
        StsResponse::from_output(output)
    }
}

impl StsClient for StsQueryClient {
    fn get_session_token<'a>(
        &'a self,
        credentials: &'a Credentials,
        request: &'a GetSessionTokenRequest,
    ) -> future::StsCall<'a> {
        future::StsCall::new(self.call(
            get_session_token_operation(),
            request.to_params(),
            Some(credentials),
        ))
    }

    fn assume_role<'a>(
        &'a self,
        credentials: &'a Credentials,
        request: &'a AssumeRoleRequest,
    ) -> future::StsCall<'a> {
        future::StsCall::new(self.call(
            assume_role_operation(),
            request.to_params(),
            Some(credentials),
        ))
    }

    fn assume_role_with_web_identity<'a>(
        &'a self,
        request: &'a AssumeRoleWithWebIdentityRequest,
    ) -> future::StsCall<'a> {
        future::StsCall::new(self.call(
            assume_role_with_web_identity_operation(),
            request.to_params(),
            None,
        ))
    }

    fn assume_role_with_saml<'a>(
        &'a self,
        request: &'a AssumeRoleWithSamlRequest,
    ) -> future::StsCall<'a> {
        future::StsCall::new(self.call(
            assume_role_with_saml_operation(),
            request.to_params(),
            None,
        ))
    }
}
