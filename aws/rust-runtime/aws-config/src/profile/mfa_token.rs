/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! MFA token codes for profiles with an `mfa_serial`

use aws_types::credential::CredentialsError;
use std::error::Error;
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// A token code read from an MFA device.
#[derive(Clone, PartialEq, Eq)]
pub struct MfaToken(pub(crate) String);

impl Debug for MfaToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("MfaToken(** redacted **)")
    }
}

impl<T: Into<String>> From<T> for MfaToken {
    fn from(s: T) -> Self {
        MfaToken(s.into())
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MfaTokenFetchError {
    #[error("an MFA token was requested but no MFA token provider was configured")]
    NoMfaTokenProviderConfigured,
    #[error("{cause}")]
    ProviderError {
        #[source]
        cause: Box<dyn Error + Send + Sync + 'static>,
    },
}

impl MfaTokenFetchError {
    pub fn provider_error(cause: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        MfaTokenFetchError::ProviderError {
            cause: cause.into(),
        }
    }
}

pub type Result = std::result::Result<MfaToken, MfaTokenFetchError>;

/// Future wrapper returned by [`ProvideMfaToken`]
///
/// Note: this module should only be used when implementing your own mfa token providers.
pub mod future {
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Future returned by [`ProvideMfaToken`](super::ProvideMfaToken)
    pub struct ProvideMfaToken<'a>(Pin<Box<dyn Future<Output = super::Result> + Send + 'a>>);

    impl<'a> ProvideMfaToken<'a> {
        pub fn ready(mfa_token: super::Result) -> Self {
            ProvideMfaToken(Box::pin(std::future::ready(mfa_token)))
        }

        pub fn new(future: impl Future<Output = super::Result> + Send + 'a) -> Self {
            ProvideMfaToken(Box::pin(future))
        }
    }

    impl Future for ProvideMfaToken<'_> {
        type Output = super::Result;

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            self.0.as_mut().poll(cx)
        }
    }
}

/// Asks the user (or a device) for the current token code of `mfa_serial`.
pub trait ProvideMfaToken: Send + Sync + Debug {
    fn mfa_token<'a>(&'a self, mfa_serial: &'a str) -> future::ProvideMfaToken<'a>;
}

/// An MFA token provider built from an async closure.
#[derive(Clone, Copy)]
pub struct ProvideMfaTokenFn<T> {
    f: T,
}

impl<T> Debug for ProvideMfaTokenFn<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ProvideMfaTokenFn")
    }
}

impl<T, F> ProvideMfaToken for ProvideMfaTokenFn<T>
where
    T: Fn(String) -> F + Send + Sync,
    F: Future<Output = Result> + Send + 'static,
{
    fn mfa_token<'a>(&'a self, mfa_serial: &'a str) -> future::ProvideMfaToken<'a> {
        future::ProvideMfaToken::new((self.f)(mfa_serial.to_string()))
    }
}

/// Returns an MFA token provider that calls `f` with the MFA serial number.
///
/// ```rust
/// use aws_config::profile::mfa_token::provide_mfa_token_fn;
///
/// let provider = provide_mfa_token_fn(|_serial| async { Ok("123456".into()) });
/// ```
pub fn provide_mfa_token_fn<T, F>(f: T) -> ProvideMfaTokenFn<T>
where
    T: Fn(String) -> F + Send + Sync,
    F: Future<Output = Result> + Send + 'static,
{
    ProvideMfaTokenFn { f }
}

#[derive(Debug, Default)]
pub(crate) struct NoMfaTokenProvider;

impl ProvideMfaToken for NoMfaTokenProvider {
    fn mfa_token<'a>(&'a self, mfa_serial: &'a str) -> future::ProvideMfaToken<'a> {
        tracing::info!(mfa_serial = %mfa_serial, "MFA code is required as mfa_serial was set, but no MFA token provider has been configured");
        future::ProvideMfaToken::ready(Err(MfaTokenFetchError::NoMfaTokenProviderConfigured))
    }
}

/// Runs at most one token request at a time, however many role assumptions need a code.
#[derive(Clone, Debug)]
pub(crate) struct SerializedMfaTokenProvider {
    inner: Arc<dyn ProvideMfaToken>,
    in_use: Arc<tokio::sync::Mutex<()>>,
}

impl SerializedMfaTokenProvider {
    pub(crate) fn new(inner: Arc<dyn ProvideMfaToken>) -> Self {
        SerializedMfaTokenProvider {
            inner,
            in_use: Default::default(),
        }
    }

    pub(crate) async fn token(
        &self,
        mfa_serial: &str,
    ) -> std::result::Result<String, CredentialsError> {
        let _guard = self.in_use.lock().await;
        self.inner
            .mfa_token(mfa_serial)
            .await
            .map(|token| token.0)
            .map_err(|err| {
                CredentialsError::provider_error(format!("Error fetching MFA token: {}", err))
                    .with_source(err)
            })
    }
}

impl Default for SerializedMfaTokenProvider {
    fn default() -> Self {
        Self::new(Arc::new(NoMfaTokenProvider))
    }
}
