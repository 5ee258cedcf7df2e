/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::Credentials;
use std::borrow::Cow;
use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

type Source = Arc<dyn Error + Send + Sync + 'static>;

/// Details shared by every [`CredentialsError`] variant.
#[derive(Clone)]
pub struct Cause {
    message: Cow<'static, str>,
    code: Option<Cow<'static, str>>,
    retryable: bool,
    source: Option<Source>,
}

impl Debug for Cause {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cause")
            .field("message", &self.message)
            .field("code", &self.code)
            .field("retryable", &self.retryable)
            .field("source", &self.source.as_ref().map(|s| s.to_string()))
            .finish()
    }
}

impl Cause {
    fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Cause {
            message: message.into(),
            code: None,
            retryable: false,
            source: None,
        }
    }
}

/// Failure to load credentials.
///
/// Errors are cheap to clone: a refresh shared by several callers hands each of them the same
/// error.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CredentialsError {
    /// No credentials were available for this provider, e.g. a variable was not set.
    CredentialsNotLoaded(Cause),

    /// Loading credentials from this provider exceeded the maximum allowed duration.
    ProviderTimedOut(Cause),

    /// The provider was given an invalid configuration, e.g. a profile that does not exist or
    /// an assume-role chain that loops.
    InvalidConfiguration(Cause),

    /// The provider failed while loading credentials, e.g. a 503 from STS or a failed
    /// subprocess.
    ProviderError(Cause),

    /// An unexpected error, e.g. a provider returned data that is not UTF-8.
    Unhandled(Cause),
}

impl CredentialsError {
    pub fn not_loaded(message: impl Into<Cow<'static, str>>) -> Self {
        CredentialsError::CredentialsNotLoaded(Cause::new(message))
    }

    pub fn timed_out(after: Duration) -> Self {
        let mut cause = Cause::new(format!(
            "Credentials provider timed out after {} seconds",
            after.as_secs()
        ));
        cause.retryable = true;
        CredentialsError::ProviderTimedOut(cause)
    }

    pub fn invalid_configuration(message: impl Into<Cow<'static, str>>) -> Self {
        CredentialsError::InvalidConfiguration(Cause::new(message))
    }

    pub fn provider_error(message: impl Into<Cow<'static, str>>) -> Self {
        CredentialsError::ProviderError(Cause::new(message))
    }

    pub fn unhandled(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        let boxed: Box<dyn Error + Send + Sync + 'static> = source.into();
        let source: Source = Arc::from(boxed);
        let mut cause = Cause::new(source.to_string());
        cause.source = Some(source);
        CredentialsError::Unhandled(cause)
    }

    /// Attaches the error that caused this one.
    pub fn with_source(mut self, source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        let boxed: Box<dyn Error + Send + Sync + 'static> = source.into();
        self.cause_mut().source = Some(Arc::from(boxed));
        self
    }

    /// Attaches a machine-readable code, such as the error code STS responded with.
    pub fn with_code(mut self, code: impl Into<Cow<'static, str>>) -> Self {
        self.cause_mut().code = Some(code.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.cause_mut().retryable = retryable;
        self
    }

    fn cause(&self) -> &Cause {
        match self {
            CredentialsError::CredentialsNotLoaded(cause)
            | CredentialsError::ProviderTimedOut(cause)
            | CredentialsError::InvalidConfiguration(cause)
            | CredentialsError::ProviderError(cause)
            | CredentialsError::Unhandled(cause) => cause,
        }
    }

    fn cause_mut(&mut self) -> &mut Cause {
        match self {
            CredentialsError::CredentialsNotLoaded(cause)
            | CredentialsError::ProviderTimedOut(cause)
            | CredentialsError::InvalidConfiguration(cause)
            | CredentialsError::ProviderError(cause)
            | CredentialsError::Unhandled(cause) => cause,
        }
    }

    pub fn message(&self) -> &str {
        &self.cause().message
    }

    /// The attached code, or `CredentialsError` when none was attached.
    pub fn code(&self) -> &str {
        self.cause().code.as_deref().unwrap_or("CredentialsError")
    }

    pub fn retryable(&self) -> bool {
        self.cause().retryable
    }
}

impl Display for CredentialsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl Error for CredentialsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause()
            .source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn Error + 'static))
    }
}

pub type Result = std::result::Result<Credentials, CredentialsError>;

pub mod future {
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

    enum Inner<'a> {
        Now(Option<super::Result>),
        Later(BoxFuture<'a, super::Result>),
    }

    /// Future returned by [`ProvideCredentials`](super::ProvideCredentials). Providers that
    /// already hold a result return it without allocating.
    pub struct ProvideCredentials<'a>(Inner<'a>);

    impl<'a> ProvideCredentials<'a> {
        pub fn new(future: impl Future<Output = super::Result> + Send + 'a) -> Self {
            ProvideCredentials(Inner::Later(Box::pin(future)))
        }

        pub fn ready(credentials: super::Result) -> Self {
            ProvideCredentials(Inner::Now(Some(credentials)))
        }
    }

    impl Future for ProvideCredentials<'_> {
        type Output = super::Result;

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            match &mut self.0 {
                Inner::Now(value) => {
                    Poll::Ready(value.take().expect("ProvideCredentials polled after completion"))
                }
                Inner::Later(future) => future.as_mut().poll(cx),
            }
        }
    }
}

/// Asynchronous credentials provider.
///
/// Providers that cache their credentials override [`refresh`](ProvideCredentials::refresh),
/// [`needs_refresh`](ProvideCredentials::needs_refresh) and
/// [`expire`](ProvideCredentials::expire). Without a cache every call loads.
pub trait ProvideCredentials: Send + Sync + Debug {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a;

    /// Loads credentials even if cached ones are still fresh.
    fn refresh<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        self.provide_credentials()
    }

    /// Whether the next [`provide_credentials`](ProvideCredentials::provide_credentials) loads.
    fn needs_refresh(&self) -> bool {
        true
    }

    /// Drop any cached credentials.
    fn expire(&self) {}
}

impl ProvideCredentials for Credentials {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::ready(Ok(self.clone()))
    }

    fn needs_refresh(&self) -> bool {
        self.is_empty()
    }
}

/// A provider that can be shared between clients and chains.
pub type SharedCredentialsProvider = Arc<dyn ProvideCredentials>;

impl ProvideCredentials for Arc<dyn ProvideCredentials> {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        self.as_ref().provide_credentials()
    }

    fn refresh<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        self.as_ref().refresh()
    }

    fn needs_refresh(&self) -> bool {
        self.as_ref().needs_refresh()
    }

    fn expire(&self) {
        self.as_ref().expire()
    }
}

/// A provider built from an async closure.
#[derive(Clone, Copy)]
pub struct ProvideCredentialsFn<'c, T> {
    f: T,
    phantom: std::marker::PhantomData<&'c T>,
}

impl<T> Debug for ProvideCredentialsFn<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ProvideCredentialsFn")
    }
}

impl<'c, T, F> ProvideCredentials for ProvideCredentialsFn<'c, T>
where
    T: Fn() -> F + Send + Sync + 'c,
    F: Future<Output = Result> + Send + 'static,
{
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new((self.f)())
    }
}

/// Returns a provider that calls `f` each time credentials are requested.
///
/// ```rust
/// use aws_types::credential::{provide_credentials_fn, Credentials};
///
/// let provider = provide_credentials_fn(|| async {
///     Ok(Credentials::from_keys("akid", "secret", None))
/// });
/// ```
pub fn provide_credentials_fn<'c, T, F>(f: T) -> ProvideCredentialsFn<'c, T>
where
    T: Fn() -> F + Send + Sync + 'c,
    F: Future<Output = Result> + Send + 'static,
{
    ProvideCredentialsFn {
        f,
        phantom: Default::default(),
    }
}
