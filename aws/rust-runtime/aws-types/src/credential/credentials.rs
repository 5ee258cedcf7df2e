/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use std::fmt;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use zeroize::Zeroizing;

const STATIC_CREDENTIALS: &str = "Static";

/// AWS credentials: an access key pair, an optional session token and an optional expiry.
///
/// When `Credentials` is dropped, its contents are zeroed in memory. Credentials use an interior
/// Arc so that clones share a single copy of the secret.
#[derive(Clone, Eq, PartialEq)]
pub struct Credentials(Arc<Inner>);

#[derive(Clone, Eq, PartialEq)]
struct Inner {
    access_key_id: Zeroizing<String>,
    secret_access_key: Zeroizing<String>,
    session_token: Zeroizing<Option<String>>,

    /// The time after which these credentials must not be used. `None` for credentials that
    /// never expire.
    expires_after: Option<SystemTime>,

    provider_name: &'static str,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut creds = f.debug_struct("Credentials");
        creds
            .field("provider_name", &self.0.provider_name)
            .field("access_key_id", &self.0.access_key_id.as_str())
            .field("secret_access_key", &"** redacted **");
        if self.session_token().is_some() {
            creds.field("session_token", &"** redacted **");
        }
        match self
            .expiry()
            .and_then(|expiry| expiry.duration_since(UNIX_EPOCH).ok())
        {
            Some(since_epoch) => creds.field("expires_after", &since_epoch.as_secs()),
            None => creds.field("expires_after", &"never"),
        };
        creds.finish()
    }
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
        expires_after: Option<SystemTime>,
        provider_name: &'static str,
    ) -> Self {
        Credentials(Arc::new(Inner {
            access_key_id: Zeroizing::new(access_key_id.into()),
            secret_access_key: Zeroizing::new(secret_access_key.into()),
            session_token: Zeroizing::new(session_token),
            expires_after,
            provider_name,
        }))
    }

    /// Credentials from hardcoded keys. Prefer a credentials provider in real applications.
    pub fn from_keys(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self::new(
            access_key_id,
            secret_access_key,
            session_token,
            None,
            STATIC_CREDENTIALS,
        )
    }

    pub fn access_key_id(&self) -> &str {
        &self.0.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.0.secret_access_key
    }

    pub fn session_token(&self) -> Option<&str> {
        self.0.session_token.as_deref()
    }

    pub fn expiry(&self) -> Option<SystemTime> {
        self.0.expires_after
    }

    pub fn expiry_mut(&mut self) -> &mut Option<SystemTime> {
        &mut Arc::make_mut(&mut self.0).expires_after
    }

    /// Name of the provider that loaded these credentials.
    pub fn provider_name(&self) -> &'static str {
        self.0.provider_name
    }

    /// True when either key is empty.
    pub fn is_empty(&self) -> bool {
        self.access_key_id().is_empty() || self.secret_access_key().is_empty()
    }

    /// True when the keys are unusable or the expiry falls within `expiry_window` of `now`.
    pub fn needs_refresh(&self, now: SystemTime, expiry_window: Duration) -> bool {
        if self.is_empty() {
            return true;
        }
        match self.expiry() {
            Some(expiry) => now + expiry_window >= expiry,
            None => false,
        }
    }
}
