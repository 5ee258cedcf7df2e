/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! AWS credentials and the providers that load them.
//!
//! ## Implementing your own credentials provider
//!
//! [`Credentials`] implement [`ProvideCredentials`] directly, so static keys need no provider
//! of their own:
//! ```rust
//! use aws_types::credential::{Credentials, ProvideCredentials};
//!
//! # async fn docs() {
//! let creds = Credentials::from_keys("akid", "secret_key", None);
//! assert_eq!(creds.provide_credentials().await.unwrap().access_key_id(), "akid");
//! # }
//! ```
//!
//! Providers that load credentials dynamically usually define an inherent `async fn` and call
//! it from the trait implementation. Wrapping the load in a
//! [`CredentialsCache`](lazy_caching::CredentialsCache) gives the provider caching and ensures
//! only one load runs at a time:
//! ```rust
//! use aws_types::credential::lazy_caching::CredentialsCache;
//! use aws_types::credential::{future, CredentialsError, Credentials, ProvideCredentials};
//!
//! #[derive(Debug)]
//! struct SubprocessCredentialProvider {
//!     cache: CredentialsCache,
//! }
//!
//! async fn invoke_command(command: &str) -> String {
//!     // implementation elided...
//!     # String::from("akid\nsecret")
//! }
//!
//! /// Parse access key and secret from the first two lines of a string
//! fn parse_credentials(creds: &str) -> aws_types::credential::Result {
//!     let mut lines = creds.lines();
//!     let akid = lines.next().ok_or_else(|| CredentialsError::provider_error("invalid credentials"))?;
//!     let secret = lines.next().ok_or_else(|| CredentialsError::provider_error("invalid credentials"))?;
//!     Ok(Credentials::new(akid, secret, None, None, "CustomCommand"))
//! }
//!
//! impl SubprocessCredentialProvider {
//!     async fn load_credentials(&self) -> aws_types::credential::Result {
//!         let creds = invoke_command("load-credentials.py").await;
//!         parse_credentials(&creds)
//!     }
//! }
//!
//! impl ProvideCredentials for SubprocessCredentialProvider {
//!     fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
//!     where
//!         Self: 'a,
//!     {
//!         future::ProvideCredentials::new(self.cache.get_or_load(move || self.load_credentials()))
//!     }
//! }
//! ```

mod credentials;
pub mod lazy_caching;
pub mod provide_credentials;
pub mod refresh;

pub use credentials::Credentials;
pub use provide_credentials::{
    future, provide_credentials_fn, CredentialsError, ProvideCredentials, Result,
    SharedCredentialsProvider,
};
