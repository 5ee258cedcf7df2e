/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Credential providers for the AWS runtime
//!
//! Most applications want the [default chain](default_provider::credential::DefaultCredentialsChain):
//! ```rust,no_run
//! use aws_types::credential::ProvideCredentials;
//!
//! # async fn docs() {
//! let provider = aws_config::default_provider();
//! let credentials = provider.provide_credentials().await;
//! # }
//! ```
//!
//! Every provider can also be used on its own. Providers are configured through a
//! [`ProviderConfig`](provider_config::ProviderConfig), which supplies the environment, the
//! filesystem, the HTTP connector and the clock.

pub mod connector;
pub mod container;
pub mod credential_process;
pub mod default_provider;
pub mod environment;
pub mod imds;
pub mod meta;
pub mod profile;
pub mod provider_config;
pub mod sts;
pub mod web_identity_token;

mod http_provider;
mod json_credentials;

pub use default_provider::default_provider;
