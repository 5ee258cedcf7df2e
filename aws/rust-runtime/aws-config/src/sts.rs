/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Credential providers backed by the AWS Security Token Service (STS).
//!
//! Every provider here exchanges something (long-lived credentials, a web identity token, a
//! SAML assertion) for temporary credentials. STS is reached through an [`StsClient`]; by
//! default a [`StsQueryClient`](client::StsQueryClient) is built from the provider's
//! [`ProviderConfig`](crate::provider_config::ProviderConfig) the first time credentials are
//! requested.

pub use assume_role::{AssumeRoleProvider, AssumeRoleProviderBuilder};
pub use client::{StsClient, StsError, StsResponse};
pub use saml::{SamlCredentialsProvider, SamlCredentialsProviderBuilder};
pub use session_token::{SessionTokenProvider, SessionTokenProviderBuilder};
pub use web_identity::{WebIdentityCredentialsProvider, WebIdentityCredentialsProviderBuilder};

mod assume_role;
pub mod client;
mod saml;
mod session_token;
pub(crate) mod util;
mod web_identity;
