/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Load credentials from AWS Profiles
//!
//! AWS profiles are typically stored in `~/.aws/config` and `~/.aws/credentials`.

pub(crate) mod parser;
pub use parser::{Profile, ProfileParseError, ProfileSet, Property};

pub mod credentials;
pub mod mfa_token;

pub use credentials::{ProfileFileError, SharedIniFileProvider};
