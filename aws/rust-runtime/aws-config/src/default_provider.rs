/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Default provider chains

/// Default credentials provider chain
pub mod credential;

pub use credential::{default_provider, DefaultCredentialsChain};
