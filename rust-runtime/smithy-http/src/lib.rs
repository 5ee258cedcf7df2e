/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Shape models, wire protocols and the HTTP connector seam used by the AWS clients.

pub mod connector;
pub mod endpoint;
pub mod header;
pub mod label;
pub mod protocol;
pub mod shape;

#[cfg(any(test, feature = "test-util"))]
pub mod test_connection;
