/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! XML reading and writing for the XML-based protocols.

pub mod decode;
pub mod encode;
mod escape;
mod unescape;
