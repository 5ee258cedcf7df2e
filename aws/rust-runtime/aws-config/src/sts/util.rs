/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::provider_config::ProviderConfig;
use crate::sts::client::{SharedStsClient, StsError, StsQueryClient};
use smithy_types::Value;
use std::convert::TryFrom;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// An STS client that is only constructed when it is first needed
///
/// Building the client requires a connector. Deferring construction means a provider that is
/// never asked for credentials never fails for lack of one.
#[derive(Debug, Clone)]
pub(crate) struct LazyStsClient {
    conf: ProviderConfig,
    client: Arc<Mutex<Option<SharedStsClient>>>,
}

impl LazyStsClient {
    pub(crate) fn new(conf: ProviderConfig, client: Option<SharedStsClient>) -> Self {
        LazyStsClient {
            conf,
            client: Arc::new(Mutex::new(client)),
        }
    }

    pub(crate) fn get(&self) -> Result<SharedStsClient, StsError> {
        let mut slot = self.client.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = &*slot {
            return Ok(client.clone());
        }
        let client: SharedStsClient = Arc::new(StsQueryClient::from_provider_config(&self.conf)?);
        tracing::debug!(client = ?client, "constructed STS client");
        *slot = Some(client.clone());
        Ok(client)
    }
}

/// Output members of the last successful STS call other than the credentials themselves
#[derive(Debug, Clone, Default)]
pub(crate) struct AuxiliaryData(Arc<Mutex<Option<Value>>>);

impl AuxiliaryData {
    pub(crate) fn set(&self, data: &Value) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(data.clone());
    }

    pub(crate) fn get(&self) -> Option<Value> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Session name used when none was configured: `aws-sdk-rust-<epoch millis>`
pub(crate) fn default_session_name(now: SystemTime) -> String {
    let millis = now
        .duration_since(UNIX_EPOCH)
        .map(|since| since.as_millis())
        .unwrap_or_default();
    format!("aws-sdk-rust-{}", millis)
}

/// `DurationSeconds` for an STS request, saturating at `i32::MAX`
pub(crate) fn duration_seconds(duration: Duration) -> i32 {
    i32::try_from(duration.as_secs()).unwrap_or(i32::MAX)
}
