/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Functions to create signing keys and calculate signatures.

use crate::date_fmt::format_date;
use hmac::{digest::FixedOutput, Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

/// Signing keys are 32 bytes of HMAC-SHA256 output.
pub type SigningKey = [u8; 32];

/// HashedPayload = Lowercase(HexEncode(Hash(requestPayload)))
pub fn sha256_hex_string(bytes: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize_fixed())
}

fn hmac(key: &[u8], data: &[u8]) -> SigningKey {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    let mut out = [0; 32];
    out.copy_from_slice(&mac.finalize_fixed());
    out
}

/// Calculates a SigV4 signature
pub fn calculate_signature(signing_key: impl AsRef<[u8]>, string_to_sign: &[u8]) -> String {
    hex::encode(hmac(signing_key.as_ref(), string_to_sign))
}

/// Generates a signing key for SigV4
pub fn generate_signing_key(
    secret: &str,
    time: SystemTime,
    region: &str,
    service: &str,
) -> SigningKey {
    // kSecret = your secret access key
    // kDate = HMAC("AWS4" + kSecret, Date)
    // kRegion = HMAC(kDate, Region)
    // kService = HMAC(kRegion, Service)
    // kSigning = HMAC(kService, "aws4_request")
    let secret = format!("AWS4{}", secret);
    let key = hmac(secret.as_bytes(), format_date(time).as_bytes());
    let key = hmac(&key, region.as_bytes());
    let key = hmac(&key, service.as_bytes());
    hmac(&key, b"aws4_request")
}

const MAX_CACHE_ENTRIES: usize = 50;

/// Caches derived signing keys by (key material, date, region, service).
///
/// Keys are indexed by an HMAC of the access key id under the secret, so the cache never holds
/// the secret itself. The oldest entry is evicted once the cache holds 50 keys.
#[derive(Default)]
pub struct SigningKeyCache {
    inner: Mutex<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    keys: HashMap<String, SigningKey>,
    order: VecDeque<String>,
}

impl fmt::Debug for SigningKeyCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeyCache")
            .field("len", &self.len())
            .finish()
    }
}

impl SigningKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cached signing key for these inputs, deriving and caching it on a miss.
    pub fn get_or_generate(
        &self,
        access_key: &str,
        secret: &str,
        time: SystemTime,
        region: &str,
        service: &str,
    ) -> SigningKey {
        let cache_key = format!(
            "{}_{}_{}_{}",
            hex::encode(hmac(secret.as_bytes(), access_key.as_bytes())),
            format_date(time),
            region,
            service
        );
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(key) = inner.keys.get(&cache_key) {
            tracing::trace!(region, service, "signing key cache hit");
            return *key;
        }
        let key = generate_signing_key(secret, time, region, service);
        if inner.order.len() >= MAX_CACHE_ENTRIES {
            if let Some(oldest) = inner.order.pop_front() {
                inner.keys.remove(&oldest);
            }
        }
        inner.order.push_back(cache_key.clone());
        inner.keys.insert(cache_key, key);
        key
    }
}
