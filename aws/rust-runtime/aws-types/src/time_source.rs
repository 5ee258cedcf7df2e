/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Sources of "now", so expiry and signing can be tested and corrected for clock skew.

use std::fmt::Debug;
use std::sync::Arc;
#[cfg(any(test, feature = "test-util"))]
use std::sync::PoisonError;
use std::time::{Duration, SystemTime};

pub trait TimeSource: Send + Sync + Debug {
    fn now(&self) -> SystemTime;
}

pub type SharedTimeSource = Arc<dyn TimeSource>;

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Offset between the local clock and the service's clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSkew {
    /// The local clock is behind.
    Behind(Duration),
    /// The local clock is ahead.
    Ahead(Duration),
}

/// Applies a clock skew correction to another time source.
#[derive(Debug, Clone)]
pub struct SkewedTimeSource {
    inner: SharedTimeSource,
    skew: ClockSkew,
}

impl SkewedTimeSource {
    pub fn new(inner: SharedTimeSource, skew: ClockSkew) -> Self {
        SkewedTimeSource { inner, skew }
    }
}

impl TimeSource for SkewedTimeSource {
    fn now(&self) -> SystemTime {
        let now = self.inner.now();
        match self.skew {
            ClockSkew::Behind(offset) => now + offset,
            ClockSkew::Ahead(offset) => now - offset,
        }
    }
}

/// Time source that can be moved by hand in tests.
#[cfg(any(test, feature = "test-util"))]
#[derive(Clone, Debug)]
pub struct TestingTimeSource {
    now: Arc<std::sync::Mutex<SystemTime>>,
}

#[cfg(any(test, feature = "test-util"))]
impl TestingTimeSource {
    pub fn new(start_time: SystemTime) -> Self {
        Self {
            now: Arc::new(std::sync::Mutex::new(start_time)),
        }
    }

    pub fn set_time(&self, time: SystemTime) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = time;
    }

    pub fn advance(&self, delta: Duration) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) += delta;
    }
}

#[cfg(any(test, feature = "test-util"))]
impl TimeSource for TestingTimeSource {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod test {
    use super::{ClockSkew, SkewedTimeSource, TestingTimeSource, TimeSource};
    use std::sync::Arc;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn testing_time_source_moves_by_hand() {
        let time = TestingTimeSource::new(UNIX_EPOCH);
        assert_eq!(time.now(), UNIX_EPOCH);
        time.advance(Duration::from_secs(10));
        assert_eq!(time.now(), UNIX_EPOCH + Duration::from_secs(10));
    }

    #[test]
    fn poisoned_clock_keeps_its_time() {
        let time = TestingTimeSource::new(UNIX_EPOCH);
        let poisoner = time.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.now.lock().unwrap();
            panic!("poison the clock");
        })
        .join();
        assert!(time.now.is_poisoned());
        time.advance(Duration::from_secs(3));
        assert_eq!(time.now(), UNIX_EPOCH + Duration::from_secs(3));
    }

    #[test]
    fn skew_is_applied_in_both_directions() {
        let base = Arc::new(TestingTimeSource::new(UNIX_EPOCH + Duration::from_secs(100)));
        let behind = SkewedTimeSource::new(base.clone(), ClockSkew::Behind(Duration::from_secs(5)));
        let ahead = SkewedTimeSource::new(base, ClockSkew::Ahead(Duration::from_secs(5)));
        assert_eq!(behind.now(), UNIX_EPOCH + Duration::from_secs(105));
        assert_eq!(ahead.now(), UNIX_EPOCH + Duration::from_secs(95));
    }
}
