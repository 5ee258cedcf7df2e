/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Point-in-time values and the three wire formats they travel in.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use std::error::Error;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const NANOS_PER_SECOND: u32 = 1_000_000_000;

/// A timestamp with nanosecond precision, stored relative to the Unix epoch.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct Instant {
    seconds: i64,
    subsecond_nanos: u32,
}

/// Wire formats for timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// ISO-8601 / RFC-3339, e.g. `2019-12-16T23:48:18Z`
    DateTime,
    /// RFC-822 style HTTP date, e.g. `Mon, 16 Dec 2019 23:48:18 GMT`
    HttpDate,
    /// Seconds since the Unix epoch, possibly fractional
    EpochSeconds,
}

impl Format {
    /// Resolves a timestamp format name used in API metadata (`iso8601`, `rfc822`, `unixTimestamp`).
    pub fn from_metadata_name(name: &str) -> Option<Self> {
        match name {
            "iso8601" => Some(Format::DateTime),
            "rfc822" => Some(Format::HttpDate),
            "unixTimestamp" => Some(Format::EpochSeconds),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstantParseError {
    input: String,
    format: Format,
}

impl fmt::Display for InstantParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` is not a valid {:?} timestamp", self.input, self.format)
    }
}

impl Error for InstantParseError {}

impl Instant {
    pub fn from_epoch_seconds(epoch_seconds: i64) -> Self {
        Instant {
            seconds: epoch_seconds,
            subsecond_nanos: 0,
        }
    }

    pub fn from_epoch_millis(epoch_millis: i64) -> Self {
        Instant {
            seconds: epoch_millis.div_euclid(1000),
            subsecond_nanos: (epoch_millis.rem_euclid(1000) as u32) * 1_000_000,
        }
    }

    pub fn from_secs_and_nanos(seconds: i64, subsecond_nanos: u32) -> Self {
        Instant {
            seconds,
            subsecond_nanos: subsecond_nanos % NANOS_PER_SECOND,
        }
    }

    pub fn from_f64(epoch_seconds: f64) -> Self {
        let seconds = epoch_seconds.floor();
        let nanos = ((epoch_seconds - seconds) * NANOS_PER_SECOND as f64).round() as u32;
        if nanos >= NANOS_PER_SECOND {
            Instant::from_epoch_seconds(seconds as i64 + 1)
        } else {
            Instant::from_secs_and_nanos(seconds as i64, nanos)
        }
    }

    pub fn from_system_time(system_time: SystemTime) -> Self {
        match system_time.duration_since(UNIX_EPOCH) {
            Ok(duration) => Instant {
                seconds: duration.as_secs() as i64,
                subsecond_nanos: duration.subsec_nanos(),
            },
            Err(before_epoch) => {
                let duration = before_epoch.duration();
                let mut seconds = -(duration.as_secs() as i64);
                let mut nanos = duration.subsec_nanos();
                if nanos > 0 {
                    seconds -= 1;
                    nanos = NANOS_PER_SECOND - nanos;
                }
                Instant::from_secs_and_nanos(seconds, nanos)
            }
        }
    }

    pub fn to_system_time(&self) -> SystemTime {
        if self.seconds >= 0 {
            UNIX_EPOCH + Duration::new(self.seconds as u64, self.subsecond_nanos)
        } else {
            UNIX_EPOCH - Duration::from_secs(self.seconds.unsigned_abs())
                + Duration::from_nanos(self.subsecond_nanos as u64)
        }
    }

    pub fn from_str(s: &str, format: Format) -> Result<Self, InstantParseError> {
        let err = || InstantParseError {
            input: s.to_string(),
            format,
        };
        let s = s.trim();
        match format {
            Format::DateTime => DateTime::parse_from_rfc3339(s)
                .map(|dt| Self::from_chrono(dt.with_timezone(&Utc)))
                .map_err(|_| err()),
            Format::HttpDate => DateTime::parse_from_rfc2822(s)
                .map(|dt| Self::from_chrono(dt.with_timezone(&Utc)))
                .map_err(|_| err()),
            Format::EpochSeconds => parse_epoch_decimal(s)
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|secs| secs.is_finite())
                        .map(Self::from_f64)
                })
                .ok_or_else(err),
        }
    }

    fn from_chrono(dt: DateTime<Utc>) -> Self {
        Instant::from_secs_and_nanos(dt.timestamp(), dt.timestamp_subsec_nanos())
    }

    fn to_chrono(self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.seconds, self.subsecond_nanos).single()
    }

    pub fn has_nanos(&self) -> bool {
        self.subsecond_nanos != 0
    }

    pub fn epoch_fractional_seconds(&self) -> f64 {
        self.seconds as f64 + self.subsecond_nanos as f64 / NANOS_PER_SECOND as f64
    }

    pub fn epoch_seconds(&self) -> i64 {
        self.seconds
    }

    pub fn epoch_millis(&self) -> i64 {
        self.seconds * 1000 + (self.subsecond_nanos / 1_000_000) as i64
    }

    /// Formats this instant. `DateTime` drops sub-second precision to match the
    /// second-granularity timestamps services expect in request bodies.
    pub fn fmt(&self, format: Format) -> String {
        match format {
            Format::EpochSeconds => {
                if self.subsecond_nanos == 0 {
                    format!("{}", self.seconds)
                } else {
                    let (sign, whole, nanos) = if self.seconds < 0 {
                        ("-", -(self.seconds + 1), NANOS_PER_SECOND - self.subsecond_nanos)
                    } else {
                        ("", self.seconds, self.subsecond_nanos)
                    };
                    let fraction = format!("{:0>9}", nanos);
                    format!("{}{}.{}", sign, whole, fraction.trim_end_matches('0'))
                }
            }
            Format::DateTime => match self.to_chrono() {
                Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
                None => format!("{}", self.seconds),
            },
            Format::HttpDate => match self.to_chrono() {
                Some(dt) => dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
                None => format!("{}", self.seconds),
            },
        }
    }
}

/// Parses `[-]whole[.fraction]` digit by digit. Fraction digits past nanoseconds are dropped.
fn parse_epoch_decimal(s: &str) -> Option<Instant> {
    let (negative, unsigned) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let (whole, fraction) = match unsigned.find('.') {
        Some(dot) => (&unsigned[..dot], &unsigned[dot + 1..]),
        None => (unsigned, ""),
    };
    let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !digits(whole) || !digits(fraction) {
        return None;
    }
    let seconds: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().ok()?
    };
    let nanos = fraction
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(9)
        .fold(0u32, |acc, digit| acc * 10 + u32::from(digit - b'0'));
    Some(match (negative, nanos) {
        (false, _) => Instant::from_secs_and_nanos(seconds, nanos),
        (true, 0) => Instant::from_epoch_seconds(-seconds),
        (true, _) => Instant::from_secs_and_nanos(-seconds - 1, NANOS_PER_SECOND - nanos),
    })
}

impl From<SystemTime> for Instant {
    fn from(time: SystemTime) -> Self {
        Instant::from_system_time(time)
    }
}
