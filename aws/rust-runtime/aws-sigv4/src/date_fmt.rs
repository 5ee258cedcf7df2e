/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use chrono::{DateTime, Utc};
use std::time::SystemTime;

const DATE_TIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const DATE_FORMAT: &str = "%Y%m%d";

/// Formats `time` as a basic ISO-8601 date, e.g. `20150830`.
pub fn format_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(DATE_FORMAT).to_string()
}

/// Formats `time` as a basic ISO-8601 date-time, e.g. `20150830T123600Z`.
pub fn format_date_time(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format(DATE_TIME_FORMAT)
        .to_string()
}

#[cfg(test)]
pub(crate) mod test_parsers {
    use chrono::{NaiveDateTime, TimeZone, Utc};
    use std::time::SystemTime;

    pub(crate) fn parse_date_time(s: &str) -> SystemTime {
        let naive = NaiveDateTime::parse_from_str(s, super::DATE_TIME_FORMAT).unwrap();
        Utc.from_utc_datetime(&naive).into()
    }
}
