/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! p4tagged: server timestamps
//!
//! The server reports times in one of two representations, depending on the
//! command which produced the record:
//!
//! *   Unix epoch seconds (e.g. `Update` in the output of `streams`), which
//!     must be shifted into the server's local time using the UTC offset the
//!     server advertises and a flag telling whether daylight saving time on
//!     the server differs from the offset
//! *   a pre-formatted local date/time string (e.g. `Update` in the output of
//!     `stream -o`), which is parsed directly
//!
//! Neither representation carries a time zone once decoded; `ServerTime` is
//! a naive (server-local) date/time.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use log::trace;
use serde::{Serialize, Serializer};

/// Format used when printing a `ServerTime` (and the first one tried when
/// parsing).
pub const SERVER_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

// Formats accepted by `ServerTime::parse`, in order of preference.
const PARSE_FORMATS: &[&str] = &[
    SERVER_TIME_FORMAT,
    "%Y/%m/%d:%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];
const PARSE_DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%Y-%m-%d"];

/// A server-local date and time.
///
/// The default value is `0001/01/01 00:00:00`, used whenever a record does not
/// carry the field or carries something unparseable.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ServerTime(pub NaiveDateTime);

impl ServerTime {
    /// The "unset" value: midnight on 1 January of year 1.
    pub fn min_value() -> ServerTime {
        ServerTime(first_day().and_time(Default::default()))
    }

    /// True unless this is `min_value()`
    pub fn is_set(&self) -> bool {
        *self != ServerTime::min_value()
    }

    /// Parse a pre-formatted date or date/time. Returns `None` when no
    /// accepted format matches.
    pub fn parse(value: &str) -> Option<ServerTime> {
        let value = value.trim();
        for fmt in PARSE_FORMATS {
            if let Ok(t) = NaiveDateTime::parse_from_str(value, fmt) {
                return Some(ServerTime(t));
            }
        }
        for fmt in PARSE_DATE_FORMATS {
            if let Ok(d) = NaiveDate::parse_from_str(value, fmt) {
                return Some(ServerTime(d.and_time(Default::default())));
            }
        }
        trace!("Not a date: {:?}", value);
        None
    }

    /// Like `parse` but yields `min_value()` on failure
    pub fn parse_or_default(value: &str) -> ServerTime {
        ServerTime::parse(value).unwrap_or_default()
    }

    /// Convert Unix epoch seconds (given as text) to server-local time.
    ///
    /// `offset` is the UTC offset advertised by the server, e.g. `-0800` or
    /// `-0800 PST` (only the leading `±HHMM` token is used; anything
    /// unparseable counts as UTC). When `dst_mismatch` is true the offset
    /// describes standard time while the server currently observes daylight
    /// saving time, so one extra hour is added.
    pub fn from_epoch(seconds: &str, offset: &str, dst_mismatch: bool) -> ServerTime {
        let secs: i64 = match seconds.trim().parse() {
            Ok(s) => s,
            Err(_) => {
                trace!("Not an epoch time: {:?}", seconds);
                return ServerTime::min_value();
            }
        };
        let utc = match DateTime::<Utc>::from_timestamp(secs, 0) {
            Some(t) => t.naive_utc(),
            None => return ServerTime::min_value(),
        };
        let mut shift = Duration::seconds(i64::from(parse_utc_offset(offset)));
        if dst_mismatch {
            shift = shift + Duration::hours(1);
        }
        utc.checked_add_signed(shift).map_or_else(|| {
            trace!("Epoch time out of range: {:?} {:?}", seconds, offset);
            ServerTime::min_value()
        }, ServerTime)
    }
}

impl Default for ServerTime {
    fn default() -> ServerTime {
        ServerTime::min_value()
    }
}

impl fmt::Display for ServerTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.format(SERVER_TIME_FORMAT))
    }
}

impl Serialize for ServerTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// How a record encodes its timestamps; chosen by the caller from the command
/// which produced the record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimeEncoding {
    /// Epoch seconds, to be shifted by the server's offset
    Epoch {
        /// Server UTC offset text, e.g. `-0800 PST`
        offset: String,
        /// Whether the server's DST state differs from `offset`
        dst_mismatch: bool,
    },
    /// Pre-formatted local date/time text
    Formatted,
}

impl TimeEncoding {
    /// Decode one timestamp field value
    pub fn decode(&self, value: &str) -> ServerTime {
        match *self {
            TimeEncoding::Epoch { ref offset, dst_mismatch } =>
                ServerTime::from_epoch(value, offset, dst_mismatch),
            TimeEncoding::Formatted => ServerTime::parse_or_default(value),
        }
    }
}

/// Parse a `±HHMM` offset (first whitespace-separated token) into seconds east
/// of UTC. Returns zero when the text is not an offset.
pub fn parse_utc_offset(offset: &str) -> i32 {
    let tok = match offset.split_whitespace().next() {
        Some(t) => t,
        None => return 0,
    };
    let (sign, digits) = match tok.as_bytes().first() {
        Some(b'-') => (-1, &tok[1..]),
        Some(b'+') => (1, &tok[1..]),
        _ => (1, tok),
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        trace!("Not a UTC offset: {:?}", offset);
        return 0;
    }
    let hours: i32 = digits[0..2].parse().unwrap_or(0);
    let minutes: i32 = digits[2..4].parse().unwrap_or(0);
    sign * (hours * 3600 + minutes * 60)
}

fn first_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> ServerTime {
    ServerTime(NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, mi, s).unwrap())
}

#[test]
fn parse_formats() {
    assert_eq!(ServerTime::parse("2024/01/15 10:30:00"), Some(at(2024, 1, 15, 10, 30, 0)));
    assert_eq!(ServerTime::parse("2024/01/15"), Some(at(2024, 1, 15, 0, 0, 0)));
    assert_eq!(ServerTime::parse("2024-01-15 10:30:00"), Some(at(2024, 1, 15, 10, 30, 0)));
    assert_eq!(ServerTime::parse("yesterday"), None);
    assert!(!ServerTime::parse_or_default("").is_set());
}

#[test]
fn epoch_with_offset() {
    // 2024-01-15 18:00:00 UTC
    let secs = "1705341600";
    assert_eq!(ServerTime::from_epoch(secs, "", false), at(2024, 1, 15, 18, 0, 0));
    assert_eq!(ServerTime::from_epoch(secs, "-0800 PST", false), at(2024, 1, 15, 10, 0, 0));
    assert_eq!(ServerTime::from_epoch(secs, "-0800 PST", true), at(2024, 1, 15, 11, 0, 0));
    assert_eq!(ServerTime::from_epoch(secs, "+0530", false), at(2024, 1, 15, 23, 30, 0));
    assert_eq!(ServerTime::from_epoch("soon", "+0530", false), ServerTime::min_value());
}

#[test]
fn epoch_out_of_range() {
    // the last second chrono can represent, pushed past it by the offset
    let max = NaiveDateTime::MAX.and_utc().timestamp().to_string();
    assert_eq!(ServerTime::from_epoch(&max, "+1400", true), ServerTime::min_value());
    assert_eq!(ServerTime::from_epoch("8210266876799", "+1400", true), ServerTime::min_value());
    assert_eq!(ServerTime::from_epoch("99999999999999999", "", false), ServerTime::min_value());
}

#[test]
fn min_value_display() {
    assert_eq!(ServerTime::default().to_string(), "0001/01/01 00:00:00");
    assert_eq!(parse_utc_offset("PST"), 0);
    assert_eq!(parse_utc_offset("-0130"), -5400);
}
