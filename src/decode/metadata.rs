/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! p4tagged: server metadata, from the output of `info`

use std::fmt;

use log::trace;
use serde::Serialize;

use crate::date::ServerTime;
use crate::decode::license::ServerLicense;
use crate::record::{parse_int, FlatRecord};

/// A `host:port` address.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default, Serialize)]
pub struct ServerAddress(pub String);

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The server's version, from `product/platform/major/minor (yyyy/mm/dd)`.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize)]
pub struct ServerVersion {
    pub product: String,
    pub platform: String,
    pub major: String,
    pub minor: String,
    pub date: ServerTime,
}

impl ServerVersion {
    /// Parse a version string such as `P4D/LINUX26X86_64/2023.1/2468153 (2023/05/08)`.
    ///
    /// Missing parts stay empty.
    pub fn parse(value: &str) -> ServerVersion {
        let (ident, date) = match value.find('(') {
            Some(p) => (&value[..p], value[p..].trim_matches(|c: char| c == '(' || c == ')' || c.is_whitespace())),
            None => (value, ""),
        };
        let mut parts = ident.trim().split('/').map(|p| p.trim().to_string());
        ServerVersion {
            product: parts.next().unwrap_or_default(),
            platform: parts.next().unwrap_or_default(),
            major: parts.next().unwrap_or_default(),
            minor: parts.next().unwrap_or_default(),
            date: ServerTime::parse_or_default(date),
        }
    }
}

/// Metadata about a server.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct ServerMetaData {
    pub name: String,
    pub address: ServerAddress,
    pub root: String,
    pub date: ServerTime,
    /// Offset and zone following the date, e.g. `-0800 PST`
    pub date_time_offset: String,
    /// Seconds
    pub uptime: i32,
    pub version: ServerVersion,
    pub license: Option<ServerLicense>,
    pub license_ip: String,
    pub case_sensitive: bool,
    pub unicode_enabled: bool,
    pub move_enabled: bool,
    #[serde(skip)]
    pub raw: FlatRecord,
}

impl Default for ServerMetaData {
    fn default() -> ServerMetaData {
        ServerMetaData {
            name: String::new(),
            address: ServerAddress::default(),
            root: String::new(),
            date: ServerTime::default(),
            date_time_offset: String::new(),
            uptime: 0,
            version: ServerVersion::default(),
            license: None,
            license_ip: String::new(),
            case_sensitive: false,
            unicode_enabled: false,
            // moves are only off when the server says so
            move_enabled: true,
            raw: FlatRecord::default(),
        }
    }
}

impl ServerMetaData {
    /// Decode the record produced by `info`.
    pub fn decode(record: &FlatRecord) -> ServerMetaData {
        let mut md = ServerMetaData::default();
        if let Some(v) = record.get("serverName") {
            md.name = v.to_string();
        }
        if let Some(v) = record.get("serverAddress") {
            md.address = ServerAddress(v.to_string());
        }
        if let Some(v) = record.get("serverRoot") {
            md.root = v.to_string();
        }
        if let Some(v) = record.get("serverDate") {
            let (date, offset) = split_server_date(v);
            md.date = date;
            md.date_time_offset = offset;
        }
        if let Some(v) = record.get("serverUptime") {
            md.uptime = parse_uptime(v);
        }
        if let Some(v) = record.get("serverVersion") {
            md.version = ServerVersion::parse(v);
        }
        if let Some(v) = record.get("serverLicense") {
            md.license = ServerLicense::from_summary(v);
        }
        if let Some(v) = record.get("serverLicense-ip") {
            md.license_ip = v.to_string();
        }
        md.case_sensitive = record.get("caseHandling") == Some("sensitive");
        md.unicode_enabled = record.flag("unicode");
        md.move_enabled = record.get("move") != Some("disabled");
        md.raw = record.clone();
        md
    }
}

// `2024/01/15 10:23:45 -0800 PST` → date from the first two words, the rest
// as offset text.
fn split_server_date(value: &str) -> (ServerTime, String) {
    let words: Vec<&str> = value.split_whitespace().collect();
    let date = match words.len() {
        0 => ServerTime::default(),
        1 => ServerTime::parse_or_default(words[0]),
        _ => ServerTime::parse_or_default(&format!("{} {}", words[0], words[1])),
    };
    let offset = words.iter().skip(2).cloned().collect::<Vec<_>>().join(" ");
    (date, offset)
}

// Uptime is `HH:MM:SS` on current servers, plain seconds on some old ones.
fn parse_uptime(value: &str) -> i32 {
    let parts: Vec<&str> = value.trim().split(':').collect();
    if parts.len() == 3 {
        parts.iter()
            .try_fold(0i32, |acc, p| acc.checked_mul(60)?.checked_add(parse_int("serverUptime", p)))
            .unwrap_or_else(|| {
                trace!("Uptime out of range: {:?}", value);
                0
            })
    } else {
        parse_int("serverUptime", value)
    }
}

#[test]
fn version_string() {
    let v = ServerVersion::parse("P4D/LINUX26X86_64/2023.1/2468153 (2023/05/08)");
    assert_eq!(v.product, "P4D");
    assert_eq!(v.platform, "LINUX26X86_64");
    assert_eq!(v.major, "2023.1");
    assert_eq!(v.minor, "2468153");
    assert_eq!(v.date.to_string(), "2023/05/08 00:00:00");
    assert_eq!(ServerVersion::parse("garbage"), ServerVersion {
        product: "garbage".to_string(),
        ..ServerVersion::default()
    });
}

#[test]
fn date_and_uptime() {
    let (date, offset) = split_server_date("2024/01/15 10:23:45 -0800 PST");
    assert_eq!(date.to_string(), "2024/01/15 10:23:45");
    assert_eq!(offset, "-0800 PST");
    assert_eq!(parse_uptime("01:02:03"), 3723);
    assert_eq!(parse_uptime("42"), 42);
    assert_eq!(parse_uptime("2147483647:00:00"), 0);
    assert_eq!(parse_uptime("596523:14:07"), i32::MAX);
}

#[test]
fn defaults_when_empty() {
    let md = ServerMetaData::decode(&FlatRecord::new());
    assert_eq!(md.name, "");
    assert!(md.license.is_none());
    assert!(md.move_enabled);
    assert!(!md.case_sensitive);
    assert!(!md.date.is_set());
}
