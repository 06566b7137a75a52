/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! p4tagged: server license information
//!
//! The license command produces several record shapes depending on its
//! flags: the license spec itself (`-o`), usage against limits (`-u`) and one
//! record per network interface (`-L`). `ServerLicense::from_records` merges
//! them. The `info` command only carries a one-line summary, handled by
//! `ServerLicense::from_summary`.

use std::sync::OnceLock;

use log::trace;
use regex::Regex;
use serde::Serialize;

use crate::date::ServerTime;
use crate::decode::{apply_fields, decode_with, FieldTable};
use crate::record::{parse_bool, parse_int, parse_long, FlatRecord};

/// One network interface of the server host (from `license -L`).
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize)]
pub struct ServerIPMACAddress {
    pub interface: String,
    pub ipv4_address: String,
    pub ipv6_address: String,
    pub mac_address: String,
}

static ADDRESS_FIELDS: &FieldTable<ServerIPMACAddress> = &[
    ("interface", |a: &mut ServerIPMACAddress, v: &str| a.interface = v.to_string()),
    ("ipv4Address", |a: &mut ServerIPMACAddress, v: &str| a.ipv4_address = v.to_string()),
    ("ipv6Address", |a: &mut ServerIPMACAddress, v: &str| a.ipv6_address = v.to_string()),
    ("macAddress", |a: &mut ServerIPMACAddress, v: &str| a.mac_address = v.to_string()),
];

impl ServerIPMACAddress {
    /// Decode one interface record
    pub fn decode(record: &FlatRecord) -> ServerIPMACAddress {
        decode_with(record, ADDRESS_FIELDS)
    }
}

/// The server's license.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize)]
pub struct ServerLicense {
    // license spec (`license -o`)
    pub license: String,
    /// Epoch seconds
    pub license_expires: i64,
    /// Epoch seconds
    pub support_expires: i64,
    pub customer: String,
    pub application: String,
    pub ip_address: String,
    pub platform: String,
    pub clients: String,
    pub users: i32,
    pub extra_capabilities: Vec<String>,

    // usage (`license -u`)
    pub is_licensed: bool,
    pub user_count: String,
    pub user_limit: String,
    pub client_count: String,
    pub client_limit: String,
    pub file_count: String,
    pub file_limit: String,
    pub repo_count: String,
    pub repo_limit: String,
    /// Seconds
    pub license_time_remaining: i64,

    // interfaces (`license -L`)
    pub ip_mac_addresses: Vec<ServerIPMACAddress>,

    /// Expiry date from the `info` summary line
    pub expires: ServerTime,

    /// The last non-interface record merged into this license. Earlier
    /// records are replaced, not combined; their values survive only in the
    /// decoded fields above.
    #[serde(skip)]
    pub raw: FlatRecord,
}

static LICENSE_FIELDS: &FieldTable<ServerLicense> = &[
    ("License", |l: &mut ServerLicense, v: &str| l.license = v.to_string()),
    ("License-Expires", |l: &mut ServerLicense, v: &str|
        l.license_expires = parse_long("License-Expires", first_word(v))),
    ("Support-Expires", |l: &mut ServerLicense, v: &str|
        l.support_expires = parse_long("Support-Expires", first_word(v))),
    ("Customer", |l: &mut ServerLicense, v: &str| l.customer = v.to_string()),
    ("Application", |l: &mut ServerLicense, v: &str| l.application = v.to_string()),
    ("IPaddress", |l: &mut ServerLicense, v: &str| l.ip_address = v.to_string()),
    ("Platform", |l: &mut ServerLicense, v: &str| l.platform = v.to_string()),
    ("Clients", |l: &mut ServerLicense, v: &str| l.clients = v.to_string()),
    ("Users", |l: &mut ServerLicense, v: &str| l.users = parse_int("Users", v)),
    ("isLicensed", |l: &mut ServerLicense, v: &str| l.is_licensed = parse_bool(v)),
    ("userCount", |l: &mut ServerLicense, v: &str| l.user_count = v.to_string()),
    ("userLimit", |l: &mut ServerLicense, v: &str| l.user_limit = v.to_string()),
    ("clientCount", |l: &mut ServerLicense, v: &str| l.client_count = v.to_string()),
    ("clientLimit", |l: &mut ServerLicense, v: &str| l.client_limit = v.to_string()),
    ("fileCount", |l: &mut ServerLicense, v: &str| l.file_count = v.to_string()),
    ("fileLimit", |l: &mut ServerLicense, v: &str| l.file_limit = v.to_string()),
    ("repoCount", |l: &mut ServerLicense, v: &str| l.repo_count = v.to_string()),
    ("repoLimit", |l: &mut ServerLicense, v: &str| l.repo_limit = v.to_string()),
    ("licenseExpires", |l: &mut ServerLicense, v: &str|
        l.license_expires = parse_long("licenseExpires", v)),
    ("supportExpires", |l: &mut ServerLicense, v: &str|
        l.support_expires = parse_long("supportExpires", v)),
    ("licenseTimeRemaining", |l: &mut ServerLicense, v: &str|
        l.license_time_remaining = parse_long("licenseTimeRemaining", v)),
];

// Spec-form dates may be followed by a human-readable rendering.
fn first_word(v: &str) -> &str {
    v.split_whitespace().next().unwrap_or("")
}

fn users_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+) users").expect("valid regex"))
}

fn expires_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\(expires (\d{4}/\d{2}/\d{2})\)").expect("valid regex"))
}

impl ServerLicense {
    /// Merge the fields of one license record into `self`. Fields absent from
    /// the record keep their current value; `raw` becomes a copy of `record`.
    pub fn merge_record(&mut self, record: &FlatRecord) {
        apply_fields(record, LICENSE_FIELDS, "", self);
        let caps = record.indexed("ExtraCapabilities");
        if !caps.is_empty() {
            self.extra_capabilities = caps.into_iter().map(|c| c.to_string()).collect();
        }
        self.raw = record.clone();
    }

    /// Decode one license record
    pub fn decode(record: &FlatRecord) -> ServerLicense {
        let mut license = ServerLicense::default();
        license.merge_record(record);
        license
    }

    /// Decode the full output of the license command.
    ///
    /// Records carrying `interface` describe network interfaces; all other
    /// non-empty records are merged into the license. Returns `None` when
    /// there is no output at all.
    pub fn from_records(records: &[FlatRecord]) -> Option<ServerLicense> {
        if records.is_empty() {
            return None;
        }
        let mut license = ServerLicense::default();
        for record in records.iter().filter(|r| !r.is_empty()) {
            if record.contains("interface") {
                license.ip_mac_addresses.push(ServerIPMACAddress::decode(record));
            } else {
                license.merge_record(record);
            }
        }
        Some(license)
    }

    /// Extract the user count and expiry date from the free-text summary
    /// reported by `info` (e.g. `Acme 25 users (expires 2025/06/30)`).
    ///
    /// Returns `None` for an empty summary or `none` (unlicensed server).
    /// Either fact may be missing from the text, leaving its default.
    pub fn from_summary(summary: &str) -> Option<ServerLicense> {
        let summary = summary.trim();
        if summary.is_empty() || summary == "none" {
            return None;
        }
        let mut license = ServerLicense::default();
        if let Some(caps) = users_pattern().captures(summary) {
            license.users = parse_int("serverLicense", &caps[1]);
        }
        if let Some(caps) = expires_pattern().captures(summary) {
            license.expires = ServerTime::parse_or_default(&caps[1]);
        } else {
            trace!("No expiry date in license summary {:?}", summary);
        }
        Some(license)
    }
}

#[test]
fn summary_extraction() {
    let lic = ServerLicense::from_summary("Perforce Software 250 users (expires 2025/06/30)").unwrap();
    assert_eq!(lic.users, 250);
    assert_eq!(lic.expires.to_string(), "2025/06/30 00:00:00");

    let lic = ServerLicense::from_summary("(expires 2025/06/30) unlimited").unwrap();
    assert_eq!(lic.users, 0);
    assert!(lic.expires.is_set());

    let lic = ServerLicense::from_summary("10 USERS").unwrap();
    assert_eq!(lic.users, 10);
    assert!(!lic.expires.is_set());

    assert!(ServerLicense::from_summary("none").is_none());
    assert!(ServerLicense::from_summary("").is_none());
}

#[test]
fn capability_list_absent_is_empty() {
    let rec: FlatRecord = vec![("License", "ABC")].into_iter().collect();
    let lic = ServerLicense::decode(&rec);
    assert!(lic.extra_capabilities.is_empty());
    assert_eq!(lic.license, "ABC");
}
