/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! p4tagged: stream history entries
//!
//! A single record carries many log entries: entry `i` uses keys `action<i>`,
//! `change<i>`, ... and its integrations use the doubly-indexed keys
//! `stream<i>,<j>`, `how<i>,<j>`, ...

use serde::Serialize;

use crate::decode::{apply_fields, FieldTable};
use crate::record::{parse_int, FlatRecord, INDEX_SEPARATOR};

/// An integration recorded against a stream log entry.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize)]
pub struct StreamIntegrationLog {
    pub stream: String,
    pub how: String,
    pub field: String,
    pub start_from_change: i32,
    pub end_from_change: i32,
}

static INTEGRATION_FIELDS: &FieldTable<StreamIntegrationLog> = &[
    ("stream", |l: &mut StreamIntegrationLog, v: &str| l.stream = v.to_string()),
    ("how", |l: &mut StreamIntegrationLog, v: &str| l.how = v.to_string()),
    ("field", |l: &mut StreamIntegrationLog, v: &str| l.field = v.to_string()),
    ("startFromChange", |l: &mut StreamIntegrationLog, v: &str|
        l.start_from_change = parse_int("startFromChange", v)),
    ("endFromChange", |l: &mut StreamIntegrationLog, v: &str|
        l.end_from_change = parse_int("endFromChange", v)),
];

impl StreamIntegrationLog {
    /// Decode integration `inner` of log entry `outer`.
    pub fn decode(record: &FlatRecord, outer: usize, inner: usize) -> StreamIntegrationLog {
        let suffix = format!("{}{}{}", outer, INDEX_SEPARATOR, inner);
        let mut log = StreamIntegrationLog::default();
        apply_fields(record, INTEGRATION_FIELDS, &suffix, &mut log);
        log
    }
}

/// One entry of a stream's history.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize)]
pub struct StreamLog {
    pub action: String,
    pub change: i32,
    pub stream: String,
    /// Epoch seconds, as reported
    pub date: i32,
    pub user: String,
    pub associated_change: i32,
    pub client: String,
    pub description: String,
    pub integrations: Vec<StreamIntegrationLog>,
}

static LOG_FIELDS: &FieldTable<StreamLog> = &[
    ("action", |l: &mut StreamLog, v: &str| l.action = v.to_string()),
    ("change", |l: &mut StreamLog, v: &str| l.change = parse_int("change", v)),
    ("stream", |l: &mut StreamLog, v: &str| l.stream = v.to_string()),
    ("time", |l: &mut StreamLog, v: &str| l.date = parse_int("time", v)),
    ("user", |l: &mut StreamLog, v: &str| l.user = v.to_string()),
    ("client", |l: &mut StreamLog, v: &str| l.client = v.to_string()),
    ("associatedChange", |l: &mut StreamLog, v: &str|
        l.associated_change = parse_int("associatedChange", v)),
    ("desc", |l: &mut StreamLog, v: &str| l.description = v.to_string()),
];

impl StreamLog {
    /// Decode log entry `i` of a record. The caller knows which entries exist;
    /// a missing entry decodes to the default value.
    pub fn decode(record: &FlatRecord, i: usize) -> StreamLog {
        let mut log = StreamLog::default();
        apply_fields(record, LOG_FIELDS, &i.to_string(), &mut log);
        log.integrations = (0..record.indexed2("stream", i).len())
            .map(|j| StreamIntegrationLog::decode(record, i, j))
            .collect();
        log
    }

    /// Decode every log entry of a record, i.e. entries `0..n` where
    /// `change<n>` is the first absent key.
    pub fn decode_all(record: &FlatRecord) -> Vec<StreamLog> {
        (0..record.count_indexed("change"))
            .map(|i| StreamLog::decode(record, i))
            .collect()
    }
}

#[test]
fn decode_entry_and_integrations() {
    let rec: FlatRecord = vec![
        ("action0", "create"),
        ("change0", "12"),
        ("time0", "1705341600"),
        ("user0", "bob"),
        ("stream0,0", "//streams/main"),
        ("how0,0", "merge from"),
        ("startFromChange0,0", "3"),
        ("endFromChange0,0", "9"),
        ("stream0,1", "//streams/rel"),
        ("change1", "13"),
    ].into_iter().collect();
    let logs = StreamLog::decode_all(&rec);
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].action, "create");
    assert_eq!(logs[0].date, 1705341600);
    assert_eq!(logs[0].integrations.len(), 2);
    assert_eq!(logs[0].integrations[0].how, "merge from");
    assert_eq!(logs[0].integrations[0].end_from_change, 9);
    assert_eq!(logs[0].integrations[1].stream, "//streams/rel");
    assert_eq!(logs[1].change, 13);
    assert!(logs[1].integrations.is_empty());
}
