/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! p4tagged: flat records and the indexed-key conventions used to encode
//! repetition inside them.
//!
//! Every answer of the server is a *flat record*: an unordered map from
//! string keys to string values. Arrays are encoded as families of keys
//! sharing a prefix and a numeric suffix:
//!
//! *   simple arrays: `Paths0`, `Paths1`, ...
//! *   arrays of arrays: `stream0,0`, `stream0,1`, `stream1,0`, ...
//!
//! The server never leaves gaps, so scanning stops at the first missing
//! index. All functions here only read the record.

use std::collections::hash_map::{self, HashMap};
use std::iter::FromIterator;

use log::trace;
use serde::{Deserialize, Serialize};

/// Separator between the outer and inner index of a doubly-indexed key.
pub const INDEX_SEPARATOR: char = ',';

/// A flat record: one tagged answer of the server.
#[derive(Clone, Default, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatRecord {
    fields: HashMap<String, String>,
}

impl FlatRecord {
    /// Create an empty record
    pub fn new() -> FlatRecord {
        FlatRecord::default()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.fields.len()
    }
    /// True if the record has no keys
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
    /// True if `key` is present
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }
    /// Value of `key`, if present
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(|v| v.as_str())
    }
    /// Iterate over all `(key, value)` pairs in no particular order
    pub fn iter(&self) -> hash_map::Iter<String, String> {
        self.fields.iter()
    }

    /// Insert a field. Records received from the server are never modified;
    /// this is for building records (e.g. in tests or when merging output).
    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> Option<String> {
        self.fields.insert(key.into(), value.into())
    }

    /// Value of `key` coerced to `i32`; zero if absent or not a number.
    pub fn int(&self, key: &str) -> i32 {
        self.get(key).map_or(0, |v| parse_int(key, v))
    }
    /// Value of `key` coerced to `i64`; zero if absent or not a number.
    pub fn long(&self, key: &str) -> i64 {
        self.get(key).map_or(0, |v| parse_long(key, v))
    }
    /// Value of `key` coerced to `bool` (see `parse_bool`); false if absent.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).map_or(false, parse_bool)
    }
    /// Value of `key` as an owned string; empty if absent.
    pub fn string(&self, key: &str) -> String {
        self.get(key).unwrap_or("").to_string()
    }

    /// Simple indexed array: values of `prefix0`, `prefix1`, ... up to (not
    /// including) the first missing index.
    pub fn indexed(&self, prefix: &str) -> Vec<&str> {
        IndexScan::new(self, prefix).collect()
    }

    /// Inner sequence of a doubly-indexed array: values of
    /// `prefix{outer},0`, `prefix{outer},1`, ... up to the first missing
    /// inner index. The outer index is supplied by the caller.
    pub fn indexed2(&self, prefix: &str, outer: usize) -> Vec<&str> {
        IndexScan::new(self, format!("{}{}{}", prefix, outer, INDEX_SEPARATOR)).collect()
    }

    /// Number of consecutive indices `0..n` for which `prefix{i}` exists.
    pub fn count_indexed(&self, prefix: &str) -> usize {
        IndexScan::new(self, prefix).count()
    }
}

impl FromIterator<(String, String)> for FlatRecord {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        FlatRecord { fields: iter.into_iter().collect() }
    }
}
impl<'a> FromIterator<(&'a str, &'a str)> for FlatRecord {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        iter.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }
}
impl From<HashMap<String, String>> for FlatRecord {
    fn from(fields: HashMap<String, String>) -> FlatRecord {
        FlatRecord { fields }
    }
}

/// Iterator over the values of an indexed key family, in index order.
///
/// Yields `record[prefix + "0"]`, `record[prefix + "1"]`, ... and stops at
/// the first absent index.
pub struct IndexScan<'a> {
    record: &'a FlatRecord,
    prefix: String,
    next: usize,
    done: bool,
}

impl<'a> IndexScan<'a> {
    /// Start scanning `prefix0` in `record`
    pub fn new<P: Into<String>>(record: &'a FlatRecord, prefix: P) -> IndexScan<'a> {
        IndexScan { record, prefix: prefix.into(), next: 0, done: false }
    }
}

impl<'a> Iterator for IndexScan<'a> {
    type Item = &'a str;
    fn next(&mut self) -> Option<&'a str> {
        if self.done {
            return None;
        }
        let key = format!("{}{}", self.prefix, self.next);
        match self.record.get(&key) {
            Some(v) => {
                self.next += 1;
                Some(v)
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

// —————  Scalar coercions  —————

/// Parse an integer the way the server writes them; zero on failure.
pub fn parse_int(key: &str, value: &str) -> i32 {
    value.trim().parse().unwrap_or_else(|_| {
        trace!("Field {}: not an integer: {:?}", key, value);
        0
    })
}

/// Parse a long integer the way the server writes them; zero on failure.
pub fn parse_long(key: &str, value: &str) -> i64 {
    value.trim().parse().unwrap_or_else(|_| {
        trace!("Field {}: not an integer: {:?}", key, value);
        0
    })
}

/// Boolean fields are spelled `yes`/`no` or `enabled`/`disabled`, in any
/// case.
pub fn parse_bool(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("yes") || value.eq_ignore_ascii_case("enabled")
}

/// An enumeration with a fixed set of server spellings.
///
/// Matching is case-insensitive; unknown spellings leave the default.
pub trait TagEnum: Sized + Copy + Default + 'static {
    /// All variants paired with their server spelling
    const SPELLINGS: &'static [(&'static str, Self)];

    /// Match a server spelling, ignoring case
    fn from_tag(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::SPELLINGS.iter()
            .find(|&&(name, _)| name.eq_ignore_ascii_case(value))
            .map(|&(_, v)| v)
    }

    /// Like `from_tag` but falls back to the default value
    fn from_tag_or_default(value: &str) -> Self {
        Self::from_tag(value).unwrap_or_else(|| {
            trace!("Unknown spelling {:?}; using default", value);
            Self::default()
        })
    }
}

/// The server spelling of a `TagEnum` variant.
pub fn tag_of<T: TagEnum + PartialEq>(value: T) -> &'static str {
    T::SPELLINGS.iter()
        .find(|&&(_, v)| v == value)
        .map_or("", |&(name, _)| name)
}

#[cfg(test)]
fn sample() -> FlatRecord {
    vec![
        ("Paths0", "share ..."),
        ("Paths1", "isolate bin/..."),
        ("Paths3", "share gap/..."),
        ("stream0,0", "//a/main"),
        ("stream0,1", "//a/dev"),
        ("stream1,0", "//a/rel"),
        ("Users", " 42 "),
        ("Bad", "4x2"),
        ("isLicensed", "YES"),
    ].into_iter().collect()
}

#[test]
fn scan_stops_at_first_gap() {
    let rec = sample();
    assert_eq!(rec.indexed("Paths"), vec!["share ...", "isolate bin/..."]);
    assert_eq!(rec.count_indexed("Paths"), 2);
    assert!(rec.indexed("View").is_empty());
}

#[test]
fn scan_doubly_indexed() {
    let rec = sample();
    assert_eq!(rec.indexed2("stream", 0), vec!["//a/main", "//a/dev"]);
    assert_eq!(rec.indexed2("stream", 1), vec!["//a/rel"]);
    assert!(rec.indexed2("stream", 2).is_empty());
}

#[test]
fn scalar_coercions() {
    let rec = sample();
    assert_eq!(rec.int("Users"), 42);
    assert_eq!(rec.long("Users"), 42);
    assert_eq!(rec.int("Bad"), 0);
    assert_eq!(rec.int("Missing"), 0);
    assert!(rec.flag("isLicensed"));
    assert!(!rec.flag("Missing"));
    assert_eq!(rec.string("Missing"), "");
    assert!(parse_bool("Enabled"));
    assert!(!parse_bool("disabled"));
}
