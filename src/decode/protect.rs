/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! p4tagged: protection table entries
//!
//! Protections come either one per record (the `protects` command: keys
//! `perm`, `user`, `host`, `depotFile`, `isgroup`, `unmap`) or as lines of
//! the protection spec (`Protections0`, `Protections1`, ...), each line being
//! `mode type name host path` with a leading `-` on the path for exclusions.

use std::fmt;

use serde::Serialize;

use crate::record::{tag_of, FlatRecord, TagEnum};
use crate::util::split_fields;

/// Access granted (or, with `unmap`, removed) by a protection line.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize)]
pub enum ProtectionMode {
    List,
    Read,
    Open,
    Write,
    Admin,
    Owner,
    Super,
    Review,
    ReadRights,
    BranchRights,
    OpenRights,
    WriteRights,
    #[default]
    None,
    ReadStreamSpec,
    OpenStreamSpec,
    WriteStreamSpec,
    ReadStreamSpecRights,
    OpenStreamSpecRights,
    WriteStreamSpecRights,
}

impl TagEnum for ProtectionMode {
    const SPELLINGS: &'static [(&'static str, ProtectionMode)] = &[
        ("list", ProtectionMode::List),
        ("read", ProtectionMode::Read),
        ("open", ProtectionMode::Open),
        ("write", ProtectionMode::Write),
        ("admin", ProtectionMode::Admin),
        ("owner", ProtectionMode::Owner),
        ("super", ProtectionMode::Super),
        ("review", ProtectionMode::Review),
        ("=read", ProtectionMode::ReadRights),
        ("=branch", ProtectionMode::BranchRights),
        ("=open", ProtectionMode::OpenRights),
        ("=write", ProtectionMode::WriteRights),
        ("none", ProtectionMode::None),
        ("readstreamspec", ProtectionMode::ReadStreamSpec),
        ("openstreamspec", ProtectionMode::OpenStreamSpec),
        ("writestreamspec", ProtectionMode::WriteStreamSpec),
        ("=readstreamspec", ProtectionMode::ReadStreamSpecRights),
        ("=openstreamspec", ProtectionMode::OpenStreamSpecRights),
        ("=writestreamspec", ProtectionMode::WriteStreamSpecRights),
    ];
}

impl fmt::Display for ProtectionMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(tag_of(*self))
    }
}

/// Whether a protection line names a user or a group.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize)]
pub enum EntryType {
    #[default]
    User,
    Group,
}

impl TagEnum for EntryType {
    const SPELLINGS: &'static [(&'static str, EntryType)] = &[
        ("user", EntryType::User),
        ("group", EntryType::Group),
    ];
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(tag_of(*self))
    }
}

/// One line of the protection table.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize)]
pub struct ProtectionEntry {
    pub mode: ProtectionMode,
    pub entry_type: EntryType,
    pub name: String,
    pub host: String,
    pub path: String,
    pub unmap: bool,
}

impl ProtectionEntry {
    /// Decode one record of the `protects` command.
    pub fn from_protects_record(record: &FlatRecord) -> ProtectionEntry {
        let mut path = record.string("depotFile");
        // some servers report exclusions only through the path
        let unmap = record.contains("unmap") || path.starts_with('-');
        if path.starts_with('-') {
            path.remove(0);
        }
        ProtectionEntry {
            mode: record.get("perm").map_or_else(ProtectionMode::default, ProtectionMode::from_tag_or_default),
            entry_type: if record.contains("isgroup") { EntryType::Group } else { EntryType::User },
            name: record.string("user"),
            host: record.string("host"),
            path,
            unmap,
        }
    }

    /// Decode one protection spec line (`mode type name host [-]path`).
    ///
    /// Missing sub-fields stay empty.
    pub fn parse_line(line: &str) -> ProtectionEntry {
        let mut fields = split_fields(line).into_iter();
        let mut entry = ProtectionEntry::default();
        if let Some(mode) = fields.next() {
            entry.mode = ProtectionMode::from_tag_or_default(&mode);
        }
        if let Some(ty) = fields.next() {
            entry.entry_type = EntryType::from_tag_or_default(&ty);
        }
        entry.name = fields.next().unwrap_or_default();
        entry.host = fields.next().unwrap_or_default();
        let path = fields.next().unwrap_or_default();
        match path.strip_prefix('-') {
            Some(p) => {
                entry.path = p.to_string();
                entry.unmap = true;
            }
            None => entry.path = path,
        }
        entry
    }
}

impl fmt::Display for ProtectionEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let path = format!("{}{}", if self.unmap { "-" } else { "" }, self.path);
        let path = if path.contains(' ') { format!("\"{}\"", path) } else { path };
        write!(f, "{} {} {} {} {}", self.mode, self.entry_type, self.name, self.host, path)
    }
}

/// The protection table, from the protection spec record.
pub struct ProtectionTable;

impl ProtectionTable {
    /// Decode `Protections0`, `Protections1`, ... up to the first gap.
    pub fn decode(record: &FlatRecord) -> Vec<ProtectionEntry> {
        record.indexed("Protections")
            .into_iter()
            .map(ProtectionEntry::parse_line)
            .collect()
    }
}

#[test]
fn server_strings() {
    assert_eq!(ProtectionMode::WriteRights.to_string(), "=write");
    assert_eq!(ProtectionMode::Read.to_string(), "read");
    assert_eq!(ProtectionMode::from_tag("=ReadStreamSpec"), Some(ProtectionMode::ReadStreamSpecRights));
    assert_eq!(EntryType::Group.to_string(), "group");
}

#[test]
fn spec_lines() {
    let e = ProtectionEntry::parse_line("=write group dev * -//depot/release/...");
    assert_eq!(e.mode, ProtectionMode::WriteRights);
    assert_eq!(e.entry_type, EntryType::Group);
    assert_eq!(e.name, "dev");
    assert_eq!(e.host, "*");
    assert_eq!(e.path, "//depot/release/...");
    assert!(e.unmap);
    assert_eq!(e.to_string(), "=write group dev * -//depot/release/...");

    let e = ProtectionEntry::parse_line("super");
    assert_eq!(e.mode, ProtectionMode::Super);
    assert_eq!(e.name, "");
}

#[test]
fn protects_record() {
    let rec: FlatRecord = vec![
        ("perm", "read"),
        ("host", "*"),
        ("user", "qa"),
        ("isgroup", ""),
        ("depotFile", "//depot/..."),
    ].into_iter().collect();
    let e = ProtectionEntry::from_protects_record(&rec);
    assert_eq!(e.mode, ProtectionMode::Read);
    assert_eq!(e.entry_type, EntryType::Group);
    assert!(!e.unmap);
    assert_eq!(ProtectionEntry::from_protects_record(&FlatRecord::new()), ProtectionEntry::default());
}
