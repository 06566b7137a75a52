/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Decoding of captured server output

use pretty_assertions::assert_eq;

use p4tagged::decode::stream::CustomField;
use p4tagged::{FlatRecord, MapEntry, MapType, ParentView, ProtectionEntry, ProtectionMode,
        ProtectionTable, ServerIPMACAddress, ServerLicense, ServerMetaData, Stream,
        StreamIntegrationLog, StreamLog, StreamOptions, StreamType};

// —————  Library of utility functions  —————

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn records(json: &str) -> Vec<FlatRecord> {
    serde_json::from_str(json).expect("fixture parses")
}

fn record(json: &str) -> FlatRecord {
    serde_json::from_str(json).expect("fixture parses")
}

fn keyword(map_type: MapType, left: &str) -> MapEntry {
    MapEntry { map_type, keyword: true, left: left.to_string(), ..MapEntry::default() }
}

// —————  Tests  —————

#[test]
fn streams_output() {
    init_logs();
    let recs = records(include_str!("fixtures/streams.json"));
    let before = recs.clone();
    let dev = Stream::from_streams_output(&recs[0], "-0800 PST", false);
    assert_eq!(recs, before);

    assert_eq!(dev.id, "//streams/dev");
    assert_eq!(dev.updated.to_string(), "2024/01/15 10:00:00");
    assert_eq!(dev.accessed.to_string(), "2024/01/15 11:00:00");
    assert_eq!(dev.stream_type, StreamType::Development);
    assert_eq!(dev.parent_view, ParentView::Inherit);
    assert_eq!(dev.description, "Development work for the next release.\n");
    assert_eq!(dev.options, StreamOptions::default());
    assert_eq!(dev.change_flows_to_parent, "true");

    let mut isolate = keyword(MapType::Isolate, "bin/...");
    isolate.comment = Some("## build output".to_string());
    assert_eq!(dev.paths, vec![
        keyword(MapType::Share, "..."),
        isolate,
        keyword(MapType::Exclude, "tmp/..."),
    ]);
    assert_eq!(dev.remapped.len(), 1);
    assert_eq!(dev.remapped[0].right.as_deref(), Some("code/..."));
    let ignored: Vec<&str> = dev.ignored.iter().map(|e| e.left.as_str()).collect();
    assert_eq!(ignored, vec![".o", ".obj"]);
    assert!(dev.view.is_empty());
    assert!(dev.custom_fields.is_empty());

    let main = Stream::from_streams_output(&recs[1], "-0800 PST", true);
    assert_eq!(main.updated.to_string(), "2024/01/15 11:00:00");
    assert!(!main.accessed.is_set());
    assert_eq!(main.stream_type, StreamType::Mainline);
    assert_eq!(main.parent_view, ParentView::NoInherit);
    assert_eq!(main.options, StreamOptions {
        owner_submit: true,
        locked: true,
        no_to_parent: true,
        no_from_parent: true,
        merge_any: true,
    });
    assert!(main.paths.is_empty());
}

#[test]
fn stream_spec_output() {
    init_logs();
    let rec: FlatRecord = vec![
        ("Stream", "//streams/rel"),
        ("Update", "2024/02/01 09:30:00"),
        ("Type", "Release"),
        ("Description", "Release branch"),
        ("specdef", "Stream;code:701;;Ticket;code:900;type:line;;Owners;code:901;type:wlist;;"),
        ("Ticket", "REL-12"),
    ].into_iter().collect();
    let s = Stream::from_stream_output(&rec);
    assert_eq!(s.updated.to_string(), "2024/02/01 09:30:00");
    assert_eq!(s.stream_type, StreamType::Release);
    assert_eq!(s.description, "Release branch");
    assert_eq!(s.custom_fields.get("Ticket"), Some(&CustomField::Text("REL-12".to_string())));
    assert!(!s.custom_fields.contains_key("Owners"));
}

#[test]
fn stream_log() {
    init_logs();
    let rec = record(include_str!("fixtures/streamlog.json"));
    let logs = StreamLog::decode_all(&rec);
    assert_eq!(logs.len(), 2);

    assert_eq!(logs[0].action, "create");
    assert_eq!(logs[0].associated_change, 0);
    assert!(logs[0].integrations.is_empty());

    let merge = &logs[1];
    assert_eq!(merge.change, 117);
    assert_eq!(merge.user, "bob");
    assert_eq!(merge.associated_change, 115);
    assert_eq!(merge.integrations.len(), 1);
    assert_eq!(merge.integrations[0].stream, "//streams/main");
    assert_eq!(merge.integrations[0].field, "Paths");
    assert_eq!(merge.integrations[0].start_from_change, 101);

    assert_eq!(StreamLog::decode(&rec, 5), StreamLog::default());
}

#[test]
fn license_output() {
    init_logs();
    let recs = records(include_str!("fixtures/license.json"));
    let lic = ServerLicense::from_records(&recs).expect("license present");

    assert_eq!(lic.license, "ABCD-EFGH");
    assert_eq!(lic.customer, "Example Corp");
    assert_eq!(lic.application, "p4d");
    assert_eq!(lic.platform, "LINUX26X86_64");
    assert_eq!(lic.users, 250);
    assert_eq!(lic.license_expires, 1767139200);
    assert_eq!(lic.extra_capabilities, vec!["helix-swarm".to_string(), "graph".to_string()]);
    assert!(lic.is_licensed);
    assert_eq!(lic.user_count, "12");
    assert_eq!(lic.client_limit, "unlimited");
    assert_eq!(lic.license_time_remaining, 30931200);

    assert_eq!(lic.ip_mac_addresses.len(), 2);
    assert_eq!(lic.ip_mac_addresses[0].mac_address, "00:11:22:33:44:55");
    assert_eq!(lic.ip_mac_addresses[1].interface, "lo");
    assert_eq!(lic.ip_mac_addresses[1].ipv6_address, "");

    // only the usage record is kept verbatim; the spec record lives on in fields
    assert_eq!(lic.raw, recs[1]);
    assert!(!lic.raw.contains("License"));

    assert_eq!(ServerLicense::from_records(&[]), None);
}

#[test]
fn info_output() {
    init_logs();
    let md = ServerMetaData::decode(&record(include_str!("fixtures/info.json")));
    assert_eq!(md.name, "master");
    assert_eq!(md.address.to_string(), "perforce.example.com:1666");
    assert_eq!(md.date.to_string(), "2024/01/15 10:23:45");
    assert_eq!(md.date_time_offset, "-0800 PST");
    assert_eq!(md.uptime, 120 * 3600 + 5 * 60 + 9);
    assert_eq!(md.version.major, "2023.1");
    assert!(md.case_sensitive);
    assert!(md.unicode_enabled);
    assert!(!md.move_enabled);

    let lic = md.license.expect("license summary");
    assert_eq!(lic.users, 250);
    assert_eq!(lic.expires.to_string(), "2025/12/31 00:00:00");
}

#[test]
fn protections() {
    init_logs();
    let rec: FlatRecord = vec![
        ("Protections0", "super user admin * //..."),
        ("Protections1", "write group dev 10.0.0.0/8 //depot/..."),
        ("Protections2", "read user * * -//depot/secret/..."),
        ("Protections4", "list user * * //..."),
    ].into_iter().collect();
    let table = ProtectionTable::decode(&rec);
    assert_eq!(table.len(), 3);
    assert_eq!(table[0].mode, ProtectionMode::Super);
    assert_eq!(table[1].host, "10.0.0.0/8");
    assert!(table[2].unmap);
    assert_eq!(table[2].path, "//depot/secret/...");
    let lines: Vec<String> = table.iter().map(ProtectionEntry::to_string).collect();
    assert_eq!(lines[1], "write group dev 10.0.0.0/8 //depot/...");
}

#[test]
fn absent_fields_give_defaults() {
    init_logs();
    let empty = FlatRecord::new();
    assert_eq!(Stream::from_stream_output(&empty), Stream::default());
    assert!(StreamLog::decode_all(&empty).is_empty());
    assert!(ProtectionTable::decode(&empty).is_empty());
    assert!(ServerMetaData::decode(&empty).license.is_none());
    assert_eq!(ServerLicense::decode(&empty), ServerLicense::default());
    assert_eq!(ServerIPMACAddress::decode(&empty), ServerIPMACAddress::default());
    assert_eq!(StreamIntegrationLog::decode(&empty, 0, 0), StreamIntegrationLog::default());
    assert_eq!(StreamLog::decode(&empty, 0), StreamLog::default());
    assert_eq!(ProtectionEntry::from_protects_record(&empty), ProtectionEntry::default());

    let junk: FlatRecord = vec![
        ("Type", "nonsense"),
        ("Update", "not a time"),
        ("Options", "frobnicate"),
    ].into_iter().collect();
    let s = Stream::from_streams_output(&junk, "garbage", false);
    assert_eq!(s.stream_type, StreamType::Development);
    assert!(!s.updated.is_set());
    assert_eq!(s.options, StreamOptions::default());
}
