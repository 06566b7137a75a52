/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! p4tagged: stream specifications
//!
//! Streams arrive from two commands with different timestamp encodings: the
//! list command (`streams`) reports `Update`/`Access` as epoch seconds, the
//! spec command (`stream -o`) as formatted dates. The caller picks the
//! encoding; everything else decodes the same way.

use std::collections::BTreeMap;
use std::fmt;

use log::trace;
use serde::Serialize;

use crate::date::{ServerTime, TimeEncoding};
use crate::decode::view::{read_view, MapType, ViewMap};
use crate::decode::{apply_fields, FieldTable};
use crate::record::{FlatRecord, TagEnum};
use crate::util::parse_specdef;

/// Stream type
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize)]
pub enum StreamType {
    #[default]
    Development,
    Mainline,
    Release,
    Virtual,
    Task,
}

impl TagEnum for StreamType {
    const SPELLINGS: &'static [(&'static str, StreamType)] = &[
        ("development", StreamType::Development),
        ("mainline", StreamType::Mainline),
        ("release", StreamType::Release),
        ("virtual", StreamType::Virtual),
        ("task", StreamType::Task),
    ];
}

/// How a stream's view relates to its parent's.
///
/// `None` means the server predates the field.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize)]
pub enum ParentView {
    #[default]
    None,
    Inherit,
    NoInherit,
}

impl TagEnum for ParentView {
    const SPELLINGS: &'static [(&'static str, ParentView)] = &[
        ("inherit", ParentView::Inherit),
        ("noinherit", ParentView::NoInherit),
    ];
}

/// Stream options, as carried by the `Options` field.
///
/// Each flag corresponds to one word of the field; the default (all false) is
/// `allsubmit unlocked toparent fromparent mergedown`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize)]
pub struct StreamOptions {
    pub owner_submit: bool,
    pub locked: bool,
    pub no_to_parent: bool,
    pub no_from_parent: bool,
    pub merge_any: bool,
}

impl StreamOptions {
    /// Parse the options word list. Words may come in any order; unknown
    /// words are ignored.
    pub fn parse(value: &str) -> StreamOptions {
        let mut opts = StreamOptions::default();
        for word in value.split_whitespace() {
            match word {
                "ownersubmit" => opts.owner_submit = true,
                "locked" => opts.locked = true,
                "notoparent" => opts.no_to_parent = true,
                "nofromparent" => opts.no_from_parent = true,
                "mergeany" => opts.merge_any = true,
                "allsubmit" | "unlocked" | "toparent" | "fromparent" | "mergedown" => {}
                other => trace!("Unknown stream option {:?}", other),
            }
        }
        opts
    }
}

impl fmt::Display for StreamOptions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {} {} {}",
            if self.owner_submit { "ownersubmit" } else { "allsubmit" },
            if self.locked { "locked" } else { "unlocked" },
            if self.no_to_parent { "notoparent" } else { "toparent" },
            if self.no_from_parent { "nofromparent" } else { "fromparent" },
            if self.merge_any { "mergeany" } else { "mergedown" })
    }
}

/// Value of a field named in the form's `specdef` but unknown to `Stream`.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub enum CustomField {
    Text(String),
    List(Vec<String>),
}

/// A stream specification.
///
/// Fields are public and mutable: a stream is a server-editable spec.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize)]
pub struct Stream {
    pub id: String,
    pub updated: ServerTime,
    pub accessed: ServerTime,
    pub owner: String,
    pub name: String,
    pub parent: String,
    pub base_parent: String,
    pub stream_type: StreamType,
    pub description: String,
    pub options: StreamOptions,
    pub firmer_than_parent: String,
    pub change_flows_to_parent: String,
    pub change_flows_from_parent: String,
    pub parent_view: ParentView,
    pub depot_path: String,
    pub view_path: String,
    pub path_type: MapType,
    pub path_source: String,
    pub components: ViewMap,
    pub paths: ViewMap,
    pub remapped: ViewMap,
    pub ignored: ViewMap,
    pub view: ViewMap,
    pub change_view: ViewMap,
    /// Fields listed in `specdef` which this type does not know about
    pub custom_fields: BTreeMap<String, CustomField>,
}

static STREAM_FIELDS: &FieldTable<Stream> = &[
    ("Stream", |s: &mut Stream, v: &str| s.id = v.to_string()),
    ("Owner", |s: &mut Stream, v: &str| s.owner = v.to_string()),
    ("Name", |s: &mut Stream, v: &str| s.name = v.to_string()),
    ("Parent", |s: &mut Stream, v: &str| s.parent = v.to_string()),
    ("baseParent", |s: &mut Stream, v: &str| s.base_parent = v.to_string()),
    ("Type", |s: &mut Stream, v: &str| s.stream_type = StreamType::from_tag_or_default(v)),
    ("Description", |s: &mut Stream, v: &str| s.description = v.to_string()),
    ("desc", |s: &mut Stream, v: &str| s.description = v.to_string()),
    ("Options", |s: &mut Stream, v: &str| s.options = StreamOptions::parse(v)),
    ("firmerThanParent", |s: &mut Stream, v: &str| s.firmer_than_parent = v.to_string()),
    ("changeFlowsToParent", |s: &mut Stream, v: &str| s.change_flows_to_parent = v.to_string()),
    ("changeFlowsFromParent", |s: &mut Stream, v: &str| s.change_flows_from_parent = v.to_string()),
    ("ParentView", |s: &mut Stream, v: &str| s.parent_view = ParentView::from_tag_or_default(v)),
    ("DepotPath", |s: &mut Stream, v: &str| s.depot_path = v.to_string()),
    ("ViewPath", |s: &mut Stream, v: &str| s.view_path = v.to_string()),
    ("PathType", |s: &mut Stream, v: &str| s.path_type = MapType::from_tag_or_default(v)),
    ("PathSource", |s: &mut Stream, v: &str| s.path_source = v.to_string()),
];

// View families; each may have a matching `<name>Comment<i>` family.
const VIEW_FIELDS: &[&str] = &["Components", "Paths", "Remapped", "Ignored", "View", "ChangeView"];

// Keys consumed outside the field tables.
const OTHER_FIELDS: &[&str] = &["Update", "Access", "specdef"];

impl Stream {
    /// Decode the output of the stream list command, whose timestamps are
    /// epoch seconds. `offset` and `dst_mismatch` describe the server's time
    /// zone (see `ServerTime::from_epoch`).
    pub fn from_streams_output(record: &FlatRecord, offset: &str, dst_mismatch: bool) -> Stream {
        Stream::decode(record, &TimeEncoding::Epoch {
            offset: offset.to_string(),
            dst_mismatch,
        })
    }

    /// Decode the output of the stream spec command, whose timestamps are
    /// formatted dates.
    pub fn from_stream_output(record: &FlatRecord) -> Stream {
        Stream::decode(record, &TimeEncoding::Formatted)
    }

    /// Decode a stream record with the given timestamp encoding.
    pub fn decode(record: &FlatRecord, times: &TimeEncoding) -> Stream {
        let mut stream = Stream::default();
        apply_fields(record, STREAM_FIELDS, "", &mut stream);
        if let Some(v) = record.get("Update") {
            stream.updated = times.decode(v);
        }
        if let Some(v) = record.get("Access") {
            stream.accessed = times.decode(v);
        }
        stream.components = read_view(record, "Components");
        stream.paths = read_view(record, "Paths");
        stream.remapped = read_view(record, "Remapped");
        stream.ignored = read_view(record, "Ignored");
        stream.view = read_view(record, "View");
        stream.change_view = read_view(record, "ChangeView");
        stream.custom_fields = custom_fields(record);
        stream
    }
}

fn is_known_field(name: &str) -> bool {
    STREAM_FIELDS.iter().any(|&(k, _)| k == name)
        || VIEW_FIELDS.contains(&name)
        || OTHER_FIELDS.contains(&name)
}

// Collect fields which `specdef` declares, the record carries, and `Stream`
// has no member for. List-typed fields use the indexed-array rule.
fn custom_fields(record: &FlatRecord) -> BTreeMap<String, CustomField> {
    let mut fields = BTreeMap::new();
    let specdef = match record.get("specdef") {
        Some(s) => s,
        None => return fields,
    };
    for (name, ty) in parse_specdef(specdef) {
        if is_known_field(&name) {
            continue;
        }
        if ty.ends_with("list") {
            let values = record.indexed(&name);
            if !values.is_empty() {
                let values = values.into_iter().map(|v| v.to_string()).collect();
                fields.insert(name, CustomField::List(values));
            }
        } else if let Some(value) = record.get(&name) {
            fields.insert(name, CustomField::Text(value.to_string()));
        }
    }
    fields
}

#[test]
fn options_round_trip() {
    let opts = StreamOptions::parse("ownersubmit unlocked notoparent fromparent mergeany");
    assert!(opts.owner_submit && !opts.locked && opts.no_to_parent && !opts.no_from_parent && opts.merge_any);
    assert_eq!(opts.to_string(), "ownersubmit unlocked notoparent fromparent mergeany");
    assert_eq!(StreamOptions::default().to_string(), "allsubmit unlocked toparent fromparent mergedown");
}

#[test]
fn enum_spellings_ignore_case() {
    assert_eq!(StreamType::from_tag("MainLine"), Some(StreamType::Mainline));
    assert_eq!(StreamType::from_tag_or_default("sparse"), StreamType::Development);
    assert_eq!(ParentView::from_tag("NOINHERIT"), Some(ParentView::NoInherit));
}

#[test]
fn empty_record_decodes_to_default() {
    let s = Stream::from_stream_output(&FlatRecord::new());
    assert_eq!(s, Stream::default());
    assert!(!s.updated.is_set());
    assert!(s.paths.is_empty());
}

#[test]
fn custom_fields_from_specdef() {
    let rec: FlatRecord = vec![
        ("Stream", "//streams/main"),
        ("specdef", "Stream;code:701;rq;ro;len:64;;Paths;code:709;type:wlist;;Reviewer;code:800;type:word;;Notes;code:801;type:llist;;Missing;code:802;;"),
        ("Reviewer", "alice"),
        ("Notes0", "first"),
        ("Notes1", "second"),
    ].into_iter().collect();
    let s = Stream::from_stream_output(&rec);
    assert_eq!(s.custom_fields.len(), 2);
    assert_eq!(s.custom_fields["Reviewer"], CustomField::Text("alice".to_string()));
    assert_eq!(s.custom_fields["Notes"],
            CustomField::List(vec!["first".to_string(), "second".to_string()]));
}
