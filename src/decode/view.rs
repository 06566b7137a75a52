/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! p4tagged: view maps (compound indexed arrays)
//!
//! A view field is an indexed array (`View0`, `View1`, ...) whose values are
//! themselves lines of space-separated sub-fields. Two shapes occur:
//!
//! *   mapping lines: `[-+&]//depot/left/... //client/right/...`, where the
//!     optional leading symbol gives the direction of the mapping
//! *   stream path lines: `share ...`, `import lib/... //other/lib/...`, where
//!     a keyword gives the path type and the depot path is optional
//!
//! Each line may be accompanied by a comment key (`ViewComment0`, ...).

use std::fmt;

use serde::Serialize;

use crate::record::{FlatRecord, TagEnum};
use crate::util::split_fields;

/// The type of a map entry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize)]
pub enum MapType {
    /// Plain mapping (no symbol)
    #[default]
    Include,
    /// `-` mapping, or `exclude` stream path
    Exclude,
    /// `+` mapping
    Overlay,
    /// `&` mapping
    Ditto,
    /// `share` stream path
    Share,
    /// `isolate` stream path
    Isolate,
    /// `import` stream path
    Import,
    /// `import+` stream path
    ImportPlus,
}

impl TagEnum for MapType {
    const SPELLINGS: &'static [(&'static str, MapType)] = &[
        ("include", MapType::Include),
        ("exclude", MapType::Exclude),
        ("overlay", MapType::Overlay),
        ("ditto", MapType::Ditto),
        ("share", MapType::Share),
        ("isolate", MapType::Isolate),
        ("import", MapType::Import),
        ("import+", MapType::ImportPlus),
    ];
}

impl MapType {
    fn from_symbol(c: char) -> Option<MapType> {
        match c {
            '-' => Some(MapType::Exclude),
            '+' => Some(MapType::Overlay),
            '&' => Some(MapType::Ditto),
            _ => None,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            MapType::Exclude => "-",
            MapType::Overlay => "+",
            MapType::Ditto => "&",
            _ => "",
        }
    }

    // Stream path keywords; `exclude` counts only when spelled out.
    fn from_keyword(word: &str) -> Option<MapType> {
        match word {
            "share" => Some(MapType::Share),
            "isolate" => Some(MapType::Isolate),
            "import" => Some(MapType::Import),
            "import+" => Some(MapType::ImportPlus),
            "exclude" => Some(MapType::Exclude),
            _ => None,
        }
    }
}

/// One line of a view map.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize)]
pub struct MapEntry {
    pub map_type: MapType,
    /// Whether the line used a path-type keyword (`share ...`) rather than a
    /// direction symbol
    pub keyword: bool,
    pub left: String,
    pub right: Option<String>,
    pub comment: Option<String>,
}

impl MapEntry {
    /// Split one view line into a map entry. Lines which are empty after
    /// trimming yield an entry with an empty left side.
    pub fn parse(line: &str) -> MapEntry {
        let fields = split_fields(line);
        let mut entry = MapEntry::default();
        let mut rest = fields.into_iter();
        let first = match rest.next() {
            Some(f) => f,
            None => return entry,
        };
        let second = rest.next();
        match (MapType::from_keyword(&first), second) {
            (Some(ty), Some(path)) => {
                entry.map_type = ty;
                entry.keyword = true;
                entry.left = path;
                entry.right = rest.next();
            }
            (_, second) => {
                let mut chars = first.chars();
                match chars.next().and_then(MapType::from_symbol) {
                    Some(ty) => {
                        entry.map_type = ty;
                        entry.left = chars.as_str().to_string();
                    }
                    None => entry.left = first,
                }
                entry.right = second;
            }
        }
        entry
    }
}

fn quote(path: &str) -> String {
    if path.contains(' ') {
        format!("\"{}\"", path)
    } else {
        path.to_string()
    }
}

impl fmt::Display for MapEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.keyword {
            write!(f, "{} {}", crate::record::tag_of(self.map_type), quote(&self.left))?;
        } else {
            write!(f, "{}", quote(&format!("{}{}", self.map_type.symbol(), self.left)))?;
        }
        if let Some(ref right) = self.right {
            write!(f, " {}", quote(right))?;
        }
        if let Some(ref comment) = self.comment {
            write!(f, " {}", comment)?;
        }
        Ok(())
    }
}

/// An ordered list of map entries.
pub type ViewMap = Vec<MapEntry>;

/// Read view field `field` from a record: `field0`, `field1`, ... with
/// optional `fieldComment0`, ... keys.
///
/// Lines with an empty value and no comment are skipped; scanning stops at
/// the first missing index. A record without `field0` yields an empty map.
pub fn read_view(record: &FlatRecord, field: &str) -> ViewMap {
    let comment_prefix = format!("{}Comment", field);
    let mut map = ViewMap::new();
    for (idx, line) in record.indexed(field).into_iter().enumerate() {
        let comment = record.get(&format!("{}{}", comment_prefix, idx));
        if line.is_empty() && comment.is_none() {
            continue;
        }
        let mut entry = MapEntry::parse(line);
        entry.comment = comment.map(|c| c.trim_end().to_string());
        map.push(entry);
    }
    map
}

#[test]
fn parse_mapping_lines() {
    let e = MapEntry::parse("-//depot/main/secret/... //ws/secret/...");
    assert_eq!(e.map_type, MapType::Exclude);
    assert_eq!(e.left, "//depot/main/secret/...");
    assert_eq!(e.right.as_deref(), Some("//ws/secret/..."));
    assert!(!e.keyword);

    let e = MapEntry::parse("\"//depot/a b/...\" \"//ws/a b/...\"");
    assert_eq!(e.map_type, MapType::Include);
    assert_eq!(e.left, "//depot/a b/...");
    assert_eq!(e.to_string(), "\"//depot/a b/...\" \"//ws/a b/...\"");
}

#[test]
fn parse_stream_path_lines() {
    let e = MapEntry::parse("import+ lib/... //depot/lib/...");
    assert_eq!(e.map_type, MapType::ImportPlus);
    assert!(e.keyword);
    assert_eq!(e.left, "lib/...");
    assert_eq!(e.right.as_deref(), Some("//depot/lib/..."));
    assert_eq!(e.to_string(), "import+ lib/... //depot/lib/...");

    let e = MapEntry::parse("share ...");
    assert_eq!(e.map_type, MapType::Share);
    assert_eq!(e.right, None);
}

#[test]
fn read_view_with_comments() {
    let rec: FlatRecord = vec![
        ("Paths0", "share ..."),
        ("PathsComment0", "## everything  "),
        ("Paths1", ""),
        ("Paths2", ""),
        ("PathsComment2", "## only a comment"),
        ("Paths3", "isolate bin/..."),
    ].into_iter().collect();
    let view = read_view(&rec, "Paths");
    assert_eq!(view.len(), 3);
    assert_eq!(view[0].comment.as_deref(), Some("## everything"));
    assert_eq!(view[1].left, "");
    assert_eq!(view[2].map_type, MapType::Isolate);
    assert!(read_view(&rec, "Remapped").is_empty());
}
