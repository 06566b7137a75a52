/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! p4tagged: revision specifiers
//!
//! A path may end in a suffix naming a revision: `//depot/a.c#head`,
//! `//depot/a.c#4`, `//depot/...@2024/01/15:10:00:00`, `//depot/...@1234`,
//! `//depot/...@=1234` (shelved), `//depot/...@my_label`, ...
//!
//! ### Grammar
//!
//! `RevSpec::parse` tries the following rules in order; the first match wins:
//!
//! 1.  `#head`, `#have`, `#none` (exact)
//! 2.  contains `#`: revision number after the `#`, or an action name when the
//!     text is not a number
//! 3.  contains `@` and the text after it is a date (`yyyy/MM/dd:HH:mm:ss`)
//! 4.  contains `@=`: shelved changelist number
//! 5.  contains `@`: changelist number, or a label/client name when the text
//!     is not a number (labels and clients cannot be told apart)
//!
//! Input matching no rule is not an error; `parse` returns `None`.
//!
//! Ranges (`#1,#4`) are parsed separately by `RevSpec::parse_range`.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use log::trace;

use crate::error::{Error, Result};

/// Format of the date in a date specifier
pub const DATE_FORMAT: &str = "%Y/%m/%d:%H:%M:%S";

/// A revision specifier.
///
/// Equality is structural. `Range` keeps its bounds ordered (see
/// `RevSpec::range`).
///
/// Formatting and re-parsing gives back the same value, except for `Label`
/// and `Action` names that read as another rule's syntax, since the grammar
/// prefers the other rule:
///
/// *   `Label("123")` formats as `@123`, which parses as `Changelist(123)`
/// *   `Label("=7")` formats as `@=7`, which parses as `Shelved(7)`
/// *   `Label` holding a date formats as a date specifier (`DateTime`)
/// *   `Action("5")` formats as `#5`, which parses as `Revision(5)`
/// *   `Action("head")` formats as `#head`, which parses as `Head` (likewise
///     `have` and `none`)
///
/// A number too large for `i32` is not a revision or changelist; `#N` and
/// `@N` with such a number give `Action` and `Label` respectively.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum RevSpec {
    /// `#head`: the latest revision
    Head,
    /// `#have`: the revision in the workspace
    Have,
    /// `#none`: no revision
    None,
    /// `#N`
    Revision(i32),
    /// `@yyyy/MM/dd:HH:mm:ss`
    DateTime(NaiveDateTime),
    /// `@N`
    Changelist(i32),
    /// `@=N`
    Shelved(i32),
    /// `@name`: a label or a client workspace
    Label(String),
    /// `#name`: an action tag
    Action(String),
    /// `lower,upper`
    Range(Box<RevSpec>, Box<RevSpec>),
}

impl RevSpec {
    /// Parse a path suffix starting with `#` or `@`.
    ///
    /// Returns `None` if no grammar rule matches.
    pub fn parse(spec: &str) -> Option<RevSpec> {
        match spec {
            "#head" => return Some(RevSpec::Head),
            "#have" => return Some(RevSpec::Have),
            "#none" => return Some(RevSpec::None),
            _ => {}
        }
        if let Some((_, rest)) = spec.split_once('#') {
            return match rest.parse() {
                Ok(n) => Some(RevSpec::Revision(n)),
                Err(_) if !rest.is_empty() => {
                    trace_out_of_range(rest, spec);
                    Some(RevSpec::Action(rest.to_string()))
                }
                Err(_) => {
                    trace!("Empty revision in {:?}", spec);
                    None
                }
            };
        }
        if let Some((_, rest)) = spec.split_once('@') {
            // not a date: fall through to the other '@' rules
            if let Ok(t) = NaiveDateTime::parse_from_str(rest, DATE_FORMAT) {
                return Some(RevSpec::DateTime(t));
            }
        }
        if let Some((_, rest)) = spec.split_once("@=") {
            return match rest.parse() {
                Ok(n) => Some(RevSpec::Shelved(n)),
                Err(_) => {
                    trace!("Shelved specifier without changelist number: {:?}", spec);
                    None
                }
            };
        }
        if let Some((_, rest)) = spec.split_once('@') {
            return match rest.parse() {
                Ok(n) => Some(RevSpec::Changelist(n)),
                Err(_) if !rest.is_empty() => {
                    trace_out_of_range(rest, spec);
                    Some(RevSpec::Label(rest.to_string()))
                }
                Err(_) => {
                    trace!("Empty change or label in {:?}", spec);
                    None
                }
            };
        }
        trace!("Not a revision specifier: {:?}", spec);
        None
    }

    /// A range between two specifiers.
    ///
    /// Numeric revisions are put in ascending order; other bounds are kept
    /// as given.
    pub fn range(lower: RevSpec, upper: RevSpec) -> RevSpec {
        match (&lower, &upper) {
            (&RevSpec::Revision(l), &RevSpec::Revision(u)) if l > u =>
                RevSpec::Range(Box::new(upper), Box::new(lower)),
            _ => RevSpec::Range(Box::new(lower), Box::new(upper)),
        }
    }

    /// A range of revision numbers, in ascending order.
    pub fn revision_range(lower: i32, upper: i32) -> RevSpec {
        RevSpec::range(RevSpec::Revision(lower), RevSpec::Revision(upper))
    }

    /// Parse a revision range `#L,#U`.
    ///
    /// Each side is read as a number after its leading symbol; the bounds are
    /// swapped if needed so that `L <= U`. Malformed input gives the range
    /// `#0,#0` rather than an error.
    pub fn parse_range(spec: &str) -> RevSpec {
        let parts: Vec<&str> = spec.split(',').collect();
        if parts.len() != 2 {
            trace!("Not a revision range: {:?}", spec);
            return RevSpec::revision_range(0, 0);
        }
        let bound = |part: &str| -> i32 {
            let mut chars = part.trim().chars();
            chars.next();
            chars.as_str().parse().unwrap_or(0)
        };
        RevSpec::revision_range(bound(parts[0]), bound(parts[1]))
    }

    /// Bounds of a range; `None` for other variants
    pub fn bounds(&self) -> Option<(&RevSpec, &RevSpec)> {
        match *self {
            RevSpec::Range(ref l, ref u) => Some((l, u)),
            _ => Option::None,
        }
    }
}

// An all-digit name is a number that did not fit.
fn trace_out_of_range(name: &str, spec: &str) {
    if name.bytes().all(|b| b.is_ascii_digit()) {
        trace!("Number out of range, read as a name: {:?}", spec);
    }
}

impl fmt::Display for RevSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RevSpec::Head => f.write_str("#head"),
            RevSpec::Have => f.write_str("#have"),
            RevSpec::None => f.write_str("#none"),
            RevSpec::Revision(n) => write!(f, "#{}", n),
            RevSpec::DateTime(t) => write!(f, "@{}", t.format(DATE_FORMAT)),
            RevSpec::Changelist(n) => write!(f, "@{}", n),
            RevSpec::Shelved(n) => write!(f, "@={}", n),
            RevSpec::Label(ref name) => write!(f, "@{}", name),
            RevSpec::Action(ref name) => write!(f, "#{}", name),
            RevSpec::Range(ref l, ref u) => write!(f, "{},{}", l, u),
        }
    }
}

impl FromStr for RevSpec {
    type Err = Error;

    /// Like `RevSpec::parse`, but unrecognised input is an error. Input
    /// containing a comma is parsed as a range.
    fn from_str(s: &str) -> Result<RevSpec> {
        if s.contains(',') {
            return Ok(RevSpec::parse_range(s));
        }
        RevSpec::parse(s).ok_or(Error::arg("unrecognised revision specifier"))
    }
}

/// Split a path into the path proper and its revision specifier, if any.
///
/// The suffix starts at the first `#` or `@`. A suffix containing a comma is
/// read as a range.
pub fn split_path(path: &str) -> (&str, Option<RevSpec>) {
    match path.find(|c| c == '#' || c == '@') {
        Some(p) => {
            let suffix = &path[p..];
            let spec = if suffix.contains(',') {
                Some(RevSpec::parse_range(suffix))
            } else {
                RevSpec::parse(suffix)
            };
            (&path[..p], spec)
        }
        Option::None => (path, Option::None),
    }
}

#[test]
fn keywords() {
    assert_eq!(RevSpec::parse("#head"), Some(RevSpec::Head));
    assert_eq!(RevSpec::parse("#have"), Some(RevSpec::Have));
    assert_eq!(RevSpec::parse("#none"), Some(RevSpec::None));
    assert_eq!(RevSpec::parse("#HEAD"), Some(RevSpec::Action("HEAD".to_string())));
}

#[test]
fn shelved_is_reachable() {
    assert_eq!(RevSpec::parse("@=123"), Some(RevSpec::Shelved(123)));
    assert_eq!(RevSpec::parse("@=abc"), Option::None);
}

#[test]
fn unrecognised() {
    assert_eq!(RevSpec::parse("head"), Option::None);
    assert_eq!(RevSpec::parse("#"), Option::None);
    assert_eq!(RevSpec::parse("@"), Option::None);
    assert!("plain".parse::<RevSpec>().is_err());
}

#[test]
fn ambiguous_text_forms() {
    let reparse = |r: RevSpec| RevSpec::parse(&r.to_string());
    assert_eq!(reparse(RevSpec::Label("123".to_string())), Some(RevSpec::Changelist(123)));
    assert_eq!(reparse(RevSpec::Label("=7".to_string())), Some(RevSpec::Shelved(7)));
    assert_eq!(reparse(RevSpec::Action("5".to_string())), Some(RevSpec::Revision(5)));
    assert_eq!(reparse(RevSpec::Action("head".to_string())), Some(RevSpec::Head));
    assert_eq!(reparse(RevSpec::Label("rel1".to_string())), Some(RevSpec::Label("rel1".to_string())));
    assert_eq!(reparse(RevSpec::Action("add".to_string())), Some(RevSpec::Action("add".to_string())));
}

#[test]
fn numbers_beyond_i32() {
    assert_eq!(RevSpec::parse("#99999999999"), Some(RevSpec::Action("99999999999".to_string())));
    assert_eq!(RevSpec::parse("@99999999999"), Some(RevSpec::Label("99999999999".to_string())));
    assert_eq!(RevSpec::parse("@=99999999999"), Option::None);
    assert_eq!(RevSpec::parse("#2147483647"), Some(RevSpec::Revision(i32::MAX)));
}

#[test]
fn range_ordering() {
    assert_eq!(RevSpec::parse_range("#5,#2"), RevSpec::revision_range(2, 5));
    assert_eq!(RevSpec::parse_range("#5,#2").to_string(), "#2,#5");
    assert_eq!(RevSpec::revision_range(7, 3).bounds(),
            Some((&RevSpec::Revision(3), &RevSpec::Revision(7))));
    assert_eq!(RevSpec::parse_range("#1"), RevSpec::revision_range(0, 0));
    assert_eq!(RevSpec::parse_range(",#x"), RevSpec::revision_range(0, 0));
}

#[test]
fn paths() {
    assert_eq!(split_path("//depot/a.c#3"), ("//depot/a.c", Some(RevSpec::Revision(3))));
    assert_eq!(split_path("//depot/...@rel1"), ("//depot/...", Some(RevSpec::Label("rel1".to_string()))));
    assert_eq!(split_path("//depot/a.c#1,#4"), ("//depot/a.c", Some(RevSpec::revision_range(1, 4))));
    assert_eq!(split_path("//depot/a.c"), ("//depot/a.c", Option::None));
}
