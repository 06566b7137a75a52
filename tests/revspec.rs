/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Revision specifier parsing and formatting

use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use p4tagged::revspec::split_path;
use p4tagged::RevSpec;

fn date(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> RevSpec {
    let t = NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|day| day.and_hms_opt(h, min, s))
        .expect("valid date");
    RevSpec::DateTime(t)
}

#[test]
fn parse_each_form() {
    let _ = env_logger::builder().is_test(true).try_init();
    let cases = vec![
        ("#head", RevSpec::Head),
        ("#have", RevSpec::Have),
        ("#none", RevSpec::None),
        ("#5", RevSpec::Revision(5)),
        ("#0", RevSpec::Revision(0)),
        ("#add", RevSpec::Action("add".to_string())),
        ("@2024/01/15:10:00:00", date(2024, 1, 15, 10, 0, 0)),
        ("@1234", RevSpec::Changelist(1234)),
        ("@=1234", RevSpec::Shelved(1234)),
        ("@mylabel", RevSpec::Label("mylabel".to_string())),
        ("@my_client_ws", RevSpec::Label("my_client_ws".to_string())),
    ];
    for (text, expected) in cases {
        assert_eq!(RevSpec::parse(text), Some(expected), "parsing {:?}", text);
    }
}

#[test]
fn bad_date_falls_through() {
    // not a valid date, so this is a label
    assert_eq!(RevSpec::parse("@2024/13/45:10:00:00"),
            Some(RevSpec::Label("2024/13/45:10:00:00".to_string())));
}

#[test]
fn text_round_trip() {
    let specs = vec![
        RevSpec::Head,
        RevSpec::Have,
        RevSpec::None,
        RevSpec::Revision(17),
        date(1999, 12, 31, 23, 59, 59),
        RevSpec::Changelist(42),
        RevSpec::Shelved(43),
        RevSpec::Label("release-1.0".to_string()),
        RevSpec::Action("delete".to_string()),
    ];
    for spec in specs {
        let text = spec.to_string();
        assert_eq!(RevSpec::parse(&text), Some(spec), "round trip of {:?}", text);
    }

    let range = RevSpec::revision_range(3, 9);
    assert_eq!(RevSpec::parse_range(&range.to_string()), range);
    assert_eq!("#3,#9".parse::<RevSpec>().ok(), Some(range));
}

#[test]
fn display_forms() {
    assert_eq!(date(2024, 1, 5, 8, 3, 0).to_string(), "@2024/01/05:08:03:00");
    assert_eq!(RevSpec::Shelved(7).to_string(), "@=7");
    assert_eq!(RevSpec::revision_range(1, 4).to_string(), "#1,#4");
}

#[test]
fn range_is_ordered() {
    let r = RevSpec::parse_range("#5,#2");
    assert_eq!(r.bounds(), Some((&RevSpec::Revision(2), &RevSpec::Revision(5))));
    assert_eq!(RevSpec::parse_range("#3,#3"), RevSpec::revision_range(3, 3));
    assert_eq!(RevSpec::parse_range("#a,#b"), RevSpec::revision_range(0, 0));
    assert_eq!(RevSpec::parse_range("#1,#2,#3"), RevSpec::revision_range(0, 0));
}

#[test]
fn unrecognised_is_not_an_error() {
    for text in &["", "head", "1234", "#", "@", "@="] {
        assert_eq!(RevSpec::parse(text), None, "parsing {:?}", text);
    }
    assert!("1234".parse::<RevSpec>().is_err());
}

#[test]
fn suffix_of_path() {
    assert_eq!(split_path("//depot/main/a.c#head"), ("//depot/main/a.c", Some(RevSpec::Head)));
    assert_eq!(split_path("//depot/main/...@=99"), ("//depot/main/...", Some(RevSpec::Shelved(99))));
    assert_eq!(split_path("//depot/main/...@2024/01/15:00:00:00"),
            ("//depot/main/...", Some(date(2024, 1, 15, 0, 0, 0))));
}
