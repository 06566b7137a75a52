/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! p4tagged utility functions

/// Split a line of a compound field into its sub-fields.
///
/// Sub-fields are separated by single spaces; a sub-field wrapped in double
/// quotes may itself contain spaces (the quotes are removed). Runs of spaces
/// do not produce empty sub-fields.
///
/// Performance is `O(l)` where `l = line.len()`.
pub fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut cur = String::new();
    let mut quoted = false;
    let mut had_quotes = false;
    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                had_quotes = true;
            }
            ' ' | '\t' if !quoted => {
                if !cur.is_empty() || had_quotes {
                    fields.push(std::mem::take(&mut cur));
                }
                had_quotes = false;
            }
            c => cur.push(c),
        }
    }
    if !cur.is_empty() || had_quotes {
        fields.push(cur);
    }
    fields
}

/// Parse a form `specdef` value into `(field name, field type)` pairs.
///
/// A specdef looks like `Stream;code:701;rq;ro;fmt:L;len:64;;Owner;code:703;;`;
/// fields are separated by `;;` and the type is the `type:` attribute, which
/// defaults to `word` when absent.
pub fn parse_specdef(specdef: &str) -> Vec<(String, String)> {
    specdef.split(";;")
        .filter(|field| !field.is_empty())
        .map(|field| {
            let mut attrs = field.split(';');
            let name = attrs.next().unwrap_or("").to_string();
            let ty = attrs.filter_map(|a| a.strip_prefix("type:"))
                .next()
                .unwrap_or("word")
                .to_string();
            (name, ty)
        })
        .filter(|&(ref name, _)| !name.is_empty())
        .collect()
}

#[test]
fn test_split_fields() {
    assert_eq!(split_fields("share ..."), vec!["share", "..."]);
    assert_eq!(split_fields("import  lib/... //depot/lib/..."),
            vec!["import", "lib/...", "//depot/lib/..."]);
    assert_eq!(split_fields("\"//depot/a b/...\" //ws/x"),
            vec!["//depot/a b/...", "//ws/x"]);
    assert_eq!(split_fields(""), Vec::<String>::new());
}

#[test]
fn test_parse_specdef() {
    let fields = parse_specdef("Stream;code:701;rq;ro;fmt:L;len:64;;Paths;code:709;type:wlist;words:2;;Extra;;");
    assert_eq!(fields, vec![
        ("Stream".to_string(), "word".to_string()),
        ("Paths".to_string(), "wlist".to_string()),
        ("Extra".to_string(), "word".to_string()),
    ]);
    assert!(parse_specdef("").is_empty());
}
