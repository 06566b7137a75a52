/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! p4tagged: decoding of flat records into typed entities
//!
//! Each entity is described by a static *field table*: a list of
//! `(key, setter)` pairs. `apply_fields` walks the table, looks each key up
//! (optionally with an index suffix such as `3` or `3,1`) and calls the setter
//! for keys which are present. Keys which are absent leave the entity's
//! default value in place; decoding never fails.
//!
//! Arrays encoded as key families are read with `FlatRecord::indexed` and
//! `FlatRecord::indexed2` (see the `record` module).

use crate::record::FlatRecord;

pub mod license;
pub mod metadata;
pub mod protect;
pub mod stream;
pub mod streamlog;
pub mod view;

/// Assigns one decoded value to a field of `T`.
pub type Setter<T> = fn(&mut T, &str);

/// A field table: record key (without index suffix) and the setter to call
/// when it is present.
pub type FieldTable<T> = [(&'static str, Setter<T>)];

/// Apply `table` to `target`, reading key `name + suffix` for each entry.
///
/// Returns the number of fields found.
pub fn apply_fields<T>(record: &FlatRecord, table: &FieldTable<T>, suffix: &str, target: &mut T) -> usize {
    let mut found = 0;
    let mut key = String::new();
    for &(name, set) in table {
        key.clear();
        key.push_str(name);
        key.push_str(suffix);
        if let Some(value) = record.get(&key) {
            set(target, value);
            found += 1;
        }
    }
    found
}

/// Decode a whole entity from a record through its field table.
pub fn decode_with<T: Default>(record: &FlatRecord, table: &FieldTable<T>) -> T {
    let mut target = T::default();
    apply_fields(record, table, "", &mut target);
    target
}

#[cfg(test)]
#[derive(Default, Debug, PartialEq)]
struct Pair {
    name: String,
    count: i32,
}

#[cfg(test)]
static PAIR_FIELDS: &FieldTable<Pair> = &[
    ("name", |p: &mut Pair, v: &str| p.name = v.to_string()),
    ("count", |p: &mut Pair, v: &str| p.count = crate::record::parse_int("count", v)),
];

#[test]
fn apply_with_suffix() {
    let rec: FlatRecord = vec![("name2", "x"), ("count2", "7"), ("name", "plain")].into_iter().collect();
    let mut p = Pair::default();
    assert_eq!(apply_fields(&rec, PAIR_FIELDS, "2", &mut p), 2);
    assert_eq!(p, Pair { name: "x".to_string(), count: 7 });
    assert_eq!(decode_with::<Pair>(&rec, PAIR_FIELDS), Pair { name: "plain".to_string(), count: 0 });
    assert_eq!(decode_with::<Pair>(&FlatRecord::new(), PAIR_FIELDS), Pair::default());
}
