/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! p4tagged library
//!
//! The client side of a Perforce-style version control server. The server
//! answers every command with *tagged output*: a sequence of flat records,
//! each an unordered map from string keys to string values. Arrays and nested
//! arrays are flattened into numbered keys (`Paths0`, `Paths1`, `stream0,1`,
//! ...). This library turns such records back into typed entities, interprets
//! the revision specifiers found at the end of paths and hands out
//! connections safely to multi-threaded callers.
//!
//! The transport itself is not provided: users implement the `Connection`
//! and `ConnectionFactory` traits on top of whatever actually talks to the
//! server.
//!
//! Terminology:
//!
//! *   **flat record**: one tagged answer of the server (`FlatRecord`)
//! *   **indexed key**: a key with a numeric suffix encoding an array position
//! *   **revision specifier**: the `#...` or `@...` suffix of a path naming a
//!     revision, changelist, label, date or range (`RevSpec`)
//! *   **calling context**: the thread a connection is bound to
//!
//! ### Decoding never fails
//!
//! The server omits optional fields and sometimes writes numbers in odd ways.
//! Decoders therefore never return errors: absent keys and unparsable values
//! leave the default value (empty string, zero, minimum date, empty list, ...).
//! Only the connection layer reports errors, via `error::Error`.
//!
//! ### Relationship between structs and traits
//!
//! Traits for the user to implement:
//!
//! *   Connection
//! *   ConnectionFactory (yields Connection objects)
//!
//! Library structures:
//!
//! *   FlatRecord (input of all decoders)
//! *   Stream, StreamLog, ServerLicense, ServerMetaData, ProtectionEntry, ...
//!     (decoded from FlatRecord objects)
//! *   RevSpec (parsed from path suffixes)
//! *   ConnectionRegistry (uses a ConnectionFactory and yields ConnectionHandle
//!     objects, one per thread)

pub use crate::conn::{Connection, ConnectionFactory, CommandOutput, CommandError, ErrorList};
pub use crate::conn::{ConnectionConfig, TrustSettings};
pub use crate::conn::{ConnectionHandle, ConnectionRegistry, SessionProperties};
pub use crate::date::{ServerTime, TimeEncoding};
pub use crate::decode::license::{ServerLicense, ServerIPMACAddress};
pub use crate::decode::metadata::{ServerMetaData, ServerVersion, ServerAddress};
pub use crate::decode::protect::{ProtectionEntry, ProtectionMode, ProtectionTable, EntryType};
pub use crate::decode::stream::{Stream, StreamType, StreamOptions, ParentView};
pub use crate::decode::streamlog::{StreamLog, StreamIntegrationLog};
pub use crate::decode::view::{MapEntry, MapType, ViewMap};
pub use crate::error::{Error, Result};
pub use crate::record::{FlatRecord, TagEnum};
pub use crate::revspec::RevSpec;

pub mod conn;
pub mod date;
pub mod decode;
pub mod error;
pub mod record;
pub mod revspec;
pub mod util;

/// Version. The low 16 bits are patch number, next 16 are the minor version
/// number, the next are the major version number. The top 16 are zero.
///
/// Until the library enters 'beta' phase this shall remain zero and nothing
/// shall be considered fixed.
pub const LIB_VERSION: u64 = 0x0000_0000_0000;
