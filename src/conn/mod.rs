/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! p4tagged: the boundary to the server connection
//!
//! The transport itself is not part of this library. A user supplies a
//! `ConnectionFactory` building `Connection` objects; the `ConnectionRegistry`
//! hands those out one per thread, since a connection must never be used by
//! two threads at once.
//!
//! A command either yields a sequence of flat records or an `ErrorList`; the
//! latter is turned into `Error::CmdFailed` before any decoding happens.

use std::fmt;
use std::result;
use std::thread::ThreadId;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::FlatRecord;

pub mod config;
pub mod registry;

pub use self::config::{ConnectionConfig, TrustSettings};
pub use self::registry::{ConnectionHandle, ConnectionRegistry, SessionProperties};

/// Error code reported when a trivial connectivity probe hits something that
/// doesn't exist yet. Callers treat it as expected.
pub const BENIGN_PROBE_CODE: i32 = 824577061;

/// Output of one command: the records, or the server's errors.
pub type CommandOutput = result::Result<Vec<FlatRecord>, ErrorList>;

/// Severity of a server error, in increasing order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
pub enum Severity {
    Empty,
    Info,
    Warning,
    #[default]
    Failed,
    Fatal,
}

/// One error reported by the server.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct CommandError {
    pub code: i32,
    pub severity: Severity,
    pub message: String,
}

impl CommandError {
    /// Construct
    pub fn new<M: Into<String>>(code: i32, severity: Severity, message: M) -> CommandError {
        CommandError { code, severity, message: message.into() }
    }

    /// True for the "doesn't exist yet" condition of a connectivity probe
    pub fn is_benign_probe(&self) -> bool {
        self.code == BENIGN_PROBE_CODE
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// The errors of one failed command, in the order reported.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorList(pub Vec<CommandError>);

impl ErrorList {
    /// Wrap a list of errors
    pub fn new(errors: Vec<CommandError>) -> ErrorList {
        ErrorList(errors)
    }
    /// A list with a single error
    pub fn single(error: CommandError) -> ErrorList {
        ErrorList(vec![error])
    }

    /// Number of errors
    pub fn len(&self) -> usize {
        self.0.len()
    }
    /// True if there are no errors
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    /// Iterate over errors
    pub fn iter(&self) -> std::slice::Iter<CommandError> {
        self.0.iter()
    }

    /// Highest severity in the list, if any
    pub fn max_severity(&self) -> Option<Severity> {
        self.0.iter().map(|e| e.severity).max()
    }

    /// Succeed if every error is the benign probe condition, otherwise give
    /// the list back.
    pub fn into_result_allowing_probe(self) -> result::Result<(), ErrorList> {
        if self.0.iter().all(CommandError::is_benign_probe) {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("no error reported");
        }
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", e)?;
        }
        Ok(())
    }
}

/// A connection to the server.
///
/// Implementations are not expected to be reentrant: the registry makes sure
/// only one thread at a time uses any connection.
pub trait Connection: Send {
    /// Name of the program, as reported to the server
    fn set_program_name(&mut self, name: &str);
    /// Version of the program, as reported to the server
    fn set_program_version(&mut self, version: &str);
    /// Character set used for the conversation
    fn set_character_set(&mut self, charset: &str);
    /// Timeout applied to each command
    fn set_command_timeout(&mut self, timeout: Duration);

    /// Called once, when the connection is bound to a thread.
    fn set_thread_owner(&mut self, _owner: ThreadId) {}

    /// Run a command. Network I/O happens here, never under the registry
    /// lock.
    fn run(&mut self, command: &str, args: &[&str]) -> CommandOutput;

    /// Release the connection. Called once by the registry.
    fn dispose(&mut self) {}
}

/// Builds connections for the registry.
///
/// Construction happens under the registry lock: it must not block on the
/// network. Connect lazily, on the first command.
pub trait ConnectionFactory: Send + Sync {
    type Connection: Connection;

    /// Build a connection without any fingerprint checking.
    fn connect(&self, config: &ConnectionConfig) -> Result<Self::Connection>;

    /// Build a connection checking the server fingerprint against `trust`.
    ///
    /// Only called when trust material is configured. Should fail with
    /// `Error::Untrusted` when the fingerprint is rejected.
    fn connect_trusted(&self, config: &ConnectionConfig, trust: &TrustSettings)
            -> Result<Self::Connection>;
}

/// Run a command on an acquired handle and decode its records.
///
/// A failed command is reported as `Error::CmdFailed`; `decode` is only
/// called on success.
pub fn run_and_decode<C, T, F>(handle: &ConnectionHandle<C>, command: &str, args: &[&str], decode: F)
        -> Result<T>
        where C: Connection, F: FnOnce(&[FlatRecord]) -> T
{
    match handle.run(command, args) {
        Ok(records) => Ok(decode(&records)),
        Err(errors) => Err(Error::cmd_failed(command, errors)),
    }
}

/// Check that the server can be reached by running a trivial command.
///
/// The benign probe condition counts as success.
pub fn probe<C: Connection>(handle: &ConnectionHandle<C>) -> Result<()> {
    match handle.run("dirs", &["//*"]) {
        Ok(_) => Ok(()),
        Err(errors) => errors.into_result_allowing_probe()
            .map_err(|errors| Error::cmd_failed("dirs", errors)),
    }
}

#[test]
fn probe_condition() {
    let benign = CommandError::new(BENIGN_PROBE_CODE, Severity::Failed, "Connect to server failed");
    assert!(benign.is_benign_probe());
    assert_eq!(ErrorList::single(benign.clone()).into_result_allowing_probe(), Ok(()));

    let other = CommandError::new(1, Severity::Fatal, "bad");
    let list = ErrorList::new(vec![benign, other]);
    assert_eq!(list.max_severity(), Some(Severity::Fatal));
    assert!(list.clone().into_result_allowing_probe().is_err());
    assert_eq!(list.to_string(), "Connect to server failed (code 824577061); bad (code 1)");
}
