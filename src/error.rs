/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Error types used by p4tagged
//!
//! Only the connection layer produces errors. Record decoding and revision
//! specifier parsing degrade to default values instead (see the `decode` and
//! `revspec` modules).

use std::{env, error, fmt, result};

use crate::conn::ErrorList;

/// Our custom result type
pub type Result<T> = result::Result<T, Error>;

/// Our custom compound error type
pub enum Error {
    /// An invalid argument was supplied
    Arg(&'static str),
    /// The connection factory failed to construct a connection
    Connect(String),
    /// The trust-aware construction path rejected the server fingerprint
    Untrusted(String),
    /// A command returned an error list instead of records
    CmdFailed(String, ErrorList),
    /// A required environment variable is missing or not unicode
    VarError(&'static str, env::VarError),
}

impl Error {
    /// Create an "invalid argument" error
    pub fn arg(msg: &'static str) -> Error {
        Error::Arg(msg)
    }
    /// Create a "connection construction failed" error
    pub fn connect<P: fmt::Display, R: fmt::Display>(port: P, reason: R) -> Error {
        Error::Connect(format!("cannot connect to {}: {}", port, reason))
    }
    /// Create an "untrusted fingerprint" error
    pub fn untrusted<T: fmt::Display>(port: T) -> Error {
        Error::Untrusted(format!("the fingerprint of {} is not trusted", port))
    }
    /// Create a "command failed" error carrying the server's error list
    pub fn cmd_failed<T: fmt::Display>(cmd: T, errors: ErrorList) -> Error {
        Error::CmdFailed(cmd.to_string(), errors)
    }
    /// Create an "environment variable" error naming the variable
    pub fn var(name: &'static str, e: env::VarError) -> Error {
        Error::VarError(name, e)
    }

    /// The server error list, if this is a command failure
    pub fn error_list(&self) -> Option<&ErrorList> {
        match *self {
            Error::CmdFailed(_, ref list) => Some(list),
            _ => None,
        }
    }
}

// Important impls for compound type
impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::VarError(_, ref e) => Some(e),
            _ => None,
        }
    }
}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Arg(msg) => write!(f, "Invalid argument: {}", msg),
            Error::Connect(ref msg) => write!(f, "{}", msg),
            Error::Untrusted(ref msg) => write!(f, "{}", msg),
            Error::CmdFailed(ref cmd, ref errors) => write!(f, "Command '{}' failed: {}", cmd, errors),
            Error::VarError(name, ref e) => write!(f, "{}: {}", name, e),
        }
    }
}
impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
