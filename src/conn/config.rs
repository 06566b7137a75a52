/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! p4tagged: connection configuration
//!
//! Everything a `ConnectionFactory` needs to build a connection. The
//! configuration is fixed when the registry is constructed; only the shared
//! session properties (see `SessionProperties`) change afterwards.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Trust material for the fingerprint-checking construction path.
///
/// Empty strings mean "not given".
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct TrustSettings {
    /// Trust option passed along to the server (e.g. `-y`, `-f`)
    pub flag: String,
    /// Expected server fingerprint
    pub fingerprint: String,
}

impl TrustSettings {
    /// Construct
    pub fn new<F: Into<String>, P: Into<String>>(flag: F, fingerprint: P) -> TrustSettings {
        TrustSettings { flag: flag.into(), fingerprint: fingerprint.into() }
    }

    /// True if neither a flag nor a fingerprint is given. Such settings are
    /// treated exactly like no settings at all.
    pub fn is_empty(&self) -> bool {
        self.flag.is_empty() && self.fingerprint.is_empty()
    }
}

/// Address and credentials used to build connections.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server address, `host:port`
    pub port: String,
    pub user: String,
    pub password: String,
    /// Client workspace name
    pub client: String,
    /// Working directory reported to the server
    pub cwd: Option<PathBuf>,
    pub trust: Option<TrustSettings>,
}

impl ConnectionConfig {
    /// A configuration for `port` with nothing else set
    pub fn new<P: Into<String>>(port: P) -> ConnectionConfig {
        ConnectionConfig { port: port.into(), ..ConnectionConfig::default() }
    }

    /// Set the user name
    pub fn user<S: Into<String>>(mut self, user: S) -> ConnectionConfig {
        self.user = user.into();
        self
    }
    /// Set the password (or ticket)
    pub fn password<S: Into<String>>(mut self, password: S) -> ConnectionConfig {
        self.password = password.into();
        self
    }
    /// Set the client workspace
    pub fn client<S: Into<String>>(mut self, client: S) -> ConnectionConfig {
        self.client = client.into();
        self
    }
    /// Set the working directory
    pub fn cwd<P: Into<PathBuf>>(mut self, cwd: P) -> ConnectionConfig {
        self.cwd = Some(cwd.into());
        self
    }
    /// Set trust material. Empty settings are dropped.
    pub fn trust(mut self, trust: TrustSettings) -> ConnectionConfig {
        self.trust = if trust.is_empty() { None } else { Some(trust) };
        self
    }

    /// Trust material, if any is actually given
    pub fn trust_settings(&self) -> Option<&TrustSettings> {
        self.trust.as_ref().filter(|t| !t.is_empty())
    }

    /// A configuration with no server address, for connections which find
    /// their settings (`P4CONFIG` files) from the working directory `cwd`
    pub fn from_cwd<P: Into<PathBuf>>(cwd: P) -> ConnectionConfig {
        ConnectionConfig::default().cwd(cwd)
    }

    /// Check the configuration can be used to build connections.
    ///
    /// A server address is required unless a working directory is given.
    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() && self.cwd.is_none() {
            return Err(Error::arg("empty server address and no working directory"));
        }
        Ok(())
    }

    /// Read the configuration from the environment: `P4PORT` (required),
    /// `P4USER`, `P4PASSWD`, `P4CLIENT`, `P4TRUST_FLAG` and `P4FINGERPRINT`.
    pub fn from_env() -> Result<ConnectionConfig> {
        ConnectionConfig::from_vars(|name| env::var(name))
    }

    /// Like `from_env`, but reading variables through `get`.
    pub fn from_vars<F>(get: F) -> Result<ConnectionConfig>
            where F: Fn(&str) -> ::std::result::Result<String, env::VarError>
    {
        let port = get("P4PORT").map_err(|e| Error::var("P4PORT", e))?;
        let opt = |name: &'static str| -> Result<String> {
            match get(name) {
                Ok(v) => Ok(v),
                Err(env::VarError::NotPresent) => Ok(String::new()),
                Err(e) => Err(Error::var(name, e)),
            }
        };
        let config = ConnectionConfig::new(port)
            .user(opt("P4USER")?)
            .password(opt("P4PASSWD")?)
            .client(opt("P4CLIENT")?)
            .trust(TrustSettings::new(opt("P4TRUST_FLAG")?, opt("P4FINGERPRINT")?));
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> ::std::result::Result<String, env::VarError> {
    let pairs: Vec<(String, String)> = pairs.iter().map(|&(k, v)| (k.to_string(), v.to_string())).collect();
    move |name: &str| pairs.iter()
        .find(|&&(ref k, _)| k == name)
        .map(|&(_, ref v)| v.clone())
        .ok_or(env::VarError::NotPresent)
}

#[test]
fn builder() {
    let c = ConnectionConfig::new("ssl:perforce:1666").user("bob").client("bob_ws");
    assert_eq!(c.port, "ssl:perforce:1666");
    assert_eq!(c.user, "bob");
    assert_eq!(c.client, "bob_ws");
    assert!(c.trust_settings().is_none());
    assert!(c.clone().trust(TrustSettings::default()).trust.is_none());
    assert!(c.trust(TrustSettings::new("", "AB:CD")).trust_settings().is_some());
}

#[test]
fn address_or_working_directory() {
    assert!(ConnectionConfig::new("").validate().is_err());
    assert!(ConnectionConfig::new("  ").validate().is_err());
    assert!(ConnectionConfig::new("").cwd("/ws").validate().is_ok());
    let c = ConnectionConfig::from_cwd("/ws/alice");
    assert_eq!(c.port, "");
    assert_eq!(c.cwd, Some(PathBuf::from("/ws/alice")));
    assert!(c.validate().is_ok());
}

#[test]
fn environment() {
    let c = ConnectionConfig::from_vars(vars(&[("P4PORT", "perforce:1666"), ("P4USER", "alice")])).unwrap();
    assert_eq!(c.user, "alice");
    assert_eq!(c.password, "");
    assert!(c.trust.is_none());

    let c = ConnectionConfig::from_vars(vars(&[("P4PORT", "perforce:1666"), ("P4FINGERPRINT", "AB:CD")])).unwrap();
    assert_eq!(c.trust_settings().map(|t| t.fingerprint.as_str()), Some("AB:CD"));

    match ConnectionConfig::from_vars(vars(&[("P4USER", "alice")])) {
        Err(Error::VarError("P4PORT", env::VarError::NotPresent)) => {}
        other => panic!("unexpected: {:?}", other),
    }
    assert!(ConnectionConfig::from_vars(vars(&[("P4PORT", " ")])).is_err());
}
