/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! p4tagged: per-thread connection registry
//!
//! Connections are not reentrant, so each thread gets its own. The registry
//! maps thread identities to connections, creates connections on first use
//! and mirrors the shared session properties onto every connection, present
//! and future.
//!
//! ### Locking
//!
//! One registry-wide lock covers the map. `acquire`, the property setters and
//! `dispose_all` all take it, so creating a connection, binding it and
//! applying the current properties is atomic with respect to property
//! updates.
//!
//! Each connection also sits behind its own lock, held by its owner while a
//! command runs. Setters never wait on that lock: a busy connection is marked
//! stale and its owner applies the new values as soon as the command returns.
//! Hence no registry operation ever waits on network I/O.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread::{self, ThreadId};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::conn::{CommandError, CommandOutput, Connection, ConnectionConfig, ConnectionFactory,
        ErrorList, Severity};
use crate::error::{Error, Result};

/// Settings shared by all connections of a registry.
///
/// Empty strings and a zero timeout mean "unset": they are not applied to
/// newly created connections.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct SessionProperties {
    pub program_name: String,
    pub program_version: String,
    pub character_set: String,
    pub command_timeout: Duration,
}

impl SessionProperties {
    // Apply the properties which are set; for a new connection.
    fn apply_set<C: Connection>(&self, conn: &mut C) {
        if !self.program_name.is_empty() {
            conn.set_program_name(&self.program_name);
        }
        if !self.program_version.is_empty() {
            conn.set_program_version(&self.program_version);
        }
        if !self.character_set.is_empty() {
            conn.set_character_set(&self.character_set);
        }
        if self.command_timeout != Duration::ZERO {
            conn.set_command_timeout(self.command_timeout);
        }
    }

    // Apply each property differing from `applied`, which becomes `self`.
    fn apply_changes<C: Connection>(&self, conn: &mut C, applied: &mut SessionProperties) {
        if self.program_name != applied.program_name {
            conn.set_program_name(&self.program_name);
        }
        if self.program_version != applied.program_version {
            conn.set_program_version(&self.program_version);
        }
        if self.character_set != applied.character_set {
            conn.set_character_set(&self.character_set);
        }
        if self.command_timeout != applied.command_timeout {
            conn.set_command_timeout(self.command_timeout);
        }
        applied.clone_from(self);
    }
}

// A registered connection with the properties last applied to it.
struct Slot<C> {
    conn: C,
    applied: SessionProperties,
    disposed: bool,
}

impl<C: Connection> Slot<C> {
    fn sync(&mut self, props: &SessionProperties) {
        if !self.disposed && self.applied != *props {
            props.apply_changes(&mut self.conn, &mut self.applied);
        }
    }
}

// The slot plus a flag set by setters which found the connection busy.
struct SlotCell<C> {
    slot: Mutex<Slot<C>>,
    stale: AtomicBool,
}

type SharedSlot<C> = Arc<SlotCell<C>>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<T> {
    // a panic while holding the lock leaves nothing half-updated which we
    // cannot recover from; carry on
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The connection bound to the calling thread.
///
/// Obtained from `ConnectionRegistry::acquire`. A handle cannot be sent to
/// another thread: it is only ever used by the thread it is bound to. Clones
/// refer to the same connection.
pub struct ConnectionHandle<C> {
    cell: SharedSlot<C>,
    props: Arc<Mutex<SessionProperties>>,
    _not_send: PhantomData<*const ()>,
}

impl<C> Clone for ConnectionHandle<C> {
    fn clone(&self) -> Self {
        ConnectionHandle {
            cell: self.cell.clone(),
            props: self.props.clone(),
            _not_send: PhantomData,
        }
    }
}

impl<C: Connection> ConnectionHandle<C> {
    fn new(cell: SharedSlot<C>, props: Arc<Mutex<SessionProperties>>) -> Self {
        ConnectionHandle { cell, props, _not_send: PhantomData }
    }

    /// Run a command on the connection.
    ///
    /// Fails with an error list if the registry has been disposed.
    pub fn run(&self, command: &str, args: &[&str]) -> CommandOutput {
        let output = {
            let mut slot = lock(&self.cell.slot);
            if slot.disposed {
                return Err(ErrorList::single(CommandError::new(0, Severity::Fatal,
                        "connection has been disposed")));
            }
            self.cell.stale.store(false, Ordering::SeqCst);
            slot.sync(&lock(&self.props));
            slot.conn.run(command, args)
        };
        self.catch_up();
        output
    }

    /// Access the connection directly. Properties are brought up to date
    /// first.
    pub fn with<R, F: FnOnce(&mut C) -> R>(&self, f: F) -> R {
        let result = {
            let mut slot = lock(&self.cell.slot);
            self.cell.stale.store(false, Ordering::SeqCst);
            slot.sync(&lock(&self.props));
            f(&mut slot.conn)
        };
        self.catch_up();
        result
    }

    // Apply updates deferred while we held the connection.
    fn catch_up(&self) {
        while self.cell.stale.swap(false, Ordering::SeqCst) {
            lock(&self.cell.slot).sync(&lock(&self.props));
        }
    }

    /// True if both handles refer to the same connection
    pub fn same_as(&self, other: &ConnectionHandle<C>) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    /// An identifier of the connection, unique while the registry holds it
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.cell) as *const () as usize
    }

    /// True once the registry has released the connection
    pub fn is_disposed(&self) -> bool {
        lock(&self.cell.slot).disposed
    }
}

/// Hands out one connection per thread.
///
/// The registry is an ordinary value: share it by reference (or `Arc`)
/// between the threads using it. Dropping it disposes all connections.
pub struct ConnectionRegistry<F: ConnectionFactory> {
    factory: F,
    config: ConnectionConfig,
    handles: Mutex<HashMap<ThreadId, SharedSlot<F::Connection>>>,
    props: Arc<Mutex<SessionProperties>>,
}

impl<F: ConnectionFactory> ConnectionRegistry<F> {
    /// Create an empty registry. Connections are created lazily, by
    /// `acquire`.
    pub fn new(factory: F, config: ConnectionConfig) -> Result<ConnectionRegistry<F>> {
        config.validate()?;
        let target = match config.cwd {
            Some(ref dir) if config.port.trim().is_empty() => format!("workspace {}", dir.display()),
            _ => config.port.clone(),
        };
        info!("Connection registry for {} ({})", target,
                if config.trust_settings().is_some() { "trusted" } else { "no trust settings" });
        Ok(ConnectionRegistry {
            factory,
            config,
            handles: Mutex::new(HashMap::new()),
            props: Arc::new(Mutex::new(SessionProperties::default())),
        })
    }

    /// The configuration connections are built from
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// A copy of the current shared properties
    pub fn properties(&self) -> SessionProperties {
        lock(&self.props).clone()
    }

    /// Number of registered connections
    pub fn len(&self) -> usize {
        lock(&self.handles).len()
    }
    /// True if no connection is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The connection of the calling thread, created if needed.
    pub fn acquire(&self) -> Result<ConnectionHandle<F::Connection>> {
        self.acquire_for(thread::current().id())
    }

    /// The connection bound to `owner`, created if needed.
    ///
    /// A new connection is built by the factory's trust-checking path only
    /// when trust settings are configured, then bound to `owner` and given
    /// the current shared properties, all under the registry lock.
    pub fn acquire_for(&self, owner: ThreadId) -> Result<ConnectionHandle<F::Connection>> {
        let mut handles = lock(&self.handles);
        if let Some(cell) = handles.get(&owner) {
            debug!("Reusing connection for {:?}", owner);
            return Ok(ConnectionHandle::new(cell.clone(), self.props.clone()));
        }

        let mut conn = match self.config.trust_settings() {
            Some(trust) => match self.factory.connect_trusted(&self.config, trust) {
                Err(Error::Untrusted(msg)) => {
                    warn!("{}", msg);
                    return Err(Error::Untrusted(msg));
                }
                r => r?,
            },
            None => self.factory.connect(&self.config)?,
        };
        conn.set_thread_owner(owner);
        let props = lock(&self.props).clone();
        props.apply_set(&mut conn);
        let applied = props;
        debug!("New connection to {} for {:?} ({} registered)",
                self.config.port, owner, handles.len() + 1);

        let cell = Arc::new(SlotCell {
            slot: Mutex::new(Slot { conn, applied, disposed: false }),
            stale: AtomicBool::new(false),
        });
        handles.insert(owner, cell.clone());
        Ok(ConnectionHandle::new(cell, self.props.clone()))
    }

    /// Set the program name on all connections, present and future
    pub fn set_program_name(&self, name: &str) {
        self.update(|p| p.program_name = name.to_string());
    }
    /// Set the program version on all connections, present and future
    pub fn set_program_version(&self, version: &str) {
        self.update(|p| p.program_version = version.to_string());
    }
    /// Set the character set on all connections, present and future
    pub fn set_character_set(&self, charset: &str) {
        self.update(|p| p.character_set = charset.to_string());
    }
    /// Set the command timeout on all connections, present and future
    pub fn set_command_timeout(&self, timeout: Duration) {
        self.update(|p| p.command_timeout = timeout);
    }

    fn update<U: FnOnce(&mut SessionProperties)>(&self, f: U) {
        let handles = lock(&self.handles);
        let props = {
            let mut props = lock(&self.props);
            f(&mut props);
            props.clone()
        };
        let mut applied = 0;
        let mut deferred = 0;
        for cell in handles.values() {
            cell.stale.store(true, Ordering::SeqCst);
            match cell.slot.try_lock() {
                Ok(mut s) => {
                    cell.stale.store(false, Ordering::SeqCst);
                    s.sync(&props);
                    applied += 1;
                }
                Err(TryLockError::Poisoned(e)) => {
                    cell.stale.store(false, Ordering::SeqCst);
                    e.into_inner().sync(&props);
                    applied += 1;
                }
                // busy: the owner catches up when it releases the connection
                Err(TryLockError::WouldBlock) => deferred += 1,
            }
        }
        debug!("Session properties updated on {} connections ({} deferred)", applied, deferred);
    }

    /// Dispose every connection and empty the registry.
    ///
    /// Waits for running commands to finish. Handles still held afterwards
    /// fail every command.
    pub fn dispose_all(&self) {
        let mut handles = lock(&self.handles);
        if handles.is_empty() {
            return;
        }
        info!("Disposing {} connections to {}", handles.len(), self.config.port);
        for (_, cell) in handles.drain() {
            let mut s = lock(&cell.slot);
            if !s.disposed {
                s.conn.dispose();
                s.disposed = true;
            }
        }
    }
}

impl<F: ConnectionFactory> Drop for ConnectionRegistry<F> {
    fn drop(&mut self) {
        self.dispose_all();
    }
}

#[cfg(test)]
#[derive(Default)]
struct Recorder {
    names: Vec<String>,
    timeouts: Vec<Duration>,
}

#[cfg(test)]
impl Connection for Recorder {
    fn set_program_name(&mut self, name: &str) {
        self.names.push(name.to_string());
    }
    fn set_program_version(&mut self, _: &str) {}
    fn set_character_set(&mut self, _: &str) {}
    fn set_command_timeout(&mut self, timeout: Duration) {
        self.timeouts.push(timeout);
    }
    fn run(&mut self, _: &str, _: &[&str]) -> CommandOutput {
        Ok(vec![])
    }
}

#[cfg(test)]
struct RecorderFactory;

#[cfg(test)]
impl ConnectionFactory for RecorderFactory {
    type Connection = Recorder;
    fn connect(&self, _: &ConnectionConfig) -> Result<Recorder> {
        Ok(Recorder::default())
    }
    fn connect_trusted(&self, config: &ConnectionConfig, _: &crate::conn::TrustSettings) -> Result<Recorder> {
        Err(Error::untrusted(&config.port))
    }
}

#[test]
fn unset_properties_not_applied() {
    let reg = ConnectionRegistry::new(RecorderFactory, ConnectionConfig::new("p:1666")).unwrap();
    let h = reg.acquire().unwrap();
    assert!(h.with(|c| c.names.is_empty() && c.timeouts.is_empty()));

    reg.set_program_name("tool");
    reg.set_command_timeout(Duration::from_secs(5));
    assert_eq!(h.with(|c| c.names.clone()), vec!["tool".to_string()]);
    assert_eq!(h.with(|c| c.timeouts.clone()), vec![Duration::from_secs(5)]);
    assert!(reg.acquire().unwrap().same_as(&h));
}

#[test]
fn busy_connection_synced_before_next_command() {
    let reg = ConnectionRegistry::new(RecorderFactory, ConnectionConfig::new("p:1666")).unwrap();
    let h = reg.acquire().unwrap();
    {
        let _busy = lock(&h.cell.slot);
        reg.set_program_name("late");
    }
    assert!(lock(&h.cell.slot).conn.names.is_empty());
    h.run("info", &[]).unwrap();
    assert_eq!(lock(&h.cell.slot).conn.names, vec!["late".to_string()]);
}

#[test]
fn trust_path_only_with_trust_settings() {
    use crate::conn::TrustSettings;
    let config = ConnectionConfig::new("p:1666").trust(TrustSettings::new("", "AB:CD"));
    let reg = ConnectionRegistry::new(RecorderFactory, config).unwrap();
    match reg.acquire() {
        Err(Error::Untrusted(_)) => {}
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("expected untrusted"),
    }
    assert!(reg.is_empty());

    let config = ConnectionConfig::new("p:1666").trust(TrustSettings::default());
    let reg = ConnectionRegistry::new(RecorderFactory, config).unwrap();
    assert!(reg.acquire().is_ok());
}

#[test]
fn disposed_handles_fail() {
    let reg = ConnectionRegistry::new(RecorderFactory, ConnectionConfig::new("p:1666")).unwrap();
    let h = reg.acquire().unwrap();
    reg.dispose_all();
    assert!(reg.is_empty());
    assert!(h.is_disposed());
    assert!(h.run("info", &[]).is_err());
    assert!(!reg.acquire().unwrap().same_as(&h));
}
