/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Connection registry: one connection per thread, shared properties

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

use pretty_assertions::assert_eq;

use p4tagged::conn::{self, BENIGN_PROBE_CODE, Severity};
use p4tagged::{CommandError, CommandOutput, Connection, ConnectionConfig, ConnectionFactory,
        ConnectionRegistry, Error, ErrorList, FlatRecord, Result, ServerMetaData, TrustSettings};

// —————  Mock transport  —————

#[derive(Default)]
struct Counters {
    plain: AtomicUsize,
    trusted: AtomicUsize,
    disposed: AtomicUsize,
}

#[derive(Default, Debug)]
struct Seen {
    owner: Option<ThreadId>,
    program_name: Option<String>,
    program_version: Option<String>,
    character_set: Option<String>,
    timeout: Option<Duration>,
}

struct MockConnection {
    counters: Arc<Counters>,
    seen: Arc<Mutex<Seen>>,
}

impl Connection for MockConnection {
    fn set_program_name(&mut self, name: &str) {
        self.seen.lock().unwrap().program_name = Some(name.to_string());
    }
    fn set_program_version(&mut self, version: &str) {
        self.seen.lock().unwrap().program_version = Some(version.to_string());
    }
    fn set_character_set(&mut self, charset: &str) {
        self.seen.lock().unwrap().character_set = Some(charset.to_string());
    }
    fn set_command_timeout(&mut self, timeout: Duration) {
        self.seen.lock().unwrap().timeout = Some(timeout);
    }
    fn set_thread_owner(&mut self, owner: ThreadId) {
        self.seen.lock().unwrap().owner = Some(owner);
    }
    fn run(&mut self, command: &str, _args: &[&str]) -> CommandOutput {
        match command {
            "info" => {
                let rec: FlatRecord = vec![("serverName", "mock"), ("move", "disabled")]
                    .into_iter().collect();
                Ok(vec![rec])
            }
            "dirs" => Err(ErrorList::single(CommandError::new(BENIGN_PROBE_CODE,
                    Severity::Failed, "no such file(s)"))),
            _ => Err(ErrorList::single(CommandError::new(1, Severity::Failed,
                    format!("unknown command {}", command)))),
        }
    }
    fn dispose(&mut self) {
        self.counters.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

struct MockFactory {
    counters: Arc<Counters>,
    // what every created connection has observed, in creation order
    seen: Arc<Mutex<Vec<Arc<Mutex<Seen>>>>>,
    accept_fingerprint: &'static str,
}

impl MockFactory {
    fn new() -> MockFactory {
        MockFactory {
            counters: Arc::new(Counters::default()),
            seen: Arc::new(Mutex::new(Vec::new())),
            accept_fingerprint: "AB:CD",
        }
    }

    fn build(&self) -> MockConnection {
        let seen = Arc::new(Mutex::new(Seen::default()));
        self.seen.lock().unwrap().push(seen.clone());
        MockConnection { counters: self.counters.clone(), seen }
    }
}

impl ConnectionFactory for MockFactory {
    type Connection = MockConnection;

    fn connect(&self, _config: &ConnectionConfig) -> Result<MockConnection> {
        self.counters.plain.fetch_add(1, Ordering::SeqCst);
        Ok(self.build())
    }

    fn connect_trusted(&self, config: &ConnectionConfig, trust: &TrustSettings) -> Result<MockConnection> {
        self.counters.trusted.fetch_add(1, Ordering::SeqCst);
        if trust.fingerprint != self.accept_fingerprint {
            return Err(Error::untrusted(&config.port));
        }
        Ok(self.build())
    }
}

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn registry(config: ConnectionConfig) -> (ConnectionRegistry<MockFactory>, Arc<Counters>, Arc<Mutex<Vec<Arc<Mutex<Seen>>>>>) {
    let factory = MockFactory::new();
    let counters = factory.counters.clone();
    let seen = factory.seen.clone();
    (ConnectionRegistry::new(factory, config).expect("valid config"), counters, seen)
}

// —————  Tests  —————

#[test]
fn same_thread_same_connection() {
    init_logs();
    let (reg, counters, seen) = registry(ConnectionConfig::new("perforce:1666"));
    let a = reg.acquire().unwrap();
    let b = reg.acquire().unwrap();
    assert!(a.same_as(&b));
    assert_eq!(counters.plain.load(Ordering::SeqCst), 1);
    assert_eq!(counters.trusted.load(Ordering::SeqCst), 0);
    assert_eq!(seen.lock().unwrap()[0].lock().unwrap().owner, Some(thread::current().id()));
}

#[test]
fn distinct_threads_distinct_connections() {
    init_logs();
    const N: usize = 8;
    let (reg, counters, _) = registry(ConnectionConfig::new("perforce:1666"));
    let reg = Arc::new(reg);
    let barrier = Arc::new(Barrier::new(N));
    let workers: Vec<_> = (0..N).map(|_| {
        let reg = reg.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            barrier.wait();
            let first = reg.acquire().unwrap();
            let again = reg.acquire().unwrap();
            assert!(first.same_as(&again));
            first.id()
        })
    }).collect();
    let ids: HashSet<usize> = workers.into_iter().map(|w| w.join().unwrap()).collect();

    assert_eq!(ids.len(), N);
    assert_eq!(reg.len(), N);
    assert_eq!(counters.plain.load(Ordering::SeqCst), N);
}

#[test]
fn properties_reach_present_and_future_connections() {
    init_logs();
    let (reg, _, seen) = registry(ConnectionConfig::new("perforce:1666"));
    let reg = Arc::new(reg);

    {
        let reg = reg.clone();
        thread::spawn(move || { reg.acquire().unwrap(); }).join().unwrap();
    }
    assert_eq!(seen.lock().unwrap()[0].lock().unwrap().program_name, None);

    reg.set_program_name("p4tagged-tests");
    reg.set_program_version("1.0");
    reg.set_character_set("utf8");
    reg.set_command_timeout(Duration::from_secs(30));

    {
        let s = seen.lock().unwrap();
        let first = s[0].lock().unwrap();
        assert_eq!(first.program_name.as_deref(), Some("p4tagged-tests"));
        assert_eq!(first.program_version.as_deref(), Some("1.0"));
        assert_eq!(first.character_set.as_deref(), Some("utf8"));
        assert_eq!(first.timeout, Some(Duration::from_secs(30)));
    }

    let late = reg.acquire().unwrap();
    late.run("info", &[]).unwrap();
    let s = seen.lock().unwrap();
    let second = s[1].lock().unwrap();
    assert_eq!(second.program_name.as_deref(), Some("p4tagged-tests"));
    assert_eq!(second.timeout, Some(Duration::from_secs(30)));
    assert_eq!(reg.properties().character_set, "utf8");
}

#[test]
fn concurrent_update_is_never_lost() {
    init_logs();
    const N: usize = 6;
    let (reg, _, seen) = registry(ConnectionConfig::new("perforce:1666"));
    let reg = Arc::new(reg);
    let barrier = Arc::new(Barrier::new(N + 1));
    let workers: Vec<_> = (0..N).map(|_| {
        let reg = reg.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            barrier.wait();
            let h = reg.acquire().unwrap();
            // a command syncs anything deferred while the connection was busy
            h.run("info", &[]).unwrap();
        })
    }).collect();
    barrier.wait();
    reg.set_program_name("racer");
    for w in workers {
        w.join().unwrap();
    }

    let s = seen.lock().unwrap();
    assert_eq!(s.len(), N);
    for conn in s.iter() {
        assert_eq!(conn.lock().unwrap().program_name.as_deref(), Some("racer"));
    }
}

#[test]
fn trust_path_only_when_configured() {
    init_logs();
    let (reg, counters, _) = registry(ConnectionConfig::new("ssl:perforce:1666"));
    reg.acquire().unwrap();
    assert_eq!(counters.trusted.load(Ordering::SeqCst), 0);

    let config = ConnectionConfig::new("ssl:perforce:1666").trust(TrustSettings::new("-y", "AB:CD"));
    let (reg, counters, _) = registry(config);
    reg.acquire().unwrap();
    assert_eq!(counters.trusted.load(Ordering::SeqCst), 1);
    assert_eq!(counters.plain.load(Ordering::SeqCst), 0);

    let config = ConnectionConfig::new("ssl:perforce:1666").trust(TrustSettings::new("", "00:00"));
    let (reg, _, _) = registry(config);
    match reg.acquire() {
        Err(Error::Untrusted(_)) => {}
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("fingerprint should be rejected"),
    }
    assert!(reg.is_empty());
}

#[test]
fn dispose_all_releases_everything() {
    init_logs();
    let (reg, counters, _) = registry(ConnectionConfig::new("perforce:1666"));
    let reg = Arc::new(reg);
    for _ in 0..3 {
        let reg = reg.clone();
        thread::spawn(move || { reg.acquire().unwrap(); }).join().unwrap();
    }
    let mine = reg.acquire().unwrap();
    assert_eq!(reg.len(), 4);

    reg.dispose_all();
    assert_eq!(counters.disposed.load(Ordering::SeqCst), 4);
    assert!(reg.is_empty());
    assert!(mine.is_disposed());
    reg.dispose_all();
    assert_eq!(counters.disposed.load(Ordering::SeqCst), 4);
}

#[test]
fn dropping_registry_disposes() {
    init_logs();
    let (reg, counters, _) = registry(ConnectionConfig::new("perforce:1666"));
    reg.acquire().unwrap();
    drop(reg);
    assert_eq!(counters.disposed.load(Ordering::SeqCst), 1);
}

#[test]
fn empty_port_needs_working_directory() {
    match ConnectionRegistry::new(MockFactory::new(), ConnectionConfig::new("")) {
        Err(Error::Arg(_)) => {}
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("empty port accepted"),
    }

    // settings come from the working directory
    let (reg, counters, _) = registry(ConnectionConfig::from_cwd("/ws/alice"));
    let h = reg.acquire().unwrap();
    assert!(h.run("info", &[]).is_ok());
    assert_eq!(counters.plain.load(Ordering::SeqCst), 1);
    assert_eq!(reg.config().cwd.as_deref(), Some(std::path::Path::new("/ws/alice")));
}

#[test]
fn commands_and_decoding() {
    init_logs();
    let (reg, _, _) = registry(ConnectionConfig::new("perforce:1666"));
    let h = reg.acquire().unwrap();

    let md = conn::run_and_decode(&h, "info", &[], |recs| ServerMetaData::decode(&recs[0])).unwrap();
    assert_eq!(md.name, "mock");
    assert!(!md.move_enabled);

    match conn::run_and_decode(&h, "bogus", &[], |recs| recs.len()) {
        Err(Error::CmdFailed(cmd, errors)) => {
            assert_eq!(cmd, "bogus");
            assert_eq!(errors.len(), 1);
        }
        other => panic!("unexpected: {:?}", other),
    }

    // the probe reports the benign "doesn't exist yet" condition
    conn::probe(&h).unwrap();
}
