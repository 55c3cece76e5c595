//! In-process remote store
//!
//! Implements the [`RemoteStore`] contract without a server: native TTL on
//! the tokio clock, Redis-style glob listing, and a switch that makes every
//! call fail with a connection error.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use super::{ttl_millis, RemoteStore};
use crate::error::{CacheError, Result};

#[derive(Debug, Clone)]
struct Record {
    payload: String,
    expires_at: Option<Instant>,
}

impl Record {
    fn with_ttl(payload: String, ttl: Duration) -> Self {
        Self {
            payload,
            expires_at: Some(Instant::now() + Duration::from_millis(ttl_millis(ttl))),
        }
    }

    fn is_live(&self) -> bool {
        self.expires_at.map_or(true, |at| Instant::now() < at)
    }
}

// == Memory Store ==
/// Remote store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Record>>,
    failing: AtomicBool,
    closed: AtomicBool,
    calls: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of calls that reached the store, failed ones included.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.records.lock().values().filter(|r| r.is_live()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining TTL of a live record, `None` if absent or persistent.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let records = self.records.lock();
        let record = records.get(key).filter(|r| r.is_live())?;
        record
            .expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    fn check(&self, op: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.closed.load(Ordering::SeqCst) {
            return Err(CacheError::Connection("connection closed".to_string()));
        }
        if self.failing.load(Ordering::SeqCst) {
            debug!(op, "memory store failing on request");
            return Err(CacheError::Connection(format!("{} failed: store unavailable", op)));
        }
        Ok(())
    }
}

/// Drops the record if it has expired, then returns it if still present.
fn live<'a>(records: &'a mut HashMap<String, Record>, key: &str) -> Option<&'a mut Record> {
    if records.get(key).is_some_and(|r| !r.is_live()) {
        records.remove(key);
    }
    records.get_mut(key)
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check("get")?;
        let mut records = self.records.lock();
        Ok(live(&mut records, key).map(|r| r.payload.clone()))
    }

    async fn set(&self, key: &str, payload: String, ttl: Duration) -> Result<()> {
        self.check("set")?;
        self.records
            .lock()
            .insert(key.to_string(), Record::with_ttl(payload, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<u64> {
        self.check("del")?;
        let mut records = self.records.lock();
        let removed = live(&mut records, key).is_some();
        records.remove(key);
        Ok(removed as u64)
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64> {
        self.check("del")?;
        let mut records = self.records.lock();
        let mut removed = 0;
        for key in keys {
            if live(&mut records, key).is_some() {
                records.remove(key);
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        self.check("mget")?;
        let mut records = self.records.lock();
        Ok(keys
            .iter()
            .map(|key| live(&mut records, key).map(|r| r.payload.clone()))
            .collect())
    }

    async fn mset(&self, entries: Vec<(String, String, Duration)>) -> Result<()> {
        self.check("mset")?;
        let mut records = self.records.lock();
        for (key, payload, ttl) in entries {
            records.insert(key, Record::with_ttl(payload, ttl));
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.check("exists")?;
        let mut records = self.records.lock();
        Ok(live(&mut records, key).is_some())
    }

    async fn increment(&self, key: &str, by: i64) -> Result<i64> {
        self.check("incrby")?;
        let mut records = self.records.lock();
        match live(&mut records, key) {
            Some(record) => {
                let current: i64 = record.payload.parse().map_err(|_| {
                    CacheError::Protocol(format!("value at '{}' is not an integer", key))
                })?;
                let next = current.checked_add(by).ok_or_else(|| {
                    CacheError::Protocol(format!("increment of '{}' would overflow", key))
                })?;
                record.payload = next.to_string();
                Ok(next)
            }
            None => {
                records.insert(
                    key.to_string(),
                    Record {
                        payload: by.to_string(),
                        expires_at: None,
                    },
                );
                Ok(by)
            }
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.check("pexpire")?;
        let mut records = self.records.lock();
        match live(&mut records, key) {
            Some(record) => {
                record.expires_at =
                    Some(Instant::now() + Duration::from_millis(ttl_millis(ttl)));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.check("keys")?;
        let records = self.records.lock();
        let mut keys: Vec<String> = records
            .iter()
            .filter(|(key, record)| record.is_live() && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn ping(&self) -> Result<()> {
        self.check("ping")
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

// == Glob Matching ==
/// Matches `text` against a Redis-style glob.
///
/// Supports `*`, `?`, character classes (`[abc]`, `[a-z]`, `[^x]`) and
/// backslash escapes. An unclosed `[` matches itself.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    // Position of the last `*` and the text index it currently absorbs up to.
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
            continue;
        }
        if pi < p.len() {
            if let Some(next) = step(&p, pi, t[ti]) {
                pi = next;
                ti += 1;
                continue;
            }
        }
        match star {
            Some((sp, st)) => {
                pi = sp + 1;
                ti = st + 1;
                star = Some((sp, st + 1));
            }
            None => return false,
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

/// Matches one text char at pattern position `pi`, returning the next position.
fn step(p: &[char], pi: usize, c: char) -> Option<usize> {
    match p[pi] {
        '?' => Some(pi + 1),
        '\\' if pi + 1 < p.len() => (p[pi + 1] == c).then_some(pi + 2),
        '[' => match class_end(p, pi) {
            Some(end) => class_matches(&p[pi + 1..end], c).then_some(end + 1),
            None => (c == '[').then_some(pi + 1),
        },
        literal => (literal == c).then_some(pi + 1),
    }
}

fn class_end(p: &[char], open: usize) -> Option<usize> {
    let mut i = open + 1;
    while i < p.len() {
        match p[i] {
            '\\' => i += 2,
            ']' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

fn class_matches(class: &[char], c: char) -> bool {
    let (negate, body) = match class.first() {
        Some('^') => (true, &class[1..]),
        _ => (false, class),
    };

    let mut hit = false;
    let mut i = 0;
    while i < body.len() {
        if body[i] == '\\' && i + 1 < body.len() {
            hit |= body[i + 1] == c;
            i += 2;
        } else if i + 2 < body.len() && body[i + 1] == '-' {
            let (lo, hi) = if body[i] <= body[i + 2] {
                (body[i], body[i + 2])
            } else {
                (body[i + 2], body[i])
            };
            hit |= lo <= c && c <= hi;
            i += 3;
        } else {
            hit |= body[i] == c;
            i += 1;
        }
    }
    hit != negate
}
