//! Shared formula result cache
//!
//! Results are keyed by a BLAKE3 hash of the formula text and the values of
//! everything it reads, so two requests that evaluate the same formula over
//! the same inputs share one computation. Every function in the library is
//! pure, which makes a hit indistinguishable from a fresh evaluation.
//!
//! Concurrent misses for one key are collapsed: the first caller computes,
//! the rest wait on the same [`OnceLock`] and receive its outcome.

use crate::error::FormulaError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use lru::LruCache;
use paintbox_core::{CellKey, CellValue, NameTarget};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::trace;

/// What evaluating one formula cell produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellOutcome {
    pub value: CellValue,
    /// Why the value is an error, when it is one
    pub diagnostic: Option<FormulaError>,
}

impl CellOutcome {
    pub fn ok(value: CellValue) -> Self {
        Self {
            value,
            diagnostic: None,
        }
    }

    pub fn failed(error: FormulaError) -> Self {
        Self {
            value: CellValue::Error(error.cell_error()),
            diagnostic: Some(error),
        }
    }
}

/// Content hash identifying one evaluation
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Key for `formula_text` evaluated over the given dependency values
    pub fn for_formula(formula_text: &str, dependencies: &[(CellKey, CellValue)]) -> Self {
        let mut builder = CacheKeyBuilder::new(formula_text);
        for (key, value) in dependencies {
            builder.dependency(key, value);
        }
        builder.finish()
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({})", self)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

// Section tags keep the encoding prefix-free
const TAG_FORMULA: u8 = b'F';
const TAG_NAME: u8 = b'N';
const TAG_DEPENDENCY: u8 = b'D';

const VALUE_EMPTY: u8 = 0;
const VALUE_BOOLEAN: u8 = 1;
const VALUE_NUMBER: u8 = 2;
const VALUE_TEXT: u8 = 3;
const VALUE_ERROR: u8 = 4;

const TARGET_UNDEFINED: u8 = 0;
const TARGET_CELL: u8 = 1;
const TARGET_RANGE: u8 = 2;
const TARGET_CONSTANT: u8 = 3;

/// Incremental [`CacheKey`] construction
///
/// Feed the formula text first, then the names it uses, then the
/// dependency values in a deterministic order.
pub struct CacheKeyBuilder {
    hasher: blake3::Hasher,
}

impl CacheKeyBuilder {
    pub fn new(formula_text: &str) -> Self {
        let mut builder = Self {
            hasher: blake3::Hasher::new(),
        };
        builder.hasher.update(&[TAG_FORMULA]);
        builder.bytes(formula_text.as_bytes());
        builder
    }

    /// A name the formula refers to and what it currently resolves to
    pub fn name(&mut self, name: &str, target: Option<&NameTarget>) -> &mut Self {
        self.hasher.update(&[TAG_NAME]);
        self.bytes(name.to_ascii_uppercase().as_bytes());
        match target {
            None => {
                self.hasher.update(&[TARGET_UNDEFINED]);
            }
            Some(NameTarget::Cell(key)) => {
                self.hasher.update(&[TARGET_CELL]);
                self.cell(key);
            }
            Some(NameTarget::Range { sheet, range }) => {
                self.hasher.update(&[TARGET_RANGE]);
                self.bytes(sheet.as_str().as_bytes());
                for corner in [range.start, range.end] {
                    self.hasher.update(&corner.row.to_le_bytes());
                    self.hasher.update(&corner.col.to_le_bytes());
                }
            }
            Some(NameTarget::Constant(value)) => {
                self.hasher.update(&[TARGET_CONSTANT]);
                self.value(value);
            }
        }
        self
    }

    /// A cell the formula reads and the value it currently holds
    pub fn dependency(&mut self, key: &CellKey, value: &CellValue) -> &mut Self {
        self.hasher.update(&[TAG_DEPENDENCY]);
        self.cell(key);
        self.value(value);
        self
    }

    fn cell(&mut self, key: &CellKey) {
        self.bytes(key.sheet.as_str().as_bytes());
        self.hasher.update(&key.address.row.to_le_bytes());
        self.hasher.update(&key.address.col.to_le_bytes());
    }

    pub fn finish(&self) -> CacheKey {
        CacheKey(*self.hasher.finalize().as_bytes())
    }

    fn bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(&(bytes.len() as u64).to_le_bytes());
        self.hasher.update(bytes);
    }

    fn value(&mut self, value: &CellValue) {
        match value {
            CellValue::Empty => {
                self.hasher.update(&[VALUE_EMPTY]);
            }
            CellValue::Boolean(b) => {
                self.hasher.update(&[VALUE_BOOLEAN, u8::from(*b)]);
            }
            CellValue::Number(n) => {
                // 1.0 and 1 are the same input
                self.hasher.update(&[VALUE_NUMBER]);
                self.hasher.update(&n.normalize().serialize());
            }
            CellValue::Text(s) => {
                self.hasher.update(&[VALUE_TEXT]);
                self.bytes(s.as_str().as_bytes());
            }
            CellValue::Error(e) => {
                self.hasher.update(&[VALUE_ERROR, e.code()]);
            }
        }
    }
}

/// Stored result
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub outcome: CellOutcome,
    pub stored_at: DateTime<Utc>,
}

/// How a lookup was served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Found in the cache
    Hit,
    /// Computed by this caller
    Miss,
    /// Another caller was computing the same key; its outcome was shared
    Coalesced,
}

/// Counters reported by [`ResultCache::stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub coalesced: u64,
    pub evictions: u64,
    pub len: usize,
    pub capacity: usize,
}

/// LRU result cache with single-flight misses
///
/// Safe to share between threads behind an `Arc`. The LRU mutex is held only
/// for lookups and inserts, never while a result is computed.
pub struct ResultCache {
    entries: Mutex<LruCache<CacheKey, CacheEntry>>,
    in_flight: DashMap<CacheKey, Arc<OnceLock<CellOutcome>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    evictions: AtomicU64,
}

impl fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("stats", &self.stats())
            .finish()
    }
}

impl ResultCache {
    /// Create a cache holding at most `capacity` results
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            in_flight: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    fn entries(&self) -> MutexGuard<'_, LruCache<CacheKey, CacheEntry>> {
        // A panic while holding the lock cannot leave the LRU half-updated
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lookup(&self, key: &CacheKey) -> Option<CellOutcome> {
        self.entries().get(key).map(|entry| entry.outcome.clone())
    }

    /// Cached outcome for `key`, if present
    pub fn get(&self, key: &CacheKey) -> Option<CellOutcome> {
        let found = self.lookup(key);
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// When the entry for `key` was stored (does not refresh its recency)
    pub fn stored_at(&self, key: &CacheKey) -> Option<DateTime<Utc>> {
        self.entries().peek(key).map(|entry| entry.stored_at)
    }

    /// Return the cached outcome for `key`, computing it at most once
    pub fn get_or_compute<F>(&self, key: CacheKey, compute: F) -> (CellOutcome, CacheStatus)
    where
        F: FnOnce() -> CellOutcome,
    {
        if let Some(outcome) = self.lookup(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(%key, "cache hit");
            return (outcome, CacheStatus::Hit);
        }

        let slot = self
            .in_flight
            .entry(key)
            .or_insert_with(|| Arc::new(OnceLock::new()))
            .clone();

        let mut status = CacheStatus::Coalesced;
        let outcome = slot
            .get_or_init(|| {
                // Another flight may have finished between the lookup and here
                if let Some(outcome) = self.lookup(&key) {
                    status = CacheStatus::Hit;
                    return outcome;
                }
                status = CacheStatus::Miss;
                compute()
            })
            .clone();

        match status {
            CacheStatus::Miss => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                self.insert(key, outcome.clone());
                trace!(%key, "cache miss");
            }
            CacheStatus::Hit => {
                self.hits.fetch_add(1, Ordering::Relaxed);
            }
            CacheStatus::Coalesced => {
                self.coalesced.fetch_add(1, Ordering::Relaxed);
                trace!(%key, "joined in-flight computation");
            }
        }

        if status != CacheStatus::Coalesced {
            self.in_flight
                .remove_if(&key, |_, current| Arc::ptr_eq(current, &slot));
        }

        (outcome, status)
    }

    fn insert(&self, key: CacheKey, outcome: CellOutcome) {
        let entry = CacheEntry {
            outcome,
            stored_at: Utc::now(),
        };
        if let Some((old_key, _)) = self.entries().push(key, entry) {
            if old_key != key {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Drop every stored result (counters are kept)
    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            len: entries.len(),
            capacity: entries.cap().get(),
        }
    }
}
