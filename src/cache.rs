//! Content-keyed memoization of pipeline results.
//!
//! Keys combine an xxHash64 fingerprint of the loaded dataset with the
//! filter selection, display mode and grouping column. The cache is owned by
//! a single dashboard session and only invalidated explicitly.

use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};

use log::debug;
use polars::prelude::*;
use xxhash_rust::xxh64::Xxh64;

use crate::axis::DisplayMode;
use crate::error::Result;
use crate::filter::FilterContext;
use crate::frame;

const SEED: u64 = 0;

/// xxHash64 of any hashable value.
pub fn fingerprint<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = Xxh64::new(SEED);
    value.hash(&mut hasher);
    hasher.finish()
}

/// xxHash64 over column names, dtypes and rendered cell values.
pub fn frame_fingerprint(df: &DataFrame) -> Result<u64> {
    let mut hasher = Xxh64::new(SEED);
    df.height().hash(&mut hasher);
    for column in df.get_columns() {
        column.name().as_str().hash(&mut hasher);
        column.dtype().to_string().hash(&mut hasher);
        for value in frame::rendered_values(df, column.name().as_str())? {
            value.hash(&mut hasher);
        }
    }
    Ok(hasher.finish())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub dataset: u64,
    pub selection: u64,
    pub mode: DisplayMode,
    pub group_by: Option<String>,
}

impl CacheKey {
    pub fn new(dataset: u64, ctx: &FilterContext, mode: DisplayMode, group_by: Option<&str>) -> Self {
        Self {
            dataset,
            selection: fingerprint(ctx),
            mode,
            group_by: group_by.map(str::to_string),
        }
    }
}

/// Bounded cache evicting the oldest insertion first.
#[derive(Debug)]
pub struct MemoCache<V> {
    capacity: usize,
    entries: HashMap<CacheKey, V>,
    order: VecDeque<CacheKey>,
    hits: u64,
    misses: u64,
}

impl<V: Clone> MemoCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<V> {
        match self.entries.get(key) {
            Some(value) => {
                self.hits += 1;
                debug!("Cache hit for '{}' (group by {:?})", key.mode, key.group_by);
                Some(value.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: CacheKey, value: V) {
        if self.entries.insert(key.clone(), value).is_none() {
            self.order.push_back(key);
        }
        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            debug!("Cache evicted oldest entry for '{}'", oldest.mode);
        }
    }

    pub fn get_or_try_insert_with<F>(&mut self, key: CacheKey, compute: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn invalidate_all(&mut self) {
        if !self.entries.is_empty() {
            debug!("Cache cleared ({} entries)", self.entries.len());
        }
        self.entries.clear();
        self.order.clear();
    }

    /// Drop every entry computed for a mode other than `mode`.
    pub fn retain_mode(&mut self, mode: DisplayMode) {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.mode == mode);
        self.order.retain(|key| key.mode == mode);
        if before != self.entries.len() {
            debug!(
                "Cache evicted {} entries for modes other than '{mode}'",
                before - self.entries.len()
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
