//! Response cache keyed on exact question text.
//!
//! Keys are not normalized: "What is ADHD?" and "what is adhd?" are
//! different entries. The cache is unbounded unless built with a capacity,
//! in which case the least recently used answer is evicted first.

use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

enum Store {
    Unbounded(HashMap<String, String>),
    Bounded(LruCache<String, String>),
}

/// Concurrency-safe question → answer map.
pub struct ResponseCache {
    store: Mutex<Store>,
}

impl ResponseCache {
    /// Create an unbounded cache.
    pub fn new() -> Self {
        Self {
            store: Mutex::new(Store::Unbounded(HashMap::new())),
        }
    }

    /// Create an LRU cache holding at most `capacity` answers.
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            store: Mutex::new(Store::Bounded(LruCache::new(capacity))),
        }
    }

    /// Bounded when `capacity` is a non-zero number, unbounded otherwise.
    pub fn from_capacity(capacity: Option<usize>) -> Self {
        match capacity.and_then(NonZeroUsize::new) {
            Some(capacity) => Self::with_capacity(capacity),
            None => Self::new(),
        }
    }

    // Entries are plain strings, so a panic mid-insert cannot leave one torn.
    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stored answer for `question`, if any.
    pub fn get(&self, question: &str) -> Option<String> {
        match &mut *self.lock() {
            Store::Unbounded(map) => map.get(question).cloned(),
            Store::Bounded(lru) => lru.get(question).cloned(),
        }
    }

    /// Store `answer` for `question`, replacing any previous answer.
    pub fn put(&self, question: impl Into<String>, answer: impl Into<String>) {
        let (question, answer) = (question.into(), answer.into());
        match &mut *self.lock() {
            Store::Unbounded(map) => {
                map.insert(question, answer);
            }
            Store::Bounded(lru) => {
                lru.put(question, answer);
            }
        }
    }

    pub fn len(&self) -> usize {
        match &*self.lock() {
            Store::Unbounded(map) => map.len(),
            Store::Bounded(lru) => lru.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries, `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        match &*self.lock() {
            Store::Unbounded(_) => None,
            Store::Bounded(lru) => Some(lru.cap().get()),
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
