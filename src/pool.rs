// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use crate::types::MemoryMapError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Pool behavior knobs.
///
/// Availability is decided by an external signal (typically a hardware fence
/// the pool cannot observe in-process), so the wait is a poll loop rather
/// than a condition variable. `max_wait = None` blocks until an entry frees
/// up, however long that takes.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of entries ever allocated; `None` is unbounded.
    pub max_size: Option<usize>,
    pub poll_interval: Duration,
    pub max_wait: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: None,
            poll_interval: Duration::from_millis(1),
            max_wait: None,
        }
    }
}

/// Recycles domain-specific allocations under concurrent producer/consumer
/// access. Entries are created on demand by the factory and never destroyed
/// while the availability predicate reports them in use.
pub struct Pool<T> {
    entries: Mutex<Vec<Arc<T>>>,
    factory: Box<dyn Fn() -> T + Send + Sync>,
    available: Box<dyn Fn(&Arc<T>) -> bool + Send + Sync>,
    config: PoolConfig,
}

impl<T> Pool<T> {
    pub fn new(
        factory: impl Fn() -> T + Send + Sync + 'static,
        available: impl Fn(&Arc<T>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::with_config(factory, available, PoolConfig::default())
    }

    pub fn with_config(
        factory: impl Fn() -> T + Send + Sync + 'static,
        available: impl Fn(&Arc<T>) -> bool + Send + Sync + 'static,
        config: PoolConfig,
    ) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            factory: Box::new(factory),
            available: Box::new(available),
            config,
        }
    }

    /// Returns an available entry, allocating a new one while below the size
    /// bound. At the bound, blocks polling until an entry becomes available
    /// or `max_wait` (when configured) expires.
    pub fn get_or_create(&self) -> Result<Arc<T>, MemoryMapError> {
        let deadline = self.config.max_wait.map(|d| Instant::now() + d);
        loop {
            {
                let mut entries = self.entries.lock();
                if let Some(entry) = entries.iter().find(|e| (self.available)(e)) {
                    return Ok(entry.clone());
                }
                if self.config.max_size.is_none_or(|max| entries.len() < max) {
                    let entry = Arc::new((self.factory)());
                    entries.push(entry.clone());
                    return Ok(entry);
                }
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(MemoryMapError::PoolWaitTimeout);
            }
            std::thread::sleep(self.config.poll_interval);
        }
    }

    /// Current pool cardinality (in-use and available entries alike).
    pub fn size(&self) -> usize {
        self.entries.lock().len()
    }
}
