/*
 * Copyright 2025 Vijaykumar Singh
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Per-episode existence set
//!
//! Two tiers: an immutable read snapshot that readers clone out of a short
//! read lock, and a dirty overlay behind a mutex that absorbs new keys. Once
//! the misses against the snapshot reach the overlay size, the overlay becomes
//! the new snapshot. Lookups of keys seen early in the episode (the common
//! case when replicas answer with the same ids) stay off the mutex.

use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Default)]
struct ReadOnly {
    keys: HashSet<String>,
    /// The dirty overlay holds keys missing from `keys`.
    amended: bool,
}

#[derive(Default)]
struct Dirty {
    keys: Option<HashSet<String>>,
    misses: usize,
}

#[derive(Default)]
pub struct CheckList {
    read: RwLock<Arc<ReadOnly>>,
    dirty: Mutex<Dirty>,
}

impl CheckList {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Arc<ReadOnly> {
        self.read.read().clone()
    }

    /// True iff `key` was previously marked with [`CheckList::check`].
    pub fn exists(&self, key: &str) -> bool {
        let read = self.snapshot();
        if read.keys.contains(key) {
            return true;
        }
        if !read.amended {
            return false;
        }

        let mut dirty = self.dirty.lock();
        // the snapshot may have been promoted while we waited for the lock
        let read = self.snapshot();
        if read.keys.contains(key) {
            return true;
        }
        let found = dirty
            .keys
            .as_ref()
            .map(|keys| keys.contains(key))
            .unwrap_or(false);
        self.miss_locked(&mut dirty);
        found
    }

    /// Mark `key` present. Idempotent.
    pub fn check(&self, key: &str) {
        if self.snapshot().keys.contains(key) {
            return;
        }

        let mut dirty = self.dirty.lock();
        let read = self.snapshot();
        if read.keys.contains(key) {
            return;
        }
        if dirty.keys.is_none() {
            dirty.keys = Some(read.keys.clone());
            *self.read.write() = Arc::new(ReadOnly {
                keys: read.keys.clone(),
                amended: true,
            });
        }
        if let Some(keys) = dirty.keys.as_mut() {
            keys.insert(key.to_string());
        }
    }

    pub fn len(&self) -> usize {
        let read = self.snapshot();
        if !read.amended {
            return read.keys.len();
        }
        let dirty = self.dirty.lock();
        dirty
            .keys
            .as_ref()
            .map(HashSet::len)
            .unwrap_or_else(|| self.snapshot().keys.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn miss_locked(&self, dirty: &mut Dirty) {
        dirty.misses += 1;
        let size = dirty.keys.as_ref().map(HashSet::len).unwrap_or(0);
        if dirty.misses < size {
            return;
        }
        if let Some(keys) = dirty.keys.take() {
            *self.read.write() = Arc::new(ReadOnly {
                keys,
                amended: false,
            });
        }
        dirty.misses = 0;
    }
}
