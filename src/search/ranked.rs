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

//! Bounded ascending buffer of search results

use crate::proto::payload::ObjectDistance;

/// Preallocation cap so a huge `num × shards` product does not reserve memory
/// the episode will never use.
const MAX_PREALLOCATED: usize = 4096;

/// Results sorted ascending by distance, holding at most `limit` entries.
/// A limit of zero keeps every admitted result.
#[derive(Debug, Clone)]
pub struct RankedBuffer {
    items: Vec<ObjectDistance>,
    limit: usize,
}

impl RankedBuffer {
    pub fn new(limit: usize, shard_count: usize) -> Self {
        let slack = limit.max(1).saturating_mul(shard_count.max(1));
        Self {
            items: Vec::with_capacity(slack.min(MAX_PREALLOCATED)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.limit > 0 && self.items.len() >= self.limit
    }

    /// Largest retained distance once the buffer is full. Candidates at or
    /// above it can never be admitted again during this episode.
    pub fn ceiling(&self) -> Option<f32> {
        if self.is_full() {
            self.items.last().map(|d| d.distance)
        } else {
            None
        }
    }

    /// Insert `candidate` at its sorted position. Equal distances keep arrival
    /// order. Returns false when the candidate was rejected.
    pub fn admit(&mut self, candidate: ObjectDistance) -> bool {
        if candidate.distance.is_nan() {
            return false;
        }
        if let Some(ceiling) = self.ceiling() {
            if candidate.distance >= ceiling {
                return false;
            }
        }

        // results arrive loosely increasing per shard, so the tail is the common slot
        let pos = match self.items.last() {
            Some(last) if last.distance <= candidate.distance => self.items.len(),
            _ => self
                .items
                .partition_point(|d| d.distance <= candidate.distance),
        };
        self.items.insert(pos, candidate);
        if self.limit > 0 && self.items.len() > self.limit {
            self.items.truncate(self.limit);
        }
        true
    }

    pub fn as_slice(&self) -> &[ObjectDistance] {
        &self.items
    }

    pub fn into_results(self) -> Vec<ObjectDistance> {
        self.items
    }
}
