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

//! Broadcast search aggregation
//!
//! One search episode sends the same request to every shard connection and
//! merges the partial answers into a single top-K list:
//!
//! 1. A spawned broadcast runs the per-shard call on every connection. Each
//!    shard task forwards only records that are below the shared distance
//!    ceiling and not yet seen in the episode's [`CheckList`].
//! 2. The consumer loop owns the [`RankedBuffer`]. It waits on cancellation,
//!    the episode deadline, shard errors, new records and broadcast completion,
//!    and publishes the tightened ceiling back to the shard tasks.
//! 3. When the broadcast finishes the channels are drained and the buffer is
//!    returned.
//!
//! The check list is a pruning aid only; the consumer keeps its own id set so
//! each object id is merged exactly once even when two shard tasks race past
//! the check list with the same id.

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::config::{FailurePolicy, SearchDefaults};
use crate::core::error::{GatewayError, Result};
use crate::net::{ConnectionPool, Connector};
use crate::proto::payload::{ObjectDistance, SearchConfig, SearchResponse};
use crate::search::check_list::CheckList;
use crate::search::ranked::RankedBuffer;

/// A shard call that failed during a best-effort episode
#[derive(Debug, Clone)]
pub struct ShardFailure {
    pub addr: String,
    pub error: GatewayError,
}

/// Outcome of one search episode
#[derive(Debug, Clone, Default)]
pub struct Aggregated {
    /// Ascending by distance, at most `num` entries (all when `num == 0`).
    pub results: Vec<ObjectDistance>,
    /// Always empty under [`FailurePolicy::FailFast`].
    pub shard_errors: Vec<ShardFailure>,
}

/// Distance ceiling shared between the consumer and the shard tasks.
/// Stored as `f32` bits; it only ever decreases within an episode.
#[derive(Clone)]
struct Ceiling(Arc<AtomicU32>);

impl Ceiling {
    fn new() -> Self {
        Self(Arc::new(AtomicU32::new(f32::INFINITY.to_bits())))
    }

    fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Acquire))
    }

    fn tighten(&self, distance: f32) {
        self.0.store(distance.to_bits(), Ordering::Release);
    }
}

pub struct Aggregator<K: Connector> {
    pool: ConnectionPool<K>,
    default_timeout: Duration,
    policy: FailurePolicy,
}

impl<K: Connector> Clone for Aggregator<K> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            default_timeout: self.default_timeout,
            policy: self.policy,
        }
    }
}

impl<K: Connector> Aggregator<K> {
    pub fn new(pool: ConnectionPool<K>, defaults: &SearchDefaults) -> Self {
        Self {
            pool,
            default_timeout: defaults.timeout(),
            policy: defaults.failure_policy,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn pool(&self) -> &ConnectionPool<K> {
        &self.pool
    }

    fn episode_timeout(&self, config: &SearchConfig) -> Duration {
        if config.timeout_ms > 0 {
            Duration::from_millis(config.timeout_ms)
        } else {
            self.default_timeout
        }
    }

    /// Run one search episode. `call` performs the per-shard RPC.
    pub async fn search<F, Fut>(
        &self,
        cancel: &CancellationToken,
        config: &SearchConfig,
        call: F,
    ) -> Result<Aggregated>
    where
        F: Fn(String, K::Conn) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<SearchResponse>> + Send + 'static,
    {
        let limit = config.num as usize;
        let timeout = self.episode_timeout(config);

        let episode = cancel.child_token();
        // shard calls still in flight are abandoned when the episode returns
        let _abandon = episode.clone().drop_guard();

        let (dist_tx, mut dist_rx) = mpsc::unbounded_channel::<ObjectDistance>();
        let (err_tx, mut err_rx) = mpsc::unbounded_channel::<ShardFailure>();
        let ceiling = Ceiling::new();
        let seen = Arc::new(CheckList::new());

        let shard_call = {
            let ceiling = ceiling.clone();
            move |addr: String, conn: K::Conn| {
                let call = call.clone();
                let dist_tx = dist_tx.clone();
                let err_tx = err_tx.clone();
                let ceiling = ceiling.clone();
                let seen = seen.clone();
                async move {
                    match call(addr.clone(), conn).await {
                        Ok(response) => {
                            for record in response.results {
                                if record.distance >= ceiling.get() || seen.exists(&record.id) {
                                    continue;
                                }
                                seen.check(&record.id);
                                if dist_tx.send(record).is_err() {
                                    break;
                                }
                            }
                        }
                        Err(error) => {
                            let _ = err_tx.send(ShardFailure { addr, error });
                        }
                    }
                    Ok::<(), GatewayError>(())
                }
            }
        };

        let pool = self.pool.clone();
        let broadcast_cancel = episode.clone();
        let mut broadcast = tokio::spawn(async move {
            pool.broadcast_settled(&broadcast_cancel, shard_call).await
        });

        let mut buffer = RankedBuffer::new(limit, self.pool.len());
        let mut merged = HashSet::new();
        let mut shard_errors = Vec::new();
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("search episode {} canceled", config.request_id);
                    return Err(GatewayError::Canceled);
                }
                _ = &mut deadline => {
                    warn!("search episode {} exceeded {:?}", config.request_id, timeout);
                    return Err(GatewayError::DeadlineExceeded(timeout.as_millis() as u64));
                }
                Some(failure) = err_rx.recv() => {
                    self.on_shard_failure(failure, &mut shard_errors)?;
                }
                Some(record) = dist_rx.recv() => {
                    merge(&mut buffer, &mut merged, &ceiling, record);
                }
                joined = &mut broadcast => {
                    let settled = joined.map_err(|e| {
                        GatewayError::Internal(format!("search broadcast task failed: {}", e))
                    })??;
                    while let Ok(failure) = err_rx.try_recv() {
                        self.on_shard_failure(failure, &mut shard_errors)?;
                    }
                    for (addr, outcome) in settled {
                        if let Err(error) = outcome {
                            self.on_shard_failure(ShardFailure { addr, error }, &mut shard_errors)?;
                        }
                    }
                    while let Ok(record) = dist_rx.try_recv() {
                        merge(&mut buffer, &mut merged, &ceiling, record);
                    }
                    break;
                }
                else => break,
            }
        }

        debug!(
            "search episode {} merged {} results ({} shard errors)",
            config.request_id,
            buffer.len(),
            shard_errors.len()
        );
        Ok(Aggregated {
            results: buffer.into_results(),
            shard_errors,
        })
    }

    fn on_shard_failure(
        &self,
        failure: ShardFailure,
        collected: &mut Vec<ShardFailure>,
    ) -> Result<()> {
        match self.policy {
            FailurePolicy::FailFast => Err(failure
                .error
                .context(format!("search on shard {} failed", failure.addr))),
            FailurePolicy::BestEffort => {
                warn!("shard {} failed, continuing: {}", failure.addr, failure.error);
                collected.push(failure);
                Ok(())
            }
        }
    }
}

fn merge(
    buffer: &mut RankedBuffer,
    merged: &mut HashSet<String>,
    ceiling: &Ceiling,
    record: ObjectDistance,
) {
    if !merged.insert(record.id.clone()) {
        return;
    }
    if buffer.admit(record) {
        if let Some(max) = buffer.ceiling() {
            ceiling.tighten(max);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    #[derive(Clone)]
    struct Shard {
        results: Vec<ObjectDistance>,
        fail: bool,
        delay: Duration,
    }

    struct ShardConnector {
        shards: HashMap<String, Shard>,
    }

    #[async_trait]
    impl Connector for ShardConnector {
        type Conn = Shard;

        async fn connect(&self, addr: &str) -> Result<Shard> {
            self.shards
                .get(addr)
                .cloned()
                .ok_or_else(|| GatewayError::connection(addr, "unknown shard"))
        }
    }

    fn od(id: &str, distance: f32) -> ObjectDistance {
        ObjectDistance {
            id: id.to_string(),
            distance,
        }
    }

    fn shard(results: Vec<ObjectDistance>) -> Shard {
        Shard {
            results,
            fail: false,
            delay: Duration::ZERO,
        }
    }

    async fn aggregator(shards: Vec<(&str, Shard)>) -> Aggregator<ShardConnector> {
        let connector = ShardConnector {
            shards: shards
                .into_iter()
                .map(|(addr, s)| (addr.to_string(), s))
                .collect(),
        };
        let addrs: Vec<String> = connector.shards.keys().cloned().collect();
        let pool = ConnectionPool::new(connector);
        for addr in addrs {
            pool.connect(&addr).await.unwrap();
        }
        Aggregator::new(pool, &SearchDefaults::default())
    }

    async fn call_shard(addr: String, shard: Shard) -> Result<SearchResponse> {
        tokio::time::sleep(shard.delay).await;
        if shard.fail {
            return Err(GatewayError::rpc(addr, tonic::Status::internal("index corrupted")));
        }
        Ok(SearchResponse {
            request_id: String::new(),
            results: shard.results,
        })
    }

    fn config(num: u32) -> SearchConfig {
        SearchConfig {
            request_id: "req-1".into(),
            num,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_replica_duplicate_counted_once() {
        let agg = aggregator(vec![
            ("a:1", shard(vec![od("a0", 0.9), od("x", 0.5)])),
            ("b:2", shard(vec![od("b0", 0.3)])),
            ("c:3", shard(vec![od("x", 0.5)])),
        ])
        .await;
        let out = agg
            .search(&CancellationToken::new(), &config(2), call_shard)
            .await
            .unwrap();
        let got: Vec<(String, f32)> = out.results.into_iter().map(|d| (d.id, d.distance)).collect();
        assert_eq!(got, vec![("b0".to_string(), 0.3), ("x".to_string(), 0.5)]);
    }

    #[tokio::test]
    async fn test_unlimited_keeps_everything() {
        let agg = aggregator(vec![
            ("a:1", shard(vec![od("a0", 0.2), od("a1", 0.8)])),
            ("b:2", shard(vec![od("b0", 0.1), od("b1", 0.5), od("b2", 0.9)])),
            ("c:3", shard(vec![od("c0", 0.4)])),
        ])
        .await;
        let out = agg
            .search(&CancellationToken::new(), &config(0), call_shard)
            .await
            .unwrap();
        let distances: Vec<f32> = out.results.iter().map(|d| d.distance).collect();
        assert_eq!(distances, vec![0.1, 0.2, 0.4, 0.5, 0.8, 0.9]);
    }

    #[tokio::test]
    async fn test_fail_fast() {
        let mut broken = shard(vec![]);
        broken.fail = true;
        let agg = aggregator(vec![("a:1", shard(vec![od("a0", 0.1)])), ("b:2", broken)]).await;
        let err = agg
            .search(&CancellationToken::new(), &config(10), call_shard)
            .await
            .unwrap_err();
        assert_eq!(err.code(), tonic::Code::Internal);
        assert!(err.to_string().contains("b:2"));
    }

    #[tokio::test]
    async fn test_best_effort_returns_partial_results() {
        let mut broken = shard(vec![]);
        broken.fail = true;
        let agg = aggregator(vec![("a:1", shard(vec![od("a0", 0.1)])), ("b:2", broken)])
            .await
            .with_policy(FailurePolicy::BestEffort);
        let out = agg
            .search(&CancellationToken::new(), &config(10), call_shard)
            .await
            .unwrap();
        assert_eq!(out.results.len(), 1);
        assert_eq!(out.shard_errors.len(), 1);
        assert_eq!(out.shard_errors[0].addr, "b:2");
    }

    #[tokio::test]
    async fn test_empty_pool_is_target_not_found() {
        let agg = aggregator(vec![]).await;
        let err = agg
            .search(&CancellationToken::new(), &config(1), call_shard)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::TargetNotFound(_)));
    }

    #[tokio::test]
    async fn test_cancellation_is_prompt() {
        let mut slow = shard(vec![od("s", 0.1)]);
        slow.delay = Duration::from_secs(30);
        let agg = aggregator(vec![("a:1", slow)]).await;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = agg.search(&cancel, &config(1), call_shard).await.unwrap_err();
        assert!(matches!(err, GatewayError::Canceled));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_episode_deadline() {
        let mut slow = shard(vec![od("s", 0.1)]);
        slow.delay = Duration::from_secs(30);
        let agg = aggregator(vec![("a:1", slow)]).await;
        let mut cfg = config(1);
        cfg.timeout_ms = 30;
        let err = agg
            .search(&CancellationToken::new(), &cfg, call_shard)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::DeadlineExceeded(30)));
    }
}
