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

//! Backing store behind the filter gateway
//!
//! [`VectorBackend`] is the seam between request orchestration and the shard
//! fleet. [`ShardBackend`] implements it directly over the agent pool: search
//! requests become aggregation episodes, writes fan out to `replica` shards
//! chosen round robin, and point lookups broadcast until one shard answers.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::AgentRpc;
use crate::core::config::GatewayConfig;
use crate::core::error::{GatewayError, Result};
use crate::net::{ConnectionPool, Connector};
use crate::proto::payload::{
    ObjectDistance, ObjectId, ObjectLocation, ObjectVector, RemoveRequest, SearchConfig,
    SearchIdRequest, SearchRequest, SearchResponse, WriteRequest,
};
use crate::search::aggregator::Aggregator;

#[async_trait]
pub trait VectorBackend: Send + Sync {
    async fn search(&self, cancel: &CancellationToken, req: SearchRequest) -> Result<SearchResponse>;

    async fn search_by_id(
        &self,
        cancel: &CancellationToken,
        req: SearchIdRequest,
    ) -> Result<SearchResponse>;

    async fn linear_search(
        &self,
        cancel: &CancellationToken,
        req: SearchRequest,
    ) -> Result<SearchResponse>;

    async fn linear_search_by_id(
        &self,
        cancel: &CancellationToken,
        req: SearchIdRequest,
    ) -> Result<SearchResponse>;

    async fn insert(&self, cancel: &CancellationToken, req: WriteRequest) -> Result<ObjectLocation>;

    async fn update(&self, cancel: &CancellationToken, req: WriteRequest) -> Result<ObjectLocation>;

    async fn upsert(&self, cancel: &CancellationToken, req: WriteRequest) -> Result<ObjectLocation>;

    async fn remove(&self, cancel: &CancellationToken, req: RemoveRequest) -> Result<ObjectLocation>;

    async fn get_object(&self, cancel: &CancellationToken, id: ObjectId) -> Result<ObjectVector>;

    /// Returns the id when some shard holds it, `NotFound` otherwise.
    async fn exists(&self, cancel: &CancellationToken, id: ObjectId) -> Result<ObjectId>;
}

/// Which write an agent should perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Insert,
    Update,
    Upsert,
}

impl WriteOp {
    pub fn name(&self) -> &'static str {
        match self {
            WriteOp::Insert => "Insert",
            WriteOp::Update => "Update",
            WriteOp::Upsert => "Upsert",
        }
    }
}

#[derive(Clone, Copy)]
enum SearchOp {
    Ann,
    Linear,
}

/// [`VectorBackend`] over a pool of agent connections
pub struct ShardBackend<K: Connector> {
    aggregator: Aggregator<K>,
    replica: usize,
}

impl<K> ShardBackend<K>
where
    K: Connector,
    K::Conn: AgentRpc,
{
    /// Backend over whatever `pool` already holds.
    pub fn new(pool: ConnectionPool<K>, config: &GatewayConfig) -> Self {
        Self {
            aggregator: Aggregator::new(pool, &config.search),
            replica: config.replica.max(1),
        }
    }

    /// Dial every `pool.agent_addrs` entry and keep the connections healthy
    /// until `shutdown` fires. Fails only when no agent could be reached.
    pub async fn connect(
        pool: ConnectionPool<K>,
        config: &GatewayConfig,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let mut failures = Vec::new();
        for addr in &config.pool.agent_addrs {
            if let Err(err) = pool.connect(addr).await {
                warn!("initial dial to agent {} failed: {}", addr, err);
                failures.push(err);
            }
        }
        if pool.is_empty() {
            let cause = GatewayError::join(failures)
                .unwrap_or_else(|| GatewayError::TargetNotFound("no agent addresses configured".into()));
            return Err(cause.wrap(tonic::Code::Unavailable, "no agent reachable"));
        }
        info!(
            "connected to {} of {} agents",
            pool.len(),
            config.pool.agent_addrs.len()
        );
        pool.start_health_monitor(config.pool.health_check_interval(), shutdown);
        Ok(Self::new(pool, config))
    }

    pub fn from_aggregator(aggregator: Aggregator<K>, replica: usize) -> Self {
        Self {
            aggregator,
            replica: replica.max(1),
        }
    }

    pub fn pool(&self) -> &ConnectionPool<K> {
        self.aggregator.pool()
    }

    async fn search_vector(
        &self,
        cancel: &CancellationToken,
        req: SearchRequest,
        op: SearchOp,
    ) -> Result<SearchResponse> {
        let config = req.config.clone().unwrap_or_default();
        let aggregated = self
            .aggregator
            .search(cancel, &config, move |addr, conn: K::Conn| {
                let req = req.clone();
                async move {
                    let response = match op {
                        SearchOp::Ann => conn.search(req).await,
                        SearchOp::Linear => conn.linear_search(req).await,
                    };
                    response.map_err(|status| GatewayError::rpc(addr, status))
                }
            })
            .await?;
        Ok(respond(config, aggregated.results))
    }

    async fn search_id(
        &self,
        cancel: &CancellationToken,
        req: SearchIdRequest,
        op: SearchOp,
    ) -> Result<SearchResponse> {
        let config = req.config.clone().unwrap_or_default();
        let aggregated = self
            .aggregator
            .search(cancel, &config, move |addr, conn: K::Conn| {
                let req = req.clone();
                async move {
                    let response = match op {
                        SearchOp::Ann => conn.search_by_id(req).await,
                        SearchOp::Linear => conn.linear_search_by_id(req).await,
                    };
                    response.map_err(|status| GatewayError::rpc(addr, status))
                }
            })
            .await?;
        Ok(respond(config, aggregated.results))
    }

    async fn write(
        &self,
        cancel: &CancellationToken,
        req: WriteRequest,
        op: WriteOp,
    ) -> Result<ObjectLocation> {
        let id = req
            .vector
            .as_ref()
            .map(|v| v.id.clone())
            .unwrap_or_default();
        let targets = self.pool().next_addrs(self.replica);
        let written = self
            .pool()
            .fan_out(cancel, targets, move |addr, conn: K::Conn| {
                let req = req.clone();
                async move {
                    let location = match op {
                        WriteOp::Insert => conn.insert(req).await,
                        WriteOp::Update => conn.update(req).await,
                        WriteOp::Upsert => conn.upsert(req).await,
                    };
                    location
                        .map(|_| ())
                        .map_err(|status| GatewayError::rpc(addr, status))
                }
            })
            .await?;
        info!("{} of {} written to {:?}", op.name(), id, written);
        Ok(ObjectLocation {
            name: id.clone(),
            uuid: id,
            ips: written,
        })
    }

    /// Broadcast a point lookup; the first shard that answers wins and the
    /// remaining calls are abandoned.
    async fn first_hit<T, F, Fut>(&self, cancel: &CancellationToken, id: &str, call: F) -> Result<T>
    where
        T: Send + 'static,
        F: Fn(String, K::Conn) -> Fut + Clone + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<T>> + Send + 'static,
    {
        let lookup = cancel.child_token();
        let hit: Arc<Mutex<Option<T>>> = Arc::new(Mutex::new(None));

        let found = hit.clone();
        let done = lookup.clone();
        let outcome = self
            .pool()
            .broadcast(&lookup, move |addr, conn| {
                let call = call.clone();
                let found = found.clone();
                let done = done.clone();
                async move {
                    let value = call(addr, conn).await?;
                    let mut slot = found.lock();
                    if slot.is_none() {
                        *slot = Some(value);
                    }
                    done.cancel();
                    Ok::<(), GatewayError>(())
                }
            })
            .await;

        if let Some(value) = hit.lock().take() {
            return Ok(value);
        }
        if cancel.is_cancelled() {
            return Err(GatewayError::Canceled);
        }
        match outcome {
            Err(err) if !err.is_not_found() => Err(err),
            _ => Err(GatewayError::NotFound(id.to_string())),
        }
    }
}

fn respond(config: SearchConfig, results: Vec<ObjectDistance>) -> SearchResponse {
    SearchResponse {
        request_id: config.request_id,
        results,
    }
}

#[async_trait]
impl<K> VectorBackend for ShardBackend<K>
where
    K: Connector,
    K::Conn: AgentRpc,
{
    async fn search(&self, cancel: &CancellationToken, req: SearchRequest) -> Result<SearchResponse> {
        self.search_vector(cancel, req, SearchOp::Ann).await
    }

    async fn search_by_id(
        &self,
        cancel: &CancellationToken,
        req: SearchIdRequest,
    ) -> Result<SearchResponse> {
        self.search_id(cancel, req, SearchOp::Ann).await
    }

    async fn linear_search(
        &self,
        cancel: &CancellationToken,
        req: SearchRequest,
    ) -> Result<SearchResponse> {
        self.search_vector(cancel, req, SearchOp::Linear).await
    }

    async fn linear_search_by_id(
        &self,
        cancel: &CancellationToken,
        req: SearchIdRequest,
    ) -> Result<SearchResponse> {
        self.search_id(cancel, req, SearchOp::Linear).await
    }

    async fn insert(&self, cancel: &CancellationToken, req: WriteRequest) -> Result<ObjectLocation> {
        self.write(cancel, req, WriteOp::Insert).await
    }

    async fn update(&self, cancel: &CancellationToken, req: WriteRequest) -> Result<ObjectLocation> {
        self.write(cancel, req, WriteOp::Update).await
    }

    async fn upsert(&self, cancel: &CancellationToken, req: WriteRequest) -> Result<ObjectLocation> {
        self.write(cancel, req, WriteOp::Upsert).await
    }

    async fn remove(&self, cancel: &CancellationToken, req: RemoveRequest) -> Result<ObjectLocation> {
        let id = req.id.as_ref().map(|i| i.id.clone()).unwrap_or_default();
        let removed: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let hits = removed.clone();
        self.pool()
            .broadcast(cancel, move |addr, conn: K::Conn| {
                let req = req.clone();
                let hits = hits.clone();
                async move {
                    match conn.remove(req).await {
                        Ok(_) => {
                            hits.lock().push(addr);
                            Ok(())
                        }
                        // shards without a replica of the id report NotFound
                        Err(status) if status.code() == tonic::Code::NotFound => Ok(()),
                        Err(status) => Err(GatewayError::rpc(addr, status)),
                    }
                }
            })
            .await?;

        let mut ips = std::mem::take(&mut *removed.lock());
        if ips.is_empty() {
            return Err(GatewayError::NotFound(id));
        }
        ips.sort();
        debug!("removed {} from {:?}", id, ips);
        Ok(ObjectLocation {
            name: id.clone(),
            uuid: id,
            ips,
        })
    }

    async fn get_object(&self, cancel: &CancellationToken, id: ObjectId) -> Result<ObjectVector> {
        let key = id.id.clone();
        self.first_hit(cancel, &key, move |addr, conn: K::Conn| {
            let id = id.clone();
            async move {
                conn.get_object(id)
                    .await
                    .map_err(|status| GatewayError::rpc(addr, status))
            }
        })
        .await
    }

    async fn exists(&self, cancel: &CancellationToken, id: ObjectId) -> Result<ObjectId> {
        let key = id.id.clone();
        self.first_hit(cancel, &key, move |addr, conn: K::Conn| {
            let id = id.clone();
            async move {
                let found = conn
                    .exists(id)
                    .await
                    .map_err(|status| GatewayError::rpc(addr.clone(), status))?;
                if found.id.is_empty() {
                    return Err(GatewayError::NotFound(format!("not on {}", addr)));
                }
                Ok(found)
            }
        })
        .await
    }
}
