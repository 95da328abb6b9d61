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

//! Filter pipeline gateway
//!
//! Request-level orchestration in front of a [`VectorBackend`]:
//!
//! ```text
//! Received -> [ingress filters] -> backend (aggregator | writer) -> [egress filters] -> Responded
//! ```
//!
//! Ingress filters run as an ordered pipeline over the request vector; egress
//! filters run the same pipeline once per search result, and one failing
//! result fails the whole response. The write path validates the vector,
//! optionally probes for an existing object, filters, and delegates. Nothing
//! here retries.
//!
//! Every unary operation also has a Multi form (index-stable batch, errors
//! joined) and a Stream form (one reply per inbound message).

use futures::Stream;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tonic::Code;
use tracing::{debug, span, warn, Instrument, Level};
use uuid::Uuid;

use crate::client::{EgressFilterRpc, IngressFilterRpc};
use crate::core::config::{FilterSettings, GatewayConfig};
use crate::core::error::{GatewayError, Result};
use crate::core::types::{filter_addrs, validate_dimension};
use crate::gateway::backend::{VectorBackend, WriteOp};
use crate::gateway::multi::{self, Batch};
use crate::gateway::stream::{self, ResponseStream};
use crate::net::{ConnectionPool, Connector};
use crate::proto::payload::{
    FilterTarget, GetObjectRequest, ObjectBlob, ObjectId, ObjectLocation, ObjectVector,
    RemoveRequest, SearchConfig, SearchIdRequest, SearchObjectRequest, SearchRequest,
    SearchResponse, WriteObjectRequest, WriteRequest,
};

/// Inbound stream of one request type
pub trait Inbound<T>: Stream<Item = std::result::Result<T, tonic::Status>> + Send + Unpin + 'static {}

impl<T, S> Inbound<T> for S where
    S: Stream<Item = std::result::Result<T, tonic::Status>> + Send + Unpin + 'static
{
}

pub struct Gateway<K: Connector> {
    backend: Arc<dyn VectorBackend>,
    filters: ConnectionPool<K>,
    settings: FilterSettings,
    stream_concurrency: usize,
    multi_concurrency: usize,
}

impl<K: Connector> Clone for Gateway<K> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            filters: self.filters.clone(),
            settings: self.settings.clone(),
            stream_concurrency: self.stream_concurrency,
            multi_concurrency: self.multi_concurrency,
        }
    }
}

fn search_label(req: &SearchRequest) -> String {
    req.config
        .as_ref()
        .map(|c| c.request_id.clone())
        .unwrap_or_default()
}

fn search_id_label(req: &SearchIdRequest) -> String {
    format!("id {}", req.id)
}

fn search_object_label(req: &SearchObjectRequest) -> String {
    format!("object of {} bytes", req.object.len())
}

fn write_label(req: &WriteRequest) -> String {
    req.vector
        .as_ref()
        .map(|v| format!("id {}", v.id))
        .unwrap_or_default()
}

fn write_object_label(req: &WriteObjectRequest) -> String {
    req.object
        .as_ref()
        .map(|o| format!("id {}", o.id))
        .unwrap_or_default()
}

fn remove_label(req: &RemoveRequest) -> String {
    req.id
        .as_ref()
        .map(|i| format!("id {}", i.id))
        .unwrap_or_default()
}

/// A probe that errored for any reason other than a miss lets the request
/// through.
fn probe_miss(api: &str, id: &str, err: GatewayError) -> Result<()> {
    if matches!(err.code(), Code::Cancelled | Code::DeadlineExceeded) {
        return Err(err);
    }
    if !err.is_not_found() {
        warn!("{} API existence check for {} failed, continuing: {}", api, id, err);
    }
    Ok(())
}

/// Fill in a request id when the caller sent none.
fn ensure_request_id(config: &mut Option<SearchConfig>) -> SearchConfig {
    let config = config.get_or_insert_with(SearchConfig::default);
    if config.request_id.is_empty() {
        config.request_id = Uuid::new_v4().to_string();
    }
    config.clone()
}

#[derive(Clone, Copy)]
enum SearchKind {
    Ann,
    Linear,
}

impl SearchKind {
    fn api(self, by_id: bool) -> &'static str {
        match (self, by_id) {
            (SearchKind::Ann, false) => "Search",
            (SearchKind::Ann, true) => "SearchByID",
            (SearchKind::Linear, false) => "LinearSearch",
            (SearchKind::Linear, true) => "LinearSearchByID",
        }
    }
}

impl<K> Gateway<K>
where
    K: Connector,
    K::Conn: IngressFilterRpc + EgressFilterRpc,
{
    pub fn new(backend: Arc<dyn VectorBackend>, filters: ConnectionPool<K>, config: &GatewayConfig) -> Self {
        Self {
            backend,
            filters,
            settings: config.filters.clone(),
            stream_concurrency: config.stream_concurrency.max(1),
            multi_concurrency: config.multi_concurrency.max(1),
        }
    }

    pub fn backend(&self) -> &Arc<dyn VectorBackend> {
        &self.backend
    }

    pub fn filter_pool(&self) -> &ConnectionPool<K> {
        &self.filters
    }

    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    // ---- filter plumbing ----

    async fn ingress_chain(
        &self,
        cancel: &CancellationToken,
        addrs: &[String],
        vector: ObjectVector,
    ) -> Result<ObjectVector> {
        self.filters
            .ordered_range(cancel, addrs, vector, |vector, addr, conn: K::Conn| async move {
                IngressFilterRpc::filter_vector(&conn, vector)
                    .await
                    .map_err(|status| GatewayError::rpc(addr, status))
            })
            .instrument(span!(Level::DEBUG, "gateway_ingress_filter"))
            .await
    }

    async fn egress_distances(
        &self,
        cancel: &CancellationToken,
        api: &str,
        config: &SearchConfig,
        mut res: SearchResponse,
    ) -> Result<SearchResponse> {
        let addrs = filter_addrs(&self.settings.distance_filters, config.egress_filters.as_ref());
        if addrs.is_empty() {
            return Ok(res);
        }

        let mut filtered = Vec::with_capacity(res.results.len());
        for distance in std::mem::take(&mut res.results) {
            let id = distance.id.clone();
            let out = self
                .filters
                .ordered_range(cancel, &addrs, distance, |distance, addr, conn: K::Conn| async move {
                    EgressFilterRpc::filter_distance(&conn, distance)
                        .await
                        .map_err(|status| GatewayError::rpc(addr, status))
                })
                .await
                .map_err(|e| {
                    warn!("{} egress filter failed on id {}: {}", api, id, e);
                    e.wrap(
                        Code::Internal,
                        format!(
                            "{} API egress filter request to {:?} failure on id {} request {}",
                            api, addrs, id, config.request_id
                        ),
                    )
                })?;
            filtered.push(out);
        }
        res.results = filtered;
        Ok(res)
    }

    /// Turn a raw object into a vector. The request's own vectorizer wins
    /// over the configured default; with neither the request is invalid.
    async fn vectorize(
        &self,
        cancel: &CancellationToken,
        api: &str,
        target: Option<&FilterTarget>,
        blob: ObjectBlob,
    ) -> Result<ObjectVector> {
        let generate = |addr: String, conn: K::Conn| async move {
            IngressFilterRpc::gen_vector(&conn, blob)
                .await
                .map_err(|status| GatewayError::rpc(addr, status))
        };

        let result = match target {
            Some(target) if target.port == 0 => {
                return Err(GatewayError::InvalidArgument(format!(
                    "{} API vectorizer target {:?} has no port",
                    api, target.host
                )));
            }
            Some(target) => self.filters.do_call(cancel, &target.addr(), generate).await,
            None => match &self.settings.vectorizer {
                Some(addr) => self.filters.do_call(cancel, addr, generate).await,
                None => {
                    return Err(GatewayError::InvalidArgument(format!(
                        "{} API has no vectorizer target",
                        api
                    )));
                }
            },
        };

        result.map_err(|e| {
            let code = if e.is_transport_failure()
                || matches!(e.root(), GatewayError::TargetNotFound(_))
            {
                Code::Unavailable
            } else {
                Code::Internal
            };
            e.wrap(code, format!("{} API vectorizer request failed", api))
        })
    }

    // ---- search path ----

    async fn search_vector(
        &self,
        cancel: &CancellationToken,
        mut req: SearchRequest,
        kind: SearchKind,
    ) -> Result<SearchResponse> {
        let api = kind.api(false);
        let config = ensure_request_id(&mut req.config);

        let mut vector = ObjectVector {
            id: String::new(),
            vector: std::mem::take(&mut req.vector),
        };

        let ingress = filter_addrs(&self.settings.search_filters, config.ingress_filters.as_ref());
        if !ingress.is_empty() {
            vector = self.ingress_chain(cancel, &ingress, vector).await.map_err(|e| {
                e.wrap(
                    Code::Internal,
                    format!(
                        "{} API ingress filter request to {:?} failure on request {}",
                        api, ingress, config.request_id
                    ),
                )
            })?;
        }
        req.vector = vector.vector;

        let searching = match kind {
            SearchKind::Ann => self.backend.search(cancel, req),
            SearchKind::Linear => self.backend.linear_search(cancel, req),
        };
        let res = searching
            .instrument(span!(Level::DEBUG, "gateway_search", api = api))
            .await
            .map_err(|e| e.context(format!("{} API failed for request {}", api, config.request_id)))?;
        debug!("{} request {} returned {} results", api, config.request_id, res.results.len());

        self.egress_distances(cancel, api, &config, res).await
    }

    async fn search_id(
        &self,
        cancel: &CancellationToken,
        mut req: SearchIdRequest,
        kind: SearchKind,
    ) -> Result<SearchResponse> {
        let api = kind.api(true);
        if req.id.is_empty() {
            return Err(GatewayError::InvalidArgument(format!("{} API requires an id", api)));
        }
        let config = ensure_request_id(&mut req.config);
        let id = req.id.clone();

        let searching = match kind {
            SearchKind::Ann => self.backend.search_by_id(cancel, req),
            SearchKind::Linear => self.backend.linear_search_by_id(cancel, req),
        };
        let res = searching
            .instrument(span!(Level::DEBUG, "gateway_search", api = api))
            .await
            .map_err(|e| e.context(format!("{} API failed for id {} request {}", api, id, config.request_id)))?;

        self.egress_distances(cancel, api, &config, res).await
    }

    pub async fn search(&self, cancel: &CancellationToken, req: SearchRequest) -> Result<SearchResponse> {
        self.search_vector(cancel, req, SearchKind::Ann).await
    }

    pub async fn search_by_id(
        &self,
        cancel: &CancellationToken,
        req: SearchIdRequest,
    ) -> Result<SearchResponse> {
        self.search_id(cancel, req, SearchKind::Ann).await
    }

    pub async fn linear_search(
        &self,
        cancel: &CancellationToken,
        req: SearchRequest,
    ) -> Result<SearchResponse> {
        self.search_vector(cancel, req, SearchKind::Linear).await
    }

    pub async fn linear_search_by_id(
        &self,
        cancel: &CancellationToken,
        req: SearchIdRequest,
    ) -> Result<SearchResponse> {
        self.search_id(cancel, req, SearchKind::Linear).await
    }

    pub async fn search_object(
        &self,
        cancel: &CancellationToken,
        req: SearchObjectRequest,
    ) -> Result<SearchResponse> {
        let blob = ObjectBlob {
            id: String::new(),
            object: req.object,
        };
        let vector = self
            .vectorize(cancel, "SearchObject", req.vectorizer.as_ref(), blob)
            .await?;
        self.search(
            cancel,
            SearchRequest {
                vector: vector.vector,
                config: req.config,
            },
        )
        .await
    }

    // ---- write path ----

    /// Existence probe run unless the caller set `skip_strict_exist_check`.
    /// Only a positive answer rejects the write; a failed probe counts as a
    /// miss.
    async fn probe(&self, cancel: &CancellationToken, op: WriteOp, vector: &ObjectVector) -> Result<()> {
        let id = ObjectId {
            id: vector.id.clone(),
        };
        match op {
            WriteOp::Insert => match self.backend.exists(cancel, id).await {
                Ok(found) if !found.id.is_empty() => {
                    Err(GatewayError::AlreadyExists(vector.id.clone()))
                }
                Ok(_) => Ok(()),
                Err(e) => probe_miss(op.name(), &vector.id, e),
            },
            WriteOp::Update | WriteOp::Upsert => match self.backend.get_object(cancel, id).await {
                Ok(stored) if stored.vector == vector.vector => {
                    Err(GatewayError::DuplicateData(vector.id.clone()))
                }
                Ok(_) => Ok(()),
                Err(e) => probe_miss(op.name(), &vector.id, e),
            },
        }
    }

    async fn write(&self, cancel: &CancellationToken, op: WriteOp, req: WriteRequest) -> Result<ObjectLocation> {
        let api = op.name();
        let request_id = Uuid::new_v4();
        let mut vector = req.vector.ok_or_else(|| {
            GatewayError::InvalidArgument(format!("{} API request carries no vector", api))
        })?;
        validate_dimension(&vector)
            .map_err(|e| e.context(format!("{} API invalid vector argument", api)))?;

        let mut config = req.config.unwrap_or_default();
        if !config.skip_strict_exist_check {
            self.probe(cancel, op, &vector)
                .await
                .map_err(|e| e.context(format!("{} API request {} rejected", api, request_id)))?;
            config.skip_strict_exist_check = true;
        }

        let defaults = match op {
            WriteOp::Insert => &self.settings.insert_filters,
            WriteOp::Update => &self.settings.update_filters,
            WriteOp::Upsert => &self.settings.upsert_filters,
        };
        let ingress = filter_addrs(defaults, config.filters.as_ref());
        if !ingress.is_empty() {
            let id = vector.id.clone();
            vector = self.ingress_chain(cancel, &ingress, vector).await.map_err(|e| {
                e.wrap(
                    Code::Internal,
                    format!("{} API ingress filter request to {:?} failure on id {}", api, ingress, id),
                )
            })?;
            // filters may drop the id
            if vector.id.is_empty() {
                vector.id = id;
            }
        }

        let id = vector.id.clone();
        let req = WriteRequest {
            vector: Some(vector),
            config: Some(config),
        };
        let writing = match op {
            WriteOp::Insert => self.backend.insert(cancel, req),
            WriteOp::Update => self.backend.update(cancel, req),
            WriteOp::Upsert => self.backend.upsert(cancel, req),
        };
        writing
            .instrument(span!(Level::DEBUG, "gateway_write", api = api))
            .await
            .map_err(|e| e.context(format!("{} API request {} failed for id {}", api, request_id, id)))
    }

    async fn write_object(
        &self,
        cancel: &CancellationToken,
        op: WriteOp,
        req: WriteObjectRequest,
    ) -> Result<ObjectLocation> {
        let api = op.name();
        let blob = req.object.ok_or_else(|| {
            GatewayError::InvalidArgument(format!("{}Object API request carries no object", api))
        })?;
        let id = blob.id.clone();
        let mut vector = self
            .vectorize(cancel, api, req.vectorizer.as_ref(), blob)
            .await?;
        if vector.id.is_empty() {
            vector.id = id;
        }
        self.write(
            cancel,
            op,
            WriteRequest {
                vector: Some(vector),
                config: req.config,
            },
        )
        .await
    }

    pub async fn insert(&self, cancel: &CancellationToken, req: WriteRequest) -> Result<ObjectLocation> {
        self.write(cancel, WriteOp::Insert, req).await
    }

    pub async fn update(&self, cancel: &CancellationToken, req: WriteRequest) -> Result<ObjectLocation> {
        self.write(cancel, WriteOp::Update, req).await
    }

    pub async fn upsert(&self, cancel: &CancellationToken, req: WriteRequest) -> Result<ObjectLocation> {
        self.write(cancel, WriteOp::Upsert, req).await
    }

    pub async fn insert_object(
        &self,
        cancel: &CancellationToken,
        req: WriteObjectRequest,
    ) -> Result<ObjectLocation> {
        self.write_object(cancel, WriteOp::Insert, req).await
    }

    pub async fn update_object(
        &self,
        cancel: &CancellationToken,
        req: WriteObjectRequest,
    ) -> Result<ObjectLocation> {
        self.write_object(cancel, WriteOp::Update, req).await
    }

    pub async fn upsert_object(
        &self,
        cancel: &CancellationToken,
        req: WriteObjectRequest,
    ) -> Result<ObjectLocation> {
        self.write_object(cancel, WriteOp::Upsert, req).await
    }

    pub async fn remove(&self, cancel: &CancellationToken, mut req: RemoveRequest) -> Result<ObjectLocation> {
        let id = req.id.as_ref().map(|i| i.id.clone()).unwrap_or_default();
        if id.is_empty() {
            return Err(GatewayError::InvalidArgument("Remove API requires an id".into()));
        }

        let config = req.config.get_or_insert_with(Default::default);
        if !config.skip_strict_exist_check {
            match self.backend.exists(cancel, ObjectId { id: id.clone() }).await {
                Ok(found) if !found.id.is_empty() => {}
                Ok(_) => return Err(GatewayError::NotFound(id)),
                Err(e) if e.is_not_found() => {
                    return Err(GatewayError::NotFound(id).context("Remove API id does not exist"));
                }
                // shards that did answer may still hold a replica
                Err(e) => probe_miss("Remove", &id, e)?,
            }
            config.skip_strict_exist_check = true;
        }

        self.backend
            .remove(cancel, req)
            .instrument(span!(Level::DEBUG, "gateway_remove"))
            .await
            .map_err(|e| e.context(format!("Remove API failed for id {}", id)))
    }

    // ---- reads ----

    pub async fn exists(&self, cancel: &CancellationToken, id: ObjectId) -> Result<ObjectId> {
        if id.id.is_empty() {
            return Err(GatewayError::InvalidArgument("Exists API requires an id".into()));
        }
        let key = id.id.clone();
        self.backend
            .exists(cancel, id)
            .await
            .map_err(|e| e.context(format!("Exists API failed for id {}", key)))
    }

    pub async fn get_object(&self, cancel: &CancellationToken, req: GetObjectRequest) -> Result<ObjectVector> {
        let id = req.id.unwrap_or_default();
        if id.id.is_empty() {
            return Err(GatewayError::InvalidArgument("GetObject API requires an id".into()));
        }
        let key = id.id.clone();
        let vector = self
            .backend
            .get_object(cancel, id)
            .await
            .map_err(|e| e.context(format!("GetObject API failed for id {}", key)))?;

        let addrs = filter_addrs(&self.settings.object_filters, req.filters.as_ref());
        if addrs.is_empty() {
            return Ok(vector);
        }
        self.filters
            .ordered_range(cancel, &addrs, vector, |vector, addr, conn: K::Conn| async move {
                EgressFilterRpc::filter_vector(&conn, vector)
                    .await
                    .map_err(|status| GatewayError::rpc(addr, status))
            })
            .await
            .map_err(|e| {
                e.wrap(
                    Code::Internal,
                    format!("GetObject API egress filter request to {:?} failure on id {}", addrs, key),
                )
            })
    }

    // ---- batch and stream adapters ----

    async fn batch<Req, Resp, D, F, Fut>(
        &self,
        cancel: &CancellationToken,
        reqs: Vec<Req>,
        describe: D,
        op: F,
    ) -> Batch<Resp>
    where
        Req: Send + 'static,
        Resp: Send + 'static,
        D: Fn(&Req) -> String,
        F: Fn(Self, CancellationToken, Req) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<Resp>> + Send + 'static,
    {
        let gateway = self.clone();
        multi::apply(cancel, self.multi_concurrency, reqs, describe, move |cancel, req| {
            op(gateway.clone(), cancel, req)
        })
        .await
    }

    fn streaming<Req, Resp, S, F, Fut>(
        &self,
        cancel: &CancellationToken,
        inbound: S,
        op: F,
    ) -> ResponseStream<Resp>
    where
        Req: Send + 'static,
        Resp: Send + 'static,
        S: Inbound<Req>,
        F: Fn(Self, CancellationToken, Req) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<Resp>> + Send + 'static,
    {
        let gateway = self.clone();
        stream::bidirectional(cancel.clone(), inbound, self.stream_concurrency, move |cancel, req| {
            op(gateway.clone(), cancel, req)
        })
    }

    pub async fn multi_search(&self, cancel: &CancellationToken, reqs: Vec<SearchRequest>) -> Batch<SearchResponse> {
        self.batch(cancel, reqs, search_label, |gw, cancel, req| async move {
            gw.search(&cancel, req).await
        })
        .await
    }

    pub async fn multi_search_by_id(
        &self,
        cancel: &CancellationToken,
        reqs: Vec<SearchIdRequest>,
    ) -> Batch<SearchResponse> {
        self.batch(cancel, reqs, search_id_label, |gw, cancel, req| async move {
            gw.search_by_id(&cancel, req).await
        })
        .await
    }

    pub async fn multi_linear_search(
        &self,
        cancel: &CancellationToken,
        reqs: Vec<SearchRequest>,
    ) -> Batch<SearchResponse> {
        self.batch(cancel, reqs, search_label, |gw, cancel, req| async move {
            gw.linear_search(&cancel, req).await
        })
        .await
    }

    pub async fn multi_linear_search_by_id(
        &self,
        cancel: &CancellationToken,
        reqs: Vec<SearchIdRequest>,
    ) -> Batch<SearchResponse> {
        self.batch(cancel, reqs, search_id_label, |gw, cancel, req| async move {
            gw.linear_search_by_id(&cancel, req).await
        })
        .await
    }

    pub async fn multi_search_object(
        &self,
        cancel: &CancellationToken,
        reqs: Vec<SearchObjectRequest>,
    ) -> Batch<SearchResponse> {
        self.batch(cancel, reqs, search_object_label, |gw, cancel, req| async move {
            gw.search_object(&cancel, req).await
        })
        .await
    }

    pub async fn multi_insert(&self, cancel: &CancellationToken, reqs: Vec<WriteRequest>) -> Batch<ObjectLocation> {
        self.batch(cancel, reqs, write_label, |gw, cancel, req| async move {
            gw.insert(&cancel, req).await
        })
        .await
    }

    pub async fn multi_update(&self, cancel: &CancellationToken, reqs: Vec<WriteRequest>) -> Batch<ObjectLocation> {
        self.batch(cancel, reqs, write_label, |gw, cancel, req| async move {
            gw.update(&cancel, req).await
        })
        .await
    }

    pub async fn multi_upsert(&self, cancel: &CancellationToken, reqs: Vec<WriteRequest>) -> Batch<ObjectLocation> {
        self.batch(cancel, reqs, write_label, |gw, cancel, req| async move {
            gw.upsert(&cancel, req).await
        })
        .await
    }

    pub async fn multi_insert_object(
        &self,
        cancel: &CancellationToken,
        reqs: Vec<WriteObjectRequest>,
    ) -> Batch<ObjectLocation> {
        self.batch(cancel, reqs, write_object_label, |gw, cancel, req| async move {
            gw.insert_object(&cancel, req).await
        })
        .await
    }

    pub async fn multi_update_object(
        &self,
        cancel: &CancellationToken,
        reqs: Vec<WriteObjectRequest>,
    ) -> Batch<ObjectLocation> {
        self.batch(cancel, reqs, write_object_label, |gw, cancel, req| async move {
            gw.update_object(&cancel, req).await
        })
        .await
    }

    pub async fn multi_upsert_object(
        &self,
        cancel: &CancellationToken,
        reqs: Vec<WriteObjectRequest>,
    ) -> Batch<ObjectLocation> {
        self.batch(cancel, reqs, write_object_label, |gw, cancel, req| async move {
            gw.upsert_object(&cancel, req).await
        })
        .await
    }

    pub async fn multi_remove(&self, cancel: &CancellationToken, reqs: Vec<RemoveRequest>) -> Batch<ObjectLocation> {
        self.batch(cancel, reqs, remove_label, |gw, cancel, req| async move {
            gw.remove(&cancel, req).await
        })
        .await
    }

    pub fn stream_search(
        &self,
        cancel: &CancellationToken,
        inbound: impl Inbound<SearchRequest>,
    ) -> ResponseStream<SearchResponse> {
        self.streaming(cancel, inbound, |gw, cancel, req| async move {
            gw.search(&cancel, req).await
        })
    }

    pub fn stream_search_by_id(
        &self,
        cancel: &CancellationToken,
        inbound: impl Inbound<SearchIdRequest>,
    ) -> ResponseStream<SearchResponse> {
        self.streaming(cancel, inbound, |gw, cancel, req| async move {
            gw.search_by_id(&cancel, req).await
        })
    }

    pub fn stream_linear_search(
        &self,
        cancel: &CancellationToken,
        inbound: impl Inbound<SearchRequest>,
    ) -> ResponseStream<SearchResponse> {
        self.streaming(cancel, inbound, |gw, cancel, req| async move {
            gw.linear_search(&cancel, req).await
        })
    }

    pub fn stream_linear_search_by_id(
        &self,
        cancel: &CancellationToken,
        inbound: impl Inbound<SearchIdRequest>,
    ) -> ResponseStream<SearchResponse> {
        self.streaming(cancel, inbound, |gw, cancel, req| async move {
            gw.linear_search_by_id(&cancel, req).await
        })
    }

    pub fn stream_search_object(
        &self,
        cancel: &CancellationToken,
        inbound: impl Inbound<SearchObjectRequest>,
    ) -> ResponseStream<SearchResponse> {
        self.streaming(cancel, inbound, |gw, cancel, req| async move {
            gw.search_object(&cancel, req).await
        })
    }

    pub fn stream_insert(
        &self,
        cancel: &CancellationToken,
        inbound: impl Inbound<WriteRequest>,
    ) -> ResponseStream<ObjectLocation> {
        self.streaming(cancel, inbound, |gw, cancel, req| async move {
            gw.insert(&cancel, req).await
        })
    }

    pub fn stream_update(
        &self,
        cancel: &CancellationToken,
        inbound: impl Inbound<WriteRequest>,
    ) -> ResponseStream<ObjectLocation> {
        self.streaming(cancel, inbound, |gw, cancel, req| async move {
            gw.update(&cancel, req).await
        })
    }

    pub fn stream_upsert(
        &self,
        cancel: &CancellationToken,
        inbound: impl Inbound<WriteRequest>,
    ) -> ResponseStream<ObjectLocation> {
        self.streaming(cancel, inbound, |gw, cancel, req| async move {
            gw.upsert(&cancel, req).await
        })
    }

    pub fn stream_insert_object(
        &self,
        cancel: &CancellationToken,
        inbound: impl Inbound<WriteObjectRequest>,
    ) -> ResponseStream<ObjectLocation> {
        self.streaming(cancel, inbound, |gw, cancel, req| async move {
            gw.insert_object(&cancel, req).await
        })
    }

    pub fn stream_update_object(
        &self,
        cancel: &CancellationToken,
        inbound: impl Inbound<WriteObjectRequest>,
    ) -> ResponseStream<ObjectLocation> {
        self.streaming(cancel, inbound, |gw, cancel, req| async move {
            gw.update_object(&cancel, req).await
        })
    }

    pub fn stream_upsert_object(
        &self,
        cancel: &CancellationToken,
        inbound: impl Inbound<WriteObjectRequest>,
    ) -> ResponseStream<ObjectLocation> {
        self.streaming(cancel, inbound, |gw, cancel, req| async move {
            gw.upsert_object(&cancel, req).await
        })
    }

    pub fn stream_remove(
        &self,
        cancel: &CancellationToken,
        inbound: impl Inbound<RemoveRequest>,
    ) -> ResponseStream<ObjectLocation> {
        self.streaming(cancel, inbound, |gw, cancel, req| async move {
            gw.remove(&cancel, req).await
        })
    }

    pub fn stream_get_object(
        &self,
        cancel: &CancellationToken,
        inbound: impl Inbound<GetObjectRequest>,
    ) -> ResponseStream<ObjectVector> {
        self.streaming(cancel, inbound, |gw, cancel, req| async move {
            gw.get_object(&cancel, req).await
        })
    }
}
