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

//! Id translation between callers and agents
//!
//! Callers address objects by their own ids; agents index them under uuids
//! minted here. [`MetaBackend`] wraps another [`VectorBackend`] and keeps
//! the `uuid -> caller id` mapping in the metadata store:
//!
//! - inserts mint a uuid and register it before the agents see the vector
//! - point operations resolve the caller id to its uuid first
//! - search results are mapped back to caller ids
//! - removes drop the mapping once the agents confirm

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::client::MetaRpc;
use crate::core::error::{GatewayError, Result};
use crate::gateway::backend::{VectorBackend, WriteOp};
use crate::meta::MetaBridge;
use crate::net::Connector;
use crate::proto::payload::{
    ObjectId, ObjectLocation, ObjectVector, RemoveRequest, SearchIdRequest, SearchRequest,
    SearchResponse, WriteRequest,
};

pub struct MetaBackend<M: Connector> {
    inner: Arc<dyn VectorBackend>,
    meta: Arc<MetaBridge<M>>,
}

impl<M> MetaBackend<M>
where
    M: Connector,
    M::Conn: MetaRpc,
{
    pub fn new(inner: Arc<dyn VectorBackend>, meta: Arc<MetaBridge<M>>) -> Self {
        Self { inner, meta }
    }

    /// `inner` translated through `meta` when a bridge is configured,
    /// `inner` itself otherwise.
    pub fn wrap(inner: Arc<dyn VectorBackend>, meta: Option<MetaBridge<M>>) -> Arc<dyn VectorBackend> {
        match meta {
            Some(meta) => Arc::new(Self::new(inner, Arc::new(meta))),
            None => inner,
        }
    }

    pub fn meta(&self) -> &Arc<MetaBridge<M>> {
        &self.meta
    }

    async fn uuid_of(&self, cancel: &CancellationToken, id: &str) -> Result<String> {
        if id.is_empty() {
            return Err(GatewayError::InvalidArgument("object id is empty".into()));
        }
        self.meta.get_meta_inverse(cancel, id).await
    }

    /// Mint and register a uuid for an id the store does not know yet.
    async fn register(&self, cancel: &CancellationToken, id: &str) -> Result<String> {
        match self.uuid_of(cancel, id).await {
            Ok(uuid) => {
                return Err(GatewayError::AlreadyExists(format!("{} (uuid {})", id, uuid)));
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }
        let uuid = Uuid::new_v4().to_string();
        self.meta.set_meta(cancel, &uuid, id).await?;
        debug!("registered {} as {}", id, uuid);
        Ok(uuid)
    }

    /// Swap agent uuids for caller ids. Results the store cannot map keep
    /// their uuid; a failed lookup leaves the response untouched.
    async fn translate(&self, cancel: &CancellationToken, mut res: SearchResponse) -> SearchResponse {
        if res.results.is_empty() {
            return res;
        }
        let uuids = res.results.iter().map(|r| r.id.clone()).collect();
        match self.meta.get_metas(cancel, uuids).await {
            Ok(ids) => {
                for (result, id) in res.results.iter_mut().zip(ids) {
                    if !id.is_empty() {
                        result.id = id;
                    }
                }
            }
            Err(err) => error!(
                "meta translation of request {} results failed: {}",
                res.request_id, err
            ),
        }
        res
    }

    async fn search_id(
        &self,
        cancel: &CancellationToken,
        mut req: SearchIdRequest,
        linear: bool,
    ) -> Result<SearchResponse> {
        req.id = self.uuid_of(cancel, &req.id).await?;
        let res = if linear {
            self.inner.linear_search_by_id(cancel, req).await?
        } else {
            self.inner.search_by_id(cancel, req).await?
        };
        Ok(self.translate(cancel, res).await)
    }

    async fn write(&self, cancel: &CancellationToken, mut req: WriteRequest, op: WriteOp) -> Result<ObjectLocation> {
        let id = req.vector.as_ref().map(|v| v.id.clone()).unwrap_or_default();
        let (uuid, minted) = match op {
            WriteOp::Insert => (self.register(cancel, &id).await?, true),
            WriteOp::Update => (self.uuid_of(cancel, &id).await?, false),
            WriteOp::Upsert => match self.uuid_of(cancel, &id).await {
                Ok(uuid) => (uuid, false),
                Err(err) if err.is_not_found() => (self.register(cancel, &id).await?, true),
                Err(err) => return Err(err),
            },
        };
        if let Some(vector) = req.vector.as_mut() {
            vector.id = uuid.clone();
        }

        let written = match op {
            WriteOp::Insert => self.inner.insert(cancel, req).await,
            WriteOp::Update => self.inner.update(cancel, req).await,
            WriteOp::Upsert => self.inner.upsert(cancel, req).await,
        };
        match written {
            Ok(location) => Ok(ObjectLocation {
                name: id,
                uuid,
                ips: location.ips,
            }),
            Err(err) => {
                if minted {
                    if let Err(undo) = self.meta.delete_meta(cancel, &uuid).await {
                        warn!("{} of {} failed and its uuid {} stays registered: {}", op.name(), id, uuid, undo);
                    }
                }
                Err(err)
            }
        }
    }
}

#[async_trait]
impl<M> VectorBackend for MetaBackend<M>
where
    M: Connector,
    M::Conn: MetaRpc,
{
    async fn search(&self, cancel: &CancellationToken, req: SearchRequest) -> Result<SearchResponse> {
        let res = self.inner.search(cancel, req).await?;
        Ok(self.translate(cancel, res).await)
    }

    async fn search_by_id(
        &self,
        cancel: &CancellationToken,
        req: SearchIdRequest,
    ) -> Result<SearchResponse> {
        self.search_id(cancel, req, false).await
    }

    async fn linear_search(
        &self,
        cancel: &CancellationToken,
        req: SearchRequest,
    ) -> Result<SearchResponse> {
        let res = self.inner.linear_search(cancel, req).await?;
        Ok(self.translate(cancel, res).await)
    }

    async fn linear_search_by_id(
        &self,
        cancel: &CancellationToken,
        req: SearchIdRequest,
    ) -> Result<SearchResponse> {
        self.search_id(cancel, req, true).await
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

    async fn remove(&self, cancel: &CancellationToken, mut req: RemoveRequest) -> Result<ObjectLocation> {
        let id = req.id.as_ref().map(|i| i.id.clone()).unwrap_or_default();
        let uuid = self.uuid_of(cancel, &id).await?;
        req.id = Some(ObjectId { id: uuid.clone() });

        let location = self.inner.remove(cancel, req).await?;
        self.meta.delete_meta(cancel, &uuid).await?;
        Ok(ObjectLocation {
            name: id,
            uuid,
            ips: location.ips,
        })
    }

    async fn get_object(&self, cancel: &CancellationToken, id: ObjectId) -> Result<ObjectVector> {
        let uuid = self.uuid_of(cancel, &id.id).await?;
        let mut vector = self.inner.get_object(cancel, ObjectId { id: uuid }).await?;
        vector.id = id.id;
        Ok(vector)
    }

    /// Answers from the metadata store alone; the returned id is the uuid.
    async fn exists(&self, cancel: &CancellationToken, id: ObjectId) -> Result<ObjectId> {
        let uuid = self.uuid_of(cancel, &id.id).await?;
        Ok(ObjectId { id: uuid })
    }
}
