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

//! Typed outbound RPC clients
//!
//! Each backend service is a trait so the pool can hand out either a tonic
//! [`Channel`] or an in-process implementation. Every method is a plain unary
//! call returning the raw [`Status`]; classification into
//! [`crate::core::error::GatewayError`] happens at the call site, which knows
//! the target address.

use async_trait::async_trait;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;
use tonic::{Code, Request, Status};

use crate::proto::methods;
use crate::proto::payload::{
    Empty, MetaKey, MetaKeyVal, MetaKeyVals, MetaKeys, MetaVal, MetaVals, ObjectBlob,
    ObjectDistance, ObjectId, ObjectLocation, ObjectVector, RemoveRequest, SearchIdRequest,
    SearchRequest, SearchResponse, WriteRequest,
};

/// Vector-search agent serving one shard
#[async_trait]
pub trait AgentRpc: Send + Sync {
    async fn search(&self, req: SearchRequest) -> Result<SearchResponse, Status>;
    async fn search_by_id(&self, req: SearchIdRequest) -> Result<SearchResponse, Status>;
    async fn linear_search(&self, req: SearchRequest) -> Result<SearchResponse, Status>;
    async fn linear_search_by_id(&self, req: SearchIdRequest) -> Result<SearchResponse, Status>;
    async fn insert(&self, req: WriteRequest) -> Result<ObjectLocation, Status>;
    async fn update(&self, req: WriteRequest) -> Result<ObjectLocation, Status>;
    async fn upsert(&self, req: WriteRequest) -> Result<ObjectLocation, Status>;
    async fn remove(&self, req: RemoveRequest) -> Result<ObjectLocation, Status>;
    async fn get_object(&self, req: ObjectId) -> Result<ObjectVector, Status>;
    async fn exists(&self, req: ObjectId) -> Result<ObjectId, Status>;
}

/// Pre-search transform: vectorizer and vector filters
#[async_trait]
pub trait IngressFilterRpc: Send + Sync {
    async fn gen_vector(&self, req: ObjectBlob) -> Result<ObjectVector, Status>;
    async fn filter_vector(&self, req: ObjectVector) -> Result<ObjectVector, Status>;
}

/// Post-search transform applied per result
#[async_trait]
pub trait EgressFilterRpc: Send + Sync {
    async fn filter_distance(&self, req: ObjectDistance) -> Result<ObjectDistance, Status>;
    async fn filter_vector(&self, req: ObjectVector) -> Result<ObjectVector, Status>;
}

/// Bidirectional key/value mapping store
#[async_trait]
pub trait MetaRpc: Send + Sync {
    async fn get_meta(&self, req: MetaKey) -> Result<MetaVal, Status>;
    async fn get_metas(&self, req: MetaKeys) -> Result<MetaVals, Status>;
    async fn get_meta_inverse(&self, req: MetaVal) -> Result<MetaKey, Status>;
    async fn get_metas_inverse(&self, req: MetaVals) -> Result<MetaKeys, Status>;
    async fn set_meta(&self, req: MetaKeyVal) -> Result<Empty, Status>;
    async fn set_metas(&self, req: MetaKeyVals) -> Result<Empty, Status>;
    async fn delete_meta(&self, req: MetaKey) -> Result<MetaVal, Status>;
    async fn delete_metas(&self, req: MetaKeys) -> Result<MetaVals, Status>;
    async fn delete_meta_inverse(&self, req: MetaVal) -> Result<MetaKey, Status>;
    async fn delete_metas_inverse(&self, req: MetaVals) -> Result<MetaKeys, Status>;
}

async fn unary<Req, Resp>(channel: &Channel, path: &'static str, message: Req) -> Result<Resp, Status>
where
    Req: prost::Message + Send + Sync + 'static,
    Resp: prost::Message + Default + Send + Sync + 'static,
{
    let mut grpc = tonic::client::Grpc::new(channel.clone());
    grpc.ready()
        .await
        .map_err(|e| Status::new(Code::Unavailable, format!("service was not ready: {}", e)))?;
    let codec: ProstCodec<Req, Resp> = ProstCodec::default();
    let response = grpc
        .unary(Request::new(message), PathAndQuery::from_static(path), codec)
        .await?;
    Ok(response.into_inner())
}

#[async_trait]
impl AgentRpc for Channel {
    async fn search(&self, req: SearchRequest) -> Result<SearchResponse, Status> {
        unary(self, methods::AGENT_SEARCH, req).await
    }

    async fn search_by_id(&self, req: SearchIdRequest) -> Result<SearchResponse, Status> {
        unary(self, methods::AGENT_SEARCH_BY_ID, req).await
    }

    async fn linear_search(&self, req: SearchRequest) -> Result<SearchResponse, Status> {
        unary(self, methods::AGENT_LINEAR_SEARCH, req).await
    }

    async fn linear_search_by_id(&self, req: SearchIdRequest) -> Result<SearchResponse, Status> {
        unary(self, methods::AGENT_LINEAR_SEARCH_BY_ID, req).await
    }

    async fn insert(&self, req: WriteRequest) -> Result<ObjectLocation, Status> {
        unary(self, methods::AGENT_INSERT, req).await
    }

    async fn update(&self, req: WriteRequest) -> Result<ObjectLocation, Status> {
        unary(self, methods::AGENT_UPDATE, req).await
    }

    async fn upsert(&self, req: WriteRequest) -> Result<ObjectLocation, Status> {
        unary(self, methods::AGENT_UPSERT, req).await
    }

    async fn remove(&self, req: RemoveRequest) -> Result<ObjectLocation, Status> {
        unary(self, methods::AGENT_REMOVE, req).await
    }

    async fn get_object(&self, req: ObjectId) -> Result<ObjectVector, Status> {
        unary(self, methods::AGENT_GET_OBJECT, req).await
    }

    async fn exists(&self, req: ObjectId) -> Result<ObjectId, Status> {
        unary(self, methods::AGENT_EXISTS, req).await
    }
}

#[async_trait]
impl IngressFilterRpc for Channel {
    async fn gen_vector(&self, req: ObjectBlob) -> Result<ObjectVector, Status> {
        unary(self, methods::INGRESS_GEN_VECTOR, req).await
    }

    async fn filter_vector(&self, req: ObjectVector) -> Result<ObjectVector, Status> {
        unary(self, methods::INGRESS_FILTER_VECTOR, req).await
    }
}

#[async_trait]
impl EgressFilterRpc for Channel {
    async fn filter_distance(&self, req: ObjectDistance) -> Result<ObjectDistance, Status> {
        unary(self, methods::EGRESS_FILTER_DISTANCE, req).await
    }

    async fn filter_vector(&self, req: ObjectVector) -> Result<ObjectVector, Status> {
        unary(self, methods::EGRESS_FILTER_VECTOR, req).await
    }
}

#[async_trait]
impl MetaRpc for Channel {
    async fn get_meta(&self, req: MetaKey) -> Result<MetaVal, Status> {
        unary(self, methods::META_GET_META, req).await
    }

    async fn get_metas(&self, req: MetaKeys) -> Result<MetaVals, Status> {
        unary(self, methods::META_GET_METAS, req).await
    }

    async fn get_meta_inverse(&self, req: MetaVal) -> Result<MetaKey, Status> {
        unary(self, methods::META_GET_META_INVERSE, req).await
    }

    async fn get_metas_inverse(&self, req: MetaVals) -> Result<MetaKeys, Status> {
        unary(self, methods::META_GET_METAS_INVERSE, req).await
    }

    async fn set_meta(&self, req: MetaKeyVal) -> Result<Empty, Status> {
        unary(self, methods::META_SET_META, req).await
    }

    async fn set_metas(&self, req: MetaKeyVals) -> Result<Empty, Status> {
        unary(self, methods::META_SET_METAS, req).await
    }

    async fn delete_meta(&self, req: MetaKey) -> Result<MetaVal, Status> {
        unary(self, methods::META_DELETE_META, req).await
    }

    async fn delete_metas(&self, req: MetaKeys) -> Result<MetaVals, Status> {
        unary(self, methods::META_DELETE_METAS, req).await
    }

    async fn delete_meta_inverse(&self, req: MetaVal) -> Result<MetaKey, Status> {
        unary(self, methods::META_DELETE_META_INVERSE, req).await
    }

    async fn delete_metas_inverse(&self, req: MetaVals) -> Result<MetaKeys, Status> {
        unary(self, methods::META_DELETE_METAS_INVERSE, req).await
    }
}
