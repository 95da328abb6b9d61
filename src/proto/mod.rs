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

//! Protocol buffer messages and gRPC method paths
//!
//! The message code is generated and checked in; the outbound services are
//! called through [`crate::client`] using the paths below.

pub mod payload {
    include!("vectorgate.v1.rs");
}

/// Fully qualified gRPC method paths of the backend services
pub mod methods {
    pub const AGENT_SEARCH: &str = "/vectorgate.v1.Agent/Search";
    pub const AGENT_SEARCH_BY_ID: &str = "/vectorgate.v1.Agent/SearchByID";
    pub const AGENT_LINEAR_SEARCH: &str = "/vectorgate.v1.Agent/LinearSearch";
    pub const AGENT_LINEAR_SEARCH_BY_ID: &str = "/vectorgate.v1.Agent/LinearSearchByID";
    pub const AGENT_INSERT: &str = "/vectorgate.v1.Agent/Insert";
    pub const AGENT_UPDATE: &str = "/vectorgate.v1.Agent/Update";
    pub const AGENT_UPSERT: &str = "/vectorgate.v1.Agent/Upsert";
    pub const AGENT_REMOVE: &str = "/vectorgate.v1.Agent/Remove";
    pub const AGENT_GET_OBJECT: &str = "/vectorgate.v1.Agent/GetObject";
    pub const AGENT_EXISTS: &str = "/vectorgate.v1.Agent/Exists";

    pub const INGRESS_GEN_VECTOR: &str = "/vectorgate.v1.IngressFilter/GenVector";
    pub const INGRESS_FILTER_VECTOR: &str = "/vectorgate.v1.IngressFilter/FilterVector";

    pub const EGRESS_FILTER_DISTANCE: &str = "/vectorgate.v1.EgressFilter/FilterDistance";
    pub const EGRESS_FILTER_VECTOR: &str = "/vectorgate.v1.EgressFilter/FilterVector";

    pub const META_GET_META: &str = "/vectorgate.v1.Meta/GetMeta";
    pub const META_GET_METAS: &str = "/vectorgate.v1.Meta/GetMetas";
    pub const META_GET_META_INVERSE: &str = "/vectorgate.v1.Meta/GetMetaInverse";
    pub const META_GET_METAS_INVERSE: &str = "/vectorgate.v1.Meta/GetMetasInverse";
    pub const META_SET_META: &str = "/vectorgate.v1.Meta/SetMeta";
    pub const META_SET_METAS: &str = "/vectorgate.v1.Meta/SetMetas";
    pub const META_DELETE_META: &str = "/vectorgate.v1.Meta/DeleteMeta";
    pub const META_DELETE_METAS: &str = "/vectorgate.v1.Meta/DeleteMetas";
    pub const META_DELETE_META_INVERSE: &str = "/vectorgate.v1.Meta/DeleteMetaInverse";
    pub const META_DELETE_METAS_INVERSE: &str = "/vectorgate.v1.Meta/DeleteMetasInverse";
}
