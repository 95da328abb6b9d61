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

//! # VectorGate - Vector Search Gateway
//!
//! A stateless fan-out/fan-in proxy in front of a sharded fleet of
//! vector-search agents.
//!
//! ## Layers
//!
//! - **net**: address-keyed connection pool with single-dial reuse, round
//!   robin, ordered pipelines, broadcast and health monitoring
//! - **search**: broadcast aggregation into a bounded, globally ranked top-K
//!   with cross-shard deduplication
//! - **gateway**: request orchestration with ingress/egress filter chains,
//!   plus Multi (batch) and Stream (bidirectional) variants
//! - **meta**: key/value mapping bridge and its server-side handler

pub mod client;
pub mod core;
pub mod gateway;
pub mod meta;
pub mod net;
pub mod proto;
pub mod search;

pub use crate::core::config::{FailurePolicy, GatewayConfig};
pub use crate::core::error::{GatewayError, Result};
pub use crate::gateway::{Gateway, MetaBackend, ShardBackend, VectorBackend};
pub use crate::meta::{MetaBridge, MetaService};
pub use crate::net::{ConnectionPool, Connector, GrpcConnector};
pub use crate::search::Aggregator;
