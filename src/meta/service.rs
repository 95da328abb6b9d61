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

//! Metadata key/value service
//!
//! Server side of the meta contract over a pluggable [`KvStore`]. Keys map to
//! values and values map back to keys; both directions stay consistent on
//! overwrite and delete. Batch calls answer per position with an empty string
//! where nothing was stored.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::Status;
use tracing::{debug, error};

use crate::client::MetaRpc;
use crate::proto::payload::{Empty, MetaKey, MetaKeyVal, MetaKeyVals, MetaKeys, MetaVal, MetaVals};

/// Bidirectional string mapping store
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn get_inverse(&self, val: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, val: &str) -> Result<()>;

    /// Returns the removed value.
    async fn delete(&self, key: &str) -> Result<Option<String>>;

    /// Returns the removed key.
    async fn delete_inverse(&self, val: &str) -> Result<Option<String>>;

    async fn len(&self) -> usize;
}

#[derive(Debug, Default)]
struct Mappings {
    forward: HashMap<String, String>,
    inverse: HashMap<String, String>,
}

/// In-memory [`KvStore`]; nothing survives the process
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    maps: RwLock<Mappings>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.maps.read().await.forward.get(key).cloned())
    }

    async fn get_inverse(&self, val: &str) -> Result<Option<String>> {
        Ok(self.maps.read().await.inverse.get(val).cloned())
    }

    async fn set(&self, key: &str, val: &str) -> Result<()> {
        if key.is_empty() || val.is_empty() {
            bail!("meta key and value must be non-empty (key={:?}, val={:?})", key, val);
        }
        let mut maps = self.maps.write().await;
        if let Some(old_val) = maps.forward.insert(key.to_string(), val.to_string()) {
            if old_val != val {
                maps.inverse.remove(&old_val);
            }
        }
        if let Some(old_key) = maps.inverse.insert(val.to_string(), key.to_string()) {
            if old_key != key {
                maps.forward.remove(&old_key);
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<Option<String>> {
        let mut maps = self.maps.write().await;
        let val = maps.forward.remove(key);
        if let Some(val) = &val {
            maps.inverse.remove(val);
        }
        Ok(val)
    }

    async fn delete_inverse(&self, val: &str) -> Result<Option<String>> {
        let mut maps = self.maps.write().await;
        let key = maps.inverse.remove(val);
        if let Some(key) = &key {
            maps.forward.remove(key);
        }
        Ok(key)
    }

    async fn len(&self) -> usize {
        self.maps.read().await.forward.len()
    }
}

/// [`MetaRpc`] handler over a [`KvStore`]
pub struct MetaService<S> {
    store: Arc<S>,
}

impl<S> Clone for MetaService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: KvStore> MetaService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn from_arc(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

fn internal(op: &str, subject: &str, err: anyhow::Error) -> Status {
    error!("meta {} failed for {}: {:#}", op, subject, err);
    Status::internal(format!("meta {} failed for {}: {:#}", op, subject, err))
}

fn found<T>(value: Option<String>, subject: &str, wrap: impl FnOnce(String) -> T) -> std::result::Result<T, Status> {
    value
        .map(wrap)
        .ok_or_else(|| Status::not_found(format!("{} not found", subject)))
}

#[async_trait]
impl<S: KvStore + 'static> MetaRpc for MetaService<S> {
    async fn get_meta(&self, req: MetaKey) -> std::result::Result<MetaVal, Status> {
        let val = self
            .store
            .get(&req.key)
            .await
            .map_err(|e| internal("get", &req.key, e))?;
        found(val, &format!("key {}", req.key), |val| MetaVal { val })
    }

    async fn get_metas(&self, req: MetaKeys) -> std::result::Result<MetaVals, Status> {
        let mut vals = Vec::with_capacity(req.keys.len());
        for key in &req.keys {
            let val = self.store.get(key).await.map_err(|e| internal("get", key, e))?;
            vals.push(val.unwrap_or_default());
        }
        Ok(MetaVals { vals })
    }

    async fn get_meta_inverse(&self, req: MetaVal) -> std::result::Result<MetaKey, Status> {
        let key = self
            .store
            .get_inverse(&req.val)
            .await
            .map_err(|e| internal("inverse get", &req.val, e))?;
        found(key, &format!("value {}", req.val), |key| MetaKey { key })
    }

    async fn get_metas_inverse(&self, req: MetaVals) -> std::result::Result<MetaKeys, Status> {
        let mut keys = Vec::with_capacity(req.vals.len());
        for val in &req.vals {
            let key = self
                .store
                .get_inverse(val)
                .await
                .map_err(|e| internal("inverse get", val, e))?;
            keys.push(key.unwrap_or_default());
        }
        Ok(MetaKeys { keys })
    }

    async fn set_meta(&self, req: MetaKeyVal) -> std::result::Result<Empty, Status> {
        if req.key.is_empty() || req.val.is_empty() {
            return Err(Status::invalid_argument("meta key and value must be non-empty"));
        }
        self.store
            .set(&req.key, &req.val)
            .await
            .map_err(|e| internal("set", &req.key, e))?;
        debug!("meta set {} -> {}", req.key, req.val);
        Ok(Empty {})
    }

    async fn set_metas(&self, req: MetaKeyVals) -> std::result::Result<Empty, Status> {
        if req.kvs.iter().any(|kv| kv.key.is_empty() || kv.val.is_empty()) {
            return Err(Status::invalid_argument("meta keys and values must be non-empty"));
        }
        for kv in &req.kvs {
            self.store
                .set(&kv.key, &kv.val)
                .await
                .map_err(|e| internal("set", &kv.key, e))?;
        }
        Ok(Empty {})
    }

    async fn delete_meta(&self, req: MetaKey) -> std::result::Result<MetaVal, Status> {
        let val = self
            .store
            .delete(&req.key)
            .await
            .map_err(|e| internal("delete", &req.key, e))?;
        found(val, &format!("key {}", req.key), |val| MetaVal { val })
    }

    async fn delete_metas(&self, req: MetaKeys) -> std::result::Result<MetaVals, Status> {
        let mut vals = Vec::with_capacity(req.keys.len());
        for key in &req.keys {
            let val = self.store.delete(key).await.map_err(|e| internal("delete", key, e))?;
            vals.push(val.unwrap_or_default());
        }
        Ok(MetaVals { vals })
    }

    async fn delete_meta_inverse(&self, req: MetaVal) -> std::result::Result<MetaKey, Status> {
        let key = self
            .store
            .delete_inverse(&req.val)
            .await
            .map_err(|e| internal("inverse delete", &req.val, e))?;
        found(key, &format!("value {}", req.val), |key| MetaKey { key })
    }

    async fn delete_metas_inverse(&self, req: MetaVals) -> std::result::Result<MetaKeys, Status> {
        let mut keys = Vec::with_capacity(req.vals.len());
        for val in &req.vals {
            let key = self
                .store
                .delete_inverse(val)
                .await
                .map_err(|e| internal("inverse delete", val, e))?;
            keys.push(key.unwrap_or_default());
        }
        Ok(MetaKeys { keys })
    }
}
