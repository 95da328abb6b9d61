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

//! Metadata key/value bridge
//!
//! Client half of the meta contract. Every call goes through
//! [`ConnectionPool::do_call`] against the single configured meta address, so
//! it shares dialing, health and cancellation with the shard traffic.
//!
//! Singular calls classify failures: a `NotFound` from the store stays
//! `NotFound`, anything else surfaces as `Internal`. Both keep the offending
//! key in the message and the raw RPC error as the source. Batch calls hand
//! back whatever the store answered.

use lru::LruCache;
use parking_lot::Mutex;
use std::future::Future;
use std::num::NonZeroUsize;
use tokio_util::sync::CancellationToken;
use tonic::{Code, Status};
use tracing::{debug, instrument};

use crate::client::MetaRpc;
use crate::core::config::MetaConfig;
use crate::core::error::{GatewayError, Result};
use crate::net::{ConnectionPool, Connector};
use crate::proto::payload::{MetaKey, MetaKeyVal, MetaKeyVals, MetaKeys, MetaVal, MetaVals};

struct MetaCache {
    forward: LruCache<String, String>,
    inverse: LruCache<String, String>,
}

impl MetaCache {
    fn new(capacity: NonZeroUsize) -> Self {
        Self {
            forward: LruCache::new(capacity),
            inverse: LruCache::new(capacity),
        }
    }

    /// Cache `key <-> val`. A pair displaced or evicted on one side leaves
    /// the other side too, so a key or value sits in at most one pair.
    fn remember(&mut self, key: &str, val: &str) {
        if let Some((old_key, old_val)) = self.forward.push(key.to_string(), val.to_string()) {
            if old_key != key || old_val != val {
                unlink(&mut self.inverse, &old_val, &old_key);
            }
        }
        if let Some((old_val, old_key)) = self.inverse.push(val.to_string(), key.to_string()) {
            if old_val != val || old_key != key {
                unlink(&mut self.forward, &old_key, &old_val);
            }
        }
    }

    fn forget_key(&mut self, key: &str) {
        if let Some(val) = self.forward.pop(key) {
            self.inverse.pop(&val);
        }
    }

    fn forget_val(&mut self, val: &str) {
        if let Some(key) = self.inverse.pop(val) {
            self.forward.pop(&key);
        }
    }
}

fn unlink(map: &mut LruCache<String, String>, from: &str, to: &str) {
    if map.peek(from).is_some_and(|v| v == to) {
        map.pop(from);
    }
}

pub struct MetaBridge<K: Connector> {
    pool: ConnectionPool<K>,
    addr: String,
    cache: Option<Mutex<MetaCache>>,
}

fn classify(err: GatewayError, subject: String) -> GatewayError {
    if err.is_not_found() {
        err.wrap(Code::NotFound, format!("meta {} not found", subject))
    } else if err.code() == Code::Cancelled {
        err
    } else {
        err.wrap(Code::Internal, format!("meta request for {} failed", subject))
    }
}

impl<K> MetaBridge<K>
where
    K: Connector,
    K::Conn: MetaRpc,
{
    /// Fails when no meta address is configured.
    pub fn new(pool: ConnectionPool<K>, config: &MetaConfig) -> Result<Self> {
        let addr = config
            .addr
            .clone()
            .filter(|a| !a.is_empty())
            .ok_or_else(|| GatewayError::InvalidArgument("meta address is not configured".into()))?;
        let cache = if config.enable_cache {
            NonZeroUsize::new(config.cache_capacity).map(|cap| Mutex::new(MetaCache::new(cap)))
        } else {
            None
        };
        Ok(Self { pool, addr, cache })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn pool(&self) -> &ConnectionPool<K> {
        &self.pool
    }

    async fn call<T, F, Fut>(&self, cancel: &CancellationToken, subject: String, f: F) -> Result<T>
    where
        F: FnOnce(K::Conn) -> Fut,
        Fut: Future<Output = std::result::Result<T, Status>>,
    {
        self.pool
            .do_call(cancel, &self.addr, |addr, conn| async move {
                f(conn).await.map_err(|status| GatewayError::rpc(addr, status))
            })
            .await
            .map_err(|err| classify(err, subject))
    }

    fn cached(&self, lookup: impl FnOnce(&mut MetaCache) -> Option<String>) -> Option<String> {
        self.cache.as_ref().and_then(|cache| lookup(&mut cache.lock()))
    }

    fn with_cache(&self, update: impl FnOnce(&mut MetaCache)) {
        if let Some(cache) = &self.cache {
            update(&mut cache.lock());
        }
    }

    #[instrument(skip(self, cancel))]
    pub async fn get_meta(&self, cancel: &CancellationToken, key: &str) -> Result<String> {
        if let Some(val) = self.cached(|c| c.forward.get(key).cloned()) {
            debug!("meta cache hit for key {}", key);
            return Ok(val);
        }
        let req = MetaKey { key: key.to_string() };
        let val = self
            .call(cancel, format!("key {}", key), |conn| async move {
                conn.get_meta(req).await
            })
            .await?
            .val;
        self.with_cache(|c| c.remember(key, &val));
        Ok(val)
    }

    pub async fn get_metas(&self, cancel: &CancellationToken, keys: Vec<String>) -> Result<Vec<String>> {
        let subject = format!("keys {:?}", keys);
        let req = MetaKeys { keys };
        let vals = self
            .call(cancel, subject, |conn| async move { conn.get_metas(req).await })
            .await?;
        Ok(vals.vals)
    }

    #[instrument(skip(self, cancel))]
    pub async fn get_meta_inverse(&self, cancel: &CancellationToken, val: &str) -> Result<String> {
        if let Some(key) = self.cached(|c| c.inverse.get(val).cloned()) {
            debug!("meta cache hit for value {}", val);
            return Ok(key);
        }
        let req = MetaVal { val: val.to_string() };
        let key = self
            .call(cancel, format!("value {}", val), |conn| async move {
                conn.get_meta_inverse(req).await
            })
            .await?
            .key;
        self.with_cache(|c| c.remember(&key, val));
        Ok(key)
    }

    pub async fn get_metas_inverse(
        &self,
        cancel: &CancellationToken,
        vals: Vec<String>,
    ) -> Result<Vec<String>> {
        let subject = format!("values {:?}", vals);
        let req = MetaVals { vals };
        let keys = self
            .call(cancel, subject, |conn| async move {
                conn.get_metas_inverse(req).await
            })
            .await?;
        Ok(keys.keys)
    }

    #[instrument(skip(self, cancel))]
    pub async fn set_meta(&self, cancel: &CancellationToken, key: &str, val: &str) -> Result<()> {
        let req = MetaKeyVal {
            key: key.to_string(),
            val: val.to_string(),
        };
        self.call(cancel, format!("key {}", key), |conn| async move {
            conn.set_meta(req).await
        })
        .await?;
        self.with_cache(|c| c.remember(key, val));
        Ok(())
    }

    pub async fn set_metas(&self, cancel: &CancellationToken, kvs: Vec<(String, String)>) -> Result<()> {
        let subject = format!("keys {:?}", kvs.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>());
        // stale entries would outlive a partially applied batch
        self.with_cache(|c| {
            for (key, val) in &kvs {
                c.forget_key(key);
                c.forget_val(val);
            }
        });
        let req = MetaKeyVals {
            kvs: kvs
                .into_iter()
                .map(|(key, val)| MetaKeyVal { key, val })
                .collect(),
        };
        self.call(cancel, subject, |conn| async move { conn.set_metas(req).await })
            .await?;
        Ok(())
    }

    /// Returns the value that was stored under `key`.
    #[instrument(skip(self, cancel))]
    pub async fn delete_meta(&self, cancel: &CancellationToken, key: &str) -> Result<String> {
        self.with_cache(|c| c.forget_key(key));
        let req = MetaKey { key: key.to_string() };
        let val = self
            .call(cancel, format!("key {}", key), |conn| async move {
                conn.delete_meta(req).await
            })
            .await?
            .val;
        self.with_cache(|c| c.forget_val(&val));
        Ok(val)
    }

    pub async fn delete_metas(&self, cancel: &CancellationToken, keys: Vec<String>) -> Result<Vec<String>> {
        self.with_cache(|c| {
            for key in &keys {
                c.forget_key(key);
            }
        });
        let subject = format!("keys {:?}", keys);
        let req = MetaKeys { keys };
        let vals = self
            .call(cancel, subject, |conn| async move { conn.delete_metas(req).await })
            .await?;
        self.with_cache(|c| {
            for val in &vals.vals {
                c.forget_val(val);
            }
        });
        Ok(vals.vals)
    }

    /// Returns the key that mapped to `val`.
    #[instrument(skip(self, cancel))]
    pub async fn delete_meta_inverse(&self, cancel: &CancellationToken, val: &str) -> Result<String> {
        self.with_cache(|c| c.forget_val(val));
        let req = MetaVal { val: val.to_string() };
        let key = self
            .call(cancel, format!("value {}", val), |conn| async move {
                conn.delete_meta_inverse(req).await
            })
            .await?
            .key;
        self.with_cache(|c| c.forget_key(&key));
        Ok(key)
    }

    pub async fn delete_metas_inverse(
        &self,
        cancel: &CancellationToken,
        vals: Vec<String>,
    ) -> Result<Vec<String>> {
        self.with_cache(|c| {
            for val in &vals {
                c.forget_val(val);
            }
        });
        let subject = format!("values {:?}", vals);
        let req = MetaVals { vals };
        let keys = self
            .call(cancel, subject, |conn| async move {
                conn.delete_metas_inverse(req).await
            })
            .await?;
        self.with_cache(|c| {
            for key in &keys.keys {
                c.forget_key(key);
            }
        });
        Ok(keys.keys)
    }

    /// `Ok(false)` when the store has no entry for `key`.
    pub async fn exists(&self, cancel: &CancellationToken, key: &str) -> Result<bool> {
        match self.get_meta(cancel, key).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }
}
