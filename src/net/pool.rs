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

//! Connection pool and target resolver
//!
//! Keeps at most one live connection per `host:port` and offers four ways of
//! running a call against pooled connections:
//!
//! - [`ConnectionPool::do_call`]: one named address
//! - [`ConnectionPool::round_robin`]: any one known connection
//! - [`ConnectionPool::ordered_range`]: a pipeline over addresses in order
//! - [`ConnectionPool::broadcast`]: every known connection concurrently
//!
//! Resolution of a new address is double-checked: a lock-free lookup first,
//! then a per-address dial gate, then a second lookup before dialing. A herd of
//! first-use requests for the same address therefore produces one dial.

use dashmap::DashMap;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::error::{GatewayError, Result};
use crate::net::connector::Connector;

/// A live, shared connection to one target address
#[derive(Debug)]
pub struct PooledConnection<C> {
    addr: String,
    conn: C,
    generation: u64,
    healthy: AtomicBool,
}

impl<C: Clone> PooledConnection<C> {
    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn conn(&self) -> C {
        self.conn.clone()
    }

    /// Dial sequence number; a reconnect produces a new generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn mark_unhealthy(&self) {
        self.healthy.store(false, Ordering::Release);
    }

    fn usable<K: Connector<Conn = C>>(&self, connector: &K) -> bool {
        self.healthy.load(Ordering::Acquire) && connector.is_healthy(&self.conn)
    }
}

struct PoolInner<K: Connector> {
    connector: K,
    conns: DashMap<String, Arc<PooledConnection<K::Conn>>>,
    dial_gates: DashMap<String, Arc<Mutex<()>>>,
    cursor: AtomicUsize,
    generations: AtomicU64,
}

/// Address-keyed pool of shared connections
pub struct ConnectionPool<K: Connector> {
    inner: Arc<PoolInner<K>>,
}

impl<K: Connector> Clone for ConnectionPool<K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Connections resolved for one call site, in caller order
pub struct Targets<C> {
    conns: Vec<Arc<PooledConnection<C>>>,
}

impl<C: Clone + Send + Sync + 'static> Targets<C> {
    pub fn len(&self) -> usize {
        self.conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }

    pub fn addrs(&self) -> Vec<String> {
        self.conns.iter().map(|c| c.addr.clone()).collect()
    }

    /// Run `f` on the first resolved connection.
    pub async fn call<T, F, Fut>(&self, f: F) -> Result<T>
    where
        F: FnOnce(String, C) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let pooled = self
            .conns
            .first()
            .ok_or_else(|| GatewayError::TargetNotFound("no resolved target".into()))?;
        let result = f(pooled.addr.clone(), pooled.conn()).await;
        observe(pooled, &result);
        result
    }

    /// Thread `input` through every connection in order. The first error stops
    /// the pipeline; later targets are not attempted.
    pub async fn pipeline<T, F, Fut>(&self, input: T, mut f: F) -> Result<T>
    where
        F: FnMut(T, String, C) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut value = input;
        for pooled in &self.conns {
            let result = f(value, pooled.addr.clone(), pooled.conn()).await;
            observe(pooled, &result);
            value = result?;
        }
        Ok(value)
    }
}

fn observe<C: Clone, T>(pooled: &PooledConnection<C>, result: &Result<T>) {
    if let Err(err) = result {
        if err.is_transport_failure() {
            warn!("marking {} unhealthy after transport failure: {}", pooled.addr, err);
            pooled.mark_unhealthy();
        }
    }
}

impl<K: Connector> ConnectionPool<K> {
    pub fn new(connector: K) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                connector,
                conns: DashMap::new(),
                dial_gates: DashMap::new(),
                cursor: AtomicUsize::new(0),
                generations: AtomicU64::new(0),
            }),
        }
    }

    pub fn connector(&self) -> &K {
        &self.inner.connector
    }

    /// Number of known addresses (healthy or not).
    pub fn len(&self) -> usize {
        self.inner.conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.conns.is_empty()
    }

    /// Known addresses split by current liveness, each sorted.
    pub fn addrs(&self) -> (Vec<String>, Vec<String>) {
        let mut connected = Vec::new();
        let mut disconnected = Vec::new();
        for entry in self.inner.conns.iter() {
            if entry.value().usable(&self.inner.connector) {
                connected.push(entry.key().clone());
            } else {
                disconnected.push(entry.key().clone());
            }
        }
        connected.sort();
        disconnected.sort();
        (connected, disconnected)
    }

    /// Pooled entry for `addr` without dialing.
    pub fn get(&self, addr: &str) -> Option<Arc<PooledConnection<K::Conn>>> {
        self.inner.conns.get(addr).map(|entry| entry.value().clone())
    }

    fn usable(&self, addr: &str) -> Option<Arc<PooledConnection<K::Conn>>> {
        self.get(addr)
            .filter(|pooled| pooled.usable(&self.inner.connector))
    }

    /// Return the live connection for `addr`, dialing or re-dialing if needed.
    pub async fn connect(&self, addr: &str) -> Result<Arc<PooledConnection<K::Conn>>> {
        if addr.is_empty() {
            return Err(GatewayError::TargetNotFound("empty target address".into()));
        }
        if let Some(pooled) = self.usable(addr) {
            return Ok(pooled);
        }

        let gate = self
            .inner
            .dial_gates
            .entry(addr.to_string())
            .or_default()
            .clone();
        let _dialing = gate.lock().await;

        if let Some(pooled) = self.usable(addr) {
            return Ok(pooled);
        }
        self.dial(addr).await
    }

    async fn dial(&self, addr: &str) -> Result<Arc<PooledConnection<K::Conn>>> {
        let reconnect = self.inner.conns.contains_key(addr);
        let conn = self.inner.connector.connect(addr).await?;
        let pooled = Arc::new(PooledConnection {
            addr: addr.to_string(),
            conn,
            generation: self.inner.generations.fetch_add(1, Ordering::Relaxed) + 1,
            healthy: AtomicBool::new(true),
        });
        self.inner.conns.insert(addr.to_string(), pooled.clone());
        if reconnect {
            info!("🔄 reconnected to {} (generation {})", addr, pooled.generation);
        } else {
            info!("🔗 connected to {}", addr);
        }
        Ok(pooled)
    }

    /// Remove `addr` from the pool.
    pub fn disconnect(&self, addr: &str) -> Result<()> {
        match self.inner.conns.remove(addr) {
            Some(_) => {
                self.inner.dial_gates.remove(addr);
                debug!("disconnected {}", addr);
                Ok(())
            }
            None => Err(GatewayError::TargetNotFound(format!(
                "no connection for {}",
                addr
            ))),
        }
    }

    pub fn close(&self) {
        let count = self.inner.conns.len();
        self.inner.conns.clear();
        self.inner.dial_gates.clear();
        info!("closed {} pooled connections", count);
    }

    /// Resolve `addrs` to live connections, preserving caller order.
    pub async fn resolve(
        &self,
        cancel: &CancellationToken,
        addrs: &[String],
    ) -> Result<Targets<K::Conn>> {
        if addrs.is_empty() {
            return Err(GatewayError::TargetNotFound(
                "no target addresses given".into(),
            ));
        }
        let mut conns = Vec::with_capacity(addrs.len());
        for addr in addrs {
            let pooled = tokio::select! {
                _ = cancel.cancelled() => return Err(GatewayError::Canceled),
                pooled = self.connect(addr) => pooled?,
            };
            conns.push(pooled);
        }
        Ok(Targets { conns })
    }

    /// Execute `f` against exactly one address.
    pub async fn do_call<T, F, Fut>(&self, cancel: &CancellationToken, addr: &str, f: F) -> Result<T>
    where
        F: FnOnce(String, K::Conn) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let addrs = [addr.to_string()];
        let targets = self.resolve(cancel, &addrs).await?;
        tokio::select! {
            _ = cancel.cancelled() => Err(GatewayError::Canceled),
            result = targets.call(f) => result,
        }
    }

    /// Execute `f` against each address strictly in order, feeding each
    /// output into the next call.
    pub async fn ordered_range<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        addrs: &[String],
        input: T,
        f: F,
    ) -> Result<T>
    where
        F: FnMut(T, String, K::Conn) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let targets = self.resolve(cancel, addrs).await?;
        tokio::select! {
            _ = cancel.cancelled() => Err(GatewayError::Canceled),
            result = targets.pipeline(input, f) => result,
        }
    }

    fn sorted_addrs(&self) -> Vec<String> {
        let mut addrs: Vec<String> = self.inner.conns.iter().map(|e| e.key().clone()).collect();
        addrs.sort();
        addrs
    }

    /// The next `n` distinct addresses in round-robin order.
    pub fn next_addrs(&self, n: usize) -> Vec<String> {
        let addrs = self.sorted_addrs();
        if addrs.is_empty() || n == 0 {
            return Vec::new();
        }
        let start = self.inner.cursor.fetch_add(1, Ordering::Relaxed);
        (0..n.min(addrs.len()))
            .map(|i| addrs[(start + i) % addrs.len()].clone())
            .collect()
    }

    /// Execute `f` against one known connection, chosen round robin.
    pub async fn round_robin<T, F, Fut>(&self, cancel: &CancellationToken, f: F) -> Result<T>
    where
        F: FnOnce(String, K::Conn) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let addr = self
            .next_addrs(1)
            .pop()
            .ok_or_else(|| GatewayError::TargetNotFound("connection pool is empty".into()))?;
        self.do_call(cancel, &addr, f).await
    }

    /// Invoke `f` concurrently against every known connection.
    ///
    /// Per-target failures are collected and joined; they do not stop sibling
    /// calls and successful side effects are not rolled back.
    pub async fn broadcast<F, Fut>(&self, cancel: &CancellationToken, f: F) -> Result<()>
    where
        F: Fn(String, K::Conn) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let addrs = self.sorted_addrs();
        self.fan_out(cancel, addrs, f).await.map(|_| ())
    }

    /// Like [`ConnectionPool::broadcast`] but hands back every target's
    /// outcome instead of joining the failures.
    pub async fn broadcast_settled<F, Fut>(
        &self,
        cancel: &CancellationToken,
        f: F,
    ) -> Result<Vec<(String, Result<()>)>>
    where
        F: Fn(String, K::Conn) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let addrs = self.sorted_addrs();
        if addrs.is_empty() {
            return Err(GatewayError::TargetNotFound(
                "no connections available for broadcast".into(),
            ));
        }
        Ok(self.settle(cancel, addrs, f).await)
    }

    /// Invoke `f` concurrently against the given addresses and collect the
    /// addresses whose call succeeded.
    pub async fn fan_out<F, Fut>(
        &self,
        cancel: &CancellationToken,
        addrs: Vec<String>,
        f: F,
    ) -> Result<Vec<String>>
    where
        F: Fn(String, K::Conn) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        if addrs.is_empty() {
            return Err(GatewayError::TargetNotFound(
                "no connections available for broadcast".into(),
            ));
        }

        let mut succeeded = Vec::new();
        let mut failures = Vec::new();
        for (addr, result) in self.settle(cancel, addrs, f).await {
            match result {
                Ok(()) => succeeded.push(addr),
                Err(err) => failures.push(err.context(format!("target {}", addr))),
            }
        }
        match GatewayError::join(failures) {
            Some(err) => Err(err),
            None => Ok(succeeded),
        }
    }

    /// Spawn one task per address and wait for all of them. Dropping the
    /// returned future aborts calls still in flight.
    async fn settle<F, Fut>(
        &self,
        cancel: &CancellationToken,
        addrs: Vec<String>,
        f: F,
    ) -> Vec<(String, Result<()>)>
    where
        F: Fn(String, K::Conn) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let mut calls = JoinSet::new();
        let mut task_addrs = HashMap::with_capacity(addrs.len());
        for addr in addrs {
            let pool = self.clone();
            let cancel = cancel.clone();
            let f = f.clone();
            let target = addr.clone();
            let handle = calls.spawn(async move {
                let call = async {
                    let pooled = pool.connect(&addr).await?;
                    let result = f(addr.clone(), pooled.conn()).await;
                    observe(&pooled, &result);
                    result
                };
                let result = tokio::select! {
                    _ = cancel.cancelled() => Err(GatewayError::Canceled),
                    result = call => result,
                };
                (addr, result)
            });
            task_addrs.insert(handle.id(), target);
        }

        let mut settled = Vec::with_capacity(calls.len());
        while let Some(joined) = calls.join_next().await {
            match joined {
                Ok((addr, result)) => {
                    if let Err(err) = &result {
                        debug!("broadcast call to {} failed: {}", addr, err);
                    }
                    settled.push((addr, result));
                }
                Err(join_err) => {
                    let addr = task_addrs.remove(&join_err.id()).unwrap_or_default();
                    warn!("broadcast task for {} failed: {}", addr, join_err);
                    settled.push((
                        addr,
                        Err(GatewayError::Internal(format!(
                            "broadcast task failed: {}",
                            join_err
                        ))),
                    ));
                }
            }
        }
        settled
    }

    /// Re-dial unhealthy connections every `interval` until `cancel` fires.
    pub fn start_health_monitor(
        &self,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let pool = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("health monitor stopped");
                        return;
                    }
                    _ = ticker.tick() => {
                        let (_, unhealthy) = pool.addrs();
                        if unhealthy.is_empty() {
                            continue;
                        }
                        warn!("reconnecting unhealthy targets: {:?}", unhealthy);
                        for addr in unhealthy {
                            if let Err(err) = pool.connect(&addr).await {
                                warn!("reconnect to {} failed: {}", addr, err);
                            }
                        }
                    }
                }
            }
        })
    }
}
