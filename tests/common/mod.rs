//! Common utilities for integration tests
//!
//! An in-process fleet: every address is a scripted node that answers the
//! agent, filter and egress contracts without a network.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tonic::{Code, Status};

use vectorgate::client::{AgentRpc, EgressFilterRpc, IngressFilterRpc};
use vectorgate::core::error::{GatewayError, Result};
use vectorgate::meta::{MemoryKvStore, MetaService};
use vectorgate::net::{ConnectionPool, Connector};
use vectorgate::proto::payload::{
    ObjectBlob, ObjectDistance, ObjectId, ObjectLocation, ObjectVector, RemoveRequest,
    SearchIdRequest, SearchRequest, SearchResponse, WriteRequest,
};

/// Initialize test environment
pub fn init_test_env() {
    vectorgate::core::logging::init_tracing("vectorgate=debug");
}

/// Behavior of one scripted address
#[derive(Debug, Clone, Default)]
pub struct Node {
    /// Answer to every search variant
    pub results: Vec<ObjectDistance>,
    pub delay: Option<Duration>,
    /// Every call fails with this code
    pub fail: Option<Code>,
    pub objects: HashMap<String, Vec<f32>>,
    /// Filters add this to every element or distance
    pub offset: f32,
    /// Filters return vectors without their id
    pub drop_id: bool,
}

impl Node {
    pub fn with_results(results: Vec<ObjectDistance>) -> Self {
        Self {
            results,
            ..Default::default()
        }
    }

    pub fn failing(code: Code) -> Self {
        Self {
            fail: Some(code),
            ..Default::default()
        }
    }

    pub fn filter(offset: f32) -> Self {
        Self {
            offset,
            ..Default::default()
        }
    }

    pub fn holding(id: &str, vector: Vec<f32>) -> Self {
        let mut node = Self::default();
        node.objects.insert(id.to_string(), vector);
        node
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Default)]
pub struct Fleet {
    nodes: Mutex<HashMap<String, Node>>,
    refused: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, &'static str)>>,
    dials: Mutex<HashMap<String, usize>>,
}

impl Fleet {
    pub fn add(&self, addr: &str, node: Node) {
        self.nodes.lock().insert(addr.to_string(), node);
    }

    pub fn refuse(&self, addr: &str) {
        self.refused.lock().insert(addr.to_string());
    }

    pub fn calls(&self, addr: &str, method: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(a, m)| a == addr && *m == method)
            .count()
    }

    pub fn total_calls(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|(_, m)| *m == method).count()
    }

    pub fn dials(&self, addr: &str) -> usize {
        self.dials.lock().get(addr).copied().unwrap_or(0)
    }

    pub fn object(&self, addr: &str, id: &str) -> Option<Vec<f32>> {
        self.nodes
            .lock()
            .get(addr)
            .and_then(|n| n.objects.get(id).cloned())
    }
}

#[derive(Clone, Default)]
pub struct MockConnector {
    pub fleet: Arc<Fleet>,
}

#[async_trait]
impl Connector for MockConnector {
    type Conn = MockConn;

    async fn connect(&self, addr: &str) -> Result<MockConn> {
        if self.fleet.refused.lock().contains(addr) {
            return Err(GatewayError::connection(addr, "connection refused"));
        }
        *self.fleet.dials.lock().entry(addr.to_string()).or_default() += 1;
        Ok(MockConn {
            addr: addr.to_string(),
            fleet: self.fleet.clone(),
        })
    }
}

#[derive(Clone)]
pub struct MockConn {
    addr: String,
    fleet: Arc<Fleet>,
}

impl MockConn {
    /// Record the call and apply the node's delay and scripted failure.
    async fn enter(&self, method: &'static str) -> std::result::Result<Node, Status> {
        self.fleet.calls.lock().push((self.addr.clone(), method));
        let node = self
            .fleet
            .nodes
            .lock()
            .get(&self.addr)
            .cloned()
            .ok_or_else(|| Status::unavailable(format!("{} is not part of the fleet", self.addr)))?;
        if let Some(delay) = node.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(code) = node.fail {
            return Err(Status::new(code, format!("scripted {} failure on {}", method, self.addr)));
        }
        Ok(node)
    }

    fn with_objects<T>(&self, f: impl FnOnce(&mut HashMap<String, Vec<f32>>) -> T) -> T {
        let mut nodes = self.fleet.nodes.lock();
        let node = nodes.entry(self.addr.clone()).or_default();
        f(&mut node.objects)
    }

    fn located(&self, id: String) -> ObjectLocation {
        ObjectLocation {
            name: id.clone(),
            uuid: id,
            ips: vec![self.addr.clone()],
        }
    }

    async fn transform(&self, method: &'static str, req: ObjectVector) -> std::result::Result<ObjectVector, Status> {
        let node = self.enter(method).await?;
        Ok(ObjectVector {
            id: if node.drop_id { String::new() } else { req.id },
            vector: req.vector.iter().map(|v| v + node.offset).collect(),
        })
    }

    fn respond(node: Node, request_id: String) -> SearchResponse {
        SearchResponse {
            request_id,
            results: node.results,
        }
    }
}

fn request_id<T>(config: &Option<T>, get: impl Fn(&T) -> String) -> String {
    config.as_ref().map(get).unwrap_or_default()
}

#[async_trait]
impl AgentRpc for MockConn {
    async fn search(&self, req: SearchRequest) -> std::result::Result<SearchResponse, Status> {
        let node = self.enter("search").await?;
        Ok(Self::respond(node, request_id(&req.config, |c| c.request_id.clone())))
    }

    async fn search_by_id(&self, req: SearchIdRequest) -> std::result::Result<SearchResponse, Status> {
        let node = self.enter("search_by_id").await?;
        Ok(Self::respond(node, request_id(&req.config, |c| c.request_id.clone())))
    }

    async fn linear_search(&self, req: SearchRequest) -> std::result::Result<SearchResponse, Status> {
        let node = self.enter("linear_search").await?;
        Ok(Self::respond(node, request_id(&req.config, |c| c.request_id.clone())))
    }

    async fn linear_search_by_id(
        &self,
        req: SearchIdRequest,
    ) -> std::result::Result<SearchResponse, Status> {
        let node = self.enter("linear_search_by_id").await?;
        Ok(Self::respond(node, request_id(&req.config, |c| c.request_id.clone())))
    }

    async fn insert(&self, req: WriteRequest) -> std::result::Result<ObjectLocation, Status> {
        self.enter("insert").await?;
        let vector = req.vector.unwrap_or_default();
        let id = vector.id.clone();
        let inserted = self.with_objects(|objects| {
            if objects.contains_key(&id) {
                return false;
            }
            objects.insert(id.clone(), vector.vector);
            true
        });
        if !inserted {
            return Err(Status::already_exists(id));
        }
        Ok(self.located(id))
    }

    async fn update(&self, req: WriteRequest) -> std::result::Result<ObjectLocation, Status> {
        self.enter("update").await?;
        let vector = req.vector.unwrap_or_default();
        let id = vector.id.clone();
        self.with_objects(|objects| objects.insert(id.clone(), vector.vector));
        Ok(self.located(id))
    }

    async fn upsert(&self, req: WriteRequest) -> std::result::Result<ObjectLocation, Status> {
        self.enter("upsert").await?;
        let vector = req.vector.unwrap_or_default();
        let id = vector.id.clone();
        self.with_objects(|objects| objects.insert(id.clone(), vector.vector));
        Ok(self.located(id))
    }

    async fn remove(&self, req: RemoveRequest) -> std::result::Result<ObjectLocation, Status> {
        self.enter("remove").await?;
        let id = req.id.unwrap_or_default().id;
        match self.with_objects(|objects| objects.remove(&id)) {
            Some(_) => Ok(self.located(id)),
            None => Err(Status::not_found(id)),
        }
    }

    async fn get_object(&self, req: ObjectId) -> std::result::Result<ObjectVector, Status> {
        self.enter("get_object").await?;
        match self.with_objects(|objects| objects.get(&req.id).cloned()) {
            Some(vector) => Ok(ObjectVector { id: req.id, vector }),
            None => Err(Status::not_found(req.id)),
        }
    }

    async fn exists(&self, req: ObjectId) -> std::result::Result<ObjectId, Status> {
        self.enter("exists").await?;
        if self.with_objects(|objects| objects.contains_key(&req.id)) {
            Ok(req)
        } else {
            Err(Status::not_found(req.id))
        }
    }
}

#[async_trait]
impl IngressFilterRpc for MockConn {
    async fn gen_vector(&self, req: ObjectBlob) -> std::result::Result<ObjectVector, Status> {
        self.enter("gen_vector").await?;
        Ok(ObjectVector {
            id: req.id,
            vector: req.object.iter().map(|b| *b as f32).collect(),
        })
    }

    async fn filter_vector(&self, req: ObjectVector) -> std::result::Result<ObjectVector, Status> {
        self.transform("ingress_filter_vector", req).await
    }
}

#[async_trait]
impl EgressFilterRpc for MockConn {
    async fn filter_distance(&self, req: ObjectDistance) -> std::result::Result<ObjectDistance, Status> {
        let node = self.enter("filter_distance").await?;
        Ok(ObjectDistance {
            id: req.id,
            distance: req.distance + node.offset,
        })
    }

    async fn filter_vector(&self, req: ObjectVector) -> std::result::Result<ObjectVector, Status> {
        self.transform("egress_filter_vector", req).await
    }
}

/// Pool over a fresh fleet, pre-connected to `addrs`
pub async fn pool_with(nodes: Vec<(&str, Node)>) -> (ConnectionPool<MockConnector>, Arc<Fleet>) {
    let connector = MockConnector::default();
    let fleet = connector.fleet.clone();
    let pool = ConnectionPool::new(connector);
    for (addr, node) in nodes {
        fleet.add(addr, node);
        pool.connect(addr).await.unwrap();
    }
    (pool, fleet)
}

/// Hands out one shared in-memory meta service for every address
#[derive(Clone)]
pub struct MetaConnector {
    pub service: MetaService<MemoryKvStore>,
}

impl Default for MetaConnector {
    fn default() -> Self {
        Self {
            service: MetaService::new(MemoryKvStore::new()),
        }
    }
}

#[async_trait]
impl Connector for MetaConnector {
    type Conn = MetaService<MemoryKvStore>;

    async fn connect(&self, addr: &str) -> Result<Self::Conn> {
        if addr.starts_with("down") {
            return Err(GatewayError::connection(addr, "connection refused"));
        }
        Ok(self.service.clone())
    }
}

pub fn dist(id: &str, distance: f32) -> ObjectDistance {
    ObjectDistance {
        id: id.to_string(),
        distance,
    }
}

pub fn vector(id: &str, values: &[f32]) -> ObjectVector {
    ObjectVector {
        id: id.to_string(),
        vector: values.to_vec(),
    }
}
