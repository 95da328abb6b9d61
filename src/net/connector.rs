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

//! Dialing seam between the connection pool and the transport

use async_trait::async_trait;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

use crate::core::config::PoolConfig;
use crate::core::error::{GatewayError, Result};

/// Establishes connections for the pool.
///
/// The connection handle must be cheap to clone and safe to share between
/// concurrent requests; the pool never hands out exclusive ownership.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Conn: Clone + Send + Sync + 'static;

    async fn connect(&self, addr: &str) -> Result<Self::Conn>;

    /// Connectivity probe for an established handle.
    fn is_healthy(&self, conn: &Self::Conn) -> bool {
        let _ = conn;
        true
    }
}

/// Dials tonic channels with the configured dial options
#[derive(Debug, Clone)]
pub struct GrpcConnector {
    connect_timeout: Duration,
    request_timeout: Duration,
    tcp_nodelay: bool,
    keepalive_interval: Option<Duration>,
}

impl GrpcConnector {
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            request_timeout: config.request_timeout(),
            tcp_nodelay: config.tcp_nodelay,
            keepalive_interval: config.keepalive_interval_ms.map(Duration::from_millis),
        }
    }

    fn endpoint(&self, addr: &str) -> Result<Endpoint> {
        let uri = if addr.contains("://") {
            addr.to_string()
        } else {
            format!("http://{}", addr)
        };
        let mut endpoint = Endpoint::from_shared(uri)
            .map_err(|e| GatewayError::connection(addr, e))?
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .tcp_nodelay(self.tcp_nodelay);
        if let Some(interval) = self.keepalive_interval {
            endpoint = endpoint
                .http2_keep_alive_interval(interval)
                .keep_alive_while_idle(true);
        }
        Ok(endpoint)
    }
}

#[async_trait]
impl Connector for GrpcConnector {
    type Conn = Channel;

    async fn connect(&self, addr: &str) -> Result<Channel> {
        debug!("dialing {}", addr);
        self.endpoint(addr)?
            .connect()
            .await
            .map_err(|e| GatewayError::connection(addr, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_accepts_bare_and_schemed_addrs() {
        let connector = GrpcConnector::new(&PoolConfig::default());
        assert!(connector.endpoint("agent-0:8081").is_ok());
        assert!(connector.endpoint("http://agent-0:8081").is_ok());
    }

    #[tokio::test]
    async fn test_connect_refused_is_connection_error() {
        let config = PoolConfig {
            connect_timeout_ms: 200,
            ..Default::default()
        };
        let connector = GrpcConnector::new(&config);
        // port 1 on loopback is not expected to accept gRPC connections
        let err = connector.connect("127.0.0.1:1").await.unwrap_err();
        assert!(matches!(err, GatewayError::Connection { .. }));
        assert!(err.is_transport_failure());
    }
}
