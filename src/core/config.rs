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

//! Gateway configuration
//!
//! Constructed once at startup (from TOML, JSON or code) and handed to the
//! component constructors by reference.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::core::error::{GatewayError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub pool: PoolConfig,
    pub search: SearchDefaults,
    pub filters: FilterSettings,
    pub meta: MetaConfig,
    /// Maximum number of in-flight items per bidirectional stream
    pub stream_concurrency: usize,
    /// Maximum number of in-flight sub-requests per Multi* batch
    pub multi_concurrency: usize,
    /// Number of shards each written object is replicated to
    pub replica: usize,
}

/// Dial options and health cadence for pooled connections
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Static shard (agent) addresses, `host:port`
    pub agent_addrs: Vec<String>,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub health_check_interval_ms: u64,
    pub tcp_nodelay: bool,
    pub keepalive_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// The first shard error aborts the whole search episode
    FailFast,
    /// Surviving shards' results are returned along with the per-shard errors
    BestEffort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchDefaults {
    /// Episode timeout used when the request carries none
    pub timeout_ms: u64,
    pub failure_policy: FailurePolicy,
}

/// Server-level default filter target lists (`host:port` each)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub vectorizer: Option<String>,
    pub distance_filters: Vec<String>,
    pub object_filters: Vec<String>,
    pub search_filters: Vec<String>,
    pub insert_filters: Vec<String>,
    pub update_filters: Vec<String>,
    pub upsert_filters: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaConfig {
    /// Metadata store address; the bridge is disabled when unset
    pub addr: Option<String>,
    pub enable_cache: bool,
    pub cache_capacity: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            search: SearchDefaults::default(),
            filters: FilterSettings::default(),
            meta: MetaConfig::default(),
            stream_concurrency: 20,
            multi_concurrency: 64,
            replica: 1,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            agent_addrs: Vec::new(),
            connect_timeout_ms: 3_000,
            request_timeout_ms: 10_000,
            health_check_interval_ms: 5_000,
            tcp_nodelay: true,
            keepalive_interval_ms: Some(30_000),
        }
    }
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            timeout_ms: 3_000,
            failure_policy: FailurePolicy::FailFast,
        }
    }
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            addr: None,
            enable_cache: false,
            cache_capacity: 10_000,
        }
    }
}

impl GatewayConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| GatewayError::InvalidArgument(format!("TOML parsing error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| GatewayError::InvalidArgument(format!("JSON parsing error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::InvalidArgument(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.stream_concurrency == 0 {
            return Err(invalid("stream_concurrency", "0"));
        }
        if self.multi_concurrency == 0 {
            return Err(invalid("multi_concurrency", "0"));
        }
        if self.replica == 0 {
            return Err(invalid("replica", "0"));
        }
        if self.pool.health_check_interval_ms == 0 {
            return Err(invalid("pool.health_check_interval_ms", "0"));
        }
        if self.search.timeout_ms == 0 {
            return Err(invalid("search.timeout_ms", "0"));
        }
        if self.meta.enable_cache && self.meta.cache_capacity == 0 {
            return Err(invalid("meta.cache_capacity", "0"));
        }
        let lists = [
            ("pool.agent_addrs", &self.pool.agent_addrs),
            ("filters.distance_filters", &self.filters.distance_filters),
            ("filters.object_filters", &self.filters.object_filters),
            ("filters.search_filters", &self.filters.search_filters),
            ("filters.insert_filters", &self.filters.insert_filters),
            ("filters.update_filters", &self.filters.update_filters),
            ("filters.upsert_filters", &self.filters.upsert_filters),
        ];
        for (field, addrs) in lists {
            if let Some(bad) = addrs.iter().find(|a| a.trim().is_empty()) {
                return Err(invalid(field, bad));
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, value: &str) -> GatewayError {
    GatewayError::InvalidArgument(format!(
        "Invalid configuration value: {} = {:?}",
        field, value
    ))
}

impl PoolConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }
}

impl SearchDefaults {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
