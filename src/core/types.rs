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

use crate::core::error::{GatewayError, Result};
use crate::proto::payload::{FilterConfig, FilterTarget, ObjectVector};

/// Vectors shorter than this are rejected on the write path.
pub const MINIMUM_VECTOR_DIMENSION: usize = 2;

pub const DEFAULT_FILTER_HOST: &str = "localhost";

impl FilterTarget {
    /// `host:port`, with an empty host read as localhost.
    pub fn addr(&self) -> String {
        let host = if self.host.is_empty() {
            DEFAULT_FILTER_HOST
        } else {
            self.host.as_str()
        };
        format!("{}:{}", host, self.port)
    }
}

/// Server defaults first, then the request's own targets.
pub fn filter_addrs(defaults: &[String], request: Option<&FilterConfig>) -> Vec<String> {
    let targets = request.map(|f| f.targets.as_slice()).unwrap_or_default();
    let mut addrs = Vec::with_capacity(defaults.len() + targets.len());
    addrs.extend(defaults.iter().cloned());
    addrs.extend(targets.iter().map(FilterTarget::addr));
    addrs
}

pub fn validate_dimension(vector: &ObjectVector) -> Result<()> {
    if vector.vector.len() < MINIMUM_VECTOR_DIMENSION {
        return Err(GatewayError::InvalidArgument(format!(
            "vector dimension {} for id {:?} is below the minimum of {}",
            vector.vector.len(),
            vector.id,
            MINIMUM_VECTOR_DIMENSION
        )));
    }
    Ok(())
}
