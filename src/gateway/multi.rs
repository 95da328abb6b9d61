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

//! Bounded batch fan-out for the Multi* operations

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::error::{GatewayError, Result};

/// Per-item outcome of a batch. Slot `i` always belongs to request `i`.
#[derive(Debug)]
pub struct Batch<T> {
    pub items: Vec<Option<T>>,
    /// Every failed item, joined in request order.
    pub error: Option<GatewayError>,
}

impl<T> Batch<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// All items, or the joined error if any item failed.
    pub fn into_result(self) -> Result<Vec<T>> {
        if let Some(err) = self.error {
            return Err(err);
        }
        self.items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                item.ok_or_else(|| GatewayError::Internal(format!("batch item {} has no result", i)))
            })
            .collect()
    }
}

/// Run `f` over every request with at most `concurrency` in flight.
///
/// Failures do not stop sibling items. `describe` labels a failed item in the
/// joined error.
pub async fn apply<Req, Resp, D, F, Fut>(
    cancel: &CancellationToken,
    concurrency: usize,
    reqs: Vec<Req>,
    describe: D,
    f: F,
) -> Batch<Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    D: Fn(&Req) -> String,
    F: Fn(CancellationToken, Req) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Resp>> + Send + 'static,
{
    let total = reqs.len();
    let limiter = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut labels = Vec::with_capacity(total);
    let mut failures: Vec<(usize, GatewayError)> = Vec::new();
    let mut tasks = JoinSet::new();

    for (idx, req) in reqs.into_iter().enumerate() {
        labels.push(describe(&req));
        let permit = tokio::select! {
            _ = cancel.cancelled() => {
                failures.push((idx, GatewayError::Canceled));
                continue;
            }
            permit = limiter.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => {
                    failures.push((idx, GatewayError::Internal("batch limiter closed".into())));
                    continue;
                }
            },
        };
        let f = f.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let _permit = permit;
            (idx, f(cancel, req).await)
        });
    }

    let mut items: Vec<Option<Resp>> = (0..total).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, Ok(resp))) => items[idx] = Some(resp),
            Ok((idx, Err(err))) => failures.push((idx, err)),
            Err(join_err) => failures.push((
                total,
                GatewayError::Internal(format!("batch task failed: {}", join_err)),
            )),
        }
    }

    failures.sort_by_key(|(idx, _)| *idx);
    if !failures.is_empty() {
        debug!("{} of {} batch items failed", failures.len(), total);
    }
    let error = GatewayError::join(
        failures
            .into_iter()
            .map(|(idx, err)| match labels.get(idx) {
                Some(label) => err.context(format!("item {} ({})", idx, label)),
                None => err,
            })
            .collect(),
    );
    Batch { items, error }
}
