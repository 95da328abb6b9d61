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

//! Bidirectional stream adapter for the Stream* operations
//!
//! Every inbound message is handled on its own task, bounded by a semaphore,
//! and produces exactly one outbound message. A failed item becomes a
//! [`StreamResponse::Status`] and the stream keeps going; only an inbound
//! transport error ends it. Outbound order is completion order.

use futures::{Stream, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::error::{GatewayError, Result};

/// Status payload carried in-band for one failed stream item
#[derive(Debug, Clone, PartialEq)]
pub struct StreamStatus {
    pub code: tonic::Code,
    pub message: String,
}

impl From<&GatewayError> for StreamStatus {
    fn from(err: &GatewayError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamResponse<T> {
    Response(T),
    Status(StreamStatus),
}

impl<T> StreamResponse<T> {
    pub fn into_result(self) -> std::result::Result<T, StreamStatus> {
        match self {
            StreamResponse::Response(value) => Ok(value),
            StreamResponse::Status(status) => Err(status),
        }
    }
}

pub type ResponseStream<T> = ReceiverStream<std::result::Result<StreamResponse<T>, tonic::Status>>;

pub fn bidirectional<Req, Resp, S, F, Fut>(
    cancel: CancellationToken,
    inbound: S,
    concurrency: usize,
    handler: F,
) -> ResponseStream<Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    S: Stream<Item = std::result::Result<Req, tonic::Status>> + Send + Unpin + 'static,
    F: Fn(CancellationToken, Req) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Resp>> + Send + 'static,
{
    // every permit must be acquirable in one acquire_many call
    let concurrency = concurrency.clamp(1, Semaphore::MAX_PERMITS.min(u32::MAX as usize));
    let (tx, rx) = mpsc::channel(concurrency);

    tokio::spawn(async move {
        let mut inbound = inbound;
        let limiter = Arc::new(Semaphore::new(concurrency));
        let mut received = 0usize;

        let terminal = loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => break None,
                next = inbound.next() => next,
            };
            let req = match next {
                None => break None,
                Some(Err(status)) => break Some(status),
                Some(Ok(req)) => req,
            };
            received += 1;

            let permit = tokio::select! {
                _ = cancel.cancelled() => {
                    // the message was taken off the wire, so it still gets its reply
                    let status = StreamStatus::from(&GatewayError::Canceled);
                    let _ = tx.send(Ok(StreamResponse::Status(status))).await;
                    break None;
                }
                permit = limiter.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break None,
                },
            };
            let tx = tx.clone();
            let handler = handler.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let _permit = permit;
                let message = match handler(cancel, req).await {
                    Ok(resp) => StreamResponse::Response(resp),
                    Err(err) => {
                        debug!("stream item failed: {}", err);
                        StreamResponse::Status(StreamStatus::from(&err))
                    }
                };
                let _ = tx.send(Ok(message)).await;
            });
        };

        if let Some(status) = terminal {
            warn!("inbound stream failed after {} messages: {}", received, status);
            // let in-flight items reply before the terminal error
            let _ = limiter
                .acquire_many(u32::try_from(concurrency).unwrap_or(u32::MAX))
                .await;
            let _ = tx.send(Err(status)).await;
        }
    });

    ReceiverStream::new(rx)
}
