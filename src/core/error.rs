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

//! Gateway error taxonomy
//!
//! Lower layers (connection pool, outbound RPC clients) produce raw
//! [`GatewayError::Rpc`] / [`GatewayError::Connection`] values. The request
//! orchestration layer wraps them with [`GatewayError::wrap`] or
//! [`GatewayError::context`], which keeps the original error reachable
//! through [`std::error::Error::source`].

use thiserror::Error;
use tonic::Code;

#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("target not found: {0}")]
    TargetNotFound(String),

    #[error("failed to connect to {addr}: {reason}")]
    Connection { addr: String, reason: String },

    #[error("rpc call to {addr} failed: {status}")]
    Rpc {
        addr: String,
        #[source]
        status: tonic::Status,
    },

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("duplicate data: {0}")]
    DuplicateData(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("request canceled")]
    Canceled,

    #[error("deadline exceeded after {0}ms")]
    DeadlineExceeded(u64),

    /// Request-scoped wrapper. `code` is the status the caller observes.
    #[error("{context}: {source}")]
    Context {
        code: Code,
        context: String,
        #[source]
        source: Box<GatewayError>,
    },

    /// Aggregate of independent failures (batch operations, broadcasts).
    #[error("{}", join_messages(.0))]
    Joined(Vec<GatewayError>),
}

fn join_messages(errors: &[GatewayError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl GatewayError {
    pub fn rpc(addr: impl Into<String>, status: tonic::Status) -> Self {
        Self::Rpc {
            addr: addr.into(),
            status,
        }
    }

    pub fn connection(addr: impl Into<String>, reason: impl ToString) -> Self {
        Self::Connection {
            addr: addr.into(),
            reason: reason.to_string(),
        }
    }

    /// Wrap with diagnostic context and an explicit outward status code.
    pub fn wrap(self, code: Code, context: impl Into<String>) -> Self {
        Self::Context {
            code,
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Wrap with diagnostic context, keeping the current status code.
    pub fn context(self, context: impl Into<String>) -> Self {
        let code = self.code();
        self.wrap(code, context)
    }

    /// Fold a list of failures into one error. Returns `None` for an empty list.
    pub fn join(mut errors: Vec<GatewayError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Joined(errors)),
        }
    }

    pub fn code(&self) -> Code {
        match self {
            Self::InvalidArgument(_) => Code::InvalidArgument,
            Self::TargetNotFound(_) | Self::Connection { .. } | Self::Unavailable(_) => {
                Code::Unavailable
            }
            Self::Rpc { status, .. } => status.code(),
            Self::AlreadyExists(_) | Self::DuplicateData(_) => Code::AlreadyExists,
            Self::NotFound(_) => Code::NotFound,
            Self::Internal(_) => Code::Internal,
            Self::Canceled => Code::Cancelled,
            Self::DeadlineExceeded(_) => Code::DeadlineExceeded,
            Self::Context { code, .. } => *code,
            Self::Joined(errors) => {
                let mut codes = errors.iter().map(|e| e.code());
                match codes.next() {
                    Some(first) if codes.all(|c| c == first) => first,
                    Some(_) => Code::Internal,
                    None => Code::Unknown,
                }
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Code::NotFound
    }

    /// True when the failure says something about the connection itself,
    /// which makes the pooled channel a reconnect candidate.
    pub fn is_transport_failure(&self) -> bool {
        match self {
            Self::Connection { .. } => true,
            Self::Rpc { status, .. } => status.code() == Code::Unavailable,
            Self::Context { source, .. } => source.is_transport_failure(),
            _ => false,
        }
    }

    /// Innermost error of a wrapping chain.
    pub fn root(&self) -> &GatewayError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<GatewayError> for tonic::Status {
    fn from(err: GatewayError) -> Self {
        tonic::Status::new(err.code(), err.to_string())
    }
}

impl From<anyhow::Error> for GatewayError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{:#}", err))
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
