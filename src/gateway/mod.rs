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

//! Request orchestration: filter pipeline, backend seam, batch and stream adapters

pub mod backend;
pub mod handler;
pub mod metadata;
pub mod multi;
pub mod stream;

pub use backend::{ShardBackend, VectorBackend, WriteOp};
pub use handler::{Gateway, Inbound};
pub use metadata::MetaBackend;
pub use multi::Batch;
pub use stream::{ResponseStream, StreamResponse, StreamStatus};
