// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types

use std::fmt;

use crate::pool::PoolId;

/// ECS error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Entity not found
    EntityNotFound,

    /// Component not found
    ComponentNotFound,

    /// Entity already owns a component of this type
    ComponentAlreadyExists,

    /// Pool id is not registered in this world
    PoolNotFound(PoolId),

    /// Query has no inclusion components to bound iteration
    EmptyQuery,

    /// Query was built against a different world
    WorldMismatch,

    /// Chunk size must be positive
    InvalidChunkSize,

    /// Structural mutation attempted while parallel work is in flight
    StructuralChangeBlocked { blockers: isize },

    /// Worker thread pool could not be created
    ThreadPoolBuild(String),

    /// A chunk callback panicked
    ChunkPanicked {
        worker: usize,
        from: usize,
        before: usize,
        message: String,
    },

    /// Error raised by user callback code
    Callback(String),

    /// Tracing subscriber could not be installed
    ProfilingSetup(String),

    /// IO error (trace files, etc.)
    IoError(String),
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::EntityNotFound => write!(f, "Entity not found"),
            EcsError::ComponentNotFound => write!(f, "Component not found"),
            EcsError::ComponentAlreadyExists => write!(f, "Component already exists on entity"),
            EcsError::PoolNotFound(id) => write!(f, "Pool not found: {id:?}"),
            EcsError::EmptyQuery => write!(f, "Query has no inclusion components"),
            EcsError::WorldMismatch => write!(f, "Query belongs to a different world"),
            EcsError::InvalidChunkSize => write!(f, "Chunk size must be greater than zero"),
            EcsError::StructuralChangeBlocked { blockers } => {
                write!(f, "Structural change blocked ({blockers} active blockers)")
            }
            EcsError::ThreadPoolBuild(msg) => write!(f, "Thread pool build error: {msg}"),
            EcsError::ChunkPanicked {
                worker,
                from,
                before,
                message,
            } => write!(
                f,
                "Chunk [{from}, {before}) panicked on worker {worker}: {message}"
            ),
            EcsError::Callback(msg) => write!(f, "Callback error: {msg}"),
            EcsError::ProfilingSetup(msg) => write!(f, "Profiling setup error: {msg}"),
            EcsError::IoError(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for EcsError {}

impl From<std::io::Error> for EcsError {
    fn from(err: std::io::Error) -> Self {
        EcsError::IoError(err.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for EcsError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        EcsError::ThreadPoolBuild(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsError>;
