//! # Persistence Error Types
//!
//! Everything that can go wrong moving chunks between memory and storage.
//! None of these are fatal to a tick; callers log them and keep the
//! in-memory state authoritative.

use std::path::PathBuf;

use thiserror::Error;

use crate::chunk::ChunkCoord;

/// Errors raised by chunk stores and the world.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A chunk or blob could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// A chunk file is not valid JSON at all.
    #[error("chunk ({}, {}) is unreadable: {source}", coord.x, coord.y)]
    Decode {
        /// Chunk whose file is corrupt.
        coord: ChunkCoord,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },

    /// The background writer thread is gone.
    #[error("background persistence worker has stopped")]
    WorkerStopped,

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for persistence operations.
pub type StoreResult<T> = Result<T, StoreError>;
