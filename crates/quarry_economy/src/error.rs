//! # Economy Error Types
//!
//! All errors that can occur in the economy system.

use std::path::PathBuf;

use thiserror::Error;

use crate::item::ItemKind;

/// Errors that can occur in the economy system.
#[derive(Error, Debug)]
pub enum EconomyError {
    /// An item tag that is not part of the catalogue.
    #[error("unknown item tag: {0:?}")]
    UnknownItem(String),

    /// Attempted to take more of an item than is held.
    #[error("insufficient items: need {required} {item}, have {available}")]
    InsufficientItems {
        /// The item that was missing.
        item: ItemKind,
        /// The amount required.
        required: u32,
        /// The amount available.
        available: u32,
    },

    /// Two recipes produce the same item, or share an input multiset.
    #[error("duplicate recipe for {0}")]
    DuplicateRecipe(ItemKind),

    /// The recipe graph contains a cycle (infinite resource generation).
    #[error("cycle detected in recipe book through {0:?}")]
    RecipeCycle(Vec<ItemKind>),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading a config or save file failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be encoded or decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for economy operations.
pub type EconomyResult<T> = Result<T, EconomyError>;
