//! # Simulation Error Types
//!
//! Failures surfaced to the layer driving the simulation. A tick itself
//! never returns one; these come from setup, saving and player commands.

use quarry_economy::EconomyError;
use quarry_procedural::StoreError;
use thiserror::Error;

/// Errors raised by the simulation.
#[derive(Error, Debug)]
pub enum SimError {
    /// Configuration is unreadable or inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// Chunk or blob storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Inventory or recipe operation failed.
    #[error(transparent)]
    Economy(#[from] EconomyError),
}

/// Result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;
