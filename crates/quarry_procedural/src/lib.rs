//! # QUARRY World
//!
//! Deterministic terrain, chunk persistence and chunk streaming for QUARRY.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: Same seed and coordinate always produce the same block
//! 2. **Chunked**: The world is stored and streamed in 16x16 chunks
//! 3. **Sparse**: Only chunks that were ever active are written to storage
//! 4. **Forgiving**: Corrupt saves degrade to regenerated terrain, never a crash
//!
//! ## Core Components
//!
//! - `BlockType`: Block registry and categories
//! - `TerrainGenerator`: Pure coordinate -> block function
//! - `Chunk`: Generate-or-load, save and unload of one chunk
//! - `ChunkStore`: Filesystem, in-memory and background-writer storage
//! - `World`: Active 3x3 neighbourhood and block mutation routing
//!
//! ## Example
//!
//! ```rust
//! use quarry_procedural::{BlockType, GeneratorConfig, MemoryChunkStore, World, WorldConfig};
//!
//! let store = MemoryChunkStore::new();
//! let mut world = World::with_store(
//!     GeneratorConfig::default(),
//!     WorldConfig::default(),
//!     Box::new(store),
//! )
//! .unwrap();
//!
//! world.update_streaming(0.0, 4.0);
//! assert_eq!(world.block_at(2, 3), Some(BlockType::Press));
//! assert!(world.place_block(6, 4, BlockType::Chest));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod block;
pub mod chunk;
pub mod config;
pub mod error;
pub mod generator;
pub mod noise;
pub mod store;
pub mod world;

pub use block::{BlockCategory, BlockType};
pub use chunk::{Cell, Chunk, ChunkCoord, ChunkOrigin, LocalPos, StoredBlock, CELLS_PER_CHUNK, CHUNK_SIZE};
pub use config::{GeneratorConfig, WorldConfig, MAX_VIEW_RADIUS};
pub use error::{StoreError, StoreResult};
pub use generator::{Biome, TerrainGenerator, GENERATOR_VERSION};
pub use noise::{band_noise, coordinate_roll, WorldSeed};
pub use store::{
    check_manifest, BackgroundStats, BackgroundStore, ChunkStore, FsChunkStore, MemoryChunkStore,
    WorldManifest, MANIFEST_BLOB,
};
pub use world::{Dismantled, StreamingDelta, World, WorldStats};
