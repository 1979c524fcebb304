//! # World Manager
//!
//! Owns the active chunks around the player and routes every block
//! mutation to the chunk that owns the coordinate.
//!
//! ## Streaming
//!
//! The needed set is the `(2r+1)²` square of chunks centred on the
//! player's chunk. Each call to `update_streaming` unloads active chunks
//! outside the square, then brings in the missing ones. Calling it again
//! from the same chunk does nothing.
//!
//! ## Failed Saves
//!
//! A chunk whose unload save fails is moved to a retained set instead of
//! being dropped. Retained chunks are not simulated and not reported as
//! active, but their in-memory state stays authoritative:
//!
//! - every later streaming update and `save_all` retries the save;
//! - if the player comes back first, the retained chunk is reactivated
//!   as-is rather than reloaded from a stale file.

use std::collections::{HashMap, HashSet};

use quarry_economy::{EconomyConfig, FeedOutcome, ItemKind, RecipeBook};

use crate::block::BlockType;
use crate::chunk::{Cell, Chunk, ChunkCoord, ChunkOrigin, LocalPos};
use crate::config::{GeneratorConfig, WorldConfig};
use crate::error::{StoreError, StoreResult};
use crate::generator::TerrainGenerator;
use crate::store::{check_manifest, BackgroundStore, ChunkStore, FsChunkStore, WorldManifest};

/// Chunks that changed state in one streaming update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamingDelta {
    /// Chunks that became active.
    pub loaded: Vec<ChunkCoord>,
    /// Chunks that left the active set.
    pub unloaded: Vec<ChunkCoord>,
}

impl StreamingDelta {
    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty() && self.unloaded.is_empty()
    }
}

/// Lifetime counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorldStats {
    /// Chunks produced by the generator (including regenerated ones).
    pub generated: u64,
    /// Chunks decoded from the store.
    pub loaded_from_store: u64,
    /// Chunks saved and released.
    pub unloaded: u64,
    /// Save attempts that failed.
    pub save_failures: u64,
}

/// A removed block together with everything its device held.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dismantled {
    /// Block that stood in the cell.
    pub block: BlockType,
    /// Device contents, one entry per stored unit.
    pub contents: Vec<ItemKind>,
}

/// The streamed world.
pub struct World {
    generator: TerrainGenerator,
    config: WorldConfig,
    store: Box<dyn ChunkStore>,
    active: HashMap<ChunkCoord, Chunk>,
    retained: HashMap<ChunkCoord, Chunk>,
    manifest: WorldManifest,
    stats: WorldStats,
}

impl World {
    /// Opens a world backed by the directory in `config.save_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the streaming settings are out of range, the
    /// directory cannot be created, the writer thread cannot start, or the
    /// manifest cannot be read or written.
    pub fn open(generator: GeneratorConfig, config: WorldConfig) -> StoreResult<Self> {
        config.validate()?;
        let fs = FsChunkStore::open(&config.save_dir)?;
        let store: Box<dyn ChunkStore> = if config.background_persistence {
            Box::new(BackgroundStore::spawn(fs)?)
        } else {
            Box::new(fs)
        };
        Self::with_store(generator, config, store)
    }

    /// Opens a world over an arbitrary store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidConfig` for an out-of-range
    /// `view_radius`, or an error if the manifest cannot be read or written.
    pub fn with_store(
        generator: GeneratorConfig,
        config: WorldConfig,
        store: Box<dyn ChunkStore>,
    ) -> StoreResult<Self> {
        config.validate()?;
        let generator = TerrainGenerator::new(generator);
        let manifest = check_manifest(store.as_ref(), WorldManifest::current(generator.seed().value()))?;
        tracing::info!(
            view_radius = config.view_radius,
            seed = manifest.seed,
            generator_version = manifest.generator_version,
            "world opened"
        );
        Ok(Self {
            generator,
            config,
            store,
            active: HashMap::new(),
            retained: HashMap::new(),
            manifest,
            stats: WorldStats::default(),
        })
    }

    /// Brings the active set in line with the player's position, given in
    /// block units.
    pub fn update_streaming(&mut self, player_x: f32, player_y: f32) -> StreamingDelta {
        let center = ChunkCoord::from_block_pos(player_x.floor() as i32, player_y.floor() as i32);
        self.stream_around(center)
    }

    /// Brings the active set in line with a centre chunk.
    pub fn stream_around(&mut self, center: ChunkCoord) -> StreamingDelta {
        let radius = self.config.view_radius;
        let needed: HashSet<ChunkCoord> = center.neighborhood(radius).collect();
        let mut delta = StreamingDelta::default();

        self.retry_retained(&needed);

        let mut leaving: Vec<ChunkCoord> = self
            .active
            .keys()
            .filter(|coord| !needed.contains(coord))
            .copied()
            .collect();
        leaving.sort_unstable();
        for coord in leaving {
            if let Some(chunk) = self.active.remove(&coord) {
                self.release(chunk);
                delta.unloaded.push(coord);
            }
        }

        for coord in center.neighborhood(radius) {
            if self.active.contains_key(&coord) {
                continue;
            }
            let chunk = match self.retained.remove(&coord) {
                Some(chunk) => {
                    tracing::debug!(cx = coord.x, cy = coord.y, "retained chunk reactivated");
                    chunk
                }
                None => self.bring_in(coord),
            };
            self.active.insert(coord, chunk);
            delta.loaded.push(coord);
        }

        if !delta.is_empty() {
            tracing::debug!(
                cx = center.x,
                cy = center.y,
                loaded = delta.loaded.len(),
                unloaded = delta.unloaded.len(),
                "streaming updated"
            );
        }
        delta
    }

    fn bring_in(&mut self, coord: ChunkCoord) -> Chunk {
        let (chunk, origin) = Chunk::generate_or_load(coord, &self.generator, self.store.as_ref());
        match origin {
            ChunkOrigin::Loaded => self.stats.loaded_from_store += 1,
            ChunkOrigin::Generated | ChunkOrigin::Regenerated => self.stats.generated += 1,
        }
        chunk
    }

    fn release(&mut self, chunk: Chunk) {
        let coord = chunk.coord();
        match chunk.unload(self.store.as_ref()) {
            Ok(()) => self.stats.unloaded += 1,
            Err((chunk, e)) => {
                self.stats.save_failures += 1;
                tracing::error!(cx = coord.x, cy = coord.y, error = %e, "chunk save failed, retaining in memory");
                self.retained.insert(coord, *chunk);
            }
        }
    }

    /// Retries retained chunks the player is not standing near.
    fn retry_retained(&mut self, needed: &HashSet<ChunkCoord>) {
        let mut waiting: Vec<ChunkCoord> = self
            .retained
            .keys()
            .filter(|coord| !needed.contains(coord))
            .copied()
            .collect();
        waiting.sort_unstable();
        for coord in waiting {
            if let Some(chunk) = self.retained.remove(&coord) {
                self.release(chunk);
            }
        }
    }

    /// Saves every active chunk and retries every retained one.
    ///
    /// Every chunk is attempted even if an earlier one fails.
    ///
    /// # Errors
    ///
    /// Returns the last failure; the affected chunks stay in memory.
    pub fn save_all(&mut self) -> StoreResult<()> {
        let mut last_error: Option<StoreError> = None;

        for chunk in self.active.values_mut() {
            if let Err(e) = chunk.save(self.store.as_ref()) {
                let coord = chunk.coord();
                tracing::error!(cx = coord.x, cy = coord.y, error = %e, "chunk save failed");
                self.stats.save_failures += 1;
                last_error = Some(e);
            }
        }

        let before = self.stats.save_failures;
        self.retry_retained(&HashSet::new());
        if self.stats.save_failures > before {
            last_error = Some(StoreError::Io {
                path: self.config.save_dir.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("{} retained chunk(s) still unsaved", self.retained.len()),
                ),
            });
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Blocks until the store has made every accepted write durable.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn flush(&self) -> StoreResult<()> {
        self.store.flush()
    }

    fn chunk_of(&self, x: i32, y: i32) -> Option<(&Chunk, LocalPos)> {
        self.active
            .get(&ChunkCoord::from_block_pos(x, y))
            .map(|chunk| (chunk, LocalPos::from_world(x, y)))
    }

    fn chunk_of_mut(&mut self, x: i32, y: i32) -> Option<(&mut Chunk, LocalPos)> {
        self.active
            .get_mut(&ChunkCoord::from_block_pos(x, y))
            .map(|chunk| (chunk, LocalPos::from_world(x, y)))
    }

    /// Block at a world coordinate. `None` if its chunk is not active.
    #[must_use]
    pub fn block_at(&self, x: i32, y: i32) -> Option<BlockType> {
        self.chunk_of(x, y).map(|(chunk, local)| chunk.block(local))
    }

    /// Runtime cell at a world coordinate. `None` if empty or inactive.
    #[must_use]
    pub fn cell_at(&self, x: i32, y: i32) -> Option<&Cell> {
        self.chunk_of(x, y).and_then(|(chunk, local)| chunk.cell(local))
    }

    /// Mutable runtime cell. Marks the owning chunk dirty.
    pub fn cell_at_mut(&mut self, x: i32, y: i32) -> Option<&mut Cell> {
        self.chunk_of_mut(x, y).and_then(|(chunk, local)| chunk.cell_mut(local))
    }

    /// Overwrites a cell with a freshly placed block.
    ///
    /// Returns false, changing nothing, if the owning chunk is not active.
    pub fn place_block(&mut self, x: i32, y: i32, block: BlockType) -> bool {
        match self.chunk_of_mut(x, y) {
            Some((chunk, local)) => {
                chunk.set_cell(local, block);
                tracing::trace!(x, y, block = %block, "block placed");
                true
            }
            None => false,
        }
    }

    /// Empties a cell. Device state is discarded with it; use
    /// [`World::dismantle`] to keep the contents.
    ///
    /// Returns the removed cell, or `None` if the chunk is inactive or the
    /// cell was already empty.
    pub fn remove_block(&mut self, x: i32, y: i32) -> Option<Cell> {
        let (chunk, local) = self.chunk_of_mut(x, y)?;
        if chunk.cell(local).is_none() {
            return None;
        }
        chunk.clear_cell(local)
    }

    /// Empties a cell and returns its device contents in one step.
    pub fn dismantle(&mut self, x: i32, y: i32) -> Option<Dismantled> {
        let cell = self.remove_block(x, y)?;
        let contents = cell.device.map(|mut device| device.eject()).unwrap_or_default();
        tracing::debug!(x, y, block = %cell.block, items = contents.len(), "block dismantled");
        Some(Dismantled {
            block: cell.block,
            contents,
        })
    }

    /// Feeds one item into the device at a world coordinate.
    ///
    /// `None` if there is no device there or its chunk is inactive.
    pub fn feed_device(
        &mut self,
        x: i32,
        y: i32,
        item: ItemKind,
        recipes: &RecipeBook,
        economy: &EconomyConfig,
    ) -> Option<FeedOutcome> {
        let kind = self.cell_at(x, y)?.block.device_kind()?;
        let cell = self.cell_at_mut(x, y)?;
        Some(quarry_economy::feed(kind, cell.device.as_mut(), item, recipes, economy))
    }

    /// Returns true if the chunk is active.
    #[must_use]
    pub fn is_active(&self, coord: ChunkCoord) -> bool {
        self.active.contains_key(&coord)
    }

    /// Active chunk coordinates, sorted.
    #[must_use]
    pub fn active_coords(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<ChunkCoord> = self.active.keys().copied().collect();
        coords.sort_unstable();
        coords
    }

    /// Chunks held only because their save failed.
    #[must_use]
    pub fn retained_count(&self) -> usize {
        self.retained.len()
    }

    /// Every non-empty cell of every active chunk, for drawing.
    pub fn cells(&self) -> impl Iterator<Item = ((i32, i32), &Cell)> + '_ {
        self.active.values().flat_map(Chunk::cells)
    }

    /// Lifetime counters.
    #[must_use]
    pub const fn stats(&self) -> WorldStats {
        self.stats
    }

    /// The terrain generator.
    #[must_use]
    pub const fn generator(&self) -> &TerrainGenerator {
        &self.generator
    }

    /// Streaming settings.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The manifest recorded in the save.
    #[must_use]
    pub const fn manifest(&self) -> WorldManifest {
        self.manifest
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &dyn ChunkStore {
        self.store.as_ref()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("config", &self.config)
            .field("active", &self.active.len())
            .field("retained", &self.retained.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::store::MemoryChunkStore;

    /// Store whose chunk writes can be switched off from the test.
    struct SwitchableStore {
        inner: MemoryChunkStore,
        broken: Arc<AtomicBool>,
    }

    impl ChunkStore for SwitchableStore {
        fn load_chunk(&self, coord: ChunkCoord) -> StoreResult<Option<Vec<u8>>> {
            self.inner.load_chunk(coord)
        }
        fn save_chunk(&self, coord: ChunkCoord, bytes: Vec<u8>) -> StoreResult<()> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(StoreError::Io {
                    path: PathBuf::from("switchable"),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "read-only"),
                });
            }
            self.inner.save_chunk(coord, bytes)
        }
        fn load_blob(&self, name: &str) -> StoreResult<Option<Vec<u8>>> {
            self.inner.load_blob(name)
        }
        fn save_blob(&self, name: &str, bytes: Vec<u8>) -> StoreResult<()> {
            self.inner.save_blob(name, bytes)
        }
        fn flush(&self) -> StoreResult<()> {
            Ok(())
        }
    }

    fn memory_world(store: &MemoryChunkStore) -> World {
        World::with_store(
            GeneratorConfig::default(),
            WorldConfig::default(),
            Box::new(store.clone()),
        )
        .unwrap()
    }

    #[test]
    fn test_streaming_keeps_exact_neighborhood() {
        let mut world = memory_world(&MemoryChunkStore::new());
        let delta = world.update_streaming(0.5, 3.0);
        assert_eq!(delta.loaded.len(), 9);
        assert!(delta.unloaded.is_empty());

        let mut expected: Vec<ChunkCoord> = ChunkCoord::new(0, 0).neighborhood(1).collect();
        expected.sort_unstable();
        assert_eq!(world.active_coords(), expected);

        // Same chunk, no work.
        assert!(world.update_streaming(15.9, 0.0).is_empty());

        let delta = world.update_streaming(16.0, 0.0);
        assert_eq!(delta.loaded.len(), 3);
        assert_eq!(delta.unloaded.len(), 3);
        assert!(delta.unloaded.iter().all(|c| c.x == -1));
        assert!(world.is_active(ChunkCoord::new(2, 0)));
        assert!(!world.is_active(ChunkCoord::new(-1, 0)));
    }

    #[test]
    fn test_negative_positions_floor() {
        let mut world = memory_world(&MemoryChunkStore::new());
        world.update_streaming(-0.25, -0.25);
        assert!(world.is_active(ChunkCoord::new(-2, -2)));
        assert!(!world.is_active(ChunkCoord::new(1, 1)));
    }

    #[test]
    fn test_unloaded_chunks_are_saved() {
        let store = MemoryChunkStore::new();
        let mut world = memory_world(&store);
        world.update_streaming(0.0, 0.0);
        assert_eq!(store.chunk_count(), 0);

        world.update_streaming(100.0, 0.0);
        for coord in ChunkCoord::new(0, 0).neighborhood(1) {
            assert!(store.has_chunk(coord), "Chunk {coord} should be saved on unload");
        }
        assert_eq!(world.stats().unloaded, 9);
    }

    #[test]
    fn test_mutations_survive_reload() {
        let store = MemoryChunkStore::new();
        let mut world = memory_world(&store);
        let recipes = RecipeBook::standard();
        let economy = EconomyConfig::default();

        world.update_streaming(0.0, 0.0);
        assert!(world.place_block(10, 4, BlockType::Furnace));
        world.feed_device(10, 4, ItemKind::Copper, &recipes, &economy);
        assert_eq!(world.remove_block(10, 5).map(|c| c.block), Some(BlockType::Dust));

        world.update_streaming(500.0, 0.0);
        assert!(world.block_at(10, 4).is_none(), "Chunk should be inactive");
        world.update_streaming(0.0, 0.0);

        assert_eq!(world.block_at(10, 4), Some(BlockType::Furnace));
        assert_eq!(world.block_at(10, 5), Some(BlockType::Empty));
        let contents = world.cell_at(10, 4).and_then(|c| c.device.as_ref()).map(|d| d.contents());
        assert_eq!(contents, Some(vec![(ItemKind::Copper, 1)]));
        assert!(world.stats().loaded_from_store >= 1);
    }

    #[test]
    fn test_place_outside_active_is_noop() {
        let mut world = memory_world(&MemoryChunkStore::new());
        world.update_streaming(0.0, 0.0);
        assert!(!world.place_block(1000, 0, BlockType::Chest));
        assert!(world.remove_block(1000, 0).is_none());
        assert_eq!(world.block_at(1000, 0), None);
    }

    #[test]
    fn test_dismantle_returns_contents() {
        let mut world = memory_world(&MemoryChunkStore::new());
        let recipes = RecipeBook::standard();
        let economy = EconomyConfig::default();
        world.update_streaming(0.0, 0.0);

        // Sanctuary press.
        for item in [ItemKind::Scrap, ItemKind::Dust] {
            let outcome = world.feed_device(2, 3, item, &recipes, &economy).unwrap();
            assert!(outcome.consumed);
        }
        let dismantled = world.dismantle(2, 3).unwrap();
        assert_eq!(dismantled.block, BlockType::Press);
        assert_eq!(dismantled.contents, vec![ItemKind::Scrap, ItemKind::Dust]);
        assert_eq!(world.block_at(2, 3), Some(BlockType::Empty));
        assert!(world.dismantle(2, 3).is_none());
    }

    #[test]
    fn test_feed_non_device() {
        let mut world = memory_world(&MemoryChunkStore::new());
        world.update_streaming(0.0, 0.0);
        let recipes = RecipeBook::standard();
        let economy = EconomyConfig::default();
        assert!(world.feed_device(0, 1, ItemKind::Dust, &recipes, &economy).is_none());
        let extractor = world.feed_device(0, 3, ItemKind::Dust, &recipes, &economy).unwrap();
        assert_eq!(extractor.mana_restored, economy.extractor_mana);
    }

    #[test]
    fn test_failed_save_retains_chunk() {
        let broken = Arc::new(AtomicBool::new(false));
        let inner = MemoryChunkStore::new();
        let store = SwitchableStore {
            inner: inner.clone(),
            broken: Arc::clone(&broken),
        };
        let mut world =
            World::with_store(GeneratorConfig::default(), WorldConfig::default(), Box::new(store)).unwrap();

        world.update_streaming(0.0, 0.0);
        world.place_block(-10, 4, BlockType::Chest);

        broken.store(true, Ordering::SeqCst);
        world.update_streaming(200.0, 0.0);
        assert_eq!(world.retained_count(), 9);
        assert!(!world.is_active(ChunkCoord::new(-1, 0)));
        assert!(world.save_all().is_err());

        // Walking back reactivates the in-memory copy; the chunks left
        // behind cannot be saved either and take its place.
        world.update_streaming(0.0, 0.0);
        assert!(world.is_active(ChunkCoord::new(-1, 0)));
        assert_eq!(world.block_at(-10, 4), Some(BlockType::Chest));
        assert_eq!(world.retained_count(), 9);

        broken.store(false, Ordering::SeqCst);
        world.save_all().unwrap();
        assert_eq!(world.retained_count(), 0);
        assert!(inner.has_chunk(ChunkCoord::new(-1, 0)));
    }

    #[test]
    fn test_retained_retry_on_next_update() {
        let broken = Arc::new(AtomicBool::new(true));
        let inner = MemoryChunkStore::new();
        let store = SwitchableStore {
            inner: inner.clone(),
            broken: Arc::clone(&broken),
        };
        let mut world =
            World::with_store(GeneratorConfig::default(), WorldConfig::default(), Box::new(store)).unwrap();

        world.update_streaming(0.0, 0.0);
        world.update_streaming(200.0, 0.0);
        assert_eq!(world.retained_count(), 9);

        broken.store(false, Ordering::SeqCst);
        world.update_streaming(200.0, 0.0);
        assert_eq!(world.retained_count(), 0);
        assert!(inner.has_chunk(ChunkCoord::new(0, 0)));
    }

    #[test]
    fn test_rejects_oversized_view_radius() {
        let config = WorldConfig {
            view_radius: 1_000_000,
            ..WorldConfig::default()
        };
        let result = World::with_store(GeneratorConfig::default(), config, Box::new(MemoryChunkStore::new()));
        assert!(matches!(result, Err(StoreError::InvalidConfig(_))));
    }
}
