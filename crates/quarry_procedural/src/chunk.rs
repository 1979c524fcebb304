//! # Chunk System
//!
//! World data is organized into fixed-size square chunks for:
//! - Memory efficiency (only the neighbourhood of the player is live)
//! - Fast streaming (generate/discard on demand)
//! - Sparse persistence (one small JSON file per touched chunk)
//!
//! ## Chunk Format
//!
//! Chunks are 16x16 cells. On disk a chunk is a JSON object keyed by
//! `"{lx}_{ly}"`:
//!
//! ```json
//! { "3_7": { "type": "furnace", "meta": { "ore": 2, "en": 0, "ore_t": "copper" } } }
//! ```
//!
//! A bare tag (`"3_7": "dust"`) is accepted as `{ "type": "dust", "meta": {} }`.
//! Keys are written in sorted order, so saving an unchanged chunk twice
//! yields identical bytes.
//!
//! ## Two Views
//!
//! - **Stored**: `StoredBlock` per coordinate, the persisted record.
//! - **Runtime**: `Cell` per non-empty coordinate, owning live device state.
//!
//! Mutations update both. `save` folds device state back into the stored
//! records before encoding.

use std::collections::BTreeMap;
use std::fmt;

use quarry_economy::DeviceState;
use serde_json::{Map, Value};

use crate::block::BlockType;
use crate::error::{StoreError, StoreResult};
use crate::generator::TerrainGenerator;
use crate::store::ChunkStore;

/// Chunk width and height in cells.
pub const CHUNK_SIZE: usize = 16;

/// Cells per chunk.
pub const CELLS_PER_CHUNK: usize = CHUNK_SIZE * CHUNK_SIZE;

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    /// X coordinate (in chunks, not blocks).
    pub x: i32,
    /// Y coordinate (in chunks, not blocks).
    pub y: i32,
}

impl ChunkCoord {
    /// Lowest chunk index reachable from an `i32` block coordinate.
    pub const MIN: i32 = i32::MIN.div_euclid(CHUNK_SIZE as i32);
    /// Highest chunk index reachable from an `i32` block coordinate.
    pub const MAX: i32 = i32::MAX.div_euclid(CHUNK_SIZE as i32);

    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Converts world block coordinates to chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn from_block_pos(block_x: i32, block_y: i32) -> Self {
        Self {
            x: block_x.div_euclid(CHUNK_SIZE as i32),
            y: block_y.div_euclid(CHUNK_SIZE as i32),
        }
    }

    /// Returns true if every cell of this chunk has an `i32` block
    /// coordinate, i.e. both indices lie within [`Self::MIN`]..=[`Self::MAX`].
    #[inline]
    #[must_use]
    pub const fn in_bounds(self) -> bool {
        self.x >= Self::MIN && self.x <= Self::MAX && self.y >= Self::MIN && self.y <= Self::MAX
    }

    /// Returns the world X coordinate of the chunk's origin (corner).
    ///
    /// Exact for in-bounds chunks; wraps otherwise.
    #[inline]
    #[must_use]
    pub const fn world_x(self) -> i32 {
        self.x.wrapping_mul(CHUNK_SIZE as i32)
    }

    /// Returns the world Y coordinate of the chunk's origin.
    ///
    /// Exact for in-bounds chunks; wraps otherwise.
    #[inline]
    #[must_use]
    pub const fn world_y(self) -> i32 {
        self.y.wrapping_mul(CHUNK_SIZE as i32)
    }

    /// World coordinate of a local cell.
    #[inline]
    #[must_use]
    pub const fn world_of(self, local: LocalPos) -> (i32, i32) {
        (
            self.world_x().wrapping_add(local.x as i32),
            self.world_y().wrapping_add(local.y as i32),
        )
    }

    /// The in-bounds chunks within `radius` of this one, row by row.
    ///
    /// Near the edge of the coordinate space the square is cut short
    /// instead of wrapping around.
    pub fn neighborhood(self, radius: i32) -> impl Iterator<Item = Self> {
        (-radius..=radius).flat_map(move |dy| {
            (-radius..=radius).filter_map(move |dx| {
                let x = self.x.checked_add(dx)?;
                let y = self.y.checked_add(dy)?;
                let coord = Self::new(x, y);
                coord.in_bounds().then_some(coord)
            })
        })
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A cell position inside a chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalPos {
    /// Local X (0-15).
    pub x: u8,
    /// Local Y (0-15).
    pub y: u8,
}

impl LocalPos {
    /// Creates a local position. `None` if outside the chunk.
    #[must_use]
    pub const fn new(x: u8, y: u8) -> Option<Self> {
        if (x as usize) < CHUNK_SIZE && (y as usize) < CHUNK_SIZE {
            Some(Self { x, y })
        } else {
            None
        }
    }

    /// Local position of a world coordinate within its chunk.
    #[inline]
    #[must_use]
    pub const fn from_world(block_x: i32, block_y: i32) -> Self {
        Self {
            x: block_x.rem_euclid(CHUNK_SIZE as i32) as u8,
            y: block_y.rem_euclid(CHUNK_SIZE as i32) as u8,
        }
    }

    /// Persisted key, `"{lx}_{ly}"`.
    #[must_use]
    pub fn key(self) -> String {
        format!("{}_{}", self.x, self.y)
    }

    /// Parses a persisted key. `None` if malformed or out of range.
    #[must_use]
    pub fn parse_key(key: &str) -> Option<Self> {
        let (x, y) = key.split_once('_')?;
        Self::new(x.parse().ok()?, y.parse().ok()?)
    }

    /// Every position in a chunk, column by column.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..CHUNK_SIZE as u8).flat_map(|x| (0..CHUNK_SIZE as u8).map(move |y| Self { x, y }))
    }
}

/// Persisted record for one coordinate.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredBlock {
    /// Block type.
    pub block: BlockType,
    /// Type-specific device record; `{}` for terrain.
    pub meta: Value,
}

impl StoredBlock {
    /// A record with empty meta.
    #[must_use]
    pub fn plain(block: BlockType) -> Self {
        Self {
            block,
            meta: Value::Object(Map::new()),
        }
    }

    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), Value::from(self.block.as_str()));
        obj.insert("meta".to_string(), self.meta.clone());
        Value::Object(obj)
    }

    /// Lenient decoding of one entry. Unknown shapes become empty.
    fn from_json(coord: ChunkCoord, key: &str, value: &Value) -> Self {
        let (tag, meta) = match value {
            // Legacy files stored the bare tag.
            Value::String(tag) => (Some(tag.as_str()), None),
            Value::Object(obj) => (obj.get("type").and_then(Value::as_str), obj.get("meta")),
            _ => (None, None),
        };

        let block = match tag.map(|t| (t, BlockType::from_tag(t))) {
            Some((_, Some(block))) => block,
            Some((t, None)) => {
                tracing::warn!(cx = coord.x, cy = coord.y, key, tag = t, "unknown block tag, treating as empty");
                BlockType::Empty
            }
            None => {
                tracing::warn!(cx = coord.x, cy = coord.y, key, "malformed chunk entry, treating as empty");
                BlockType::Empty
            }
        };

        let meta = match meta {
            Some(m @ Value::Object(_)) => m.clone(),
            _ => Value::Object(Map::new()),
        };
        Self { block, meta }
    }
}

/// Runtime form of a non-empty coordinate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    /// Block type.
    pub block: BlockType,
    /// Live device counters, for stateful machines.
    pub device: Option<DeviceState>,
}

impl Cell {
    /// A freshly placed cell with default device state.
    #[must_use]
    pub fn fresh(block: BlockType) -> Self {
        Self {
            block,
            device: block.default_device_state(),
        }
    }

    /// Rebuilds a cell from its persisted record.
    #[must_use]
    pub fn from_stored(stored: &StoredBlock) -> Self {
        let device = stored
            .block
            .device_kind()
            .and_then(|kind| DeviceState::from_meta(kind, &stored.meta));
        Self {
            block: stored.block,
            device,
        }
    }
}

/// Where a chunk's content came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkOrigin {
    /// No stored data; produced by the generator.
    Generated,
    /// Decoded from the store.
    Loaded,
    /// Stored data was unreadable; regenerated.
    Regenerated,
}

/// A chunk of world data.
#[derive(Clone, Debug)]
pub struct Chunk {
    coord: ChunkCoord,
    stored: BTreeMap<LocalPos, StoredBlock>,
    cells: BTreeMap<LocalPos, Cell>,
    dirty: bool,
}

impl Chunk {
    /// Generates a chunk from scratch.
    #[must_use]
    pub fn generate(coord: ChunkCoord, generator: &TerrainGenerator) -> Self {
        let stored = LocalPos::all()
            .map(|local| {
                let (wx, wy) = coord.world_of(local);
                (local, StoredBlock::plain(generator.generate(wx, wy)))
            })
            .collect();
        let mut chunk = Self {
            coord,
            stored,
            cells: BTreeMap::new(),
            dirty: true,
        };
        chunk.instantiate();
        chunk
    }

    /// Decodes a persisted chunk.
    ///
    /// Bad entries are recovered individually. Coordinates missing from the
    /// file are filled from the generator.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Decode` if the bytes are not a JSON object.
    pub fn decode(coord: ChunkCoord, bytes: &[u8], generator: &TerrainGenerator) -> StoreResult<Self> {
        let raw: Map<String, Value> =
            serde_json::from_slice(bytes).map_err(|source| StoreError::Decode { coord, source })?;

        let mut stored = BTreeMap::new();
        for (key, value) in &raw {
            let Some(local) = LocalPos::parse_key(key) else {
                tracing::warn!(cx = coord.x, cy = coord.y, key = %key, "skipping unparsable cell key");
                continue;
            };
            stored.insert(local, StoredBlock::from_json(coord, key, value));
        }

        if stored.len() < CELLS_PER_CHUNK {
            for local in LocalPos::all() {
                stored.entry(local).or_insert_with(|| {
                    let (wx, wy) = coord.world_of(local);
                    StoredBlock::plain(generator.generate(wx, wy))
                });
            }
        }

        let mut chunk = Self {
            coord,
            stored,
            cells: BTreeMap::new(),
            dirty: false,
        };
        chunk.instantiate();
        Ok(chunk)
    }

    /// Loads the chunk from `store`, or generates it if nothing is stored.
    ///
    /// Never fails: an unreadable store entry is logged and the chunk is
    /// regenerated.
    pub fn generate_or_load(
        coord: ChunkCoord,
        generator: &TerrainGenerator,
        store: &dyn ChunkStore,
    ) -> (Self, ChunkOrigin) {
        let bytes = match store.load_chunk(coord) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(cx = coord.x, cy = coord.y, error = %e, "chunk read failed, regenerating");
                return (Self::generate(coord, generator), ChunkOrigin::Regenerated);
            }
        };

        match bytes {
            None => {
                tracing::trace!(cx = coord.x, cy = coord.y, "chunk generated");
                (Self::generate(coord, generator), ChunkOrigin::Generated)
            }
            Some(bytes) => match Self::decode(coord, &bytes, generator) {
                Ok(chunk) => {
                    tracing::trace!(cx = coord.x, cy = coord.y, "chunk loaded");
                    (chunk, ChunkOrigin::Loaded)
                }
                Err(e) => {
                    tracing::warn!(cx = coord.x, cy = coord.y, error = %e, "corrupt chunk file, regenerating");
                    (Self::generate(coord, generator), ChunkOrigin::Regenerated)
                }
            },
        }
    }

    fn instantiate(&mut self) {
        self.cells = self
            .stored
            .iter()
            .filter(|(_, s)| !s.block.is_empty())
            .map(|(&local, s)| (local, Cell::from_stored(s)))
            .collect();
    }

    /// Chunk position in the world.
    #[inline]
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Whether the chunk changed since it was last saved or loaded.
    #[inline]
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Block type at a local position.
    #[must_use]
    pub fn block(&self, local: LocalPos) -> BlockType {
        self.cells.get(&local).map_or(BlockType::Empty, |c| c.block)
    }

    /// Runtime cell at a local position. `None` for empty.
    #[must_use]
    pub fn cell(&self, local: LocalPos) -> Option<&Cell> {
        self.cells.get(&local)
    }

    /// Mutable runtime cell. Marks the chunk dirty.
    pub fn cell_mut(&mut self, local: LocalPos) -> Option<&mut Cell> {
        let cell = self.cells.get_mut(&local);
        if cell.is_some() {
            self.dirty = true;
        }
        cell
    }

    /// Persisted record at a local position.
    #[must_use]
    pub fn stored(&self, local: LocalPos) -> Option<&StoredBlock> {
        self.stored.get(&local)
    }

    /// Overwrites a cell with a freshly placed block.
    pub fn set_cell(&mut self, local: LocalPos, block: BlockType) {
        self.stored.insert(local, StoredBlock::plain(block));
        if block.is_empty() {
            self.cells.remove(&local);
        } else {
            self.cells.insert(local, Cell::fresh(block));
        }
        self.dirty = true;
    }

    /// Empties a cell, returning its previous runtime form.
    pub fn clear_cell(&mut self, local: LocalPos) -> Option<Cell> {
        self.stored.insert(local, StoredBlock::plain(BlockType::Empty));
        self.dirty = true;
        self.cells.remove(&local)
    }

    /// Non-empty cells with their world coordinates.
    pub fn cells(&self) -> impl Iterator<Item = ((i32, i32), &Cell)> + '_ {
        let coord = self.coord;
        self.cells.iter().map(move |(&local, cell)| (coord.world_of(local), cell))
    }

    /// Number of non-empty cells.
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.cells.len()
    }

    /// Folds device state into the stored records and encodes the chunk.
    ///
    /// Idempotent: encoding twice without mutation gives identical bytes.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Encode` if serialization fails.
    pub fn encode(&mut self) -> StoreResult<Vec<u8>> {
        for (local, cell) in &self.cells {
            if let (Some(device), Some(stored)) = (&cell.device, self.stored.get_mut(local)) {
                stored.meta = device.to_meta();
            }
        }
        let map: Map<String, Value> = self
            .stored
            .iter()
            .map(|(local, s)| (local.key(), s.to_json()))
            .collect();
        Ok(serde_json::to_vec(&Value::Object(map))?)
    }

    /// Writes the chunk to `store` and clears the dirty flag.
    ///
    /// # Errors
    ///
    /// Propagates encode and store failures; the chunk stays dirty.
    pub fn save(&mut self, store: &dyn ChunkStore) -> StoreResult<()> {
        let bytes = self.encode()?;
        store.save_chunk(self.coord, bytes)?;
        self.dirty = false;
        tracing::trace!(cx = self.coord.x, cy = self.coord.y, "chunk saved");
        Ok(())
    }

    /// Saves and releases the chunk.
    ///
    /// # Errors
    ///
    /// On a failed save the chunk is handed back with the error, so the
    /// caller can keep it alive.
    pub fn unload(mut self, store: &dyn ChunkStore) -> Result<(), (Box<Self>, StoreError)> {
        match self.save(store) {
            Ok(()) => {
                tracing::trace!(cx = self.coord.x, cy = self.coord.y, "chunk unloaded");
                Ok(())
            }
            Err(e) => Err((Box::new(self), e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use quarry_economy::{EconomyConfig, ItemKind, RecipeBook};

    use super::*;
    use crate::store::MemoryChunkStore;

    fn gen() -> TerrainGenerator {
        TerrainGenerator::default()
    }

    #[test]
    fn test_chunk_coord_from_block() {
        assert_eq!(ChunkCoord::from_block_pos(0, 0), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::from_block_pos(15, 15), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::from_block_pos(16, 0), ChunkCoord::new(1, 0));
        assert_eq!(ChunkCoord::from_block_pos(-1, -1), ChunkCoord::new(-1, -1));
        assert_eq!(ChunkCoord::from_block_pos(-16, -17), ChunkCoord::new(-1, -2));
        assert_eq!(LocalPos::from_world(-1, -17), LocalPos { x: 15, y: 15 });
    }

    #[test]
    fn test_neighborhood() {
        let all: Vec<_> = ChunkCoord::new(0, 0).neighborhood(1).collect();
        assert_eq!(all.len(), 9);
        assert!(all.contains(&ChunkCoord::new(-1, 1)));
        assert!(all.contains(&ChunkCoord::new(1, -1)));
    }

    #[test]
    fn test_coordinate_space_edges() {
        let corner = ChunkCoord::from_block_pos(i32::MAX, i32::MIN);
        assert_eq!(corner, ChunkCoord::new(ChunkCoord::MAX, ChunkCoord::MIN));
        let edge = LocalPos::new(15, 0).unwrap();
        assert_eq!(corner.world_of(edge), (i32::MAX, i32::MIN));

        let cut: Vec<_> = corner.neighborhood(1).collect();
        assert_eq!(cut.len(), 4);
        assert!(cut.iter().all(|c| c.in_bounds()));
        assert_eq!(ChunkCoord::new(i32::MAX, 0).neighborhood(1).count(), 0);
    }

    #[test]
    fn test_key_parse() {
        assert_eq!(LocalPos::parse_key("3_15"), LocalPos::new(3, 15));
        assert_eq!(LocalPos::parse_key("16_0"), None);
        assert_eq!(LocalPos::parse_key("a_b"), None);
        assert_eq!(LocalPos::parse_key("7"), None);
        assert_eq!(LocalPos::new(4, 9).map(LocalPos::key).as_deref(), Some("4_9"));
    }

    #[test]
    fn test_generate_matches_generator() {
        let gen = gen();
        let coord = ChunkCoord::new(0, 0);
        let chunk = Chunk::generate(coord, &gen);
        for local in LocalPos::all() {
            let (wx, wy) = coord.world_of(local);
            assert_eq!(chunk.block(local), gen.generate(wx, wy));
        }
        // Sanctuary press at (2, 3) gets live state.
        let press = chunk.cell(LocalPos::from_world(2, 3)).unwrap();
        assert_eq!(press.block, BlockType::Press);
        assert!(press.device.is_some());
    }

    #[test]
    fn test_encode_is_idempotent() {
        let mut chunk = Chunk::generate(ChunkCoord::new(0, 0), &gen());
        let first = chunk.encode().unwrap();
        let second = chunk.encode().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_roundtrip_with_devices() {
        let gen = gen();
        let store = MemoryChunkStore::new();
        let coord = ChunkCoord::new(2, -1);
        let mut chunk = Chunk::generate(coord, &gen);

        let furnace_at = LocalPos::new(1, 1).unwrap();
        let chest_at = LocalPos::new(5, 5).unwrap();
        let hole_at = LocalPos::new(9, 9).unwrap();
        chunk.set_cell(furnace_at, BlockType::Furnace);
        chunk.set_cell(chest_at, BlockType::Chest);
        chunk.clear_cell(hole_at);

        let recipes = RecipeBook::standard();
        let economy = EconomyConfig::default();
        let furnace = chunk.cell_mut(furnace_at).and_then(|c| c.device.as_mut()).unwrap();
        furnace.feed(ItemKind::TitaniumOre, &recipes, &economy);
        let chest = chunk.cell_mut(chest_at).and_then(|c| c.device.as_mut()).unwrap();
        chest.feed(ItemKind::Pickaxe, &recipes, &economy);
        chest.feed(ItemKind::Dust, &recipes, &economy);

        let before: Vec<_> = chunk.cells().map(|(p, c)| (p, c.clone())).collect();
        chunk.unload(&store).map_err(|(_, e)| e).unwrap();

        let (reloaded, origin) = Chunk::generate_or_load(coord, &gen, &store);
        assert_eq!(origin, ChunkOrigin::Loaded);
        let after: Vec<_> = reloaded.cells().map(|(p, c)| (p, c.clone())).collect();
        assert_eq!(before, after);
        assert_eq!(reloaded.block(hole_at), BlockType::Empty);
        assert!(!reloaded.is_dirty());
    }

    #[test]
    fn test_legacy_and_malformed_entries() {
        let gen = gen();
        let coord = ChunkCoord::new(5, 5);
        let bytes = br#"{
            "0_0": "metal",
            "1_0": { "type": "unobtainium", "meta": {} },
            "2_0": 42,
            "3_0": { "type": "press", "meta": { "sc": 1, "du": "x" } },
            "4_0": { "type": "terminal" },
            "99_0": "dust",
            "junk": "dust"
        }"#;
        let chunk = Chunk::decode(coord, bytes, &gen).unwrap();

        assert_eq!(chunk.block(LocalPos::new(0, 0).unwrap()), BlockType::Metal);
        assert_eq!(chunk.block(LocalPos::new(1, 0).unwrap()), BlockType::Empty);
        assert_eq!(chunk.block(LocalPos::new(2, 0).unwrap()), BlockType::Empty);
        let press = chunk.cell(LocalPos::new(3, 0).unwrap()).unwrap();
        assert_eq!(
            press.device.as_ref().map(DeviceState::contents),
            Some(vec![(ItemKind::Scrap, 1)])
        );
        let terminal = chunk.cell(LocalPos::new(4, 0).unwrap()).unwrap();
        assert!(terminal.device.as_ref().is_some_and(DeviceState::is_empty));

        // Missing keys regenerate.
        let local = LocalPos::new(8, 8).unwrap();
        let (wx, wy) = coord.world_of(local);
        assert_eq!(chunk.block(local), gen.generate(wx, wy));
    }

    #[test]
    fn test_corrupt_file_regenerates() {
        let gen = gen();
        let store = MemoryChunkStore::new();
        let coord = ChunkCoord::new(0, -3);
        store.save_chunk(coord, b"{ not json".to_vec()).unwrap();
        let (chunk, origin) = Chunk::generate_or_load(coord, &gen, &store);
        assert_eq!(origin, ChunkOrigin::Regenerated);
        assert_eq!(chunk.occupied(), Chunk::generate(coord, &gen).occupied());

        assert!(matches!(
            Chunk::decode(coord, b"[1, 2]", &gen),
            Err(StoreError::Decode { .. })
        ));
    }
}
