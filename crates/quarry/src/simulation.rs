//! # Simulation
//!
//! One [`Simulation::tick`] advances the world in a fixed order:
//!
//! ```text
//! ┌────────────────┐    ┌────────────────┐    ┌────────────────┐
//! │ Chunk          │───>│ Item flow      │───>│ Device         │
//! │ streaming      │    │ (move, rest,   │    │ transforms     │
//! │ (3×3 window)   │    │  feed, pickup) │    │ (on feed)      │
//! └────────────────┘    └────────────────┘    └────────────────┘
//! ```
//!
//! Nothing in a tick suspends or fails. Persistence errors during
//! streaming are logged by the world and retried; the in-memory state
//! stays authoritative.
//!
//! Everything else on this type is a command from the input layer:
//! mining, placing, throwing, drinking, interacting with machines and
//! saving.

use quarry_economy::{ItemKind, RecipeBook};
use quarry_procedural::{
    BackgroundStore, BlockCategory, BlockType, ChunkStore, FsChunkStore, StreamingDelta, World,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::GameConfig;
use crate::error::SimResult;
use crate::events::{Effect, EventSender, GameEvent};
use crate::item_flow::{FlowContext, FlowReport, ItemFlow};
use crate::physics::{CollisionQuery, GridCollision};
use crate::player::Player;

/// Blob holding the player's inventory.
pub const INVENTORY_BLOB: &str = "player_inventory.json";

/// Particles per broken block.
const BREAK_PARTICLES: u32 = 5;

/// Stream salt separating the mining RNG from the item scatter RNG.
const MINING_STREAM: u64 = 0x4D49_4E45;

/// What one tick did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Chunks streamed in and out.
    pub streaming: StreamingDelta,
    /// Item movement results.
    pub items: FlowReport,
}

/// Result of one mining action.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MineReport {
    /// Cells emptied, with the block that stood there.
    pub broken: Vec<((i32, i32), BlockType)>,
    /// Items dropped into the world.
    pub drops: Vec<ItemKind>,
}

impl MineReport {
    /// Returns true if nothing was broken.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.broken.is_empty()
    }
}

/// Game simulation.
pub struct Simulation {
    config: GameConfig,
    world: World,
    recipes: RecipeBook,
    player: Player,
    items: ItemFlow,
    collision: Box<dyn CollisionQuery + Send>,
    events: EventSender,
    rng: ChaCha8Rng,
    tick_count: u64,
}

impl Simulation {
    /// Opens the world on disk under `config.world.save_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the save directory, the manifest or the recipe
    /// file cannot be used.
    pub fn open(config: GameConfig, events: EventSender) -> SimResult<Self> {
        let fs = FsChunkStore::open(&config.world.save_dir)?;
        let store: Box<dyn ChunkStore> = if config.world.background_persistence {
            Box::new(BackgroundStore::spawn(fs)?)
        } else {
            Box::new(fs)
        };
        Self::new(config, store, events)
    }

    /// Builds a simulation over an arbitrary chunk store and streams in the
    /// chunks around the spawn.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the store's
    /// manifest cannot be read or written, or the recipe file is bad.
    pub fn new(config: GameConfig, store: Box<dyn ChunkStore>, events: EventSender) -> SimResult<Self> {
        config.validate()?;
        let recipes = match &config.recipes {
            Some(path) => RecipeBook::load(path)?,
            None => RecipeBook::standard(),
        };
        let mut world = World::with_store(config.generator.clone(), config.world.clone(), store)?;
        let player = Player::new(&config.player);
        world.update_streaming(player.position[0], player.position[1]);

        let seed = config.generator.seed;
        let items = ItemFlow::new(config.items.clone(), seed, events.clone());
        tracing::info!(
            seed,
            recipes = recipes.len(),
            spawn_x = player.position[0],
            spawn_y = player.position[1],
            "simulation ready"
        );
        Ok(Self {
            config,
            world,
            recipes,
            player,
            items,
            collision: Box::new(GridCollision),
            events,
            rng: ChaCha8Rng::seed_from_u64(seed ^ MINING_STREAM),
            tick_count: 0,
        })
    }

    /// Replaces the collision query supplied by the physics layer.
    pub fn set_collision(&mut self, collision: Box<dyn CollisionQuery + Send>) {
        self.collision = collision;
    }

    /// Advances the simulation by `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> TickReport {
        self.tick_count += 1;
        let [px, py] = self.player.position;
        let streaming = self.world.update_streaming(px, py);

        let mut ctx = FlowContext {
            world: &mut self.world,
            player: &mut self.player,
            recipes: &self.recipes,
            economy: &self.config.economy,
            collision: self.collision.as_ref(),
        };
        let items = self.items.update(dt, &mut ctx);

        TickReport {
            tick: self.tick_count,
            streaming,
            items,
        }
    }

    // =========================================================================
    // Player
    // =========================================================================

    /// Position reported by the physics layer.
    pub fn set_player_position(&mut self, x: f32, y: f32) {
        self.player.position = [x, y];
    }

    /// Applies damage to the player.
    pub fn take_damage(&mut self, amount: u32) {
        self.player.take_damage(amount, &self.events);
    }

    /// Credits items to the inventory.
    pub fn add_to_inventory(&mut self, item: ItemKind, count: u32) {
        self.player.add_to_inventory(item, count);
    }

    /// Takes items from the inventory.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer are held.
    pub fn remove_from_inventory(&mut self, item: ItemKind, count: u32) -> SimResult<()> {
        Ok(self.player.remove_from_inventory(item, count)?)
    }

    /// Drops an item into the world.
    pub fn spawn_item(&mut self, item: ItemKind, x: f32, y: f32, thrown: bool, direction: f32) {
        self.items.spawn_item(item, x, y, thrown, direction);
    }

    /// Throws one held item from the player's position.
    ///
    /// # Errors
    ///
    /// Returns an error if the item is not held.
    pub fn throw_from_inventory(&mut self, item: ItemKind, direction: f32) -> SimResult<()> {
        self.player.remove_from_inventory(item, 1)?;
        let [x, y] = self.player.position;
        let offset = if direction < 0.0 { -0.15 } else { 0.15 };
        self.items.spawn_item(item, x + offset, y, true, direction);
        Ok(())
    }

    /// Drinks a held acid flask. Returns the mana gained.
    ///
    /// # Errors
    ///
    /// Returns an error if no flask is held.
    pub fn use_acid_flask(&mut self) -> SimResult<u32> {
        self.player.remove_from_inventory(ItemKind::AcidFlask, 1)?;
        let gained = self.player.restore_mana(self.config.player.acid_flask_mana);
        self.events.send(GameEvent::ManaRestored {
            amount: gained,
            total: self.player.mana(),
        });
        Ok(gained)
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    /// Places a held block item into an empty cell.
    ///
    /// Returns `Ok(false)`, consuming nothing, if the item is not placeable,
    /// the cell is occupied or its chunk is not active.
    ///
    /// # Errors
    ///
    /// Returns an error if the item is not held.
    pub fn place_from_inventory(&mut self, item: ItemKind, x: i32, y: i32) -> SimResult<bool> {
        let Some(block) = BlockType::placed_from(item) else {
            return Ok(false);
        };
        if self.world.block_at(x, y) != Some(BlockType::Empty) {
            return Ok(false);
        }
        let snapshot = self.player.inventory.snapshot();
        self.player.remove_from_inventory(item, 1)?;
        if !self.world.place_block(x, y, block) {
            self.player.inventory.restore(&snapshot);
            return Ok(false);
        }
        self.events.send(GameEvent::BlockPlaced { block, cell: (x, y) });
        Ok(true)
    }

    /// Breaks the block at a cell with an optional held tool.
    ///
    /// A tool counts only if it is a mining tool and the player holds one.
    /// Core yields only to a tool and Monolith to nothing. Hard rock and
    /// machines need a tool; machines come back as their item with their
    /// contents ejected. The quantum drill also breaks the four orthogonal
    /// neighbours unless the target is Core or Monolith.
    pub fn mine(&mut self, x: i32, y: i32, tool: Option<ItemKind>) -> MineReport {
        let tool = tool.filter(|t| t.is_mining_tool() && self.player.inventory.contains(*t));
        let mut report = MineReport::default();
        let Some(target) = self.world.block_at(x, y) else {
            return report;
        };
        if !is_mineable(target) {
            return report;
        }

        let mut cells = vec![(x, y)];
        if tool == Some(ItemKind::QuantumDrill) && !target.is_indestructible() {
            cells.extend([(x, y + 1), (x, y - 1), (x + 1, y), (x - 1, y)]);
        }
        for (cx, cy) in cells {
            self.break_cell(cx, cy, tool.is_some(), &mut report);
        }
        if !report.is_empty() {
            tracing::debug!(x, y, ?tool, broken = report.broken.len(), drops = report.drops.len(), "mined");
        }
        report
    }

    fn break_cell(&mut self, x: i32, y: i32, has_tool: bool, report: &mut MineReport) {
        let Some(block) = self.world.block_at(x, y) else {
            return;
        };
        if !is_mineable(block) {
            return;
        }
        let center = [x as f32 + 0.5, y as f32 + 0.5];

        match block {
            BlockType::Monolith => return,
            BlockType::Core => {
                if !has_tool || self.world.remove_block(x, y).is_none() {
                    return;
                }
                self.burst(center, Effect::CoreCrack);
            }
            _ if block.item_form().is_some() => {
                if !has_tool {
                    return;
                }
                let Some(dismantled) = self.world.dismantle(x, y) else {
                    return;
                };
                let above = [x as f32 + 0.5, y as f32 + 1.5];
                for item in dismantled.contents {
                    self.items.spawn_item(item, above[0], above[1], false, 0.0);
                }
                if let Some(item) = block.item_form() {
                    self.items.spawn_item(item, center[0], center[1], false, 0.0);
                    report.drops.push(item);
                }
            }
            _ => {
                if block.requires_pickaxe() && !has_tool {
                    return;
                }
                if self.world.remove_block(x, y).is_none() {
                    return;
                }
                self.burst(center, Effect::Debris);
                if let Some(item) = self.roll_drop(block) {
                    self.items.spawn_item(item, center[0], center[1], false, 0.0);
                    report.drops.push(item);
                }
            }
        }
        report.broken.push(((x, y), block));
        self.events.send(GameEvent::BlockRemoved { block, cell: (x, y) });
    }

    fn roll_drop(&mut self, block: BlockType) -> Option<ItemKind> {
        let mining = &self.config.mining;
        let (item, chance) = match block {
            BlockType::CopperOre => (ItemKind::Copper, mining.copper_drop_chance),
            BlockType::TitaniumOre => (ItemKind::TitaniumOre, 1.0),
            BlockType::UraniumOre => (ItemKind::UraniumOre, 1.0),
            BlockType::Shroom => (ItemKind::Spore, 1.0),
            BlockType::Metal | BlockType::Metal2 => (ItemKind::Scrap, mining.scrap_drop_chance),
            BlockType::Fragile => (ItemKind::Shard, mining.shard_drop_chance),
            BlockType::Quantum
            | BlockType::DeepSlate
            | BlockType::Titanium
            | BlockType::Glass
            | BlockType::Geyser => (ItemKind::Dust, mining.dust_drop_chance),
            _ => return None,
        };
        (chance >= 1.0 || self.rng.gen_bool(chance.clamp(0.0, 1.0))).then_some(item)
    }

    fn burst(&self, position: [f32; 2], effect: Effect) {
        self.events.send(GameEvent::ParticleBurst {
            position,
            count: BREAK_PARTICLES,
            effect,
        });
    }

    // =========================================================================
    // Machines
    // =========================================================================

    /// Displayable contents of the machine at a cell.
    ///
    /// `None` if the cell is not interactable; an empty list for machines
    /// that hold nothing.
    #[must_use]
    pub fn hover_info(&self, x: i32, y: i32) -> Option<Vec<(ItemKind, u32)>> {
        let cell = self.world.cell_at(x, y)?;
        if !cell.block.is_interactable() {
            return None;
        }
        Some(cell.device.as_ref().map(|d| d.contents()).unwrap_or_default())
    }

    /// Returns true if the cell holds something the player can interact with.
    #[must_use]
    pub fn is_interactable(&self, x: i32, y: i32) -> bool {
        self.world
            .block_at(x, y)
            .is_some_and(BlockType::is_interactable)
    }

    /// Empties a machine in place, dropping its contents above it.
    /// Returns the ejected items.
    pub fn interact(&mut self, x: i32, y: i32) -> Vec<ItemKind> {
        let Some(device) = self.world.cell_at_mut(x, y).and_then(|c| c.device.as_mut()) else {
            return Vec::new();
        };
        let ejected = device.eject();
        for &item in &ejected {
            self.items.spawn_item(item, x as f32 + 0.5, y as f32 + 1.5, false, 0.0);
        }
        tracing::debug!(x, y, count = ejected.len(), "device emptied");
        ejected
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Saves the inventory and every active chunk, then waits for the
    /// store to settle.
    ///
    /// # Errors
    ///
    /// Returns the last storage error; every write is still attempted.
    pub fn save_game(&mut self) -> SimResult<()> {
        let inventory = self.player.inventory.to_bytes()?;
        let blob = self.world.store().save_blob(INVENTORY_BLOB, inventory);
        let chunks = self.world.save_all();
        let flushed = self.world.flush();
        blob?;
        chunks?;
        flushed?;
        tracing::info!(tick = self.tick_count, "game saved");
        Ok(())
    }

    /// Loads the saved inventory. Each saved item count replaces the held
    /// count; items absent from the save are kept. Returns false if there
    /// is no save.
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be read or decoded.
    pub fn load_inventory(&mut self) -> SimResult<bool> {
        let Some(bytes) = self.world.store().load_blob(INVENTORY_BLOB)? else {
            return Ok(false);
        };
        let saved = quarry_economy::Inventory::from_bytes(&bytes)?;
        let inventory = &mut self.player.inventory;
        for (item, count) in saved.iter() {
            let held = inventory.count(item);
            if count > held {
                inventory.add(item, count - held);
            } else {
                inventory.remove(item, held - count)?;
            }
        }
        tracing::info!(distinct = saved.distinct(), "inventory loaded");
        Ok(true)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The world.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world, for scripted setups.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The player.
    #[must_use]
    pub const fn player(&self) -> &Player {
        &self.player
    }

    /// Mutable player.
    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    /// Dropped items.
    #[must_use]
    pub const fn items(&self) -> &ItemFlow {
        &self.items
    }

    /// Recipe table in use.
    #[must_use]
    pub const fn recipes(&self) -> &RecipeBook {
        &self.recipes
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("world", &self.world)
            .field("player", &self.player)
            .field("items", &self.items.len())
            .field("tick_count", &self.tick_count)
            .finish_non_exhaustive()
    }
}

/// Blocks a tool (or hand) can be swung at.
fn is_mineable(block: BlockType) -> bool {
    match block.category() {
        BlockCategory::Solid | BlockCategory::Fragile | BlockCategory::Device => true,
        BlockCategory::Empty => block == BlockType::Biomass,
        BlockCategory::Hazard => block == BlockType::Spikes,
        BlockCategory::Bouncy => block == BlockType::Reflector,
        BlockCategory::Liquid => false,
    }
}
