//! # Device State Machines
//!
//! Every machine block owns a small counter record. Dropped items that hit
//! a machine are **accumulated** into it, after which the machine's
//! **transform** rule runs until its thresholds are no longer met.
//!
//! ## Design
//!
//! - `DeviceState` is a tagged union selected by the block type when the
//!   cell is created. A furnace can never carry press counters.
//! - Feeding never fails. An item the machine does not take comes back as
//!   `FeedOutcome { consumed: false, .. }` and the state is untouched.
//! - Produced items are returned, not spawned. The caller owns placement
//!   of dropped items in the world.
//! - Extractor and teleporter are machines without counters; they have a
//!   `DeviceKind` but no `DeviceState`.
//!
//! | Device    | Accepts                                  | Produces                   |
//! |-----------|------------------------------------------|----------------------------|
//! | Press     | scrap, dust, shard, uranium ore          | metal2 block, energy dust, uranium rod |
//! | Furnace   | copper, titanium ore, energy dust        | copper / titanium ingot    |
//! | Assembler | anything; energy dust triggers a craft   | recipe output or energy dust |
//! | Chem lab  | spore, energy dust                       | acid flask                 |
//! | Terminal  | uranium rod                              | quantum drill              |
//! | Chest     | anything, limited distinct kinds         | nothing                    |
//! | Extractor | dust                                     | player mana                |

use serde_json::{json, Map, Value};

use crate::config::EconomyConfig;
use crate::crafting::RecipeBook;
use crate::inventory::Inventory;
use crate::item::ItemKind;

/// Most units a single counter may hold after decoding a saved record.
///
/// Larger saved counts are clamped so a corrupt file cannot stall the
/// transform loop or flood the world on eject.
pub const MAX_STORED_UNITS: u32 = 999;

/// Machine block kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Converts dust into player mana.
    Extractor,
    /// Fast travel pad. Holds no items.
    Teleporter,
    /// Presses scrap into plates and mixes dust with shards.
    Press,
    /// Smelts ore with energy dust.
    Furnace,
    /// Crafts from an exact bag of loaded items.
    Assembler,
    /// Plain storage.
    Chest,
    /// Turns uranium rods into quantum drills.
    Terminal,
    /// Brews acid flasks.
    ChemLab,
}

impl DeviceKind {
    /// All device kinds.
    pub const ALL: [Self; 8] = [
        Self::Extractor,
        Self::Teleporter,
        Self::Press,
        Self::Furnace,
        Self::Assembler,
        Self::Chest,
        Self::Terminal,
        Self::ChemLab,
    ];

    /// Fresh counters for a newly created device of this kind.
    ///
    /// `None` for devices that hold no state.
    #[must_use]
    pub fn default_state(self) -> Option<DeviceState> {
        match self {
            Self::Extractor | Self::Teleporter => None,
            Self::Press => Some(DeviceState::Press(PressState::default())),
            Self::Furnace => Some(DeviceState::Furnace(FurnaceState::default())),
            Self::Assembler => Some(DeviceState::Assembler(AssemblerState::default())),
            Self::Chest => Some(DeviceState::Chest(ChestState::default())),
            Self::Terminal => Some(DeviceState::Terminal(TerminalState::default())),
            Self::ChemLab => Some(DeviceState::ChemLab(ChemLabState::default())),
        }
    }

    /// The item this device is picked up as.
    #[must_use]
    pub const fn item(self) -> ItemKind {
        match self {
            Self::Extractor => ItemKind::Extractor,
            Self::Teleporter => ItemKind::Teleporter,
            Self::Press => ItemKind::Press,
            Self::Furnace => ItemKind::Furnace,
            Self::Assembler => ItemKind::Assembler,
            Self::Chest => ItemKind::Chest,
            Self::Terminal => ItemKind::Terminal,
            Self::ChemLab => ItemKind::ChemLab,
        }
    }
}

/// Ore last loaded into a furnace. Decides which ingot it smelts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OreKind {
    /// Smelts into copper ingots.
    #[default]
    Copper,
    /// Smelts into titanium ingots.
    TitaniumOre,
}

impl OreKind {
    /// The ore as an item.
    #[must_use]
    pub const fn item(self) -> ItemKind {
        match self {
            Self::Copper => ItemKind::Copper,
            Self::TitaniumOre => ItemKind::TitaniumOre,
        }
    }

    /// The ingot this ore smelts into.
    #[must_use]
    pub const fn ingot(self) -> ItemKind {
        match self {
            Self::Copper => ItemKind::CopperIngot,
            Self::TitaniumOre => ItemKind::TitaniumIngot,
        }
    }

    fn from_item(item: ItemKind) -> Option<Self> {
        match item {
            ItemKind::Copper => Some(Self::Copper),
            ItemKind::TitaniumOre => Some(Self::TitaniumOre),
            _ => None,
        }
    }
}

/// Result of feeding one item into a device.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeedOutcome {
    /// Whether the device took the item.
    pub consumed: bool,
    /// Items the device emits, in emission order.
    pub produced: Vec<ItemKind>,
    /// Mana granted to the player.
    pub mana_restored: u32,
}

impl FeedOutcome {
    /// The device did not take the item.
    #[must_use]
    pub fn rejected() -> Self {
        Self::default()
    }

    /// The device took the item and emitted nothing.
    #[must_use]
    pub fn absorbed() -> Self {
        Self {
            consumed: true,
            ..Self::default()
        }
    }

    /// The device took the item and emitted `produced`.
    #[must_use]
    pub fn producing(produced: Vec<ItemKind>) -> Self {
        Self {
            consumed: true,
            produced,
            mana_restored: 0,
        }
    }
}

/// Press counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PressState {
    /// Loaded scrap.
    pub scrap: u32,
    /// Loaded dust.
    pub dust: u32,
    /// Loaded shards.
    pub shard: u32,
}

impl PressState {
    fn feed(&mut self, item: ItemKind, config: &EconomyConfig) -> FeedOutcome {
        match item {
            ItemKind::Scrap => self.scrap = self.scrap.saturating_add(1),
            ItemKind::Dust => self.dust = self.dust.saturating_add(1),
            ItemKind::Shard => self.shard = self.shard.saturating_add(1),
            // Straight conversion, never stored.
            ItemKind::UraniumOre => return FeedOutcome::producing(vec![ItemKind::UraniumRod]),
            _ => return FeedOutcome::rejected(),
        }

        let mut produced = Vec::new();
        while self.scrap >= config.press_scrap_per_plate {
            self.scrap -= config.press_scrap_per_plate;
            produced.push(ItemKind::Metal2Block);
        }
        while self.dust >= 1 && self.shard >= 1 {
            self.dust -= 1;
            self.shard -= 1;
            produced.push(ItemKind::EnergyDust);
        }
        FeedOutcome::producing(produced)
    }
}

/// Furnace counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FurnaceState {
    /// Loaded ore units.
    pub ore: u32,
    /// Loaded energy dust.
    pub energy: u32,
    /// Kind of the most recently loaded ore.
    pub ore_kind: OreKind,
}

impl FurnaceState {
    fn feed(&mut self, item: ItemKind) -> FeedOutcome {
        if let Some(kind) = OreKind::from_item(item) {
            self.ore = self.ore.saturating_add(1);
            self.ore_kind = kind;
        } else if item == ItemKind::EnergyDust {
            self.energy = self.energy.saturating_add(1);
        } else {
            return FeedOutcome::rejected();
        }

        let mut produced = Vec::new();
        while self.ore >= 1 && self.energy >= 1 {
            self.ore -= 1;
            self.energy -= 1;
            produced.push(self.ore_kind.ingot());
        }
        FeedOutcome::producing(produced)
    }
}

/// Assembler load bay.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssemblerState {
    /// Loaded items, in load order.
    pub loaded: Vec<ItemKind>,
}

impl AssemblerState {
    fn feed(&mut self, item: ItemKind, recipes: &RecipeBook) -> FeedOutcome {
        if item != ItemKind::EnergyDust {
            self.loaded.push(item);
            return FeedOutcome::absorbed();
        }

        if let Some(recipe) = recipes.match_exact(&self.loaded) {
            tracing::debug!(output = %recipe.output, "assembler crafted");
            self.loaded.clear();
            FeedOutcome::producing(vec![recipe.output])
        } else {
            tracing::debug!(loaded = self.loaded.len(), "assembler fuel wasted, no recipe matched");
            FeedOutcome::producing(vec![ItemKind::EnergyDust])
        }
    }
}

/// Chem lab counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChemLabState {
    /// Loaded spores.
    pub spore: u32,
    /// Loaded energy dust.
    pub dust: u32,
}

impl ChemLabState {
    fn feed(&mut self, item: ItemKind) -> FeedOutcome {
        match item {
            ItemKind::Spore => self.spore = self.spore.saturating_add(1),
            ItemKind::EnergyDust => self.dust = self.dust.saturating_add(1),
            _ => return FeedOutcome::rejected(),
        }

        let mut produced = Vec::new();
        while self.spore >= 1 && self.dust >= 1 {
            self.spore -= 1;
            self.dust -= 1;
            produced.push(ItemKind::AcidFlask);
        }
        FeedOutcome::producing(produced)
    }
}

/// Terminal counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TerminalState {
    /// Uranium rods loaded toward the next drill.
    pub uranium: u32,
}

impl TerminalState {
    fn feed(&mut self, item: ItemKind, config: &EconomyConfig) -> FeedOutcome {
        if item != ItemKind::UraniumRod {
            return FeedOutcome::rejected();
        }
        self.uranium = self.uranium.saturating_add(1);
        if self.uranium >= config.terminal_rods_per_drill {
            self.uranium = 0;
            return FeedOutcome::producing(vec![ItemKind::QuantumDrill]);
        }
        FeedOutcome::absorbed()
    }
}

/// Chest contents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChestState {
    /// Stored items.
    pub inventory: Inventory,
}

impl ChestState {
    fn feed(&mut self, item: ItemKind, config: &EconomyConfig) -> FeedOutcome {
        if self.inventory.distinct() >= config.chest_distinct_limit && !self.inventory.contains(item) {
            tracing::debug!(item = %item, limit = config.chest_distinct_limit, "chest rejected new item kind");
            return FeedOutcome::rejected();
        }
        self.inventory.add(item, 1);
        FeedOutcome::absorbed()
    }
}

/// Per-device mutable state, keyed by device kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceState {
    /// Press counters.
    Press(PressState),
    /// Furnace counters.
    Furnace(FurnaceState),
    /// Assembler load bay.
    Assembler(AssemblerState),
    /// Chem lab counters.
    ChemLab(ChemLabState),
    /// Terminal counters.
    Terminal(TerminalState),
    /// Chest contents.
    Chest(ChestState),
}

impl DeviceState {
    /// The device kind owning this state.
    #[must_use]
    pub const fn kind(&self) -> DeviceKind {
        match self {
            Self::Press(_) => DeviceKind::Press,
            Self::Furnace(_) => DeviceKind::Furnace,
            Self::Assembler(_) => DeviceKind::Assembler,
            Self::ChemLab(_) => DeviceKind::ChemLab,
            Self::Terminal(_) => DeviceKind::Terminal,
            Self::Chest(_) => DeviceKind::Chest,
        }
    }

    /// Accumulates one item, then runs the transform rule.
    pub fn feed(
        &mut self,
        item: ItemKind,
        recipes: &RecipeBook,
        config: &EconomyConfig,
    ) -> FeedOutcome {
        match self {
            Self::Press(s) => s.feed(item, config),
            Self::Furnace(s) => s.feed(item),
            Self::Assembler(s) => s.feed(item, recipes),
            Self::ChemLab(s) => s.feed(item),
            Self::Terminal(s) => s.feed(item, config),
            Self::Chest(s) => s.feed(item, config),
        }
    }

    /// Empties the device, returning one item per stored unit.
    ///
    /// Order follows the counters: press scrap, dust, shard; furnace ore
    /// then energy; assembler in load order; chem lab spores then energy;
    /// terminal rods; chest in catalogue order.
    pub fn eject(&mut self) -> Vec<ItemKind> {
        let mut out = Vec::new();
        let mut push = |item: ItemKind, count: u32| {
            out.extend(std::iter::repeat(item).take(count as usize));
        };
        match self {
            Self::Press(s) => {
                push(ItemKind::Scrap, s.scrap);
                push(ItemKind::Dust, s.dust);
                push(ItemKind::Shard, s.shard);
                *s = PressState::default();
            }
            Self::Furnace(s) => {
                push(s.ore_kind.item(), s.ore);
                push(ItemKind::EnergyDust, s.energy);
                s.ore = 0;
                s.energy = 0;
            }
            Self::Assembler(s) => {
                for item in s.loaded.drain(..) {
                    push(item, 1);
                }
            }
            Self::ChemLab(s) => {
                push(ItemKind::Spore, s.spore);
                push(ItemKind::EnergyDust, s.dust);
                *s = ChemLabState::default();
            }
            Self::Terminal(s) => {
                push(ItemKind::UraniumRod, s.uranium);
                s.uranium = 0;
            }
            Self::Chest(s) => {
                for (item, count) in s.inventory.take_all() {
                    push(item, count);
                }
            }
        }
        out
    }

    /// Displayable contents: non-zero `(item, count)` pairs.
    #[must_use]
    pub fn contents(&self) -> Vec<(ItemKind, u32)> {
        let pairs: Vec<(ItemKind, u32)> = match self {
            Self::Press(s) => vec![
                (ItemKind::Scrap, s.scrap),
                (ItemKind::Dust, s.dust),
                (ItemKind::Shard, s.shard),
            ],
            Self::Furnace(s) => vec![(s.ore_kind.item(), s.ore), (ItemKind::EnergyDust, s.energy)],
            Self::Assembler(s) => {
                let mut tally: Vec<(ItemKind, u32)> = Vec::new();
                for &item in &s.loaded {
                    match tally.iter_mut().find(|(k, _)| *k == item) {
                        Some((_, n)) => *n += 1,
                        None => tally.push((item, 1)),
                    }
                }
                tally
            }
            Self::ChemLab(s) => vec![(ItemKind::Spore, s.spore), (ItemKind::EnergyDust, s.dust)],
            Self::Terminal(s) => vec![(ItemKind::UraniumRod, s.uranium)],
            Self::Chest(s) => s.inventory.iter().collect(),
        };
        pairs.into_iter().filter(|&(_, n)| n > 0).collect()
    }

    /// Returns true if the device holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contents().is_empty()
    }

    /// Encodes counters as a compact persisted record.
    #[must_use]
    pub fn to_meta(&self) -> Value {
        match self {
            Self::Press(s) => json!({ "sc": s.scrap, "du": s.dust, "sh": s.shard }),
            Self::Furnace(s) => json!({
                "ore": s.ore,
                "en": s.energy,
                "ore_t": s.ore_kind.item().as_str(),
            }),
            Self::Assembler(s) => {
                let tags: Vec<&str> = s.loaded.iter().map(|k| k.as_str()).collect();
                json!({ "ld": tags })
            }
            Self::ChemLab(s) => json!({ "sp": s.spore, "du": s.dust }),
            Self::Terminal(s) => json!({ "ur": s.uranium }),
            Self::Chest(s) => json!({ "inv": s.inventory.to_json() }),
        }
    }

    /// Decodes a persisted record for a device of `kind`.
    ///
    /// Absent or malformed fields default to zero / empty, and counts
    /// above [`MAX_STORED_UNITS`] are clamped. Returns `None` only for
    /// kinds that hold no state.
    #[must_use]
    pub fn from_meta(kind: DeviceKind, meta: &Value) -> Option<Self> {
        let empty = Map::new();
        let fields = meta.as_object().unwrap_or(&empty);
        let count = |key: &str| {
            let n = fields.get(key).and_then(Value::as_u64).unwrap_or(0);
            clamp_stored(kind, key, n)
        };

        let state = match kind {
            DeviceKind::Extractor | DeviceKind::Teleporter => return None,
            DeviceKind::Press => Self::Press(PressState {
                scrap: count("sc"),
                dust: count("du"),
                shard: count("sh"),
            }),
            DeviceKind::Furnace => Self::Furnace(FurnaceState {
                ore: count("ore"),
                energy: count("en"),
                ore_kind: fields
                    .get("ore_t")
                    .and_then(Value::as_str)
                    .and_then(ItemKind::from_tag)
                    .and_then(OreKind::from_item)
                    .unwrap_or_default(),
            }),
            DeviceKind::Assembler => Self::Assembler(AssemblerState {
                loaded: fields
                    .get("ld")
                    .and_then(Value::as_array)
                    .map(|tags| {
                        tags.iter()
                            .filter_map(Value::as_str)
                            .filter_map(|tag| {
                                let item = ItemKind::from_tag(tag);
                                if item.is_none() {
                                    tracing::warn!(tag = %tag, "dropping unknown item from assembler");
                                }
                                item
                            })
                            .collect()
                    })
                    .map(|mut loaded: Vec<ItemKind>| {
                        if loaded.len() > MAX_STORED_UNITS as usize {
                            tracing::warn!(?kind, loaded = loaded.len(), "truncating oversized assembler load");
                            loaded.truncate(MAX_STORED_UNITS as usize);
                        }
                        loaded
                    })
                    .unwrap_or_default(),
            }),
            DeviceKind::ChemLab => Self::ChemLab(ChemLabState {
                spore: count("sp"),
                dust: count("du"),
            }),
            DeviceKind::Terminal => Self::Terminal(TerminalState {
                uranium: count("ur"),
            }),
            DeviceKind::Chest => Self::Chest(ChestState {
                inventory: fields
                    .get("inv")
                    .map(Inventory::from_json)
                    .unwrap_or_default()
                    .iter()
                    .map(|(item, n)| (item, clamp_stored(kind, item.as_str(), u64::from(n))))
                    .collect(),
            }),
        };
        Some(state)
    }
}

fn clamp_stored(kind: DeviceKind, field: &str, n: u64) -> u32 {
    if n > u64::from(MAX_STORED_UNITS) {
        tracing::warn!(?kind, field, count = n, "clamping oversized device counter");
        return MAX_STORED_UNITS;
    }
    // Bounded by the check above.
    n as u32
}

/// Feeds one item into a device of `kind`.
///
/// Stateless devices are handled here: an extractor takes dust for mana,
/// a teleporter takes nothing. A stateful kind whose state is missing or
/// belongs to another kind rejects the item.
pub fn feed(
    kind: DeviceKind,
    state: Option<&mut DeviceState>,
    item: ItemKind,
    recipes: &RecipeBook,
    config: &EconomyConfig,
) -> FeedOutcome {
    match (kind, state) {
        (DeviceKind::Extractor, _) => {
            if item == ItemKind::Dust {
                FeedOutcome {
                    consumed: true,
                    produced: Vec::new(),
                    mana_restored: config.extractor_mana,
                }
            } else {
                FeedOutcome::rejected()
            }
        }
        (DeviceKind::Teleporter, _) => FeedOutcome::rejected(),
        (kind, Some(state)) if state.kind() == kind => state.feed(item, recipes, config),
        (kind, _) => {
            tracing::warn!(?kind, "device has no matching state, item rejected");
            FeedOutcome::rejected()
        }
    }
}
