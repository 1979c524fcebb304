//! # Block Registry
//!
//! Every block type a world cell can hold, and the physical category each
//! one belongs to.
//!
//! ## Categories
//!
//! Each type maps to exactly one `BlockCategory`. The mapping is an
//! exhaustive `match`, so adding a type without classifying it does not
//! compile.
//!
//! | Category | Types |
//! |----------|-------|
//! | Empty    | empty, biomass |
//! | Solid    | core, quantum, deep slate, titanium, glass, monolith, uranium ore, geyser, metal, metal2, copper ore, titanium ore, dust, battery |
//! | Fragile  | fragile, shroom |
//! | Bouncy   | bouncy, reflector |
//! | Hazard   | hazard, spikes |
//! | Liquid   | acid |
//! | Device   | extractor, teleporter, press, furnace, assembler, chest, terminal, chem lab |

use std::fmt;

use quarry_economy::{DeviceKind, DeviceState, ItemKind};

/// Physical category of a block type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockCategory {
    /// Nothing to collide with.
    Empty,
    /// Wall. Stops the player and dropped items.
    Solid,
    /// Breakable wall that also stops items.
    Fragile,
    /// Springy surface.
    Bouncy,
    /// Kills on contact.
    Hazard,
    /// Hazardous liquid.
    Liquid,
    /// Machine with an interaction surface.
    Device,
}

/// Block type tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockType {
    /// Air.
    #[default]
    Empty,
    /// Indestructible-ish bedrock marking the spawn floor and biome boundary.
    Core,
    /// Shallow filler rock.
    Quantum,
    /// Crystal that shatters into shards.
    Fragile,
    /// Springy pad.
    Bouncy,
    /// Deadly surface block.
    Hazard,
    /// Scrap metal.
    Metal,
    /// Pressed metal plate.
    Metal2,
    /// Copper-bearing rock.
    CopperOre,
    /// Loose dust.
    Dust,
    /// Deep filler rock.
    DeepSlate,
    /// Titanium-bearing rock.
    TitaniumOre,
    /// Uranium-bearing rock.
    UraniumOre,
    /// Acid pool.
    Acid,
    /// Mushroom, drops spores.
    Shroom,
    /// Soft biomass, passable.
    Biomass,
    /// Deep-biome hazard.
    Spikes,
    /// Steam vent.
    Geyser,
    /// Placed titanium block.
    Titanium,
    /// Placed glass block.
    Glass,
    /// Unbreakable deep pillar.
    Monolith,
    /// Placed battery.
    Battery,
    /// Placed reflector.
    Reflector,
    /// Mana extractor.
    Extractor,
    /// Teleporter pad.
    Teleporter,
    /// Press.
    Press,
    /// Furnace.
    Furnace,
    /// Assembler.
    Assembler,
    /// Chest.
    Chest,
    /// Terminal.
    Terminal,
    /// Chemical lab.
    ChemLab,
}

impl BlockType {
    /// Every block type.
    pub const ALL: [Self; 31] = [
        Self::Empty,
        Self::Core,
        Self::Quantum,
        Self::Fragile,
        Self::Bouncy,
        Self::Hazard,
        Self::Metal,
        Self::Metal2,
        Self::CopperOre,
        Self::Dust,
        Self::DeepSlate,
        Self::TitaniumOre,
        Self::UraniumOre,
        Self::Acid,
        Self::Shroom,
        Self::Biomass,
        Self::Spikes,
        Self::Geyser,
        Self::Titanium,
        Self::Glass,
        Self::Monolith,
        Self::Battery,
        Self::Reflector,
        Self::Extractor,
        Self::Teleporter,
        Self::Press,
        Self::Furnace,
        Self::Assembler,
        Self::Chest,
        Self::Terminal,
        Self::ChemLab,
    ];

    /// Chunk-file tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Core => "core",
            Self::Quantum => "quantum",
            Self::Fragile => "fragile",
            Self::Bouncy => "bouncy",
            Self::Hazard => "hazard",
            Self::Metal => "metal",
            Self::Metal2 => "metal2",
            Self::CopperOre => "copper_ore",
            Self::Dust => "dust",
            Self::DeepSlate => "deep_slate",
            Self::TitaniumOre => "titanium_ore",
            Self::UraniumOre => "uranium_ore",
            Self::Acid => "acid",
            Self::Shroom => "shroom",
            Self::Biomass => "biomass",
            Self::Spikes => "spikes",
            Self::Geyser => "geyser",
            Self::Titanium => "titanium",
            Self::Glass => "glass",
            Self::Monolith => "monolith",
            Self::Battery => "battery",
            Self::Reflector => "reflector",
            Self::Extractor => "extractor",
            Self::Teleporter => "teleporter",
            Self::Press => "press",
            Self::Furnace => "furnace",
            Self::Assembler => "assembler",
            Self::Chest => "chest",
            Self::Terminal => "terminal",
            Self::ChemLab => "chem_lab",
        }
    }

    /// Parses a chunk-file tag. `None` for unknown tags.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|b| b.as_str() == tag)
    }

    /// The category this type belongs to.
    #[must_use]
    pub const fn category(self) -> BlockCategory {
        match self {
            Self::Empty | Self::Biomass => BlockCategory::Empty,
            Self::Core
            | Self::Quantum
            | Self::DeepSlate
            | Self::Titanium
            | Self::Glass
            | Self::Monolith
            | Self::UraniumOre
            | Self::Geyser
            | Self::Metal
            | Self::Metal2
            | Self::CopperOre
            | Self::TitaniumOre
            | Self::Dust
            | Self::Battery => BlockCategory::Solid,
            Self::Fragile | Self::Shroom => BlockCategory::Fragile,
            Self::Bouncy | Self::Reflector => BlockCategory::Bouncy,
            Self::Hazard | Self::Spikes => BlockCategory::Hazard,
            Self::Acid => BlockCategory::Liquid,
            Self::Extractor
            | Self::Teleporter
            | Self::Press
            | Self::Furnace
            | Self::Assembler
            | Self::Chest
            | Self::Terminal
            | Self::ChemLab => BlockCategory::Device,
        }
    }

    /// Returns true for air.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns true for blocks dropped items come to rest on.
    #[inline]
    #[must_use]
    pub const fn rests_items(self) -> bool {
        matches!(self.category(), BlockCategory::Solid | BlockCategory::Fragile)
    }

    /// Returns true for blocks no blast or ordinary tool removes.
    #[inline]
    #[must_use]
    pub const fn is_indestructible(self) -> bool {
        matches!(self, Self::Core | Self::Monolith)
    }

    /// Returns true for hard rock that only yields to a pickaxe.
    #[inline]
    #[must_use]
    pub const fn requires_pickaxe(self) -> bool {
        matches!(
            self,
            Self::DeepSlate | Self::TitaniumOre | Self::UraniumOre | Self::Titanium | Self::Glass
        )
    }

    /// The device kind, for machine blocks.
    #[must_use]
    pub const fn device_kind(self) -> Option<DeviceKind> {
        match self {
            Self::Extractor => Some(DeviceKind::Extractor),
            Self::Teleporter => Some(DeviceKind::Teleporter),
            Self::Press => Some(DeviceKind::Press),
            Self::Furnace => Some(DeviceKind::Furnace),
            Self::Assembler => Some(DeviceKind::Assembler),
            Self::Chest => Some(DeviceKind::Chest),
            Self::Terminal => Some(DeviceKind::Terminal),
            Self::ChemLab => Some(DeviceKind::ChemLab),
            _ => None,
        }
    }

    /// Fresh device state for a newly placed block of this type.
    #[must_use]
    pub fn default_device_state(self) -> Option<DeviceState> {
        self.device_kind().and_then(DeviceKind::default_state)
    }

    /// Returns true for blocks the player can hover and interact with.
    #[inline]
    #[must_use]
    pub const fn is_interactable(self) -> bool {
        matches!(self.category(), BlockCategory::Device) || matches!(self, Self::Battery)
    }

    /// The block a placeable item turns into.
    #[must_use]
    pub const fn placed_from(item: ItemKind) -> Option<Self> {
        match item {
            ItemKind::Metal2Block => Some(Self::Metal2),
            ItemKind::TitaniumBlock => Some(Self::Titanium),
            ItemKind::GlassBlock => Some(Self::Glass),
            ItemKind::Battery => Some(Self::Battery),
            ItemKind::Reflector => Some(Self::Reflector),
            ItemKind::Furnace => Some(Self::Furnace),
            ItemKind::Assembler => Some(Self::Assembler),
            ItemKind::Teleporter => Some(Self::Teleporter),
            ItemKind::Extractor => Some(Self::Extractor),
            ItemKind::Press => Some(Self::Press),
            ItemKind::Chest => Some(Self::Chest),
            ItemKind::ChemLab => Some(Self::ChemLab),
            ItemKind::Terminal => Some(Self::Terminal),
            _ => None,
        }
    }

    /// The item a machine block is picked back up as.
    ///
    /// `None` for terrain, which drops resources instead.
    #[must_use]
    pub const fn item_form(self) -> Option<ItemKind> {
        match self.device_kind() {
            Some(kind) => Some(kind.item()),
            None => match self {
                Self::Battery => Some(ItemKind::Battery),
                Self::Reflector => Some(ItemKind::Reflector),
                _ => None,
            },
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_roundtrip() {
        for block in BlockType::ALL {
            assert_eq!(BlockType::from_tag(block.as_str()), Some(block));
        }
        assert_eq!(BlockType::from_tag("lava"), None);
    }

    #[test]
    fn test_every_device_has_a_kind() {
        for block in BlockType::ALL {
            assert_eq!(
                block.category() == BlockCategory::Device,
                block.device_kind().is_some(),
                "{block} category disagrees with device kind"
            );
        }
    }

    #[test]
    fn test_default_state_matches_kind() {
        for block in BlockType::ALL {
            if let Some(state) = block.default_device_state() {
                assert_eq!(Some(state.kind()), block.device_kind());
            }
        }
        assert!(BlockType::Extractor.default_device_state().is_none());
        assert!(BlockType::Metal.default_device_state().is_none());
    }

    #[test]
    fn test_placement_roundtrip() {
        for block in BlockType::ALL {
            if let Some(item) = block.item_form() {
                assert_eq!(BlockType::placed_from(item), Some(block), "{block} cannot be re-placed");
            }
        }
    }

    #[test]
    fn test_item_rest_surfaces() {
        assert!(BlockType::Dust.rests_items());
        assert!(BlockType::Metal.rests_items());
        assert!(BlockType::Fragile.rests_items());
        assert!(!BlockType::Biomass.rests_items());
        assert!(!BlockType::Acid.rests_items());
        assert!(!BlockType::Chest.rests_items());
    }
}
