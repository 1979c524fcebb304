//! # Item Catalogue
//!
//! Every resource, intermediate and product that can exist as a dropped
//! item, an inventory entry or a machine input.
//!
//! Tags are stable snake_case strings; they are what save files store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EconomyError;

/// An item type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Dust, the most common drop. Feeds extractors and presses.
    Dust,
    /// Crystal shard from fragile blocks.
    Shard,
    /// Metal scrap from metal-like blocks.
    Scrap,
    /// Placeable metal block.
    MetalBlock,
    /// Pressed metal plate, the main construction material.
    Metal2Block,
    /// Raw copper ore block item.
    CopperOre,
    /// Copper chunk dropped by copper ore.
    Copper,
    /// Smelted copper.
    CopperIngot,
    /// Energy dust, the universal fuel.
    EnergyDust,
    /// Raw titanium ore.
    TitaniumOre,
    /// Smelted titanium.
    TitaniumIngot,
    /// Raw uranium ore.
    UraniumOre,
    /// Pressed uranium rod.
    UraniumRod,
    /// Spore from shrooms.
    Spore,
    /// Acid flask, throwable or drinkable.
    AcidFlask,
    /// Quantum drill, breaks a cross of blocks.
    QuantumDrill,
    /// Pickaxe, needed for hard blocks.
    Pickaxe,
    /// Placeable titanium block.
    TitaniumBlock,
    /// Placeable glass block.
    GlassBlock,
    /// Placeable furnace.
    Furnace,
    /// Placeable assembler.
    Assembler,
    /// Placeable teleporter.
    Teleporter,
    /// Placeable extractor.
    Extractor,
    /// Placeable press.
    Press,
    /// Placeable chest.
    Chest,
    /// Placeable chemical lab.
    ChemLab,
    /// Placeable battery.
    Battery,
    /// Placeable reflector.
    Reflector,
    /// Placeable terminal.
    Terminal,
}

impl ItemKind {
    /// Every item kind, in catalogue order.
    pub const ALL: [Self; 29] = [
        Self::Dust,
        Self::Shard,
        Self::Scrap,
        Self::MetalBlock,
        Self::Metal2Block,
        Self::CopperOre,
        Self::Copper,
        Self::CopperIngot,
        Self::EnergyDust,
        Self::TitaniumOre,
        Self::TitaniumIngot,
        Self::UraniumOre,
        Self::UraniumRod,
        Self::Spore,
        Self::AcidFlask,
        Self::QuantumDrill,
        Self::Pickaxe,
        Self::TitaniumBlock,
        Self::GlassBlock,
        Self::Furnace,
        Self::Assembler,
        Self::Teleporter,
        Self::Extractor,
        Self::Press,
        Self::Chest,
        Self::ChemLab,
        Self::Battery,
        Self::Reflector,
        Self::Terminal,
    ];

    /// Returns the save-file tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dust => "dust",
            Self::Shard => "shard",
            Self::Scrap => "scrap",
            Self::MetalBlock => "metal_block",
            Self::Metal2Block => "metal2_block",
            Self::CopperOre => "copper_ore",
            Self::Copper => "copper",
            Self::CopperIngot => "copper_ingot",
            Self::EnergyDust => "energy_dust",
            Self::TitaniumOre => "titanium_ore",
            Self::TitaniumIngot => "titanium_ingot",
            Self::UraniumOre => "uranium_ore",
            Self::UraniumRod => "uranium_rod",
            Self::Spore => "spore",
            Self::AcidFlask => "acid_flask",
            Self::QuantumDrill => "quantum_drill",
            Self::Pickaxe => "pickaxe",
            Self::TitaniumBlock => "titanium_block",
            Self::GlassBlock => "glass_block",
            Self::Furnace => "furnace",
            Self::Assembler => "assembler",
            Self::Teleporter => "teleporter",
            Self::Extractor => "extractor",
            Self::Press => "press",
            Self::Chest => "chest",
            Self::ChemLab => "chem_lab",
            Self::Battery => "battery",
            Self::Reflector => "reflector",
            Self::Terminal => "terminal",
        }
    }

    /// Parses a save-file tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == tag)
    }

    /// Returns true for tools that let the holder break hard blocks.
    #[inline]
    #[must_use]
    pub const fn is_mining_tool(self) -> bool {
        matches!(self, Self::Pickaxe | Self::QuantumDrill)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = EconomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| EconomyError::UnknownItem(s.to_string()))
    }
}
