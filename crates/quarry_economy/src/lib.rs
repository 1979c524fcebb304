//! # QUARRY Economy System
//!
//! Items, inventories and the resource-processing machines of QUARRY.
//!
//! ## Design Principles
//!
//! 1. **Closed catalogue** - Every item is an `ItemKind` variant; tags only exist at the save boundary
//! 2. **Machines never fail** - Feeding a wrong item is a rejection, not an error
//! 3. **Transactional crafting** - All-or-nothing item transformations
//! 4. **External configuration** - Balance numbers and recipes load from TOML
//!
//! ## Example
//!
//! ```rust
//! use quarry_economy::{DeviceKind, EconomyConfig, ItemKind, RecipeBook};
//!
//! let recipes = RecipeBook::standard();
//! let config = EconomyConfig::default();
//! let mut press = DeviceKind::Press.default_state().unwrap();
//!
//! press.feed(ItemKind::Scrap, &recipes, &config);
//! let outcome = press.feed(ItemKind::Scrap, &recipes, &config);
//! assert_eq!(outcome.produced, vec![ItemKind::Metal2Block]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod crafting;
pub mod device;
pub mod error;
pub mod inventory;
pub mod item;

pub use config::EconomyConfig;
pub use crafting::{Recipe, RecipeBook, RecipeItem};
pub use device::{
    feed, AssemblerState, ChemLabState, ChestState, DeviceKind, DeviceState, FeedOutcome,
    FurnaceState, OreKind, PressState, TerminalState, MAX_STORED_UNITS,
};
pub use error::{EconomyError, EconomyResult};
pub use inventory::{Inventory, InventorySnapshot};
pub use item::ItemKind;
