//! # QUARRY
//!
//! The simulation crate, tying the world and the economy into one tick.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          QUARRY SIMULATION                          │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │  ┌─────────────────┐     ┌─────────────────┐     ┌───────────────┐  │
//! │  │ quarry_         │     │ Simulation      │     │ quarry_       │  │
//! │  │ procedural      │<────│                 │────>│ economy       │  │
//! │  │                 │     │ • Player        │     │               │  │
//! │  │ • Generator     │     │ • Item flow     │     │ • Items       │  │
//! │  │ • Chunks        │     │ • Mining        │     │ • Devices     │  │
//! │  │ • Streaming     │     │ • Events        │     │ • Recipes     │  │
//! │  └─────────────────┘     └────────┬────────┘     └───────────────┘  │
//! │                                   │                                 │
//! │                                   v                                 │
//! │                     render / audio / UI (external)                  │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: TOML game configuration
//! - `events`: Effect and notification channel to the outer layers
//! - `item_flow`: Dropped items, device feeding and pickup
//! - `physics`: Collision query seam
//! - `player`: Position, vitals and inventory
//! - `simulation`: The tick and every player command
//!
//! ## Example
//!
//! ```rust
//! use quarry::{EventBus, GameConfig, Simulation};
//! use quarry::economy::ItemKind;
//! use quarry::procedural::MemoryChunkStore;
//!
//! let (events, _receiver) = EventBus::create_pair(256);
//! let mut sim = Simulation::new(
//!     GameConfig::default(),
//!     Box::new(MemoryChunkStore::new()),
//!     events,
//! )
//! .unwrap();
//!
//! sim.add_to_inventory(ItemKind::Chest, 1);
//! assert!(sim.place_from_inventory(ItemKind::Chest, 6, 4).unwrap());
//! sim.tick(1.0 / 60.0);
//! assert!(sim.is_interactable(6, 4));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod events;
pub mod item_flow;
pub mod physics;
pub mod player;
pub mod simulation;

pub use quarry_economy as economy;
pub use quarry_procedural as procedural;

pub use config::{GameConfig, ItemFlowConfig, MiningConfig, PlayerConfig};
pub use error::{SimError, SimResult};
pub use events::{Effect, EventBus, EventReceiver, EventSender, GameEvent};
pub use item_flow::{DroppedItem, FlowContext, FlowReport, ItemFlow};
pub use physics::{Aabb, CollisionQuery, GridCollision};
pub use player::Player;
pub use simulation::{MineReport, Simulation, TickReport, INVENTORY_BLOB};
