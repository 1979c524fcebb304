//! # Player State
//!
//! What the simulation knows about the player: where they stand, what they
//! carry, and their vitals. Movement itself is integrated by the physics
//! layer, which reports the position back each frame.

use quarry_economy::{EconomyResult, Inventory, ItemKind};

use crate::config::PlayerConfig;
use crate::events::{EventSender, GameEvent};

/// The player.
#[derive(Clone, Debug)]
pub struct Player {
    /// Centre position in block units.
    pub position: [f32; 2],
    /// Where `respawn` puts the player.
    pub spawn: [f32; 2],
    /// Carried items.
    pub inventory: Inventory,
    mana: u32,
    max_mana: u32,
    hp: u32,
    max_hp: u32,
    dead: bool,
}

impl Player {
    /// Creates a player at the configured spawn with full vitals.
    #[must_use]
    pub fn new(config: &PlayerConfig) -> Self {
        let spawn = [config.spawn.0, config.spawn.1];
        Self {
            position: spawn,
            spawn,
            inventory: Inventory::new(),
            mana: config.max_mana,
            max_mana: config.max_mana,
            hp: config.max_hp,
            max_hp: config.max_hp,
            dead: false,
        }
    }

    /// Current mana.
    #[must_use]
    pub const fn mana(&self) -> u32 {
        self.mana
    }

    /// Mana cap.
    #[must_use]
    pub const fn max_mana(&self) -> u32 {
        self.max_mana
    }

    /// Current health.
    #[must_use]
    pub const fn hp(&self) -> u32 {
        self.hp
    }

    /// Health cap.
    #[must_use]
    pub const fn max_hp(&self) -> u32 {
        self.max_hp
    }

    /// Returns true once health has reached zero.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.dead
    }

    /// Applies damage and emits a damage number over the player.
    ///
    /// Damage to a dead player is ignored.
    pub fn take_damage(&mut self, amount: u32, events: &EventSender) {
        if self.dead || amount == 0 {
            return;
        }
        self.hp = self.hp.saturating_sub(amount);
        events.send(GameEvent::DamageNumber {
            amount,
            position: [self.position[0], self.position[1] + 0.75],
        });
        if self.hp == 0 {
            self.dead = true;
            tracing::info!(x = self.position[0], y = self.position[1], "player died");
        }
    }

    /// Adds mana up to the cap. Returns the amount actually gained.
    pub fn restore_mana(&mut self, amount: u32) -> u32 {
        let before = self.mana;
        self.mana = self.mana.saturating_add(amount).min(self.max_mana);
        self.mana - before
    }

    /// Spends mana if enough is available.
    pub fn spend_mana(&mut self, amount: u32) -> bool {
        if self.mana < amount {
            return false;
        }
        self.mana -= amount;
        true
    }

    /// Credits one or more units to the inventory.
    pub fn add_to_inventory(&mut self, item: ItemKind, count: u32) {
        self.inventory.add(item, count);
    }

    /// Takes units from the inventory.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InsufficientItems` if fewer are held; nothing
    /// is removed in that case.
    pub fn remove_from_inventory(&mut self, item: ItemKind, count: u32) -> EconomyResult<()> {
        self.inventory.remove(item, count)
    }

    /// Back to the spawn with full vitals. The inventory is kept.
    pub fn respawn(&mut self) {
        self.position = self.spawn;
        self.hp = self.max_hp;
        self.mana = self.max_mana;
        self.dead = false;
    }
}
