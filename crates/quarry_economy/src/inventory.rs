//! # Inventory System
//!
//! Flat item ledger: one counter per item kind.
//!
//! Used both for the player's pack and for chest contents. Ordering is
//! by catalogue order so that iteration and serialized output are stable.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{EconomyError, EconomyResult};
use crate::item::ItemKind;

/// An item ledger.
///
/// A kind is present only while its count is positive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inventory {
    counts: BTreeMap<ItemKind, u32>,
}

impl Inventory {
    /// Creates an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the count held of `item`.
    #[inline]
    #[must_use]
    pub fn count(&self, item: ItemKind) -> u32 {
        self.counts.get(&item).copied().unwrap_or(0)
    }

    /// Returns true if at least one unit of `item` is held.
    #[inline]
    #[must_use]
    pub fn contains(&self, item: ItemKind) -> bool {
        self.counts.contains_key(&item)
    }

    /// Number of distinct item kinds held.
    #[inline]
    #[must_use]
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Returns true if nothing is held.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterates `(item, count)` pairs in catalogue order.
    pub fn iter(&self) -> impl Iterator<Item = (ItemKind, u32)> + '_ {
        self.counts.iter().map(|(&k, &c)| (k, c))
    }

    /// Adds `count` units of `item`. Adding zero is a no-op.
    pub fn add(&mut self, item: ItemKind, count: u32) {
        if count == 0 {
            return;
        }
        let slot = self.counts.entry(item).or_insert(0);
        *slot = slot.saturating_add(count);
    }

    /// Removes `count` units of `item`.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InsufficientItems` if fewer than `count` are
    /// held; the inventory is left unchanged.
    pub fn remove(&mut self, item: ItemKind, count: u32) -> EconomyResult<()> {
        let available = self.count(item);
        if available < count {
            return Err(EconomyError::InsufficientItems {
                item,
                required: count,
                available,
            });
        }
        if available == count {
            self.counts.remove(&item);
        } else {
            self.counts.insert(item, available - count);
        }
        Ok(())
    }

    /// Empties the inventory, returning what it held.
    pub fn take_all(&mut self) -> Vec<(ItemKind, u32)> {
        std::mem::take(&mut self.counts).into_iter().collect()
    }

    /// Creates a snapshot of the inventory for rollback.
    #[must_use]
    pub fn snapshot(&self) -> InventorySnapshot {
        InventorySnapshot {
            counts: self.counts.clone(),
        }
    }

    /// Restores inventory from a snapshot (rollback).
    pub fn restore(&mut self, snapshot: &InventorySnapshot) {
        self.counts.clone_from(&snapshot.counts);
    }

    /// Encodes as a flat `{tag: count}` JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .counts
            .iter()
            .map(|(k, &c)| (k.as_str().to_string(), Value::from(c)))
            .collect();
        Value::Object(map)
    }

    /// Decodes a flat `{tag: count}` JSON object.
    ///
    /// Unknown tags and non-numeric counts are skipped with a warning.
    /// Anything other than an object yields an empty inventory.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let mut inv = Self::new();
        let Some(map) = value.as_object() else {
            tracing::warn!("inventory is not a JSON object, starting empty");
            return inv;
        };
        for (tag, count) in map {
            let Some(item) = ItemKind::from_tag(tag) else {
                tracing::warn!(tag = %tag, "skipping unknown item in inventory");
                continue;
            };
            match count.as_u64() {
                Some(n) => inv.add(item, u32::try_from(n).unwrap_or(u32::MAX)),
                None => tracing::warn!(item = %item, "skipping non-numeric inventory count"),
            }
        }
        inv
    }

    /// Serializes to a JSON byte buffer.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::Json` if encoding fails.
    pub fn to_bytes(&self) -> EconomyResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(&self.to_json())?)
    }

    /// Parses a JSON byte buffer written by [`Inventory::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::Json` if the buffer is not JSON at all.
    pub fn from_bytes(bytes: &[u8]) -> EconomyResult<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        Ok(Self::from_json(&value))
    }
}

impl FromIterator<(ItemKind, u32)> for Inventory {
    fn from_iter<T: IntoIterator<Item = (ItemKind, u32)>>(iter: T) -> Self {
        let mut inv = Self::new();
        for (item, count) in iter {
            inv.add(item, count);
        }
        inv
    }
}

/// Snapshot of inventory state for transactional rollback.
#[derive(Clone, Debug)]
pub struct InventorySnapshot {
    counts: BTreeMap<ItemKind, u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_items() {
        let mut inv = Inventory::new();
        inv.add(ItemKind::Dust, 10);
        inv.add(ItemKind::Dust, 5);
        assert_eq!(inv.count(ItemKind::Dust), 15);
        assert_eq!(inv.distinct(), 1);
    }

    #[test]
    fn test_add_zero_is_noop() {
        let mut inv = Inventory::new();
        inv.add(ItemKind::Shard, 0);
        assert!(inv.is_empty());
    }

    #[test]
    fn test_remove_items() {
        let mut inv = Inventory::new();
        inv.add(ItemKind::Scrap, 100);
        inv.remove(ItemKind::Scrap, 30).unwrap();
        assert_eq!(inv.count(ItemKind::Scrap), 70);
        inv.remove(ItemKind::Scrap, 70).unwrap();
        assert!(!inv.contains(ItemKind::Scrap), "Zero counts must not linger");
    }

    #[test]
    fn test_remove_insufficient() {
        let mut inv = Inventory::new();
        inv.add(ItemKind::Copper, 10);
        let result = inv.remove(ItemKind::Copper, 20);
        assert!(matches!(result, Err(EconomyError::InsufficientItems { .. })));
        assert_eq!(inv.count(ItemKind::Copper), 10, "Failed remove must not mutate");
    }

    #[test]
    fn test_snapshot_restore() {
        let mut inv = Inventory::new();
        inv.add(ItemKind::Dust, 50);

        let snapshot = inv.snapshot();

        inv.add(ItemKind::Shard, 30);
        assert_eq!(inv.count(ItemKind::Shard), 30);

        inv.restore(&snapshot);
        assert_eq!(inv.count(ItemKind::Shard), 0);
        assert_eq!(inv.count(ItemKind::Dust), 50);
    }

    #[test]
    fn test_json_skips_unknown() {
        let value = serde_json::json!({
            "dust": 3,
            "plutonium": 9,
            "shard": "lots",
            "pickaxe": 1
        });
        let inv = Inventory::from_json(&value);
        assert_eq!(inv.count(ItemKind::Dust), 3);
        assert_eq!(inv.count(ItemKind::Pickaxe), 1);
        assert_eq!(inv.distinct(), 2);
    }

    #[test]
    fn test_bytes_roundtrip() {
        let inv: Inventory = [(ItemKind::UraniumRod, 4), (ItemKind::GlassBlock, 2)]
            .into_iter()
            .collect();
        let restored = Inventory::from_bytes(&inv.to_bytes().unwrap()).unwrap();
        assert_eq!(restored, inv);
    }
}
