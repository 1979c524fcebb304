//! # Item Flow
//!
//! Dropped items are the only way materials move between the player and
//! the machines. Each tick every item:
//!
//! 1. moves, then feels gravity and horizontal damping;
//! 2. if it is a thrown acid flask touching solid rock, bursts and clears
//!    the surrounding 3×3 of breakable rock;
//! 3. comes to rest on solid or fragile cells;
//! 4. if thrown, is offered to each device it touches until one takes it;
//! 5. once past the grace period, drifts toward a nearby player and is
//!    picked up when close enough.
//!
//! Items over a chunk that is not active are frozen until it streams back.
//!
//! ## Device Output
//!
//! Items a device emits appear one block above it and are not thrown, so
//! they never feed the device that made them.

use quarry_economy::{EconomyConfig, ItemKind, RecipeBook};
use quarry_procedural::{BlockCategory, World};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::ItemFlowConfig;
use crate::events::{Effect, EventSender, GameEvent};
use crate::physics::{distance, Aabb, CollisionQuery};
use crate::player::Player;

/// Particles in an acid burst.
const ACID_PARTICLES: u32 = 15;

/// An item lying in (or flying through) the world.
#[derive(Clone, Debug, PartialEq)]
pub struct DroppedItem {
    /// Item type.
    pub kind: ItemKind,
    /// Centre position in blocks.
    pub position: [f32; 2],
    /// Velocity in blocks per second.
    pub velocity: [f32; 2],
    /// Thrown by the player rather than dropped.
    pub thrown: bool,
    /// Seconds since spawning.
    pub age: f32,
}

impl DroppedItem {
    fn bounds(&self, size: f32) -> Aabb {
        Aabb::from_center(self.position, size, size)
    }

    fn cell(&self) -> (i32, i32) {
        (self.position[0].floor() as i32, self.position[1].floor() as i32)
    }
}

/// Everything an item update touches outside the item list.
pub struct FlowContext<'a> {
    /// Block grid and devices.
    pub world: &'a mut World,
    /// Pickup target and mana sink.
    pub player: &'a mut Player,
    /// Assembler recipes.
    pub recipes: &'a RecipeBook,
    /// Machine balance.
    pub economy: &'a EconomyConfig,
    /// Which cells an item overlaps.
    pub collision: &'a dyn CollisionQuery,
}

/// What happened during one update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlowReport {
    /// Items taken by devices.
    pub consumed: u32,
    /// Items emitted by devices.
    pub produced: u32,
    /// Items picked up by the player.
    pub picked_up: u32,
    /// Acid flasks that burst.
    pub bursts: u32,
    /// Blocks cleared by bursts.
    pub blocks_cleared: u32,
    /// Oldest items discarded over the cap.
    pub discarded: u32,
}

enum Fate {
    Keep,
    Gone,
}

/// Owner of every dropped item.
#[derive(Debug)]
pub struct ItemFlow {
    items: Vec<DroppedItem>,
    config: ItemFlowConfig,
    rng: ChaCha8Rng,
    events: EventSender,
}

impl ItemFlow {
    /// Creates an empty item set. `seed` drives the scatter of dropped items.
    #[must_use]
    pub fn new(config: ItemFlowConfig, seed: u64, events: EventSender) -> Self {
        Self {
            items: Vec::new(),
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            events,
        }
    }

    /// Live items, oldest first.
    #[must_use]
    pub fn items(&self) -> &[DroppedItem] {
        &self.items
    }

    /// Number of live items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no items are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Removes every item.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Motion settings.
    #[must_use]
    pub const fn config(&self) -> &ItemFlowConfig {
        &self.config
    }

    /// Puts an item into the world.
    ///
    /// A thrown item flies toward the sign of `direction` with a slight
    /// lift, or straight up for a zero direction. A dropped one pops up with
    /// a random sideways scatter.
    pub fn spawn_item(&mut self, kind: ItemKind, x: f32, y: f32, thrown: bool, direction: f32) {
        self.push(kind, [x, y], thrown, direction);
        self.enforce_cap();
    }

    fn push(&mut self, kind: ItemKind, position: [f32; 2], thrown: bool, direction: f32) {
        let velocity = if thrown {
            let aim = if direction == 0.0 { 0.0 } else { direction.signum() };
            [aim * self.config.throw_speed, self.config.throw_lift]
        } else {
            let (lo, hi) = self.config.spawn_lift;
            let spread = self.config.spawn_spread;
            let lift = if lo < hi { self.rng.gen_range(lo..=hi) } else { lo };
            let side = if spread > 0.0 {
                self.rng.gen_range(-spread..=spread)
            } else {
                0.0
            };
            [side, lift]
        };

        self.items.push(DroppedItem {
            kind,
            position,
            velocity,
            thrown,
            age: 0.0,
        });
        self.events.send(GameEvent::ItemSpawned {
            item: kind,
            position,
            thrown,
        });
    }

    /// Advances every item by `dt` seconds.
    pub fn update(&mut self, dt: f32, ctx: &mut FlowContext<'_>) -> FlowReport {
        let mut report = FlowReport::default();
        let mut emitted: Vec<(ItemKind, [f32; 2])> = Vec::new();
        let damping = self.config.horizontal_damping.powf(dt * 60.0);

        let items = std::mem::take(&mut self.items);
        let mut kept = Vec::with_capacity(items.len());
        for mut item in items {
            let (cx, cy) = item.cell();
            if ctx.world.block_at(cx, cy).is_none() {
                kept.push(item);
                continue;
            }

            item.age += dt;
            item.position[0] += item.velocity[0] * dt;
            item.position[1] += item.velocity[1] * dt;
            item.velocity[1] -= self.config.gravity * dt;
            item.velocity[0] *= damping;

            match self.step(&mut item, dt, ctx, &mut emitted, &mut report) {
                Fate::Keep => kept.push(item),
                Fate::Gone => {}
            }
        }
        self.items = kept;

        report.produced = u32::try_from(emitted.len()).unwrap_or(u32::MAX);
        for (kind, position) in emitted {
            self.push(kind, position, false, 0.0);
        }
        report.discarded += self.enforce_cap();
        report
    }

    fn step(
        &self,
        item: &mut DroppedItem,
        dt: f32,
        ctx: &mut FlowContext<'_>,
        emitted: &mut Vec<(ItemKind, [f32; 2])>,
        report: &mut FlowReport,
    ) -> Fate {
        let half = self.config.item_size / 2.0;
        let touching = ctx.collision.cells_overlapping(&item.bounds(self.config.item_size));

        if item.thrown && item.kind == ItemKind::AcidFlask {
            let rock = touching.iter().copied().find(|&(x, y)| {
                ctx.world
                    .block_at(x, y)
                    .is_some_and(|b| b.category() == BlockCategory::Solid)
            });
            if let Some(center) = rock {
                report.bursts += 1;
                report.blocks_cleared += self.burst(ctx.world, center, item.position);
                return Fate::Gone;
            }
        }

        for &(x, y) in &touching {
            let Some(block) = ctx.world.block_at(x, y) else {
                continue;
            };
            if !block.rests_items() {
                continue;
            }
            item.velocity = [0.0, 0.0];
            let top = (y + 1) as f32;
            if item.position[1] >= top {
                item.position[1] = top + half;
            }
        }

        if item.thrown {
            for &(x, y) in &touching {
                let Some(block) = ctx.world.block_at(x, y) else {
                    continue;
                };
                if block.device_kind().is_none() {
                    continue;
                }
                let Some(outcome) = ctx.world.feed_device(x, y, item.kind, ctx.recipes, ctx.economy) else {
                    continue;
                };
                if !outcome.consumed {
                    continue;
                }
                report.consumed += 1;
                self.events.send(GameEvent::ItemConsumed {
                    item: item.kind,
                    device: block,
                    cell: (x, y),
                });
                let above = [x as f32 + 0.5, y as f32 + 1.5];
                emitted.extend(outcome.produced.into_iter().map(|kind| (kind, above)));
                if outcome.mana_restored > 0 {
                    let gained = ctx.player.restore_mana(outcome.mana_restored);
                    self.events.send(GameEvent::ManaRestored {
                        amount: gained,
                        total: ctx.player.mana(),
                    });
                }
                tracing::trace!(item = %item.kind, device = %block, x, y, "item fed to device");
                return Fate::Gone;
            }
        }

        if item.age <= self.config.grace_period {
            return Fate::Keep;
        }
        let target = ctx.player.position;
        let dist = distance(item.position, target);
        let resting = item.velocity[0].abs() < self.config.rest_speed
            && item.velocity[1].abs() < self.config.rest_speed;
        if (!item.thrown || resting) && dist < self.config.attraction_radius && dist > 0.0 {
            let nudge = self.config.attraction_accel * dt / dist;
            item.velocity[0] += (target[0] - item.position[0]) * nudge;
            item.velocity[1] += (target[1] - item.position[1]) * nudge;
        }
        if dist < self.config.pickup_radius {
            ctx.player.add_to_inventory(item.kind, 1);
            report.picked_up += 1;
            self.events.send(GameEvent::ItemPickedUp {
                item: item.kind,
                total: ctx.player.inventory.count(item.kind),
            });
            return Fate::Gone;
        }
        Fate::Keep
    }

    /// Clears breakable rock around `center`. Returns the number of blocks
    /// removed.
    fn burst(&self, world: &mut World, center: (i32, i32), at: [f32; 2]) -> u32 {
        let mut cleared = 0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                let (x, y) = (center.0 + dx, center.1 + dy);
                let Some(block) = world.block_at(x, y) else {
                    continue;
                };
                if block.category() != BlockCategory::Solid || block.is_indestructible() {
                    continue;
                }
                if world.remove_block(x, y).is_some() {
                    cleared += 1;
                    self.events.send(GameEvent::BlockRemoved { block, cell: (x, y) });
                }
            }
        }
        self.events.send(GameEvent::ParticleBurst {
            position: at,
            count: ACID_PARTICLES,
            effect: Effect::Acid,
        });
        tracing::debug!(x = center.0, y = center.1, cleared, "acid flask burst");
        cleared
    }

    /// Drops the oldest items beyond the cap. Returns how many went.
    fn enforce_cap(&mut self) -> u32 {
        let excess = self.items.len().saturating_sub(self.config.max_items);
        if excess == 0 {
            return 0;
        }
        self.items.drain(..excess);
        tracing::debug!(excess, "item cap reached, oldest items discarded");
        u32::try_from(excess).unwrap_or(u32::MAX)
    }
}
