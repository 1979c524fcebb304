//! # QUARRY Event System
//!
//! Outbound notifications from the simulation to whatever draws, plays
//! sounds or logs.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐      ┌─────────────┐      ┌─────────────┐
//! │ Simulation  │─────>│   Event     │─────>│  Renderer   │
//! │   (tick)    │      │   Channel   │      │  Audio, UI  │
//! └─────────────┘      └─────────────┘      └─────────────┘
//! ```
//!
//! The simulation never waits on a consumer. The channel is bounded and a
//! full channel drops the event: a missed particle burst is harmless, a
//! stalled tick is not.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use quarry_economy::ItemKind;
use quarry_procedural::BlockType;

/// Visual flavour of a particle burst.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Rock broken by a tool.
    Debris,
    /// Core block cracked open.
    CoreCrack,
    /// Acid flask burst.
    Acid,
}

/// Events emitted by the simulation.
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    // =========================================================================
    // Item Events
    // =========================================================================
    /// A dropped item entered the world.
    ItemSpawned {
        /// Item kind.
        item: ItemKind,
        /// Spawn position.
        position: [f32; 2],
        /// Thrown by the player.
        thrown: bool,
    },

    /// A device took a dropped item.
    ItemConsumed {
        /// Item kind.
        item: ItemKind,
        /// Device that took it.
        device: BlockType,
        /// Device cell.
        cell: (i32, i32),
    },

    /// The player collected a dropped item.
    ItemPickedUp {
        /// Item kind.
        item: ItemKind,
        /// New inventory count.
        total: u32,
    },

    // =========================================================================
    // Block Events
    // =========================================================================
    /// A cell was emptied.
    BlockRemoved {
        /// Block that stood there.
        block: BlockType,
        /// Cell.
        cell: (i32, i32),
    },

    /// A block was placed from the inventory.
    BlockPlaced {
        /// Placed block.
        block: BlockType,
        /// Cell.
        cell: (i32, i32),
    },

    // =========================================================================
    // Effects
    // =========================================================================
    /// Particles at a point.
    ParticleBurst {
        /// Burst centre.
        position: [f32; 2],
        /// Number of particles.
        count: u32,
        /// Flavour.
        effect: Effect,
    },

    /// Floating damage number over the player.
    DamageNumber {
        /// Damage taken.
        amount: u32,
        /// Where to show it.
        position: [f32; 2],
    },

    /// Player mana went up.
    ManaRestored {
        /// Mana actually gained after the cap.
        amount: u32,
        /// Mana after the gain.
        total: u32,
    },
}

/// Event bus between the simulation and its consumers.
///
/// Pre-allocates a bounded channel to prevent memory growth when nobody
/// is draining.
pub struct EventBus {
    /// Sender end - held by the simulation.
    sender: Sender<GameEvent>,
    /// Receiver end - held by consumers.
    receiver: Receiver<GameEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum events in flight before new ones are dropped.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Creates a sender handle (clone for multiple producers).
    #[must_use]
    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Creates a receiver handle.
    #[must_use]
    pub fn receiver(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.receiver.clone(),
        }
    }

    /// Creates a new pair of sender and receiver.
    #[must_use]
    pub fn create_pair(capacity: usize) -> (EventSender, EventReceiver) {
        let bus = Self::new(capacity);
        (bus.sender(), bus.receiver())
    }
}

/// Handle for sending events.
#[derive(Clone, Debug)]
pub struct EventSender {
    sender: Sender<GameEvent>,
}

impl EventSender {
    /// Sends an event (non-blocking).
    ///
    /// Returns `false` if the event was dropped.
    #[inline]
    pub fn send(&self, event: GameEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::trace!("event channel full, dropping event");
                false
            }
            // Nobody listening; headless runs do this on purpose.
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Handle for receiving events.
#[derive(Clone, Debug)]
pub struct EventReceiver {
    receiver: Receiver<GameEvent>,
}

impl EventReceiver {
    /// Receives all pending events (non-blocking).
    #[inline]
    #[must_use]
    pub fn drain(&self) -> Vec<GameEvent> {
        let mut events = Vec::with_capacity(self.receiver.len());
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Receives one event (non-blocking).
    #[inline]
    #[must_use]
    pub fn try_recv(&self) -> Option<GameEvent> {
        self.receiver.try_recv().ok()
    }

    /// Returns the number of pending events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Checks if there are pending events.
    #[inline]
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.receiver.is_empty()
    }
}
