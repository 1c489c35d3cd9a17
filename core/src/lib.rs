#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the tilemotion engine.
//!
//! This crate defines the geometry every other crate speaks in and the message
//! surface that connects adapters, the authoritative world, and pure systems.
//! Adapters submit [`Command`] values describing desired mutations, the world
//! executes those commands via its `apply` entry point, and then broadcasts
//! [`Event`] values for systems to react to deterministically. Systems consume
//! event streams, query immutable snapshots, and respond exclusively with new
//! command batches.

use std::time::Duration;

use serde::{Deserialize, Serialize};

mod block;
mod geometry;
pub mod numeric;
mod sync;

pub use block::{Block, BlockKind, HeldElement, Passability};
pub use geometry::{on_grid_vertex, CellCoord, Vector, COORDINATE_LIMIT, HALF_CELL};
pub use sync::SynchronizedStorage;

/// Health every entity spawns with.
pub const MAX_HEALTH: u32 = 100;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Places a block into a cell, replacing any previous occupant.
    PlaceBlock {
        /// Cell receiving the block.
        cell: CellCoord,
        /// Block to place.
        block: Block,
    },
    /// Clears a cell back to void.
    RemoveBlock {
        /// Cell to clear.
        cell: CellCoord,
    },
    /// Spawns a new entity at rest.
    SpawnEntity {
        /// Kind of entity to create.
        kind: EntityKind,
        /// Initial position in world space.
        position: Vector,
    },
    /// Removes an entity from the world.
    DespawnEntity {
        /// Identifier of the entity to remove.
        entity: EntityId,
    },
    /// Sets the velocity an entity wants to travel with on following ticks.
    SetDesiredVelocity {
        /// Identifier of the entity to steer.
        entity: EntityId,
        /// Requested displacement per tick.
        velocity: Vector,
    },
    /// Deals damage to an entity on behalf of another.
    DamageEntity {
        /// Identifier of the entity being hurt.
        entity: EntityId,
        /// Entity dealing the damage.
        source: EntityId,
        /// Health points to remove.
        amount: u32,
    },
    /// Advances the simulation by one fixed-rate tick.
    Tick {
        /// Duration of simulated time covered by the tick.
        dt: Duration,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
        /// Index of the tick that just completed, starting at one.
        tick: u64,
    },
    /// Confirms that a block was placed.
    BlockPlaced {
        /// Cell that received the block.
        cell: CellCoord,
        /// Block now occupying the cell.
        block: Block,
        /// Block that occupied the cell before, if any.
        previous: Option<Block>,
    },
    /// Confirms that a cell was cleared.
    BlockRemoved {
        /// Cell that was cleared.
        cell: CellCoord,
        /// Block that occupied the cell.
        block: Block,
    },
    /// Reports that a removal targeted a cell that was already void.
    BlockRemovalRejected {
        /// Cell named by the rejected command.
        cell: CellCoord,
    },
    /// Confirms that an entity was created.
    EntitySpawned {
        /// Identifier allocated to the entity.
        entity: EntityId,
        /// Kind of the entity.
        kind: EntityKind,
        /// Position the entity spawned at.
        position: Vector,
    },
    /// Reports that a spawn request was refused.
    SpawnRejected {
        /// Kind of entity requested.
        kind: EntityKind,
        /// Specific reason the spawn failed.
        reason: EntityRejection,
    },
    /// Confirms that an entity was removed.
    EntityDespawned {
        /// Identifier of the removed entity.
        entity: EntityId,
    },
    /// Confirms that an entity changed position during a tick.
    EntityMoved {
        /// Identifier of the entity that moved.
        entity: EntityId,
        /// Position before the tick.
        from: Vector,
        /// Position after the tick.
        to: Vector,
    },
    /// Reports that the grid shortened or redirected an entity's motion.
    MotionObstructed {
        /// Identifier of the obstructed entity.
        entity: EntityId,
        /// Velocity the entity asked for.
        desired: Vector,
        /// Velocity that was actually applied.
        actual: Vector,
    },
    /// Confirms that an entity lost health.
    EntityDamaged {
        /// Identifier of the entity that was hurt.
        entity: EntityId,
        /// Entity that dealt the damage.
        source: EntityId,
        /// Health actually removed, never more than the entity had left.
        amount: u32,
        /// Health remaining afterwards.
        health: u32,
    },
    /// Reports that a command naming an entity was refused.
    EntityCommandRejected {
        /// Identifier named by the command.
        entity: EntityId,
        /// Specific reason the command failed.
        reason: EntityRejection,
    },
}

/// Reasons the world may refuse an entity command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRejection {
    /// No entity with the provided identifier exists.
    MissingEntity,
    /// A position or velocity component was NaN or infinite.
    NonFiniteVector,
    /// A position or velocity component exceeded [`COORDINATE_LIMIT`].
    OutOfRange,
}

/// Kinds of entities that move through the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// The player-controlled character.
    Player,
    /// Hostile fox that walks straight at the player.
    Fox,
}

/// Unique identifier assigned to an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Immutable representation of a single entity's state used for queries and
/// persistence.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Unique identifier assigned to the entity.
    pub id: EntityId,
    /// Kind of the entity.
    pub kind: EntityKind,
    /// Current position.
    pub position: Vector,
    /// Velocity applied during the most recent tick.
    pub velocity: Vector,
    /// Velocity requested for upcoming ticks.
    pub desired_velocity: Vector,
    /// Remaining health points.
    #[serde(default = "full_health")]
    pub health: u32,
}

fn full_health() -> u32 {
    MAX_HEALTH
}

impl EntitySnapshot {
    /// Position the renderer should draw at `delta` ticks past the last update.
    #[must_use]
    pub fn interpolated_position(&self, delta: f64) -> Vector {
        self.position + self.velocity * delta
    }
}

/// Read-only snapshot describing all entities in the world.
#[derive(Clone, Debug, Default)]
pub struct EntityView {
    snapshots: Vec<EntitySnapshot>,
}

impl EntityView {
    /// Creates a new entity view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EntitySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.snapshots.iter()
    }

    /// Snapshot of the entity with the provided identifier.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// First player entity, if any.
    #[must_use]
    pub fn player(&self) -> Option<&EntitySnapshot> {
        self.iter().find(|snapshot| snapshot.kind == EntityKind::Player)
    }

    /// Number of captured entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EntitySnapshot> {
        self.snapshots
    }
}
