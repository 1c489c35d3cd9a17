#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for tilemotion.
//!
//! The world owns the sparse block grid and every entity. Adapters and systems
//! mutate it exclusively through [`apply`] and observe it through [`query`].

mod entities;
mod grid;
pub mod motion;
pub mod raytrace;
pub mod registry;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tilemotion_core::{
    Block, BlockKind, CellCoord, Command, EntityId, EntityRejection, EntitySnapshot, Event,
};

use crate::entities::{EntityRegistry, EntityState};
pub use crate::grid::Grid;
pub use crate::motion::MotionResolver;
pub use crate::raytrace::{Occupant, RayHit};
pub use crate::registry::{BlockRegistry, LayoutError, RegistryError};

/// Half extent of the default square layout, in cells.
const DEFAULT_LAYOUT_RADIUS: i32 = 3;

/// Represents the authoritative tilemotion world state.
#[derive(Clone, Debug)]
pub struct World {
    grid: Grid,
    entities: EntityRegistry,
    tick_index: u64,
}

impl World {
    /// Creates a world in which every cell is void and no entity exists.
    #[must_use]
    pub fn new() -> Self {
        Self::with_grid(Grid::new())
    }

    /// Creates a world over the provided grid.
    #[must_use]
    pub fn with_grid(grid: Grid) -> Self {
        Self {
            grid,
            entities: EntityRegistry::new(),
            tick_index: 0,
        }
    }

    /// Creates the starter world: a 7x7 field of grass around the origin with
    /// a path at the centre and one void hole south-east of it.
    #[must_use]
    pub fn with_default_layout() -> Self {
        let range = -DEFAULT_LAYOUT_RADIUS..=DEFAULT_LAYOUT_RADIUS;
        let grid = range
            .clone()
            .flat_map(|x| range.clone().map(move |y| CellCoord::new(x, y)))
            .filter(|cell| *cell != CellCoord::new(1, 1))
            .map(|cell| {
                let kind = if cell == CellCoord::new(0, 0) {
                    BlockKind::Path
                } else {
                    BlockKind::Grass
                };
                (cell, Block::new(kind))
            })
            .collect();
        Self::with_grid(grid)
    }

    /// Rebuilds a world from a snapshot previously captured with
    /// [`query::snapshot`].
    pub fn from_snapshot(snapshot: WorldSnapshot) -> Result<Self, SnapshotError> {
        let mut grid = Grid::new();
        for placed in snapshot.blocks {
            if grid.set_block_at(placed.cell, placed.block).is_some() {
                return Err(SnapshotError::DuplicateCell(placed.cell));
            }
        }

        let mut entities = EntityRegistry::new();
        for entity in snapshot.entities {
            if !(entity.position.is_finite()
                && entity.velocity.is_finite()
                && entity.desired_velocity.is_finite())
            {
                return Err(SnapshotError::NonFiniteEntity(entity.id));
            }
            if !(entity.position.within_limit() && entity.desired_velocity.within_limit()) {
                return Err(SnapshotError::OutOfRangeEntity(entity.id));
            }
            if !entities.restore(EntityState::from(entity)) {
                return Err(SnapshotError::DuplicateEntity(entity.id));
            }
        }

        Ok(Self {
            grid,
            entities,
            tick_index: snapshot.tick,
        })
    }

    fn advance_entities(&mut self, out_events: &mut Vec<Event>) {
        let Self { grid, entities, .. } = self;
        for entity in entities.iter_mut() {
            let resolver = MotionResolver::for_entity(grid, entity.kind);
            let desired = entity.desired_velocity;
            let actual = resolver.resolve(entity.position, desired);
            let from = entity.position;
            entity.advance(actual);

            if !actual.approx_eq(desired) {
                debug!("entity {} wanted {desired}, moved {actual}", entity.id.get());
                out_events.push(Event::MotionObstructed {
                    entity: entity.id,
                    desired,
                    actual,
                });
            }
            if !actual.is_zero() {
                out_events.push(Event::EntityMoved {
                    entity: entity.id,
                    from,
                    to: entity.position,
                });
            }
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialisable capture of the grid and every entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Number of ticks the world had completed.
    pub tick: u64,
    /// Populated cells in coordinate order.
    pub blocks: Vec<PlacedBlock>,
    /// Entities in identifier order.
    pub entities: Vec<EntitySnapshot>,
}

/// A block together with the cell it occupies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedBlock {
    /// Cell holding the block.
    pub cell: CellCoord,
    /// Block standing in the cell.
    pub block: Block,
}

/// Failures raised while rebuilding a world from a snapshot.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    /// Two blocks claimed the same cell.
    #[error("cell {0} holds more than one block")]
    DuplicateCell(CellCoord),
    /// Two entities shared an identifier.
    #[error("entity id {} appears more than once", .0.get())]
    DuplicateEntity(EntityId),
    /// An entity carried a NaN or infinite coordinate.
    #[error("entity {} has a non-finite position or velocity", .0.get())]
    NonFiniteEntity(EntityId),
    /// An entity stood or steered beyond the addressable coordinate range.
    #[error("entity {} lies outside the addressable coordinate range", .0.get())]
    OutOfRangeEntity(EntityId),
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::PlaceBlock { cell, block } => {
            let previous = world.grid.set_block_at(cell, block.clone());
            out_events.push(Event::BlockPlaced {
                cell,
                block,
                previous,
            });
        }
        Command::RemoveBlock { cell } => match world.grid.remove_block_at(cell) {
            Some(block) => out_events.push(Event::BlockRemoved { cell, block }),
            None => out_events.push(Event::BlockRemovalRejected { cell }),
        },
        Command::SpawnEntity { kind, position } => {
            if !position.is_finite() {
                out_events.push(Event::SpawnRejected {
                    kind,
                    reason: EntityRejection::NonFiniteVector,
                });
                return;
            }
            if !position.within_limit() {
                out_events.push(Event::SpawnRejected {
                    kind,
                    reason: EntityRejection::OutOfRange,
                });
                return;
            }
            let entity = world.entities.spawn(kind, position);
            info!("spawned {kind:?} {} at {position}", entity.get());
            out_events.push(Event::EntitySpawned {
                entity,
                kind,
                position,
            });
        }
        Command::DespawnEntity { entity } => match world.entities.remove(entity) {
            Some(_) => {
                info!("despawned entity {}", entity.get());
                out_events.push(Event::EntityDespawned { entity });
            }
            None => out_events.push(Event::EntityCommandRejected {
                entity,
                reason: EntityRejection::MissingEntity,
            }),
        },
        Command::SetDesiredVelocity { entity, velocity } => {
            let Some(state) = world.entities.get_mut(entity) else {
                out_events.push(Event::EntityCommandRejected {
                    entity,
                    reason: EntityRejection::MissingEntity,
                });
                return;
            };
            if !velocity.is_finite() {
                out_events.push(Event::EntityCommandRejected {
                    entity,
                    reason: EntityRejection::NonFiniteVector,
                });
                return;
            }
            if !velocity.within_limit() {
                out_events.push(Event::EntityCommandRejected {
                    entity,
                    reason: EntityRejection::OutOfRange,
                });
                return;
            }
            state.desired_velocity = velocity;
        }
        Command::DamageEntity {
            entity,
            source,
            amount,
        } => {
            let Some(state) = world.entities.get_mut(entity) else {
                out_events.push(Event::EntityCommandRejected {
                    entity,
                    reason: EntityRejection::MissingEntity,
                });
                return;
            };
            let dealt = state.damage(amount);
            debug!(
                "entity {} hit entity {} for {dealt}, {} left",
                source.get(),
                entity.get(),
                state.health
            );
            out_events.push(Event::EntityDamaged {
                entity,
                source,
                amount: dealt,
                health: state.health,
            });
        }
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced {
                dt,
                tick: world.tick_index,
            });
            world.advance_entities(out_events);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use tilemotion_core::{
        Block, CellCoord, EntityId, EntityKind, EntitySnapshot, EntityView, Vector,
    };

    use super::{Grid, PlacedBlock, RayHit, World, WorldSnapshot};

    /// Block occupying the provided cell, if any.
    #[must_use]
    pub fn block_at(world: &World, cell: CellCoord) -> Option<&Block> {
        world.grid.block_at(cell)
    }

    /// Provides read-only access to the block grid.
    #[must_use]
    pub fn grid(world: &World) -> &Grid {
        &world.grid
    }

    /// Captures a read-only view of every entity.
    #[must_use]
    pub fn entity_view(world: &World) -> EntityView {
        EntityView::from_snapshots(world.entities.iter().map(|entity| entity.snapshot()).collect())
    }

    /// Snapshot of a single entity.
    #[must_use]
    pub fn entity(world: &World, id: EntityId) -> Option<EntitySnapshot> {
        world.entities.get(id).map(|entity| entity.snapshot())
    }

    /// Snapshot of the player with the lowest identifier, if any.
    #[must_use]
    pub fn player(world: &World) -> Option<EntitySnapshot> {
        world
            .entities
            .iter()
            .find(|entity| entity.kind == EntityKind::Player)
            .map(|entity| entity.snapshot())
    }

    /// Number of ticks the world has completed.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Enumerates the cells a segment crosses, nearest first.
    #[must_use]
    pub fn ray_trace_block(
        world: &World,
        start: Vector,
        direction: Vector,
        length: f64,
        width: f64,
    ) -> Vec<RayHit<'_>> {
        world.grid.ray_trace(start, direction, length, width)
    }

    /// Captures the full world state for persistence.
    #[must_use]
    pub fn snapshot(world: &World) -> WorldSnapshot {
        WorldSnapshot {
            tick: world.tick_index,
            blocks: world
                .grid
                .iter()
                .map(|(cell, block)| PlacedBlock {
                    cell,
                    block: block.clone(),
                })
                .collect(),
            entities: world.entities.iter().map(|entity| entity.snapshot()).collect(),
        }
    }
}
