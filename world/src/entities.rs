//! Authoritative entity state and identifier allocation.

use std::collections::BTreeMap;

use tilemotion_core::{
    numeric::on_grid_line, EntityId, EntityKind, EntitySnapshot, Vector, MAX_HEALTH,
};

/// State of an entity stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct EntityState {
    /// Identifier allocated by the world for the entity.
    pub(crate) id: EntityId,
    /// Kind of the entity.
    pub(crate) kind: EntityKind,
    /// Current position.
    pub(crate) position: Vector,
    /// Displacement applied during the most recent tick.
    pub(crate) velocity: Vector,
    /// Displacement requested for upcoming ticks.
    pub(crate) desired_velocity: Vector,
    /// Remaining health points.
    pub(crate) health: u32,
}

impl EntityState {
    fn at_rest(id: EntityId, kind: EntityKind, position: Vector) -> Self {
        Self {
            id,
            kind,
            position,
            velocity: Vector::ZERO,
            desired_velocity: Vector::ZERO,
            health: MAX_HEALTH,
        }
    }

    /// Removes up to `amount` health and returns how much was removed.
    pub(crate) fn damage(&mut self, amount: u32) -> u32 {
        let dealt = amount.min(self.health);
        self.health -= dealt;
        dealt
    }

    /// Applies a resolved displacement, snapping drifted coordinates back onto
    /// the grid lines they belong to.
    pub(crate) fn advance(&mut self, actual: Vector) {
        self.velocity = actual;
        self.position = snap_to_grid_lines(self.position + actual);
    }

    pub(crate) fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            kind: self.kind,
            position: self.position,
            velocity: self.velocity,
            desired_velocity: self.desired_velocity,
            health: self.health,
        }
    }
}

impl From<EntitySnapshot> for EntityState {
    fn from(snapshot: EntitySnapshot) -> Self {
        Self {
            id: snapshot.id,
            kind: snapshot.kind,
            position: snapshot.position,
            velocity: snapshot.velocity,
            desired_velocity: snapshot.desired_velocity,
            health: snapshot.health,
        }
    }
}

/// Registry that stores entities and manages identifier allocation.
#[derive(Clone, Debug)]
pub(crate) struct EntityRegistry {
    entries: BTreeMap<EntityId, EntityState>,
    next_entity_id: EntityId,
}

impl EntityRegistry {
    /// Creates an empty entity registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_entity_id: EntityId::new(0),
        }
    }

    /// Stores a new entity at rest and returns its identifier.
    pub(crate) fn spawn(&mut self, kind: EntityKind, position: Vector) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id = EntityId::new(id.get().saturating_add(1));
        let _ = self
            .entries
            .insert(id, EntityState::at_rest(id, kind, position));
        id
    }

    /// Inserts a restored entity, keeping identifier allocation ahead of it.
    /// Returns `false` when the identifier is already taken.
    pub(crate) fn restore(&mut self, state: EntityState) -> bool {
        if self.entries.contains_key(&state.id) {
            return false;
        }
        if state.id >= self.next_entity_id {
            self.next_entity_id = EntityId::new(state.id.get().saturating_add(1));
        }
        let _ = self.entries.insert(state.id, state);
        true
    }

    pub(crate) fn remove(&mut self, id: EntityId) -> Option<EntityState> {
        self.entries.remove(&id)
    }

    pub(crate) fn get(&self, id: EntityId) -> Option<&EntityState> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityState> {
        self.entries.get_mut(&id)
    }

    /// Entities in identifier order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &EntityState> {
        self.entries.values()
    }

    /// Entities in identifier order.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut EntityState> {
        self.entries.values_mut()
    }
}

/// Rounds coordinates that lie within tolerance of a grid line onto it.
fn snap_to_grid_lines(point: Vector) -> Vector {
    let snap = |value: f64| {
        if on_grid_line(value) {
            value.round()
        } else {
            value
        }
    };
    Vector::new(snap(point.x), snap(point.y))
}
