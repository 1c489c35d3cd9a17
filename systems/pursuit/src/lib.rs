#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that steers foxes straight at a nearby player.
//!
//! A fox locks on once the player comes within its search range, measured in
//! Manhattan distance, and releases the lock when the player leaves it. While
//! locked the fox asks to move straight at the player, never overshooting it,
//! and halts once it is closer than a single step. A halted fox bites,
//! then waits out its cooldown before biting again.

use std::collections::BTreeMap;

use log::debug;
use tilemotion_core::{
    numeric::{approx_lt, approx_zero},
    Command, EntityId, EntityKind, EntitySnapshot, EntityView, Event, Vector,
};

/// Manhattan distance within which a fox notices the player.
pub const DEFAULT_SEARCH_RANGE: f64 = 4.0;

/// Largest displacement a fox requests per tick.
pub const DEFAULT_FOX_SPEED: f64 = 0.06;

/// Health a fox bite removes.
pub const DEFAULT_ATTACK_DAMAGE: u32 = 8;

/// Ticks between two bites of the same fox.
pub const DEFAULT_ATTACK_COOLDOWN: u32 = 10;

/// Tunables for the pursuit behaviour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PursuitConfig {
    search_range: f64,
    max_speed: f64,
    attack_damage: u32,
    attack_cooldown: u32,
}

impl PursuitConfig {
    /// Creates a configuration with the provided search range and speed and
    /// the default bite.
    #[must_use]
    pub const fn new(search_range: f64, max_speed: f64) -> Self {
        Self {
            search_range,
            max_speed,
            attack_damage: DEFAULT_ATTACK_DAMAGE,
            attack_cooldown: DEFAULT_ATTACK_COOLDOWN,
        }
    }

    /// Replaces the bite damage and the ticks a fox waits between bites.
    #[must_use]
    pub const fn with_attack(mut self, damage: u32, cooldown: u32) -> Self {
        self.attack_damage = damage;
        self.attack_cooldown = cooldown;
        self
    }

    /// Manhattan distance within which the player is noticed.
    #[must_use]
    pub const fn search_range(&self) -> f64 {
        self.search_range
    }

    /// Largest displacement requested per tick.
    #[must_use]
    pub const fn max_speed(&self) -> f64 {
        self.max_speed
    }

    /// Health removed by one bite.
    #[must_use]
    pub const fn attack_damage(&self) -> u32 {
        self.attack_damage
    }

    /// Ticks a fox waits between bites.
    #[must_use]
    pub const fn attack_cooldown(&self) -> u32 {
        self.attack_cooldown
    }
}

impl Default for PursuitConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_RANGE, DEFAULT_FOX_SPEED)
    }
}

/// Pure system that reacts to world events and emits steering commands.
#[derive(Debug, Default)]
pub struct Pursuit {
    config: PursuitConfig,
    locks: BTreeMap<EntityId, EntityId>,
    cooldowns: BTreeMap<EntityId, u32>,
}

/// What a fox does on one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Steering {
    /// Velocity to request, or `None` to keep the current request.
    velocity: Option<Vector>,
    /// Player to bite.
    bite: Option<EntityId>,
}

impl Steering {
    const fn keep() -> Self {
        Self {
            velocity: None,
            bite: None,
        }
    }

    const fn request(velocity: Vector) -> Self {
        Self {
            velocity: Some(velocity),
            bite: None,
        }
    }
}

impl Pursuit {
    /// Creates a pursuit system with the provided configuration.
    #[must_use]
    pub fn new(config: PursuitConfig) -> Self {
        Self {
            config,
            locks: BTreeMap::new(),
            cooldowns: BTreeMap::new(),
        }
    }

    /// Player each fox is currently locked on to.
    #[must_use]
    pub fn lock_of(&self, fox: EntityId) -> Option<EntityId> {
        self.locks.get(&fox).copied()
    }

    /// Ticks the fox still has to wait before it may bite again.
    #[must_use]
    pub fn cooldown_of(&self, fox: EntityId) -> u32 {
        self.cooldowns.get(&fox).copied().unwrap_or(0)
    }

    /// Consumes world events and the entity view to emit steering and attack
    /// commands.
    ///
    /// Foxes are only re-evaluated on ticks, and a steering command is emitted
    /// only when the proposed velocity differs from the one the fox already
    /// holds.
    pub fn handle(&mut self, events: &[Event], entities: &EntityView, out: &mut Vec<Command>) {
        for event in events {
            if let Event::EntityDespawned { entity } = event {
                let _ = self.locks.remove(entity);
                let _ = self.cooldowns.remove(entity);
                self.locks.retain(|_, target| target != entity);
            }
        }

        if !events
            .iter()
            .any(|event| matches!(event, Event::TimeAdvanced { .. }))
        {
            return;
        }

        let player = entities.player();
        for fox in entities.iter().filter(|entity| entity.kind == EntityKind::Fox) {
            let steering = self.steer(fox, player);
            if let Some(proposal) = steering.velocity {
                if proposal != fox.desired_velocity {
                    out.push(Command::SetDesiredVelocity {
                        entity: fox.id,
                        velocity: proposal,
                    });
                }
            }
            if let Some(target) = steering.bite {
                debug!("fox {} bites player {}", fox.id.get(), target.get());
                out.push(Command::DamageEntity {
                    entity: target,
                    source: fox.id,
                    amount: self.config.attack_damage,
                });
            }
            if let Some(remaining) = self.cooldowns.get_mut(&fox.id) {
                *remaining = remaining.saturating_sub(1);
            }
        }
    }

    fn steer(&mut self, fox: &EntitySnapshot, player: Option<&EntitySnapshot>) -> Steering {
        let Some(player) = player else {
            let _ = self.locks.remove(&fox.id);
            return Steering::request(Vector::ZERO);
        };
        let range = fox.position.manhattan_distance(player.position);

        if self.lock_of(fox.id) != Some(player.id) {
            if range <= self.config.search_range {
                debug!("fox {} locked on to player {}", fox.id.get(), player.id.get());
                let _ = self.locks.insert(fox.id, player.id);
            }
            return Steering::keep();
        }

        if range > self.config.search_range {
            debug!("fox {} lost player {}", fox.id.get(), player.id.get());
            let _ = self.locks.remove(&fox.id);
            return Steering::request(Vector::ZERO);
        }

        let offset = player.position - fox.position;
        let distance = offset.length();
        if approx_zero(distance) {
            return Steering::request(Vector::ZERO);
        }
        if approx_lt(distance, self.config.max_speed) {
            let mut steering = Steering::request(Vector::ZERO);
            if self.cooldown_of(fox.id) == 0 && player.health > 0 {
                let _ = self.cooldowns.insert(fox.id, self.config.attack_cooldown);
                steering.bite = Some(player.id);
            }
            return steering;
        }
        Steering::request(offset.normalized() * self.config.max_speed.min(distance))
    }
}
