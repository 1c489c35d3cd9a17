//! Drives the world and the pursuit system one tick at a time.

use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tilemotion_core::{CellCoord, Command, EntityId, EntityKind, Event, Vector};
use tilemotion_system_pursuit::Pursuit;
use tilemotion_world::{self as world, query, Grid, World, WorldSnapshot};

use crate::scenario::Scenario;

/// World plus the systems and scripts that act on it.
#[derive(Debug)]
pub(crate) struct Simulation {
    world: World,
    pursuit: Pursuit,
    scenario: Scenario,
    player: Option<EntityId>,
}

impl Simulation {
    /// Builds a fresh world from the scenario, spawning the player and
    /// scattering foxes with a generator seeded by `seed`.
    pub(crate) fn new(scenario: Scenario, seed: u64) -> Self {
        let mut world = World::with_grid(scenario.grid.clone());
        let mut events = Vec::new();

        world::apply(
            &mut world,
            Command::SpawnEntity {
                kind: EntityKind::Player,
                position: scenario.player_position,
            },
            &mut events,
        );

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let spots = scatter_foxes(
            &scenario.grid,
            CellCoord::containing(scenario.player_position),
            scenario.fox_count,
            scenario.min_spawn_distance,
            &mut rng,
        );
        if spots.len() < scenario.fox_count {
            warn!(
                "only {} of {} foxes fit the layout",
                spots.len(),
                scenario.fox_count
            );
        }
        for position in spots {
            world::apply(
                &mut world,
                Command::SpawnEntity {
                    kind: EntityKind::Fox,
                    position,
                },
                &mut events,
            );
        }

        let player = spawned_player(&events);
        Self {
            world,
            pursuit: Pursuit::new(scenario.pursuit),
            scenario,
            player,
        }
    }

    /// Rebuilds a simulation from a saved world. The scenario only contributes
    /// the player's script and the fox tunables.
    pub(crate) fn resume(snapshot: WorldSnapshot, scenario: Scenario) -> Result<Self> {
        let world = World::from_snapshot(snapshot).context("saved world is inconsistent")?;
        let player = query::player(&world).map(|player| player.id);
        info!(
            "resumed world at tick {} with {} blocks",
            query::tick_index(&world),
            query::grid(&world).len()
        );
        Ok(Self {
            world,
            pursuit: Pursuit::new(scenario.pursuit),
            scenario,
            player,
        })
    }

    /// Read-only access to the simulated world.
    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    /// Advances the world by one tick and lets the foxes react, returning every
    /// event produced along the way.
    pub(crate) fn step(&mut self, dt: Duration) -> Vec<Event> {
        let mut log = Vec::new();

        // The script is indexed by completed world ticks so a resumed save
        // picks it up where the saved run left off.
        let tick = query::tick_index(&self.world);
        if let (Some(player), Some(velocity)) =
            (self.player, self.scenario.velocity_change_at(tick))
        {
            self.apply(
                Command::SetDesiredVelocity {
                    entity: player,
                    velocity,
                },
                &mut log,
            );
        }

        let mut events = Vec::new();
        self.apply(Command::Tick { dt }, &mut events);
        log.extend(events.iter().cloned());

        loop {
            if events.is_empty() {
                break;
            }

            let mut commands = Vec::new();
            self.pursuit
                .handle(&events, &query::entity_view(&self.world), &mut commands);
            if commands.is_empty() {
                break;
            }

            events.clear();
            for command in commands {
                self.apply(command, &mut events);
            }
            log.extend(events.iter().cloned());
        }

        log
    }

    fn apply(&mut self, command: Command, out: &mut Vec<Event>) {
        let start = out.len();
        world::apply(&mut self.world, command, out);
        for event in &out[start..] {
            match event {
                Event::MotionObstructed {
                    entity,
                    desired,
                    actual,
                } => debug!(
                    "entity {} obstructed: wanted {desired}, moved {actual}",
                    entity.get()
                ),
                Event::EntityCommandRejected { entity, reason } => {
                    warn!("command for entity {} rejected: {reason:?}", entity.get());
                }
                Event::SpawnRejected { kind, reason } => {
                    warn!("spawning {kind:?} rejected: {reason:?}");
                }
                Event::EntityDamaged {
                    entity,
                    source,
                    amount,
                    health,
                } => info!(
                    "entity {} hit entity {} for {amount}, {health} health left",
                    source.get(),
                    entity.get()
                ),
                _ => {}
            }
        }
    }
}

/// Picks distinct passable cell centres at least `min_distance` cells away
/// from the player.
fn scatter_foxes(
    grid: &Grid,
    player_cell: CellCoord,
    count: usize,
    min_distance: u32,
    rng: &mut ChaCha8Rng,
) -> Vec<Vector> {
    let candidates: Vec<CellCoord> = grid
        .iter()
        .map(|(cell, _)| cell)
        .filter(|cell| grid.is_passable(*cell, Some(EntityKind::Fox)))
        .filter(|cell| cell.manhattan_distance(player_cell) >= min_distance)
        .collect();

    candidates
        .choose_multiple(rng, count)
        .map(|cell| cell.center())
        .collect()
}

fn spawned_player(events: &[Event]) -> Option<EntityId> {
    events.iter().find_map(|event| match event {
        Event::EntitySpawned {
            entity,
            kind: EntityKind::Player,
            ..
        } => Some(*entity),
        _ => None,
    })
}
