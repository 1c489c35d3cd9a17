use std::time::Duration;

use tilemotion_core::{CellCoord, Command, EntityId, EntityKind, Event, Vector};
use tilemotion_system_pursuit::Pursuit;
use tilemotion_world::{self as world, query, World};

#[test]
fn deterministic_replay_produces_identical_outcomes() {
    let first = replay(scripted_commands());
    let second = replay(scripted_commands());

    assert_eq!(first, second, "replay diverged between runs");
    let fox = EntityId::new(1);
    assert!(
        first.events.iter().any(|record| matches!(
            record,
            EventRecord::EntityMoved { entity, .. } if *entity == fox
        )),
        "fox never moved during the replay"
    );
}

fn replay(commands: Vec<Command>) -> ReplayOutcome {
    let mut world = World::with_default_layout();
    let mut pursuit = Pursuit::default();
    let mut log = Vec::new();

    for command in commands {
        let mut events = Vec::new();
        world::apply(&mut world, command, &mut events);
        record_events(&events, &mut log);
        process_pursuit(&mut world, &mut pursuit, events, &mut log);
    }

    let entities = query::entity_view(&world)
        .into_vec()
        .into_iter()
        .map(|snapshot| EntityState {
            id: snapshot.id,
            position: bits(snapshot.position),
            desired_velocity: bits(snapshot.desired_velocity),
            health: snapshot.health,
        })
        .collect();

    ReplayOutcome {
        entities,
        events: log,
    }
}

fn process_pursuit(
    world: &mut World,
    pursuit: &mut Pursuit,
    pending_events: Vec<Event>,
    log: &mut Vec<EventRecord>,
) {
    let mut events = pending_events;

    loop {
        if events.is_empty() {
            break;
        }

        let mut commands = Vec::new();
        pursuit.handle(&events, &query::entity_view(world), &mut commands);

        if commands.is_empty() {
            break;
        }

        events.clear();
        for command in commands {
            let mut generated_events = Vec::new();
            world::apply(world, command, &mut generated_events);
            record_events(&generated_events, log);
            events.extend(generated_events);
        }
    }
}

fn record_events(events: &[Event], log: &mut Vec<EventRecord>) {
    log.extend(events.iter().filter_map(EventRecord::from_event));
}

fn scripted_commands() -> Vec<Command> {
    let mut commands = vec![
        Command::SpawnEntity {
            kind: EntityKind::Player,
            position: Vector::new(-1.5, 0.5),
        },
        Command::SpawnEntity {
            kind: EntityKind::Fox,
            position: Vector::new(1.5, 2.5),
        },
        Command::SpawnEntity {
            kind: EntityKind::Fox,
            position: Vector::new(2.5, -2.5),
        },
        Command::SetDesiredVelocity {
            entity: EntityId::new(0),
            velocity: Vector::new(0.05, 0.02),
        },
    ];
    commands.extend((0..60).map(|_| Command::Tick {
        dt: Duration::from_millis(16),
    }));
    commands.push(Command::RemoveBlock {
        cell: CellCoord::new(0, 1),
    });
    commands.extend((0..30).map(|_| Command::Tick {
        dt: Duration::from_millis(16),
    }));
    commands
}

fn bits(vector: Vector) -> (u64, u64) {
    (vector.x.to_bits(), vector.y.to_bits())
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ReplayOutcome {
    entities: Vec<EntityState>,
    events: Vec<EventRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct EntityState {
    id: EntityId,
    position: (u64, u64),
    desired_velocity: (u64, u64),
    health: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum EventRecord {
    TimeAdvanced {
        tick: u64,
        dt_micros: u128,
    },
    EntityMoved {
        entity: EntityId,
        from: (u64, u64),
        to: (u64, u64),
    },
    MotionObstructed {
        entity: EntityId,
        actual: (u64, u64),
    },
    BlockRemoved {
        cell: CellCoord,
    },
    EntityDamaged {
        entity: EntityId,
        source: EntityId,
        health: u32,
    },
}

impl EventRecord {
    fn from_event(event: &Event) -> Option<Self> {
        match event {
            Event::TimeAdvanced { dt, tick } => Some(Self::TimeAdvanced {
                tick: *tick,
                dt_micros: dt.as_micros(),
            }),
            Event::EntityMoved { entity, from, to } => Some(Self::EntityMoved {
                entity: *entity,
                from: bits(*from),
                to: bits(*to),
            }),
            Event::MotionObstructed { entity, actual, .. } => Some(Self::MotionObstructed {
                entity: *entity,
                actual: bits(*actual),
            }),
            Event::BlockRemoved { cell, .. } => Some(Self::BlockRemoved { cell: *cell }),
            Event::EntityDamaged {
                entity,
                source,
                health,
                ..
            } => Some(Self::EntityDamaged {
                entity: *entity,
                source: *source,
                health: *health,
            }),
            _ => None,
        }
    }
}
