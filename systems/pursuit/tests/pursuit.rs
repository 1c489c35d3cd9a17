use std::time::Duration;

use tilemotion_core::{Command, EntityId, EntityKind, Event, Vector, MAX_HEALTH};
use tilemotion_system_pursuit::{
    Pursuit, DEFAULT_ATTACK_COOLDOWN, DEFAULT_ATTACK_DAMAGE, DEFAULT_FOX_SPEED,
};
use tilemotion_world::{self as world, query, World};

fn spawn(world: &mut World, kind: EntityKind, x: f64, y: f64) -> EntityId {
    let mut events = Vec::new();
    world::apply(
        world,
        Command::SpawnEntity {
            kind,
            position: Vector::new(x, y),
        },
        &mut events,
    );
    events
        .iter()
        .find_map(|event| match event {
            Event::EntitySpawned { entity, .. } => Some(*entity),
            _ => None,
        })
        .expect("spawn accepted")
}

/// Advances the world by one tick and lets pursuit react, returning the
/// commands it issued.
fn step(world: &mut World, pursuit: &mut Pursuit) -> Vec<Command> {
    let mut events = Vec::new();
    world::apply(
        world,
        Command::Tick {
            dt: Duration::from_millis(16),
        },
        &mut events,
    );

    let mut commands = Vec::new();
    pursuit.handle(&events, &query::entity_view(world), &mut commands);
    for command in commands.clone() {
        let mut follow_up = Vec::new();
        world::apply(world, command, &mut follow_up);
    }
    commands
}

fn requested_velocity(commands: &[Command], fox: EntityId) -> Option<Vector> {
    commands.iter().find_map(|command| match command {
        Command::SetDesiredVelocity { entity, velocity } if *entity == fox => Some(*velocity),
        _ => None,
    })
}

#[test]
fn fox_locks_on_within_range_and_heads_for_the_player() {
    let mut world = World::with_default_layout();
    let player = spawn(&mut world, EntityKind::Player, -2.5, -2.5);
    let fox = spawn(&mut world, EntityKind::Fox, 0.5, -2.5);
    let mut pursuit = Pursuit::default();

    let commands = step(&mut world, &mut pursuit);
    assert!(commands.is_empty(), "lock-on tick must not steer: {commands:?}");
    assert_eq!(pursuit.lock_of(fox), Some(player));

    let commands = step(&mut world, &mut pursuit);
    let velocity = requested_velocity(&commands, fox).expect("fox steers once locked");
    assert!(velocity.approx_eq(Vector::new(-DEFAULT_FOX_SPEED, 0.0)));

    let commands = step(&mut world, &mut pursuit);
    assert!(commands.is_empty(), "unchanged request was re-issued");
    let snapshot = query::entity(&world, fox).expect("fox exists");
    assert!(snapshot.position.x < 0.5);
}

#[test]
fn distant_fox_ignores_the_player() {
    let mut world = World::with_default_layout();
    let _ = spawn(&mut world, EntityKind::Player, -2.5, -2.5);
    let fox = spawn(&mut world, EntityKind::Fox, 2.5, 2.5);
    let mut pursuit = Pursuit::default();

    for _ in 0..5 {
        assert!(step(&mut world, &mut pursuit).is_empty());
    }
    assert!(pursuit.lock_of(fox).is_none());
    let snapshot = query::entity(&world, fox).expect("fox exists");
    assert_eq!(snapshot.position, Vector::new(2.5, 2.5));
}

#[test]
fn fox_releases_a_player_that_escapes_the_range() {
    let mut world = World::with_default_layout();
    let player = spawn(&mut world, EntityKind::Player, -0.5, -2.5);
    let fox = spawn(&mut world, EntityKind::Fox, 2.5, -2.5);
    let mut pursuit = Pursuit::default();

    let _ = step(&mut world, &mut pursuit);
    let _ = step(&mut world, &mut pursuit);
    assert_eq!(pursuit.lock_of(fox), Some(player));

    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::SetDesiredVelocity {
            entity: player,
            velocity: Vector::new(-1.0, 0.0),
        },
        &mut events,
    );

    let commands = step(&mut world, &mut pursuit);
    assert!(commands.is_empty(), "player still within range");

    let commands = step(&mut world, &mut pursuit);
    assert_eq!(requested_velocity(&commands, fox), Some(Vector::ZERO));
    assert!(pursuit.lock_of(fox).is_none());
}

#[test]
fn fox_halts_beside_a_stationary_player() {
    let mut world = World::with_default_layout();
    let player = spawn(&mut world, EntityKind::Player, 0.5, -2.5);
    let fox = spawn(&mut world, EntityKind::Fox, 1.5, -2.5);
    let mut pursuit = Pursuit::default();

    for _ in 0..40 {
        let _ = step(&mut world, &mut pursuit);
    }

    let player = query::entity(&world, player).expect("player exists");
    let fox = query::entity(&world, fox).expect("fox exists");
    let gap = fox.position.x - player.position.x;
    assert!(gap > 0.0, "fox overshot the player: gap {gap}");
    assert!(gap < DEFAULT_FOX_SPEED + 1e-9, "fox stopped short: gap {gap}");
    assert_eq!(fox.desired_velocity, Vector::ZERO);
}

#[test]
fn despawned_player_clears_the_lock() {
    let mut world = World::with_default_layout();
    let player = spawn(&mut world, EntityKind::Player, -2.5, -2.5);
    let fox = spawn(&mut world, EntityKind::Fox, 0.5, -2.5);
    let mut pursuit = Pursuit::default();
    let _ = step(&mut world, &mut pursuit);
    let _ = step(&mut world, &mut pursuit);

    let mut events = Vec::new();
    world::apply(&mut world, Command::DespawnEntity { entity: player }, &mut events);
    let mut commands = Vec::new();
    pursuit.handle(&events, &query::entity_view(&world), &mut commands);
    assert!(commands.is_empty());
    assert!(pursuit.lock_of(fox).is_none());

    let commands = step(&mut world, &mut pursuit);
    assert_eq!(requested_velocity(&commands, fox), Some(Vector::ZERO));
}

#[test]
fn halted_fox_bites_on_cooldown() {
    let mut world = World::with_default_layout();
    let player = spawn(&mut world, EntityKind::Player, 0.5, -2.5);
    let fox = spawn(&mut world, EntityKind::Fox, 1.5, -2.5);
    let mut pursuit = Pursuit::default();

    let mut bite_ticks = Vec::new();
    for tick in 0..60 {
        let commands = step(&mut world, &mut pursuit);
        let bit = commands.iter().any(|command| {
            matches!(
                command,
                Command::DamageEntity { entity, source, amount: DEFAULT_ATTACK_DAMAGE }
                    if *entity == player && *source == fox
            )
        });
        if bit {
            bite_ticks.push(tick);
        }
    }

    assert!(bite_ticks.len() >= 3, "too few bites: {bite_ticks:?}");
    for pair in bite_ticks.windows(2) {
        assert_eq!(pair[1] - pair[0], DEFAULT_ATTACK_COOLDOWN);
    }
    let bites = u32::try_from(bite_ticks.len()).expect("bite count fits");
    let player = query::entity(&world, player).expect("player exists");
    assert_eq!(player.health, MAX_HEALTH - bites * DEFAULT_ATTACK_DAMAGE);
}
