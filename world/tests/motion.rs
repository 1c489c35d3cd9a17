use tilemotion_core::{numeric::EPSILON, Block, BlockKind, CellCoord, Passability, Vector};
use tilemotion_world::{BlockRegistry, Grid, MotionResolver};

/// Builds a grid from glyph rows whose first character sits on `origin`.
fn grid(origin: CellCoord, rows: &[&str]) -> Grid {
    BlockRegistry::standard()
        .parse_rows(origin, rows)
        .expect("test layout parses")
        .into_iter()
        .collect()
}

/// Grass field from (0, 0) to (5, 3) with stone at (2, 0) and (2, 1).
fn two_stone_wall() -> Grid {
    grid(
        CellCoord::new(0, 0),
        &["gg#ggg", "gg#ggg", "gggggg", "gggggg"],
    )
}

fn assert_close(actual: Vector, expected: Vector) {
    assert!(
        actual.approx_eq(expected),
        "expected {expected}, resolved {actual}"
    );
}

fn ends_outside_walls(grid: &Grid, start: Vector, moved: Vector) -> bool {
    let end = start + moved;
    !grid.iter().any(|(cell, block)| {
        !block.can_pass(None) && cell.contains_interior(end)
    })
}

#[test]
fn straight_approach_stops_at_the_wall_face() {
    let grid = two_stone_wall();
    let resolver = MotionResolver::new(&grid);

    let moved = resolver.resolve(Vector::new(1.9, 0.5), Vector::new(0.5, 0.0));
    assert_close(moved, Vector::new(0.1, 0.0));
}

#[test]
fn diagonal_approach_ends_on_the_shared_corner() {
    let grid = two_stone_wall();
    let resolver = MotionResolver::new(&grid);
    let start = Vector::new(1.5, 0.5);
    let desired = Vector::new(0.5, 0.5);

    // The path only grazes the wall at (2, 1), where it ends, so nothing
    // shortens it: x stops on the wall face and y is untouched.
    let moved = resolver.resolve(start, desired);
    assert_close(moved, desired);
    assert_close(start + moved, Vector::new(2.0, 1.0));

    // Any further push into the wall keeps x pinned to the face.
    let moved = resolver.resolve(Vector::new(2.0, 0.9), Vector::new(0.5, 0.05));
    assert_close(moved, Vector::new(0.0, 0.05));
}

#[test]
fn continuing_past_the_corner_slides_down_the_wall() {
    let grid = two_stone_wall();
    let resolver = MotionResolver::new(&grid);

    let moved = resolver.resolve(Vector::new(2.0, 1.0), Vector::new(0.5, 0.5));
    assert_close(moved, Vector::new(0.0, 0.5));

    let moved = resolver.resolve(Vector::new(1.0, 0.5), Vector::new(1.5, 0.5));
    assert_close(moved, Vector::new(1.0, 0.5));
}

#[test]
fn wall_contact_is_a_stable_rest() {
    let grid = two_stone_wall();
    let resolver = MotionResolver::new(&grid);
    let resting = Vector::new(2.0, 0.5);

    for _ in 0..5 {
        let moved = resolver.resolve(resting, Vector::new(0.3, 0.0));
        assert!(moved.is_zero(), "resting entity drifted by {moved}");
    }
}

#[test]
fn zero_desired_velocity_resolves_to_zero() {
    let grid = two_stone_wall();
    let resolver = MotionResolver::new(&grid);
    assert_eq!(resolver.resolve(Vector::new(0.5, 0.5), Vector::ZERO), Vector::ZERO);
}

#[test]
fn sliding_preserves_the_tangential_component() {
    let grid = grid(
        CellCoord::new(0, 0),
        &["gg#g", "gg#g", "gg#g", "gg#g"],
    );
    let resolver = MotionResolver::new(&grid);
    let desired = Vector::new(0.8, 0.3);

    let moved = resolver.resolve(Vector::new(1.5, 0.5), desired);
    assert_close(moved, Vector::new(0.5, 0.3));

    let moved = resolver.resolve(Vector::new(1.5, 2.5), Vector::new(0.8, -0.3));
    assert_close(moved, Vector::new(0.5, -0.3));
}

#[test]
fn slide_stops_at_a_seam() {
    let grid = grid(
        CellCoord::new(0, 0),
        &["gg#g", "gg#g", "g##g", "gggg"],
    );
    let resolver = MotionResolver::new(&grid);

    // Lands on the top face of (1, 2), then slides right until the seam
    // between (2, 1) and (2, 2).
    let moved = resolver.resolve(Vector::new(1.5, 1.5), Vector::new(0.8, 1.2));
    assert_close(moved, Vector::new(0.5, 0.5));
}

#[test]
fn diagonal_gap_between_two_walls_is_sealed() {
    let grid = grid(CellCoord::new(0, 0), &["g#g", "#gg", "ggg"]);
    let resolver = MotionResolver::new(&grid);
    let mut position = Vector::new(0.5, 0.5);

    for _ in 0..10 {
        let moved = resolver.resolve(position, Vector::new(0.3, 0.3));
        position += moved;
        assert!(position.x < 1.0 && position.y < 1.0, "slipped through to {position}");
    }
}

#[test]
fn sliding_along_a_wall_face_cannot_slip_through_a_diagonal_gap() {
    let grid = grid(CellCoord::new(0, 0), &["g#gggggg", "#ggggggg", "gggggggg"]);
    let resolver = MotionResolver::new(&grid);

    for desired in [Vector::new(0.8, 0.3), Vector::new(0.3, 0.8)] {
        let mut position = Vector::new(0.5, 0.5);
        for tick in 0..10 {
            position += resolver.resolve(position, desired);
            assert!(
                position.x <= 1.0 && position.y <= 1.0,
                "escaped through the gap to {position} on tick {tick} asking for {desired}"
            );
        }
    }
}

#[test]
fn void_cells_behave_like_walls() {
    let grid = grid(CellCoord::new(0, 0), &["gg.g"]);
    let resolver = MotionResolver::new(&grid);

    let moved = resolver.resolve(Vector::new(1.5, 0.5), Vector::new(2.0, 0.0));
    assert_close(moved, Vector::new(0.5, 0.0));
}

#[test]
fn entity_spawned_inside_a_wall_can_walk_out() {
    let grid = two_stone_wall();
    let resolver = MotionResolver::new(&grid);

    let moved = resolver.resolve(Vector::new(2.5, 0.5), Vector::new(1.0, 0.0));
    assert_close(moved, Vector::new(1.0, 0.0));
}

#[test]
fn resolved_motion_never_exceeds_the_request() {
    let grid = two_stone_wall();
    let resolver = MotionResolver::new(&grid);
    let starts = [
        Vector::new(0.5, 0.5),
        Vector::new(1.9, 1.9),
        Vector::new(3.5, 2.5),
        Vector::new(2.0, 2.0),
    ];
    let requests = [
        Vector::new(1.0, 0.0),
        Vector::new(0.7, -0.7),
        Vector::new(-1.2, 0.4),
        Vector::new(0.0, -2.0),
    ];

    for start in starts {
        for desired in requests {
            let moved = resolver.resolve(start, desired);
            assert!(moved.length() <= desired.length() + EPSILON);
            assert!(ends_outside_walls(&grid, start, moved), "{start} + {moved}");
        }
    }
}

#[test]
fn placing_a_block_changes_the_next_resolution() {
    let mut grid = two_stone_wall();
    let start = Vector::new(3.5, 2.5);
    let desired = Vector::new(1.0, 0.0);

    let before = MotionResolver::new(&grid).resolve(start, desired);
    assert_close(before, desired);

    let _ = grid.set_block_at(CellCoord::new(4, 2), Block::new(BlockKind::Water));
    let after = MotionResolver::new(&grid).resolve(start, desired);
    assert_close(after, Vector::new(0.5, 0.0));
}
