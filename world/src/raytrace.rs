//! Enumeration of the grid cells a segment passes through.

use std::collections::BTreeMap;

use log::trace;
use tilemotion_core::{
    numeric::{approx_lt, on_grid_line},
    Block, CellCoord, EntityKind, Passability, Vector,
};

use crate::grid::Grid;

/// Largest gap between the parallel sample rays of a wide trace.
const SAMPLE_SPACING: f64 = 0.5;

/// What a traced cell holds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Occupant<'g> {
    /// A populated cell.
    Block(&'g Block),
    /// An unmapped cell, identified by its coordinate.
    Void(CellCoord),
}

impl Occupant<'_> {
    /// Block in the cell, if the cell is populated.
    #[must_use]
    pub fn block(&self) -> Option<&Block> {
        match self {
            Self::Block(block) => Some(block),
            Self::Void(_) => None,
        }
    }
}

impl Passability for Occupant<'_> {
    fn can_pass(&self, entity: Option<EntityKind>) -> bool {
        match self {
            Self::Block(block) => block.can_pass(entity),
            Self::Void(_) => false,
        }
    }
}

/// A cell crossed by a traced segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit<'g> {
    cell: CellCoord,
    occupant: Occupant<'g>,
    displacement: Vector,
}

impl<'g> RayHit<'g> {
    /// Cell that was crossed.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// What the crossed cell holds.
    #[must_use]
    pub const fn occupant(&self) -> Occupant<'g> {
        self.occupant
    }

    /// Displacement from the trace start to where the segment first touches
    /// the cell, measured along the centre line.
    #[must_use]
    pub const fn displacement(&self) -> Vector {
        self.displacement
    }

    /// Length of [`RayHit::displacement`].
    #[must_use]
    pub fn distance(&self) -> f64 {
        self.displacement.length()
    }
}

/// Enumerates every cell whose interior the segment from `start` along
/// `direction` for `length` passes through, ordered by hit distance.
///
/// A cell whose interior already contains `start` reports the point where the
/// segment leaves it. A positive `width` sweeps a corridor of that width
/// centred on the segment and reports each cell at the earliest distance any
/// part of the corridor reaches it. Ties are broken by cell coordinate so the
/// order is fully deterministic.
#[must_use]
pub fn ray_trace_block(
    grid: &Grid,
    start: Vector,
    direction: Vector,
    length: f64,
    width: f64,
) -> Vec<RayHit<'_>> {
    if direction.is_zero() || !length.is_finite() || length <= 0.0 {
        return Vec::new();
    }
    let unit = direction.normalized();
    let width = width.max(0.0);
    let end = start + unit * length;

    let (mut step_x, mut step_y) = unit.directional_steps();
    if step_x == 0 && on_grid_line(start.x) {
        step_x = 1;
    }
    if step_y == 0 && on_grid_line(start.y) {
        step_y = 1;
    }

    let (min_x, max_x) = axis_span(start.x, end.x, step_x, width);
    let (min_y, max_y) = axis_span(start.y, end.y, step_y, width);

    let origins = sample_origins(start, unit, width);
    let mut nearest: BTreeMap<CellCoord, f64> = BTreeMap::new();
    for x in min_x..=max_x {
        for y in min_y..=max_y {
            let cell = CellCoord::new(x, y);
            let earliest = origins
                .iter()
                .filter_map(|origin| cell.hit_point(*origin, unit))
                .map(Vector::length)
                .filter(|distance| approx_lt(*distance, length))
                .min_by(f64::total_cmp);
            if let Some(distance) = earliest {
                let _ = nearest.insert(cell, distance);
            }
        }
    }

    let mut hits: Vec<RayHit<'_>> = nearest
        .into_iter()
        .map(|(cell, distance)| RayHit {
            cell,
            occupant: grid
                .block_at(cell)
                .map_or(Occupant::Void(cell), Occupant::Block),
            displacement: unit * distance,
        })
        .collect();
    hits.sort_by(|a, b| {
        a.distance()
            .total_cmp(&b.distance())
            .then_with(|| a.cell.cmp(&b.cell))
    });

    trace!(
        "ray from {start} along {unit} for {length:.3} (width {width:.2}) crossed {} cells",
        hits.len()
    );
    hits
}

/// Inclusive range of cells to examine on one axis. Coordinates beyond the
/// `i32` range clamp to its bounds.
fn axis_span(start: f64, end: f64, step: i32, width: f64) -> (i32, i32) {
    if step == 0 {
        if width == 0.0 {
            let cell = start.floor() as i32;
            return (cell, cell);
        }
        let pad = width / 2.0 + 1.0;
        return ((start - pad).floor() as i32, (start + pad).floor() as i32);
    }

    let pad = f64::from(step) * (width + 1.0);
    let from = (start - pad).floor() as i32;
    let to = (end + pad).floor() as i32;
    (from.min(to).saturating_sub(1), from.max(to).saturating_add(1))
}

/// Origins of the parallel rays sweeping a corridor of `width` around the
/// centre line. Both corridor edges are always sampled.
fn sample_origins(start: Vector, unit: Vector, width: f64) -> Vec<Vector> {
    if width == 0.0 {
        return vec![start];
    }
    let normal = Vector::new(-unit.y, unit.x);
    let gaps = (width / SAMPLE_SPACING).ceil().max(1.0);
    let count = gaps as usize;
    (0..=count)
        .map(|index| {
            let offset = -width / 2.0 + width * (index as f64) / gaps;
            start + normal * offset
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilemotion_core::BlockKind;

    fn open_field(columns: std::ops::Range<i32>, rows: std::ops::Range<i32>) -> Grid {
        columns
            .flat_map(|x| rows.clone().map(move |y| CellCoord::new(x, y)))
            .map(|cell| (cell, Block::new(BlockKind::Grass)))
            .collect()
    }

    fn cells(hits: &[RayHit<'_>]) -> Vec<CellCoord> {
        hits.iter().map(RayHit::cell).collect()
    }

    #[test]
    fn zero_direction_traces_nothing() {
        let grid = open_field(0..3, 0..3);
        assert!(grid
            .ray_trace(Vector::new(0.5, 0.5), Vector::ZERO, 2.0, 0.0)
            .is_empty());
    }

    #[test]
    fn horizontal_trace_lists_cells_in_order() {
        let grid = open_field(0..5, 0..1);
        let hits = grid.ray_trace(Vector::new(0.5, 0.5), Vector::new(1.0, 0.0), 3.0, 0.0);

        assert_eq!(
            cells(&hits),
            vec![
                CellCoord::new(0, 0),
                CellCoord::new(1, 0),
                CellCoord::new(2, 0),
                CellCoord::new(3, 0),
            ]
        );
        assert!(hits[0].displacement().approx_eq(Vector::new(0.5, 0.0)));
        assert!(hits[1].displacement().approx_eq(Vector::new(0.5, 0.0)));
        assert!(hits[3].displacement().approx_eq(Vector::new(2.5, 0.0)));
    }

    #[test]
    fn hits_at_exactly_the_length_are_excluded() {
        let grid = open_field(0..5, 0..1);
        let hits = grid.ray_trace(Vector::new(0.5, 0.5), Vector::new(1.0, 0.0), 1.5, 0.0);
        assert_eq!(
            cells(&hits),
            vec![CellCoord::new(0, 0), CellCoord::new(1, 0)]
        );
    }

    #[test]
    fn unmapped_cells_are_reported_as_void() {
        let grid = open_field(0..1, 0..1);
        let hits = grid.ray_trace(Vector::new(0.5, 0.5), Vector::new(1.0, 0.0), 1.0, 0.0);

        let void = hits
            .iter()
            .find(|hit| hit.cell() == CellCoord::new(1, 0))
            .expect("neighbouring cell should be crossed");
        assert_eq!(void.occupant(), Occupant::Void(CellCoord::new(1, 0)));
        assert!(!void.occupant().can_pass(Some(EntityKind::Player)));
        assert!(void.occupant().block().is_none());
    }

    #[test]
    fn trace_along_a_grid_line_touches_no_cells() {
        let grid = open_field(0..4, 0..4);
        let hits = grid.ray_trace(Vector::new(1.0, 0.5), Vector::new(0.0, 1.0), 2.0, 0.0);
        assert!(hits.is_empty());
    }

    #[test]
    fn diagonal_through_a_vertex_skips_the_touched_corners() {
        let grid = open_field(0..3, 0..3);
        let hits = grid.ray_trace(Vector::new(0.5, 0.5), Vector::new(1.0, 1.0), 2.5, 0.0);

        let mut crossed = cells(&hits);
        crossed.sort();
        assert_eq!(
            crossed,
            vec![
                CellCoord::new(0, 0),
                CellCoord::new(1, 1),
                CellCoord::new(2, 2),
            ]
        );
        assert_eq!(hits[2].cell(), CellCoord::new(2, 2));

        let entered = hits
            .iter()
            .find(|hit| hit.cell() == CellCoord::new(1, 1))
            .expect("diagonal cell should be crossed");
        assert!(entered.displacement().approx_eq(Vector::new(0.5, 0.5)));
    }

    #[test]
    fn trace_beyond_the_cell_range_finds_nothing() {
        let grid = open_field(0..2, 0..2);
        let hits = grid.ray_trace(Vector::new(-3.0e9, 0.5), Vector::new(-1.0, 0.0), 1.0, 0.0);
        assert!(hits.is_empty());

        let hits = grid.ray_trace(Vector::new(0.5, 3.0e9), Vector::new(0.0, 1.0), 1.0, 2.0);
        assert!(hits.is_empty());
    }

    #[test]
    fn wide_trace_reaches_neighbouring_rows() {
        let grid = open_field(0..4, -1..2);
        let hits = grid.ray_trace(Vector::new(0.5, 0.5), Vector::new(1.0, 0.0), 2.0, 1.0);

        let rows: Vec<i32> = hits.iter().map(|hit| hit.cell().y()).collect();
        assert!(rows.contains(&0));
        assert!(!rows.contains(&-1), "corridor edges only graze the outer rows");

        let wider = grid.ray_trace(Vector::new(0.5, 0.5), Vector::new(1.0, 0.0), 2.0, 1.5);
        assert!(wider.iter().any(|hit| hit.cell() == CellCoord::new(1, -1)));
        assert!(wider.iter().any(|hit| hit.cell() == CellCoord::new(1, 1)));
        for pair in wider.windows(2) {
            assert!(pair[0].distance() <= pair[1].distance());
        }
    }
}
