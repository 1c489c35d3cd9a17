//! Resolution of a desired per-tick displacement against the block grid.
//!
//! An entity is a point. It may stand anywhere that is not strictly inside an
//! impassable cell, which includes the faces and corners of walls. Three
//! things stop it:
//!
//! * entering an impassable or void cell,
//! * passing through a vertex whose two diagonally opposite cells are both
//!   impassable, whether travelling diagonally or sliding along a wall face,
//! * running along a grid line that has impassable cells on both sides (a
//!   seam).
//!
//! When the first stop lies on a single wall face the remaining displacement
//! slides along that face. When it lies on a corner, a horizontal slide is
//! tried before a vertical one.

use log::debug;
use tilemotion_core::{
    numeric::{approx_gt, approx_lt, approx_zero, on_grid_line},
    on_grid_vertex, CellCoord, EntityKind, Passability, Vector,
};

use crate::grid::Grid;

/// Distance an entity keeps from a vertex it was refused passage through.
pub const SQUEEZE_CLEARANCE: f64 = 1e-6;

/// Where a contact point lies relative to the grid lines, considering only
/// the axes along which motion remains.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelativeBlock {
    /// Not on any grid line crossed by the remaining motion.
    Mid,
    /// On a vertical grid line; horizontal motion is blocked.
    VerticalEdge,
    /// On a horizontal grid line; vertical motion is blocked.
    HorizontalEdge,
    /// On a grid vertex with motion remaining on both axes.
    Corner,
}

/// Classifies `contact` for an entity that still wants to travel `remaining`.
#[must_use]
pub fn relative_block(contact: Vector, remaining: Vector) -> RelativeBlock {
    let blocks_x = on_grid_line(contact.x) && !approx_zero(remaining.x);
    let blocks_y = on_grid_line(contact.y) && !approx_zero(remaining.y);
    match (blocks_x, blocks_y) {
        (false, false) => RelativeBlock::Mid,
        (true, false) => RelativeBlock::VerticalEdge,
        (false, true) => RelativeBlock::HorizontalEdge,
        (true, true) => RelativeBlock::Corner,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum ObstructionKind {
    Wall,
    Squeeze(Vector),
    Seam,
}

#[derive(Clone, Copy, Debug)]
struct Obstruction {
    displacement: Vector,
    kind: ObstructionKind,
}

impl Obstruction {
    fn distance(&self) -> f64 {
        self.displacement.length()
    }
}

/// Turns desired displacements into collision-free ones for one mover.
#[derive(Clone, Copy, Debug)]
pub struct MotionResolver<'g> {
    grid: &'g Grid,
    mover: Option<EntityKind>,
}

impl<'g> MotionResolver<'g> {
    /// Creates a resolver that asks the grid on behalf of no particular
    /// entity.
    #[must_use]
    pub const fn new(grid: &'g Grid) -> Self {
        Self { grid, mover: None }
    }

    /// Resolver that asks the grid on behalf of `kind`.
    #[must_use]
    pub const fn for_entity(grid: &'g Grid, kind: EntityKind) -> Self {
        Self {
            grid,
            mover: Some(kind),
        }
    }

    /// Displacement the mover at `position` actually achieves when it asks
    /// for `desired`. The result is never longer than `desired`.
    #[must_use]
    pub fn resolve(&self, position: Vector, desired: Vector) -> Vector {
        if desired.is_zero() {
            return Vector::ZERO;
        }

        for obstruction in self.obstructions(position, desired) {
            let reached = obstruction.displacement;
            if let ObstructionKind::Squeeze(vertex) = obstruction.kind {
                debug!("{position} refused diagonal squeeze at {vertex}");
                return back_off(reached, desired);
            }

            let contact = position + reached;
            let remaining = desired - reached;
            let slide = match relative_block(contact, remaining) {
                RelativeBlock::Mid => continue,
                RelativeBlock::VerticalEdge => {
                    self.squeeze_check(contact, Vector::new(0.0, remaining.y))
                }
                RelativeBlock::HorizontalEdge => {
                    self.squeeze_check(contact, Vector::new(remaining.x, 0.0))
                }
                RelativeBlock::Corner => self.corner_slide(contact, remaining),
            };
            debug!(
                "{position} obstructed by {:?} at {contact}, sliding {slide}",
                obstruction.kind
            );
            return reached + slide;
        }

        desired
    }

    fn passable(&self, cell: CellCoord) -> bool {
        self.grid.is_passable(cell, self.mover)
    }

    /// Tries the horizontal then the vertical slide away from a corner.
    fn corner_slide(&self, vertex: Vector, remaining: Vector) -> Vector {
        let (step_x, step_y) = remaining.directional_steps();
        let column = vertex.x.round() as i32;
        let row = vertex.y.round() as i32;

        let horizontal = (
            Vector::new(remaining.x, 0.0),
            CellCoord::new(
                column + if step_x > 0 { 0 } else { -1 },
                row + if step_y > 0 { -1 } else { 0 },
            ),
        );
        let vertical = (
            Vector::new(0.0, remaining.y),
            CellCoord::new(
                column + if step_x > 0 { -1 } else { 0 },
                row + if step_y > 0 { 0 } else { -1 },
            ),
        );

        for (slide, beside) in [horizontal, vertical] {
            if slide.is_zero() || !self.passable(beside) {
                continue;
            }
            let allowed = self.squeeze_check(vertex, slide);
            if !allowed.is_zero() {
                return allowed;
            }
        }
        Vector::ZERO
    }

    /// Portion of `travel` from `start` that meets no obstruction.
    fn squeeze_check(&self, start: Vector, travel: Vector) -> Vector {
        if travel.is_zero() {
            return Vector::ZERO;
        }
        match self.obstructions(start, travel).first() {
            Some(obstruction) => match obstruction.kind {
                ObstructionKind::Squeeze(_) => back_off(obstruction.displacement, travel),
                ObstructionKind::Wall | ObstructionKind::Seam => obstruction.displacement,
            },
            None => travel,
        }
    }

    /// Every obstruction along `travel` from `start`, nearest first.
    fn obstructions(&self, start: Vector, travel: Vector) -> Vec<Obstruction> {
        let length = travel.length();
        let mut found = Vec::new();

        for hit in self.grid.ray_trace(start, travel, length, 0.0) {
            let cell = hit.cell();
            if cell.contains_interior(start) {
                continue;
            }
            if !hit.occupant().can_pass(self.mover) {
                found.push(Obstruction {
                    displacement: hit.displacement(),
                    kind: ObstructionKind::Wall,
                });
                continue;
            }
            let contact = start + hit.displacement();
            if self.is_pinched(contact, cell, travel) {
                found.push(Obstruction {
                    displacement: hit.displacement(),
                    kind: ObstructionKind::Squeeze(contact),
                });
            }
        }

        if let Some(obstruction) = self.pinched_end(start, travel) {
            found.push(obstruction);
        }
        if let Some(obstruction) = self.seam(start, travel, length) {
            found.push(obstruction);
        }

        found.sort_by(|a, b| a.distance().total_cmp(&b.distance()));
        found
    }

    /// Reports whether entering `entered` through the vertex `contact` passes
    /// between two impassable cells.
    fn is_pinched(&self, contact: Vector, entered: CellCoord, travel: Vector) -> bool {
        let (step_x, step_y) = travel.directional_steps();
        if step_x == 0 || step_y == 0 || !on_grid_vertex(contact) {
            return false;
        }
        self.passable(entered.offset(-step_x, -step_y))
            && !self.passable(entered.offset(-step_x, 0))
            && !self.passable(entered.offset(0, -step_y))
    }

    /// Diagonal travel that ends exactly on a pinched vertex. The trace only
    /// reports cells entered before the end, so the vertex is checked here.
    fn pinched_end(&self, start: Vector, travel: Vector) -> Option<Obstruction> {
        let end = start + travel;
        let (step_x, step_y) = travel.directional_steps();
        if step_x == 0 || step_y == 0 || !on_grid_vertex(end) {
            return None;
        }
        let beyond = CellCoord::new(
            end.x.round() as i32 + if step_x > 0 { 0 } else { -1 },
            end.y.round() as i32 + if step_y > 0 { 0 } else { -1 },
        );
        self.is_pinched(end, beyond, travel).then_some(Obstruction {
            displacement: travel,
            kind: ObstructionKind::Squeeze(end),
        })
    }

    /// First seam or pinched vertex along axis-aligned travel on a grid line.
    fn seam(&self, start: Vector, travel: Vector, length: f64) -> Option<Obstruction> {
        let (displacement, pinched) = match travel.directional_steps() {
            (step, 0) if step != 0 && on_grid_line(start.y) => {
                let line = start.y.round() as i32;
                let (distance, pinched) =
                    self.seam_distance(start.x, line, step, length, |along, line| {
                        CellCoord::new(along, line)
                    })?;
                (Vector::new(distance * f64::from(step), 0.0), pinched)
            }
            (0, step) if step != 0 && on_grid_line(start.x) => {
                let line = start.x.round() as i32;
                let (distance, pinched) =
                    self.seam_distance(start.y, line, step, length, |along, line| {
                        CellCoord::new(line, along)
                    })?;
                (Vector::new(0.0, distance * f64::from(step)), pinched)
            }
            _ => return None,
        };

        let kind = if pinched {
            ObstructionKind::Squeeze(start + displacement)
        } else {
            ObstructionKind::Seam
        };
        Some(Obstruction { displacement, kind })
    }

    /// Walks the segments of grid line `line` ahead of `along` and reports
    /// the distance to the first stop, flagged `true` when it is a pinched
    /// vertex rather than a seam. The segment `along` is already inside is
    /// skipped, and so is a vertex it already stands on.
    fn seam_distance(
        &self,
        along: f64,
        line: i32,
        step: i32,
        length: f64,
        cell_at: impl Fn(i32, i32) -> CellCoord,
    ) -> Option<(f64, bool)> {
        let mut segment = if on_grid_line(along) {
            let boundary = along.round() as i32;
            if step > 0 {
                boundary
            } else {
                boundary.saturating_sub(1)
            }
        } else {
            (along.floor() as i32).saturating_add(step)
        };

        loop {
            let near = if step > 0 { segment } else { segment.saturating_add(1) };
            let distance = ((f64::from(near) - along) * f64::from(step)).max(0.0);
            if approx_gt(distance, length) {
                return None;
            }

            let walled = !self.passable(cell_at(segment, line - 1))
                && !self.passable(cell_at(segment, line));
            // A seam ahead already stops the mover on the vertex.
            if !walled
                && !approx_zero(distance)
                && self.is_pinched_vertex(near, line, &cell_at)
            {
                return Some((distance, true));
            }
            if !approx_lt(distance, length) {
                return None;
            }
            if walled {
                return Some((distance, false));
            }
            segment = segment.checked_add(step)?;
        }
    }

    /// Reports whether the vertex at `along` on grid line `line` joins two
    /// diagonally opposite impassable cells.
    fn is_pinched_vertex(
        &self,
        along: i32,
        line: i32,
        cell_at: &impl Fn(i32, i32) -> CellCoord,
    ) -> bool {
        let blocked = |along: i32, line: i32| !self.passable(cell_at(along, line));
        (blocked(along - 1, line - 1) && blocked(along, line))
            || (blocked(along, line - 1) && blocked(along - 1, line))
    }
}

/// `reached` shortened by [`SQUEEZE_CLEARANCE`] along `travel`.
fn back_off(reached: Vector, travel: Vector) -> Vector {
    let distance = reached.length() - SQUEEZE_CLEARANCE;
    if distance <= 0.0 {
        return Vector::ZERO;
    }
    travel.normalized() * distance
}
