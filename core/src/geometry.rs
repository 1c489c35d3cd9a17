//! Continuous vectors, integer grid cells, and the cell/ray hit test.

use std::{
    fmt,
    ops::{Add, AddAssign, Mul, Neg, Sub},
};

use serde::{Deserialize, Serialize};

use crate::numeric::{approx_ge, approx_gt, approx_le, approx_lt, approx_zero, on_grid_line};

/// Half the side length of a grid cell.
pub const HALF_CELL: f64 = 0.5;

/// Largest coordinate magnitude the world accepts. A position plus one tick
/// of travel stays inside the `i32` cell range.
pub const COORDINATE_LIMIT: f64 = 1.0e9;

/// Continuous point or displacement in world space.
///
/// The x axis grows to the right and the y axis grows downward, both measured
/// in cells. Serialises as `{ "x": .., "y": .. }`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    /// Horizontal component.
    pub x: f64,
    /// Vertical component.
    pub y: f64,
}

impl Vector {
    /// The zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Creates a vector from its components.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length.
    #[must_use]
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Dot product with `other`.
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Reports whether both components are finite numbers.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Reports whether both components lie within [`COORDINATE_LIMIT`].
    #[must_use]
    pub fn within_limit(self) -> bool {
        self.x.abs() <= COORDINATE_LIMIT && self.y.abs() <= COORDINATE_LIMIT
    }

    /// Reports whether both components are within tolerance of zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        approx_zero(self.x) && approx_zero(self.y)
    }

    /// Unit vector pointing the same way. The zero vector is returned unchanged.
    #[must_use]
    pub fn normalized(self) -> Self {
        if self.x == 0.0 && self.y == 0.0 {
            return self;
        }
        let length = self.length();
        Self::new(self.x / length, self.y / length)
    }

    /// Component-wise sign: `-1`, `0` or `+1`, with near-zero components
    /// collapsing to `0`.
    #[must_use]
    pub fn directional_sign(self) -> Self {
        let (x, y) = self.directional_steps();
        Self::new(f64::from(x), f64::from(y))
    }

    /// Integer form of [`Vector::directional_sign`], suitable for stepping
    /// across cells.
    #[must_use]
    pub fn directional_steps(self) -> (i32, i32) {
        (sign_step(self.x), sign_step(self.y))
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self - other).length()
    }

    /// Manhattan distance to `other`.
    #[must_use]
    pub fn manhattan_distance(self, other: Self) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Grid cell that contains the point.
    #[must_use]
    pub fn cell(self) -> CellCoord {
        CellCoord::containing(self)
    }

    /// Reports whether the two vectors agree within tolerance on both axes.
    #[must_use]
    pub fn approx_eq(self, other: Self) -> bool {
        (self - other).is_zero()
    }
}

fn sign_step(component: f64) -> i32 {
    if approx_zero(component) {
        0
    } else if component > 0.0 {
        1
    } else {
        -1
    }
}

impl Add for Vector {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vector {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vector {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vector {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector({:.2}, {:.2})", self.x, self.y)
    }
}

/// Location of a single unit grid cell.
///
/// The cell covers `[x, x + 1) × [y, y + 1)` in world space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    x: i32,
    y: i32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Column of the cell.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row of the cell.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Cell containing the provided point.
    ///
    /// Coordinates beyond the `i32` range saturate to its bounds.
    #[must_use]
    pub fn containing(point: Vector) -> Self {
        Self::new(point.x.floor() as i32, point.y.floor() as i32)
    }

    /// Cell displaced by the provided column and row offsets.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Upper-left corner of the cell in world space.
    #[must_use]
    pub fn origin(self) -> Vector {
        Vector::new(f64::from(self.x), f64::from(self.y))
    }

    /// Center of the cell in world space.
    #[must_use]
    pub fn center(self) -> Vector {
        self.origin() + Vector::new(HALF_CELL, HALF_CELL)
    }

    /// Computes the Manhattan distance between two cells.
    #[must_use]
    pub fn manhattan_distance(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Reports whether the point lies strictly inside the cell; points on the
    /// boundary are outside.
    #[must_use]
    pub fn contains_interior(self, point: Vector) -> bool {
        let origin = self.origin();
        approx_gt(point.x, origin.x)
            && approx_lt(point.x, origin.x + 1.0)
            && approx_gt(point.y, origin.y)
            && approx_lt(point.y, origin.y + 1.0)
    }

    /// Displacement from `start` to the point where a ray cast along
    /// `direction` first touches the interior of this cell.
    ///
    /// When `start` is already inside the cell the exit point is returned
    /// instead. Rays that only graze an edge or touch a corner never hit, and a
    /// zero direction never hits anything.
    ///
    /// # Panics
    ///
    /// Panics if a ray starting inside the cell leaves through neither of the
    /// edges it travels toward, which indicates a geometry defect rather than
    /// bad input.
    #[must_use]
    pub fn hit_point(self, start: Vector, direction: Vector) -> Option<Vector> {
        if direction.is_zero() {
            return None;
        }
        let direction = direction.normalized();

        if self.contains_interior(start) {
            return Some(self.exit_point(start, direction));
        }
        self.entry_point(start, direction)
    }

    fn exit_point(self, start: Vector, direction: Vector) -> Vector {
        let origin = self.origin();
        let (step_x, step_y) = direction.directional_steps();

        if step_x != 0 {
            let edge = if step_x > 0 { origin.x + 1.0 } else { origin.x };
            let exit = direction * ((edge - start.x) / direction.x);
            let y = start.y + exit.y;
            if approx_ge(y, origin.y) && approx_le(y, origin.y + 1.0) {
                return exit;
            }
        }
        if step_y != 0 {
            let edge = if step_y > 0 { origin.y + 1.0 } else { origin.y };
            let exit = direction * ((edge - start.y) / direction.y);
            let x = start.x + exit.x;
            if approx_ge(x, origin.x) && approx_le(x, origin.x + 1.0) {
                return exit;
            }
        }

        panic!("ray from {start} along {direction} leaves {self:?} through neither edge");
    }

    fn entry_point(self, start: Vector, direction: Vector) -> Option<Vector> {
        let origin = self.origin();
        let (near_x, far_x) = slab(start.x, direction.x, origin.x)?;
        let (near_y, far_y) = slab(start.y, direction.y, origin.y)?;

        let near = near_x.max(near_y).max(0.0);
        let far = far_x.min(far_y);
        if !approx_lt(near, far) {
            return None;
        }

        Some(direction * near)
    }
}

/// Parameter interval during which a ray is strictly inside the open span
/// `(low, low + 1)` on one axis. A ray parallel to the span is either inside
/// for its whole length or never.
fn slab(start: f64, direction: f64, low: f64) -> Option<(f64, f64)> {
    let high = low + 1.0;
    if approx_zero(direction) {
        return (approx_gt(start, low) && approx_lt(start, high))
            .then_some((f64::NEG_INFINITY, f64::INFINITY));
    }

    let to_low = (low - start) / direction;
    let to_high = (high - start) / direction;
    Some((to_low.min(to_high), to_low.max(to_high)))
}

/// Reports whether both coordinates of the point lie on grid lines.
#[must_use]
pub fn on_grid_vertex(point: Vector) -> bool {
    on_grid_line(point.x) && on_grid_line(point.y)
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cell({}, {})", self.x, self.y)
    }
}
