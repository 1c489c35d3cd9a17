//! Sparse block storage keyed by cell.

use std::collections::BTreeMap;

use tilemotion_core::{Block, CellCoord, EntityKind, Passability, Vector};

use crate::raytrace::{self, RayHit};

/// Sparse mapping from cells to the blocks standing in them.
///
/// Cells without an entry are void: they render as nothing and no entity may
/// enter them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Grid {
    blocks: BTreeMap<CellCoord, Block>,
}

impl Grid {
    /// Creates a grid in which every cell is void.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Block occupying the provided cell, if any.
    #[must_use]
    pub fn block_at(&self, cell: CellCoord) -> Option<&Block> {
        self.blocks.get(&cell)
    }

    /// Places `block` into `cell`, returning the block it replaced.
    pub fn set_block_at(&mut self, cell: CellCoord, block: Block) -> Option<Block> {
        self.blocks.insert(cell, block)
    }

    /// Clears the cell back to void, returning the block it held.
    pub fn remove_block_at(&mut self, cell: CellCoord) -> Option<Block> {
        self.blocks.remove(&cell)
    }

    /// Reports whether `entity` may stand in the cell. Void never admits anyone.
    #[must_use]
    pub fn is_passable(&self, cell: CellCoord, entity: Option<EntityKind>) -> bool {
        self.block_at(cell)
            .is_some_and(|block| block.can_pass(entity))
    }

    /// Number of populated cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Reports whether every cell is void.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Populated cells in row-major order of their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, &Block)> {
        self.blocks.iter().map(|(cell, block)| (*cell, block))
    }

    /// Smallest and largest populated cells on each axis, if any.
    #[must_use]
    pub fn bounds(&self) -> Option<(CellCoord, CellCoord)> {
        let mut cells = self.blocks.keys();
        let first = *cells.next()?;
        let (min, max) = cells.fold((first, first), |(min, max), cell| {
            (
                CellCoord::new(min.x().min(cell.x()), min.y().min(cell.y())),
                CellCoord::new(max.x().max(cell.x()), max.y().max(cell.y())),
            )
        });
        Some((min, max))
    }

    /// Enumerates the cells a segment crosses. See
    /// [`raytrace::ray_trace_block`].
    #[must_use]
    pub fn ray_trace(
        &self,
        start: Vector,
        direction: Vector,
        length: f64,
        width: f64,
    ) -> Vec<RayHit<'_>> {
        raytrace::ray_trace_block(self, start, direction, length, width)
    }
}

impl FromIterator<(CellCoord, Block)> for Grid {
    fn from_iter<I: IntoIterator<Item = (CellCoord, Block)>>(iter: I) -> Self {
        Self {
            blocks: iter.into_iter().collect(),
        }
    }
}
