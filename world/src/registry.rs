//! Lookup tables from textual ids and map glyphs to blocks.

use std::collections::BTreeMap;

use thiserror::Error;
use tilemotion_core::{Block, BlockKind, CellCoord, HeldElement};

use crate::grid::Grid;

/// Glyph that marks a void cell in a layout.
pub const VOID_GLYPH: char = '.';

/// Glyph rendered for a block no registered glyph describes.
pub const UNKNOWN_GLYPH: char = '?';

/// Separator between the kind and the held elements of a block description.
const STACK_SEPARATOR: char = '+';

/// Failures raised while registering glyphs or looking up blocks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A glyph was registered twice.
    #[error("glyph `{0}` is already registered")]
    DuplicateGlyph(char),
    /// The glyph is reserved for void cells.
    #[error("glyph `{0}` is reserved for void cells")]
    ReservedGlyph(char),
    /// No kind is registered under the id.
    #[error("unknown block kind `{0}`")]
    UnknownKind(String),
    /// No held element is registered under the id.
    #[error("unknown held element `{0}`")]
    UnknownElement(String),
    /// The block description contained no kind.
    #[error("block description is empty")]
    EmptyDescription,
}

/// Failures raised while parsing a glyph layout.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    /// The layout contained no rows.
    #[error("layout has no rows")]
    Empty,
    /// A glyph has no registered block.
    #[error("row {row}, column {column}: unknown glyph `{glyph}`")]
    UnknownGlyph {
        /// Zero-based row within the layout.
        row: usize,
        /// Zero-based column within the row.
        column: usize,
        /// Offending character.
        glyph: char,
    },
}

/// Registry of every block kind, held element and map glyph known to the
/// world. Built once at startup and passed by reference.
#[derive(Clone, Debug)]
pub struct BlockRegistry {
    kinds: BTreeMap<String, BlockKind>,
    elements: BTreeMap<String, HeldElement>,
    glyphs: BTreeMap<char, Block>,
}

impl BlockRegistry {
    /// Registry holding every built-in kind and element under its id, plus the
    /// standard map glyphs.
    #[must_use]
    pub fn standard() -> Self {
        let kinds = BlockKind::ALL
            .into_iter()
            .map(|kind| (kind.id().to_owned(), kind))
            .collect();
        let elements = HeldElement::ALL
            .into_iter()
            .map(|element| (element.id().to_owned(), element))
            .collect();
        let grass = Block::new(BlockKind::Grass);
        let glyphs = [
            ('g', grass.clone()),
            ('p', Block::new(BlockKind::Path)),
            ('s', Block::new(BlockKind::Sand)),
            ('#', Block::new(BlockKind::Stone)),
            ('~', Block::new(BlockKind::Water)),
            ('e', grass.clone().holding(HeldElement::Egg)),
            ('b', grass.clone().holding(HeldElement::Bush)),
            ('f', grass.clone().holding(HeldElement::Fence)),
            ('o', grass.holding(HeldElement::Boulder)),
        ]
        .into_iter()
        .collect();

        Self {
            kinds,
            elements,
            glyphs,
        }
    }

    /// Registers the block a map glyph stands for.
    pub fn register_glyph(&mut self, glyph: char, block: Block) -> Result<(), RegistryError> {
        if glyph == VOID_GLYPH || glyph.is_whitespace() {
            return Err(RegistryError::ReservedGlyph(glyph));
        }
        if self.glyphs.contains_key(&glyph) {
            return Err(RegistryError::DuplicateGlyph(glyph));
        }
        let _ = self.glyphs.insert(glyph, block);
        Ok(())
    }

    /// Kind registered under `id`.
    pub fn kind(&self, id: &str) -> Result<BlockKind, RegistryError> {
        self.kinds
            .get(id)
            .copied()
            .ok_or_else(|| RegistryError::UnknownKind(id.to_owned()))
    }

    /// Held element registered under `id`.
    pub fn element(&self, id: &str) -> Result<HeldElement, RegistryError> {
        self.elements
            .get(id)
            .copied()
            .ok_or_else(|| RegistryError::UnknownElement(id.to_owned()))
    }

    /// Parses a description such as `grass+egg+fence`: a kind id followed by
    /// held element ids from bottom to top.
    pub fn parse_block(&self, description: &str) -> Result<Block, RegistryError> {
        let mut parts = description
            .split(STACK_SEPARATOR)
            .map(str::trim)
            .filter(|part| !part.is_empty());
        let kind = parts.next().ok_or(RegistryError::EmptyDescription)?;
        let mut block = Block::new(self.kind(kind)?);
        for element in parts {
            block.hold(self.element(element)?);
        }
        Ok(block)
    }

    /// Block a map glyph stands for.
    #[must_use]
    pub fn block_for_glyph(&self, glyph: char) -> Option<&Block> {
        self.glyphs.get(&glyph)
    }

    /// Glyph that stands for exactly this block, if one is registered.
    #[must_use]
    pub fn glyph_for(&self, block: &Block) -> Option<char> {
        self.glyphs
            .iter()
            .find(|(_, candidate)| *candidate == block)
            .map(|(glyph, _)| *glyph)
    }

    /// Parses map rows whose first character lands on `origin`. Rows grow
    /// downward and columns to the right; void glyphs and spaces leave the
    /// cell unmapped.
    pub fn parse_rows<S: AsRef<str>>(
        &self,
        origin: CellCoord,
        rows: &[S],
    ) -> Result<Vec<(CellCoord, Block)>, LayoutError> {
        if rows.is_empty() {
            return Err(LayoutError::Empty);
        }

        let mut placed = Vec::new();
        for (row, line) in rows.iter().enumerate() {
            for (column, glyph) in line.as_ref().chars().enumerate() {
                if glyph == VOID_GLYPH || glyph == ' ' {
                    continue;
                }
                let block = self
                    .block_for_glyph(glyph)
                    .ok_or(LayoutError::UnknownGlyph { row, column, glyph })?;
                placed.push((origin.offset(column as i32, row as i32), block.clone()));
            }
        }
        Ok(placed)
    }

    /// Renders the populated area of the grid as map rows, returning the cell
    /// of the first glyph alongside them.
    #[must_use]
    pub fn render_rows(&self, grid: &Grid) -> Option<(CellCoord, Vec<String>)> {
        let (min, max) = grid.bounds()?;
        let rows = (min.y()..=max.y())
            .map(|y| {
                (min.x()..=max.x())
                    .map(|x| match grid.block_at(CellCoord::new(x, y)) {
                        Some(block) => self.glyph_for(block).unwrap_or(UNKNOWN_GLYPH),
                        None => VOID_GLYPH,
                    })
                    .collect()
            })
            .collect();
        Some((min, rows))
    }
}

/// Textual description of a block in the form accepted by
/// [`BlockRegistry::parse_block`].
#[must_use]
pub fn describe(block: &Block) -> String {
    std::iter::once(block.kind().id())
        .chain(block.held().iter().map(|element| element.id()))
        .collect::<Vec<_>>()
        .join("+")
}
