//! Static cell occupants and the passability capability they expose.

use serde::{Deserialize, Serialize};

use crate::EntityKind;

/// Capability shared by everything that can stand in a grid cell.
///
/// Implementations must be free of side effects and return the same answer
/// for the same entity for the duration of a tick.
pub trait Passability {
    /// Reports whether `entity` may move through the occupant. `None` asks on
    /// behalf of no particular entity, such as a line-of-sight probe.
    fn can_pass(&self, entity: Option<EntityKind>) -> bool;
}

/// Ground material that makes up a populated cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Open grassland.
    Grass,
    /// Trodden path.
    Path,
    /// Loose sand.
    Sand,
    /// Solid rock wall.
    Stone,
    /// Deep water.
    Water,
}

impl BlockKind {
    /// Every block kind in declaration order.
    pub const ALL: [Self; 5] = [Self::Grass, Self::Path, Self::Sand, Self::Stone, Self::Water];

    /// Stable textual identifier of the kind.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Grass => "grass",
            Self::Path => "path",
            Self::Sand => "sand",
            Self::Stone => "stone",
            Self::Water => "water",
        }
    }
}

impl Passability for BlockKind {
    fn can_pass(&self, _entity: Option<EntityKind>) -> bool {
        match self {
            Self::Grass | Self::Path | Self::Sand => true,
            Self::Stone | Self::Water => false,
        }
    }
}

/// Element stacked on top of a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeldElement {
    /// An egg lying on the ground.
    Egg,
    /// Low shrubbery that only foxes slip through.
    Bush,
    /// Wooden fence.
    Fence,
    /// Boulder too heavy to climb.
    Boulder,
}

impl HeldElement {
    /// Every held element in declaration order.
    pub const ALL: [Self; 4] = [Self::Egg, Self::Bush, Self::Fence, Self::Boulder];

    /// Stable textual identifier of the element.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Egg => "egg",
            Self::Bush => "bush",
            Self::Fence => "fence",
            Self::Boulder => "boulder",
        }
    }
}

impl Passability for HeldElement {
    fn can_pass(&self, entity: Option<EntityKind>) -> bool {
        match self {
            Self::Egg => true,
            Self::Bush => entity == Some(EntityKind::Fox),
            Self::Fence | Self::Boulder => false,
        }
    }
}

/// Occupant of a populated grid cell: a ground kind plus any stacked elements.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    kind: BlockKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    held: Vec<HeldElement>,
}

impl Block {
    /// Creates a block of the provided kind holding nothing.
    #[must_use]
    pub const fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            held: Vec::new(),
        }
    }

    /// Returns the block with `element` stacked on top.
    #[must_use]
    pub fn holding(mut self, element: HeldElement) -> Self {
        self.held.push(element);
        self
    }

    /// Stacks `element` on top of the block.
    pub fn hold(&mut self, element: HeldElement) {
        self.held.push(element);
    }

    /// Ground kind of the block.
    #[must_use]
    pub const fn kind(&self) -> BlockKind {
        self.kind
    }

    /// Held elements from bottom to top.
    #[must_use]
    pub fn held(&self) -> &[HeldElement] {
        &self.held
    }
}

impl Passability for Block {
    fn can_pass(&self, entity: Option<EntityKind>) -> bool {
        self.kind.can_pass(entity) && self.held.iter().all(|element| element.can_pass(entity))
    }
}
