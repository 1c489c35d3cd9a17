//! Single-line encoding of a block layout for copying it between runs.

use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use tilemotion_world::{Grid, PlacedBlock};

const LAYOUT_DOMAIN: &str = "grid";
const LAYOUT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded layout payload.
pub(crate) const LAYOUT_HEADER: &str = "grid:v1";
/// Delimiter used to separate the prefix, block count and payload.
const FIELD_DELIMITER: char = ':';

/// Blocks composing a layout, in cell order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct BlockLayout {
    /// Blocks together with the cells they occupy.
    pub(crate) blocks: Vec<PlacedBlock>,
}

impl BlockLayout {
    /// Captures every block stored in the grid.
    #[must_use]
    pub(crate) fn capture(grid: &Grid) -> Self {
        Self {
            blocks: grid
                .iter()
                .map(|(cell, block)| PlacedBlock {
                    cell,
                    block: block.clone(),
                })
                .collect(),
        }
    }

    /// Builds a grid holding the captured blocks.
    #[must_use]
    pub(crate) fn into_grid(self) -> Grid {
        self.blocks
            .into_iter()
            .map(|placed| (placed.cell, placed.block))
            .collect()
    }

    /// Encodes the layout into a single-line string.
    pub(crate) fn encode(&self) -> Result<String, serde_json::Error> {
        let payload = SerializableLayout {
            blocks: self.blocks.clone(),
        };
        let json = serde_json::to_vec(&payload)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!(
            "{LAYOUT_HEADER}:{}:{encoded}",
            self.blocks.len()
        ))
    }

    /// Decodes a layout from the provided string representation.
    pub(crate) fn decode(value: &str) -> Result<Self, LayoutTransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LayoutTransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(LayoutTransferError::MissingPrefix)?;
        let version = parts.next().ok_or(LayoutTransferError::MissingVersion)?;
        let count = parts.next().ok_or(LayoutTransferError::MissingCount)?;
        let payload = parts.next().ok_or(LayoutTransferError::MissingPayload)?;

        if domain != LAYOUT_DOMAIN {
            return Err(LayoutTransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != LAYOUT_VERSION {
            return Err(LayoutTransferError::UnsupportedVersion(version.to_owned()));
        }

        let expected = parse_count(count)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(LayoutTransferError::InvalidEncoding)?;
        let decoded: SerializableLayout =
            serde_json::from_slice(&bytes).map_err(LayoutTransferError::InvalidPayload)?;

        if decoded.blocks.len() != expected {
            return Err(LayoutTransferError::CountMismatch {
                expected,
                actual: decoded.blocks.len(),
            });
        }

        Ok(Self {
            blocks: decoded.blocks,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct SerializableLayout {
    blocks: Vec<PlacedBlock>,
}

/// Errors that can occur while decoding layout transfer strings.
#[derive(Debug)]
pub(crate) enum LayoutTransferError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing from the encoded layout.
    MissingPrefix,
    /// The encoded layout did not contain a version segment.
    MissingVersion,
    /// The encoded layout did not include the block count.
    MissingCount,
    /// The encoded layout did not include the payload segment.
    MissingPayload,
    /// The encoded layout used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The encoded layout used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The block count could not be parsed.
    InvalidCount(String),
    /// The payload held a different number of blocks than announced.
    CountMismatch {
        /// Count announced in the header.
        expected: usize,
        /// Blocks actually present in the payload.
        actual: usize,
    },
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The decoded payload could not be deserialised.
    InvalidPayload(serde_json::Error),
}

impl fmt::Display for LayoutTransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "layout string was empty"),
            Self::MissingPrefix => write!(f, "layout string is missing the prefix"),
            Self::MissingVersion => write!(f, "layout string is missing the version"),
            Self::MissingCount => write!(f, "layout string is missing the block count"),
            Self::MissingPayload => write!(f, "layout string is missing the payload"),
            Self::InvalidPrefix(prefix) => write!(f, "layout prefix '{prefix}' is not supported"),
            Self::UnsupportedVersion(version) => {
                write!(f, "layout version '{version}' is not supported")
            }
            Self::InvalidCount(count) => write!(f, "could not parse block count '{count}'"),
            Self::CountMismatch { expected, actual } => write!(
                f,
                "layout announced {expected} blocks but carried {actual}"
            ),
            Self::InvalidEncoding(error) => {
                write!(f, "could not decode layout payload: {error}")
            }
            Self::InvalidPayload(error) => {
                write!(f, "could not parse layout payload: {error}")
            }
        }
    }
}

impl Error for LayoutTransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            _ => None,
        }
    }
}

fn parse_count(count: &str) -> Result<usize, LayoutTransferError> {
    count
        .trim()
        .parse::<usize>()
        .map_err(|_| LayoutTransferError::InvalidCount(count.to_owned()))
}
