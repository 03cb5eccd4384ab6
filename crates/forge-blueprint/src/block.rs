//! Block specifications and block sources
//!
//! A placement draws its blocks from exactly one [`BlockSource`]: either a
//! single [`BlockSpec`] or a weighted [`BlockPalette`]. The choice is made
//! once during validation so the rasterizer never re-inspects optionality.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace every block identifier must carry
pub const BLOCK_NAMESPACE: &str = "minecraft:";

/// Block placed into hollowed interiors
pub const AIR_BLOCK: &str = "minecraft:air";

/// Add the block namespace to an unprefixed identifier
///
/// ```
/// use forge_blueprint::normalize_block_id;
/// assert_eq!(normalize_block_id("stone"), "minecraft:stone");
/// assert_eq!(normalize_block_id("minecraft:oak_planks"), "minecraft:oak_planks");
/// ```
#[must_use]
pub fn normalize_block_id(id: &str) -> String {
    let id = id.trim();
    if id.starts_with(BLOCK_NAMESPACE) {
        id.to_string()
    } else {
        format!("{BLOCK_NAMESPACE}{id}")
    }
}

/// One block identifier with its palette weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSpec {
    /// Namespaced block identifier
    pub id: String,
    /// Relative selection weight, never negative
    pub weight: f64,
}

impl BlockSpec {
    /// Create spec with the default weight of 1
    #[inline]
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self {
            id: normalize_block_id(id.as_ref()),
            weight: 1.0,
        }
    }

    /// With weight (clamped to >= 0)
    #[inline]
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = if weight.is_finite() { weight.max(0.0) } else { 0.0 };
        self
    }
}

impl fmt::Display for BlockSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Ordered, non-empty list of weighted block specs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockPalette(Vec<BlockSpec>);

impl BlockPalette {
    /// Build a palette, rejecting an empty entry list
    #[must_use]
    pub fn try_new(entries: Vec<BlockSpec>) -> Option<Self> {
        (!entries.is_empty()).then_some(Self(entries))
    }

    /// Palette entries in declaration order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[BlockSpec] {
        &self.0
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with slices
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of effective weights
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.0.iter().map(|e| e.weight.max(0.0)).sum()
    }
}

/// How palette entries are laid out across cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PalettePattern {
    /// Independent weighted draw per cell
    #[default]
    Random,
    /// Accepted for compatibility; laid out exactly like `Random`
    Checkerboard,
}

impl PalettePattern {
    /// Parse the wire name
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "random" => Some(Self::Random),
            "checkerboard" => Some(Self::Checkerboard),
            _ => None,
        }
    }
}

/// Where a placement gets its blocks from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockSource {
    /// One block for every cell
    Single(BlockSpec),
    /// Weighted per-cell draw
    Palette {
        /// Entries to draw from
        palette: BlockPalette,
        /// Layout pattern
        pattern: PalettePattern,
    },
}

impl BlockSource {
    /// Single-block source
    #[inline]
    #[must_use]
    pub fn single(id: impl AsRef<str>) -> Self {
        Self::Single(BlockSpec::new(id))
    }

    /// Whether blocks vary per cell
    #[inline]
    #[must_use]
    pub fn is_palette(&self) -> bool {
        matches!(self, Self::Palette { .. })
    }
}
