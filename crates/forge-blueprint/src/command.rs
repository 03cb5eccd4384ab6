//! World-mutation commands produced by rasterization

use crate::coords::{BlockBox, Vec3};
use crate::placement::PlacementMode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What one command touches
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandTarget {
    /// One cell
    Cell {
        /// Cell coordinate
        at: Vec3,
    },
    /// Bulk fill of a box
    Region {
        /// Box bounds, inclusive
        bounds: BlockBox,
        /// Only overwrite cells currently holding this block
        filter: Option<String>,
    },
}

/// Atomic unit submitted to the world-mutation service
///
/// Immutable once produced: fields are read through accessors only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandRecord {
    target: CommandTarget,
    block_id: String,
    origin_mode: PlacementMode,
}

impl CommandRecord {
    /// Single-cell placement
    #[inline]
    #[must_use]
    pub fn cell(at: Vec3, block_id: impl Into<String>, origin_mode: PlacementMode) -> Self {
        Self {
            target: CommandTarget::Cell { at },
            block_id: block_id.into(),
            origin_mode,
        }
    }

    /// Bulk box fill
    #[inline]
    #[must_use]
    pub fn region(
        bounds: BlockBox,
        block_id: impl Into<String>,
        filter: Option<String>,
        origin_mode: PlacementMode,
    ) -> Self {
        Self {
            target: CommandTarget::Region { bounds, filter },
            block_id: block_id.into(),
            origin_mode,
        }
    }

    /// Target of the command
    #[inline]
    #[must_use]
    pub fn target(&self) -> &CommandTarget {
        &self.target
    }

    /// Anchor coordinate: the cell, or the box minimum corner
    #[inline]
    #[must_use]
    pub fn coordinate(&self) -> Vec3 {
        match &self.target {
            CommandTarget::Cell { at } => *at,
            CommandTarget::Region { bounds, .. } => bounds.min,
        }
    }

    /// Block placed
    #[inline]
    #[must_use]
    pub fn block_id(&self) -> &str {
        &self.block_id
    }

    /// Placement mode the command was rasterized from
    #[inline]
    #[must_use]
    pub fn origin_mode(&self) -> PlacementMode {
        self.origin_mode
    }

    /// Whether this is a bulk box instruction
    #[inline]
    #[must_use]
    pub fn is_bulk(&self) -> bool {
        matches!(self.target, CommandTarget::Region { .. })
    }

    /// Cells the command affects at most
    #[must_use]
    pub fn cell_count(&self) -> u64 {
        match &self.target {
            CommandTarget::Cell { .. } => 1,
            CommandTarget::Region { bounds, .. } => bounds.volume(),
        }
    }
}

/// Renders the command in world-console syntax
impl fmt::Display for CommandRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            CommandTarget::Cell { at } => write!(f, "/setblock {at} {} replace", self.block_id),
            CommandTarget::Region { bounds, filter } => {
                write!(f, "/fill {bounds} {} replace", self.block_id)?;
                if let Some(filter) = filter {
                    write!(f, " {filter}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setblock_text() {
        let cmd = CommandRecord::cell(Vec3::new(1, -2, 3), "minecraft:stone", PlacementMode::Point);
        assert_eq!(cmd.to_string(), "/setblock 1 -2 3 minecraft:stone replace");
    }

    #[test]
    fn fill_text_with_filter() {
        let bounds = BlockBox::from_corners(Vec3::new(0, 0, 0), Vec3::new(2, 2, 2));
        let cmd = CommandRecord::region(
            bounds,
            "minecraft:air",
            Some("minecraft:stone".to_string()),
            PlacementMode::HollowCuboid,
        );
        assert_eq!(cmd.to_string(), "/fill 0 0 0 2 2 2 minecraft:air replace minecraft:stone");
        assert!(cmd.is_bulk());
        assert_eq!(cmd.cell_count(), 27);
    }
}
