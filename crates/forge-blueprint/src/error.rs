//! Error types for blueprint handling
//!
//! Two distinct failure classes:
//! - [`ValidationError`]: the document is unusable, the whole blueprint is rejected
//! - [`RasterError`]: one placement cannot be expanded, it is skipped and the build continues

use crate::placement::PlacementMode;

/// Blueprint validation failure, qualified by the JSON path that caused it
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Root is not an object or lacks `structure`
    #[error("{path}: expected an object")]
    NotAnObject {
        /// Offending path
        path: String,
    },

    /// Required field absent
    #[error("{path}: missing required field '{field}'")]
    MissingField {
        /// Parent path
        path: String,
        /// Field name
        field: &'static str,
    },

    /// Field present with the wrong JSON type
    #[error("{path}: expected {expected}")]
    WrongType {
        /// Offending path
        path: String,
        /// Human-readable expected type
        expected: &'static str,
    },

    /// `placement_mode` not one of the five modes
    #[error("{path}: unknown placement mode '{value}'")]
    UnknownMode {
        /// Offending path
        path: String,
        /// Value found
        value: String,
    },

    /// Neither `block` nor a non-empty `block_palette`
    #[error("{path}: either 'block' or a non-empty 'block_palette' is required")]
    MissingBlockSource {
        /// Placement path
        path: String,
    },

    /// `palette_pattern` not recognised
    #[error("{path}: unknown palette pattern '{value}'")]
    UnknownPattern {
        /// Offending path
        path: String,
        /// Value found
        value: String,
    },

    /// Cylinder axis not x/y/z
    #[error("{path}: axis must be 'x', 'y' or 'z' (got '{value}')")]
    InvalidAxis {
        /// Offending path
        path: String,
        /// Value found
        value: String,
    },

    /// Numeric parameter below its minimum
    #[error("{path} ({mode}): must be >= {min} (got {value})")]
    BelowMinimum {
        /// Offending path
        path: String,
        /// Placement mode the parameter belongs to
        mode: PlacementMode,
        /// Minimum accepted value
        min: f64,
        /// Value found
        value: f64,
    },

    /// Block identifier empty after trimming
    #[error("{path}: block id must not be empty")]
    EmptyBlockId {
        /// Offending path
        path: String,
    },
}

impl ValidationError {
    /// JSON path the error refers to
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::NotAnObject { path }
            | Self::MissingField { path, .. }
            | Self::WrongType { path, .. }
            | Self::UnknownMode { path, .. }
            | Self::MissingBlockSource { path }
            | Self::UnknownPattern { path, .. }
            | Self::InvalidAxis { path, .. }
            | Self::BelowMinimum { path, .. }
            | Self::EmptyBlockId { path } => path,
        }
    }
}

/// Failure to rasterize one placement definition
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RasterError {
    /// Definition never passed validation (lenient parsing)
    #[error("invalid definition: {0}")]
    InvalidDefinition(#[from] ValidationError),

    /// A coordinate left the `i32` range
    #[error("coordinate overflow while placing {mode}")]
    CoordinateOverflow {
        /// Mode being rasterized
        mode: PlacementMode,
    },

    /// Per-cell expansion would exceed the configured budget
    #[error("{mode} would emit {cells} cells (limit {limit})")]
    CellBudgetExceeded {
        /// Mode being rasterized
        mode: PlacementMode,
        /// Cells the definition would produce
        cells: u64,
        /// Configured budget
        limit: u64,
    },

    /// The palette produced no block
    #[error("no block available from source")]
    NoBlockAvailable,
}
