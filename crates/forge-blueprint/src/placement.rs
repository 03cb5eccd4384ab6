//! Placement definitions and the structure blueprint
//!
//! Each [`Shape`] variant carries only the parameters its mode needs, so a
//! cuboid without dimensions or a sphere without a radius cannot be built.

use crate::block::BlockSource;
use crate::coords::{Axis, Dimensions, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placement mode tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlacementMode {
    /// One cell
    #[default]
    Point,
    /// Filled box
    Cuboid,
    /// Box shell
    HollowCuboid,
    /// Ball or spherical shell
    Sphere,
    /// Disc stack along an axis
    Cylinder,
}

impl PlacementMode {
    /// All modes in wire order
    pub const ALL: [PlacementMode; 5] = [
        PlacementMode::Point,
        PlacementMode::Cuboid,
        PlacementMode::HollowCuboid,
        PlacementMode::Sphere,
        PlacementMode::Cylinder,
    ];

    /// Parse the wire name used in generated blueprints
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "setblock" => Some(Self::Point),
            "fill" => Some(Self::Cuboid),
            "hollow_box" => Some(Self::HollowCuboid),
            "sphere" => Some(Self::Sphere),
            "cylinder" => Some(Self::Cylinder),
            _ => None,
        }
    }

    /// Wire name
    #[must_use]
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Point => "setblock",
            Self::Cuboid => "fill",
            Self::HollowCuboid => "hollow_box",
            Self::Sphere => "sphere",
            Self::Cylinder => "cylinder",
        }
    }
}

impl fmt::Display for PlacementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.wire_name())
    }
}

/// Mode plus its mode-specific parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Shape {
    /// Single cell at the base coordinate
    Point,
    /// Filled box
    Cuboid {
        /// Box extents (all >= 1)
        dims: Dimensions,
        /// Only overwrite cells currently holding this block
        replace_filter: Option<String>,
    },
    /// Box whose interior is left empty
    HollowCuboid {
        /// Box extents (all >= 1)
        dims: Dimensions,
        /// Only overwrite cells currently holding this block
        replace_filter: Option<String>,
    },
    /// Ball centred on the base coordinate
    Sphere {
        /// Radius (>= 0.5)
        radius: f64,
        /// Keep only the outer one-cell shell
        hollow: bool,
    },
    /// Cylinder whose bottom-centre is the base coordinate
    Cylinder {
        /// Disc radius (>= 0.5)
        radius: f64,
        /// Layer count along the axis (>= 1, rounded up)
        height: f64,
        /// Axis the layers stack along
        axis: Axis,
        /// Keep only the outer ring of each layer
        hollow: bool,
    },
}

impl Shape {
    /// Mode tag for this shape
    #[must_use]
    pub fn mode(&self) -> PlacementMode {
        match self {
            Shape::Point => PlacementMode::Point,
            Shape::Cuboid { .. } => PlacementMode::Cuboid,
            Shape::HollowCuboid { .. } => PlacementMode::HollowCuboid,
            Shape::Sphere { .. } => PlacementMode::Sphere,
            Shape::Cylinder { .. } => PlacementMode::Cylinder,
        }
    }
}

/// One geometric instruction in a blueprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementDefinition {
    /// Offset from the blueprint's local origin
    pub position: Vec3,
    /// Geometry and its parameters
    pub shape: Shape,
    /// Block source, resolved during validation
    pub source: BlockSource,
    /// Free-form annotation, never interpreted
    pub comment: Option<String>,
}

impl PlacementDefinition {
    /// Create a definition
    #[inline]
    #[must_use]
    pub fn new(position: Vec3, shape: Shape, source: BlockSource) -> Self {
        Self {
            position,
            shape,
            source,
            comment: None,
        }
    }

    /// With annotation
    #[inline]
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Mode tag
    #[inline]
    #[must_use]
    pub fn mode(&self) -> PlacementMode {
        self.shape.mode()
    }
}

/// Validated blueprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureBlueprint {
    /// Origin the placement offsets are relative to (expected zero)
    pub local_origin: Vec3,
    /// Overall size hint, informational only
    pub dimensions_hint: Option<Dimensions>,
    /// Placements in declaration order; may be empty
    pub placements: Vec<PlacementDefinition>,
}

impl StructureBlueprint {
    /// Blueprint at the zero origin
    #[must_use]
    pub fn new(placements: Vec<PlacementDefinition>) -> Self {
        Self {
            local_origin: Vec3::ZERO,
            dimensions_hint: None,
            placements,
        }
    }

    /// With dimensions hint
    #[inline]
    #[must_use]
    pub fn with_dimensions_hint(mut self, dims: Dimensions) -> Self {
        self.dimensions_hint = Some(dims);
        self
    }

    /// Number of placement definitions
    #[inline]
    #[must_use]
    pub fn definition_count(&self) -> usize {
        self.placements.len()
    }

    /// Whether building this blueprint is a no-op
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}
