//! Integer world coordinates and axis-aligned boxes
//!
//! Coordinates are block-grid positions. Offsets and anchors share the same
//! type; arithmetic is checked so an absurd anchor surfaces as a
//! [`RasterError::CoordinateOverflow`](crate::RasterError::CoordinateOverflow)
//! instead of wrapping.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Block-grid position or offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// East/west
    pub x: i32,
    /// Up/down
    pub y: i32,
    /// North/south
    pub z: i32,
}

impl Vec3 {
    /// The origin
    pub const ZERO: Vec3 = Vec3 { x: 0, y: 0, z: 0 };

    /// Create new coordinate
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Component-wise checked addition
    #[inline]
    #[must_use]
    pub fn checked_add(self, other: Vec3) -> Option<Vec3> {
        Some(Vec3 {
            x: self.x.checked_add(other.x)?,
            y: self.y.checked_add(other.y)?,
            z: self.z.checked_add(other.z)?,
        })
    }

    /// Component-wise checked subtraction
    #[inline]
    #[must_use]
    pub fn checked_sub(self, other: Vec3) -> Option<Vec3> {
        Some(Vec3 {
            x: self.x.checked_sub(other.x)?,
            y: self.y.checked_sub(other.y)?,
            z: self.z.checked_sub(other.z)?,
        })
    }

    /// Squared euclidean length, widened so it never overflows
    #[inline]
    #[must_use]
    pub fn length_squared(self) -> i64 {
        let (x, y, z) = (i64::from(self.x), i64::from(self.y), i64::from(self.z));
        x * x + y * y + z * z
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.x, self.y, self.z)
    }
}

/// Cylinder axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Along X
    X,
    /// Along Y (vertical)
    #[default]
    Y,
    /// Along Z
    Z,
}

impl Axis {
    /// Parse the wire name (`x`, `y`, `z`)
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "x" => Some(Axis::X),
            "y" => Some(Axis::Y),
            "z" => Some(Axis::Z),
            _ => None,
        }
    }

    /// Map a layer index along this axis plus a disc offset `(a, b)` in the
    /// two orthogonal axes back into 3D.
    ///
    /// The orthogonal pairs are `x: (y, z)`, `y: (x, z)`, `z: (x, y)`.
    #[inline]
    #[must_use]
    pub fn compose(self, layer: i32, a: i32, b: i32) -> Vec3 {
        match self {
            Axis::X => Vec3::new(layer, a, b),
            Axis::Y => Vec3::new(a, layer, b),
            Axis::Z => Vec3::new(a, b, layer),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

/// Box extents: `length` runs along X, `width` along Z, `height` along Y
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Extent along X
    pub length: i32,
    /// Extent along Z
    pub width: i32,
    /// Extent along Y
    pub height: i32,
}

impl Dimensions {
    /// Create new dimensions
    #[inline]
    #[must_use]
    pub const fn new(length: i32, width: i32, height: i32) -> Self {
        Self {
            length,
            width,
            height,
        }
    }

    /// Total cell count, `None` if it does not fit in a `u64`
    #[inline]
    #[must_use]
    pub fn checked_volume(&self) -> Option<u64> {
        u64::from(self.length.unsigned_abs())
            .checked_mul(u64::from(self.width.unsigned_abs()))?
            .checked_mul(u64::from(self.height.unsigned_abs()))
    }

    /// Total cell count, saturating at `u64::MAX`
    #[inline]
    #[must_use]
    pub fn volume(&self) -> u64 {
        self.checked_volume().unwrap_or(u64::MAX)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.length, self.width, self.height)
    }
}

/// Inclusive axis-aligned box with `min <= max` on every axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockBox {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl BlockBox {
    /// Box spanned by two arbitrary corners
    #[must_use]
    pub fn from_corners(a: Vec3, b: Vec3) -> Self {
        Self {
            min: Vec3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Vec3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Box anchored at `base` and extended by `dims` (`dims` of 1 is one cell)
    ///
    /// Returns `None` on coordinate overflow.
    #[must_use]
    pub fn from_extent(base: Vec3, dims: Dimensions) -> Option<Self> {
        let far = Vec3::new(
            base.x.checked_add(dims.length)?.checked_sub(1)?,
            base.y.checked_add(dims.height)?.checked_sub(1)?,
            base.z.checked_add(dims.width)?.checked_sub(1)?,
        );
        Some(Self::from_corners(base, far))
    }

    /// Box shrunk by one cell on every side, if anything remains
    #[must_use]
    pub fn interior(&self) -> Option<Self> {
        let min = Vec3::new(
            self.min.x.saturating_add(1),
            self.min.y.saturating_add(1),
            self.min.z.saturating_add(1),
        );
        let max = Vec3::new(
            self.max.x.saturating_sub(1),
            self.max.y.saturating_sub(1),
            self.max.z.saturating_sub(1),
        );
        (min.x <= max.x && min.y <= max.y && min.z <= max.z).then_some(Self { min, max })
    }

    /// Number of cells in the box, saturating at `u64::MAX`
    #[must_use]
    pub fn volume(&self) -> u64 {
        let span = |lo: i32, hi: i32| u64::from(hi.abs_diff(lo)) + 1;
        span(self.min.x, self.max.x)
            .saturating_mul(span(self.min.y, self.max.y))
            .saturating_mul(span(self.min.z, self.max.z))
    }

    /// Whether `p` lies on the box boundary along any axis
    #[inline]
    #[must_use]
    pub fn is_shell(&self, p: Vec3) -> bool {
        p.x == self.min.x
            || p.x == self.max.x
            || p.y == self.min.y
            || p.y == self.max.y
            || p.z == self.min.z
            || p.z == self.max.z
    }

    /// Iterate cells in Y, Z, X order (layer by layer)
    pub fn cells(&self) -> impl Iterator<Item = Vec3> + '_ {
        (self.min.y..=self.max.y).flat_map(move |y| {
            (self.min.z..=self.max.z)
                .flat_map(move |z| (self.min.x..=self.max.x).map(move |x| Vec3::new(x, y, z)))
        })
    }
}

impl fmt::Display for BlockBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.min, self.max)
    }
}
