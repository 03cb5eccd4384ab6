//! Forge Blueprint - structure model and geometry
//!
//! The pure, synchronous half of the build pipeline:
//! - Validates generated blueprint documents into [`StructureBlueprint`]s
//! - Picks blocks from weighted palettes
//! - Rasterizes placement definitions into world-mutation [`CommandRecord`]s
//!
//! # Example
//!
//! ```rust,ignore
//! use forge_blueprint::{validator, Rasterizer, Vec3};
//!
//! let raw: serde_json::Value = serde_json::from_str(document)?;
//! let blueprint = validator::validate(&raw)?;
//!
//! let out = Rasterizer::from_entropy().rasterize_blueprint(&blueprint, Vec3::new(100, 64, 100));
//! for cmd in &out.commands {
//!     println!("{cmd}");
//! }
//! ```

#![warn(unreachable_pub)]

pub mod block;
pub mod command;
pub mod coords;
pub mod error;
pub mod palette;
pub mod placement;
pub mod raster;
pub mod validator;

// Re-exports for convenience
pub use block::{normalize_block_id, BlockPalette, BlockSource, BlockSpec, PalettePattern, AIR_BLOCK};
pub use command::{CommandRecord, CommandTarget};
pub use coords::{Axis, BlockBox, Dimensions, Vec3};
pub use error::{RasterError, ValidationError};
pub use placement::{PlacementDefinition, PlacementMode, Shape, StructureBlueprint};
pub use raster::{RasterLimits, Rasterization, Rasterizer};
pub use validator::{parse_lenient, validate, LenientBlueprint};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
