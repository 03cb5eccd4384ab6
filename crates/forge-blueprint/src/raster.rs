//! Geometry rasterization
//!
//! Expands placement definitions into [`CommandRecord`]s. Shapes are
//! deterministic; only per-cell block choice is random, drawn through the
//! palette selector from the rasterizer's own RNG.
//!
//! # Failure containment
//!
//! [`Rasterizer::rasterize_blueprint`] processes definitions in declaration
//! order and never stops early: a definition that fails is logged, counted
//! in [`Rasterization::skipped_definitions`], and the next one is processed.

use crate::block::{BlockSource, AIR_BLOCK};
use crate::command::CommandRecord;
use crate::coords::{Axis, BlockBox, Dimensions, Vec3};
use crate::error::{RasterError, ValidationError};
use crate::placement::{PlacementDefinition, PlacementMode, Shape, StructureBlueprint};
use crate::validator::LenientBlueprint;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// Default cap on per-cell instructions from a single definition
pub const DEFAULT_MAX_CELLS_PER_DEFINITION: u64 = 250_000;

/// Limits applied while rasterizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterLimits {
    /// Per-cell instructions one definition may emit
    pub max_cells_per_definition: u64,
}

impl Default for RasterLimits {
    fn default() -> Self {
        Self {
            max_cells_per_definition: DEFAULT_MAX_CELLS_PER_DEFINITION,
        }
    }
}

/// Result of rasterizing a whole blueprint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rasterization {
    /// Commands in dispatch order
    pub commands: Vec<CommandRecord>,
    /// Definitions that could not be rasterized
    pub skipped_definitions: usize,
    /// Approximate number of blocks the commands will place
    pub estimated_blocks: u64,
}

impl Rasterization {
    /// Number of commands
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no command was produced
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Placement-to-command expander
#[derive(Debug, Clone)]
pub struct Rasterizer<R = StdRng> {
    rng: R,
    limits: RasterLimits,
}

impl Rasterizer<StdRng> {
    /// Rasterizer seeded from OS entropy
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Reproducible rasterizer
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Rasterizer<R> {
    /// Create with default limits
    #[inline]
    #[must_use]
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            limits: RasterLimits::default(),
        }
    }

    /// With limits
    #[inline]
    #[must_use]
    pub fn with_limits(mut self, limits: RasterLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Rasterize a validated blueprint anchored at `anchor`
    pub fn rasterize_blueprint(&mut self, blueprint: &StructureBlueprint, anchor: Vec3) -> Rasterization {
        let entries = blueprint.placements.iter().map(Ok);
        self.rasterize_entries(entries, blueprint.local_origin, anchor)
    }

    /// Rasterize a leniently parsed blueprint; invalid entries count as skipped
    pub fn rasterize_lenient(&mut self, blueprint: &LenientBlueprint, anchor: Vec3) -> Rasterization {
        let entries = blueprint.placements.iter().map(Result::as_ref);
        self.rasterize_entries(entries, blueprint.local_origin, anchor)
    }

    fn rasterize_entries<'a, I>(&mut self, entries: I, origin: Vec3, anchor: Vec3) -> Rasterization
    where
        I: Iterator<Item = Result<&'a PlacementDefinition, &'a ValidationError>>,
    {
        let mut out = Rasterization::default();

        for (index, entry) in entries.enumerate() {
            let result = entry
                .map_err(|e| RasterError::InvalidDefinition(e.clone()))
                .and_then(|def| {
                    let base = anchor
                        .checked_add(def.position)
                        .and_then(|p| p.checked_sub(origin))
                        .ok_or(RasterError::CoordinateOverflow { mode: def.mode() })?;
                    self.rasterize(def, base)
                });

            match result {
                Ok(commands) => {
                    out.estimated_blocks =
                        out.estimated_blocks.saturating_add(estimate_blocks(&commands));
                    out.commands.extend(commands);
                }
                Err(error) => {
                    tracing::warn!(definition = index + 1, %error, "skipping placement definition");
                    out.skipped_definitions += 1;
                }
            }
        }

        tracing::info!(
            commands = out.commands.len(),
            skipped = out.skipped_definitions,
            estimated_blocks = out.estimated_blocks,
            "rasterization finished"
        );
        out
    }

    /// Rasterize one definition whose base coordinate is already resolved
    ///
    /// # Errors
    /// - [`RasterError::CoordinateOverflow`] if a cell leaves the `i32` range
    /// - [`RasterError::CellBudgetExceeded`] if per-cell expansion is too large
    /// - [`RasterError::NoBlockAvailable`] if the block source yields nothing
    pub fn rasterize(
        &mut self,
        def: &PlacementDefinition,
        base: Vec3,
    ) -> Result<Vec<CommandRecord>, RasterError> {
        let mode = def.mode();
        match &def.shape {
            Shape::Point => {
                let block = self.draw(&def.source)?;
                Ok(vec![CommandRecord::cell(base, block, mode)])
            }
            Shape::Cuboid { dims, replace_filter } => {
                let bounds = box_at(base, *dims, mode)?;
                match &def.source {
                    BlockSource::Single(spec) => Ok(vec![CommandRecord::region(
                        bounds,
                        spec.id.clone(),
                        replace_filter.clone(),
                        mode,
                    )]),
                    BlockSource::Palette { .. } => {
                        self.ensure_budget(mode, bounds.volume())?;
                        self.per_cell(&def.source, mode, bounds.cells())
                    }
                }
            }
            Shape::HollowCuboid { dims, replace_filter } => {
                let bounds = box_at(base, *dims, mode)?;
                match &def.source {
                    BlockSource::Single(spec) => {
                        let mut commands = vec![CommandRecord::region(
                            bounds,
                            spec.id.clone(),
                            replace_filter.clone(),
                            mode,
                        )];
                        if dims.length > 2 && dims.width > 2 && dims.height > 2 {
                            if let Some(inner) = bounds.interior() {
                                commands.push(CommandRecord::region(
                                    inner,
                                    AIR_BLOCK,
                                    Some(spec.id.clone()),
                                    mode,
                                ));
                            }
                        }
                        Ok(commands)
                    }
                    BlockSource::Palette { .. } => {
                        self.ensure_budget(mode, shell_cells(*dims))?;
                        let shell = bounds.cells().filter(|p| bounds.is_shell(*p));
                        self.per_cell(&def.source, mode, shell)
                    }
                }
            }
            Shape::Sphere { radius, hollow } => {
                let test = DiscTest::new(*radius, *hollow);
                self.ensure_budget(mode, test.sphere_estimate())?;
                let c = test.half_width();
                let offsets = (-c..=c)
                    .flat_map(move |dy| (-c..=c).flat_map(move |dz| (-c..=c).map(move |dx| Vec3::new(dx, dy, dz))))
                    .filter(|o| test.includes(o.length_squared()));
                let cells = offsets_to_cells(base, offsets, mode)?;
                self.ensure_budget(mode, cells.len() as u64)?;
                self.per_cell(&def.source, mode, cells.into_iter())
            }
            Shape::Cylinder {
                radius,
                height,
                axis,
                hollow,
            } => {
                let test = DiscTest::new(*radius, *hollow);
                let layers = layer_count(*height);
                self.ensure_budget(mode, test.cylinder_estimate(layers))?;
                let cells = offsets_to_cells(base, cylinder_offsets(test, layers, *axis), mode)?;
                self.ensure_budget(mode, cells.len() as u64)?;
                self.per_cell(&def.source, mode, cells.into_iter())
            }
        }
    }

    fn per_cell<I>(
        &mut self,
        source: &BlockSource,
        mode: PlacementMode,
        cells: I,
    ) -> Result<Vec<CommandRecord>, RasterError>
    where
        I: Iterator<Item = Vec3>,
    {
        cells
            .map(|at| self.draw(source).map(|block| CommandRecord::cell(at, block, mode)))
            .collect()
    }

    fn draw(&mut self, source: &BlockSource) -> Result<String, RasterError> {
        match source {
            BlockSource::Single(spec) => Ok(spec.id.clone()),
            // Checkerboard is laid out exactly like Random
            BlockSource::Palette { palette, .. } => palette
                .choose(&mut self.rng)
                .map(|spec| spec.id.clone())
                .ok_or(RasterError::NoBlockAvailable),
        }
    }

    fn ensure_budget(&self, mode: PlacementMode, cells: u64) -> Result<(), RasterError> {
        let limit = self.limits.max_cells_per_definition;
        if cells > limit {
            return Err(RasterError::CellBudgetExceeded { mode, cells, limit });
        }
        Ok(())
    }
}

/// Inclusion test shared by spheres and cylinder discs
#[derive(Debug, Clone, Copy)]
struct DiscTest {
    radius: f64,
    outer_sq: f64,
    inner_sq: Option<f64>,
}

impl DiscTest {
    fn new(radius: f64, hollow: bool) -> Self {
        let inner = (radius - 1.0).max(0.0);
        Self {
            radius,
            outer_sq: radius * radius,
            inner_sq: hollow.then_some(inner * inner),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn half_width(&self) -> i32 {
        self.radius.ceil().min(f64::from(i32::MAX / 2)) as i32
    }

    #[allow(clippy::cast_precision_loss)]
    fn includes(&self, dist_sq: i64) -> bool {
        let d = dist_sq as f64;
        d <= self.outer_sq && self.inner_sq.map_or(true, |inner| d >= inner)
    }

    /// Rough cell count used to refuse absurd radii before iterating
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn sphere_estimate(&self) -> u64 {
        let solid = 4.0 / 3.0 * PI * self.radius.powi(3);
        let hollow = self.inner_sq.map_or(0.0, |inner_sq| 4.0 / 3.0 * PI * inner_sq.powf(1.5));
        ((solid - hollow).max(1.0) * 0.9) as u64
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn cylinder_estimate(&self, layers: i32) -> u64 {
        let disc = PI * (self.outer_sq - self.inner_sq.unwrap_or(0.0));
        (disc.max(1.0) * f64::from(layers) * 0.9) as u64
    }
}

fn cylinder_offsets(test: DiscTest, layers: i32, axis: Axis) -> impl Iterator<Item = Vec3> {
    let c = test.half_width();
    (0..layers).flat_map(move |layer| {
        (-c..=c).flat_map(move |a| {
            (-c..=c)
                .filter(move |b| test.includes(i64::from(a) * i64::from(a) + i64::from(*b) * i64::from(*b)))
                .map(move |b| axis.compose(layer, a, b))
        })
    })
}

#[allow(clippy::cast_possible_truncation)]
fn layer_count(height: f64) -> i32 {
    height.ceil().clamp(1.0, f64::from(i32::MAX)) as i32
}

fn offsets_to_cells<I>(base: Vec3, offsets: I, mode: PlacementMode) -> Result<Vec<Vec3>, RasterError>
where
    I: Iterator<Item = Vec3>,
{
    offsets
        .map(|o| base.checked_add(o).ok_or(RasterError::CoordinateOverflow { mode }))
        .collect()
}

fn box_at(base: Vec3, dims: Dimensions, mode: PlacementMode) -> Result<BlockBox, RasterError> {
    BlockBox::from_extent(base, dims).ok_or(RasterError::CoordinateOverflow { mode })
}

fn shell_cells(dims: Dimensions) -> u64 {
    let Some(total) = dims.checked_volume() else {
        return u64::MAX;
    };
    if dims.length > 2 && dims.width > 2 && dims.height > 2 {
        total - Dimensions::new(dims.length - 2, dims.width - 2, dims.height - 2).volume()
    } else {
        total
    }
}

fn estimate_blocks(commands: &[CommandRecord]) -> u64 {
    // A hollow box is an outer fill followed by an air fill of its interior
    let mut total = 0u64;
    for cmd in commands {
        if cmd.block_id() == AIR_BLOCK && cmd.is_bulk() && cmd.origin_mode() == PlacementMode::HollowCuboid {
            total = total.saturating_sub(cmd.cell_count());
        } else {
            total = total.saturating_add(cmd.cell_count());
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockPalette, BlockSpec, PalettePattern};
    use crate::command::CommandTarget;
    use pretty_assertions::assert_eq;

    fn palette_source() -> BlockSource {
        BlockSource::Palette {
            palette: BlockPalette::try_new(vec![BlockSpec::new("stone"), BlockSpec::new("andesite")]).unwrap(),
            pattern: PalettePattern::Random,
        }
    }

    fn def(shape: Shape, source: BlockSource) -> PlacementDefinition {
        PlacementDefinition::new(Vec3::ZERO, shape, source)
    }

    fn cuboid(l: i32, w: i32, h: i32) -> Shape {
        Shape::Cuboid {
            dims: Dimensions::new(l, w, h),
            replace_filter: None,
        }
    }

    fn hollow(l: i32, w: i32, h: i32) -> Shape {
        Shape::HollowCuboid {
            dims: Dimensions::new(l, w, h),
            replace_filter: None,
        }
    }

    #[test]
    fn point_emits_one_cell() {
        let mut r = Rasterizer::seeded(1);
        let out = r
            .rasterize(&def(Shape::Point, BlockSource::single("stone")), Vec3::new(4, 5, 6))
            .unwrap();
        assert_eq!(out, vec![CommandRecord::cell(Vec3::new(4, 5, 6), "minecraft:stone", PlacementMode::Point)]);
    }

    #[test]
    fn cuboid_single_block_is_one_bulk() {
        let mut r = Rasterizer::seeded(1);
        let out = r.rasterize(&def(cuboid(3, 3, 3), BlockSource::single("stone")), Vec3::ZERO).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].is_bulk());
        assert_eq!(out[0].cell_count(), 27);
    }

    #[test]
    fn cuboid_palette_decomposes_per_cell() {
        let mut r = Rasterizer::seeded(1);
        let out = r.rasterize(&def(cuboid(3, 3, 3), palette_source()), Vec3::ZERO).unwrap();
        assert_eq!(out.len(), 27);
        assert!(out.iter().all(|c| !c.is_bulk() && c.origin_mode() == PlacementMode::Cuboid));
    }

    #[test]
    fn cuboid_keeps_replace_filter() {
        let mut r = Rasterizer::seeded(1);
        let shape = Shape::Cuboid {
            dims: Dimensions::new(4, 4, 1),
            replace_filter: Some("minecraft:air".to_string()),
        };
        let out = r.rasterize(&def(shape, BlockSource::single("grass_block")), Vec3::ZERO).unwrap();
        match out[0].target() {
            CommandTarget::Region { filter, .. } => assert_eq!(filter.as_deref(), Some("minecraft:air")),
            other => panic!("expected region, got {other:?}"),
        }
    }

    #[test]
    fn hollow_cube_single_block_is_two_bulks() {
        let mut r = Rasterizer::seeded(1);
        let out = r.rasterize(&def(hollow(3, 3, 3), BlockSource::single("stone")), Vec3::ZERO).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].block_id(), AIR_BLOCK);
        assert_eq!(
            out[1].target(),
            &CommandTarget::Region {
                bounds: BlockBox::from_corners(Vec3::new(1, 1, 1), Vec3::new(1, 1, 1)),
                filter: Some("minecraft:stone".to_string()),
            }
        );
    }

    #[test]
    fn hollow_cube_without_interior_is_one_bulk() {
        let mut r = Rasterizer::seeded(1);
        let out = r.rasterize(&def(hollow(2, 2, 2), BlockSource::single("stone")), Vec3::ZERO).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn hollow_palette_emits_shell_only() {
        let mut r = Rasterizer::seeded(1);
        let out = r.rasterize(&def(hollow(4, 4, 4), palette_source()), Vec3::ZERO).unwrap();
        assert_eq!(out.len(), 64 - 8);
    }

    #[test]
    fn unit_sphere_is_seven_cells() {
        let mut r = Rasterizer::seeded(1);
        let shape = Shape::Sphere { radius: 1.0, hollow: false };
        let out = r.rasterize(&def(shape, BlockSource::single("stone")), Vec3::ZERO).unwrap();
        assert_eq!(out.len(), 7);
    }

    #[test]
    fn sub_unit_radius_is_center_cell() {
        let mut r = Rasterizer::seeded(1);
        for hollow in [false, true] {
            let shape = Shape::Sphere { radius: 0.5, hollow };
            let out = r.rasterize(&def(shape, BlockSource::single("stone")), Vec3::new(2, 2, 2)).unwrap();
            assert_eq!(out, vec![CommandRecord::cell(Vec3::new(2, 2, 2), "minecraft:stone", PlacementMode::Sphere)]);
        }
    }

    #[test]
    fn hollow_sphere_drops_interior() {
        let mut r = Rasterizer::seeded(1);
        let solid = r
            .rasterize(&def(Shape::Sphere { radius: 3.0, hollow: false }, BlockSource::single("glass")), Vec3::ZERO)
            .unwrap();
        let shell = r
            .rasterize(&def(Shape::Sphere { radius: 3.0, hollow: true }, BlockSource::single("glass")), Vec3::ZERO)
            .unwrap();
        assert!(shell.len() < solid.len());
        assert!(!shell.iter().any(|c| c.coordinate() == Vec3::ZERO));
    }

    #[test]
    fn cylinder_stacks_layers_along_axis() {
        let mut r = Rasterizer::seeded(1);
        let shape = Shape::Cylinder {
            radius: 1.0,
            height: 3.0,
            axis: Axis::X,
            hollow: false,
        };
        let out = r.rasterize(&def(shape, BlockSource::single("log")), Vec3::ZERO).unwrap();
        // Five-cell cross per layer
        assert_eq!(out.len(), 15);
        assert!(out.iter().all(|c| (0..3).contains(&c.coordinate().x)));
    }

    #[test]
    fn fractional_height_rounds_up() {
        let mut r = Rasterizer::seeded(1);
        let shape = Shape::Cylinder {
            radius: 0.5,
            height: 2.2,
            axis: Axis::Y,
            hollow: false,
        };
        let out = r.rasterize(&def(shape, BlockSource::single("log")), Vec3::ZERO).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn hollow_cylinder_drops_core_from_every_layer() {
        let mut r = Rasterizer::seeded(1);
        let shape = Shape::Cylinder {
            radius: 3.0,
            height: 2.0,
            axis: Axis::Y,
            hollow: true,
        };
        let out = r.rasterize(&def(shape, BlockSource::single("bricks")), Vec3::ZERO).unwrap();

        // 29 cells within r=3 per disc, minus the 3x3 core with d² < 4
        assert_eq!(out.len(), 2 * 20);
        for layer in 0..2 {
            let ring: Vec<Vec3> = out
                .iter()
                .map(CommandRecord::coordinate)
                .filter(|p| p.y == layer)
                .collect();
            assert_eq!(ring.len(), 20, "layer {layer}");
            assert!(ring.iter().all(|p| (4..=9).contains(&(p.x * p.x + p.z * p.z))));
        }
    }

    #[test]
    fn palette_sphere_and_cylinder_are_per_cell() {
        let mut r = Rasterizer::seeded(5);
        let shapes = [
            Shape::Sphere { radius: 2.0, hollow: false },
            Shape::Cylinder {
                radius: 2.0,
                height: 3.0,
                axis: Axis::Z,
                hollow: false,
            },
        ];
        for shape in shapes {
            let single = r.rasterize(&def(shape.clone(), BlockSource::single("stone")), Vec3::ZERO).unwrap();
            let mixed = r.rasterize(&def(shape, palette_source()), Vec3::ZERO).unwrap();

            assert_eq!(mixed.len(), single.len());
            assert!(mixed.iter().all(|c| !c.is_bulk()));
            assert!(mixed
                .iter()
                .all(|c| c.block_id() == "minecraft:stone" || c.block_id() == "minecraft:andesite"));
            assert!(mixed.iter().any(|c| c.block_id() == "minecraft:andesite"));
        }
    }

    #[test]
    fn budget_exceeded_is_an_error() {
        let mut r = Rasterizer::seeded(1).with_limits(RasterLimits {
            max_cells_per_definition: 10,
        });
        let err = r.rasterize(&def(cuboid(3, 3, 3), palette_source()), Vec3::ZERO).unwrap_err();
        assert!(matches!(err, RasterError::CellBudgetExceeded { cells: 27, limit: 10, .. }));

        // Bulk fills are a single instruction and are not limited
        assert!(r.rasterize(&def(cuboid(3, 3, 3), BlockSource::single("stone")), Vec3::ZERO).is_ok());
    }

    #[test]
    fn blueprint_offsets_by_anchor_and_origin() {
        let mut bp = StructureBlueprint::new(vec![PlacementDefinition::new(
            Vec3::new(1, 1, 1),
            Shape::Point,
            BlockSource::single("stone"),
        )]);
        bp.local_origin = Vec3::new(1, 0, 0);

        let out = Rasterizer::seeded(1).rasterize_blueprint(&bp, Vec3::new(100, 64, -20));
        assert_eq!(out.commands[0].coordinate(), Vec3::new(100, 65, -19));
    }

    #[test]
    fn failing_definition_is_skipped_and_build_continues() {
        let bp = StructureBlueprint::new(vec![
            PlacementDefinition::new(Vec3::ZERO, Shape::Point, BlockSource::single("stone")),
            PlacementDefinition::new(Vec3::new(i32::MAX, 0, 0), Shape::Point, BlockSource::single("stone")),
            PlacementDefinition::new(Vec3::ZERO, cuboid(2, 2, 2), BlockSource::single("dirt")),
        ]);

        let out = Rasterizer::seeded(1).rasterize_blueprint(&bp, Vec3::new(10, 0, 0));
        assert_eq!(out.skipped_definitions, 1);
        assert_eq!(out.commands.len(), 2);
        assert_eq!(out.estimated_blocks, 1 + 8);
    }

    #[test]
    fn hollow_bulk_estimate_counts_shell() {
        let bp = StructureBlueprint::new(vec![PlacementDefinition::new(
            Vec3::ZERO,
            hollow(5, 5, 5),
            BlockSource::single("stone"),
        )]);
        let out = Rasterizer::seeded(1).rasterize_blueprint(&bp, Vec3::ZERO);
        assert_eq!(out.estimated_blocks, 125 - 27);
    }
}
