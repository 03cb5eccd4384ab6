//! Blueprint validation
//!
//! Turns the raw JSON document produced by the generation backend into a
//! [`StructureBlueprint`]. Checks run in a fixed order: root shape, origin,
//! the `blocks` array, then per placement its position, mode, block source
//! and mode parameters. Defaults are filled in and block ids are
//! normalized to carry the namespace prefix.
//!
//! [`validate`] is fail-fast: the first invalid placement rejects the whole
//! document. [`parse_lenient`] keeps going and reports each placement
//! separately so a partially broken document can still be salvaged.

use crate::block::{normalize_block_id, BlockPalette, BlockSource, BlockSpec, PalettePattern};
use crate::coords::{Axis, Dimensions, Vec3};
use crate::error::ValidationError;
use crate::placement::{PlacementDefinition, PlacementMode, Shape, StructureBlueprint};
use serde_json::{Map, Value};

type Object = Map<String, Value>;

/// Smallest accepted sphere/cylinder radius
pub const MIN_RADIUS: f64 = 0.5;

/// Blueprint whose placements were validated one by one
#[derive(Debug, Clone)]
pub struct LenientBlueprint {
    /// Origin the placement offsets are relative to
    pub local_origin: Vec3,
    /// Overall size hint
    pub dimensions_hint: Option<Dimensions>,
    /// One result per raw placement, in declaration order
    pub placements: Vec<Result<PlacementDefinition, ValidationError>>,
}

impl LenientBlueprint {
    /// Number of placements that failed validation
    #[must_use]
    pub fn invalid_count(&self) -> usize {
        self.placements.iter().filter(|p| p.is_err()).count()
    }
}

/// Validate a raw blueprint document
///
/// # Errors
/// Returns the first [`ValidationError`] encountered; no partial blueprint
/// is produced.
pub fn validate(raw: &Value) -> Result<StructureBlueprint, ValidationError> {
    let header = parse_header(raw)?;
    let placements = header
        .blocks
        .iter()
        .enumerate()
        .map(|(i, block)| parse_placement(i, block))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(StructureBlueprint {
        local_origin: header.origin,
        dimensions_hint: header.dimensions,
        placements,
    })
}

/// Validate the document shape, then each placement independently
///
/// # Errors
/// Only root-level problems (no `structure`, bad origin, `blocks` not an
/// array) are returned as errors; placement problems are kept per entry.
pub fn parse_lenient(raw: &Value) -> Result<LenientBlueprint, ValidationError> {
    let header = parse_header(raw)?;
    let placements = header
        .blocks
        .iter()
        .enumerate()
        .map(|(i, block)| parse_placement(i, block))
        .collect();

    Ok(LenientBlueprint {
        local_origin: header.origin,
        dimensions_hint: header.dimensions,
        placements,
    })
}

struct Header<'a> {
    origin: Vec3,
    dimensions: Option<Dimensions>,
    blocks: &'a [Value],
}

fn parse_header(raw: &Value) -> Result<Header<'_>, ValidationError> {
    let root = as_object(raw, "$")?;
    let structure = root.get("structure").ok_or(ValidationError::MissingField {
        path: "$".to_string(),
        field: "structure",
    })?;
    let structure = as_object(structure, "structure")?;

    let origin = read_vec3(structure, "position", "structure")?;
    if origin != Vec3::ZERO {
        tracing::warn!(%origin, "structure.position is not the zero origin");
    }

    let dimensions = structure.get("dimensions").and_then(|d| {
        let dims = read_dimensions_hint(d);
        if dims.is_none() {
            tracing::warn!("ignoring malformed structure.dimensions hint");
        }
        dims
    });

    let blocks = structure.get("blocks").ok_or(ValidationError::MissingField {
        path: "structure".to_string(),
        field: "blocks",
    })?;
    let blocks = blocks.as_array().ok_or(ValidationError::WrongType {
        path: "structure.blocks".to_string(),
        expected: "an array",
    })?;
    if blocks.is_empty() {
        tracing::warn!("structure.blocks is empty; the build will be a no-op");
    }

    Ok(Header {
        origin,
        dimensions,
        blocks,
    })
}

/// Validate one raw placement at `index` of `structure.blocks`
///
/// # Errors
/// Returns a path-qualified [`ValidationError`] for the first problem found.
pub fn parse_placement(index: usize, raw: &Value) -> Result<PlacementDefinition, ValidationError> {
    let path = format!("structure.blocks[{index}]");
    let block = as_object(raw, &path)?;

    let position = read_vec3(block, "position", &path)?;

    let mode = match block.get("placement_mode") {
        None | Some(Value::Null) => PlacementMode::Point,
        Some(Value::String(name)) => {
            PlacementMode::from_wire(name).ok_or_else(|| ValidationError::UnknownMode {
                path: format!("{path}.placement_mode"),
                value: name.clone(),
            })?
        }
        Some(other) => {
            return Err(ValidationError::UnknownMode {
                path: format!("{path}.placement_mode"),
                value: other.to_string(),
            })
        }
    };

    let source = read_block_source(block, &path)?;
    let shape = read_shape(block, mode, &path)?;

    let comment = block
        .get("comment")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(PlacementDefinition {
        position,
        shape,
        source,
        comment,
    })
}

fn read_block_source(block: &Object, path: &str) -> Result<BlockSource, ValidationError> {
    let single = block.get("block").filter(|b| b.is_object());
    let palette = match block.get("block_palette") {
        None | Some(Value::Null) => None,
        Some(Value::Array(entries)) if entries.is_empty() => None,
        Some(Value::Array(entries)) => Some(entries),
        Some(_) => {
            return Err(ValidationError::WrongType {
                path: format!("{path}.block_palette"),
                expected: "an array of block specs",
            })
        }
    };

    match (single, palette) {
        (None, None) => Err(ValidationError::MissingBlockSource {
            path: path.to_string(),
        }),
        (single, Some(entries)) => {
            if single.is_some() {
                tracing::warn!(path, "both 'block' and 'block_palette' given; using the palette");
            }
            let specs = entries
                .iter()
                .enumerate()
                .map(|(i, entry)| read_block_spec(entry, &format!("{path}.block_palette[{i}]"), true))
                .collect::<Result<Vec<_>, _>>()?;
            let pattern = read_pattern(block, path)?;
            let palette = BlockPalette::try_new(specs).ok_or(ValidationError::MissingBlockSource {
                path: path.to_string(),
            })?;
            Ok(BlockSource::Palette { palette, pattern })
        }
        (Some(spec), None) => Ok(BlockSource::Single(read_block_spec(
            spec,
            &format!("{path}.block"),
            false,
        )?)),
    }
}

fn read_block_spec(raw: &Value, path: &str, weighted: bool) -> Result<BlockSpec, ValidationError> {
    let obj = as_object(raw, path)?;
    let id = match obj.get("id") {
        Some(Value::String(id)) => id,
        Some(_) => {
            return Err(ValidationError::WrongType {
                path: format!("{path}.id"),
                expected: "a string",
            })
        }
        None => {
            return Err(ValidationError::MissingField {
                path: path.to_string(),
                field: "id",
            })
        }
    };
    if id.trim().is_empty() {
        return Err(ValidationError::EmptyBlockId {
            path: format!("{path}.id"),
        });
    }
    if !id.trim().starts_with(crate::block::BLOCK_NAMESPACE) {
        tracing::debug!(path, id = %id, "adding namespace to block id");
    }
    for ignored in ["states", "nbt"] {
        if obj.contains_key(ignored) {
            tracing::warn!(path, key = ignored, "block spec key is not supported and will be ignored");
        }
    }

    let mut spec = BlockSpec::new(id);
    if weighted {
        match obj.get("weight") {
            None | Some(Value::Null) => {}
            Some(Value::Number(n)) => {
                let weight = n.as_f64().unwrap_or(0.0);
                if weight < 0.0 {
                    tracing::warn!(path, weight, "negative palette weight clamped to 0");
                }
                spec = spec.with_weight(weight);
            }
            Some(_) => {
                return Err(ValidationError::WrongType {
                    path: format!("{path}.weight"),
                    expected: "a number",
                })
            }
        }
    }
    Ok(spec)
}

fn read_pattern(block: &Object, path: &str) -> Result<PalettePattern, ValidationError> {
    let pattern = match block.get("palette_pattern") {
        None | Some(Value::Null) => PalettePattern::Random,
        Some(Value::String(name)) => {
            PalettePattern::from_wire(name).ok_or_else(|| ValidationError::UnknownPattern {
                path: format!("{path}.palette_pattern"),
                value: name.clone(),
            })?
        }
        Some(other) => {
            return Err(ValidationError::UnknownPattern {
                path: format!("{path}.palette_pattern"),
                value: other.to_string(),
            })
        }
    };
    if pattern == PalettePattern::Checkerboard {
        tracing::warn!(path, "checkerboard palette pattern is laid out as random");
    }
    Ok(pattern)
}

fn read_shape(block: &Object, mode: PlacementMode, path: &str) -> Result<Shape, ValidationError> {
    let shape = match mode {
        PlacementMode::Point => Shape::Point,
        PlacementMode::Cuboid | PlacementMode::HollowCuboid => {
            let dims = read_fill_dimensions(block, mode, path)?;
            let replace_filter = read_replace_filter(block, path)?;
            if mode == PlacementMode::Cuboid {
                Shape::Cuboid { dims, replace_filter }
            } else {
                Shape::HollowCuboid { dims, replace_filter }
            }
        }
        PlacementMode::Sphere => Shape::Sphere {
            radius: read_radius(block, "sphere_radius", mode, path)?,
            hollow: read_flag(block, "sphere_hollow", path)?,
        },
        PlacementMode::Cylinder => {
            let radius = read_radius(block, "cylinder_radius", mode, path)?;
            let height = read_number(block, "cylinder_height", path)?;
            if height < 1.0 {
                return Err(ValidationError::BelowMinimum {
                    path: format!("{path}.cylinder_height"),
                    mode,
                    min: 1.0,
                    value: height,
                });
            }
            let axis = match block.get("cylinder_axis") {
                None | Some(Value::Null) => Axis::Y,
                Some(Value::String(name)) => {
                    Axis::from_wire(name).ok_or_else(|| ValidationError::InvalidAxis {
                        path: format!("{path}.cylinder_axis"),
                        value: name.clone(),
                    })?
                }
                Some(other) => {
                    return Err(ValidationError::InvalidAxis {
                        path: format!("{path}.cylinder_axis"),
                        value: other.to_string(),
                    })
                }
            };
            Shape::Cylinder {
                radius,
                height,
                axis,
                hollow: read_flag(block, "cylinder_hollow", path)?,
            }
        }
    };
    Ok(shape)
}

fn read_fill_dimensions(
    block: &Object,
    mode: PlacementMode,
    path: &str,
) -> Result<Dimensions, ValidationError> {
    let raw = block.get("fill_dimensions").ok_or(ValidationError::MissingField {
        path: path.to_string(),
        field: "fill_dimensions",
    })?;
    let dims_path = format!("{path}.fill_dimensions");
    let obj = as_object(raw, &dims_path)?;

    let extent = |field: &'static str| -> Result<i32, ValidationError> {
        let value = read_number(obj, field, &dims_path)?;
        if value < 1.0 {
            return Err(ValidationError::BelowMinimum {
                path: format!("{dims_path}.{field}"),
                mode,
                min: 1.0,
                value,
            });
        }
        to_coordinate(value, &format!("{dims_path}.{field}"))
    };

    Ok(Dimensions::new(extent("length")?, extent("width")?, extent("height")?))
}

fn read_replace_filter(block: &Object, path: &str) -> Result<Option<String>, ValidationError> {
    match block.get("replace_filter") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(filter)) if filter.trim().is_empty() => Ok(None),
        Some(Value::String(filter)) => Ok(Some(normalize_block_id(filter))),
        Some(_) => Err(ValidationError::WrongType {
            path: format!("{path}.replace_filter"),
            expected: "a block id string",
        }),
    }
}

fn read_radius(
    block: &Object,
    field: &'static str,
    mode: PlacementMode,
    path: &str,
) -> Result<f64, ValidationError> {
    let radius = read_number(block, field, path)?;
    if radius < MIN_RADIUS {
        return Err(ValidationError::BelowMinimum {
            path: format!("{path}.{field}"),
            mode,
            min: MIN_RADIUS,
            value: radius,
        });
    }
    if radius < 1.0 {
        tracing::warn!(path, radius, "radius below 1 degenerates to a single cell");
    }
    Ok(radius)
}

fn read_flag(block: &Object, field: &'static str, path: &str) -> Result<bool, ValidationError> {
    match block.get(field) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(_) => Err(ValidationError::WrongType {
            path: format!("{path}.{field}"),
            expected: "a boolean",
        }),
    }
}

fn read_number(obj: &Object, field: &'static str, path: &str) -> Result<f64, ValidationError> {
    match obj.get(field) {
        Some(Value::Number(n)) => n.as_f64().ok_or(ValidationError::WrongType {
            path: format!("{path}.{field}"),
            expected: "a finite number",
        }),
        Some(_) => Err(ValidationError::WrongType {
            path: format!("{path}.{field}"),
            expected: "a number",
        }),
        None => Err(ValidationError::MissingField {
            path: path.to_string(),
            field,
        }),
    }
}

fn read_vec3(parent: &Object, field: &'static str, path: &str) -> Result<Vec3, ValidationError> {
    let raw = parent.get(field).ok_or(ValidationError::MissingField {
        path: path.to_string(),
        field,
    })?;
    let vec_path = format!("{path}.{field}");
    let obj = as_object(raw, &vec_path)?;
    Ok(Vec3::new(
        to_coordinate(read_number(obj, "x", &vec_path)?, &format!("{vec_path}.x"))?,
        to_coordinate(read_number(obj, "y", &vec_path)?, &format!("{vec_path}.y"))?,
        to_coordinate(read_number(obj, "z", &vec_path)?, &format!("{vec_path}.z"))?,
    ))
}

fn read_dimensions_hint(raw: &Value) -> Option<Dimensions> {
    let obj = raw.as_object()?;
    let get = |field: &str| {
        obj.get(field)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite() && v.abs() <= f64::from(i32::MAX))
            .map(|v| v.floor() as i32)
    };
    Some(Dimensions::new(get("length")?, get("width")?, get("height")?))
}

#[allow(clippy::cast_possible_truncation)]
fn to_coordinate(value: f64, path: &str) -> Result<i32, ValidationError> {
    let floored = value.floor();
    if !floored.is_finite() || floored < f64::from(i32::MIN) || floored > f64::from(i32::MAX) {
        return Err(ValidationError::WrongType {
            path: path.to_string(),
            expected: "a coordinate within the 32-bit range",
        });
    }
    Ok(floored as i32)
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Object, ValidationError> {
    value.as_object().ok_or_else(|| ValidationError::NotAnObject {
        path: path.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(blocks: Value) -> Value {
        json!({ "structure": { "position": { "x": 0, "y": 0, "z": 0 }, "blocks": blocks } })
    }

    #[test]
    fn minimal_setblock_defaults_to_point() {
        let bp = validate(&doc(json!([
            { "position": { "x": 1, "y": 2, "z": 3 }, "block": { "id": "stone" } }
        ])))
        .unwrap();

        assert_eq!(bp.placements.len(), 1);
        let p = &bp.placements[0];
        assert_eq!(p.shape, Shape::Point);
        assert_eq!(p.position, Vec3::new(1, 2, 3));
        assert_eq!(p.source, BlockSource::single("minecraft:stone"));
    }

    #[test]
    fn empty_blocks_is_valid() {
        let bp = validate(&doc(json!([]))).unwrap();
        assert!(bp.is_empty());
    }

    #[test]
    fn missing_structure_rejected() {
        let err = validate(&json!({ "blocks": [] })).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { field: "structure", .. }));
    }

    #[test]
    fn non_numeric_position_rejected() {
        let err = validate(&doc(json!([
            { "position": { "x": "1", "y": 2, "z": 3 }, "block": { "id": "stone" } }
        ])))
        .unwrap_err();
        assert_eq!(err.path(), "structure.blocks[0].position.x");
    }

    #[test]
    fn unknown_mode_rejected() {
        let err = validate(&doc(json!([
            { "position": { "x": 0, "y": 0, "z": 0 }, "placement_mode": "pyramid", "block": { "id": "stone" } }
        ])))
        .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownMode { .. }));
    }

    #[test]
    fn missing_block_source_rejected() {
        let err = validate(&doc(json!([{ "position": { "x": 0, "y": 0, "z": 0 } }]))).unwrap_err();
        assert!(matches!(err, ValidationError::MissingBlockSource { .. }));
    }

    #[test]
    fn palette_wins_over_single_block() {
        let bp = validate(&doc(json!([{
            "position": { "x": 0, "y": 0, "z": 0 },
            "block": { "id": "minecraft:dirt" },
            "block_palette": [{ "id": "cobblestone", "weight": 2 }, { "id": "mossy_cobblestone" }]
        }])))
        .unwrap();

        match &bp.placements[0].source {
            BlockSource::Palette { palette, pattern } => {
                assert_eq!(*pattern, PalettePattern::Random);
                assert_eq!(palette.entries()[0].id, "minecraft:cobblestone");
                assert_eq!(palette.entries()[0].weight, 2.0);
                assert_eq!(palette.entries()[1].weight, 1.0);
            }
            other => panic!("expected palette, got {other:?}"),
        }
    }

    #[test]
    fn checkerboard_pattern_accepted() {
        let bp = validate(&doc(json!([{
            "position": { "x": 0, "y": 0, "z": 0 },
            "block_palette": [{ "id": "white_wool" }, { "id": "black_wool" }],
            "palette_pattern": "checkerboard"
        }])))
        .unwrap();
        assert!(matches!(
            bp.placements[0].source,
            BlockSource::Palette { pattern: PalettePattern::Checkerboard, .. }
        ));
    }

    #[test]
    fn fill_requires_dimensions() {
        let err = validate(&doc(json!([{
            "position": { "x": 0, "y": 0, "z": 0 },
            "placement_mode": "fill",
            "block": { "id": "stone" }
        }])))
        .unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { field: "fill_dimensions", .. }));
    }

    #[test]
    fn fill_dimension_below_one_rejected() {
        let err = validate(&doc(json!([{
            "position": { "x": 0, "y": 0, "z": 0 },
            "placement_mode": "hollow_box",
            "fill_dimensions": { "length": 3, "width": 0, "height": 3 },
            "block": { "id": "stone" }
        }])))
        .unwrap_err();
        assert_eq!(err.path(), "structure.blocks[0].fill_dimensions.width");
    }

    #[test]
    fn replace_filter_normalized() {
        let bp = validate(&doc(json!([{
            "position": { "x": 0, "y": 0, "z": 0 },
            "placement_mode": "fill",
            "fill_dimensions": { "length": 2, "width": 2, "height": 1 },
            "replace_filter": "air",
            "block": { "id": "grass_block" }
        }])))
        .unwrap();
        assert_eq!(
            bp.placements[0].shape,
            Shape::Cuboid {
                dims: Dimensions::new(2, 2, 1),
                replace_filter: Some("minecraft:air".to_string()),
            }
        );
    }

    #[test]
    fn sphere_radius_bounds() {
        let small = validate(&doc(json!([{
            "position": { "x": 0, "y": 0, "z": 0 },
            "placement_mode": "sphere", "sphere_radius": 0.7,
            "block": { "id": "glass" }
        }])));
        assert!(small.is_ok());

        let tiny = validate(&doc(json!([{
            "position": { "x": 0, "y": 0, "z": 0 },
            "placement_mode": "sphere", "sphere_radius": 0.4,
            "block": { "id": "glass" }
        }])))
        .unwrap_err();
        assert!(matches!(tiny, ValidationError::BelowMinimum { .. }));
    }

    #[test]
    fn cylinder_defaults() {
        let bp = validate(&doc(json!([{
            "position": { "x": 0, "y": 0, "z": 0 },
            "placement_mode": "cylinder", "cylinder_radius": 2, "cylinder_height": 5,
            "block": { "id": "stone_bricks" }
        }])))
        .unwrap();
        assert_eq!(
            bp.placements[0].shape,
            Shape::Cylinder { radius: 2.0, height: 5.0, axis: Axis::Y, hollow: false }
        );
    }

    #[test]
    fn cylinder_bad_axis_rejected() {
        let err = validate(&doc(json!([{
            "position": { "x": 0, "y": 0, "z": 0 },
            "placement_mode": "cylinder", "cylinder_radius": 2, "cylinder_height": 5,
            "cylinder_axis": "w",
            "block": { "id": "stone_bricks" }
        }])))
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidAxis { .. }));
    }

    #[test]
    fn non_boolean_hollow_rejected() {
        let err = validate(&doc(json!([{
            "position": { "x": 0, "y": 0, "z": 0 },
            "placement_mode": "sphere", "sphere_radius": 3, "sphere_hollow": "yes",
            "block": { "id": "glass" }
        }])))
        .unwrap_err();
        assert_eq!(err.path(), "structure.blocks[0].sphere_hollow");
    }

    #[test]
    fn lenient_keeps_valid_neighbours() {
        let lenient = parse_lenient(&doc(json!([
            { "position": { "x": 0, "y": 0, "z": 0 }, "block": { "id": "stone" } },
            { "position": { "x": 0, "y": 0, "z": 0 }, "placement_mode": "fill", "block": { "id": "stone" } },
            { "position": { "x": 5, "y": 0, "z": 0 }, "block": { "id": "dirt" } }
        ])))
        .unwrap();
        assert_eq!(lenient.placements.len(), 3);
        assert_eq!(lenient.invalid_count(), 1);
        assert!(lenient.placements[1].is_err());
    }

    #[test]
    fn dimensions_hint_parsed() {
        let raw = json!({ "structure": {
            "position": { "x": 0, "y": 0, "z": 0 },
            "dimensions": { "length": 9, "width": 7, "height": 12 },
            "blocks": []
        }});
        let bp = validate(&raw).unwrap();
        assert_eq!(bp.dimensions_hint, Some(Dimensions::new(9, 7, 12)));
    }
}
