//! Valetudo JSON map format.
//!
//! The document carries explicit geometry rather than a classified raster:
//!
//! ```text
//! {
//!   "pixelSize": 5,
//!   "entities": [ {"type": "robot_position", "points": [x, y], "metaData": {"angle": a}}, ... ],
//!   "layers":   [ {"type": "segment", "compressedPixels": [x, y, count, ...],
//!                  "dimensions": {"x": {"min", "max", "avg"}, "y": {...}},
//!                  "metaData": {"segmentId": "3", "name": "Kitchen"}}, ... ]
//! }
//! ```
//!
//! Entity points are map units (centimetres). Layer pixels are grid cells of
//! `pixelSize` map units, Y pointing down. Each `[x, y, count]` triple is a
//! horizontal run of `count` cells starting at `(x, y)`.
//!
//! Runs are capped at [`MAX_GRID_SIDE`] cells and the painted grid at
//! [`MAX_GRID_CELLS`]. Decoded cells are further limited to
//! [`CELLS_PER_INPUT_BYTE`] per byte of document, so a short document
//! cannot describe a huge raster.

use std::collections::BTreeMap;

use image::RgbaImage;
use serde::Deserialize;

use crate::config::{ColorKey, RoomColorIndex};
use crate::core::{
    Area, BoundingBox, ImageDimensions, MapImage, MapSnapshot, Path, Point, Projection, Room,
    TrimPixels, Wall, Zone,
};
use crate::error::{Error, Result};
use crate::io::unpack;
use crate::raster::RoomAccumulator;

use super::{MapParser, ParseContext, Vendor, EMPTY_RASTER_MESSAGE};

/// Angle offset between Valetudo headings and the renderer's icon heading
const HEADING_OFFSET: f32 = 90.0;

/// Longest pixel run and widest grid axis, in cells
pub const MAX_GRID_SIDE: i64 = 4096;
/// Largest painted grid, in cells
pub const MAX_GRID_CELLS: u64 = 1 << 22;
/// Decoded layer cells allowed per byte of JSON input
pub const CELLS_PER_INPUT_BYTE: usize = 512;
/// Hard cap on decoded layer cells across all layers
const MAX_DECODED_CELLS: usize = 1 << 24;

/// Valetudo map parser
#[derive(Clone, Copy, Debug, Default)]
pub struct ValetudoParser;

// ============================================================================
// Document model
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValetudoMap {
    pixel_size: f32,
    #[serde(default)]
    entities: Vec<Entity>,
    #[serde(default)]
    layers: Vec<Layer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entity {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    points: Vec<f32>,
    #[serde(default)]
    meta_data: EntityMeta,
}

#[derive(Debug, Default, Deserialize)]
struct EntityMeta {
    #[serde(default)]
    angle: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Layer {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    compressed_pixels: Vec<i64>,
    #[serde(default)]
    dimensions: Option<LayerDimensions>,
    #[serde(default)]
    meta_data: LayerMeta,
}

#[derive(Debug, Deserialize)]
struct LayerDimensions {
    x: AxisStats,
    y: AxisStats,
}

#[derive(Debug, Deserialize)]
struct AxisStats {
    min: f32,
    max: f32,
    avg: f32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayerMeta {
    #[serde(default)]
    segment_id: Option<serde_json::Value>,
    #[serde(default)]
    name: Option<String>,
}

impl LayerMeta {
    /// Segment id; Valetudo sends it as a string, older versions as a number
    fn segment_id(&self) -> Option<u32> {
        match self.segment_id.as_ref()? {
            serde_json::Value::String(s) => s.parse().ok(),
            serde_json::Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
            _ => None,
        }
    }
}

/// Cell limits for one document
#[derive(Clone, Copy, Debug)]
struct CellBudget {
    /// Cells left to decode
    remaining: usize,
    /// Largest grid area that may be painted
    max_area: u64,
}

impl CellBudget {
    fn for_input(len: usize) -> Self {
        let cells = len.saturating_mul(CELLS_PER_INPUT_BYTE);
        Self {
            remaining: cells.min(MAX_DECODED_CELLS),
            max_area: (cells as u64).min(MAX_GRID_CELLS),
        }
    }
}

/// Expand `[x, y, count]` runs into cells
fn decompress_pixels(compressed: &[i64], budget: &mut CellBudget) -> Result<Vec<(i64, i64)>> {
    let mut cells = Vec::new();
    for run in compressed.chunks_exact(3) {
        let (x, y, count) = (run[0], run[1], run[2]);
        if count > MAX_GRID_SIDE || x.checked_add(count).is_none() {
            return Err(Error::HeaderParse(format!(
                "pixel run of {} cells at ({}, {}) out of range",
                count, x, y
            )));
        }
        let count = count.max(0);
        budget.remaining = budget
            .remaining
            .checked_sub(count as usize)
            .ok_or_else(|| Error::HeaderParse("layer pixels exceed the input size".to_string()))?;
        cells.extend((0..count).map(|i| (x + i, y)));
    }
    Ok(cells)
}

/// Cell count along one axis of an inclusive extent
fn grid_side(min: i64, max: i64) -> Result<i32> {
    max.checked_sub(min)
        .and_then(|d| d.checked_add(1))
        .filter(|side| *side <= MAX_GRID_SIDE)
        .and_then(|side| i32::try_from(side).ok())
        .ok_or_else(|| Error::HeaderParse(format!("layer extent {}..={} too large", min, max)))
}

fn entity_point(entity: &Entity) -> Result<Point> {
    match entity.points.as_slice() {
        [x, y, ..] => Ok(match entity.meta_data.angle {
            Some(a) => Point::with_angle(*x, *y, a - HEADING_OFFSET),
            None => Point::new(*x, *y),
        }),
        _ => Err(Error::HeaderParse(format!(
            "{} entity without coordinates",
            entity.kind
        ))),
    }
}

fn entity_points(entity: &Entity) -> Vec<Point> {
    entity
        .points
        .chunks_exact(2)
        .map(|c| Point::new(c[0], c[1]))
        .collect()
}

fn entity_area(entity: &Entity) -> Result<Area> {
    match entity.points.as_slice() {
        [x0, y0, x1, y1, x2, y2, x3, y3, ..] => {
            Ok(Area::from_coords([*x0, *y0, *x1, *y1, *x2, *y2, *x3, *y3]))
        }
        _ => Err(Error::HeaderParse(format!(
            "{} entity needs 4 corners, got {} values",
            entity.kind,
            entity.points.len()
        ))),
    }
}

fn entity_wall(entity: &Entity) -> Result<Wall> {
    match entity.points.as_slice() {
        [x0, y0, x1, y1, ..] => Ok(Wall::new(*x0, *y0, *x1, *y1)),
        _ => Err(Error::HeaderParse(format!(
            "{} entity needs 2 points",
            entity.kind
        ))),
    }
}

fn entity_zone(entity: &Entity) -> Option<Zone> {
    let points = entity_points(entity);
    let first = points.first()?;
    let mut b = BoundingBox::point(first.x, first.y);
    for p in &points[1..] {
        b.include(p.x, p.y);
    }
    Some(Zone::new(b.x0, b.y0, b.x1, b.y1))
}

// ============================================================================
// Parser
// ============================================================================

/// Decompressed layer cells by class
#[derive(Default)]
struct LayerCells {
    floor: Vec<(i64, i64)>,
    wall: Option<Vec<(i64, i64)>>,
    segments: Vec<(u32, Vec<(i64, i64)>)>,
}

impl LayerCells {
    /// Inclusive extent `(min_x, min_y, max_x, max_y)` over every cell
    fn extent(&self) -> Option<(i64, i64, i64, i64)> {
        let all = self
            .floor
            .iter()
            .chain(self.wall.iter().flatten())
            .chain(self.segments.iter().flat_map(|(_, c)| c.iter()));
        all.fold(None, |acc, &(x, y)| match acc {
            None => Some((x, y, x, y)),
            Some((x0, y0, x1, y1)) => Some((x0.min(x), y0.min(y), x1.max(x), y1.max(y))),
        })
    }
}

impl MapParser for ValetudoParser {
    fn vendor(&self) -> Vendor {
        Vendor::Valetudo
    }

    fn unpack(&self, raw: &[u8]) -> Result<Vec<u8>> {
        unpack::inflate_auto(raw)
    }

    fn parse(&self, data: &[u8], ctx: &ParseContext<'_>) -> Result<MapSnapshot> {
        let map: ValetudoMap = serde_json::from_slice(data)?;
        if map.pixel_size <= 0.0 {
            return Err(Error::HeaderParse(format!(
                "invalid pixel size {}",
                map.pixel_size
            )));
        }
        let mut snapshot = MapSnapshot::default();

        let mut runs = Vec::new();
        for entity in &map.entities {
            match entity.kind.as_str() {
                "robot_position" => snapshot.vacuum_position = Some(entity_point(entity)?),
                "charger_location" => snapshot.charger = Some(entity_point(entity)?),
                "go_to_target" => snapshot.goto_target = Some(entity_point(entity)?),
                "no_go_area" => snapshot.no_go_areas.push(entity_area(entity)?),
                "no_mop_area" => snapshot.no_mopping_areas.push(entity_area(entity)?),
                "virtual_wall" => snapshot.walls.push(entity_wall(entity)?),
                "active_zone" => snapshot.zones.extend(entity_zone(entity)),
                "path" => runs.push(entity_points(entity)),
                "predicted_path" => {
                    snapshot.predicted_path = Some(Path::single(entity_points(entity)))
                }
                other => log::debug!("Skipping entity type {}", other),
            }
        }
        snapshot.path = Some(Path::from_runs(runs));

        let mut budget = CellBudget::for_input(data.len());
        let mut cells = LayerCells::default();
        for layer in &map.layers {
            match layer.kind.as_str() {
                "wall" => {
                    if cells.wall.is_some() {
                        log::warn!("Multiple wall layers in map data, keeping the first");
                    } else {
                        cells.wall = Some(decompress_pixels(&layer.compressed_pixels, &mut budget)?);
                    }
                }
                "floor" => cells
                    .floor
                    .extend(decompress_pixels(&layer.compressed_pixels, &mut budget)?),
                "segment" => {
                    let Some(id) = layer.meta_data.segment_id() else {
                        log::warn!("Segment layer without a usable id skipped");
                        continue;
                    };
                    let pixels = decompress_pixels(&layer.compressed_pixels, &mut budget)?;
                    snapshot
                        .rooms
                        .insert(id, segment_room(id, layer, &pixels, map.pixel_size));
                    cells.segments.push((id, pixels));
                }
                other => log::debug!("Skipping layer type {}", other),
            }
        }
        log::debug!(
            "Valetudo map: {} rooms, pixel size {}",
            snapshot.rooms.len(),
            map.pixel_size
        );

        snapshot.image = paint(&cells, map.pixel_size, budget.max_area, ctx)?;
        Ok(snapshot)
    }
}

/// Room from a segment layer; the box stays in grid cells
fn segment_room(id: u32, layer: &Layer, pixels: &[(i64, i64)], pixel_size: f32) -> Room {
    let mut room = match &layer.dimensions {
        Some(d) => Room::new(
            id,
            BoundingBox {
                x0: d.x.min,
                y0: d.y.min,
                x1: d.x.max,
                y1: d.y.max,
            },
        )
        .with_label(Point::new(d.x.avg * pixel_size, d.y.avg * pixel_size)),
        None => {
            let mut acc = RoomAccumulator::new();
            for &(x, y) in pixels {
                acc.add(id, x as f32, y as f32);
            }
            let bbox = acc
                .get(id)
                .copied()
                .unwrap_or_else(|| BoundingBox::point(0.0, 0.0));
            let c = bbox.center();
            Room::new(id, bbox).with_label(Point::new(c.x * pixel_size, c.y * pixel_size))
        }
    };
    room.name = layer.meta_data.name.clone();
    room
}

/// Paint layer cells onto a grid-sized image covering their extent
fn paint(
    cells: &LayerCells,
    pixel_size: f32,
    max_area: u64,
    ctx: &ParseContext<'_>,
) -> Result<MapImage> {
    let Some((min_x, min_y, max_x, max_y)) = cells.extent() else {
        log::warn!("Map has no layer pixels");
        return Ok(MapImage::empty(EMPTY_RASTER_MESSAGE));
    };
    let width = grid_side(min_x, max_x)?;
    let height = grid_side(min_y, max_y)?;
    let area = width as u64 * height as u64;
    if area > max_area {
        return Err(Error::HeaderParse(format!(
            "layer grid {}x{} exceeds {} cells",
            width, height, max_area
        )));
    }
    let origin_x = i32::try_from(min_x)
        .map_err(|_| Error::HeaderParse(format!("layer origin x {} out of range", min_x)))?;
    let origin_y = i32::try_from(min_y)
        .map_err(|_| Error::HeaderParse(format!("layer origin y {} out of range", min_y)))?;
    let trim = TrimPixels::resolve(&ctx.config.trim, width, height);
    let out_w = (width - trim.left - trim.right).max(0) as u32;
    let out_h = (height - trim.top - trim.bottom).max(0) as u32;

    let background = ctx.palette.get(ColorKey::MapOutside).to_rgba();
    let mut image = RgbaImage::from_pixel(out_w, out_h, background);
    let mut put = |cells: &[(i64, i64)], color: image::Rgba<u8>| {
        for &(x, y) in cells {
            let ix = x - min_x - trim.left as i64;
            let iy = y - min_y - trim.top as i64;
            if ix >= 0 && iy >= 0 && ix < out_w as i64 && iy < out_h as i64 {
                image.put_pixel(ix as u32, iy as u32, color);
            }
        }
    };

    put(&cells.floor, ctx.palette.get(ColorKey::MapInside).to_rgba());
    for (id, pixels) in &cells.segments {
        put(pixels, ctx.palette.room(*id, RoomColorIndex::HalfId).to_rgba());
    }
    if let Some(wall) = &cells.wall {
        put(wall, ctx.palette.get(ColorKey::MapWall).to_rgba());
    }

    let dimensions = ImageDimensions::trimmed(
        origin_x,
        origin_y,
        width,
        height,
        Projection::down(pixel_size),
        &trim,
    )
    .with_output(ctx.config.scale, ctx.config.rotation);
    Ok(MapImage::new(image, dimensions, area as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColorPalette, RenderConfig};
    use crate::core::ImagePoint;

    fn parse(json: &str) -> Result<MapSnapshot> {
        let palette = ColorPalette::new();
        let config = RenderConfig::default();
        ValetudoParser.parse(json.as_bytes(), &ParseContext::new(&palette, &config))
    }

    #[test]
    fn test_decompress_runs() {
        let mut budget = CellBudget::for_input(64);
        assert_eq!(
            decompress_pixels(&[10, 10, 3, 0, 1, 1], &mut budget).unwrap(),
            vec![(10, 10), (11, 10), (12, 10), (0, 1)]
        );
        assert_eq!(budget.remaining, 64 * CELLS_PER_INPUT_BYTE - 4);
        // Trailing partial run is ignored
        assert_eq!(decompress_pixels(&[1, 2], &mut budget).unwrap(), vec![]);
    }

    #[test]
    fn test_decompress_rejects_oversized_runs() {
        let mut budget = CellBudget::for_input(1 << 20);
        assert!(decompress_pixels(&[0, 0, MAX_GRID_SIDE + 1], &mut budget).is_err());
        assert!(decompress_pixels(&[i64::MAX - 1, 0, 5], &mut budget).is_err());

        // Runs within the side limit still draw from the per-input budget
        let mut small = CellBudget::for_input(1);
        let runs = [0, 0, 400, 0, 1, 400];
        assert!(matches!(
            decompress_pixels(&runs, &mut small),
            Err(Error::HeaderParse(_))
        ));
    }

    #[test]
    fn test_huge_run_count_is_error() {
        let json = r#"{"pixelSize":5,"entities":[],"layers":[{"type":"floor","compressedPixels":[0,0,1,300000,300000,1]}]}"#;
        assert!(matches!(parse(json), Err(Error::HeaderParse(_))));
    }

    #[test]
    fn test_huge_extent_is_error() {
        // Two single cells far apart describe a grid wider than any axis limit
        let json = r#"{"pixelSize":5,"entities":[],"layers":[{"type":"floor","compressedPixels":[0,0,1,4000000000,0,1]}]}"#;
        assert!(matches!(parse(json), Err(Error::HeaderParse(_))));

        let json = r#"{"pixelSize":5,"entities":[],"layers":[{"type":"floor","compressedPixels":[-9223372036854775807,0,1,9223372036854775807,0,1]}]}"#;
        assert!(matches!(parse(json), Err(Error::HeaderParse(_))));
    }

    #[test]
    fn test_grid_area_tied_to_input_size() {
        // 1000x1000 grid from a document of about a hundred bytes
        let json = r#"{"pixelSize":5,"entities":[],"layers":[{"type":"floor","compressedPixels":[0,0,1,999,999,1]}]}"#;
        assert!(matches!(parse(json), Err(Error::HeaderParse(_))));
    }

    #[test]
    fn test_segment_and_robot() {
        let json = r#"{
            "pixelSize": 5,
            "entities": [
                {"type": "robot_position", "points": [100, 100], "metaData": {"angle": 45}}
            ],
            "layers": [
                {"type": "segment", "compressedPixels": [10, 10, 5],
                 "metaData": {"segmentId": "3", "name": "Hall"}}
            ]
        }"#;
        let snapshot = parse(json).unwrap();

        assert_eq!(snapshot.rooms.len(), 1);
        let room = &snapshot.rooms[&3];
        assert_eq!((room.bbox.x0, room.bbox.x1), (10.0, 14.0));
        assert_eq!((room.bbox.y0, room.bbox.y1), (10.0, 10.0));
        assert_eq!(room.name.as_deref(), Some("Hall"));
        assert_eq!(room.label, Some(Point::new(60.0, 50.0)));

        let robot = snapshot.vacuum_position.unwrap();
        assert_eq!(robot.angle, Some(-45.0));

        assert!(!snapshot.image.is_empty());
        let dims = snapshot.image.dimensions;
        assert_eq!((dims.width, dims.height), (5, 1));
        // Cell (12, 10) is the middle of the image
        assert_eq!(dims.project(60.0, 50.0), ImagePoint::new(2.0, 0.0));
    }

    #[test]
    fn test_dimensions_take_precedence() {
        let json = r#"{
            "pixelSize": 5,
            "entities": [],
            "layers": [
                {"type": "segment", "compressedPixels": [0, 0, 2],
                 "dimensions": {"x": {"min": 0, "max": 1, "mid": 0, "avg": 0.5},
                                "y": {"min": 0, "max": 0, "mid": 0, "avg": 0}},
                 "metaData": {"segmentId": 16}}
            ]
        }"#;
        let room = &parse(json).unwrap().rooms[&16];
        assert_eq!(room.label, Some(Point::new(2.5, 0.0)));
        assert_eq!(room.name, None);
    }

    #[test]
    fn test_entities() {
        let json = r#"{
            "pixelSize": 5,
            "entities": [
                {"type": "charger_location", "points": [10, 20], "metaData": {"angle": 90}},
                {"type": "no_go_area", "points": [0, 0, 10, 0, 10, 10, 0, 10]},
                {"type": "no_mop_area", "points": [1, 1, 2, 1, 2, 2, 1, 2]},
                {"type": "virtual_wall", "points": [0, 0, 50, 50]},
                {"type": "path", "points": [0, 0, 5, 5, 10, 10]},
                {"type": "path", "points": [20, 20, 25, 25]}
            ],
            "layers": [
                {"type": "wall", "compressedPixels": [0, 0, 4]},
                {"type": "wall", "compressedPixels": [0, 5, 4]},
                {"type": "floor", "compressedPixels": [0, 1, 4]}
            ]
        }"#;
        let snapshot = parse(json).unwrap();
        assert_eq!(snapshot.charger.unwrap().angle, Some(0.0));
        assert_eq!(snapshot.no_go_areas.len(), 1);
        assert_eq!(snapshot.no_mopping_areas.len(), 1);
        assert_eq!(snapshot.walls, vec![Wall::new(0.0, 0.0, 50.0, 50.0)]);

        let path = snapshot.path.unwrap();
        assert_eq!(path.runs.len(), 2);
        assert_eq!(path.point_count(), 5);

        // Second wall layer is ignored, so the extent is rows 0..=1
        assert_eq!(snapshot.image.dimensions.height, 2);
    }

    #[test]
    fn test_bad_polygon_is_error() {
        let json = r#"{"pixelSize": 5, "entities": [{"type": "no_go_area", "points": [0, 0]}], "layers": []}"#;
        assert!(matches!(parse(json), Err(Error::HeaderParse(_))));
    }

    #[test]
    fn test_no_layers_gives_empty_image() {
        let snapshot = parse(r#"{"pixelSize": 5, "entities": [], "layers": []}"#).unwrap();
        assert!(snapshot.image.is_empty());
    }
}
