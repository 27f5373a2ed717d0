//! Normalized decode result.
//!
//! ```text
//!   raw bytes ──► parser ──► MapSnapshot ──► MapRenderer ──► RenderedMap
//!                            ├─ image: MapImage (base raster + dimensions)
//!                            ├─ poses: charger, vacuum_position, goto_target
//!                            ├─ paths: path, goto_path, predicted_path
//!                            ├─ areas: no_go, no_mopping, zones, walls
//!                            ├─ obstacles (4 variants)
//!                            └─ rooms: BTreeMap<id, Room>
//! ```
//!
//! A snapshot whose image is empty only carries a message; everything else
//! is left at its default and must not be drawn.

use std::collections::{BTreeMap, BTreeSet};

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use super::dimensions::{ImageDimensions, Projection};
use super::obstacle::Obstacle;
use super::point::{ImagePoint, Point};
use super::room::Room;
use super::shapes::{Area, Path, Wall, Zone};

/// Placeholder size used when there is nothing to draw
pub const EMPTY_MAP_SIZE: (u32, u32) = (300, 200);

/// Map-space reference points used for calibration
pub const CALIBRATION_POINTS: [(f32, f32); 3] =
    [(25500.0, 25500.0), (26500.0, 25500.0), (26500.0, 26500.0)];

/// Decoded base raster with its projection
#[derive(Clone, Debug)]
pub struct MapImage {
    pub dimensions: ImageDimensions,
    /// Unscaled, unrotated base raster; `None` for an empty map
    pub raster: Option<RgbaImage>,
    /// Size of the raw raster payload in bytes
    pub size: usize,
    /// Status text shown on the empty-map placeholder
    pub message: Option<String>,
}

impl MapImage {
    /// Base raster with its dimensions
    pub fn new(raster: RgbaImage, dimensions: ImageDimensions, size: usize) -> Self {
        Self {
            dimensions,
            raster: Some(raster),
            size,
            message: None,
        }
    }

    /// Empty placeholder carrying a status message
    pub fn empty(message: impl Into<String>) -> Self {
        let (w, h) = EMPTY_MAP_SIZE;
        Self {
            dimensions: ImageDimensions::new(0, 0, w as i32, h as i32, Projection::default()),
            raster: None,
            size: 0,
            message: Some(message.into()),
        }
    }

    /// True when there is no base raster to draw on
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raster.is_none()
    }
}

impl Default for MapImage {
    fn default() -> Self {
        Self::empty("NO MAP")
    }
}

/// Pair of map-space and image-space coordinates
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub vacuum: Point,
    pub map: ImagePoint,
}

/// Vendor header fields carried for diagnostics
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MapHeader {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_version: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minor_version: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_sequence: Option<u32>,
    /// Digest block seen
    pub is_valid: bool,
}

/// Vendor-agnostic decode result
#[derive(Clone, Debug, Default)]
pub struct MapSnapshot {
    pub image: MapImage,
    pub header: MapHeader,
    pub charger: Option<Point>,
    pub vacuum_position: Option<Point>,
    pub goto_target: Option<Point>,
    pub path: Option<Path>,
    pub goto_path: Option<Path>,
    pub predicted_path: Option<Path>,
    pub no_go_areas: Vec<Area>,
    pub no_mopping_areas: Vec<Area>,
    pub walls: Vec<Wall>,
    pub zones: Vec<Zone>,
    pub obstacles: Vec<Obstacle>,
    pub ignored_obstacles: Vec<Obstacle>,
    pub obstacles_with_photo: Vec<Obstacle>,
    pub ignored_obstacles_with_photo: Vec<Obstacle>,
    /// Raw block list bytes (Roborock)
    pub blocks: Vec<u8>,
    pub rooms: BTreeMap<u32, Room>,
    pub vacuum_room: Option<u32>,
    /// Segments currently being cleaned
    pub cleaned_rooms: BTreeSet<u32>,
    pub map_name: Option<String>,
}

impl MapSnapshot {
    /// Snapshot with an empty image and a status message
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            image: MapImage::empty(message),
            ..Default::default()
        }
    }

    /// Name of the room the vacuum is in
    pub fn vacuum_room_name(&self) -> Option<&str> {
        let id = self.vacuum_room?;
        self.rooms.get(&id)?.name.as_deref()
    }

    /// Reference points paired with their position on the rendered image
    pub fn calibration(&self) -> Vec<CalibrationPoint> {
        let dims = &self.image.dimensions;
        CALIBRATION_POINTS
            .iter()
            .map(|&(x, y)| {
                let img = dims.rotate_point(dims.project(x, y));
                CalibrationPoint {
                    vacuum: Point::new(x, y),
                    map: ImagePoint::new(img.x.trunc(), img.y.trunc()),
                }
            })
            .collect()
    }
}
