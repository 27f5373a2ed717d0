//! Single-pass raster classification.
//!
//! Scans a vendor raster once, painting every kept pixel into the base
//! image and growing the bounding box of each room it encounters:
//!
//! ```text
//!   raw rows (bottom-up or top-down)
//!        │
//!        ├── trim rows/columns skipped
//!        ├── dialect.classify(byte) ──► PixelClass
//!        │        ├── Room(id) ──► RoomAccumulator::add(id, col, row)
//!        │        └── Unknown  ──► unknown value set (logged once)
//!        └── palette colour ──► RgbaImage pixel
//! ```
//!
//! Room boxes are kept in grid coordinates (raw column, raw row counted
//! in the map's own Y direction); parsers convert them to map units with
//! [`grid_box_to_map`].

use std::collections::{BTreeMap, BTreeSet};

use image::{Rgba, RgbaImage};

use super::dialect::{PixelClass, PixelDialect};
use crate::config::{ColorKey, ColorPalette};
use crate::core::{BoundingBox, Room, TrimPixels, YAxis};
use crate::error::{Error, Result};

/// Order-independent room bounding box aggregation
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoomAccumulator {
    boxes: BTreeMap<u32, BoundingBox>,
}

impl RoomAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one room pixel
    #[inline]
    pub fn add(&mut self, id: u32, x: f32, y: f32) {
        self.boxes
            .entry(id)
            .and_modify(|b| b.include(x, y))
            .or_insert_with(|| BoundingBox::point(x, y));
    }

    /// Fold another accumulator into this one
    pub fn merge(&mut self, other: &RoomAccumulator) {
        for (id, b) in &other.boxes {
            self.boxes
                .entry(*id)
                .and_modify(|mine| *mine = mine.union(b))
                .or_insert(*b);
        }
    }

    /// Box of one room
    pub fn get(&self, id: u32) -> Option<&BoundingBox> {
        self.boxes.get(&id)
    }

    /// Number of distinct rooms seen
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// True when no room pixel was recorded
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Boxes keyed by room id
    pub fn boxes(&self) -> &BTreeMap<u32, BoundingBox> {
        &self.boxes
    }

    /// Build rooms, converting each box with `convert`
    pub fn to_rooms(&self, convert: impl Fn(&BoundingBox) -> BoundingBox) -> BTreeMap<u32, Room> {
        self.boxes
            .iter()
            .map(|(id, b)| (*id, Room::new(*id, convert(b))))
            .collect()
    }
}

/// Convert a grid-space box anchored at `(left, top)` into map units
pub fn grid_box_to_map(b: &BoundingBox, left: i32, top: i32, unit_scale: f32) -> BoundingBox {
    BoundingBox {
        x0: (b.x0 + left as f32) * unit_scale,
        y0: (b.y0 + top as f32) * unit_scale,
        x1: (b.x1 + left as f32) * unit_scale,
        y1: (b.y1 + top as f32) * unit_scale,
    }
}

/// Shape of a raw raster buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RasterLayout {
    pub width: u32,
    pub height: u32,
    /// `Up` when the first stored row is the bottom of the map
    pub y_axis: YAxis,
}

impl RasterLayout {
    /// Number of bytes the raster occupies
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// True for a zero-sized raster
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of a raster scan
#[derive(Clone, Debug)]
pub struct RasterScan {
    /// Painted, trimmed base image
    pub image: RgbaImage,
    pub rooms: RoomAccumulator,
    /// Raw values no range recognised
    pub unknown: BTreeSet<u8>,
}

/// Colour of a classified pixel
#[inline]
pub fn class_color<D: PixelDialect + ?Sized>(
    class: PixelClass,
    dialect: &D,
    palette: &ColorPalette,
) -> Rgba<u8> {
    match class {
        PixelClass::Room(id) => palette.room(id, dialect.room_color_index()).to_rgba(),
        other => palette
            .get(other.color_key().unwrap_or(ColorKey::Unknown))
            .to_rgba(),
    }
}

/// Classify and paint a raw raster.
///
/// Fails with a buffer underrun when `pixels` is shorter than the layout.
pub fn scan_raster<D: PixelDialect + ?Sized>(
    pixels: &[u8],
    layout: RasterLayout,
    trim: &TrimPixels,
    dialect: &D,
    palette: &ColorPalette,
) -> Result<RasterScan> {
    if pixels.len() < layout.len() {
        return Err(Error::BufferUnderrun {
            section: "image".to_string(),
            field: "pixels".to_string(),
            offset: pixels.len(),
            needed: layout.len(),
            remaining: pixels.len(),
        });
    }

    let width = layout.width as i32;
    let height = layout.height as i32;
    let out_w = (width - trim.left - trim.right).max(0);
    let out_h = (height - trim.top - trim.bottom).max(0);
    let mut image = RgbaImage::new(out_w as u32, out_h as u32);
    let mut rooms = RoomAccumulator::new();
    let mut unknown = BTreeSet::new();

    // Raw rows kept after trimming, in storage order
    let (first_row, skip_end) = match layout.y_axis {
        YAxis::Up => (trim.bottom, trim.top),
        YAxis::Down => (trim.top, trim.bottom),
    };

    for row in first_row..(height - skip_end) {
        let img_y = match layout.y_axis {
            YAxis::Up => out_h - 1 - (row - first_row),
            YAxis::Down => row - first_row,
        };
        let row_start = (row * width) as usize;
        for col in trim.left..(width - trim.right) {
            let raw = pixels[row_start + col as usize];
            let class = dialect.classify(raw);
            match class {
                PixelClass::Room(id) => rooms.add(id, col as f32, row as f32),
                PixelClass::Unknown => {
                    unknown.insert(raw);
                }
                _ => {}
            }
            image.put_pixel(
                (col - trim.left) as u32,
                img_y as u32,
                class_color(class, dialect, palette),
            );
        }
    }

    if !unknown.is_empty() {
        log::warn!("Unknown pixel types: {:?}", unknown);
    }
    log::debug!(
        "Scanned {}x{} raster: {} rooms",
        layout.width,
        layout.height,
        rooms.len()
    );

    Ok(RasterScan {
        image,
        rooms,
        unknown,
    })
}

/// Room id of the raw pixel at grid position `(x, y)`, if any
pub fn room_at<D: PixelDialect + ?Sized>(
    pixels: &[u8],
    layout: RasterLayout,
    x: i64,
    y: i64,
    dialect: &D,
) -> Option<u32> {
    if x < 0 || y < 0 || x >= layout.width as i64 || y >= layout.height as i64 {
        return None;
    }
    let index = (y * layout.width as i64 + x) as usize;
    match dialect.classify(*pixels.get(index)?) {
        PixelClass::Room(id) => Some(id),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Color, RoomColorIndex};
    use crate::raster::dialect::RoborockPixels;

    const ROOM_16: u8 = (16 << 3) | 7;
    const ROOM_17: u8 = (17 << 3) | 7;

    fn layout(w: u32, h: u32, y_axis: YAxis) -> RasterLayout {
        RasterLayout {
            width: w,
            height: h,
            y_axis,
        }
    }

    #[test]
    fn test_bottom_up_rows_are_flipped() {
        // Row 0 (bottom) is wall, row 1 (top) is inside
        let pixels = [1, 1, 255, 255];
        let palette = ColorPalette::new();
        let scan = scan_raster(
            &pixels,
            layout(2, 2, YAxis::Up),
            &TrimPixels::default(),
            &RoborockPixels,
            &palette,
        )
        .unwrap();

        let wall = palette.get(ColorKey::MapWall).to_rgba();
        let inside = palette.get(ColorKey::MapInside).to_rgba();
        assert_eq!(*scan.image.get_pixel(0, 1), wall);
        assert_eq!(*scan.image.get_pixel(0, 0), inside);
    }

    #[test]
    fn test_room_boxes_in_grid_coordinates() {
        #[rustfmt::skip]
        let pixels = [
            0, ROOM_16, ROOM_16, 0,
            0, ROOM_16, ROOM_17, 0,
            0, 0,       ROOM_17, 0,
        ];
        let palette = ColorPalette::new();
        let scan = scan_raster(
            &pixels,
            layout(4, 3, YAxis::Up),
            &TrimPixels::default(),
            &RoborockPixels,
            &palette,
        )
        .unwrap();

        assert_eq!(scan.rooms.len(), 2);
        let b16 = scan.rooms.get(16).unwrap();
        assert_eq!((b16.x0, b16.y0, b16.x1, b16.y1), (1.0, 0.0, 2.0, 1.0));
        let b17 = scan.rooms.get(17).unwrap();
        assert_eq!((b17.x0, b17.y0, b17.x1, b17.y1), (2.0, 1.0, 2.0, 2.0));

        // Room 16 pixel at grid (1, 0) lands on the bottom image row
        let expected = palette.room(16, RoomColorIndex::HalfId).to_rgba();
        assert_eq!(*scan.image.get_pixel(1, 2), expected);
    }

    #[test]
    fn test_trim_skips_border() {
        let mut pixels = vec![0u8; 30 * 30];
        // A wall pixel in the trimmed left border
        pixels[15 * 30] = 1;
        let palette = ColorPalette::new().with_color(ColorKey::MapOutside, Color::rgb(9, 9, 9));
        let trim = TrimPixels {
            left: 3,
            right: 0,
            top: 0,
            bottom: 0,
        };
        let scan = scan_raster(&pixels, layout(30, 30, YAxis::Up), &trim, &RoborockPixels, &palette)
            .unwrap();
        assert_eq!(scan.image.dimensions(), (27, 30));
        assert!(scan.image.pixels().all(|p| *p == Rgba([9, 9, 9, 255])));
    }

    #[test]
    fn test_unknown_values_collected() {
        let pixels = [0x0A, 0x0A, 0x0B, 0];
        let scan = scan_raster(
            &pixels,
            layout(2, 2, YAxis::Down),
            &TrimPixels::default(),
            &RoborockPixels,
            &ColorPalette::new(),
        )
        .unwrap();
        let unknown: Vec<u8> = scan.unknown.into_iter().collect();
        assert_eq!(unknown, vec![0x0A, 0x0B]);
    }

    #[test]
    fn test_short_buffer_is_error() {
        let result = scan_raster(
            &[0u8; 3],
            layout(2, 2, YAxis::Up),
            &TrimPixels::default(),
            &RoborockPixels,
            &ColorPalette::new(),
        );
        assert!(matches!(result, Err(Error::BufferUnderrun { .. })));
    }

    #[test]
    fn test_room_at() {
        let pixels = [0, ROOM_17, 0, 0];
        let l = layout(2, 2, YAxis::Up);
        assert_eq!(room_at(&pixels, l, 1, 0, &RoborockPixels), Some(17));
        assert_eq!(room_at(&pixels, l, 0, 0, &RoborockPixels), None);
        assert_eq!(room_at(&pixels, l, 5, 0, &RoborockPixels), None);
        assert_eq!(room_at(&pixels, l, -1, 0, &RoborockPixels), None);
    }

    #[test]
    fn test_grid_box_to_map() {
        let b = BoundingBox {
            x0: 1.0,
            y0: 2.0,
            x1: 3.0,
            y1: 4.0,
        };
        let m = grid_box_to_map(&b, 10, 20, 50.0);
        assert_eq!((m.x0, m.y0, m.x1, m.y1), (550.0, 1100.0, 650.0, 1200.0));
    }
}
