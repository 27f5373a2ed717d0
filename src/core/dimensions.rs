//! Map-space to image-space projection.
//!
//! Every vendor raster is a grid of pixels anchored somewhere in map space.
//! A map coordinate `(x, y)` lands on the output image as:
//!
//! ```text
//!   gx = x / unit_scale - left                 (grid column inside the crop)
//!   gy = y / unit_scale - top                  (grid row inside the crop)
//!
//!   px = gx * scale
//!   py = (height - gy - 1) * scale             (YAxis::Up, rows stored bottom-up)
//!   py = gy * scale                            (YAxis::Down)
//! ```
//!
//! `left`/`top` already include the trimmed border, and `width`/`height`
//! are the size of the cropped grid. Rotation is applied to the finished
//! image, never to individual primitives.

use serde::{Deserialize, Serialize};

use super::point::ImagePoint;
use crate::config::{Rotation, TrimConfig};

/// Smallest crop (in grid pixels) a trim is allowed to produce
pub const MIN_TRIMMED_SIZE: i32 = 20;

/// Direction of the vendor's map-space Y axis relative to raster rows
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YAxis {
    /// Map Y grows upward; raster row 0 is the bottom row
    #[default]
    Up,
    /// Map Y grows downward; raster row 0 is the top row
    Down,
}

/// Parser-supplied mapping between vendor units and grid pixels
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// Vendor units per grid pixel
    pub unit_scale: f32,
    pub y_axis: YAxis,
}

impl Projection {
    /// Projection with upward Y axis
    pub fn up(unit_scale: f32) -> Self {
        Self {
            unit_scale,
            y_axis: YAxis::Up,
        }
    }

    /// Projection with downward Y axis
    pub fn down(unit_scale: f32) -> Self {
        Self {
            unit_scale,
            y_axis: YAxis::Down,
        }
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::up(50.0)
    }
}

/// Trim amounts in whole grid pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrimPixels {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

impl TrimPixels {
    /// Convert trim percentages for a `width x height` raster.
    ///
    /// An axis whose trim would leave fewer than [`MIN_TRIMMED_SIZE`] pixels
    /// is reset to zero on both edges.
    pub fn resolve(trim: &TrimConfig, width: i32, height: i32) -> Self {
        let (mut left, mut right) = (trim.left, trim.right);
        let (mut top, mut bottom) = (trim.top, trim.bottom);

        let w = width as f32;
        if w - w * (left + right) / 100.0 < MIN_TRIMMED_SIZE as f32 {
            log::debug!("Horizontal trim too large for width {}, ignoring", width);
            left = 0.0;
            right = 0.0;
        }
        let h = height as f32;
        if h - h * (top + bottom) / 100.0 < MIN_TRIMMED_SIZE as f32 {
            log::debug!("Vertical trim too large for height {}, ignoring", height);
            top = 0.0;
            bottom = 0.0;
        }

        Self {
            left: (left * w / 100.0) as i32,
            right: (right * w / 100.0) as i32,
            top: (top * h / 100.0) as i32,
            bottom: (bottom * h / 100.0) as i32,
        }
    }
}

/// Crop, scale and rotation parameters of a decoded raster
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageDimensions {
    /// Map-space row of the first kept grid row (in grid pixels)
    pub top: i32,
    /// Map-space column of the first kept grid column (in grid pixels)
    pub left: i32,
    /// Kept rows
    pub height: i32,
    /// Kept columns
    pub width: i32,
    /// Output scale factor
    pub scale: f32,
    /// Whole-image rotation
    pub rotation: Rotation,
    pub projection: Projection,
}

impl ImageDimensions {
    /// Dimensions of an untrimmed raster
    pub fn new(left: i32, top: i32, width: i32, height: i32, projection: Projection) -> Self {
        Self {
            top,
            left,
            height,
            width,
            scale: 1.0,
            rotation: Rotation::None,
            projection,
        }
    }

    /// Apply trim to a raw raster anchored at `(left, top)`.
    ///
    /// For [`YAxis::Up`] rasters the bottom trim shifts the map-space
    /// origin, for [`YAxis::Down`] rasters the top trim does.
    pub fn trimmed(
        left: i32,
        top: i32,
        width: i32,
        height: i32,
        projection: Projection,
        trim: &TrimPixels,
    ) -> Self {
        let origin_shift = match projection.y_axis {
            YAxis::Up => trim.bottom,
            YAxis::Down => trim.top,
        };
        Self {
            top: top + origin_shift,
            left: left + trim.left,
            height: height - trim.top - trim.bottom,
            width: width - trim.left - trim.right,
            scale: 1.0,
            rotation: Rotation::None,
            projection,
        }
    }

    /// Builder: set output scale and rotation
    pub fn with_output(mut self, scale: f32, rotation: Rotation) -> Self {
        self.scale = scale;
        self.rotation = rotation;
        self
    }

    /// True when the crop has no pixels
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Scaled image size before rotation
    pub fn scaled_size(&self) -> (u32, u32) {
        (
            ((self.width as f32) * self.scale).max(1.0) as u32,
            ((self.height as f32) * self.scale).max(1.0) as u32,
        )
    }

    /// Grid position (column, row inside the crop, unflipped) of a map point
    #[inline]
    pub fn to_grid(&self, x: f32, y: f32) -> (f32, f32) {
        let unit = self.projection.unit_scale;
        (x / unit - self.left as f32, y / unit - self.top as f32)
    }

    /// Project a map coordinate into image pixels
    pub fn project(&self, x: f32, y: f32) -> ImagePoint {
        let (gx, gy) = self.to_grid(x, y);
        let row = match self.projection.y_axis {
            YAxis::Up => self.height as f32 - gy - 1.0,
            YAxis::Down => gy,
        };
        ImagePoint::new(gx * self.scale, row * self.scale)
    }

    /// Inverse of [`ImageDimensions::project`]
    pub fn unproject(&self, p: ImagePoint) -> (f32, f32) {
        let unit = self.projection.unit_scale;
        let gx = p.x / self.scale;
        let row = p.y / self.scale;
        let gy = match self.projection.y_axis {
            YAxis::Up => self.height as f32 - row - 1.0,
            YAxis::Down => row,
        };
        (
            (gx + self.left as f32) * unit,
            (gy + self.top as f32) * unit,
        )
    }

    /// Where an unrotated image point ends up after whole-image rotation
    pub fn rotate_point(&self, p: ImagePoint) -> ImagePoint {
        let (w, h) = self.scaled_size();
        let (w, h) = (w as f32, h as f32);
        match self.rotation {
            Rotation::None => p,
            Rotation::Ccw90 => ImagePoint::new(p.y, w - 1.0 - p.x),
            Rotation::Half => ImagePoint::new(w - 1.0 - p.x, h - 1.0 - p.y),
            Rotation::Ccw270 => ImagePoint::new(h - 1.0 - p.y, p.x),
        }
    }
}
