//! Map-space and image-space points.

use serde::{Deserialize, Serialize};

use super::dimensions::ImageDimensions;

/// Map-space coordinate in vendor units (usually millimetres).
///
/// `angle` is in degrees and only set for poses (robot, charger).
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "a")]
    pub angle: Option<f32>,
}

impl Point {
    /// Create a point without heading
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, angle: None }
    }

    /// Create a pose
    #[inline]
    pub fn with_angle(x: f32, y: f32, angle: f32) -> Self {
        Self {
            x,
            y,
            angle: Some(angle),
        }
    }

    /// Project into pixel space of the (scaled, unrotated) image
    #[inline]
    pub fn to_image(&self, dims: &ImageDimensions) -> ImagePoint {
        dims.project(self.x, self.y)
    }

    /// Heading in degrees, 0 when unknown
    #[inline]
    pub fn angle_or_zero(&self) -> f32 {
        self.angle.unwrap_or(0.0)
    }
}

/// Pixel-space coordinate (x right, y down)
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct ImagePoint {
    pub x: f32,
    pub y: f32,
}

impl ImagePoint {
    /// Create a new image point
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    #[inline]
    pub fn distance(&self, other: &ImagePoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Point at `distance` along `angle_deg` (image convention, y down)
    #[inline]
    pub fn offset_polar(&self, angle_deg: f32, distance: f32) -> ImagePoint {
        let a = angle_deg.to_radians();
        ImagePoint::new(self.x + distance * a.cos(), self.y + distance * a.sin())
    }
}
