//! Rooms (segments) and their bounding boxes.

use serde::{Deserialize, Serialize};

use super::point::Point;

/// Inclusive axis-aligned bounding box
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    /// Box covering a single point
    #[inline]
    pub fn point(x: f32, y: f32) -> Self {
        Self {
            x0: x,
            y0: y,
            x1: x,
            y1: y,
        }
    }

    /// Grow to include a point
    #[inline]
    pub fn include(&mut self, x: f32, y: f32) {
        self.x0 = self.x0.min(x);
        self.y0 = self.y0.min(y);
        self.x1 = self.x1.max(x);
        self.y1 = self.y1.max(y);
    }

    /// Smallest box containing both
    #[inline]
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Centre of the box
    pub fn center(&self) -> Point {
        Point::new((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// Check whether a point lies inside (inclusive)
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }
}

/// Room or segment of the map
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: u32,
    #[serde(flatten)]
    pub bbox: BoundingBox,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Where the room name is drawn
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<Point>,
}

impl Room {
    /// Create a room with no name
    pub fn new(id: u32, bbox: BoundingBox) -> Self {
        Self {
            id,
            bbox,
            name: None,
            label: None,
        }
    }

    /// Builder: set name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder: set label position
    pub fn with_label(mut self, label: Point) -> Self {
        self.label = Some(label);
        self
    }

    /// Label position, falling back to the box centre
    pub fn label_point(&self) -> Point {
        self.label.unwrap_or_else(|| self.bbox.center())
    }
}
