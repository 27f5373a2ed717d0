//! Geometric map elements: areas, walls, zones and paths.

use serde::{Deserialize, Serialize};

use super::dimensions::ImageDimensions;
use super::point::{ImagePoint, Point};

/// Quadrilateral of four map points (not necessarily axis aligned)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub points: [Point; 4],
}

impl Area {
    /// Area from four corners in winding order
    pub fn new(p0: Point, p1: Point, p2: Point, p3: Point) -> Self {
        Self {
            points: [p0, p1, p2, p3],
        }
    }

    /// Area from eight scalars `x0, y0, ..., x3, y3`
    pub fn from_coords(c: [f32; 8]) -> Self {
        Self::new(
            Point::new(c[0], c[1]),
            Point::new(c[2], c[3]),
            Point::new(c[4], c[5]),
            Point::new(c[6], c[7]),
        )
    }

    /// Project every corner, preserving winding order
    pub fn to_image(&self, dims: &ImageDimensions) -> [ImagePoint; 4] {
        self.points.map(|p| p.to_image(dims))
    }
}

/// Single line segment
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Wall {
    /// Create a new wall
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Project both ends
    pub fn to_image(&self, dims: &ImageDimensions) -> [ImagePoint; 2] {
        [dims.project(self.x0, self.y0), dims.project(self.x1, self.y1)]
    }
}

/// Axis-aligned rectangle
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Zone {
    /// Create a new zone from two opposite corners
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Same rectangle as a four-corner area
    pub fn as_area(&self) -> Area {
        Area::new(
            Point::new(self.x0, self.y0),
            Point::new(self.x0, self.y1),
            Point::new(self.x1, self.y1),
            Point::new(self.x1, self.y0),
        )
    }

    /// True when the rectangle has no extent on either axis
    pub fn is_degenerate(&self) -> bool {
        self.x0 == self.x1 || self.y0 == self.y1
    }
}

/// Ordered point runs, each drawn as an independent polyline
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Total point count as reported by the vendor, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_length: Option<u32>,
    /// Point size in bytes as reported by the vendor, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_size: Option<u32>,
    /// Heading at the end of the path, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<f32>,
    pub runs: Vec<Vec<Point>>,
}

impl Path {
    /// Path from a single run
    pub fn single(points: Vec<Point>) -> Self {
        Self {
            runs: vec![points],
            ..Default::default()
        }
    }

    /// Path from several runs
    pub fn from_runs(runs: Vec<Vec<Point>>) -> Self {
        Self {
            runs,
            ..Default::default()
        }
    }

    /// True when no run has any point
    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(|r| r.is_empty())
    }

    /// Total number of points across runs
    pub fn point_count(&self) -> usize {
        self.runs.iter().map(|r| r.len()).sum()
    }

    /// Project every run
    pub fn to_image(&self, dims: &ImageDimensions) -> Vec<Vec<ImagePoint>> {
        self.runs
            .iter()
            .map(|run| run.iter().map(|p| p.to_image(dims)).collect())
            .collect()
    }
}
