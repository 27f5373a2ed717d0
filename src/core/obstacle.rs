//! Obstacles detected by the robot.

use serde::{Deserialize, Serialize};

use super::point::Point;

/// Obstacle class names reported by camera-equipped models
const KNOWN_TYPES: [(u16, &str); 6] = [
    (0, "cable"),
    (2, "shoes"),
    (3, "poop"),
    (5, "extension cord"),
    (9, "weighting scale"),
    (10, "clothes"),
];

/// Human readable name of a vendor obstacle type
pub fn obstacle_description(kind: u16) -> Option<&'static str> {
    KNOWN_TYPES
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, name)| *name)
}

/// Single obstacle marker
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub position: Point,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Detection confidence (0..=10)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Name of the photo the robot took of the obstacle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

impl Obstacle {
    /// Obstacle with position only
    pub fn at(position: Point) -> Self {
        Self {
            position,
            kind: None,
            description: None,
            confidence: None,
            photo: None,
        }
    }

    /// Builder: set type and its known description
    pub fn with_kind(mut self, kind: u16) -> Self {
        self.kind = Some(kind);
        self.description = obstacle_description(kind).map(str::to_string);
        self
    }
}
