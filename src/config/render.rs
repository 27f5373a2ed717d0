//! Render configuration: scale, rotation, trim and overlay selection.

use serde::{Deserialize, Serialize};

use super::defaults;
use super::drawable::{DrawableSet, Sizes, TextOverlay};
use super::error::ConfigLoadError;

/// Whole-image rotation applied after drawing, counter-clockwise
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    None,
    Ccw90,
    Half,
    Ccw270,
}

impl Rotation {
    /// Rotation in degrees
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Ccw90 => 90,
            Rotation::Half => 180,
            Rotation::Ccw270 => 270,
        }
    }

    /// True for 90 and 270, which swap width and height
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Ccw90 | Rotation::Ccw270)
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::None),
            90 => Ok(Rotation::Ccw90),
            180 => Ok(Rotation::Half),
            270 => Ok(Rotation::Ccw270),
            other => Err(format!("rotation must be 0, 90, 180 or 270, got {}", other)),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(r: Rotation) -> Self {
        r.degrees()
    }
}

/// Percentage of each image edge to crop
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrimConfig {
    #[serde(default)]
    pub left: f32,
    #[serde(default)]
    pub right: f32,
    #[serde(default)]
    pub top: f32,
    #[serde(default)]
    pub bottom: f32,
}

impl TrimConfig {
    /// Check ranges and per-axis sums
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        for (name, v) in [
            ("left", self.left),
            ("right", self.right),
            ("top", self.top),
            ("bottom", self.bottom),
        ] {
            if !(0.0..=100.0).contains(&v) {
                return Err(ConfigLoadError::Invalid(format!(
                    "trim.{} must be within 0..=100, got {}",
                    name, v
                )));
            }
        }
        if self.left + self.right >= 100.0 {
            return Err(ConfigLoadError::Invalid(
                "trim.left + trim.right must be below 100".to_string(),
            ));
        }
        if self.top + self.bottom >= 100.0 {
            return Err(ConfigLoadError::Invalid(
                "trim.top + trim.bottom must be below 100".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything the decode/render pipeline needs besides colours
#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    /// Output scale factor (> 0)
    pub scale: f32,
    pub rotation: Rotation,
    pub trim: TrimConfig,
    pub drawables: DrawableSet,
    pub sizes: Sizes,
    pub texts: Vec<TextOverlay>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scale: defaults::scale(),
            rotation: Rotation::None,
            trim: TrimConfig::default(),
            drawables: DrawableSet::all(),
            sizes: Sizes::default(),
            texts: Vec::new(),
        }
    }
}

impl RenderConfig {
    /// Check scale and trim
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(ConfigLoadError::Invalid(format!(
                "scale must be positive, got {}",
                self.scale
            )));
        }
        self.trim.validate()
    }

    /// Builder: set scale
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Builder: set rotation
    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Builder: set trim
    pub fn with_trim(mut self, trim: TrimConfig) -> Self {
        self.trim = trim;
        self
    }

    /// Builder: set drawables
    pub fn with_drawables(mut self, drawables: DrawableSet) -> Self {
        self.drawables = drawables;
        self
    }

    /// Builder: add a text overlay
    pub fn with_text(mut self, text: TextOverlay) -> Self {
        self.texts.push(text);
        self
    }
}
