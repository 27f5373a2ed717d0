//! Drawable selection, size table and user text overlays.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::color::Color;
use super::defaults;

/// Overlay categories that can be toggled independently
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Drawable {
    /// Shorthand for every other variant
    All,
    Charger,
    Path,
    GotoPath,
    PredictedPath,
    NoGoZones,
    NoMoppingZones,
    VirtualWalls,
    Zones,
    Obstacles,
    IgnoredObstacles,
    ObstaclesWithPhoto,
    IgnoredObstaclesWithPhoto,
    VacuumPosition,
    RoomNames,
}

impl Drawable {
    /// Every concrete drawable
    pub const CONCRETE: [Drawable; 14] = [
        Drawable::Charger,
        Drawable::Path,
        Drawable::GotoPath,
        Drawable::PredictedPath,
        Drawable::NoGoZones,
        Drawable::NoMoppingZones,
        Drawable::VirtualWalls,
        Drawable::Zones,
        Drawable::Obstacles,
        Drawable::IgnoredObstacles,
        Drawable::ObstaclesWithPhoto,
        Drawable::IgnoredObstaclesWithPhoto,
        Drawable::VacuumPosition,
        Drawable::RoomNames,
    ];
}

/// Resolved drawable selection with `All` expanded
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DrawableSet(BTreeSet<Drawable>);

impl DrawableSet {
    /// Every concrete drawable enabled
    pub fn all() -> Self {
        Self(Drawable::CONCRETE.iter().copied().collect())
    }

    /// Nothing enabled
    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    /// Expand a configured list
    pub fn from_list(list: &[Drawable]) -> Self {
        if list.contains(&Drawable::All) {
            return Self::all();
        }
        Self(list.iter().copied().collect())
    }

    /// Check whether a drawable is enabled
    #[inline]
    pub fn contains(&self, drawable: Drawable) -> bool {
        self.0.contains(&drawable)
    }

    /// Enable a drawable
    pub fn insert(&mut self, drawable: Drawable) {
        if drawable == Drawable::All {
            *self = Self::all();
        } else {
            self.0.insert(drawable);
        }
    }

    /// Enabled drawables in a stable order
    pub fn iter(&self) -> impl Iterator<Item = Drawable> + '_ {
        self.0.iter().copied()
    }
}

/// Primitive sizes in image pixels (before output scaling)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sizes {
    #[serde(default = "defaults::charger_radius")]
    pub charger_radius: f32,

    #[serde(default = "defaults::vacuum_radius")]
    pub vacuum_radius: f32,

    #[serde(default = "defaults::path_width")]
    pub path_width: f32,

    #[serde(default = "defaults::obstacle_radius")]
    pub obstacle_radius: f32,

    #[serde(default = "defaults::obstacle_radius")]
    pub ignored_obstacle_radius: f32,

    #[serde(default = "defaults::obstacle_radius")]
    pub obstacle_with_photo_radius: f32,

    #[serde(default = "defaults::obstacle_radius")]
    pub ignored_obstacle_with_photo_radius: f32,

    #[serde(default = "defaults::virtual_wall_width")]
    pub virtual_wall_width: f32,
}

impl Default for Sizes {
    fn default() -> Self {
        Self {
            charger_radius: defaults::charger_radius(),
            vacuum_radius: defaults::vacuum_radius(),
            path_width: defaults::path_width(),
            obstacle_radius: defaults::obstacle_radius(),
            ignored_obstacle_radius: defaults::obstacle_radius(),
            obstacle_with_photo_radius: defaults::obstacle_radius(),
            ignored_obstacle_with_photo_radius: defaults::obstacle_radius(),
            virtual_wall_width: defaults::virtual_wall_width(),
        }
    }
}

/// User text drawn on top of the map.
///
/// `x`/`y` are percentages of the final image width/height.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextOverlay {
    pub text: String,

    #[serde(default)]
    pub x: f32,

    #[serde(default)]
    pub y: f32,

    #[serde(default = "defaults::text_color")]
    pub color: Color,

    /// Integer glyph magnification
    #[serde(default = "defaults::font_size")]
    pub font_size: u32,
}

impl TextOverlay {
    /// Text at a position given in percent of the image size
    pub fn new(text: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            color: defaults::text_color(),
            font_size: defaults::font_size(),
        }
    }
}
