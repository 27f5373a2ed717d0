//! Colour palette.
//!
//! Every drawable pulls its colour from a [`ColorPalette`]. Unset keys fall
//! back to built-in defaults; room colours fall back to a fixed rotation of
//! sixteen colours.
//!
//! ```toml
//! [colors]
//! map_inside = [32, 115, 185]
//! no_go_zones = [255, 33, 55, 127]   # fourth component is alpha
//!
//! [room_colors]
//! 16 = [240, 178, 122]
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// RGBA colour.
///
/// Serialized as `[r, g, b]` or `[r, g, b, a]`. An RGB value is opaque.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Opaque colour
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Colour with explicit alpha
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// True when blending is needed to draw this colour
    #[inline]
    pub fn is_translucent(&self) -> bool {
        self.a < 255
    }

    /// Sum of the RGB channels, used to pick contrasting text
    pub fn brightness(&self) -> u32 {
        self.r as u32 + self.g as u32 + self.b as u32
    }

    /// Same colour with the RGB channels scaled by `factor`
    pub fn darken(&self, factor: f32) -> Self {
        let f = factor.clamp(0.0, 1.0);
        Self {
            r: (self.r as f32 * f) as u8,
            g: (self.g as f32 * f) as u8,
            b: (self.b as f32 * f) as u8,
            a: self.a,
        }
    }

    /// Convert to an `image` pixel
    #[inline]
    pub fn to_rgba(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, self.a])
    }
}

impl TryFrom<Vec<u8>> for Color {
    type Error = String;

    fn try_from(v: Vec<u8>) -> Result<Self, Self::Error> {
        match v.as_slice() {
            [r, g, b] => Ok(Color::rgb(*r, *g, *b)),
            [r, g, b, a] => Ok(Color::rgba(*r, *g, *b, *a)),
            other => Err(format!(
                "colour must have 3 or 4 components, got {}",
                other.len()
            )),
        }
    }
}

impl From<Color> for Vec<u8> {
    fn from(c: Color) -> Self {
        if c.a == 255 {
            vec![c.r, c.g, c.b]
        } else {
            vec![c.r, c.g, c.b, c.a]
        }
    }
}

/// Semantic colour slots
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorKey {
    MapInside,
    MapOutside,
    MapWall,
    MapWallV2,
    GreyWall,
    Scan,
    NewDiscoveredArea,
    Unknown,
    Path,
    GotoPath,
    PredictedPath,
    Zones,
    ZonesOutline,
    VirtualWalls,
    NoGoZones,
    NoGoZonesOutline,
    NoMopZones,
    NoMopZonesOutline,
    Charger,
    ChargerOutline,
    Robo,
    RoboOutline,
    RoomNames,
    Obstacle,
    IgnoredObstacle,
    ObstacleWithPhoto,
    IgnoredObstacleWithPhoto,
}

impl ColorKey {
    /// Built-in colour for this slot
    pub fn default_color(self) -> Color {
        match self {
            ColorKey::MapInside => Color::rgb(32, 115, 185),
            ColorKey::MapOutside => Color::rgb(19, 87, 148),
            ColorKey::MapWall => Color::rgb(100, 196, 254),
            ColorKey::MapWallV2 => Color::rgb(93, 109, 126),
            ColorKey::GreyWall => Color::rgb(93, 109, 126),
            ColorKey::Scan => Color::rgb(0xDF, 0xDF, 0xDF),
            ColorKey::NewDiscoveredArea => Color::rgb(64, 64, 64),
            ColorKey::Unknown => Color::rgb(0, 0, 0),
            ColorKey::Path => Color::rgb(147, 194, 238),
            ColorKey::GotoPath => Color::rgb(0, 255, 0),
            ColorKey::PredictedPath => Color::rgb(255, 255, 0),
            ColorKey::Zones => Color::rgba(0xAD, 0xD8, 0xFF, 0x8F),
            ColorKey::ZonesOutline => Color::rgb(0xAD, 0xD8, 0xFF),
            ColorKey::VirtualWalls => Color::rgb(255, 0, 0),
            ColorKey::NoGoZones => Color::rgba(255, 33, 55, 127),
            ColorKey::NoGoZonesOutline => Color::rgb(255, 0, 0),
            ColorKey::NoMopZones => Color::rgba(163, 130, 211, 127),
            ColorKey::NoMopZonesOutline => Color::rgb(163, 130, 211),
            ColorKey::Charger => Color::rgba(0x66, 0xFE, 0xDA, 0x7F),
            ColorKey::ChargerOutline => Color::rgb(0, 0, 0),
            ColorKey::Robo => Color::rgb(255, 255, 255),
            ColorKey::RoboOutline => Color::rgb(0, 0, 0),
            ColorKey::RoomNames => Color::rgb(0, 0, 0),
            ColorKey::Obstacle
            | ColorKey::IgnoredObstacle
            | ColorKey::ObstacleWithPhoto
            | ColorKey::IgnoredObstacleWithPhoto => Color::rgba(0, 0, 0, 128),
        }
    }
}

/// Default room colour rotation
pub const ROOM_COLORS: [Color; 16] = [
    Color::rgb(240, 178, 122),
    Color::rgb(133, 193, 233),
    Color::rgb(217, 136, 128),
    Color::rgb(52, 152, 219),
    Color::rgb(205, 97, 85),
    Color::rgb(243, 156, 18),
    Color::rgb(88, 214, 141),
    Color::rgb(245, 176, 65),
    Color::rgb(252, 212, 81),
    Color::rgb(72, 201, 176),
    Color::rgb(84, 153, 199),
    Color::rgb(133, 193, 233),
    Color::rgb(245, 176, 65),
    Color::rgb(82, 190, 128),
    Color::rgb(72, 201, 176),
    Color::rgb(165, 105, 189),
];

/// How a room id picks its default colour from [`ROOM_COLORS`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoomColorIndex {
    /// `id >> 1`, for dialects whose ids start at 16
    HalfId,
    /// `id % 16`, for wider id spaces
    Modulo16,
}

impl RoomColorIndex {
    /// Index into [`ROOM_COLORS`]
    pub fn index(self, room_id: u32) -> usize {
        match self {
            RoomColorIndex::HalfId => (room_id >> 1) as usize % ROOM_COLORS.len(),
            RoomColorIndex::Modulo16 => room_id as usize % ROOM_COLORS.len(),
        }
    }
}

/// Resolved colour palette.
///
/// Immutable once built; passed by reference into every decode and render
/// call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorPalette {
    /// Overrides for semantic slots
    #[serde(default)]
    pub colors: BTreeMap<ColorKey, Color>,

    /// Overrides for individual room ids
    #[serde(default)]
    pub room_colors: BTreeMap<u32, Color>,
}

impl ColorPalette {
    /// Palette with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: override a semantic colour
    pub fn with_color(mut self, key: ColorKey, color: Color) -> Self {
        self.colors.insert(key, color);
        self
    }

    /// Builder: override a room colour
    pub fn with_room_color(mut self, room_id: u32, color: Color) -> Self {
        self.room_colors.insert(room_id, color);
        self
    }

    /// Colour for a semantic slot
    pub fn get(&self, key: ColorKey) -> Color {
        self.colors
            .get(&key)
            .copied()
            .unwrap_or_else(|| key.default_color())
    }

    /// Colour for a room id
    pub fn room(&self, room_id: u32, index: RoomColorIndex) -> Color {
        self.room_colors
            .get(&room_id)
            .copied()
            .unwrap_or(ROOM_COLORS[index.index(room_id)])
    }
}
