//! Vendor pixel dialects.
//!
//! Each raster format packs terrain class and room id into one byte
//! differently:
//!
//! ```text
//! Roborock   0=outside 1=wall 255=inside 7=scan
//!            else low 3 bits: 0=grey wall 1=wall v2 7=room (id = px >> 3)
//! Viomi      0=outside 255=grey wall 1=scan 10..=59 room 60..=109 selected room
//! Dreame     id = px >> 2, 0 < id < 62 room, else low 2 bits: 0=none 1=floor 2=wall
//! Dreame RIS bit 7 = wall, low 7 bits = segment id
//! Roidmi     127=outside 255=wall 0=inside, listed area ids are rooms
//! ```
//!
//! Room id banding is table driven ([`RoomIdBands`]) so firmware variants
//! only need a new table, not a new classifier.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use crate::config::{ColorKey, RoomColorIndex};

/// Semantic class of a raster pixel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelClass {
    Outside,
    Inside,
    Wall,
    WallV2,
    GreyWall,
    Scan,
    /// Room with its canonical id
    Room(u32),
    /// Value outside every known range
    Unknown,
}

impl PixelClass {
    /// Palette slot for non-room classes
    pub fn color_key(self) -> Option<ColorKey> {
        match self {
            PixelClass::Outside => Some(ColorKey::MapOutside),
            PixelClass::Inside => Some(ColorKey::MapInside),
            PixelClass::Wall => Some(ColorKey::MapWall),
            PixelClass::WallV2 => Some(ColorKey::MapWallV2),
            PixelClass::GreyWall => Some(ColorKey::GreyWall),
            PixelClass::Scan => Some(ColorKey::Scan),
            PixelClass::Unknown => Some(ColorKey::Unknown),
            PixelClass::Room(_) => None,
        }
    }
}

/// Room id ranges of one firmware family.
///
/// Pixels in `selected` belong to a highlighted room and map back into
/// `room` by subtracting `selected.start() - room.start()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomIdBands {
    pub room: RangeInclusive<u32>,
    pub selected: Option<RangeInclusive<u32>>,
}

impl RoomIdBands {
    /// Canonical room id for a raw value, if it is one
    pub fn canonical(&self, raw: u32) -> Option<u32> {
        if self.room.contains(&raw) {
            return Some(raw);
        }
        match &self.selected {
            Some(sel) if sel.contains(&raw) => Some(raw - sel.start() + self.room.start()),
            _ => None,
        }
    }
}

/// Viomi room bands: 10..=59, selected 60..=109
pub fn viomi_bands() -> RoomIdBands {
    RoomIdBands {
        room: 10..=59,
        selected: Some(60..=109),
    }
}

/// Interpretation of raw raster bytes
pub trait PixelDialect {
    /// Classify one raw pixel
    fn classify(&self, raw: u8) -> PixelClass;

    /// How default room colours are picked
    fn room_color_index(&self) -> RoomColorIndex {
        RoomColorIndex::Modulo16
    }
}

// ============================================================================
// Roborock
// ============================================================================

/// Roborock block-framed raster
#[derive(Clone, Copy, Debug, Default)]
pub struct RoborockPixels;

impl RoborockPixels {
    const OUTSIDE: u8 = 0x00;
    const WALL: u8 = 0x01;
    const INSIDE: u8 = 0xFF;
    const SCAN: u8 = 0x07;
}

impl PixelDialect for RoborockPixels {
    fn classify(&self, raw: u8) -> PixelClass {
        match raw {
            Self::OUTSIDE => PixelClass::Outside,
            Self::WALL => PixelClass::Wall,
            Self::INSIDE => PixelClass::Inside,
            Self::SCAN => PixelClass::Scan,
            _ => match raw & 0x07 {
                0 => PixelClass::GreyWall,
                1 => PixelClass::WallV2,
                7 => PixelClass::Room((raw >> 3) as u32),
                _ => PixelClass::Unknown,
            },
        }
    }

    fn room_color_index(&self) -> RoomColorIndex {
        RoomColorIndex::HalfId
    }
}

// ============================================================================
// Viomi
// ============================================================================

/// Viomi feature-flag raster
#[derive(Clone, Debug)]
pub struct ViomiPixels {
    pub bands: RoomIdBands,
}

impl Default for ViomiPixels {
    fn default() -> Self {
        Self {
            bands: viomi_bands(),
        }
    }
}

impl PixelDialect for ViomiPixels {
    fn classify(&self, raw: u8) -> PixelClass {
        match raw {
            0 => PixelClass::Outside,
            255 => PixelClass::GreyWall,
            1 => PixelClass::Scan,
            _ => match self.bands.canonical(raw as u32) {
                Some(id) => PixelClass::Room(id),
                None => PixelClass::Unknown,
            },
        }
    }

    fn room_color_index(&self) -> RoomColorIndex {
        RoomColorIndex::HalfId
    }
}

// ============================================================================
// Dreame
// ============================================================================

/// Dreame raster with 2-bit terrain and 6-bit segment id
#[derive(Clone, Copy, Debug, Default)]
pub struct DreameRegularPixels;

impl PixelDialect for DreameRegularPixels {
    fn classify(&self, raw: u8) -> PixelClass {
        let segment = raw >> 2;
        if segment > 0 && segment < 62 {
            return PixelClass::Room(segment as u32);
        }
        match raw & 0x03 {
            0 => PixelClass::Outside,
            1 => PixelClass::Inside,
            2 => PixelClass::Wall,
            _ => PixelClass::Unknown,
        }
    }
}

/// Dreame room-information raster with 1-bit wall flag and 7-bit segment id
#[derive(Clone, Copy, Debug, Default)]
pub struct DreameRismPixels;

impl PixelDialect for DreameRismPixels {
    fn classify(&self, raw: u8) -> PixelClass {
        if raw & 0x80 != 0 {
            return PixelClass::Wall;
        }
        match raw & 0x7F {
            0 => PixelClass::Outside,
            segment => PixelClass::Room(segment as u32),
        }
    }
}

// ============================================================================
// Roidmi
// ============================================================================

/// Roidmi raster; room ids come from the JSON trailer
#[derive(Clone, Debug, Default)]
pub struct RoidmiPixels {
    pub room_ids: BTreeSet<u8>,
}

impl PixelDialect for RoidmiPixels {
    fn classify(&self, raw: u8) -> PixelClass {
        match raw {
            127 => PixelClass::Outside,
            255 => PixelClass::Wall,
            0 => PixelClass::Inside,
            id if self.room_ids.contains(&id) => PixelClass::Room(id as u32),
            _ => PixelClass::Unknown,
        }
    }
}
