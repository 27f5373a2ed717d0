//! Dreame header + raster + JSON map format.
//!
//! The transport payload is URL-safe base64 of a zlib stream. Inflated:
//!
//! ```text
//! 0x00  i16  map index
//! 0x04  i8   frame type ('I' = 73 full frame, 'P' = 80 delta)
//! 0x05  i16  robot x, y, angle
//! 0x0B  i16  charger x, y, angle
//! 0x11  i16  pixel size (map units per pixel)
//! 0x13  i16  width
//! 0x15  i16  height
//! 0x17  i16  left (map units)
//! 0x19  i16  top (map units)
//! 0x1B  raster: width × height bytes, bottom row first
//!       JSON trailer: tr (path), vw (virtual walls), seg_inf (room names),
//!                     rism + ris (nested room map), sa (active segments)
//! ```
//!
//! The nested room map (`rism`) uses the same envelope with the
//! [`MapKind::Rism`] pixel dialect. It is decoded by calling back into the
//! frame parser, at most one level deep.

mod session;

pub use session::DreameSession;

use std::collections::{BTreeMap, BTreeSet};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use serde::Deserialize;

use crate::core::{Area, MapSnapshot, Path, Point, Room, Wall, YAxis};
use crate::error::{Error, Result};
use crate::io::{unpack, ByteReader};
use crate::raster::{
    grid_box_to_map, DreameRegularPixels, DreameRismPixels, PixelDialect, RasterLayout,
};

use super::{build_image, MapParser, ParseContext, RasterSource, Vendor};

/// Size of the fixed frame header
pub const HEADER_SIZE: usize = 27;

/// Full frame tag
pub const I_FRAME: i8 = 73;

/// Delta frame tag
pub const P_FRAME: i8 = 80;

/// `ris` value announcing a usable nested room map
const RIS_ROOM_MAP: i64 = 2;

/// Nesting limit for `rism` sub-maps
const MAX_NESTING: u8 = 1;

const PATH_PATTERN: &str = r"([SL])(-?\d+),(-?\d+)";

/// Raster dialect of a frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapKind {
    /// 2-bit terrain + 6-bit segment id
    Regular,
    /// Room information map: wall flag + 7-bit segment id
    Rism,
}

impl MapKind {
    fn dialect(self) -> &'static dyn PixelDialect {
        match self {
            MapKind::Regular => &DreameRegularPixels,
            MapKind::Rism => &DreameRismPixels,
        }
    }
}

/// Fixed frame header
#[derive(Clone, Debug, PartialEq)]
pub struct FrameHeader {
    pub map_index: i16,
    pub frame_type: i8,
    pub robot: Point,
    pub charger: Point,
    pub pixel_size: i16,
    pub width: i16,
    pub height: i16,
    /// Grid column of the first raster column
    pub left: i32,
    /// Grid row of the first raster row
    pub top: i32,
}

impl FrameHeader {
    /// Decode the 27-byte header
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::HeaderParse(format!(
                "frame header needs {} bytes, got {}",
                HEADER_SIZE,
                data.len()
            )));
        }
        let mut r = ByteReader::new("header", data);
        let map_index = r.i16_le("map_index")?;
        r.seek("frame_type", 4)?;
        let frame_type = r.i8("frame_type")?;
        let robot = pose(&mut r, "robot")?;
        let charger = pose(&mut r, "charger")?;
        let pixel_size = r.i16_le("pixel_size")?;
        let width = r.i16_le("width")?;
        let height = r.i16_le("height")?;
        let left = r.i16_le("left")?;
        let top = r.i16_le("top")?;

        if pixel_size <= 0 {
            return Err(Error::HeaderParse(format!("invalid pixel size {}", pixel_size)));
        }
        if width < 0 || height < 0 {
            return Err(Error::HeaderParse(format!(
                "negative image size {}x{}",
                width, height
            )));
        }

        let header = Self {
            map_index,
            frame_type,
            robot,
            charger,
            pixel_size,
            width,
            height,
            left: (left as f32 / pixel_size as f32).round() as i32,
            top: (top as f32 / pixel_size as f32).round() as i32,
        };
        log::debug!("Frame header: {:?}", header);
        Ok(header)
    }

    fn raster_len(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

fn pose(r: &mut ByteReader<'_>, field: &str) -> Result<Point> {
    let x = r.i16_le(field)?;
    let y = r.i16_le(field)?;
    let a = r.i16_le(field)?;
    Ok(Point::with_angle(x as f32, y as f32, a as f32))
}

// ============================================================================
// JSON trailer
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct Trailer {
    #[serde(default)]
    tr: Option<String>,
    #[serde(default)]
    vw: Option<VirtualWalls>,
    #[serde(default)]
    seg_inf: Option<BTreeMap<String, SegmentInfo>>,
    #[serde(default)]
    rism: Option<String>,
    #[serde(default)]
    ris: Option<i64>,
    #[serde(default)]
    sa: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct VirtualWalls {
    #[serde(default)]
    rect: Vec<Vec<f32>>,
    #[serde(default)]
    mop: Vec<Vec<f32>>,
    #[serde(default)]
    line: Vec<Vec<f32>>,
}

#[derive(Debug, Default, Deserialize)]
struct SegmentInfo {
    #[serde(default)]
    name: Option<String>,
}

impl Trailer {
    /// Room names keyed by segment id, decoded from base64
    fn room_names(&self) -> BTreeMap<u32, String> {
        let Some(segments) = &self.seg_inf else {
            return BTreeMap::new();
        };
        segments
            .iter()
            .filter_map(|(id, info)| {
                let id = id.parse::<u32>().ok()?;
                let encoded = info.name.as_deref().filter(|n| !n.is_empty())?;
                match STANDARD.decode(encoded) {
                    Ok(raw) => Some((id, String::from_utf8_lossy(&raw).into_owned())),
                    Err(e) => {
                        log::warn!("Room {} name is not valid base64: {}", id, e);
                        None
                    }
                }
            })
            .collect()
    }

    /// First element of every `sa` entry
    fn active_segments(&self) -> BTreeSet<u32> {
        let Some(serde_json::Value::Array(entries)) = &self.sa else {
            return BTreeSet::new();
        };
        entries
            .iter()
            .filter_map(|e| e.as_array()?.first()?.as_u64())
            .filter_map(|id| u32::try_from(id).ok())
            .collect()
    }
}

/// Decode the compact path operator string.
///
/// `S<x>,<y>` starts a new run at an absolute position, `L<dx>,<dy>`
/// appends a point relative to the previous one.
pub fn parse_path(operators: &str) -> Result<Path> {
    let re = Regex::new(PATH_PATTERN)
        .map_err(|e| Error::HeaderParse(format!("path pattern: {}", e)))?;
    let mut runs: Vec<Vec<Point>> = Vec::new();
    let (mut x, mut y) = (0i64, 0i64);
    for caps in re.captures_iter(operators) {
        let dx: i64 = caps[2]
            .parse()
            .map_err(|_| Error::HeaderParse(format!("path value {}", &caps[2])))?;
        let dy: i64 = caps[3]
            .parse()
            .map_err(|_| Error::HeaderParse(format!("path value {}", &caps[3])))?;
        if &caps[1] == "S" {
            runs.push(Vec::new());
            x = dx;
            y = dy;
        } else {
            x = x.checked_add(dx).ok_or_else(|| path_overflow(x, dx))?;
            y = y.checked_add(dy).ok_or_else(|| path_overflow(y, dy))?;
        }
        // A relative move before any start opens an implicit run at the origin
        if runs.is_empty() {
            runs.push(Vec::new());
        }
        if let Some(run) = runs.last_mut() {
            run.push(Point::new(x as f32, y as f32));
        }
    }
    Ok(Path::from_runs(runs))
}

fn path_overflow(position: i64, step: i64) -> Error {
    Error::HeaderParse(format!("path step {} from {} overflows", step, position))
}

/// Axis-aligned rectangles `[x0, y0, x1, y1]` as areas with sorted corners
fn parse_rects(rects: &[Vec<f32>]) -> Vec<Area> {
    rects
        .iter()
        .filter_map(|r| match r.as_slice() {
            [a, b, c, d, ..] => {
                let (x0, x1) = if a <= c { (*a, *c) } else { (*c, *a) };
                let (y0, y1) = if b <= d { (*b, *d) } else { (*d, *b) };
                Some(Area::new(
                    Point::new(x0, y0),
                    Point::new(x1, y0),
                    Point::new(x1, y1),
                    Point::new(x0, y1),
                ))
            }
            _ => {
                log::warn!("Rectangle with {} values skipped", r.len());
                None
            }
        })
        .collect()
}

fn parse_lines(lines: &[Vec<f32>]) -> Vec<Wall> {
    lines
        .iter()
        .filter_map(|l| match l.as_slice() {
            [x0, y0, x1, y1, ..] => Some(Wall::new(*x0, *y0, *x1, *y1)),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Parser
// ============================================================================

/// Dreame map parser
#[derive(Clone, Copy, Debug, Default)]
pub struct DreameParser;

impl DreameParser {
    /// Decode one inflated frame of the given kind.
    ///
    /// `depth` counts enclosing frames; nested room maps beyond
    /// the nesting limit are ignored.
    pub fn parse_frame(
        &self,
        data: &[u8],
        kind: MapKind,
        depth: u8,
        ctx: &ParseContext<'_>,
    ) -> Result<MapSnapshot> {
        log::debug!("Decoding {:?} frame at depth {}", kind, depth);
        let header = FrameHeader::parse(data)?;
        if header.frame_type != I_FRAME {
            return Err(Error::UnsupportedFrame(format!(
                "frame type {} ({})",
                header.frame_type,
                if header.frame_type == P_FRAME {
                    "delta frame"
                } else {
                    "unknown"
                }
            )));
        }

        let mut r = ByteReader::new("raster", data);
        r.seek("raster", HEADER_SIZE)?;
        let pixels = r.bytes("pixels", header.raster_len())?;
        r.set_section("trailer");
        let trailer_raw = r.rest();
        let trailer: Trailer = if trailer_raw.iter().all(u8::is_ascii_whitespace) {
            Trailer::default()
        } else {
            serde_json::from_slice(trailer_raw)?
        };

        let mut snapshot = MapSnapshot::default();
        snapshot.header.map_index = u32::try_from(header.map_index).ok();
        snapshot.charger = Some(header.charger);
        snapshot.vacuum_position = Some(header.robot);

        let unit = header.pixel_size as f32;
        let layout = RasterLayout {
            width: header.width as u32,
            height: header.height as u32,
            y_axis: YAxis::Up,
        };
        let source = RasterSource {
            pixels,
            layout,
            left: header.left,
            top: header.top,
            unit_scale: unit,
        };
        let (image, rooms) = build_image(&source, kind.dialect(), ctx)?;
        snapshot.image = image;

        let names = trailer.room_names();
        snapshot.rooms = rooms.to_rooms(|b| grid_box_to_map(b, header.left, header.top, unit));
        name_rooms(&mut snapshot.rooms, &names);

        if trailer.ris == Some(RIS_ROOM_MAP) {
            if let Some(encoded) = trailer.rism.as_deref().filter(|s| !s.is_empty()) {
                if depth >= MAX_NESTING {
                    log::warn!("Nested room map at depth {} ignored", depth);
                } else {
                    let inner = unpack::inflate_zlib(&unpack::decode_urlsafe_base64(
                        encoded.as_bytes(),
                    )?)?;
                    let rism = self.parse_frame(&inner, MapKind::Rism, depth + 1, ctx)?;
                    snapshot.no_go_areas = rism.no_go_areas;
                    snapshot.no_mopping_areas = rism.no_mopping_areas;
                    snapshot.walls = rism.walls;
                    snapshot.rooms = rism.rooms;
                    if !rism.image.is_empty() {
                        snapshot.image = rism.image;
                    }
                    log::debug!("Rooms from room map: {:?}", snapshot.rooms.keys());
                }
            }
        }

        if let Some(tr) = trailer.tr.as_deref().filter(|s| !s.is_empty()) {
            snapshot.path = Some(parse_path(tr)?);
        }
        if let Some(vw) = &trailer.vw {
            if !vw.rect.is_empty() {
                snapshot.no_go_areas = parse_rects(&vw.rect);
            }
            if !vw.mop.is_empty() {
                snapshot.no_mopping_areas = parse_rects(&vw.mop);
            }
            if !vw.line.is_empty() {
                snapshot.walls = parse_lines(&vw.line);
            }
        }
        snapshot.cleaned_rooms = trailer.active_segments();

        Ok(snapshot)
    }
}

/// Apply decoded names; rooms without one are named by their id
fn name_rooms(rooms: &mut BTreeMap<u32, Room>, names: &BTreeMap<u32, String>) {
    for (id, room) in rooms.iter_mut() {
        room.name = Some(names.get(id).cloned().unwrap_or_else(|| id.to_string()));
    }
}

impl MapParser for DreameParser {
    fn vendor(&self) -> Vendor {
        Vendor::Dreame
    }

    fn unpack(&self, raw: &[u8]) -> Result<Vec<u8>> {
        let compressed = unpack::decode_urlsafe_base64(raw)?;
        unpack::inflate_zlib(&compressed)
    }

    fn parse(&self, data: &[u8], ctx: &ParseContext<'_>) -> Result<MapSnapshot> {
        self.parse_frame(data, MapKind::Regular, 0, ctx)
    }
}
