//! Viomi feature-flag map format.
//!
//! The payload starts with a `u32` bit set. Each set bit selects one
//! section, and sections appear in ascending bit order:
//!
//! ```text
//! 0x0001  robot status      magic, 40 bytes skipped
//! 0x0002  image             magic, 8 skipped, height, width, 20 skipped, pixels
//! 0x0004  history           magic, 4 skipped, count, count × (1 skipped, position)
//! 0x0008  charge station    magic, position, f32
//! 0x0010  restricted areas  magic, 4 skipped, count, count × area record
//! 0x0020  cleaning areas    magic, 4 skipped, count, count × area record
//! 0x0040  navigate          magic, 4 skipped, position, f32
//! 0x0080  realtime          magic, 5 skipped, position, f32
//! 0x0800  unknown           magic, 4 skipped
//! 0x1000  rooms             magic, map names, room names
//! 0x2000  unknown           magic, resync on map id
//! 0x4000  unknown           magic, resync on map id
//! ```
//!
//! Positions are two `f32` metres offset by 20 m; the raster has 50 mm
//! pixels stored bottom row first.

use crate::core::{Area, MapSnapshot, Path, Point, Wall, YAxis, Zone};
use crate::error::Result;
use crate::io::{unpack, ByteReader};
use crate::raster::{
    grid_box_to_map, PixelClass, PixelDialect, RasterLayout, RoomAccumulator, ViomiPixels,
};

use super::{build_image, MapParser, ParseContext, RasterSource, Vendor};

/// Millimetres per raster pixel
pub const MM_PER_PIXEL: f32 = 50.0;

/// Coordinate value marking an unknown position
const POSITION_UNKNOWN: f32 = 1100.0;

/// Section flags
pub mod feature {
    pub const ROBOT_STATUS: u32 = 0x0000_0001;
    pub const IMAGE: u32 = 0x0000_0002;
    pub const HISTORY: u32 = 0x0000_0004;
    pub const CHARGE_STATION: u32 = 0x0000_0008;
    pub const RESTRICTED_AREAS: u32 = 0x0000_0010;
    pub const CLEANING_AREAS: u32 = 0x0000_0020;
    pub const NAVIGATE: u32 = 0x0000_0040;
    pub const REALTIME: u32 = 0x0000_0080;
    pub const UNKNOWN_0800: u32 = 0x0000_0800;
    pub const ROOMS: u32 = 0x0000_1000;
    pub const UNKNOWN_2000: u32 = 0x0000_2000;
    pub const UNKNOWN_4000: u32 = 0x0000_4000;
}

/// Viomi map parser
#[derive(Clone, Copy, Debug, Default)]
pub struct ViomiParser;

impl MapParser for ViomiParser {
    fn vendor(&self) -> Vendor {
        Vendor::Viomi
    }

    fn unpack(&self, raw: &[u8]) -> Result<Vec<u8>> {
        unpack::inflate_auto(raw)
    }

    fn parse(&self, data: &[u8], ctx: &ParseContext<'_>) -> Result<MapSnapshot> {
        let mut snapshot = MapSnapshot::default();
        let dialect = ViomiPixels::default();

        let mut r = ByteReader::new("header", data);
        let flags = r.u32_le("feature_flags")?;
        let map_id = r.peek_u32("map_id")?;
        log::debug!("Feature flags: {:#x}, map id: {}", flags, map_id);
        let has = |bit: u32| flags & bit != 0;

        // Reader positioned at the first pixel, kept for the vacuum room lookup
        let mut image_reader: Option<(ByteReader<'_>, u32)> = None;
        let mut rooms = RoomAccumulator::new();

        if has(feature::ROBOT_STATUS) {
            section(&mut r, "robot_status")?;
            r.skip("unknown1", 0x28)?;
        }

        if has(feature::IMAGE) {
            section(&mut r, "image")?;
            r.skip("unknown1", 8)?;
            let height = r.u32_le("image_height")?;
            let width = r.u32_le("image_width")?;
            r.skip("unknown2", 20)?;
            log::debug!("Image {}x{}", width, height);

            let layout = RasterLayout {
                width,
                height,
                y_axis: YAxis::Up,
            };
            r.mark();
            image_reader = Some((r.clone(), width));
            let pixels = r.bytes("pixels", layout.len())?;
            let source = RasterSource {
                pixels,
                layout,
                left: 0,
                top: 0,
                unit_scale: MM_PER_PIXEL,
            };
            let (image, found) = build_image(&source, &dialect, ctx)?;
            snapshot.image = image;
            rooms = found;
        }

        if has(feature::HISTORY) {
            section(&mut r, "history")?;
            snapshot.path = Some(parse_history(&mut r)?);
        }

        if has(feature::CHARGE_STATION) {
            section(&mut r, "charge_station")?;
            snapshot.charger = parse_position(&mut r, "charger")?;
            let extra = r.f32_le("charger_extra")?;
            log::debug!("Charger: {:?}, extra: {}", snapshot.charger, extra);
        }

        if has(feature::RESTRICTED_AREAS) {
            section(&mut r, "restricted_areas")?;
            let (walls, areas) = parse_restricted_areas(&mut r)?;
            snapshot.walls = walls;
            snapshot.no_go_areas = areas;
        }

        if has(feature::CLEANING_AREAS) {
            section(&mut r, "cleaning_areas")?;
            snapshot.zones = parse_cleaning_areas(&mut r)?;
        }

        if has(feature::NAVIGATE) {
            section(&mut r, "navigate")?;
            r.skip("unknown1", 4)?;
            snapshot.goto_target = parse_position(&mut r, "goto_target")?;
            let extra = r.f32_le("goto_extra")?;
            log::debug!("Goto target: {:?}, extra: {}", snapshot.goto_target, extra);
        }

        if has(feature::REALTIME) {
            section(&mut r, "realtime")?;
            r.skip("unknown1", 5)?;
            snapshot.vacuum_position = parse_position(&mut r, "vacuum_position")?;
            let extra = r.f32_le("vacuum_extra")?;
            log::debug!("Vacuum: {:?}, extra: {}", snapshot.vacuum_position, extra);
        }

        if has(feature::UNKNOWN_0800) {
            section(&mut r, "unknown_0800")?;
            r.skip("unknown1", 4)?;
        }

        snapshot.rooms = rooms.to_rooms(|b| grid_box_to_map(b, 0, 0, MM_PER_PIXEL));

        if has(feature::ROOMS) {
            section(&mut r, "rooms")?;
            parse_rooms(&mut r, &mut snapshot)?;
        }

        for (bit, name) in [
            (feature::UNKNOWN_2000, "unknown_2000"),
            (feature::UNKNOWN_4000, "unknown_4000"),
        ] {
            if has(bit) {
                section(&mut r, name)?;
                resync(&mut r, data);
            }
        }

        log::debug!("Rooms: {:?}", snapshot.rooms.keys().collect::<Vec<_>>());

        if let (Some((reader, width)), Some(pos)) = (&image_reader, &snapshot.vacuum_position) {
            if !snapshot.rooms.is_empty() {
                snapshot.vacuum_room = vacuum_room(reader, *width, pos, &dialect);
                log::debug!("Vacuum room: {:?}", snapshot.vacuum_room);
            }
        }

        Ok(snapshot)
    }
}

/// Enter a section and consume its magic.
///
/// The magic usually equals the map id but firmware does not enforce it,
/// so mismatches are only logged.
fn section(r: &mut ByteReader<'_>, name: &'static str) -> Result<()> {
    r.set_section(name);
    let magic = r.u32_le("magic")?;
    log::trace!("Section {} magic {:#x}", name, magic);
    Ok(())
}

/// Position in millimetres, `None` for the unknown marker
fn parse_position(r: &mut ByteReader<'_>, field: &str) -> Result<Option<Point>> {
    let x = r.f32_le(field)?;
    let y = r.f32_le(field)?;
    if x == POSITION_UNKNOWN || y == POSITION_UNKNOWN {
        return Ok(None);
    }
    let to_mm = |v: f32| (1000.0 * v + 20000.0).trunc();
    Ok(Some(Point::new(to_mm(x), to_mm(y))))
}

fn parse_history(r: &mut ByteReader<'_>) -> Result<Path> {
    r.skip("unknown1", 4)?;
    let count = r.u32_le("history_count")? as usize;
    let mut points = Vec::with_capacity(count.min(r.remaining() / 9));
    for _ in 0..count {
        r.skip("path_unknown", 1)?;
        if let Some(p) = parse_position(r, "path")? {
            points.push(p);
        }
    }
    let mut path = Path::single(points);
    path.point_length = Some(path.point_count() as u32);
    path.point_size = Some(1);
    path.angle = Some(0.0);
    Ok(path)
}

/// Four corners of one area record
fn parse_area_record(r: &mut ByteReader<'_>) -> Result<[Option<Point>; 4]> {
    r.skip("area_unknown1", 12)?;
    let p1 = parse_position(r, "p1")?;
    let p2 = parse_position(r, "p2")?;
    let p3 = parse_position(r, "p3")?;
    let p4 = parse_position(r, "p4")?;
    r.skip("area_unknown2", 48)?;
    Ok([p1, p2, p3, p4])
}

fn parse_restricted_areas(r: &mut ByteReader<'_>) -> Result<(Vec<Wall>, Vec<Area>)> {
    r.skip("unknown1", 4)?;
    let count = r.u32_le("area_count")?;
    let mut walls = Vec::new();
    let mut areas = Vec::new();
    for _ in 0..count {
        let corners = parse_area_record(r)?;
        log::debug!("Restricted: {:?}", corners);
        let [Some(p1), Some(p2), Some(p3), Some(p4)] = corners else {
            log::warn!("Restricted area with unknown corner skipped");
            continue;
        };
        if p1 == p2 && p3 == p4 {
            walls.push(Wall::new(p1.x, p1.y, p3.x, p3.y));
        } else {
            areas.push(Area::new(p1, p2, p3, p4));
        }
    }
    Ok((walls, areas))
}

fn parse_cleaning_areas(r: &mut ByteReader<'_>) -> Result<Vec<Zone>> {
    r.skip("unknown1", 4)?;
    let count = r.u32_le("area_count")?;
    let mut zones = Vec::new();
    for _ in 0..count {
        match parse_area_record(r)? {
            [Some(p1), _, Some(p3), _] => zones.push(Zone::new(p1.x, p1.y, p3.x, p3.y)),
            _ => log::warn!("Cleaning area with unknown corner skipped"),
        }
    }
    Ok(zones)
}

fn parse_rooms(r: &mut ByteReader<'_>, snapshot: &mut MapSnapshot) -> Result<()> {
    let mut map_name = r.string_len8("map_name")?;
    let mut map_arg = r.u32_le("map_arg")?;
    log::debug!("Map #{}: {}", map_arg, map_name);
    while map_arg > 1 {
        map_name = r.string_len8("map_name")?;
        map_arg = r.u32_le("map_arg")?;
        log::debug!("Map #{}: {}", map_arg, map_name);
    }
    if !map_name.is_empty() {
        snapshot.map_name = Some(map_name);
    }

    let room_count = r.u32_le("room_count")?;
    for _ in 0..room_count {
        let id = r.u8("room_id")? as u32;
        let name = r.string_len8("room_name")?;
        r.skip("room_unknown1", 1)?;
        let label = parse_position(r, "room_text_pos")?;
        log::debug!("Room #{}: {} {:?}", id, name, label);
        if let Some(room) = snapshot.rooms.get_mut(&id) {
            room.name = Some(name);
            room.label = label;
        }
    }
    r.skip("unknown1", 6)?;
    Ok(())
}

/// Skip an undocumented section by searching for the next map id copy
fn resync(r: &mut ByteReader<'_>, data: &[u8]) {
    let Some(map_id) = data.get(4..8) else {
        return;
    };
    if !r.seek_to(map_id) {
        log::debug!("No map id marker after offset {:#x}", r.offset());
    }
}

fn vacuum_room(reader: &ByteReader<'_>, width: u32, pos: &Point, dialect: &ViomiPixels) -> Option<u32> {
    let x = (pos.x / MM_PER_PIXEL).trunc();
    let y = (pos.y / MM_PER_PIXEL).trunc();
    if x < 0.0 || y < 0.0 || x >= width as f32 {
        return None;
    }
    let index = y as usize * width as usize + x as usize;
    match dialect.classify(reader.byte_from_mark(index)?) {
        PixelClass::Room(id) => Some(id),
        _ => None,
    }
}
