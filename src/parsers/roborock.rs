//! Roborock block-framed map format.
//!
//! ```text
//! File header (length at 0x02):
//!   0x00  u16  magic "rr"
//!   0x02  u16  header length
//!   0x08  u16  major version
//!   0x0A  u16  minor version
//!   0x0C  u32  map index
//!   0x10  u32  map sequence
//!
//! Blocks follow back to back:
//!   0x00  u16  block type
//!   0x02  u16  block header length
//!   0x04  u32  block data length
//!   0x08  ...  type-specific header fields
//!   [data length bytes of data]
//! ```
//!
//! Coordinates are millimetres; the raster has 50 mm pixels stored
//! bottom row first.

use crate::core::{Area, MapImage, MapSnapshot, Obstacle, Path, Point, Wall, Zone, YAxis};
use crate::error::{Error, Result};
use crate::io::{unpack, ByteReader};
use crate::raster::{grid_box_to_map, room_at, RasterLayout, RoborockPixels};

use super::{build_image, MapParser, ParseContext, RasterSource, Vendor};

/// Millimetres per raster pixel
pub const MM_PER_PIXEL: f32 = 50.0;

/// Block type tags
pub mod block_type {
    pub const CHARGER: u16 = 1;
    pub const IMAGE: u16 = 2;
    pub const PATH: u16 = 3;
    pub const GOTO_PATH: u16 = 4;
    pub const GOTO_PREDICTED_PATH: u16 = 5;
    pub const CURRENTLY_CLEANED_ZONES: u16 = 6;
    pub const GOTO_TARGET: u16 = 7;
    pub const ROBOT_POSITION: u16 = 8;
    pub const NO_GO_AREAS: u16 = 9;
    pub const VIRTUAL_WALLS: u16 = 10;
    pub const BLOCKS: u16 = 11;
    pub const NO_MOPPING_AREAS: u16 = 12;
    pub const OBSTACLES: u16 = 13;
    pub const IGNORED_OBSTACLES: u16 = 14;
    pub const OBSTACLES_WITH_PHOTO: u16 = 15;
    pub const IGNORED_OBSTACLES_WITH_PHOTO: u16 = 16;
    pub const CARPET_MAP: u16 = 17;
    pub const DIGEST: u16 = 1024;
}

const BLOCK_PREAMBLE: usize = 8;
const OBSTACLE_PHOTO_RECORD: usize = 28;

/// Roborock (and Xiaomi-branded) map parser
#[derive(Clone, Copy, Debug, Default)]
pub struct RoborockParser;

/// One framed block
struct Block<'a> {
    kind: u16,
    start: usize,
    header: &'a [u8],
    data: &'a [u8],
}

impl Block<'_> {
    /// `u16` count at header offset 0x08
    fn count(&self) -> Result<usize> {
        let mut r = ByteReader::new("block_header", self.header);
        r.seek("count", 0x08)?;
        Ok(r.u16_le("count")? as usize)
    }
}

/// Raster kept for the vacuum room lookup
struct RawImage<'a> {
    pixels: &'a [u8],
    layout: RasterLayout,
    left: i32,
    top: i32,
}

impl MapParser for RoborockParser {
    fn vendor(&self) -> Vendor {
        Vendor::Roborock
    }

    fn unpack(&self, raw: &[u8]) -> Result<Vec<u8>> {
        unpack::inflate_auto(raw)
    }

    fn parse(&self, data: &[u8], ctx: &ParseContext<'_>) -> Result<MapSnapshot> {
        let mut snapshot = MapSnapshot::default();

        let mut r = ByteReader::new("header", data);
        r.skip("magic", 2)?;
        let header_len = r.u16_le("header_length")? as usize;
        r.seek("major_version", 0x08)?;
        snapshot.header.major_version = Some(r.u16_le("major_version")?);
        snapshot.header.minor_version = Some(r.u16_le("minor_version")?);
        snapshot.header.map_index = Some(r.u32_le("map_index")?);
        snapshot.header.map_sequence = Some(r.u32_le("map_sequence")?);

        let mut raw_image = None;
        let mut pos = header_len;
        while pos < data.len() {
            let block = read_block(data, pos)?;
            log::debug!(
                "Block type {} at {:#x}: header {} bytes, data {} bytes",
                block.kind,
                pos,
                block.header.len(),
                block.data.len()
            );
            match block.kind {
                block_type::CHARGER => snapshot.charger = Some(parse_charger(&block)?),
                block_type::IMAGE => {
                    let (image, raw) = parse_image(&block, &mut snapshot, ctx)?;
                    snapshot.image = image;
                    raw_image = Some(raw);
                }
                block_type::ROBOT_POSITION => {
                    snapshot.vacuum_position = Some(parse_robot_position(&block)?)
                }
                block_type::PATH => snapshot.path = Some(parse_path(&block)?),
                block_type::GOTO_PATH => snapshot.goto_path = Some(parse_path(&block)?),
                block_type::GOTO_PREDICTED_PATH => snapshot.predicted_path = Some(parse_path(&block)?),
                block_type::CURRENTLY_CLEANED_ZONES => snapshot.zones = parse_zones(&block)?,
                block_type::GOTO_TARGET => snapshot.goto_target = Some(parse_goto_target(&block)?),
                block_type::DIGEST => snapshot.header.is_valid = true,
                block_type::VIRTUAL_WALLS => snapshot.walls = parse_walls(&block)?,
                block_type::NO_GO_AREAS => snapshot.no_go_areas = parse_areas(&block)?,
                block_type::NO_MOPPING_AREAS => snapshot.no_mopping_areas = parse_areas(&block)?,
                block_type::OBSTACLES => snapshot.obstacles = parse_obstacles(&block)?,
                block_type::IGNORED_OBSTACLES => snapshot.ignored_obstacles = parse_obstacles(&block)?,
                block_type::OBSTACLES_WITH_PHOTO => {
                    snapshot.obstacles_with_photo = parse_obstacles(&block)?
                }
                block_type::IGNORED_OBSTACLES_WITH_PHOTO => {
                    snapshot.ignored_obstacles_with_photo = parse_obstacles(&block)?
                }
                block_type::BLOCKS => {
                    let n = block.count()?.min(block.data.len());
                    snapshot.blocks = block.data[..n].to_vec();
                }
                block_type::CARPET_MAP => log::debug!("Skipping carpet map block"),
                other => log::debug!("Skipping unknown block type {}", other),
            }
            pos = block.start + block.header.len() + block.data.len();
        }

        if !snapshot.header.is_valid {
            log::debug!("Map has no digest block");
        }

        if let (Some(raw), Some(pos)) = (&raw_image, &snapshot.vacuum_position) {
            if !snapshot.rooms.is_empty() {
                snapshot.vacuum_room = vacuum_room(raw, pos);
                log::debug!("Vacuum room: {:?}", snapshot.vacuum_room);
            }
        }

        Ok(snapshot)
    }
}

fn read_block(data: &[u8], start: usize) -> Result<Block<'_>> {
    let mut r = ByteReader::window("block", data, start, BLOCK_PREAMBLE)?;
    let kind = r.u16_le("type")?;
    let header_len = r.u16_le("header_length")? as usize;
    let data_len = r.u32_le("data_length")? as usize;
    if header_len < BLOCK_PREAMBLE {
        return Err(Error::HeaderParse(format!(
            "block at {:#x} declares header length {}",
            start, header_len
        )));
    }

    let mut r = ByteReader::new("block", data);
    r.seek("header", start)?;
    let header = r.bytes("header", header_len)?;
    let body = r.bytes("data", data_len)?;
    Ok(Block {
        kind,
        start,
        header,
        data: body,
    })
}

fn parse_charger(block: &Block<'_>) -> Result<Point> {
    let mut r = ByteReader::new("charger", block.data);
    let x = r.i32_le("x")?;
    let y = r.i32_le("y")?;
    Ok(Point::new(x as f32, y as f32))
}

fn parse_robot_position(block: &Block<'_>) -> Result<Point> {
    let mut r = ByteReader::new("robot_position", block.data);
    let x = r.i32_le("x")? as f32;
    let y = r.i32_le("y")? as f32;
    if block.data.len() > 8 {
        let angle = r.i32_le("angle")?;
        Ok(Point::with_angle(x, y, angle as f32))
    } else {
        Ok(Point::new(x, y))
    }
}

fn parse_goto_target(block: &Block<'_>) -> Result<Point> {
    let mut r = ByteReader::new("goto_target", block.data);
    let x = r.u16_le("x")?;
    let y = r.u16_le("y")?;
    Ok(Point::new(x as f32, y as f32))
}

fn parse_path(block: &Block<'_>) -> Result<Path> {
    let mut h = ByteReader::new("path_header", block.header);
    h.seek("point_length", 0x08)?;
    let point_length = h.u32_le("point_length")?;
    let point_size = h.u32_le("point_size")?;
    let angle = h.i32_le("angle")?;

    let mut r = ByteReader::new("path", block.data);
    let mut points = Vec::with_capacity(block.data.len() / 4);
    while r.remaining() >= 4 {
        let x = r.u16_le("x")?;
        let y = r.u16_le("y")?;
        points.push(Point::new(x as f32, y as f32));
    }

    Ok(Path {
        point_length: Some(point_length),
        point_size: Some(point_size),
        angle: Some(angle as f32),
        runs: vec![points],
    })
}

fn parse_zones(block: &Block<'_>) -> Result<Vec<Zone>> {
    let count = block.count()?;
    let mut r = ByteReader::new("zones", block.data);
    let mut zones = Vec::with_capacity(count);
    for _ in 0..count {
        let x0 = r.u16_le("x0")? as f32;
        let y0 = r.u16_le("y0")? as f32;
        let x1 = r.u16_le("x1")? as f32;
        let y1 = r.u16_le("y1")? as f32;
        zones.push(Zone::new(x0, y0, x1, y1));
    }
    Ok(zones)
}

fn parse_walls(block: &Block<'_>) -> Result<Vec<Wall>> {
    let count = block.count()?;
    let mut r = ByteReader::new("virtual_walls", block.data);
    let mut walls = Vec::with_capacity(count);
    for _ in 0..count {
        let x0 = r.u16_le("x0")? as f32;
        let y0 = r.u16_le("y0")? as f32;
        let x1 = r.u16_le("x1")? as f32;
        let y1 = r.u16_le("y1")? as f32;
        walls.push(Wall::new(x0, y0, x1, y1));
    }
    Ok(walls)
}

fn parse_areas(block: &Block<'_>) -> Result<Vec<Area>> {
    let count = block.count()?;
    let mut r = ByteReader::new("areas", block.data);
    let mut areas = Vec::with_capacity(count);
    for _ in 0..count {
        let mut c = [0f32; 8];
        for v in c.iter_mut() {
            *v = r.u16_le("corner")? as f32;
        }
        areas.push(Area::from_coords(c));
    }
    Ok(areas)
}

fn parse_obstacles(block: &Block<'_>) -> Result<Vec<Obstacle>> {
    let count = block.count()?;
    if count == 0 {
        return Ok(Vec::new());
    }
    let record = block.data.len() / count;
    let mut obstacles = Vec::with_capacity(count);
    for i in 0..count {
        let mut r = ByteReader::window("obstacles", block.data, i * record, record)?;
        let x = r.u16_le("x")?;
        let y = r.u16_le("y")?;
        let mut obstacle = Obstacle::at(Point::new(x as f32, y as f32));
        if record >= 6 {
            obstacle = obstacle.with_kind(r.u16_le("type")?);
        }
        if record >= 10 {
            let u1 = r.u16_le("confidence_numerator")?;
            let u2 = r.u16_le("confidence_denominator")?;
            obstacle.confidence = Some(if u2 == 0 {
                0.0
            } else {
                u1 as f32 * 10.0 / u2 as f32
            });
            if record == OBSTACLE_PHOTO_RECORD {
                r.skip("unknown", 2)?;
                let photo = r.bytes("photo_name", 16)?;
                if photo[0] > 0 {
                    obstacle.photo = Some(String::from_utf8_lossy(photo).into_owned());
                }
            }
        }
        obstacles.push(obstacle);
    }
    Ok(obstacles)
}

fn parse_image<'a>(
    block: &Block<'a>,
    snapshot: &mut MapSnapshot,
    ctx: &ParseContext<'_>,
) -> Result<(MapImage, RawImage<'a>)> {
    let header_len = block.header.len();
    if header_len < 24 {
        return Err(Error::HeaderParse(format!(
            "image block header too short: {} bytes",
            header_len
        )));
    }
    let mut h = ByteReader::new("image_header", block.header);
    h.seek("top", header_len - 16)?;
    let top = h.i32_le("top")?;
    let left = h.i32_le("left")?;
    let height = h.i32_le("height")?;
    let width = h.i32_le("width")?;
    if width < 0 || height < 0 {
        return Err(Error::HeaderParse(format!(
            "negative image size {}x{}",
            width, height
        )));
    }

    let layout = RasterLayout {
        width: width as u32,
        height: height as u32,
        y_axis: YAxis::Up,
    };
    let source = RasterSource {
        pixels: block.data,
        layout,
        left,
        top,
        unit_scale: MM_PER_PIXEL,
    };
    let (image, rooms) = build_image(&source, &RoborockPixels, ctx)?;
    snapshot.rooms = rooms.to_rooms(|b| grid_box_to_map(b, left, top, MM_PER_PIXEL));

    Ok((
        image,
        RawImage {
            pixels: block.data,
            layout,
            left,
            top,
        },
    ))
}

fn vacuum_room(raw: &RawImage<'_>, pos: &Point) -> Option<u32> {
    let x = (pos.x / MM_PER_PIXEL - raw.left as f32).round() as i64;
    let y = (pos.y / MM_PER_PIXEL - raw.top as f32).round() as i64;
    room_at(raw.pixels, raw.layout, x, y, &RoborockPixels)
}
