//! Shared fixture builders for integration tests.
//!
//! Each builder produces the *raw* payload a vendor cloud would hand out,
//! including the transport envelope (compression, base64).

#![allow(dead_code)]

use std::io::Write;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;

use chitra_map::parsers::roborock::block_type;
use chitra_map::parsers::viomi::feature;

// ============================================================================
// Envelopes
// ============================================================================

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

// ============================================================================
// Roborock
// ============================================================================

/// One Roborock block: 8-byte preamble, extra header bytes, data
pub fn roborock_block(kind: u16, header_extra: &[u8], data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&kind.to_le_bytes());
    out.extend_from_slice(&((8 + header_extra.len()) as u16).to_le_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(header_extra);
    out.extend_from_slice(data);
    out
}

/// Image block anchored at grid `(left, top)`
pub fn roborock_image(left: i32, top: i32, width: i32, height: i32, pixels: &[u8]) -> Vec<u8> {
    let mut header = Vec::new();
    for v in [top, left, height, width] {
        header.extend_from_slice(&v.to_le_bytes());
    }
    roborock_block(block_type::IMAGE, &header, pixels)
}

/// Pose block in millimetres
pub fn roborock_pose(kind: u16, x: i32, y: i32, angle: Option<i32>) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&x.to_le_bytes());
    data.extend_from_slice(&y.to_le_bytes());
    if let Some(a) = angle {
        data.extend_from_slice(&a.to_le_bytes());
    }
    roborock_block(kind, &[], &data)
}

/// Path block from millimetre points
pub fn roborock_path(kind: u16, points: &[(u16, u16)]) -> Vec<u8> {
    let mut header = Vec::new();
    header.extend_from_slice(&(points.len() as u32).to_le_bytes());
    header.extend_from_slice(&4u32.to_le_bytes());
    header.extend_from_slice(&0i32.to_le_bytes());
    let data: Vec<u8> = points
        .iter()
        .flat_map(|(x, y)| [x.to_le_bytes(), y.to_le_bytes()])
        .flatten()
        .collect();
    roborock_block(kind, &header, &data)
}

/// Digest block marking the map as complete
pub fn roborock_digest() -> Vec<u8> {
    roborock_block(block_type::DIGEST, &[], &[0; 20])
}

/// Unpacked Roborock map: 20-byte header followed by blocks
pub fn roborock_map(blocks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![b'r', b'r'];
    out.extend_from_slice(&0x14u16.to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    for b in blocks {
        out.extend_from_slice(b);
    }
    out
}

/// Minimal valid map: one 4x4 image of outside pixels and a digest
pub fn roborock_minimal() -> Vec<u8> {
    roborock_map(&[roborock_image(500, 500, 4, 4, &[0; 16]), roborock_digest()])
}

/// 40x40 map with two rooms, a path, a charger and the vacuum
pub fn roborock_furnished() -> Vec<u8> {
    const ROOM_2: u8 = (2 << 3) | 7;
    const ROOM_5: u8 = (5 << 3) | 7;
    let (w, h) = (40usize, 40usize);
    let mut pixels = vec![0u8; w * h];
    for y in 2..38 {
        for x in 2..38 {
            pixels[y * w + x] = if x < 20 { ROOM_2 } else { ROOM_5 };
        }
    }
    let (left, top) = (500, 500);
    let mm = |grid: i32| grid * 50;
    roborock_map(&[
        roborock_image(left, top, w as i32, h as i32, &pixels),
        roborock_pose(block_type::CHARGER, mm(left + 5), mm(top + 5), None),
        roborock_pose(block_type::ROBOT_POSITION, mm(left + 30), mm(top + 20), Some(45)),
        roborock_path(
            block_type::PATH,
            &[
                (mm(left + 5) as u16, mm(top + 5) as u16),
                (mm(left + 15) as u16, mm(top + 25) as u16),
                (mm(left + 30) as u16, mm(top + 20) as u16),
            ],
        ),
        roborock_digest(),
    ])
}

// ============================================================================
// Viomi
// ============================================================================

/// Unpacked Viomi map with an image and a charge station
pub fn viomi_map(width: u32, height: u32, pixels: &[u8]) -> Vec<u8> {
    const MAP_ID: u32 = 1_700_000_000;
    let mut out = Vec::new();
    out.extend_from_slice(&(feature::IMAGE | feature::CHARGE_STATION).to_le_bytes());

    out.extend_from_slice(&MAP_ID.to_le_bytes());
    out.extend_from_slice(&[0; 8]);
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&[0; 20]);
    out.extend_from_slice(pixels);

    out.extend_from_slice(&MAP_ID.to_le_bytes());
    for v in [0.5f32, -0.25, 0.0] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

// ============================================================================
// Roidmi
// ============================================================================

/// Unpacked Roidmi map; the last raster byte must be 127
pub fn roidmi_map(raster: &[u8], json: &str) -> Vec<u8> {
    let mut out = vec![0u8; 16];
    out.extend_from_slice(raster);
    out.extend_from_slice(json.as_bytes());
    out
}

// ============================================================================
// Dreame
// ============================================================================

/// Dreame I frame bytes: header, raster, JSON trailer
pub fn dreame_frame(width: i16, height: i16, pixels: &[u8], trailer: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&1i16.to_le_bytes());
    out.extend_from_slice(&[0, 0]);
    out.push(73);
    for v in [1000i16, 1000, 90, 0, 0, 0, 50, width, height, -500, -500] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.extend_from_slice(pixels);
    out.extend_from_slice(trailer.as_bytes());
    out
}

/// Cloud envelope: zlib then URL-safe base64
pub fn dreame_envelope(frame: &[u8]) -> Vec<u8> {
    URL_SAFE.encode(zlib(frame)).into_bytes()
}

// ============================================================================
// Valetudo
// ============================================================================

/// One segment layer with pixels `[10,10,5]` and a robot at 45°
pub const VALETUDO_SCENARIO: &str = r#"{
    "pixelSize": 5,
    "entities": [
        {"type": "robot_position", "points": [100, 100], "metaData": {"angle": 45}}
    ],
    "layers": [
        {"type": "segment", "compressedPixels": [10, 10, 5], "metaData": {"segmentId": 3}}
    ]
}"#;
