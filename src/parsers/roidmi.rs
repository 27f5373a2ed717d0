//! Roidmi raster + JSON map format.
//!
//! ```text
//! 0x00  16 bytes     preamble (ignored)
//! 0x10  raster       width × height bytes, bottom row first
//!       0x7f 0x7b    marker: last raster byte followed by '{'
//!       JSON         {"width", "height", "autoAreaValue" | "autoArea", "mapName"}
//! ```
//!
//! Map coordinates are metres; one pixel is 5 cm and the grid origin sits
//! at pixel 400, so `pixel = metres * 20 + 400`.

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::core::{MapSnapshot, YAxis};
use crate::error::{Error, Result};
use crate::io::unpack;
use crate::raster::{grid_box_to_map, RasterLayout, RoidmiPixels};

use super::{build_image, MapParser, ParseContext, RasterSource, Vendor};

/// Metres per raster pixel
pub const METRES_PER_PIXEL: f32 = 0.05;

/// Grid column and row of the map origin
pub const ORIGIN_PIXEL: i32 = 400;

const PREAMBLE_LEN: usize = 16;
const RASTER_END_MARKER: [u8; 2] = [127, 123];

/// Roidmi map parser
#[derive(Clone, Copy, Debug, Default)]
pub struct RoidmiParser;

#[derive(Debug, Deserialize)]
struct AreaRef {
    id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapInfo {
    width: u32,
    height: u32,
    #[serde(default)]
    auto_area_value: Option<Vec<AreaRef>>,
    #[serde(default)]
    auto_area: Option<Vec<AreaRef>>,
    #[serde(default)]
    map_name: Option<String>,
}

impl MapInfo {
    /// Room ids that appear as raw pixel values
    fn room_ids(&self) -> BTreeSet<u8> {
        let areas = self
            .auto_area_value
            .as_ref()
            .or(self.auto_area.as_ref())
            .map(Vec::as_slice)
            .unwrap_or_default();
        areas
            .iter()
            .filter_map(|a| u8::try_from(a.id).ok())
            .collect()
    }
}

impl MapParser for RoidmiParser {
    fn vendor(&self) -> Vendor {
        Vendor::Roidmi
    }

    fn unpack(&self, raw: &[u8]) -> Result<Vec<u8>> {
        unpack::inflate_auto(raw)
    }

    fn parse(&self, data: &[u8], ctx: &ParseContext<'_>) -> Result<MapSnapshot> {
        let marker = data
            .windows(RASTER_END_MARKER.len())
            .position(|w| w == RASTER_END_MARKER)
            .ok_or_else(|| Error::HeaderParse("raster end marker not found".to_string()))?;
        if marker < PREAMBLE_LEN {
            return Err(Error::HeaderParse(format!(
                "raster end marker at {:#x} inside preamble",
                marker
            )));
        }

        let raster = &data[PREAMBLE_LEN..=marker];
        let info: MapInfo = serde_json::from_slice(&data[marker + 1..])?;
        let room_ids = info.room_ids();
        log::debug!(
            "Roidmi map {}x{}, room ids {:?}",
            info.width,
            info.height,
            room_ids
        );

        let layout = RasterLayout {
            width: info.width,
            height: info.height,
            y_axis: YAxis::Up,
        };
        let source = RasterSource {
            pixels: raster,
            layout,
            left: -ORIGIN_PIXEL,
            top: -ORIGIN_PIXEL,
            unit_scale: METRES_PER_PIXEL,
        };
        let dialect = RoidmiPixels { room_ids };
        let (image, rooms) = build_image(&source, &dialect, ctx)?;

        let mut snapshot = MapSnapshot {
            image,
            map_name: info.map_name,
            ..Default::default()
        };
        snapshot.header.map_index = Some(0);
        snapshot.header.map_sequence = Some(1);
        snapshot.rooms = rooms.to_rooms(|b| {
            grid_box_to_map(b, -ORIGIN_PIXEL, -ORIGIN_PIXEL, METRES_PER_PIXEL)
        });
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColorPalette, RenderConfig};

    fn payload(raster: &[u8], json: &str) -> Vec<u8> {
        let mut out = vec![0u8; PREAMBLE_LEN];
        out.extend_from_slice(raster);
        out.extend_from_slice(json.as_bytes());
        out
    }

    fn parse(data: &[u8]) -> Result<MapSnapshot> {
        let palette = ColorPalette::new();
        let config = RenderConfig::default();
        RoidmiParser.parse(data, &ParseContext::new(&palette, &config))
    }

    #[test]
    fn test_rooms_from_auto_area_value() {
        // Last raster byte must be 127 so the marker lands on it
        let raster = [0, 10, 10, 255, 11, 127];
        let json = r#"{"width":3,"height":2,"autoAreaValue":[{"id":10},{"id":11}],"mapName":"Flat"}"#;
        let snapshot = parse(&payload(&raster, json)).unwrap();

        assert!(!snapshot.image.is_empty());
        assert_eq!(snapshot.map_name.as_deref(), Some("Flat"));
        assert_eq!(snapshot.rooms.len(), 2);

        let r10 = &snapshot.rooms[&10];
        // Grid columns 1..=2 on row 0
        assert!((r10.bbox.x0 - (1.0 - 400.0) / 20.0).abs() < 1e-4);
        assert!((r10.bbox.x1 - (2.0 - 400.0) / 20.0).abs() < 1e-4);
        assert!((r10.bbox.y0 - (-20.0)).abs() < 1e-4);
    }

    #[test]
    fn test_auto_area_fallback() {
        let raster = [5, 127];
        let json = r#"{"width":2,"height":1,"autoArea":[{"id":5}]}"#;
        let snapshot = parse(&payload(&raster, json)).unwrap();
        assert!(snapshot.rooms.contains_key(&5));
    }

    #[test]
    fn test_missing_marker_is_header_error() {
        let data = payload(&[0, 0], "no json here");
        assert!(matches!(parse(&data), Err(Error::HeaderParse(_))));
    }

    #[test]
    fn test_bad_json_is_error() {
        let data = payload(&[0, 127], "{\"width\":");
        assert!(matches!(parse(&data), Err(Error::Json(_))));
    }
}
