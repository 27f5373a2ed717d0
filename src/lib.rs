//! # Chitra-Map: Robot Vacuum Map Decoder and Renderer
//!
//! Turns the raw map payload a cloud-connected robot vacuum hands out into
//! a vendor-agnostic [`MapSnapshot`] and draws it as an RGBA image with a
//! set of structured attributes.
//!
//! ## Features
//!
//! - **Five formats**: Roborock block maps, Viomi feature-flag maps, Roidmi
//!   raster + JSON, Dreame frames (with nested room maps) and Valetudo JSON
//! - **Room classification**: single-pass raster scan collecting per-room
//!   bounding boxes
//! - **Layered compositor**: translucent overlays blended with correct alpha
//! - **Never fails hard**: decode errors become an empty snapshot whose
//!   message is drawn on a placeholder image
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chitra_map::{decode_map, render_map, ColorPalette, RenderConfig, Vendor};
//!
//! let raw = std::fs::read("map.gz").unwrap();
//! let palette = ColorPalette::new();
//! let config = RenderConfig::default();
//!
//! let snapshot = decode_map(Vendor::Roborock, &raw, &palette, &config);
//! let rendered = render_map(&snapshot, &palette, &config);
//! std::fs::write("map.png", rendered.to_png().unwrap()).unwrap();
//! ```
//!
//! ## Coordinate Spaces
//!
//! - **Map space**: vendor units (millimetres, metres or grid cells),
//!   Y up for the binary formats
//! - **Image space**: pixels on the scaled output, Y down
//!
//! Rotation is a whole-image transform applied after every overlay is
//! drawn; [`MapSnapshot::calibration`] exposes where fixed map points end
//! up on the final image.
//!
//! ## Architecture
//!
//! ```text
//!     raw bytes
//!        │ MapParser::unpack (gzip / zlib / base64)
//!        ▼
//!     payload ──► ByteReader / serde_json ──► vendor parser
//!                                                │
//!                      raster::scan_raster ◄─────┤ pixel dialect
//!                      (colours + room boxes)    │
//!                                                ▼
//!                                           MapSnapshot
//!                                                │ MapRenderer
//!                                                ▼
//!                                   RenderedMap { image, attributes }
//! ```
//!
//! - [`config`]: palette, render configuration, TOML loading
//! - [`core`]: geometry, rooms, obstacles, snapshot
//! - [`io`]: byte reader and payload unpacking
//! - [`raster`]: pixel dialects and the room classifier
//! - [`parsers`]: one [`MapParser`] per vendor
//! - [`render`]: compositor, primitives, orchestrator

pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod parsers;
pub mod raster;
pub mod render;

pub use config::{ColorPalette, MapConfig, RenderConfig};
pub use crate::core::{MapImage, MapSnapshot};
pub use error::{Error, Result};
pub use parsers::{parser_for, DreameSession, MapParser, ParseContext, Vendor};
pub use render::{render_map, MapAttributes, MapRenderer, RenderedMap};

/// Decode a raw vendor payload.
///
/// Never fails: any decode error is logged and replaced by an empty
/// snapshot whose message describes the failure.
pub fn decode_map(
    vendor: Vendor,
    raw: &[u8],
    palette: &ColorPalette,
    config: &RenderConfig,
) -> MapSnapshot {
    let ctx = ParseContext::new(palette, config);
    match parser_for(vendor).decode(raw, &ctx) {
        Ok(snapshot) => {
            log::debug!(
                "Decoded {} map: {} rooms, empty={}",
                vendor,
                snapshot.rooms.len(),
                snapshot.image.is_empty()
            );
            snapshot
        }
        Err(e) => {
            log::error!("Failed to decode {} map: {}", vendor, e);
            MapSnapshot::empty(e.placeholder_text())
        }
    }
}

/// Decode and render in one call
pub fn process_map(
    vendor: Vendor,
    raw: &[u8],
    palette: &ColorPalette,
    config: &RenderConfig,
) -> RenderedMap {
    let snapshot = decode_map(vendor, raw, palette, config);
    render_map(&snapshot, palette, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_garbage_yields_empty_snapshot() {
        let palette = ColorPalette::new();
        let config = RenderConfig::default();
        for vendor in Vendor::ALL {
            let snapshot = decode_map(vendor, b"\x00\x01garbage", &palette, &config);
            assert!(snapshot.image.is_empty(), "{} produced an image", vendor);
            assert!(snapshot.image.message.is_some());
        }
    }

    #[test]
    fn test_process_map_renders_placeholder() {
        let palette = ColorPalette::new();
        let config = RenderConfig::default();
        let rendered = process_map(Vendor::Dreame, b"", &palette, &config);
        assert_eq!(rendered.image.dimensions(), crate::core::EMPTY_MAP_SIZE);
        assert!(rendered.attributes.is_empty);
    }
}
