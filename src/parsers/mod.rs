//! Vendor map parsers.
//!
//! Every vendor format implements [`MapParser`]; dispatch goes through the
//! static table behind [`parser_for`], keyed by [`Vendor`]:
//!
//! ```text
//!   Vendor::Roborock  ─► RoborockParser   gzip, block-framed binary
//!   Vendor::Viomi     ─► ViomiParser      zlib, feature-flag sections
//!   Vendor::Roidmi    ─► RoidmiParser     gzip, raster + JSON trailer
//!   Vendor::Dreame    ─► DreameParser     base64 + zlib, header + raster + JSON
//!   Vendor::Valetudo  ─► ValetudoParser   JSON entities and layers
//! ```
//!
//! Parsers are stateless and re-entrant. The only cross-call state (the
//! Dreame map-name stamp) lives in [`dreame::DreameSession`], owned by the
//! caller.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{ColorPalette, RenderConfig};
use crate::core::{ImageDimensions, MapImage, MapSnapshot, Projection, TrimPixels};
use crate::error::Result;
use crate::raster::{scan_raster, PixelDialect, RasterLayout, RoomAccumulator};

pub mod dreame;
pub mod roborock;
pub mod roidmi;
pub mod valetudo;
pub mod viomi;

pub use dreame::{DreameParser, DreameSession};
pub use roborock::RoborockParser;
pub use roidmi::RoidmiParser;
pub use valetudo::ValetudoParser;
pub use viomi::ViomiParser;

/// Everything a parser needs besides the payload
#[derive(Clone, Copy, Debug)]
pub struct ParseContext<'a> {
    pub palette: &'a ColorPalette,
    pub config: &'a RenderConfig,
}

impl<'a> ParseContext<'a> {
    /// Bundle palette and render configuration
    pub fn new(palette: &'a ColorPalette, config: &'a RenderConfig) -> Self {
        Self { palette, config }
    }
}

/// Vendor map format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vendor {
    Roborock,
    Viomi,
    Roidmi,
    Dreame,
    Valetudo,
}

impl Vendor {
    /// Every supported vendor
    pub const ALL: [Vendor; 5] = [
        Vendor::Roborock,
        Vendor::Viomi,
        Vendor::Roidmi,
        Vendor::Dreame,
        Vendor::Valetudo,
    ];

    /// Lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Vendor::Roborock => "roborock",
            Vendor::Viomi => "viomi",
            Vendor::Roidmi => "roidmi",
            Vendor::Dreame => "dreame",
            Vendor::Valetudo => "valetudo",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Vendor {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            // Xiaomi-branded Roborock models use the same format
            "roborock" | "xiaomi" => Ok(Vendor::Roborock),
            "viomi" => Ok(Vendor::Viomi),
            "roidmi" => Ok(Vendor::Roidmi),
            "dreame" => Ok(Vendor::Dreame),
            "valetudo" => Ok(Vendor::Valetudo),
            _ => Err(format!("unknown vendor '{}'", s)),
        }
    }
}

/// One vendor map format
pub trait MapParser: Send + Sync {
    /// Vendor this parser handles
    fn vendor(&self) -> Vendor;

    /// Strip the transport envelope (compression, base64)
    fn unpack(&self, raw: &[u8]) -> Result<Vec<u8>>;

    /// Decode an unpacked payload
    fn parse(&self, data: &[u8], ctx: &ParseContext<'_>) -> Result<MapSnapshot>;

    /// Unpack then parse
    fn decode(&self, raw: &[u8], ctx: &ParseContext<'_>) -> Result<MapSnapshot> {
        let data = self.unpack(raw)?;
        self.parse(&data, ctx)
    }
}

static ROBOROCK: RoborockParser = RoborockParser;
static VIOMI: ViomiParser = ViomiParser;
static ROIDMI: RoidmiParser = RoidmiParser;
static DREAME: DreameParser = DreameParser;
static VALETUDO: ValetudoParser = ValetudoParser;

/// Parser for a vendor
pub fn parser_for(vendor: Vendor) -> &'static dyn MapParser {
    match vendor {
        Vendor::Roborock => &ROBOROCK,
        Vendor::Viomi => &VIOMI,
        Vendor::Roidmi => &ROIDMI,
        Vendor::Dreame => &DREAME,
        Vendor::Valetudo => &VALETUDO,
    }
}

/// Message shown when a raster has no pixels
pub(crate) const EMPTY_RASTER_MESSAGE: &str = "EMPTY MAP";

/// Raw raster anchored in map space
pub(crate) struct RasterSource<'a> {
    pub pixels: &'a [u8],
    pub layout: RasterLayout,
    /// Grid column of the first raw column
    pub left: i32,
    /// Grid row of the first raw row
    pub top: i32,
    pub unit_scale: f32,
}

/// Trim, classify and paint a raster into a [`MapImage`].
///
/// A raster with no pixels yields an empty image rather than an error.
pub(crate) fn build_image<D: PixelDialect + ?Sized>(
    source: &RasterSource<'_>,
    dialect: &D,
    ctx: &ParseContext<'_>,
) -> Result<(MapImage, RoomAccumulator)> {
    let layout = source.layout;
    if layout.is_empty() {
        log::warn!("Raster has no pixels ({}x{})", layout.width, layout.height);
        return Ok((MapImage::empty(EMPTY_RASTER_MESSAGE), RoomAccumulator::new()));
    }

    let trim = TrimPixels::resolve(&ctx.config.trim, layout.width as i32, layout.height as i32);
    let scan = scan_raster(source.pixels, layout, &trim, dialect, ctx.palette)?;
    let projection = Projection {
        unit_scale: source.unit_scale,
        y_axis: layout.y_axis,
    };
    let dimensions = ImageDimensions::trimmed(
        source.left,
        source.top,
        layout.width as i32,
        layout.height as i32,
        projection,
        &trim,
    )
    .with_output(ctx.config.scale, ctx.config.rotation);

    Ok((
        MapImage::new(scan.image, dimensions, layout.len()),
        scan.rooms,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_names() {
        for vendor in Vendor::ALL {
            assert_eq!(vendor.name().parse::<Vendor>().unwrap(), vendor);
            assert_eq!(parser_for(vendor).vendor(), vendor);
        }
        assert_eq!("Xiaomi".parse::<Vendor>().unwrap(), Vendor::Roborock);
        assert!("neato".parse::<Vendor>().is_err());
    }
}
