//! Render and style configuration.
//!
//! Loads all style configuration from a single TOML file with sensible
//! defaults. Every field is optional.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chitra_map::config::MapConfig;
//!
//! let config = MapConfig::load(Path::new("map.toml"))?;
//! let render_config = config.render_config();
//! let palette = config.palette()?;
//! ```
//!
//! ## Configuration Sections
//!
//! | Section | Description |
//! |---------|-------------|
//! | `drawables` | Enabled overlays (`all`, `path`, `charger`, ...) |
//! | [`ImageSection`] | Scale, rotation, trim percentages |
//! | `colors` | [`ColorKey`] overrides |
//! | `room_colors` | Per-room colour overrides |
//! | [`Sizes`] | Radii and line widths |
//! | [`TextOverlay`] | User texts |
//!
//! ## Example TOML
//!
//! ```toml
//! drawables = ["all"]
//!
//! [image]
//! scale = 3.0
//! rotate = 180
//!
//! [image.trim]
//! left = 10.0     # percent
//! right = 5.0
//!
//! [colors]
//! map_outside = [0, 0, 0, 0]
//!
//! [sizes]
//! vacuum_radius = 8.0
//!
//! [[texts]]
//! text = "Living room"
//! x = 50.0        # percent of width
//! y = 5.0
//! ```

mod color;
mod defaults;
mod drawable;
mod error;
mod map_config;
mod render;

pub use color::{Color, ColorKey, ColorPalette, RoomColorIndex, ROOM_COLORS};
pub use drawable::{Drawable, DrawableSet, Sizes, TextOverlay};
pub use error::ConfigLoadError;
pub use map_config::{ImageSection, MapConfig};
pub use render::{RenderConfig, Rotation, TrimConfig};
