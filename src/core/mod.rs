//! Core map model shared by every parser and the renderer.
//!
//! ## Coordinate Spaces
//!
//! - **Map space**: vendor units (usually millimetres), Y up for most
//!   vendors. [`Point`], [`Area`], [`Wall`], [`Zone`], [`Path`] live here.
//! - **Grid space**: one unit per raster pixel; `unit_scale` vendor units
//!   per pixel ([`Projection`]).
//! - **Image space**: [`ImagePoint`] on the scaled output, Y down.
//!
//! [`ImageDimensions`] carries everything needed to go from map space to
//! image space.
//!
//! ## Type Categories
//!
//! ### Geometry
//! - [`Point`], [`ImagePoint`]
//! - [`Area`], [`Wall`], [`Zone`], [`Path`]
//!
//! ### Semantics
//! - [`Room`] with its [`BoundingBox`]
//! - [`Obstacle`]
//!
//! ### Result
//! - [`MapImage`], [`MapSnapshot`], [`CalibrationPoint`]

mod dimensions;
mod obstacle;
mod point;
mod room;
mod shapes;
mod snapshot;

pub use dimensions::{ImageDimensions, Projection, TrimPixels, YAxis, MIN_TRIMMED_SIZE};
pub use obstacle::{obstacle_description, Obstacle};
pub use point::{ImagePoint, Point};
pub use room::{BoundingBox, Room};
pub use shapes::{Area, Path, Wall, Zone};
pub use snapshot::{
    CalibrationPoint, MapHeader, MapImage, MapSnapshot, CALIBRATION_POINTS, EMPTY_MAP_SIZE,
};
