//! Raster decoding: vendor pixel dialects and the room/segment classifier.

mod classifier;
mod dialect;

pub use classifier::{
    class_color, grid_box_to_map, room_at, scan_raster, RasterLayout, RasterScan,
    RoomAccumulator,
};
pub use dialect::{
    viomi_bands, DreameRegularPixels, DreameRismPixels, PixelClass, PixelDialect, RoborockPixels,
    RoidmiPixels, RoomIdBands, ViomiPixels,
};
