//! Render orchestration: snapshot in, RGBA image and attributes out.
//!
//! ```text
//!   MapSnapshot ─┬─ image empty? ──► placeholder (background + status text)
//!                │
//!                └─ base raster ─► clone ─► nearest-neighbour scale ─► Canvas
//!                                                                     │
//!      paths → no-go → no-mop → walls → zones → charger → obstacles   │
//!      → vacuum → room names → user texts ◄───────────────────────────┘
//!                                                                     │
//!                                                 rotate ─► RenderedMap
//! ```
//!
//! Rendering never mutates the snapshot, so the same snapshot renders to
//! byte-identical output every time.

mod attributes;
mod canvas;
pub mod draw;
pub mod font;

pub use attributes::{ImageAttributes, MapAttributes};
pub use canvas::{blend_over, downsample_box, Canvas};

use std::io::Cursor;
use std::path::Path as FsPath;

use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbaImage};

use crate::config::{Color, ColorKey, ColorPalette, Drawable, RenderConfig, Rotation};
use crate::core::{Area, ImageDimensions, ImagePoint, MapSnapshot, Obstacle, Path, EMPTY_MAP_SIZE};
use crate::error::Result;

/// Magnification of the placeholder status text
const PLACEHOLDER_FONT_SIZE: u32 = 2;

/// Name of the overlay holding room labels
const ROOM_NAMES_LAYER: &str = "room_names";

/// Final image plus structured attributes
#[derive(Clone, Debug)]
pub struct RenderedMap {
    pub image: RgbaImage,
    pub attributes: MapAttributes,
}

impl RenderedMap {
    /// Encode the image as PNG
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        Ok(buf)
    }

    /// Encode the image as PNG and write it to `path`
    pub fn save_png(&self, path: &FsPath) -> Result<()> {
        std::fs::write(path, self.to_png()?)?;
        Ok(())
    }
}

/// Draws snapshots with a fixed palette and configuration
#[derive(Clone, Copy, Debug)]
pub struct MapRenderer<'a> {
    palette: &'a ColorPalette,
    config: &'a RenderConfig,
}

impl<'a> MapRenderer<'a> {
    pub fn new(palette: &'a ColorPalette, config: &'a RenderConfig) -> Self {
        Self { palette, config }
    }

    /// Render a snapshot.
    ///
    /// An empty snapshot yields the status placeholder and skips every
    /// overlay.
    pub fn render(&self, snapshot: &MapSnapshot) -> RenderedMap {
        let attributes = MapAttributes::from_snapshot(snapshot);
        let image = match &snapshot.image.raster {
            Some(raster) if !snapshot.image.dimensions.is_degenerate() => {
                self.render_map(snapshot, raster)
            }
            _ => self.placeholder(snapshot.image.message.as_deref().unwrap_or("NO MAP")),
        };
        RenderedMap { image, attributes }
    }

    /// Background filled with the outside colour and a centred message
    pub fn placeholder(&self, message: &str) -> RgbaImage {
        let (w, h) = EMPTY_MAP_SIZE;
        let background = self.palette.get(ColorKey::MapOutside);
        let ink = if background.brightness() > 382 {
            Color::rgb(0, 0, 0)
        } else {
            Color::rgb(255, 255, 255)
        };
        let mut canvas = Canvas::filled(w, h, background);
        canvas.paint(&[ink], |img| {
            font::draw_text_centered(
                img,
                message,
                w as f32 / 2.0,
                h as f32 / 2.0,
                PLACEHOLDER_FONT_SIZE,
                ink.to_rgba(),
            )
        });
        canvas.into_image()
    }

    fn enabled(&self, drawable: Drawable) -> bool {
        self.config.drawables.contains(drawable)
    }

    fn color(&self, key: ColorKey) -> Color {
        self.palette.get(key)
    }

    fn render_map(&self, snapshot: &MapSnapshot, raster: &RgbaImage) -> RgbaImage {
        let dims = &snapshot.image.dimensions;
        let (w, h) = dims.scaled_size();
        let base = if raster.dimensions() == (w, h) {
            raster.clone()
        } else {
            imageops::resize(raster, w, h, FilterType::Nearest)
        };
        let mut canvas = Canvas::new(base);

        self.draw_paths(&mut canvas, snapshot, dims);
        self.draw_areas(&mut canvas, snapshot, dims);
        self.draw_walls(&mut canvas, snapshot, dims);
        self.draw_zones(&mut canvas, snapshot, dims);
        self.draw_charger(&mut canvas, snapshot, dims);
        self.draw_obstacles(&mut canvas, snapshot, dims);
        self.draw_vacuum(&mut canvas, snapshot, dims);
        self.draw_room_names(&mut canvas, snapshot, dims);
        self.draw_texts(&mut canvas);

        rotate(&mut canvas, dims.rotation);
        canvas.into_image()
    }

    // ========================================================================
    // Overlays
    // ========================================================================

    fn draw_paths(&self, canvas: &mut Canvas, snapshot: &MapSnapshot, dims: &ImageDimensions) {
        let factor = (dims.scale.round() as u32).max(1);
        let width = self.config.sizes.path_width * factor as f32;
        let paths = [
            (Drawable::Path, &snapshot.path, ColorKey::Path),
            (Drawable::GotoPath, &snapshot.goto_path, ColorKey::GotoPath),
            (Drawable::PredictedPath, &snapshot.predicted_path, ColorKey::PredictedPath),
        ];
        for (drawable, path, key) in paths {
            let Some(path) = path.as_ref().filter(|_| self.enabled(drawable)) else {
                continue;
            };
            let runs = oversampled_runs(path, dims, factor as f32);
            if runs.is_empty() {
                continue;
            }
            let color = self.color(key);
            canvas.paint_oversampled(factor, &[color], |img| {
                for run in &runs {
                    draw::polyline(img, run, width, color.to_rgba());
                }
            });
        }
    }

    fn draw_areas(&self, canvas: &mut Canvas, snapshot: &MapSnapshot, dims: &ImageDimensions) {
        let groups = [
            (
                Drawable::NoGoZones,
                &snapshot.no_go_areas,
                ColorKey::NoGoZones,
                ColorKey::NoGoZonesOutline,
            ),
            (
                Drawable::NoMoppingZones,
                &snapshot.no_mopping_areas,
                ColorKey::NoMopZones,
                ColorKey::NoMopZonesOutline,
            ),
        ];
        for (drawable, areas, fill, outline) in groups {
            if !self.enabled(drawable) {
                continue;
            }
            for area in areas {
                self.draw_area(canvas, area, dims, fill, outline);
            }
        }
    }

    fn draw_area(
        &self,
        canvas: &mut Canvas,
        area: &Area,
        dims: &ImageDimensions,
        fill: ColorKey,
        outline: ColorKey,
    ) {
        let points = area.to_image(dims);
        let (fill, outline) = (self.color(fill), self.color(outline));
        canvas.paint(&[fill, outline], |img| {
            draw::polygon(img, &points, Some(fill.to_rgba()), Some(outline.to_rgba()))
        });
    }

    fn draw_walls(&self, canvas: &mut Canvas, snapshot: &MapSnapshot, dims: &ImageDimensions) {
        if !self.enabled(Drawable::VirtualWalls) || snapshot.walls.is_empty() {
            return;
        }
        let color = self.color(ColorKey::VirtualWalls);
        let width = self.config.sizes.virtual_wall_width;
        for wall in &snapshot.walls {
            let [a, b] = wall.to_image(dims);
            canvas.paint(&[color], |img| draw::line(img, a, b, width, color.to_rgba()));
        }
    }

    fn draw_zones(&self, canvas: &mut Canvas, snapshot: &MapSnapshot, dims: &ImageDimensions) {
        if !self.enabled(Drawable::Zones) {
            return;
        }
        for zone in snapshot.zones.iter().filter(|z| !z.is_degenerate()) {
            self.draw_area(canvas, &zone.as_area(), dims, ColorKey::Zones, ColorKey::ZonesOutline);
        }
    }

    fn draw_charger(&self, canvas: &mut Canvas, snapshot: &MapSnapshot, dims: &ImageDimensions) {
        let Some(charger) = snapshot.charger.filter(|_| self.enabled(Drawable::Charger)) else {
            return;
        };
        let center = charger.to_image(dims);
        let angle = -charger.angle_or_zero();
        let r = self.config.sizes.charger_radius;
        let (fill, outline) = (self.color(ColorKey::Charger), self.color(ColorKey::ChargerOutline));
        canvas.paint(&[fill, outline], |img| {
            draw::pieslice(
                img,
                center,
                r,
                angle + 90.0,
                angle - 90.0,
                fill.to_rgba(),
                outline.to_rgba(),
            )
        });
    }

    fn draw_obstacles(&self, canvas: &mut Canvas, snapshot: &MapSnapshot, dims: &ImageDimensions) {
        let sizes = &self.config.sizes;
        let groups: [(Drawable, &[Obstacle], ColorKey, f32); 4] = [
            (
                Drawable::IgnoredObstacles,
                snapshot.ignored_obstacles.as_slice(),
                ColorKey::IgnoredObstacle,
                sizes.ignored_obstacle_radius,
            ),
            (
                Drawable::Obstacles,
                snapshot.obstacles.as_slice(),
                ColorKey::Obstacle,
                sizes.obstacle_radius,
            ),
            (
                Drawable::IgnoredObstaclesWithPhoto,
                snapshot.ignored_obstacles_with_photo.as_slice(),
                ColorKey::IgnoredObstacleWithPhoto,
                sizes.ignored_obstacle_with_photo_radius,
            ),
            (
                Drawable::ObstaclesWithPhoto,
                snapshot.obstacles_with_photo.as_slice(),
                ColorKey::ObstacleWithPhoto,
                sizes.obstacle_with_photo_radius,
            ),
        ];
        for (drawable, obstacles, key, radius) in groups {
            if !self.enabled(drawable) || obstacles.is_empty() {
                continue;
            }
            let color = self.color(key);
            for obstacle in obstacles {
                let center = obstacle.position.to_image(dims);
                canvas.paint(&[color], |img| {
                    draw::circle(img, center, radius, Some(color.to_rgba()), Some(color.to_rgba()))
                });
            }
        }
    }

    fn draw_vacuum(&self, canvas: &mut Canvas, snapshot: &MapSnapshot, dims: &ImageDimensions) {
        let Some(pose) = snapshot
            .vacuum_position
            .filter(|_| self.enabled(Drawable::VacuumPosition))
        else {
            return;
        };
        let center = pose.to_image(dims);
        let (fill, outline) = (self.color(ColorKey::Robo), self.color(ColorKey::RoboOutline));
        let r = self.config.sizes.vacuum_radius;
        canvas.paint(&[fill, outline], |img| {
            draw::robot(img, center, pose.angle_or_zero(), r, fill.to_rgba(), outline.to_rgba())
        });
    }

    fn draw_room_names(&self, canvas: &mut Canvas, snapshot: &MapSnapshot, dims: &ImageDimensions) {
        if !self.enabled(Drawable::RoomNames) {
            return;
        }
        let named: Vec<_> = snapshot
            .rooms
            .values()
            .filter_map(|room| Some((room.name.as_deref()?, room.label_point())))
            .collect();
        if named.is_empty() {
            return;
        }
        let ink = self.color(ColorKey::RoomNames).to_rgba();
        let mut layer = RgbaImage::new(canvas.width(), canvas.height());
        for (name, label) in named {
            let at = label.to_image(dims);
            font::draw_text_centered(&mut layer, name, at.x, at.y, 1, ink);
        }
        canvas.add_layer(ROOM_NAMES_LAYER, layer);
        canvas.composite_layer(ROOM_NAMES_LAYER);
    }

    fn draw_texts(&self, canvas: &mut Canvas) {
        let (w, h) = (canvas.width() as f32, canvas.height() as f32);
        for text in &self.config.texts {
            let (cx, cy) = (text.x / 100.0 * w, text.y / 100.0 * h);
            let color = text.color;
            canvas.paint(&[color], |img| {
                font::draw_text_centered(img, &text.text, cx, cy, text.font_size, color.to_rgba())
            });
        }
    }
}

/// Project path runs into an image `factor` times larger, dropping runs
/// too short to draw
fn oversampled_runs(path: &Path, dims: &ImageDimensions, factor: f32) -> Vec<Vec<ImagePoint>> {
    path.to_image(dims)
        .into_iter()
        .filter(|run| run.len() >= 2)
        .map(|run| {
            run.into_iter()
                .map(|p| ImagePoint::new(p.x * factor, p.y * factor))
                .collect()
        })
        .collect()
}

/// Whole-image counter-clockwise rotation
fn rotate(canvas: &mut Canvas, rotation: Rotation) {
    match rotation {
        Rotation::None => {}
        Rotation::Ccw90 => canvas.map_image(|img| imageops::rotate270(img)),
        Rotation::Half => canvas.map_image(|img| imageops::rotate180(img)),
        Rotation::Ccw270 => canvas.map_image(|img| imageops::rotate90(img)),
    }
}

/// Render a snapshot in one call
pub fn render_map(snapshot: &MapSnapshot, palette: &ColorPalette, config: &RenderConfig) -> RenderedMap {
    MapRenderer::new(palette, config).render(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DrawableSet, TextOverlay};
    use crate::core::{MapImage, Point, Projection, Wall, Zone};
    use image::Rgba;

    const INSIDE: Rgba<u8> = Rgba([32, 115, 185, 255]);

    /// 20x20 raster, 1 unit per pixel, Y up, origin at 0
    fn snapshot() -> MapSnapshot {
        let raster = RgbaImage::from_pixel(20, 20, INSIDE);
        let dims = ImageDimensions::new(0, 0, 20, 20, Projection::up(1.0));
        MapSnapshot {
            image: MapImage::new(raster, dims, 400),
            ..Default::default()
        }
    }

    fn render(snapshot: &MapSnapshot, config: &RenderConfig) -> RenderedMap {
        render_map(snapshot, &ColorPalette::new(), config)
    }

    #[test]
    fn test_placeholder_for_empty_snapshot() {
        let palette = ColorPalette::new().with_color(ColorKey::MapOutside, Color::rgb(255, 255, 255));
        let config = RenderConfig::default();
        let out = render_map(&MapSnapshot::empty("FAILED TO PARSE MAP"), &palette, &config);
        assert_eq!(out.image.dimensions(), EMPTY_MAP_SIZE);
        assert!(out.attributes.is_empty);
        // Bright background gets black text
        assert!(out.image.pixels().any(|p| *p == Rgba([0, 0, 0, 255])));
        assert_eq!(*out.image.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_dark_placeholder_uses_white_text() {
        let palette = ColorPalette::new().with_color(ColorKey::MapOutside, Color::rgb(10, 10, 10));
        let out = render_map(&MapSnapshot::empty("NO MAP"), &palette, &RenderConfig::default());
        assert!(out.image.pixels().any(|p| *p == Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut s = snapshot();
        s.path = Some(Path::single(vec![Point::new(2.0, 2.0), Point::new(15.0, 12.0)]));
        s.vacuum_position = Some(Point::with_angle(10.0, 10.0, 30.0));
        s.charger = Some(Point::with_angle(3.0, 3.0, 90.0));
        s.no_go_areas.push(Zone::new(1.0, 1.0, 6.0, 6.0).as_area());
        let config = RenderConfig::default().with_scale(2.0);
        s.image.dimensions = s.image.dimensions.with_output(2.0, Rotation::None);

        let first = render(&s, &config);
        let second = render(&s, &config);
        assert_eq!(first.image.as_raw(), second.image.as_raw());
        assert_eq!(first.image.dimensions(), (40, 40));
        // Snapshot raster untouched
        assert!(s.image.raster.as_ref().unwrap().pixels().all(|p| *p == INSIDE));
    }

    #[test]
    fn test_drawables_gate_overlays() {
        let mut s = snapshot();
        s.walls.push(Wall::new(0.0, 10.0, 19.0, 10.0));
        let none = RenderConfig::default().with_drawables(DrawableSet::none());
        let out = render(&s, &none);
        assert!(out.image.pixels().all(|p| *p == INSIDE));

        let out = render(&s, &RenderConfig::default());
        assert!(out.image.pixels().any(|p| *p != INSIDE));
    }

    #[test]
    fn test_degenerate_geometry_is_noop() {
        let mut s = snapshot();
        s.zones.push(Zone::new(5.0, 5.0, 5.0, 12.0));
        s.path = Some(Path::single(vec![Point::new(4.0, 4.0)]));
        let out = render(&s, &RenderConfig::default());
        assert!(out.image.pixels().all(|p| *p == INSIDE));
    }

    #[test]
    fn test_rotation_applied_last() {
        let mut s = snapshot();
        // Wide raster so the rotation is visible in the size
        s.image = MapImage::new(
            RgbaImage::from_pixel(30, 10, INSIDE),
            ImageDimensions::new(0, 0, 30, 10, Projection::up(1.0)).with_output(1.0, Rotation::Ccw90),
            300,
        );
        s.obstacles.push(Obstacle::at(Point::new(0.0, 9.0)));
        let out = render(&s, &RenderConfig::default());
        assert_eq!(out.image.dimensions(), (10, 30));

        // Obstacle at image (0, 0) lands at the bottom-left corner
        let obstacle = ColorPalette::new().get(ColorKey::Obstacle).to_rgba();
        let calibrated = s.image.dimensions.rotate_point(ImagePoint::new(0.0, 0.0));
        assert_eq!(calibrated, ImagePoint::new(0.0, 29.0));
        assert_eq!(*out.image.get_pixel(0, 29), blend_over(INSIDE, obstacle));
        assert_eq!(*out.image.get_pixel(9, 0), INSIDE);
    }

    #[test]
    fn test_user_text_centered_on_position() {
        let s = snapshot();
        let config = RenderConfig::default().with_text(TextOverlay::new("I", 50.0, 50.0));
        let out = render(&s, &config);
        // 5x7 glyph centred on (10, 10) spans x 8..=12, y 7..=13
        let ink = Rgba([0, 0, 0, 255]);
        assert_eq!(*out.image.get_pixel(9, 7), ink);
        assert_eq!(*out.image.get_pixel(10, 8), ink);
        assert_eq!(*out.image.get_pixel(9, 13), ink);
        assert_eq!(*out.image.get_pixel(10, 14), INSIDE);
        assert_eq!(*out.image.get_pixel(10, 6), INSIDE);
    }

    #[test]
    fn test_charger_outline_is_black() {
        let mut s = snapshot();
        s.charger = Some(Point::new(10.0, 9.0));
        let out = render(&s, &RenderConfig::default());
        // Slice edges at +-90 degrees form a vertical diameter
        let black = Rgba([0, 0, 0, 255]);
        assert_eq!(*out.image.get_pixel(10, 13), black);
        assert_eq!(*out.image.get_pixel(10, 7), black);
    }

    #[test]
    fn test_to_png_signature() {
        let out = render(&snapshot(), &RenderConfig::default());
        let png = out.to_png().unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
