//! Decode-then-render pipeline behaviour.

mod common;

use image::{imageops, Rgba, RgbaImage};

use chitra_map::config::{Color, ColorKey, DrawableSet, Rotation, TextOverlay};
use chitra_map::core::ImagePoint;
use chitra_map::render::{draw, Canvas};
use chitra_map::{decode_map, process_map, render_map, ColorPalette, RenderConfig, Vendor};

fn furnished(config: &RenderConfig) -> (chitra_map::MapSnapshot, ColorPalette) {
    let palette = ColorPalette::new();
    let raw = common::gzip(&common::roborock_furnished());
    (decode_map(Vendor::Roborock, &raw, &palette, config), palette)
}

#[test]
fn test_render_twice_is_identical() {
    let config = RenderConfig::default()
        .with_scale(2.0)
        .with_rotation(Rotation::Ccw90)
        .with_text(TextOverlay::new("Ground floor", 5.0, 5.0));
    let (snapshot, palette) = furnished(&config);

    let first = render_map(&snapshot, &palette, &config);
    let second = render_map(&snapshot, &palette, &config);
    assert_eq!(first.image.as_raw(), second.image.as_raw());
    assert_eq!(first.attributes, second.attributes);
    assert_eq!(first.image.dimensions(), (80, 80));
}

#[test]
fn test_no_drawables_keeps_scaled_base() {
    let config = RenderConfig::default()
        .with_scale(3.0)
        .with_drawables(DrawableSet::none());
    let (snapshot, palette) = furnished(&config);
    let rendered = render_map(&snapshot, &palette, &config);

    let base = snapshot.image.raster.as_ref().unwrap();
    let expected = imageops::resize(base, 120, 120, imageops::FilterType::Nearest);
    assert_eq!(rendered.image.as_raw(), expected.as_raw());
}

#[test]
fn test_overlays_change_pixels() {
    let config = RenderConfig::default();
    let (snapshot, palette) = furnished(&config);
    let rendered = render_map(&snapshot, &palette, &config);
    let base = snapshot.image.raster.as_ref().unwrap();
    assert_ne!(rendered.image.as_raw(), base.as_raw());

    // Vacuum body is drawn at its projected position
    let at = snapshot
        .vacuum_position
        .unwrap()
        .to_image(&snapshot.image.dimensions);
    let pixel = *rendered.image.get_pixel(at.x as u32, at.y as u32 + 2);
    assert_ne!(pixel, *base.get_pixel(at.x as u32, at.y as u32 + 2));
}

#[test]
fn test_rotation_swaps_dimensions() {
    let palette = ColorPalette::new();
    let config = RenderConfig::default().with_rotation(Rotation::Ccw270);
    let raw = common::gzip(&common::roborock_map(&[
        common::roborock_image(500, 500, 30, 20, &[0; 600]),
        common::roborock_digest(),
    ]));
    let rendered = process_map(Vendor::Roborock, &raw, &palette, &config);
    assert_eq!(rendered.image.dimensions(), (20, 30));

    // Calibration follows the rotation
    let points = &rendered.attributes.calibration_points;
    assert_eq!(points.len(), 3);
}

#[test]
fn test_translucent_layers_compose_alpha() {
    let fill = Color::rgba(0, 128, 255, 128);
    let mut canvas = Canvas::new(RgbaImage::new(16, 16));
    for _ in 0..2 {
        canvas.paint(&[fill], |img| {
            draw::circle(img, ImagePoint::new(8.0, 8.0), 5.0, Some(fill.to_rgba()), None)
        });
    }
    let alpha = canvas.image().get_pixel(8, 8)[3] as f32 / 255.0;
    let a = 128.0 / 255.0;
    let expected = 1.0 - (1.0 - a) * (1.0 - a);
    assert!((alpha - expected).abs() <= 1.0 / 255.0, "alpha {}", alpha);
}

#[test]
fn test_failed_decode_renders_placeholder() {
    let palette = ColorPalette::new().with_color(ColorKey::MapOutside, Color::rgb(250, 250, 250));
    let rendered = process_map(Vendor::Roborock, b"rr", &palette, &RenderConfig::default());
    assert_eq!(rendered.image.dimensions(), (300, 200));
    assert!(rendered.attributes.is_empty);
    assert!(rendered.image.pixels().any(|p| *p == Rgba([0, 0, 0, 255])));
}

#[test]
fn test_png_and_json_outputs() {
    let config = RenderConfig::default();
    let (snapshot, palette) = furnished(&config);
    let rendered = render_map(&snapshot, &palette, &config);

    let dir = tempfile::tempdir().unwrap();
    let png = dir.path().join("map.png");
    rendered.save_png(&png).unwrap();
    let decoded = image::open(&png).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), rendered.image.dimensions());

    let json: serde_json::Value =
        serde_json::from_str(&rendered.attributes.to_json().unwrap()).unwrap();
    assert_eq!(json["room_numbers"], serde_json::json!([2, 5]));
    assert_eq!(json["vacuum_room"], 5);
}
