//! Property tests for geometry, trim, room aggregation and decoding of
//! hostile input.

mod common;

use proptest::prelude::*;

use chitra_map::config::{Rotation, TrimConfig};
use chitra_map::parsers::valetudo::{CELLS_PER_INPUT_BYTE, MAX_GRID_SIDE};
use chitra_map::{decode_map, render_map, ColorPalette, RenderConfig, Vendor};
use chitra_map::core::{ImageDimensions, Point, Projection, TrimPixels, MIN_TRIMMED_SIZE};
use chitra_map::raster::RoomAccumulator;

proptest! {
    #[test]
    fn test_project_roundtrip(
        x in -50_000.0f32..50_000.0,
        y in -50_000.0f32..50_000.0,
        left in -1000i32..1000,
        top in -1000i32..1000,
        width in 1i32..2000,
        height in 1i32..2000,
        unit in prop::sample::select(vec![1.0f32, 5.0, 50.0]),
        up in any::<bool>(),
    ) {
        let projection = if up { Projection::up(unit) } else { Projection::down(unit) };
        let dims = ImageDimensions::new(left, top, width, height, projection);
        let p = Point::new(x, y).to_image(&dims);
        let (bx, by) = dims.unproject(p);
        let tolerance = 1e-3 * (1.0 + x.abs().max(y.abs()));
        prop_assert!((bx - x).abs() <= tolerance, "x {} -> {}", x, bx);
        prop_assert!((by - y).abs() <= tolerance, "y {} -> {}", y, by);
    }

    #[test]
    fn test_trim_keeps_positive_size(
        width in 1i32..3000,
        height in 1i32..3000,
        left in 0.0f32..99.0,
        top in 0.0f32..99.0,
        right_share in 0.0f32..1.0,
        bottom_share in 0.0f32..1.0,
    ) {
        let trim = TrimConfig {
            left,
            right: (99.9 - left) * right_share,
            top,
            bottom: (99.9 - top) * bottom_share,
        };
        prop_assume!(trim.validate().is_ok());

        let px = TrimPixels::resolve(&trim, width, height);
        let dims = ImageDimensions::trimmed(0, 0, width, height, Projection::up(50.0), &px);
        prop_assert!(dims.width > 0);
        prop_assert!(dims.height > 0);
        // Either the axis keeps the minimum size or its trim was dropped
        prop_assert!(dims.width >= MIN_TRIMMED_SIZE || dims.width == width);
        prop_assert!(dims.height >= MIN_TRIMMED_SIZE || dims.height == height);
    }

    #[test]
    fn test_room_boxes_order_independent(
        pixels in prop::collection::vec((1u32..6, 0u16..500, 0u16..500), 1..200),
        seed in any::<u64>(),
    ) {
        let mut forward = RoomAccumulator::new();
        for &(id, x, y) in &pixels {
            forward.add(id, x as f32, y as f32);
        }

        // Deterministic shuffle driven by the seed
        let mut shuffled = pixels.clone();
        let mut state = seed | 1;
        for i in (1..shuffled.len()).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            shuffled.swap(i, (state % (i as u64 + 1)) as usize);
        }
        let mut backward = RoomAccumulator::new();
        for &(id, x, y) in shuffled.iter().rev() {
            backward.add(id, x as f32, y as f32);
        }

        // Split in two halves and merge
        let (a, b) = pixels.split_at(pixels.len() / 2);
        let mut left_half = RoomAccumulator::new();
        let mut right_half = RoomAccumulator::new();
        for &(id, x, y) in a {
            left_half.add(id, x as f32, y as f32);
        }
        for &(id, x, y) in b {
            right_half.add(id, x as f32, y as f32);
        }
        right_half.merge(&left_half);

        prop_assert_eq!(forward.boxes(), backward.boxes());
        prop_assert_eq!(forward.boxes(), right_half.boxes());
    }
}

#[test]
fn test_rotation_is_whole_image() {
    let dims = ImageDimensions::new(0, 0, 10, 4, Projection::up(1.0))
        .with_output(1.0, Rotation::Ccw90);
    // Counter-clockwise: top-left goes to the bottom-left of the 4x10 image
    let p = dims.rotate_point(chitra_map::core::ImagePoint::new(0.0, 0.0));
    assert_eq!((p.x, p.y), (0.0, 9.0));
}

fn path_operators(ops: &[(bool, i64, i64)]) -> String {
    ops.iter()
        .map(|(start, x, y)| format!("{}{},{}", if *start { 'S' } else { 'L' }, x, y))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_valetudo_pixels_stay_bounded(
        wild in prop::collection::vec((any::<i64>(), any::<i64>(), any::<i64>()), 0..3),
        near in prop::collection::vec((-3000i64..3000, -3000i64..3000, -10i64..5000), 0..6),
    ) {
        let pixels: Vec<i64> = wild
            .iter()
            .chain(&near)
            .flat_map(|&(x, y, count)| [x, y, count])
            .collect();
        let doc = serde_json::json!({
            "pixelSize": 5,
            "entities": [],
            "layers": [{"type": "floor", "compressedPixels": pixels}]
        });
        let raw = serde_json::to_vec(&doc).unwrap();
        let snapshot = decode_map(Vendor::Valetudo, &raw, &ColorPalette::new(), &RenderConfig::default());
        if !snapshot.image.is_empty() {
            let d = snapshot.image.dimensions;
            prop_assert!(d.width as i64 <= MAX_GRID_SIDE && d.height as i64 <= MAX_GRID_SIDE);
            prop_assert!(d.width as u64 * d.height as u64 <= (raw.len() * CELLS_PER_INPUT_BYTE) as u64);
        }
    }

    #[test]
    fn test_dreame_paths_never_panic(
        ops in prop::collection::vec((any::<bool>(), any::<i64>(), any::<i64>()), 1..6),
    ) {
        let trailer = serde_json::json!({"tr": path_operators(&ops)}).to_string();
        let raw = common::dreame_envelope(&common::dreame_frame(4, 4, &[1; 16], &trailer));
        let palette = ColorPalette::new();
        let config = RenderConfig::default();
        let snapshot = decode_map(Vendor::Dreame, &raw, &palette, &config);
        let rendered = render_map(&snapshot, &palette, &config);
        prop_assert!(rendered.image.width() > 0 && rendered.image.height() > 0);
    }
}
