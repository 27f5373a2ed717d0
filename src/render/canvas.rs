//! Layered RGBA compositor.
//!
//! ```text
//!   opaque primitive ───────────────────────────────► base raster
//!
//!   translucent primitive ─► empty layer ─┐
//!                                         ├─ over ──► base raster
//!   oversampled primitive ─► N× layer ─► box ─┘
//! ```
//!
//! Drawing a translucent colour straight onto an opaque raster replaces
//! pixels instead of blending them. Each such primitive is isolated on its
//! own transparent layer which is then composited with the Porter-Duff
//! "over" operator, so overlapping translucent shapes accumulate alpha
//! as `1 - (1 - a)^2`.

use std::collections::BTreeMap;

use image::{Rgba, RgbaImage};

use crate::config::Color;

/// Base raster plus named pre-rendered overlays
#[derive(Clone, Debug)]
pub struct Canvas {
    image: RgbaImage,
    layers: BTreeMap<String, RgbaImage>,
}

impl Canvas {
    /// Canvas over an existing raster
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image,
            layers: BTreeMap::new(),
        }
    }

    /// Canvas of the given size filled with one colour
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        Self::new(RgbaImage::from_pixel(width, height, color.to_rgba()))
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Current raster
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Finish drawing and take the raster
    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Replace the raster, e.g. after a rotation
    pub fn map_image(&mut self, f: impl FnOnce(&RgbaImage) -> RgbaImage) {
        self.image = f(&self.image);
    }

    // ========================================================================
    // Drawing
    // ========================================================================

    /// Run a drawing closure, isolating it on a layer when any of `colors`
    /// is translucent
    pub fn paint(&mut self, colors: &[Color], f: impl FnOnce(&mut RgbaImage)) {
        if colors.iter().any(Color::is_translucent) {
            let mut layer = self.blank_layer(1);
            f(&mut layer);
            self.composite(&layer);
        } else {
            f(&mut self.image);
        }
    }

    /// Run a drawing closure on a layer `factor` times larger, box-filter it
    /// back down and composite.
    ///
    /// The closure must draw in oversampled coordinates. A factor of 1
    /// behaves like [`Canvas::paint`].
    pub fn paint_oversampled(&mut self, factor: u32, colors: &[Color], f: impl FnOnce(&mut RgbaImage)) {
        if factor <= 1 {
            self.paint(colors, f);
            return;
        }
        let mut layer = self.blank_layer(factor);
        f(&mut layer);
        let layer = downsample_box(&layer, factor, self.width(), self.height());
        self.composite(&layer);
    }

    fn blank_layer(&self, factor: u32) -> RgbaImage {
        RgbaImage::new(self.width() * factor, self.height() * factor)
    }

    // ========================================================================
    // Layers
    // ========================================================================

    /// Register a pre-rendered overlay under a name, replacing any previous
    /// one. The overlay is composited later with [`Canvas::composite_layer`].
    pub fn add_layer(&mut self, name: impl Into<String>, layer: RgbaImage) {
        self.layers.insert(name.into(), layer);
    }

    /// Named overlay, if registered
    pub fn layer(&self, name: &str) -> Option<&RgbaImage> {
        self.layers.get(name)
    }

    /// Composite and drop a named overlay; false when it does not exist
    pub fn composite_layer(&mut self, name: &str) -> bool {
        match self.layers.remove(name) {
            Some(layer) => {
                self.composite(&layer);
                true
            }
            None => false,
        }
    }

    /// Alpha-composite `layer` over the raster, anchored at the top-left
    /// corner. Pixels outside the raster are ignored.
    pub fn composite(&mut self, layer: &RgbaImage) {
        let w = self.width().min(layer.width());
        let h = self.height().min(layer.height());
        for y in 0..h {
            for x in 0..w {
                let src = *layer.get_pixel(x, y);
                if src[3] == 0 {
                    continue;
                }
                let dst = self.image.get_pixel_mut(x, y);
                *dst = blend_over(*dst, src);
            }
        }
    }
}

/// Porter-Duff "over" of straight-alpha pixels
pub fn blend_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    if sa >= 1.0 {
        return src;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let channel = |s: u8, d: u8| {
        let c = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
        c.round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ])
}

/// Average `factor`×`factor` blocks into a `width`×`height` image.
///
/// Colour channels are averaged premultiplied so transparent samples do
/// not darken the edges.
pub fn downsample_box(src: &RgbaImage, factor: u32, width: u32, height: u32) -> RgbaImage {
    let mut out = RgbaImage::new(width, height);
    let samples = (factor * factor) as f32;
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let mut acc = [0f32; 4];
        for dy in 0..factor {
            for dx in 0..factor {
                let sx = x * factor + dx;
                let sy = y * factor + dy;
                if sx >= src.width() || sy >= src.height() {
                    continue;
                }
                let p = src.get_pixel(sx, sy);
                let a = p[3] as f32;
                acc[0] += p[0] as f32 * a;
                acc[1] += p[1] as f32 * a;
                acc[2] += p[2] as f32 * a;
                acc[3] += a;
            }
        }
        if acc[3] > 0.0 {
            *pixel = Rgba([
                (acc[0] / acc[3]).round() as u8,
                (acc[1] / acc[3]).round() as u8,
                (acc[2] / acc[3]).round() as u8,
                (acc[3] / samples).round() as u8,
            ]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ImagePoint;
    use crate::render::draw;

    #[test]
    fn test_blend_over_opaque_and_clear() {
        let dst = Rgba([10, 20, 30, 255]);
        assert_eq!(blend_over(dst, Rgba([1, 2, 3, 255])), Rgba([1, 2, 3, 255]));
        assert_eq!(blend_over(Rgba([0, 0, 0, 0]), Rgba([0, 0, 0, 0])), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_translucent_circles_accumulate_alpha() {
        let red = Color::rgba(255, 0, 0, 128);
        let mut canvas = Canvas::new(RgbaImage::new(9, 9));
        for _ in 0..2 {
            canvas.paint(&[red], |img| {
                draw::circle(img, ImagePoint::new(4.0, 4.0), 3.0, Some(red.to_rgba()), None)
            });
        }
        let a = canvas.image().get_pixel(4, 4)[3] as i32;
        // 1 - (1 - 128/255)^2 ≈ 0.752
        assert!((a - 192).abs() <= 1, "alpha {}", a);
        assert_eq!(canvas.image().get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_opaque_paint_draws_directly() {
        let mut canvas = Canvas::filled(4, 4, Color::rgb(255, 255, 255));
        canvas.paint(&[Color::rgb(0, 0, 0)], |img| {
            draw::put(img, 1, 1, Rgba([0, 0, 0, 255]))
        });
        assert_eq!(*canvas.image().get_pixel(1, 1), Rgba([0, 0, 0, 255]));
        assert_eq!(*canvas.image().get_pixel(2, 2), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_oversampled_paint_antialiases() {
        let mut canvas = Canvas::filled(4, 4, Color::rgb(255, 255, 255));
        // Fill one of four sub-pixels of (0, 0)
        canvas.paint_oversampled(2, &[], |img| draw::put(img, 0, 0, Rgba([0, 0, 0, 255])));
        let p = *canvas.image().get_pixel(0, 0);
        assert_eq!(p[3], 255);
        assert!(p[0] > 150 && p[0] < 230, "blended channel {}", p[0]);
        assert_eq!(*canvas.image().get_pixel(1, 1), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_named_layers() {
        let mut canvas = Canvas::filled(2, 2, Color::rgb(0, 0, 0));
        let mut overlay = RgbaImage::new(2, 2);
        overlay.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
        canvas.add_layer("labels", overlay);
        assert!(canvas.layer("labels").is_some());

        assert!(canvas.composite_layer("labels"));
        assert!(!canvas.composite_layer("labels"));
        assert_eq!(*canvas.image().get_pixel(1, 0), Rgba([0, 255, 0, 255]));
        assert_eq!(*canvas.image().get_pixel(0, 0), Rgba([0, 0, 0, 255]));
    }
}
