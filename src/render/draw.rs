//! Primitive rasterizers.
//!
//! Every primitive writes straight into an [`RgbaImage`], replacing pixels
//! (no blending). Alpha blending is the [`Canvas`](super::Canvas)'s job:
//! translucent primitives are drawn onto an empty layer first and the
//! layer is composited.
//!
//! Pixel centres sit on integer coordinates; everything outside the image
//! is clipped silently.
//!
//! ```text
//! Bresenham from (0,0) to (7,3):
//!
//!     3 │        ●
//!     2 │     ●●
//!     1 │  ●●
//!     0 ●●
//!       └──────────
//!        0 1 2 3 4 5 6 7
//! ```

use image::{Rgba, RgbaImage};

use crate::core::ImagePoint;

/// Put a pixel if it lies inside the image
#[inline]
pub fn put(img: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Pixel bounds `(x0, y0, x1, y1)` of a box, clamped to the image
fn clamp_box(img: &RgbaImage, x0: f32, y0: f32, x1: f32, y1: f32) -> Option<(i64, i64, i64, i64)> {
    let bx0 = (x0.floor() as i64).max(0);
    let by0 = (y0.floor() as i64).max(0);
    let bx1 = (x1.ceil() as i64).min(img.width() as i64 - 1);
    let by1 = (y1.ceil() as i64).min(img.height() as i64 - 1);
    if bx0 > bx1 || by0 > by1 {
        None
    } else {
        Some((bx0, by0, bx1, by1))
    }
}

// ============================================================================
// Lines
// ============================================================================

/// Bresenham's line algorithm iterator over pixel coordinates.
pub struct BresenhamLine {
    x: i64,
    y: i64,
    dx: i64,
    dy: i64,
    x_inc: i64,
    y_inc: i64,
    error: i64,
    steep: bool,
    end_x: i64,
    end_y: i64,
    done: bool,
}

impl BresenhamLine {
    /// Line from `start` to `end`, both inclusive
    pub fn new(start: (i64, i64), end: (i64, i64)) -> Self {
        let dx = (end.0 - start.0).abs();
        let dy = (end.1 - start.1).abs();
        let steep = dy > dx;

        let (x, y, end_x, end_y, dx, dy) = if steep {
            (start.1, start.0, end.1, end.0, dy, dx)
        } else {
            (start.0, start.1, end.0, end.1, dx, dy)
        };

        Self {
            x,
            y,
            dx,
            dy,
            x_inc: if end_x > x { 1 } else { -1 },
            y_inc: if end_y > y { 1 } else { -1 },
            error: dx / 2,
            steep,
            end_x,
            end_y,
            done: false,
        }
    }

    /// Line between two image points, rounded to the nearest pixel
    pub fn between(a: ImagePoint, b: ImagePoint) -> Self {
        Self::new(
            (a.x.round() as i64, a.y.round() as i64),
            (b.x.round() as i64, b.y.round() as i64),
        )
    }
}

impl Iterator for BresenhamLine {
    type Item = (i64, i64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = if self.steep {
            (self.y, self.x)
        } else {
            (self.x, self.y)
        };

        if self.x == self.end_x && self.y == self.end_y {
            self.done = true;
            return Some(result);
        }

        self.error -= self.dy;
        if self.error < 0 {
            self.y += self.y_inc;
            self.error += self.dx;
        }
        self.x += self.x_inc;

        Some(result)
    }
}

/// Clip the segment `a`–`b` to the pixel rectangle of `img` (Liang–Barsky).
///
/// Returns `None` when the segment misses the image or has a non-finite
/// coordinate. Segments fully inside come back unchanged.
pub fn clip_segment(img: &RgbaImage, a: ImagePoint, b: ImagePoint) -> Option<(ImagePoint, ImagePoint)> {
    if img.width() == 0 || img.height() == 0 {
        return None;
    }
    let (ax, ay) = (a.x as f64, a.y as f64);
    let (bx, by) = (b.x as f64, b.y as f64);
    if ![ax, ay, bx, by].iter().all(|v| v.is_finite()) {
        return None;
    }
    let x_max = img.width() as f64 - 1.0;
    let y_max = img.height() as f64 - 1.0;
    let (dx, dy) = (bx - ax, by - ay);

    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    for (p, q) in [(-dx, ax), (dx, x_max - ax), (-dy, ay), (dy, y_max - ay)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t1 {
                return None;
            }
            t0 = t0.max(t);
        } else {
            if t < t0 {
                return None;
            }
            t1 = t1.min(t);
        }
    }
    let at = |t: f64| ImagePoint::new((ax + t * dx) as f32, (ay + t * dy) as f32);
    Some((at(t0), at(t1)))
}

/// Distance from `p` to the segment `a`–`b`
fn segment_distance(p: ImagePoint, a: ImagePoint, b: ImagePoint) -> f32 {
    let (vx, vy) = (b.x - a.x, b.y - a.y);
    let len2 = vx * vx + vy * vy;
    if len2 == 0.0 {
        return p.distance(&a);
    }
    let t = (((p.x - a.x) * vx + (p.y - a.y) * vy) / len2).clamp(0.0, 1.0);
    p.distance(&ImagePoint::new(a.x + t * vx, a.y + t * vy))
}

/// Line of the given width.
///
/// Widths up to 1 use a single-pixel Bresenham line; wider lines fill every
/// pixel within `width / 2` of the segment.
pub fn line(img: &mut RgbaImage, a: ImagePoint, b: ImagePoint, width: f32, color: Rgba<u8>) {
    if width <= 1.0 {
        let Some((a, b)) = clip_segment(img, a, b) else {
            return;
        };
        for (x, y) in BresenhamLine::between(a, b) {
            put(img, x, y, color);
        }
        return;
    }
    let half = width / 2.0;
    let Some((x0, y0, x1, y1)) = clamp_box(
        img,
        a.x.min(b.x) - half,
        a.y.min(b.y) - half,
        a.x.max(b.x) + half,
        a.y.max(b.y) + half,
    ) else {
        return;
    };
    for y in y0..=y1 {
        for x in x0..=x1 {
            if segment_distance(ImagePoint::new(x as f32, y as f32), a, b) <= half {
                put(img, x, y, color);
            }
        }
    }
}

/// Connected line segments through `points`
pub fn polyline(img: &mut RgbaImage, points: &[ImagePoint], width: f32, color: Rgba<u8>) {
    for pair in points.windows(2) {
        line(img, pair[0], pair[1], width, color);
    }
}

// ============================================================================
// Filled shapes
// ============================================================================

/// Circle of radius `r` with optional fill and one-pixel outline
pub fn circle(
    img: &mut RgbaImage,
    center: ImagePoint,
    r: f32,
    fill: Option<Rgba<u8>>,
    outline: Option<Rgba<u8>>,
) {
    if r < 0.0 {
        return;
    }
    let Some((x0, y0, x1, y1)) = clamp_box(img, center.x - r, center.y - r, center.x + r, center.y + r)
    else {
        return;
    };
    let inner = (r - 1.0).max(0.0);
    for y in y0..=y1 {
        for x in x0..=x1 {
            let d = ImagePoint::new(x as f32, y as f32).distance(&center);
            if d > r {
                continue;
            }
            match (outline, fill) {
                (Some(o), _) if d > inner || r < 1.0 => put(img, x, y, o),
                (_, Some(f)) => put(img, x, y, f),
                _ => {}
            }
        }
    }
}

/// True when `theta` lies on the clockwise arc from `start` to `end` (degrees)
fn in_arc(theta: f32, start: f32, end: f32) -> bool {
    let span = (end - start).rem_euclid(360.0);
    let offset = (theta - start).rem_euclid(360.0);
    span == 0.0 || offset <= span
}

/// Pie slice from `start` to `end` degrees, clockwise from 3 o'clock
pub fn pieslice(
    img: &mut RgbaImage,
    center: ImagePoint,
    r: f32,
    start: f32,
    end: f32,
    fill: Rgba<u8>,
    outline: Rgba<u8>,
) {
    let Some((x0, y0, x1, y1)) = clamp_box(img, center.x - r, center.y - r, center.x + r, center.y + r)
    else {
        return;
    };
    let inner = (r - 1.0).max(0.0);
    for y in y0..=y1 {
        for x in x0..=x1 {
            let (dx, dy) = (x as f32 - center.x, y as f32 - center.y);
            let d = (dx * dx + dy * dy).sqrt();
            if d > r {
                continue;
            }
            if d > 0.0 && !in_arc(dy.atan2(dx).to_degrees(), start, end) {
                continue;
            }
            put(img, x, y, if d > inner { outline } else { fill });
        }
    }
    // Straight edges of the slice
    let edge = |deg: f32| center.offset_polar(deg, r);
    line(img, center, edge(start), 1.0, outline);
    line(img, center, edge(end), 1.0, outline);
}

/// Filled polygon (even-odd rule) with optional outline
pub fn polygon(
    img: &mut RgbaImage,
    points: &[ImagePoint],
    fill: Option<Rgba<u8>>,
    outline: Option<Rgba<u8>>,
) {
    if points.len() < 2 {
        return;
    }
    if let Some(fill) = fill {
        let ys = points.iter().map(|p| p.y);
        let min_y = ys.clone().fold(f32::INFINITY, f32::min);
        let max_y = ys.fold(f32::NEG_INFINITY, f32::max);
        let y0 = (min_y.ceil() as i64).max(0);
        let y1 = (max_y.floor() as i64).min(img.height() as i64 - 1);
        let mut crossings = Vec::with_capacity(points.len());
        for y in y0..=y1 {
            let fy = y as f32;
            crossings.clear();
            for i in 0..points.len() {
                let a = points[i];
                let b = points[(i + 1) % points.len()];
                if (a.y <= fy && b.y > fy) || (b.y <= fy && a.y > fy) {
                    crossings.push(a.x + (fy - a.y) / (b.y - a.y) * (b.x - a.x));
                }
            }
            crossings.sort_by(|a, b| a.total_cmp(b));
            let x_max = img.width() as i64 - 1;
            for span in crossings.chunks_exact(2) {
                let xs = (span[0].ceil() as i64).max(0);
                let xe = (span[1].floor() as i64).min(x_max);
                for x in xs..=xe {
                    put(img, x, y, fill);
                }
            }
        }
    }
    if let Some(outline) = outline {
        let mut closed = points.to_vec();
        closed.push(points[0]);
        polyline(img, &closed, 1.0, outline);
    }
}

// ============================================================================
// Glyphs
// ============================================================================

/// Robot glyph: body, inner ring, bin cover, lidar turret and button.
///
/// `angle` is the heading in degrees, counter-clockwise on screen.
pub fn robot(img: &mut RgbaImage, center: ImagePoint, angle: f32, r: f32, fill: Rgba<u8>, outline: Rgba<u8>) {
    let unit = r / 16.0;
    circle(img, center, r, Some(fill), Some(outline));
    if r >= 8.0 {
        circle(img, center, unit * 14.0, None, Some(outline));
    }

    // Bin cover chord behind the turret
    let cover = unit * 13.0;
    let a1 = (angle + 104.0).to_radians();
    let a2 = (angle - 104.0).to_radians();
    let p1 = ImagePoint::new(center.x - cover * a1.cos(), center.y + cover * a1.sin());
    let p2 = ImagePoint::new(center.x - cover * a2.cos(), center.y + cover * a2.sin());
    line(img, p1, p2, 1.0, outline);

    let heading = angle.to_radians();
    let ahead = |dist: f32| {
        ImagePoint::new(center.x + dist * heading.cos(), center.y - dist * heading.sin())
    };
    circle(img, ahead(unit * 3.0), unit * 4.0, Some(fill), Some(outline));

    let half = Rgba([
        ((outline[0] as u16 + fill[0] as u16) / 2) as u8,
        ((outline[1] as u16 + fill[1] as u16) / 2) as u8,
        ((outline[2] as u16 + fill[2] as u16) / 2) as u8,
        ((outline[3] as u16 + fill[3] as u16) / 2) as u8,
    ]);
    circle(img, ahead(unit * 10.0), unit * 2.0, Some(half), Some(half));
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    fn blank(w: u32, h: u32) -> RgbaImage {
        RgbaImage::new(w, h)
    }

    #[test]
    fn test_bresenham_endpoints() {
        let cells: Vec<_> = BresenhamLine::new((0, 0), (7, 3)).collect();
        assert_eq!(cells.first(), Some(&(0, 0)));
        assert_eq!(cells.last(), Some(&(7, 3)));
        assert_eq!(cells.len(), 8);

        let single: Vec<_> = BresenhamLine::new((2, 2), (2, 2)).collect();
        assert_eq!(single, vec![(2, 2)]);
    }

    #[test]
    fn test_thin_and_wide_lines() {
        let mut img = blank(10, 10);
        line(&mut img, ImagePoint::new(0.0, 5.0), ImagePoint::new(9.0, 5.0), 1.0, RED);
        assert_eq!(*img.get_pixel(4, 5), RED);
        assert_eq!(*img.get_pixel(4, 4), CLEAR);

        let mut img = blank(10, 10);
        line(&mut img, ImagePoint::new(0.0, 5.0), ImagePoint::new(9.0, 5.0), 3.0, RED);
        assert_eq!(*img.get_pixel(4, 4), RED);
        assert_eq!(*img.get_pixel(4, 6), RED);
        assert_eq!(*img.get_pixel(4, 8), CLEAR);
    }

    #[test]
    fn test_far_endpoints_are_clipped() {
        let mut img = blank(10, 10);
        line(&mut img, ImagePoint::new(0.0, 0.0), ImagePoint::new(2e9, 0.0), 1.0, RED);
        assert!((0..10).all(|x| *img.get_pixel(x, 0) == RED));
        assert_eq!(*img.get_pixel(0, 1), CLEAR);

        // Both ends far outside, crossing the image diagonally
        let mut img = blank(10, 10);
        line(&mut img, ImagePoint::new(-1e15, -1e15), ImagePoint::new(1e15, 1e15), 1.0, RED);
        assert_eq!(*img.get_pixel(0, 0), RED);
        assert_eq!(*img.get_pixel(9, 9), RED);
        assert_eq!(*img.get_pixel(9, 0), CLEAR);

        let mut img = blank(10, 10);
        line(&mut img, ImagePoint::new(f32::NAN, 0.0), ImagePoint::new(5.0, 5.0), 1.0, RED);
        assert!(img.pixels().all(|p| *p == CLEAR));
    }

    #[test]
    fn test_clip_segment() {
        let img = blank(10, 10);
        let (a, b) = (ImagePoint::new(1.0, 2.0), ImagePoint::new(8.0, 3.0));
        assert_eq!(clip_segment(&img, a, b), Some((a, b)));

        let (a, b) = clip_segment(&img, ImagePoint::new(-10.0, 5.0), ImagePoint::new(20.0, 5.0)).unwrap();
        assert_eq!((a.x, a.y), (0.0, 5.0));
        assert_eq!((b.x, b.y), (9.0, 5.0));

        assert_eq!(
            clip_segment(&img, ImagePoint::new(-5.0, -1.0), ImagePoint::new(20.0, -1.0)),
            None
        );
    }

    #[test]
    fn test_polygon_with_far_vertices() {
        let mut img = blank(10, 10);
        let band = [
            ImagePoint::new(-1e15, 2.0),
            ImagePoint::new(1e15, 2.0),
            ImagePoint::new(1e15, 4.0),
            ImagePoint::new(-1e15, 4.0),
        ];
        polygon(&mut img, &band, Some(RED), None);
        assert!((0..10).all(|x| *img.get_pixel(x, 3) == RED));
        assert_eq!(*img.get_pixel(5, 6), CLEAR);
    }

    #[test]
    fn test_circle_fill_and_outline() {
        let mut img = blank(11, 11);
        circle(&mut img, ImagePoint::new(5.0, 5.0), 4.0, Some(RED), Some(BLUE));
        assert_eq!(*img.get_pixel(5, 5), RED);
        assert_eq!(*img.get_pixel(9, 5), BLUE);
        assert_eq!(*img.get_pixel(0, 0), CLEAR);
    }

    #[test]
    fn test_clipping_outside_image() {
        let mut img = blank(4, 4);
        circle(&mut img, ImagePoint::new(-20.0, -20.0), 3.0, Some(RED), None);
        line(&mut img, ImagePoint::new(-5.0, -5.0), ImagePoint::new(-1.0, -1.0), 4.0, RED);
        assert!(img.pixels().all(|p| *p == CLEAR));
    }

    #[test]
    fn test_polygon_fill() {
        let mut img = blank(10, 10);
        let square = [
            ImagePoint::new(2.0, 2.0),
            ImagePoint::new(7.0, 2.0),
            ImagePoint::new(7.0, 7.0),
            ImagePoint::new(2.0, 7.0),
        ];
        polygon(&mut img, &square, Some(RED), Some(BLUE));
        assert_eq!(*img.get_pixel(4, 4), RED);
        assert_eq!(*img.get_pixel(2, 4), BLUE);
        assert_eq!(*img.get_pixel(8, 4), CLEAR);
    }

    #[test]
    fn test_degenerate_polygon_is_noop() {
        let mut img = blank(5, 5);
        polygon(&mut img, &[ImagePoint::new(1.0, 1.0)], Some(RED), Some(RED));
        assert!(img.pixels().all(|p| *p == CLEAR));
    }

    #[test]
    fn test_pieslice_half_disc() {
        let mut img = blank(21, 21);
        // Facing right: slice covers the lower half (90°..270° clockwise)
        pieslice(&mut img, ImagePoint::new(10.0, 10.0), 8.0, 90.0, 270.0, RED, BLUE);
        assert_eq!(*img.get_pixel(6, 10), RED);
        assert_eq!(*img.get_pixel(14, 6), CLEAR);
    }

    #[test]
    fn test_robot_draws_around_center() {
        let mut img = blank(40, 40);
        robot(&mut img, ImagePoint::new(20.0, 20.0), 0.0, 16.0, RED, BLUE);
        assert_ne!(*img.get_pixel(20, 20), CLEAR);
        // Outer ring at full radius
        assert_eq!(*img.get_pixel(36, 20), BLUE);
        assert_eq!(*img.get_pixel(0, 0), CLEAR);
    }
}
