//! Rendering surface abstraction and an in-memory raster implementation.
//!
//! A surface has two independently addressable layers: the primary overlay
//! layer the eyewear is drawn on, and an optional diagnostic layer for
//! landmark visualisation. Layers expose a small 2D-canvas-like API.

use glassify_models::{Affine2, Point2};
use image::{imageops::FilterType, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use tracing::debug;

/// One drawable layer of a rendering surface.
pub trait SurfaceLayer: Send {
    /// Erase everything on the layer.
    fn clear(&mut self);

    /// Draw `image` stretched to the rectangle `(x, y, width, height)` expressed
    /// in the local frame of `transform`.
    fn draw_image(
        &mut self,
        image: &RgbaImage,
        transform: &Affine2,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    );

    /// Stroke connected line segments through `points`.
    fn stroke_polyline(&mut self, points: &[Point2], color: Rgba<u8>, line_width: f64);

    /// Fill a disc.
    fn fill_circle(&mut self, center: Point2, radius: f64, color: Rgba<u8>);
}

/// Target the compositor renders into.
pub trait RenderSurface: Send {
    /// Surface size in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Resize the surface, clearing all layers.
    fn resize(&mut self, width: u32, height: u32);

    /// Primary layer carrying the overlay.
    fn overlay_layer(&mut self) -> &mut dyn SurfaceLayer;

    /// Diagnostic layer, if the surface provides one.
    fn diagnostic_layer(&mut self) -> Option<&mut dyn SurfaceLayer>;
}

/// A layer backed by an RGBA pixel buffer.
#[derive(Debug, Clone)]
pub struct RasterLayer {
    canvas: RgbaImage,
}

impl RasterLayer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: RgbaImage::new(width, height),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.canvas
    }

    /// True when no pixel on the layer has any coverage.
    pub fn is_blank(&self) -> bool {
        self.canvas.pixels().all(|p| p.0[3] == 0)
    }
}

/// Straight-alpha source-over blend.
fn blend_over(dst: &mut Rgba<u8>, src: &Rgba<u8>) {
    let sa = src.0[3] as f32 / 255.0;
    if sa <= 0.0 {
        return;
    }
    let da = dst.0[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for c in 0..3 {
        let sc = src.0[c] as f32;
        let dc = dst.0[c] as f32;
        let v = (sc * sa + dc * da * (1.0 - sa)) / out_a;
        dst.0[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    dst.0[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Clip the segment `a`-`b` to the box `[min_x, max_x] x [min_y, max_y]`
/// (Liang-Barsky). Returns `None` when nothing of the segment is inside.
fn clip_segment(
    a: Point2,
    b: Point2,
    (min_x, min_y): (f64, f64),
    (max_x, max_y): (f64, f64),
) -> Option<(Point2, Point2)> {
    if !(a.x.is_finite() && a.y.is_finite() && b.x.is_finite() && b.y.is_finite()) {
        return None;
    }
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    for (p, q) in [
        (-dx, a.x - min_x),
        (dx, max_x - a.x),
        (-dy, a.y - min_y),
        (dy, max_y - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((
        Point2::new(a.x + t0 * dx, a.y + t0 * dy),
        Point2::new(a.x + t1 * dx, a.y + t1 * dy),
    ))
}

impl SurfaceLayer for RasterLayer {
    fn clear(&mut self) {
        for px in self.canvas.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
    }

    fn draw_image(
        &mut self,
        image: &RgbaImage,
        transform: &Affine2,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) {
        let (img_w, img_h) = image.dimensions();
        if img_w == 0 || img_h == 0 || width <= 0.0 || height <= 0.0 {
            return;
        }
        let Some(inverse) = transform.inverse() else {
            return;
        };

        // Bounding box of the transformed destination rectangle, clipped to the canvas.
        let corners = [
            Point2::new(x, y),
            Point2::new(x + width, y),
            Point2::new(x, y + height),
            Point2::new(x + width, y + height),
        ]
        .map(|p| transform.apply(p));
        let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min).floor().max(0.0);
        let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min).floor().max(0.0);
        let max_x = corners
            .iter()
            .map(|p| p.x)
            .fold(f64::NEG_INFINITY, f64::max)
            .ceil()
            .min(self.canvas.width() as f64);
        let max_y = corners
            .iter()
            .map(|p| p.y)
            .fold(f64::NEG_INFINITY, f64::max)
            .ceil()
            .min(self.canvas.height() as f64);
        if min_x >= max_x || min_y >= max_y {
            return;
        }

        let sx = img_w as f64 / width;
        let sy = img_h as f64 / height;

        // Nearest-neighbour inverse mapping from pixel centres.
        for py in min_y as u32..max_y as u32 {
            for px in min_x as u32..max_x as u32 {
                let local = inverse.apply(Point2::new(px as f64 + 0.5, py as f64 + 0.5));
                let u = (local.x - x) * sx;
                let v = (local.y - y) * sy;
                if u < 0.0 || v < 0.0 || u >= img_w as f64 || v >= img_h as f64 {
                    continue;
                }
                let src = image.get_pixel(u as u32, v as u32);
                blend_over(self.canvas.get_pixel_mut(px, py), src);
            }
        }
    }

    fn stroke_polyline(&mut self, points: &[Point2], color: Rgba<u8>, line_width: f64) {
        let passes = line_width.max(1.0).round() as i32;
        // Thick passes are offset by up to half the width, so keep that much margin.
        let margin = passes as f64;
        let lower = (-margin, -margin);
        let upper = (
            self.canvas.width() as f64 + margin,
            self.canvas.height() as f64 + margin,
        );
        for pair in points.windows(2) {
            let Some((a, b)) = clip_segment(pair[0], pair[1], lower, upper) else {
                continue;
            };
            let len = a.distance(&b);
            // Unit normal for thick lines; zero-length segments draw a single pass.
            let (nx, ny) = if len > 0.0 {
                (-(b.y - a.y) / len, (b.x - a.x) / len)
            } else {
                (0.0, 0.0)
            };
            for i in 0..passes {
                let offset = i as f64 - (passes - 1) as f64 / 2.0;
                draw_line_segment_mut(
                    &mut self.canvas,
                    ((a.x + nx * offset) as f32, (a.y + ny * offset) as f32),
                    ((b.x + nx * offset) as f32, (b.y + ny * offset) as f32),
                    color,
                );
            }
        }
    }

    fn fill_circle(&mut self, center: Point2, radius: f64, color: Rgba<u8>) {
        draw_filled_circle_mut(
            &mut self.canvas,
            (center.x.round() as i32, center.y.round() as i32),
            radius.round().max(0.0) as i32,
            color,
        );
    }
}

/// In-memory surface with an overlay and a diagnostic raster layer.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    overlay: RasterLayer,
    diagnostic: RasterLayer,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            overlay: RasterLayer::new(width, height),
            diagnostic: RasterLayer::new(width, height),
        }
    }

    pub fn overlay(&self) -> &RasterLayer {
        &self.overlay
    }

    pub fn diagnostic(&self) -> &RasterLayer {
        &self.diagnostic
    }

    /// Blend both layers over `frame`, resizing the frame to the surface first.
    pub fn composite_onto(&self, frame: &RgbaImage) -> RgbaImage {
        let (width, height) = self.dimensions();
        let mut out = if frame.dimensions() == (width, height) {
            frame.clone()
        } else {
            debug!(
                from_width = frame.width(),
                from_height = frame.height(),
                width,
                height,
                "Resizing frame to surface for compositing"
            );
            image::imageops::resize(frame, width, height, FilterType::Triangle)
        };
        for layer in [&self.overlay, &self.diagnostic] {
            for (dst, src) in out.pixels_mut().zip(layer.image().pixels()) {
                blend_over(dst, src);
            }
        }
        out
    }
}

impl RenderSurface for RasterSurface {
    fn dimensions(&self) -> (u32, u32) {
        self.overlay.image().dimensions()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.overlay = RasterLayer::new(width, height);
        self.diagnostic = RasterLayer::new(width, height);
    }

    fn overlay_layer(&mut self) -> &mut dyn SurfaceLayer {
        &mut self.overlay
    }

    fn diagnostic_layer(&mut self) -> Option<&mut dyn SurfaceLayer> {
        Some(&mut self.diagnostic)
    }
}
