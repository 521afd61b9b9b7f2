//! Transform compositor: draws the processed overlay under a placement transform.
//!
//! # Architecture
//!
//! The compositor owns the rendering surface. The primary overlay layer only
//! ever holds the eyewear for the latest detection; the diagnostic layer holds
//! the landmark visualisation and is never written by the overlay path.

use glassify_models::{Affine2, Point2};
use image::Rgba;
use tracing::trace;

use crate::asset::OverlayAsset;
use crate::pose::PoseEstimate;
use crate::surface::RenderSurface;

pub const JAW_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const EYE_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);
pub const ANCHOR_COLOR: Rgba<u8> = Rgba([0, 0, 255, 255]);
pub const RAY_COLOR: Rgba<u8> = Rgba([255, 255, 0, 255]);

pub const JAW_LINE_WIDTH: f64 = 1.0;
pub const EYE_DOT_RADIUS: f64 = 3.0;
pub const ANCHOR_DOT_RADIUS: f64 = 5.0;
pub const RAY_LENGTH: f64 = 50.0;
pub const RAY_LINE_WIDTH: f64 = 2.0;

/// Renders overlays onto an owned surface.
pub struct TransformCompositor<S> {
    surface: S,
}

impl<S: RenderSurface> TransformCompositor<S> {
    pub fn new(surface: S) -> Self {
        Self { surface }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Resize the surface to match a source; clears every layer.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.surface.dimensions() != (width, height) {
            self.surface.resize(width, height);
        }
    }

    /// Render one detection.
    ///
    /// Without an asset the overlay layer is only cleared. The diagnostic layer
    /// is redrawn when `debug` is set and cleared otherwise.
    pub fn render(&mut self, asset: Option<&OverlayAsset>, estimate: &PoseEstimate, debug: bool) {
        let overlay = self.surface.overlay_layer();
        overlay.clear();

        if let Some(asset) = asset {
            let placement = &estimate.transform;
            let (x, y, width, height) = placement.asset_rect();
            overlay.draw_image(asset.processed(), &placement.affine(), x, y, width, height);
            trace!(
                center_x = placement.center_x,
                center_y = placement.center_y,
                rotation = placement.rotation_radians,
                width,
                height,
                "Overlay drawn"
            );
        }

        if debug {
            self.draw_diagnostics(estimate);
        } else if let Some(layer) = self.surface.diagnostic_layer() {
            layer.clear();
        }
    }

    /// No detection: clear the overlay and any stale diagnostics.
    pub fn render_no_detection(&mut self) {
        self.clear_all();
    }

    /// Clear both layers.
    pub fn clear_all(&mut self) {
        self.surface.overlay_layer().clear();
        if let Some(layer) = self.surface.diagnostic_layer() {
            layer.clear();
        }
    }

    fn draw_diagnostics(&mut self, estimate: &PoseEstimate) {
        let Some(layer) = self.surface.diagnostic_layer() else {
            return;
        };
        layer.clear();

        layer.stroke_polyline(&estimate.jaw, JAW_COLOR, JAW_LINE_WIDTH);

        let anchor = estimate.transform.center();
        layer.fill_circle(anchor, ANCHOR_DOT_RADIUS, ANCHOR_COLOR);

        let tip = Affine2::IDENTITY
            .translate(anchor.x, anchor.y)
            .rotate(estimate.transform.rotation_radians)
            .apply(Point2::new(RAY_LENGTH, 0.0));
        layer.stroke_polyline(&[anchor, tip], RAY_COLOR, RAY_LINE_WIDTH);

        for point in &estimate.eye_points {
            layer.fill_circle(*point, EYE_DOT_RADIUS, EYE_COLOR);
        }
    }
}
