//! Per-frame placement of the overlay asset.

use serde::{Deserialize, Serialize};

use crate::geometry::{Affine2, Point2};

/// Divisor locating the asset's bridge anchor above its vertical centre.
///
/// The asset is drawn at `y = -height / 1.8` in the rotated frame, which puts
/// the anchor roughly two thirds up from the bottom edge.
pub const BRIDGE_ANCHOR_DIVISOR: f64 = 1.8;

/// Position, rotation and size of the overlay for one frame, in surface space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementTransform {
    pub center_x: f64,
    pub center_y: f64,
    pub rotation_radians: f64,
    pub width: f64,
    pub height: f64,
}

impl PlacementTransform {
    /// Anchor point on the surface.
    pub fn center(&self) -> Point2 {
        Point2::new(self.center_x, self.center_y)
    }

    /// Surface frame the asset is drawn in: translate to the anchor, then rotate.
    pub fn affine(&self) -> Affine2 {
        Affine2::IDENTITY
            .translate(self.center_x, self.center_y)
            .rotate(self.rotation_radians)
    }

    /// Destination rectangle `(x, y, width, height)` in the rotated frame.
    pub fn asset_rect(&self) -> (f64, f64, f64, f64) {
        (
            -self.width / 2.0,
            -self.height / BRIDGE_ANCHOR_DIVISOR,
            self.width,
            self.height,
        )
    }

    /// True when the transform can be drawn.
    pub fn is_drawable(&self) -> bool {
        self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
            && self.center_x.is_finite()
            && self.center_y.is_finite()
            && self.rotation_radians.is_finite()
    }
}
