//! Overlay asset preprocessing: background keying and trimming.
//!
//! Uploaded eyewear images are expected to be photographed on a light
//! background. The default preprocessor keys out near-white opaque pixels and
//! crops the result to the bounding box of what remains.
//!
//! # Architecture
//!
//! - `AssetPreprocessor`: trait seam for background removal
//! - `NearWhiteKeyer`: default threshold-based implementation
//! - `OverlayAsset`: raw + processed pair, processed derived once per raw

use image::{Rgba, RgbaImage};
use std::sync::Arc;
use tracing::{debug, warn};

/// Channel value all of R, G and B must exceed for a pixel to count as background.
pub const DEFAULT_WHITE_THRESHOLD: u8 = 220;

/// The eyewear graphic in both its uploaded and its keyed form.
#[derive(Debug, Clone)]
pub struct OverlayAsset {
    raw: Arc<RgbaImage>,
    processed: Arc<RgbaImage>,
    fallback: bool,
}

impl OverlayAsset {
    pub fn raw(&self) -> &Arc<RgbaImage> {
        &self.raw
    }

    pub fn processed(&self) -> &Arc<RgbaImage> {
        &self.processed
    }

    /// True when no foreground was found and `processed` is the raw asset.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}

/// Converts a raw overlay image into a compositing-ready asset.
pub trait AssetPreprocessor: Send + Sync {
    /// Derive the processed asset. Never mutates `raw`.
    fn process(&self, raw: Arc<RgbaImage>) -> OverlayAsset;

    /// Preprocessor name for logging.
    fn name(&self) -> &'static str;
}

/// Keys out near-white opaque pixels and trims to the remaining content.
#[derive(Debug, Clone, Copy)]
pub struct NearWhiteKeyer {
    threshold: u8,
}

impl Default for NearWhiteKeyer {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_WHITE_THRESHOLD,
        }
    }
}

impl NearWhiteKeyer {
    /// Keyer with a custom brightness threshold.
    pub fn with_threshold(threshold: u8) -> Self {
        Self { threshold }
    }

    /// Near-white in all three channels and fully opaque.
    #[inline]
    pub fn is_background(&self, px: &Rgba<u8>) -> bool {
        let [r, g, b, a] = px.0;
        r > self.threshold && g > self.threshold && b > self.threshold && a == u8::MAX
    }
}

impl AssetPreprocessor for NearWhiteKeyer {
    /// The crop bounds are inclusive: the last foreground row and column are kept.
    fn process(&self, raw: Arc<RgbaImage>) -> OverlayAsset {
        let (width, height) = raw.dimensions();
        let mut masked: RgbaImage = raw.as_ref().clone();

        let (mut min_x, mut min_y) = (width, height);
        let (mut max_x, mut max_y) = (0u32, 0u32);

        for (x, y, px) in masked.enumerate_pixels_mut() {
            if self.is_background(px) {
                px.0[3] = 0;
            } else {
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
            }
        }

        if min_x >= max_x || min_y >= max_y {
            warn!(width, height, "No foreground pixels in overlay asset, using original");
            return OverlayAsset {
                processed: Arc::clone(&raw),
                raw,
                fallback: true,
            };
        }

        let trimmed_width = max_x - min_x + 1;
        let trimmed_height = max_y - min_y + 1;
        let processed =
            image::imageops::crop_imm(&masked, min_x, min_y, trimmed_width, trimmed_height)
                .to_image();

        debug!(
            raw_width = width,
            raw_height = height,
            trimmed_width,
            trimmed_height,
            "Overlay asset keyed and trimmed"
        );

        OverlayAsset {
            raw,
            processed: Arc::new(processed),
            fallback: false,
        }
    }

    fn name(&self) -> &'static str {
        "near_white"
    }
}
