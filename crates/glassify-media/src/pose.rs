//! Pose estimation: landmarks to overlay placement.
//!
//! Converts one detection into a `PlacementTransform` on the rendering
//! surface. Roll comes from the jaw endpoints, position and size from the eye
//! centres. The function is pure: identical inputs give bit-identical output.

use glassify_models::{FaceLandmarks, PipelineConfig, PlacementTransform, Point2};

use crate::error::{MediaError, MediaResult};

/// Derived overlay width per unit of inter-eye distance (spans out to the temples).
pub const WIDTH_PER_EYE_DISTANCE: f64 = 2.3;

/// Derived overlay height as a fraction of its width.
pub const HEIGHT_PER_WIDTH: f64 = 0.3;

/// Placement plus the scaled geometry it was derived from.
///
/// The extra geometry feeds the diagnostic layer; the compositor only needs
/// `transform` for the overlay itself.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseEstimate {
    pub transform: PlacementTransform,
    pub scale_x: f64,
    pub scale_y: f64,
    pub left_eye_center: Point2,
    pub right_eye_center: Point2,
    pub inter_eye_distance: f64,
    /// Jaw outline in surface space.
    pub jaw: Vec<Point2>,
    /// Left then right eye points in surface space.
    pub eye_points: Vec<Point2>,
}

/// Estimate overlay placement for one detection.
///
/// Source dimensions are the frame's intrinsic pixel size; surface dimensions
/// are the rendering surface's size. Returns `DegenerateGeometry` when the
/// inputs cannot produce a drawable placement (zero-sized source, coincident
/// eyes without a manual width).
pub fn estimate(
    detection: &FaceLandmarks,
    source_width: u32,
    source_height: u32,
    surface_width: u32,
    surface_height: u32,
    config: &PipelineConfig,
) -> MediaResult<PoseEstimate> {
    if source_width == 0 || source_height == 0 {
        return Err(MediaError::degenerate(format!(
            "source frame is {}x{}",
            source_width, source_height
        )));
    }

    let scale_x = surface_width as f64 / source_width as f64;
    let scale_y = surface_height as f64 / source_height as f64;

    let (left_jaw, right_jaw) = detection.jaw_endpoints();
    let rotation_radians = f64::atan2(
        (right_jaw.y - left_jaw.y) * scale_y,
        (right_jaw.x - left_jaw.x) * scale_x,
    );

    let left_eye_center = detection.left_eye_center().scaled(scale_x, scale_y);
    let right_eye_center = detection.right_eye_center().scaled(scale_x, scale_y);
    let inter_eye_distance = left_eye_center.distance(&right_eye_center);

    let width = config
        .manual_width
        .unwrap_or(inter_eye_distance * WIDTH_PER_EYE_DISTANCE);
    let height = config.manual_height.unwrap_or(width * HEIGHT_PER_WIDTH);

    let anchor = left_eye_center.midpoint(&right_eye_center);

    let transform = PlacementTransform {
        center_x: anchor.x,
        center_y: anchor.y,
        rotation_radians,
        width,
        height,
    };

    if !transform.is_drawable() {
        return Err(MediaError::degenerate(format!(
            "placement {:.3}x{:.3} is not drawable (eye distance {:.3})",
            width, height, inter_eye_distance
        )));
    }

    let jaw = detection
        .jaw()
        .iter()
        .map(|p| p.scaled(scale_x, scale_y))
        .collect();
    let eye_points = detection
        .left_eye()
        .iter()
        .chain(detection.right_eye())
        .map(|p| p.scaled(scale_x, scale_y))
        .collect();

    Ok(PoseEstimate {
        transform,
        scale_x,
        scale_y,
        left_eye_center,
        right_eye_center,
        inter_eye_distance,
        jaw,
        eye_points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const EPS: f64 = 1e-9;

    /// Eye as a 6-point ring whose corners 0 and 3 are `outer` and `inner`.
    fn eye(outer: Point2, inner: Point2) -> Vec<Point2> {
        let mid = outer.midpoint(&inner);
        vec![
            outer,
            Point2::new(mid.x - 2.0, mid.y - 3.0),
            Point2::new(mid.x + 2.0, mid.y - 3.0),
            inner,
            Point2::new(mid.x + 2.0, mid.y + 3.0),
            Point2::new(mid.x - 2.0, mid.y + 3.0),
        ]
    }

    fn face(jaw_left: Point2, jaw_right: Point2) -> FaceLandmarks {
        FaceLandmarks::new(
            vec![jaw_left, Point2::new(50.0, 120.0), jaw_right],
            eye(Point2::new(20.0, 40.0), Point2::new(40.0, 40.0)),
            eye(Point2::new(60.0, 40.0), Point2::new(80.0, 40.0)),
        )
        .unwrap()
    }

    #[test]
    fn test_level_jaw_has_zero_rotation() {
        let lm = face(Point2::new(0.0, 0.0), Point2::new(100.0, 0.0));
        let est = estimate(&lm, 200, 200, 200, 200, &PipelineConfig::default()).unwrap();
        assert_eq!(est.transform.rotation_radians, 0.0);
    }

    #[test]
    fn test_vertical_jaw_is_quarter_turn() {
        let lm = face(Point2::new(0.0, 0.0), Point2::new(0.0, 100.0));
        let est = estimate(&lm, 200, 200, 200, 200, &PipelineConfig::default()).unwrap();
        assert!((est.transform.rotation_radians - FRAC_PI_2).abs() < EPS);
    }

    #[test]
    fn test_rotation_uses_scaled_deltas() {
        // 1:1 in source, but the surface stretches x by 2.
        let lm = face(Point2::new(0.0, 0.0), Point2::new(100.0, 100.0));
        let est = estimate(&lm, 100, 100, 200, 100, &PipelineConfig::default()).unwrap();
        assert!((est.transform.rotation_radians - (100.0f64).atan2(200.0)).abs() < EPS);
        assert_eq!(est.scale_x, 2.0);
        assert_eq!(est.scale_y, 1.0);
    }

    #[test]
    fn test_derived_sizing_and_anchor() {
        let lm = face(Point2::new(0.0, 0.0), Point2::new(100.0, 0.0));
        let est = estimate(&lm, 200, 200, 200, 200, &PipelineConfig::default()).unwrap();

        // Eye centres (30, 40) and (70, 40): d = 40.
        assert!((est.inter_eye_distance - 40.0).abs() < EPS);
        assert!((est.transform.width - 2.3 * 40.0).abs() < EPS);
        assert!((est.transform.height - 0.3 * 2.3 * 40.0).abs() < EPS);
        assert!((est.transform.center_x - 50.0).abs() < EPS);
        assert!((est.transform.center_y - 40.0).abs() < EPS);
    }

    #[test]
    fn test_surface_scale_applies_to_anchor_and_size() {
        let lm = face(Point2::new(0.0, 0.0), Point2::new(100.0, 0.0));
        let est = estimate(&lm, 200, 200, 400, 400, &PipelineConfig::default()).unwrap();
        assert!((est.inter_eye_distance - 80.0).abs() < EPS);
        assert!((est.transform.center_x - 100.0).abs() < EPS);
        assert!((est.transform.center_y - 80.0).abs() < EPS);
        assert_eq!(est.jaw[2], Point2::new(200.0, 0.0));
        assert_eq!(est.eye_points.len(), 12);
    }

    #[test]
    fn test_manual_override_wins() {
        let lm = face(Point2::new(0.0, 0.0), Point2::new(100.0, 0.0));
        let config = PipelineConfig::default().with_manual_size(Some(150.0), Some(44.0));
        let est = estimate(&lm, 200, 200, 400, 400, &config).unwrap();
        assert_eq!(est.transform.width, 150.0);
        assert_eq!(est.transform.height, 44.0);
    }

    #[test]
    fn test_manual_width_drives_derived_height() {
        let lm = face(Point2::new(0.0, 0.0), Point2::new(100.0, 0.0));
        let config = PipelineConfig::default().with_manual_size(Some(150.0), None);
        let est = estimate(&lm, 200, 200, 200, 200, &config).unwrap();
        assert_eq!(est.transform.width, 150.0);
        assert!((est.transform.height - 45.0).abs() < EPS);
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let lm = face(Point2::new(3.3, 7.1), Point2::new(97.2, 11.9));
        let config = PipelineConfig::default();
        let a = estimate(&lm, 640, 480, 1280, 720, &config).unwrap();
        for _ in 0..10 {
            let b = estimate(&lm, 640, 480, 1280, 720, &config).unwrap();
            assert_eq!(a.transform.center_x.to_bits(), b.transform.center_x.to_bits());
            assert_eq!(a.transform.center_y.to_bits(), b.transform.center_y.to_bits());
            assert_eq!(a.transform.rotation_radians.to_bits(), b.transform.rotation_radians.to_bits());
            assert_eq!(a.transform.width.to_bits(), b.transform.width.to_bits());
            assert_eq!(a.transform.height.to_bits(), b.transform.height.to_bits());
        }
    }

    #[test]
    fn test_degenerate_inputs() {
        let lm = face(Point2::new(0.0, 0.0), Point2::new(100.0, 0.0));
        let config = PipelineConfig::default();
        assert!(matches!(
            estimate(&lm, 0, 200, 200, 200, &config),
            Err(MediaError::DegenerateGeometry(_))
        ));

        let same = eye(Point2::new(30.0, 30.0), Point2::new(30.0, 30.0));
        let lm = FaceLandmarks::new(
            vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)],
            same.clone(),
            same,
        )
        .unwrap();
        assert!(estimate(&lm, 100, 100, 100, 100, &config).is_err());

        // A manual width rescues coincident eyes.
        let config = config.with_manual_size(Some(80.0), None);
        assert!(estimate(&lm, 100, 100, 100, 100, &config).is_ok());
    }
}
