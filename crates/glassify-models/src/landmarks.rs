//! Facial landmark sets returned by a detector.
//!
//! # Landmarks Layout (68-point model)
//!
//! - 0-16: Jaw outline
//! - 36-41: Left eye (outer corner first, inner corner at offset 3)
//! - 42-47: Right eye (inner corner first, outer corner at offset 3)
//!
//! Only the jaw and both eyes are retained; the pipeline needs nothing else.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::geometry::Point2;

/// Jaw outline indices in the 68-point layout.
pub const JAW_RANGE: std::ops::RangeInclusive<usize> = 0..=16;
/// Left eye indices in the 68-point layout.
pub const LEFT_EYE_RANGE: std::ops::RangeInclusive<usize> = 36..=41;
/// Right eye indices in the 68-point layout.
pub const RIGHT_EYE_RANGE: std::ops::RangeInclusive<usize> = 42..=47;

/// Minimum jaw points needed to measure head roll.
pub const MIN_JAW_POINTS: usize = 2;
/// Minimum eye points needed to locate both eye corners.
pub const MIN_EYE_POINTS: usize = 4;

/// Landmarks for one detected face, in source-pixel space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LandmarkSets")]
pub struct FaceLandmarks {
    jaw: Vec<Point2>,
    left_eye: Vec<Point2>,
    right_eye: Vec<Point2>,
}

/// Unvalidated wire form; deserialization goes through `FaceLandmarks::new`.
#[derive(Deserialize)]
struct LandmarkSets {
    jaw: Vec<Point2>,
    left_eye: Vec<Point2>,
    right_eye: Vec<Point2>,
}

impl TryFrom<LandmarkSets> for FaceLandmarks {
    type Error = ModelError;

    fn try_from(sets: LandmarkSets) -> ModelResult<Self> {
        Self::new(sets.jaw, sets.left_eye, sets.right_eye)
    }
}

impl FaceLandmarks {
    /// Create a landmark set, validating that every region is usable.
    pub fn new(jaw: Vec<Point2>, left_eye: Vec<Point2>, right_eye: Vec<Point2>) -> ModelResult<Self> {
        if jaw.len() < MIN_JAW_POINTS {
            return Err(ModelError::invalid_landmarks(format!(
                "jaw outline needs at least {} points, got {}",
                MIN_JAW_POINTS,
                jaw.len()
            )));
        }
        for (name, eye) in [("left eye", &left_eye), ("right eye", &right_eye)] {
            if eye.len() < MIN_EYE_POINTS {
                return Err(ModelError::invalid_landmarks(format!(
                    "{} needs at least {} points, got {}",
                    name,
                    MIN_EYE_POINTS,
                    eye.len()
                )));
            }
        }
        let all_finite = jaw
            .iter()
            .chain(&left_eye)
            .chain(&right_eye)
            .all(|p| p.x.is_finite() && p.y.is_finite());
        if !all_finite {
            return Err(ModelError::invalid_landmarks("non-finite coordinate"));
        }
        Ok(Self {
            jaw,
            left_eye,
            right_eye,
        })
    }

    /// Build from a full 68-point landmark list.
    pub fn from_68_points(points: &[Point2]) -> ModelResult<Self> {
        if points.len() < 68 {
            return Err(ModelError::invalid_landmarks(format!(
                "expected 68 points, got {}",
                points.len()
            )));
        }
        Self::new(
            points[JAW_RANGE].to_vec(),
            points[LEFT_EYE_RANGE].to_vec(),
            points[RIGHT_EYE_RANGE].to_vec(),
        )
    }

    pub fn jaw(&self) -> &[Point2] {
        &self.jaw
    }

    pub fn left_eye(&self) -> &[Point2] {
        &self.left_eye
    }

    pub fn right_eye(&self) -> &[Point2] {
        &self.right_eye
    }

    /// First and last jaw points (left and right jaw references).
    pub fn jaw_endpoints(&self) -> (Point2, Point2) {
        // Length is validated in `new`.
        (self.jaw[0], self.jaw[self.jaw.len() - 1])
    }

    /// Left eye centre in source space: midpoint of corners 0 and 3.
    pub fn left_eye_center(&self) -> Point2 {
        self.left_eye[0].midpoint(&self.left_eye[3])
    }

    /// Right eye centre in source space: midpoint of corners 0 and 3.
    pub fn right_eye_center(&self) -> Point2 {
        self.right_eye[0].midpoint(&self.right_eye[3])
    }
}
