//! 2D geometry primitives shared by the estimator and the compositor.

use serde::{Deserialize, Serialize};

/// A point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    /// Create a new point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Midpoint between two points.
    #[inline]
    pub fn midpoint(&self, other: &Point2) -> Point2 {
        Point2::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point2) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Scale each axis independently.
    #[inline]
    pub fn scaled(&self, scale_x: f64, scale_y: f64) -> Point2 {
        Point2::new(self.x * scale_x, self.y * scale_y)
    }
}

impl From<(f64, f64)> for Point2 {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// Affine transform in row-major 2x3 form.
///
/// Maps `(x, y)` to `(a*x + b*y + c, d*x + e*y + f)`. Composition follows the
/// 2D canvas convention: `translate` and `rotate` post-multiply, so the last
/// operation applied is the first one a local point goes through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine2 {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Affine2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine2 {
    pub const IDENTITY: Affine2 = Affine2 {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 0.0,
        e: 1.0,
        f: 0.0,
    };

    /// Pure translation.
    pub fn translation(tx: f64, ty: f64) -> Self {
        Self {
            c: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    /// Pure rotation about the origin (radians, clockwise on a y-down surface).
    pub fn rotation(radians: f64) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self {
            a: cos,
            b: -sin,
            c: 0.0,
            d: sin,
            e: cos,
            f: 0.0,
        }
    }

    /// `self * other`: apply `other` first, then `self`.
    pub fn multiply(&self, other: &Affine2) -> Affine2 {
        Affine2 {
            a: self.a * other.a + self.b * other.d,
            b: self.a * other.b + self.b * other.e,
            c: self.a * other.c + self.b * other.f + self.c,
            d: self.d * other.a + self.e * other.d,
            e: self.d * other.b + self.e * other.e,
            f: self.d * other.c + self.e * other.f + self.f,
        }
    }

    /// Post-multiply a translation.
    pub fn translate(&self, tx: f64, ty: f64) -> Affine2 {
        self.multiply(&Affine2::translation(tx, ty))
    }

    /// Post-multiply a rotation.
    pub fn rotate(&self, radians: f64) -> Affine2 {
        self.multiply(&Affine2::rotation(radians))
    }

    /// Map a point through the transform.
    #[inline]
    pub fn apply(&self, p: Point2) -> Point2 {
        Point2::new(
            self.a * p.x + self.b * p.y + self.c,
            self.d * p.x + self.e * p.y + self.f,
        )
    }

    /// Inverse transform, or `None` when the matrix is singular.
    pub fn inverse(&self) -> Option<Affine2> {
        let det = self.a * self.e - self.b * self.d;
        if det.abs() < f64::EPSILON {
            return None;
        }
        let inv = 1.0 / det;
        Some(Affine2 {
            a: self.e * inv,
            b: -self.b * inv,
            c: (self.b * self.f - self.e * self.c) * inv,
            d: -self.d * inv,
            e: self.a * inv,
            f: (self.d * self.c - self.a * self.f) * inv,
        })
    }
}
