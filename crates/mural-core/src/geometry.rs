//! Planar geometry and rigid-transform primitives.
//!
//! Boundary polygons live in plane-local space: the plane normal is local
//! +Y and the polygon is ordered 2D points on the local (x, z) plane.

use nalgebra::{Point2, UnitQuaternion, Vector3};

/// A rigid transform: rotation followed by translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// World-space position.
    pub position: Vector3<f64>,
    /// World-space orientation.
    pub rotation: UnitQuaternion<f64>,
}

impl Pose {
    /// Create a new pose.
    #[must_use]
    pub fn new(position: Vector3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Self { position, rotation }
    }

    /// The identity pose.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
        }
    }

    /// A pose at `position` with no rotation.
    #[must_use]
    pub fn from_position(position: Vector3<f64>) -> Self {
        Self {
            position,
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Compose two poses: the result maps `b`-local coordinates through `b`
    /// then through `self`. Rotate first, then translate.
    #[must_use]
    pub fn compose(&self, b: &Pose) -> Pose {
        Pose {
            position: self.position + self.rotation * b.position,
            rotation: self.rotation * b.rotation,
        }
    }

    /// Invert the transform.
    #[must_use]
    pub fn inverse(&self) -> Pose {
        let inv_rot = self.rotation.inverse();
        Pose {
            position: -(inv_rot * self.position),
            rotation: inv_rot,
        }
    }

    /// Map a point from this pose's local frame into world space.
    #[must_use]
    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.position + self.rotation * p
    }

    /// Map a world-space point into this pose's local frame.
    #[must_use]
    pub fn inverse_transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation.inverse() * (p - self.position)
    }

    /// Local +Y in world space. For a plane pose this is the plane normal.
    #[must_use]
    pub fn up(&self) -> Vector3<f64> {
        self.rotation * Vector3::y()
    }
}

/// Even-odd (ray casting) point-in-polygon test.
///
/// A polygon with fewer than 3 vertices accepts everything (fail-open):
/// the gate must not block input before a boundary exists. Callers that
/// need fail-closed semantics must check the vertex count themselves.
#[must_use]
pub fn point_in_polygon(p: Point2<f64>, poly: &[Point2<f64>]) -> bool {
    if poly.len() < 3 {
        return true;
    }
    let mut inside = false;
    let mut j = poly.len() - 1;
    for i in 0..poly.len() {
        let (a, b) = (poly[i], poly[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Polygon area via the shoelace formula: |signed sum| / 2.
/// Degenerate polygons (fewer than 3 vertices) have zero area.
#[must_use]
pub fn polygon_area(poly: &[Point2<f64>]) -> f64 {
    if poly.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..poly.len() {
        let j = (i + 1) % poly.len();
        sum += poly[i].x * poly[j].y - poly[j].x * poly[i].y;
    }
    (0.5 * sum).abs()
}

/// Deep-copy a live boundary polygon into an owned value buffer.
///
/// Returns `None` when the boundary is not yet usable (fewer than 3
/// vertices). `None` means "not ready", never "empty region"; a caller
/// must not lock onto it.
#[must_use]
pub fn snapshot_boundary(boundary: &[Point2<f64>]) -> Option<Vec<Point2<f64>>> {
    if boundary.len() < 3 {
        return None;
    }
    Some(boundary.to_vec())
}
