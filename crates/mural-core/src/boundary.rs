//! Boundary lock and strict paint gate.
//!
//! At selection time the plane's boundary polygon and transform are frozen
//! into an owned snapshot. The live plane keeps growing and merging after
//! that, but paint is confined to the frozen polygon: every candidate
//! sample is projected into the lock-time plane frame and tested against
//! the snapshot. The optional anchor pose (a drift-resistant reference
//! from the AR system) becomes the parent frame for all strokes; the live
//! plane transform is never read again after the lock.

use nalgebra::Point2;

use crate::geometry::{point_in_polygon, snapshot_boundary, Pose};
use crate::plane::{PlaneHit, PlaneId, PlaneSet, TrackedPlane};

/// Frozen selection: polygon, lock-time transform, optional anchor.
#[derive(Debug, Clone)]
pub struct LockedBoundary {
    plane_id: PlaneId,
    polygon: Vec<Point2<f64>>,
    /// Plane-local-to-world transform captured at lock time. Cached so the
    /// gate never drifts with later plane refinement.
    plane_pose_at_lock: Pose,
    anchor: Option<Pose>,
}

impl LockedBoundary {
    /// Snapshot `plane` into a lock. Returns `None` while the plane's
    /// boundary is not yet usable; the caller must treat that as "not
    /// ready" and keep the selection pending.
    #[must_use]
    pub fn lock(plane: &TrackedPlane, anchor: Option<Pose>) -> Option<Self> {
        let polygon = snapshot_boundary(&plane.boundary)?;
        Some(Self {
            plane_id: plane.id,
            polygon,
            plane_pose_at_lock: plane.pose,
            anchor,
        })
    }

    /// The locked plane's id (as it was at lock time).
    #[must_use]
    pub fn plane_id(&self) -> PlaneId {
        self.plane_id
    }

    /// The frozen boundary polygon, for a render-once selection outline.
    /// Never regenerated.
    #[must_use]
    pub fn outline(&self) -> &[Point2<f64>] {
        &self.polygon
    }

    /// The plane transform captured at lock time.
    #[must_use]
    pub fn pose_at_lock(&self) -> &Pose {
        &self.plane_pose_at_lock
    }

    /// The frame strokes are parented under: the stabilizing anchor when
    /// one was granted, otherwise the lock-time plane pose.
    #[must_use]
    pub fn strokes_frame(&self) -> &Pose {
        self.anchor.as_ref().unwrap_or(&self.plane_pose_at_lock)
    }

    /// Strict paint gate. Accepts a hit only when it lands on the locked
    /// plane (resolved through merges on both sides) and its projection
    /// into the lock-time plane frame falls inside the frozen polygon.
    ///
    /// Growth of the live plane after the lock can never widen the
    /// accepted region.
    #[must_use]
    pub fn accept(&self, planes: &PlaneSet, hit: &PlaneHit) -> bool {
        if planes.resolve_root(hit.plane_id) != planes.resolve_root(self.plane_id) {
            return false;
        }
        let local = self
            .plane_pose_at_lock
            .inverse_transform_point(&hit.pose.position);
        // Boundary coordinates are plane-local (x, z).
        point_in_polygon(Point2::new(local.x, local.z), &self.polygon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plane::PlanesChanged;
    use crate::test_utils::{hit_at, square_plane};
    use nalgebra::{UnitQuaternion, Vector3};

    fn locked_setup(side: f64) -> (PlaneSet, LockedBoundary) {
        let mut planes = PlaneSet::new();
        let plane = square_plane(PlaneId(1), side);
        let lock = LockedBoundary::lock(&plane, None).unwrap();
        planes.apply(&PlanesChanged {
            added: vec![plane],
            ..Default::default()
        });
        (planes, lock)
    }

    #[test]
    fn test_lock_requires_boundary() {
        let mut bare = square_plane(PlaneId(1), 1.0);
        bare.boundary.clear();
        assert!(LockedBoundary::lock(&bare, None).is_none());
    }

    #[test]
    fn test_accept_inside_reject_outside() {
        let (planes, lock) = locked_setup(1.0);
        assert!(lock.accept(&planes, &hit_at(PlaneId(1), Vector3::new(0.2, 0.0, 0.2))));
        assert!(!lock.accept(&planes, &hit_at(PlaneId(1), Vector3::new(1.5, 0.0, 0.2))));
    }

    #[test]
    fn test_growth_after_lock_does_not_widen_gate() {
        // The live plane doubles in size; the gate still uses the frozen
        // 1 m square.
        let (mut planes, lock) = locked_setup(1.0);
        planes.apply(&PlanesChanged {
            updated: vec![square_plane(PlaneId(1), 2.0)],
            ..Default::default()
        });
        assert!(!lock.accept(&planes, &hit_at(PlaneId(1), Vector3::new(0.9, 0.0, 0.0))));
        assert!(lock.accept(&planes, &hit_at(PlaneId(1), Vector3::new(0.4, 0.0, 0.0))));
    }

    #[test]
    fn test_wrong_plane_rejected() {
        let (mut planes, lock) = locked_setup(1.0);
        planes.apply(&PlanesChanged {
            added: vec![square_plane(PlaneId(2), 1.0)],
            ..Default::default()
        });
        assert!(!lock.accept(&planes, &hit_at(PlaneId(2), Vector3::new(0.0, 0.0, 0.0))));
    }

    #[test]
    fn test_hit_on_merged_id_accepted() {
        let (mut planes, lock) = locked_setup(1.0);
        // Plane 1 merges into plane 9; hits now report id 9.
        let mut old = square_plane(PlaneId(1), 1.0);
        old.subsumed_by = Some(PlaneId(9));
        planes.apply(&PlanesChanged {
            added: vec![square_plane(PlaneId(9), 3.0)],
            updated: vec![old],
            ..Default::default()
        });
        assert!(lock.accept(&planes, &hit_at(PlaneId(9), Vector3::new(0.2, 0.0, 0.0))));
        // But still bounded by the original polygon.
        assert!(!lock.accept(&planes, &hit_at(PlaneId(9), Vector3::new(1.2, 0.0, 0.0))));
    }

    #[test]
    fn test_gate_uses_lock_time_pose() {
        // Lock, then move the live plane; the gate must keep projecting
        // with the captured pose.
        let mut planes = PlaneSet::new();
        let plane = square_plane(PlaneId(1), 1.0);
        let lock = LockedBoundary::lock(&plane, None).unwrap();
        let mut moved = plane.clone();
        moved.pose = Pose::new(
            Vector3::new(5.0, 0.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 1.0),
        );
        planes.apply(&PlanesChanged {
            added: vec![moved],
            ..Default::default()
        });
        // World origin was inside the boundary at lock time.
        assert!(lock.accept(&planes, &hit_at(PlaneId(1), Vector3::zeros())));
        // The live plane's new center is not.
        assert!(!lock.accept(&planes, &hit_at(PlaneId(1), Vector3::new(5.0, 0.0, 0.0))));
    }

    #[test]
    fn test_lock_on_irregular_boundary() {
        use crate::test_utils::jittered_plane;
        use rand::{rngs::StdRng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(7);
        let mut planes = PlaneSet::new();
        let plane = jittered_plane(PlaneId(1), 1.0, 12, &mut rng);
        let lock = LockedBoundary::lock(&plane, None).unwrap();
        planes.apply(&PlanesChanged {
            added: vec![plane],
            ..Default::default()
        });
        // The star polygon always contains its center; vertex radii top
        // out at 1.0 so anything past that is outside.
        assert!(lock.accept(&planes, &hit_at(PlaneId(1), Vector3::zeros())));
        assert!(!lock.accept(&planes, &hit_at(PlaneId(1), Vector3::new(2.0, 0.0, 0.0))));
    }

    #[test]
    fn test_strokes_frame_prefers_anchor() {
        let plane = square_plane(PlaneId(1), 1.0);
        let anchor = Pose::from_position(Vector3::new(0.1, 0.2, 0.3));
        let lock = LockedBoundary::lock(&plane, Some(anchor)).unwrap();
        assert_eq!(lock.strokes_frame().position, anchor.position);

        let bare = LockedBoundary::lock(&plane, None).unwrap();
        assert_eq!(bare.strokes_frame(), &plane.pose);
    }
}
