//! Tracked-plane mirror: the core's read-only view of the AR engine's
//! plane set, maintained from add/update/remove events.
//!
//! The engine may merge overlapping detections; a merged plane carries a
//! `subsumed_by` back-reference. [`PlaneSet::resolve_root`] follows those
//! links to the terminal plane, so two references compare equal iff they
//! resolve to the same root.

use std::collections::HashMap;

use nalgebra::{Point2, Vector3};

use crate::geometry::{polygon_area, Pose};

/// Opaque identifier assigned by the AR engine to a tracked plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlaneId(pub u32);

/// Alignment class reported by the engine for a detected plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PlaneAlignment {
    /// Horizontal plane with the normal pointing up (floor, table).
    HorizontalUp,
    /// Horizontal plane with the normal pointing down (ceiling).
    HorizontalDown,
    /// Vertical plane (wall).
    Vertical,
}

impl PlaneAlignment {
    /// True for either horizontal variant.
    #[must_use]
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::HorizontalUp | Self::HorizontalDown)
    }

    /// The detection mode that keeps finding planes of this alignment.
    #[must_use]
    pub fn detection_mode(self) -> DetectionMode {
        if self.is_horizontal() {
            DetectionMode::Horizontal
        } else {
            DetectionMode::Vertical
        }
    }
}

/// Which plane alignments the engine should keep detecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DetectionMode {
    /// Detection disabled entirely.
    Off,
    /// Horizontal planes only.
    Horizontal,
    /// Vertical planes only.
    Vertical,
    /// Both horizontal and vertical planes.
    All,
}

impl DetectionMode {
    /// Whether a plane of the given alignment matches this mode.
    #[must_use]
    pub fn accepts(self, alignment: PlaneAlignment) -> bool {
        match self {
            Self::Off => false,
            Self::Horizontal => alignment.is_horizontal(),
            Self::Vertical => alignment == PlaneAlignment::Vertical,
            Self::All => true,
        }
    }
}

/// Snapshot of one engine-tracked plane.
///
/// The boundary polygon is ordered 2D points in plane-local (x, z); the
/// plane normal is local +Y of `pose`.
#[derive(Debug, Clone)]
pub struct TrackedPlane {
    /// Engine identifier.
    pub id: PlaneId,
    /// Alignment class.
    pub alignment: PlaneAlignment,
    /// Boundary polygon in plane-local (x, z). May be empty early in the
    /// plane's life.
    pub boundary: Vec<Point2<f64>>,
    /// Plane-local-to-world transform. Keeps updating as the engine
    /// refines the plane.
    pub pose: Pose,
    /// Set when the engine merged this plane into another.
    pub subsumed_by: Option<PlaneId>,
}

impl TrackedPlane {
    /// Current boundary polygon area in m².
    #[must_use]
    pub fn area(&self) -> f64 {
        polygon_area(&self.boundary)
    }

    /// Plane normal in world space.
    #[must_use]
    pub fn normal(&self) -> Vector3<f64> {
        self.pose.up()
    }

    /// Distance from the camera to the plane's center.
    #[must_use]
    pub fn distance_to(&self, camera: &Pose) -> f64 {
        (self.pose.position - camera.position).norm()
    }
}

/// One batch of plane changes reported by the engine.
#[derive(Debug, Clone, Default)]
pub struct PlanesChanged {
    /// Newly detected planes.
    pub added: Vec<TrackedPlane>,
    /// Planes whose boundary/pose/subsumption changed.
    pub updated: Vec<TrackedPlane>,
    /// Planes the engine stopped tracking.
    pub removed: Vec<PlaneId>,
}

/// The set of currently tracked planes, keyed by id.
#[derive(Debug, Default)]
pub struct PlaneSet {
    planes: HashMap<PlaneId, TrackedPlane>,
}

impl PlaneSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one batch of engine changes.
    pub fn apply(&mut self, changes: &PlanesChanged) {
        for p in changes.added.iter().chain(changes.updated.iter()) {
            self.planes.insert(p.id, p.clone());
        }
        for id in &changes.removed {
            self.planes.remove(id);
        }
    }

    /// Look up a plane by id.
    #[must_use]
    pub fn get(&self, id: PlaneId) -> Option<&TrackedPlane> {
        self.planes.get(&id)
    }

    /// Follow `subsumed_by` links to the terminal (root) plane id.
    ///
    /// Idempotent, and always reflects the current merge chain. A link to
    /// an unknown plane terminates at the last known id; the step bound
    /// guards against a malformed cyclic chain.
    #[must_use]
    pub fn resolve_root(&self, id: PlaneId) -> PlaneId {
        let mut current = id;
        let mut steps = self.planes.len();
        while let Some(next) = self.planes.get(&current).and_then(|p| p.subsumed_by) {
            if steps == 0 || next == current {
                break;
            }
            if !self.planes.contains_key(&next) {
                return next;
            }
            current = next;
            steps -= 1;
        }
        current
    }

    /// Look up the root plane for `id`.
    #[must_use]
    pub fn root_plane(&self, id: PlaneId) -> Option<&TrackedPlane> {
        self.planes.get(&self.resolve_root(id))
    }

    /// Iterate all tracked planes.
    pub fn iter(&self) -> impl Iterator<Item = &TrackedPlane> {
        self.planes.values()
    }

    /// Number of tracked planes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.planes.len()
    }

    /// True when no planes are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    /// Whether `id` is currently tracked.
    #[must_use]
    pub fn contains(&self, id: PlaneId) -> bool {
        self.planes.contains_key(&id)
    }

    /// Forget all planes (session reset).
    pub fn clear(&mut self) {
        self.planes.clear();
    }
}

/// A ray/plane intersection from the engine's hit tester.
#[derive(Debug, Clone, Copy)]
pub struct PlaneHit {
    /// The plane that was hit (possibly a subsumed, non-root id).
    pub plane_id: PlaneId,
    /// Hit pose: position on the plane, local +Y along the plane normal.
    pub pose: Pose,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::square_plane;
    use proptest::prelude::*;

    fn chain(set: &mut PlaneSet, ids: &[u32]) {
        // ids[i] subsumed by ids[i+1]
        let mut added = Vec::new();
        for (i, &id) in ids.iter().enumerate() {
            let mut p = square_plane(PlaneId(id), 1.0);
            p.subsumed_by = ids.get(i + 1).map(|&n| PlaneId(n));
            added.push(p);
        }
        set.apply(&PlanesChanged {
            added,
            ..Default::default()
        });
    }

    #[test]
    fn test_resolve_root_chain() {
        let mut set = PlaneSet::new();
        chain(&mut set, &[1, 2, 3]);
        assert_eq!(set.resolve_root(PlaneId(1)), PlaneId(3));
        assert_eq!(set.resolve_root(PlaneId(2)), PlaneId(3));
        assert_eq!(set.resolve_root(PlaneId(3)), PlaneId(3));
        // Unknown ids resolve to themselves.
        assert_eq!(set.resolve_root(PlaneId(99)), PlaneId(99));
    }

    #[test]
    fn test_resolve_root_follows_new_merges() {
        let mut set = PlaneSet::new();
        chain(&mut set, &[1, 2]);
        assert_eq!(set.resolve_root(PlaneId(1)), PlaneId(2));
        // Engine later merges 2 into 3.
        chain(&mut set, &[2, 3]);
        assert_eq!(set.resolve_root(PlaneId(1)), PlaneId(3));
    }

    #[test]
    fn test_resolve_root_dangling_link() {
        let mut set = PlaneSet::new();
        let mut p = square_plane(PlaneId(1), 1.0);
        p.subsumed_by = Some(PlaneId(7)); // 7 was never reported
        set.apply(&PlanesChanged {
            added: vec![p],
            ..Default::default()
        });
        assert_eq!(set.resolve_root(PlaneId(1)), PlaneId(7));
    }

    #[test]
    fn test_resolve_root_cycle_terminates() {
        let mut set = PlaneSet::new();
        chain(&mut set, &[1, 2]);
        // Malformed: 2 points back at 1.
        let mut p2 = square_plane(PlaneId(2), 1.0);
        p2.subsumed_by = Some(PlaneId(1));
        set.apply(&PlanesChanged {
            updated: vec![p2],
            ..Default::default()
        });
        // Must terminate; exact result is unspecified for malformed input.
        let _ = set.resolve_root(PlaneId(1));
    }

    #[test]
    fn test_apply_removes() {
        let mut set = PlaneSet::new();
        chain(&mut set, &[1, 2]);
        set.apply(&PlanesChanged {
            removed: vec![PlaneId(1)],
            ..Default::default()
        });
        assert!(!set.contains(PlaneId(1)));
        assert!(set.contains(PlaneId(2)));
    }

    #[test]
    fn test_detection_mode_accepts() {
        assert!(DetectionMode::Horizontal.accepts(PlaneAlignment::HorizontalUp));
        assert!(DetectionMode::Horizontal.accepts(PlaneAlignment::HorizontalDown));
        assert!(!DetectionMode::Horizontal.accepts(PlaneAlignment::Vertical));
        assert!(DetectionMode::Vertical.accepts(PlaneAlignment::Vertical));
        assert!(DetectionMode::All.accepts(PlaneAlignment::Vertical));
        assert!(!DetectionMode::Off.accepts(PlaneAlignment::HorizontalUp));
    }

    proptest! {
        // Root resolution is idempotent for arbitrary merge forests.
        #[test]
        fn prop_resolve_root_idempotent(links in proptest::collection::vec(0u32..16, 1..16)) {
            let mut set = PlaneSet::new();
            let mut added = Vec::new();
            for (i, &target) in links.iter().enumerate() {
                let id = PlaneId(i as u32);
                let mut p = square_plane(id, 1.0);
                // Only allow links to strictly higher ids: a valid merge DAG.
                let t = PlaneId(target);
                p.subsumed_by = (t.0 > id.0).then_some(t);
                added.push(p);
            }
            set.apply(&PlanesChanged { added, ..Default::default() });

            for i in 0..links.len() as u32 {
                let once = set.resolve_root(PlaneId(i));
                let twice = set.resolve_root(once);
                prop_assert_eq!(once, twice);
                // The root never has a known subsumed_by link.
                if let Some(p) = set.get(once) {
                    prop_assert!(p.subsumed_by.is_none() || !set.contains(p.subsumed_by.unwrap()));
                }
            }
        }
    }
}
