//! Synthetic planes and scripted engine doubles.
//!
//! Public so integration tests (and host-side harnesses) can drive a full
//! session without a real AR engine behind it.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use nalgebra::{Point2, Vector3};
use rand::Rng;

use crate::geometry::Pose;
use crate::plane::{DetectionMode, PlaneAlignment, PlaneHit, PlaneId, TrackedPlane};
use crate::session::{AnchorProvider, EngineSink, RayHitTester};

/// A horizontal plane at the world origin with a centered square boundary
/// of the given side length.
#[must_use]
pub fn square_plane(id: PlaneId, side: f64) -> TrackedPlane {
    let h = side / 2.0;
    TrackedPlane {
        id,
        alignment: PlaneAlignment::HorizontalUp,
        boundary: vec![
            Point2::new(-h, -h),
            Point2::new(h, -h),
            Point2::new(h, h),
            Point2::new(-h, h),
        ],
        pose: Pose::identity(),
        subsumed_by: None,
    }
}

/// A [`square_plane`] sized to the given boundary area in m².
#[must_use]
pub fn square_plane_with_area(id: PlaneId, area: f64) -> TrackedPlane {
    square_plane(id, area.sqrt())
}

/// An irregular horizontal plane: a star-shaped polygon whose vertex radii
/// jitter around `radius`. Closer to what real boundary triangulation
/// produces than a clean square.
#[must_use]
pub fn jittered_plane<R: Rng>(id: PlaneId, radius: f64, vertices: usize, rng: &mut R) -> TrackedPlane {
    let n = vertices.max(3);
    let boundary = (0..n)
        .map(|i| {
            let angle = (i as f64) / (n as f64) * std::f64::consts::TAU;
            let r = radius * rng.gen_range(0.6..1.0);
            Point2::new(r * angle.cos(), r * angle.sin())
        })
        .collect();
    TrackedPlane {
        id,
        alignment: PlaneAlignment::HorizontalUp,
        boundary,
        pose: Pose::identity(),
        subsumed_by: None,
    }
}

/// A hit on `id` at the given world position, facing up.
#[must_use]
pub fn hit_at(id: PlaneId, position: Vector3<f64>) -> PlaneHit {
    PlaneHit {
        plane_id: id,
        pose: Pose::from_position(position),
    }
}

/// A hit on `id` at the world origin.
#[must_use]
pub fn hit_on(id: PlaneId) -> PlaneHit {
    hit_at(id, Vector3::zeros())
}

/// Scripted screen-center hit tester: plays back a fixed per-frame hit
/// sequence.
pub struct ScriptedHits {
    frames: RefCell<VecDeque<Option<PlaneHit>>>,
    hold_last: bool,
}

impl ScriptedHits {
    /// Play back `frames` in order; frames after the script ends report no
    /// hit.
    #[must_use]
    pub fn new(frames: Vec<Option<PlaneHit>>) -> Self {
        Self {
            frames: RefCell::new(frames.into()),
            hold_last: false,
        }
    }

    /// Report the same hit every frame, forever.
    #[must_use]
    pub fn always(hit: PlaneHit) -> Self {
        Self {
            frames: RefCell::new(vec![Some(hit)].into()),
            hold_last: true,
        }
    }
}

impl RayHitTester for ScriptedHits {
    fn raycast_center(&self) -> Option<PlaneHit> {
        let mut frames = self.frames.borrow_mut();
        if self.hold_last && frames.len() == 1 {
            return *frames.front().unwrap_or(&None);
        }
        frames.pop_front().flatten()
    }
}

/// Anchor provider that always answers with the same pose (or always
/// declines).
pub struct FixedAnchors(pub Option<Pose>);

impl AnchorProvider for FixedAnchors {
    fn attach_anchor(&mut self, _plane: PlaneId, _pose: &Pose) -> Option<Pose> {
        self.0
    }
}

/// A command the session issued to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCommand {
    /// `set_detection_mode` call.
    Detection(DetectionMode),
    /// `set_mesh_visible` call.
    MeshVisible(PlaneId, bool),
}

/// Engine sink that records every command. Clones share the same log, so
/// a test can keep one handle and hand the other to the session.
#[derive(Clone, Default)]
pub struct RecordingEngine {
    log: Rc<RefCell<Vec<EngineCommand>>>,
}

impl RecordingEngine {
    /// Every command received so far, in order.
    #[must_use]
    pub fn commands(&self) -> Vec<EngineCommand> {
        self.log.borrow().clone()
    }

    /// The detection modes set so far, in order.
    #[must_use]
    pub fn detection_modes(&self) -> Vec<DetectionMode> {
        self.log
            .borrow()
            .iter()
            .filter_map(|c| match c {
                EngineCommand::Detection(m) => Some(*m),
                EngineCommand::MeshVisible(..) => None,
            })
            .collect()
    }

    /// The most recent visibility set for `plane`, if any.
    #[must_use]
    pub fn mesh_visible(&self, plane: PlaneId) -> Option<bool> {
        self.log
            .borrow()
            .iter()
            .rev()
            .find_map(|c| match c {
                EngineCommand::MeshVisible(id, v) if *id == plane => Some(*v),
                _ => None,
            })
    }
}

impl EngineSink for RecordingEngine {
    fn set_detection_mode(&mut self, mode: DetectionMode) {
        self.log.borrow_mut().push(EngineCommand::Detection(mode));
    }

    fn set_mesh_visible(&mut self, plane: PlaneId, visible: bool) {
        self.log
            .borrow_mut()
            .push(EngineCommand::MeshVisible(plane, visible));
    }
}
