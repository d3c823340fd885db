//! Session flow controller.
//!
//! Glues the pipeline stages together and enforces the per-frame order:
//! plane events first, then the quality filter, then the reticle
//! selector, then the boundary gate, then the compositor. Stages outside
//! the current phase are skipped entirely, so e.g. no dab can ever be
//! placed while scanning.
//!
//! The session talks to the host AR engine only through three narrow
//! traits handed in at construction; there is no global engine state.

use nalgebra::Point2;
use tracing::{debug, info};

use crate::boundary::LockedBoundary;
use crate::config::{BrushConfig, FilterConfig, SelectorConfig};
use crate::filter::PlaneQualityFilter;
use crate::geometry::Pose;
use crate::plane::{DetectionMode, PlaneHit, PlaneId, PlaneSet, PlanesChanged};
use crate::selector::{SelectorEvent, SurfaceSelector};
use crate::stroke::{
    AcceptedSample, BrushShape, CaptureRequest, Color, PaintEvent, StrokeCompositor,
};

/// Where the session is in the scan/select/paint flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Created but not scanning yet.
    Idle,
    /// Detecting planes and waiting for a selectable surface.
    Scanning,
    /// A boundary is locked; painting has not started.
    PlaneSelected,
    /// Actively accepting paint samples.
    Painting,
}

/// Screen-center hit testing against tracked planes.
pub trait RayHitTester {
    /// The plane hit under the screen center this frame, if any.
    fn raycast_center(&self) -> Option<PlaneHit>;
}

/// Drift-resistant anchor creation at selection time.
pub trait AnchorProvider {
    /// Attach an anchor on `plane` at `pose`. `None` means the engine
    /// declined; the session falls back to the unanchored lock-time pose.
    fn attach_anchor(&mut self, plane: PlaneId, pose: &Pose) -> Option<Pose>;
}

/// Commands the session sends back to the AR engine.
pub trait EngineSink {
    /// Restrict (or widen) which plane alignments the engine detects.
    fn set_detection_mode(&mut self, mode: DetectionMode);
    /// Show or hide a plane's debug mesh.
    fn set_mesh_visible(&mut self, plane: PlaneId, visible: bool);
}

/// One frame of input to [`GraffitiSession::update`].
#[derive(Debug, Clone)]
pub struct FrameInput {
    /// Session time in seconds.
    pub now: f64,
    /// Camera pose this frame.
    pub camera: Pose,
    /// Plane tracking changes delivered this frame, if any.
    pub planes_changed: Option<PlanesChanged>,
}

/// Configuration bundle for a session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionConfig {
    /// Quality gates for the plane quality filter.
    pub filter: FilterConfig,
    /// Reticle dwell settings.
    pub selector: SelectorConfig,
    /// Brush and compositor behavior.
    pub brush: BrushConfig,
}

/// The flow controller: owns the plane mirror, all pipeline stages, and
/// the engine-facing trait objects.
pub struct GraffitiSession {
    phase: Phase,
    planes: PlaneSet,
    filter: PlaneQualityFilter,
    selector: SurfaceSelector,
    compositor: StrokeCompositor,
    lock: Option<LockedBoundary>,
    /// Set once the first reticle hit narrows detection to one alignment
    /// class; cleared on rescan.
    alignment_chosen: bool,
    last_camera: Pose,
    last_now: f64,
    hits: Box<dyn RayHitTester>,
    anchors: Box<dyn AnchorProvider>,
    engine: Box<dyn EngineSink>,
}

impl GraffitiSession {
    /// Create an idle session wired to the given engine interfaces.
    #[must_use]
    pub fn new(
        config: SessionConfig,
        hits: Box<dyn RayHitTester>,
        anchors: Box<dyn AnchorProvider>,
        engine: Box<dyn EngineSink>,
    ) -> Self {
        Self {
            phase: Phase::Idle,
            planes: PlaneSet::new(),
            filter: PlaneQualityFilter::new(config.filter),
            selector: SurfaceSelector::new(config.selector),
            compositor: StrokeCompositor::new(config.brush),
            lock: None,
            alignment_chosen: false,
            last_camera: Pose::identity(),
            last_now: 0.0,
            hits,
            anchors,
            engine,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The frozen boundary polygon of the locked selection, if any.
    #[must_use]
    pub fn locked_outline(&self) -> Option<&[Point2<f64>]> {
        self.lock.as_ref().map(LockedBoundary::outline)
    }

    /// Whether the scan has produced a surface the user can confirm.
    /// Drives the "select surface" affordance.
    #[must_use]
    pub fn selection_ready(&self) -> bool {
        self.phase == Phase::Scanning && self.chosen_plane().is_some()
    }

    /// Start (or restart) scanning: widen detection, forget previous
    /// choices, and destroy any existing paint. Returns the resulting
    /// render events.
    pub fn begin_scan(&mut self) -> Vec<PaintEvent> {
        info!("scan started");
        self.phase = Phase::Scanning;
        self.lock = None;
        self.alignment_chosen = false;
        self.filter.reset();
        self.selector.reset();
        self.engine.set_detection_mode(DetectionMode::All);
        self.compositor.clear_all()
    }

    /// Drop the lock and go back to scanning, keeping existing paint.
    pub fn reselect(&mut self) {
        info!("reselect requested");
        self.phase = Phase::Scanning;
        self.lock = None;
        self.alignment_chosen = false;
        self.filter.reset();
        self.selector.reset();
        self.engine.set_detection_mode(DetectionMode::All);
    }

    /// Freeze the chosen plane's boundary and move to `PlaneSelected`.
    /// No-op (returns `false`) when scanning has not produced a usable
    /// surface yet.
    pub fn confirm_selection(&mut self) -> bool {
        if self.phase != Phase::Scanning {
            return false;
        }
        let Some(id) = self.chosen_plane() else {
            return false;
        };
        let root = self.planes.resolve_root(id);
        let Some(plane) = self.planes.get(root) else {
            return false;
        };
        let anchor = self.anchors.attach_anchor(root, &plane.pose);
        let Some(lock) = LockedBoundary::lock(plane, anchor) else {
            debug!(plane = root.0, "boundary not ready; selection stays pending");
            return false;
        };
        info!(plane = root.0, anchored = anchor.is_some(), "boundary locked");
        self.engine
            .set_detection_mode(plane.alignment.detection_mode());
        self.lock = Some(lock);
        self.phase = Phase::PlaneSelected;
        true
    }

    /// Enter painting. Requires a locked boundary.
    pub fn start_painting(&mut self) {
        if self.phase == Phase::PlaneSelected && self.lock.is_some() {
            self.phase = Phase::Painting;
            self.compositor.start_painting();
        }
    }

    /// Leave painting, keeping the lock and the paint.
    pub fn stop_painting(&mut self) {
        if self.phase == Phase::Painting {
            self.phase = Phase::PlaneSelected;
            self.compositor.stop_painting();
        }
    }

    /// Advance the session by one frame.
    pub fn update(&mut self, frame: &FrameInput) -> Vec<PaintEvent> {
        let _span = tracing::info_span!("session_update", phase = ?self.phase).entered();
        self.last_camera = frame.camera;
        self.last_now = frame.now;
        if self.phase == Phase::Idle {
            return Vec::new();
        }

        // Plane events land first so every later stage sees this frame's
        // merge chains.
        let planes_arrived = frame.planes_changed.is_some();
        if let Some(changed) = &frame.planes_changed {
            self.planes.apply(changed);
        }

        match self.phase {
            Phase::Idle => Vec::new(),
            Phase::Scanning => {
                self.update_scanning(frame, planes_arrived);
                Vec::new()
            }
            Phase::PlaneSelected => {
                self.filter.maintain(&self.planes);
                self.selector.update(&self.planes, None, frame.now);
                Vec::new()
            }
            Phase::Painting => {
                self.filter.maintain(&self.planes);
                self.update_painting()
            }
        }
    }

    fn update_scanning(&mut self, frame: &FrameInput, planes_arrived: bool) {
        let hit = self.hits.raycast_center();

        // The first surface the reticle touches decides which alignment
        // class this session is about.
        if !self.alignment_chosen {
            if let Some(plane) = hit
                .as_ref()
                .and_then(|h| self.planes.root_plane(h.plane_id))
            {
                let mode = plane.alignment.detection_mode();
                debug!(?mode, "narrowing detection to first-hit alignment");
                self.filter.set_preferred_mode(mode);
                self.engine.set_detection_mode(mode);
                self.alignment_chosen = true;
            }
        }

        if planes_arrived {
            self.filter
                .on_planes_changed(&self.planes, &frame.camera, frame.now);
        } else {
            self.filter.maintain(&self.planes);
        }

        // Selector first, so commit-frame visibility already reflects the
        // committed plane.
        if let Some(SelectorEvent::Committed { plane, narrow_to }) =
            self.selector.update(&self.planes, hit.as_ref(), frame.now)
        {
            info!(plane = plane.0, "reticle dwell committed");
            self.engine.set_detection_mode(narrow_to);
        }

        // A reticle commit takes over mesh visibility from the filter.
        let visibility: Vec<(PlaneId, bool)> = match self.selector.primary() {
            Some(primary) => self
                .planes
                .iter()
                .map(|p| (p.id, self.planes.resolve_root(p.id) == primary))
                .collect(),
            None => self.filter.visibility(&self.planes).collect(),
        };
        for (id, visible) in visibility {
            self.engine.set_mesh_visible(id, visible);
        }
    }

    fn update_painting(&mut self) -> Vec<PaintEvent> {
        let Some(lock) = &self.lock else {
            return Vec::new();
        };
        let Some(hit) = self.hits.raycast_center() else {
            // No hit this frame: neither paint nor break the stroke; the
            // reticle may only have skimmed past the plane edge briefly.
            return Vec::new();
        };
        if lock.accept(&self.planes, &hit) {
            self.compositor.paint(&AcceptedSample {
                position: hit.pose.position,
                normal: hit.pose.up(),
            })
        } else {
            self.compositor.reject_sample();
            Vec::new()
        }
    }

    /// The surface the session would lock right now: the reticle
    /// selector's commit wins, the quality filter's stable primary is the
    /// fallback.
    fn chosen_plane(&self) -> Option<PlaneId> {
        if let Some(id) = self.selector.primary() {
            return Some(id);
        }
        let id = self.filter.primary_plane()?;
        self.filter
            .is_primary_stable(&self.planes, &self.last_camera, self.last_now)
            .then_some(id)
    }

    /// Undo the most recent stroke.
    pub fn undo(&mut self) -> Vec<PaintEvent> {
        self.compositor.undo()
    }

    /// Redo the most recently undone stroke.
    pub fn redo(&mut self) -> Vec<PaintEvent> {
        self.compositor.redo()
    }

    /// Destroy all paint.
    pub fn clear_all(&mut self) -> Vec<PaintEvent> {
        self.compositor.clear_all()
    }

    /// Change the brush color.
    pub fn set_color(&mut self, color: Color) {
        self.compositor.set_color(color);
    }

    /// Switch the brush to the given dab shape.
    pub fn set_shape(&mut self, shape: BrushShape) {
        match shape {
            BrushShape::Circle => self.compositor.set_shape_circle(),
            BrushShape::Square => self.compositor.set_shape_square(),
        }
    }

    /// Set the brush diameter (clamped).
    pub fn set_brush_size(&mut self, size: f64) {
        self.compositor.set_brush_size(size);
    }

    /// Capture request framing the current paint, for export.
    #[must_use]
    pub fn capture_request(&self, resolution: (u32, u32), padding: f64) -> Option<CaptureRequest> {
        self.compositor.capture_request(resolution, padding)
    }

    /// Access the stroke compositor (read-only).
    #[must_use]
    pub fn compositor(&self) -> &StrokeCompositor {
        &self.compositor
    }

    /// Access the plane mirror (read-only).
    #[must_use]
    pub fn planes(&self) -> &PlaneSet {
        &self.planes
    }
}
