#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

//! Phase flow and engine command integration: detection narrowing, mesh
//! visibility, and what each transition clears.

use mural_core::geometry::Pose;
use mural_core::plane::{DetectionMode, PlaneId, PlanesChanged};
use mural_core::session::{FrameInput, GraffitiSession, Phase, SessionConfig};
use mural_core::test_utils::{
    hit_on, square_plane, FixedAnchors, RecordingEngine, ScriptedHits,
};
use nalgebra::Vector3;

fn frame(now: f64, changed: Option<PlanesChanged>) -> FrameInput {
    FrameInput {
        now,
        camera: Pose::from_position(Vector3::new(0.0, 1.5, 0.0)),
        planes_changed: changed,
    }
}

fn one_plane() -> PlanesChanged {
    PlanesChanged {
        added: vec![square_plane(PlaneId(1), 1.0)],
        ..Default::default()
    }
}

fn scanned_session() -> (GraffitiSession, RecordingEngine, f64) {
    let engine = RecordingEngine::default();
    let mut session = GraffitiSession::new(
        SessionConfig::default(),
        Box::new(ScriptedHits::always(hit_on(PlaneId(1)))),
        Box::new(FixedAnchors(None)),
        Box::new(engine.clone()),
    );
    session.begin_scan();
    let mut t = 0.0;
    while t <= 2.0 {
        session.update(&frame(t, Some(one_plane())));
        t += 0.1;
    }
    (session, engine, t)
}

/// Detection starts wide, narrows to the first-hit alignment class, and
/// widens again on rescan.
#[test]
fn test_detection_narrowing_lifecycle() {
    let (mut session, engine, _) = scanned_session();
    let modes = engine.detection_modes();
    assert_eq!(modes.first(), Some(&DetectionMode::All));
    assert!(modes.contains(&DetectionMode::Horizontal));

    session.reselect();
    assert_eq!(engine.detection_modes().last(), Some(&DetectionMode::All));
}

/// Plane debug meshes stay hidden until a primary exists, then only the
/// primary shows.
#[test]
fn test_mesh_visibility_tracks_primary() {
    let engine = RecordingEngine::default();
    let mut session = GraffitiSession::new(
        SessionConfig::default(),
        // No hits: visibility is driven by the filter alone.
        Box::new(ScriptedHits::new(Vec::new())),
        Box::new(FixedAnchors(None)),
        Box::new(engine.clone()),
    );
    session.begin_scan();

    let both = PlanesChanged {
        added: vec![square_plane(PlaneId(1), 1.0), square_plane(PlaneId(2), 0.5)],
        ..Default::default()
    };
    session.update(&frame(0.0, Some(both)));
    assert_eq!(engine.mesh_visible(PlaneId(1)), Some(false));
    assert_eq!(engine.mesh_visible(PlaneId(2)), Some(false));

    let mut t = 0.1;
    while t <= 3.0 {
        session.update(&frame(t, Some(PlanesChanged::default())));
        t += 0.1;
    }
    // Plane 1 scores higher (bigger, same distance) and becomes primary.
    assert_eq!(engine.mesh_visible(PlaneId(1)), Some(true));
    assert_eq!(engine.mesh_visible(PlaneId(2)), Some(false));
}

/// On the very frame the reticle dwell commits, the committed plane's
/// mesh is already shown, even though the quality filter has no primary
/// yet.
#[test]
fn test_commit_frame_shows_committed_mesh() {
    let engine = RecordingEngine::default();
    let mut session = GraffitiSession::new(
        SessionConfig::default(),
        Box::new(ScriptedHits::always(hit_on(PlaneId(1)))),
        Box::new(FixedAnchors(None)),
        Box::new(engine.clone()),
    );
    session.begin_scan();

    let both = PlanesChanged {
        added: vec![square_plane(PlaneId(1), 1.0), square_plane(PlaneId(2), 0.5)],
        ..Default::default()
    };
    session.update(&frame(0.0, Some(both)));
    session.update(&frame(0.1, None));
    // Dwell (0.2 s) completes here; the filter's age gate (0.25 s) has
    // not, so only the selector can be driving visibility.
    session.update(&frame(0.2, None));
    assert_eq!(engine.mesh_visible(PlaneId(1)), Some(true));
    assert_eq!(engine.mesh_visible(PlaneId(2)), Some(false));
}

/// The full happy path walks Idle → Scanning → PlaneSelected → Painting
/// and back.
#[test]
fn test_phase_round_trip() {
    let (mut session, _, t) = scanned_session();
    assert_eq!(session.phase(), Phase::Scanning);
    assert!(session.confirm_selection());
    assert_eq!(session.phase(), Phase::PlaneSelected);
    session.start_painting();
    assert_eq!(session.phase(), Phase::Painting);
    session.update(&frame(t, None));
    session.stop_painting();
    assert_eq!(session.phase(), Phase::PlaneSelected);
    session.reselect();
    assert_eq!(session.phase(), Phase::Scanning);
    assert!(session.locked_outline().is_none());
}

/// An anchored selection parents strokes under the anchor pose.
#[test]
fn test_anchor_used_when_granted() {
    let engine = RecordingEngine::default();
    let anchor = Pose::from_position(Vector3::new(0.0, 0.01, 0.0));
    let mut session = GraffitiSession::new(
        SessionConfig::default(),
        Box::new(ScriptedHits::always(hit_on(PlaneId(1)))),
        Box::new(FixedAnchors(Some(anchor))),
        Box::new(engine),
    );
    session.begin_scan();
    let mut t = 0.0;
    while t <= 1.0 {
        session.update(&frame(t, Some(one_plane())));
        t += 0.1;
    }
    assert!(session.confirm_selection());
    // The lock succeeded with the anchor; painting still works.
    session.start_painting();
    let events = session.update(&frame(t, None));
    assert!(!events.is_empty());
}

/// Rescanning destroys paint; reselecting keeps it.
#[test]
fn test_rescan_clears_reselect_keeps() {
    let (mut session, _, t) = scanned_session();
    session.confirm_selection();
    session.start_painting();
    session.update(&frame(t, None));
    assert_eq!(session.compositor().history().strokes().len(), 1);

    session.reselect();
    assert_eq!(session.compositor().history().strokes().len(), 1);

    session.begin_scan();
    assert!(session.compositor().history().strokes().is_empty());
}
