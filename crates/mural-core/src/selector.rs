//! Reticle-dwell surface selector.
//!
//! Simpler companion to the quality filter: watch the screen-center
//! hit-test result every frame, and commit to a plane once the reticle has
//! rested on the same root plane for a continuous dwell. Any lost or
//! switched hit resets the dwell to zero; partial dwell never carries
//! across gaps. Once committed, the selector follows merges every frame
//! and only lets go on an explicit reset.

use crate::config::SelectorConfig;
use crate::plane::{DetectionMode, PlaneHit, PlaneId, PlaneSet};

/// Selector state: either still dwelling, or committed to a plane.
#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    NoPrimary {
        candidate: Option<PlaneId>,
        dwell_started: Option<f64>,
    },
    Primary(PlaneId),
}

/// What the selector decided this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorEvent {
    /// The dwell completed: this root plane is now primary. The engine
    /// should narrow detection to the given mode.
    Committed {
        /// The committed root plane.
        plane: PlaneId,
        /// Alignment class to keep detecting.
        narrow_to: DetectionMode,
    },
}

/// Dwell-timer-driven single-plane chooser for the scanning phase.
#[derive(Debug)]
pub struct SurfaceSelector {
    config: SelectorConfig,
    state: State,
}

impl SurfaceSelector {
    /// Create a selector with the given dwell settings.
    #[must_use]
    pub fn new(config: SelectorConfig) -> Self {
        Self {
            config,
            state: State::NoPrimary {
                candidate: None,
                dwell_started: None,
            },
        }
    }

    /// The committed plane, if the dwell has completed.
    #[must_use]
    pub fn primary(&self) -> Option<PlaneId> {
        match self.state {
            State::Primary(id) => Some(id),
            State::NoPrimary { .. } => None,
        }
    }

    /// Feed this frame's screen-center hit. Returns a commit event at the
    /// moment the dwell completes.
    pub fn update(
        &mut self,
        planes: &PlaneSet,
        hit: Option<&PlaneHit>,
        now: f64,
    ) -> Option<SelectorEvent> {
        match self.state {
            State::Primary(id) => {
                // Follow merges; never auto-release.
                let root = planes.resolve_root(id);
                if root != id {
                    self.state = State::Primary(root);
                }
                None
            }
            State::NoPrimary {
                candidate,
                dwell_started,
            } => {
                let Some(hit) = hit else {
                    // Hit lost: dwell resets fully to zero.
                    self.state = State::NoPrimary {
                        candidate: None,
                        dwell_started: None,
                    };
                    return None;
                };
                let root = planes.resolve_root(hit.plane_id);
                let held = match (candidate, dwell_started) {
                    (Some(c), Some(start)) if c == root => now - start,
                    _ => {
                        // New candidate (or reticle moved to another plane):
                        // start counting from zero.
                        self.state = State::NoPrimary {
                            candidate: Some(root),
                            dwell_started: Some(now),
                        };
                        return None;
                    }
                };
                if held >= self.config.dwell {
                    self.state = State::Primary(root);
                    let narrow_to = planes
                        .get(root)
                        .map_or(DetectionMode::All, |p| p.alignment.detection_mode());
                    if self.config.narrow_detection_on_commit {
                        return Some(SelectorEvent::Committed {
                            plane: root,
                            narrow_to,
                        });
                    }
                    return Some(SelectorEvent::Committed {
                        plane: root,
                        narrow_to: DetectionMode::All,
                    });
                }
                None
            }
        }
    }

    /// Release the committed plane (rescan/reselect). The only way out of
    /// `Primary`.
    pub fn reset(&mut self) {
        self.state = State::NoPrimary {
            candidate: None,
            dwell_started: None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plane::PlanesChanged;
    use crate::test_utils::{hit_on, square_plane};

    fn one_plane_set() -> PlaneSet {
        let mut planes = PlaneSet::new();
        planes.apply(&PlanesChanged {
            added: vec![square_plane(PlaneId(1), 1.0)],
            ..Default::default()
        });
        planes
    }

    #[test]
    fn test_commits_after_dwell() {
        let planes = one_plane_set();
        let mut sel = SurfaceSelector::new(SelectorConfig::default());
        let hit = hit_on(PlaneId(1));

        assert!(sel.update(&planes, Some(&hit), 0.0).is_none());
        assert!(sel.update(&planes, Some(&hit), 0.1).is_none());
        let ev = sel.update(&planes, Some(&hit), 0.21);
        assert_eq!(
            ev,
            Some(SelectorEvent::Committed {
                plane: PlaneId(1),
                narrow_to: DetectionMode::Horizontal,
            })
        );
        assert_eq!(sel.primary(), Some(PlaneId(1)));
    }

    #[test]
    fn test_dwell_resets_on_lost_hit() {
        // 150 ms held, hit lost, resumed: must need a full fresh dwell.
        let planes = one_plane_set();
        let mut sel = SurfaceSelector::new(SelectorConfig::default());
        let hit = hit_on(PlaneId(1));

        assert!(sel.update(&planes, Some(&hit), 0.0).is_none());
        assert!(sel.update(&planes, Some(&hit), 0.15).is_none());
        assert!(sel.update(&planes, None, 0.16).is_none());
        // Resumes at 0.2; must not commit before 0.4.
        assert!(sel.update(&planes, Some(&hit), 0.2).is_none());
        assert!(sel.update(&planes, Some(&hit), 0.35).is_none());
        assert!(sel.update(&planes, Some(&hit), 0.39).is_none());
        assert!(sel.update(&planes, Some(&hit), 0.41).is_some());
    }

    #[test]
    fn test_dwell_resets_on_plane_switch() {
        let mut planes = one_plane_set();
        planes.apply(&PlanesChanged {
            added: vec![square_plane(PlaneId(2), 1.0)],
            ..Default::default()
        });
        let mut sel = SurfaceSelector::new(SelectorConfig::default());

        assert!(sel.update(&planes, Some(&hit_on(PlaneId(1))), 0.0).is_none());
        assert!(sel.update(&planes, Some(&hit_on(PlaneId(2))), 0.15).is_none());
        // Only 0.06 s on plane 2: no commit yet.
        assert!(sel.update(&planes, Some(&hit_on(PlaneId(2))), 0.21).is_none());
        assert!(sel.update(&planes, Some(&hit_on(PlaneId(2))), 0.36).is_some());
    }

    #[test]
    fn test_hits_on_merged_plane_count_for_root() {
        let mut planes = one_plane_set();
        let mut subsumed = square_plane(PlaneId(2), 0.5);
        subsumed.subsumed_by = Some(PlaneId(1));
        planes.apply(&PlanesChanged {
            added: vec![subsumed],
            ..Default::default()
        });
        let mut sel = SurfaceSelector::new(SelectorConfig::default());

        // Alternating raw ids that share a root still accumulate dwell.
        assert!(sel.update(&planes, Some(&hit_on(PlaneId(1))), 0.0).is_none());
        assert!(sel.update(&planes, Some(&hit_on(PlaneId(2))), 0.1).is_none());
        let ev = sel.update(&planes, Some(&hit_on(PlaneId(1))), 0.25);
        assert!(matches!(
            ev,
            Some(SelectorEvent::Committed { plane: PlaneId(1), .. })
        ));
    }

    #[test]
    fn test_committed_follows_merges_and_resets_explicitly() {
        let mut planes = one_plane_set();
        let mut sel = SurfaceSelector::new(SelectorConfig::default());
        let hit = hit_on(PlaneId(1));
        sel.update(&planes, Some(&hit), 0.0);
        assert!(sel.update(&planes, Some(&hit), 0.25).is_some());

        // Merge 1 into 3; no hit this frame. Commitment survives.
        let mut merged = square_plane(PlaneId(1), 1.0);
        merged.subsumed_by = Some(PlaneId(3));
        planes.apply(&PlanesChanged {
            added: vec![square_plane(PlaneId(3), 2.0)],
            updated: vec![merged],
            ..Default::default()
        });
        assert!(sel.update(&planes, None, 0.3).is_none());
        assert_eq!(sel.primary(), Some(PlaneId(3)));

        sel.reset();
        assert_eq!(sel.primary(), None);
    }
}
