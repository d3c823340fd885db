//! Plane quality filter: picks one stable primary plane out of the noisy
//! candidate stream.
//!
//! Every plane-change batch updates per-plane statistics (age, area, a
//! smoothed area-growth rate, and a stability dwell timer). A plane passes
//! the quality gates when its alignment, tilt, camera distance, age, area
//! and stability dwell are all within configured bounds; among gate-passing
//! planes the one with the highest `area / distance` score becomes primary.
//! Once chosen, the primary is retained (never re-scored against
//! competitors) and only re-resolved through merges, until an explicit
//! [`PlaneQualityFilter::reset`].

use std::collections::{HashMap, HashSet};

use crate::config::FilterConfig;
use crate::geometry::Pose;
use crate::plane::{DetectionMode, PlaneAlignment, PlaneId, PlaneSet, TrackedPlane};

/// Growth/stability statistics for one tracked plane (keyed by root id).
#[derive(Debug, Clone, Copy)]
pub struct PlaneStats {
    /// When the plane was first observed, in session seconds.
    pub first_seen: f64,
    /// Area at the previous sample, m².
    pub last_area: f64,
    /// Exponentially smoothed area growth rate, m²/s.
    pub ema_growth: f64,
    /// Time of the previous area sample.
    pub last_update: f64,
    /// When the smoothed growth rate last dropped under the ceiling.
    /// `None` while the plane is still growing.
    pub stable_since: Option<f64>,
}

impl PlaneStats {
    /// Seed with the first-observed area: the first sample measures zero
    /// growth, so stabilization timing depends only on actual growth and
    /// never on the plane's absolute size.
    fn new(now: f64, area: f64) -> Self {
        Self {
            first_seen: now,
            last_area: area,
            ema_growth: 0.0,
            last_update: now,
            stable_since: None,
        }
    }
}

/// Filters the candidate plane stream down to a single stable primary.
#[derive(Debug)]
pub struct PlaneQualityFilter {
    config: FilterConfig,
    preferred: DetectionMode,
    stats: HashMap<PlaneId, PlaneStats>,
    primary: Option<PlaneId>,
}

impl PlaneQualityFilter {
    /// Create a filter with the given gates, preferring horizontal planes
    /// until told otherwise.
    #[must_use]
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            preferred: DetectionMode::Horizontal,
            stats: HashMap::new(),
            primary: None,
        }
    }

    /// The currently preferred alignment class.
    #[must_use]
    pub fn preferred_mode(&self) -> DetectionMode {
        self.preferred
    }

    /// Change the preferred alignment class (e.g. from the first reticle
    /// hit's alignment).
    pub fn set_preferred_mode(&mut self, mode: DetectionMode) {
        self.preferred = mode;
    }

    /// The chosen primary plane id, if any.
    #[must_use]
    pub fn primary_plane(&self) -> Option<PlaneId> {
        self.primary
    }

    /// Statistics for a plane, if it has been observed.
    #[must_use]
    pub fn stats(&self, id: PlaneId) -> Option<&PlaneStats> {
        self.stats.get(&id)
    }

    /// Re-evaluates the gates live: a previously chosen primary can report
    /// unstable again if its geometry regresses. The UI should treat that
    /// as "selection disabled", not as losing the primary.
    #[must_use]
    pub fn is_primary_stable(&self, planes: &PlaneSet, camera: &Pose, now: f64) -> bool {
        let Some(id) = self.primary else {
            return false;
        };
        planes
            .root_plane(id)
            .is_some_and(|p| self.passes_gates(p, camera, now))
    }

    /// Process one batch of engine plane changes: update statistics for
    /// every live plane and, when no primary is chosen yet, try to choose
    /// one.
    pub fn on_planes_changed(&mut self, planes: &PlaneSet, camera: &Pose, now: f64) {
        let _span = tracing::info_span!("plane_quality").entered();

        // Update stats for every live root exactly once per batch.
        let mut seen = HashSet::new();
        for p in planes.iter() {
            let root = planes.resolve_root(p.id);
            if !seen.insert(root) {
                continue;
            }
            let Some(root_plane) = planes.get(root) else {
                continue;
            };
            let area = root_plane.area();
            let stats = self
                .stats
                .entry(root)
                .or_insert_with(|| PlaneStats::new(now, area));

            let dt = (now - stats.last_update).max(1e-3);
            // Shrinkage from re-triangulation must not count as negative
            // growth.
            let growth = ((area - stats.last_area) / dt).max(0.0);
            let alpha = self.config.ema_alpha;
            stats.ema_growth = stats.ema_growth * (1.0 - alpha) + growth * alpha;

            if stats.ema_growth <= self.config.max_area_growth_rate {
                stats.stable_since.get_or_insert(now);
            } else {
                stats.stable_since = None;
            }

            stats.last_area = area;
            stats.last_update = now;
        }

        // Drop stats for planes the engine stopped tracking.
        self.stats.retain(|id, _| planes.contains(*id));

        if self.primary.is_some() {
            self.maintain(planes);
            return;
        }

        // Score gate-passing planes: bigger and closer wins. Ties resolve
        // to the lower plane id so identical inputs give identical output.
        let mut best: Option<(PlaneId, f64)> = None;
        for root in &seen {
            let Some(plane) = planes.get(*root) else {
                continue;
            };
            if !self.passes_gates(plane, camera, now) {
                continue;
            }
            let area = plane.area().max(1e-4);
            let dist = plane.distance_to(camera).max(self.config.distance_floor);
            let score = area / dist;
            let better = match best {
                None => true,
                Some((best_id, best_score)) => {
                    score > best_score || (score == best_score && *root < best_id)
                }
            };
            if better {
                best = Some((*root, score));
            }
        }
        self.primary = best.map(|(id, _)| id);
    }

    /// Re-resolve the primary through merges. Called every frame.
    pub fn maintain(&mut self, planes: &PlaneSet) {
        if let Some(id) = self.primary {
            let root = planes.resolve_root(id);
            if root != id {
                self.primary = Some(root);
            }
        }
    }

    /// Desired debug-mesh visibility for each tracked plane: before a
    /// primary exists everything is hidden; afterwards only the primary
    /// (and planes merged into it) shows.
    pub fn visibility<'a>(
        &'a self,
        planes: &'a PlaneSet,
    ) -> impl Iterator<Item = (PlaneId, bool)> + 'a {
        planes.iter().map(move |p| {
            let visible = self
                .primary
                .is_some_and(|primary| planes.resolve_root(p.id) == primary);
            (p.id, visible)
        })
    }

    /// Forget everything for a rescan.
    pub fn reset(&mut self) {
        self.stats.clear();
        self.primary = None;
    }

    /// All quality gates from the configuration. Alignment, tilt, camera
    /// distance, age, area, and the stability dwell must all hold.
    fn passes_gates(&self, plane: &TrackedPlane, camera: &Pose, now: f64) -> bool {
        if !self.preferred.accepts(plane.alignment) {
            return false;
        }

        let n = plane.normal();
        let up = nalgebra::Vector3::y();
        let cos_up = n.dot(&up).clamp(-1.0, 1.0);
        let angle_to_up_deg = cos_up.acos().to_degrees();
        let tilt = match plane.alignment {
            PlaneAlignment::HorizontalUp => angle_to_up_deg,
            PlaneAlignment::HorizontalDown => 180.0 - angle_to_up_deg,
            PlaneAlignment::Vertical => (90.0 - angle_to_up_deg).abs(),
        };
        if tilt > self.config.max_normal_tilt_deg {
            return false;
        }

        let dist = plane.distance_to(camera);
        if dist < self.config.min_distance || dist > self.config.max_distance {
            return false;
        }

        let Some(stats) = self.stats.get(&plane.id) else {
            return false;
        };
        if now - stats.first_seen < self.config.min_age {
            return false;
        }
        if plane.area() < self.config.min_area {
            return false;
        }
        match stats.stable_since {
            Some(since) => now - since >= self.config.stable_dwell,
            None => false,
        }
    }
}
