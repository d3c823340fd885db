//! Configuration for the selection and painting pipeline.
//!
//! Three configuration types, one per stage:
//! - [`FilterConfig`]: quality gates for the plane quality filter
//! - [`SelectorConfig`]: reticle dwell for the surface selector
//! - [`BrushConfig`]: brush and compositor behavior
//!
//! All are immutable after construction; use the builders for ergonomic
//! setup.

/// Quality gates for the plane quality filter.
///
/// Defaults are tuned for handheld room-scale scanning: a candidate plane
/// must be at least 0.15 m² (~40×40 cm), a quarter second old, between
/// 0.25 m and 3.5 m from the camera, and geometrically calm.
///
/// # Example
/// ```
/// use mural_core::config::FilterConfig;
///
/// let config = FilterConfig::builder()
///     .min_area(0.3)
///     .max_distance(2.0)
///     .build();
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilterConfig {
    /// Minimum boundary polygon area in m² (default: 0.15).
    pub min_area: f64,
    /// Minimum seconds a plane must have existed (default: 0.25).
    pub min_age: f64,
    /// A plane is "calm" while its smoothed area growth rate stays at or
    /// below this, in m²/s (default: 0.15).
    pub max_area_growth_rate: f64,
    /// Seconds the growth rate must stay calm before the plane counts as
    /// stable (default: 0.25).
    pub stable_dwell: f64,
    /// Blend factor for the growth-rate exponential moving average
    /// (default: 0.5).
    pub ema_alpha: f64,
    /// Maximum normal tilt from the alignment's ideal axis, in degrees
    /// (default: 20).
    pub max_normal_tilt_deg: f64,
    /// Ignore planes closer than this to the camera, in meters
    /// (default: 0.25).
    pub min_distance: f64,
    /// Ignore planes farther than this from the camera, in meters
    /// (default: 3.5).
    pub max_distance: f64,
    /// Floor applied to the camera distance in the selection score
    /// `area / max(distance, floor)` (default: 0.2).
    pub distance_floor: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_area: 0.15,
            min_age: 0.25,
            max_area_growth_rate: 0.15,
            stable_dwell: 0.25,
            ema_alpha: 0.5,
            max_normal_tilt_deg: 20.0,
            min_distance: 0.25,
            max_distance: 3.5,
            distance_floor: 0.2,
        }
    }
}

impl FilterConfig {
    /// Create a new builder for `FilterConfig`.
    #[must_use]
    pub fn builder() -> FilterConfigBuilder {
        FilterConfigBuilder::default()
    }
}

/// Builder for [`FilterConfig`].
#[derive(Default)]
pub struct FilterConfigBuilder {
    min_area: Option<f64>,
    min_age: Option<f64>,
    max_area_growth_rate: Option<f64>,
    stable_dwell: Option<f64>,
    ema_alpha: Option<f64>,
    max_normal_tilt_deg: Option<f64>,
    min_distance: Option<f64>,
    max_distance: Option<f64>,
    distance_floor: Option<f64>,
}

impl FilterConfigBuilder {
    /// Set the minimum plane area in m².
    #[must_use]
    pub fn min_area(mut self, area: f64) -> Self {
        self.min_area = Some(area);
        self
    }

    /// Set the minimum plane age in seconds.
    #[must_use]
    pub fn min_age(mut self, age: f64) -> Self {
        self.min_age = Some(age);
        self
    }

    /// Set the growth-rate calm ceiling in m²/s.
    #[must_use]
    pub fn max_area_growth_rate(mut self, rate: f64) -> Self {
        self.max_area_growth_rate = Some(rate);
        self
    }

    /// Set the stability dwell in seconds.
    #[must_use]
    pub fn stable_dwell(mut self, dwell: f64) -> Self {
        self.stable_dwell = Some(dwell);
        self
    }

    /// Set the growth EMA blend factor.
    #[must_use]
    pub fn ema_alpha(mut self, alpha: f64) -> Self {
        self.ema_alpha = Some(alpha);
        self
    }

    /// Set the maximum normal tilt in degrees.
    #[must_use]
    pub fn max_normal_tilt_deg(mut self, deg: f64) -> Self {
        self.max_normal_tilt_deg = Some(deg);
        self
    }

    /// Set the minimum camera distance in meters.
    #[must_use]
    pub fn min_distance(mut self, d: f64) -> Self {
        self.min_distance = Some(d);
        self
    }

    /// Set the maximum camera distance in meters.
    #[must_use]
    pub fn max_distance(mut self, d: f64) -> Self {
        self.max_distance = Some(d);
        self
    }

    /// Set the score distance floor in meters.
    #[must_use]
    pub fn distance_floor(mut self, floor: f64) -> Self {
        self.distance_floor = Some(floor);
        self
    }

    /// Build the configuration, using defaults for unset fields.
    #[must_use]
    pub fn build(self) -> FilterConfig {
        let d = FilterConfig::default();
        FilterConfig {
            min_area: self.min_area.unwrap_or(d.min_area),
            min_age: self.min_age.unwrap_or(d.min_age),
            max_area_growth_rate: self
                .max_area_growth_rate
                .unwrap_or(d.max_area_growth_rate),
            stable_dwell: self.stable_dwell.unwrap_or(d.stable_dwell),
            ema_alpha: self.ema_alpha.unwrap_or(d.ema_alpha),
            max_normal_tilt_deg: self.max_normal_tilt_deg.unwrap_or(d.max_normal_tilt_deg),
            min_distance: self.min_distance.unwrap_or(d.min_distance),
            max_distance: self.max_distance.unwrap_or(d.max_distance),
            distance_floor: self.distance_floor.unwrap_or(d.distance_floor),
        }
    }
}

/// Reticle dwell settings for the surface selector.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SelectorConfig {
    /// Seconds the screen-center hit must stay on the same root plane
    /// before the selector commits to it (default: 0.2).
    pub dwell: f64,
    /// Narrow engine detection to the committed plane's alignment class
    /// (default: true).
    pub narrow_detection_on_commit: bool,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            dwell: 0.2,
            narrow_detection_on_commit: true,
        }
    }
}

/// Brush and stroke-compositor behavior.
///
/// # Example
/// ```
/// use mural_core::config::BrushConfig;
///
/// let config = BrushConfig::builder()
///     .brush_size(0.08)
///     .overwrite_erase(true)
///     .build();
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BrushConfig {
    /// Initial dab diameter in meters (default: 0.04). Clamped to
    /// [`BrushConfig::MIN_BRUSH_SIZE`]..=[`BrushConfig::MAX_BRUSH_SIZE`].
    pub brush_size: f64,
    /// Minimum distance between consecutive dab centers in meters
    /// (default: 0.02).
    pub spacing: f64,
    /// Base offset of dabs along the plane normal in meters
    /// (default: 0.01). Avoids coplanar rendering artifacts.
    pub lift_from_plane: f64,
    /// Extra lift per stroke layer in meters (default: 0.0008). Later
    /// strokes render fractionally closer to the viewer.
    pub layer_epsilon: f64,
    /// Enable overwrite-erase: new dabs destroy overlapping dabs of
    /// same-or-lower layers (default: false).
    pub overwrite_erase: bool,
    /// Erase query radius as a fraction of the brush size
    /// (default: 0.55).
    pub erase_radius_factor: f64,
}

impl BrushConfig {
    /// Smallest accepted brush diameter in meters.
    pub const MIN_BRUSH_SIZE: f64 = 0.02;
    /// Largest accepted brush diameter in meters.
    pub const MAX_BRUSH_SIZE: f64 = 0.2;

    /// Create a new builder for `BrushConfig`.
    #[must_use]
    pub fn builder() -> BrushConfigBuilder {
        BrushConfigBuilder::default()
    }
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            brush_size: 0.04,
            spacing: 0.02,
            lift_from_plane: 0.01,
            layer_epsilon: 0.0008,
            overwrite_erase: false,
            erase_radius_factor: 0.55,
        }
    }
}

/// Builder for [`BrushConfig`].
#[derive(Default)]
pub struct BrushConfigBuilder {
    brush_size: Option<f64>,
    spacing: Option<f64>,
    lift_from_plane: Option<f64>,
    layer_epsilon: Option<f64>,
    overwrite_erase: Option<bool>,
    erase_radius_factor: Option<f64>,
}

impl BrushConfigBuilder {
    /// Set the initial brush diameter in meters.
    #[must_use]
    pub fn brush_size(mut self, size: f64) -> Self {
        self.brush_size = Some(size);
        self
    }

    /// Set the dab spacing in meters.
    #[must_use]
    pub fn spacing(mut self, spacing: f64) -> Self {
        self.spacing = Some(spacing);
        self
    }

    /// Set the base lift from the plane in meters.
    #[must_use]
    pub fn lift_from_plane(mut self, lift: f64) -> Self {
        self.lift_from_plane = Some(lift);
        self
    }

    /// Set the per-layer lift increment in meters.
    #[must_use]
    pub fn layer_epsilon(mut self, epsilon: f64) -> Self {
        self.layer_epsilon = Some(epsilon);
        self
    }

    /// Enable or disable overwrite-erase.
    #[must_use]
    pub fn overwrite_erase(mut self, enable: bool) -> Self {
        self.overwrite_erase = Some(enable);
        self
    }

    /// Set the erase radius as a fraction of the brush size.
    #[must_use]
    pub fn erase_radius_factor(mut self, factor: f64) -> Self {
        self.erase_radius_factor = Some(factor);
        self
    }

    /// Build the configuration, using defaults for unset fields.
    #[must_use]
    pub fn build(self) -> BrushConfig {
        let d = BrushConfig::default();
        BrushConfig {
            brush_size: self.brush_size.unwrap_or(d.brush_size),
            spacing: self.spacing.unwrap_or(d.spacing),
            lift_from_plane: self.lift_from_plane.unwrap_or(d.lift_from_plane),
            layer_epsilon: self.layer_epsilon.unwrap_or(d.layer_epsilon),
            overwrite_erase: self.overwrite_erase.unwrap_or(d.overwrite_erase),
            erase_radius_factor: self
                .erase_radius_factor
                .unwrap_or(d.erase_radius_factor),
        }
    }
}
