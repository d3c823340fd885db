//! Stroke compositor: turns accepted paint samples into spaced dabs,
//! groups dabs into strokes, and keeps the whole canvas erasable and
//! undoable.
//!
//! Strokes carry a monotonically increasing layer index. The index drives
//! both rendering order (each layer lifts a fraction of a millimeter
//! further off the plane, so later paint wins without real depth sorting)
//! and erase precedence (a dab only ever erases same-or-lower layers).
//! Layer indices are never reused while a lock lives: redo replays the
//! original stroke, and strokes painted after an undo take the next fresh
//! index.
//!
//! The compositor owns the paint data model; every mutation is also
//! reported as a [`PaintEvent`] stream so a host renderer can mirror it.

use nalgebra::Vector3;
use tracing::warn;

use crate::config::BrushConfig;

/// Dab primitive shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BrushShape {
    /// Round dab.
    Circle,
    /// Square dab.
    Square,
}

/// RGBA paint color, components in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl Color {
    /// Opaque color from RGB components.
    #[must_use]
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Default brush color.
    pub const RED: Color = Color {
        r: 1.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
}

/// Unique id of a placed dab, stable across undo/redo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DabId(pub u64);

/// One placed paint primitive. Immutable once created; it only ever goes
/// away whole (overwrite-erase or stroke removal).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dab {
    /// Identifier for renderer mirroring.
    pub id: DabId,
    /// World position: plane hit point plus lift along the normal.
    pub position: Vector3<f64>,
    /// Plane normal the dab faces along.
    pub normal: Vector3<f64>,
    /// Dab diameter in meters (brush size at placement time).
    pub scale: f64,
    /// Shape of the primitive.
    pub shape: BrushShape,
    /// Stroke color at placement time.
    pub color: Color,
    /// Layer index of the owning stroke.
    pub layer: u32,
}

impl Dab {
    /// Overlap-proxy radius: half the visual scale.
    #[must_use]
    pub fn overlap_radius(&self) -> f64 {
        self.scale * 0.5
    }
}

/// One continuous gesture at a fixed color and shape.
#[derive(Debug, Clone)]
pub struct Stroke {
    /// Monotone layer index; higher renders closer to the viewer.
    pub layer: u32,
    /// Dab shape for the whole stroke.
    pub shape: BrushShape,
    /// Owned color: changing the brush color later never repaints this
    /// stroke.
    pub color: Color,
    /// Lift along the plane normal applied to every dab.
    pub lift: f64,
    /// Placed dabs, in placement order. Erased dabs are removed.
    pub dabs: Vec<Dab>,
    /// False while undone.
    pub active: bool,
}

/// Renderer-facing change notification.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintEvent {
    /// A dab was placed.
    DabAdded(Dab),
    /// A dab was destroyed by overwrite-erase.
    DabRemoved(DabId),
    /// A stroke was hidden by undo.
    StrokeHidden(u32),
    /// A stroke was re-shown by redo.
    StrokeShown(u32),
    /// A hidden stroke was permanently discarded (redo branch truncated).
    StrokeDiscarded(u32),
    /// The whole canvas was destroyed.
    Cleared,
}

/// A paint sample that already passed the boundary gate.
#[derive(Debug, Clone, Copy)]
pub struct AcceptedSample {
    /// World-space hit point on the plane.
    pub position: Vector3<f64>,
    /// Plane normal at the hit.
    pub normal: Vector3<f64>,
}

/// Linear undo history over whole strokes.
///
/// Strokes at indices `>= cursor` are undone; they are permanently
/// discarded the moment a new stroke is recorded while the cursor is not
/// at the end.
#[derive(Debug, Default)]
pub struct UndoHistory {
    strokes: Vec<Stroke>,
    cursor: usize,
}

impl UndoHistory {
    /// Record a new stroke, truncating the redo branch. Returns the layer
    /// indices of discarded strokes.
    pub fn record(&mut self, stroke: Stroke) -> Vec<u32> {
        let discarded = self
            .strokes
            .drain(self.cursor..)
            .map(|s| s.layer)
            .collect();
        self.strokes.push(stroke);
        self.cursor = self.strokes.len();
        discarded
    }

    /// Deactivate the most recent active stroke; returns its layer.
    pub fn undo(&mut self) -> Option<u32> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        let stroke = &mut self.strokes[self.cursor];
        stroke.active = false;
        Some(stroke.layer)
    }

    /// Reactivate the most recently undone stroke; returns its layer.
    pub fn redo(&mut self) -> Option<u32> {
        let stroke = self.strokes.get_mut(self.cursor)?;
        stroke.active = true;
        self.cursor += 1;
        Some(stroke.layer)
    }

    /// The stroke currently being extended (last active one), if any.
    fn current_mut(&mut self) -> Option<&mut Stroke> {
        if self.cursor == 0 {
            return None;
        }
        self.strokes.get_mut(self.cursor - 1)
    }

    /// All strokes, active and undone.
    #[must_use]
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    /// Active strokes only.
    pub fn active_strokes(&self) -> impl Iterator<Item = &Stroke> {
        self.strokes.iter().filter(|s| s.active)
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.cursor = 0;
    }
}

/// Axis-aligned world bounds of the active paint, for capture/export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintBounds {
    /// Minimum corner.
    pub min: Vector3<f64>,
    /// Maximum corner.
    pub max: Vector3<f64>,
}

/// A capture the host renderer should perform: an orthographic top-down
/// render of the paint layer over the given world bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureRequest {
    /// Output image size in pixels (width, height).
    pub resolution: (u32, u32),
    /// World bounds to frame, already padded.
    pub bounds: PaintBounds,
}

/// The stroke compositor.
pub struct StrokeCompositor {
    config: BrushConfig,
    shape: BrushShape,
    color: Color,
    brush_size: f64,
    overwrite_erase: bool,
    new_stroke_pending: bool,
    next_layer: u32,
    next_dab: u64,
    last_pos: Option<Vector3<f64>>,
    history: UndoHistory,
}

impl StrokeCompositor {
    /// Create a compositor with the given brush configuration.
    #[must_use]
    pub fn new(config: BrushConfig) -> Self {
        let mut overwrite_erase = config.overwrite_erase;
        if overwrite_erase && config.erase_radius_factor <= 0.0 {
            // Misconfiguration: disable the feature for the session
            // instead of erasing nothing ambiguously.
            warn!(
                factor = config.erase_radius_factor,
                "overwrite-erase enabled with a non-positive erase radius factor; disabling erase"
            );
            overwrite_erase = false;
        }
        Self {
            shape: BrushShape::Circle,
            color: Color::RED,
            brush_size: config
                .brush_size
                .clamp(BrushConfig::MIN_BRUSH_SIZE, BrushConfig::MAX_BRUSH_SIZE),
            overwrite_erase,
            new_stroke_pending: true,
            next_layer: 0,
            next_dab: 0,
            last_pos: None,
            history: UndoHistory::default(),
            config,
        }
    }

    /// Current brush shape.
    #[must_use]
    pub fn shape(&self) -> BrushShape {
        self.shape
    }

    /// Current brush color.
    #[must_use]
    pub fn color(&self) -> Color {
        self.color
    }

    /// Current brush diameter in meters.
    #[must_use]
    pub fn brush_size(&self) -> f64 {
        self.brush_size
    }

    /// Switch to circle dabs. Starts a new stroke on the next dab.
    pub fn set_shape_circle(&mut self) {
        self.set_shape(BrushShape::Circle);
    }

    /// Switch to square dabs. Starts a new stroke on the next dab.
    pub fn set_shape_square(&mut self) {
        self.set_shape(BrushShape::Square);
    }

    fn set_shape(&mut self, shape: BrushShape) {
        if self.shape != shape {
            self.shape = shape;
            self.begin_new_stroke();
        }
    }

    /// Change the brush color. Earlier strokes keep their own color; a new
    /// stroke starts on the next dab.
    pub fn set_color(&mut self, color: Color) {
        if self.color != color {
            self.color = color;
            self.begin_new_stroke();
        }
    }

    /// Set the brush diameter, clamped to the supported range.
    pub fn set_brush_size(&mut self, size: f64) {
        self.brush_size = size.clamp(BrushConfig::MIN_BRUSH_SIZE, BrushConfig::MAX_BRUSH_SIZE);
    }

    /// Mark the start of a painting gesture.
    pub fn start_painting(&mut self) {
        self.begin_new_stroke();
    }

    /// Mark the end of a painting gesture; the next one starts a fresh
    /// stroke.
    pub fn stop_painting(&mut self) {
        self.begin_new_stroke();
    }

    /// A candidate sample was rejected by the boundary gate: break stroke
    /// continuity so the next accepted sample does not draw a connecting
    /// run of dabs across the gap.
    pub fn reject_sample(&mut self) {
        self.last_pos = None;
    }

    /// Consume one accepted paint sample. Returns the resulting render
    /// events (possibly empty when the sample is dropped for spacing).
    pub fn paint(&mut self, sample: &AcceptedSample) -> Vec<PaintEvent> {
        let mut events = Vec::new();

        let layer = match self.history.current_mut() {
            Some(stroke) if !self.new_stroke_pending => stroke.layer,
            _ => self.next_layer,
        };

        let lift = self.config.lift_from_plane + f64::from(layer) * self.config.layer_epsilon;
        let position = sample.position + sample.normal * lift;

        // Dab density control. The first dab of a stroke always lands.
        if let Some(last) = self.last_pos {
            if (position - last).norm() < self.config.spacing {
                return events;
            }
        }

        if self.new_stroke_pending || self.history.current_mut().is_none() {
            let stroke = Stroke {
                layer: self.next_layer,
                shape: self.shape,
                color: self.color,
                lift,
                dabs: Vec::new(),
                active: true,
            };
            // Layer indices are never reused, even when the redo branch
            // gets truncated here.
            self.next_layer += 1;
            for discarded in self.history.record(stroke) {
                events.push(PaintEvent::StrokeDiscarded(discarded));
            }
            self.new_stroke_pending = false;
        }

        let dab = Dab {
            id: DabId(self.next_dab),
            position,
            normal: sample.normal,
            scale: self.brush_size,
            shape: self.shape,
            color: self.color,
            layer,
        };
        self.next_dab += 1;

        if self.overwrite_erase {
            self.erase_underlying(&dab, &mut events);
        }

        if let Some(stroke) = self.history.current_mut() {
            stroke.dabs.push(dab);
        }
        events.push(PaintEvent::DabAdded(dab));
        self.last_pos = Some(position);
        events
    }

    /// Destroy dabs of lower layers overlapping the new dab. Strokes
    /// painted later (higher layer) are never touched. Layer indices are
    /// unique per stroke, so skipping the dab's own layer also protects
    /// the stroke currently being drawn.
    fn erase_underlying(&mut self, dab: &Dab, events: &mut Vec<PaintEvent>) {
        let erase_radius = self.brush_size * self.config.erase_radius_factor;
        for stroke in &mut self.history.strokes {
            if !stroke.active || stroke.layer >= dab.layer {
                continue;
            }
            stroke.dabs.retain(|other| {
                let hit = (other.position - dab.position).norm()
                    <= erase_radius + other.overlap_radius();
                if hit {
                    events.push(PaintEvent::DabRemoved(other.id));
                }
                !hit
            });
        }
    }

    /// Undo the most recent stroke. The stroke is hidden, not destroyed;
    /// painting afterwards starts a fresh stroke (and discards the redo
    /// branch).
    pub fn undo(&mut self) -> Vec<PaintEvent> {
        match self.history.undo() {
            Some(layer) => {
                self.begin_new_stroke();
                vec![PaintEvent::StrokeHidden(layer)]
            }
            None => Vec::new(),
        }
    }

    /// Redo the most recently undone stroke, restoring it with its
    /// original layer index.
    pub fn redo(&mut self) -> Vec<PaintEvent> {
        match self.history.redo() {
            Some(layer) => {
                self.begin_new_stroke();
                vec![PaintEvent::StrokeShown(layer)]
            }
            None => Vec::new(),
        }
    }

    /// Destroy every stroke and reset the layer counter. Low layer
    /// indices come back into use only once the whole canvas is gone.
    pub fn clear_all(&mut self) -> Vec<PaintEvent> {
        self.history.clear();
        self.next_layer = 0;
        self.last_pos = None;
        self.new_stroke_pending = true;
        vec![PaintEvent::Cleared]
    }

    /// Access the stroke history (active and undone strokes).
    #[must_use]
    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    /// Union of world bounds over all active dabs, each grown by its
    /// overlap radius, then by `padding`. `None` when nothing is painted.
    #[must_use]
    pub fn paint_bounds(&self, padding: f64) -> Option<PaintBounds> {
        let mut bounds: Option<PaintBounds> = None;
        for stroke in self.history.active_strokes() {
            for dab in &stroke.dabs {
                let r = dab.overlap_radius();
                let half = Vector3::new(r, r, r);
                let (lo, hi) = (dab.position - half, dab.position + half);
                bounds = Some(match bounds {
                    None => PaintBounds { min: lo, max: hi },
                    Some(b) => PaintBounds {
                        min: b.min.inf(&lo),
                        max: b.max.sup(&hi),
                    },
                });
            }
        }
        bounds.map(|b| {
            let pad = Vector3::new(padding, padding, padding);
            PaintBounds {
                min: b.min - pad,
                max: b.max + pad,
            }
        })
    }

    /// Package a capture for the host renderer: the padded paint bounds at
    /// the requested resolution. Read-only; `None` when the canvas is
    /// empty.
    #[must_use]
    pub fn capture_request(&self, resolution: (u32, u32), padding: f64) -> Option<CaptureRequest> {
        Some(CaptureRequest {
            resolution,
            bounds: self.paint_bounds(padding)?,
        })
    }

    fn begin_new_stroke(&mut self) {
        self.new_stroke_pending = true;
        self.last_pos = None;
    }
}
