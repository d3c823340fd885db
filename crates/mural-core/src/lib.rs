//! Core selection and painting logic for the Mural AR graffiti library.
//!
//! Mural turns a noisy stream of AR-tracked planes into a single locked
//! painting surface and composites spray strokes onto it. The engine
//! integration stays outside: the host feeds plane-change batches and
//! screen-center hit tests in, and mirrors the returned paint events into
//! its renderer.
//!
//! # Pipeline Overview
//!
//! Per frame, stages run in a fixed order:
//!
//! 1. **Plane mirror**: apply the engine's `PlanesChanged` batch and keep
//!    merge (`subsumed_by`) chains resolvable.
//! 2. **Quality filter**: per-plane growth statistics and quality gates
//!    (alignment, tilt, distance, age, area, stability dwell); the best
//!    gate-passing plane becomes the primary candidate.
//! 3. **Surface selector**: reticle dwell on a plane commits the
//!    selection and narrows detection to its alignment class.
//! 4. **Boundary lock**: the chosen plane's boundary polygon and
//!    transform are frozen; later growth never widens the paintable
//!    region.
//! 5. **Stroke compositor**: accepted samples become spaced dabs grouped
//!    into layered, undoable strokes.
//!
//! # Configuration
//!
//! Each stage has an immutable config with a builder:
//! [`config::FilterConfig`], [`config::SelectorConfig`] and
//! [`config::BrushConfig`], bundled into [`session::SessionConfig`].
//!
//! # Example
//!
//! ```
//! use mural_core::plane::{PlaneId, PlanesChanged};
//! use mural_core::geometry::Pose;
//! use mural_core::session::{FrameInput, GraffitiSession, SessionConfig};
//! use mural_core::test_utils::{hit_on, square_plane, FixedAnchors, RecordingEngine, ScriptedHits};
//!
//! // Wire a session to scripted engine doubles (a real host implements
//! // the same three traits against its AR engine).
//! let mut session = GraffitiSession::new(
//!     SessionConfig::default(),
//!     Box::new(ScriptedHits::always(hit_on(PlaneId(1)))),
//!     Box::new(FixedAnchors(None)),
//!     Box::new(RecordingEngine::default()),
//! );
//!
//! session.begin_scan();
//! let mut t = 0.0;
//! while t <= 1.0 {
//!     session.update(&FrameInput {
//!         now: t,
//!         camera: Pose::from_position(nalgebra::Vector3::new(0.0, 1.5, 0.0)),
//!         planes_changed: Some(PlanesChanged {
//!             added: vec![square_plane(PlaneId(1), 1.0)],
//!             ..Default::default()
//!         }),
//!     });
//!     t += 0.1;
//! }
//!
//! // The reticle dwelled on a stable plane: ready to lock and paint.
//! assert!(session.selection_ready());
//! assert!(session.confirm_selection());
//! ```

pub mod artwork;
pub mod boundary;
pub mod config;
pub mod filter;
pub mod geometry;
pub mod plane;
pub mod selector;
pub mod session;
pub mod stroke;
pub mod test_utils;

pub use crate::config::{BrushConfig, FilterConfig, SelectorConfig};
pub use crate::session::{FrameInput, GraffitiSession, Phase, SessionConfig};
pub use crate::stroke::PaintEvent;
