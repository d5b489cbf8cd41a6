//! Interaction context: mouse mode, selection, and the override stack.
//!
//! All "active" state lives in one [`InteractionContext`] value passed
//! explicitly to every operation. Nothing here is ambient or global.

use crate::clipboard::Clipboard;
use crate::coords::Roi;
use crate::hit_test::ImpactVector;
use crate::model::{LocalizationId, TrackId, TypeId};

/// Mouse-mode state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseMode {
    /// Idle; hit-testing on pointer-down.
    Query,
    /// Drawing a new box, line, or dot.
    New,
    /// Accumulating polygon vertices per click.
    NewPoly,
    /// An annotation is selected.
    Select,
    /// Dragging the selected annotation.
    Move,
    /// Dragging a resize handle.
    Resize,
    /// Dragging out a zoom rectangle.
    ZoomRoi,
    /// Dragging the ROI around.
    Pan,
}

impl MouseMode {
    /// Modes that interrupt whatever is in progress and restore it after.
    pub fn is_override(self) -> bool {
        matches!(self, MouseMode::ZoomRoi | MouseMode::Pan)
    }
}

/// A selection waiting on a seek; stale generations are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSelect {
    pub id: LocalizationId,
    pub generation: u64,
}

/// All interaction state, bundled.
#[derive(Debug, Default)]
pub struct InteractionContext {
    mode: Mode,
    pub active_localization: Option<LocalizationId>,
    pub active_track: Option<TrackId>,
    pub emphasized: Option<LocalizationId>,
    pub clipboard: Clipboard,
    pub roi: Roi,
    /// Per-vertex motion scalars for the resize in progress.
    pub impact: Option<ImpactVector>,
    /// Seek-then-select in flight.
    pub pending_select: Option<PendingSelect>,
    /// Bumped on every select request; stamps pending selections.
    pub select_generation: u64,
    /// Type to instantiate in NEW / NEW_POLY mode.
    pub new_type: Option<TypeId>,
    /// Redraw token: NEW-mode completion patches this annotation instead of
    /// emitting a create.
    pub redraw_target: Option<LocalizationId>,
    /// Polygon draft vertices, normalized. Survives mode overrides.
    pub draft_poly: Vec<[f32; 2]>,
}

#[derive(Debug)]
struct Mode {
    current: MouseMode,
    /// One-slot override stack; a second interruption keeps the first saved
    /// mode so the original state is what gets restored.
    saved: Option<MouseMode>,
}

impl Default for Mode {
    fn default() -> Self {
        Self {
            current: MouseMode::Query,
            saved: None,
        }
    }
}

impl InteractionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> MouseMode {
        self.mode.current
    }

    /// Switch modes. Returns `true` if the mode actually changed.
    pub fn set_mode(&mut self, mode: MouseMode) -> bool {
        if self.mode.current == mode {
            return false;
        }
        self.mode.current = mode;
        true
    }

    /// Enter ZOOM_ROI or PAN, remembering what was interrupted.
    pub fn push_override(&mut self, mode: MouseMode) -> bool {
        debug_assert!(mode.is_override());
        if self.mode.saved.is_none() {
            self.mode.saved = Some(self.mode.current);
        }
        self.set_mode(mode)
    }

    /// Leave an override mode, restoring the interrupted state.
    pub fn pop_override(&mut self) -> bool {
        let restored = self.mode.saved.take().unwrap_or(MouseMode::Query);
        self.set_mode(restored)
    }

    pub fn in_override(&self) -> bool {
        self.mode.saved.is_some()
    }

    /// Drop selection state. Returns the previously active id, if any.
    pub fn clear_selection(&mut self) -> Option<LocalizationId> {
        self.impact = None;
        self.active_localization.take()
    }

    /// Next generation stamp for a select request, invalidating any pending
    /// one.
    pub fn next_select_generation(&mut self) -> u64 {
        self.select_generation += 1;
        self.pending_select = None;
        self.select_generation
    }
}

/// Move `vertices` by `delta` scaled per vertex by the impact vector.
pub fn apply_impact(vertices: &[[f32; 2]], impact: &[[f32; 2]], delta: [f32; 2]) -> Vec<[f32; 2]> {
    vertices
        .iter()
        .zip(impact.iter())
        .map(|(v, scale)| [v[0] + delta[0] * scale[0], v[1] + delta[1] * scale[1]])
        .collect()
}
