//! Input events consumed by the dispatcher and engine events produced for
//! the host.
//!
//! Produced events accumulate in an outbox the host drains after each input;
//! nothing is delivered re-entrantly.

use crate::coords::Roi;
use crate::interaction::MouseMode;
use crate::model::{LocalizationId, TrackId};
use crate::services::{CreateRequest, LocalizationPatch, PersistKind};

/// Pointer button, reduced to what the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

/// Arrow key for nudging the active annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowKey {
    Left,
    Right,
    Up,
    Down,
}

impl ArrowKey {
    /// Unit direction in normalized-pixel terms (y grows downward).
    pub fn direction(self) -> [f32; 2] {
        match self {
            ArrowKey::Left => [-1.0, 0.0],
            ArrowKey::Right => [1.0, 0.0],
            ArrowKey::Up => [0.0, -1.0],
            ArrowKey::Down => [0.0, 1.0],
        }
    }
}

/// Everything that can enter the dispatcher. Asynchronous completions (seek,
/// persist) re-enter here instead of resolving inline, which keeps all state
/// mutation inside one synchronous handler.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown { x: f32, y: f32, button: PointerButton },
    PointerMove { x: f32, y: f32 },
    PointerUp { x: f32, y: f32 },
    /// Arrow-key nudge; `fast` is the held modifier.
    Nudge { key: ArrowKey, fast: bool },
    /// Escape, delete and similar one-shot keys.
    CancelKey,
    DeleteKey,
    /// Seek requested earlier has landed on `frame`. Stale generations are
    /// dropped by the dispatcher.
    SeekComplete { frame: u32, generation: u64 },
    /// A fire-and-forget persist call reported back.
    PersistComplete {
        kind: PersistKind,
        id: u64,
        error: Option<String>,
    },
    /// 30 fps animation timer fired.
    AnimationTick,
    PlaybackStarted,
    PlaybackStopped,
}

/// Frame and ROI context attached to every produced event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventContext {
    pub frame: u32,
    pub roi: Roi,
}

/// Events produced for the host.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Select {
        id: LocalizationId,
        context: EventContext,
    },
    Unselect {
        id: LocalizationId,
        context: EventContext,
    },
    /// Ask the host to confirm creation (metadata prompt).
    Create {
        request: CreateRequest,
        context: EventContext,
    },
    Edit {
        id: LocalizationId,
        patch: LocalizationPatch,
        context: EventContext,
    },
    ModifyTrack {
        track_id: TrackId,
        context: EventContext,
    },
    ZoomChange {
        roi: Roi,
        context: EventContext,
    },
    /// A NEW-mode gesture finished and produced a draft.
    DrawComplete {
        request: CreateRequest,
        context: EventContext,
    },
    ModeChange {
        mode: MouseMode,
        context: EventContext,
    },
    /// Host should suppress edit affordances while a bulk refresh runs.
    TemporarilyMaskEdits {
        masked: bool,
        context: EventContext,
    },
    /// A persist call failed and the failure policy surfaces it.
    PersistFailed {
        kind: PersistKind,
        message: String,
        context: EventContext,
    },
}

/// Outbox the host drains after each input event.
#[derive(Debug, Default)]
pub struct EventOutbox {
    events: Vec<EngineEvent>,
}

impl EventOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbox_drains_in_order() {
        let mut outbox = EventOutbox::new();
        let context = EventContext {
            frame: 0,
            roi: Roi::FULL,
        };
        outbox.push(EngineEvent::Select { id: 1, context });
        outbox.push(EngineEvent::Unselect { id: 1, context });
        let drained = outbox.drain();
        assert_eq!(drained.len(), 2);
        assert!(matches!(drained[0], EngineEvent::Select { id: 1, .. }));
        assert!(outbox.is_empty());
        assert!(outbox.drain().is_empty());
    }

    #[test]
    fn test_arrow_directions() {
        assert_eq!(ArrowKey::Up.direction(), [0.0, -1.0]);
        assert_eq!(ArrowKey::Right.direction(), [1.0, 0.0]);
    }
}
