//! Cut/copy slots and cross-frame move semantics.
//!
//! The clipboard tracks ids, not geometry; the surface applies the resulting
//! frame reassignment to the store and issues the persist call. A cut item
//! keeps living on its origin frame until pasted elsewhere; it is drawn as a
//! gray ghost off-frame and blocks pointer affordances.

use crate::model::LocalizationId;

/// A cut annotation waiting to be pasted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutEntry {
    pub id: LocalizationId,
    pub origin_frame: u32,
}

/// Outcome of a paste request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteOutcome {
    /// Nothing in the cut slot.
    Empty,
    /// Paste on the origin frame leaves everything unchanged, slot kept.
    OriginNoOp,
    /// Cross-frame paste: reassign the frame and persist; slot cleared.
    Move {
        id: LocalizationId,
        from: u32,
        to: u32,
    },
}

/// Single cut slot plus a reserved, currently inert copy slot.
#[derive(Debug, Default)]
pub struct Clipboard {
    cut: Option<CutEntry>,
    copy: Option<LocalizationId>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place an annotation in the cut slot, replacing any previous entry.
    pub fn cut(&mut self, id: LocalizationId, origin_frame: u32) {
        self.cut = Some(CutEntry { id, origin_frame });
    }

    /// Reserved: the copy slot is populated but nothing consumes it yet.
    pub fn copy(&mut self, id: LocalizationId) {
        self.copy = Some(id);
    }

    pub fn cut_entry(&self) -> Option<CutEntry> {
        self.cut
    }

    /// Whether `id` currently sits in the cut slot.
    pub fn is_cut(&self, id: LocalizationId) -> bool {
        self.cut.is_some_and(|e| e.id == id)
    }

    pub fn has_cut(&self) -> bool {
        self.cut.is_some()
    }

    /// Resolve a paste onto `target_frame`.
    pub fn paste(&mut self, target_frame: u32) -> PasteOutcome {
        let Some(entry) = self.cut else {
            return PasteOutcome::Empty;
        };
        if entry.origin_frame == target_frame {
            return PasteOutcome::OriginNoOp;
        }
        self.cut = None;
        PasteOutcome::Move {
            id: entry.id,
            from: entry.origin_frame,
            to: target_frame,
        }
    }

    /// Drop both slots. Called when playback starts.
    pub fn clear(&mut self) {
        self.cut = None;
        self.copy = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paste_on_origin_frame_is_noop_and_keeps_slot() {
        let mut clip = Clipboard::new();
        clip.cut(7, 3);
        assert_eq!(clip.paste(3), PasteOutcome::OriginNoOp);
        assert!(clip.is_cut(7));
        assert!(clip.has_cut());
    }

    #[test]
    fn test_cross_frame_paste_moves_and_clears_slot() {
        let mut clip = Clipboard::new();
        clip.cut(7, 3);
        assert_eq!(
            clip.paste(9),
            PasteOutcome::Move { id: 7, from: 3, to: 9 }
        );
        assert!(!clip.has_cut());
        // A second paste finds the slot empty.
        assert_eq!(clip.paste(9), PasteOutcome::Empty);
    }

    #[test]
    fn test_empty_paste() {
        let mut clip = Clipboard::new();
        assert_eq!(clip.paste(0), PasteOutcome::Empty);
    }

    #[test]
    fn test_cut_replaces_previous_entry() {
        let mut clip = Clipboard::new();
        clip.cut(7, 3);
        clip.cut(8, 5);
        assert!(!clip.is_cut(7));
        assert!(clip.is_cut(8));
        assert_eq!(clip.cut_entry(), Some(CutEntry { id: 8, origin_frame: 5 }));
    }

    #[test]
    fn test_clear_on_playback_drops_both_slots() {
        let mut clip = Clipboard::new();
        clip.cut(7, 3);
        clip.copy(8);
        clip.clear();
        assert!(!clip.has_cut());
        assert_eq!(clip.paste(0), PasteOutcome::Empty);
    }
}
