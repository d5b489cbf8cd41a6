//! Bounded pool of frame textures with a load/display handshake.
//!
//! Decode-ahead writes into `load()` slots while rendering reads the
//! `display()` slot; `available_load`/`available_display` are the
//! back-pressure signals. A registered push callback is invoked on every load
//! and display refresh to collect the annotation overlay for that frame, which
//! keeps overlay drawing interleaved with but decoupled from frame delivery.

use crate::batch::DrawBatch;
use crate::context::GpuContext;
use crate::error::{GpuError, Result};
use crate::texture::Texture;

/// Default ring depth.
pub const DEFAULT_RING_DEPTH: usize = 16;

/// Pure load/display cursor arithmetic over a fixed-depth ring.
///
/// Cursors are monotonically increasing; slot indices are taken modulo the
/// depth. Kept free of GPU state so the protocol is unit-testable.
#[derive(Debug, Clone)]
pub struct RingCursor {
    depth: usize,
    load: u64,
    display: u64,
}

impl RingCursor {
    pub fn new(depth: usize) -> Self {
        assert!(depth > 0, "ring depth must be nonzero");
        Self {
            depth,
            load: 0,
            display: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of slots free for loading.
    pub fn available_load(&self) -> usize {
        self.depth - self.pending()
    }

    /// Number of loaded slots not yet released by `done_display`.
    pub fn available_display(&self) -> usize {
        self.pending()
    }

    fn pending(&self) -> usize {
        (self.load - self.display) as usize
    }

    /// Claim the next writable slot, or `None` when the ring is full.
    pub fn load(&mut self) -> Option<usize> {
        if self.available_load() == 0 {
            return None;
        }
        let slot = (self.load % self.depth as u64) as usize;
        self.load += 1;
        Some(slot)
    }

    /// Current displayable slot, or `None` when the ring is empty.
    pub fn display(&self) -> Option<usize> {
        if self.pending() == 0 {
            return None;
        }
        Some((self.display % self.depth as u64) as usize)
    }

    /// Release the current display slot, advancing to the next.
    pub fn done_display(&mut self) {
        if self.display < self.load {
            self.display += 1;
        }
    }

    /// Discard up to `n` stale entries from the display side.
    pub fn trim(&mut self, n: usize) {
        self.display = (self.display + n as u64).min(self.load);
    }
}

/// Callback producing the overlay batch for a frame.
pub type PushCallback = Box<dyn FnMut(u32, &mut DrawBatch)>;

struct LoadedSlot {
    frame: u32,
    texture: Texture,
    overlay: DrawBatch,
}

/// Fixed-depth pool of GPU frame textures driven by a [`RingCursor`].
pub struct FrameTextureRing {
    cursor: RingCursor,
    slots: Vec<Option<LoadedSlot>>,
    push_callback: Option<PushCallback>,
}

impl FrameTextureRing {
    pub fn new(depth: usize) -> Self {
        Self {
            cursor: RingCursor::new(depth),
            slots: (0..depth).map(|_| None).collect(),
            push_callback: None,
        }
    }

    /// Register the overlay callback invoked on load and display refresh.
    pub fn set_push_callback(&mut self, cb: PushCallback) {
        self.push_callback = Some(cb);
    }

    pub fn available_load(&self) -> usize {
        self.cursor.available_load()
    }

    pub fn available_display(&self) -> usize {
        self.cursor.available_display()
    }

    /// Load a decoded frame into the next writable slot.
    ///
    /// Invokes the push callback to capture the frame's overlay. Fails when
    /// the ring is full; callers should gate on `available_load`.
    pub fn load(&mut self, ctx: &GpuContext, frame: u32, rgba: &[u8], width: u32, height: u32) -> Result<()> {
        let slot = self
            .cursor
            .load()
            .ok_or_else(|| GpuError::Ring("ring full; no writable slot".into()))?;

        let texture = Texture::from_rgba8(ctx, rgba, width, height)?;
        let mut overlay = DrawBatch::new();
        if let Some(cb) = self.push_callback.as_mut() {
            cb(frame, &mut overlay);
        }
        self.slots[slot] = Some(LoadedSlot {
            frame,
            texture,
            overlay,
        });
        Ok(())
    }

    /// Re-upload pixels for an already-loaded frame without advancing cursors.
    pub fn update(&mut self, ctx: &GpuContext, frame: u32, rgba: &[u8]) -> Result<()> {
        let slot = self
            .slots
            .iter_mut()
            .flatten()
            .find(|s| s.frame == frame)
            .ok_or_else(|| GpuError::Ring(format!("frame {frame} not resident in ring")))?;
        slot.texture.write(ctx, rgba)?;
        if let Some(cb) = self.push_callback.as_mut() {
            slot.overlay.begin();
            cb(frame, &mut slot.overlay);
        }
        Ok(())
    }

    /// Frame number and texture of the current display slot.
    pub fn display(&self) -> Option<(u32, &Texture)> {
        let idx = self.cursor.display()?;
        self.slots[idx].as_ref().map(|s| (s.frame, &s.texture))
    }

    /// Overlay batch captured for the current display slot.
    pub fn display_overlay(&self) -> Option<&DrawBatch> {
        let idx = self.cursor.display()?;
        self.slots[idx].as_ref().map(|s| &s.overlay)
    }

    /// Re-invoke the push callback for the display slot (annotations changed
    /// while paused on the same frame).
    pub fn refresh_display(&mut self) {
        let Some(idx) = self.cursor.display() else {
            return;
        };
        if let (Some(slot), Some(cb)) = (self.slots[idx].as_mut(), self.push_callback.as_mut()) {
            slot.overlay.begin();
            cb(slot.frame, &mut slot.overlay);
        }
    }

    /// Release the display slot, advancing to the next loaded frame.
    pub fn done_display(&mut self) {
        self.cursor.done_display();
    }

    /// Discard up to `n` stale frames.
    pub fn trim(&mut self, n: usize) {
        self.cursor.trim(n);
    }

    /// Drop all GPU textures, keeping cursors. Used on context loss; frames
    /// must be re-loaded afterwards.
    pub fn evict_all(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        let depth = self.cursor.depth();
        self.cursor = RingCursor::new(depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ring_has_nothing_to_display() {
        let cursor = RingCursor::new(4);
        assert_eq!(cursor.available_load(), 4);
        assert_eq!(cursor.available_display(), 0);
        assert_eq!(cursor.display(), None);
    }

    #[test]
    fn test_load_then_display() {
        let mut cursor = RingCursor::new(4);
        assert_eq!(cursor.load(), Some(0));
        assert_eq!(cursor.load(), Some(1));
        assert_eq!(cursor.available_display(), 2);
        assert_eq!(cursor.display(), Some(0));

        cursor.done_display();
        assert_eq!(cursor.display(), Some(1));
        cursor.done_display();
        assert_eq!(cursor.display(), None);
    }

    #[test]
    fn test_full_ring_applies_back_pressure() {
        let mut cursor = RingCursor::new(2);
        assert!(cursor.load().is_some());
        assert!(cursor.load().is_some());
        assert_eq!(cursor.available_load(), 0);
        assert_eq!(cursor.load(), None);

        cursor.done_display();
        assert_eq!(cursor.available_load(), 1);
        assert_eq!(cursor.load(), Some(0));
    }

    #[test]
    fn test_slots_wrap_modulo_depth() {
        let mut cursor = RingCursor::new(3);
        for expected in [0, 1, 2] {
            assert_eq!(cursor.load(), Some(expected));
            cursor.done_display();
        }
        assert_eq!(cursor.load(), Some(0));
    }

    #[test]
    fn test_trim_discards_stale_entries() {
        let mut cursor = RingCursor::new(8);
        for _ in 0..5 {
            cursor.load();
        }
        cursor.trim(3);
        assert_eq!(cursor.available_display(), 2);
        assert_eq!(cursor.display(), Some(3));

        // Trimming past the load cursor clamps.
        cursor.trim(10);
        assert_eq!(cursor.available_display(), 0);
        assert_eq!(cursor.available_load(), 8);
    }

    #[test]
    fn test_done_display_on_empty_ring_is_noop() {
        let mut cursor = RingCursor::new(2);
        cursor.done_display();
        assert_eq!(cursor.available_load(), 2);
        assert_eq!(cursor.display(), None);
    }
}
