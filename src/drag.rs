//! Drag recognition and debounce.
//!
//! Raw pointer motion becomes a [`DragEvent`] only once it clears the
//! debounce gate (elapsed time or travel distance), so an accidental
//! micro-drag from a click never reaches the state machine as a commit.
//! Positions are viewport pixels.

use web_time::Instant;

use crate::constants::drag::{DEBOUNCE_MS, DEBOUNCE_PX};

/// One sampled pointer position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragPoint {
    pub x: f32,
    pub y: f32,
    pub t: Instant,
}

impl DragPoint {
    pub fn new(x: f32, y: f32, t: Instant) -> Self {
        Self { x, y, t }
    }

    pub fn pos(&self) -> [f32; 2] {
        [self.x, self.y]
    }
}

/// A recognized drag. `current` is present mid-drag and replaced by `end` on
/// release.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragEvent {
    pub start: DragPoint,
    pub current: Option<DragPoint>,
    pub end: Option<DragPoint>,
}

impl DragEvent {
    fn latest(&self) -> DragPoint {
        self.end.or(self.current).unwrap_or(self.start)
    }

    pub fn duration_ms(&self) -> f32 {
        self.latest()
            .t
            .duration_since(self.start.t)
            .as_secs_f32()
            * 1000.0
    }

    pub fn length_px(&self) -> f32 {
        let latest = self.latest();
        (latest.x - self.start.x).hypot(latest.y - self.start.y)
    }

    /// Total displacement from start, viewport pixels.
    pub fn delta_px(&self) -> [f32; 2] {
        let latest = self.latest();
        [latest.x - self.start.x, latest.y - self.start.y]
    }

    /// Debounce gate: long enough or far enough to count as a deliberate
    /// drag rather than a jittery click.
    pub fn passes_debounce(&self) -> bool {
        self.duration_ms() > DEBOUNCE_MS || self.length_px() > DEBOUNCE_PX
    }
}

/// Tracks one pointer gesture from press to release.
#[derive(Debug, Default)]
pub struct DragRecognizer {
    event: Option<DragEvent>,
}

impl DragRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, x: f32, y: f32, now: Instant) {
        self.event = Some(DragEvent {
            start: DragPoint::new(x, y, now),
            current: None,
            end: None,
        });
    }

    /// Update the in-flight drag. Returns the event once it passes debounce.
    pub fn update(&mut self, x: f32, y: f32, now: Instant) -> Option<DragEvent> {
        let event = self.event.as_mut()?;
        event.current = Some(DragPoint::new(x, y, now));
        event.passes_debounce().then_some(*event)
    }

    /// Finish the gesture. Returns a committed drag, or `None` for a
    /// malformed one (zero-length or sub-debounce), which callers treat as a
    /// plain click.
    pub fn finish(&mut self, x: f32, y: f32, now: Instant) -> Option<DragEvent> {
        let mut event = self.event.take()?;
        event.current = None;
        event.end = Some(DragPoint::new(x, y, now));
        if event.length_px() <= f32::EPSILON || !event.passes_debounce() {
            return None;
        }
        Some(event)
    }

    /// Abandon the gesture without emitting anything.
    pub fn cancel(&mut self) {
        self.event = None;
    }

    pub fn is_active(&self) -> bool {
        self.event.is_some()
    }

    /// The press position, if a gesture is in flight.
    pub fn start(&self) -> Option<DragPoint> {
        self.event.map(|e| e.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_short_quick_drag_is_filtered() {
        let mut rec = DragRecognizer::new();
        let t0 = Instant::now();
        rec.begin(10.0, 10.0, t0);
        // 5 px in 50 ms: under both gates.
        let out = rec.finish(13.0, 14.0, t0 + Duration::from_millis(50));
        assert!(out.is_none());
        assert!(!rec.is_active());
    }

    #[test]
    fn test_long_distance_promotes_regardless_of_time() {
        let mut rec = DragRecognizer::new();
        let t0 = Instant::now();
        rec.begin(0.0, 0.0, t0);
        let out = rec.finish(120.0, 0.0, t0 + Duration::from_millis(10));
        let event = out.expect("distance gate");
        assert!(event.length_px() > 100.0);
        assert_eq!(event.delta_px(), [120.0, 0.0]);
        assert!(event.current.is_none());
        assert!(event.end.is_some());
    }

    #[test]
    fn test_long_duration_promotes_short_distance() {
        let mut rec = DragRecognizer::new();
        let t0 = Instant::now();
        rec.begin(0.0, 0.0, t0);
        let out = rec.finish(10.0, 0.0, t0 + Duration::from_millis(400));
        assert!(out.is_some());
    }

    #[test]
    fn test_zero_length_drag_never_commits() {
        let mut rec = DragRecognizer::new();
        let t0 = Instant::now();
        rec.begin(50.0, 50.0, t0);
        // Held in place past the time gate, still not a drag.
        let out = rec.finish(50.0, 50.0, t0 + Duration::from_millis(500));
        assert!(out.is_none());
    }

    #[test]
    fn test_update_reports_once_past_debounce() {
        let mut rec = DragRecognizer::new();
        let t0 = Instant::now();
        rec.begin(0.0, 0.0, t0);
        assert!(rec.update(5.0, 5.0, t0 + Duration::from_millis(20)).is_none());
        let mid = rec
            .update(150.0, 0.0, t0 + Duration::from_millis(30))
            .expect("past distance gate");
        assert!(mid.current.is_some());
        assert!(mid.end.is_none());
    }

    #[test]
    fn test_cancel_discards_gesture() {
        let mut rec = DragRecognizer::new();
        let t0 = Instant::now();
        rec.begin(0.0, 0.0, t0);
        rec.cancel();
        assert!(rec.finish(200.0, 0.0, t0 + Duration::from_millis(500)).is_none());
    }
}
