//! Multi-frame track (state) annotations.

use serde::{Deserialize, Serialize};

use crate::color::Rgba;
use crate::model::LocalizationId;

/// Unique identifier for a track.
pub type TrackId = u64;

/// An ordered collection of localizations across frames sharing an identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub type_id: super::TypeId,
    /// Inclusive frame ranges this track spans.
    pub segments: Vec<[u32; 2]>,
    /// Member localization ids; the member-to-track reverse index is derived
    /// by the store, never stored here.
    pub member_ids: Vec<LocalizationId>,
    /// Explicit draw color; when `None`, the store assigns one from the
    /// deterministic color progression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgba>,
}

impl Track {
    pub fn new(id: TrackId, type_id: super::TypeId) -> Self {
        Self {
            id,
            type_id,
            segments: Vec::new(),
            member_ids: Vec::new(),
            color: None,
        }
    }

    /// Whether any segment covers `frame`.
    pub fn covers_frame(&self, frame: u32) -> bool {
        self.segments
            .iter()
            .any(|[start, end]| (*start..=*end).contains(&frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covers_frame_inclusive_bounds() {
        let mut track = Track::new(1, 2);
        track.segments = vec![[5, 10], [20, 20]];
        assert!(track.covers_frame(5));
        assert!(track.covers_frame(10));
        assert!(track.covers_frame(20));
        assert!(!track.covers_frame(11));
        assert!(!track.covers_frame(0));
    }
}
