//! Indexed annotation store.
//!
//! Arena keyed by id with by-frame and by-type secondary indices kept
//! consistent on every mutation. Tracks are rebuilt wholesale when a batch
//! arrives; the member-to-track reverse index is derived here and never
//! persisted.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::color::{color_progression, Rgba};
use crate::error::{EngineError, Result};
use crate::model::{Geometry, Localization, LocalizationId, Track, TrackId, TypeDescriptor, TypeId};

/// All annotation state for one media item.
#[derive(Debug, Default)]
pub struct AnnotationStore {
    localizations: HashMap<LocalizationId, Localization>,
    by_frame: HashMap<u32, Vec<LocalizationId>>,
    by_type: HashMap<TypeId, Vec<LocalizationId>>,
    tracks: HashMap<TrackId, Track>,
    member_track: HashMap<LocalizationId, TrackId>,
    types: HashMap<TypeId, TypeDescriptor>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Type registry
    // ========================================================================

    pub fn register_type(&mut self, desc: TypeDescriptor) {
        self.types.insert(desc.id, desc);
    }

    pub fn type_descriptor(&self, type_id: TypeId) -> Result<&TypeDescriptor> {
        self.types
            .get(&type_id)
            .ok_or(EngineError::MissingType(type_id))
    }

    pub fn types(&self) -> &HashMap<TypeId, TypeDescriptor> {
        &self.types
    }

    // ========================================================================
    // Localizations
    // ========================================================================

    /// Insert or replace one localization, keeping both indices consistent.
    pub fn insert(&mut self, loc: Localization) {
        if let Some(old) = self.localizations.get(&loc.id) {
            let (frame, type_id) = (old.frame, old.type_id);
            remove_from_index(&mut self.by_frame, frame, loc.id);
            remove_from_index(&mut self.by_type, type_id, loc.id);
        }
        self.by_frame.entry(loc.frame).or_default().push(loc.id);
        self.by_type.entry(loc.type_id).or_default().push(loc.id);
        self.localizations.insert(loc.id, loc);
    }

    /// Batch ingest, e.g. one media item's worth of localizations.
    pub fn insert_batch(&mut self, locs: impl IntoIterator<Item = Localization>) {
        for loc in locs {
            self.insert(loc);
        }
    }

    pub fn remove(&mut self, id: LocalizationId) -> Result<Localization> {
        let loc = self
            .localizations
            .remove(&id)
            .ok_or(EngineError::UnknownLocalization(id))?;
        remove_from_index(&mut self.by_frame, loc.frame, id);
        remove_from_index(&mut self.by_type, loc.type_id, id);
        Ok(loc)
    }

    pub fn get(&self, id: LocalizationId) -> Result<&Localization> {
        self.localizations
            .get(&id)
            .ok_or(EngineError::UnknownLocalization(id))
    }

    pub fn contains(&self, id: LocalizationId) -> bool {
        self.localizations.contains_key(&id)
    }

    /// Replace the geometry of an existing localization.
    pub fn set_geometry(&mut self, id: LocalizationId, geometry: Geometry) -> Result<()> {
        let loc = self
            .localizations
            .get_mut(&id)
            .ok_or(EngineError::UnknownLocalization(id))?;
        loc.geometry = geometry;
        Ok(())
    }

    /// Move a localization to another frame, updating the frame index.
    pub fn set_frame(&mut self, id: LocalizationId, frame: u32) -> Result<()> {
        let loc = self
            .localizations
            .get_mut(&id)
            .ok_or(EngineError::UnknownLocalization(id))?;
        let old_frame = loc.frame;
        if old_frame == frame {
            return Ok(());
        }
        loc.frame = frame;
        remove_from_index(&mut self.by_frame, old_frame, id);
        self.by_frame.entry(frame).or_default().push(id);
        Ok(())
    }

    /// Localizations on `frame`, in insertion order.
    pub fn on_frame(&self, frame: u32) -> impl Iterator<Item = &Localization> {
        self.by_frame
            .get(&frame)
            .into_iter()
            .flatten()
            .filter_map(|id| self.localizations.get(id))
    }

    pub fn of_type(&self, type_id: TypeId) -> impl Iterator<Item = &Localization> {
        self.by_type
            .get(&type_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.localizations.get(id))
    }

    pub fn len(&self) -> usize {
        self.localizations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.localizations.is_empty()
    }

    // ========================================================================
    // Tracks
    // ========================================================================

    /// Replace all tracks wholesale and rebuild the reverse member index.
    ///
    /// Tracks without an explicit color are assigned one from the
    /// deterministic progression over their id, stable across rebuilds.
    pub fn rebuild_tracks(&mut self, tracks: impl IntoIterator<Item = Track>) {
        self.tracks.clear();
        self.member_track.clear();
        for mut track in tracks {
            if track.color.is_none() {
                track.color = Some(color_progression(track.id));
            }
            for member in &track.member_ids {
                self.member_track.insert(*member, track.id);
            }
            self.tracks.insert(track.id, track);
        }
    }

    pub fn track(&self, id: TrackId) -> Result<&Track> {
        self.tracks.get(&id).ok_or(EngineError::UnknownTrack(id))
    }

    /// The track this localization belongs to, if any.
    pub fn track_of(&self, id: LocalizationId) -> Option<&Track> {
        self.member_track.get(&id).and_then(|t| self.tracks.get(t))
    }

    /// Draw color for a track; the rebuild guarantees one is present, but a
    /// directly-constructed track may still carry `None`.
    pub fn track_color(&self, track: &Track) -> Rgba {
        track.color.unwrap_or_else(|| color_progression(track.id))
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Add a member to an existing track, updating the reverse index.
    pub fn add_track_member(&mut self, track_id: TrackId, member: LocalizationId) -> Result<()> {
        let track = self
            .tracks
            .get_mut(&track_id)
            .ok_or(EngineError::UnknownTrack(track_id))?;
        if !track.member_ids.contains(&member) {
            track.member_ids.push(member);
            self.member_track.insert(member, track_id);
        }
        Ok(())
    }

    /// Remove a member from its track, if it has one.
    pub fn remove_track_member(&mut self, member: LocalizationId) {
        if let Some(track_id) = self.member_track.remove(&member) {
            if let Some(track) = self.tracks.get_mut(&track_id) {
                track.member_ids.retain(|m| *m != member);
            }
        }
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Serialize the annotation data (not the derived indices) to JSON.
    pub fn export_json(&self) -> Result<String> {
        let mut localizations: Vec<&Localization> = self.localizations.values().collect();
        localizations.sort_by_key(|l| l.id);
        let mut tracks: Vec<&Track> = self.tracks.values().collect();
        tracks.sort_by_key(|t| t.id);
        let mut types: Vec<&TypeDescriptor> = self.types.values().collect();
        types.sort_by_key(|t| t.id);
        let snapshot = SnapshotRef {
            localizations,
            tracks,
            types,
        };
        Ok(serde_json::to_string(&snapshot)?)
    }

    /// Rebuild a store from a JSON snapshot, re-deriving all indices.
    pub fn import_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        let mut store = Self::new();
        for desc in snapshot.types {
            store.register_type(desc);
        }
        store.insert_batch(snapshot.localizations);
        store.rebuild_tracks(snapshot.tracks);
        Ok(store)
    }
}

fn remove_from_index<K: std::hash::Hash + Eq>(
    index: &mut HashMap<K, Vec<LocalizationId>>,
    key: K,
    id: LocalizationId,
) {
    if let Some(ids) = index.get_mut(&key) {
        ids.retain(|x| *x != id);
        if ids.is_empty() {
            index.remove(&key);
        }
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    localizations: Vec<&'a Localization>,
    tracks: Vec<&'a Track>,
    types: Vec<&'a TypeDescriptor>,
}

#[derive(Deserialize)]
struct Snapshot {
    localizations: Vec<Localization>,
    #[serde(default)]
    tracks: Vec<Track>,
    #[serde(default)]
    types: Vec<TypeDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Dtype;

    fn dot(id: LocalizationId, frame: u32) -> Localization {
        Localization::new(id, 1, frame, Geometry::Dot { x: 0.5, y: 0.5 })
    }

    #[test]
    fn test_insert_indexes_by_frame_and_type() {
        let mut store = AnnotationStore::new();
        store.insert(dot(1, 3));
        store.insert(dot(2, 3));
        store.insert(dot(3, 7));

        let on_3: Vec<_> = store.on_frame(3).map(|l| l.id).collect();
        assert_eq!(on_3, vec![1, 2]);
        assert_eq!(store.on_frame(7).count(), 1);
        assert_eq!(store.of_type(1).count(), 3);
        assert_eq!(store.on_frame(99).count(), 0);
    }

    #[test]
    fn test_remove_cleans_indices() {
        let mut store = AnnotationStore::new();
        store.insert(dot(1, 3));
        store.remove(1).unwrap();
        assert_eq!(store.on_frame(3).count(), 0);
        assert_eq!(store.of_type(1).count(), 0);
        assert!(matches!(
            store.remove(1),
            Err(EngineError::UnknownLocalization(1))
        ));
    }

    #[test]
    fn test_reinsert_moves_between_frames() {
        let mut store = AnnotationStore::new();
        store.insert(dot(1, 3));
        store.insert(dot(1, 5));
        assert_eq!(store.on_frame(3).count(), 0);
        assert_eq!(store.on_frame(5).count(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_set_frame_updates_index() {
        let mut store = AnnotationStore::new();
        store.insert(dot(1, 3));
        store.set_frame(1, 9).unwrap();
        assert_eq!(store.on_frame(3).count(), 0);
        let on_9: Vec<_> = store.on_frame(9).map(|l| l.id).collect();
        assert_eq!(on_9, vec![1]);
    }

    #[test]
    fn test_rebuild_tracks_derives_reverse_index_and_colors() {
        let mut store = AnnotationStore::new();
        let mut track = Track::new(10, 1);
        track.member_ids = vec![1, 2];
        store.rebuild_tracks([track]);

        assert_eq!(store.track_of(1).map(|t| t.id), Some(10));
        assert_eq!(store.track_of(2).map(|t| t.id), Some(10));
        assert_eq!(store.track_of(3).map(|t| t.id), None);
        // Color assigned deterministically from the progression.
        let assigned = store.track(10).unwrap().color.unwrap();
        assert_eq!(assigned, color_progression(10));

        // A second rebuild replaces everything.
        store.rebuild_tracks([]);
        assert_eq!(store.track_of(1).map(|t| t.id), None);
        assert!(store.track(10).is_err());
    }

    #[test]
    fn test_explicit_track_color_is_kept() {
        let mut store = AnnotationStore::new();
        let teal = Rgba::rgb(0.0, 0.8, 0.8);
        let mut track = Track::new(4, 1);
        track.color = Some(teal);
        store.rebuild_tracks([track]);
        assert_eq!(store.track(4).unwrap().color, Some(teal));
    }

    #[test]
    fn test_track_membership_edits() {
        let mut store = AnnotationStore::new();
        store.rebuild_tracks([Track::new(10, 1)]);
        store.add_track_member(10, 5).unwrap();
        assert_eq!(store.track_of(5).map(|t| t.id), Some(10));
        store.remove_track_member(5);
        assert_eq!(store.track_of(5).map(|t| t.id), None);
        assert!(store.track(10).unwrap().member_ids.is_empty());
    }

    #[test]
    fn test_json_round_trip_rederives_indices() {
        let mut store = AnnotationStore::new();
        store.register_type(TypeDescriptor::new(1, "dot", Dtype::Dot));
        store.insert(dot(1, 3));
        store.insert(dot(2, 3));
        let mut track = Track::new(10, 1);
        track.member_ids = vec![1];
        store.rebuild_tracks([track]);

        let json = store.export_json().unwrap();
        let back = AnnotationStore::import_json(&json).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.on_frame(3).count(), 2);
        assert_eq!(back.track_of(1).map(|t| t.id), Some(10));
        assert!(back.type_descriptor(1).is_ok());
    }
}
