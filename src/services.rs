//! Consumed host interfaces: frame delivery and persistence.
//!
//! Both are traits injected into the surface. Calls are fire-and-forget from
//! the engine's perspective; completions re-enter the dispatcher as input
//! events rather than blocking.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AttrValue, Geometry, Localization, LocalizationId, TypeDescriptor, TypeId};

/// What kind of record a persistence call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistKind {
    Localization,
    Track,
}

/// Request object for creating a new annotation, built from a completed
/// drag or polygon finalize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub type_id: TypeId,
    pub frame: u32,
    pub version: u32,
    #[serde(flatten)]
    pub geometry: Geometry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<LocalizationId>,
}

/// Partial update for an existing record; `None` fields are untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LocalizationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<HashMap<String, AttrValue>>,
}

impl LocalizationPatch {
    pub fn geometry(geometry: Geometry) -> Self {
        Self {
            geometry: Some(geometry),
            ..Default::default()
        }
    }

    pub fn frame(frame: u32) -> Self {
        Self {
            frame: Some(frame),
            ..Default::default()
        }
    }
}

/// Persistence call failure, delivered to the configured policy.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// What to do when a persistence call fails.
///
/// The engine never retries on its own; `Surface` forwards the failure to
/// the host as an event so it can toast or retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistFailurePolicy {
    #[default]
    LogAndDrop,
    Surface,
}

/// Frame delivery, consumed. Seek completion re-enters the engine as
/// `InputEvent::SeekComplete` carrying the generation passed here.
pub trait FrameSource {
    fn current_frame(&self) -> u32;
    /// Request an asynchronous seek.
    fn goto_frame(&mut self, frame: u32, generation: u64);
}

/// Annotation persistence, consumed.
pub trait Persistence {
    fn create(
        &mut self,
        desc: &TypeDescriptor,
        request: &CreateRequest,
    ) -> Result<(), PersistError>;

    fn patch(
        &mut self,
        kind: PersistKind,
        id: u64,
        patch: &LocalizationPatch,
        desc: &TypeDescriptor,
    ) -> Result<(), PersistError>;

    fn delete(
        &mut self,
        kind: PersistKind,
        id: u64,
        desc: &TypeDescriptor,
    ) -> Result<(), PersistError>;

    /// Clone an annotation into another version, for version-mismatch edits.
    fn clone_to_version(
        &mut self,
        loc: &Localization,
        dest_version: u32,
    ) -> Result<LocalizationId, PersistError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_flattens_geometry() {
        let request = CreateRequest {
            type_id: 1,
            frame: 5,
            version: 0,
            geometry: Geometry::Box {
                x: 0.1,
                y: 0.1,
                width: 0.4,
                height: 0.3,
            },
            parent_id: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"dtype\":\"box\""));
        assert!(json.contains("\"width\":0.4"));
        let back: CreateRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn test_patch_omits_untouched_fields() {
        let patch = LocalizationPatch::frame(9);
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, "{\"frame\":9}");
    }
}
