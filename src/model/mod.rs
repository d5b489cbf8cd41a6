//! Annotation data model: localizations, tracks, and type descriptors.

mod localization;
mod track;
mod type_descriptor;

pub use localization::{AttrValue, Geometry, Localization, LocalizationId};
pub use track::{Track, TrackId};
pub use type_descriptor::{AlphaRange, AttrValueStyle, ColorMapRules, Dtype, TypeDescriptor, TypeId};
