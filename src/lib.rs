//! VAST - Video Annotation Surface Tool
//!
//! Interactive annotation engine for boxes, lines, dots, polygons, and
//! multi-frame tracks drawn over video frames, paired with the GPU-batched
//! overlay renderer in `vast_gpu`.

pub mod animation;
pub mod clipboard;
pub mod color;
pub mod constants;
pub mod coords;
pub mod drag;
pub mod error;
pub mod events;
pub mod interaction;
pub mod model;
pub mod render;
pub mod services;
pub mod store;
pub mod surface;

pub use error::EngineError;
pub use surface::AnnotationSurface;
