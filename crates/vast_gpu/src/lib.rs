//! GPU draw backend for the annotation surface.
//!
//! A single-shader rasterizer that batches thick lines, polygons, and circles
//! into one draw call per frame, composited over the current video frame with
//! multisampled anti-aliasing, plus a bounded ring of frame textures with a
//! load/display handshake.

pub mod backend;
pub mod batch;
pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod ring;
pub mod texture;

pub use backend::{DrawBackend, Rect};
pub use batch::{DrawBatch, FillStyle, FilterEffect, OverlayVertex, UV_NONE};
pub use config::{ClearColor, GpuConfig, TextureConfig};
pub use context::GpuContext;
pub use error::{GpuError, Result};
pub use pipeline::{OverlayPipeline, MSAA_SAMPLE_COUNT};
pub use ring::{FrameTextureRing, PushCallback, RingCursor, DEFAULT_RING_DEPTH};
pub use texture::Texture;
