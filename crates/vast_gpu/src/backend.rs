//! Backend composition: context + pipeline + frame ring + immediate batch.
//!
//! This is the boundary the interaction engine talks to. The engine never
//! touches GPU handles; it submits geometry through the batch methods and the
//! registered push callback, and the backend owns every GPU resource.

use std::sync::Arc;
use winit::window::Window;

use crate::batch::{DrawBatch, FillStyle};
use crate::config::{ClearColor, GpuConfig};
use crate::context::GpuContext;
use crate::error::{GpuError, Result};
use crate::pipeline::OverlayPipeline;
use crate::ring::{FrameTextureRing, PushCallback, DEFAULT_RING_DEPTH};
use crate::texture::Texture;

/// Viewport-pixel rectangle as `[[x0, y0], [x1, y1]]`.
pub type Rect = [[f32; 2]; 2];

const FULL_RECT: Rect = [[0.0, 0.0], [1.0, 1.0]];

/// GPU draw backend owning all rendering resources.
pub struct DrawBackend {
    ctx: GpuContext,
    pipeline: OverlayPipeline,
    ring: FrameTextureRing,
    /// Immediate-mode batch filled between `begin_draw` and `dump_draw`.
    overlay: DrawBatch,
    /// Fallback texture bound when no frame is resident.
    placeholder: Texture,
    /// Texture-space region of the current frame mapped to the viewport (the
    /// ROI re-projection computed by the engine).
    src_rect: Rect,
    /// Viewport-pixel destination of the frame quad.
    dest_rect: Rect,
    clear_color: ClearColor,
    lost: bool,
}

impl DrawBackend {
    /// Initialize the backend for a window.
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        Self::with_config(window, GpuConfig::default(), DEFAULT_RING_DEPTH).await
    }

    /// Initialize with explicit GPU config and ring depth.
    pub async fn with_config(window: Arc<Window>, config: GpuConfig, ring_depth: usize) -> Result<Self> {
        let ctx = GpuContext::with_config(window, config).await?;
        let pipeline = OverlayPipeline::new(&ctx);
        let placeholder = Texture::from_rgba8(&ctx, &[0, 0, 0, 255], 1, 1)?;
        let (w, h) = (ctx.width() as f32, ctx.height() as f32);
        Ok(Self {
            ctx,
            pipeline,
            ring: FrameTextureRing::new(ring_depth),
            overlay: DrawBatch::new(),
            placeholder,
            src_rect: FULL_RECT,
            dest_rect: [[0.0, 0.0], [w, h]],
            clear_color: ClearColor::DARK_GRAY,
            lost: false,
        })
    }

    /// Blocking initialization for native callers.
    pub fn new_blocking(window: Arc<Window>) -> Result<Self> {
        pollster::block_on(Self::new(window))
    }

    /// Whether the GPU context was lost and the backend needs `rebuild`.
    pub fn is_lost(&self) -> bool {
        self.lost
    }

    /// Full re-initialization after context loss.
    ///
    /// Interaction state lives in the engine and survives; only GPU resources
    /// are rebuilt. Resident frames are evicted and must be pushed again,
    /// after which the caller forces a redraw.
    pub fn rebuild(&mut self, window: Arc<Window>) -> Result<()> {
        log::warn!("GPU context lost; rebuilding backend");
        let config = self.ctx.config.clone();
        self.ctx = pollster::block_on(GpuContext::with_config(window, config))?;
        self.pipeline = OverlayPipeline::new(&self.ctx);
        self.placeholder = Texture::from_rgba8(&self.ctx, &[0, 0, 0, 255], 1, 1)?;
        self.ring.evict_all();
        self.lost = false;
        Ok(())
    }

    /// Handle window resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
        self.pipeline.resize(&self.ctx);
    }

    pub fn width(&self) -> u32 {
        self.ctx.width()
    }

    pub fn height(&self) -> u32 {
        self.ctx.height()
    }

    /// Register the per-frame overlay callback (owned by the engine).
    pub fn set_push_callback(&mut self, cb: PushCallback) {
        self.ring.set_push_callback(cb);
    }

    /// Back-pressure: writable ring slots.
    pub fn available_load(&self) -> usize {
        self.ring.available_load()
    }

    /// Back-pressure: loaded, undisplayed frames.
    pub fn available_display(&self) -> usize {
        self.ring.available_display()
    }

    /// Load a decoded frame into the ring (decode-ahead path).
    ///
    /// `src` selects the texture region mapped to the viewport (ROI), `dest`
    /// the viewport-pixel rectangle the frame quad covers.
    pub fn push_image(
        &mut self,
        frame: u32,
        rgba: &[u8],
        width: u32,
        height: u32,
        src: Rect,
        dest: Rect,
    ) -> Result<()> {
        self.src_rect = src;
        self.dest_rect = dest;
        self.ring.load(&self.ctx, frame, rgba, width, height)
    }

    /// Refresh pixels of a resident frame without advancing the ring.
    pub fn update_image(&mut self, frame: u32, rgba: &[u8], src: Rect, dest: Rect) -> Result<()> {
        self.src_rect = src;
        self.dest_rect = dest;
        self.ring.update(&self.ctx, frame, rgba)
    }

    /// Discard up to `n` stale frames.
    pub fn trim(&mut self, n: usize) {
        self.ring.trim(n);
    }

    /// Clear the immediate-mode overlay batch.
    pub fn begin_draw(&mut self) {
        self.overlay.begin();
    }

    /// Immediate overlay: thick line in viewport pixels.
    pub fn draw_line(&mut self, start: [f32; 2], end: [f32; 2], color: [f32; 4], width: f32) {
        self.overlay.draw_line(start, end, color, width);
    }

    /// Immediate overlay: polygon outline.
    pub fn draw_polygon(&mut self, points: &[[f32; 2]], color: [f32; 4], width: f32) {
        self.overlay.draw_polygon(points, color, width);
    }

    /// Immediate overlay: rectangle fill (axis-aligned only).
    pub fn fill_polygon(&mut self, points: &[[f32; 2]], uv_rect: Rect, color: [f32; 4], style: FillStyle) {
        self.overlay.fill_polygon(points, uv_rect, color, style);
    }

    /// Immediate overlay: disc or annulus.
    pub fn draw_circle(&mut self, center: [f32; 2], radius: f32, color: [f32; 4], inner_radius: f32) {
        self.overlay.draw_circle(center, radius, color, inner_radius);
    }

    /// Flush the immediate overlay now, re-presenting the current frame.
    pub fn dump_draw(&mut self) -> Result<()> {
        self.disp_image(true, false)
    }

    /// Ask the engine to regenerate the display slot's overlay (annotation
    /// state changed while paused).
    pub fn refresh_overlay(&mut self) {
        self.ring.refresh_display();
    }

    /// Present the current display frame composited with its overlay.
    ///
    /// `hold` keeps the display cursor in place (paused playback);
    /// `mute_annotations` skips the overlay batches and shows the bare frame.
    pub fn disp_image(&mut self, hold: bool, mute_annotations: bool) -> Result<()> {
        if self.lost {
            return Err(GpuError::ContextLost);
        }

        let surface_texture = match self.ctx.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Outdated) => {
                self.ctx.reconfigure();
                self.ctx.surface.get_current_texture()?
            }
            Err(wgpu::SurfaceError::Lost) => {
                self.lost = true;
                return Err(GpuError::ContextLost);
            }
            Err(e) => return Err(e.into()),
        };
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut composed = DrawBatch::new();
        let frame_texture = match self.ring.display() {
            Some((_, texture)) => {
                composed.frame_quad(self.dest_rect, self.src_rect);
                texture
            }
            None => &self.placeholder,
        };
        if !mute_annotations {
            if let Some(overlay) = self.ring.display_overlay() {
                composed.append(overlay);
            }
            composed.append(&self.overlay);
        }

        let bind_group = self.pipeline.create_texture_bind_group(&self.ctx, frame_texture);
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Overlay Encoder"),
            });
        self.pipeline.render(
            &self.ctx,
            &mut encoder,
            &surface_view,
            &composed,
            &bind_group,
            self.clear_color,
        );
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();

        if !hold {
            self.ring.done_display();
        }
        Ok(())
    }
}
