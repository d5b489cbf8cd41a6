use crate::config::TextureConfig;
use crate::context::GpuContext;
use crate::error::{GpuError, Result};

/// GPU texture wrapper for a decoded video frame.
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Create a texture from RGBA8 bytes with default configuration.
    pub fn from_rgba8(ctx: &GpuContext, data: &[u8], width: u32, height: u32) -> Result<Self> {
        Self::from_rgba8_with_config(ctx, data, width, height, TextureConfig::default())
    }

    /// Create a texture from RGBA8 bytes with custom configuration.
    pub fn from_rgba8_with_config(
        ctx: &GpuContext,
        data: &[u8],
        width: u32,
        height: u32,
        config: TextureConfig,
    ) -> Result<Self> {
        validate_size(data, width, height)?;

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Frame Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Frame Sampler"),
            address_mode_u: config.address_mode_u,
            address_mode_v: config.address_mode_v,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: config.mag_filter,
            min_filter: config.min_filter,
            ..Default::default()
        });

        let this = Self {
            texture,
            view,
            sampler,
            width,
            height,
        };
        this.write(ctx, data)?;
        Ok(this)
    }

    /// Re-upload the full texture contents in place.
    ///
    /// Used by `update_image` when a frame slot is refreshed without
    /// advancing the ring. Dimensions must match.
    pub fn write(&self, ctx: &GpuContext, data: &[u8]) -> Result<()> {
        validate_size(data, self.width, self.height)?;
        ctx.queue.write_texture(
            self.texture.as_image_copy(),
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.width),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }
}

fn validate_size(data: &[u8], width: u32, height: u32) -> Result<()> {
    let expected = (width * height * 4) as usize;
    if data.len() != expected {
        return Err(GpuError::Texture(format!(
            "Invalid data size: expected {} bytes for {}x{} RGBA8, got {}",
            expected,
            width,
            height,
            data.len()
        )));
    }
    Ok(())
}
