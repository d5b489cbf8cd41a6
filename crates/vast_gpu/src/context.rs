use std::sync::Arc;
use winit::window::Window;

use crate::config::GpuConfig;
use crate::error::Result;

/// Main GPU context managing wgpu device, queue, and surface.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface<'static>,
    pub surface_config: wgpu::SurfaceConfiguration,
    pub config: GpuConfig,
}

impl GpuContext {
    /// Initialize GPU context for a window with default configuration.
    ///
    /// This is async; on native use `pollster::block_on()` to call it.
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        Self::with_config(window, GpuConfig::default()).await
    }

    /// Initialize GPU context for a window with custom configuration.
    pub async fn with_config(window: Arc<Window>, config: GpuConfig) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: config.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        let info = adapter.get_info();
        log::debug!("GPU adapter: {} ({:?})", info.name, info.backend);

        let limits = wgpu::Limits::default().using_resolution(adapter.limits());

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Annotation Device"),
                required_features: wgpu::Features::empty(),
                required_limits: limits,
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let present_mode = if surface_caps.present_modes.contains(&config.present_mode) {
            config.present_mode
        } else {
            wgpu::PresentMode::Fifo // Always supported
        };

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: config.max_frame_latency,
        };

        surface.configure(&device, &surface_config);

        Ok(Self {
            device,
            queue,
            surface,
            surface_config,
            config,
        })
    }

    /// Handle window resize.
    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        self.surface_config.width = new_width.max(1);
        self.surface_config.height = new_height.max(1);
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Reconfigure the surface with the current settings.
    ///
    /// Used after a `Lost`/`Outdated` surface error.
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Get current surface width.
    pub fn width(&self) -> u32 {
        self.surface_config.width
    }

    /// Get current surface height.
    pub fn height(&self) -> u32 {
        self.surface_config.height
    }
}
