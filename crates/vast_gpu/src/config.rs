//! Configuration structs for GPU settings.
//!
//! Sensible defaults for an interactive video annotation surface: VSync on,
//! linear sampling, dark clear color.

/// Configuration for GPU context initialization.
#[derive(Debug, Clone)]
pub struct GpuConfig {
    /// Power preference for adapter selection.
    pub power_preference: wgpu::PowerPreference,
    /// Present mode (VSync behavior).
    pub present_mode: wgpu::PresentMode,
    /// Maximum frames in flight.
    pub max_frame_latency: u32,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::default(),
            present_mode: wgpu::PresentMode::Fifo,
            max_frame_latency: 2,
        }
    }
}

impl GpuConfig {
    /// Create config optimized for low interaction latency.
    pub fn low_latency() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            present_mode: wgpu::PresentMode::Mailbox,
            max_frame_latency: 1,
        }
    }

    /// Set power preference.
    pub fn with_power_preference(mut self, pref: wgpu::PowerPreference) -> Self {
        self.power_preference = pref;
        self
    }

    /// Set present mode.
    pub fn with_present_mode(mut self, mode: wgpu::PresentMode) -> Self {
        self.present_mode = mode;
        self
    }
}

/// Configuration for frame texture creation and sampling.
#[derive(Debug, Clone)]
pub struct TextureConfig {
    /// Magnification filter mode.
    pub mag_filter: wgpu::FilterMode,
    /// Minification filter mode.
    pub min_filter: wgpu::FilterMode,
    /// Address mode for U coordinate.
    pub address_mode_u: wgpu::AddressMode,
    /// Address mode for V coordinate.
    pub address_mode_v: wgpu::AddressMode,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
        }
    }
}

impl TextureConfig {
    /// Create config for pixel-perfect rendering (no interpolation).
    pub fn nearest() -> Self {
        Self {
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Self::default()
        }
    }
}

/// Clear color for render passes.
#[derive(Debug, Clone, Copy)]
pub struct ClearColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl ClearColor {
    /// Dark gray (default behind letterboxed frames).
    pub const DARK_GRAY: ClearColor = ClearColor {
        r: 0.1,
        g: 0.1,
        b: 0.1,
        a: 1.0,
    };
    /// Black.
    pub const BLACK: ClearColor = ClearColor {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };

    /// Create a custom clear color.
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }
}

impl From<ClearColor> for wgpu::Color {
    fn from(c: ClearColor) -> Self {
        wgpu::Color {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}
