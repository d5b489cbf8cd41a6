//! Pure coordinate-space conversions.
//!
//! Four spaces: screen pixels (input events), viewport pixels (draw surface),
//! ROI-relative image pixels, and normalized [0, 1] image coordinates.
//! Geometry is stored normalized; every draw or hit-test call re-derives
//! pixels from the current ROI and viewport, so zoom and pan never mutate
//! annotations.

use serde::{Deserialize, Serialize};

/// Draw surface size in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSize {
    pub width: f32,
    pub height: f32,
}

impl ViewportSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Region of interest: the normalized image-space rectangle currently mapped
/// to the viewport (zoom/pan state).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Roi {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Roi {
    /// The full image.
    pub const FULL: Roi = Roi {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }
}

impl Default for Roi {
    fn default() -> Self {
        Self::FULL
    }
}

/// Screen pixels to viewport pixels, scaled by the display/viewport ratio.
pub fn screen_to_viewport(point: [f32; 2], display: [f32; 2], viewport: ViewportSize) -> [f32; 2] {
    [
        point[0] * viewport.width / display[0],
        point[1] * viewport.height / display[1],
    ]
}

/// Viewport pixels to normalized image coordinates under the current ROI.
///
/// Divides by `(viewport size / ROI size)` then adds the ROI origin.
pub fn to_relative(point: [f32; 2], viewport: ViewportSize, roi: Roi) -> [f32; 2] {
    [
        point[0] * roi.width / viewport.width + roi.x,
        point[1] * roi.height / viewport.height + roi.y,
    ]
}

/// Inverse of [`to_relative`].
pub fn to_pixel(point: [f32; 2], viewport: ViewportSize, roi: Roi) -> [f32; 2] {
    [
        (point[0] - roi.x) * viewport.width / roi.width,
        (point[1] - roi.y) * viewport.height / roi.height,
    ]
}

/// Size conversion to normalized coordinates: scaled, never shifted by the
/// ROI origin (used for box width/height).
pub fn size_to_relative(size: [f32; 2], viewport: ViewportSize, roi: Roi) -> [f32; 2] {
    [
        size[0] * roi.width / viewport.width,
        size[1] * roi.height / viewport.height,
    ]
}

/// Inverse of [`size_to_relative`].
pub fn size_to_pixel(size: [f32; 2], viewport: ViewportSize, roi: Roi) -> [f32; 2] {
    [
        size[0] * viewport.width / roi.width,
        size[1] * viewport.height / roi.height,
    ]
}

/// A pixel distance expressed in normalized x-axis units under the current
/// view, for comparing against normalized geometry.
pub fn threshold_to_relative(threshold_px: f32, viewport: ViewportSize, roi: Roi) -> f32 {
    threshold_px * roi.width / viewport.width
}

/// Box conversion: origin is shifted by the ROI, size only scaled.
pub fn box_to_relative(rect_px: [f32; 4], viewport: ViewportSize, roi: Roi) -> [f32; 4] {
    let origin = to_relative([rect_px[0], rect_px[1]], viewport, roi);
    let size = size_to_relative([rect_px[2], rect_px[3]], viewport, roi);
    [origin[0], origin[1], size[0], size[1]]
}

/// Line conversion: both endpoints shifted independently per axis.
pub fn line_to_relative(
    start_px: [f32; 2],
    end_px: [f32; 2],
    viewport: ViewportSize,
    roi: Roi,
) -> [f32; 4] {
    let start = to_relative(start_px, viewport, roi);
    let end = to_relative(end_px, viewport, roi);
    [start[0], start[1], end[0] - start[0], end[1] - start[1]]
}

/// Map a viewport-pixel rectangle to a new ROI within the current one
/// (ZOOM_ROI completion).
pub fn roi_from_pixel_rect(rect_px: [f32; 4], viewport: ViewportSize, roi: Roi) -> Roi {
    let [x, y, w, h] = box_to_relative(rect_px, viewport, roi);
    Roi::new(x, y, w, h)
}
