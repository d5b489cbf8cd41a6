//! Interaction thresholds and margins.

/// Hit-testing distances, in image pixels.
pub mod hit {
    /// Pointer-to-shape acceptance threshold for dots and lines.
    pub const THRESHOLD_PX: f32 = 10.0;
    /// Margin by which a box is inflated before the interior gate.
    pub const BOX_MARGIN_PX: f32 = 10.0;
    /// Resize handle pick margin for corners, edges, and vertices.
    pub const HANDLE_MARGIN_PX: f32 = 15.0;
}

/// Drag recognition.
pub mod drag {
    /// A drag in SELECT only promotes to MOVE past this duration...
    pub const DEBOUNCE_MS: f32 = 250.0;
    /// ...or past this length in screen pixels.
    pub const DEBOUNCE_PX: f32 = 100.0;
}

/// Keyboard nudge behavior.
pub mod nudge {
    /// Coalescing window before a nudge is persisted.
    pub const COALESCE_MS: f32 = 300.0;
    /// Step multiplier while the modifier key is held.
    pub const FAST_MULTIPLIER: f32 = 5.0;
}

/// Highlight animation.
pub mod animation {
    /// Fixed step interval (30 fps).
    pub const STEP_MS: f32 = 1000.0 / 30.0;
}

/// Polygon drawing.
pub mod poly {
    /// Clicking within this distance of the first vertex closes the polygon.
    pub const CLOSE_MARGIN_PX: f32 = 15.0;
}

/// Overlay rendering.
pub mod draw {
    /// Radius of resize handle rings, in viewport pixels.
    pub const HANDLE_RADIUS_PX: f32 = 6.0;
    /// Inner radius of resize handle rings.
    pub const HANDLE_INNER_RADIUS_PX: f32 = 3.0;
    /// Radius used to draw dot annotations.
    pub const DOT_RADIUS_PX: f32 = 4.0;
}
