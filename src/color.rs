//! Deterministic per-annotation draw color resolution.
//!
//! Layered rules from the type descriptor resolve a base color/fill, then
//! interaction-state overlays (track membership, cut, selection, emphasis)
//! are applied in a fixed order so the result is reproducible for a given
//! annotation and context.

use serde::{Deserialize, Serialize};

use crate::model::{ColorMapRules, Localization, TypeDescriptor};
use vast_gpu::FillStyle;

/// Straight (non-premultiplied) RGBA color, components in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::rgb(1.0, 1.0, 1.0);
    pub const GRAY: Rgba = Rgba::rgb(0.5, 0.5, 0.5);
    pub const BLACK: Rgba = Rgba::rgb(0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Linear interpolation toward `other`.
    pub fn lerp(self, other: Rgba, t: f32) -> Rgba {
        let t = t.clamp(0.0, 1.0);
        Rgba {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    /// As a `[r, g, b, alpha]` array with an explicit alpha.
    pub fn to_array(self, alpha: f32) -> [f32; 4] {
        [self.r, self.g, self.b, alpha]
    }
}

/// Deterministic color progression for tracks without an explicit color.
///
/// Golden-angle hue stepping gives well-distributed colors that are stable
/// across wholesale track rebuilds.
pub fn color_progression(index: u64) -> Rgba {
    let hue = (index as f32 * 137.5) % 360.0;
    let (r, g, b) = hsv_to_rgb(hue, 0.7, 0.9);
    Rgba::rgb(r, g, b)
}

/// Convert HSV to RGB (h in degrees, s and v in 0-1).
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    (r + m, g + m, b + m)
}

/// Fallback stroke color when a type carries no color-map rules.
pub const DEFAULT_COLOR: Rgba = Rgba::rgb(1.0, 0.84, 0.0);
/// Default fill opacity before any rule or overlay touches it.
pub const DEFAULT_FILL_ALPHA: f32 = 0.35;

/// Resolved fill state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedFill {
    pub style: FillStyle,
    pub color: Rgba,
    pub alpha: f32,
}

/// Fully resolved draw state for one annotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawStyle {
    pub color: Rgba,
    pub alpha: f32,
    pub fill: ResolvedFill,
    pub show_handles: bool,
}

/// Track-membership overlay input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackOverlay {
    /// Not a track member.
    None,
    /// Member of a track drawn in the track's color.
    Member(Rgba),
    /// The active track's member on the current frame.
    ActiveMember,
}

/// Interaction-state inputs to resolution.
#[derive(Debug, Clone, Copy)]
pub struct StateFlags {
    pub track: TrackOverlay,
    pub is_cut: bool,
    pub is_active: bool,
    pub is_emphasized: bool,
    /// Global fill toggle; `false` zeroes fill alpha unconditionally.
    pub fill_enabled: bool,
}

impl Default for StateFlags {
    fn default() -> Self {
        Self {
            track: TrackOverlay::None,
            is_cut: false,
            is_active: false,
            is_emphasized: false,
            fill_enabled: true,
        }
    }
}

/// Resolve the draw style for `loc`, later rules overriding earlier ones.
pub fn resolve(loc: &Localization, desc: &TypeDescriptor, flags: StateFlags) -> DrawStyle {
    let rules = desc.color_map.as_ref();

    // Layer 1: type defaults.
    let mut color = rules.and_then(|r| r.default_color).unwrap_or(DEFAULT_COLOR);
    let mut alpha = 1.0;
    let mut fill_color = rules.and_then(|r| r.default_fill_color).unwrap_or(color);
    let mut fill_alpha = DEFAULT_FILL_ALPHA;

    if let Some(rules) = rules {
        apply_rules(loc, rules, &mut color, &mut fill_color, &mut alpha);
    }

    let mut show_handles = false;

    // State overlays, fixed order: track, cut, selection, emphasis.
    match flags.track {
        TrackOverlay::None => {}
        TrackOverlay::Member(track_color) => {
            color = track_color;
            fill_color = track_color;
        }
        TrackOverlay::ActiveMember => {
            color = Rgba::WHITE;
            fill_alpha = 0.0;
        }
    }

    if flags.is_cut {
        color = Rgba::GRAY;
        alpha = 0.5;
        fill_alpha = 0.0;
    }

    if flags.is_active {
        color = Rgba::WHITE;
        fill_alpha = 0.0;
        show_handles = true;
    }

    if flags.is_emphasized {
        color = color.lerp(Rgba::WHITE, 0.5);
        fill_alpha /= 2.0;
    }

    if !flags.fill_enabled {
        fill_alpha = 0.0;
    }

    DrawStyle {
        color,
        alpha,
        fill: ResolvedFill {
            style: desc.fill_style,
            color: fill_color,
            alpha: fill_alpha,
        },
        show_handles,
    }
}

/// Layers 2-4: per-version color, per-attribute-value style, alpha ranges.
fn apply_rules(
    loc: &Localization,
    rules: &ColorMapRules,
    color: &mut Rgba,
    fill_color: &mut Rgba,
    alpha: &mut f32,
) {
    if let Some(version_color) = rules.version_map.get(&loc.version) {
        *color = *version_color;
    }

    for (attr, value_map) in &rules.attr_value_map {
        let Some(value) = loc.attributes.get(attr) else {
            continue;
        };
        let key = match value.as_str() {
            Some(s) => s.to_string(),
            None => value.to_string(),
        };
        if let Some(style) = value_map.get(&key) {
            *color = style.color;
            if let Some(fill) = style.fill_color {
                *fill_color = fill;
            }
        }
    }

    for (attr, ranges) in &rules.alpha_ranges {
        let Some(value) = loc.attributes.get(attr).and_then(|v| v.as_f64()) else {
            continue;
        };
        if let Some(range) = ranges.iter().find(|r| value >= r.min && value < r.max) {
            *alpha = range.alpha;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AlphaRange, AttrValueStyle, Dtype, Geometry, TypeDescriptor};
    use std::collections::HashMap;

    fn loc_with(version: u32) -> Localization {
        Localization::new(1, 1, 0, Geometry::Dot { x: 0.5, y: 0.5 }).with_version(version)
    }

    fn desc_with(rules: ColorMapRules) -> TypeDescriptor {
        TypeDescriptor::new(1, "test", Dtype::Dot).with_color_map(rules)
    }

    #[test]
    fn test_defaults_without_rules() {
        let desc = TypeDescriptor::new(1, "bare", Dtype::Dot);
        let style = resolve(&loc_with(0), &desc, StateFlags::default());
        assert_eq!(style.color, DEFAULT_COLOR);
        assert_eq!(style.alpha, 1.0);
        assert_eq!(style.fill.alpha, DEFAULT_FILL_ALPHA);
        assert!(!style.show_handles);
    }

    #[test]
    fn test_version_overrides_default() {
        let red = Rgba::rgb(1.0, 0.0, 0.0);
        let blue = Rgba::rgb(0.0, 0.0, 1.0);
        let mut rules = ColorMapRules {
            default_color: Some(red),
            ..Default::default()
        };
        rules.version_map.insert(3, blue);
        let desc = desc_with(rules);

        assert_eq!(resolve(&loc_with(0), &desc, StateFlags::default()).color, red);
        assert_eq!(resolve(&loc_with(3), &desc, StateFlags::default()).color, blue);
    }

    #[test]
    fn test_attr_value_overrides_version() {
        let red = Rgba::rgb(1.0, 0.0, 0.0);
        let green = Rgba::rgb(0.0, 1.0, 0.0);
        let mut rules = ColorMapRules::default();
        rules.version_map.insert(1, red);
        let mut by_value = HashMap::new();
        by_value.insert(
            "female".to_string(),
            AttrValueStyle {
                color: green,
                fill_color: None,
            },
        );
        rules.attr_value_map.insert("sex".to_string(), by_value);
        let desc = desc_with(rules);

        let loc = loc_with(1).with_attribute("sex", serde_json::json!("female"));
        assert_eq!(resolve(&loc, &desc, StateFlags::default()).color, green);
    }

    #[test]
    fn test_first_matching_alpha_range_wins() {
        let mut rules = ColorMapRules::default();
        rules.alpha_ranges.insert(
            "score".to_string(),
            vec![
                AlphaRange { min: 0.0, max: 0.5, alpha: 0.2 },
                AlphaRange { min: 0.0, max: 1.0, alpha: 0.9 },
            ],
        );
        let desc = desc_with(rules);

        let loc = loc_with(0).with_attribute("score", serde_json::json!(0.3));
        assert_eq!(resolve(&loc, &desc, StateFlags::default()).alpha, 0.2);

        let loc = loc_with(0).with_attribute("score", serde_json::json!(0.7));
        assert_eq!(resolve(&loc, &desc, StateFlags::default()).alpha, 0.9);
    }

    #[test]
    fn test_cut_overlay_grays_and_halves() {
        let desc = TypeDescriptor::new(1, "t", Dtype::Dot);
        let flags = StateFlags {
            is_cut: true,
            ..Default::default()
        };
        let style = resolve(&loc_with(0), &desc, flags);
        assert_eq!(style.color, Rgba::GRAY);
        assert_eq!(style.alpha, 0.5);
        assert_eq!(style.fill.alpha, 0.0);
    }

    #[test]
    fn test_active_selection_forces_white_and_handles() {
        let desc = TypeDescriptor::new(1, "t", Dtype::Dot);
        let flags = StateFlags {
            is_active: true,
            ..Default::default()
        };
        let style = resolve(&loc_with(0), &desc, flags);
        assert_eq!(style.color, Rgba::WHITE);
        assert_eq!(style.fill.alpha, 0.0);
        assert!(style.show_handles);
    }

    #[test]
    fn test_track_member_takes_track_color_but_active_member_is_white() {
        let desc = TypeDescriptor::new(1, "t", Dtype::Dot);
        let teal = Rgba::rgb(0.0, 0.8, 0.8);

        let member = resolve(
            &loc_with(0),
            &desc,
            StateFlags {
                track: TrackOverlay::Member(teal),
                ..Default::default()
            },
        );
        assert_eq!(member.color, teal);

        let active = resolve(
            &loc_with(0),
            &desc,
            StateFlags {
                track: TrackOverlay::ActiveMember,
                ..Default::default()
            },
        );
        assert_eq!(active.color, Rgba::WHITE);
        assert_eq!(active.fill.alpha, 0.0);
    }

    #[test]
    fn test_emphasis_blends_toward_white_and_halves_fill() {
        let red = Rgba::rgb(1.0, 0.0, 0.0);
        let desc = desc_with(ColorMapRules {
            default_color: Some(red),
            ..Default::default()
        });
        let style = resolve(
            &loc_with(0),
            &desc,
            StateFlags {
                is_emphasized: true,
                ..Default::default()
            },
        );
        assert!((style.color.g - 0.5).abs() < 1e-6);
        assert!((style.fill.alpha - DEFAULT_FILL_ALPHA / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_fill_disabled_zeroes_fill_last() {
        let desc = TypeDescriptor::new(1, "t", Dtype::Dot);
        let style = resolve(
            &loc_with(0),
            &desc,
            StateFlags {
                fill_enabled: false,
                ..Default::default()
            },
        );
        assert_eq!(style.fill.alpha, 0.0);
    }

    #[test]
    fn test_color_progression_is_stable_and_distinct() {
        assert_eq!(color_progression(5), color_progression(5));
        assert_ne!(color_progression(1), color_progression(2));
    }
}
