//! Annotation type descriptors and their layered color-map rules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::color::Rgba;
use vast_gpu::FillStyle;

/// Unique identifier for an annotation type.
pub type TypeId = u32;

/// Shape kind of an annotation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dtype {
    Box,
    Line,
    Dot,
    Poly,
}

/// Per-attribute-value color/fill override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttrValueStyle {
    pub color: Rgba,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<Rgba>,
}

/// Numeric alpha lookup: the first range containing the attribute value wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaRange {
    pub min: f64,
    pub max: f64,
    pub alpha: f32,
}

/// Layered color overrides for one annotation type.
///
/// Resolution order (later wins): default color/fill, per-version color,
/// per-attribute-value map, per-attribute alpha-range table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColorMapRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_color: Option<Rgba>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_fill_color: Option<Rgba>,
    /// Version id to color.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub version_map: HashMap<u32, Rgba>,
    /// Attribute name to value-string to style.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attr_value_map: HashMap<String, HashMap<String, AttrValueStyle>>,
    /// Attribute name to alpha ranges.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub alpha_ranges: HashMap<String, Vec<AlphaRange>>,
}

/// Descriptor for one annotation type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub id: TypeId,
    pub name: String,
    pub dtype: Dtype,
    /// Stroke width in viewport pixels.
    pub line_width: f32,
    /// Fill style used when a fill color resolves.
    #[serde(default = "default_fill_style", with = "fill_style_serde")]
    pub fill_style: FillStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_map: Option<ColorMapRules>,
}

fn default_fill_style() -> FillStyle {
    FillStyle::Solid
}

impl TypeDescriptor {
    pub fn new(id: TypeId, name: impl Into<String>, dtype: Dtype) -> Self {
        Self {
            id,
            name: name.into(),
            dtype,
            line_width: 2.0,
            fill_style: FillStyle::Solid,
            color_map: None,
        }
    }

    pub fn with_line_width(mut self, width: f32) -> Self {
        self.line_width = width;
        self
    }

    pub fn with_color_map(mut self, rules: ColorMapRules) -> Self {
        self.color_map = Some(rules);
        self
    }
}

/// Serde bridge for `vast_gpu::FillStyle`, which lives at the GPU boundary
/// and carries no serde derives of its own.
mod fill_style_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use vast_gpu::FillStyle;

    pub fn serialize<S: Serializer>(style: &FillStyle, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(match style {
            FillStyle::Blur => "blur",
            FillStyle::Gray => "gray",
            FillStyle::Solid => "solid",
        })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<FillStyle, D::Error> {
        let s = String::deserialize(de)?;
        match s.as_str() {
            "blur" => Ok(FillStyle::Blur),
            "gray" => Ok(FillStyle::Gray),
            "solid" => Ok(FillStyle::Solid),
            other => Err(serde::de::Error::custom(format!("unknown fill style: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_descriptor_serde_round_trip() {
        let desc = TypeDescriptor::new(3, "fish", Dtype::Box).with_line_width(3.0);
        let json = serde_json::to_string(&desc).unwrap();
        let back: TypeDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, desc);
    }

    #[test]
    fn test_color_map_defaults_to_empty_layers() {
        let rules = ColorMapRules::default();
        assert!(rules.default_color.is_none());
        assert!(rules.version_map.is_empty());
        assert!(rules.alpha_ranges.is_empty());
    }
}
