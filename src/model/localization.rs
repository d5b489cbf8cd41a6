//! Single-frame annotation shapes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for a localization.
pub type LocalizationId = u64;

/// Free-form attribute value attached to a localization.
pub type AttrValue = serde_json::Value;

/// Shape geometry, always normalized relative to the full image ([0, 1]).
///
/// Pixel coordinates exist only transiently during interaction; every draw or
/// hit-test re-derives them from the current ROI and viewport, which makes
/// zoom and pan a pure re-projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dtype", rename_all = "snake_case")]
pub enum Geometry {
    /// Top-left corner plus size.
    Box { x: f32, y: f32, width: f32, height: f32 },
    /// Origin plus delta.
    Line { x: f32, y: f32, u: f32, v: f32 },
    /// Single point.
    Dot { x: f32, y: f32 },
    /// Ordered vertex list, closed by repeating point 0 when finalized.
    Poly { points: Vec<[f32; 2]> },
}

impl Geometry {
    /// The shape kind of this geometry.
    pub fn dtype(&self) -> super::Dtype {
        match self {
            Geometry::Box { .. } => super::Dtype::Box,
            Geometry::Line { .. } => super::Dtype::Line,
            Geometry::Dot { .. } => super::Dtype::Dot,
            Geometry::Poly { .. } => super::Dtype::Poly,
        }
    }

    /// Axis-aligned bounds as `(min, max)`.
    pub fn bounds(&self) -> ([f32; 2], [f32; 2]) {
        match self {
            Geometry::Box { x, y, width, height } => ([*x, *y], [x + width, y + height]),
            Geometry::Line { x, y, u, v } => {
                let x2 = x + u;
                let y2 = y + v;
                ([x.min(x2), y.min(y2)], [x.max(x2), y.max(y2)])
            }
            Geometry::Dot { x, y } => ([*x, *y], [*x, *y]),
            Geometry::Poly { points } => {
                let mut min = [f32::INFINITY, f32::INFINITY];
                let mut max = [f32::NEG_INFINITY, f32::NEG_INFINITY];
                for p in points {
                    min[0] = min[0].min(p[0]);
                    min[1] = min[1].min(p[1]);
                    max[0] = max[0].max(p[0]);
                    max[1] = max[1].max(p[1]);
                }
                (min, max)
            }
        }
    }

    /// Resize vertices for this geometry.
    ///
    /// Boxes yield corners in NW, NE, SE, SW order; lines yield both
    /// endpoints; dots their point; polygons their vertex list.
    pub fn vertices(&self) -> Vec<[f32; 2]> {
        match self {
            Geometry::Box { x, y, width, height } => vec![
                [*x, *y],
                [x + width, *y],
                [x + width, y + height],
                [*x, y + height],
            ],
            Geometry::Line { x, y, u, v } => vec![[*x, *y], [x + u, y + v]],
            Geometry::Dot { x, y } => vec![[*x, *y]],
            Geometry::Poly { points } => points.clone(),
        }
    }

    /// Rebuild the same shape kind from moved vertices.
    ///
    /// Boxes re-derive top-left and size from the vertex extremes, so a
    /// resize that crosses over an edge stays well-formed.
    pub fn with_vertices(&self, verts: &[[f32; 2]]) -> Geometry {
        match self {
            Geometry::Box { .. } => {
                let min_x = verts.iter().map(|p| p[0]).fold(f32::INFINITY, f32::min);
                let min_y = verts.iter().map(|p| p[1]).fold(f32::INFINITY, f32::min);
                let max_x = verts.iter().map(|p| p[0]).fold(f32::NEG_INFINITY, f32::max);
                let max_y = verts.iter().map(|p| p[1]).fold(f32::NEG_INFINITY, f32::max);
                Geometry::Box {
                    x: min_x,
                    y: min_y,
                    width: max_x - min_x,
                    height: max_y - min_y,
                }
            }
            Geometry::Line { .. } => Geometry::Line {
                x: verts[0][0],
                y: verts[0][1],
                u: verts[1][0] - verts[0][0],
                v: verts[1][1] - verts[0][1],
            },
            Geometry::Dot { .. } => Geometry::Dot {
                x: verts[0][0],
                y: verts[0][1],
            },
            Geometry::Poly { .. } => Geometry::Poly {
                points: verts.to_vec(),
            },
        }
    }

    /// Translate the whole shape.
    pub fn translated(&self, dx: f32, dy: f32) -> Geometry {
        match self {
            Geometry::Box { x, y, width, height } => Geometry::Box {
                x: x + dx,
                y: y + dy,
                width: *width,
                height: *height,
            },
            Geometry::Line { x, y, u, v } => Geometry::Line {
                x: x + dx,
                y: y + dy,
                u: *u,
                v: *v,
            },
            Geometry::Dot { x, y } => Geometry::Dot { x: x + dx, y: y + dy },
            Geometry::Poly { points } => Geometry::Poly {
                points: points.iter().map(|p| [p[0] + dx, p[1] + dy]).collect(),
            },
        }
    }
}

/// A single annotated shape on one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Localization {
    pub id: LocalizationId,
    pub type_id: super::TypeId,
    pub frame: u32,
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<LocalizationId>,
    #[serde(default)]
    pub attributes: HashMap<String, AttrValue>,
    #[serde(flatten)]
    pub geometry: Geometry,
}

impl Localization {
    pub fn new(id: LocalizationId, type_id: super::TypeId, frame: u32, geometry: Geometry) -> Self {
        Self {
            id,
            type_id,
            frame,
            version: 0,
            parent_id: None,
            attributes: HashMap::new(),
            geometry,
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: AttrValue) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_vertices_clockwise_from_nw() {
        let geo = Geometry::Box {
            x: 0.1,
            y: 0.2,
            width: 0.4,
            height: 0.3,
        };
        let v = geo.vertices();
        assert_eq!(v[0], [0.1, 0.2]);
        assert_eq!(v[1], [0.5, 0.2]);
        assert_eq!(v[2], [0.5, 0.5]);
        assert_eq!(v[3], [0.1, 0.5]);
    }

    #[test]
    fn test_box_rebuilds_from_crossed_vertices() {
        let geo = Geometry::Box {
            x: 0.0,
            y: 0.0,
            width: 0.2,
            height: 0.2,
        };
        // Drag the NW corner past the SE corner.
        let rebuilt = geo.with_vertices(&[[0.3, 0.3], [0.2, 0.3], [0.2, 0.2], [0.3, 0.2]]);
        match rebuilt {
            Geometry::Box { x, y, width, height } => {
                assert!((x - 0.2).abs() < 1e-6);
                assert!((y - 0.2).abs() < 1e-6);
                assert!((width - 0.1).abs() < 1e-6);
                assert!((height - 0.1).abs() < 1e-6);
            }
            other => panic!("expected box, got {other:?}"),
        }
    }

    #[test]
    fn test_line_bounds_handle_negative_delta() {
        let geo = Geometry::Line {
            x: 0.5,
            y: 0.5,
            u: -0.2,
            v: -0.1,
        };
        let (min, max) = geo.bounds();
        assert_eq!(min, [0.3, 0.4]);
        assert_eq!(max, [0.5, 0.5]);
    }

    #[test]
    fn test_serde_round_trip_tags_dtype() {
        let loc = Localization::new(
            7,
            1,
            12,
            Geometry::Line {
                x: 0.1,
                y: 0.2,
                u: 0.3,
                v: 0.4,
            },
        );
        let json = serde_json::to_string(&loc).unwrap();
        assert!(json.contains("\"dtype\":\"line\""));
        let back: Localization = serde_json::from_str(&json).unwrap();
        assert_eq!(back, loc);
    }
}
