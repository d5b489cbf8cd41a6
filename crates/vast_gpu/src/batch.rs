//! CPU-side vertex batch for the overlay rasterizer.
//!
//! All vector primitives (thick lines, polygons, circles, rectangle fills) and
//! the frame quad itself accumulate here as quads and are flushed in a single
//! draw call. Lines become quads by offsetting both endpoints perpendicular to
//! the line direction by half the stroke width; circles are a quad with a
//! per-fragment radial filter; rectangle fill is one maximal-width centerline
//! stroke with a texture-space filter.

use bytemuck::{Pod, Zeroable};

/// Sentinel texture coordinate: the fragment uses the vertex color instead of
/// sampling the frame texture.
pub const UV_NONE: f32 = -1.0;

/// One overlay vertex: position in viewport pixels, straight RGBA color, a
/// texture coordinate (negative sentinel = untextured), and a filter-effect
/// descriptor lowered from [`FilterEffect`].
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct OverlayVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
    pub uv: [f32; 2],
    pub effect: [f32; 4],
}

impl OverlayVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 4] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4, 2 => Float32x2, 3 => Float32x4];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<OverlayVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Per-fragment filter effect, lowered to raw floats only at the GPU boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterEffect {
    /// No filtering: textured where uv is valid, vertex color otherwise.
    None,
    /// Block-average the sampled frame region (approximates blur).
    Pixelate { block_size: f32 },
    /// Grayscale the sampled frame, remapping luma into `[min, max]`.
    Grayscale { min: f32, max: f32 },
    /// Ignore the texture and output the vertex color.
    Solid,
    /// Radial mask over quad-local coordinates: keep fragments with
    /// `inner_radius <= r <= 1`. `inner_radius` of zero gives a disc, nonzero
    /// an annulus (ring handles).
    Disc { inner_radius: f32 },
}

impl FilterEffect {
    /// Lower to the 4-float descriptor the shader consumes:
    /// `[mode, p0, p1, p2]`.
    pub fn to_raw(self) -> [f32; 4] {
        match self {
            FilterEffect::None => [0.0, 0.0, 0.0, 0.0],
            FilterEffect::Pixelate { block_size } => [1.0, block_size, 0.0, 0.0],
            FilterEffect::Grayscale { min, max } => [2.0, min, max, 0.0],
            FilterEffect::Solid => [3.0, 0.0, 0.0, 0.0],
            FilterEffect::Disc { inner_radius } => [4.0, inner_radius, 0.0, 0.0],
        }
    }
}

/// Rectangle fill style, translated to a [`FilterEffect`] over the frame
/// texture region behind the rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStyle {
    /// Blur-like fill sampling the frame behind the shape.
    Blur,
    /// Grayscale fill of the frame behind the shape.
    Gray,
    /// Solid color fill.
    Solid,
}

impl FillStyle {
    fn to_effect(self) -> FilterEffect {
        match self {
            FillStyle::Blur => FilterEffect::Pixelate { block_size: 12.0 },
            FillStyle::Gray => FilterEffect::Grayscale { min: 0.1, max: 0.9 },
            FillStyle::Solid => FilterEffect::Solid,
        }
    }
}

const UNTEXTURED: [[f32; 2]; 4] = [[UV_NONE, UV_NONE]; 4];

/// Accumulates overlay quads for a single flush.
#[derive(Debug, Default)]
pub struct DrawBatch {
    vertices: Vec<OverlayVertex>,
    indices: Vec<u32>,
}

impl DrawBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear accumulated primitives, keeping capacity.
    pub fn begin(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn vertices(&self) -> &[OverlayVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Append another batch's primitives to this one.
    pub fn append(&mut self, other: &DrawBatch) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }

    fn push_quad(&mut self, corners: [[f32; 2]; 4], color: [f32; 4], uvs: [[f32; 2]; 4], effect: FilterEffect) {
        let base = self.vertices.len() as u32;
        let raw = effect.to_raw();
        for i in 0..4 {
            self.vertices.push(OverlayVertex {
                position: corners[i],
                color,
                uv: uvs[i],
                effect: raw,
            });
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Draw a thick line segment as a quad.
    pub fn draw_line(&mut self, start: [f32; 2], end: [f32; 2], color: [f32; 4], width: f32) {
        self.draw_line_with(start, end, color, width, UNTEXTURED, FilterEffect::None);
    }

    fn draw_line_with(
        &mut self,
        start: [f32; 2],
        end: [f32; 2],
        color: [f32; 4],
        width: f32,
        uvs: [[f32; 2]; 4],
        effect: FilterEffect,
    ) {
        let dx = end[0] - start[0];
        let dy = end[1] - start[1];
        let len = (dx * dx + dy * dy).sqrt();
        // Zero-length lines still get a well-defined normal so circles and
        // degenerate strokes render as quads.
        let (nx, ny) = if len > f32::EPSILON {
            (-dy / len, dx / len)
        } else {
            (0.0, 1.0)
        };
        let hw = width / 2.0;
        let corners = [
            [start[0] + nx * hw, start[1] + ny * hw],
            [end[0] + nx * hw, end[1] + ny * hw],
            [end[0] - nx * hw, end[1] - ny * hw],
            [start[0] - nx * hw, start[1] - ny * hw],
        ];
        self.push_quad(corners, color, uvs, effect);
    }

    /// Draw a closed polygon outline as N shared-vertex segments.
    ///
    /// The closing segment is emitted unless the caller already repeated the
    /// first point at the end.
    pub fn draw_polygon(&mut self, points: &[[f32; 2]], color: [f32; 4], width: f32) {
        if points.len() < 2 {
            return;
        }
        for pair in points.windows(2) {
            self.draw_line(pair[0], pair[1], color, width);
        }
        let first = points[0];
        let last = points[points.len() - 1];
        if first != last {
            self.draw_line(last, first, color, width);
        }
    }

    /// Draw a disc (or annulus, for nonzero `inner_radius`) centered at
    /// `center`. Expressed as a zero-extent "line" quad carrying quad-local
    /// coordinates in the uv channel with a radial fragment filter.
    pub fn draw_circle(&mut self, center: [f32; 2], radius: f32, color: [f32; 4], inner_radius: f32) {
        let [cx, cy] = center;
        let corners = [
            [cx - radius, cy - radius],
            [cx + radius, cy - radius],
            [cx + radius, cy + radius],
            [cx - radius, cy + radius],
        ];
        let uvs = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];
        self.push_quad(
            corners,
            color,
            uvs,
            FilterEffect::Disc {
                inner_radius: (inner_radius / radius.max(f32::EPSILON)).clamp(0.0, 1.0),
            },
        );
    }

    /// Fill an axis-aligned rectangle with a styled fill.
    ///
    /// `points` are the rectangle's corners in draw order (an optional closing
    /// duplicate of the first point is tolerated); `uv_rect` is the
    /// `[[u0, v0], [u1, v1]]` frame-texture region behind the rectangle, used
    /// by the blur/gray styles. True polygon fill is unsupported: anything
    /// that is not a 4-point axis-aligned rectangle is skipped with a warning.
    pub fn fill_polygon(
        &mut self,
        points: &[[f32; 2]],
        uv_rect: [[f32; 2]; 2],
        color: [f32; 4],
        style: FillStyle,
    ) {
        let mut pts = points;
        if pts.len() == 5 && pts[0] == pts[4] {
            pts = &pts[..4];
        }
        if pts.len() != 4 || !is_axis_aligned_rect(pts) {
            log::warn!(
                "fill_polygon only supports axis-aligned rectangles; skipping {}-point shape",
                pts.len()
            );
            return;
        }

        let (min_x, min_y, max_x, max_y) = bounds(pts);
        let cy = (min_y + max_y) / 2.0;
        let height = max_y - min_y;
        let [uv0, uv1] = uv_rect;
        // One maximal-width stroke through the horizontal centerline covers
        // the whole rectangle. With the perpendicular of (1, 0) being (0, 1),
        // the quad corners come out as (min_x, max_y), (max_x, max_y),
        // (max_x, min_y), (min_x, min_y).
        let uvs = [
            [uv0[0], uv1[1]],
            [uv1[0], uv1[1]],
            [uv1[0], uv0[1]],
            [uv0[0], uv0[1]],
        ];
        let effect = match style {
            FillStyle::Solid => FilterEffect::Solid,
            other => other.to_effect(),
        };
        self.draw_line_with([min_x, cy], [max_x, cy], color, height, uvs, effect);
    }

    /// Push the textured frame quad covering `dest` (viewport pixels) with the
    /// `src` texture region, both as `[[x0, y0], [x1, y1]]`.
    pub fn frame_quad(&mut self, dest: [[f32; 2]; 2], src: [[f32; 2]; 2]) {
        let [d0, d1] = dest;
        let [s0, s1] = src;
        let corners = [[d0[0], d0[1]], [d1[0], d0[1]], [d1[0], d1[1]], [d0[0], d1[1]]];
        let uvs = [[s0[0], s0[1]], [s1[0], s0[1]], [s1[0], s1[1]], [s0[0], s1[1]]];
        self.push_quad(corners, [1.0, 1.0, 1.0, 1.0], uvs, FilterEffect::None);
    }
}

fn bounds(pts: &[[f32; 2]]) -> (f32, f32, f32, f32) {
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for p in pts {
        min_x = min_x.min(p[0]);
        min_y = min_y.min(p[1]);
        max_x = max_x.max(p[0]);
        max_y = max_y.max(p[1]);
    }
    (min_x, min_y, max_x, max_y)
}

fn is_axis_aligned_rect(pts: &[[f32; 2]]) -> bool {
    const EPS: f32 = 1e-4;
    if pts.len() != 4 {
        return false;
    }
    let (min_x, min_y, max_x, max_y) = bounds(pts);
    pts.iter().all(|p| {
        ((p[0] - min_x).abs() < EPS || (p[0] - max_x).abs() < EPS)
            && ((p[1] - min_y).abs() < EPS || (p[1] - max_y).abs() < EPS)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_horizontal_line_expands_to_quad() {
        let mut batch = DrawBatch::new();
        batch.draw_line([10.0, 20.0], [50.0, 20.0], WHITE, 4.0);

        assert_eq!(batch.vertex_count(), 4);
        assert_eq!(batch.index_count(), 6);

        // Perpendicular of (1, 0) is (0, 1): offset is +-2 in y.
        let v = batch.vertices();
        assert!(approx_eq(v[0].position[1], 22.0));
        assert!(approx_eq(v[1].position[1], 22.0));
        assert!(approx_eq(v[2].position[1], 18.0));
        assert!(approx_eq(v[3].position[1], 18.0));
        assert!(approx_eq(v[0].position[0], 10.0));
        assert!(approx_eq(v[1].position[0], 50.0));
    }

    #[test]
    fn test_line_vertices_are_untextured() {
        let mut batch = DrawBatch::new();
        batch.draw_line([0.0, 0.0], [1.0, 1.0], WHITE, 1.0);
        for v in batch.vertices() {
            assert!(v.uv[0] < 0.0);
            assert_eq!(v.effect[0], 0.0);
        }
    }

    #[test]
    fn test_polygon_closes_open_point_list() {
        let mut batch = DrawBatch::new();
        let triangle = [[0.0, 0.0], [10.0, 0.0], [5.0, 8.0]];
        batch.draw_polygon(&triangle, WHITE, 1.0);
        // Three segments, one quad each.
        assert_eq!(batch.vertex_count(), 12);
        assert_eq!(batch.index_count(), 18);
    }

    #[test]
    fn test_polygon_with_closing_duplicate_adds_no_extra_segment() {
        let mut batch = DrawBatch::new();
        let closed = [[0.0, 0.0], [10.0, 0.0], [5.0, 8.0], [0.0, 0.0]];
        batch.draw_polygon(&closed, WHITE, 1.0);
        assert_eq!(batch.vertex_count(), 12);
    }

    #[test]
    fn test_circle_quad_extents_and_filter() {
        let mut batch = DrawBatch::new();
        batch.draw_circle([100.0, 100.0], 8.0, WHITE, 4.0);

        let v = batch.vertices();
        assert!(approx_eq(v[0].position[0], 92.0));
        assert!(approx_eq(v[2].position[0], 108.0));
        // Disc mode with normalized inner radius.
        assert_eq!(v[0].effect[0], 4.0);
        assert!(approx_eq(v[0].effect[1], 0.5));
        // Quad-local coordinates span [-1, 1].
        assert!(approx_eq(v[0].uv[0], -1.0));
        assert!(approx_eq(v[2].uv[0], 1.0));
    }

    #[test]
    fn test_fill_rectangle_covers_bounds() {
        let mut batch = DrawBatch::new();
        let rect = [[10.0, 10.0], [50.0, 10.0], [50.0, 40.0], [10.0, 40.0]];
        batch.fill_polygon(&rect, [[0.0, 0.0], [1.0, 1.0]], WHITE, FillStyle::Solid);

        assert_eq!(batch.vertex_count(), 4);
        let (min_x, min_y, max_x, max_y) = bounds(
            &batch
                .vertices()
                .iter()
                .map(|v| v.position)
                .collect::<Vec<_>>(),
        );
        assert!(approx_eq(min_x, 10.0));
        assert!(approx_eq(min_y, 10.0));
        assert!(approx_eq(max_x, 50.0));
        assert!(approx_eq(max_y, 40.0));
    }

    #[test]
    fn test_fill_rejects_non_rectangles() {
        let mut batch = DrawBatch::new();
        let pentagon = [
            [0.0, 0.0],
            [10.0, 0.0],
            [12.0, 6.0],
            [5.0, 10.0],
            [-2.0, 6.0],
        ];
        batch.fill_polygon(&pentagon, [[0.0, 0.0], [1.0, 1.0]], WHITE, FillStyle::Gray);
        assert!(batch.is_empty());

        let rotated = [[0.0, 5.0], [5.0, 0.0], [10.0, 5.0], [5.0, 10.0]];
        batch.fill_polygon(&rotated, [[0.0, 0.0], [1.0, 1.0]], WHITE, FillStyle::Gray);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_filter_effect_lowering() {
        assert_eq!(FilterEffect::None.to_raw()[0], 0.0);
        assert_eq!(FilterEffect::Pixelate { block_size: 8.0 }.to_raw(), [1.0, 8.0, 0.0, 0.0]);
        assert_eq!(
            FilterEffect::Grayscale { min: 0.2, max: 0.8 }.to_raw(),
            [2.0, 0.2, 0.8, 0.0]
        );
        assert_eq!(FilterEffect::Solid.to_raw()[0], 3.0);
        assert_eq!(FilterEffect::Disc { inner_radius: 0.5 }.to_raw(), [4.0, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_append_rebases_indices() {
        let mut a = DrawBatch::new();
        a.draw_line([0.0, 0.0], [1.0, 0.0], WHITE, 1.0);
        let mut b = DrawBatch::new();
        b.draw_line([2.0, 0.0], [3.0, 0.0], WHITE, 1.0);

        a.append(&b);
        assert_eq!(a.vertex_count(), 8);
        assert_eq!(a.indices()[6], 4);
    }

    #[test]
    fn test_begin_clears() {
        let mut batch = DrawBatch::new();
        batch.draw_line([0.0, 0.0], [1.0, 0.0], WHITE, 1.0);
        batch.begin();
        assert!(batch.is_empty());
        assert_eq!(batch.vertex_count(), 0);
    }
}
