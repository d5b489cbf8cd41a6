//! Builds the annotation overlay batch for one frame.
//!
//! Pure translation from store + interaction state to draw-batch calls; the
//! backend owns everything GPU-side. All positions are converted from
//! normalized image space to viewport pixels here.

use vast_gpu::DrawBatch;

use crate::animation::PulseFrame;
use crate::color::{resolve, StateFlags, TrackOverlay};
use crate::constants::draw;
use crate::coords::{to_pixel, ViewportSize};
use crate::interaction::InteractionContext;
use crate::model::{Geometry, Localization};
use crate::store::AnnotationStore;

/// Push the overlay for `frame` into `batch`.
///
/// Draws every localization indexed on the frame, the cut ghost when viewing
/// a frame other than its origin, and the in-progress polygon draft. `mute`
/// suppresses the whole overlay (raw frame view).
#[allow(clippy::too_many_arguments)]
pub fn push_overlay(
    batch: &mut DrawBatch,
    store: &AnnotationStore,
    context: &InteractionContext,
    frame: u32,
    viewport: ViewportSize,
    pulse: Option<PulseFrame>,
    fill_enabled: bool,
    mute: bool,
) {
    if mute {
        return;
    }

    for loc in store.on_frame(frame) {
        push_localization(batch, store, context, loc, viewport, pulse, fill_enabled);
    }

    // The cut item ghosts along on every frame but its origin.
    if let Some(entry) = context.clipboard.cut_entry() {
        if entry.origin_frame != frame {
            if let Ok(loc) = store.get(entry.id) {
                push_localization(batch, store, context, loc, viewport, pulse, fill_enabled);
            }
        }
    }

    push_poly_draft(batch, context, viewport);
}

fn push_localization(
    batch: &mut DrawBatch,
    store: &AnnotationStore,
    context: &InteractionContext,
    loc: &Localization,
    viewport: ViewportSize,
    pulse: Option<PulseFrame>,
    fill_enabled: bool,
) {
    let Ok(desc) = store.type_descriptor(loc.type_id) else {
        log::warn!("skipping localization {} during draw: unknown type {}", loc.id, loc.type_id);
        return;
    };

    let track = match store.track_of(loc.id) {
        Some(track) if context.active_track == Some(track.id) && track.covers_frame(loc.frame) => {
            TrackOverlay::ActiveMember
        }
        Some(track) => TrackOverlay::Member(store.track_color(track)),
        None => TrackOverlay::None,
    };
    let flags = StateFlags {
        track,
        is_cut: context.clipboard.is_cut(loc.id),
        is_active: context.active_localization == Some(loc.id),
        is_emphasized: context.emphasized == Some(loc.id),
        fill_enabled,
    };
    let mut style = resolve(loc, desc, flags);

    // A running pulse overrides the stroke color of its target.
    if let Some(pulse) = pulse {
        if pulse.target == loc.id {
            style.color = pulse.color;
        }
    }

    let stroke = style.color.to_array(style.alpha);
    let roi = context.roi;
    let px = |p: [f32; 2]| to_pixel(p, viewport, roi);

    match &loc.geometry {
        Geometry::Box { .. } => {
            let corners: Vec<[f32; 2]> = loc.geometry.vertices().iter().map(|v| px(*v)).collect();
            if style.fill.alpha > 0.0 {
                let (min, max) = loc.geometry.bounds();
                batch.fill_polygon(
                    &corners,
                    [min, max],
                    style.fill.color.to_array(style.fill.alpha),
                    style.fill.style,
                );
            }
            batch.draw_polygon(&corners, stroke, desc.line_width);
        }
        Geometry::Line { .. } => {
            let ends = loc.geometry.vertices();
            batch.draw_line(px(ends[0]), px(ends[1]), stroke, desc.line_width);
        }
        Geometry::Dot { x, y } => {
            batch.draw_circle(px([*x, *y]), draw::DOT_RADIUS_PX, stroke, 0.0);
        }
        Geometry::Poly { points } => {
            let pts: Vec<[f32; 2]> = points.iter().map(|p| px(*p)).collect();
            batch.draw_polygon(&pts, stroke, desc.line_width);
        }
    }

    if style.show_handles {
        push_handles(batch, loc, viewport, context, stroke);
    }
}

/// Ring handles at each resize vertex; dots carry none.
fn push_handles(
    batch: &mut DrawBatch,
    loc: &Localization,
    viewport: ViewportSize,
    context: &InteractionContext,
    color: [f32; 4],
) {
    if matches!(loc.geometry, Geometry::Dot { .. }) {
        return;
    }
    for vertex in loc.geometry.vertices() {
        let center = to_pixel(vertex, viewport, context.roi);
        batch.draw_circle(
            center,
            draw::HANDLE_RADIUS_PX,
            color,
            draw::HANDLE_INNER_RADIUS_PX,
        );
    }
}

/// The open polygon under construction, drawn as a white polyline with
/// vertex dots.
fn push_poly_draft(batch: &mut DrawBatch, context: &InteractionContext, viewport: ViewportSize) {
    if context.draft_poly.is_empty() {
        return;
    }
    let white = [1.0, 1.0, 1.0, 1.0];
    let pts: Vec<[f32; 2]> = context
        .draft_poly
        .iter()
        .map(|p| to_pixel(*p, viewport, context.roi))
        .collect();
    for pair in pts.windows(2) {
        batch.draw_line(pair[0], pair[1], white, 2.0);
    }
    for p in &pts {
        batch.draw_circle(*p, draw::DOT_RADIUS_PX, white, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dtype, TypeDescriptor};

    const VIEWPORT: ViewportSize = ViewportSize {
        width: 100.0,
        height: 100.0,
    };

    fn store_with_box() -> AnnotationStore {
        let mut store = AnnotationStore::new();
        store.register_type(TypeDescriptor::new(1, "box", Dtype::Box));
        store.insert(Localization::new(
            1,
            1,
            0,
            Geometry::Box {
                x: 0.2,
                y: 0.2,
                width: 0.4,
                height: 0.4,
            },
        ));
        store
    }

    #[test]
    fn test_overlay_draws_indexed_frame_only() {
        let store = store_with_box();
        let context = InteractionContext::new();
        let mut batch = DrawBatch::new();
        push_overlay(&mut batch, &store, &context, 0, VIEWPORT, None, true, false);
        assert!(!batch.is_empty());

        let mut other = DrawBatch::new();
        push_overlay(&mut other, &store, &context, 3, VIEWPORT, None, true, false);
        assert!(other.is_empty());
    }

    #[test]
    fn test_mute_suppresses_everything() {
        let store = store_with_box();
        let context = InteractionContext::new();
        let mut batch = DrawBatch::new();
        push_overlay(&mut batch, &store, &context, 0, VIEWPORT, None, true, true);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_cut_ghost_appears_off_origin_frame() {
        let store = store_with_box();
        let mut context = InteractionContext::new();
        context.clipboard.cut(1, 0);

        // On another frame the ghost is drawn.
        let mut batch = DrawBatch::new();
        push_overlay(&mut batch, &store, &context, 7, VIEWPORT, None, true, false);
        assert!(!batch.is_empty());
    }

    #[test]
    fn test_active_selection_adds_handles() {
        let store = store_with_box();
        let mut plain_ctx = InteractionContext::new();
        let mut plain = DrawBatch::new();
        push_overlay(&mut plain, &store, &plain_ctx, 0, VIEWPORT, None, true, false);

        plain_ctx.active_localization = Some(1);
        let mut selected = DrawBatch::new();
        push_overlay(&mut selected, &store, &plain_ctx, 0, VIEWPORT, None, true, false);
        assert!(selected.vertex_count() > plain.vertex_count());
    }

    #[test]
    fn test_unknown_type_skipped() {
        let mut store = AnnotationStore::new();
        store.insert(Localization::new(1, 99, 0, Geometry::Dot { x: 0.5, y: 0.5 }));
        let context = InteractionContext::new();
        let mut batch = DrawBatch::new();
        push_overlay(&mut batch, &store, &context, 0, VIEWPORT, None, true, false);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_poly_draft_renders_open_polyline() {
        let store = AnnotationStore::new();
        let mut context = InteractionContext::new();
        context.draft_poly = vec![[0.2, 0.2], [0.6, 0.2]];
        let mut batch = DrawBatch::new();
        push_overlay(&mut batch, &store, &context, 0, VIEWPORT, None, true, false);
        // One segment plus two vertex dots: three quads.
        assert_eq!(batch.vertex_count(), 12);
    }
}
