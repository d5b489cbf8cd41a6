//! The annotation surface: one dispatcher for all input.
//!
//! `AnnotationSurface` owns the viewport, the store, the interaction context
//! and the injected host services. Every input enters through
//! [`AnnotationSurface::handle_input`]; asynchronous completions (seeks,
//! persists, animation steps) re-enter the same way, so all state mutation is
//! synchronous and re-entrancy is guarded with generation counters rather
//! than locks.

use std::time::Duration;

use web_time::Instant;

use crate::animation::{AnimationController, Pulse, PulseFrame};
use crate::clipboard::PasteOutcome;
use crate::color::Rgba;
use crate::constants::{nudge, poly};
use crate::coords::{
    box_to_relative, line_to_relative, roi_from_pixel_rect, screen_to_viewport, size_to_relative,
    threshold_to_relative, to_pixel, to_relative, Roi, ViewportSize,
};
use crate::drag::{DragEvent, DragRecognizer};
use crate::error::{EngineError, Result};
use crate::events::{
    ArrowKey, EngineEvent, EventContext, EventOutbox, InputEvent, PointerButton,
};
use crate::hit_test::{find_nearest, find_resize_handle};
use crate::interaction::{apply_impact, InteractionContext, MouseMode, PendingSelect};
use crate::model::{Dtype, Geometry, Localization, LocalizationId, Track, TrackId, TypeId};
use crate::services::{
    CreateRequest, FrameSource, LocalizationPatch, PersistError, PersistFailurePolicy, PersistKind,
    Persistence,
};
use crate::store::AnnotationStore;

/// Pulse used for the selection highlight.
const SELECT_PULSE_MS: f32 = 600.0;
const SELECT_PULSE_CYCLES: u32 = 2;

#[derive(Debug)]
struct NudgeState {
    id: LocalizationId,
    deadline: Instant,
}

/// Pointer affordance under a position, for host cursor styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorHint {
    Default,
    /// Over the active annotation's body.
    Move,
    /// Over one of the active annotation's resize handles.
    Resize,
    /// Over the cut item or its handles.
    NotAllowed,
}

/// Interactive annotation engine over one media item.
pub struct AnnotationSurface<F: FrameSource, P: Persistence> {
    viewport: ViewportSize,
    display: [f32; 2],
    store: AnnotationStore,
    context: InteractionContext,
    drag: DragRecognizer,
    animation: AnimationController,
    outbox: EventOutbox,
    frames: F,
    persistence: P,
    failure_policy: PersistFailurePolicy,
    /// Version edits are written into; mismatched edits auto-clone here.
    selected_version: u32,
    fill_enabled: bool,
    /// Pointer-down landed on the active annotation's body; a debounced drag
    /// promotes SELECT to MOVE.
    move_armed: bool,
    pending_nudge: Option<NudgeState>,
    last_pulse: Option<PulseFrame>,
    disposed: bool,
}

impl<F: FrameSource, P: Persistence> AnnotationSurface<F, P> {
    pub fn new(viewport: ViewportSize, frames: F, persistence: P) -> Self {
        Self {
            viewport,
            display: [viewport.width, viewport.height],
            store: AnnotationStore::new(),
            context: InteractionContext::new(),
            drag: DragRecognizer::new(),
            animation: AnimationController::new(),
            outbox: EventOutbox::new(),
            frames,
            persistence,
            failure_policy: PersistFailurePolicy::default(),
            selected_version: 0,
            fill_enabled: true,
            move_armed: false,
            pending_nudge: None,
            last_pulse: None,
            disposed: false,
        }
    }

    pub fn with_failure_policy(mut self, policy: PersistFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut AnnotationStore {
        &mut self.store
    }

    pub fn context(&self) -> &InteractionContext {
        &self.context
    }

    pub fn frames(&self) -> &F {
        &self.frames
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    pub fn viewport(&self) -> ViewportSize {
        self.viewport
    }

    pub fn fill_enabled(&self) -> bool {
        self.fill_enabled
    }

    /// The most recent animation sample, for the renderer.
    pub fn pulse(&self) -> Option<PulseFrame> {
        self.last_pulse
    }

    pub fn set_viewport(&mut self, viewport: ViewportSize) {
        self.viewport = viewport;
    }

    /// Physical size of the input surface when it differs from the viewport.
    pub fn set_display_size(&mut self, display: [f32; 2]) {
        self.display = display;
    }

    pub fn set_selected_version(&mut self, version: u32) {
        self.selected_version = version;
    }

    pub fn set_fill_enabled(&mut self, enabled: bool) {
        self.fill_enabled = enabled;
    }

    pub fn set_emphasized(&mut self, id: Option<LocalizationId>) {
        self.context.emphasized = id;
    }

    /// Drain the produced-event outbox.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.outbox.drain()
    }

    /// Tear down; all further inputs are rejected.
    pub fn dispose(&mut self) {
        self.drag.cancel();
        if let Some(id) = self.context.active_localization {
            self.animation.cancel_target(id);
        }
        self.context = InteractionContext::new();
        self.pending_nudge = None;
        self.disposed = true;
    }

    fn event_context(&self) -> EventContext {
        EventContext {
            frame: self.frames.current_frame(),
            roi: self.context.roi,
        }
    }

    fn emit(&mut self, event: EngineEvent) {
        self.outbox.push(event);
    }

    fn set_mode(&mut self, mode: MouseMode) {
        if self.context.set_mode(mode) {
            let context = self.event_context();
            self.emit(EngineEvent::ModeChange { mode, context });
        }
    }

    // ========================================================================
    // Input dispatch
    // ========================================================================

    pub fn handle_input(&mut self, event: InputEvent, now: Instant) -> Result<()> {
        if self.disposed {
            return Err(EngineError::Disposed);
        }
        self.flush_nudge_if_due(now)?;

        match event {
            InputEvent::PointerDown { x, y, button } => {
                let p = screen_to_viewport([x, y], self.display, self.viewport);
                self.on_pointer_down(p, button, now)
            }
            InputEvent::PointerMove { x, y } => {
                let p = screen_to_viewport([x, y], self.display, self.viewport);
                self.on_pointer_move(p, now);
                Ok(())
            }
            InputEvent::PointerUp { x, y } => {
                let p = screen_to_viewport([x, y], self.display, self.viewport);
                self.on_pointer_up(p, now)
            }
            InputEvent::Nudge { key, fast } => self.on_nudge(key, fast, now),
            InputEvent::CancelKey => {
                self.on_cancel();
                Ok(())
            }
            InputEvent::DeleteKey => self.delete_active(),
            InputEvent::SeekComplete { frame, generation } => {
                self.on_seek_complete(frame, generation, now)
            }
            InputEvent::PersistComplete { kind, id, error } => {
                match error {
                    Some(message) => {
                        self.on_persist_failure(kind, PersistError::Network(message));
                    }
                    None => log::debug!("persist complete for {kind:?} {id}"),
                }
                Ok(())
            }
            InputEvent::AnimationTick => {
                self.last_pulse = self.animation.step(now);
                Ok(())
            }
            InputEvent::PlaybackStarted => {
                self.context.clipboard.clear();
                if let Some(id) = self.context.active_localization {
                    self.animation.cancel_target(id);
                }
                self.last_pulse = None;
                Ok(())
            }
            InputEvent::PlaybackStopped => Ok(()),
        }
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Select an annotation, seeking to its frame first when needed.
    ///
    /// Cancelable: a second call while a seek is pending invalidates the
    /// first via the generation stamp, so `select` fires exactly once per
    /// completed request.
    pub fn select(&mut self, id: LocalizationId, now: Instant) -> Result<()> {
        let target_frame = self.store.get(id)?.frame;
        let generation = self.context.next_select_generation();
        if target_frame == self.frames.current_frame() {
            self.finish_select(id, now);
        } else {
            self.context.pending_select = Some(PendingSelect { id, generation });
            self.frames.goto_frame(target_frame, generation);
        }
        Ok(())
    }

    fn on_seek_complete(&mut self, frame: u32, generation: u64, now: Instant) -> Result<()> {
        let Some(pending) = self.context.pending_select else {
            return Ok(());
        };
        if pending.generation != generation {
            log::debug!("dropping stale seek completion (generation {generation})");
            return Ok(());
        }
        self.context.pending_select = None;
        if !self.store.contains(pending.id) {
            log::warn!("selection target {} vanished during seek to {frame}", pending.id);
            return Ok(());
        }
        self.finish_select(pending.id, now);
        Ok(())
    }

    fn finish_select(&mut self, id: LocalizationId, now: Instant) {
        self.context.active_localization = Some(id);
        self.set_mode(MouseMode::Select);
        let context = self.event_context();
        self.emit(EngineEvent::Select { id, context });
        self.animation.start(
            id,
            Pulse::new(Rgba::WHITE, Rgba::GRAY, SELECT_PULSE_MS, SELECT_PULSE_CYCLES),
            now,
        );
    }

    /// Select a track. Re-selecting the active track at the same frame is a
    /// no-op, which keeps refresh-on-pause handlers from feeding back.
    pub fn select_track(&mut self, track_id: TrackId) -> Result<()> {
        let frame = self.frames.current_frame();
        if self.context.active_track == Some(track_id)
            && self.store.track(track_id)?.covers_frame(frame)
        {
            return Ok(());
        }
        self.store.track(track_id)?;
        self.context.active_track = Some(track_id);
        let context = self.event_context();
        self.emit(EngineEvent::ModifyTrack { track_id, context });
        Ok(())
    }

    fn deselect(&mut self) {
        if let Some(id) = self.context.clear_selection() {
            self.animation.cancel_target(id);
            let context = self.event_context();
            self.emit(EngineEvent::Unselect { id, context });
        }
        self.set_mode(MouseMode::Query);
    }

    // ========================================================================
    // Pointer handling
    // ========================================================================

    /// Live hit-test candidates on the current frame.
    ///
    /// The cut item is excluded on its origin frame (drawn as a ghost, not
    /// indexed there) but participates on every other frame, where its ghost
    /// follows the view. Pointer affordances over it stay blocked either way.
    fn hit_candidates(&self, frame: u32) -> Vec<&Localization> {
        let mut candidates: Vec<&Localization> = self
            .store
            .on_frame(frame)
            .filter(|loc| !self.context.clipboard.is_cut(loc.id))
            .collect();
        if let Some(entry) = self.context.clipboard.cut_entry() {
            if entry.origin_frame != frame {
                if let Ok(loc) = self.store.get(entry.id) {
                    candidates.push(loc);
                }
            }
        }
        candidates
    }

    /// Affordance under a screen position.
    pub fn cursor_hint(&self, x: f32, y: f32) -> CursorHint {
        let p = screen_to_viewport([x, y], self.display, self.viewport);
        let rel = to_relative(p, self.viewport, self.context.roi);
        let frame = self.frames.current_frame();

        if let Some(active) = self.context.active_localization {
            if let Ok(loc) = self.store.get(active) {
                if find_resize_handle(rel, &loc.geometry, self.viewport, self.context.roi)
                    .is_some()
                {
                    return if self.context.clipboard.is_cut(active) {
                        CursorHint::NotAllowed
                    } else {
                        CursorHint::Resize
                    };
                }
            }
        }
        let candidates = self.hit_candidates(frame);
        match find_nearest(rel, candidates, self.store.types(), self.viewport, self.context.roi) {
            Some(id) if self.context.clipboard.is_cut(id) => CursorHint::NotAllowed,
            Some(id) if self.context.active_localization == Some(id) => CursorHint::Move,
            _ => CursorHint::Default,
        }
    }

    fn on_pointer_down(&mut self, p: [f32; 2], button: PointerButton, now: Instant) -> Result<()> {
        if button == PointerButton::Secondary {
            self.on_cancel();
            return Ok(());
        }
        match self.context.mode() {
            MouseMode::Query => {
                let rel = to_relative(p, self.viewport, self.context.roi);
                let frame = self.frames.current_frame();
                let candidates = self.hit_candidates(frame);
                let hit = find_nearest(
                    rel,
                    candidates,
                    self.store.types(),
                    self.viewport,
                    self.context.roi,
                );
                if let Some(id) = hit {
                    if self.context.clipboard.is_cut(id) {
                        log::debug!("ignoring click on cut item {id}");
                    } else {
                        self.select(id, now)?;
                    }
                }
            }
            MouseMode::New => {
                self.drag.begin(p[0], p[1], now);
            }
            MouseMode::NewPoly => {
                self.on_poly_click(p)?;
            }
            MouseMode::Select => {
                self.on_select_pointer_down(p, now)?;
            }
            MouseMode::ZoomRoi | MouseMode::Pan => {
                self.drag.begin(p[0], p[1], now);
            }
            MouseMode::Move | MouseMode::Resize => {
                // Already mid-gesture; a second press restarts it.
                self.drag.begin(p[0], p[1], now);
            }
        }
        Ok(())
    }

    fn on_select_pointer_down(&mut self, p: [f32; 2], now: Instant) -> Result<()> {
        let Some(active) = self.context.active_localization else {
            self.set_mode(MouseMode::Query);
            return Ok(());
        };
        let rel = to_relative(p, self.viewport, self.context.roi);
        let geometry = self.store.get(active)?.geometry.clone();
        let cut = self.context.clipboard.is_cut(active);

        if !cut {
            if let Some((kind, impact)) =
                find_resize_handle(rel, &geometry, self.viewport, self.context.roi)
            {
                log::debug!("resize begins on {active} via {kind:?}");
                self.context.impact = Some(impact);
                self.drag.begin(p[0], p[1], now);
                self.set_mode(MouseMode::Resize);
                return Ok(());
            }
        }

        let frame = self.frames.current_frame();
        let candidates = self.hit_candidates(frame);
        let hit = find_nearest(
            rel,
            candidates,
            self.store.types(),
            self.viewport,
            self.context.roi,
        );
        match hit {
            Some(id) if id == active => {
                if !cut {
                    self.move_armed = true;
                    self.drag.begin(p[0], p[1], now);
                }
            }
            Some(id) if !self.context.clipboard.is_cut(id) => {
                self.deselect();
                self.select(id, now)?;
            }
            // The cut ghost blocks interaction.
            Some(_) => {}
            None => self.deselect(),
        }
        Ok(())
    }

    fn on_pointer_move(&mut self, p: [f32; 2], now: Instant) {
        let Some(event) = self.drag.update(p[0], p[1], now) else {
            return;
        };
        // Debounce passed mid-drag: promote an armed body press to MOVE.
        if self.context.mode() == MouseMode::Select && self.move_armed {
            self.move_armed = false;
            self.set_mode(MouseMode::Move);
        }
        let _ = event;
    }

    fn on_pointer_up(&mut self, p: [f32; 2], now: Instant) -> Result<()> {
        let mode = self.context.mode();
        let drag = self.drag.finish(p[0], p[1], now);
        match mode {
            MouseMode::Move => {
                self.move_armed = false;
                if let Some(drag) = drag {
                    self.commit_move(drag)?;
                }
                self.set_mode(MouseMode::Select);
            }
            MouseMode::Resize => {
                let impact = self.context.impact.take();
                if let (Some(drag), Some(impact)) = (drag, impact) {
                    self.commit_resize(drag, &impact)?;
                }
                self.set_mode(MouseMode::Select);
            }
            MouseMode::New => {
                self.commit_new(p, drag)?;
            }
            MouseMode::ZoomRoi => {
                if let Some(drag) = drag {
                    self.commit_zoom(drag);
                }
                self.end_override();
            }
            MouseMode::Pan => {
                if let Some(drag) = drag {
                    self.commit_pan(drag);
                }
                self.end_override();
            }
            MouseMode::Select => {
                // A body press that never saw a move event: commit if the
                // release itself clears the debounce, else it was a click.
                let armed = std::mem::take(&mut self.move_armed);
                if armed {
                    if let Some(drag) = drag {
                        self.commit_move(drag)?;
                    }
                }
            }
            MouseMode::Query | MouseMode::NewPoly => {}
        }
        Ok(())
    }

    fn on_cancel(&mut self) {
        self.drag.cancel();
        self.move_armed = false;
        self.context.impact = None;
        match self.context.mode() {
            MouseMode::NewPoly => {
                self.context.draft_poly.clear();
                self.set_mode(MouseMode::Query);
            }
            MouseMode::ZoomRoi | MouseMode::Pan => self.end_override(),
            MouseMode::Move | MouseMode::Resize => self.set_mode(MouseMode::Select),
            MouseMode::New => self.set_mode(MouseMode::Query),
            MouseMode::Select => self.deselect(),
            MouseMode::Query => {}
        }
    }

    // ========================================================================
    // Geometry commits
    // ========================================================================

    fn commit_move(&mut self, drag: DragEvent) -> Result<()> {
        let Some(id) = self.context.active_localization else {
            return Ok(());
        };
        let delta_px = drag.delta_px();
        let delta = size_to_relative(delta_px, self.viewport, self.context.roi);
        let geometry = self.store.get(id)?.geometry.translated(delta[0], delta[1]);
        self.apply_geometry_edit(id, geometry)
    }

    fn commit_resize(&mut self, drag: DragEvent, impact: &[[f32; 2]]) -> Result<()> {
        let Some(id) = self.context.active_localization else {
            return Ok(());
        };
        let delta_px = drag.delta_px();
        let delta = size_to_relative(delta_px, self.viewport, self.context.roi);
        let old = self.store.get(id)?.geometry.clone();
        let moved = apply_impact(&old.vertices(), impact, delta);
        let geometry = old.with_vertices(&moved);
        self.apply_geometry_edit(id, geometry)
    }

    fn apply_geometry_edit(&mut self, id: LocalizationId, geometry: Geometry) -> Result<()> {
        self.store.set_geometry(id, geometry.clone())?;
        self.persist_patch(id, LocalizationPatch::geometry(geometry.clone()))?;
        let context = self.event_context();
        self.emit(EngineEvent::Edit {
            id,
            patch: LocalizationPatch::geometry(geometry),
            context,
        });
        Ok(())
    }

    /// NEW-mode completion: drags make boxes and lines, clicks make dots.
    fn commit_new(&mut self, p: [f32; 2], drag: Option<DragEvent>) -> Result<()> {
        let Some(type_id) = self.context.new_type else {
            self.set_mode(MouseMode::Query);
            return Ok(());
        };
        let dtype = self.store.type_descriptor(type_id)?.dtype;
        let geometry = match (dtype, drag) {
            (Dtype::Dot, _) => {
                let rel = to_relative(p, self.viewport, self.context.roi);
                Some(Geometry::Dot { x: rel[0], y: rel[1] })
            }
            (Dtype::Box, Some(drag)) => {
                let start = drag.start.pos();
                let delta = drag.delta_px();
                let rect = normalize_rect(start, delta);
                let [x, y, width, height] =
                    box_to_relative(rect, self.viewport, self.context.roi);
                Some(Geometry::Box { x, y, width, height })
            }
            (Dtype::Line, Some(drag)) => {
                let start = drag.start.pos();
                let end = [start[0] + drag.delta_px()[0], start[1] + drag.delta_px()[1]];
                let [x, y, u, v] = line_to_relative(start, end, self.viewport, self.context.roi);
                Some(Geometry::Line { x, y, u, v })
            }
            // Malformed drag for a shape that needs one: treated as a click,
            // nothing is created.
            (Dtype::Box | Dtype::Line, None) => None,
            (Dtype::Poly, _) => {
                log::warn!("poly type {type_id} drawn via NEW instead of NEW_POLY");
                None
            }
        };
        if let Some(geometry) = geometry {
            self.finish_draft(type_id, geometry)?;
        }
        Ok(())
    }

    fn on_poly_click(&mut self, p: [f32; 2]) -> Result<()> {
        let rel = to_relative(p, self.viewport, self.context.roi);
        if let Some(first) = self.context.draft_poly.first().copied() {
            let first_px = to_pixel(first, self.viewport, self.context.roi);
            let dist = (p[0] - first_px[0]).hypot(p[1] - first_px[1]);
            if dist < poly::CLOSE_MARGIN_PX && self.context.draft_poly.len() >= 3 {
                let mut points = std::mem::take(&mut self.context.draft_poly);
                points.push(first);
                let Some(type_id) = self.context.new_type else {
                    self.set_mode(MouseMode::Query);
                    return Ok(());
                };
                self.finish_draft(type_id, Geometry::Poly { points })?;
                return Ok(());
            }
        }
        self.context.draft_poly.push(rel);
        Ok(())
    }

    /// A finished draft either patches the redraw target or goes to the host
    /// for creation confirmation.
    fn finish_draft(&mut self, type_id: TypeId, geometry: Geometry) -> Result<()> {
        if let Some(target) = self.context.redraw_target.take() {
            self.apply_geometry_edit(target, geometry)?;
            self.set_mode(MouseMode::Select);
            return Ok(());
        }
        let request = CreateRequest {
            type_id,
            frame: self.frames.current_frame(),
            version: self.selected_version,
            geometry,
            parent_id: None,
        };
        let context = self.event_context();
        self.emit(EngineEvent::DrawComplete { request, context });
        self.set_mode(MouseMode::Query);
        Ok(())
    }

    /// Host confirmed a draft (metadata prompt accepted): persist and announce.
    pub fn confirm_create(&mut self, request: CreateRequest) -> Result<()> {
        let desc = self.store.type_descriptor(request.type_id)?.clone();
        if let Err(err) = self.persistence.create(&desc, &request) {
            self.on_persist_failure(PersistKind::Localization, err);
            return Ok(());
        }
        let context = self.event_context();
        self.emit(EngineEvent::Create { request, context });
        Ok(())
    }

    /// Arm NEW or NEW_POLY depending on the type's shape.
    pub fn begin_draw(&mut self, type_id: TypeId) -> Result<()> {
        let dtype = self.store.type_descriptor(type_id)?.dtype;
        self.context.new_type = Some(type_id);
        self.context.draft_poly.clear();
        self.set_mode(match dtype {
            Dtype::Poly => MouseMode::NewPoly,
            _ => MouseMode::New,
        });
        Ok(())
    }

    /// Arm a redraw of an existing annotation: the next completed draft
    /// patches it instead of creating.
    pub fn begin_redraw(&mut self, id: LocalizationId) -> Result<()> {
        let type_id = self.store.get(id)?.type_id;
        self.begin_draw(type_id)?;
        self.context.redraw_target = Some(id);
        Ok(())
    }

    // ========================================================================
    // Zoom and pan
    // ========================================================================

    pub fn begin_zoom(&mut self) {
        if self.context.push_override(MouseMode::ZoomRoi) {
            let context = self.event_context();
            self.emit(EngineEvent::ModeChange { mode: MouseMode::ZoomRoi, context });
        }
    }

    pub fn begin_pan(&mut self) {
        if self.context.push_override(MouseMode::Pan) {
            let context = self.event_context();
            self.emit(EngineEvent::ModeChange { mode: MouseMode::Pan, context });
        }
    }

    fn end_override(&mut self) {
        if self.context.pop_override() {
            let mode = self.context.mode();
            let context = self.event_context();
            self.emit(EngineEvent::ModeChange { mode, context });
        }
    }

    pub fn reset_zoom(&mut self) {
        self.set_roi(Roi::FULL);
    }

    fn set_roi(&mut self, roi: Roi) {
        self.context.roi = roi;
        let context = self.event_context();
        self.emit(EngineEvent::ZoomChange { roi, context });
    }

    fn commit_zoom(&mut self, drag: DragEvent) {
        let start = drag.start.pos();
        let rect = normalize_rect(start, drag.delta_px());
        let roi = roi_from_pixel_rect(rect, self.viewport, self.context.roi);
        self.set_roi(roi);
    }

    fn commit_pan(&mut self, drag: DragEvent) {
        let delta_px = drag.delta_px();
        let delta = size_to_relative(delta_px, self.viewport, self.context.roi);
        let mut roi = self.context.roi;
        roi.x = (roi.x - delta[0]).clamp(0.0, 1.0 - roi.width);
        roi.y = (roi.y - delta[1]).clamp(0.0, 1.0 - roi.height);
        self.set_roi(roi);
    }

    // ========================================================================
    // Clipboard
    // ========================================================================

    /// Cut the active annotation into the clipboard slot.
    pub fn cut_active(&mut self) -> Result<()> {
        let Some(id) = self.context.active_localization else {
            return Ok(());
        };
        let frame = self.store.get(id)?.frame;
        self.context.clipboard.cut(id, frame);
        Ok(())
    }

    /// Paste the cut item onto the current frame.
    pub fn paste_here(&mut self) -> Result<()> {
        let frame = self.frames.current_frame();
        match self.context.clipboard.paste(frame) {
            PasteOutcome::Empty | PasteOutcome::OriginNoOp => Ok(()),
            PasteOutcome::Move { id, from, to } => {
                log::debug!("pasting {id} from frame {from} to {to}");
                self.store.set_frame(id, to)?;
                self.persist_patch(id, LocalizationPatch::frame(to))?;
                let context = self.event_context();
                self.emit(EngineEvent::Edit {
                    id,
                    patch: LocalizationPatch::frame(to),
                    context,
                });
                Ok(())
            }
        }
    }

    // ========================================================================
    // Keyboard
    // ========================================================================

    /// Nudge the active annotation by one normalized-pixel unit; rapid
    /// repeats coalesce into one persist when the timer lapses.
    fn on_nudge(&mut self, key: ArrowKey, fast: bool, now: Instant) -> Result<()> {
        let Some(id) = self.context.active_localization else {
            return Ok(());
        };
        let unit = threshold_to_relative(1.0, self.viewport, self.context.roi)
            * if fast { nudge::FAST_MULTIPLIER } else { 1.0 };
        let dir = key.direction();
        let geometry = self
            .store
            .get(id)?
            .geometry
            .translated(dir[0] * unit, dir[1] * unit);
        self.store.set_geometry(id, geometry)?;
        self.pending_nudge = Some(NudgeState {
            id,
            deadline: now + Duration::from_millis(nudge::COALESCE_MS as u64),
        });
        Ok(())
    }

    fn flush_nudge_if_due(&mut self, now: Instant) -> Result<()> {
        let due = self
            .pending_nudge
            .as_ref()
            .is_some_and(|n| now >= n.deadline);
        if !due {
            return Ok(());
        }
        let Some(state) = self.pending_nudge.take() else {
            return Ok(());
        };
        if !self.store.contains(state.id) {
            return Ok(());
        }
        let geometry = self.store.get(state.id)?.geometry.clone();
        self.persist_patch(state.id, LocalizationPatch::geometry(geometry.clone()))?;
        let context = self.event_context();
        self.emit(EngineEvent::Edit {
            id: state.id,
            patch: LocalizationPatch::geometry(geometry),
            context,
        });
        Ok(())
    }

    fn delete_active(&mut self) -> Result<()> {
        let Some(id) = self.context.active_localization else {
            return Ok(());
        };
        let loc = self.store.remove(id)?;
        self.store.remove_track_member(id);
        let desc = self.store.type_descriptor(loc.type_id)?.clone();
        if let Err(err) = self
            .persistence
            .delete(PersistKind::Localization, id, &desc)
        {
            self.on_persist_failure(PersistKind::Localization, err);
        }
        self.deselect();
        Ok(())
    }

    // ========================================================================
    // Ingest
    // ========================================================================

    /// Batch ingest of localizations, masking edit affordances while the
    /// host-visible state churns.
    pub fn ingest_localizations(&mut self, locs: impl IntoIterator<Item = Localization>) {
        self.mask_edits(true);
        self.store.insert_batch(locs);
        self.mask_edits(false);
    }

    /// Wholesale track rebuild.
    pub fn ingest_tracks(&mut self, tracks: impl IntoIterator<Item = Track>) {
        self.mask_edits(true);
        self.store.rebuild_tracks(tracks);
        self.mask_edits(false);
    }

    fn mask_edits(&mut self, masked: bool) {
        let context = self.event_context();
        self.emit(EngineEvent::TemporarilyMaskEdits { masked, context });
    }

    // ========================================================================
    // Persistence plumbing
    // ========================================================================

    /// Patch a localization, auto-cloning into the selected version when the
    /// record belongs to another version.
    fn persist_patch(&mut self, id: LocalizationId, patch: LocalizationPatch) -> Result<()> {
        let loc = self.store.get(id)?.clone();
        let desc = self.store.type_descriptor(loc.type_id)?.clone();
        let target_id = if loc.version == self.selected_version {
            id
        } else {
            match self.persistence.clone_to_version(&loc, self.selected_version) {
                Ok(new_id) => new_id,
                Err(err) => {
                    self.on_persist_failure(PersistKind::Localization, err);
                    return Ok(());
                }
            }
        };
        if let Err(err) =
            self.persistence
                .patch(PersistKind::Localization, target_id, &patch, &desc)
        {
            self.on_persist_failure(PersistKind::Localization, err);
        }
        Ok(())
    }

    fn on_persist_failure(&mut self, kind: PersistKind, err: PersistError) {
        match self.failure_policy {
            PersistFailurePolicy::LogAndDrop => {
                log::warn!("persist failure for {kind:?}: {err}");
            }
            PersistFailurePolicy::Surface => {
                let context = self.event_context();
                self.emit(EngineEvent::PersistFailed {
                    kind,
                    message: err.to_string(),
                    context,
                });
            }
        }
    }
}

/// A drag rectangle as `[x, y, w, h]` with non-negative size, whatever the
/// drag direction.
fn normalize_rect(start: [f32; 2], delta: [f32; 2]) -> [f32; 4] {
    let x = if delta[0] < 0.0 { start[0] + delta[0] } else { start[0] };
    let y = if delta[1] < 0.0 { start[1] + delta[1] } else { start[1] };
    [x, y, delta[0].abs(), delta[1].abs()]
}
