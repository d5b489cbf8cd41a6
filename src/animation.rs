//! Time-stepped pulsing highlight.
//!
//! A pulse splits `duration_ms` into `cycles` linear ramps sampled at a fixed
//! 30 fps step. Even-indexed ramps interpolate forward and odd-indexed ramps
//! backward, so an even cycle count returns to the start value and an odd
//! count ends on the opposite value. One pulse runs at a time; starting a new
//! one cancels the old deterministically via a generation counter.

use web_time::Instant;

use crate::color::Rgba;
use crate::constants::animation::STEP_MS;
use crate::model::LocalizationId;

/// Description of one pulsing highlight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pulse {
    pub from: Rgba,
    pub to: Rgba,
    pub duration_ms: f32,
    pub cycles: u32,
}

impl Pulse {
    pub fn new(from: Rgba, to: Rgba, duration_ms: f32, cycles: u32) -> Self {
        Self {
            from,
            to,
            duration_ms,
            cycles: cycles.max(1),
        }
    }

    /// Sample the triangle wave at `elapsed_ms`, clamped to the end value.
    pub fn sample(&self, elapsed_ms: f32) -> Rgba {
        if elapsed_ms >= self.duration_ms || self.duration_ms <= 0.0 {
            return self.end_value();
        }
        let ramp_len = self.duration_ms / self.cycles as f32;
        let ramp = (elapsed_ms / ramp_len) as u32;
        let progress = (elapsed_ms - ramp as f32 * ramp_len) / ramp_len;
        if ramp % 2 == 0 {
            self.from.lerp(self.to, progress)
        } else {
            self.to.lerp(self.from, progress)
        }
    }

    /// The value the pulse settles on when it completes.
    pub fn end_value(&self) -> Rgba {
        if self.cycles % 2 == 0 {
            self.from
        } else {
            self.to
        }
    }
}

/// Opaque cancelation handle for a running pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseHandle(u64);

/// One sampled animation step ready to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseFrame {
    pub target: LocalizationId,
    pub color: Rgba,
    /// Set on the final step; the caller triggers one last redraw and the
    /// controller is idle afterwards.
    pub done: bool,
}

#[derive(Debug)]
struct ActivePulse {
    target: LocalizationId,
    pulse: Pulse,
    started: Instant,
    generation: u64,
}

/// Drives at most one pulse, stepped from timer events.
#[derive(Debug, Default)]
pub struct AnimationController {
    active: Option<ActivePulse>,
    generation: u64,
}

impl AnimationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a pulse on `target`, canceling any pulse already in flight.
    pub fn start(&mut self, target: LocalizationId, pulse: Pulse, now: Instant) -> PulseHandle {
        self.generation += 1;
        if let Some(old) = self.active.take() {
            log::debug!(
                "canceling pulse on localization {} for a new one on {}",
                old.target,
                target
            );
        }
        self.active = Some(ActivePulse {
            target,
            pulse,
            started: now,
            generation: self.generation,
        });
        PulseHandle(self.generation)
    }

    /// Cancel the pulse identified by `handle`, if it is still the live one.
    pub fn cancel(&mut self, handle: PulseHandle) {
        if self
            .active
            .as_ref()
            .is_some_and(|a| a.generation == handle.0)
        {
            self.active = None;
        }
    }

    /// Cancel whatever pulse is running on `target`.
    pub fn cancel_target(&mut self, target: LocalizationId) {
        if self.active.as_ref().is_some_and(|a| a.target == target) {
            self.active = None;
        }
    }

    pub fn is_animating(&self) -> bool {
        self.active.is_some()
    }

    /// The localization currently being pulsed.
    pub fn target(&self) -> Option<LocalizationId> {
        self.active.as_ref().map(|a| a.target)
    }

    /// Sample the next 30 fps step. Returns `None` when idle; a frame with
    /// `done` set retires the pulse.
    pub fn step(&mut self, now: Instant) -> Option<PulseFrame> {
        let active = self.active.as_ref()?;
        let elapsed_ms = now.duration_since(active.started).as_secs_f32() * 1000.0;
        // Quantize to the step grid so repeated calls within one step render
        // the same color.
        let stepped_ms = (elapsed_ms / STEP_MS).floor() * STEP_MS;
        let done = stepped_ms >= active.pulse.duration_ms;
        let frame = PulseFrame {
            target: active.target,
            color: active.pulse.sample(stepped_ms),
            done,
        };
        if done {
            self.active = None;
        }
        Some(frame)
    }
}
