//! Tap detection on the reading surface.
//!
//! A press only becomes a tap when it stays within a small movement window,
//! is released quickly, starts and ends on the page strip away from any
//! control, and no text is selected when it ends. Everything else is a
//! scroll, a drag or somebody else's event.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::target::Target;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One low-level input event as delivered by the host.
#[derive(Debug, Clone)]
pub struct InputSample {
    pub point: Point,
    pub target: Target,
    pub at: Instant,
    /// Another listener already handled or cancelled the event.
    pub handled: bool,
    /// A non-empty text selection exists at the time of the event.
    pub has_selection: bool,
}

impl InputSample {
    pub fn new(point: Point, target: Target, at: Instant) -> Self {
        Self {
            point,
            target,
            at,
            handled: false,
            has_selection: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum RawInput {
    PointerDown(InputSample),
    PointerMove(InputSample),
    PointerUp(InputSample),
    TouchStart(InputSample),
    TouchMove(InputSample),
    TouchEnd(InputSample),
    Click(InputSample),
}

/// Strategy-neutral press lifecycle.
#[derive(Debug, Clone)]
pub enum PressSignal {
    Start(InputSample),
    Move(InputSample),
    End(InputSample),
    Click(InputSample),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub pointer_events: bool,
    pub intersection_observer: bool,
}

/// Which event family feeds the classifier. Chosen once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStrategy {
    Pointer,
    TouchWithClickFallback,
}

impl InputStrategy {
    pub fn select(capabilities: &Capabilities) -> Self {
        if capabilities.pointer_events {
            InputStrategy::Pointer
        } else {
            InputStrategy::TouchWithClickFallback
        }
    }

    /// Maps a raw event onto the press lifecycle, dropping events that
    /// belong to the inactive family.
    pub fn translate(self, raw: RawInput) -> Option<PressSignal> {
        match (self, raw) {
            (InputStrategy::Pointer, RawInput::PointerDown(s)) => Some(PressSignal::Start(s)),
            (InputStrategy::Pointer, RawInput::PointerMove(s)) => Some(PressSignal::Move(s)),
            (InputStrategy::Pointer, RawInput::PointerUp(s)) => Some(PressSignal::End(s)),
            (InputStrategy::TouchWithClickFallback, RawInput::TouchStart(s)) => {
                Some(PressSignal::Start(s))
            }
            (InputStrategy::TouchWithClickFallback, RawInput::TouchMove(s)) => {
                Some(PressSignal::Move(s))
            }
            (InputStrategy::TouchWithClickFallback, RawInput::TouchEnd(s)) => {
                Some(PressSignal::End(s))
            }
            (InputStrategy::TouchWithClickFallback, RawInput::Click(s)) => {
                Some(PressSignal::Click(s))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoPress,
    Handled,
    Interactive,
    OffSurface,
    TextSelected,
    Moved,
    TooSlow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Tap,
    NotTap(Rejection),
}

impl Classification {
    pub fn is_tap(self) -> bool {
        matches!(self, Classification::Tap)
    }
}

#[derive(Debug, Clone, Copy)]
struct PressSample {
    start: Point,
    started_at: Instant,
    moved: bool,
}

#[derive(Debug, Clone)]
pub struct GestureClassifier {
    max_move: f32,
    max_time: Duration,
    press: Option<PressSample>,
}

impl GestureClassifier {
    pub fn new(max_move: f32, max_time: Duration) -> Self {
        Self {
            max_move,
            max_time,
            press: None,
        }
    }

    pub fn has_pending_press(&self) -> bool {
        self.press.is_some()
    }

    /// Runs one press-lifecycle signal. Only releases and clicks classify.
    pub fn feed(&mut self, signal: PressSignal) -> Option<Classification> {
        match signal {
            PressSignal::Start(sample) => {
                self.press_start(&sample);
                None
            }
            PressSignal::Move(sample) => {
                self.press_move(sample.point);
                None
            }
            PressSignal::End(sample) => Some(self.press_end(&sample)),
            PressSignal::Click(sample) => Some(self.click(&sample)),
        }
    }

    /// Records a press. Returns whether the press was accepted.
    pub fn press_start(&mut self, sample: &InputSample) -> bool {
        if sample.handled || !sample.target.accepts_tap() {
            return false;
        }
        // A second pointer overwrites the first; multi-touch is best effort.
        self.press = Some(PressSample {
            start: sample.point,
            started_at: sample.at,
            moved: false,
        });
        true
    }

    pub fn press_move(&mut self, point: Point) {
        let max_move = self.max_move;
        if let Some(press) = self.press.as_mut() {
            let dx = (point.x - press.start.x).abs();
            let dy = (point.y - press.start.y).abs();
            if dx >= max_move || dy >= max_move {
                press.moved = true;
            }
        }
    }

    pub fn press_end(&mut self, sample: &InputSample) -> Classification {
        let Some(press) = self.press.take() else {
            return Classification::NotTap(Rejection::NoPress);
        };
        if sample.handled {
            return Classification::NotTap(Rejection::Handled);
        }
        if let Some(rejection) = Self::reject_target(sample) {
            return Classification::NotTap(rejection);
        }
        if press.moved {
            return Classification::NotTap(Rejection::Moved);
        }
        let elapsed = sample.at.saturating_duration_since(press.started_at);
        if elapsed > self.max_time {
            debug!(elapsed_ms = elapsed.as_millis() as u64, "press held too long for a tap");
            return Classification::NotTap(Rejection::TooSlow);
        }
        Classification::Tap
    }

    /// Desktop click fallback: same target checks, no movement or timing
    /// window since a click is never a drag.
    pub fn click(&self, sample: &InputSample) -> Classification {
        if sample.handled {
            return Classification::NotTap(Rejection::Handled);
        }
        match Self::reject_target(sample) {
            Some(rejection) => Classification::NotTap(rejection),
            None => Classification::Tap,
        }
    }

    fn reject_target(sample: &InputSample) -> Option<Rejection> {
        if sample.target.is_interactive() {
            Some(Rejection::Interactive)
        } else if !sample.target.is_on_reading_surface() {
            Some(Rejection::OffSurface)
        } else if sample.has_selection {
            Some(Rejection::TextSelected)
        } else {
            None
        }
    }
}
