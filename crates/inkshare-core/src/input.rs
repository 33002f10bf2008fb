//! Pointer and wheel input.

use kurbo::{Point, Vec2};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Pointer event in screen coordinates, relative to the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down {
        position: Point,
        button: MouseButton,
        modifiers: Modifiers,
    },
    Move {
        position: Point,
    },
    Up {
        position: Point,
    },
    /// Pointer released outside the surface, capture lost or window blurred.
    Cancel,
}

/// Wheel event in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelEvent {
    pub position: Point,
    /// Vertical scroll delta; negative means scrolling up.
    pub delta_y: f64,
}

/// What a pointer press turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressAction {
    Draw,
    Pan,
}

impl PressAction {
    /// Classify a press.
    ///
    /// Middle or right button, or shift/meta held, drags the view; a plain
    /// primary press draws.
    pub fn classify(button: MouseButton, modifiers: Modifiers) -> Self {
        match button {
            MouseButton::Middle | MouseButton::Right => PressAction::Pan,
            MouseButton::Left if modifiers.shift || modifiers.meta => PressAction::Pan,
            MouseButton::Left => PressAction::Draw,
        }
    }
}

/// Gesture in progress between a press and its release.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Drawing,
    Panning {
        /// Pointer position at the last processed event.
        last: Point,
    },
}

impl Gesture {
    /// Pan delta for a move to `position`, advancing the anchor.
    pub fn pan_delta(&mut self, position: Point) -> Option<Vec2> {
        match self {
            Gesture::Panning { last } => {
                let delta = position - *last;
                *last = position;
                Some(delta)
            }
            Gesture::Idle | Gesture::Drawing => None,
        }
    }
}
