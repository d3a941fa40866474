//! Engine events
//!
//! Platform input is translated into [`Event`]s and routed through the
//! application and its layer stack. A layer that consumes an event sets
//! [`Event::handled`], which stops propagation to the layers beneath it.

use winit::event::MouseButton;
use winit::keyboard::KeyCode;

/// Category bit flags an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventCategory(u32);

impl EventCategory {
    pub const NONE: Self = Self(0);
    pub const APPLICATION: Self = Self(1 << 0);
    pub const INPUT: Self = Self(1 << 1);
    pub const KEYBOARD: Self = Self(1 << 2);
    pub const MOUSE: Self = Self(1 << 3);
    pub const MOUSE_BUTTON: Self = Self(1 << 4);

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn intersects(&self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }
}

impl std::ops::BitOr for EventCategory {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// What happened
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventKind {
    WindowClose,
    WindowResize { width: u32, height: u32 },
    KeyPressed { key: KeyCode, repeat: bool },
    KeyReleased { key: KeyCode },
    KeyTyped(char),
    MouseMoved { x: f32, y: f32 },
    MouseScrolled { x_offset: f32, y_offset: f32 },
    MouseButtonPressed(MouseButton),
    MouseButtonReleased(MouseButton),
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::WindowClose => "WindowClose",
            EventKind::WindowResize { .. } => "WindowResize",
            EventKind::KeyPressed { .. } => "KeyPressed",
            EventKind::KeyReleased { .. } => "KeyReleased",
            EventKind::KeyTyped(_) => "KeyTyped",
            EventKind::MouseMoved { .. } => "MouseMoved",
            EventKind::MouseScrolled { .. } => "MouseScrolled",
            EventKind::MouseButtonPressed(_) => "MouseButtonPressed",
            EventKind::MouseButtonReleased(_) => "MouseButtonReleased",
        }
    }

    pub fn categories(&self) -> EventCategory {
        match self {
            EventKind::WindowClose | EventKind::WindowResize { .. } => EventCategory::APPLICATION,
            EventKind::KeyPressed { .. } | EventKind::KeyReleased { .. } | EventKind::KeyTyped(_) => {
                EventCategory::INPUT | EventCategory::KEYBOARD
            }
            EventKind::MouseMoved { .. } | EventKind::MouseScrolled { .. } => {
                EventCategory::INPUT | EventCategory::MOUSE
            }
            EventKind::MouseButtonPressed(_) | EventKind::MouseButtonReleased(_) => {
                EventCategory::INPUT | EventCategory::MOUSE | EventCategory::MOUSE_BUTTON
            }
        }
    }
}

/// An event travelling through the application
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub handled: bool,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            handled: false,
        }
    }

    pub fn is_in_category(&self, category: EventCategory) -> bool {
        self.kind.categories().intersects(category)
    }

    /// Run `handler` if it accepts this event's kind
    ///
    /// `handler` returns `None` for kinds it doesn't care about and
    /// `Some(handled)` otherwise. Returns whether the handler ran.
    pub fn dispatch(&mut self, handler: impl FnOnce(&EventKind) -> Option<bool>) -> bool {
        match handler(&self.kind) {
            Some(handled) => {
                self.handled |= handled;
                true
            }
            None => false,
        }
    }
}

impl From<EventKind> for Event {
    fn from(kind: EventKind) -> Self {
        Self::new(kind)
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            EventKind::WindowResize { width, height } => {
                write!(f, "WindowResize: {}, {}", width, height)
            }
            EventKind::KeyPressed { key, repeat } => {
                write!(f, "KeyPressed: {:?} (repeat = {})", key, repeat)
            }
            EventKind::KeyReleased { key } => write!(f, "KeyReleased: {:?}", key),
            EventKind::KeyTyped(c) => write!(f, "KeyTyped: {}", c),
            EventKind::MouseMoved { x, y } => write!(f, "MouseMoved: {}, {}", x, y),
            EventKind::MouseScrolled { x_offset, y_offset } => {
                write!(f, "MouseScrolled: {}, {}", x_offset, y_offset)
            }
            EventKind::MouseButtonPressed(button) => write!(f, "MouseButtonPressed: {:?}", button),
            EventKind::MouseButtonReleased(button) => {
                write!(f, "MouseButtonReleased: {:?}", button)
            }
            EventKind::WindowClose => write!(f, "WindowClose"),
        }
    }
}
