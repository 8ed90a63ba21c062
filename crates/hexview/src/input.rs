//! Input events routed to the board and its overlays: [`InputEvent`],
//! [`Key`], [`MouseAction`], [`ModMask`].

use hexview_core::Point;

/// A keyboard key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Escape,
    Enter,
    Home,
    PageUp,
    PageDown,
    /// A printable character.
    Char(char),
}

/// Bitmask of modifier keys held during an input event.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModMask(pub u8);

impl ModMask {
    pub const NONE: Self = Self(0);
    pub const SHIFT: Self = Self(1 << 0);
    pub const CTRL: Self = Self(1 << 1);
    pub const ALT: Self = Self(1 << 2);

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

/// A pointer action.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MouseAction {
    /// Primary (left) button pressed.
    Main,
    /// Secondary (right) button pressed.
    Secondary,
    WheelUp,
    WheelDown,
    /// Pointer moved without a button change.
    Move,
}

/// An input event in view coordinates (pixels from the top-left of the
/// painted area).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Key { key: Key, modifiers: ModMask },
    Pointer {
        action: MouseAction,
        pos: Point,
        modifiers: ModMask,
    },
}

impl InputEvent {
    /// A key press with no modifiers.
    pub fn key(key: Key) -> Self {
        Self::Key {
            key,
            modifiers: ModMask::NONE,
        }
    }

    /// A pointer event with no modifiers.
    pub fn pointer(action: MouseAction, pos: Point) -> Self {
        Self::Pointer {
            action,
            pos,
            modifiers: ModMask::NONE,
        }
    }
}
