//! Host-supplied overlays drawn on top of the board.

use hexview_core::{Point, Rect};
use tiny_skia::Pixmap;

use crate::input::{Key, ModMask, MouseAction};

/// Something drawn over the finished board frame, such as a minimap or a
/// chat box. Overlays see input before the board does.
///
/// All positions are in view coordinates.
pub trait Displayable {
    /// Draws the overlay. `view` is the board-pixel rectangle currently on
    /// screen.
    fn draw(&mut self, target: &mut Pixmap, view: Rect);

    /// Whether `pos` lies on the overlay.
    fn is_hit(&self, _pos: Point) -> bool {
        false
    }

    /// Handles a pointer action over the overlay. Returns whether the
    /// action was consumed.
    fn on_pointer(&mut self, _action: MouseAction, _pos: Point, _modifiers: ModMask) -> bool {
        false
    }

    /// Handles a key press. Returns whether the key was consumed.
    fn on_key(&mut self, _key: &Key, _modifiers: ModMask) -> bool {
        false
    }
}
