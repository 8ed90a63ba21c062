//! **hexview** — the interactive board view.
//!
//! [`BoardView`] owns the hex tile cache, the shadow map and every sprite
//! collection. The game-state layer reports changes through its setters;
//! the host drives it with [`BoardView::tick`] and [`BoardView::paint`] and
//! forwards input through [`BoardView::handle_input`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use hexview::{BoardView, ViewConfig};
//! use hexview_core::Board;
//! use hexview_render::{Pixmap, SolidTileSource};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let source = SolidTileSource::new()?;
//! let mut view = BoardView::new(ViewConfig::default(), Arc::new(Board::new(16, 17)), Box::new(source))?;
//! let mut frame = Pixmap::new(800, 600).ok_or("frame")?;
//! view.paint(&mut frame)?;
//! # Ok(())
//! # }
//! ```

pub mod animation;
pub mod attack;
pub mod collections;
pub mod config;
pub mod error;
pub mod input;
pub mod overlay;
pub mod schedule;
pub mod sprites;
pub mod view;

pub use animation::{MovementQueue, MovementStep};
pub use attack::{AttackAction, AttackKind, AttackTarget, FiringSolution};
pub use config::ViewConfig;
pub use error::ViewError;
pub use input::{InputEvent, Key, ModMask, MouseAction};
pub use overlay::Displayable;
pub use schedule::TimerQueue;
pub use sprites::{CursorKind, MovementMode, PathStep, SpriteKey, SpriteLayer};
pub use view::{BoardView, BoardViewEvent, PaintReport};
