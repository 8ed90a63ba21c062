//! **hexview-render** — raster side of the hexview board renderer.
//!
//! Everything here works on [`tiny_skia::Pixmap`] images: hex tile
//! composition, the board-wide shadow overlay, isometric depth ordering,
//! zoom-scaled image caching and text labels. The crate knows nothing about
//! sprites or user interaction; see the `hexview` crate for that.

pub mod assets;
pub mod canvas;
pub mod compose;
pub mod depth;
pub mod error;
pub mod scaled;
pub mod shadow;
pub mod text;
pub mod tile_cache;

pub use assets::{AnimationTracker, AssetState, ImageHandle, ImageId, SolidTileSource, TileSource};
pub use compose::{TileCompositor, TileContext, TileOutcome};
pub use depth::{Curtain, DrawOp, curtain_edges, curtain_polygon, draw_order, possibly_occluded};
pub use error::RenderError;
pub use scaled::ScaledImageCache;
pub use shadow::{SHADOW_ALPHA, ShadowMap};
pub use text::TextRenderer;
pub use tile_cache::{CacheStats, HexImageCache};

pub use tiny_skia::Pixmap;
