//! Board sprites: everything drawn over the terrain tiles.
//!
//! A sprite lives in board pixel space at the current zoom. It is laid out
//! with [`Sprite::relayout`] whenever the geometry or settings change, which
//! also drops its cached image, and rasterised lazily by
//! [`Sprite::prepare`] the first time it is on screen.

use hexview_core::{Board, BoardGeometry, Color, EntityId, HexCoord, Point, Rect, Vec2, VisualSettings};
use hexview_render::canvas::{blit, new_pixmap};
use hexview_render::{Pixmap, RenderError, TextRenderer};

mod area;
mod entity;
mod lines;
mod markers;

pub use area::{EnvelopeKind, EnvelopeSprite, FieldOfFireSprite, border_edges};
pub use entity::{EntitySprite, IconStyle, IsometricSprite};
pub use lines::{AttackSprite, LineKind, LineSprite};
pub use markers::{CursorKind, CursorSprite, FlareSprite, PathStep, StepSprite, TextMarkerSprite, WreckSprite};

/// Smallest label size in pixels, whatever the zoom.
const MIN_LABEL_PX: f32 = 7.0;

/// Read-only inputs for laying out and rasterising sprites.
pub struct SpriteContext<'a> {
    pub geometry: &'a BoardGeometry,
    pub board: &'a Board,
    pub settings: &'a VisualSettings,
    pub text: &'a TextRenderer,
    /// Unit label size at zoom 1.0.
    pub label_px: f32,
}

impl SpriteContext<'_> {
    /// Terrain level of `c` as drawn: the hex's elevation in isometric
    /// mode, 0 otherwise.
    pub fn lift(&self, c: HexCoord) -> i32 {
        if self.settings.isometric {
            self.board.elevation(c).unwrap_or(0)
        } else {
            0
        }
    }

    pub fn hex_origin(&self, c: HexCoord) -> Point {
        self.geometry.hex_to_pixel(c, self.lift(c))
    }

    pub fn hex_rect(&self, c: HexCoord) -> Rect {
        self.geometry.hex_rect(c, self.lift(c))
    }

    pub fn hex_center(&self, c: HexCoord) -> Point {
        self.geometry.hex_center(c, self.lift(c))
    }

    pub fn label_size_px(&self) -> f32 {
        (self.label_px * self.geometry.scale()).max(MIN_LABEL_PX)
    }

    /// Pixel size of `text` at the label size.
    pub fn label_size(&self, text: &str) -> Point {
        self.text.measure(text, self.label_size_px())
    }

    pub fn anti_alias(&self) -> bool {
        self.settings.antialiasing
    }
}

/// Identity of an entity sprite: the entity and which of its hexes the
/// sprite sits on (−1 for the primary position).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpriteKey {
    pub entity: EntityId,
    pub slot: i32,
}

impl SpriteKey {
    pub fn new(entity: EntityId, slot: i32) -> Self {
        Self { entity, slot }
    }
}

/// Sprite categories in the order they are drawn over the terrain.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpriteLayer {
    Wrecks,
    FieldOfFire,
    Envelope,
    Minefields,
    Cursors,
    Deployment,
    Flares,
    C3Links,
    FlyOvers,
    EntityIcons,
    MovingIcons,
    GhostIcons,
    Attacks,
    MovementVectors,
    PathSteps,
    FiringSolutions,
    Ruler,
}

impl SpriteLayer {
    pub const ORDER: [SpriteLayer; 17] = [
        SpriteLayer::Wrecks,
        SpriteLayer::FieldOfFire,
        SpriteLayer::Envelope,
        SpriteLayer::Minefields,
        SpriteLayer::Cursors,
        SpriteLayer::Deployment,
        SpriteLayer::Flares,
        SpriteLayer::C3Links,
        SpriteLayer::FlyOvers,
        SpriteLayer::EntityIcons,
        SpriteLayer::MovingIcons,
        SpriteLayer::GhostIcons,
        SpriteLayer::Attacks,
        SpriteLayer::MovementVectors,
        SpriteLayer::PathSteps,
        SpriteLayer::FiringSolutions,
        SpriteLayer::Ruler,
    ];
}

/// Movement modes, used for envelopes and path steps.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MovementMode {
    Walk,
    Run,
    Jump,
    Sprint,
}

impl MovementMode {
    pub fn color(self) -> Color {
        match self {
            MovementMode::Walk => Color::from_rgb(40, 200, 60),
            MovementMode::Run => Color::from_rgb(230, 200, 40),
            MovementMode::Jump => Color::from_rgb(200, 60, 200),
            MovementMode::Sprint => Color::from_rgb(60, 160, 230),
        }
    }
}

// ---------------------------------------------------------------------------
// Sprite protocol
// ---------------------------------------------------------------------------

/// Bounds and lazily rendered image of a sprite.
#[derive(Clone, Debug, Default)]
pub struct SpriteImage {
    pub bounds: Rect,
    pub image: Option<Pixmap>,
}

impl SpriteImage {
    /// Moves the sprite to `bounds` and drops the stale image.
    pub fn reset(&mut self, bounds: Rect) {
        self.bounds = bounds;
        self.image = None;
    }
}

/// A drawable board element.
///
/// Implementors provide [`layout`](Sprite::layout) and
/// [`paint`](Sprite::paint); the rest of the protocol has defaults built on
/// the sprite's [`SpriteImage`].
pub trait Sprite {
    fn canvas(&self) -> &SpriteImage;

    fn canvas_mut(&mut self) -> &mut SpriteImage;

    /// Board pixel rectangle the sprite occupies under `ctx`.
    fn layout(&self, ctx: &SpriteContext<'_>) -> Rect;

    /// Draws the sprite into `target`, whose top-left is board pixel
    /// `top_left`.
    fn paint(&self, ctx: &SpriteContext<'_>, target: &mut Pixmap, top_left: Point);

    fn bounds(&self) -> Rect {
        self.canvas().bounds
    }

    /// Sprites with a higher priority are drawn later within their layer.
    fn draw_priority(&self) -> i32 {
        0
    }

    fn is_hidden(&self) -> bool {
        false
    }

    fn is_ready(&self) -> bool {
        self.canvas().image.is_some()
    }

    /// Rasterises the sprite if it has no current image.
    fn prepare(&mut self, ctx: &SpriteContext<'_>) -> Result<(), RenderError> {
        if self.is_ready() {
            return Ok(());
        }
        let bounds = self.bounds();
        if bounds.is_empty() {
            return Ok(());
        }
        let mut image = new_pixmap(bounds.width(), bounds.height())?;
        self.paint(ctx, &mut image, bounds.min);
        self.canvas_mut().image = Some(image);
        Ok(())
    }

    /// Recomputes the bounds after a zoom, board or settings change.
    fn relayout(&mut self, ctx: &SpriteContext<'_>) {
        let bounds = self.layout(ctx);
        self.canvas_mut().reset(bounds);
    }

    /// Draws the prepared image onto `target`, whose top-left is board pixel
    /// `origin`. Unprepared sprites draw nothing.
    fn draw_onto(&self, target: &mut Pixmap, origin: Point, opacity: f32) {
        let canvas = self.canvas();
        if let Some(image) = &canvas.image {
            let at = canvas.bounds.min - origin;
            blit(target, image, at.x, at.y, opacity, None);
        }
    }

    /// Whether board pixel `p` hits the sprite.
    fn is_inside(&self, p: Point) -> bool {
        self.bounds().contains(p)
    }

    fn tooltip(&self) -> Option<String> {
        None
    }
}

/// `p` relative to a sprite image whose top-left is board pixel `top_left`.
pub(crate) fn local(p: Point, top_left: Point) -> Vec2 {
    (p - top_left).to_vec2()
}
