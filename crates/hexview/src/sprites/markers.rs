//! Single-hex markers: wrecks, path steps, cursors, flares and text.

use std::sync::{Arc, Weak};

use hexview_core::{Color, EntitySnapshot, HexCoord, Point, Rect, Vec2};
use hexview_render::Pixmap;
use hexview_render::canvas::{fill_circle, fill_polygon, fill_rect, stroke_line, stroke_polygon};

use super::{MovementMode, Sprite, SpriteContext, SpriteImage, SpriteKey, local};

/// Polygon of the hex at `c` in a sprite image whose top-left is
/// `top_left`.
fn hex_offset(ctx: &SpriteContext<'_>, c: HexCoord, top_left: Point) -> Vec2 {
    local(ctx.hex_origin(c), top_left)
}

// ---------------------------------------------------------------------------
// Wreck
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct WreckSprite {
    key: SpriteKey,
    coord: HexCoord,
    entity: Weak<EntitySnapshot>,
    canvas: SpriteImage,
}

impl WreckSprite {
    pub fn new(entity: &Arc<EntitySnapshot>, slot: i32, coord: HexCoord) -> Self {
        Self {
            key: SpriteKey::new(entity.id, slot),
            coord,
            entity: Arc::downgrade(entity),
            canvas: SpriteImage::default(),
        }
    }

    pub fn key(&self) -> SpriteKey {
        self.key
    }
}

impl Sprite for WreckSprite {
    fn canvas(&self) -> &SpriteImage {
        &self.canvas
    }

    fn canvas_mut(&mut self) -> &mut SpriteImage {
        &mut self.canvas
    }

    fn layout(&self, ctx: &SpriteContext<'_>) -> Rect {
        ctx.hex_rect(self.coord)
    }

    fn paint(&self, ctx: &SpriteContext<'_>, target: &mut Pixmap, top_left: Point) {
        let aa = ctx.anti_alias();
        let c = local(ctx.hex_center(self.coord), top_left);
        let r = ctx.geometry.hex_height() as f32 * 0.22;
        let tint = self
            .entity
            .upgrade()
            .map_or(Color::from_rgb(90, 90, 90), |e| e.color);
        fill_circle(target, c, r, tint.with_alpha(110), aa);
        let ink = Color::from_rgb(40, 40, 40);
        let d = Vec2::new(r, r);
        let e = Vec2::new(r, -r);
        stroke_line(target, c - d, c + d, ink, 3.0, aa);
        stroke_line(target, c - e, c + e, ink, 3.0, aa);
    }

    fn is_inside(&self, p: Point) -> bool {
        self.canvas.bounds.inflate(-self.canvas.bounds.width() / 5).contains(p)
    }

    fn tooltip(&self) -> Option<String> {
        let e = self.entity.upgrade()?;
        Some(format!("Wreck of {}", e.name))
    }
}

// ---------------------------------------------------------------------------
// Path step
// ---------------------------------------------------------------------------

/// One hex of a planned movement path.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathStep {
    pub coord: HexCoord,
    /// Movement points spent when the step is reached.
    pub mp_used: i32,
    pub mode: MovementMode,
    /// False once the path exceeds what the unit may legally move.
    pub legal: bool,
}

#[derive(Clone, Debug)]
pub struct StepSprite {
    step: PathStep,
    canvas: SpriteImage,
}

impl StepSprite {
    pub fn new(step: PathStep) -> Self {
        Self {
            step,
            canvas: SpriteImage::default(),
        }
    }

    pub fn step(&self) -> &PathStep {
        &self.step
    }
}

impl Sprite for StepSprite {
    fn canvas(&self) -> &SpriteImage {
        &self.canvas
    }

    fn canvas_mut(&mut self) -> &mut SpriteImage {
        &mut self.canvas
    }

    fn layout(&self, ctx: &SpriteContext<'_>) -> Rect {
        ctx.hex_rect(self.step.coord)
    }

    fn paint(&self, ctx: &SpriteContext<'_>, target: &mut Pixmap, top_left: Point) {
        let aa = ctx.anti_alias();
        let color = if self.step.legal {
            self.step.mode.color()
        } else {
            Color::from_rgb(140, 140, 140)
        };
        let c = local(ctx.hex_center(self.step.coord), top_left);
        let r = ctx.geometry.hex_height() as f32 * 0.2;
        fill_circle(target, c, r, color.with_alpha(200), aa);
        let size = ctx.label_size_px();
        ctx.text.draw_centered(
            target,
            &self.step.mp_used.to_string(),
            c.x as i32,
            (c.y - size / 2.0) as i32,
            size,
            Color::BLACK,
        );
    }

    fn tooltip(&self) -> Option<String> {
        let legal = if self.step.legal { "" } else { ", illegal" };
        Some(format!(
            "{:?} {} MP{legal}",
            self.step.mode, self.step.mp_used
        ))
    }
}

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

/// Cursor kinds, in drawing order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CursorKind {
    /// Follows the pointer.
    Highlight,
    Selected,
    /// First end of a line-of-sight query.
    FirstLos,
    /// Second end of a line-of-sight query.
    SecondLos,
}

impl CursorKind {
    pub const ALL: [CursorKind; 4] = [
        CursorKind::Highlight,
        CursorKind::Selected,
        CursorKind::FirstLos,
        CursorKind::SecondLos,
    ];

    pub fn color(self) -> Color {
        match self {
            CursorKind::Highlight => Color::from_rgb(255, 255, 255),
            CursorKind::Selected => Color::from_rgb(70, 130, 255),
            CursorKind::FirstLos => Color::from_rgb(255, 60, 60),
            CursorKind::SecondLos => Color::from_rgb(60, 60, 255),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CursorSprite {
    kind: CursorKind,
    coord: Option<HexCoord>,
    canvas: SpriteImage,
}

impl CursorSprite {
    pub fn new(kind: CursorKind) -> Self {
        Self {
            kind,
            coord: None,
            canvas: SpriteImage::default(),
        }
    }

    pub fn kind(&self) -> CursorKind {
        self.kind
    }

    pub fn coord(&self) -> Option<HexCoord> {
        self.coord
    }

    /// Moves the cursor; the caller relayouts it afterwards.
    pub fn set_coord(&mut self, coord: Option<HexCoord>) {
        self.coord = coord;
    }
}

impl Sprite for CursorSprite {
    fn canvas(&self) -> &SpriteImage {
        &self.canvas
    }

    fn canvas_mut(&mut self) -> &mut SpriteImage {
        &mut self.canvas
    }

    fn layout(&self, ctx: &SpriteContext<'_>) -> Rect {
        self.coord.map_or(Rect::default(), |c| ctx.hex_rect(c))
    }

    fn paint(&self, ctx: &SpriteContext<'_>, target: &mut Pixmap, top_left: Point) {
        let Some(c) = self.coord else {
            return;
        };
        let poly = ctx.geometry.hex_polygon();
        let offset = hex_offset(ctx, c, top_left);
        stroke_polygon(target, &poly, offset, self.kind.color(), 3.0, ctx.anti_alias());
    }

    fn is_hidden(&self) -> bool {
        self.coord.is_none()
    }

    fn is_inside(&self, _p: Point) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Flare
// ---------------------------------------------------------------------------

/// An illumination flare lighting `radius` hexes around its hex.
#[derive(Clone, Debug)]
pub struct FlareSprite {
    coord: HexCoord,
    radius: i32,
    canvas: SpriteImage,
}

impl FlareSprite {
    pub fn new(coord: HexCoord, radius: i32) -> Self {
        Self {
            coord,
            radius: radius.max(0),
            canvas: SpriteImage::default(),
        }
    }

    fn pixel_radius(&self, ctx: &SpriteContext<'_>) -> i32 {
        ctx.geometry.column_stride() * self.radius + ctx.geometry.half_height()
    }
}

impl Sprite for FlareSprite {
    fn canvas(&self) -> &SpriteImage {
        &self.canvas
    }

    fn canvas_mut(&mut self) -> &mut SpriteImage {
        &mut self.canvas
    }

    fn layout(&self, ctx: &SpriteContext<'_>) -> Rect {
        let c = ctx.hex_center(self.coord);
        let r = self.pixel_radius(ctx);
        Rect::from_xywh(c.x - r, c.y - r, 2 * r, 2 * r)
    }

    fn paint(&self, ctx: &SpriteContext<'_>, target: &mut Pixmap, top_left: Point) {
        let aa = ctx.anti_alias();
        let c = local(ctx.hex_center(self.coord), top_left);
        let r = self.pixel_radius(ctx) as f32;
        fill_circle(target, c, r, Color::from_rgba(255, 240, 150, 60), aa);
        fill_circle(target, c, r * 0.15, Color::from_rgba(255, 250, 200, 230), aa);
    }

    fn is_inside(&self, p: Point) -> bool {
        let r = self.canvas.bounds.width() / 2;
        let c = self.canvas.bounds.min.shift(r, r);
        let d = (p - c).to_vec2();
        d.length() <= (r as f32) * 0.15
    }

    fn tooltip(&self) -> Option<String> {
        Some(format!("Flare, radius {}", self.radius))
    }
}

// ---------------------------------------------------------------------------
// Text marker
// ---------------------------------------------------------------------------

/// A short boxed text on a hex: minefields, firing solutions and
/// host-supplied notes.
#[derive(Clone, Debug)]
pub struct TextMarkerSprite {
    coord: HexCoord,
    text: String,
    color: Color,
    tooltip: Option<String>,
    canvas: SpriteImage,
}

impl TextMarkerSprite {
    pub fn new(coord: HexCoord, text: impl Into<String>, color: Color) -> Self {
        Self {
            coord,
            text: text.into(),
            color,
            tooltip: None,
            canvas: SpriteImage::default(),
        }
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    pub fn minefield(coord: HexCoord, density: u32) -> Self {
        Self::new(coord, format!("M{density}"), Color::from_rgb(220, 120, 20))
            .with_tooltip(format!("Minefield, density {density}"))
    }

    /// The to-hit number against the unit at `coord`.
    pub fn firing_solution(coord: HexCoord, to_hit: &str, range: i32) -> Self {
        Self::new(coord, to_hit, Color::from_rgb(240, 40, 40))
            .with_tooltip(format!("To hit {to_hit}, range {range}"))
    }

    pub fn coord(&self) -> HexCoord {
        self.coord
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn box_rect(&self, ctx: &SpriteContext<'_>) -> Rect {
        let size = ctx.label_size(&self.text);
        let hex = ctx.hex_rect(self.coord);
        let center_x = (hex.min.x + hex.max.x) / 2;
        Rect::from_xywh(center_x - size.x / 2 - 3, hex.min.y + 4, size.x + 6, size.y + 4)
    }
}

impl Sprite for TextMarkerSprite {
    fn canvas(&self) -> &SpriteImage {
        &self.canvas
    }

    fn canvas_mut(&mut self) -> &mut SpriteImage {
        &mut self.canvas
    }

    fn layout(&self, ctx: &SpriteContext<'_>) -> Rect {
        self.box_rect(ctx)
    }

    fn paint(&self, ctx: &SpriteContext<'_>, target: &mut Pixmap, _top_left: Point) {
        let (w, h) = (target.width() as f32, target.height() as f32);
        fill_rect(target, 0.0, 0.0, w, h, Color::from_rgba(0, 0, 0, 170));
        let border = [
            Vec2::new(0.5, 0.5),
            Vec2::new(w - 0.5, 0.5),
            Vec2::new(w - 0.5, h - 0.5),
            Vec2::new(0.5, h - 0.5),
        ];
        stroke_polygon(target, &border, Vec2::ZERO, self.color, 1.0, false);
        ctx.text
            .draw(target, &self.text, Point::new(3, 2), ctx.label_size_px(), self.color);
    }

    fn tooltip(&self) -> Option<String> {
        self.tooltip.clone()
    }
}

/// A translucent hex fill, shared by area sprites.
pub(crate) fn fill_hex(ctx: &SpriteContext<'_>, target: &mut Pixmap, c: HexCoord, top_left: Point, color: Color) {
    let poly = ctx.geometry.hex_polygon();
    fill_polygon(target, &poly, hex_offset(ctx, c, top_left), color, ctx.anti_alias(), None);
}
