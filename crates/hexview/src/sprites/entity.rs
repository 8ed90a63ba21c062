//! Unit icons, flat and isometric.
//!
//! Both variants share [`IconState`]: the sprite key, the hex it sits on and
//! a weak handle to the entity snapshot. The isometric icon is additionally
//! lifted by the hex's elevation and the unit's height above ground, with a
//! stalk down to the ground when it is airborne or elevated.

use std::sync::{Arc, Weak};

use hexview_core::{Color, EntitySnapshot, HexCoord, Point, Rect, StatusFlags, Vec2};
use hexview_render::Pixmap;
use hexview_render::canvas::{blit, fill_circle, fill_rect, stroke_circle, stroke_line};

use super::{Sprite, SpriteContext, SpriteImage, SpriteKey, local};

const SENSOR_PRIORITY: i32 = 5;
const SENSOR_COLOR: Color = Color::from_rgb(170, 170, 170);
const LABEL_BACKGROUND: Color = Color::from_rgba(0, 0, 0, 150);
const GHOST_OPACITY: f32 = 0.45;

/// How an icon is drawn.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IconStyle {
    Normal,
    /// Known only from a sensor contact: no identity, no label.
    SensorReturn,
    /// The unit at an intermediate waypoint of a movement animation.
    Moving,
    /// Faded copy left at the start hex while the unit animates.
    Ghost,
}

#[derive(Clone, Debug)]
struct IconState {
    key: SpriteKey,
    coord: HexCoord,
    entity: Weak<EntitySnapshot>,
    style: IconStyle,
    hidden: bool,
    label: Option<Rect>,
    canvas: SpriteImage,
}

impl IconState {
    fn new(entity: &Arc<EntitySnapshot>, slot: i32, coord: HexCoord, style: IconStyle) -> Self {
        Self {
            key: SpriteKey::new(entity.id, slot),
            coord,
            entity: Arc::downgrade(entity),
            style,
            hidden: false,
            label: None,
            canvas: SpriteImage::default(),
        }
    }

    fn priority(&self) -> i32 {
        if self.style == IconStyle::SensorReturn {
            return SENSOR_PRIORITY;
        }
        let Some(e) = self.entity.upgrade() else {
            return 0;
        };
        let mut p = e.kind.base_priority();
        if e.status.contains(StatusFlags::SELECTED) {
            p += 3;
        }
        if e.status.contains(StatusFlags::COMMANDER) {
            p += 1;
        }
        p
    }

    fn label_text(&self, ctx: &SpriteContext<'_>) -> Option<String> {
        if !ctx.settings.unit_labels || self.style == IconStyle::SensorReturn {
            return None;
        }
        // Multi-hex units are labelled once, on their first slot.
        if self.key.slot > 0 {
            return None;
        }
        self.entity.upgrade().map(|e| e.name.clone())
    }

    /// Lays out the icon whose hex box is `hex`, returning the icon bounds
    /// (hex box plus label).
    fn layout(&mut self, ctx: &SpriteContext<'_>, hex: Rect) -> Rect {
        self.label = self.label_text(ctx).map(|text| {
            let size = ctx.label_size(&text);
            let center_x = (hex.min.x + hex.max.x) / 2;
            let top = hex.min.y + ctx.geometry.half_height() + icon_radius(ctx).ceil() as i32 + 1;
            Rect::from_xywh(center_x - size.x / 2 - 2, top, size.x + 4, size.y + 2)
        });
        self.canvas.reset(hex.union(self.label.unwrap_or_default()));
        self.canvas.bounds
    }

    fn is_inside(&self, hex: Rect, p: Point, ctx_quarter: i32) -> bool {
        hex.inflate(-ctx_quarter / 2).contains(p) || self.label.is_some_and(|l| l.contains(p))
    }

    fn tooltip(&self) -> Option<String> {
        if self.style == IconStyle::SensorReturn {
            return Some(format!("Sensor return at {}", self.coord.board_label()));
        }
        let e = self.entity.upgrade()?;
        let mut tip = format!("{} ({:?}) at {}", e.name, e.kind, self.coord.board_label());
        if e.is_airborne() {
            tip.push_str(&format!(", altitude {}", e.height_above_ground()));
        } else if e.elevation != 0 {
            tip.push_str(&format!(", elevation {}", e.elevation));
        }
        if e.status.contains(StatusFlags::PRONE) {
            tip.push_str(", prone");
        }
        if e.status.contains(StatusFlags::SHUTDOWN) {
            tip.push_str(", shut down");
        }
        Some(tip)
    }

    /// Draws the disc, glyph, facing and label. `center` is the icon centre
    /// in board pixels.
    fn paint(&self, ctx: &SpriteContext<'_>, target: &mut Pixmap, top_left: Point, center: Point) {
        let aa = ctx.anti_alias();
        let c = local(center, top_left);
        let r = icon_radius(ctx);
        let glyph_px = r * 1.1;

        if self.style == IconStyle::SensorReturn {
            stroke_circle(target, c, r, SENSOR_COLOR, 2.0, aa);
            ctx.text.draw_centered(target, "?", c.x as i32, (c.y - glyph_px / 2.0) as i32, glyph_px, SENSOR_COLOR);
            return;
        }
        let Some(e) = self.entity.upgrade() else {
            return;
        };
        let fill = if e.status.contains(StatusFlags::DONE) {
            shade(e.color, 0.6)
        } else {
            e.color
        };
        fill_circle(target, c, r, fill, aa);
        stroke_circle(target, c, r, Color::BLACK, 1.5, aa);
        if e.status.contains(StatusFlags::SELECTED) {
            stroke_circle(target, c, r + 3.0, Color::WHITE, 2.0, aa);
        }
        if let Some(facing) = e.facing {
            let tip = c + facing.unit_vector() * (r + 5.0);
            stroke_line(target, c + facing.unit_vector() * r, tip, Color::WHITE, 3.0, aa);
        }
        let glyph = if e.status.contains(StatusFlags::PRONE) {
            e.kind.glyph().to_ascii_lowercase()
        } else {
            e.kind.glyph()
        };
        ctx.text.draw_centered(
            target,
            &glyph.to_string(),
            c.x as i32,
            (c.y - glyph_px / 2.0) as i32,
            glyph_px,
            contrast(fill),
        );

        if let (Some(label), Some(text)) = (self.label, self.label_text(ctx)) {
            let at = label.min - top_left;
            fill_rect(
                target,
                at.x as f32,
                at.y as f32,
                label.width() as f32,
                label.height() as f32,
                LABEL_BACKGROUND,
            );
            ctx.text.draw(target, &text, at.shift(2, 1), ctx.label_size_px(), Color::WHITE);
        }
    }

    fn opacity(&self, opacity: f32) -> f32 {
        match self.style {
            IconStyle::Ghost => opacity * GHOST_OPACITY,
            _ => opacity,
        }
    }
}

fn icon_radius(ctx: &SpriteContext<'_>) -> f32 {
    ctx.geometry.hex_height() as f32 * 0.28
}

fn shade(c: Color, factor: f32) -> Color {
    let f = |v: u8| (v as f32 * factor).round() as u8;
    Color::from_rgba(f(c.r()), f(c.g()), f(c.b()), c.a())
}

/// Black or white, whichever reads better on `background`.
fn contrast(background: Color) -> Color {
    let luma = 0.299 * background.r() as f32 + 0.587 * background.g() as f32 + 0.114 * background.b() as f32;
    if luma > 140.0 { Color::BLACK } else { Color::WHITE }
}

// ---------------------------------------------------------------------------
// Flat icon
// ---------------------------------------------------------------------------

/// A unit icon drawn flat on its hex.
#[derive(Clone, Debug)]
pub struct EntitySprite {
    icon: IconState,
    hex: Rect,
    quarter: i32,
}

impl EntitySprite {
    pub fn new(entity: &Arc<EntitySnapshot>, slot: i32, coord: HexCoord, style: IconStyle) -> Self {
        Self {
            icon: IconState::new(entity, slot, coord, style),
            hex: Rect::default(),
            quarter: 0,
        }
    }

    pub fn key(&self) -> SpriteKey {
        self.icon.key
    }

    pub fn coord(&self) -> HexCoord {
        self.icon.coord
    }

    pub fn style(&self) -> IconStyle {
        self.icon.style
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.icon.hidden = hidden;
    }

    /// Label rectangle in board pixels, if the unit is labelled.
    pub fn label_rect(&self) -> Option<Rect> {
        self.icon.label
    }
}

impl Sprite for EntitySprite {
    fn canvas(&self) -> &SpriteImage {
        &self.icon.canvas
    }

    fn canvas_mut(&mut self) -> &mut SpriteImage {
        &mut self.icon.canvas
    }

    fn layout(&self, ctx: &SpriteContext<'_>) -> Rect {
        let mut scratch = self.icon.clone();
        scratch.layout(ctx, ctx.hex_rect(self.icon.coord))
    }

    fn relayout(&mut self, ctx: &SpriteContext<'_>) {
        self.hex = ctx.hex_rect(self.icon.coord);
        self.quarter = ctx.geometry.quarter_width();
        self.icon.layout(ctx, self.hex);
    }

    fn paint(&self, ctx: &SpriteContext<'_>, target: &mut Pixmap, top_left: Point) {
        self.icon
            .paint(ctx, target, top_left, ctx.hex_center(self.icon.coord));
    }

    fn draw_priority(&self) -> i32 {
        self.icon.priority()
    }

    fn is_hidden(&self) -> bool {
        self.icon.hidden
    }

    fn draw_onto(&self, target: &mut Pixmap, origin: Point, opacity: f32) {
        if let Some(image) = &self.icon.canvas.image {
            let at = self.icon.canvas.bounds.min - origin;
            blit(target, image, at.x, at.y, self.icon.opacity(opacity), None);
        }
    }

    fn is_inside(&self, p: Point) -> bool {
        self.icon.is_inside(self.hex, p, self.quarter)
    }

    fn tooltip(&self) -> Option<String> {
        self.icon.tooltip()
    }
}

// ---------------------------------------------------------------------------
// Isometric icon
// ---------------------------------------------------------------------------

/// A unit icon lifted by terrain elevation and the unit's own height.
#[derive(Clone, Debug)]
pub struct IsometricSprite {
    icon: IconState,
    height: i32,
    hex: Rect,
    ground: Rect,
    quarter: i32,
}

impl IsometricSprite {
    pub fn new(entity: &Arc<EntitySnapshot>, slot: i32, coord: HexCoord, style: IconStyle) -> Self {
        Self {
            icon: IconState::new(entity, slot, coord, style),
            height: entity.height_above_ground(),
            hex: Rect::default(),
            ground: Rect::default(),
            quarter: 0,
        }
    }

    pub fn key(&self) -> SpriteKey {
        self.icon.key
    }

    pub fn coord(&self) -> HexCoord {
        self.icon.coord
    }

    /// Levels above the hex surface.
    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.icon.hidden = hidden;
    }

    fn raised(&self, ctx: &SpriteContext<'_>) -> (Rect, Rect) {
        let ground_level = ctx.board.elevation(self.icon.coord).unwrap_or(0);
        let g = ctx.geometry;
        (
            g.hex_rect(self.icon.coord, ground_level + self.height),
            g.hex_rect(self.icon.coord, ground_level),
        )
    }
}

impl Sprite for IsometricSprite {
    fn canvas(&self) -> &SpriteImage {
        &self.icon.canvas
    }

    fn canvas_mut(&mut self) -> &mut SpriteImage {
        &mut self.icon.canvas
    }

    fn layout(&self, ctx: &SpriteContext<'_>) -> Rect {
        let (hex, ground) = self.raised(ctx);
        let mut scratch = self.icon.clone();
        scratch.layout(ctx, hex).union(ground)
    }

    fn relayout(&mut self, ctx: &SpriteContext<'_>) {
        let (hex, ground) = self.raised(ctx);
        self.hex = hex;
        self.ground = ground;
        self.quarter = ctx.geometry.quarter_width();
        let bounds = self.icon.layout(ctx, hex).union(ground);
        self.icon.canvas.reset(bounds);
    }

    fn paint(&self, ctx: &SpriteContext<'_>, target: &mut Pixmap, top_left: Point) {
        let half = Point::new(self.hex.width() / 2, self.hex.height() / 2);
        let center = self.hex.min + half;
        if self.height != 0 {
            let foot = local(self.ground.min + half, top_left);
            let stalk = Vec2::new(foot.x, local(center, top_left).y);
            stroke_line(target, stalk, foot, Color::from_rgba(0, 0, 0, 160), 2.0, ctx.anti_alias());
            fill_circle(target, foot, 3.0, Color::from_rgba(0, 0, 0, 160), ctx.anti_alias());
        }
        self.icon.paint(ctx, target, top_left, center);
    }

    fn draw_priority(&self) -> i32 {
        self.icon.priority()
    }

    fn is_hidden(&self) -> bool {
        self.icon.hidden
    }

    fn draw_onto(&self, target: &mut Pixmap, origin: Point, opacity: f32) {
        if let Some(image) = &self.icon.canvas.image {
            let at = self.icon.canvas.bounds.min - origin;
            blit(target, image, at.x, at.y, self.icon.opacity(opacity), None);
        }
    }

    fn is_inside(&self, p: Point) -> bool {
        self.icon.is_inside(self.hex, p, self.quarter)
    }

    fn tooltip(&self) -> Option<String> {
        self.icon.tooltip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexview_core::{Board, BoardGeometry, EntityId, EntityKind, Hex, VisualSettings};
    use hexview_render::TextRenderer;

    fn unit(name: &str) -> Arc<EntitySnapshot> {
        let mut e = EntitySnapshot::new(EntityId(7), name);
        e.kind = EntityKind::Mek;
        e.position = Some(HexCoord::new(3, 3));
        e.color = Color::from_rgb(200, 30, 30);
        Arc::new(e)
    }

    struct Fixture {
        geometry: BoardGeometry,
        board: Board,
        settings: VisualSettings,
        text: TextRenderer,
    }

    impl Fixture {
        fn new(isometric: bool) -> Self {
            let mut board = Board::new(8, 8);
            board.set(HexCoord::new(3, 3), Hex::at_elevation(2));
            Self {
                geometry: BoardGeometry::default(),
                board,
                settings: VisualSettings {
                    isometric,
                    ..VisualSettings::default()
                },
                text: TextRenderer::without_font(),
            }
        }

        fn ctx(&self) -> SpriteContext<'_> {
            SpriteContext {
                geometry: &self.geometry,
                board: &self.board,
                settings: &self.settings,
                text: &self.text,
                label_px: 11.0,
            }
        }
    }

    #[test]
    fn long_labels_widen_the_bounds() {
        let fx = Fixture::new(false);
        let ctx = fx.ctx();
        let (ux, marauder) = (unit("Ux"), unit("Marauder II MAD-5A Heavy"));
        let mut short = EntitySprite::new(&ux, -1, HexCoord::new(3, 3), IconStyle::Normal);
        let mut long = EntitySprite::new(&marauder, -1, HexCoord::new(3, 3), IconStyle::Normal);
        short.relayout(&ctx);
        long.relayout(&ctx);
        let hex = fx.geometry.hex_rect(HexCoord::new(3, 3), 0);
        assert_eq!(short.bounds(), hex);
        assert!(long.bounds().width() > hex.width());
        let label = long.label_rect().unwrap();
        assert!(long.is_inside(label.min.shift(1, 1)));
    }

    #[test]
    fn labels_follow_the_setting() {
        let mut fx = Fixture::new(false);
        fx.settings.unit_labels = false;
        let ctx = fx.ctx();
        let e = unit("Marauder II MAD-5A Heavy");
        let mut s = EntitySprite::new(&e, -1, HexCoord::new(3, 3), IconStyle::Normal);
        s.relayout(&ctx);
        assert!(s.label_rect().is_none());
        assert_eq!(s.bounds(), fx.geometry.hex_rect(HexCoord::new(3, 3), 0));
    }

    #[test]
    fn priority_rewards_selection_and_command() {
        let mut e = EntitySnapshot::new(EntityId(1), "Cmd");
        e.kind = EntityKind::Vehicle;
        e.status = StatusFlags::SELECTED.with(StatusFlags::COMMANDER);
        let e = Arc::new(e);
        let s = EntitySprite::new(&e, -1, HexCoord::new(0, 0), IconStyle::Normal);
        assert_eq!(s.draw_priority(), EntityKind::Vehicle.base_priority() + 4);
        let sensor = EntitySprite::new(&e, -1, HexCoord::new(0, 0), IconStyle::SensorReturn);
        assert_eq!(sensor.draw_priority(), SENSOR_PRIORITY);
        assert!(sensor.tooltip().unwrap().starts_with("Sensor return"));
    }

    #[test]
    fn isometric_bounds_cover_the_lift() {
        let fx = Fixture::new(true);
        let ctx = fx.ctx();
        let mut e = EntitySnapshot::new(EntityId(2), "VTOL");
        e.altitude = Some(3);
        let e = Arc::new(e);
        let mut s = IsometricSprite::new(&e, -1, HexCoord::new(3, 3), IconStyle::Normal);
        s.relayout(&ctx);
        let ground = fx.geometry.hex_rect(HexCoord::new(3, 3), 2);
        let lifted = fx.geometry.hex_rect(HexCoord::new(3, 3), 5);
        assert_eq!(s.height(), 3);
        assert_eq!(s.bounds().min.y, lifted.min.y);
        assert_eq!(s.bounds().max.y, ground.max.y);
        assert_eq!(s.layout(&ctx), s.bounds());
    }

    #[test]
    fn prepared_icon_draws_its_colour() {
        let fx = Fixture::new(false);
        let ctx = fx.ctx();
        let e = unit("Ux");
        let mut s = EntitySprite::new(&e, -1, HexCoord::new(3, 3), IconStyle::Normal);
        s.relayout(&ctx);
        assert!(!s.is_ready());
        s.prepare(&ctx).unwrap();
        assert!(s.is_ready());

        let mut target = Pixmap::new(420, 420).unwrap();
        s.draw_onto(&mut target, Point::ZERO, 1.0);
        // Just left of the centre avoids the facing mark and glyph.
        let c = fx.geometry.hex_center(HexCoord::new(3, 3), 0).shift(-12, 0);
        let px = target.pixel(c.x as u32, c.y as u32).unwrap().demultiply();
        assert_eq!((px.red(), px.green(), px.blue()), (200, 30, 30));
    }

    #[test]
    fn dropped_entity_leaves_an_empty_icon() {
        let fx = Fixture::new(false);
        let ctx = fx.ctx();
        let e = unit("Gone");
        let mut s = EntitySprite::new(&e, -1, HexCoord::new(3, 3), IconStyle::Normal);
        drop(e);
        s.relayout(&ctx);
        s.prepare(&ctx).unwrap();
        assert!(s.tooltip().is_none());
        assert_eq!(s.draw_priority(), 0);
    }
}
