//! Sprites drawn as lines between two hexes.

use hexview_core::{Color, EntityId, HexCoord, Point, Rect, Vec2};
use hexview_render::Pixmap;
use hexview_render::canvas::{fill_circle, fill_polygon, stroke_line};

use super::{Sprite, SpriteContext, SpriteImage, local};
use crate::attack::{AttackAction, AttackKind, AttackTarget};

/// Extra pixels around a line's end points, for arrow heads and strokes.
const LINE_MARGIN: i32 = 12;

fn line_bounds(ctx: &SpriteContext<'_>, from: HexCoord, to: HexCoord) -> Rect {
    let a = ctx.hex_center(from);
    let b = ctx.hex_center(to);
    Rect::new(a.x, a.y, b.x, b.y).inflate(LINE_MARGIN)
}

fn arrow_head(target: &mut Pixmap, from: Vec2, to: Vec2, size: f32, color: Color, aa: bool) {
    let dir = (to - from).normalized();
    if dir.length() == 0.0 {
        return;
    }
    let normal = Vec2::new(-dir.y, dir.x);
    let base = to - dir * size;
    let points = [to, base + normal * (size * 0.5), base - normal * (size * 0.5)];
    fill_polygon(target, &points, Vec2::ZERO, color, aa, None);
}

/// Distance of `p` from the segment `a`–`b`.
fn segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len2 = ab.dot(ab);
    if len2 == 0.0 {
        return (p - a).length();
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).length()
}

// ---------------------------------------------------------------------------
// Attack line
// ---------------------------------------------------------------------------

const WEAPON_COLOR: Color = Color::from_rgb(230, 40, 40);
const PHYSICAL_COLOR: Color = Color::from_rgb(240, 140, 20);
const SEARCHLIGHT_COLOR: Color = Color::from_rgb(250, 240, 120);

/// All declared attacks between one attacker and one target, merged into a
/// single line. Attacks in the opposite direction make it bidirectional.
#[derive(Clone, Debug)]
pub struct AttackSprite {
    attacker: EntityId,
    target: AttackTarget,
    from: HexCoord,
    to: HexCoord,
    bidirectional: bool,
    weapons: Vec<String>,
    physical: Vec<String>,
    searchlight: bool,
    ends: (Point, Point),
    canvas: SpriteImage,
}

impl AttackSprite {
    /// A line from `from` to `to` carrying `action`.
    pub fn new(action: &AttackAction, from: HexCoord, to: HexCoord) -> Self {
        let mut sprite = Self {
            attacker: action.attacker,
            target: action.target,
            from,
            to,
            bidirectional: false,
            weapons: Vec::new(),
            physical: Vec::new(),
            searchlight: false,
            ends: (Point::ZERO, Point::ZERO),
            canvas: SpriteImage::default(),
        };
        sprite.add_attack(action);
        sprite
    }

    /// Whether `action` belongs on this line, in either direction.
    pub fn matches(&self, action: &AttackAction) -> bool {
        (action.attacker == self.attacker && action.target == self.target) || self.is_reverse(action)
    }

    fn is_reverse(&self, action: &AttackAction) -> bool {
        self.target == AttackTarget::Entity(action.attacker)
            && action.target == AttackTarget::Entity(self.attacker)
    }

    /// Merges `action` into the line. The image is dropped so the next
    /// prepare redraws it.
    pub fn add_attack(&mut self, action: &AttackAction) {
        if self.is_reverse(action) {
            self.bidirectional = true;
        }
        match &action.kind {
            AttackKind::Weapon { name, to_hit } => self.weapons.push(format!("{name}, needs {to_hit}")),
            AttackKind::Searchlight => self.searchlight = true,
            AttackKind::Kick
            | AttackKind::Punch
            | AttackKind::Push
            | AttackKind::Club { .. }
            | AttackKind::Charge
            | AttackKind::Dfa
            | AttackKind::Physical { .. } => self.physical.push(action.kind.label()),
        }
        self.canvas.image = None;
    }

    pub fn is_bidirectional(&self) -> bool {
        self.bidirectional
    }

    /// Number of attacks merged into the line.
    pub fn attack_count(&self) -> usize {
        self.weapons.len() + self.physical.len() + usize::from(self.searchlight)
    }

    pub fn involves(&self, entity: EntityId) -> bool {
        self.attacker == entity || self.target == AttackTarget::Entity(entity)
    }

    fn color(&self) -> Color {
        if !self.weapons.is_empty() {
            WEAPON_COLOR
        } else if !self.physical.is_empty() {
            PHYSICAL_COLOR
        } else {
            SEARCHLIGHT_COLOR
        }
    }
}

impl Sprite for AttackSprite {
    fn canvas(&self) -> &SpriteImage {
        &self.canvas
    }

    fn canvas_mut(&mut self) -> &mut SpriteImage {
        &mut self.canvas
    }

    fn layout(&self, ctx: &SpriteContext<'_>) -> Rect {
        line_bounds(ctx, self.from, self.to)
    }

    fn paint(&self, ctx: &SpriteContext<'_>, target: &mut Pixmap, top_left: Point) {
        let aa = ctx.anti_alias();
        let a = local(ctx.hex_center(self.from), top_left);
        let b = local(ctx.hex_center(self.to), top_left);
        let color = self.color();
        stroke_line(target, a, b, Color::from_rgba(0, 0, 0, 140), 5.0, aa);
        stroke_line(target, a, b, color, 3.0, aa);
        if self.searchlight && (!self.weapons.is_empty() || !self.physical.is_empty()) {
            stroke_line(target, a, b, SEARCHLIGHT_COLOR, 1.0, aa);
        }
        let head = ctx.geometry.hex_height() as f32 * 0.2;
        if self.bidirectional {
            let mid = a + (b - a) * 0.5;
            arrow_head(target, a, mid, head, color, aa);
            arrow_head(target, b, mid, head, color, aa);
        } else {
            arrow_head(target, a, b, head, color, aa);
        }
    }

    fn relayout(&mut self, ctx: &SpriteContext<'_>) {
        self.ends = (ctx.hex_center(self.from), ctx.hex_center(self.to));
        let bounds = self.layout(ctx);
        self.canvas.reset(bounds);
    }

    fn is_inside(&self, p: Point) -> bool {
        let (a, b) = self.ends;
        self.canvas.bounds.contains(p) && segment_distance(p.to_vec2(), a.to_vec2(), b.to_vec2()) <= 4.0
    }

    fn tooltip(&self) -> Option<String> {
        let mut lines = self.weapons.clone();
        lines.extend(self.physical.iter().cloned());
        if self.searchlight {
            lines.push(AttackKind::Searchlight.label());
        }
        Some(lines.join("\n"))
    }
}

// ---------------------------------------------------------------------------
// Plain lines
// ---------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LineKind {
    /// A C3 network link between two units.
    C3,
    /// One segment of an aerospace unit's fly-over path.
    FlyOver,
    MovementVector,
    /// Measuring tape with its hex distance.
    Ruler,
}

#[derive(Clone, Debug)]
pub struct LineSprite {
    kind: LineKind,
    from: HexCoord,
    to: HexCoord,
    color: Color,
    label: Option<String>,
    canvas: SpriteImage,
}

impl LineSprite {
    pub fn new(kind: LineKind, from: HexCoord, to: HexCoord, color: Color) -> Self {
        let label = (kind == LineKind::Ruler).then(|| from.distance(to).to_string());
        Self {
            kind,
            from,
            to,
            color,
            label,
            canvas: SpriteImage::default(),
        }
    }

    pub fn ruler(from: HexCoord, to: HexCoord) -> Self {
        Self::new(LineKind::Ruler, from, to, Color::from_rgb(255, 255, 255))
    }

    pub fn kind(&self) -> LineKind {
        self.kind
    }

    pub fn ends(&self) -> (HexCoord, HexCoord) {
        (self.from, self.to)
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn width(&self) -> f32 {
        match self.kind {
            LineKind::C3 => 2.0,
            LineKind::FlyOver => 4.0,
            LineKind::MovementVector => 3.0,
            LineKind::Ruler => 2.0,
        }
    }
}

impl Sprite for LineSprite {
    fn canvas(&self) -> &SpriteImage {
        &self.canvas
    }

    fn canvas_mut(&mut self) -> &mut SpriteImage {
        &mut self.canvas
    }

    fn layout(&self, ctx: &SpriteContext<'_>) -> Rect {
        let mut r = line_bounds(ctx, self.from, self.to);
        if let Some(label) = &self.label {
            let size = ctx.label_size(label);
            let mid = ctx.hex_center(self.from) + ctx.hex_center(self.to);
            let mid = Point::new(mid.x / 2, mid.y / 2);
            r = r.union(Rect::from_xywh(mid.x - size.x / 2 - 3, mid.y - size.y / 2 - 2, size.x + 6, size.y + 4));
        }
        r
    }

    fn paint(&self, ctx: &SpriteContext<'_>, target: &mut Pixmap, top_left: Point) {
        let aa = ctx.anti_alias();
        let a = local(ctx.hex_center(self.from), top_left);
        let b = local(ctx.hex_center(self.to), top_left);
        stroke_line(target, a, b, self.color, self.width(), aa);
        match self.kind {
            LineKind::MovementVector => {
                arrow_head(target, a, b, ctx.geometry.hex_height() as f32 * 0.2, self.color, aa);
            }
            LineKind::FlyOver | LineKind::Ruler => {
                fill_circle_at(target, a, self.color, aa);
                fill_circle_at(target, b, self.color, aa);
            }
            LineKind::C3 => {}
        }
        if let Some(label) = &self.label {
            let mid = a + (b - a) * 0.5;
            let size = ctx.label_size_px();
            ctx.text.draw_centered(
                target,
                label,
                mid.x as i32,
                (mid.y - size / 2.0) as i32,
                size,
                self.color,
            );
        }
    }

    fn is_inside(&self, p: Point) -> bool {
        self.kind == LineKind::Ruler && self.canvas.bounds.contains(p)
    }

    fn tooltip(&self) -> Option<String> {
        match self.kind {
            LineKind::Ruler => Some(format!(
                "{} to {}: {} hexes",
                self.from.board_label(),
                self.to.board_label(),
                self.from.distance(self.to)
            )),
            _ => None,
        }
    }
}

fn fill_circle_at(target: &mut Pixmap, at: Vec2, color: Color, aa: bool) {
    fill_circle(target, at, 3.0, color, aa);
}
