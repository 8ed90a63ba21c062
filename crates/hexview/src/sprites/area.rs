//! Per-hex area sprites: field-of-fire brackets, movement envelopes and
//! deployment outlines. Each sprite covers one hex and draws the edges where
//! its area ends.

use hexview_core::{Color, Direction, HexCoord, Point, Rect};
use hexview_render::Pixmap;
use hexview_render::canvas::stroke_line;

use super::markers::fill_hex;
use super::{MovementMode, Sprite, SpriteContext, SpriteImage, local};

/// Directions from `c` whose neighbour is not part of the area.
pub fn border_edges(c: HexCoord, inside: impl Fn(HexCoord) -> bool) -> Vec<Direction> {
    Direction::ALL
        .into_iter()
        .filter(|&d| !inside(c.translated(d)))
        .collect()
}

fn draw_edges(
    ctx: &SpriteContext<'_>,
    target: &mut Pixmap,
    c: HexCoord,
    top_left: Point,
    edges: &[Direction],
    color: Color,
    width: f32,
) {
    let offset = local(ctx.hex_origin(c), top_left);
    for &d in edges {
        let (a, b) = ctx.geometry.edge(d);
        stroke_line(target, a + offset, b + offset, color, width, ctx.anti_alias());
    }
}

// ---------------------------------------------------------------------------
// Field of fire
// ---------------------------------------------------------------------------

/// Range bracket colours: short, medium, long, extreme.
const BRACKET_COLORS: [Color; 4] = [
    Color::from_rgb(40, 200, 40),
    Color::from_rgb(230, 230, 40),
    Color::from_rgb(240, 120, 20),
    Color::from_rgb(220, 30, 30),
];

const BRACKET_NAMES: [&str; 4] = ["Short", "Medium", "Long", "Extreme"];

/// One hex of a weapon's field of fire, shaded by range bracket.
#[derive(Clone, Debug)]
pub struct FieldOfFireSprite {
    coord: HexCoord,
    bracket: usize,
    edges: Vec<Direction>,
    canvas: SpriteImage,
}

impl FieldOfFireSprite {
    /// `bracket` is clamped to the extreme bracket; `edges` are the sides
    /// bordering another bracket or outside the field.
    pub fn new(coord: HexCoord, bracket: usize, edges: Vec<Direction>) -> Self {
        Self {
            coord,
            bracket: bracket.min(BRACKET_COLORS.len() - 1),
            edges,
            canvas: SpriteImage::default(),
        }
    }

    pub fn bracket(&self) -> usize {
        self.bracket
    }

    pub fn edges(&self) -> &[Direction] {
        &self.edges
    }
}

impl Sprite for FieldOfFireSprite {
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
        let color = BRACKET_COLORS[self.bracket];
        fill_hex(ctx, target, self.coord, top_left, color.with_alpha(50));
        draw_edges(ctx, target, self.coord, top_left, &self.edges, color, 2.0);
    }

    fn is_inside(&self, _p: Point) -> bool {
        false
    }

    fn tooltip(&self) -> Option<String> {
        Some(format!("{} range", BRACKET_NAMES[self.bracket]))
    }
}

// ---------------------------------------------------------------------------
// Movement envelope
// ---------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    Movement(MovementMode),
    /// A player's deployment zone.
    Deployment,
}

impl EnvelopeKind {
    pub fn color(self) -> Color {
        match self {
            EnvelopeKind::Movement(mode) => mode.color(),
            EnvelopeKind::Deployment => Color::from_rgb(250, 250, 250),
        }
    }
}

/// One hex of a reachable area; only the outline of the area is drawn.
#[derive(Clone, Debug)]
pub struct EnvelopeSprite {
    coord: HexCoord,
    kind: EnvelopeKind,
    edges: Vec<Direction>,
    canvas: SpriteImage,
}

impl EnvelopeSprite {
    pub fn new(coord: HexCoord, kind: EnvelopeKind, edges: Vec<Direction>) -> Self {
        Self {
            coord,
            kind,
            edges,
            canvas: SpriteImage::default(),
        }
    }

    pub fn kind(&self) -> EnvelopeKind {
        self.kind
    }

    pub fn coord(&self) -> HexCoord {
        self.coord
    }
}

impl Sprite for EnvelopeSprite {
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
        let color = self.kind.color();
        if self.kind == EnvelopeKind::Deployment {
            fill_hex(ctx, target, self.coord, top_left, color.with_alpha(40));
        }
        draw_edges(ctx, target, self.coord, top_left, &self.edges, color, 3.0);
    }

    fn is_hidden(&self) -> bool {
        self.edges.is_empty() && self.kind != EnvelopeKind::Deployment
    }

    fn is_inside(&self, _p: Point) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn interior_hexes_have_no_border() {
        let c = HexCoord::new(4, 4);
        let area: HashSet<HexCoord> = std::iter::once(c).chain(c.neighbors()).collect();
        assert!(border_edges(c, |n| area.contains(&n)).is_empty());
        let north = c.translated(Direction::N);
        let edges = border_edges(north, |n| area.contains(&n));
        assert!(edges.contains(&Direction::N));
        assert!(!edges.contains(&Direction::S));
    }

    #[test]
    fn lone_hex_is_fully_bordered() {
        let c = HexCoord::new(1, 1);
        assert_eq!(border_edges(c, |n| n == c).len(), 6);
    }

    #[test]
    fn brackets_clamp_and_name_themselves() {
        let fof = FieldOfFireSprite::new(HexCoord::new(0, 0), 9, Vec::new());
        assert_eq!(fof.bracket(), 3);
        assert_eq!(fof.tooltip().as_deref(), Some("Extreme range"));
    }

    #[test]
    fn interior_envelope_hexes_are_skipped() {
        let inner = EnvelopeSprite::new(HexCoord::new(2, 2), EnvelopeKind::Movement(MovementMode::Walk), Vec::new());
        assert!(inner.is_hidden());
        let zone = EnvelopeSprite::new(HexCoord::new(2, 2), EnvelopeKind::Deployment, Vec::new());
        assert!(!zone.is_hidden());
    }
}
