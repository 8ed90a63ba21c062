//! Board-wide shadow overlay.
//!
//! The map is built once per board/light combination at zoom 1.0 and
//! sampled by every tile at composition time. Hexes are grouped by
//! elevation and each level gets a clip mask. Raised structures (foliage,
//! buildings) are swept along the light vector first, then every level's
//! silhouette is swept onto each lower level by a distance proportional to
//! the height difference, clipped to that level's mask.

use std::collections::BTreeMap;

use hexview_core::{Board, BoardGeometry, Color, Direction, HexCoord, Light, Point, Vec2};
use tiny_skia::{FillRule, Mask, Pixmap, PixmapPaint, PremultipliedColorU8, Transform};

use crate::canvas::{fill_polygon, hex_path, new_pixmap};
use crate::error::RenderError;

/// Opacity of a fully shadowed pixel.
pub const SHADOW_ALPHA: f32 = 0.35;

/// Pixel distance between consecutive stamps of a sweep.
const SWEEP_STEP: f32 = 2.0;

/// The precomputed shadow overlay for one board under one light.
pub struct ShadowMap {
    image: Pixmap,
    light: Light,
}

impl std::fmt::Debug for ShadowMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowMap")
            .field("light", &self.light)
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .finish()
    }
}

impl ShadowMap {
    /// Compute the overlay for `board` under `light`. Lights without a
    /// direction produce a fully transparent map.
    pub fn generate(board: &Board, light: Light) -> Result<Self, RenderError> {
        let geometry = BoardGeometry::default();
        let size = geometry.board_size(board);
        let mut acc = new_pixmap(size.x, size.y)?;
        if !light.casts_shadows() || board.width() == 0 || board.height() == 0 {
            return Ok(Self { image: acc, light });
        }
        let dir = light.direction();
        let stamp = hex_stamp(&geometry)?;
        let origin = |c: HexCoord| geometry.hex_to_pixel(c, 0).to_vec2();

        let mut levels: BTreeMap<i32, Vec<HexCoord>> = BTreeMap::new();
        for (c, hex) in board.iter() {
            levels.entry(hex.elevation).or_default().push(c);
        }
        let mut masks: BTreeMap<i32, Mask> = BTreeMap::new();
        for (&level, coords) in &levels {
            let mut mask = new_mask(size)?;
            for &c in coords {
                if let Some(path) = hex_path(&geometry, origin(c)) {
                    mask.fill_path(&path, FillRule::Winding, true, Transform::identity());
                }
            }
            masks.insert(level, mask);
        }

        for (c, hex) in board.iter() {
            let height = hex.structure_height();
            if height > 0 {
                sweep(&mut acc, &stamp, origin(c), dir * height as f32, None);
            }
            if let Some(bridge) = hex.bridge.filter(|b| b.elevation > 0) {
                let deck = hex.elevation + bridge.elevation;
                let clip = union_below(&masks, deck, size)?;
                draw_stamp(&mut acc, &stamp, origin(c) + dir * bridge.elevation as f32, Some(&clip));
            }
        }

        let facing = light_facing_directions(dir);
        for (&level, coords) in &levels {
            let casters: Vec<HexCoord> = coords
                .iter()
                .copied()
                .filter(|&c| !is_surrounded(c, level, &facing, board))
                .collect();
            if casters.is_empty() {
                continue;
            }
            for (&lower, mask) in masks.range(..level) {
                let offset = dir * (level - lower) as f32;
                for &c in &casters {
                    sweep(&mut acc, &stamp, origin(c), offset, Some(mask));
                }
            }
        }

        apply_alpha(&mut acc, SHADOW_ALPHA);
        log::debug!(
            "generated {}x{} shadow map for {:?} over {} levels",
            size.x,
            size.y,
            light,
            levels.len()
        );
        Ok(Self { image: acc, light })
    }

    /// The overlay at zoom 1.0, aligned with board pixel coordinates.
    pub fn image(&self) -> &Pixmap {
        &self.image
    }

    pub fn light(&self) -> Light {
        self.light
    }

    /// Shadow opacity at board pixel `p` (zoom 1.0); zero outside the map.
    pub fn alpha_at(&self, p: Point) -> u8 {
        if p.x < 0 || p.y < 0 {
            return 0;
        }
        self.image
            .pixel(p.x as u32, p.y as u32)
            .map_or(0, |c| c.alpha())
    }
}

/// The three neighbour directions most aligned with the light vector, i.e.
/// the sides a hex throws its shadow across.
pub fn light_facing_directions(light: Vec2) -> [Direction; 3] {
    let mut dirs = Direction::ALL;
    dirs.sort_by(|a, b| b.unit_vector().dot(light).total_cmp(&a.unit_vector().dot(light)));
    [dirs[0], dirs[1], dirs[2]]
}

/// A hex whose light-facing neighbours are all at least as high casts no
/// shadow of its own; the neighbours' silhouettes cover it. Off-board
/// neighbours count as covering.
fn is_surrounded(c: HexCoord, level: i32, facing: &[Direction; 3], board: &Board) -> bool {
    facing
        .iter()
        .all(|&d| board.elevation(c.translated(d)).is_none_or(|e| e >= level))
}

fn new_mask(size: Point) -> Result<Mask, RenderError> {
    let (w, h) = (size.x.max(1) as u32, size.y.max(1) as u32);
    Mask::new(w, h).ok_or(RenderError::Allocation {
        width: w,
        height: h,
    })
}

fn union_below(masks: &BTreeMap<i32, Mask>, level: i32, size: Point) -> Result<Mask, RenderError> {
    let mut out = new_mask(size)?;
    for (_, m) in masks.range(..level) {
        for (d, s) in out.data_mut().iter_mut().zip(m.data()) {
            *d = (*d).max(*s);
        }
    }
    Ok(out)
}

fn hex_stamp(geometry: &BoardGeometry) -> Result<Pixmap, RenderError> {
    let mut pm = new_pixmap(geometry.hex_width(), geometry.hex_height())?;
    fill_polygon(&mut pm, &geometry.hex_polygon(), Vec2::ZERO, Color::BLACK, true, None);
    Ok(pm)
}

fn draw_stamp(acc: &mut Pixmap, stamp: &Pixmap, at: Vec2, clip: Option<&Mask>) {
    acc.draw_pixmap(
        0,
        0,
        stamp.as_ref(),
        &PixmapPaint::default(),
        Transform::from_translate(at.x, at.y),
        clip,
    );
}

/// Stamps `stamp` repeatedly from `origin` along `offset`.
fn sweep(acc: &mut Pixmap, stamp: &Pixmap, origin: Vec2, offset: Vec2, clip: Option<&Mask>) {
    let steps = (offset.length() / SWEEP_STEP).ceil().max(1.0) as i32;
    for i in 1..=steps {
        let t = i as f32 / steps as f32;
        draw_stamp(acc, stamp, origin + offset * t, clip);
    }
}

fn apply_alpha(acc: &mut Pixmap, alpha: f32) {
    for px in acc.pixels_mut() {
        if px.alpha() == 0 {
            continue;
        }
        let a = (px.alpha() as f32 * alpha).round() as u8;
        if let Some(c) = PremultipliedColorU8::from_rgba(0, 0, 0, a) {
            *px = c;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexview_core::Hex;

    #[test]
    fn day_light_throws_shadows_west_and_south() {
        let facing = light_facing_directions(Light::Day.direction());
        for d in [Direction::SW, Direction::NW, Direction::S] {
            assert!(facing.contains(&d), "{d:?} missing from {facing:?}");
        }
    }

    #[test]
    fn dark_nights_produce_an_empty_map() {
        let mut board = Board::new(4, 4);
        board.set(HexCoord::new(1, 1), Hex::at_elevation(5));
        let map = ShadowMap::generate(&board, Light::Moonless).unwrap();
        assert!(map.image().pixels().iter().all(|p| p.alpha() == 0));
        assert_eq!(map.light(), Light::Moonless);
    }

    #[test]
    fn flat_board_has_no_shadow() {
        let board = Board::new(4, 4);
        let map = ShadowMap::generate(&board, Light::Day).unwrap();
        assert!(map.image().pixels().iter().all(|p| p.alpha() == 0));
    }

    #[test]
    fn raised_hex_shades_its_lower_neighbour_only() {
        let mut board = Board::new(6, 6);
        let hill = HexCoord::new(3, 2);
        board.set(hill, Hex::at_elevation(3));
        let map = ShadowMap::generate(&board, Light::Day).unwrap();
        let g = BoardGeometry::default();

        // Just past the hill's west vertex, inside the lower neighbour.
        let west = g.hex_to_pixel(hill, 0).shift(-8, g.half_height() + 2);
        let expected = (255.0 * SHADOW_ALPHA).round() as u8;
        assert_eq!(map.alpha_at(west), expected);

        // The hill itself and the lit side stay clear.
        assert_eq!(map.alpha_at(g.hex_center(hill, 0)), 0);
        assert_eq!(map.alpha_at(g.hex_center(HexCoord::new(5, 2), 0)), 0);
    }

    #[test]
    fn structure_shadow_is_not_clipped() {
        let mut board = Board::new(6, 6);
        let woods = HexCoord::new(3, 2);
        board.set(woods, Hex::default().with_foliage(2));
        let map = ShadowMap::generate(&board, Light::Day).unwrap();
        let g = BoardGeometry::default();
        let beside = g.hex_center(woods, 0).shift(-45, 10);
        assert!(!g.polygon_contains(woods, 0, beside));
        assert!(map.alpha_at(beside) > 0);
        assert_eq!(map.alpha_at(Point::new(-1, 5)), 0);
    }

    #[test]
    fn bridge_shadow_stays_below_the_deck() {
        let mut board = Board::new(6, 6);
        let span = HexCoord::new(2, 2);
        board.set(span, Hex::default().with_bridge(2));
        // A neighbour as high as the deck must stay clear.
        let g = BoardGeometry::default();
        for d in Direction::ALL {
            board.set(span.translated(d), Hex::at_elevation(2));
        }
        let map = ShadowMap::generate(&board, Light::Day).unwrap();
        let sw = span.translated(Direction::SW);
        // Only elevation shadows from the ring can reach the bridge hex;
        // the deck itself never darkens its raised neighbours.
        assert_eq!(map.alpha_at(g.hex_center(sw, 0)), 0);
    }
}
