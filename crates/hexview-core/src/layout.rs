//! [`BoardGeometry`]: the single source of truth for hex ↔ pixel arithmetic.
//!
//! Hexes are flat-topped and laid out in columns. Adjacent columns interlock,
//! so the horizontal stride is three quarters of a hex width, and odd columns
//! sit half a hex lower. The board is surrounded by one hex of padding. In
//! isometric mode every elevation level lifts a tile by a fixed per-scale
//! step.
//!
//! Every component derives pixel positions from a `BoardGeometry` so that
//! zoom-dependent rounding never drifts between tiles, sprites and hit tests.

use std::ops::Range;

use crate::board::Board;
use crate::geom::{Point, Rect, Vec2};
use crate::hex::{Direction, HexCoord};

/// Hex width in pixels at scale 1.0.
pub const HEX_W: i32 = 84;
/// Hex height in pixels at scale 1.0.
pub const HEX_H: i32 = 72;
/// Vertical displacement per elevation level in isometric mode at scale 1.0.
pub const HEX_ELEV: i32 = 12;

/// The discrete zoom levels.
pub const ZOOM_FACTORS: [f32; 14] = [
    0.30, 0.41, 0.50, 0.60, 0.68, 0.79, 0.90, 1.00, 1.09, 1.17, 1.30, 1.50, 1.80, 2.20,
];

/// Index of scale 1.0 in [`ZOOM_FACTORS`].
pub const BASE_ZOOM_INDEX: usize = 7;

/// Column and row ranges (half-open) of hexes touching a pixel rectangle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HexSpan {
    pub cols: Range<i32>,
    pub rows: Range<i32>,
}

impl HexSpan {
    pub fn is_empty(&self) -> bool {
        self.cols.is_empty() || self.rows.is_empty()
    }
}

/// Derived, read-only pixel geometry for one zoom level.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoardGeometry {
    zoom_index: usize,
    scale: f32,
    hex_w: i32,
    hex_h: i32,
    quarter_w: i32,
    half_h: i32,
    stride: i32,
    elev_step: f32,
}

impl Default for BoardGeometry {
    fn default() -> Self {
        Self::new(BASE_ZOOM_INDEX)
    }
}

impl BoardGeometry {
    /// Geometry for a zoom index; out-of-range indices are clamped.
    pub fn new(zoom_index: usize) -> Self {
        let zoom_index = zoom_index.min(ZOOM_FACTORS.len() - 1);
        let scale = ZOOM_FACTORS[zoom_index];
        let hex_w = ((HEX_W as f32 * scale).round() as i32).max(4);
        // Kept even so odd columns interlock on exact pixel edges.
        let half_h = (((HEX_H / 2) as f32 * scale).round() as i32).max(2);
        let hex_h = half_h * 2;
        let quarter_w = hex_w / 4;
        Self {
            zoom_index,
            scale,
            hex_w,
            hex_h,
            quarter_w,
            half_h,
            stride: hex_w - quarter_w,
            elev_step: HEX_ELEV as f32 * scale,
        }
    }

    /// Geometry for a signed zoom index, clamping negatives to zero.
    pub fn clamped(zoom_index: i32) -> Self {
        Self::new(zoom_index.max(0) as usize)
    }

    #[inline]
    pub fn zoom_index(&self) -> usize {
        self.zoom_index
    }

    #[inline]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// One step closer, or `None` at the maximum zoom.
    pub fn zoomed_in(&self) -> Option<Self> {
        (self.zoom_index + 1 < ZOOM_FACTORS.len()).then(|| Self::new(self.zoom_index + 1))
    }

    /// One step further out, or `None` at the minimum zoom.
    pub fn zoomed_out(&self) -> Option<Self> {
        self.zoom_index
            .checked_sub(1)
            .map(Self::new)
    }

    #[inline]
    pub fn hex_width(&self) -> i32 {
        self.hex_w
    }

    #[inline]
    pub fn hex_height(&self) -> i32 {
        self.hex_h
    }

    #[inline]
    pub fn half_height(&self) -> i32 {
        self.half_h
    }

    #[inline]
    pub fn quarter_width(&self) -> i32 {
        self.quarter_w
    }

    /// Horizontal distance between adjacent column origins.
    #[inline]
    pub fn column_stride(&self) -> i32 {
        self.stride
    }

    /// Margin around the board in pixels.
    #[inline]
    pub fn padding(&self) -> Point {
        Point::new(self.hex_w, self.hex_h)
    }

    /// Vertical pixel lift of `levels` elevation levels.
    #[inline]
    pub fn elevation_offset(&self, levels: i32) -> i32 {
        (levels as f32 * self.elev_step).round() as i32
    }

    /// Pixel size of the board including padding, ignoring elevation.
    pub fn board_size(&self, board: &Board) -> Point {
        let pad = self.padding();
        Point::new(
            2 * pad.x + board.width() * self.stride + self.quarter_w,
            2 * pad.y + board.height() * self.hex_h + self.half_h,
        )
    }

    /// Pixel rectangle covering the whole board; in isometric mode it grows
    /// to include tiles lifted above or sunk below the padding.
    pub fn board_rect(&self, board: &Board, isometric: bool) -> Rect {
        let size = self.board_size(board);
        let r = Rect::from_xywh(0, 0, size.x, size.y);
        if !isometric {
            return r;
        }
        let up = self.elevation_offset(board.max_elevation().max(0));
        let down = self.elevation_offset((-board.min_elevation()).max(0));
        Rect::new(r.min.x, r.min.y - up, r.max.x, r.max.y + down)
    }

    /// Top-left pixel of the hex's bounding box, lifted by `elevation` levels
    /// (pass 0 outside isometric mode).
    pub fn hex_to_pixel(&self, c: HexCoord, elevation: i32) -> Point {
        let pad = self.padding();
        let odd_shift = if c.is_odd_column() { self.half_h } else { 0 };
        Point::new(
            pad.x + c.col * self.stride,
            pad.y + c.row * self.hex_h + odd_shift - self.elevation_offset(elevation),
        )
    }

    /// Centre pixel of the hex.
    pub fn hex_center(&self, c: HexCoord, elevation: i32) -> Point {
        self.hex_to_pixel(c, elevation)
            .shift(self.hex_w / 2, self.half_h)
    }

    /// Bounding rectangle of the hex.
    pub fn hex_rect(&self, c: HexCoord, elevation: i32) -> Rect {
        let p = self.hex_to_pixel(c, elevation);
        Rect::from_xywh(p.x, p.y, self.hex_w, self.hex_h)
    }

    /// The six polygon vertices relative to the hex's top-left, clockwise
    /// from the top-left vertex. Edge `d` runs from vertex `d` to `d + 1`.
    pub fn hex_polygon(&self) -> [Vec2; 6] {
        let w = self.hex_w as f32;
        let h = self.hex_h as f32;
        let q = self.quarter_w as f32;
        let h2 = self.half_h as f32;
        [
            Vec2::new(q, 0.0),
            Vec2::new(w - q, 0.0),
            Vec2::new(w, h2),
            Vec2::new(w - q, h),
            Vec2::new(q, h),
            Vec2::new(0.0, h2),
        ]
    }

    /// Endpoints of the edge facing `dir`, relative to the hex's top-left.
    pub fn edge(&self, dir: Direction) -> (Vec2, Vec2) {
        let poly = self.hex_polygon();
        let i = dir.index();
        (poly[i], poly[(i + 1) % 6])
    }

    /// Whether pixel `p` lies inside (or on the border of) the hex polygon
    /// of `c` lifted by `elevation`.
    pub fn polygon_contains(&self, c: HexCoord, elevation: i32, p: Point) -> bool {
        let origin = self.hex_to_pixel(c, elevation).to_vec2();
        let pt = p.to_vec2() - origin;
        let poly = self.hex_polygon();
        (0..6).all(|i| {
            let a = poly[i];
            let b = poly[(i + 1) % 6];
            (b.x - a.x) * (pt.y - a.y) - (b.y - a.y) * (pt.x - a.x) >= 0.0
        })
    }

    /// Column of the stride band containing pixel x.
    #[inline]
    fn column_at(&self, x: i32) -> i32 {
        (x - self.padding().x).div_euclid(self.stride)
    }

    /// Row estimate for pixel y within `col`, ignoring elevation.
    #[inline]
    fn row_at(&self, col: i32, y: i32) -> i32 {
        let odd_shift = if col & 1 == 1 { self.half_h } else { 0 };
        (y - self.padding().y - odd_shift).div_euclid(self.hex_h)
    }

    /// The hex under pixel `p`, or [`HexCoord::INVALID`] off the board.
    ///
    /// Border pixels are resolved against the true polygons of the naive
    /// estimate and its neighbours. In isometric mode candidates around the
    /// estimate are searched from the highest elevation down, since a tall
    /// hex can cover part of a lower neighbour's box.
    pub fn pixel_to_hex(&self, p: Point, board: &Board, isometric: bool) -> HexCoord {
        if isometric && (board.max_elevation() != 0 || board.min_elevation() != 0) {
            return self.pixel_to_hex_isometric(p, board);
        }
        let col = self.column_at(p.x);
        let estimate = HexCoord::new(col, self.row_at(col, p.y));
        let hit = std::iter::once(estimate)
            .chain(estimate.neighbors())
            .find(|&c| self.polygon_contains(c, 0, p));
        match hit {
            Some(c) if board.contains(c) => c,
            _ => HexCoord::INVALID,
        }
    }

    fn pixel_to_hex_isometric(&self, p: Point, board: &Board) -> HexCoord {
        let up_rows = self.rows_for(board.max_elevation().max(0));
        let down_rows = self.rows_for((-board.min_elevation()).max(0));
        let col_est = self.column_at(p.x);

        let mut candidates: Vec<(HexCoord, i32)> = Vec::new();
        for col in (col_est - 1)..=(col_est + 1) {
            let row_est = self.row_at(col, p.y);
            for row in (row_est - 1 - down_rows)..=(row_est + 1 + up_rows) {
                let c = HexCoord::new(col, row);
                if let Some(elev) = board.elevation(c) {
                    candidates.push((c, elev));
                }
            }
        }
        // Highest first; equal heights resolve to whichever is drawn later.
        candidates.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then(b.0.row.cmp(&a.0.row))
                .then((b.0.col & 1).cmp(&(a.0.col & 1)))
        });
        candidates
            .into_iter()
            .find(|&(c, elev)| self.polygon_contains(c, elev, p))
            .map_or(HexCoord::INVALID, |(c, _)| c)
    }

    /// Rows spanned by the lift of `levels` elevation levels, rounded up.
    fn rows_for(&self, levels: i32) -> i32 {
        let px = self.elevation_offset(levels);
        (px + self.hex_h - 1) / self.hex_h
    }

    /// Columns and rows of on-board hexes whose flat footprint touches
    /// `rect`. In isometric mode the rows widen by the board's elevation
    /// range so lifted or sunk tiles are not missed.
    pub fn visible_span(&self, rect: Rect, board: &Board, isometric: bool) -> HexSpan {
        let (extra_above, extra_below) = if isometric {
            (
                self.rows_for((-board.min_elevation()).max(0)),
                self.rows_for(board.max_elevation().max(0)),
            )
        } else {
            (0, 0)
        };
        let col0 = (self.column_at(rect.min.x) - 1).max(0);
        let col1 = (self.column_at(rect.max.x) + 2).min(board.width());
        let row0 = (self.row_at(0, rect.min.y) - 1 - extra_above).max(0);
        let row1 = (self.row_at(0, rect.max.y) + 2 + extra_below).min(board.height());
        HexSpan {
            cols: col0..col1.max(col0),
            rows: row0..row1.max(row0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Hex;

    #[test]
    fn zoom_index_is_clamped() {
        assert_eq!(BoardGeometry::new(99).zoom_index(), ZOOM_FACTORS.len() - 1);
        assert_eq!(BoardGeometry::clamped(-3).zoom_index(), 0);
        assert_eq!(BoardGeometry::new(BASE_ZOOM_INDEX).scale(), 1.0);
        assert!(BoardGeometry::new(0).zoomed_out().is_none());
        assert!(BoardGeometry::new(ZOOM_FACTORS.len() - 1).zoomed_in().is_none());
    }

    #[test]
    fn base_scale_dimensions() {
        let g = BoardGeometry::default();
        assert_eq!(g.hex_width(), 84);
        assert_eq!(g.hex_height(), 72);
        assert_eq!(g.column_stride(), 63);
        assert_eq!(g.hex_to_pixel(HexCoord::new(0, 0), 0), Point::new(84, 72));
        assert_eq!(g.hex_to_pixel(HexCoord::new(1, 0), 0), Point::new(147, 108));
        assert_eq!(g.hex_to_pixel(HexCoord::new(0, 0), 2), Point::new(84, 48));
    }

    #[test]
    fn center_round_trip_all_zooms() {
        let board = Board::new(12, 9);
        for z in 0..ZOOM_FACTORS.len() {
            let g = BoardGeometry::new(z);
            for c in board.coords() {
                let center = g.hex_center(c, 0);
                assert_eq!(g.pixel_to_hex(center, &board, false), c, "zoom {z} coord {c:?}");
            }
        }
    }

    #[test]
    fn border_pixels_resolve_by_polygon() {
        let g = BoardGeometry::default();
        let board = Board::new(4, 4);
        // Just left of hex (1,0)'s left vertex the point belongs to column 0.
        let origin = g.hex_to_pixel(HexCoord::new(1, 0), 0);
        let p = origin.shift(2, g.half_height() + g.hex_height() / 2 - 2);
        let c = g.pixel_to_hex(p, &board, false);
        assert_eq!(c.col, 0);
        // Inside the left tip the same column wins.
        let p = origin.shift(g.quarter_width() + 2, g.half_height());
        assert_eq!(g.pixel_to_hex(p, &board, false), HexCoord::new(1, 0));
    }

    #[test]
    fn off_board_points_are_invalid() {
        let g = BoardGeometry::default();
        let board = Board::new(3, 3);
        assert_eq!(g.pixel_to_hex(Point::new(5, 5), &board, false), HexCoord::INVALID);
        assert_eq!(g.pixel_to_hex(Point::new(-500, 40), &board, false), HexCoord::INVALID);
        let far = g.hex_center(HexCoord::new(5, 5), 0);
        assert_eq!(g.pixel_to_hex(far, &board, false), HexCoord::INVALID);
    }

    #[test]
    fn isometric_prefers_tall_hex_covering_lower_neighbor() {
        let g = BoardGeometry::default();
        let mut board = Board::new(5, 5);
        let tall = HexCoord::new(2, 3);
        board.set(tall, Hex::at_elevation(6));
        // The tall hex is lifted by 72 px, a full hex: its centre now sits
        // where the flat centre of (2, 2) would be.
        let covered = g.hex_center(HexCoord::new(2, 2), 0);
        assert_eq!(g.pixel_to_hex(covered, &board, true), tall);
        assert_eq!(g.pixel_to_hex(covered, &board, false), HexCoord::new(2, 2));
        // Its own lifted centre resolves to it too.
        assert_eq!(g.pixel_to_hex(g.hex_center(tall, 6), &board, true), tall);
    }

    #[test]
    fn isometric_round_trip_on_flat_board() {
        let g = BoardGeometry::new(5);
        let board = Board::new(6, 6);
        for c in board.coords() {
            assert_eq!(g.pixel_to_hex(g.hex_center(c, 0), &board, true), c);
        }
    }

    #[test]
    fn zoom_in_scales_positions_and_keeps_hit_test() {
        let base = BoardGeometry::new(BASE_ZOOM_INDEX);
        let zoomed = base.zoomed_in().unwrap();
        let board = Board::new(8, 8);
        let c = HexCoord::new(0, 0);
        let p0 = base.hex_to_pixel(c, 0);
        let p1 = zoomed.hex_to_pixel(c, 0);
        let ratio = zoomed.scale() / base.scale();
        assert!(((p1.x as f32) - p0.x as f32 * ratio).abs() <= 1.0);
        assert!(((p1.y as f32) - p0.y as f32 * ratio).abs() <= 1.0);
        assert_eq!(zoomed.pixel_to_hex(zoomed.hex_center(c, 0), &board, false), c);
    }

    #[test]
    fn edges_are_shared_between_neighbors() {
        let g = BoardGeometry::default();
        let c = HexCoord::new(2, 2);
        for d in Direction::ALL {
            let n = c.translated(d);
            let (a, b) = g.edge(d);
            let (na, nb) = g.edge(d.opposite());
            let o = g.hex_to_pixel(c, 0).to_vec2();
            let no = g.hex_to_pixel(n, 0).to_vec2();
            // Same segment, opposite orientation.
            assert_eq!(o + a, no + nb, "direction {d:?}");
            assert_eq!(o + b, no + na, "direction {d:?}");
        }
    }

    #[test]
    fn visible_span_clamps_to_board() {
        let g = BoardGeometry::default();
        let board = Board::new(10, 10);
        let all = g.visible_span(g.board_rect(&board, false), &board, false);
        assert_eq!(all.cols, 0..10);
        assert_eq!(all.rows, 0..10);
        let none = g.visible_span(Rect::from_xywh(-5000, -5000, 10, 10), &board, false);
        assert!(none.is_empty());
    }
}
