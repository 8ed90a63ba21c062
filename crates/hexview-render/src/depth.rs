//! Draw order and elevation curtains for the isometric view.
//!
//! In isometric mode every tile is lifted by its elevation, so a tile may
//! cover part of the tiles behind it. Painting back to front resolves this:
//! rows from top to bottom, and within a row the even columns (which sit
//! half a hex higher) before the odd ones. A hex that is higher than a
//! viewer-facing neighbour draws a vertical "curtain" face down to the
//! neighbour's level as part of its own tile; the lower hex never draws the
//! shared face.

use hexview_core::{Board, BoardGeometry, Direction, HexCoord, Rect, Vec2};

/// One step of the board painting pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DrawOp {
    /// The composed base tile of a hex.
    Base(HexCoord),
    /// The ortho layers (bridges) of a hex, drawn after its row.
    Ortho(HexCoord),
}

/// Edges that face the viewer and may carry a curtain.
pub const FRONT_EDGES: [Direction; 3] = [Direction::SE, Direction::S, Direction::SW];

/// Painting order for the hexes visible in `rect`.
///
/// Outside isometric mode this is a plain raster scan and no ortho ops are
/// emitted; bridges are then part of the tile itself.
pub fn draw_order(rect: Rect, board: &Board, geometry: &BoardGeometry, isometric: bool) -> Vec<DrawOp> {
    let span = geometry.visible_span(rect, board, isometric);
    if span.is_empty() {
        return Vec::new();
    }
    let mut ops = Vec::with_capacity(span.cols.len() * span.rows.len());
    for row in span.rows.clone() {
        if !isometric {
            ops.extend(span.cols.clone().map(|col| DrawOp::Base(HexCoord::new(col, row))));
            continue;
        }
        for parity in [0, 1] {
            ops.extend(
                span.cols
                    .clone()
                    .filter(|col| col & 1 == parity)
                    .map(|col| DrawOp::Base(HexCoord::new(col, row))),
            );
        }
        ops.extend(
            span.cols
                .clone()
                .map(|col| HexCoord::new(col, row))
                .filter(|&c| board.get(c).is_some_and(|h| h.bridge.is_some()))
                .map(DrawOp::Ortho),
        );
    }
    ops
}

/// A vertical face on a viewer-facing edge, `delta` levels tall.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Curtain {
    pub direction: Direction,
    pub delta: i32,
}

/// Curtains `c` must draw: one per front edge whose neighbour is lower.
/// Neighbours off the board count as level 0.
pub fn curtain_edges(c: HexCoord, board: &Board) -> Vec<Curtain> {
    let Some(elevation) = board.elevation(c) else {
        return Vec::new();
    };
    FRONT_EDGES
        .iter()
        .filter_map(|&direction| {
            let neighbor = board.elevation(c.translated(direction)).unwrap_or(0);
            let delta = elevation - neighbor;
            (delta > 0).then_some(Curtain { direction, delta })
        })
        .collect()
}

/// The four corners of a curtain face relative to the hex's top-left.
pub fn curtain_polygon(geometry: &BoardGeometry, curtain: Curtain) -> [Vec2; 4] {
    let (a, b) = geometry.edge(curtain.direction);
    let drop = Vec2::new(0.0, geometry.elevation_offset(curtain.delta) as f32);
    [a, b, b + drop, a + drop]
}

/// Extra pixels below the hex box needed to hold `curtains`.
pub fn curtain_depth(geometry: &BoardGeometry, curtains: &[Curtain]) -> i32 {
    curtains
        .iter()
        .map(|c| geometry.elevation_offset(c.delta))
        .max()
        .unwrap_or(0)
}

/// Whether a unit `height` levels above the ground of `c` may be covered by
/// a taller hex drawn in front of it.
pub fn possibly_occluded(c: HexCoord, height: i32, board: &Board) -> bool {
    let Some(ground) = board.elevation(c) else {
        return false;
    };
    let top = ground + height.max(0);
    let south = c.translated(Direction::S);
    [
        c.translated(Direction::SE),
        south,
        c.translated(Direction::SW),
        south.translated(Direction::S),
    ]
    .iter()
    .any(|&n| board.elevation(n).is_some_and(|e| e > top))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexview_core::Hex;

    fn everything(board: &Board, g: &BoardGeometry) -> Rect {
        g.board_rect(board, true)
    }

    #[test]
    fn flat_order_is_a_raster_scan() {
        let board = Board::new(3, 2);
        let g = BoardGeometry::default();
        let ops = draw_order(g.board_rect(&board, false), &board, &g, false);
        let coords: Vec<_> = ops
            .iter()
            .map(|op| match op {
                DrawOp::Base(c) => (c.col, c.row),
                DrawOp::Ortho(_) => panic!("no ortho ops outside isometric mode"),
            })
            .collect();
        assert_eq!(coords, vec![(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)]);
    }

    #[test]
    fn isometric_rows_draw_even_columns_first_then_orthos() {
        let mut board = Board::new(4, 2);
        board.set(HexCoord::new(1, 0), Hex::default().with_bridge(1));
        let g = BoardGeometry::default();
        let ops = draw_order(everything(&board, &g), &board, &g, true);
        let row0: Vec<_> = ops.iter().take(5).copied().collect();
        assert_eq!(
            row0,
            vec![
                DrawOp::Base(HexCoord::new(0, 0)),
                DrawOp::Base(HexCoord::new(2, 0)),
                DrawOp::Base(HexCoord::new(1, 0)),
                DrawOp::Base(HexCoord::new(3, 0)),
                DrawOp::Ortho(HexCoord::new(1, 0)),
            ]
        );
        assert_eq!(ops.len(), 9);
    }

    #[test]
    fn higher_hex_owns_the_shared_curtain() {
        let mut board = Board::new(5, 5);
        let high = HexCoord::new(2, 2);
        let low = high.translated(Direction::S);
        board.set(high, Hex::at_elevation(3));

        let curtains = curtain_edges(high, &board);
        assert!(curtains.contains(&Curtain {
            direction: Direction::S,
            delta: 3
        }));
        assert_eq!(curtains.len(), 3);
        // The lower hex has nothing facing up towards the high hex.
        assert!(curtain_edges(low, &board).is_empty());

        let g = BoardGeometry::default();
        let ops = draw_order(everything(&board, &g), &board, &g, true);
        let pos = |c| ops.iter().position(|op| *op == DrawOp::Base(c));
        assert!(pos(high) < pos(low));
        for d in FRONT_EDGES {
            let n = high.translated(d);
            assert!(pos(high) < pos(n), "{n} drawn before {high}");
        }
    }

    #[test]
    fn off_board_neighbours_count_as_level_zero() {
        let mut board = Board::new(2, 2);
        let edge = HexCoord::new(0, 1);
        board.set(edge, Hex::at_elevation(2));
        let curtains = curtain_edges(edge, &board);
        assert!(curtains.iter().any(|c| c.direction == Direction::S && c.delta == 2));

        // Sunk hexes never draw curtains.
        board.set(edge, Hex::at_elevation(-2));
        assert!(curtain_edges(edge, &board).is_empty());
    }

    #[test]
    fn curtain_face_hangs_from_the_edge() {
        let g = BoardGeometry::default();
        let face = curtain_polygon(
            &g,
            Curtain {
                direction: Direction::S,
                delta: 2,
            },
        );
        let (a, b) = g.edge(Direction::S);
        assert_eq!(face[0], a);
        assert_eq!(face[1], b);
        assert_eq!(face[2].y - b.y, 24.0);
        assert_eq!(
            curtain_depth(
                &g,
                &[
                    Curtain {
                        direction: Direction::S,
                        delta: 2
                    },
                    Curtain {
                        direction: Direction::SE,
                        delta: 5
                    }
                ]
            ),
            60
        );
    }

    #[test]
    fn occlusion_looks_at_hexes_in_front() {
        let mut board = Board::new(5, 6);
        let unit = HexCoord::new(2, 1);
        assert!(!possibly_occluded(unit, 1, &board));
        board.set(HexCoord::new(2, 3), Hex::at_elevation(3));
        assert!(possibly_occluded(unit, 1, &board));
        // A hex behind the unit never hides it.
        let mut behind = Board::new(5, 6);
        behind.set(HexCoord::new(2, 0), Hex::at_elevation(5));
        assert!(!possibly_occluded(unit, 0, &behind));
    }
}
