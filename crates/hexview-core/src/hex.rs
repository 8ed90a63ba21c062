//! Offset hex coordinates and the six hex directions.
//!
//! The board is a column-offset grid of flat-topped hexes: odd columns sit
//! half a hex lower than even columns.

use std::fmt;

/// One of the six edges/neighbour directions of a flat-topped hex,
/// clockwise from north.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    N = 0,
    NE = 1,
    SE = 2,
    S = 3,
    SW = 4,
    NW = 5,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::N,
        Direction::NE,
        Direction::SE,
        Direction::S,
        Direction::SW,
        Direction::NW,
    ];

    /// Direction from an index, wrapping modulo 6.
    #[inline]
    pub const fn from_index(i: i32) -> Self {
        Self::ALL[i.rem_euclid(6) as usize]
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn opposite(self) -> Self {
        Self::from_index(self as i32 + 3)
    }

    /// Screen-space unit vector pointing from a hex centre through this edge.
    pub fn unit_vector(self) -> crate::geom::Vec2 {
        // Angles measured clockwise from north, 60 degrees apart.
        let angle = (self as i32 as f32) * std::f32::consts::FRAC_PI_3;
        crate::geom::Vec2::new(angle.sin(), -angle.cos())
    }
}

/// An integer `(col, row)` board coordinate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HexCoord {
    pub col: i32,
    pub row: i32,
}

impl HexCoord {
    /// Sentinel returned by pixel queries that fall outside the board.
    pub const INVALID: Self = Self {
        col: i32::MIN,
        row: i32::MIN,
    };

    #[inline]
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Whether this is a real coordinate rather than [`HexCoord::INVALID`].
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    #[inline]
    pub const fn is_odd_column(self) -> bool {
        self.col & 1 == 1
    }

    /// The adjacent coordinate in direction `dir`.
    pub fn translated(self, dir: Direction) -> Self {
        let odd = self.is_odd_column();
        let (dc, dr) = match dir {
            Direction::N => (0, -1),
            Direction::NE => (1, if odd { 0 } else { -1 }),
            Direction::SE => (1, if odd { 1 } else { 0 }),
            Direction::S => (0, 1),
            Direction::SW => (-1, if odd { 1 } else { 0 }),
            Direction::NW => (-1, if odd { 0 } else { -1 }),
        };
        Self::new(self.col + dc, self.row + dr)
    }

    /// The coordinate `n` steps away in direction `dir`.
    pub fn translated_by(self, dir: Direction, n: u32) -> Self {
        (0..n).fold(self, |c, _| c.translated(dir))
    }

    /// All six neighbours in [`Direction::ALL`] order.
    pub fn neighbors(self) -> [HexCoord; 6] {
        Direction::ALL.map(|d| self.translated(d))
    }

    /// The direction to `other` if it is adjacent.
    pub fn direction_to(self, other: HexCoord) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|&d| self.translated(d) == other)
    }

    /// Cube coordinates `(x, y, z)` with `x + y + z == 0`.
    fn to_cube(self) -> (i32, i32, i32) {
        let x = self.col;
        let z = self.row - (self.col - (self.col & 1)) / 2;
        (x, -x - z, z)
    }

    /// Hex distance in steps.
    pub fn distance(self, other: HexCoord) -> i32 {
        let (ax, ay, az) = self.to_cube();
        let (bx, by, bz) = other.to_cube();
        (ax - bx).abs().max((ay - by).abs()).max((az - bz).abs())
    }

    /// The conventional four-digit hex label: 1-based column then row,
    /// e.g. `(0, 0)` is `"0101"`.
    pub fn board_label(self) -> String {
        format!("{:02}{:02}", self.col + 1, self.row + 1)
    }
}

impl fmt::Display for HexCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.board_label())
        } else {
            f.write_str("invalid")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_even_and_odd_columns() {
        let even = HexCoord::new(2, 2);
        assert_eq!(even.translated(Direction::N), HexCoord::new(2, 1));
        assert_eq!(even.translated(Direction::NE), HexCoord::new(3, 1));
        assert_eq!(even.translated(Direction::SE), HexCoord::new(3, 2));
        assert_eq!(even.translated(Direction::SW), HexCoord::new(1, 2));

        let odd = HexCoord::new(3, 2);
        assert_eq!(odd.translated(Direction::NE), HexCoord::new(4, 2));
        assert_eq!(odd.translated(Direction::SE), HexCoord::new(4, 3));
        assert_eq!(odd.translated(Direction::S), HexCoord::new(3, 3));
        assert_eq!(odd.translated(Direction::NW), HexCoord::new(2, 2));
    }

    #[test]
    fn opposite_translation_returns_home() {
        for c in [HexCoord::new(4, 4), HexCoord::new(5, 4)] {
            for d in Direction::ALL {
                assert_eq!(c.translated(d).translated(d.opposite()), c);
            }
        }
    }

    #[test]
    fn neighbors_are_distance_one() {
        let c = HexCoord::new(7, 3);
        for n in c.neighbors() {
            assert_eq!(c.distance(n), 1);
            assert!(c.direction_to(n).is_some());
        }
        assert_eq!(c.distance(c.translated_by(Direction::SE, 4)), 4);
    }

    #[test]
    fn board_label_is_one_based() {
        assert_eq!(HexCoord::new(0, 0).board_label(), "0101");
        assert_eq!(HexCoord::new(14, 16).board_label(), "1517");
        assert_eq!(HexCoord::INVALID.to_string(), "invalid");
    }

    #[test]
    fn direction_vectors_point_the_right_way() {
        assert!(Direction::N.unit_vector().y < -0.99);
        assert!(Direction::S.unit_vector().y > 0.99);
        let se = Direction::SE.unit_vector();
        assert!(se.x > 0.0 && se.y > 0.0);
    }
}
