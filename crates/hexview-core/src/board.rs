//! The board snapshot: dimensions plus one [`Hex`] terrain descriptor per
//! coordinate.
//!
//! A `Board` is owned by the game-state layer; the renderer keeps its own
//! `Arc<Board>` snapshot and applies single-hex edits with copy-on-write.

use crate::hex::HexCoord;

/// Largest ground elevation magnitude a hex may report.
pub const MAX_ELEVATION: i32 = 1000;

/// Base terrain of a hex, used to pick base art and flat fallback colours.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TerrainKind {
    #[default]
    Clear,
    Rough,
    Pavement,
    Water,
    Swamp,
    Sand,
    Snow,
    Ice,
}

/// A bridge spanning a hex at `elevation` levels above its ground.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bridge {
    pub elevation: i32,
}

/// Terrain descriptor for one hex.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hex {
    /// Ground level of the hex.
    pub elevation: i32,
    pub terrain: TerrainKind,
    /// Foliage height in levels (1 light woods, 2 heavy, 3 ultra-heavy).
    pub foliage: Option<i32>,
    /// Building height in levels.
    pub building: Option<i32>,
    pub bridge: Option<Bridge>,
    /// Optional free-form label drawn on the tile.
    pub label: Option<String>,
}

impl Hex {
    /// A clear hex at the given elevation.
    pub fn at_elevation(elevation: i32) -> Self {
        Self {
            elevation,
            ..Self::default()
        }
    }

    pub fn with_terrain(mut self, terrain: TerrainKind) -> Self {
        self.terrain = terrain;
        self
    }

    pub fn with_foliage(mut self, height: i32) -> Self {
        self.foliage = Some(height);
        self
    }

    pub fn with_building(mut self, height: i32) -> Self {
        self.building = Some(height);
        self
    }

    pub fn with_bridge(mut self, elevation: i32) -> Self {
        self.bridge = Some(Bridge { elevation });
        self
    }

    /// Height of the tallest structure above ground (foliage or building).
    pub fn structure_height(&self) -> i32 {
        self.foliage
            .unwrap_or(0)
            .max(self.building.unwrap_or(0))
            .max(0)
    }

    /// Reports the first inconsistency in the descriptor, if any.
    ///
    /// Composition refuses to cache tiles for hexes that fail this check.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.foliage.is_some_and(|h| h <= 0) {
            return Err("foliage height must be positive");
        }
        if self.building.is_some_and(|h| h <= 0) {
            return Err("building height must be positive");
        }
        if self.bridge.is_some_and(|b| b.elevation < 0) {
            return Err("bridge elevation must not be negative");
        }
        if self.elevation.abs() > MAX_ELEVATION {
            return Err("elevation out of range");
        }
        Ok(())
    }
}

/// A rectangular board of hexes.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Board {
    width: i32,
    height: i32,
    hexes: Vec<Hex>,
    min_elevation: i32,
    max_elevation: i32,
}

impl Board {
    /// A `width` × `height` board of clear level-0 hexes.
    pub fn new(width: i32, height: i32) -> Self {
        let w = width.max(0);
        let h = height.max(0);
        Self {
            width: w,
            height: h,
            hexes: vec![Hex::default(); (w * h) as usize],
            min_elevation: 0,
            max_elevation: 0,
        }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Whether `c` lies on the board.
    #[inline]
    pub fn contains(&self, c: HexCoord) -> bool {
        c.col >= 0 && c.row >= 0 && c.col < self.width && c.row < self.height
    }

    #[inline]
    fn index(&self, c: HexCoord) -> Option<usize> {
        self.contains(c)
            .then(|| (c.row * self.width + c.col) as usize)
    }

    /// The hex at `c`, or `None` off the board.
    pub fn get(&self, c: HexCoord) -> Option<&Hex> {
        self.index(c).map(|i| &self.hexes[i])
    }

    /// Replace the hex at `c`. Returns `false` (and does nothing) off the
    /// board.
    pub fn set(&mut self, c: HexCoord, hex: Hex) -> bool {
        let Some(i) = self.index(c) else {
            return false;
        };
        self.hexes[i] = hex;
        self.recompute_elevation_range();
        true
    }

    /// Ground elevation at `c`, or `None` off the board.
    #[inline]
    pub fn elevation(&self, c: HexCoord) -> Option<i32> {
        self.get(c).map(|h| h.elevation)
    }

    /// Lowest ground elevation on the board.
    #[inline]
    pub fn min_elevation(&self) -> i32 {
        self.min_elevation
    }

    /// Highest ground elevation on the board.
    #[inline]
    pub fn max_elevation(&self) -> i32 {
        self.max_elevation
    }

    /// Row-major iterator over all coordinates.
    pub fn coords(&self) -> impl Iterator<Item = HexCoord> + '_ {
        (0..self.height).flat_map(move |row| (0..self.width).map(move |col| HexCoord::new(col, row)))
    }

    /// Row-major iterator over `(coord, hex)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (HexCoord, &Hex)> + '_ {
        self.coords().zip(self.hexes.iter())
    }

    fn recompute_elevation_range(&mut self) {
        let (lo, hi) = self
            .hexes
            .iter()
            .fold((i32::MAX, i32::MIN), |(lo, hi), h| {
                (lo.min(h.elevation), hi.max(h.elevation))
            });
        if self.hexes.is_empty() {
            self.min_elevation = 0;
            self.max_elevation = 0;
        } else {
            self.min_elevation = lo;
            self.max_elevation = hi;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_board_is_flat_and_clear() {
        let b = Board::new(4, 3);
        assert_eq!(b.coords().count(), 12);
        assert_eq!(b.elevation(HexCoord::new(3, 2)), Some(0));
        assert_eq!(b.elevation(HexCoord::new(4, 0)), None);
        assert_eq!(b.get(HexCoord::INVALID), None);
    }

    #[test]
    fn set_tracks_elevation_range() {
        let mut b = Board::new(3, 3);
        assert!(b.set(HexCoord::new(1, 1), Hex::at_elevation(4)));
        assert!(b.set(HexCoord::new(0, 2), Hex::at_elevation(-2)));
        assert_eq!(b.max_elevation(), 4);
        assert_eq!(b.min_elevation(), -2);
        assert!(b.set(HexCoord::new(1, 1), Hex::at_elevation(0)));
        assert_eq!(b.max_elevation(), 0);
        assert!(!b.set(HexCoord::new(9, 9), Hex::default()));
    }

    #[test]
    fn iter_is_row_major() {
        let mut b = Board::new(2, 2);
        b.set(HexCoord::new(1, 0), Hex::at_elevation(1));
        let v: Vec<_> = b.iter().map(|(c, h)| (c, h.elevation)).collect();
        assert_eq!(v[1], (HexCoord::new(1, 0), 1));
        assert_eq!(v[2].0, HexCoord::new(0, 1));
    }

    #[test]
    fn validate_rejects_bad_structures() {
        assert!(Hex::default().with_foliage(2).validate().is_ok());
        assert!(Hex::default().with_foliage(0).validate().is_err());
        assert!(Hex::default().with_bridge(-1).validate().is_err());
        assert!(Hex::at_elevation(5000).validate().is_err());
        assert_eq!(Hex::default().with_foliage(1).with_building(3).structure_height(), 3);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn board_serde_round_trip() {
        let mut b = Board::new(2, 2);
        b.set(HexCoord::new(0, 1), Hex::at_elevation(2).with_foliage(1));
        let json = serde_json::to_string(&b).unwrap();
        let back: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
    }
}
