//! Read-only entity snapshots supplied by the game-state layer.
//!
//! The renderer never owns game entities. Sprites keep `Weak` references to
//! the `Arc<EntitySnapshot>` handed to them, and the update protocol replaces
//! them whenever the game state reports a change.

use crate::color::Color;
use crate::hex::{Direction, HexCoord};

/// Stable identity of a game entity.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityId(pub u32);

/// Broad unit category, used for icon shape and draw priority.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityKind {
    #[default]
    Mek,
    Vehicle,
    Infantry,
    ProtoMek,
    Aero,
    LargeCraft,
    GunEmplacement,
}

impl EntityKind {
    /// Base draw priority; larger units draw above smaller ones in a hex.
    pub fn base_priority(self) -> i32 {
        match self {
            EntityKind::Infantry => 10,
            EntityKind::ProtoMek => 20,
            EntityKind::Vehicle => 30,
            EntityKind::GunEmplacement => 35,
            EntityKind::Mek => 40,
            EntityKind::Aero => 50,
            EntityKind::LargeCraft => 60,
        }
    }

    /// Single-letter glyph used by the flat icon renderer.
    pub fn glyph(self) -> char {
        match self {
            EntityKind::Mek => 'M',
            EntityKind::Vehicle => 'V',
            EntityKind::Infantry => 'I',
            EntityKind::ProtoMek => 'P',
            EntityKind::Aero => 'A',
            EntityKind::LargeCraft => 'L',
            EntityKind::GunEmplacement => 'G',
        }
    }
}

/// How the observing player perceives an entity, as decided by the rule
/// engine (double-blind, sensors, hidden units).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Visibility {
    #[default]
    Visible,
    /// Only a sensor contact is known: drawn as an anonymous marker.
    SensorReturn,
    Hidden,
}

/// Status bits that affect how an entity is drawn.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusFlags(pub u32);

impl StatusFlags {
    pub const NONE: Self = Self(0);
    pub const DESTROYED: Self = Self(1 << 0);
    pub const PRONE: Self = Self(1 << 1);
    pub const IMMOBILE: Self = Self(1 << 2);
    pub const DONE: Self = Self(1 << 3);
    pub const SELECTED: Self = Self(1 << 4);
    pub const COMMANDER: Self = Self(1 << 5);
    pub const SHUTDOWN: Self = Self(1 << 6);

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Everything the renderer needs to know about one entity.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub name: String,
    pub kind: EntityKind,
    /// Primary position; `None` while off-board or not yet deployed.
    pub position: Option<HexCoord>,
    /// Additional hexes occupied by multi-hex units, in slot order.
    pub secondary_positions: Vec<HexCoord>,
    pub facing: Option<Direction>,
    /// Elevation above the ground of its hex (negative when submerged).
    pub elevation: i32,
    /// Altitude for airborne aerospace units.
    pub altitude: Option<i32>,
    pub owner: u32,
    pub team: u32,
    pub color: Color,
    pub visibility: Visibility,
    pub status: StatusFlags,
    /// C3 network this unit belongs to.
    pub c3_network: Option<u32>,
    /// The network master, if this unit is a slave.
    pub c3_master: Option<EntityId>,
    /// Hexes flown over this turn by an aerospace unit.
    pub fly_over_path: Vec<HexCoord>,
}

impl EntitySnapshot {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }

    /// Position for a sprite slot: `-1` is the primary position, `0..` index
    /// the secondary positions.
    pub fn slot_position(&self, slot: i32) -> Option<HexCoord> {
        if slot < 0 {
            self.position
        } else {
            self.secondary_positions.get(slot as usize).copied()
        }
    }

    /// All `(slot, coord)` pairs currently occupied.
    ///
    /// Single-hex units have only the primary slot. Multi-hex units use one
    /// slot per secondary position and no primary slot, so every occupied hex
    /// is drawn exactly once.
    pub fn occupied_slots(&self) -> Vec<(i32, HexCoord)> {
        let Some(primary) = self.position else {
            return Vec::new();
        };
        if self.secondary_positions.is_empty() {
            vec![(-1, primary)]
        } else {
            self.secondary_positions
                .iter()
                .enumerate()
                .map(|(i, c)| (i as i32, *c))
                .collect()
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.status.contains(StatusFlags::DESTROYED)
    }

    pub fn is_airborne(&self) -> bool {
        self.altitude.is_some_and(|a| a > 0)
    }

    /// Visual height above the hex ground in levels (elevation, or altitude
    /// for airborne units).
    pub fn height_above_ground(&self) -> i32 {
        match self.altitude {
            Some(a) if a > 0 => a,
            _ => self.elevation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_hex_unit_has_primary_slot() {
        let mut e = EntitySnapshot::new(EntityId(1), "Atlas");
        assert!(e.occupied_slots().is_empty());
        e.position = Some(HexCoord::new(3, 4));
        assert_eq!(e.occupied_slots(), vec![(-1, HexCoord::new(3, 4))]);
        assert_eq!(e.slot_position(-1), Some(HexCoord::new(3, 4)));
        assert_eq!(e.slot_position(0), None);
    }

    #[test]
    fn multi_hex_unit_uses_secondary_slots() {
        let mut e = EntitySnapshot::new(EntityId(2), "Dropship");
        e.position = Some(HexCoord::new(5, 5));
        e.secondary_positions = vec![HexCoord::new(5, 5), HexCoord::new(5, 4), HexCoord::new(6, 4)];
        let slots = e.occupied_slots();
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[2], (2, HexCoord::new(6, 4)));
    }

    #[test]
    fn default_snapshot_is_an_unplaced_unit_zero() {
        let e = EntitySnapshot::default();
        assert_eq!(e.id, EntityId::default());
        assert_eq!(e.id, EntityId(0));
        assert!(e.occupied_slots().is_empty());
    }

    #[test]
    fn status_flags_combine() {
        let s = StatusFlags::PRONE.with(StatusFlags::DONE);
        assert!(s.contains(StatusFlags::PRONE));
        assert!(!s.contains(StatusFlags::DESTROYED));
    }

    #[test]
    fn airborne_height_uses_altitude() {
        let mut e = EntitySnapshot::new(EntityId(3), "Fighter");
        e.elevation = 1;
        assert_eq!(e.height_above_ground(), 1);
        e.altitude = Some(5);
        assert!(e.is_airborne());
        assert_eq!(e.height_above_ground(), 5);
    }
}
