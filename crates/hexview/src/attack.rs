//! Attack declarations reported by the game state, drawn as attack lines.

use hexview_core::{EntityId, HexCoord};

/// What an attack is aimed at.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttackTarget {
    Entity(EntityId),
    /// Area-effect or terrain attacks aimed at a hex.
    Hex(HexCoord),
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttackKind {
    /// A ranged weapon attack with its to-hit summary (e.g. "8+").
    Weapon { name: String, to_hit: String },
    Kick,
    Punch,
    Push,
    Club { name: String },
    Charge,
    /// Death from above.
    Dfa,
    /// Any other physical attack.
    Physical { name: String },
    Searchlight,
}

impl AttackKind {
    pub fn label(&self) -> String {
        match self {
            AttackKind::Weapon { name, to_hit } => format!("{name} ({to_hit})"),
            AttackKind::Kick => "Kick".into(),
            AttackKind::Punch => "Punch".into(),
            AttackKind::Push => "Push".into(),
            AttackKind::Club { name } => format!("Club: {name}"),
            AttackKind::Charge => "Charge".into(),
            AttackKind::Dfa => "Death from above".into(),
            AttackKind::Physical { name } => name.clone(),
            AttackKind::Searchlight => "Searchlight".into(),
        }
    }

    /// Whether the attack is resolved in the physical phase.
    pub fn is_physical(&self) -> bool {
        !matches!(self, AttackKind::Weapon { .. } | AttackKind::Searchlight)
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttackAction {
    pub attacker: EntityId,
    pub target: AttackTarget,
    pub kind: AttackKind,
}

impl AttackAction {
    pub fn new(attacker: EntityId, target: AttackTarget, kind: AttackKind) -> Self {
        Self {
            attacker,
            target,
            kind,
        }
    }
}

/// A precomputed to-hit summary against the unit at `coord`, shown while
/// the player picks a target.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FiringSolution {
    pub coord: HexCoord,
    pub to_hit: String,
    pub range: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_and_phases() {
        let w = AttackKind::Weapon {
            name: "AC/20".into(),
            to_hit: "7+".into(),
        };
        assert_eq!(w.label(), "AC/20 (7+)");
        assert!(!w.is_physical());
        assert!(!AttackKind::Searchlight.is_physical());
        assert!(AttackKind::Dfa.is_physical());
        assert!(AttackKind::Club { name: "Tree".into() }.is_physical());
    }
}
