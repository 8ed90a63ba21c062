//! Per-hex ECM/ECCM colour maps.
//!
//! The rule engine decides which electronic-warfare fields reach which hexes;
//! the renderer only needs the resulting tint per hex. Fields on the same hex
//! are split into jamming (ECM) and counter-jamming (ECCM) groups. When both
//! groups are present the hex gets an entry in both maps; otherwise the single
//! group is classified by its own ECCM flag.

use std::collections::{HashMap, HashSet};

use crate::color::Color;
use crate::hex::HexCoord;

/// One electronic-warfare field reaching a hex.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EcmField {
    /// Owning player, used only to distinguish fields.
    pub owner: u32,
    pub strength: i32,
    pub eccm: bool,
    pub color: Color,
}

/// Tint per hex for ECM and ECCM coverage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EcmColors {
    pub ecm: HashMap<HexCoord, Color>,
    pub eccm: HashMap<HexCoord, Color>,
}

impl EcmColors {
    pub fn is_empty(&self) -> bool {
        self.ecm.is_empty() && self.eccm.is_empty()
    }

    /// Coordinates whose tint differs between `self` and `newer`: keys present
    /// in only one of the two, plus shared keys whose colour changed.
    pub fn changed_coords(&self, newer: &EcmColors) -> HashSet<HexCoord> {
        let mut out = HashSet::new();
        diff_into(&self.ecm, &newer.ecm, &mut out);
        diff_into(&self.eccm, &newer.eccm, &mut out);
        out
    }
}

fn diff_into(
    old: &HashMap<HexCoord, Color>,
    new: &HashMap<HexCoord, Color>,
    out: &mut HashSet<HexCoord>,
) {
    for (c, color) in old {
        if new.get(c) != Some(color) {
            out.insert(*c);
        }
    }
    for c in new.keys() {
        if !old.contains_key(c) {
            out.insert(*c);
        }
    }
}

/// Merge the fields affecting each hex into ECM and ECCM tints.
///
/// Hexes with no fields (or only zero-strength fields) produce no entry.
pub fn process_affected_coords(affected: &HashMap<HexCoord, Vec<EcmField>>) -> EcmColors {
    let mut out = EcmColors::default();
    for (&coord, fields) in affected {
        let (eccm, ecm): (Vec<&EcmField>, Vec<&EcmField>) = fields
            .iter()
            .filter(|f| f.strength > 0)
            .partition(|f| f.eccm);
        let ecm_colors: Vec<Color> = ecm.iter().map(|f| f.color).collect();
        let eccm_colors: Vec<Color> = eccm.iter().map(|f| f.color).collect();
        match (ecm_colors.is_empty(), eccm_colors.is_empty()) {
            (false, false) => {
                out.ecm.insert(coord, Color::average(&ecm_colors));
                out.eccm.insert(coord, Color::average(&eccm_colors));
            }
            (false, true) => {
                out.ecm.insert(coord, Color::average(&ecm_colors));
            }
            (true, false) => {
                out.eccm.insert(coord, Color::average(&eccm_colors));
            }
            (true, true) => {}
        }
    }
    out
}
