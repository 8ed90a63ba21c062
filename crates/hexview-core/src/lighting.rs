//! Lighting conditions and game phase, as reported by the game state.

use crate::geom::Vec2;

/// Ambient light condition on the battlefield.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Light {
    #[default]
    Day,
    Dusk,
    FullMoon,
    Moonless,
    PitchBlack,
}

impl Light {
    /// Shadow offset per elevation level, in board pixels at zoom 1.0.
    ///
    /// Moonless and pitch-black nights have no directional light source.
    pub fn direction(self) -> Vec2 {
        match self {
            Light::Day => Vec2::new(-19.0, 7.0),
            Light::Dusk => Vec2::new(-38.0, 14.0),
            Light::FullMoon => Vec2::new(-14.0, 5.0),
            Light::Moonless | Light::PitchBlack => Vec2::ZERO,
        }
    }

    /// Whether shadows cast by this light are worth computing.
    pub fn casts_shadows(self) -> bool {
        self.direction().length() > 0.5
    }

    /// Brightness multiplier applied to tiles after composition, or `None`
    /// when no night darkening applies.
    pub fn darkening(self) -> Option<f32> {
        match self {
            Light::Day => None,
            Light::Dusk => Some(0.8),
            Light::FullMoon => Some(0.6),
            Light::Moonless => Some(0.45),
            Light::PitchBlack => Some(0.3),
        }
    }
}

/// Phase of the game turn; only used to decide which overlays are active.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
    #[default]
    Lounge,
    Initiative,
    Deployment,
    Movement,
    Firing,
    Physical,
    Targeting,
    End,
}

impl Phase {
    /// Whether movement-related overlays (envelopes, path steps, movement
    /// vectors) are shown.
    pub fn shows_movement(self) -> bool {
        matches!(self, Phase::Movement | Phase::Deployment)
    }

    /// Whether attack-related overlays (attack lines, firing solutions, field
    /// of fire) are shown.
    pub fn shows_attacks(self) -> bool {
        matches!(
            self,
            Phase::Firing | Phase::Physical | Phase::Targeting | Phase::End
        )
    }

    /// Whether deployment outlines are shown.
    pub fn shows_deployment(self) -> bool {
        matches!(self, Phase::Deployment | Phase::Lounge)
    }
}
