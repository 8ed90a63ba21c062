//! The immutable visual-settings snapshot and its invalidation scopes.
//!
//! The renderer never reads global mutable preferences. A host builds a
//! [`VisualSettings`] value and swaps it in through a single entry point,
//! which asks [`VisualSettings::invalidation`] how much cached state the
//! change discards.

/// How much cached rendering state a settings change invalidates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Invalidation {
    /// Nothing cached depends on the change.
    None,
    /// Sprites must be re-laid out and re-prepared; tiles stay valid.
    Sprites,
    /// Every cached hex tile must be recomposed.
    Tiles,
    /// The shadow map must be regenerated as well as every tile.
    ShadowAndTiles,
}

/// Display preferences affecting the board renderer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VisualSettings {
    pub antialiasing: bool,
    pub shadows: bool,
    pub incline_rendering: bool,
    pub mapsheet_borders: bool,
    pub hex_numbers: bool,
    pub terrain_labels: bool,
    pub isometric: bool,
    pub unit_labels: bool,
    pub night_darkening: bool,
    /// Gray out hexes outside a highlighted field of view.
    pub fov_grayscale: bool,
}

impl Default for VisualSettings {
    fn default() -> Self {
        Self {
            antialiasing: true,
            shadows: true,
            incline_rendering: true,
            mapsheet_borders: false,
            hex_numbers: true,
            terrain_labels: true,
            isometric: false,
            unit_labels: true,
            night_darkening: true,
            fov_grayscale: true,
        }
    }
}

impl VisualSettings {
    /// The invalidation scope of switching from `old` to `new`.
    pub fn invalidation(old: &VisualSettings, new: &VisualSettings) -> Invalidation {
        if old.shadows != new.shadows && new.shadows {
            return Invalidation::ShadowAndTiles;
        }
        let tile_affecting = old.antialiasing != new.antialiasing
            || old.shadows != new.shadows
            || old.incline_rendering != new.incline_rendering
            || old.mapsheet_borders != new.mapsheet_borders
            || old.hex_numbers != new.hex_numbers
            || old.terrain_labels != new.terrain_labels
            || old.isometric != new.isometric
            || old.night_darkening != new.night_darkening
            || old.fov_grayscale != new.fov_grayscale;
        if tile_affecting {
            Invalidation::Tiles
        } else if old.unit_labels != new.unit_labels {
            Invalidation::Sprites
        } else {
            Invalidation::None
        }
    }
}
