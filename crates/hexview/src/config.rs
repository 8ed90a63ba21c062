//! Construction-time configuration for [`BoardView`](crate::BoardView).

use hexview_core::{BASE_ZOOM_INDEX, Point, VisualSettings};

/// Default delay before recomposing tiles whose assets were still loading.
pub const ASSET_RETRY_MS: u64 = 250;

/// Default delay between two steps of a moving-unit animation.
pub const STEP_INTERVAL_MS: u64 = 150;

/// Everything a [`BoardView`](crate::BoardView) needs before the first paint.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ViewConfig {
    pub settings: VisualSettings,
    /// Index into the zoom table; out-of-range values are clamped.
    pub zoom_index: usize,
    /// TrueType font used for labels. Without one, labels are skipped.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub font: Option<Vec<u8>>,
    /// Unit label size in pixels at zoom 1.0.
    pub label_px: f32,
    /// Size of the painted area in pixels.
    pub view_size: Point,
    pub step_interval_ms: u64,
    pub asset_retry_ms: u64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            settings: VisualSettings::default(),
            zoom_index: BASE_ZOOM_INDEX,
            font: None,
            label_px: 11.0,
            view_size: Point::new(800, 600),
            step_interval_ms: STEP_INTERVAL_MS,
            asset_retry_ms: ASSET_RETRY_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_start_at_base_zoom() {
        let cfg = ViewConfig::default();
        assert_eq!(cfg.zoom_index, BASE_ZOOM_INDEX);
        assert!(cfg.font.is_none());
        assert!(cfg.settings.shadows);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn partial_config_fills_defaults() {
        let cfg: ViewConfig =
            serde_json::from_str(r#"{"zoom_index": 3, "settings": {"isometric": true}}"#).unwrap();
        assert_eq!(cfg.zoom_index, 3);
        assert!(cfg.settings.isometric);
        assert_eq!(cfg.asset_retry_ms, ASSET_RETRY_MS);
    }
}
