//! Zoom-scaled copies of source images.
//!
//! Entries are keyed by source image and hold its most recently requested
//! frame. Only one zoom level is kept at a time: the first lookup at a new
//! zoom drops the rest.

use std::collections::HashMap;
use std::sync::Arc;

use hexview_core::BoardGeometry;
use image::RgbaImage;
use image::imageops::{self, FilterType};
use tiny_skia::{IntSize, Pixmap};

use crate::assets::{ImageHandle, ImageId};
use crate::error::RenderError;

#[derive(Debug, Default)]
pub struct ScaledImageCache {
    zoom_index: Option<usize>,
    entries: HashMap<ImageId, (u32, Arc<Pixmap>)>,
}

impl ScaledImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// `handle`'s image scaled to `geometry`. `smooth` selects bilinear
    /// rather than nearest-neighbour sampling.
    pub fn get(
        &mut self,
        handle: &ImageHandle,
        geometry: &BoardGeometry,
        smooth: bool,
    ) -> Result<Arc<Pixmap>, RenderError> {
        if self.zoom_index != Some(geometry.zoom_index()) {
            if !self.entries.is_empty() {
                log::debug!(
                    "dropping {} scaled images for zoom {}",
                    self.entries.len(),
                    geometry.zoom_index()
                );
            }
            self.entries.clear();
            self.zoom_index = Some(geometry.zoom_index());
        }
        if (geometry.scale() - 1.0).abs() < f32::EPSILON {
            return Ok(handle.image.clone());
        }
        let current = self.entries.get(&handle.id).filter(|(frame, _)| *frame == handle.frame);
        if let Some((_, hit)) = current {
            return Ok(hit.clone());
        }
        let scaled = Arc::new(scale_pixmap(&handle.image, geometry.scale(), smooth)?);
        self.entries.insert(handle.id, (handle.frame, scaled.clone()));
        Ok(scaled)
    }
}

/// Resamples a premultiplied pixmap by `scale`.
///
/// The raw premultiplied bytes are resized directly; both filters used here
/// only form convex combinations, so the result stays premultiplied.
pub fn scale_pixmap(src: &Pixmap, scale: f32, smooth: bool) -> Result<Pixmap, RenderError> {
    let w = ((src.width() as f32 * scale).round() as u32).max(1);
    let h = ((src.height() as f32 * scale).round() as u32).max(1);
    let raw = RgbaImage::from_raw(src.width(), src.height(), src.data().to_vec())
        .ok_or(RenderError::Allocation {
            width: src.width(),
            height: src.height(),
        })?;
    let filter = if smooth {
        FilterType::Triangle
    } else {
        FilterType::Nearest
    };
    let resized = imageops::resize(&raw, w, h, filter);
    IntSize::from_wh(w, h)
        .and_then(|size| Pixmap::from_vec(resized.into_raw(), size))
        .ok_or(RenderError::Allocation {
            width: w,
            height: h,
        })
}
