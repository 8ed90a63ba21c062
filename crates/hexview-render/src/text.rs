//! Text labels rendered with a TrueType font through `rusttype`.
//!
//! Without a font the renderer still measures text (using an average glyph
//! width estimate) so label rectangles and sprite bounds stay stable, but
//! draws nothing.

use hexview_core::{Color, Point};
use rusttype::{Font, Scale, point as rt_point};
use tiny_skia::Pixmap;

use crate::canvas::blend_pixel;
use crate::error::RenderError;

/// Average advance of a glyph relative to the pixel size, used when no font
/// is loaded.
const ESTIMATED_ADVANCE: f32 = 0.6;

/// Measures and draws single-line labels.
pub struct TextRenderer {
    font: Option<Font<'static>>,
}

impl TextRenderer {
    /// Create a renderer from raw TrueType font data.
    pub fn new(font_data: &[u8]) -> Result<Self, RenderError> {
        let font = Font::try_from_vec(font_data.to_vec()).ok_or(RenderError::InvalidFont)?;
        Ok(Self { font: Some(font) })
    }

    /// A renderer that only estimates text extents.
    pub fn without_font() -> Self {
        Self { font: None }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Width and height in pixels of `text` at `size` pixels.
    pub fn measure(&self, text: &str, size: f32) -> Point {
        let Some(font) = &self.font else {
            let w = (text.chars().count() as f32 * size * ESTIMATED_ADVANCE).ceil() as i32;
            return Point::new(w, size.ceil() as i32);
        };
        let scale = Scale::uniform(size);
        let v = font.v_metrics(scale);
        let width = font
            .layout(text, scale, rt_point(0.0, v.ascent))
            .last()
            .map_or(0.0, |g| g.position().x + g.unpositioned().h_metrics().advance_width);
        Point::new(width.ceil() as i32, (v.ascent - v.descent).ceil() as i32)
    }

    /// Draws `text` with its top-left corner at `origin`.
    pub fn draw(&self, target: &mut Pixmap, text: &str, origin: Point, size: f32, color: Color) {
        let Some(font) = &self.font else {
            return;
        };
        let scale = Scale::uniform(size);
        let baseline = origin.y as f32 + font.v_metrics(scale).ascent;
        for glyph in font.layout(text, scale, rt_point(origin.x as f32, baseline)) {
            if let Some(bb) = glyph.pixel_bounding_box() {
                glyph.draw(|gx, gy, v| {
                    blend_pixel(target, gx as i32 + bb.min.x, gy as i32 + bb.min.y, color, v);
                });
            }
        }
    }

    /// Draws `text` horizontally centred on `center_x`.
    pub fn draw_centered(
        &self,
        target: &mut Pixmap,
        text: &str,
        center_x: i32,
        top: i32,
        size: f32,
        color: Color,
    ) {
        let extent = self.measure(text, size);
        self.draw(target, text, Point::new(center_x - extent.x / 2, top), size, color);
    }
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self::without_font()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_font_is_rejected() {
        assert!(matches!(
            TextRenderer::new(&[0, 1, 2, 3]),
            Err(RenderError::InvalidFont)
        ));
    }

    #[test]
    fn estimate_scales_with_length_and_size() {
        let t = TextRenderer::without_font();
        assert!(!t.has_font());
        let short = t.measure("AB", 10.0);
        let long = t.measure("ABCD", 10.0);
        assert_eq!(short, Point::new(12, 10));
        assert_eq!(long.x, 2 * short.x);
        assert_eq!(t.measure("", 10.0).x, 0);
    }

    #[test]
    fn drawing_without_font_leaves_target_untouched() {
        let t = TextRenderer::without_font();
        let mut pm = Pixmap::new(20, 10).unwrap();
        t.draw(&mut pm, "0101", Point::ZERO, 8.0, Color::WHITE);
        assert!(pm.pixels().iter().all(|p| p.alpha() == 0));
    }
}
