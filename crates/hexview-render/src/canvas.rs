//! Small drawing helpers over [`tiny_skia`] shared by tiles, shadows and
//! sprites.
//!
//! Pixmaps store premultiplied RGBA; the conversions here keep that
//! invariant when pixels are edited directly.

use hexview_core::{BoardGeometry, Color, Vec2};
use image::{Rgba, RgbaImage};
use tiny_skia::{
    ColorU8, FillRule, Mask, Paint, Path, PathBuilder, Pixmap, PixmapPaint, PremultipliedColorU8,
    Stroke, Transform,
};

use crate::error::RenderError;

/// Converts a packed colour into its tiny-skia equivalent.
#[inline]
pub fn sk_color(c: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(c.r(), c.g(), c.b(), c.a())
}

fn paint(color: Color, anti_alias: bool) -> Paint<'static> {
    let mut p = Paint::default();
    p.set_color_rgba8(color.r(), color.g(), color.b(), color.a());
    p.anti_alias = anti_alias;
    p
}

/// Allocates a transparent pixmap; sizes below one pixel are bumped to one.
pub fn new_pixmap(width: i32, height: i32) -> Result<Pixmap, RenderError> {
    let w = width.max(1) as u32;
    let h = height.max(1) as u32;
    Pixmap::new(w, h).ok_or(RenderError::Allocation {
        width: w,
        height: h,
    })
}

/// A closed polygon path through `points` translated by `offset`.
pub fn polygon_path(points: &[Vec2], offset: Vec2) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.x + offset.x, first.y + offset.y);
    for p in rest {
        pb.line_to(p.x + offset.x, p.y + offset.y);
    }
    pb.close();
    pb.finish()
}

/// The hex outline of `geometry` with its top-left at `offset`.
pub fn hex_path(geometry: &BoardGeometry, offset: Vec2) -> Option<Path> {
    polygon_path(&geometry.hex_polygon(), offset)
}

pub fn fill_polygon(
    target: &mut Pixmap,
    points: &[Vec2],
    offset: Vec2,
    color: Color,
    anti_alias: bool,
    mask: Option<&Mask>,
) {
    if let Some(path) = polygon_path(points, offset) {
        target.fill_path(
            &path,
            &paint(color, anti_alias),
            FillRule::Winding,
            Transform::identity(),
            mask,
        );
    }
}

pub fn stroke_polygon(
    target: &mut Pixmap,
    points: &[Vec2],
    offset: Vec2,
    color: Color,
    width: f32,
    anti_alias: bool,
) {
    if let Some(path) = polygon_path(points, offset) {
        let stroke = Stroke {
            width,
            ..Stroke::default()
        };
        target.stroke_path(
            &path,
            &paint(color, anti_alias),
            &stroke,
            Transform::identity(),
            None,
        );
    }
}

pub fn stroke_line(
    target: &mut Pixmap,
    a: Vec2,
    b: Vec2,
    color: Color,
    width: f32,
    anti_alias: bool,
) {
    let mut pb = PathBuilder::new();
    pb.move_to(a.x, a.y);
    pb.line_to(b.x, b.y);
    let Some(path) = pb.finish() else {
        return;
    };
    let stroke = Stroke {
        width,
        ..Stroke::default()
    };
    target.stroke_path(
        &path,
        &paint(color, anti_alias),
        &stroke,
        Transform::identity(),
        None,
    );
}

pub fn fill_circle(target: &mut Pixmap, center: Vec2, radius: f32, color: Color, anti_alias: bool) {
    if let Some(path) = PathBuilder::from_circle(center.x, center.y, radius) {
        target.fill_path(
            &path,
            &paint(color, anti_alias),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }
}

pub fn stroke_circle(
    target: &mut Pixmap,
    center: Vec2,
    radius: f32,
    color: Color,
    width: f32,
    anti_alias: bool,
) {
    if let Some(path) = PathBuilder::from_circle(center.x, center.y, radius) {
        let stroke = Stroke {
            width,
            ..Stroke::default()
        };
        target.stroke_path(
            &path,
            &paint(color, anti_alias),
            &stroke,
            Transform::identity(),
            None,
        );
    }
}

/// Fills an axis-aligned rectangle; degenerate rectangles are ignored.
pub fn fill_rect(target: &mut Pixmap, x: f32, y: f32, w: f32, h: f32, color: Color) {
    if let Some(rect) = tiny_skia::Rect::from_xywh(x, y, w, h) {
        target.fill_rect(rect, &paint(color, false), Transform::identity(), None);
    }
}

/// A `width` × `height` clip mask covering the hex polygon at `offset`.
pub fn hex_mask(
    width: i32,
    height: i32,
    geometry: &BoardGeometry,
    offset: Vec2,
    anti_alias: bool,
) -> Result<Mask, RenderError> {
    let w = width.max(1) as u32;
    let h = height.max(1) as u32;
    let mut mask = Mask::new(w, h).ok_or(RenderError::Allocation {
        width: w,
        height: h,
    })?;
    if let Some(path) = hex_path(geometry, offset) {
        mask.fill_path(&path, FillRule::Winding, anti_alias, Transform::identity());
    }
    Ok(mask)
}

/// Draws `src` onto `target` with its top-left at `(x, y)`.
pub fn blit(target: &mut Pixmap, src: &Pixmap, x: i32, y: i32, opacity: f32, mask: Option<&Mask>) {
    let paint = PixmapPaint {
        opacity: opacity.clamp(0.0, 1.0),
        ..PixmapPaint::default()
    };
    target.draw_pixmap(x, y, src.as_ref(), &paint, Transform::identity(), mask);
}

// ---------------------------------------------------------------------------
// Pixel filters
// ---------------------------------------------------------------------------

/// Multiplies the colour channels of every pixel by `factor`.
pub fn darken(target: &mut Pixmap, factor: f32) {
    let f = factor.clamp(0.0, 1.0);
    for px in target.pixels_mut() {
        let a = px.alpha();
        let scale = |v: u8| ((v as f32) * f).round().min(a as f32) as u8;
        if let Some(c) =
            PremultipliedColorU8::from_rgba(scale(px.red()), scale(px.green()), scale(px.blue()), a)
        {
            *px = c;
        }
    }
}

/// Replaces every pixel by its luminance.
pub fn grayscale(target: &mut Pixmap) {
    for px in target.pixels_mut() {
        let a = px.alpha();
        let l = (0.299 * px.red() as f32 + 0.587 * px.green() as f32 + 0.114 * px.blue() as f32)
            .round()
            .min(a as f32) as u8;
        if let Some(c) = PremultipliedColorU8::from_rgba(l, l, l, a) {
            *px = c;
        }
    }
}

/// Source-over blend of `color` at `coverage` into one pixel. Pixels outside
/// the pixmap are ignored.
pub fn blend_pixel(target: &mut Pixmap, x: i32, y: i32, color: Color, coverage: f32) {
    let (w, h) = (target.width() as i32, target.height() as i32);
    if x < 0 || y < 0 || x >= w || y >= h {
        return;
    }
    let a = coverage.clamp(0.0, 1.0) * color.a() as f32 / 255.0;
    if a <= 0.0 {
        return;
    }
    let idx = (y * w + x) as usize;
    let pixels = target.pixels_mut();
    let dst = pixels[idx];
    let mix = |s: u8, d: u8| (s as f32 * a + d as f32 * (1.0 - a)).round() as u8;
    let out_a = (255.0 * a + dst.alpha() as f32 * (1.0 - a)).round() as u8;
    if let Some(c) = PremultipliedColorU8::from_rgba(
        mix(color.r(), dst.red()).min(out_a),
        mix(color.g(), dst.green()).min(out_a),
        mix(color.b(), dst.blue()).min(out_a),
        out_a,
    ) {
        pixels[idx] = c;
    }
}

// ---------------------------------------------------------------------------
// image interop
// ---------------------------------------------------------------------------

/// Converts straight-alpha image data into a premultiplied pixmap.
pub fn pixmap_from_rgba(img: &RgbaImage) -> Result<Pixmap, RenderError> {
    let mut pm = new_pixmap(img.width() as i32, img.height() as i32)?;
    for (dst, src) in pm.pixels_mut().iter_mut().zip(img.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pm)
}

/// Converts a pixmap back into straight-alpha image data.
pub fn pixmap_to_rgba(pm: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pm.width(), pm.height());
    for (dst, src) in img.pixels_mut().zip(pm.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    img
}

// ---------------------------------------------------------------------------
// Stand-in tiles
// ---------------------------------------------------------------------------

const PLACEHOLDER_FILL: Color = Color::from_rgb(96, 96, 96);
const PLACEHOLDER_STRIPE: Color = Color::from_rgba(160, 160, 160, 200);
const ERROR_FILL: Color = Color::from_rgb(120, 16, 16);
const ERROR_CROSS: Color = Color::from_rgb(255, 220, 0);

/// Hex-shaped image drawn while a tile's assets are still loading.
pub fn placeholder(geometry: &BoardGeometry) -> Result<Pixmap, RenderError> {
    let (w, h) = (geometry.hex_width(), geometry.hex_height());
    let mut pm = new_pixmap(w, h)?;
    let mask = hex_mask(w, h, geometry, Vec2::ZERO, true)?;
    fill_polygon(&mut pm, &geometry.hex_polygon(), Vec2::ZERO, PLACEHOLDER_FILL, true, None);
    let mut stripes = new_pixmap(w, h)?;
    let step = (geometry.quarter_width()).max(3);
    let mut x = -h;
    while x < w {
        stroke_line(
            &mut stripes,
            Vec2::new(x as f32, h as f32),
            Vec2::new((x + h) as f32, 0.0),
            PLACEHOLDER_STRIPE,
            1.0,
            true,
        );
        x += step;
    }
    blit(&mut pm, &stripes, 0, 0, 1.0, Some(&mask));
    Ok(pm)
}

/// Hex-shaped marker drawn in place of a tile that failed to compose.
pub fn error_marker(geometry: &BoardGeometry) -> Result<Pixmap, RenderError> {
    let (w, h) = (geometry.hex_width(), geometry.hex_height());
    let mut pm = new_pixmap(w, h)?;
    let poly = geometry.hex_polygon();
    fill_polygon(&mut pm, &poly, Vec2::ZERO, ERROR_FILL, true, None);
    let q = geometry.quarter_width() as f32;
    let (wf, hf) = (w as f32, h as f32);
    stroke_line(&mut pm, Vec2::new(q, q), Vec2::new(wf - q, hf - q), ERROR_CROSS, 2.0, true);
    stroke_line(&mut pm, Vec2::new(wf - q, q), Vec2::new(q, hf - q), ERROR_CROSS, 2.0, true);
    Ok(pm)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: i32, h: i32, color: Color) -> Pixmap {
        let mut pm = new_pixmap(w, h).unwrap();
        pm.fill(sk_color(color));
        pm
    }

    #[test]
    fn new_pixmap_never_allocates_zero_sized() {
        let pm = new_pixmap(0, -3).unwrap();
        assert_eq!((pm.width(), pm.height()), (1, 1));
    }

    #[test]
    fn darken_scales_channels_and_keeps_alpha() {
        let mut pm = solid(2, 2, Color::from_rgb(200, 100, 50));
        darken(&mut pm, 0.5);
        let px = pm.pixel(0, 0).unwrap();
        assert_eq!((px.red(), px.green(), px.blue(), px.alpha()), (100, 50, 25, 255));
    }

    #[test]
    fn grayscale_equalises_channels() {
        let mut pm = solid(1, 1, Color::from_rgb(255, 0, 0));
        grayscale(&mut pm);
        let px = pm.pixel(0, 0).unwrap();
        assert_eq!(px.red(), px.green());
        assert_eq!(px.green(), px.blue());
        assert_eq!(px.red(), 76);
    }

    #[test]
    fn blend_pixel_full_coverage_replaces() {
        let mut pm = solid(2, 1, Color::BLACK);
        blend_pixel(&mut pm, 1, 0, Color::WHITE, 1.0);
        blend_pixel(&mut pm, 5, 5, Color::WHITE, 1.0);
        assert_eq!(pm.pixel(1, 0).unwrap().red(), 255);
        assert_eq!(pm.pixel(0, 0).unwrap().red(), 0);
    }

    #[test]
    fn image_conversion_demultiplies() {
        let mut img = RgbaImage::new(1, 1);
        img.put_pixel(0, 0, Rgba([200, 100, 0, 128]));
        let pm = pixmap_from_rgba(&img).unwrap();
        assert!(pm.pixel(0, 0).unwrap().red() < 200);
        let back = pixmap_to_rgba(&pm);
        let [r, _, _, a] = back.get_pixel(0, 0).0;
        assert_eq!(a, 128);
        assert!((r as i32 - 200).abs() <= 2);
    }

    #[test]
    fn stand_in_tiles_are_hex_shaped() {
        let g = BoardGeometry::default();
        let p = placeholder(&g).unwrap();
        // Corners lie outside the hex polygon.
        assert_eq!(p.pixel(0, 0).unwrap().alpha(), 0);
        let c = p.pixel(g.hex_width() as u32 / 2, g.half_height() as u32).unwrap();
        assert_eq!(c.alpha(), 255);
        let e = error_marker(&g).unwrap();
        assert_eq!(e.pixel(0, 0).unwrap().alpha(), 0);
    }
}
