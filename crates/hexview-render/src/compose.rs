//! Composition of a single hex tile.
//!
//! A tile is built in a fixed order: base terrain, shadow-map sample,
//! superstructure layers, elevation curtains (isometric only), ECM/ECCM
//! tint, outline and edge marks, text labels, then the night and
//! field-of-view filters over the whole result.

use std::collections::HashSet;
use std::sync::Arc;

use hexview_core::{
    Board, BoardGeometry, Color, Direction, EcmColors, Hex, HexCoord, Light, Vec2, VisualSettings,
};
use tiny_skia::{FilterQuality, Mask, Pixmap, PixmapPaint, Transform};

use crate::assets::{AnimationTracker, AssetState, ImageHandle, ImageId, TileSource, terrain_color};
use crate::canvas::{
    blit, darken, fill_polygon, grayscale, hex_mask, new_pixmap, placeholder, stroke_line,
    stroke_polygon,
};
use crate::depth::{curtain_depth, curtain_edges, curtain_polygon};
use crate::error::RenderError;
use crate::scaled::ScaledImageCache;
use crate::shadow::ShadowMap;
use crate::text::TextRenderer;

const OUTLINE: Color = Color::from_rgba(0, 0, 0, 90);
const INCLINE: Color = Color::from_rgba(90, 60, 20, 200);
const CLIFF: Color = Color::from_rgba(40, 20, 0, 230);
const MAPSHEET: Color = Color::from_rgb(30, 30, 160);
const LABEL: Color = Color::from_rgba(0, 0, 0, 210);
const ECM_ALPHA: u8 = 72;
const ECCM_ALPHA: u8 = 56;
const CURTAIN_SHADE: f32 = 0.65;

/// Mapsheet size in hexes.
const MAPSHEET_COLS: i32 = 16;
const MAPSHEET_ROWS: i32 = 17;

/// Base art larger than this multiple of the hex box is treated as a texture
/// and sliced by board position.
const OVERSIZE_RATIO: f32 = 1.5;

const LABEL_PX: f32 = 10.0;
const MIN_LABEL_PX: f32 = 6.0;

/// Read-only inputs for composing tiles.
pub struct TileContext<'a> {
    pub geometry: &'a BoardGeometry,
    pub board: &'a Board,
    pub settings: &'a VisualSettings,
    pub light: Light,
    pub shadow: Option<&'a ShadowMap>,
    pub ecm: &'a EcmColors,
    /// Highlighted field of view; hexes outside it are grayed out.
    pub fov: Option<&'a HashSet<HexCoord>>,
    pub text: &'a TextRenderer,
}

/// Result of composing one tile.
pub enum TileOutcome {
    /// A finished tile. `cacheable` is false when an animated source image
    /// was used. `sources` lists every source image drawn into it.
    Ready {
        image: Pixmap,
        cacheable: bool,
        sources: Vec<ImageId>,
    },
    /// Some asset is still loading; the image is a placeholder and the tile
    /// must be retried.
    Pending(Pixmap),
}

/// Composes hex tiles and owns the zoom-scaled source images they use.
#[derive(Debug, Default)]
pub struct TileCompositor {
    scaled: ScaledImageCache,
    animation: AnimationTracker,
}

impl TileCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every scaled source image.
    pub fn clear_scaled(&mut self) {
        self.scaled.clear();
    }

    /// Records a frame reported by the source outside of composition.
    /// Returns true when this marks `id` animated for the first time.
    pub fn observe_frame(&mut self, id: ImageId, frame: u32) -> bool {
        self.animation.observe_frame(id, frame)
    }

    pub fn is_animated(&self, id: ImageId) -> bool {
        self.animation.is_animated(id)
    }

    pub fn compose(
        &mut self,
        coord: HexCoord,
        source: &dyn TileSource,
        ctx: &TileContext<'_>,
    ) -> Result<TileOutcome, RenderError> {
        let hex = ctx.board.get(coord).ok_or(RenderError::OffBoard(coord))?;
        hex.validate()
            .map_err(|reason| RenderError::InvalidTerrain { coord, reason })?;
        let g = ctx.geometry;
        let settings = ctx.settings;
        let aa = settings.antialiasing;

        let base = match source.base(coord, hex) {
            AssetState::Ready(h) => Some(h),
            AssetState::Missing => None,
            AssetState::Loading => return pending(coord, g),
        };
        let Some(mut layers) = source.supers(coord, hex).ready_or(Vec::new()) else {
            return pending(coord, g);
        };
        if !settings.isometric {
            let Some(orthos) = source.orthos(coord, hex).ready_or(Vec::new()) else {
                return pending(coord, g);
            };
            layers.extend(orthos);
        }

        let curtains = if settings.isometric {
            curtain_edges(coord, ctx.board)
        } else {
            Vec::new()
        };
        let width = g.hex_width();
        let height = g.hex_height() + curtain_depth(g, &curtains);
        let mut tile = new_pixmap(width, height)?;
        let mask = hex_mask(width, height, g, Vec2::ZERO, aa)?;
        let poly = g.hex_polygon();
        let mut animated = false;
        let mut sources = Vec::with_capacity(layers.len() + 1);

        match &base {
            Some(handle) => {
                animated |= self.animation.observe(handle);
                sources.push(handle.id);
                let img = self.scaled.get(handle, g, aa)?;
                draw_base(&mut tile, &img, coord, g, &mask);
            }
            None => fill_polygon(&mut tile, &poly, Vec2::ZERO, terrain_color(hex.terrain), aa, None),
        }

        if settings.shadows {
            if let Some(map) = ctx.shadow {
                sample_shadow(&mut tile, map, coord, g, &mask);
            }
        }

        for handle in &layers {
            animated |= self.animation.observe(handle);
            sources.push(handle.id);
            let img = self.scaled.get(handle, g, aa)?;
            let x = (g.hex_width() - img.width() as i32) / 2;
            let y = (g.hex_height() - img.height() as i32) / 2;
            blit(&mut tile, &img, x, y, 1.0, Some(&mask));
        }

        if !curtains.is_empty() {
            let shade = shade_of(terrain_color(hex.terrain), CURTAIN_SHADE);
            for &curtain in &curtains {
                let face = curtain_polygon(g, curtain);
                fill_polygon(&mut tile, &face, Vec2::ZERO, shade, aa, None);
                stroke_polygon(&mut tile, &face, Vec2::ZERO, OUTLINE, 1.0, aa);
            }
        }

        if let Some(c) = ctx.ecm.ecm.get(&coord) {
            fill_polygon(&mut tile, &poly, Vec2::ZERO, c.with_alpha(ECM_ALPHA), aa, None);
        }
        if let Some(c) = ctx.ecm.eccm.get(&coord) {
            fill_polygon(&mut tile, &poly, Vec2::ZERO, c.with_alpha(ECCM_ALPHA), aa, None);
        }

        stroke_polygon(&mut tile, &poly, Vec2::ZERO, OUTLINE, 1.0, aa);
        if settings.incline_rendering {
            draw_inclines(&mut tile, coord, hex, ctx.board, g, aa);
        }
        if settings.mapsheet_borders {
            draw_mapsheet_edges(&mut tile, coord, g, aa);
        }

        let size = (LABEL_PX * g.scale()).max(MIN_LABEL_PX);
        if settings.hex_numbers {
            let top = (g.quarter_width() / 3).max(1);
            ctx.text
                .draw_centered(&mut tile, &coord.board_label(), width / 2, top, size, LABEL);
        }
        if settings.terrain_labels {
            if let Some(label) = terrain_label(hex) {
                let top = g.hex_height() - size.ceil() as i32 - g.quarter_width() / 3;
                ctx.text.draw_centered(&mut tile, &label, width / 2, top, size, LABEL);
            }
        }

        if settings.night_darkening {
            if let Some(factor) = ctx.light.darkening() {
                darken(&mut tile, factor);
            }
        }
        if settings.fov_grayscale && ctx.fov.is_some_and(|set| !set.contains(&coord)) {
            grayscale(&mut tile);
        }

        Ok(TileOutcome::Ready {
            image: tile,
            cacheable: !animated,
            sources,
        })
    }

    /// Scaled ortho layers of `coord`, drawn separately in isometric mode.
    /// Layers that are still loading are skipped.
    pub fn ortho_layers(
        &mut self,
        coord: HexCoord,
        source: &dyn TileSource,
        ctx: &TileContext<'_>,
    ) -> Result<Vec<Arc<Pixmap>>, RenderError> {
        let Some(hex) = ctx.board.get(coord) else {
            return Ok(Vec::new());
        };
        let handles: Vec<ImageHandle> = match source.orthos(coord, hex) {
            AssetState::Ready(v) => v,
            AssetState::Missing => Vec::new(),
            AssetState::Loading => {
                log::debug!("ortho layers for {coord} still loading");
                Vec::new()
            }
        };
        handles
            .iter()
            .map(|h| self.scaled.get(h, ctx.geometry, ctx.settings.antialiasing))
            .collect()
    }
}

fn pending(coord: HexCoord, g: &BoardGeometry) -> Result<TileOutcome, RenderError> {
    log::debug!("assets for {coord} still loading");
    Ok(TileOutcome::Pending(placeholder(g)?))
}

/// Draws base art centred in the hex box, or, for oversized textures, the
/// slice lying under the hex's board position repeated as needed.
fn draw_base(tile: &mut Pixmap, img: &Pixmap, coord: HexCoord, g: &BoardGeometry, mask: &Mask) {
    let (iw, ih) = (img.width() as i32, img.height() as i32);
    let oversized = iw as f32 > g.hex_width() as f32 * OVERSIZE_RATIO
        || ih as f32 > g.hex_height() as f32 * OVERSIZE_RATIO;
    if !oversized {
        let x = (g.hex_width() - iw) / 2;
        let y = (g.hex_height() - ih) / 2;
        blit(tile, img, x, y, 1.0, Some(mask));
        return;
    }
    let p = g.hex_to_pixel(coord, 0);
    let (tw, th) = (tile.width() as i32, tile.height() as i32);
    let mut y = -p.y.rem_euclid(ih);
    while y < th {
        let mut x = -p.x.rem_euclid(iw);
        while x < tw {
            blit(tile, img, x, y, 1.0, Some(mask));
            x += iw;
        }
        y += ih;
    }
}

/// Samples the zoom-1.0 shadow map under the hex into the tile.
fn sample_shadow(tile: &mut Pixmap, map: &ShadowMap, coord: HexCoord, g: &BoardGeometry, mask: &Mask) {
    let origin = BoardGeometry::default().hex_to_pixel(coord, 0);
    let s = g.scale();
    let transform = Transform::from_row(s, 0.0, 0.0, s, -origin.x as f32 * s, -origin.y as f32 * s);
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    tile.draw_pixmap(0, 0, map.image().as_ref(), &paint, transform, Some(mask));
}

/// Marks edges towards neighbours one level apart as inclines and larger
/// steps as cliffs.
fn draw_inclines(tile: &mut Pixmap, coord: HexCoord, hex: &Hex, board: &Board, g: &BoardGeometry, aa: bool) {
    for d in Direction::ALL {
        let Some(n) = board.elevation(coord.translated(d)) else {
            continue;
        };
        let (color, width) = match (n - hex.elevation).abs() {
            0 => continue,
            1 => (INCLINE, 2.0),
            _ => (CLIFF, 3.0),
        };
        let (a, b) = g.edge(d);
        stroke_line(tile, a, b, color, width, aa);
    }
}

fn mapsheet_of(c: HexCoord) -> (i32, i32) {
    (c.col.div_euclid(MAPSHEET_COLS), c.row.div_euclid(MAPSHEET_ROWS))
}

fn draw_mapsheet_edges(tile: &mut Pixmap, coord: HexCoord, g: &BoardGeometry, aa: bool) {
    let sheet = mapsheet_of(coord);
    for d in Direction::ALL {
        if mapsheet_of(coord.translated(d)) != sheet {
            let (a, b) = g.edge(d);
            stroke_line(tile, a, b, MAPSHEET, 2.0, aa);
        }
    }
}

fn shade_of(c: Color, factor: f32) -> Color {
    let f = |v: u8| (v as f32 * factor).round() as u8;
    Color::from_rgba(f(c.r()), f(c.g()), f(c.b()), c.a())
}

/// Text shown along the bottom of a tile: an explicit label, otherwise a
/// summary of the hex's level and structures.
pub fn terrain_label(hex: &Hex) -> Option<String> {
    if let Some(label) = &hex.label {
        return Some(label.clone());
    }
    let mut parts = Vec::new();
    if hex.elevation != 0 {
        parts.push(format!("LEVEL {}", hex.elevation));
    }
    if let Some(b) = hex.building {
        parts.push(format!("BLDG {b}"));
    } else if let Some(f) = hex.foliage {
        parts.push(
            match f {
                1 => "LIGHT WOODS",
                2 => "HEAVY WOODS",
                _ => "ULTRA WOODS",
            }
            .to_string(),
        );
    }
    if let Some(bridge) = hex.bridge {
        parts.push(format!("BRIDGE {}", bridge.elevation));
    }
    (!parts.is_empty()).then(|| parts.join(" "))
}
