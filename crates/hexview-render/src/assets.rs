//! Asset sources for hex tiles.
//!
//! The renderer does no I/O. A [`TileSource`] hands out ready-made images
//! for the layers of a hex (base terrain, superstructures, ortho layers such
//! as bridges) and may report that an image is still loading, in which case
//! the tile is drawn as a placeholder and retried later.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use hexview_core::layout::{HEX_H, HEX_W};
use hexview_core::{BoardGeometry, Color, Hex, HexCoord, TerrainKind, Vec2};
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};

use crate::canvas::{fill_polygon, new_pixmap, stroke_polygon};
use crate::error::RenderError;

/// Stable identity of a source image, used as a cache key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub u64);

/// A source image at scale 1.0.
///
/// `frame` changes whenever an animated source advances; images observed
/// with more than one frame number are treated as animated.
#[derive(Clone, Debug)]
pub struct ImageHandle {
    pub id: ImageId,
    pub frame: u32,
    pub image: Arc<Pixmap>,
}

impl ImageHandle {
    pub fn new(id: ImageId, image: Arc<Pixmap>) -> Self {
        Self { id, frame: 0, image }
    }
}

/// Readiness of an asset lookup.
#[derive(Clone, Debug)]
pub enum AssetState<T> {
    Ready(T),
    /// Still being loaded; ask again later.
    Loading,
    /// The source has nothing for this hex.
    Missing,
}

impl<T> AssetState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, AssetState::Loading)
    }

    /// The ready value, or `default` when missing. Loading stays loading.
    pub fn ready_or(self, default: T) -> Option<T> {
        match self {
            AssetState::Ready(v) => Some(v),
            AssetState::Missing => Some(default),
            AssetState::Loading => None,
        }
    }
}

/// Supplies the images composed into each hex tile.
///
/// All images are expected at zoom 1.0; the compositor scales them.
pub trait TileSource: Send + 'static {
    /// Base terrain image for the hex.
    fn base(&self, coord: HexCoord, hex: &Hex) -> AssetState<ImageHandle>;

    /// Superstructure layers (foliage, buildings) drawn over the base.
    fn supers(&self, _coord: HexCoord, _hex: &Hex) -> AssetState<Vec<ImageHandle>> {
        AssetState::Ready(Vec::new())
    }

    /// Ortho layers (bridges), drawn in their own pass in isometric mode.
    fn orthos(&self, _coord: HexCoord, _hex: &Hex) -> AssetState<Vec<ImageHandle>> {
        AssetState::Ready(Vec::new())
    }

    /// Current frame of image `id`, for sources that animate on their own
    /// clock. The view polls this for the images behind cached tiles and
    /// evicts the tiles once a frame moves. `None` means the image is
    /// static or the source does not know.
    fn current_frame(&self, _id: ImageId) -> Option<u32> {
        None
    }
}

// ---------------------------------------------------------------------------
// AnimationTracker
// ---------------------------------------------------------------------------

/// Remembers the last frame seen per image and flags images whose frame
/// number changed as animated.
#[derive(Debug, Default)]
pub struct AnimationTracker {
    last_frame: HashMap<ImageId, u32>,
    animated: HashSet<ImageId>,
}

impl AnimationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `handle` and reports whether its image is animated.
    pub fn observe(&mut self, handle: &ImageHandle) -> bool {
        self.observe_frame(handle.id, handle.frame);
        self.animated.contains(&handle.id)
    }

    /// Records `frame` for `id`. Returns true only when this observation is
    /// the one that first marks the image animated.
    pub fn observe_frame(&mut self, id: ImageId, frame: u32) -> bool {
        match self.last_frame.insert(id, frame) {
            Some(prev) if prev != frame => self.animated.insert(id),
            _ => false,
        }
    }

    pub fn is_animated(&self, id: ImageId) -> bool {
        self.animated.contains(&id)
    }
}

// ---------------------------------------------------------------------------
// SolidTileSource
// ---------------------------------------------------------------------------

const BASE_ID: u64 = 1000;
const FOLIAGE_ID: u64 = 2000;
const BUILDING_ID: u64 = 3000;
const BRIDGE_ID: u64 = 4000;

/// Flat fallback colour for a terrain kind.
pub fn terrain_color(kind: TerrainKind) -> Color {
    match kind {
        TerrainKind::Clear => Color::from_rgb(204, 204, 153),
        TerrainKind::Rough => Color::from_rgb(170, 150, 110),
        TerrainKind::Pavement => Color::from_rgb(170, 170, 170),
        TerrainKind::Water => Color::from_rgb(80, 120, 200),
        TerrainKind::Swamp => Color::from_rgb(110, 130, 90),
        TerrainKind::Sand => Color::from_rgb(230, 210, 150),
        TerrainKind::Snow => Color::from_rgb(240, 240, 250),
        TerrainKind::Ice => Color::from_rgb(200, 230, 240),
    }
}

fn terrain_index(kind: TerrainKind) -> u64 {
    match kind {
        TerrainKind::Clear => 0,
        TerrainKind::Rough => 1,
        TerrainKind::Pavement => 2,
        TerrainKind::Water => 3,
        TerrainKind::Swamp => 4,
        TerrainKind::Sand => 5,
        TerrainKind::Snow => 6,
        TerrainKind::Ice => 7,
    }
}

const ALL_TERRAIN: [TerrainKind; 8] = [
    TerrainKind::Clear,
    TerrainKind::Rough,
    TerrainKind::Pavement,
    TerrainKind::Water,
    TerrainKind::Swamp,
    TerrainKind::Sand,
    TerrainKind::Snow,
    TerrainKind::Ice,
];

/// A built-in source drawing flat colours and simple shapes, so a board can
/// be rendered without any art assets.
pub struct SolidTileSource {
    bases: HashMap<TerrainKind, ImageHandle>,
    foliage: [ImageHandle; 3],
    building: ImageHandle,
    bridge: ImageHandle,
}

impl SolidTileSource {
    pub fn new() -> Result<Self, RenderError> {
        let geometry = BoardGeometry::default();
        let mut bases = HashMap::new();
        for kind in ALL_TERRAIN {
            let mut pm = new_pixmap(HEX_W, HEX_H)?;
            fill_polygon(
                &mut pm,
                &geometry.hex_polygon(),
                Vec2::ZERO,
                terrain_color(kind),
                true,
                None,
            );
            bases.insert(
                kind,
                ImageHandle::new(ImageId(BASE_ID + terrain_index(kind)), Arc::new(pm)),
            );
        }
        let foliage = [
            foliage_image(1)?,
            foliage_image(2)?,
            foliage_image(3)?,
        ];
        Ok(Self {
            bases,
            foliage,
            building: building_image()?,
            bridge: bridge_image()?,
        })
    }
}

fn foliage_image(density: u64) -> Result<ImageHandle, RenderError> {
    let mut pm = new_pixmap(HEX_W, HEX_H)?;
    let mut paint = Paint::default();
    paint.set_color_rgba8(40, 110 - 20 * density as u8, 40, 220);
    paint.anti_alias = true;
    let mut pb = PathBuilder::new();
    let spots: &[(f32, f32)] = &[(30.0, 24.0), (54.0, 24.0), (42.0, 44.0), (24.0, 46.0), (60.0, 46.0)];
    for &(x, y) in spots.iter().take(2 + density as usize) {
        pb.push_circle(x, y, 9.0);
    }
    if let Some(path) = pb.finish() {
        pm.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }
    Ok(ImageHandle::new(ImageId(FOLIAGE_ID + density), Arc::new(pm)))
}

fn building_image() -> Result<ImageHandle, RenderError> {
    let mut pm = new_pixmap(HEX_W, HEX_H)?;
    let body = [
        Vec2::new(24.0, 16.0),
        Vec2::new(60.0, 16.0),
        Vec2::new(60.0, 56.0),
        Vec2::new(24.0, 56.0),
    ];
    fill_polygon(&mut pm, &body, Vec2::ZERO, Color::from_rgb(120, 110, 100), true, None);
    stroke_polygon(&mut pm, &body, Vec2::ZERO, Color::from_rgb(60, 55, 50), 2.0, true);
    Ok(ImageHandle::new(ImageId(BUILDING_ID), Arc::new(pm)))
}

fn bridge_image() -> Result<ImageHandle, RenderError> {
    let mut pm = new_pixmap(HEX_W, HEX_H)?;
    let deck = [
        Vec2::new(0.0, 26.0),
        Vec2::new(HEX_W as f32, 26.0),
        Vec2::new(HEX_W as f32, 46.0),
        Vec2::new(0.0, 46.0),
    ];
    fill_polygon(&mut pm, &deck, Vec2::ZERO, Color::from_rgb(140, 100, 60), true, None);
    Ok(ImageHandle::new(ImageId(BRIDGE_ID), Arc::new(pm)))
}

impl TileSource for SolidTileSource {
    fn base(&self, _coord: HexCoord, hex: &Hex) -> AssetState<ImageHandle> {
        match self.bases.get(&hex.terrain) {
            Some(h) => AssetState::Ready(h.clone()),
            None => AssetState::Missing,
        }
    }

    fn supers(&self, _coord: HexCoord, hex: &Hex) -> AssetState<Vec<ImageHandle>> {
        let mut out = Vec::new();
        if let Some(h) = hex.foliage.filter(|&h| h > 0) {
            out.push(self.foliage[(h.min(3) - 1) as usize].clone());
        }
        if hex.building.is_some_and(|h| h > 0) {
            out.push(self.building.clone());
        }
        AssetState::Ready(out)
    }

    fn orthos(&self, _coord: HexCoord, hex: &Hex) -> AssetState<Vec<ImageHandle>> {
        if hex.bridge.is_some() {
            AssetState::Ready(vec![self.bridge.clone()])
        } else {
            AssetState::Ready(Vec::new())
        }
    }
}
