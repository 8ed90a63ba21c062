//! The board view engine.
//!
//! [`BoardView`] turns game-state notifications into cache invalidations and
//! sprite updates, and composes frames on demand:
//!
//! 1. visible hex tiles, from the tile cache or freshly composed, in depth
//!    order (isometric unit icons are interleaved row by row);
//! 2. sprite layers in [`SpriteLayer::ORDER`], gated by the game phase;
//! 3. in isometric mode, a faint redraw of units a taller hex may hide;
//! 4. host overlays.
//!
//! All mutation goes through `&mut self`, so a paint never observes a
//! half-updated collection.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use hexview_core::{
    BASE_ZOOM_INDEX, Board, BoardGeometry, Color, EcmColors, EcmField, EntityId, EntitySnapshot, Hex, HexCoord,
    Invalidation, Light, Phase, Point, Rect, Visibility, VisualSettings, process_affected_coords,
};
use hexview_render::canvas::{blit, error_marker, sk_color};
use hexview_render::{
    CacheStats, DrawOp, HexImageCache, ImageId, Pixmap, RenderError, ShadowMap, TextRenderer,
    TileCompositor, TileContext, TileOutcome, TileSource, draw_order, possibly_occluded,
};

use crate::animation::{MovementQueue, MovementStep};
use crate::attack::{AttackAction, AttackTarget, FiringSolution};
use crate::collections::{BoardSprites, EntitySprites};
use crate::config::ViewConfig;
use crate::error::ViewError;
use crate::input::{InputEvent, Key, ModMask, MouseAction};
use crate::overlay::Displayable;
use crate::schedule::TimerQueue;
use crate::sprites::{
    AttackSprite, CursorKind, EntitySprite, EnvelopeKind, EnvelopeSprite, FieldOfFireSprite,
    FlareSprite, IconStyle, IsometricSprite, LineKind, LineSprite, MovementMode, PathStep, Sprite,
    SpriteContext, SpriteLayer, StepSprite, TextMarkerSprite, border_edges,
};

const BACKGROUND: Color = Color::from_rgb(28, 28, 34);
/// Opacity of units redrawn over the taller hexes in front of them.
const SEE_THROUGH_OPACITY: f32 = 0.5;
const MOVEMENT_VECTOR_COLOR: Color = Color::from_rgb(120, 200, 255);

/// Notifications for the host, collected until [`BoardView::take_events`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoardViewEvent {
    /// The pointer moved onto another hex ([`HexCoord::INVALID`] off the
    /// board).
    HexHovered(HexCoord),
    HexClicked {
        coord: HexCoord,
        action: MouseAction,
        modifiers: ModMask,
    },
    /// A moving-unit animation ran out of waypoints.
    MovementFinished(EntityId),
}

/// What one [`BoardView::paint`] call did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PaintReport {
    pub tiles_drawn: usize,
    /// Tiles composed because they were not cached.
    pub tiles_composed: usize,
    /// Tiles drawn as placeholders while their assets load.
    pub tiles_pending: usize,
    pub sprites_drawn: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ViewTimer {
    AssetRetry,
    ExpireMarker(u64),
}

/// Inputs shared by tile composition and sprite layout.
struct Scene {
    geometry: BoardGeometry,
    board: Arc<Board>,
    settings: VisualSettings,
    text: TextRenderer,
    label_px: f32,
}

impl Scene {
    fn sprite_ctx(&self) -> SpriteContext<'_> {
        SpriteContext {
            geometry: &self.geometry,
            board: &self.board,
            settings: &self.settings,
            text: &self.text,
            label_px: self.label_px,
        }
    }

    /// Terrain level a tile at `c` is drawn at.
    fn lift(&self, c: HexCoord) -> i32 {
        if self.settings.isometric {
            self.board.elevation(c).unwrap_or(0)
        } else {
            0
        }
    }
}

pub struct BoardView {
    scene: Scene,
    source: Box<dyn TileSource>,
    compositor: TileCompositor,
    tiles: HexImageCache,
    shadow: Option<ShadowMap>,
    light: Light,
    phase: Phase,
    ecm: EcmColors,
    fov: Option<HashSet<HexCoord>>,

    entities: HashMap<EntityId, Arc<EntitySnapshot>>,
    sprites: BoardSprites,
    movement: MovementQueue,
    overlays: Vec<Box<dyn Displayable>>,

    offset: Point,
    view_size: Point,
    hover: HexCoord,
    timers: TimerQueue<ViewTimer>,
    now_ms: u64,
    asset_retry_ms: u64,
    retry_scheduled: bool,
    next_marker: u64,
    events: Vec<BoardViewEvent>,
    needs_repaint: bool,
}

impl std::fmt::Debug for BoardView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardView")
            .field("zoom_index", &self.scene.geometry.zoom_index())
            .field("board_width", &self.scene.board.width())
            .field("board_height", &self.scene.board.height())
            .field("light", &self.light)
            .field("phase", &self.phase)
            .field("cached_tiles", &self.tiles.len())
            .field("entities", &self.entities.len())
            .field("offset", &self.offset)
            .field("overlays", &self.overlays.len())
            .finish()
    }
}

impl BoardView {
    pub fn new(config: ViewConfig, board: Arc<Board>, source: Box<dyn TileSource>) -> Result<Self, ViewError> {
        let text = match &config.font {
            Some(bytes) => TextRenderer::new(bytes)?,
            None => TextRenderer::without_font(),
        };
        let mut view = Self {
            scene: Scene {
                geometry: BoardGeometry::new(config.zoom_index),
                board,
                settings: config.settings,
                text,
                label_px: config.label_px,
            },
            source,
            compositor: TileCompositor::new(),
            tiles: HexImageCache::new(),
            shadow: None,
            light: Light::default(),
            phase: Phase::default(),
            ecm: EcmColors::default(),
            fov: None,
            entities: HashMap::new(),
            sprites: BoardSprites::default(),
            movement: MovementQueue::new(config.step_interval_ms),
            overlays: Vec::new(),
            offset: Point::ZERO,
            view_size: config.view_size,
            hover: HexCoord::INVALID,
            timers: TimerQueue::new(),
            now_ms: 0,
            asset_retry_ms: config.asset_retry_ms,
            retry_scheduled: false,
            next_marker: 0,
            events: Vec::new(),
            needs_repaint: true,
        };
        view.regenerate_shadow()?;
        view.relayout_sprites();
        view.clamp_scroll();
        log::info!(
            "board view {}x{} at zoom index {}",
            view.scene.board.width(),
            view.scene.board.height(),
            view.scene.geometry.zoom_index()
        );
        Ok(view)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn geometry(&self) -> &BoardGeometry {
        &self.scene.geometry
    }

    pub fn settings(&self) -> &VisualSettings {
        &self.scene.settings
    }

    pub fn board(&self) -> &Arc<Board> {
        &self.scene.board
    }

    pub fn light(&self) -> Light {
        self.light
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn ecm_colors(&self) -> &EcmColors {
        &self.ecm
    }

    pub fn shadow(&self) -> Option<&ShadowMap> {
        self.shadow.as_ref()
    }

    pub fn sprites(&self) -> &BoardSprites {
        &self.sprites
    }

    pub fn cached_tiles(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_tile_cached(&self, c: HexCoord) -> bool {
        self.tiles.contains(c)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.tiles.stats()
    }

    /// Board pixel shown at the top-left of the view.
    pub fn offset(&self) -> Point {
        self.offset
    }

    /// Board pixel rectangle currently on screen.
    pub fn view_rect(&self) -> Rect {
        Rect::from_xywh(self.offset.x, self.offset.y, self.view_size.x, self.view_size.y)
    }

    pub fn needs_repaint(&self) -> bool {
        self.needs_repaint
    }

    /// Events raised since the last call.
    pub fn take_events(&mut self) -> Vec<BoardViewEvent> {
        std::mem::take(&mut self.events)
    }

    // -----------------------------------------------------------------------
    // Settings, zoom and board
    // -----------------------------------------------------------------------

    /// Swaps in a new settings snapshot, discarding only as much cached
    /// state as the change requires.
    pub fn update_settings(&mut self, settings: VisualSettings) -> Result<Invalidation, ViewError> {
        let scope = VisualSettings::invalidation(&self.scene.settings, &settings);
        self.scene.settings = settings;
        match scope {
            Invalidation::None => return Ok(scope),
            Invalidation::Sprites => {}
            Invalidation::Tiles => {
                if !self.scene.settings.shadows {
                    self.shadow = None;
                }
                self.clear_tiles();
            }
            Invalidation::ShadowAndTiles => {
                self.regenerate_shadow()?;
                self.clear_tiles();
            }
        }
        log::debug!("settings changed, invalidating {scope:?}");
        self.relayout_sprites();
        self.clamp_scroll();
        self.needs_repaint = true;
        Ok(scope)
    }

    /// Switches to zoom `index` (clamped), keeping the hex at the view
    /// centre in place. Returns whether the zoom changed.
    pub fn set_zoom(&mut self, index: usize) -> bool {
        let geometry = BoardGeometry::new(index);
        if geometry.zoom_index() == self.scene.geometry.zoom_index() {
            return false;
        }
        let center = self.hex_at(self.view_center());
        self.scene.geometry = geometry;
        self.clear_tiles();
        self.relayout_sprites();
        if !self.center_on_hex(center) {
            self.clamp_scroll();
        }
        log::info!(
            "zoom index {} (scale {:.2})",
            geometry.zoom_index(),
            geometry.scale()
        );
        self.needs_repaint = true;
        true
    }

    pub fn zoom_in(&mut self) -> bool {
        self.scene
            .geometry
            .zoomed_in()
            .is_some_and(|g| self.set_zoom(g.zoom_index()))
    }

    pub fn zoom_out(&mut self) -> bool {
        self.scene
            .geometry
            .zoomed_out()
            .is_some_and(|g| self.set_zoom(g.zoom_index()))
    }

    /// Replaces the whole board, e.g. after loading a new map.
    pub fn set_board(&mut self, board: Arc<Board>) -> Result<(), ViewError> {
        self.scene.board = board;
        self.clear_tiles();
        self.regenerate_shadow()?;
        let roster: Vec<_> = self.entities.values().cloned().collect();
        self.redraw_all_entities(roster);
        self.relayout_sprites();
        self.clamp_scroll();
        log::info!(
            "board replaced: {}x{}",
            self.scene.board.width(),
            self.scene.board.height()
        );
        Ok(())
    }

    /// Updates one hex after a terrain edit.
    ///
    /// The board is copied on write if the game state still shares it. The
    /// hex and its neighbours are recomposed, and so is every tile the
    /// regenerated shadow map can reach from it.
    pub fn hex_changed(&mut self, c: HexCoord, hex: Hex) -> Result<(), ViewError> {
        let Some(old) = self.scene.board.get(c) else {
            return Err(ViewError::OffBoard(c));
        };
        let height = casting_height(old).max(casting_height(&hex));
        Arc::make_mut(&mut self.scene.board).set(c, hex);
        let mut dropped = self.tiles.invalidate_neighborhood(c);
        if self.shadow.is_some() {
            self.regenerate_shadow()?;
            let reach = self.shadow_reach(height);
            for n in self.scene.board.coords().filter(|n| n.distance(c) <= reach) {
                if self.tiles.invalidate(n) {
                    dropped += 1;
                }
            }
        }
        log::debug!("hex {c} changed, dropped {dropped} cached tiles");
        self.relayout_sprites();
        self.needs_repaint = true;
        Ok(())
    }

    /// Hex distance a shadow cast from a hex of structure `height` can
    /// travel on this board.
    fn shadow_reach(&self, height: i32) -> i32 {
        let board = &self.scene.board;
        let levels = (board.max_elevation() - board.min_elevation()).max(0) + height.max(0);
        let length = self.light.direction().length() * levels as f32;
        let stride = BoardGeometry::new(BASE_ZOOM_INDEX).column_stride() as f32;
        (length / stride).ceil() as i32 + 1
    }

    // -----------------------------------------------------------------------
    // Game state
    // -----------------------------------------------------------------------

    pub fn set_light(&mut self, light: Light) -> Result<(), ViewError> {
        if light == self.light {
            return Ok(());
        }
        self.light = light;
        self.regenerate_shadow()?;
        self.clear_tiles();
        log::info!("light changed to {light:?}");
        self.needs_repaint = true;
        Ok(())
    }

    pub fn set_phase(&mut self, phase: Phase) {
        if phase != self.phase {
            self.phase = phase;
            self.needs_repaint = true;
        }
    }

    /// Replaces the ECM/ECCM tints, recomposing only hexes whose tint
    /// changed. Returns how many hexes that was.
    pub fn set_ecm_colors(&mut self, colors: EcmColors) -> usize {
        let changed = self.ecm.changed_coords(&colors);
        for &c in &changed {
            self.tiles.invalidate(c);
        }
        self.ecm = colors;
        if !changed.is_empty() {
            self.needs_repaint = true;
        }
        changed.len()
    }

    /// Merges the electronic-warfare fields reaching each hex into tints.
    pub fn set_ecm_fields(&mut self, affected: &HashMap<HexCoord, Vec<EcmField>>) -> usize {
        self.set_ecm_colors(process_affected_coords(affected))
    }

    /// Highlights a field of view; with grayscale enabled every hex outside
    /// it is drawn desaturated. `None` removes the highlight.
    pub fn set_fov_highlight(&mut self, fov: Option<HashSet<HexCoord>>) {
        if self.scene.settings.fov_grayscale {
            match (&self.fov, &fov) {
                (None, None) => {}
                (Some(old), Some(new)) => {
                    for &c in old.symmetric_difference(new) {
                        self.tiles.invalidate(c);
                    }
                }
                _ => self.tiles.clear_all(),
            }
        }
        self.fov = fov;
        self.needs_repaint = true;
    }

    // -----------------------------------------------------------------------
    // Entities
    // -----------------------------------------------------------------------

    /// Incremental update after one entity changed.
    pub fn redraw_entity(&mut self, entity: Arc<EntitySnapshot>) {
        self.sprites
            .entities
            .update(&entity, &self.scene.sprite_ctx());
        if self.sprites.moving.contains_key(&entity.id) {
            self.sprites.entities.set_hidden(entity.id, true);
        }
        self.entities.insert(entity.id, entity);
        self.needs_repaint = true;
    }

    /// Rebuilds every unit sprite from a full roster, along with the C3
    /// links and fly-over paths derived from it.
    pub fn redraw_all_entities(&mut self, roster: Vec<Arc<EntitySnapshot>>) {
        let entities: HashMap<EntityId, Arc<EntitySnapshot>> =
            roster.into_iter().map(|e| (e.id, e)).collect();
        let fresh = EntitySprites::rebuild(entities.values(), &self.scene.sprite_ctx());
        self.sprites.entities = fresh;
        self.entities = entities;
        let animated: Vec<EntityId> = self.sprites.moving.keys().copied().collect();
        for id in animated {
            self.sprites.entities.set_hidden(id, true);
        }
        self.refresh_links();
        self.needs_repaint = true;
    }

    /// Forgets an entity and everything drawn for it.
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        let known = self.entities.remove(&id).is_some();
        let had_sprites = self.sprites.entities.remove(id);
        self.sprites.moving.remove(&id);
        self.sprites.ghosts.remove(&id);
        self.sprites.attacks.retain(|a| !a.involves(id));
        self.refresh_links();
        self.needs_repaint = true;
        known || had_sprites
    }

    fn refresh_links(&mut self) {
        let ctx = self.scene.sprite_ctx();
        let shown = |e: &EntitySnapshot| {
            e.position.is_some() && e.visibility == Visibility::Visible && !e.is_destroyed()
        };
        let mut roster: Vec<&Arc<EntitySnapshot>> = self.entities.values().filter(|e| shown(e)).collect();
        roster.sort_by_key(|e| e.id);

        let mut c3 = Vec::new();
        let mut fly_overs = Vec::new();
        for e in &roster {
            let Some(from) = e.position else {
                continue;
            };
            match (e.c3_master, e.c3_network) {
                (Some(master), _) if master != e.id => {
                    let to = self
                        .entities
                        .get(&master)
                        .filter(|m| shown(m))
                        .and_then(|m| m.position);
                    if let Some(to) = to {
                        c3.push(LineSprite::new(LineKind::C3, from, to, e.color));
                    }
                }
                // Peer networks without a master link every pair once.
                (None, Some(net)) => {
                    for peer in roster
                        .iter()
                        .filter(|p| p.id > e.id && p.c3_master.is_none() && p.c3_network == Some(net))
                    {
                        if let Some(to) = peer.position {
                            c3.push(LineSprite::new(LineKind::C3, from, to, e.color));
                        }
                    }
                }
                _ => {}
            }
            for leg in e.fly_over_path.windows(2) {
                fly_overs.push(LineSprite::new(LineKind::FlyOver, leg[0], leg[1], e.color));
            }
        }
        for line in c3.iter_mut().chain(fly_overs.iter_mut()) {
            line.relayout(&ctx);
        }
        self.sprites.c3_links = c3;
        self.sprites.fly_overs = fly_overs;
    }

    /// Starts animating `id` along `path`; the first waypoint is where the
    /// unit starts.
    pub fn add_moving_unit(&mut self, id: EntityId, path: Vec<HexCoord>) {
        self.movement.push(id, path);
    }

    fn apply_step(&mut self, step: MovementStep) {
        match step {
            MovementStep::Moved { id, at, start } => {
                let Some(entity) = self.entities.get(&id).cloned() else {
                    return;
                };
                self.sprites.entities.set_hidden(id, true);
                let ctx = self.scene.sprite_ctx();
                let mut moving = EntitySprite::new(&entity, -1, at, IconStyle::Moving);
                moving.relayout(&ctx);
                self.sprites.moving.insert(id, moving);
                self.sprites.ghosts.entry(id).or_insert_with(|| {
                    let mut ghost = EntitySprite::new(&entity, -1, start, IconStyle::Ghost);
                    ghost.relayout(&ctx);
                    ghost
                });
            }
            MovementStep::Finished { id } => {
                self.sprites.moving.remove(&id);
                self.sprites.ghosts.remove(&id);
                self.sprites.entities.set_hidden(id, false);
                log::debug!("movement of {id:?} finished");
                self.events.push(BoardViewEvent::MovementFinished(id));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Overlay sprites
    // -----------------------------------------------------------------------

    fn laid_out<S: Sprite>(&self, mut sprite: S) -> S {
        sprite.relayout(&self.scene.sprite_ctx());
        sprite
    }

    /// Outlines the hexes a unit can reach, per movement mode.
    pub fn set_movement_envelope(&mut self, envelope: &HashMap<HexCoord, MovementMode>) {
        let sprites = envelope
            .iter()
            .map(|(&c, &mode)| {
                let edges = border_edges(c, |n| envelope.get(&n) == Some(&mode));
                self.laid_out(EnvelopeSprite::new(c, EnvelopeKind::Movement(mode), edges))
            })
            .collect();
        self.sprites.envelope = sprites;
        self.needs_repaint = true;
    }

    /// Shades a weapon's field of fire; values are range brackets from 0
    /// (short) to 3 (extreme).
    pub fn set_field_of_fire(&mut self, field: &HashMap<HexCoord, usize>) {
        let sprites = field
            .iter()
            .map(|(&c, &bracket)| {
                let edges = border_edges(c, |n| field.get(&n) == Some(&bracket));
                self.laid_out(FieldOfFireSprite::new(c, bracket, edges))
            })
            .collect();
        self.sprites.field_of_fire = sprites;
        self.needs_repaint = true;
    }

    pub fn set_deployment_area(&mut self, area: &HashSet<HexCoord>) {
        let sprites = area
            .iter()
            .map(|&c| {
                let edges = border_edges(c, |n| area.contains(&n));
                self.laid_out(EnvelopeSprite::new(c, EnvelopeKind::Deployment, edges))
            })
            .collect();
        self.sprites.deployment = sprites;
        self.needs_repaint = true;
    }

    /// Minefields as `(hex, density)`.
    pub fn set_minefields(&mut self, fields: &[(HexCoord, u32)]) {
        let sprites = fields
            .iter()
            .map(|&(c, density)| self.laid_out(TextMarkerSprite::minefield(c, density)))
            .collect();
        self.sprites.minefields = sprites;
        self.needs_repaint = true;
    }

    pub fn set_movement_path(&mut self, path: &[PathStep]) {
        let sprites = path
            .iter()
            .map(|step| self.laid_out(StepSprite::new(step.clone())))
            .collect();
        self.sprites.path = sprites;
        self.needs_repaint = true;
    }

    /// Aerospace movement vectors as `(from, to)` pairs.
    pub fn set_movement_vectors(&mut self, vectors: &[(HexCoord, HexCoord)]) {
        let sprites = vectors
            .iter()
            .map(|&(a, b)| {
                self.laid_out(LineSprite::new(LineKind::MovementVector, a, b, MOVEMENT_VECTOR_COLOR))
            })
            .collect();
        self.sprites.movement_vectors = sprites;
        self.needs_repaint = true;
    }

    /// Draws a declared attack, merging it into an existing line between
    /// the same two parties. Returns false if either end has no known
    /// position.
    pub fn add_attack(&mut self, action: &AttackAction) -> bool {
        let Some(from) = self.entities.get(&action.attacker).and_then(|e| e.position) else {
            return false;
        };
        let to = match action.target {
            AttackTarget::Entity(id) => self.entities.get(&id).and_then(|e| e.position),
            AttackTarget::Hex(c) => Some(c),
        };
        let Some(to) = to else {
            return false;
        };
        match self.sprites.attacks.iter().position(|a| a.matches(action)) {
            Some(i) => self.sprites.attacks[i].add_attack(action),
            None => {
                let sprite = self.laid_out(AttackSprite::new(action, from, to));
                self.sprites.attacks.push(sprite);
            }
        }
        self.needs_repaint = true;
        true
    }

    pub fn clear_attacks(&mut self) {
        self.sprites.attacks.clear();
        self.needs_repaint = true;
    }

    pub fn set_firing_solutions(&mut self, solutions: &[FiringSolution]) {
        let sprites = solutions
            .iter()
            .map(|s| self.laid_out(TextMarkerSprite::firing_solution(s.coord, &s.to_hit, s.range)))
            .collect();
        self.sprites.firing_solutions = sprites;
        self.needs_repaint = true;
    }

    /// Flares as `(hex, radius in hexes)`.
    pub fn set_flares(&mut self, flares: &[(HexCoord, i32)]) {
        let sprites = flares
            .iter()
            .map(|&(c, radius)| self.laid_out(FlareSprite::new(c, radius)))
            .collect();
        self.sprites.flares = sprites;
        self.needs_repaint = true;
    }

    pub fn set_cursor(&mut self, kind: CursorKind, coord: Option<HexCoord>) {
        let ctx = self.scene.sprite_ctx();
        let Some(cursor) = self.sprites.cursors.get_mut(&kind) else {
            return;
        };
        if cursor.coord() == coord {
            return;
        }
        cursor.set_coord(coord);
        cursor.relayout(&ctx);
        self.needs_repaint = true;
    }

    pub fn cursor(&self, kind: CursorKind) -> Option<HexCoord> {
        self.sprites.cursors.get(&kind).and_then(|c| c.coord())
    }

    /// Shows a measuring line between two hexes, or removes it.
    pub fn set_ruler(&mut self, ends: Option<(HexCoord, HexCoord)>) {
        let ruler = ends.map(|(a, b)| self.laid_out(LineSprite::ruler(a, b)));
        self.sprites.ruler = ruler;
        self.needs_repaint = true;
    }

    /// Adds a text note on a hex, removed after `lifetime_ms` if given.
    /// Returns an id for [`remove_text_marker`](Self::remove_text_marker).
    pub fn add_text_marker(
        &mut self,
        coord: HexCoord,
        text: impl Into<String>,
        color: Color,
        lifetime_ms: Option<u64>,
    ) -> u64 {
        let id = self.next_marker;
        self.next_marker += 1;
        let marker = self.laid_out(TextMarkerSprite::new(coord, text, color));
        self.sprites.text_markers.insert(id, marker);
        if let Some(ms) = lifetime_ms {
            self.timers
                .schedule(ViewTimer::ExpireMarker(id), self.now_ms.saturating_add(ms));
        }
        self.needs_repaint = true;
        id
    }

    pub fn remove_text_marker(&mut self, id: u64) -> bool {
        self.timers.retain(|t| *t != ViewTimer::ExpireMarker(id));
        let removed = self.sprites.text_markers.remove(&id).is_some();
        self.needs_repaint |= removed;
        removed
    }

    pub fn add_overlay(&mut self, overlay: Box<dyn Displayable>) {
        self.overlays.push(overlay);
        self.needs_repaint = true;
    }

    // -----------------------------------------------------------------------
    // Scrolling and queries
    // -----------------------------------------------------------------------

    pub fn set_view_size(&mut self, size: Point) {
        self.view_size = size;
        self.clamp_scroll();
        self.needs_repaint = true;
    }

    /// Scrolls so that board pixel `p` is at the top-left of the view.
    pub fn scroll_to(&mut self, p: Point) {
        self.offset = p;
        self.clamp_scroll();
        self.needs_repaint = true;
    }

    pub fn scroll_by(&mut self, dx: i32, dy: i32) {
        self.scroll_to(self.offset.shift(dx, dy));
    }

    /// Scrolls so that `c` is at the centre of the view. Returns false for
    /// hexes off the board.
    pub fn center_on_hex(&mut self, c: HexCoord) -> bool {
        if !self.scene.board.contains(c) {
            return false;
        }
        let center = self.scene.geometry.hex_center(c, self.scene.lift(c));
        self.scroll_to(center - self.view_center());
        true
    }

    /// The hex under view point `pos`, or [`HexCoord::INVALID`].
    pub fn hex_at(&self, pos: Point) -> HexCoord {
        self.scene
            .geometry
            .pixel_to_hex(pos + self.offset, &self.scene.board, self.scene.settings.isometric)
    }

    /// Tooltips of every sprite under view point `pos`, topmost first.
    pub fn sprite_tooltips_at(&self, pos: Point) -> Vec<String> {
        let p = pos + self.offset;
        let mut tips = Vec::new();
        for layer in SpriteLayer::ORDER {
            if !self.layer_enabled(layer) {
                continue;
            }
            let sprites: Vec<&dyn Sprite> = if layer == SpriteLayer::EntityIcons && self.scene.settings.isometric {
                self.sprites
                    .entities
                    .isometric()
                    .map(|s| s as &dyn Sprite)
                    .collect()
            } else {
                self.sprites.layer(layer)
            };
            tips.extend(
                sprites
                    .into_iter()
                    .filter(|s| !s.is_hidden() && s.is_inside(p))
                    .filter_map(|s| s.tooltip()),
            );
        }
        tips.reverse();
        tips
    }

    fn view_center(&self) -> Point {
        Point::new(self.view_size.x / 2, self.view_size.y / 2)
    }

    /// Keeps the view centre over the board.
    fn clamp_scroll(&mut self) {
        let r = self
            .scene
            .geometry
            .board_rect(&self.scene.board, self.scene.settings.isometric);
        let half = self.view_center();
        let cx = (self.offset.x + half.x).clamp(r.min.x, (r.max.x - 1).max(r.min.x));
        let cy = (self.offset.y + half.y).clamp(r.min.y, (r.max.y - 1).max(r.min.y));
        self.offset = Point::new(cx - half.x, cy - half.y);
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Routes an input event: overlays first, then the board. Returns
    /// whether anything handled it.
    pub fn handle_input(&mut self, event: InputEvent) -> bool {
        match event {
            InputEvent::Key { key, modifiers } => self.handle_key(&key, modifiers),
            InputEvent::Pointer {
                action,
                pos,
                modifiers,
            } => self.handle_pointer(action, pos, modifiers),
        }
    }

    pub fn handle_pointer(&mut self, action: MouseAction, pos: Point, modifiers: ModMask) -> bool {
        for overlay in self.overlays.iter_mut().rev() {
            if overlay.is_hit(pos) && overlay.on_pointer(action, pos, modifiers) {
                self.needs_repaint = true;
                return true;
            }
        }
        match action {
            MouseAction::WheelUp => self.zoom_in(),
            MouseAction::WheelDown => self.zoom_out(),
            MouseAction::Move => {
                let c = self.hex_at(pos);
                if c == self.hover {
                    return false;
                }
                self.hover = c;
                self.set_cursor(CursorKind::Highlight, c.is_valid().then_some(c));
                self.events.push(BoardViewEvent::HexHovered(c));
                true
            }
            MouseAction::Main | MouseAction::Secondary => {
                let coord = self.hex_at(pos);
                if !coord.is_valid() {
                    return false;
                }
                self.events.push(BoardViewEvent::HexClicked {
                    coord,
                    action,
                    modifiers,
                });
                true
            }
        }
    }

    pub fn handle_key(&mut self, key: &Key, modifiers: ModMask) -> bool {
        for overlay in self.overlays.iter_mut().rev() {
            if overlay.on_key(key, modifiers) {
                self.needs_repaint = true;
                return true;
            }
        }
        let fast = if modifiers.contains(ModMask::SHIFT) { 4 } else { 1 };
        let dx = self.scene.geometry.column_stride() * fast;
        let dy = self.scene.geometry.hex_height() * fast;
        match key {
            Key::ArrowLeft => self.scroll_by(-dx, 0),
            Key::ArrowRight => self.scroll_by(dx, 0),
            Key::ArrowUp => self.scroll_by(0, -dy),
            Key::ArrowDown => self.scroll_by(0, dy),
            Key::PageUp => self.scroll_by(0, -self.view_size.y),
            Key::PageDown => self.scroll_by(0, self.view_size.y),
            Key::Char('+') | Key::Char('=') => return self.zoom_in(),
            Key::Char('-') => return self.zoom_out(),
            Key::Home => {
                let board = &self.scene.board;
                let middle = HexCoord::new(board.width() / 2, board.height() / 2);
                return self.center_on_hex(middle);
            }
            Key::Escape => {
                let had_ruler = self.sprites.ruler.is_some();
                self.set_ruler(None);
                return had_ruler;
            }
            _ => return false,
        }
        true
    }

    // -----------------------------------------------------------------------
    // Frame loop
    // -----------------------------------------------------------------------

    /// Advances timers and animations to `now_ms`. Returns whether the view
    /// needs repainting.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        self.now_ms = now_ms;
        for timer in self.timers.pop_due(now_ms) {
            match timer {
                ViewTimer::AssetRetry => {
                    self.retry_scheduled = false;
                    self.needs_repaint = true;
                }
                ViewTimer::ExpireMarker(id) => {
                    if self.sprites.text_markers.remove(&id).is_some() {
                        self.needs_repaint = true;
                    }
                }
            }
        }
        for step in self.movement.tick(now_ms) {
            self.apply_step(step);
            self.needs_repaint = true;
        }
        self.poll_source_frames();
        self.needs_repaint
    }

    /// Reports that source image `id` now shows `frame`. The first frame
    /// change marks the image animated: every cached tile composed from it
    /// is dropped and later tiles using it are never cached. Returns how
    /// many tiles were dropped.
    pub fn image_frame_changed(&mut self, id: ImageId, frame: u32) -> usize {
        if !self.compositor.observe_frame(id, frame) {
            return 0;
        }
        let dropped = self.tiles.invalidate_source(id);
        log::debug!("image {} is animated, dropped {dropped} cached tiles", id.0);
        if dropped > 0 {
            self.needs_repaint = true;
        }
        dropped
    }

    /// Asks the source for the current frame of every image behind a cached
    /// tile.
    fn poll_source_frames(&mut self) -> usize {
        let ids: Vec<ImageId> = self.tiles.source_ids().collect();
        let mut dropped = 0;
        for id in ids {
            if let Some(frame) = self.source.current_frame(id) {
                dropped += self.image_frame_changed(id, frame);
            }
        }
        dropped
    }

    /// Paints the visible part of the board into `target`.
    pub fn paint(&mut self, target: &mut Pixmap) -> Result<PaintReport, ViewError> {
        let mut report = PaintReport::default();
        target.fill(sk_color(BACKGROUND));
        let view = Rect::from_xywh(
            self.offset.x,
            self.offset.y,
            target.width() as i32,
            target.height() as i32,
        );
        let iso = self.scene.settings.isometric;
        let origin = self.offset;
        self.poll_source_frames();
        self.prepare_sprites(view)?;

        // Tiles first: everything that needs `&mut self`.
        let ops = draw_order(view, &self.scene.board, &self.scene.geometry, iso);
        let mut blits: Vec<(i32, Arc<Pixmap>, Point)> = Vec::with_capacity(ops.len());
        for op in ops {
            match op {
                DrawOp::Base(c) => {
                    let image = self.tile(c, &mut report)?;
                    let at = self.scene.geometry.hex_to_pixel(c, self.scene.lift(c));
                    blits.push((c.row, image, at));
                    report.tiles_drawn += 1;
                }
                DrawOp::Ortho(c) => {
                    let ctx = tile_context(&self.scene, self.light, self.shadow.as_ref(), &self.ecm, self.fov.as_ref());
                    let layers = self.compositor.ortho_layers(c, self.source.as_ref(), &ctx)?;
                    let deck = self
                        .scene
                        .board
                        .get(c)
                        .map_or(0, |h| h.elevation + h.bridge.map_or(0, |b| b.elevation));
                    let boxed = self.scene.geometry.hex_rect(c, deck);
                    for layer in layers {
                        let at = Point::new(
                            boxed.min.x + (boxed.width() - layer.width() as i32) / 2,
                            boxed.min.y + (boxed.height() - layer.height() as i32) / 2,
                        );
                        blits.push((c.row, layer, at));
                    }
                }
            }
        }

        let visible = |s: &&IsometricSprite| !s.is_hidden() && s.is_ready() && s.bounds().overlaps(view);
        let mut icons: Vec<&IsometricSprite> = if iso {
            self.sprites.entities.isometric().filter(visible).collect()
        } else {
            Vec::new()
        };
        icons.sort_by_key(|s| (s.coord().row, s.draw_priority()));

        let mut next_icon = 0;
        for (i, (row, image, at)) in blits.iter().enumerate() {
            let local = *at - origin;
            blit(target, image, local.x, local.y, 1.0, None);
            let row_done = blits.get(i + 1).is_none_or(|next| next.0 != *row);
            if row_done {
                while let Some(icon) = icons.get(next_icon).filter(|s| s.coord().row <= *row) {
                    icon.draw_onto(target, origin, 1.0);
                    report.sprites_drawn += 1;
                    next_icon += 1;
                }
            }
        }
        for icon in &icons[next_icon..] {
            icon.draw_onto(target, origin, 1.0);
            report.sprites_drawn += 1;
        }

        for layer in SpriteLayer::ORDER {
            if !self.layer_enabled(layer) || (iso && layer == SpriteLayer::EntityIcons) {
                continue;
            }
            let mut sprites = self.sprites.layer(layer);
            sprites.retain(|s| !s.is_hidden() && s.is_ready() && s.bounds().overlaps(view));
            sprites.sort_by_key(|s| s.draw_priority());
            for sprite in sprites {
                sprite.draw_onto(target, origin, 1.0);
                report.sprites_drawn += 1;
            }
        }

        for icon in icons
            .iter()
            .filter(|s| possibly_occluded(s.coord(), s.height(), &self.scene.board))
        {
            icon.draw_onto(target, origin, SEE_THROUGH_OPACITY);
        }

        for overlay in &mut self.overlays {
            overlay.draw(target, view);
        }

        if report.tiles_pending > 0 && !self.retry_scheduled {
            log::debug!("{} tiles waiting on assets, retrying in {} ms", report.tiles_pending, self.asset_retry_ms);
            self.timers
                .schedule(ViewTimer::AssetRetry, self.now_ms.saturating_add(self.asset_retry_ms));
            self.retry_scheduled = true;
        }
        self.needs_repaint = false;
        Ok(report)
    }

    /// The tile for `c`: cached, or composed now. Only finished tiles from
    /// still sources are cached; malformed terrain is drawn as an error
    /// marker.
    fn tile(&mut self, c: HexCoord, report: &mut PaintReport) -> Result<Arc<Pixmap>, ViewError> {
        if let Some(tile) = self.tiles.get(c) {
            return Ok(tile);
        }
        report.tiles_composed += 1;
        let ctx = tile_context(&self.scene, self.light, self.shadow.as_ref(), &self.ecm, self.fov.as_ref());
        match self.compositor.compose(c, self.source.as_ref(), &ctx) {
            Ok(TileOutcome::Ready {
                image,
                cacheable,
                sources,
            }) => {
                let image = Arc::new(image);
                if cacheable {
                    self.tiles.put_with_sources(c, image.clone(), &sources);
                }
                Ok(image)
            }
            Ok(TileOutcome::Pending(image)) => {
                report.tiles_pending += 1;
                Ok(Arc::new(image))
            }
            Err(RenderError::InvalidTerrain { coord, reason }) => {
                log::warn!("cannot compose hex {coord}: {reason}");
                Ok(Arc::new(error_marker(&self.scene.geometry)?))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn prepare_sprites(&mut self, view: Rect) -> Result<(), ViewError> {
        let ctx = self.scene.sprite_ctx();
        for sprite in self.sprites.drawable_mut(self.scene.settings.isometric) {
            if !sprite.is_ready() && !sprite.is_hidden() && sprite.bounds().overlaps(view) {
                sprite.prepare(&ctx)?;
            }
        }
        Ok(())
    }

    fn layer_enabled(&self, layer: SpriteLayer) -> bool {
        match layer {
            SpriteLayer::Envelope | SpriteLayer::PathSteps | SpriteLayer::MovementVectors => {
                self.phase.shows_movement()
            }
            SpriteLayer::Attacks | SpriteLayer::FiringSolutions | SpriteLayer::FieldOfFire => {
                self.phase.shows_attacks()
            }
            SpriteLayer::Deployment => self.phase.shows_deployment(),
            _ => true,
        }
    }

    fn regenerate_shadow(&mut self) -> Result<(), ViewError> {
        self.shadow = if self.scene.settings.shadows && self.light.casts_shadows() {
            Some(ShadowMap::generate(&self.scene.board, self.light)?)
        } else {
            None
        };
        Ok(())
    }

    fn clear_tiles(&mut self) {
        log::debug!("clearing {} cached tiles", self.tiles.len());
        self.tiles.clear_all();
        self.compositor.clear_scaled();
    }

    fn relayout_sprites(&mut self) {
        self.sprites.relayout_all(&self.scene.sprite_ctx());
    }
}

fn tile_context<'a>(
    scene: &'a Scene,
    light: Light,
    shadow: Option<&'a ShadowMap>,
    ecm: &'a EcmColors,
    fov: Option<&'a HashSet<HexCoord>>,
) -> TileContext<'a> {
    TileContext {
        geometry: &scene.geometry,
        board: &scene.board,
        settings: &scene.settings,
        light,
        shadow: shadow.filter(|_| scene.settings.shadows),
        ecm,
        fov,
        text: &scene.text,
    }
}

/// How far above its ground a hex can throw a shadow from.
fn casting_height(hex: &Hex) -> i32 {
    hex.structure_height()
        .max(hex.bridge.map_or(0, |b| b.elevation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use hexview_core::{StatusFlags, TerrainKind};
    use hexview_render::{AssetState, ImageHandle, SolidTileSource};

    use crate::attack::AttackKind;
    use crate::sprites::SpriteKey;

    fn config() -> ViewConfig {
        ViewConfig {
            view_size: Point::new(200, 200),
            ..ViewConfig::default()
        }
    }

    fn view_with(board: Board) -> BoardView {
        let source = SolidTileSource::new().unwrap();
        BoardView::new(config(), Arc::new(board), Box::new(source)).unwrap()
    }

    fn view() -> BoardView {
        view_with(Board::new(16, 17))
    }

    fn frame() -> Pixmap {
        Pixmap::new(200, 200).unwrap()
    }

    fn unit(id: u32, at: Option<HexCoord>) -> Arc<EntitySnapshot> {
        let mut e = EntitySnapshot::new(EntityId(id), format!("Unit {id}"));
        e.position = at;
        e.color = Color::from_rgb(50, 90, 200);
        Arc::new(e)
    }

    #[test]
    fn one_sprite_per_entity_slot() {
        let mut v = view();
        v.redraw_entity(unit(1, Some(HexCoord::new(2, 2))));
        v.redraw_entity(unit(1, Some(HexCoord::new(2, 3))));
        v.redraw_entity(unit(2, Some(HexCoord::new(4, 4))));
        let entities = &v.sprites().entities;
        assert_eq!(entities.standard_len(), 2);
        assert_eq!(entities.isometric_len(), 2);
        assert!(entities.contains(SpriteKey::new(EntityId(1), -1)));
        let coords: Vec<_> = entities.standard().map(|s| s.coord()).collect();
        assert!(coords.contains(&HexCoord::new(2, 3)));
        assert!(!coords.contains(&HexCoord::new(2, 2)));
    }

    #[test]
    fn clearing_the_position_removes_the_sprites() {
        let mut v = view();
        v.redraw_entity(unit(1, Some(HexCoord::new(2, 2))));
        v.redraw_entity(unit(1, None));
        assert_eq!(v.sprites().entities.standard_len(), 0);
        assert_eq!(v.sprites().entities.isometric_len(), 0);
    }

    #[test]
    fn hidden_enemies_produce_no_sprites() {
        let mut v = view();
        let mut enemy = EntitySnapshot::new(EntityId(9), "Enemy");
        enemy.position = Some(HexCoord::new(5, 5));
        enemy.visibility = Visibility::Hidden;
        v.redraw_all_entities(vec![Arc::new(enemy)]);
        assert_eq!(v.sprites().entities.standard_len(), 0);
    }

    #[test]
    fn painting_caches_visible_tiles() {
        let mut v = view();
        let mut f = frame();
        let first = v.paint(&mut f).unwrap();
        assert!(first.tiles_drawn > 0);
        assert_eq!(first.tiles_composed, first.tiles_drawn);
        assert_eq!(v.cached_tiles(), first.tiles_drawn);
        let second = v.paint(&mut f).unwrap();
        assert_eq!(second.tiles_composed, 0);
        assert!(!v.needs_repaint());
    }

    #[test]
    fn same_zoom_twice_keeps_the_cache() {
        let mut v = view();
        v.paint(&mut frame()).unwrap();
        let cached = v.cached_tiles();
        assert!(cached > 0);
        assert!(!v.set_zoom(BASE_ZOOM_INDEX));
        assert_eq!(v.cached_tiles(), cached);
        assert!(v.set_zoom(BASE_ZOOM_INDEX + 1));
        assert_eq!(v.cached_tiles(), 0);
        assert!(!v.set_zoom(BASE_ZOOM_INDEX + 1));
    }

    #[test]
    fn zooming_keeps_the_centre_hex() {
        let mut v = view();
        let origin = HexCoord::new(0, 0);
        assert!(v.center_on_hex(origin));
        let center = Point::new(100, 100);
        assert_eq!(v.hex_at(center), origin);

        assert!(v.zoom_in());
        let g = *v.geometry();
        assert_eq!(g.zoom_index(), BASE_ZOOM_INDEX + 1);
        assert_eq!(g.hex_to_pixel(origin, 0), g.padding());
        assert!(g.hex_width() > 84);
        assert_eq!(v.hex_at(center), origin);

        assert!(v.zoom_out());
        assert!(v.zoom_out());
        assert_eq!(v.hex_at(center), origin);
    }

    #[test]
    fn ecm_changes_recompose_only_affected_hexes() {
        let mut v = view();
        v.center_on_hex(HexCoord::new(5, 5));
        v.paint(&mut frame()).unwrap();
        let target = HexCoord::new(5, 5);
        assert!(v.is_tile_cached(target));
        assert!(v.is_tile_cached(HexCoord::new(4, 4)));

        let jam = Color::from_rgb(200, 0, 0);
        let counter = Color::from_rgb(0, 0, 200);
        let fields = HashMap::from([(
            target,
            vec![
                EcmField {
                    owner: 1,
                    strength: 1,
                    eccm: false,
                    color: jam,
                },
                EcmField {
                    owner: 2,
                    strength: 1,
                    eccm: true,
                    color: counter,
                },
            ],
        )]);
        assert_eq!(v.set_ecm_fields(&fields), 1);
        assert_eq!(v.ecm_colors().ecm.get(&target), Some(&jam));
        assert_eq!(v.ecm_colors().eccm.get(&target), Some(&counter));
        assert!(!v.is_tile_cached(target));
        assert!(v.is_tile_cached(HexCoord::new(4, 4)));

        // Same colours again change nothing.
        assert_eq!(v.set_ecm_fields(&fields), 0);
    }

    #[test]
    fn terrain_edits_drop_the_neighbourhood() {
        let mut v = view();
        v.update_settings(VisualSettings {
            shadows: false,
            ..VisualSettings::default()
        })
        .unwrap();
        v.center_on_hex(HexCoord::new(5, 5));
        v.paint(&mut frame()).unwrap();
        let c = HexCoord::new(5, 5);
        let far = HexCoord::new(3, 5);
        assert!(v.is_tile_cached(far));
        v.hex_changed(c, Hex::at_elevation(2)).unwrap();
        assert!(!v.is_tile_cached(c));
        for n in c.neighbors() {
            assert!(!v.is_tile_cached(n));
        }
        assert!(v.is_tile_cached(far));
        assert_eq!(v.board().elevation(c), Some(2));

        assert!(matches!(
            v.hex_changed(HexCoord::new(40, 40), Hex::default()),
            Err(ViewError::OffBoard(_))
        ));
    }

    #[test]
    fn shadows_follow_terrain_edits() {
        let mut v = view();
        assert!(v.shadow().is_some());
        v.center_on_hex(HexCoord::new(5, 5));
        v.paint(&mut frame()).unwrap();
        // Two columns west is beyond the neighbourhood but within reach of
        // a tall hill's shadow.
        let west = HexCoord::new(3, 5);
        assert!(v.is_tile_cached(west));
        v.hex_changed(HexCoord::new(5, 5), Hex::at_elevation(4)).unwrap();
        assert!(!v.is_tile_cached(west));
    }

    #[test]
    fn malformed_terrain_is_never_cached() {
        let mut board = Board::new(16, 17);
        let bad = HexCoord::new(1, 1);
        board.set(bad, Hex::default().with_building(0));
        let mut v = view_with(board);
        v.scroll_to(Point::ZERO);
        let report = v.paint(&mut frame()).unwrap();
        assert!(report.tiles_drawn > 0);
        assert!(!v.is_tile_cached(bad));
        assert!(v.is_tile_cached(HexCoord::new(0, 0)));
    }

    struct SlowSource {
        ready: Arc<AtomicBool>,
        inner: SolidTileSource,
    }

    impl TileSource for SlowSource {
        fn base(&self, coord: HexCoord, hex: &Hex) -> AssetState<ImageHandle> {
            if self.ready.load(Ordering::Relaxed) {
                self.inner.base(coord, hex)
            } else {
                AssetState::Loading
            }
        }
    }

    /// Solid terrain whose base images all advance one shared frame
    /// counter, like an animated water texture.
    struct FlowingSource {
        frame: Arc<AtomicU32>,
        inner: SolidTileSource,
    }

    impl TileSource for FlowingSource {
        fn base(&self, coord: HexCoord, hex: &Hex) -> AssetState<ImageHandle> {
            match self.inner.base(coord, hex) {
                AssetState::Ready(mut handle) => {
                    handle.frame = self.frame.load(Ordering::Relaxed);
                    AssetState::Ready(handle)
                }
                other => other,
            }
        }

        fn current_frame(&self, _id: ImageId) -> Option<u32> {
            Some(self.frame.load(Ordering::Relaxed))
        }
    }

    #[test]
    fn advancing_frames_evict_and_stop_caching_tiles() {
        let frame_no = Arc::new(AtomicU32::new(0));
        let source = FlowingSource {
            frame: frame_no.clone(),
            inner: SolidTileSource::new().unwrap(),
        };
        let mut v = BoardView::new(config(), Arc::new(Board::new(6, 6)), Box::new(source)).unwrap();
        let mut f = frame();
        let first = v.paint(&mut f).unwrap();
        assert_eq!(v.cached_tiles(), first.tiles_drawn);

        // Paint alone notices the new frame.
        frame_no.store(1, Ordering::Relaxed);
        let second = v.paint(&mut f).unwrap();
        assert_eq!(second.tiles_composed, second.tiles_drawn);
        assert_eq!(v.cached_tiles(), 0);

        frame_no.store(2, Ordering::Relaxed);
        let third = v.paint(&mut f).unwrap();
        assert_eq!(third.tiles_composed, third.tiles_drawn);
        assert_eq!(v.cached_tiles(), 0);
    }

    #[test]
    fn frame_change_notice_drops_tiles_using_the_image() {
        let mut board = Board::new(6, 6);
        let water = HexCoord::new(0, 0);
        board.set(water, Hex::default().with_terrain(TerrainKind::Water));
        let mut v = view_with(board);
        v.scroll_to(Point::ZERO);
        let mut f = frame();
        v.paint(&mut f).unwrap();
        let cached = v.cached_tiles();
        assert!(v.is_tile_cached(water));

        let clear = ImageId(1000);
        assert_eq!(v.image_frame_changed(clear, 0), 0);
        assert_eq!(v.image_frame_changed(clear, 1), cached - 1);
        assert_eq!(v.cached_tiles(), 1);
        assert!(v.is_tile_cached(water));
        assert!(v.tick(0));

        v.paint(&mut f).unwrap();
        assert_eq!(v.cached_tiles(), 1);
        assert_eq!(v.image_frame_changed(clear, 2), 0);
    }

    #[test]
    fn loading_assets_are_retried() {
        let ready = Arc::new(AtomicBool::new(false));
        let source = SlowSource {
            ready: ready.clone(),
            inner: SolidTileSource::new().unwrap(),
        };
        let mut v = BoardView::new(config(), Arc::new(Board::new(6, 6)), Box::new(source)).unwrap();
        let report = v.paint(&mut frame()).unwrap();
        assert!(report.tiles_pending > 0);
        assert_eq!(v.cached_tiles(), 0);
        assert!(!v.tick(10));

        ready.store(true, Ordering::Relaxed);
        assert!(v.tick(crate::config::ASSET_RETRY_MS));
        let report = v.paint(&mut frame()).unwrap();
        assert_eq!(report.tiles_pending, 0);
        assert!(v.cached_tiles() > 0);
    }

    #[test]
    fn settings_changes_use_their_scope() {
        let mut v = view();
        v.paint(&mut frame()).unwrap();
        let cached = v.cached_tiles();

        let labels_off = VisualSettings {
            unit_labels: false,
            ..VisualSettings::default()
        };
        assert_eq!(v.update_settings(labels_off.clone()).unwrap(), Invalidation::Sprites);
        assert_eq!(v.cached_tiles(), cached);
        assert_eq!(v.update_settings(labels_off.clone()).unwrap(), Invalidation::None);

        let no_shadows = VisualSettings {
            shadows: false,
            ..labels_off
        };
        assert_eq!(v.update_settings(no_shadows).unwrap(), Invalidation::Tiles);
        assert_eq!(v.cached_tiles(), 0);
        assert!(v.shadow().is_none());

        assert_eq!(
            v.update_settings(VisualSettings::default()).unwrap(),
            Invalidation::ShadowAndTiles
        );
        assert!(v.shadow().is_some());
    }

    #[test]
    fn darkness_drops_the_shadow_map() {
        let mut v = view();
        v.paint(&mut frame()).unwrap();
        v.set_light(Light::Moonless).unwrap();
        assert!(v.shadow().is_none());
        assert_eq!(v.cached_tiles(), 0);
    }

    #[test]
    fn animation_hides_the_unit_and_reports_completion() {
        let mut v = view();
        let id = EntityId(3);
        v.redraw_entity(unit(3, Some(HexCoord::new(2, 2))));
        v.add_moving_unit(id, vec![HexCoord::new(2, 2), HexCoord::new(2, 3), HexCoord::new(2, 4)]);

        assert!(v.tick(0));
        assert_eq!(v.sprites().moving.get(&id).map(|s| s.coord()), Some(HexCoord::new(2, 3)));
        assert_eq!(v.sprites().ghosts.get(&id).map(|s| s.coord()), Some(HexCoord::new(2, 2)));
        assert!(v.sprites().entities.standard().all(|s| s.is_hidden()));

        v.tick(crate::config::STEP_INTERVAL_MS);
        assert_eq!(v.sprites().moving.get(&id).map(|s| s.coord()), Some(HexCoord::new(2, 4)));
        assert!(v.take_events().is_empty());

        v.tick(2 * crate::config::STEP_INTERVAL_MS);
        assert!(v.sprites().moving.is_empty());
        assert!(v.sprites().ghosts.is_empty());
        assert!(v.sprites().entities.standard().all(|s| !s.is_hidden()));
        assert_eq!(v.take_events(), vec![BoardViewEvent::MovementFinished(id)]);
    }

    #[test]
    fn attacks_need_known_ends_and_merge() {
        let mut v = view();
        v.redraw_all_entities(vec![unit(1, Some(HexCoord::new(1, 1))), unit(2, Some(HexCoord::new(4, 4)))]);
        let kick = AttackAction::new(EntityId(1), AttackTarget::Entity(EntityId(2)), AttackKind::Kick);
        let punch = AttackAction::new(EntityId(2), AttackTarget::Entity(EntityId(1)), AttackKind::Punch);
        assert!(v.add_attack(&kick));
        assert!(v.add_attack(&punch));
        assert_eq!(v.sprites().attacks.len(), 1);
        assert!(v.sprites().attacks[0].is_bidirectional());

        let stray = AttackAction::new(EntityId(7), AttackTarget::Entity(EntityId(2)), AttackKind::Kick);
        assert!(!v.add_attack(&stray));

        v.remove_entity(EntityId(2));
        assert!(v.sprites().attacks.is_empty());
    }

    #[test]
    fn phase_gates_overlay_layers() {
        let mut v = view();
        v.set_phase(Phase::Movement);
        assert!(v.layer_enabled(SpriteLayer::PathSteps));
        assert!(!v.layer_enabled(SpriteLayer::Attacks));
        v.set_phase(Phase::Firing);
        assert!(v.layer_enabled(SpriteLayer::Attacks));
        assert!(!v.layer_enabled(SpriteLayer::Envelope));
        assert!(v.layer_enabled(SpriteLayer::EntityIcons));
    }

    #[test]
    fn c3_links_come_from_the_roster() {
        let mut v = view();
        let master = unit(1, Some(HexCoord::new(1, 1)));
        let mut slave = (*unit(2, Some(HexCoord::new(3, 3)))).clone();
        slave.c3_master = Some(EntityId(1));
        let mut peers: Vec<Arc<EntitySnapshot>> = (10..13)
            .map(|i| {
                let mut e = (*unit(i, Some(HexCoord::new(i as i32 - 5, 8)))).clone();
                e.c3_network = Some(4);
                Arc::new(e)
            })
            .collect();
        let mut flyer = (*unit(20, Some(HexCoord::new(9, 9)))).clone();
        flyer.fly_over_path = vec![HexCoord::new(9, 9), HexCoord::new(10, 9), HexCoord::new(11, 9)];

        peers.extend([master, Arc::new(slave), Arc::new(flyer)]);
        v.redraw_all_entities(peers);
        // One master link plus three peer pairs.
        assert_eq!(v.sprites().c3_links.len(), 4);
        assert_eq!(v.sprites().fly_overs.len(), 2);
    }

    #[test]
    fn text_markers_expire() {
        let mut v = view();
        v.tick(1_000);
        let id = v.add_text_marker(HexCoord::new(2, 2), "Boom", Color::WHITE, Some(500));
        let keep = v.add_text_marker(HexCoord::new(3, 2), "Note", Color::WHITE, None);
        assert_ne!(id, keep);
        v.paint(&mut frame()).unwrap();
        assert!(!v.tick(1_400));
        assert!(v.tick(1_500));
        assert_eq!(v.sprites().text_markers.len(), 1);
        assert!(v.remove_text_marker(keep));
        assert!(v.sprites().text_markers.is_empty());
    }

    struct Button {
        area: Rect,
        clicks: Arc<AtomicBool>,
    }

    impl Displayable for Button {
        fn draw(&mut self, target: &mut Pixmap, _view: Rect) {
            hexview_render::canvas::fill_rect(
                target,
                self.area.min.x as f32,
                self.area.min.y as f32,
                self.area.width() as f32,
                self.area.height() as f32,
                Color::WHITE,
            );
        }

        fn is_hit(&self, pos: Point) -> bool {
            self.area.contains(pos)
        }

        fn on_pointer(&mut self, action: MouseAction, _pos: Point, _modifiers: ModMask) -> bool {
            if action == MouseAction::Main {
                self.clicks.store(true, Ordering::Relaxed);
                return true;
            }
            false
        }
    }

    #[test]
    fn overlays_see_input_first() {
        let mut v = view();
        let clicked = Arc::new(AtomicBool::new(false));
        v.add_overlay(Box::new(Button {
            area: Rect::from_xywh(0, 0, 20, 20),
            clicks: clicked.clone(),
        }));
        v.scroll_to(Point::ZERO);
        assert!(v.handle_input(InputEvent::pointer(MouseAction::Main, Point::new(5, 5))));
        assert!(clicked.load(Ordering::Relaxed));
        assert!(v.take_events().is_empty());

        // Outside the overlay the board gets the click.
        let on_board = Point::new(126, 108);
        assert!(v.handle_input(InputEvent::pointer(MouseAction::Main, on_board)));
        assert_eq!(
            v.take_events(),
            vec![BoardViewEvent::HexClicked {
                coord: HexCoord::new(0, 0),
                action: MouseAction::Main,
                modifiers: ModMask::NONE,
            }]
        );

        let mut f = frame();
        v.paint(&mut f).unwrap();
        let px = f.pixel(5, 5).unwrap();
        assert_eq!((px.red(), px.green(), px.blue()), (255, 255, 255));
    }

    #[test]
    fn hovering_moves_the_highlight_cursor() {
        let mut v = view();
        v.scroll_to(Point::ZERO);
        assert!(v.handle_pointer(MouseAction::Move, Point::new(126, 108), ModMask::NONE));
        assert_eq!(v.cursor(CursorKind::Highlight), Some(HexCoord::new(0, 0)));
        assert!(!v.handle_pointer(MouseAction::Move, Point::new(127, 108), ModMask::NONE));
        assert!(v.handle_pointer(MouseAction::Move, Point::new(2, 2), ModMask::NONE));
        assert_eq!(v.cursor(CursorKind::Highlight), None);
        assert_eq!(
            v.take_events(),
            vec![
                BoardViewEvent::HexHovered(HexCoord::new(0, 0)),
                BoardViewEvent::HexHovered(HexCoord::INVALID)
            ]
        );
    }

    #[test]
    fn tooltips_report_units_under_the_pointer() {
        let mut v = view();
        v.scroll_to(Point::ZERO);
        let mut e = (*unit(5, Some(HexCoord::new(0, 0)))).clone();
        e.status = StatusFlags::PRONE;
        v.redraw_entity(Arc::new(e));
        let tips = v.sprite_tooltips_at(Point::new(126, 108));
        assert_eq!(tips.len(), 1);
        assert!(tips[0].starts_with("Unit 5"));
        assert!(tips[0].ends_with("prone"));
        assert!(v.sprite_tooltips_at(Point::new(300, 300)).is_empty());
    }

    #[test]
    fn isometric_paint_draws_units_over_terrain() {
        let mut board = Board::new(8, 8);
        board.set(HexCoord::new(1, 2), Hex::at_elevation(3));
        let mut v = view_with(board);
        v.update_settings(VisualSettings {
            isometric: true,
            ..VisualSettings::default()
        })
        .unwrap();
        v.redraw_entity(unit(1, Some(HexCoord::new(1, 1))));
        v.scroll_to(Point::ZERO);
        let report = v.paint(&mut frame()).unwrap();
        assert!(report.sprites_drawn >= 1);
        assert!(report.tiles_drawn > 0);
    }

    fn rgb_at(f: &Pixmap, p: Point) -> (u8, u8, u8) {
        let px = f.pixel(p.x as u32, p.y as u32).unwrap();
        (px.red(), px.green(), px.blue())
    }

    /// Paints an isometric board with a unit at (2, 2) and the hex south of
    /// it raised to `front`. Returns the frame and a view pixel inside the
    /// unit's disc.
    fn iso_scene(front: i32, with_unit: bool) -> (Pixmap, Point) {
        let behind = HexCoord::new(2, 2);
        let mut board = Board::new(8, 8);
        board.set(HexCoord::new(2, 3), Hex::at_elevation(front));
        let mut v = view_with(board);
        v.update_settings(VisualSettings {
            isometric: true,
            ..VisualSettings::default()
        })
        .unwrap();
        if with_unit {
            v.redraw_entity(unit(1, Some(behind)));
        }
        assert!(v.center_on_hex(behind));
        let mut f = frame();
        v.paint(&mut f).unwrap();
        // Left of the centre, clear of the glyph.
        let at = v.geometry().hex_center(behind, 0).shift(-12, 0) - v.offset();
        (f, at)
    }

    #[test]
    fn isometric_units_behind_taller_hexes_show_through() {
        let blue = (50, 90, 200);
        let (open, at) = iso_scene(0, true);
        assert_eq!(rgb_at(&open, at), blue);

        // Five levels lift the front hex over the unit's centre. Its tile is
        // drawn after the unit's row, then the unit shows through at half
        // opacity.
        let (terrain, at) = iso_scene(5, false);
        let (occluded, same) = iso_scene(5, true);
        assert_eq!(at, same);
        let t = rgb_at(&terrain, at);
        assert_ne!(t, blue);
        let o = rgb_at(&occluded, at);
        let mid = |a: u8, b: u8| (a as i32 + b as i32) / 2;
        for (got, want) in [(o.0, mid(t.0, blue.0)), (o.1, mid(t.1, blue.1)), (o.2, mid(t.2, blue.2))] {
            assert!(
                (got as i32 - want).abs() <= 2,
                "{o:?} is not halfway between {t:?} and {blue:?}"
            );
        }
    }
}
