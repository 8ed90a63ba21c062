//! Sprite collections owned by the board view.
//!
//! [`EntitySprites`] keeps the flat and isometric unit icons in two maps
//! keyed by [`SpriteKey`], updated in lockstep. [`BoardSprites`] groups every
//! other sprite category and answers "what is drawn in this layer".

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use hexview_core::{EntityId, EntitySnapshot, Visibility};

use crate::sprites::{
    AttackSprite, CursorKind, CursorSprite, EntitySprite, EnvelopeSprite, FieldOfFireSprite,
    FlareSprite, IconStyle, IsometricSprite, LineSprite, Sprite, SpriteContext, SpriteKey,
    SpriteLayer, StepSprite, TextMarkerSprite, WreckSprite,
};

/// Unit icons and wrecks for every entity on the board.
#[derive(Debug, Default)]
pub struct EntitySprites {
    standard: HashMap<SpriteKey, EntitySprite>,
    isometric: HashMap<SpriteKey, IsometricSprite>,
    wrecks: HashMap<SpriteKey, WreckSprite>,
    /// Slots each entity had sprites for at its last update.
    occupied: HashMap<EntityId, Vec<i32>>,
}

impl EntitySprites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the sprites of `entity` with ones matching its snapshot.
    ///
    /// Sprites for every slot the entity previously occupied are removed
    /// from both maps first. Entities without a position, or hidden from
    /// the local player, end up with no sprite; destroyed ones get wrecks.
    pub fn update(&mut self, entity: &Arc<EntitySnapshot>, ctx: &SpriteContext<'_>) {
        self.remove(entity.id);
        let slots = entity.occupied_slots();
        if slots.is_empty() {
            return;
        }
        if entity.is_destroyed() {
            for &(slot, coord) in &slots {
                let mut wreck = WreckSprite::new(entity, slot, coord);
                wreck.relayout(ctx);
                self.wrecks.insert(wreck.key(), wreck);
            }
        } else {
            let style = match entity.visibility {
                Visibility::Visible => IconStyle::Normal,
                Visibility::SensorReturn => IconStyle::SensorReturn,
                Visibility::Hidden => return,
            };
            for &(slot, coord) in &slots {
                let mut flat = EntitySprite::new(entity, slot, coord, style);
                flat.relayout(ctx);
                self.standard.insert(flat.key(), flat);
                let mut iso = IsometricSprite::new(entity, slot, coord, style);
                iso.relayout(ctx);
                self.isometric.insert(iso.key(), iso);
            }
        }
        self.occupied
            .insert(entity.id, slots.iter().map(|&(slot, _)| slot).collect());
    }

    /// Drops every sprite of `id`. Returns whether it had any.
    pub fn remove(&mut self, id: EntityId) -> bool {
        let Some(slots) = self.occupied.remove(&id) else {
            return false;
        };
        for slot in slots {
            let key = SpriteKey::new(id, slot);
            self.standard.remove(&key);
            self.isometric.remove(&key);
            self.wrecks.remove(&key);
        }
        true
    }

    /// Builds a fresh set of collections for `entities`.
    pub fn rebuild<'a>(
        entities: impl IntoIterator<Item = &'a Arc<EntitySnapshot>>,
        ctx: &SpriteContext<'_>,
    ) -> Self {
        let mut fresh = Self::new();
        for entity in entities {
            fresh.update(entity, ctx);
        }
        fresh
    }

    /// Hides or shows the icons of `id`, e.g. while it is being animated.
    pub fn set_hidden(&mut self, id: EntityId, hidden: bool) {
        let Some(slots) = self.occupied.get(&id) else {
            return;
        };
        for &slot in slots {
            let key = SpriteKey::new(id, slot);
            if let Some(s) = self.standard.get_mut(&key) {
                s.set_hidden(hidden);
            }
            if let Some(s) = self.isometric.get_mut(&key) {
                s.set_hidden(hidden);
            }
        }
    }

    pub fn standard(&self) -> impl Iterator<Item = &EntitySprite> {
        self.standard.values()
    }

    pub fn isometric(&self) -> impl Iterator<Item = &IsometricSprite> {
        self.isometric.values()
    }

    pub fn wrecks(&self) -> impl Iterator<Item = &WreckSprite> {
        self.wrecks.values()
    }

    pub fn standard_len(&self) -> usize {
        self.standard.len()
    }

    pub fn isometric_len(&self) -> usize {
        self.isometric.len()
    }

    pub fn wreck_len(&self) -> usize {
        self.wrecks.len()
    }

    pub fn contains(&self, key: SpriteKey) -> bool {
        self.standard.contains_key(&key) || self.wrecks.contains_key(&key)
    }

    fn sprites_mut(&mut self, flat: bool, isometric: bool) -> Vec<&mut dyn Sprite> {
        let mut out: Vec<&mut dyn Sprite> = Vec::new();
        if flat {
            out.extend(dyn_all_mut(self.standard.values_mut()));
        }
        if isometric {
            out.extend(dyn_all_mut(self.isometric.values_mut()));
        }
        out.extend(dyn_all_mut(self.wrecks.values_mut()));
        out
    }
}

// ---------------------------------------------------------------------------
// All board sprites
// ---------------------------------------------------------------------------

/// Every sprite category drawn over the terrain.
#[derive(Debug)]
pub struct BoardSprites {
    pub entities: EntitySprites,
    pub moving: HashMap<EntityId, EntitySprite>,
    pub ghosts: HashMap<EntityId, EntitySprite>,
    pub field_of_fire: Vec<FieldOfFireSprite>,
    pub envelope: Vec<EnvelopeSprite>,
    pub minefields: Vec<TextMarkerSprite>,
    /// Host notes, drawn with the minefield markers.
    pub text_markers: BTreeMap<u64, TextMarkerSprite>,
    pub cursors: BTreeMap<CursorKind, CursorSprite>,
    pub deployment: Vec<EnvelopeSprite>,
    pub flares: Vec<FlareSprite>,
    pub c3_links: Vec<LineSprite>,
    pub fly_overs: Vec<LineSprite>,
    pub attacks: Vec<AttackSprite>,
    pub movement_vectors: Vec<LineSprite>,
    pub path: Vec<StepSprite>,
    pub firing_solutions: Vec<TextMarkerSprite>,
    pub ruler: Option<LineSprite>,
}

impl Default for BoardSprites {
    fn default() -> Self {
        Self {
            entities: EntitySprites::default(),
            moving: HashMap::new(),
            ghosts: HashMap::new(),
            field_of_fire: Vec::new(),
            envelope: Vec::new(),
            minefields: Vec::new(),
            text_markers: BTreeMap::new(),
            cursors: CursorKind::ALL
                .into_iter()
                .map(|k| (k, CursorSprite::new(k)))
                .collect(),
            deployment: Vec::new(),
            flares: Vec::new(),
            c3_links: Vec::new(),
            fly_overs: Vec::new(),
            attacks: Vec::new(),
            movement_vectors: Vec::new(),
            path: Vec::new(),
            firing_solutions: Vec::new(),
            ruler: None,
        }
    }
}

fn dyn_all<'a, S: Sprite + 'a>(it: impl Iterator<Item = &'a S>) -> impl Iterator<Item = &'a dyn Sprite> {
    it.map(|s| s as &dyn Sprite)
}

fn dyn_all_mut<'a, S: Sprite + 'a>(
    it: impl Iterator<Item = &'a mut S>,
) -> impl Iterator<Item = &'a mut dyn Sprite> {
    it.map(|s| s as &mut dyn Sprite)
}

impl BoardSprites {
    /// The flat sprites drawn in `layer`, unsorted. Isometric unit icons
    /// are drawn with the terrain and are not part of any layer.
    pub fn layer(&self, layer: SpriteLayer) -> Vec<&dyn Sprite> {
        match layer {
            SpriteLayer::Wrecks => dyn_all(self.entities.wrecks()).collect(),
            SpriteLayer::FieldOfFire => dyn_all(self.field_of_fire.iter()).collect(),
            SpriteLayer::Envelope => dyn_all(self.envelope.iter()).collect(),
            SpriteLayer::Minefields => dyn_all(self.minefields.iter())
                .chain(dyn_all(self.text_markers.values()))
                .collect(),
            SpriteLayer::Cursors => dyn_all(self.cursors.values()).collect(),
            SpriteLayer::Deployment => dyn_all(self.deployment.iter()).collect(),
            SpriteLayer::Flares => dyn_all(self.flares.iter()).collect(),
            SpriteLayer::C3Links => dyn_all(self.c3_links.iter()).collect(),
            SpriteLayer::FlyOvers => dyn_all(self.fly_overs.iter()).collect(),
            SpriteLayer::EntityIcons => dyn_all(self.entities.standard()).collect(),
            SpriteLayer::MovingIcons => dyn_all(self.moving.values()).collect(),
            SpriteLayer::GhostIcons => dyn_all(self.ghosts.values()).collect(),
            SpriteLayer::Attacks => dyn_all(self.attacks.iter()).collect(),
            SpriteLayer::MovementVectors => dyn_all(self.movement_vectors.iter()).collect(),
            SpriteLayer::PathSteps => dyn_all(self.path.iter()).collect(),
            SpriteLayer::FiringSolutions => dyn_all(self.firing_solutions.iter()).collect(),
            SpriteLayer::Ruler => dyn_all(self.ruler.iter()).collect(),
        }
    }

    /// Every sprite, including both unit icon maps.
    pub fn all_mut(&mut self) -> Vec<&mut dyn Sprite> {
        self.collect_mut(true, true)
    }

    /// The sprites that can be drawn in the current mode: the isometric
    /// unit icons in isometric mode, the flat ones otherwise.
    pub fn drawable_mut(&mut self, isometric: bool) -> Vec<&mut dyn Sprite> {
        self.collect_mut(!isometric, isometric)
    }

    fn collect_mut(&mut self, flat: bool, isometric: bool) -> Vec<&mut dyn Sprite> {
        let mut out = self.entities.sprites_mut(flat, isometric);
        out.extend(dyn_all_mut(self.moving.values_mut()));
        out.extend(dyn_all_mut(self.ghosts.values_mut()));
        out.extend(dyn_all_mut(self.field_of_fire.iter_mut()));
        out.extend(dyn_all_mut(self.envelope.iter_mut()));
        out.extend(dyn_all_mut(self.minefields.iter_mut()));
        out.extend(dyn_all_mut(self.text_markers.values_mut()));
        out.extend(dyn_all_mut(self.cursors.values_mut()));
        out.extend(dyn_all_mut(self.deployment.iter_mut()));
        out.extend(dyn_all_mut(self.flares.iter_mut()));
        out.extend(dyn_all_mut(self.c3_links.iter_mut()));
        out.extend(dyn_all_mut(self.fly_overs.iter_mut()));
        out.extend(dyn_all_mut(self.attacks.iter_mut()));
        out.extend(dyn_all_mut(self.movement_vectors.iter_mut()));
        out.extend(dyn_all_mut(self.path.iter_mut()));
        out.extend(dyn_all_mut(self.firing_solutions.iter_mut()));
        out.extend(dyn_all_mut(self.ruler.iter_mut()));
        out
    }

    pub fn relayout_all(&mut self, ctx: &SpriteContext<'_>) {
        for sprite in self.all_mut() {
            sprite.relayout(ctx);
        }
    }
}
