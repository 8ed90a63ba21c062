//! Cache of composed hex tiles, keyed by coordinate.
//!
//! Entries are removed on invalidation, never flagged, so a lookup only ever
//! returns an image composed against the current inputs. Each entry also
//! records the source images it was composed from, so a source that turns
//! out to be animated can evict every tile that used it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use hexview_core::HexCoord;
use tiny_skia::Pixmap;

use crate::assets::ImageId;

/// Lookup statistics since the last [`HexImageCache::reset_stats`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug)]
struct CachedTile {
    image: Arc<Pixmap>,
    sources: Vec<ImageId>,
}

#[derive(Debug, Default)]
pub struct HexImageCache {
    entries: HashMap<HexCoord, CachedTile>,
    users: HashMap<ImageId, HashSet<HexCoord>>,
    stats: CacheStats,
}

impl HexImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached tile for `c`, if any.
    pub fn get(&mut self, c: HexCoord) -> Option<Arc<Pixmap>> {
        let hit = self.entries.get(&c).map(|t| t.image.clone());
        if hit.is_some() {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        hit
    }

    /// Whether a tile is cached for `c`, without touching the statistics.
    pub fn contains(&self, c: HexCoord) -> bool {
        self.entries.contains_key(&c)
    }

    /// Stores the tile for `c`. Invalid coordinates are ignored.
    pub fn put(&mut self, c: HexCoord, image: Arc<Pixmap>) {
        self.put_with_sources(c, image, &[]);
    }

    /// Stores the tile for `c`, remembering the source images it was
    /// composed from.
    pub fn put_with_sources(&mut self, c: HexCoord, image: Arc<Pixmap>, sources: &[ImageId]) {
        if !c.is_valid() {
            return;
        }
        self.invalidate(c);
        for &id in sources {
            self.users.entry(id).or_default().insert(c);
        }
        self.entries.insert(
            c,
            CachedTile {
                image,
                sources: sources.to_vec(),
            },
        );
    }

    /// Drops the tile for `c`. Returns whether one was cached.
    pub fn invalidate(&mut self, c: HexCoord) -> bool {
        let Some(tile) = self.entries.remove(&c) else {
            return false;
        };
        for id in tile.sources {
            if let Some(coords) = self.users.get_mut(&id) {
                coords.remove(&c);
                if coords.is_empty() {
                    self.users.remove(&id);
                }
            }
        }
        true
    }

    /// Drops every tile composed from `id`. Returns how many were cached.
    pub fn invalidate_source(&mut self, id: ImageId) -> usize {
        let Some(coords) = self.users.remove(&id) else {
            return 0;
        };
        coords.into_iter().filter(|&c| self.invalidate(c)).count()
    }

    /// Source images used by at least one cached tile.
    pub fn source_ids(&self) -> impl Iterator<Item = ImageId> + '_ {
        self.users.keys().copied()
    }

    /// Drops the tiles for `c` and its six neighbours, whose shadows,
    /// curtains and incline marks depend on `c`. Returns how many were
    /// cached.
    pub fn invalidate_neighborhood(&mut self, c: HexCoord) -> usize {
        if !c.is_valid() {
            return 0;
        }
        std::iter::once(c)
            .chain(c.neighbors())
            .filter(|&n| self.invalidate(n))
            .count()
    }

    pub fn clear_all(&mut self) {
        if !self.entries.is_empty() {
            log::debug!("clearing {} cached hex tiles", self.entries.len());
        }
        self.entries.clear();
        self.users.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = CacheStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile() -> Arc<Pixmap> {
        Arc::new(Pixmap::new(4, 4).unwrap())
    }

    #[test]
    fn put_then_get_returns_the_image() {
        let mut cache = HexImageCache::new();
        let c = HexCoord::new(2, 3);
        let img = tile();
        cache.put(c, img.clone());
        let got = cache.get(c).unwrap();
        assert!(Arc::ptr_eq(&got, &img));
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 0 });
    }

    #[test]
    fn invalidate_forces_a_miss() {
        let mut cache = HexImageCache::new();
        let c = HexCoord::new(0, 0);
        cache.put(c, tile());
        assert!(cache.invalidate(c));
        assert!(!cache.invalidate(c));
        assert!(cache.get(c).is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn neighbourhood_invalidation_touches_exactly_seven_hexes() {
        let mut cache = HexImageCache::new();
        for col in 0..8 {
            for row in 0..8 {
                cache.put(HexCoord::new(col, row), tile());
            }
        }
        let c = HexCoord::new(3, 3);
        assert_eq!(cache.invalidate_neighborhood(c), 7);
        assert_eq!(cache.len(), 64 - 7);
        assert!(!cache.contains(c));
        for n in c.neighbors() {
            assert!(!cache.contains(n));
        }
        assert!(cache.contains(HexCoord::new(3, 5)));
        assert!(cache.contains(HexCoord::new(5, 3)));
    }

    #[test]
    fn invalid_coordinates_are_never_cached() {
        let mut cache = HexImageCache::new();
        cache.put(HexCoord::INVALID, tile());
        assert!(cache.is_empty());
        cache.put(HexCoord::new(1, 1), tile());
        cache.clear_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn invalid_neighbourhood_is_a_no_op() {
        let mut cache = HexImageCache::new();
        cache.put(HexCoord::new(0, 0), tile());
        assert_eq!(cache.invalidate_neighborhood(HexCoord::INVALID), 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn source_invalidation_drops_only_its_users() {
        let mut cache = HexImageCache::new();
        let (grass, woods) = (ImageId(1), ImageId(2));
        cache.put_with_sources(HexCoord::new(0, 0), tile(), &[grass]);
        cache.put_with_sources(HexCoord::new(1, 0), tile(), &[grass, woods]);
        cache.put_with_sources(HexCoord::new(2, 0), tile(), &[woods]);
        assert_eq!(cache.invalidate_source(woods), 2);
        assert!(cache.contains(HexCoord::new(0, 0)));
        assert!(!cache.contains(HexCoord::new(2, 0)));
        assert_eq!(cache.source_ids().collect::<Vec<_>>(), vec![grass]);
        assert_eq!(cache.invalidate_source(woods), 0);

        // Re-storing a tile forgets the sources it was composed from before.
        cache.put_with_sources(HexCoord::new(0, 0), tile(), &[woods]);
        assert_eq!(cache.invalidate_source(grass), 0);
        assert_eq!(cache.len(), 1);
    }
}
