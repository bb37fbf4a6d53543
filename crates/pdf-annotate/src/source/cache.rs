//! Rendered page cache for sources whose renders are expensive

use crate::constants::MAX_CACHED_PAGES;
use crate::raster::Raster;
use crate::types::Rotation;
use std::collections::{HashMap, VecDeque};

/// Identifies one render: 1-based page, scale bits, effective rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderKey {
    page_number: u32,
    scale_bits: u32,
    degrees: u16,
}

impl RenderKey {
    pub fn new(page_number: u32, scale: f32, rotation: Rotation) -> Self {
        Self {
            page_number,
            scale_bits: scale.to_bits(),
            degrees: rotation.degrees(),
        }
    }
}

/// Least recently used cache of page rasters
pub struct PageCache {
    pages: HashMap<RenderKey, Raster>,
    order: VecDeque<RenderKey>,
    capacity: usize,
}

impl Default for PageCache {
    fn default() -> Self {
        Self::with_capacity(MAX_CACHED_PAGES)
    }
}

impl PageCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pages: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn get(&mut self, key: &RenderKey) -> Option<Raster> {
        let raster = self.pages.get(key)?.clone();
        self.touch(*key);
        Some(raster)
    }

    pub fn insert(&mut self, key: RenderKey, raster: Raster) {
        if self.pages.contains_key(&key) {
            self.order.retain(|k| k != &key);
        }

        // Evict LRU if full
        while self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.pages.remove(&oldest);
            }
        }

        self.pages.insert(key, raster);
        self.order.push_back(key);
    }

    fn touch(&mut self, key: RenderKey) {
        self.order.retain(|k| k != &key);
        self.order.push_back(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(page: u32) -> RenderKey {
        RenderKey::new(page, 1.0, Rotation::NONE)
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = PageCache::with_capacity(2);
        cache.insert(key(1), Raster::filled(1, 1, [0; 4]));
        cache.insert(key(2), Raster::filled(2, 2, [0; 4]));
        assert!(cache.get(&key(1)).is_some());

        cache.insert(key(3), Raster::filled(3, 3, [0; 4]));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key(2)).is_none());
        assert_eq!(cache.get(&key(1)).map(|r| r.width), Some(1));
        assert_eq!(cache.get(&key(3)).map(|r| r.width), Some(3));
    }

    #[test]
    fn scale_and_rotation_are_part_of_the_key() {
        let mut cache = PageCache::default();
        cache.insert(key(1), Raster::filled(1, 1, [0; 4]));

        assert!(cache.get(&RenderKey::new(1, 0.5, Rotation::NONE)).is_none());
        assert!(cache.get(&RenderKey::new(1, 1.0, Rotation::from_degrees(90).unwrap())).is_none());
        assert!(cache.get(&key(1)).is_some());
    }

    #[test]
    fn reinserting_replaces_entry() {
        let mut cache = PageCache::with_capacity(2);
        cache.insert(key(1), Raster::filled(1, 1, [0; 4]));
        cache.insert(key(1), Raster::filled(4, 4, [0; 4]));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key(1)).map(|r| r.width), Some(4));
    }
}
