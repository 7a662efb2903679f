//! Duplicate folding.
//!
//! Two passes: identity folding reuses the tiles of an earlier request that
//! points at the same source with the same processing policy (done before any
//! pixel work), and content folding maps pixel-identical processed tiles onto
//! one atlas slot. Slots are handed out densely in first-seen order, so a
//! folded tile never leaves a hole that has to be renumbered later.

use std::collections::HashMap;

use md5::{Digest, Md5};

use crate::process::{ProcessParams, ProcessedTile};
use crate::source::SourceKey;

/// Hex MD5 over the raw RGBA bytes followed by width and height as 3-byte
/// little-endian integers.
pub fn content_hash(rgba: &image::RgbaImage) -> String {
    let mut hasher = Md5::new();
    hasher.update(rgba.as_raw());
    hasher.update(&rgba.width().to_le_bytes()[..3]);
    hasher.update(&rgba.height().to_le_bytes()[..3]);
    hex::encode(hasher.finalize())
}

/// Same unprocessed source, same processing: guaranteed same pixels.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub source: SourceKey,
    pub params: ProcessParams,
}

/// Remembers the first owner of every identity key.
#[derive(Debug, Default)]
pub struct IdentityIndex {
    seen: HashMap<IdentityKey, usize>,
}

impl IdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the earlier owner of `key`, or records `owner` and returns `None`.
    pub fn fold(&mut self, key: IdentityKey, owner: usize) -> Option<usize> {
        match self.seen.get(&key) {
            Some(&first) => Some(first),
            None => {
                self.seen.insert(key, owner);
                None
            }
        }
    }
}

/// Tile -> atlas slot mapping.
#[derive(Debug, Clone, Default)]
pub struct SlotTable {
    /// Slot of each tile; `None` for tiles that were dropped.
    pub slot_of_tile: Vec<Option<usize>>,
    /// Representative tile of each slot.
    pub representatives: Vec<usize>,
    /// Tiles that reused another tile's slot.
    pub folded: usize,
}

impl SlotTable {
    pub fn slot_count(&self) -> usize {
        self.representatives.len()
    }
}

/// Assigns atlas slots. With `remove_duplicates`, tiles with equal content hash
/// share a slot unless either is exempt (diced or custom-geometry tiles).
pub fn assign_slots(tiles: &[Option<ProcessedTile>], remove_duplicates: bool) -> SlotTable {
    let mut table = SlotTable {
        slot_of_tile: Vec::with_capacity(tiles.len()),
        ..Default::default()
    };
    let mut by_hash: HashMap<&str, usize> = HashMap::new();
    for (i, tile) in tiles.iter().enumerate() {
        let Some(tile) = tile else {
            table.slot_of_tile.push(None);
            continue;
        };
        if remove_duplicates && !tile.dedup_exempt {
            if let Some(&slot) = by_hash.get(tile.hash.as_str()) {
                table.slot_of_tile.push(Some(slot));
                table.folded += 1;
                continue;
            }
        }
        let slot = table.representatives.len();
        table.representatives.push(i);
        table.slot_of_tile.push(Some(slot));
        if remove_duplicates && !tile.dedup_exempt {
            by_hash.insert(tile.hash.as_str(), slot);
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rect;
    use crate::process::TileOrigin;
    use image::{Rgba, RgbaImage};

    fn tile(px: u8, exempt: bool) -> Option<ProcessedTile> {
        let mut t = ProcessedTile::transparent((4, 4), 0, TileOrigin::Sprite { sprite: 0 });
        t.rgba = RgbaImage::from_pixel(2, 2, Rgba([px, px, px, 255]));
        t.trim = Rect::new(0, 0, 2, 2);
        t.hash = content_hash(&t.rgba);
        t.dedup_exempt = exempt;
        Some(t)
    }

    #[test]
    fn hash_includes_dimensions() {
        let a = RgbaImage::new(2, 8);
        let b = RgbaImage::new(8, 2);
        assert_eq!(a.as_raw(), b.as_raw());
        assert_ne!(content_hash(&a), content_hash(&b));
        assert_eq!(content_hash(&a).len(), 32);
    }

    #[test]
    fn slots_are_dense_and_exempt_tiles_stay_apart() {
        let tiles = vec![tile(1, false), tile(2, false), None, tile(1, false), tile(1, true)];
        let t = assign_slots(&tiles, true);
        assert_eq!(t.slot_of_tile, vec![Some(0), Some(1), None, Some(0), Some(2)]);
        assert_eq!(t.representatives, vec![0, 1, 4]);
        assert_eq!(t.folded, 1);

        let t = assign_slots(&tiles, false);
        assert_eq!(t.slot_of_tile, vec![Some(0), Some(1), None, Some(2), Some(3)]);
        assert_eq!(t.folded, 0);
    }
}
