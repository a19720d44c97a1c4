//! GID allocation.
//!
//! Each (plane, library) pair referenced by a map gets its own block of
//! [`GID_BLOCK_SIZE`] GIDs, in the order the pairs are first seen. A tile's
//! GID is then `first_gid + image_index`. Blocks are sized for the largest
//! possible library rather than the actual one, so allocation never needs to
//! look at the libraries themselves.
//!
//! GIDs are `u64`, so the number of blocks is not bounded by the address
//! space. Tiled itself only reads 28-bit GIDs; maps past that are exported
//! with a warning.

use std::collections::HashMap;

use serde::Serialize;

use super::Plane;
use crate::source::{MapGrid, TileRef};

/// GIDs reserved per source library.
pub const GID_BLOCK_SIZE: u64 = 32767;

/// A global tile ID. 0 means "no tile".
pub type Gid = u64;

/// Tiled keeps flip/rotation flags in the top four bits of a GID.
const TILED_GID_LIMIT: Gid = 0x0FFF_FFFF;

/// A tileset reference of the map document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TilesetRef {
    pub plane: Plane,
    pub file_index: u32,
    pub first_gid: Gid,
}

impl TilesetRef {
    /// `source` attribute value, relative to the map document.
    pub fn source(&self) -> String {
        format!("{}.tsx", self.plane.tileset_name(self.file_index))
    }

    /// Half-open GID range reserved for this tileset.
    pub fn gid_range(&self) -> std::ops::Range<Gid> {
        self.first_gid..self.first_gid + GID_BLOCK_SIZE
    }
}

/// Allocation table for one map export. Build a fresh one per map.
#[derive(Debug, Clone, Default)]
pub struct GidAllocator {
    first_gids: HashMap<(Plane, u32), Gid>,
    /// Discovery order, which is also ascending `first_gid` order.
    tilesets: Vec<TilesetRef>,
}

impl GidAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan a map in discovery order and allocate a block for every
    /// referenced pair.
    ///
    /// Background is visited on even coordinates only (height outer, width
    /// inner), since each background tile covers a 2×2 block. Middle and
    /// object planes follow at full resolution.
    pub fn scan(map: &MapGrid) -> Self {
        let mut gids = Self::new();

        for h in (0..map.height()).step_by(2) {
            for w in (0..map.width()).step_by(2) {
                if let Some(tile) = map.cell(w, h).background {
                    gids.allocate(Plane::Background, tile.file_index);
                }
            }
        }
        for h in 0..map.height() {
            for w in 0..map.width() {
                if let Some(tile) = map.cell(w, h).middle {
                    gids.allocate(Plane::Middle, tile.file_index);
                }
            }
        }
        for h in 0..map.height() {
            for w in 0..map.width() {
                if let Some(tile) = map.cell(w, h).object {
                    gids.allocate(Plane::Object, tile.file_index);
                }
            }
        }

        if let Some(last) = gids.tilesets.last() {
            if last.gid_range().end - 1 > TILED_GID_LIMIT {
                log::warn!(
                    "{} tilesets reserve GIDs up to {}, past what Tiled can address",
                    gids.tilesets.len(),
                    last.gid_range().end - 1
                );
            }
        }

        gids
    }

    /// First GID of the pair's block, allocating the next block on first use.
    pub fn allocate(&mut self, plane: Plane, file_index: u32) -> Gid {
        if let Some(&first_gid) = self.first_gids.get(&(plane, file_index)) {
            return first_gid;
        }
        let first_gid = self.tilesets.len() as Gid * GID_BLOCK_SIZE + 1;
        self.first_gids.insert((plane, file_index), first_gid);
        self.tilesets.push(TilesetRef {
            plane,
            file_index,
            first_gid,
        });
        first_gid
    }

    pub fn first_gid(&self, plane: Plane, file_index: u32) -> Option<Gid> {
        self.first_gids.get(&(plane, file_index)).copied()
    }

    /// GID of one tile, or `None` if its library was never allocated.
    ///
    /// Image indices past the block size still add up; the result then lands
    /// in the next block, see [`TilesetRef::gid_range`].
    pub fn gid(&self, plane: Plane, tile: TileRef) -> Option<Gid> {
        let first_gid = self.first_gid(plane, tile.file_index)?;
        Some(first_gid + Gid::from(tile.image_index))
    }

    /// Allocated tilesets by ascending `first_gid`.
    pub fn tilesets(&self) -> &[TilesetRef] {
        &self.tilesets
    }

    pub fn len(&self) -> usize {
        self.tilesets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tilesets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed_map() -> MapGrid {
        let mut map = MapGrid::new(6, 6);
        map.set_background(2, 0, TileRef::new(3, 1));
        map.set_background(0, 2, TileRef::new(0, 4));
        map.set_background(4, 4, TileRef::new(3, 9));
        map.set_middle(5, 1, TileRef::new(1, 0));
        map.set_middle(0, 3, TileRef::new(0, 2));
        map.set_object(1, 0, TileRef::new(7, 5));
        map.set_object(2, 5, TileRef::new(7, 6));
        map.set_object(3, 3, TileRef::new(0, 6));
        map
    }

    #[test]
    fn first_allocation_starts_at_one() {
        let mut gids = GidAllocator::new();
        assert_eq!(gids.allocate(Plane::Object, 42), 1);
    }

    #[test]
    fn repeated_allocation_returns_same_block() {
        let mut gids = GidAllocator::new();
        let a = gids.allocate(Plane::Middle, 2);
        gids.allocate(Plane::Middle, 5);
        assert_eq!(gids.allocate(Plane::Middle, 2), a);
        assert_eq!(gids.len(), 2);
    }

    #[test]
    fn same_file_index_on_different_planes_gets_different_blocks() {
        let mut gids = GidAllocator::new();
        let bg = gids.allocate(Plane::Background, 0);
        let mid = gids.allocate(Plane::Middle, 0);
        let obj = gids.allocate(Plane::Object, 0);
        assert_eq!([bg, mid, obj], [1, 32768, 65535]);
    }

    #[test]
    fn nth_pair_gets_nth_block() {
        let gids = GidAllocator::scan(&mixed_map());
        for (n, tileset) in gids.tilesets().iter().enumerate() {
            assert_eq!(tileset.first_gid, n as Gid * GID_BLOCK_SIZE + 1);
        }
    }

    #[test]
    fn scan_follows_plane_major_discovery_order() {
        let gids = GidAllocator::scan(&mixed_map());
        let order: Vec<(Plane, u32)> = gids
            .tilesets()
            .iter()
            .map(|t| (t.plane, t.file_index))
            .collect();
        assert_eq!(
            order,
            vec![
                (Plane::Background, 3),
                (Plane::Background, 0),
                (Plane::Middle, 1),
                (Plane::Middle, 0),
                (Plane::Object, 7),
                (Plane::Object, 0),
            ]
        );
    }

    #[test]
    fn scan_is_deterministic() {
        let map = mixed_map();
        let a = GidAllocator::scan(&map);
        let b = GidAllocator::scan(&map);
        assert_eq!(a.tilesets(), b.tilesets());
    }

    #[test]
    fn blocks_are_disjoint() {
        let gids = GidAllocator::scan(&mixed_map());
        let sets = gids.tilesets();
        for (i, a) in sets.iter().enumerate() {
            for b in &sets[i + 1..] {
                let (ra, rb) = (a.gid_range(), b.gid_range());
                assert!(ra.end <= rb.start || rb.end <= ra.start, "{:?} {:?}", a, b);
            }
        }
    }

    #[test]
    fn background_scan_skips_odd_coordinates() {
        let mut map = MapGrid::new(4, 4);
        map.set_background(1, 0, TileRef::new(1, 0));
        map.set_background(0, 1, TileRef::new(2, 0));
        map.set_background(3, 3, TileRef::new(3, 0));

        let gids = GidAllocator::scan(&map);
        assert!(gids.is_empty());
    }

    #[test]
    fn large_file_indices_need_no_table_capacity() {
        let mut map = MapGrid::new(2, 1);
        map.set_middle(0, 0, TileRef::new(5000, 0));
        map.set_middle(1, 0, TileRef::new(u32::MAX, 0));

        let gids = GidAllocator::scan(&map);
        assert_eq!(gids.first_gid(Plane::Middle, 5000), Some(1));
        assert_eq!(gids.first_gid(Plane::Middle, u32::MAX), Some(32768));
    }

    #[test]
    fn block_starts_keep_increasing_past_u32_range() {
        let mut gids = GidAllocator::new();
        let mut previous = 0;
        for file_index in 0..131_080u32 {
            let first_gid = gids.allocate(Plane::Object, file_index);
            assert!(first_gid > previous, "pair {} got {} after {}", file_index, first_gid, previous);
            previous = first_gid;
        }
        assert_eq!(previous, 131_079 * GID_BLOCK_SIZE + 1);
        assert!(previous > u32::MAX as Gid);

        let last = gids.tilesets().last().unwrap();
        let first = gids.tilesets()[0];
        assert!(first.gid_range().end <= last.gid_range().start);
        assert_eq!(
            gids.gid(Plane::Object, TileRef::new(131_079, u32::MAX)),
            Some(previous + u32::MAX as Gid)
        );
    }

    #[test]
    fn gid_adds_image_index_to_block_start() {
        let mut gids = GidAllocator::new();
        gids.allocate(Plane::Background, 0);
        gids.allocate(Plane::Object, 4);

        assert_eq!(gids.gid(Plane::Object, TileRef::new(4, 10)), Some(32778));
        assert_eq!(gids.gid(Plane::Object, TileRef::new(5, 10)), None);
    }

    #[test]
    fn tileset_source_names() {
        let t = TilesetRef {
            plane: Plane::Middle,
            file_index: 0,
            first_gid: 1,
        };
        assert_eq!(t.source(), "smtiles.tsx");
        assert_eq!(t.gid_range(), 1..32768);
    }
}
