//! Per-plane tile layers of the map document.

use super::gid::{Gid, GidAllocator, GID_BLOCK_SIZE};
use super::Plane;
use crate::source::{MapGrid, TileRef};

/// A full-resolution grid of GIDs, 0 meaning "no tile".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLayer {
    pub plane: Plane,
    pub width: u32,
    pub height: u32,
    /// Row-major GIDs.
    pub data: Vec<Gid>,
}

impl TileLayer {
    pub fn name(&self) -> &'static str {
        self.plane.layer_name()
    }

    /// GID at `(w, h)`, or `None` outside the layer.
    pub fn get(&self, w: u32, h: u32) -> Option<Gid> {
        if w >= self.width || h >= self.height {
            return None;
        }
        self.data
            .get(h as usize * self.width as usize + w as usize)
            .copied()
    }

    /// Tiled CSV payload: one line per row, values separated by commas, and
    /// no comma after the last value of the last row.
    pub fn to_csv(&self) -> String {
        let mut out = String::with_capacity(self.data.len() * 2);
        let last = self.data.len();
        for (i, gid) in self.data.iter().enumerate() {
            out.push_str(&gid.to_string());
            if i + 1 != last {
                out.push(',');
            }
            if (i + 1) % self.width as usize == 0 {
                out.push('\n');
            }
        }
        out
    }
}

/// Background reference shown at exported position `(w, h)`.
///
/// The client draws a background tile one cell below where it is stored,
/// without any horizontal offset, so export row `h` shows storage row `h - 1`
/// and row 0 never has a background tile.
pub fn background_at(map: &MapGrid, w: u32, h: u32) -> Option<TileRef> {
    if h == 0 {
        return None;
    }
    map.cell(w, h - 1).background
}

/// Reference of `plane` shown at exported position `(w, h)`.
pub fn plane_at(map: &MapGrid, plane: Plane, w: u32, h: u32) -> Option<TileRef> {
    match plane {
        Plane::Background => background_at(map, w, h),
        Plane::Middle => map.cell(w, h).middle,
        Plane::Object => map.cell(w, h).object,
    }
}

/// Encode one plane of `map` against an allocation table built from it.
///
/// References whose library has no block are written as 0. With a table from
/// [`GidAllocator::scan`] this only happens to background tiles stored on odd
/// coordinates, which the allocation scan never visits.
///
/// Image indices that do not fit a GID block are kept as is and reported
/// once per layer.
pub fn encode_layer(map: &MapGrid, gids: &GidAllocator, plane: Plane) -> TileLayer {
    let mut data = Vec::with_capacity(map.width() as usize * map.height() as usize);
    let mut unallocated = 0usize;
    let mut overflowing = 0usize;

    for h in 0..map.height() {
        for w in 0..map.width() {
            let gid = match plane_at(map, plane, w, h) {
                Some(tile) => {
                    if Gid::from(tile.image_index) >= GID_BLOCK_SIZE {
                        overflowing += 1;
                    }
                    gids.gid(plane, tile).unwrap_or_else(|| {
                        unallocated += 1;
                        0
                    })
                }
                None => 0,
            };
            data.push(gid);
        }
    }

    if unallocated > 0 {
        log::warn!(
            "{} {} references point at libraries without a GID block; written as empty",
            unallocated,
            plane.layer_name()
        );
    }
    if overflowing > 0 {
        log::warn!(
            "{} {} references have an image index of {} or more and run into the next GID block",
            overflowing,
            plane.layer_name(),
            GID_BLOCK_SIZE
        );
    }

    TileLayer {
        plane,
        width: map.width(),
        height: map.height(),
        data,
    }
}

/// The `base`, `mid` and `obj` layers, in that order.
pub fn encode_layers(map: &MapGrid, gids: &GidAllocator) -> [TileLayer; 3] {
    Plane::ALL.map(|plane| encode_layer(map, gids, plane))
}
