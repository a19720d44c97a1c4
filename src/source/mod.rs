//! Read-only inputs for the exporters.
//!
//! Decoding the client's binary `.wil`/`.wzl`/`.map` files happens elsewhere;
//! whatever decodes them hands the results over through the types and loader
//! traits in this module.

pub mod discover;
pub mod library;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub use library::{ImageLibrary, LibraryJob, LibraryLoader, MemoryLibrary, Texture};

/// Reference from a map cell into one image of one source library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileRef {
    pub file_index: u32,
    pub image_index: u32,
}

impl TileRef {
    pub fn new(file_index: u32, image_index: u32) -> Self {
        Self {
            file_index,
            image_index,
        }
    }
}

/// One map cell. Each plane is independently optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapCell {
    pub background: Option<TileRef>,
    pub middle: Option<TileRef>,
    pub object: Option<TileRef>,
}

/// Full-resolution cell grid of one map, stored row-major.
///
/// Background references are authored at half resolution: only cells on even
/// coordinates are expected to carry one, each covering a 2×2 block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapGrid {
    width: u32,
    height: u32,
    cells: Vec<MapCell>,
}

impl MapGrid {
    /// An empty grid where no cell carries any reference.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![MapCell::default(); width as usize * height as usize],
        }
    }

    /// Build a grid from row-major cells, as a map decoder would.
    pub fn from_cells(width: u32, height: u32, cells: Vec<MapCell>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if cells.len() != expected {
            bail!(
                "Map grid {}x{} needs {} cells, got {}",
                width,
                height,
                expected,
                cells.len()
            );
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Cell at storage coordinate `(w, h)`. Panics when out of bounds.
    pub fn cell(&self, w: u32, h: u32) -> &MapCell {
        &self.cells[self.index(w, h)]
    }

    pub fn cell_mut(&mut self, w: u32, h: u32) -> &mut MapCell {
        let idx = self.index(w, h);
        &mut self.cells[idx]
    }

    pub fn set_background(&mut self, w: u32, h: u32, tile: TileRef) {
        self.cell_mut(w, h).background = Some(tile);
    }

    pub fn set_middle(&mut self, w: u32, h: u32, tile: TileRef) {
        self.cell_mut(w, h).middle = Some(tile);
    }

    pub fn set_object(&mut self, w: u32, h: u32, tile: TileRef) {
        self.cell_mut(w, h).object = Some(tile);
    }

    fn index(&self, w: u32, h: u32) -> usize {
        assert!(
            w < self.width && h < self.height,
            "cell ({}, {}) outside {}x{} map",
            w,
            h,
            self.width,
            self.height
        );
        h as usize * self.width as usize + w as usize
    }
}

/// Source of decoded maps, keyed by map name (e.g. `"0"`, `"bsr02"`).
pub trait MapLoader: Send + Sync {
    fn load_map(&self, name: &str) -> Result<MapGrid>;
}
