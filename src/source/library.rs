use std::path::PathBuf;

use anyhow::{bail, Result};

/// One entry of an image library.
///
/// `rgb` holds packed pixels, 3 bytes each in R, G, B order, row-major.
/// Empty entries still report the width and height recorded in the library
/// index; they take part in the tileset's declared cell size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub rgb: Option<Vec<u8>>,
}

impl Texture {
    pub fn new(width: u32, height: u32, rgb: Vec<u8>) -> Self {
        Self {
            width,
            height,
            rgb: Some(rgb),
        }
    }

    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rgb: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rgb.is_none()
    }

    /// Packed pixels of a non-empty entry, checked against its dimensions.
    pub fn pixels(&self) -> Result<Option<&[u8]>> {
        let Some(rgb) = &self.rgb else {
            return Ok(None);
        };
        if self.width == 0 || self.height == 0 {
            bail!(
                "Texture {}x{} has pixel data but no area",
                self.width,
                self.height
            );
        }
        let expected = self.width as usize * self.height as usize * 3;
        if rgb.len() != expected {
            bail!(
                "Texture {}x{} should hold {} bytes of RGB data, got {}",
                self.width,
                self.height,
                expected,
                rgb.len()
            );
        }
        Ok(Some(rgb.as_slice()))
    }
}

/// An ordered, indexable image library such as `Tiles.wil` or `Objects3.wzl`.
pub trait ImageLibrary {
    fn count(&self) -> usize;

    /// Entry at `index`. Fails when the underlying data is missing or corrupt.
    fn texture(&self, index: usize) -> Result<Texture>;
}

/// Library held fully in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLibrary {
    pub textures: Vec<Texture>,
}

impl MemoryLibrary {
    pub fn new(textures: Vec<Texture>) -> Self {
        Self { textures }
    }
}

impl ImageLibrary for MemoryLibrary {
    fn count(&self) -> usize {
        self.textures.len()
    }

    fn texture(&self, index: usize) -> Result<Texture> {
        match self.textures.get(index) {
            Some(tex) => Ok(tex.clone()),
            None => bail!(
                "Texture index {} out of range (library holds {})",
                index,
                self.textures.len()
            ),
        }
    }
}

/// A library to export: the tileset name and the file it is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryJob {
    /// Lowercase file stem, e.g. `smtiles2`. Used as the tileset name.
    pub name: String,
    pub path: PathBuf,
}

/// Opens image libraries for the batch exporter.
pub trait LibraryLoader: Send + Sync {
    fn load_library(&self, job: &LibraryJob) -> Result<Box<dyn ImageLibrary + Send>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixels_checks_buffer_length() {
        let tex = Texture::new(2, 2, vec![0; 11]);
        let err = tex.pixels().unwrap_err();
        assert!(err.to_string().contains("should hold 12 bytes"));

        let tex = Texture::new(2, 2, vec![0; 12]);
        assert_eq!(tex.pixels().unwrap().map(|p| p.len()), Some(12));
    }

    #[test]
    fn zero_sized_texture_with_data_is_rejected() {
        let err = Texture::new(0, 3, vec![]).pixels().unwrap_err();
        assert!(err.to_string().contains("no area"));
        assert!(Texture::new(5, 0, vec![]).pixels().is_err());
        assert!(Texture::empty(0, 0).pixels().unwrap().is_none());
    }

    #[test]
    fn empty_texture_has_no_pixels() {
        let tex = Texture::empty(48, 32);
        assert!(tex.is_empty());
        assert!(tex.pixels().unwrap().is_none());
    }

    #[test]
    fn memory_library_out_of_range_is_an_error() {
        let lib = MemoryLibrary::new(vec![Texture::empty(1, 1)]);
        assert_eq!(lib.count(), 1);
        assert!(lib.texture(0).is_ok());
        assert!(lib.texture(1).is_err());
    }
}
