//! Tileset (`.tsx`) export.
//!
//! A library `tiles2` is written as:
//! - `<out>/tiles2.tsx`, one `<tile>` per library entry
//! - `<out>/tiles2/<index>.png` for every non-empty entry
//! - `<out>/empty.png`, shared by the empty entries of all tilesets

use std::path::{Path, PathBuf};

use super::texture::{placeholder_image, rgb_to_image, save_png};
use super::{
    already_exported, create_dir, escape_attr, write_document, ExportOptions, ExportOutcome,
};
use crate::error::ExportError;
use crate::source::{ImageLibrary, LibraryJob, LibraryLoader};

/// One `<tile>` entry and the image it shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileImage {
    pub width: u32,
    pub height: u32,
    /// Path relative to the tileset document.
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilesetDocument {
    pub name: String,
    /// Largest entry width in the library. Tiles of other sizes override it
    /// through their own image size.
    pub tile_width: u32,
    pub tile_height: u32,
    pub tiles: Vec<TileImage>,
}

impl TilesetDocument {
    pub fn render(&self) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str(&format!(
            "<tileset name=\"{}\" tilewidth=\"{}\" tileheight=\"{}\" tilecount=\"{}\" columns=\"0\">\n",
            escape_attr(&self.name),
            self.tile_width,
            self.tile_height,
            self.tiles.len()
        ));
        xml.push_str(" <grid orientation=\"orthogonal\" width=\"1\" height=\"1\"/>\n");
        for (id, tile) in self.tiles.iter().enumerate() {
            xml.push_str(&format!(" <tile id=\"{}\">\n", id));
            xml.push_str(&format!(
                "  <image width=\"{}\" height=\"{}\" source=\"{}\"/>\n",
                tile.width,
                tile.height,
                escape_attr(&tile.source)
            ));
            xml.push_str(" </tile>\n");
        }
        xml.push_str("</tileset>\n");
        xml
    }
}

pub fn tileset_path(out_dir: &Path, name: &str) -> PathBuf {
    out_dir.join(format!("{}.tsx", name))
}

/// Write the shared placeholder image unless it is already there.
pub fn ensure_placeholder(out_dir: &Path, options: &ExportOptions) -> Result<(), ExportError> {
    let path = out_dir.join(&options.placeholder_name);
    if path.exists() {
        return Ok(());
    }
    create_dir(out_dir)?;
    save_png(&placeholder_image(), &path).map_err(|source| ExportError::Write { path, source })
}

/// Export one library as tileset `name` into `out_dir`.
///
/// Does nothing when `<name>.tsx` already exists (unless overwriting). The
/// document is written last, so an export that stops early leaves no `.tsx`
/// behind and is redone on the next run.
pub fn export_tileset(
    out_dir: &Path,
    name: &str,
    library: &dyn ImageLibrary,
    options: &ExportOptions,
) -> Result<ExportOutcome, ExportError> {
    let path = tileset_path(out_dir, name);
    if already_exported(&path, options) {
        log::info!("Tileset {} already exported, skipping", name);
        return Ok(ExportOutcome::Skipped { path });
    }
    write_tileset(out_dir, name, library, options, path)
}

/// Like [`export_tileset`], but only opens the library when it is needed.
pub fn export_tileset_from(
    out_dir: &Path,
    job: &LibraryJob,
    loader: &dyn LibraryLoader,
    options: &ExportOptions,
) -> Result<ExportOutcome, ExportError> {
    let path = tileset_path(out_dir, &job.name);
    if already_exported(&path, options) {
        log::info!("Tileset {} already exported, skipping", job.name);
        return Ok(ExportOutcome::Skipped { path });
    }
    let library = loader
        .load_library(job)
        .map_err(|e| ExportError::source_read(&job.name, e))?;
    write_tileset(out_dir, &job.name, &*library, options, path)
}

fn write_tileset(
    out_dir: &Path,
    name: &str,
    library: &dyn ImageLibrary,
    options: &ExportOptions,
    path: PathBuf,
) -> Result<ExportOutcome, ExportError> {
    ensure_placeholder(out_dir, options)?;
    let image_dir = out_dir.join(name);
    create_dir(&image_dir)?;

    let count = library.count();
    let mut doc = TilesetDocument {
        name: name.to_string(),
        tile_width: 0,
        tile_height: 0,
        tiles: Vec::with_capacity(count),
    };

    for index in 0..count {
        let tex = library
            .texture(index)
            .map_err(|e| ExportError::source_read(name, e.context(format!("entry {}", index))))?;
        doc.tile_width = doc.tile_width.max(tex.width);
        doc.tile_height = doc.tile_height.max(tex.height);

        let rgb = tex
            .pixels()
            .map_err(|e| ExportError::source_read(name, e.context(format!("entry {}", index))))?;
        let Some(rgb) = rgb else {
            doc.tiles.push(TileImage {
                width: 1,
                height: 1,
                source: options.placeholder_name.clone(),
            });
            continue;
        };

        let img = rgb_to_image(tex.width, tex.height, rgb)
            .map_err(|e| ExportError::source_read(name, e))?;
        let png_path = image_dir.join(format!("{}.png", index));
        save_png(&img, &png_path).map_err(|source| ExportError::Write {
            path: png_path,
            source,
        })?;
        doc.tiles.push(TileImage {
            width: tex.width,
            height: tex.height,
            source: format!("{}/{}.png", name, index),
        });
    }

    write_document(&path, &doc.render())?;
    log::info!(
        "Exported tileset {} ({} tiles, cell {}x{})",
        name,
        count,
        doc.tile_width,
        doc.tile_height
    );
    Ok(ExportOutcome::Exported { path })
}
