//! Map (`.tmx`) export.

use std::path::{Path, PathBuf};

use super::gid::{GidAllocator, TilesetRef};
use super::layer::{encode_layers, TileLayer};
use super::{
    already_exported, create_dir, escape_attr, write_document, ExportOptions, ExportOutcome,
    MAP_TILE_HEIGHT, MAP_TILE_WIDTH,
};
use crate::error::ExportError;
use crate::source::{MapGrid, MapLoader};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapDocument {
    pub width: u32,
    pub height: u32,
    /// Ascending `first_gid`.
    pub tilesets: Vec<TilesetRef>,
    /// `base`, `mid`, `obj`.
    pub layers: [TileLayer; 3],
}

impl MapDocument {
    /// Allocate GIDs for `map` and encode its layers. The allocator lives
    /// only for this call.
    pub fn build(map: &MapGrid) -> Self {
        let gids = GidAllocator::scan(map);
        Self::with_gids(map, &gids)
    }

    pub fn with_gids(map: &MapGrid, gids: &GidAllocator) -> Self {
        Self {
            width: map.width(),
            height: map.height(),
            tilesets: gids.tilesets().to_vec(),
            layers: encode_layers(map, gids),
        }
    }

    pub fn render(&self) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str(&format!(
            "<map version=\"1.0\" tiledversion=\"1.1.2\" orientation=\"orthogonal\" renderorder=\"right-down\" \
width=\"{}\" height=\"{}\" tilewidth=\"{}\" tileheight=\"{}\" infinite=\"0\" nextobjectid=\"1\">\n",
            self.width, self.height, MAP_TILE_WIDTH, MAP_TILE_HEIGHT
        ));
        for tileset in &self.tilesets {
            xml.push_str(&format!(
                " <tileset firstgid=\"{}\" source=\"{}\"/>\n",
                tileset.first_gid,
                escape_attr(&tileset.source())
            ));
        }
        for layer in &self.layers {
            xml.push_str(&format!(
                " <layer name=\"{}\" width=\"{}\" height=\"{}\">\n",
                layer.name(),
                layer.width,
                layer.height
            ));
            xml.push_str("  <data encoding=\"csv\">\n");
            xml.push_str(&layer.to_csv());
            xml.push_str("  </data>\n");
            xml.push_str(" </layer>\n");
        }
        xml.push_str("</map>\n");
        xml
    }
}

pub fn map_path(out_dir: &Path, name: &str) -> PathBuf {
    out_dir.join(format!("{}.tmx", name))
}

/// Export `map` as `<out_dir>/<name>.tmx`, skipping it if already there.
pub fn export_map(
    out_dir: &Path,
    name: &str,
    map: &MapGrid,
    options: &ExportOptions,
) -> Result<ExportOutcome, ExportError> {
    let path = map_path(out_dir, name);
    if already_exported(&path, options) {
        log::info!("Map {} already exported, skipping", name);
        return Ok(ExportOutcome::Skipped { path });
    }
    write_map(out_dir, name, map, path)
}

/// Like [`export_map`], but only loads the map when it is needed.
pub fn export_map_from(
    out_dir: &Path,
    name: &str,
    loader: &dyn MapLoader,
    options: &ExportOptions,
) -> Result<ExportOutcome, ExportError> {
    let path = map_path(out_dir, name);
    if already_exported(&path, options) {
        log::info!("Map {} already exported, skipping", name);
        return Ok(ExportOutcome::Skipped { path });
    }
    let map = loader
        .load_map(name)
        .map_err(|e| ExportError::source_read(name, e))?;
    write_map(out_dir, name, &map, path)
}

fn write_map(
    out_dir: &Path,
    name: &str,
    map: &MapGrid,
    path: PathBuf,
) -> Result<ExportOutcome, ExportError> {
    let doc = MapDocument::build(map);
    create_dir(out_dir)?;
    write_document(&path, &doc.render())?;
    log::info!(
        "Exported map {} ({}x{}, {} tilesets)",
        name,
        doc.width,
        doc.height,
        doc.tilesets.len()
    );
    Ok(ExportOutcome::Exported { path })
}
