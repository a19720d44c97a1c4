//! Tiled TMX/TSX export.
//!
//! Every source library becomes one `.tsx` tileset; every map becomes one
//! `.tmx` with three CSV layers. Maps address tiles through GIDs handed out in
//! fixed 32767-slot blocks, one block per (plane, library) pair, see [`gid`].

pub mod gid;
pub mod layer;
pub mod texture;
pub mod tmx;
pub mod tsx;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ExportError;

/// Cell size of the exported map, in pixels. Fixed by the client's renderer.
pub const MAP_TILE_WIDTH: u32 = 48;
pub const MAP_TILE_HEIGHT: u32 = 32;

/// One of the three image planes stacked in every map cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Plane {
    /// Big ground tiles (`Tiles*.wil`), authored at half resolution.
    Background,
    /// Small overlay tiles (`SmTiles*.wil`).
    Middle,
    /// Objects (`Objects*.wil`).
    Object,
}

impl Plane {
    /// Scan and layer order.
    pub const ALL: [Plane; 3] = [Plane::Background, Plane::Middle, Plane::Object];

    /// Tileset name prefix of this plane's libraries.
    pub fn prefix(self) -> &'static str {
        match self {
            Plane::Background => "tiles",
            Plane::Middle => "smtiles",
            Plane::Object => "objects",
        }
    }

    /// Name of the TMX layer holding this plane.
    pub fn layer_name(self) -> &'static str {
        match self {
            Plane::Background => "base",
            Plane::Middle => "mid",
            Plane::Object => "obj",
        }
    }

    /// Tileset name for a library of this plane: `tiles`, `tiles2`,
    /// `smtiles`, `objects13`... File index 0 carries no number.
    pub fn tileset_name(self, file_index: u32) -> String {
        if file_index == 0 {
            self.prefix().to_string()
        } else {
            format!("{}{}", self.prefix(), file_index)
        }
    }
}

/// Inverse of [`Plane::tileset_name`]. Returns `None` for names that the
/// exporter would never produce, like `tiles0` or `objects07`.
pub fn parse_library_name(name: &str) -> Option<(Plane, u32)> {
    for plane in Plane::ALL {
        let Some(rest) = name.strip_prefix(plane.prefix()) else {
            continue;
        };
        if rest.is_empty() {
            return Some((plane, 0));
        }
        if rest.starts_with('0') || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        return rest.parse().ok().map(|idx| (plane, idx));
    }
    None
}

/// Options shared by tileset and map exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Upper bound on concurrently running export tasks.
    pub workers: usize,
    /// Regenerate documents that already exist instead of skipping them.
    pub overwrite: bool,
    /// File name of the shared 1×1 image used for empty library entries.
    pub placeholder_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            overwrite: false,
            placeholder_name: "empty.png".to_string(),
        }
    }
}

impl ExportOptions {
    /// Read options from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read export options: {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse export options: {}", path.display()))
    }
}

/// What an export call did with its target document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExportOutcome {
    Exported { path: PathBuf },
    /// The document was already there; nothing was written.
    Skipped { path: PathBuf },
}

impl ExportOutcome {
    pub fn path(&self) -> &Path {
        match self {
            ExportOutcome::Exported { path } | ExportOutcome::Skipped { path } => path,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ExportOutcome::Skipped { .. })
    }
}

/// Existing documents count as already exported. There is no content check,
/// so a truncated file from an interrupted run is skipped as well.
fn already_exported(path: &Path, options: &ExportOptions) -> bool {
    !options.overwrite && path.exists()
}

fn create_dir(dir: &Path) -> Result<(), ExportError> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))
        .map_err(|source| ExportError::Write {
            path: dir.to_path_buf(),
            source,
        })
}

fn write_document(path: &Path, contents: &str) -> Result<(), ExportError> {
    std::fs::write(path, contents.as_bytes())
        .with_context(|| format!("Failed to write document: {}", path.display()))
        .map_err(|source| ExportError::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// Escape a value for use inside a double-quoted XML attribute.
fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
