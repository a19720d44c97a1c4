use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use super::LibraryJob;

const LIBRARY_PREFIXES: [&str; 3] = ["tiles", "smtiles", "objects"];
const LIBRARY_EXTENSIONS: [&str; 3] = ["wil", "wzl", "wis"];

/// Find the tile and object libraries in a client `data` directory.
///
/// Matching is case-insensitive. Jobs are named by the lowercase file stem and
/// sorted by name. When two files share a stem (`Tiles.wil` and `Tiles.wzl`)
/// only the first path in sort order is kept.
pub fn discover_libraries(data_dir: &Path) -> Result<Vec<LibraryJob>> {
    let entries = std::fs::read_dir(data_dir)
        .with_context(|| format!("Failed to read data directory: {}", data_dir.display()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("Failed to read entry in {}", data_dir.display()))?;
        let path = entry.path();
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut jobs: BTreeMap<String, LibraryJob> = BTreeMap::new();
    for path in paths {
        let Some(name) = library_name(&path) else {
            continue;
        };
        if let Some(existing) = jobs.get(&name) {
            log::warn!(
                "Ignoring {}: library '{}' already provided by {}",
                path.display(),
                name,
                existing.path.display()
            );
            continue;
        }
        jobs.insert(name.clone(), LibraryJob { name, path });
    }

    Ok(jobs.into_values().collect())
}

/// Lowercase stem of a library file, or `None` if the file is not a tile or
/// object library.
fn library_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?.to_lowercase();
    if !LIBRARY_PREFIXES.iter().any(|p| file_name.starts_with(p)) {
        return None;
    }
    if !LIBRARY_EXTENSIONS.iter().any(|e| file_name.ends_with(e)) {
        return None;
    }
    let (stem, _) = file_name.rsplit_once('.')?;
    Some(stem.to_string())
}
