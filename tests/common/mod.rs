// Common test fixtures: in-memory libraries, maps and loaders
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use mir_tiled_lib::source::{
    ImageLibrary, LibraryJob, LibraryLoader, MapGrid, MapLoader, MemoryLibrary, Texture, TileRef,
};

/// Texture filled with one color.
pub fn solid_texture(width: u32, height: u32, rgb: [u8; 3]) -> Texture {
    let pixels = (0..width * height).flat_map(|_| rgb).collect();
    Texture::new(width, height, pixels)
}

/// 2x2 map with one tile on each plane.
pub fn small_map() -> MapGrid {
    let mut map = MapGrid::new(2, 2);
    map.set_background(0, 0, TileRef::new(0, 5));
    map.set_middle(1, 1, TileRef::new(2, 3));
    map.set_object(0, 1, TileRef::new(0, 0));
    map
}

pub fn job(name: &str) -> LibraryJob {
    LibraryJob {
        name: name.to_string(),
        path: PathBuf::from(format!("data/{}.wil", name)),
    }
}

/// Serves libraries and maps from memory. Names listed in `broken` fail to
/// load; names in `panicking` panic.
#[derive(Default)]
pub struct MemoryLoader {
    pub libraries: HashMap<String, MemoryLibrary>,
    pub maps: HashMap<String, MapGrid>,
    pub broken: Vec<String>,
    pub panicking: Vec<String>,
}

impl MemoryLoader {
    fn check(&self, name: &str) -> anyhow::Result<()> {
        if self.panicking.iter().any(|n| n == name) {
            panic!("decoder crashed on {}", name);
        }
        if self.broken.iter().any(|n| n == name) {
            anyhow::bail!("corrupt header in {}", name);
        }
        Ok(())
    }
}

impl LibraryLoader for MemoryLoader {
    fn load_library(&self, job: &LibraryJob) -> anyhow::Result<Box<dyn ImageLibrary + Send>> {
        self.check(&job.name)?;
        match self.libraries.get(&job.name) {
            Some(lib) => Ok(Box::new(lib.clone())),
            None => anyhow::bail!("missing library {}", job.path.display()),
        }
    }
}

impl MapLoader for MemoryLoader {
    fn load_map(&self, name: &str) -> anyhow::Result<MapGrid> {
        self.check(name)?;
        match self.maps.get(name) {
            Some(map) => Ok(map.clone()),
            None => anyhow::bail!("missing map {}", name),
        }
    }
}

/// Every file under `dir` with its modification time.
pub fn snapshot_tree(dir: &Path) -> BTreeMap<PathBuf, SystemTime> {
    let mut files = BTreeMap::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path.clone());
            }
            let modified = std::fs::metadata(&path).unwrap().modified().unwrap();
            files.insert(path, modified);
        }
    }
    files
}
