use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, warn};

use crate::content::{discover_mod_sources, ContentPlanError, ContentRequest, ModSource};
use crate::AppPaths;

use super::grid::TileGridError;
use super::tiled::{parse_tiled_map, TiledParseError};
use super::world_map::WorldMap;

pub const MAPS_DIR_NAME: &str = "maps";

#[derive(Debug, Error)]
pub enum MapLoadError {
    #[error("map name '{name}' must be a plain identifier (letters, digits, '_' or '-')")]
    InvalidName { name: String },
    #[error("map '{name}' not found; searched {searched:?}")]
    NotFound { name: String, searched: Vec<PathBuf> },
    #[error(transparent)]
    Discovery(#[from] ContentPlanError),
    #[error("failed to read map file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse map file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: TiledParseError,
    },
    #[error("map '{name}' has an invalid tile layout: {source}")]
    Grid {
        name: String,
        #[source]
        source: TileGridError,
    },
}

/// Resolves map names to `maps/<name>.json` under base and every enabled mod;
/// the last mod that ships a map wins.
#[derive(Debug, Clone)]
pub struct MapRegistry {
    sources: Vec<ModSource>,
}

impl MapRegistry {
    pub fn new(app_paths: &AppPaths, request: &ContentRequest) -> Result<Self, MapLoadError> {
        Ok(Self::from_sources(discover_mod_sources(app_paths, request)?))
    }

    pub fn from_sources(sources: Vec<ModSource>) -> Self {
        Self { sources }
    }

    pub fn resolve(&self, name: &str) -> Result<PathBuf, MapLoadError> {
        if !is_valid_map_name(name) {
            return Err(MapLoadError::InvalidName {
                name: name.to_string(),
            });
        }
        let file_name = format!("{name}.json");
        let mut searched = Vec::with_capacity(self.sources.len());
        for source in self.sources.iter().rev() {
            let candidate = source.source_dir.join(MAPS_DIR_NAME).join(&file_name);
            if candidate.is_file() {
                debug!(map = name, mod_id = %source.mod_id, path = %candidate.display(), "map_resolved");
                return Ok(candidate);
            }
            searched.push(candidate);
        }
        warn!(map = name, "map_not_found");
        Err(MapLoadError::NotFound {
            name: name.to_string(),
            searched,
        })
    }

    pub fn load(&self, name: &str) -> Result<WorldMap, MapLoadError> {
        let path = self.resolve(name)?;
        let raw = fs::read_to_string(&path).map_err(|source| MapLoadError::Read {
            path: path.clone(),
            source,
        })?;
        let tiled = parse_tiled_map(&raw).map_err(|source| MapLoadError::Parse {
            path: path.clone(),
            source,
        })?;
        WorldMap::from_tiled(name, tiled).map_err(|source| MapLoadError::Grid {
            name: name.to_string(),
            source,
        })
    }
}

fn is_valid_map_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-'))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::TempDir;

    use super::*;

    const TINY_MAP: &str = r#"{"width": 2, "height": 2, "tilewidth": 32, "tileheight": 32,
        "layers": [{"type": "tilelayer", "name": "ground", "data": [0, 0, 0, 0]}]}"#;

    fn setup(root: &Path) -> AppPaths {
        let paths = AppPaths {
            root: root.to_path_buf(),
            base_content_dir: root.join("assets").join("base"),
            mods_dir: root.join("mods"),
        };
        fs::create_dir_all(paths.base_content_dir.join(MAPS_DIR_NAME)).expect("base maps");
        paths
    }

    #[test]
    fn loads_base_map_and_mod_override_wins() {
        let temp = TempDir::new().expect("temp");
        let paths = setup(temp.path());
        fs::write(
            paths.base_content_dir.join(MAPS_DIR_NAME).join("town.json"),
            TINY_MAP,
        )
        .expect("write base");
        let mod_maps = paths.mods_dir.join("big").join(MAPS_DIR_NAME);
        fs::create_dir_all(&mod_maps).expect("mod maps");
        fs::write(
            mod_maps.join("town.json"),
            r#"{"width": 5, "height": 3, "tilewidth": 16, "tileheight": 16}"#,
        )
        .expect("write mod");

        let base_only = MapRegistry::new(&paths, &ContentRequest::default()).expect("registry");
        assert_eq!(base_only.load("town").expect("load").grid().width(), 2);

        let with_mod = MapRegistry::new(
            &paths,
            &ContentRequest {
                enabled_mods: vec!["big".to_string()],
            },
        )
        .expect("registry");
        let map = with_mod.load("town").expect("load");
        assert_eq!(map.grid().width(), 5);
        assert_eq!(map.name(), "town");
    }

    #[test]
    fn missing_map_lists_searched_paths() {
        let temp = TempDir::new().expect("temp");
        let paths = setup(temp.path());
        let registry = MapRegistry::new(&paths, &ContentRequest::default()).expect("registry");
        match registry.load("nowhere") {
            Err(MapLoadError::NotFound { name, searched }) => {
                assert_eq!(name, "nowhere");
                assert_eq!(searched.len(), 1);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn path_like_names_are_rejected() {
        let temp = TempDir::new().expect("temp");
        let paths = setup(temp.path());
        let registry = MapRegistry::new(&paths, &ContentRequest::default()).expect("registry");
        for name in ["../secret", "a/b", ""] {
            assert!(matches!(
                registry.load(name),
                Err(MapLoadError::InvalidName { .. })
            ));
        }
    }

    #[test]
    fn parse_and_layout_errors_are_distinguished() {
        let temp = TempDir::new().expect("temp");
        let paths = setup(temp.path());
        let maps = paths.base_content_dir.join(MAPS_DIR_NAME);
        fs::write(maps.join("broken.json"), r#"{"width": "wide"}"#).expect("write");
        fs::write(
            maps.join("short.json"),
            r#"{"width": 2, "height": 2, "tilewidth": 32, "tileheight": 32,
                "layers": [{"type": "tilelayer", "name": "g", "data": [0]}]}"#,
        )
        .expect("write");
        let registry = MapRegistry::new(&paths, &ContentRequest::default()).expect("registry");

        match registry.load("broken") {
            Err(MapLoadError::Parse { source, .. }) => assert_eq!(source.path, "width"),
            other => panic!("expected Parse, got {other:?}"),
        }
        assert!(matches!(
            registry.load("short"),
            Err(MapLoadError::Grid { .. })
        ));
    }
}
