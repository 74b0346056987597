mod grid;
mod registry;
mod tiled;
mod world_map;

pub use grid::{CollisionGrid, TileGridError};
pub use registry::{MapLoadError, MapRegistry, MAPS_DIR_NAME};
pub use tiled::{
    parse_tiled_map, ObjectLayer, TileLayer, TiledLayer, TiledMap, TiledObject, TiledParseError,
    TiledProperty, TiledTile, TiledTileset, GID_FLAGS_MASK,
};
pub use world_map::{MapError, MapSlot, WorldMap};
