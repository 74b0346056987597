use thiserror::Error;
use tracing::{error, info};

use crate::app::Vec2;

use super::grid::{CollisionGrid, TileGridError};
use super::tiled::{TiledLayer, TiledMap, TiledObject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("no map is loaded")]
    NotLoaded,
}

/// A parsed map together with the collision grid derived from it.
#[derive(Debug, Clone)]
pub struct WorldMap {
    name: String,
    tiled: TiledMap,
    grid: CollisionGrid,
}

impl WorldMap {
    pub fn from_tiled(name: impl Into<String>, tiled: TiledMap) -> Result<Self, TileGridError> {
        let grid = CollisionGrid::build(&tiled)?;
        Ok(Self {
            name: name.into(),
            tiled,
            grid,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grid(&self) -> &CollisionGrid {
        &self.grid
    }

    pub fn pixel_size(&self) -> Vec2 {
        self.grid.pixel_size()
    }

    pub fn objects(&self) -> impl Iterator<Item = &TiledObject> + '_ {
        self.tiled.layers.iter().flat_map(|layer| match layer {
            TiledLayer::Object(group) => group.objects.as_slice(),
            _ => &[][..],
        })
    }

    /// First object with this name across all object layers, in layer order.
    pub fn find_object_by_name(&self, name: &str) -> Option<Vec2> {
        self.objects()
            .find(|object| object.name == name)
            .map(|object| Vec2::new(object.x, object.y))
    }

    pub fn objects_of_class<'a>(
        &'a self,
        class: &'a str,
    ) -> impl Iterator<Item = &'a TiledObject> + 'a {
        self.objects()
            .filter(move |object| object.class_name() == class)
    }
}

/// Holds the current map, if any. Queries before the first load fail with
/// [`MapError::NotLoaded`] instead of answering "not solid".
#[derive(Debug, Default)]
pub struct MapSlot {
    current: Option<WorldMap>,
}

impl MapSlot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.is_some()
    }

    /// Replaces the whole map; the old one is returned.
    pub fn replace(&mut self, map: WorldMap) -> Option<WorldMap> {
        info!(
            map = %map.name(),
            width = map.grid().width(),
            height = map.grid().height(),
            "map_loaded"
        );
        self.current.replace(map)
    }

    pub fn clear(&mut self) -> Option<WorldMap> {
        self.current.take()
    }

    pub fn get(&self) -> Result<&WorldMap, MapError> {
        self.current.as_ref().ok_or_else(|| {
            error!("map_query_before_load");
            MapError::NotLoaded
        })
    }

    pub fn is_area_solid(&self, x: f32, y: f32, w: f32, h: f32) -> Result<bool, MapError> {
        Ok(self.get()?.grid().is_area_solid(x, y, w, h))
    }

    pub fn find_object_by_name(&self, name: &str) -> Result<Option<Vec2>, MapError> {
        Ok(self.get()?.find_object_by_name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tilemap::tiled::parse_tiled_map;

    fn sample_map() -> WorldMap {
        let tiled = parse_tiled_map(
            r#"{
                "width": 4, "height": 4, "tilewidth": 32, "tileheight": 32,
                "layers": [
                    {"type": "tilelayer", "name": "ground", "data": [0,0,0,0, 0,5,0,0, 0,0,0,0, 0,0,0,0]},
                    {"type": "objectgroup", "name": "markers", "objects": [
                        {"id": 1, "name": "playerSpawn", "x": 48, "y": 80}
                    ]},
                    {"type": "objectgroup", "name": "enemies", "objects": [
                        {"id": 2, "name": "blue_slime", "type": "enemy", "x": 100, "y": 20},
                        {"id": 3, "name": "playerSpawn", "x": 1, "y": 1},
                        {"id": 4, "name": "red_demon", "class": "enemy", "x": 20, "y": 100}
                    ]}
                ],
                "tilesets": [{"firstgid": 1, "tiles": [
                    {"id": 4, "properties": [{"name": "collides", "value": true}]}
                ]}]
            }"#,
        )
        .expect("parse");
        WorldMap::from_tiled("sample", tiled).expect("map")
    }

    #[test]
    fn find_object_returns_first_match_in_layer_order() {
        let map = sample_map();
        assert_eq!(
            map.find_object_by_name("playerSpawn"),
            Some(Vec2::new(48.0, 80.0))
        );
        assert_eq!(map.find_object_by_name("nowhere"), None);
    }

    #[test]
    fn objects_of_class_reads_type_and_class() {
        let map = sample_map();
        let names = map
            .objects_of_class("enemy")
            .map(|object| object.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["blue_slime", "red_demon"]);
    }

    #[test]
    fn empty_slot_fails_fast() {
        let slot = MapSlot::empty();
        assert_eq!(slot.is_area_solid(0.0, 0.0, 1.0, 1.0), Err(MapError::NotLoaded));
        assert_eq!(slot.find_object_by_name("playerSpawn"), Err(MapError::NotLoaded));
    }

    #[test]
    fn loaded_slot_answers_queries_and_reload_replaces() {
        let mut slot = MapSlot::empty();
        assert!(slot.replace(sample_map()).is_none());
        assert_eq!(slot.is_area_solid(40.0, 40.0, 1.0, 1.0), Ok(true));
        assert_eq!(slot.is_area_solid(5.0, 5.0, 1.0, 1.0), Ok(false));

        let previous = slot.replace(sample_map()).expect("previous map");
        assert_eq!(previous.name(), "sample");
        assert!(slot.is_loaded());
    }
}
