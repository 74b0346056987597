use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Top four bits of a Tiled gid carry flip/rotation flags.
pub const GID_FLAGS_MASK: u32 = 0xF000_0000;

/// The subset of the Tiled JSON map format the simulation consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct TiledMap {
    pub width: u32,
    pub height: u32,
    pub tilewidth: u32,
    pub tileheight: u32,
    #[serde(default)]
    pub layers: Vec<TiledLayer>,
    #[serde(default)]
    pub tilesets: Vec<TiledTileset>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum TiledLayer {
    #[serde(rename = "tilelayer")]
    Tile(TileLayer),
    #[serde(rename = "objectgroup")]
    Object(ObjectLayer),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TileLayer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub data: Vec<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectLayer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub objects: Vec<TiledObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TiledObject {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub name: String,
    /// Older Tiled exports call this `type`, newer ones `class`.
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub class: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
}

impl TiledObject {
    pub fn class_name(&self) -> &str {
        if self.class.is_empty() {
            &self.kind
        } else {
            &self.class
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TiledTileset {
    pub firstgid: u32,
    #[serde(default)]
    pub name: String,
    /// Set for external tilesets, whose tile metadata is not embedded.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub tiles: Vec<TiledTile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TiledTile {
    pub id: u32,
    #[serde(default)]
    pub properties: Vec<TiledProperty>,
}

impl TiledTile {
    pub fn collides(&self) -> bool {
        self.properties
            .iter()
            .any(|property| property.name == "collides" && property.value == Value::Bool(true))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TiledProperty {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Error)]
#[error("invalid Tiled map JSON at {path}: {source}")]
pub struct TiledParseError {
    pub path: String,
    #[source]
    pub source: serde_json::Error,
}

pub fn parse_tiled_map(raw: &str) -> Result<TiledMap, TiledParseError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, TiledMap>(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        TiledParseError {
            path,
            source: error.into_inner(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_layers_tilesets_and_objects() {
        let map = parse_tiled_map(
            r#"{
                "width": 2, "height": 1, "tilewidth": 32, "tileheight": 32,
                "layers": [
                    {"type": "tilelayer", "name": "ground", "data": [1, 2]},
                    {"type": "imagelayer", "name": "sky"},
                    {"type": "objectgroup", "name": "spawns", "objects": [
                        {"id": 1, "name": "playerSpawn", "x": 10, "y": 20},
                        {"id": 2, "name": "red_demon", "class": "enemy", "x": 40, "y": 20}
                    ]}
                ],
                "tilesets": [
                    {"firstgid": 1, "name": "terrain", "tiles": [
                        {"id": 1, "properties": [{"name": "collides", "type": "bool", "value": true}]},
                        {"id": 0, "properties": [{"name": "collides", "type": "bool", "value": false}]}
                    ]}
                ]
            }"#,
        )
        .expect("parse");

        assert_eq!(map.layers.len(), 3);
        assert!(matches!(map.layers[1], TiledLayer::Other));
        let TiledLayer::Object(objects) = &map.layers[2] else {
            panic!("expected object layer");
        };
        assert_eq!(objects.objects[1].class_name(), "enemy");
        assert!(map.tilesets[0].tiles[0].collides());
        assert!(!map.tilesets[0].tiles[1].collides());
    }

    #[test]
    fn legacy_type_field_is_the_class_name() {
        let object: TiledObject =
            serde_json::from_str(r#"{"name": "blue_slime", "type": "enemy", "x": 1, "y": 2}"#)
                .expect("object");
        assert_eq!(object.class_name(), "enemy");
    }

    #[test]
    fn parse_error_reports_json_path() {
        let err = parse_tiled_map(
            r#"{"width": 1, "height": 1, "tilewidth": 32, "tileheight": 32,
                "layers": [{"type": "tilelayer", "data": ["x"]}]}"#,
        )
        .expect_err("bad data");
        assert!(err.path.starts_with("layers[0]"), "path={}", err.path);
    }
}
