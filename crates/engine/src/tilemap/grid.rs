use thiserror::Error;
use tracing::{debug, warn};

use crate::app::Vec2;

use super::tiled::{TiledLayer, TiledMap, GID_FLAGS_MASK};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileGridError {
    #[error("map dimensions must be non-zero, got {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },
    #[error("tile size must be non-zero")]
    ZeroTileSize,
    #[error("tile layer '{layer}' has {actual} cells, expected {expected}")]
    LayerSizeMismatch {
        layer: String,
        expected: usize,
        actual: usize,
    },
    #[error("tileset '{tileset}' tile {tile_id} overflows gid space from firstgid {firstgid}")]
    GidOverflow {
        tileset: String,
        firstgid: u32,
        tile_id: u32,
    },
    #[error("solid cell ({col}, {row}) is outside a {width}x{height} grid")]
    CellOutOfRange {
        col: u32,
        row: u32,
        width: u32,
        height: u32,
    },
}

/// Boolean solid grid. Everything outside `[0, width) x [0, height)` counts
/// as solid.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionGrid {
    width: u32,
    height: u32,
    cell_size: f32,
    cells: Vec<bool>,
}

impl CollisionGrid {
    /// Cells are solid when any tile layer places a gid whose tileset tile
    /// carries `collides = true`. Gid 0 is empty.
    pub fn build(map: &TiledMap) -> Result<Self, TileGridError> {
        let mut grid = Self::empty(map.width, map.height, map.tilewidth)?;

        let mut solid_gids = Vec::new();
        for tileset in &map.tilesets {
            if tileset.source.is_some() && tileset.tiles.is_empty() {
                warn!(
                    tileset = %tileset.name,
                    firstgid = tileset.firstgid,
                    "external_tileset_has_no_collision_metadata"
                );
            }
            for tile in tileset.tiles.iter().filter(|tile| tile.collides()) {
                let gid = tile.id.checked_add(tileset.firstgid).ok_or_else(|| {
                    TileGridError::GidOverflow {
                        tileset: tileset.name.clone(),
                        firstgid: tileset.firstgid,
                        tile_id: tile.id,
                    }
                })?;
                solid_gids.push(gid);
            }
        }
        solid_gids.sort_unstable();
        solid_gids.dedup();

        let expected = grid.cells.len();
        for layer in &map.layers {
            let TiledLayer::Tile(layer) = layer else {
                continue;
            };
            if layer.data.is_empty() {
                continue;
            }
            if layer.data.len() != expected {
                return Err(TileGridError::LayerSizeMismatch {
                    layer: layer.name.clone(),
                    expected,
                    actual: layer.data.len(),
                });
            }
            for (cell, raw_gid) in grid.cells.iter_mut().zip(&layer.data) {
                let gid = raw_gid & !GID_FLAGS_MASK;
                if gid != 0 && solid_gids.binary_search(&gid).is_ok() {
                    *cell = true;
                }
            }
        }

        debug!(
            width = grid.width,
            height = grid.height,
            solid_gids = solid_gids.len(),
            solid_cells = grid.cells.iter().filter(|solid| **solid).count(),
            "collision_grid_built"
        );
        Ok(grid)
    }

    pub fn from_solid_cells(
        width: u32,
        height: u32,
        cell_size: u32,
        solid: &[(u32, u32)],
    ) -> Result<Self, TileGridError> {
        let mut grid = Self::empty(width, height, cell_size)?;
        for &(col, row) in solid {
            if col >= width || row >= height {
                return Err(TileGridError::CellOutOfRange {
                    col,
                    row,
                    width,
                    height,
                });
            }
            grid.cells[(row * width + col) as usize] = true;
        }
        Ok(grid)
    }

    fn empty(width: u32, height: u32, cell_size: u32) -> Result<Self, TileGridError> {
        if width == 0 || height == 0 {
            return Err(TileGridError::EmptyDimensions { width, height });
        }
        if cell_size == 0 {
            return Err(TileGridError::ZeroTileSize);
        }
        Ok(Self {
            width,
            height,
            cell_size: cell_size as f32,
            cells: vec![false; width as usize * height as usize],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn pixel_size(&self) -> Vec2 {
        Vec2::new(
            self.width as f32 * self.cell_size,
            self.height as f32 * self.cell_size,
        )
    }

    pub fn is_cell_solid(&self, col: i64, row: i64) -> bool {
        if col < 0 || row < 0 || col >= i64::from(self.width) || row >= i64::from(self.height) {
            return true;
        }
        self.cells[(row * i64::from(self.width) + col) as usize]
    }

    /// Conservative: the far edge `x + w` is floor-divided too, so a box that
    /// ends exactly on a cell boundary also tests the next cell.
    pub fn is_area_solid(&self, x: f32, y: f32, w: f32, h: f32) -> bool {
        if !(x.is_finite() && y.is_finite() && w.is_finite() && h.is_finite()) {
            return true;
        }
        let left = (x / self.cell_size).floor() as i64;
        let right = ((x + w) / self.cell_size).floor() as i64;
        let top = (y / self.cell_size).floor() as i64;
        let bottom = ((y + h) / self.cell_size).floor() as i64;

        if left < 0
            || top < 0
            || right >= i64::from(self.width)
            || bottom >= i64::from(self.height)
        {
            return true;
        }

        (top..=bottom).any(|row| (left..=right).any(|col| self.is_cell_solid(col, row)))
    }

    /// Checks the 1-pixel strip at the leading edge of a box centered on
    /// `center` after moving horizontally to `next_x`.
    pub fn is_horizontal_step_clear(&self, center: Vec2, size: Vec2, next_x: f32) -> bool {
        let half_w = size.x / 2.0;
        let probe_x = if next_x > center.x {
            next_x + half_w
        } else {
            next_x - half_w
        };
        !self.is_area_solid(probe_x, center.y - size.y / 2.0, 1.0, size.y)
    }

    pub fn is_vertical_step_clear(&self, center: Vec2, size: Vec2, next_y: f32) -> bool {
        let half_h = size.y / 2.0;
        let probe_y = if next_y > center.y {
            next_y + half_h
        } else {
            next_y - half_h
        };
        !self.is_area_solid(center.x - size.x / 2.0, probe_y, size.x, 1.0)
    }

    /// Applies X then Y, each only if its leading edge is clear, so a body
    /// pressed against a wall slides along it.
    pub fn try_move_axis_independent(&self, center: Vec2, size: Vec2, delta: Vec2) -> Vec2 {
        let mut position = center;
        if delta.x != 0.0 {
            let next_x = position.x + delta.x;
            if self.is_horizontal_step_clear(position, size, next_x) {
                position.x = next_x;
            }
        }
        if delta.y != 0.0 {
            let next_y = position.y + delta.y;
            if self.is_vertical_step_clear(position, size, next_y) {
                position.y = next_y;
            }
        }
        position
    }

    /// Solid cells in row-major order, for debug overlays.
    pub fn solid_cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, solid)| **solid)
            .map(move |(idx, _)| (idx as u32 % width, idx as u32 / width))
    }
}
