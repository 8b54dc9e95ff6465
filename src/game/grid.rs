//! Tile Grid World Model
//!
//! Static per-match terrain: walkability, out-of-bounds semantics, and
//! tile mutation. Leaf dependency for all collision queries.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::vec2::Vec2;

/// A single terrain tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Tile {
    /// Open ground, walkable
    Floor = 0,
    /// Solid wall, blocks movement and projectiles
    Wall = 1,
    /// Destructible scenery. Blocks like a wall but is reported
    /// distinctly so attacks can route effects on fence contact.
    Fence = 2,
}

impl Tile {
    /// Whether combatants and projectiles can occupy this tile.
    #[inline]
    pub fn walkable(self) -> bool {
        matches!(self, Tile::Floor)
    }

    /// Parse a map-file character.
    fn from_char(c: char) -> Result<Self, MapError> {
        match c {
            '.' => Ok(Tile::Floor),
            '#' => Ok(Tile::Wall),
            'f' => Ok(Tile::Fence),
            other => Err(MapError::UnknownTile(other)),
        }
    }
}

/// Integer cell coordinates.
///
/// Player positions are always cell coordinates; projectile positions are
/// continuous and mapped back to cells via [`TileGrid::cell_of`].
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct GridPos {
    /// Column (0-based)
    pub x: i32,
    /// Row (0-based)
    pub y: i32,
}

impl GridPos {
    /// Create a cell position.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Center of this cell in continuous coordinates.
    #[inline]
    pub fn center(self) -> Vec2 {
        Vec2::new(self.x as f32 + 0.5, self.y as f32 + 0.5)
    }
}

/// Map loading errors.
#[derive(Debug, Error)]
pub enum MapError {
    /// Map JSON could not be parsed.
    #[error("Malformed map file: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Width or height was zero.
    #[error("Map dimensions must be non-zero")]
    EmptyDimensions,

    /// A row's length does not match the declared width.
    #[error("Row {0} does not match declared width")]
    RaggedRow(usize),

    /// Unknown tile character in a map row.
    #[error("Unknown tile character {0:?}")]
    UnknownTile(char),

    /// Tile coordinates outside the grid.
    #[error("Cell ({0}, {1}) is out of bounds")]
    OutOfBounds(i32, i32),
}

/// On-disk map format: dimensions plus one string per row.
#[derive(Debug, Serialize, Deserialize)]
struct MapFile {
    width: u32,
    height: u32,
    rows: Vec<String>,
}

/// The static terrain of one match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileGrid {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
}

impl TileGrid {
    /// Create an all-floor arena.
    pub fn open(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tiles: vec![Tile::Floor; (width * height) as usize],
        }
    }

    /// Load a grid from a JSON map file.
    pub fn from_json_str(json: &str) -> Result<Self, MapError> {
        let file: MapFile = serde_json::from_str(json)?;
        if file.width == 0 || file.height == 0 {
            return Err(MapError::EmptyDimensions);
        }
        if file.rows.len() != file.height as usize {
            return Err(MapError::RaggedRow(file.rows.len()));
        }

        let mut tiles = Vec::with_capacity((file.width * file.height) as usize);
        for (y, row) in file.rows.iter().enumerate() {
            let chars: Vec<char> = row.chars().collect();
            if chars.len() != file.width as usize {
                return Err(MapError::RaggedRow(y));
            }
            for c in chars {
                tiles.push(Tile::from_char(c)?);
            }
        }

        Ok(Self {
            width: file.width,
            height: file.height,
            tiles,
        })
    }

    /// Grid width in cells.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether a cell lies within `[0,width) x [0,height)`.
    #[inline]
    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    /// Tile at a cell, `None` when out of bounds.
    #[inline]
    pub fn tile(&self, pos: GridPos) -> Option<Tile> {
        if !self.in_bounds(pos) {
            return None;
        }
        Some(self.tiles[(pos.y as u32 * self.width + pos.x as u32) as usize])
    }

    /// Whether a cell can be occupied. Out-of-bounds cells are never
    /// walkable.
    #[inline]
    pub fn is_walkable(&self, pos: GridPos) -> bool {
        self.tile(pos).is_some_and(Tile::walkable)
    }

    /// Mutate a tile (destructible scenery, editor hooks).
    pub fn set_tile(&mut self, pos: GridPos, tile: Tile) -> Result<(), MapError> {
        if !self.in_bounds(pos) {
            return Err(MapError::OutOfBounds(pos.x, pos.y));
        }
        self.tiles[(pos.y as u32 * self.width + pos.x as u32) as usize] = tile;
        Ok(())
    }

    /// Cell containing a continuous position.
    #[inline]
    pub fn cell_of(&self, pos: Vec2) -> GridPos {
        GridPos::new(pos.x.floor() as i32, pos.y.floor() as i32)
    }

    /// All walkable cells, in row-major order. Used for deterministic
    /// spawn-point selection.
    pub fn walkable_cells(&self) -> Vec<GridPos> {
        let mut cells = Vec::new();
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let pos = GridPos::new(x, y);
                if self.is_walkable(pos) {
                    cells.push(pos);
                }
            }
        }
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_arena_all_walkable() {
        let grid = TileGrid::open(4, 3);
        assert_eq!(grid.width(), 4);
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.walkable_cells().len(), 12);
    }

    #[test]
    fn test_out_of_bounds_not_walkable() {
        let grid = TileGrid::open(4, 4);
        assert!(!grid.is_walkable(GridPos::new(-1, 0)));
        assert!(!grid.is_walkable(GridPos::new(0, 4)));
        assert!(grid.tile(GridPos::new(4, 0)).is_none());
    }

    #[test]
    fn test_set_tile_and_fence_blocks() {
        let mut grid = TileGrid::open(4, 4);
        let pos = GridPos::new(2, 2);

        grid.set_tile(pos, Tile::Fence).unwrap();
        assert!(!grid.is_walkable(pos));
        assert_eq!(grid.tile(pos), Some(Tile::Fence));

        // Knock the fence down
        grid.set_tile(pos, Tile::Floor).unwrap();
        assert!(grid.is_walkable(pos));

        assert!(grid.set_tile(GridPos::new(9, 9), Tile::Wall).is_err());
    }

    #[test]
    fn test_json_map_roundtrip() {
        let json = r#####"{
            "width": 4,
            "height": 3,
            "rows": ["####", "#.f#", "####"]
        }"#####;
        let grid = TileGrid::from_json_str(json).unwrap();

        assert!(grid.is_walkable(GridPos::new(1, 1)));
        assert_eq!(grid.tile(GridPos::new(2, 1)), Some(Tile::Fence));
        assert_eq!(grid.tile(GridPos::new(0, 0)), Some(Tile::Wall));
        assert_eq!(grid.walkable_cells(), vec![GridPos::new(1, 1)]);
    }

    #[test]
    fn test_json_map_rejects_ragged_rows() {
        let json = r#####"{"width": 3, "height": 2, "rows": ["###", "##"]}"#####;
        assert!(matches!(
            TileGrid::from_json_str(json),
            Err(MapError::RaggedRow(1))
        ));
    }

    #[test]
    fn test_cell_of_continuous_position() {
        let grid = TileGrid::open(8, 8);
        assert_eq!(grid.cell_of(Vec2::new(2.9, 3.1)), GridPos::new(2, 3));
        assert_eq!(grid.cell_of(Vec2::new(-0.1, 0.0)), GridPos::new(-1, 0));
        assert_eq!(GridPos::new(2, 3).center(), Vec2::new(2.5, 3.5));
    }
}
