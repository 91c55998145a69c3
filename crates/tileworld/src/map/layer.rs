use std::collections::HashMap;

use thiserror::Error;

/// Tile identifier. Zero is the reserved empty sentinel on every layer.
pub type TileId = u16;

pub const EMPTY_TILE: TileId = 0;

/// Dense layers store one byte per cell, so they can only carry ids that
/// fit a byte. The importer enforces this at load time.
pub const DENSE_MAX_TILE_ID: TileId = u8::MAX as TileId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LayerError {
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
    #[error("sparse tile ({x}, {y}) outside layer bounds {width}x{height}")]
    SparseTileOutOfBounds { x: u32, y: u32, width: u32, height: u32 },
}

/// Storage variant for one layer. Populated once at import, read-only
/// afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerStorage {
    /// Full grid, one byte per cell, row-major.
    Dense { tiles: Vec<u8> },
    /// Populated cells only; everything absent is empty.
    Sparse { tiles: HashMap<(u32, u32), TileId> },
    /// One constant id covering the whole layer.
    Single { tile: TileId },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    width: u32,
    height: u32,
    storage: LayerStorage,
    tile_count: u32,
}

impl Layer {
    pub fn dense(width: u32, height: u32, tiles: Vec<u8>) -> Result<Self, LayerError> {
        let expected = width as usize * height as usize;
        if tiles.len() != expected {
            return Err(LayerError::TileCountMismatch {
                expected,
                actual: tiles.len(),
            });
        }
        let tile_count = tiles.iter().filter(|id| **id != EMPTY_TILE as u8).count() as u32;
        Ok(Self {
            width,
            height,
            storage: LayerStorage::Dense { tiles },
            tile_count,
        })
    }

    pub fn sparse(
        width: u32,
        height: u32,
        tiles: HashMap<(u32, u32), TileId>,
    ) -> Result<Self, LayerError> {
        for (&(x, y), _) in &tiles {
            if x >= width || y >= height {
                return Err(LayerError::SparseTileOutOfBounds {
                    x,
                    y,
                    width,
                    height,
                });
            }
        }
        let tile_count = tiles.values().filter(|id| **id != EMPTY_TILE).count() as u32;
        Ok(Self {
            width,
            height,
            storage: LayerStorage::Sparse { tiles },
            tile_count,
        })
    }

    pub fn single(width: u32, height: u32, tile: TileId) -> Self {
        let tile_count = if tile == EMPTY_TILE {
            0
        } else {
            width.saturating_mul(height)
        };
        Self {
            width,
            height,
            storage: LayerStorage::Single { tile },
            tile_count,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_count(&self) -> u32 {
        self.tile_count
    }

    pub fn storage(&self) -> &LayerStorage {
        &self.storage
    }

    /// False for zero-sized layers; queries against invalid layers must
    /// degrade to the empty/not-walkable default.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Tile at an already-resolved cell. Callers run coordinates through
    /// the topology first; this does no wrap or clamp of its own.
    pub fn tile_at(&self, x: u32, y: u32) -> TileId {
        debug_assert!(
            x < self.width && y < self.height,
            "tile_at called with unresolved coordinates ({x}, {y})"
        );
        match &self.storage {
            LayerStorage::Dense { tiles } => {
                let index = y as usize * self.width as usize + x as usize;
                tiles.get(index).copied().map(TileId::from).unwrap_or(EMPTY_TILE)
            }
            LayerStorage::Sparse { tiles } => {
                tiles.get(&(x, y)).copied().unwrap_or(EMPTY_TILE)
            }
            LayerStorage::Single { tile } => *tile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_layer_rejects_mismatched_tile_count() {
        let error = Layer::dense(4, 4, vec![0; 15]).unwrap_err();
        assert_eq!(
            error,
            LayerError::TileCountMismatch {
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn dense_layer_reads_row_major() {
        let mut tiles = vec![0u8; 12];
        tiles[1 * 4 + 2] = 7;
        let layer = Layer::dense(4, 3, tiles).expect("layer");
        assert_eq!(layer.tile_at(2, 1), 7);
        assert_eq!(layer.tile_at(0, 0), EMPTY_TILE);
        assert_eq!(layer.tile_count(), 1);
    }

    #[test]
    fn sparse_layer_defaults_to_empty() {
        let mut tiles = HashMap::new();
        tiles.insert((3, 5), 42);
        let layer = Layer::sparse(8, 8, tiles).expect("layer");
        assert_eq!(layer.tile_at(3, 5), 42);
        assert_eq!(layer.tile_at(3, 6), EMPTY_TILE);
        assert_eq!(layer.tile_count(), 1);
    }

    #[test]
    fn sparse_layer_rejects_out_of_bounds_entries() {
        let mut tiles = HashMap::new();
        tiles.insert((8, 0), 1);
        assert!(Layer::sparse(8, 8, tiles).is_err());
    }

    #[test]
    fn single_layer_covers_every_cell() {
        let layer = Layer::single(16, 4, 9);
        assert_eq!(layer.tile_at(0, 0), 9);
        assert_eq!(layer.tile_at(15, 3), 9);
        assert_eq!(layer.tile_count(), 64);
        assert_eq!(Layer::single(16, 4, EMPTY_TILE).tile_count(), 0);
    }

    #[test]
    fn zero_sized_layer_is_invalid() {
        let layer = Layer::dense(0, 4, Vec::new()).expect("layer");
        assert!(!layer.is_valid());
        assert!(Layer::single(4, 4, 1).is_valid());
    }
}
