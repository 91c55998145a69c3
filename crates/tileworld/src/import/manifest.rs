use serde::Deserialize;

use crate::map::layer::TileId;

/// `map.json` at the root of a map folder. Layer grid files and atlas
/// page images are referenced relative to the folder.
#[derive(Debug, Clone, Deserialize)]
pub struct MapManifest {
    pub topology: String,
    pub width_tiles: u32,
    pub height_tiles: u32,
    pub tile_size_px: u32,
    pub layers: Vec<LayerSource>,
    pub atlas: AtlasManifest,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerSource {
    /// Full per-cell grid, ids limited to the byte range.
    Dense { file: String },
    /// Placement list, full u16 id range.
    Sparse { file: String },
    /// Every cell holds the same id (typically a backdrop fill).
    Single { tile: TileId },
}

#[derive(Debug, Clone, Deserialize)]
pub struct AtlasManifest {
    pub pages: Vec<String>,
    pub tiles: Vec<TileSource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TileSource {
    pub id: TileId,
    pub page: u8,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    #[serde(default)]
    pub trim: Option<TrimSource>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TrimSource {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_parses_all_layer_kinds() {
        let raw = r#"{
            "topology": "toroidal",
            "width_tiles": 64,
            "height_tiles": 32,
            "tile_size_px": 16,
            "layers": [
                {"kind": "single", "tile": 4},
                {"kind": "dense", "file": "ground.xml"},
                {"kind": "sparse", "file": "blocking.xml"}
            ],
            "atlas": {
                "pages": ["tiles.png"],
                "tiles": [
                    {"id": 1, "page": 0, "x": 0, "y": 0, "w": 16, "h": 16},
                    {"id": 2, "page": 0, "x": 16, "y": 0, "w": 16, "h": 16,
                     "trim": {"x": 2, "y": 4, "w": 12, "h": 10}}
                ]
            }
        }"#;
        let manifest: MapManifest = serde_json::from_str(raw).expect("manifest");
        assert_eq!(manifest.width_tiles, 64);
        assert_eq!(manifest.layers.len(), 3);
        assert!(matches!(manifest.layers[0], LayerSource::Single { tile: 4 }));
        assert!(matches!(manifest.layers[1], LayerSource::Dense { .. }));
        assert_eq!(manifest.atlas.tiles[1].trim.expect("trim").w, 12);
        assert!(manifest.atlas.tiles[0].trim.is_none());
    }
}
