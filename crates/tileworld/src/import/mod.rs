//! Map folder importer: `map.json` manifest, XML layer grids and PNG
//! atlas pages, assembled into an [`ImportedMap`] ready for
//! [`crate::map::world::TilemapWorld::from_imported`].

mod grid;
mod manifest;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::map::atlas::{AtlasEntry, PageTexels, TexelRect, TileAtlas, TrimRect};
use crate::map::layer::{Layer, LayerError, TileId};
use crate::map::topology::Topology;

use manifest::{LayerSource, MapManifest};

pub use grid::{parse_dense_grid, parse_sparse_grid, DenseGrid, SparseGrid};

const MANIFEST_FILE: &str = "map.json";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown topology '{value}' in {path}")]
    UnknownTopology { path: PathBuf, value: String },
    #[error("map {path} declares {declared:?} topology, expected {requested:?}")]
    TopologyMismatch {
        path: PathBuf,
        declared: Topology,
        requested: Topology,
    },
    #[error("malformed XML in {path} at line {line}, column {column}: {message}")]
    Xml {
        path: PathBuf,
        line: u32,
        column: u32,
        message: String,
    },
    #[error("invalid layer grid in {path}: {message}")]
    Grid { path: PathBuf, message: String },
    #[error("layer {index}: {source}")]
    Layer {
        index: usize,
        #[source]
        source: LayerError,
    },
    #[error("failed to decode atlas page {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("atlas tile {tile} references page {page}, only {pages} pages declared")]
    AtlasPageOutOfRange { tile: TileId, page: u8, pages: usize },
}

/// Fully-decoded map content. Dimension and layer-count validation
/// against the topology happens when the world is built from this.
#[derive(Debug)]
pub struct ImportedMap {
    pub width_tiles: u32,
    pub height_tiles: u32,
    pub tile_size_px: u32,
    pub layers: Vec<Layer>,
    pub atlas: TileAtlas,
}

/// Load a map folder: `map.json`, the layer grids it references, and the
/// atlas page images. `topology` must match what the manifest declares —
/// a map authored for a wrapping world cannot be loaded as bounded.
pub fn load_map_folder(folder: &Path, topology: Topology) -> Result<ImportedMap, ImportError> {
    let manifest_path = folder.join(MANIFEST_FILE);
    let raw = fs::read_to_string(&manifest_path).map_err(|source| ImportError::Io {
        path: manifest_path.clone(),
        source,
    })?;
    let manifest: MapManifest =
        serde_json::from_str(&raw).map_err(|source| ImportError::Manifest {
            path: manifest_path.clone(),
            source,
        })?;

    let declared = parse_topology(&manifest_path, &manifest.topology)?;
    if declared != topology {
        return Err(ImportError::TopologyMismatch {
            path: manifest_path,
            declared,
            requested: topology,
        });
    }

    let mut layers = Vec::with_capacity(manifest.layers.len());
    for (index, source) in manifest.layers.iter().enumerate() {
        layers.push(load_layer(folder, index, source, &manifest)?);
    }

    let atlas = load_atlas(folder, &manifest)?;

    debug!(
        folder = %folder.display(),
        layers = layers.len(),
        pages = atlas.page_count(),
        "map_folder_loaded"
    );

    Ok(ImportedMap {
        width_tiles: manifest.width_tiles,
        height_tiles: manifest.height_tiles,
        tile_size_px: manifest.tile_size_px,
        layers,
        atlas,
    })
}

fn parse_topology(path: &Path, value: &str) -> Result<Topology, ImportError> {
    match value {
        "bounded" => Ok(Topology::Bounded),
        "toroidal" => Ok(Topology::Toroidal),
        other => Err(ImportError::UnknownTopology {
            path: path.to_path_buf(),
            value: other.to_string(),
        }),
    }
}

fn load_layer(
    folder: &Path,
    index: usize,
    source: &LayerSource,
    manifest: &MapManifest,
) -> Result<Layer, ImportError> {
    let layer_error = |source| ImportError::Layer { index, source };
    match source {
        LayerSource::Dense { file } => {
            let path = folder.join(file);
            let raw = read_grid_file(&path)?;
            let grid = parse_dense_grid(&path, &raw)?;
            Layer::dense(grid.width, grid.height, grid.tiles).map_err(layer_error)
        }
        LayerSource::Sparse { file } => {
            let path = folder.join(file);
            let raw = read_grid_file(&path)?;
            let grid = parse_sparse_grid(&path, &raw)?;
            Layer::sparse(grid.width, grid.height, grid.tiles).map_err(layer_error)
        }
        LayerSource::Single { tile } => Ok(Layer::single(
            manifest.width_tiles,
            manifest.height_tiles,
            *tile,
        )),
    }
}

fn read_grid_file(path: &Path) -> Result<String, ImportError> {
    fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_atlas(folder: &Path, manifest: &MapManifest) -> Result<TileAtlas, ImportError> {
    let mut pages = Vec::with_capacity(manifest.atlas.pages.len());
    for file in &manifest.atlas.pages {
        let path = folder.join(file);
        let reader = image::ImageReader::open(&path).map_err(|source| ImportError::Io {
            path: path.clone(),
            source,
        })?;
        let decoded = reader.decode().map_err(|source| ImportError::Image {
            path: path.clone(),
            source,
        })?;
        let rgba = decoded.to_rgba8();
        pages.push(PageTexels {
            width: rgba.width(),
            height: rgba.height(),
            rgba: rgba.into_raw(),
        });
    }

    let mut entries = HashMap::with_capacity(manifest.atlas.tiles.len());
    for tile in &manifest.atlas.tiles {
        if tile.page as usize >= pages.len() {
            return Err(ImportError::AtlasPageOutOfRange {
                tile: tile.id,
                page: tile.page,
                pages: pages.len(),
            });
        }
        entries.insert(
            tile.id,
            AtlasEntry {
                page: tile.page,
                uv: TexelRect {
                    x: tile.x,
                    y: tile.y,
                    w: tile.w,
                    h: tile.h,
                },
                trim: tile.trim.map(|trim| TrimRect {
                    x: trim.x,
                    y: trim.y,
                    w: trim.w,
                    h: trim.h,
                }),
            },
        );
    }

    Ok(TileAtlas::new(entries, pages))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::map::layer::EMPTY_TILE;
    use crate::map::world::TilemapWorld;

    fn write_file(folder: &Path, name: &str, content: &str) {
        fs::write(folder.join(name), content).expect("write");
    }

    fn write_page(folder: &Path, name: &str, width: u32, height: u32) {
        let mut page = image::RgbaImage::new(width, height);
        for pixel in page.pixels_mut() {
            *pixel = image::Rgba([200, 100, 50, 255]);
        }
        page.save(folder.join(name)).expect("save png");
    }

    fn write_toroidal_fixture(folder: &Path) {
        write_file(
            folder,
            "map.json",
            r#"{
                "topology": "toroidal",
                "width_tiles": 4,
                "height_tiles": 2,
                "tile_size_px": 16,
                "layers": [
                    {"kind": "single", "tile": 4},
                    {"kind": "dense", "file": "ground.xml"},
                    {"kind": "sparse", "file": "blocking.xml"},
                    {"kind": "sparse", "file": "decor.xml"},
                    {"kind": "sparse", "file": "foreground.xml"}
                ],
                "atlas": {
                    "pages": ["tiles.png"],
                    "tiles": [
                        {"id": 1, "page": 0, "x": 0, "y": 0, "w": 16, "h": 16},
                        {"id": 4, "page": 0, "x": 16, "y": 0, "w": 16, "h": 16},
                        {"id": 7, "page": 0, "x": 32, "y": 0, "w": 16, "h": 16,
                         "trim": {"x": 2, "y": 4, "w": 12, "h": 10}}
                    ]
                }
            }"#,
        );
        write_file(
            folder,
            "ground.xml",
            "<layer width=\"4\" height=\"2\"><data>1,1,0,1, 1,1,1,1</data></layer>",
        );
        write_file(
            folder,
            "blocking.xml",
            "<layer width=\"4\" height=\"2\"><tile x=\"2\" y=\"1\" id=\"7\"/></layer>",
        );
        write_file(folder, "decor.xml", "<layer width=\"4\" height=\"2\"></layer>");
        write_file(
            folder,
            "foreground.xml",
            "<layer width=\"4\" height=\"2\"></layer>",
        );
        write_page(folder, "tiles.png", 48, 16);
    }

    #[test]
    fn valid_folder_loads_and_builds_a_world() {
        let temp = TempDir::new().expect("temp");
        write_toroidal_fixture(temp.path());

        let imported = load_map_folder(temp.path(), Topology::Toroidal).expect("import");
        assert_eq!(imported.width_tiles, 4);
        assert_eq!(imported.layers.len(), 5);
        assert_eq!(imported.atlas.page_count(), 1);
        let page = imported.atlas.page_texels(0).expect("page");
        assert_eq!((page.width, page.height), (48, 16));
        assert_eq!(imported.atlas.entry(7).expect("entry").trim.expect("trim").w, 12);

        let world = TilemapWorld::from_imported(imported, Topology::Toroidal).expect("world");
        assert_eq!(world.tile_at(1, 0, 0), 1);
        assert_eq!(world.tile_at(1, 2, 0), EMPTY_TILE);
        assert_eq!(world.tile_at(2, 2, 1), 7);
        // X wraps on the toroidal grid.
        assert_eq!(world.tile_at(2, 6, 1), 7);
    }

    #[test]
    fn missing_manifest_reports_the_path() {
        let temp = TempDir::new().expect("temp");
        let error = load_map_folder(temp.path(), Topology::Bounded).unwrap_err();
        match error {
            ImportError::Io { path, .. } => assert!(path.ends_with("map.json")),
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_manifest_is_a_manifest_error() {
        let temp = TempDir::new().expect("temp");
        write_file(temp.path(), "map.json", "{ not json");
        let error = load_map_folder(temp.path(), Topology::Bounded).unwrap_err();
        assert!(matches!(error, ImportError::Manifest { .. }));
    }

    #[test]
    fn topology_mismatch_is_rejected() {
        let temp = TempDir::new().expect("temp");
        write_toroidal_fixture(temp.path());
        let error = load_map_folder(temp.path(), Topology::Bounded).unwrap_err();
        assert!(matches!(
            error,
            ImportError::TopologyMismatch {
                declared: Topology::Toroidal,
                requested: Topology::Bounded,
                ..
            }
        ));
    }

    #[test]
    fn unknown_topology_string_is_rejected() {
        let temp = TempDir::new().expect("temp");
        write_file(
            temp.path(),
            "map.json",
            r#"{
                "topology": "moebius",
                "width_tiles": 4, "height_tiles": 2, "tile_size_px": 16,
                "layers": [], "atlas": {"pages": [], "tiles": []}
            }"#,
        );
        let error = load_map_folder(temp.path(), Topology::Bounded).unwrap_err();
        assert!(matches!(error, ImportError::UnknownTopology { .. }));
    }

    #[test]
    fn sparse_placement_outside_the_grid_is_a_layer_error() {
        let temp = TempDir::new().expect("temp");
        write_toroidal_fixture(temp.path());
        write_file(
            temp.path(),
            "blocking.xml",
            "<layer width=\"4\" height=\"2\"><tile x=\"9\" y=\"0\" id=\"7\"/></layer>",
        );
        let error = load_map_folder(temp.path(), Topology::Toroidal).unwrap_err();
        assert!(matches!(error, ImportError::Layer { index: 2, .. }));
    }

    #[test]
    fn atlas_tile_referencing_a_missing_page_is_rejected() {
        let temp = TempDir::new().expect("temp");
        write_toroidal_fixture(temp.path());
        write_file(
            temp.path(),
            "map.json",
            r#"{
                "topology": "toroidal",
                "width_tiles": 4, "height_tiles": 2, "tile_size_px": 16,
                "layers": [{"kind": "single", "tile": 4}],
                "atlas": {
                    "pages": [],
                    "tiles": [{"id": 1, "page": 3, "x": 0, "y": 0, "w": 16, "h": 16}]
                }
            }"#,
        );
        let error = load_map_folder(temp.path(), Topology::Toroidal).unwrap_err();
        assert!(matches!(
            error,
            ImportError::AtlasPageOutOfRange { tile: 1, page: 3, pages: 0 }
        ));
    }
}
