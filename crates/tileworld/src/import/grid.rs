//! XML layer grid parsing. Dense layers carry a CSV cell list, sparse
//! layers a list of `<tile>` placements:
//!
//! ```xml
//! <layer width="4" height="2">
//!   <data>0,1,0,0, 0,0,2,0</data>
//! </layer>
//!
//! <layer width="64" height="32">
//!   <tile x="3" y="4" id="7"/>
//! </layer>
//! ```

use std::collections::HashMap;
use std::path::Path;

use roxmltree::{Document, Node};

use crate::map::layer::{TileId, DENSE_MAX_TILE_ID};

use super::ImportError;

#[derive(Debug)]
pub struct DenseGrid {
    pub width: u32,
    pub height: u32,
    pub tiles: Vec<u8>,
}

#[derive(Debug)]
pub struct SparseGrid {
    pub width: u32,
    pub height: u32,
    pub tiles: HashMap<(u32, u32), TileId>,
}

pub fn parse_dense_grid(path: &Path, raw: &str) -> Result<DenseGrid, ImportError> {
    let doc = parse_document(path, raw)?;
    let root = layer_root(path, &doc)?;
    let (width, height) = grid_dimensions(path, root)?;

    let data = root
        .children()
        .find(|node| node.is_element() && node.tag_name().name() == "data")
        .ok_or_else(|| grid_error(path, "missing <data> element"))?;
    let csv = data.text().unwrap_or_default();

    let mut tiles = Vec::with_capacity(width as usize * height as usize);
    for cell in csv.split(',') {
        let cell = cell.trim();
        if cell.is_empty() {
            continue;
        }
        let value: TileId = cell
            .parse()
            .map_err(|_| grid_error(path, format!("cell '{cell}' is not a tile id")))?;
        if value > DENSE_MAX_TILE_ID {
            return Err(grid_error(
                path,
                format!("dense cell id {value} exceeds the dense layer maximum {DENSE_MAX_TILE_ID}"),
            ));
        }
        tiles.push(value as u8);
    }

    let expected = width as usize * height as usize;
    if tiles.len() != expected {
        return Err(grid_error(
            path,
            format!(
                "<data> holds {} cells, grid is {width}x{height} ({expected})",
                tiles.len()
            ),
        ));
    }

    Ok(DenseGrid {
        width,
        height,
        tiles,
    })
}

pub fn parse_sparse_grid(path: &Path, raw: &str) -> Result<SparseGrid, ImportError> {
    let doc = parse_document(path, raw)?;
    let root = layer_root(path, &doc)?;
    let (width, height) = grid_dimensions(path, root)?;

    let mut tiles = HashMap::new();
    for node in root.children().filter(|node| node.is_element()) {
        if node.tag_name().name() != "tile" {
            return Err(grid_error(
                path,
                format!("unexpected element <{}> in sparse layer", node.tag_name().name()),
            ));
        }
        let x = attribute_u32(path, node, "x")?;
        let y = attribute_u32(path, node, "y")?;
        let id: TileId = attribute_u32(path, node, "id")?
            .try_into()
            .map_err(|_| grid_error(path, format!("tile id at ({x}, {y}) exceeds u16")))?;
        if tiles.insert((x, y), id).is_some() {
            return Err(grid_error(path, format!("duplicate tile at ({x}, {y})")));
        }
    }

    Ok(SparseGrid {
        width,
        height,
        tiles,
    })
}

fn parse_document<'a>(path: &Path, raw: &'a str) -> Result<Document<'a>, ImportError> {
    Document::parse(raw).map_err(|error| ImportError::Xml {
        path: path.to_path_buf(),
        line: error.pos().row,
        column: error.pos().col,
        message: error.to_string(),
    })
}

fn layer_root<'a, 'input>(
    path: &Path,
    doc: &'a Document<'input>,
) -> Result<Node<'a, 'input>, ImportError> {
    let root = doc.root_element();
    if root.tag_name().name() != "layer" {
        return Err(grid_error(
            path,
            format!("root element must be <layer>, found <{}>", root.tag_name().name()),
        ));
    }
    Ok(root)
}

fn grid_dimensions(path: &Path, root: Node<'_, '_>) -> Result<(u32, u32), ImportError> {
    let width = attribute_u32(path, root, "width")?;
    let height = attribute_u32(path, root, "height")?;
    if width == 0 || height == 0 {
        return Err(grid_error(path, format!("grid is {width}x{height}")));
    }
    Ok((width, height))
}

fn attribute_u32(path: &Path, node: Node<'_, '_>, name: &str) -> Result<u32, ImportError> {
    let value = node
        .attribute(name)
        .ok_or_else(|| grid_error(path, format!("missing attribute '{name}' on <{}>", node.tag_name().name())))?;
    value
        .parse()
        .map_err(|_| grid_error(path, format!("attribute '{name}'='{value}' is not a number")))
}

fn grid_error(path: &Path, message: impl Into<String>) -> ImportError {
    ImportError::Grid {
        path: path.to_path_buf(),
        message: message.into(),
    }
}
