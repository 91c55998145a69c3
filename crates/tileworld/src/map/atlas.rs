use std::collections::HashMap;

use super::layer::TileId;

/// Index of one uploadable texture page.
pub type PageId = u8;

/// Texel rectangle within an atlas page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TexelRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Trimmed bounding sub-rect of a tile, in pixels relative to the tile's
/// top-left corner. Smaller than the full tile square; used for precise
/// collision and visual edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasEntry {
    pub page: PageId,
    pub uv: TexelRect,
    pub trim: Option<TrimRect>,
}

/// Decoded RGBA texels of one atlas page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTexels {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Tile id → page/UV/trim lookup plus the decoded page pixel data.
/// Owned by the importer's output, referenced read-only everywhere else.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileAtlas {
    entries: HashMap<TileId, AtlasEntry>,
    pages: Vec<PageTexels>,
}

impl TileAtlas {
    pub fn new(entries: HashMap<TileId, AtlasEntry>, pages: Vec<PageTexels>) -> Self {
        Self { entries, pages }
    }

    pub fn entry(&self, tile: TileId) -> Option<&AtlasEntry> {
        self.entries.get(&tile)
    }

    pub fn page_texels(&self, page: PageId) -> Option<&PageTexels> {
        self.pages.get(page as usize)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}
