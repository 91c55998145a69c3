use std::collections::HashMap;

use crate::map::atlas::{PageId, PageTexels, TexelRect};

use super::compositor::IntermediateSurface;

/// Primitive operations the compositor needs from a rendering back end:
/// make a texture page resident, blit page sub-rects into the surface or
/// the screen frame, and stretch-draw staged surface rows. The bandwidth
/// model is the hardware texture cache: pages and surface bands are
/// uploaded explicitly before they are sampled.
pub trait RenderBackend {
    /// Make `page` resident in the texture cache. Re-uploading a resident
    /// page is a cheap no-op.
    fn upload_page(&mut self, page: PageId, texels: &PageTexels);

    /// Blit a page sub-rect into the intermediate surface, scaled by
    /// `scale` (the camera zoom).
    fn draw_page_to_surface(
        &mut self,
        surface: &mut IntermediateSurface,
        page: PageId,
        src: TexelRect,
        dst_x: i32,
        dst_y: i32,
        scale: f32,
    );

    /// Blit a page sub-rect straight into the screen frame (bounded
    /// worlds render without the surface detour).
    fn draw_page_to_frame(
        &mut self,
        page: PageId,
        src: TexelRect,
        dst_x: i32,
        dst_y: i32,
        scale: f32,
    );

    /// Stage `rows` rows of the surface starting at `band_top` into the
    /// texture cache. Only the staged band may be sampled by
    /// [`RenderBackend::draw_surface_band_scaled`].
    fn upload_surface_band(&mut self, surface: &IntermediateSurface, band_top: u32, rows: u32);

    /// Stretch-draw the staged band across the full frame width, sampling
    /// the `src_width` span starting at `src_left` in surface pixels.
    fn draw_surface_band_scaled(&mut self, band_top: u32, rows: u32, src_left: f32, src_width: f32);
}

/// CPU rasterizer writing an RGBA frame, nearest-neighbour sampling with
/// zero-alpha skip. Presentation (handing the frame to a window surface)
/// is the shell's job.
pub struct SoftwareBackend {
    width: u32,
    height: u32,
    frame: Vec<u8>,
    pages: HashMap<PageId, PageTexels>,
    band_staging: Vec<u8>,
    band_width: u32,
    band_rows: u32,
}

impl SoftwareBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame: vec![0; width as usize * height as usize * 4],
            pages: HashMap::new(),
            band_staging: Vec::new(),
            band_width: 0,
            band_rows: 0,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.frame = vec![0; width as usize * height as usize * 4];
    }

    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    pub fn clear(&mut self, color: [u8; 4]) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }
}

impl RenderBackend for SoftwareBackend {
    fn upload_page(&mut self, page: PageId, texels: &PageTexels) {
        if self.pages.contains_key(&page) {
            return;
        }
        self.pages.insert(page, texels.clone());
    }

    fn draw_page_to_surface(
        &mut self,
        surface: &mut IntermediateSurface,
        page: PageId,
        src: TexelRect,
        dst_x: i32,
        dst_y: i32,
        scale: f32,
    ) {
        let Some(texels) = self.pages.get(&page) else {
            return;
        };
        let (dst_w, dst_h) = (surface.width(), surface.height());
        blit_page_rect(surface.rgba_mut(), dst_w, dst_h, texels, src, dst_x, dst_y, scale);
    }

    fn draw_page_to_frame(
        &mut self,
        page: PageId,
        src: TexelRect,
        dst_x: i32,
        dst_y: i32,
        scale: f32,
    ) {
        let Some(texels) = self.pages.get(&page) else {
            return;
        };
        let (dst_w, dst_h) = (self.width, self.height);
        blit_page_rect(&mut self.frame, dst_w, dst_h, texels, src, dst_x, dst_y, scale);
    }

    fn upload_surface_band(&mut self, surface: &IntermediateSurface, band_top: u32, rows: u32) {
        let rows = rows.min(surface.height().saturating_sub(band_top));
        let row_bytes = surface.width() as usize * 4;
        let start = band_top as usize * row_bytes;
        let end = start + rows as usize * row_bytes;
        self.band_staging.clear();
        self.band_staging.extend_from_slice(&surface.rgba()[start..end]);
        self.band_width = surface.width();
        self.band_rows = rows;
    }

    fn draw_surface_band_scaled(&mut self, band_top: u32, rows: u32, src_left: f32, src_width: f32) {
        if self.width == 0 || self.band_width == 0 || src_width <= 0.0 {
            return;
        }
        let rows = rows.min(self.band_rows);
        let frame_width = self.width as usize;
        for row in 0..rows {
            let dst_y = band_top + row;
            if dst_y >= self.height {
                break;
            }
            let src_row_offset = row as usize * self.band_width as usize * 4;
            let dst_row_offset = dst_y as usize * frame_width * 4;
            for dst_x in 0..self.width {
                let u = (dst_x as f32 + 0.5) / self.width as f32;
                let sample_x = (src_left + u * src_width).floor() as i64;
                let sample_x = sample_x.clamp(0, self.band_width as i64 - 1) as usize;
                let src_offset = src_row_offset + sample_x * 4;
                let dst_offset = dst_row_offset + dst_x as usize * 4;
                self.frame[dst_offset..dst_offset + 4]
                    .copy_from_slice(&self.band_staging[src_offset..src_offset + 4]);
            }
        }
    }
}

/// Nearest-neighbour blit of a page sub-rect into an RGBA target, clipped
/// to the target, skipping fully transparent texels.
#[allow(clippy::too_many_arguments)]
fn blit_page_rect(
    dst: &mut [u8],
    dst_w: u32,
    dst_h: u32,
    texels: &PageTexels,
    src: TexelRect,
    dst_x: i32,
    dst_y: i32,
    scale: f32,
) {
    if src.w == 0 || src.h == 0 || dst_w == 0 || dst_h == 0 {
        return;
    }
    let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
    let inv_scale = scale.recip();
    let out_w = (src.w as f32 * scale).round().max(1.0) as i32;
    let out_h = (src.h as f32 * scale).round().max(1.0) as i32;

    let draw_left = dst_x.max(0);
    let draw_top = dst_y.max(0);
    let draw_right = (dst_x + out_w).min(dst_w as i32);
    let draw_bottom = (dst_y + out_h).min(dst_h as i32);
    if draw_left >= draw_right || draw_top >= draw_bottom {
        return;
    }

    let page_width = texels.width as usize;
    for out_y in draw_top..draw_bottom {
        let dy = out_y - dst_y;
        let src_y = src.y + (((dy as f32) * inv_scale).floor() as u32).min(src.h - 1);
        if src_y >= texels.height {
            continue;
        }
        let src_row_offset = src_y as usize * page_width * 4;
        let dst_row_offset = out_y as usize * dst_w as usize * 4;
        for out_x in draw_left..draw_right {
            let dx = out_x - dst_x;
            let src_x = src.x + (((dx as f32) * inv_scale).floor() as u32).min(src.w - 1);
            if src_x >= texels.width {
                continue;
            }
            let src_offset = src_row_offset + src_x as usize * 4;
            let alpha = texels.rgba[src_offset + 3];
            if alpha == 0 {
                continue;
            }
            let dst_offset = dst_row_offset + out_x as usize * 4;
            dst[dst_offset..dst_offset + 4].copy_from_slice(&texels.rgba[src_offset..src_offset + 4]);
        }
    }
}
