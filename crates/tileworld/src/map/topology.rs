/// World topology along the horizontal axis.
///
/// - `Bounded`: both axes clamp out-of-range samples to the nearest edge
///   tile, so edge tiles appear to repeat past the border.
/// - `Toroidal`: X wraps modulo the world width, Y clamps. Used for the
///   planet-surface maps that feed the distortion compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Bounded,
    Toroidal,
}

/// Grid dimensions plus the wrap/clamp arithmetic shared by visibility,
/// collision and rendering.
///
/// The wrap mask is non-zero iff the width is a power of two; otherwise the
/// general `rem_euclid` path is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridGeometry {
    width_tiles: u32,
    height_tiles: u32,
    tile_size_px: u32,
    wrap_mask: u32,
    topology: Topology,
}

impl GridGeometry {
    pub fn new(width_tiles: u32, height_tiles: u32, tile_size_px: u32, topology: Topology) -> Self {
        let wrap_mask = if width_tiles.is_power_of_two() {
            width_tiles - 1
        } else {
            0
        };
        Self {
            width_tiles,
            height_tiles,
            tile_size_px,
            wrap_mask,
            topology,
        }
    }

    pub fn width_tiles(&self) -> u32 {
        self.width_tiles
    }

    pub fn height_tiles(&self) -> u32 {
        self.height_tiles
    }

    pub fn tile_size_px(&self) -> u32 {
        self.tile_size_px
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn world_width_px(&self) -> f32 {
        (self.width_tiles * self.tile_size_px) as f32
    }

    pub fn world_height_px(&self) -> f32 {
        (self.height_tiles * self.tile_size_px) as f32
    }

    /// Wrap a tile X index into `[0, width_tiles)`.
    pub fn wrap_tile_x(&self, tx: i32) -> u32 {
        if self.width_tiles == 0 {
            return 0;
        }
        if self.wrap_mask != 0 {
            (tx as u32) & self.wrap_mask
        } else {
            tx.rem_euclid(self.width_tiles as i32) as u32
        }
    }

    pub fn clamp_tile_x(&self, tx: i32) -> u32 {
        clamp_index(tx, self.width_tiles)
    }

    pub fn clamp_tile_y(&self, ty: i32) -> u32 {
        clamp_index(ty, self.height_tiles)
    }

    /// Resolve an unbounded tile coordinate into the layer's valid index
    /// range per the topology: Bounded clamps both axes, Toroidal wraps X
    /// and clamps Y.
    pub fn resolve_tile(&self, tx: i32, ty: i32) -> (u32, u32) {
        let y = self.clamp_tile_y(ty);
        let x = match self.topology {
            Topology::Bounded => self.clamp_tile_x(tx),
            Topology::Toroidal => self.wrap_tile_x(tx),
        };
        (x, y)
    }

    /// Wrap a world-space X pixel coordinate into `[0, world_width_px)`.
    ///
    /// Wraps the integer tile index rather than the raw pixel value: the
    /// position is split into tile index plus sub-tile remainder, only the
    /// index wraps, and the two recombine. Raw `fmod` on large pixel
    /// coordinates loses sub-tile precision; the index wrap does not.
    pub fn wrap_world_x(&self, x_px: f32) -> f32 {
        if self.width_tiles == 0 || self.tile_size_px == 0 {
            return 0.0;
        }
        let tile_size = self.tile_size_px as f32;
        let tile = (x_px / tile_size).floor();
        let remainder = x_px - tile * tile_size;
        let wrapped_tile = self.wrap_tile_x(tile as i32);
        wrapped_tile as f32 * tile_size + remainder
    }

    /// Tile index containing a world-space pixel coordinate, before any
    /// wrap or clamp.
    pub fn tile_of_px(&self, v_px: f32) -> i32 {
        if self.tile_size_px == 0 {
            return 0;
        }
        (v_px / self.tile_size_px as f32).floor() as i32
    }
}

fn clamp_index(v: i32, len: u32) -> u32 {
    if len == 0 {
        return 0;
    }
    v.clamp(0, len as i32 - 1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toroidal(width: u32) -> GridGeometry {
        GridGeometry::new(width, 32, 16, Topology::Toroidal)
    }

    #[test]
    fn wrap_mask_tracks_power_of_two_width() {
        assert_eq!(toroidal(64).wrap_mask, 63);
        assert_eq!(toroidal(48).wrap_mask, 0);
    }

    #[test]
    fn wrap_tile_x_agrees_between_mask_and_modulo_paths() {
        let pow2 = toroidal(64);
        let general = toroidal(48);
        for tx in [-130, -64, -1, 0, 17, 63, 64, 200] {
            assert_eq!(pow2.wrap_tile_x(tx), tx.rem_euclid(64) as u32);
            assert_eq!(general.wrap_tile_x(tx), tx.rem_euclid(48) as u32);
        }
    }

    #[test]
    fn wrap_world_x_stays_in_range_and_is_idempotent() {
        let geometry = toroidal(64);
        for x in [-5000.0, -16.5, -0.25, 0.0, 511.9, 1023.0, 4090.0, 99999.5] {
            let wrapped = geometry.wrap_world_x(x);
            assert!(wrapped >= 0.0 && wrapped < geometry.world_width_px(), "x={x}");
            assert_eq!(geometry.wrap_world_x(wrapped), wrapped, "x={x}");
        }
    }

    #[test]
    fn wrap_world_x_is_periodic_in_world_widths() {
        let geometry = toroidal(48);
        let period = geometry.world_width_px();
        for x in [3.5, 100.0, 700.25] {
            for n in [-3i32, -1, 1, 5] {
                let shifted = x + n as f32 * period;
                assert!((geometry.wrap_world_x(shifted) - geometry.wrap_world_x(x)).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn wrap_world_x_preserves_sub_tile_remainder_at_4090() {
        // World width 64 tiles of 16 px, camera raw X 4090 px.
        let geometry = toroidal(64);
        let expected = ((4090 / 16) % 64) as f32 * 16.0 + (4090 % 16) as f32;
        assert_eq!(geometry.wrap_world_x(4090.0), expected);
        assert_eq!(expected, 63.0 * 16.0 + 10.0);
    }

    #[test]
    fn bounded_resolve_clamps_each_axis_independently() {
        let geometry = GridGeometry::new(10, 6, 16, Topology::Bounded);
        assert_eq!(geometry.resolve_tile(-3, 2), (0, 2));
        assert_eq!(geometry.resolve_tile(12, 2), (9, 2));
        assert_eq!(geometry.resolve_tile(4, -1), (4, 0));
        assert_eq!(geometry.resolve_tile(4, 9), (4, 5));
        assert_eq!(geometry.resolve_tile(-3, 9), (0, 5));
    }

    #[test]
    fn toroidal_resolve_wraps_x_and_clamps_y() {
        let geometry = toroidal(64);
        for n in [-2i32, -1, 0, 1, 3] {
            assert_eq!(geometry.resolve_tile(5 + n * 64, 4), (5, 4));
        }
        assert_eq!(geometry.resolve_tile(5, -2), (5, 0));
        assert_eq!(geometry.resolve_tile(5, 99), (5, 31));
    }
}
