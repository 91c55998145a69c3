//! Memory-barrier hooks around the CPU ↔ rasterizer hand-offs.
//!
//! Two crossings need ordering guarantees when the rasterizing unit has its
//! own view of memory: bucket memory written by the CPU and consumed by the
//! rasterizer, and the intermediate surface written by the rasterizer and
//! read back by the CPU-side compositor. On a unified-memory host both are
//! no-ops; the call sites are retained so a back end with a separate memory
//! domain has the correct insertion points.

/// Producer-side barrier: make CPU writes visible to the rasterizing unit.
/// Called after bucket population and after the surface render pass.
#[inline]
pub fn publish() {}

/// Consumer-side barrier: invalidate any CPU-cached view of memory written
/// by the rasterizing unit. Called before the compositor reads the surface.
#[inline]
pub fn acquire() {}
