pub mod backend;
pub mod camera;
pub mod compositor;
pub mod fence;
pub mod transform;
pub mod visibility;
