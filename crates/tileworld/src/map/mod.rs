pub mod atlas;
pub mod layer;
pub mod topology;
pub mod world;
