//! ooc-points - Out-of-core octree point-cloud streaming

pub mod core;
pub mod math;
pub mod octree;
pub mod points;
pub mod render;
pub mod scene;
pub mod streaming;
