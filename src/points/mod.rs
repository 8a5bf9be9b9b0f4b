//! Point decoding and mesh construction collaborators

pub mod accessor;
pub mod mesh;

pub use accessor::{HasPosition, PodAccessor, PointAccessor, PositionColorPoint, PositionPoint};
pub use mesh::{build_point_meshes, point_mesh_factory, MeshFactory, OctantMesh, PointMesh, MAX_POINTS_PER_MESH};
