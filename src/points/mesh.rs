//! Renderable geometry produced for loaded octants

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::core::types::Vec3;
use crate::math::Aabb;

use super::accessor::{HasPosition, PointAccessor};

/// Largest vertex count a single point mesh may hold (16-bit indices).
pub const MAX_POINTS_PER_MESH: usize = 65_535;

/// Geometry that can be attached to an octant and later released.
pub trait OctantMesh: Send + Sync + 'static {
    /// Number of vertices in the mesh
    fn vertex_count(&self) -> usize;

    /// Release GPU-side resources. Must tolerate repeated calls.
    fn dispose(&self);
}

/// Factory turning a batch of decoded points into zero or more meshes.
pub type MeshFactory<A, M> =
    Arc<dyn Fn(&A, Vec<<A as PointAccessor>::Point>) -> Vec<M> + Send + Sync>;

/// CPU-side point mesh
#[derive(Debug)]
pub struct PointMesh {
    pub positions: Vec<Vec3>,
    pub bounds: Aabb,
    disposed: AtomicBool,
}

impl PointMesh {
    pub fn new(positions: Vec<Vec3>) -> Self {
        let bounds = Aabb::from_points(positions.iter().copied()).unwrap_or_default();
        Self {
            positions,
            bounds,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl OctantMesh for PointMesh {
    fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            log::trace!("Disposed point mesh with {} vertices", self.positions.len());
        }
    }
}

/// Split `points` into point meshes of at most `max_points_per_mesh` vertices.
pub fn build_point_meshes<P>(points: &[P], max_points_per_mesh: usize) -> Vec<PointMesh>
where
    P: HasPosition + Sync,
{
    if points.is_empty() {
        return Vec::new();
    }
    points
        .par_chunks(max_points_per_mesh.clamp(1, MAX_POINTS_PER_MESH))
        .map(|chunk| PointMesh::new(chunk.iter().map(HasPosition::position).collect()))
        .collect()
}

/// Mesh factory producing [`PointMesh`]es for any accessor with positioned points.
pub fn point_mesh_factory<A>(max_points_per_mesh: usize) -> MeshFactory<A, PointMesh>
where
    A: PointAccessor,
    A::Point: HasPosition + Sync,
{
    Arc::new(move |_accessor: &A, points: Vec<A::Point>| {
        build_point_meshes(&points, max_points_per_mesh)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::accessor::{PodAccessor, PositionPoint};

    fn line(n: usize) -> Vec<PositionPoint> {
        (0..n)
            .map(|i| PositionPoint { position: [i as f32, 0.0, 0.0] })
            .collect()
    }

    #[test]
    fn test_split_into_meshes() {
        let meshes = build_point_meshes(&line(10), 4);
        assert_eq!(meshes.len(), 3);
        assert_eq!(meshes.iter().map(|m| m.vertex_count()).collect::<Vec<_>>(), vec![4, 4, 2]);
        assert_eq!(meshes[2].bounds.min, Vec3::new(8.0, 0.0, 0.0));
        assert_eq!(meshes[2].bounds.max, Vec3::new(9.0, 0.0, 0.0));
    }

    #[test]
    fn test_empty_batch_has_no_meshes() {
        assert!(build_point_meshes::<PositionPoint>(&[], 4).is_empty());
    }

    #[test]
    fn test_mesh_limit_is_clamped() {
        let meshes = build_point_meshes(&line(MAX_POINTS_PER_MESH + 1), usize::MAX);
        assert_eq!(meshes.len(), 2);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mesh = PointMesh::new(vec![Vec3::ZERO]);
        assert!(!mesh.is_disposed());
        mesh.dispose();
        mesh.dispose();
        assert!(mesh.is_disposed());
    }

    #[test]
    fn test_factory() {
        let accessor = PodAccessor::<PositionPoint>::new();
        let factory = point_mesh_factory::<PodAccessor<PositionPoint>>(MAX_POINTS_PER_MESH);
        let meshes = factory(&accessor, line(3));
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].vertex_count(), 3);
    }
}
