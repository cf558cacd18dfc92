//! Concrete visual models: triangle meshes, point clouds, wireframes and
//! composite assets.

use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::renderable::{PrimitiveBuffer, RenderPoint, Renderable, Triangle};

/// Indexed triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    /// Flat array of vertex positions: `[x0, y0, z0, x1, y1, z1, ...]` (f32).
    pub vertices: Vec<f32>,
    /// Flat array of triangle indices: `[i0, i1, i2, ...]` (u32).
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Append a vertex, returning its index.
    pub fn push_vertex(&mut self, x: f32, y: f32, z: f32) -> u32 {
        let idx = self.num_vertices() as u32;
        self.vertices.extend_from_slice(&[x, y, z]);
        idx
    }

    /// Axis-aligned box centered at the origin.
    pub fn cuboid(sx: f32, sy: f32, sz: f32) -> Self {
        let (hx, hy, hz) = (sx * 0.5, sy * 0.5, sz * 0.5);
        Self {
            vertices: vec![
                -hx, -hy, hz, hx, -hy, hz, hx, hy, hz, -hx, hy, hz, // top
                -hx, -hy, -hz, -hx, hy, -hz, hx, hy, -hz, hx, -hy, -hz, // bottom
            ],
            indices: vec![
                0, 1, 2, 0, 2, 3, // top
                4, 5, 6, 4, 6, 7, // bottom
                3, 2, 6, 3, 6, 5, // +y
                0, 7, 1, 0, 4, 7, // -y
                1, 7, 6, 1, 6, 2, // +x
                0, 3, 5, 0, 5, 4, // -x
            ],
        }
    }

    /// Cylinder along the Z axis, centered at the origin.
    pub fn cylinder(radius: f32, height: f32, segments: u32) -> Self {
        let segments = segments.max(3);
        let hz = height * 0.5;
        let mut mesh = Self::new();
        let bottom_center = mesh.push_vertex(0.0, 0.0, -hz);
        let top_center = mesh.push_vertex(0.0, 0.0, hz);
        for i in 0..segments {
            let a = i as f32 * TAU / segments as f32;
            let (s, c) = a.sin_cos();
            mesh.push_vertex(radius * c, radius * s, -hz);
            mesh.push_vertex(radius * c, radius * s, hz);
        }
        for i in 0..segments {
            let b0 = 2 + 2 * i;
            let t0 = b0 + 1;
            let b1 = 2 + 2 * ((i + 1) % segments);
            let t1 = b1 + 1;
            mesh.indices.extend_from_slice(&[bottom_center, b1, b0]);
            mesh.indices.extend_from_slice(&[top_center, t0, t1]);
            mesh.indices.extend_from_slice(&[b0, b1, t1, b0, t1, t0]);
        }
        mesh
    }

    /// Expand the indexed mesh into explicit triangles.
    ///
    /// Out-of-range indices are skipped.
    pub fn triangles(&self) -> Vec<Triangle> {
        let vertex = |i: u32| -> Option<RenderPoint> {
            let base = i as usize * 3;
            let v = self.vertices.get(base..base + 3)?;
            Some(RenderPoint::new(v[0], v[1], v[2]))
        };
        self.indices
            .chunks_exact(3)
            .filter_map(|tri| Some(Triangle::new(vertex(tri[0])?, vertex(tri[1])?, vertex(tri[2])?)))
            .collect()
    }
}

/// A triangle mesh exposed as a renderable.
///
/// The triangle buffer is built lazily from the indexed mesh the first time
/// it is refreshed.
#[derive(Debug)]
pub struct MeshModel {
    mesh: TriangleMesh,
    textured: bool,
    buffer: PrimitiveBuffer<Triangle>,
    stale: AtomicBool,
}

impl MeshModel {
    /// Plain (untextured) triangle model.
    pub fn new(mesh: TriangleMesh) -> Self {
        Self {
            mesh,
            textured: false,
            buffer: PrimitiveBuffer::default(),
            stale: AtomicBool::new(true),
        }
    }

    /// Textured triangle model.
    pub fn textured(mesh: TriangleMesh) -> Self {
        Self {
            textured: true,
            ..Self::new(mesh)
        }
    }

    /// The source mesh.
    pub fn mesh(&self) -> &TriangleMesh {
        &self.mesh
    }

    /// Replace the mesh; the buffer is rebuilt on the next refresh.
    pub fn set_mesh(&mut self, mesh: TriangleMesh) {
        self.mesh = mesh;
        self.stale.store(true, Ordering::Release);
    }

    fn refresh(&self) {
        if self.stale.swap(false, Ordering::AcqRel) {
            self.buffer.replace(self.mesh.triangles());
        }
    }
}

impl Renderable for MeshModel {
    fn update_buffers_triangles(&self) {
        if !self.textured {
            self.refresh();
        }
    }

    fn update_buffers_textured_triangles(&self) {
        if self.textured {
            self.refresh();
        }
    }

    fn triangles_buffer(&self) -> Option<&PrimitiveBuffer<Triangle>> {
        (!self.textured).then_some(&self.buffer)
    }

    fn textured_triangles_buffer(&self) -> Option<&PrimitiveBuffer<Triangle>> {
        self.textured.then_some(&self.buffer)
    }
}

/// A point cloud.
#[derive(Debug, Default)]
pub struct PointCloud {
    points: PrimitiveBuffer<RenderPoint>,
}

impl PointCloud {
    /// Create a point cloud.
    pub fn new(points: Vec<RenderPoint>) -> Self {
        Self {
            points: PrimitiveBuffer::new(points),
        }
    }

    /// Replace the points.
    pub fn set_points(&self, points: Vec<RenderPoint>) {
        self.points.replace(points);
    }
}

impl Renderable for PointCloud {
    fn points_buffer(&self) -> Option<&PrimitiveBuffer<RenderPoint>> {
        Some(&self.points)
    }
}

/// A set of line segments.
#[derive(Debug, Default)]
pub struct Wireframe {
    endpoints: PrimitiveBuffer<RenderPoint>,
}

impl Wireframe {
    /// Create a wireframe from `(start, end)` segments.
    pub fn new(segments: &[(RenderPoint, RenderPoint)]) -> Self {
        Self {
            endpoints: PrimitiveBuffer::new(segments.iter().flat_map(|&(a, b)| [a, b]).collect()),
        }
    }
}

impl Renderable for Wireframe {
    fn wireframe_buffer(&self) -> Option<&PrimitiveBuffer<RenderPoint>> {
        Some(&self.endpoints)
    }
}

/// An asset made of nested textured sub-objects (e.g. an imported scene).
#[derive(Default)]
pub struct CompositeModel {
    objects: Vec<Arc<dyn Renderable>>,
}

impl CompositeModel {
    /// Create a composite from its parts.
    pub fn new(objects: Vec<Arc<dyn Renderable>>) -> Self {
        Self { objects }
    }

    /// Add a sub-object.
    pub fn push(&mut self, object: Arc<dyn Renderable>) {
        self.objects.push(object);
    }
}

impl Renderable for CompositeModel {
    fn sub_objects(&self) -> &[Arc<dyn Renderable>] {
        &self.objects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cuboid_counts() {
        let mesh = TriangleMesh::cuboid(1.0, 2.0, 3.0);
        assert_eq!(mesh.num_vertices(), 8);
        assert_eq!(mesh.num_triangles(), 12);
        assert_eq!(mesh.triangles().len(), 12);
    }

    #[test]
    fn test_cylinder_counts() {
        let mesh = TriangleMesh::cylinder(0.5, 1.0, 16);
        assert_eq!(mesh.num_vertices(), 2 + 2 * 16);
        assert_eq!(mesh.num_triangles(), 4 * 16);
    }

    #[test]
    fn test_out_of_range_indices_skipped() {
        let mut mesh = TriangleMesh::new();
        mesh.push_vertex(0.0, 0.0, 0.0);
        mesh.push_vertex(1.0, 0.0, 0.0);
        mesh.push_vertex(0.0, 1.0, 0.0);
        mesh.indices = vec![0, 1, 2, 0, 1, 9];
        assert_eq!(mesh.triangles().len(), 1);
    }

    #[test]
    fn test_mesh_model_builds_buffer_lazily() {
        let model = MeshModel::new(TriangleMesh::cuboid(1.0, 1.0, 1.0));
        assert!(model.triangles_buffer().unwrap().is_empty());
        assert!(model.textured_triangles_buffer().is_none());

        model.update_buffers_all();
        assert_eq!(model.triangles_buffer().unwrap().len(), 12);
    }

    #[test]
    fn test_textured_model_capabilities() {
        let model = MeshModel::textured(TriangleMesh::cuboid(1.0, 1.0, 1.0));
        assert!(model.triangles_buffer().is_none());
        model.update_buffers_textured_triangles();
        assert_eq!(model.textured_triangles_buffer().unwrap().len(), 12);
    }

    #[test]
    fn test_wireframe_endpoints() {
        let w = Wireframe::new(&[
            (RenderPoint::new(0.0, 0.0, 0.0), RenderPoint::new(1.0, 0.0, 0.0)),
            (RenderPoint::new(1.0, 0.0, 0.0), RenderPoint::new(1.0, 1.0, 0.0)),
        ]);
        assert_eq!(w.wireframe_buffer().unwrap().len(), 4);
    }
}
