//! Capability-based access to a visual model's vertex buffers.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};

/// A vertex position in a render buffer (model coordinates, f32 like GPU data).
pub type RenderPoint = nalgebra::Point3<f32>;

/// A triangle as stored in a render buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// The three corners.
    pub vertices: [RenderPoint; 3],
}

impl Triangle {
    /// Create a triangle from its corners.
    pub fn new(a: RenderPoint, b: RenderPoint, c: RenderPoint) -> Self {
        Self { vertices: [a, b, c] }
    }
}

/// A render buffer guarded by its own lock.
///
/// Renderers write it when refreshing; readers hold the read guard only
/// while copying data out.
#[derive(Debug)]
pub struct PrimitiveBuffer<T> {
    data: RwLock<Vec<T>>,
}

impl<T> Default for PrimitiveBuffer<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> PrimitiveBuffer<T> {
    /// Create a buffer holding `data`.
    pub fn new(data: Vec<T>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Lock the buffer for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.data.read()
    }

    /// Replace the buffer contents.
    pub fn replace(&self, data: Vec<T>) {
        *self.data.write() = data;
    }

    /// Number of stored elements.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A visual model, seen through the primitive kinds it can expose.
///
/// Every capability is optional: a renderable returns `Some` only for the
/// buffers it actually has. Buffers may be built lazily; the
/// `update_buffers_*` hooks must be called before reading them.
pub trait Renderable: Send + Sync {
    /// Materialize the plain triangle buffer.
    fn update_buffers_triangles(&self) {}

    /// Materialize the textured triangle buffer.
    fn update_buffers_textured_triangles(&self) {}

    /// Materialize the point buffer.
    fn update_buffers_points(&self) {}

    /// Materialize the wireframe buffer.
    fn update_buffers_wireframe(&self) {}

    /// Plain triangles, if this model has them.
    fn triangles_buffer(&self) -> Option<&PrimitiveBuffer<Triangle>> {
        None
    }

    /// Textured triangles, if this model has them.
    fn textured_triangles_buffer(&self) -> Option<&PrimitiveBuffer<Triangle>> {
        None
    }

    /// Point cloud vertices, if this model has them.
    fn points_buffer(&self) -> Option<&PrimitiveBuffer<RenderPoint>> {
        None
    }

    /// Wireframe line endpoints, if this model has them.
    fn wireframe_buffer(&self) -> Option<&PrimitiveBuffer<RenderPoint>> {
        None
    }

    /// Nested sub-objects of a composite asset.
    fn sub_objects(&self) -> &[Arc<dyn Renderable>] {
        &[]
    }

    /// Refresh every buffer this model exposes, including nested objects.
    fn update_buffers_all(&self) {
        self.update_buffers_triangles();
        self.update_buffers_textured_triangles();
        self.update_buffers_points();
        self.update_buffers_wireframe();
        for sub in self.sub_objects() {
            sub.update_buffers_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_buffer_without_default_elements() {
        // Triangle has no Default impl; the buffer must not need one.
        let buf = PrimitiveBuffer::<Triangle>::default();
        assert!(buf.is_empty());

        let origin = RenderPoint::origin();
        buf.replace(vec![Triangle::new(origin, origin, origin)]);
        assert_eq!(buf.len(), 1);
    }
}
