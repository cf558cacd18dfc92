//! Visual model descriptions and their renderable counterparts.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use vehsim_collision::{CollisionShapeCache, MeshModel, PointCloud, RenderPoint, Renderable, TriangleMesh};
use vehsim_shape::{Polygon2, Pose3};

use crate::error::Result;

/// Geometry of a visual model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VisualGeometry {
    /// Box centered at the model origin.
    Box {
        /// Edge lengths along X, Y, Z (m).
        size: [f32; 3],
    },
    /// Z-aligned cylinder centered at the model origin.
    Cylinder {
        /// Radius (m).
        radius: f32,
        /// Height (m).
        height: f32,
        /// Facets around the axis.
        #[serde(default = "default_segments")]
        segments: u32,
    },
    /// Indexed triangle mesh.
    Mesh {
        /// Vertex positions.
        vertices: Vec<[f32; 3]>,
        /// Vertex index triples.
        triangles: Vec<[u32; 3]>,
        /// Whether the mesh carries a texture.
        #[serde(default)]
        textured: bool,
    },
    /// Bare point cloud.
    Points {
        /// Point positions.
        points: Vec<[f32; 3]>,
    },
}

fn default_segments() -> u32 {
    24
}

fn default_scale() -> f64 {
    1.0
}

/// A visual model placed in its owner's frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VisualDescriptor {
    /// Model geometry.
    pub geometry: VisualGeometry,
    /// Placement of the model in the owner frame.
    #[serde(default)]
    pub pose: Pose3,
    /// Uniform scale.
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Identity of the model content; models sharing a key share one
    /// collision shape.
    pub key: Option<String>,
}

impl VisualDescriptor {
    /// Build the renderable for this model.
    pub fn build(&self) -> Arc<dyn Renderable> {
        match &self.geometry {
            VisualGeometry::Box { size } => Arc::new(MeshModel::new(TriangleMesh::cuboid(size[0], size[1], size[2]))),
            VisualGeometry::Cylinder {
                radius,
                height,
                segments,
            } => Arc::new(MeshModel::new(TriangleMesh::cylinder(*radius, *height, *segments))),
            VisualGeometry::Mesh {
                vertices,
                triangles,
                textured,
            } => {
                let mesh = TriangleMesh {
                    vertices: vertices.iter().flatten().copied().collect(),
                    indices: triangles.iter().flatten().copied().collect(),
                };
                if *textured {
                    Arc::new(MeshModel::textured(mesh))
                } else {
                    Arc::new(MeshModel::new(mesh))
                }
            }
            VisualGeometry::Points { points } => Arc::new(PointCloud::new(
                points.iter().map(|p| RenderPoint::new(p[0], p[1], p[2])).collect(),
            )),
        }
    }

    /// Footprint of this model sliced to `[z_min, z_max]`, through `cache`.
    pub fn footprint(
        &self,
        model: &dyn Renderable,
        cache: &CollisionShapeCache,
        z_min: f64,
        z_max: f64,
    ) -> Result<Polygon2> {
        let shape = cache.get(model, z_min, z_max, &self.pose, self.scale, self.key.as_deref())?;
        Ok(shape.to_polygon())
    }
}
