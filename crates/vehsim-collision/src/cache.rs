//! Per-model cache of extracted collision shapes.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use vehsim_shape::{Point3, Pose3, Shape2p5, MIN_VOLUME};

use crate::error::{CollisionError, Result};
use crate::renderable::{RenderPoint, Renderable};

/// Maps a model key to the collision shape computed for it.
///
/// Entries are append-only: once a key has a shape, later calls with that
/// key return it unchanged, whatever the renderable or the parameters are.
/// Keys must therefore identify the model content (e.g. its file path plus
/// any variant).
///
/// The cache is owned by one simulation world and shared by reference; it is
/// safe to call [`CollisionShapeCache::get`] from several threads. Each key
/// is computed exactly once: concurrent first requests for the same key wait
/// for the first computation, distinct keys proceed in parallel.
#[derive(Debug, Default)]
pub struct CollisionShapeCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<Shape2p5>>>>,
}

impl CollisionShapeCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collision shape of `obj` sliced to the `[z_min, z_max]` band.
    ///
    /// Every vertex exposed by the model is scaled by `model_scale`, moved by
    /// `model_pose`, and kept only if its resulting Z lies in the band
    /// (inclusive). The shape is the convex hull of the kept points, extruded
    /// over the band.
    ///
    /// With `model_key`, a cached shape is returned as-is; otherwise the
    /// result is computed and stored. Without a key, nothing is cached.
    ///
    /// # Errors
    ///
    /// [`CollisionError::DegenerateShape`] if the shape volume is below
    /// [`MIN_VOLUME`]. A failed key is not cached.
    pub fn get(
        &self,
        obj: &dyn Renderable,
        z_min: f64,
        z_max: f64,
        model_pose: &Pose3,
        model_scale: f64,
        model_key: Option<&str>,
    ) -> Result<Shape2p5> {
        let Some(key) = model_key else {
            return compute_shape(obj, z_min, z_max, model_pose, model_scale, "none");
        };

        // The map lock only covers the cell lookup, never the computation.
        let cell = {
            let mut entries = self.entries.lock();
            Arc::clone(entries.entry(key.to_string()).or_default())
        };

        if let Some(shape) = cell.get() {
            debug!("collision shape cache hit for '{key}'");
            return Ok(shape.clone());
        }

        let shape = cell.get_or_try_init(|| {
            compute_shape(obj, z_min, z_max, model_pose, model_scale, key)
        })?;
        Ok(shape.clone())
    }

    /// Whether a shape is stored for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|cell| cell.get().is_some())
    }

    /// Number of stored shapes.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|cell| cell.get().is_some())
            .count()
    }

    /// Whether no shape is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn compute_shape(
    obj: &dyn Renderable,
    z_min: f64,
    z_max: f64,
    model_pose: &Pose3,
    model_scale: f64,
    model_name: &str,
) -> Result<Shape2p5> {
    let (points, num_total) = collect_points(obj, z_min, z_max, model_pose, model_scale);

    let shape = Shape2p5::create_convex_hull_from_points(&points).with_height_band(z_min, z_max);
    let volume = shape.volume();

    debug!(
        "shape2.5 for '{model_name}': total_pts={num_total} passed_pts={} z_min={z_min} \
         z_max={z_max} contour={} pts volume={volume}",
        points.len(),
        shape.contour().len(),
    );

    if volume < MIN_VOLUME {
        return Err(CollisionError::DegenerateShape {
            model: model_name.to_string(),
            volume,
            z_min,
            z_max,
        });
    }
    Ok(shape)
}

/// Copy out every vertex of `obj` that falls within the height band.
///
/// Returns the kept points and the total number of visited vertices. The band
/// test runs at render-buffer (f32) precision, so a vertex stored at exactly
/// `z_max` stays in. Each buffer lock is held only while that buffer is being
/// read.
fn collect_points(
    obj: &dyn Renderable,
    z_min: f64,
    z_max: f64,
    model_pose: &Pose3,
    model_scale: f64,
) -> (Vec<Point3>, usize) {
    obj.update_buffers_all();

    let iso = model_pose.to_isometry();
    let (band_min, band_max) = (z_min as f32, z_max as f32);
    let mut kept = Vec::new();
    let mut num_total = 0usize;
    let mut visit = |p: &RenderPoint| {
        num_total += 1;
        let local = Point3::new(p.x as f64, p.y as f64, p.z as f64) * model_scale;
        let pt = iso * local;
        let z = pt.z as f32;
        if z < band_min || z > band_max {
            return;
        }
        kept.push(pt);
    };

    if let Some(buf) = obj.triangles_buffer() {
        let tris = buf.read();
        for tri in tris.iter() {
            tri.vertices.iter().for_each(&mut visit);
        }
    }
    if let Some(buf) = obj.textured_triangles_buffer() {
        let tris = buf.read();
        for tri in tris.iter() {
            tri.vertices.iter().for_each(&mut visit);
        }
    }
    if let Some(buf) = obj.points_buffer() {
        buf.read().iter().for_each(&mut visit);
    }
    if let Some(buf) = obj.wireframe_buffer() {
        buf.read().iter().for_each(&mut visit);
    }
    for sub in obj.sub_objects() {
        if let Some(buf) = sub.textured_triangles_buffer() {
            let tris = buf.read();
            for tri in tris.iter() {
                tri.vertices.iter().for_each(&mut visit);
            }
        }
    }

    (kept, num_total)
}
