//! Error types for collision-shape extraction.

use thiserror::Error;

/// Errors that can occur while extracting a collision shape.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollisionError {
    /// The height-band filter left (almost) nothing of the model.
    #[error(
        "collision volume for visual model ('{model}') has almost null volume (={volume} m³); \
         likely not enough vertices within the range [z_min={z_min}, z_max={z_max}]"
    )]
    DegenerateShape {
        /// Model key, or `"none"` for unkeyed models.
        model: String,
        /// The computed volume.
        volume: f64,
        /// Lower end of the height band.
        z_min: f64,
        /// Upper end of the height band.
        z_max: f64,
    },
}

/// Result type for collision-shape operations.
pub type Result<T> = std::result::Result<T, CollisionError>;
