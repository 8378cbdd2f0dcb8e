//! Errors

use thiserror::Error;

/// Errors raised while preparing or evaluating a forward pass. Any error aborts
/// the pass for the whole microlens array; partial images are never returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RaytraceError {
    /// Invalid optical setup, e.g. a volume too small for the microlens array.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Geometry and volume (or image) shapes disagree.
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        /// Shape required by the geometry.
        expected: Vec<usize>,

        /// Shape that was supplied.
        found: Vec<usize>,
    },

    /// A shifted collision index landed outside the volume.
    #[error("voxel index {index:?} is out of bounds for volume shape {shape:?}")]
    IndexOutOfBounds {
        /// The offending `(z, y, x)` voxel index.
        index: [isize; 3],

        /// The volume shape.
        shape: [usize; 3],
    },

    /// NaN or infinite value in a Jones matrix or angle.
    #[error("numeric anomaly: {0}")]
    NumericAnomaly(String),
}

/// Result type used throughout the crates.
pub type Result<T> = std::result::Result<T, RaytraceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_out_of_bounds_message_names_index_and_shape() {
        let err = RaytraceError::IndexOutOfBounds {
            index: [0, 7, -1],
            shape: [1, 6, 6],
        };
        let msg = err.to_string();
        assert!(msg.contains("[0, 7, -1]"));
        assert!(msg.contains("[1, 6, 6]"));
    }
}
