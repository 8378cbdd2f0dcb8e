//! Geometry

mod ray_basis;
mod vector3;

// Re-export
pub use ray_basis::*;
pub use vector3::*;
