//! Jones Calculus

mod eigen;
mod float;
mod matrix;
mod polarizer;
mod retarder;

// Re-export
pub use eigen::*;
pub use float::*;
pub use matrix::*;
pub use polarizer::*;
pub use retarder::*;
