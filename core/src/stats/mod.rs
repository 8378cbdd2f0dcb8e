//! Statistics

mod accumulator;
mod macros;
mod registrar;

// Re-export
pub use accumulator::*;
pub use macros::*;
pub use registrar::*;
