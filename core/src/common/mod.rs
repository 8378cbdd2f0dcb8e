//! Common numeric stuff

mod common;
mod index;

// Re-export
pub use common::*;
pub use index::*;
