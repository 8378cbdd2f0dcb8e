//! Core
//!
//! Numeric foundation of the light-field birefringence forward model: Jones
//! calculus, voxel volumes, optical configuration and statistics.

#[macro_use]
extern crate log;

// Re-export.
pub mod common;
pub mod config;
pub mod error;
pub mod geometry;
pub mod jones;
pub mod stats;
pub mod volume;
