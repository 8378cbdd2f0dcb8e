//! Raytracer
//!
//! Forward model of a light-field microscope imaging a birefringent volume.
//! Ray geometry of one microlens is replicated across the microlens array and
//! Jones matrices are accumulated along every ray to produce retardance,
//! azimuth or intensity images.

#[macro_use]
extern crate log;

#[macro_use]
extern crate lfm_core;

mod accumulator;
mod image;
mod lenslet;
mod mla;
mod progress;
mod rays;
mod raytracer;

#[cfg(test)]
mod test_util;

// Re-export
pub use accumulator::{accumulate, accumulate_parallel};
pub use image::*;
pub use lenslet::*;
pub use mla::{LensletIndex, MlaReplicator};
pub use progress::*;
pub use rays::{PixelIndex, RayBatch, RayView, Span};
pub use raytracer::*;
