//! Optical Configuration

use crate::common::*;
use crate::error::{RaytraceError, Result};
use crate::jones::*;

/// Optical setup of a light-field microscope needed by the forward model.
#[derive(Clone, Debug, PartialEq)]
pub struct OpticalConfig {
    /// Volume shape `[z, y, x]` in voxels.
    pub volume_shape: VolumeShape,

    /// Wavelength of the light, in the same units as the ray path lengths.
    pub wavelength: Float,

    /// Number of microlenses along each side of the square array.
    pub n_micro_lenses: usize,

    /// Number of voxels spanned laterally by one microlens.
    pub n_voxels_per_ml: usize,

    /// Number of pixels along each side of one microlens image.
    pub pixels_per_ml: usize,

    /// Compensator swing for the intensity stack, in radians.
    pub polarizer_swing: Float,

    /// Analyzer in front of the sensor.
    pub analyzer: JonesMatrixf,

    /// Number of worker threads used for parallel evaluation.
    pub n_threads: usize,

    /// Report progress while evaluating microlens rows.
    pub verbose: bool,
}

impl Default for OpticalConfig {
    fn default() -> Self {
        Self {
            volume_shape: [3, 7, 7],
            wavelength: 0.550,
            n_micro_lenses: 1,
            n_voxels_per_ml: 1,
            pixels_per_ml: 17,
            polarizer_swing: 0.03,
            analyzer: default_analyzer(),
            n_threads: 1,
            verbose: false,
        }
    }
}

impl OpticalConfig {
    /// Checks the configuration for values the forward model cannot use.
    pub fn validate(&self) -> Result<()> {
        if self.volume_shape.iter().any(|&n| n == 0) {
            return Err(RaytraceError::Configuration(format!(
                "volume shape {:?} has an empty axis",
                self.volume_shape
            )));
        }
        if !(self.wavelength.is_finite() && self.wavelength > 0.0) {
            return Err(RaytraceError::Configuration(format!(
                "wavelength must be positive and finite, got {}",
                self.wavelength
            )));
        }
        if self.n_micro_lenses == 0 || self.n_voxels_per_ml == 0 || self.pixels_per_ml == 0 {
            return Err(RaytraceError::Configuration(format!(
                "microlens counts must be positive: n_micro_lenses={}, n_voxels_per_ml={}, pixels_per_ml={}",
                self.n_micro_lenses, self.n_voxels_per_ml, self.pixels_per_ml
            )));
        }
        if !self.polarizer_swing.is_finite() {
            return Err(RaytraceError::Configuration(format!(
                "polarizer swing must be finite, got {}",
                self.polarizer_swing
            )));
        }
        self.analyzer
            .check_finite()
            .map_err(|e| RaytraceError::Configuration(format!("invalid analyzer: {e}")))
    }

    /// Returns the number of threads to use.
    pub fn threads(&self) -> usize {
        let max_threads = std::thread::available_parallelism().map_or(1, |n| n.get());
        match self.n_threads {
            0 => {
                warn!("Invalid n_threads 0; using 1");
                1
            }
            n if n > max_threads => {
                warn!("n_threads {n} > max logical CPUs {max_threads}");
                max_threads
            }
            n => n,
        }
    }

    /// Returns the number of pixels along each side of the full sensor image.
    pub fn pixels_per_mla(&self) -> usize {
        self.pixels_per_ml * self.n_micro_lenses
    }
}
