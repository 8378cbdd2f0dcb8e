//! Birefringent Raytracer

use crate::image::*;
use crate::lenslet::*;
use crate::mla::*;
use crate::rays::*;
use lfm_core::config::*;
use lfm_core::error::*;
use lfm_core::jones::N_POLARIZATION_SETTINGS;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

mod analysis;
mod forward;
mod timing;

// Re-export
pub use analysis::RaySelection;

/// How a forward pass walks the microlens array.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Evaluate one lenslet at a time using memoized shifted geometry.
    PerLenslet,

    /// Evaluate all rays of the array in one batch. Requires
    /// `prepare_for_all_rays_at_once()`.
    WholeArray,
}

/// What a forward pass produces.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ImageKind {
    /// Retardance and azimuth images.
    RetardanceAzimuth,

    /// One intensity image per compensator setting.
    Intensity,
}

impl ImageKind {
    /// Returns the number of images produced.
    pub fn n_images(&self) -> usize {
        match self {
            Self::RetardanceAzimuth => 2,
            Self::Intensity => N_POLARIZATION_SETTINGS,
        }
    }
}

/// Forward model of a light-field microscope imaging a birefringent volume.
/// Holds the lenslet geometry, its replication across the microlens array and
/// the optional ray filters.
#[derive(Debug)]
pub struct BirefringentRaytracer {
    /// The optical configuration.
    config: OpticalConfig,

    /// Lenslet geometry replicated across the array.
    mla: MlaReplicator,

    /// Rays of the whole array once prepared.
    whole_array: Option<RayBatch>,

    /// Per-lenslet grids of pixels known to carry signal.
    nonzero_pixels: Option<HashMap<LensletIndex, PixelMask>>,

    /// Time spent on each lenslet by per-lenslet passes.
    execution_times: Mutex<HashMap<LensletIndex, Duration>>,
}

impl BirefringentRaytracer {
    /// Create a new raytracer.
    ///
    /// * `config`   - Optical configuration.
    /// * `geometry` - Ray geometry of a single lenslet from the geometry solver.
    pub fn new(config: OpticalConfig, geometry: LensletGeometry) -> Result<Self> {
        crate::accumulator::register_stats();
        crate::rays::register_stats();
        forward::register_stats();

        let mla = MlaReplicator::new(geometry, &config)?;

        info!(
            "Raytracer for {}x{} microlenses, {} voxels per lens, {} pixels per lens, volume {:?}",
            config.n_micro_lenses,
            config.n_micro_lenses,
            config.n_voxels_per_ml,
            config.pixels_per_ml,
            config.volume_shape
        );

        Ok(Self {
            config,
            mla,
            whole_array: None,
            nonzero_pixels: None,
            execution_times: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the optical configuration.
    pub fn config(&self) -> &OpticalConfig {
        &self.config
    }

    /// Returns the microlens array replicator.
    pub fn mla(&self) -> &MlaReplicator {
        &self.mla
    }

    /// Returns true once the whole-array geometry is prepared.
    pub fn is_geometry_ready(&self) -> bool {
        self.whole_array.is_some()
    }

    /// Returns the whole-array rays if prepared.
    pub fn whole_array(&self) -> Option<&RayBatch> {
        self.whole_array.as_ref()
    }

    /// Build the geometry of every lenslet as one batch for `WholeArray` passes.
    /// Does nothing if the geometry is already prepared.
    pub fn prepare_for_all_rays_at_once(&mut self) -> Result<()> {
        if self.whole_array.is_some() {
            debug!("Whole-array geometry already prepared");
            return Ok(());
        }

        let batch = self.mla.whole_array()?;
        info!(
            "Prepared whole-array geometry: {} rays over {} lenslets",
            batch.len(),
            self.config.n_micro_lenses * self.config.n_micro_lenses
        );
        self.whole_array = Some(batch);
        Ok(())
    }

    /// Drop the prepared whole-array geometry and the memoized lenslet indices.
    pub fn reset_geometry(&mut self) {
        self.whole_array = None;
        self.mla.clear_cache();
        debug!("Geometry reset");
    }

    /// Remove rays whose sensor pixel reads zero in `radiometry` from the
    /// whole-array geometry.
    ///
    /// * `radiometry` - Sensor image covering the whole array.
    pub fn filter_from_radiometry(&mut self, radiometry: &Image) -> Result<()> {
        let size = self.config.pixels_per_mla();
        let batch = self.whole_array.as_ref().ok_or_else(|| {
            RaytraceError::Configuration(
                "radiometry filtering requires prepare_for_all_rays_at_once()".to_string(),
            )
        })?;
        if radiometry.rows() != size || radiometry.cols() != size {
            return Err(RaytraceError::ShapeMismatch {
                expected: vec![size, size],
                found: vec![radiometry.rows(), radiometry.cols()],
            });
        }

        let mask: Vec<bool> = batch
            .pixels()
            .iter()
            .map(|&(row, col)| radiometry.get(row, col).map_or(false, |v| v != 0.0))
            .collect();
        let filtered = batch.view().filter(&mask)?;
        info!(
            "Radiometry filter kept {} of {} rays",
            filtered.len(),
            batch.len()
        );
        self.whole_array = Some(filtered);
        Ok(())
    }

    /// Install per-lenslet grids of nonzero pixels. `PerLenslet` passes then
    /// only trace rays landing on nonzero pixels. Every lenslet of the array
    /// needs a grid.
    ///
    /// * `grids` - Grid of each lenslet.
    pub fn set_nonzero_pixels(&mut self, grids: HashMap<LensletIndex, PixelMask>) -> Result<()> {
        let p = self.config.pixels_per_ml;
        for lenslet in self.mla.lenslets() {
            match grids.get(&lenslet) {
                None => {
                    return Err(RaytraceError::Configuration(format!(
                        "no nonzero pixel grid for lenslet {lenslet:?}"
                    )))
                }
                Some(grid) if grid.rows() != p || grid.cols() != p => {
                    return Err(RaytraceError::ShapeMismatch {
                        expected: vec![p, p],
                        found: vec![grid.rows(), grid.cols()],
                    })
                }
                Some(_) => {}
            }
        }
        debug!("Installed nonzero pixel grids for {} lenslets", grids.len());
        self.nonzero_pixels = Some(grids);
        Ok(())
    }

    /// Remove the per-lenslet grids of nonzero pixels.
    pub fn clear_nonzero_pixels(&mut self) {
        self.nonzero_pixels = None;
    }

    /// Returns the nonzero pixel grid of a lenslet.
    ///
    /// * `lenslet` - The lenslet.
    fn nonzero_grid(&self, lenslet: LensletIndex) -> Result<Option<&PixelMask>> {
        match &self.nonzero_pixels {
            None => Ok(None),
            Some(grids) => grids.get(&lenslet).map(Some).ok_or_else(|| {
                RaytraceError::Configuration(format!("no nonzero pixel grid for lenslet {lenslet:?}"))
            }),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
