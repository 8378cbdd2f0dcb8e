//! Microlens Array Replication

use crate::lenslet::*;
use crate::rays::*;
use itertools::iproduct;
use lfm_core::common::*;
use lfm_core::config::*;
use lfm_core::error::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

stat_percent!(
    "Geometry/Lenslet index cache hits",
    CACHE_HITS,
    CACHE_LOOKUPS,
    report_cache_hits
);

register_stats!(report_cache_hits);

/// Microlens position `(row, col)` in the array; both in `0..n_micro_lenses`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LensletIndex {
    /// Row of the microlens.
    pub row: usize,

    /// Column of the microlens.
    pub col: usize,
}

impl LensletIndex {
    /// Create a new lenslet index.
    ///
    /// * `row` - Row of the microlens.
    /// * `col` - Column of the microlens.
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Replicates one lenslet's ray geometry across a square microlens array by
/// shifting collision indices into the volume. Shifted indices are memoized per
/// lenslet.
#[derive(Debug)]
pub struct MlaReplicator {
    geometry: LensletGeometry,
    volume_shape: VolumeShape,
    n_micro_lenses: usize,
    n_voxels_per_ml: usize,
    cache: Mutex<HashMap<LensletIndex, Arc<Vec<usize>>>>,
}

impl MlaReplicator {
    /// Create a replicator for `geometry` under `config`.
    ///
    /// * `geometry` - Ray geometry of a single lenslet.
    /// * `config`   - Optical configuration.
    pub fn new(geometry: LensletGeometry, config: &OpticalConfig) -> Result<Self> {
        register_stats();

        config.validate()?;
        if geometry.pixels_per_ml != config.pixels_per_ml {
            return Err(RaytraceError::Configuration(format!(
                "lenslet geometry has {} pixels per microlens, configuration expects {}",
                geometry.pixels_per_ml, config.pixels_per_ml
            )));
        }

        let mla = Self {
            geometry,
            volume_shape: config.volume_shape,
            n_micro_lenses: config.n_micro_lenses,
            n_voxels_per_ml: config.n_voxels_per_ml,
            cache: Mutex::new(HashMap::new()),
        };
        mla.check_volume_size()?;
        Ok(mla)
    }

    /// Fails unless the shifted collision indices of every lenslet stay inside
    /// the lateral extent of the volume. The error names the smallest lateral
    /// size that fits.
    fn check_volume_size(&self) -> Result<()> {
        let bounds = match self.geometry.lateral_bounds() {
            Some(bounds) => bounds,
            None => return Ok(()),
        };
        let [_, ny, nx] = self.volume_shape;
        let (min_y, min_x) = (self.min_lateral_extent(bounds[0]), self.min_lateral_extent(bounds[1]));
        if ny < min_y || nx < min_x {
            let n = self.n_micro_lenses;
            return Err(RaytraceError::Configuration(format!(
                "volume lateral shape {ny}x{nx} too small for {n}x{n} microlenses; \
                 minimum lateral size is {min_y}x{min_x}"
            )));
        }
        Ok(())
    }

    /// Returns the smallest extent along one lateral axis that holds the
    /// `[min, max]` collision range of the first and last lenslet.
    ///
    /// * `range` - Inclusive lenslet-local index range on the axis.
    fn min_lateral_extent(&self, [lo, hi]: [isize; 2]) -> usize {
        let n = self.n_micro_lenses;
        let fits = |extent: usize| {
            let first = lateral_offset(0, n, self.n_voxels_per_ml, extent);
            let last = lateral_offset(n - 1, n, self.n_voxels_per_ml, extent);
            first + lo >= 0 && last + hi < extent as isize
        };
        (1..).find(|&extent| fits(extent)).unwrap_or(usize::MAX)
    }

    /// Returns the single-lenslet geometry.
    pub fn geometry(&self) -> &LensletGeometry {
        &self.geometry
    }

    /// Returns the volume shape the indices are shifted into.
    pub fn volume_shape(&self) -> &VolumeShape {
        &self.volume_shape
    }

    /// Returns the number of microlenses along each side.
    pub fn n_micro_lenses(&self) -> usize {
        self.n_micro_lenses
    }

    /// Returns all lenslets in row-major order.
    pub fn lenslets(&self) -> impl Iterator<Item = LensletIndex> {
        iproduct!(0..self.n_micro_lenses, 0..self.n_micro_lenses).map(|(row, col)| LensletIndex::new(row, col))
    }

    /// Returns the lateral `(y, x)` shift applied to the collision indices of a
    /// lenslet.
    ///
    /// * `lenslet` - The lenslet.
    pub fn volume_offset(&self, lenslet: LensletIndex) -> [isize; 2] {
        let [_, ny, nx] = self.volume_shape;
        let (n, v) = (self.n_micro_lenses, self.n_voxels_per_ml);
        [lateral_offset(lenslet.row, n, v, ny), lateral_offset(lenslet.col, n, v, nx)]
    }

    /// Returns the top-left pixel of a lenslet's tile in the sensor image.
    ///
    /// * `lenslet` - The lenslet.
    pub fn pixel_offset(&self, lenslet: LensletIndex) -> PixelIndex {
        let p = self.geometry.pixels_per_ml;
        (lenslet.row * p, lenslet.col * p)
    }

    /// Returns the flat voxel index of every segment for a lenslet, aligned with
    /// the lenslet geometry's segments. Results are memoized.
    ///
    /// * `lenslet` - The lenslet.
    pub fn shifted_voxels(&self, lenslet: LensletIndex) -> Result<Arc<Vec<usize>>> {
        if lenslet.row >= self.n_micro_lenses || lenslet.col >= self.n_micro_lenses {
            return Err(RaytraceError::Configuration(format!(
                "lenslet {:?} outside {}x{} array",
                lenslet, self.n_micro_lenses, self.n_micro_lenses
            )));
        }

        stat_inc!(CACHE_LOOKUPS, 1);
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        match cache.get(&lenslet) {
            Some(voxels) => {
                stat_inc!(CACHE_HITS, 1);
                Ok(Arc::clone(voxels))
            }
            None => {
                let voxels = Arc::new(self.shift(lenslet)?);
                cache.insert(lenslet, Arc::clone(&voxels));
                Ok(voxels)
            }
        }
    }

    /// Shift the collision indices for a lenslet and flatten them.
    fn shift(&self, lenslet: LensletIndex) -> Result<Vec<usize>> {
        let [dy, dx] = self.volume_offset(lenslet);
        self.geometry
            .local_voxels()
            .iter()
            .map(|&[z, y, x]| ravel_index_checked([z, y + dy, x + dx], &self.volume_shape))
            .collect()
    }

    /// Returns the number of lenslets with memoized indices.
    pub fn cached_lenslets(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Drop all memoized indices.
    pub fn clear_cache(&self) {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Returns the rays of every lenslet concatenated in row-major lenslet
    /// order, with pixels in sensor coordinates.
    pub fn whole_array(&self) -> Result<RayBatch> {
        let n_lenslets = self.n_micro_lenses * self.n_micro_lenses;
        let mut batch = RayBatch::with_capacity(
            n_lenslets * self.geometry.n_rays(),
            n_lenslets * self.geometry.n_segments(),
        );

        for lenslet in self.lenslets() {
            let voxels = self.shifted_voxels(lenslet)?;
            let (row0, col0) = self.pixel_offset(lenslet);
            let view = self.geometry.view(&voxels);
            for ray in 0..view.len() {
                let (row, col) = view.pixels[ray];
                let range = view.spans[ray].range();
                batch.push_ray(
                    (row0 + row, col0 + col),
                    view.basis[ray],
                    &view.lengths[range.clone()],
                    &view.voxels[range],
                );
            }
        }

        debug!(
            "Whole-array batch: {} rays, {} segments",
            batch.len(),
            batch.segment_count()
        );
        Ok(batch)
    }

    /// Returns a mask over the volume marking voxels that can be reached by rays
    /// of some lenslet. All axial layers share the same lateral window.
    pub fn reachable_region(&self) -> Vec<bool> {
        let [nz, ny, nx] = self.volume_shape;
        let ctr = volume_center(&self.volume_shape);
        let half = (self.geometry.voxel_span() + self.n_micro_lenses * self.n_voxels_per_ml / 2) as isize;
        let window = |c: usize, n: usize| {
            let lo = max(c as isize - half + 1, 0) as usize;
            let hi = min(c as isize + half, n as isize).max(0) as usize;
            lo..hi
        };
        let (wy, wx) = (window(ctr[1], ny), window(ctr[2], nx));

        let mut mask = vec![false; nz * ny * nx];
        for (z, y, x) in iproduct!(0..nz, wy, wx) {
            mask[ravel_index([z, y, x], &self.volume_shape)] = true;
        }
        mask
    }
}

/// Returns the shift along one lateral axis for the lenslet at position `i`.
///
/// * `i`      - Row or column of the lenslet.
/// * `n`      - Microlenses per side.
/// * `v`      - Voxels per microlens.
/// * `extent` - Volume size along the axis.
fn lateral_offset(i: usize, n: usize, v: usize, extent: usize) -> isize {
    let ctr = (extent / 2) as isize;
    v as isize * (i as isize - (n / 2) as isize) + ctr - (n * v / 2) as isize
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
