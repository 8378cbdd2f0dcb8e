//! Voxel Occurrence Analysis

use super::*;
use std::collections::BTreeMap;

/// Rays counted by `BirefringentRaytracer::count_voxel_occurrences()`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RaySelection {
    /// Rays landing on zero pixels.
    ZeroPixels,

    /// All rays of lenslets whose grid has no nonzero pixel.
    ZeroLenslets,

    /// Rays landing on nonzero pixels.
    NonzeroPixels,
}

impl BirefringentRaytracer {
    /// Returns how often each flat voxel index is crossed by the selected rays
    /// over the whole array. Requires nonzero pixel grids.
    ///
    /// * `selection` - Rays to count.
    pub fn count_voxel_occurrences(&self, selection: RaySelection) -> Result<BTreeMap<usize, usize>> {
        if self.nonzero_pixels.is_none() {
            return Err(RaytraceError::Configuration(
                "voxel occurrence analysis requires set_nonzero_pixels()".to_string(),
            ));
        }

        let mut counts = BTreeMap::new();
        for lenslet in self.mla.lenslets() {
            let grid = match self.nonzero_grid(lenslet)? {
                Some(grid) => grid,
                None => continue,
            };
            let dark_lenslet = grid.data().iter().all(|&nonzero| !nonzero);
            let voxels = self.mla.shifted_voxels(lenslet)?;
            let view = self.mla.geometry().view(&voxels);

            for ray in 0..view.len() {
                let (row, col) = view.pixels[ray];
                let nonzero = grid.get(row, col).unwrap_or(false);
                let selected = match selection {
                    RaySelection::ZeroPixels => !nonzero,
                    RaySelection::ZeroLenslets => dark_lenslet,
                    RaySelection::NonzeroPixels => nonzero,
                };
                if selected {
                    for (voxel, _) in view.segments(ray) {
                        *counts.entry(voxel).or_insert(0) += 1;
                    }
                }
            }
        }
        Ok(counts)
    }

    /// Returns the sorted flat indices of voxels crossed by at least two rays
    /// that land on zero pixels.
    pub fn identify_voxels_repeated_zero_ret(&self) -> Result<Vec<usize>> {
        self.voxels_with_count(RaySelection::ZeroPixels, 2)
    }

    /// Returns the sorted flat indices of voxels crossed by at least two rays of
    /// lenslets with no nonzero pixel.
    pub fn identify_voxels_zero_ret_lenslet(&self) -> Result<Vec<usize>> {
        self.voxels_with_count(RaySelection::ZeroLenslets, 2)
    }

    /// Returns the sorted flat indices of voxels crossed by at least one ray
    /// that lands on a nonzero pixel.
    pub fn identify_voxels_at_least_one_nonzero_ret(&self) -> Result<Vec<usize>> {
        self.voxels_with_count(RaySelection::NonzeroPixels, 1)
    }

    /// Returns a volume mask of the voxels any lenslet can reach.
    pub fn volume_reachable_region(&self) -> Vec<bool> {
        self.mla.reachable_region()
    }

    fn voxels_with_count(&self, selection: RaySelection, threshold: usize) -> Result<Vec<usize>> {
        let voxels: Vec<usize> = self
            .count_voxel_occurrences(selection)?
            .into_iter()
            .filter(|&(_, count)| count >= threshold)
            .map(|(voxel, _)| voxel)
            .collect();
        debug!(
            "{} voxels crossed at least {} times by {:?} rays",
            voxels.len(),
            threshold,
            selection
        );
        Ok(voxels)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
