//! Voxel Indexing

use crate::error::{RaytraceError, Result};

/// Shape of a voxel volume as `[z, y, x]` extents.
pub type VolumeShape = [usize; 3];

/// Returns the number of voxels in a volume.
///
/// * `shape` - Volume shape.
#[inline(always)]
pub fn voxel_count(shape: &VolumeShape) -> usize {
    shape[0] * shape[1] * shape[2]
}

/// Returns the index of the central voxel of a volume, `floor(shape / 2)` per axis.
///
/// * `shape` - Volume shape.
#[inline(always)]
pub fn volume_center(shape: &VolumeShape) -> [usize; 3] {
    [shape[0] / 2, shape[1] / 2, shape[2] / 2]
}

/// Converts a `(z, y, x)` voxel index into a row-major flat index. The index is
/// assumed to be inside the volume.
///
/// * `index` - Voxel index.
/// * `shape` - Volume shape.
#[inline(always)]
pub fn ravel_index(index: [usize; 3], shape: &VolumeShape) -> usize {
    (index[0] * shape[1] + index[1]) * shape[2] + index[2]
}

/// Converts a signed `(z, y, x)` voxel index into a row-major flat index and
/// fails with `RaytraceError::IndexOutOfBounds` when any component falls outside
/// the volume. Out of range indices are never clamped.
///
/// * `index` - Voxel index.
/// * `shape` - Volume shape.
pub fn ravel_index_checked(index: [isize; 3], shape: &VolumeShape) -> Result<usize> {
    let in_bounds = index
        .iter()
        .zip(shape.iter())
        .all(|(&i, &n)| i >= 0 && (i as usize) < n);

    if in_bounds {
        Ok(ravel_index(
            [index[0] as usize, index[1] as usize, index[2] as usize],
            shape,
        ))
    } else {
        Err(RaytraceError::IndexOutOfBounds { index, shape: *shape })
    }
}

/// Converts a row-major flat index back into a `(z, y, x)` voxel index.
///
/// * `flat`  - Flat index.
/// * `shape` - Volume shape.
#[inline(always)]
pub fn unravel_index(flat: usize, shape: &VolumeShape) -> [usize; 3] {
    let x = flat % shape[2];
    let y = (flat / shape[2]) % shape[1];
    let z = flat / (shape[1] * shape[2]);
    [z, y, x]
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn volume_center_rounds_down() {
        assert_eq!(volume_center(&[1, 6, 7]), [0, 3, 3]);
    }

    #[test]
    fn ravel_index_is_row_major() {
        let shape = [2, 3, 4];
        assert_eq!(ravel_index([0, 0, 1], &shape), 1);
        assert_eq!(ravel_index([0, 1, 0], &shape), 4);
        assert_eq!(ravel_index([1, 0, 0], &shape), 12);
        assert_eq!(ravel_index([1, 2, 3], &shape), 23);
    }

    #[test]
    fn ravel_index_checked_rejects_negative_and_large_components() {
        let shape = [1, 6, 6];
        assert!(matches!(
            ravel_index_checked([0, -1, 2], &shape),
            Err(RaytraceError::IndexOutOfBounds { index: [0, -1, 2], shape: [1, 6, 6] })
        ));
        assert!(ravel_index_checked([0, 2, 6], &shape).is_err());
        assert!(ravel_index_checked([1, 0, 0], &shape).is_err());
        assert_eq!(ravel_index_checked([0, 3, 3], &shape).ok(), Some(21));
    }

    proptest! {
        #[test]
        fn unravel_inverts_ravel(z in 0..5usize, y in 0..7usize, x in 0..9usize) {
            let shape = [5, 7, 9];
            prop_assert_eq!(unravel_index(ravel_index([z, y, x], &shape), &shape), [z, y, x]);
        }
    }
}
