//! Birefringent Volume

use crate::common::*;
use crate::error::{RaytraceError, Result};
use crate::geometry::*;

/// A voxelized birefringent material: a signed birefringence per voxel and a
/// unit optic axis per voxel, both stored flat in `(z, y, x)` row-major order.
/// The volume is read-only during a forward pass.
#[derive(Clone, Debug, PartialEq)]
pub struct BirefringentVolume {
    /// Volume shape `[z, y, x]`.
    shape: VolumeShape,

    /// Signed birefringence per voxel.
    delta_n: Vec<Float>,

    /// Optic axis per voxel, components in `(z, y, x)` order.
    optic_axis: Vec<Vector3f>,
}

impl BirefringentVolume {
    /// Creates a new volume. The optic axes are normalized; NaN components are
    /// replaced by 0.
    ///
    /// * `shape`      - Volume shape `[z, y, x]`.
    /// * `delta_n`    - Birefringence per voxel.
    /// * `optic_axis` - Optic axis per voxel.
    pub fn new(shape: VolumeShape, delta_n: Vec<Float>, optic_axis: Vec<Vector3f>) -> Result<Self> {
        let n = voxel_count(&shape);
        if n == 0 {
            return Err(RaytraceError::Configuration(format!("volume shape {shape:?} is empty")));
        }
        if delta_n.len() != n {
            return Err(RaytraceError::ShapeMismatch {
                expected: vec![n],
                found: vec![delta_n.len()],
            });
        }
        if optic_axis.len() != n {
            return Err(RaytraceError::ShapeMismatch {
                expected: vec![3, n],
                found: vec![3, optic_axis.len()],
            });
        }

        let mut volume = Self {
            shape,
            delta_n,
            optic_axis,
        };
        volume.normalize_optic_axis();
        Ok(volume)
    }

    /// Creates a new volume from flat arrays. The optic axis array holds the
    /// three components one after the other, i.e. it is laid out as
    /// `[3, z, y, x]`.
    ///
    /// * `shape`      - Volume shape `[z, y, x]`.
    /// * `delta_n`    - Birefringence per voxel.
    /// * `optic_axis` - Flat optic axis array of length `3 * z * y * x`.
    pub fn from_flat(shape: VolumeShape, delta_n: Vec<Float>, optic_axis: &[Float]) -> Result<Self> {
        let n = voxel_count(&shape);
        if optic_axis.len() != 3 * n {
            return Err(RaytraceError::ShapeMismatch {
                expected: vec![3, shape[0], shape[1], shape[2]],
                found: vec![optic_axis.len()],
            });
        }
        let axes = (0..n)
            .map(|i| Vector3f::new(optic_axis[i], optic_axis[n + i], optic_axis[2 * n + i]))
            .collect();
        Self::new(shape, delta_n, axes)
    }

    /// Creates a volume with the same optic axis in every voxel.
    ///
    /// * `shape`   - Volume shape `[z, y, x]`.
    /// * `delta_n` - Birefringence per voxel.
    /// * `axis`    - The shared optic axis.
    pub fn with_uniform_axis(shape: VolumeShape, delta_n: Vec<Float>, axis: Vector3f) -> Result<Self> {
        let n = voxel_count(&shape);
        Self::new(shape, delta_n, vec![axis; n])
    }

    /// Creates a volume without birefringence.
    ///
    /// * `shape` - Volume shape `[z, y, x]`.
    pub fn zeros(shape: VolumeShape) -> Result<Self> {
        let n = voxel_count(&shape);
        Self::new(shape, vec![0.0; n], vec![Vector3f::ZERO; n])
    }

    /// Returns the volume shape.
    pub fn shape(&self) -> &VolumeShape {
        &self.shape
    }

    /// Returns the number of voxels.
    pub fn len(&self) -> usize {
        self.delta_n.len()
    }

    /// Returns true if the volume has no voxels.
    pub fn is_empty(&self) -> bool {
        self.delta_n.is_empty()
    }

    /// Returns the flat birefringence array.
    pub fn delta_n(&self) -> &[Float] {
        &self.delta_n
    }

    /// Returns the flat optic axis array.
    pub fn optic_axis(&self) -> &[Vector3f] {
        &self.optic_axis
    }

    /// Returns the birefringence and optic axis of a voxel, or `None` if the
    /// flat index is outside the volume.
    ///
    /// * `flat` - Flat voxel index.
    #[inline]
    pub fn get_vox_params(&self, flat: usize) -> Option<(Float, Vector3f)> {
        Some((*self.delta_n.get(flat)?, *self.optic_axis.get(flat)?))
    }

    /// Sets the birefringence and optic axis of one voxel. The axis is
    /// normalized.
    ///
    /// * `index`   - Voxel index `(z, y, x)`.
    /// * `delta_n` - Birefringence.
    /// * `axis`    - Optic axis.
    pub fn set_voxel(&mut self, index: [usize; 3], delta_n: Float, axis: Vector3f) -> Result<()> {
        let signed = [index[0] as isize, index[1] as isize, index[2] as isize];
        let flat = ravel_index_checked(signed, &self.shape)?;
        self.delta_n[flat] = delta_n;
        self.optic_axis[flat] = sanitize_axis(axis);
        Ok(())
    }

    /// Normalizes every optic axis to unit length. NaN components become 0 and
    /// zero axes stay zero. Returns the number of axes that contained NaNs.
    pub fn normalize_optic_axis(&mut self) -> usize {
        let mut n_nan = 0;
        for axis in self.optic_axis.iter_mut() {
            if axis.has_nans() {
                n_nan += 1;
            }
            *axis = sanitize_axis(*axis);
        }
        if n_nan > 0 {
            warn!("Replaced NaN components in {n_nan} optic axes with 0");
        }
        n_nan
    }

    /// Adds another volume of the same shape voxel by voxel. Optic axes are
    /// summed and renormalized.
    ///
    /// * `other` - The other volume.
    pub fn merge(&mut self, other: &Self) -> Result<()> {
        if self.shape != other.shape {
            return Err(RaytraceError::ShapeMismatch {
                expected: self.shape.to_vec(),
                found: other.shape.to_vec(),
            });
        }
        for (d, o) in self.delta_n.iter_mut().zip(other.delta_n.iter()) {
            *d += o;
        }
        for (a, o) in self.optic_axis.iter_mut().zip(other.optic_axis.iter()) {
            *a = sanitize_axis(*a + *o);
        }
        Ok(())
    }

    /// Returns the centered sub-volume of shape `region`.
    ///
    /// * `region` - Region shape; no axis may exceed the volume's.
    pub fn crop_to_region_shape(&self, region: VolumeShape) -> Result<Self> {
        if (0..3).any(|i| region[i] > self.shape[i]) {
            return Err(RaytraceError::Configuration(format!(
                "cannot crop volume of shape {:?} to larger region {region:?}",
                self.shape
            )));
        }
        let start: Vec<usize> = (0..3).map(|i| (self.shape[i] - region[i]) / 2).collect();
        self.resample(region, |[z, y, x]| {
            Some(ravel_index([z + start[0], y + start[1], x + start[2]], &self.shape))
        })
    }

    /// Returns the volume centered in a larger zero-filled region of shape
    /// `region`. Odd padding puts the extra voxel on the high side.
    ///
    /// * `region` - Region shape; no axis may be smaller than the volume's.
    pub fn pad_to_region_shape(&self, region: VolumeShape) -> Result<Self> {
        if (0..3).any(|i| region[i] < self.shape[i]) {
            return Err(RaytraceError::Configuration(format!(
                "cannot pad volume of shape {:?} to smaller region {region:?}",
                self.shape
            )));
        }
        let before: Vec<usize> = (0..3).map(|i| (region[i] - self.shape[i]) / 2).collect();
        self.resample(region, |idx| {
            let mut src = [0; 3];
            for i in 0..3 {
                if idx[i] < before[i] || idx[i] - before[i] >= self.shape[i] {
                    return None;
                }
                src[i] = idx[i] - before[i];
            }
            Some(ravel_index(src, &self.shape))
        })
    }

    /// Builds a volume of shape `region` whose voxels are copied from the
    /// source voxel `source(index)`, or left empty when it returns `None`.
    ///
    /// * `region` - Shape of the new volume.
    /// * `source` - Maps a voxel index of the new volume to a flat index here.
    fn resample<F>(&self, region: VolumeShape, source: F) -> Result<Self>
    where
        F: Fn([usize; 3]) -> Option<usize>,
    {
        let n = voxel_count(&region);
        let mut delta_n = vec![0.0; n];
        let mut optic_axis = vec![Vector3f::ZERO; n];
        for flat in 0..n {
            if let Some(src) = source(unravel_index(flat, &region)) {
                delta_n[flat] = self.delta_n[src];
                optic_axis[flat] = self.optic_axis[src];
            }
        }
        Self::new(region, delta_n, optic_axis)
    }
}

/// Replaces NaN components with 0 and scales nonzero axes to unit length.
///
/// * `axis` - The optic axis.
fn sanitize_axis(axis: Vector3f) -> Vector3f {
    axis.map(|c| if c.is_nan() { 0.0 } else { c }).normalize()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::*;

    #[test]
    fn new_rejects_mismatched_field_lengths() {
        let r = BirefringentVolume::new([1, 2, 2], vec![0.0; 3], vec![Vector3f::ZERO; 4]);
        assert!(matches!(r, Err(RaytraceError::ShapeMismatch { .. })));
    }

    #[test]
    fn from_flat_reads_component_major_axes() {
        // Three voxels; axes along z, y and x respectively.
        let axes = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0];
        let v = BirefringentVolume::from_flat([1, 1, 3], vec![0.1, 0.2, 0.3], &axes).unwrap();
        assert_eq!(v.optic_axis()[0], Vector3f::new(1.0, 0.0, 0.0));
        assert_eq!(v.optic_axis()[1], Vector3f::new(0.0, 1.0, 0.0));
        assert_eq!(v.optic_axis()[2], Vector3f::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn normalize_optic_axis_zeroes_nans_and_scales_to_unit_length() {
        let axes = vec![Vector3f::new(Float::NAN, 3.0, 4.0), Vector3f::ZERO];
        let v = BirefringentVolume::new([1, 1, 2], vec![0.1, 0.0], axes).unwrap();
        let a = v.optic_axis()[0];
        assert!(!a.has_nans());
        assert!(approx_eq!(Float, a.y, 0.6));
        assert!(approx_eq!(Float, a.x, 0.8));
        assert_eq!(v.optic_axis()[1], Vector3f::ZERO);
    }

    #[test]
    fn set_voxel_rejects_indices_outside_volume() {
        let mut v = BirefringentVolume::zeros([1, 6, 6]).unwrap();
        assert!(v.set_voxel([0, 3, 3], 0.1, Vector3f::new(1.0, 0.0, 0.0)).is_ok());
        assert_eq!(v.get_vox_params(21).map(|p| p.0), Some(0.1));
        assert!(matches!(
            v.set_voxel([0, 6, 0], 0.1, Vector3f::new(1.0, 0.0, 0.0)),
            Err(RaytraceError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn merge_sums_birefringence_and_renormalizes_axes() {
        let mut a = BirefringentVolume::with_uniform_axis([1, 1, 1], vec![0.1], Vector3f::new(0.0, 1.0, 0.0)).unwrap();
        let b = BirefringentVolume::with_uniform_axis([1, 1, 1], vec![0.2], Vector3f::new(0.0, 0.0, 1.0)).unwrap();
        a.merge(&b).unwrap();
        assert!(approx_eq!(Float, a.delta_n()[0], 0.3, epsilon = 1e-12));
        assert!(approx_eq!(Float, a.optic_axis()[0].length(), 1.0, epsilon = 1e-12));
    }

    #[test]
    fn merge_rejects_different_shapes() {
        let mut a = BirefringentVolume::zeros([1, 2, 2]).unwrap();
        let b = BirefringentVolume::zeros([1, 2, 3]).unwrap();
        assert!(a.merge(&b).is_err());
    }

    #[test]
    fn pad_then_crop_restores_volume() {
        let mut v = BirefringentVolume::zeros([1, 3, 3]).unwrap();
        v.set_voxel([0, 1, 1], 0.05, Vector3f::new(0.0, 1.0, 0.0)).unwrap();
        let padded = v.pad_to_region_shape([2, 6, 5]).unwrap();
        assert_eq!(padded.shape(), &[2, 6, 5]);
        // Pad before: z 0, y 1, x 1.
        assert_eq!(padded.get_vox_params(ravel_index([0, 2, 2], padded.shape())).map(|p| p.0), Some(0.05));
        let cropped = padded.crop_to_region_shape([1, 3, 3]).unwrap();
        assert_eq!(cropped, v);
    }

    #[test]
    fn crop_rejects_larger_region() {
        let v = BirefringentVolume::zeros([1, 3, 3]).unwrap();
        assert!(v.crop_to_region_shape([1, 4, 3]).is_err());
    }
}
