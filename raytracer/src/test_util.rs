//! Synthetic geometry for tests

use crate::lenslet::*;
use lfm_core::common::*;
use lfm_core::config::*;
use lfm_core::geometry::*;

/// Tilt of a ray per pixel away from the lenslet center.
pub const TILT: Float = 0.3;

/// Returns solver rays for a `pixels_per_ml` square lenslet image over a volume
/// `depth` voxels deep. Corner pixels outside the aperture miss the volume.
/// Each ray crosses `(z, di/2, dj/2)` then `(z, di, dj)` in every layer, where
/// `(di, dj)` is the pixel offset from the lenslet center.
///
/// * `pixels_per_ml` - Pixels along each side of the lenslet image.
/// * `depth`         - Number of axial layers.
pub fn synthetic_rays(pixels_per_ml: usize, depth: usize) -> Vec<PixelRay> {
    let h = (pixels_per_ml / 2) as isize;
    let mut rays = Vec::with_capacity(pixels_per_ml * pixels_per_ml);
    for row in 0..pixels_per_ml {
        for col in 0..pixels_per_ml {
            let di = row as isize - h;
            let dj = col as isize - h;
            let direction = Vector3f::new(1.0, TILT * di as Float, TILT * dj as Float);
            let basis = RayBasisf::from_direction(direction);

            if di * di + dj * dj > h * h + 1 {
                rays.push(PixelRay {
                    pixel: (row, col),
                    entry: Vector3f::new(Float::NAN, Float::NAN, Float::NAN),
                    basis,
                    segments: vec![],
                });
                continue;
            }

            let first = [di / 2, dj / 2];
            let last = [di, dj];
            let layer_length = direction.length();
            let mut segments = vec![];
            for z in 0..depth as isize {
                if first == last {
                    segments.push(RaySegment::new([z, di, dj], layer_length));
                } else {
                    segments.push(RaySegment::new([z, first[0], first[1]], 0.5 * layer_length));
                    segments.push(RaySegment::new([z, last[0], last[1]], 0.5 * layer_length));
                }
            }

            rays.push(PixelRay {
                pixel: (row, col),
                entry: Vector3f::new(0.0, di as Float, dj as Float),
                basis,
                segments,
            });
        }
    }
    rays
}

/// Returns the synthetic lenslet geometry.
///
/// * `pixels_per_ml` - Pixels along each side of the lenslet image.
/// * `depth`         - Number of axial layers.
pub fn synthetic_geometry(pixels_per_ml: usize, depth: usize) -> LensletGeometry {
    LensletGeometry::new(pixels_per_ml, synthetic_rays(pixels_per_ml, depth)).unwrap()
}

/// Returns a configuration for the synthetic geometry.
///
/// * `volume_shape`    - Volume shape.
/// * `n_micro_lenses`  - Microlenses per side.
/// * `n_voxels_per_ml` - Voxels per microlens.
/// * `pixels_per_ml`   - Pixels per microlens.
pub fn synthetic_config(
    volume_shape: VolumeShape,
    n_micro_lenses: usize,
    n_voxels_per_ml: usize,
    pixels_per_ml: usize,
) -> OpticalConfig {
    OpticalConfig {
        volume_shape,
        wavelength: 0.55,
        n_micro_lenses,
        n_voxels_per_ml,
        pixels_per_ml,
        ..OpticalConfig::default()
    }
}

/// Returns a volume filled with a deterministic pattern of birefringence and
/// tilted optic axes.
///
/// * `shape` - Volume shape.
pub fn patterned_volume(shape: VolumeShape) -> lfm_core::volume::BirefringentVolume {
    let n = voxel_count(&shape);
    let delta_n = (0..n)
        .map(|i| if i % 3 == 0 { 0.0 } else { 0.01 * ((i % 7) as Float + 1.0) })
        .collect();
    let axes = (0..n)
        .map(|i| {
            let t = i as Float * 0.37;
            Vector3f::new(1.0, t.sin(), t.cos())
        })
        .collect();
    lfm_core::volume::BirefringentVolume::new(shape, delta_n, axes).unwrap()
}
