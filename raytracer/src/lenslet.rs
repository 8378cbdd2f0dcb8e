//! Lenslet Geometry

use crate::rays::*;
use lfm_core::common::*;
use lfm_core::error::*;
use lfm_core::geometry::*;

/// One collision of a ray with a voxel.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RaySegment {
    /// Voxel index `(z, y, x)` in the lenslet frame. The axial index is absolute;
    /// lateral indices are relative to the voxel under the lenslet center and
    /// may be negative.
    pub voxel: [isize; 3],

    /// Path length of the ray inside the voxel.
    pub length: Float,
}

impl RaySegment {
    /// Create a new segment.
    ///
    /// * `voxel`  - Lenslet-local voxel index.
    /// * `length` - Path length inside the voxel.
    pub fn new(voxel: [isize; 3], length: Float) -> Self {
        Self { voxel, length }
    }
}

/// A ray produced by the geometry solver for one pixel behind a microlens.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelRay {
    /// Pixel `(row, col)` in the lenslet image.
    pub pixel: PixelIndex,

    /// Entry point into the volume. Any NaN component marks a ray that misses
    /// the volume.
    pub entry: Vector3f,

    /// Direction basis of the ray.
    pub basis: RayBasisf,

    /// Voxels crossed by the ray in traversal order.
    pub segments: Vec<RaySegment>,
}

/// Ray geometry of a single microlens, shared by every lenslet in the array.
/// Only rays that enter the volume are stored.
#[derive(Clone, Debug, PartialEq)]
pub struct LensletGeometry {
    /// Pixels along each side of the lenslet image.
    pub pixels_per_ml: usize,

    pixels: Vec<PixelIndex>,
    basis: Vec<RayBasisf>,
    spans: Vec<Span>,
    lengths: Vec<Float>,
    local_voxels: Vec<[isize; 3]>,
    voxel_span: usize,
}

impl LensletGeometry {
    /// Build the lenslet geometry from solver output. Rays with a NaN entry point
    /// are dropped.
    ///
    /// * `pixels_per_ml` - Pixels along each side of the lenslet image.
    /// * `rays`          - Solver rays.
    pub fn new(pixels_per_ml: usize, rays: Vec<PixelRay>) -> Result<Self> {
        let n_segments = rays.iter().map(|r| r.segments.len()).sum();
        let mut geometry = Self {
            pixels_per_ml,
            pixels: Vec::with_capacity(rays.len()),
            basis: Vec::with_capacity(rays.len()),
            spans: Vec::with_capacity(rays.len()),
            lengths: Vec::with_capacity(n_segments),
            local_voxels: Vec::with_capacity(n_segments),
            voxel_span: 0,
        };

        let n_rays = rays.len();
        for ray in rays.into_iter() {
            let (row, col) = ray.pixel;
            if row >= pixels_per_ml || col >= pixels_per_ml {
                return Err(RaytraceError::Configuration(format!(
                    "ray pixel ({row}, {col}) outside {pixels_per_ml}x{pixels_per_ml} lenslet image"
                )));
            }
            if ray.entry.has_nans() {
                continue;
            }
            if ray.basis.has_nans() {
                return Err(RaytraceError::NumericAnomaly(format!(
                    "ray basis for pixel ({row}, {col}) contains NaN"
                )));
            }
            if let Some(seg) = ray.segments.iter().find(|s| !(s.length >= 0.0 && s.length.is_finite())) {
                return Err(RaytraceError::Configuration(format!(
                    "invalid path length {} for pixel ({row}, {col})",
                    seg.length
                )));
            }

            geometry
                .spans
                .push(Span::new(geometry.local_voxels.len(), ray.segments.len()));
            geometry.pixels.push(ray.pixel);
            geometry.basis.push(ray.basis);
            for seg in ray.segments.iter() {
                geometry.lengths.push(seg.length);
                geometry.local_voxels.push(seg.voxel);
            }
        }

        geometry.voxel_span = lateral_span(&geometry.local_voxels);

        debug!(
            "Lenslet geometry: {} of {} rays enter the volume, {} segments, voxel span {}",
            geometry.spans.len(),
            n_rays,
            geometry.local_voxels.len(),
            geometry.voxel_span
        );

        Ok(geometry)
    }

    /// Returns the number of rays that enter the volume.
    pub fn n_rays(&self) -> usize {
        self.spans.len()
    }

    /// Returns the total number of segments.
    pub fn n_segments(&self) -> usize {
        self.local_voxels.len()
    }

    /// Returns the pixel of each ray.
    pub fn pixels(&self) -> &[PixelIndex] {
        &self.pixels
    }

    /// Returns the direction basis of each ray.
    pub fn basis(&self) -> &[RayBasisf] {
        &self.basis
    }

    /// Returns the segment range of each ray.
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Returns the path length of each segment.
    pub fn lengths(&self) -> &[Float] {
        &self.lengths
    }

    /// Returns the lenslet-local voxel index of each segment.
    pub fn local_voxels(&self) -> &[[isize; 3]] {
        &self.local_voxels
    }

    /// Returns the largest lateral extent, in voxels, covered by the rays.
    pub fn voxel_span(&self) -> usize {
        self.voxel_span
    }

    /// Returns the inclusive `[min, max]` lateral collision index along `y` and
    /// `x`, or `None` if no ray crosses a voxel.
    pub fn lateral_bounds(&self) -> Option<[[isize; 2]; 2]> {
        Some([
            lateral_range(&self.local_voxels, 1)?,
            lateral_range(&self.local_voxels, 2)?,
        ])
    }

    /// Returns a view of the rays with the given flat voxel indices, which must
    /// be aligned with `local_voxels()`.
    ///
    /// * `voxels` - Flat voxel index of each segment.
    pub fn view<'a>(&'a self, voxels: &'a [usize]) -> RayView<'a> {
        debug_assert_eq!(voxels.len(), self.local_voxels.len());
        RayView {
            pixels: &self.pixels,
            basis: &self.basis,
            spans: &self.spans,
            lengths: &self.lengths,
            voxels,
        }
    }
}

/// Returns the inclusive `[min, max]` of one axis of the collision indices.
fn lateral_range(voxels: &[[isize; 3]], axis: usize) -> Option<[isize; 2]> {
    let lo = voxels.iter().map(|v| v[axis]).min()?;
    let hi = voxels.iter().map(|v| v[axis]).max()?;
    Some([lo, hi])
}

/// Returns `max - min + 1` over both lateral axes, whichever is larger.
fn lateral_span(voxels: &[[isize; 3]]) -> usize {
    (1..3)
        .filter_map(|axis| lateral_range(voxels, axis))
        .map(|[lo, hi]| (hi - lo + 1) as usize)
        .max()
        .unwrap_or(0)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
