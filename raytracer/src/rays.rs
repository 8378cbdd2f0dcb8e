//! Ray Batches

use lfm_core::common::*;
use lfm_core::error::*;
use lfm_core::geometry::*;
use std::ops::Range;

stat_counter!("Filter/Rays removed", RAYS_REMOVED, report_rays_removed);
stat_counter!("Filter/Rays kept", RAYS_KEPT, report_rays_kept);

register_stats!(report_rays_removed, report_rays_kept);

/// Sensor pixel as `(row, col)`.
pub type PixelIndex = (usize, usize);

/// Range of one ray's segments within the shared segment arena.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Span {
    /// Index of the first segment.
    pub start: usize,

    /// Number of segments.
    pub count: usize,
}

impl Span {
    /// Create a new span.
    ///
    /// * `start` - Index of the first segment.
    /// * `count` - Number of segments.
    pub fn new(start: usize, count: usize) -> Self {
        Self { start, count }
    }

    /// Returns the segment range.
    #[inline(always)]
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.count
    }
}

/// Borrowed, read-only set of rays ready for Jones accumulation. Segment
/// voxels are flat indices into a volume; `spans` locate each ray's segments
/// inside `voxels` and `lengths`.
#[derive(Copy, Clone, Debug)]
pub struct RayView<'a> {
    /// Pixel hit by each ray.
    pub pixels: &'a [PixelIndex],

    /// Direction basis of each ray.
    pub basis: &'a [RayBasisf],

    /// Segment range of each ray.
    pub spans: &'a [Span],

    /// Path length of each segment.
    pub lengths: &'a [Float],

    /// Flat voxel index of each segment.
    pub voxels: &'a [usize],
}

impl<'a> RayView<'a> {
    /// Returns the number of rays.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Returns true if there are no rays.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Returns the largest segment count over all rays.
    pub fn max_segments(&self) -> usize {
        self.spans.iter().map(|s| s.count).max().unwrap_or(0)
    }

    /// Returns a view over a contiguous range of rays. The segment arena is
    /// shared, not copied.
    ///
    /// * `rays` - Range of rays.
    pub fn slice(&self, rays: Range<usize>) -> Self {
        Self {
            pixels: &self.pixels[rays.clone()],
            basis: &self.basis[rays.clone()],
            spans: &self.spans[rays],
            lengths: self.lengths,
            voxels: self.voxels,
        }
    }

    /// Returns the `(voxel, length)` segments of a ray in traversal order.
    ///
    /// * `ray` - Ray index.
    pub fn segments(&self, ray: usize) -> impl Iterator<Item = (usize, Float)> + 'a {
        let range = self.spans[ray].range();
        self.voxels[range.clone()]
            .iter()
            .copied()
            .zip(self.lengths[range].iter().copied())
    }

    /// Returns an owned copy of the rays where `mask` is true. Ray order is
    /// preserved and segments are compacted into a new arena.
    ///
    /// * `mask` - One flag per ray.
    pub fn filter(&self, mask: &[bool]) -> Result<RayBatch> {
        if mask.len() != self.len() {
            return Err(RaytraceError::ShapeMismatch {
                expected: vec![self.len()],
                found: vec![mask.len()],
            });
        }

        let kept = mask.iter().filter(|&&m| m).count();
        let mut batch = RayBatch::with_capacity(kept, 0);
        for (ray, _) in mask.iter().enumerate().filter(|(_, &m)| m) {
            let range = self.spans[ray].range();
            batch.push_ray(
                self.pixels[ray],
                self.basis[ray],
                &self.lengths[range.clone()],
                &self.voxels[range],
            );
        }

        stat_inc!(RAYS_KEPT, kept as i64);
        stat_inc!(RAYS_REMOVED, (self.len() - kept) as i64);

        Ok(batch)
    }
}

/// Owned set of rays with a compact segment arena.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RayBatch {
    pixels: Vec<PixelIndex>,
    basis: Vec<RayBasisf>,
    spans: Vec<Span>,
    lengths: Vec<Float>,
    voxels: Vec<usize>,
}

impl RayBatch {
    /// Create an empty batch with reserved storage.
    ///
    /// * `n_rays`     - Expected number of rays.
    /// * `n_segments` - Expected total number of segments.
    pub fn with_capacity(n_rays: usize, n_segments: usize) -> Self {
        Self {
            pixels: Vec::with_capacity(n_rays),
            basis: Vec::with_capacity(n_rays),
            spans: Vec::with_capacity(n_rays),
            lengths: Vec::with_capacity(n_segments),
            voxels: Vec::with_capacity(n_segments),
        }
    }

    /// Append a ray.
    ///
    /// * `pixel`   - Pixel hit by the ray.
    /// * `basis`   - Direction basis of the ray.
    /// * `lengths` - Path length of each segment.
    /// * `voxels`  - Flat voxel index of each segment.
    pub fn push_ray(&mut self, pixel: PixelIndex, basis: RayBasisf, lengths: &[Float], voxels: &[usize]) {
        debug_assert_eq!(lengths.len(), voxels.len());
        self.spans.push(Span::new(self.voxels.len(), voxels.len()));
        self.pixels.push(pixel);
        self.basis.push(basis);
        self.lengths.extend_from_slice(lengths);
        self.voxels.extend_from_slice(voxels);
    }

    /// Returns the number of rays.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Returns true if there are no rays.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Returns the pixel hit by each ray.
    pub fn pixels(&self) -> &[PixelIndex] {
        &self.pixels
    }

    /// Returns the total number of segments.
    pub fn segment_count(&self) -> usize {
        self.voxels.len()
    }

    /// Returns a borrowed view of the batch.
    pub fn view(&self) -> RayView<'_> {
        RayView {
            pixels: &self.pixels,
            basis: &self.basis,
            spans: &self.spans,
            lengths: &self.lengths,
            voxels: &self.voxels,
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
