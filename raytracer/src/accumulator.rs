//! Jones Accumulation

use crate::rays::*;
use lfm_core::common::*;
use lfm_core::error::*;
use lfm_core::jones::*;
use lfm_core::volume::*;
use std::thread;

stat_counter!("Raytracer/Rays traced", RAYS_TRACED, report_rays_traced);
stat_counter!("Raytracer/Jones matrices built", JONES_BUILT, report_jones_built);
stat_percent!(
    "Raytracer/Voxel visits without birefringence",
    ZERO_BIREFRINGENCE_VISITS,
    VOXEL_VISITS,
    report_zero_birefringence_visits
);
stat_int_distribution!("Raytracer/Segments per ray", SEGMENTS_PER_RAY, report_segments_per_ray);

register_stats!(
    report_rays_traced,
    report_jones_built,
    report_zero_birefringence_visits,
    report_segments_per_ray
);

/// Chunks handed out per worker thread for parallel accumulation.
const CHUNKS_PER_THREAD: usize = 4;

/// Returns the product of the voxel Jones matrices along every ray,
/// `J = J_0 · J_1 · … · J_{m-1}` in traversal order.
///
/// Rays are advanced together one step at a time; a ray drops out once its
/// segments are exhausted. Voxels without birefringence are skipped and a ray
/// with no segments yields the identity.
///
/// * `volume`     - The volume.
/// * `rays`       - Rays with flat voxel indices into `volume`.
/// * `wavelength` - Wavelength of the light.
pub fn accumulate<T: JonesFloat>(
    volume: &BirefringentVolume,
    rays: &RayView,
    wavelength: Float,
) -> Result<Vec<JonesMatrix<T>>> {
    let shape = *volume.shape();
    let wavelength = T::from_float(wavelength);
    let mut jones = vec![JonesMatrix::<T>::identity(); rays.len()];

    let mut active: Vec<usize> = (0..rays.len()).filter(|&r| rays.spans[r].count > 0).collect();
    for span in rays.spans.iter() {
        stat_dist!(SEGMENTS_PER_RAY, span.count as i64);
    }

    let mut step = 0;
    while !active.is_empty() {
        for &ray in active.iter() {
            let segment = rays.spans[ray].start + step;
            let voxel = rays.voxels[segment];
            let (delta_n, axis) = volume.get_vox_params(voxel).ok_or_else(|| {
                let [z, y, x] = unravel_index(voxel, &shape);
                RaytraceError::IndexOutOfBounds {
                    index: [z as isize, y as isize, x as isize],
                    shape,
                }
            })?;

            stat_inc!(VOXEL_VISITS, 1);
            if delta_n == 0.0 {
                stat_inc!(ZERO_BIREFRINGENCE_VISITS, 1);
                continue;
            }

            let basis = rays.basis[ray].map(T::from_float);
            let j = voxel_ray_jones(
                T::from_float(delta_n),
                &axis.map(T::from_float),
                &basis,
                T::from_float(rays.lengths[segment]),
                wavelength,
            );
            stat_inc!(JONES_BUILT, 1);
            jones[ray] *= j;
        }

        step += 1;
        active.retain(|&r| rays.spans[r].count > step);
    }

    stat_inc!(RAYS_TRACED, rays.len() as i64);

    if let Some(ray) = jones.iter().position(|j| !j.is_finite()) {
        return Err(RaytraceError::NumericAnomaly(format!(
            "non-finite Jones matrix for ray at pixel {:?}",
            rays.pixels[ray]
        )));
    }

    Ok(jones)
}

/// Same as `accumulate()` but splits the rays into chunks evaluated on worker
/// threads. The result does not depend on the number of threads.
///
/// * `volume`     - The volume.
/// * `rays`       - Rays with flat voxel indices into `volume`.
/// * `wavelength` - Wavelength of the light.
/// * `n_threads`  - Number of worker threads.
pub fn accumulate_parallel<T: JonesFloat>(
    volume: &BirefringentVolume,
    rays: &RayView,
    wavelength: Float,
    n_threads: usize,
) -> Result<Vec<JonesMatrix<T>>> {
    let n_rays = rays.len();
    if n_threads <= 1 || n_rays < 2 {
        return accumulate(volume, rays, wavelength);
    }

    let n_chunks = min(n_threads * CHUNKS_PER_THREAD, n_rays);
    let chunk_size = (n_rays + n_chunks - 1) / n_chunks;
    let n_chunks = (n_rays + chunk_size - 1) / chunk_size;

    let mut chunks: Vec<Option<Vec<JonesMatrix<T>>>> = vec![None; n_chunks];
    let mut failure: Option<RaytraceError> = None;

    thread::scope(|scope| {
        let (tx_collector, rx_collector) =
            crossbeam_channel::bounded::<(usize, Result<Vec<JonesMatrix<T>>>)>(n_threads);
        let (tx_worker, rx_worker) = crossbeam_channel::bounded::<usize>(n_threads);

        // Spawn collector thread.
        let chunks = &mut chunks;
        let failure = &mut failure;
        scope.spawn(move || {
            for (chunk, result) in rx_collector.iter() {
                match result {
                    Ok(jones) => chunks[chunk] = Some(jones),
                    Err(e) => {
                        if failure.is_none() {
                            *failure = Some(e);
                        }
                    }
                }
            }
        });

        // Spawn worker threads.
        for _ in 0..n_threads {
            let rx_worker = rx_worker.clone();
            let tx_collector = tx_collector.clone();
            scope.spawn(move || {
                for chunk in rx_worker.iter() {
                    let start = chunk * chunk_size;
                    let end = min(start + chunk_size, n_rays);
                    let result = accumulate(volume, &rays.slice(start..end), wavelength);
                    if tx_collector.send((chunk, result)).is_err() {
                        break;
                    }
                }
                report_stats!();
            });
        }
        drop(rx_worker); // Drop extra since we've cloned one for each worker.
        drop(tx_collector);

        // Send work.
        for chunk in 0..n_chunks {
            if tx_worker.send(chunk).is_err() {
                break;
            }
        }
    });

    if let Some(e) = failure {
        return Err(e);
    }

    let mut jones = Vec::with_capacity(n_rays);
    for (chunk, result) in chunks.into_iter().enumerate() {
        match result {
            Some(part) => jones.extend(part),
            None => {
                return Err(RaytraceError::NumericAnomaly(format!(
                    "missing result for ray chunk {chunk}"
                )))
            }
        }
    }
    Ok(jones)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
