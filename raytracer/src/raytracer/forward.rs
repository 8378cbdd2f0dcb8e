//! Forward Passes

use super::*;
use crate::accumulator::*;
use crate::progress::*;
use lfm_core::common::*;
use lfm_core::jones::*;
use lfm_core::volume::*;
use std::thread;
use std::time::Instant;

stat_counter!("Raytracer/Forward passes", FORWARD_PASSES, report_forward_passes);
stat_float_distribution!("Raytracer/Lenslet time (ms)", LENSLET_TIME, report_lenslet_time);

register_stats!(report_forward_passes, report_lenslet_time);

impl BirefringentRaytracer {
    /// Trace the volume and return the sensor images for the whole microlens
    /// array. `RetardanceAzimuth` yields `[retardance, azimuth]`; `Intensity`
    /// yields one image per compensator setting. Pixels without a ray read 0.
    ///
    /// * `volume` - The volume.
    /// * `mode`   - Execution mode.
    /// * `kind`   - Images to produce.
    pub fn ray_trace_through_volume(
        &self,
        volume: &BirefringentVolume,
        mode: ExecutionMode,
        kind: ImageKind,
    ) -> Result<Vec<Image>> {
        self.check_volume(volume)?;
        let start = Instant::now();

        let images = match mode {
            ExecutionMode::PerLenslet => {
                if self.config.threads() > 1 {
                    self.trace_lenslets_parallel(volume, kind)
                } else {
                    self.trace_lenslets(volume, kind)
                }
            }
            ExecutionMode::WholeArray => self.trace_whole_array(volume, kind),
        }?;

        stat_inc!(FORWARD_PASSES, 1);
        report_stats!();
        info!(
            "Forward pass ({:?}, {:?}) took {:.3} s",
            mode,
            kind,
            start.elapsed().as_secs_f64()
        );
        Ok(images)
    }

    /// Returns the `[retardance, azimuth]` images of the whole array.
    ///
    /// * `volume` - The volume.
    /// * `mode`   - Execution mode.
    pub fn ret_and_azim_images(&self, volume: &BirefringentVolume, mode: ExecutionMode) -> Result<[Image; 2]> {
        let mut images = self.ray_trace_through_volume(volume, mode, ImageKind::RetardanceAzimuth)?;
        let azimuth = images.pop().unwrap_or_default();
        let retardance = images.pop().unwrap_or_default();
        Ok([retardance, azimuth])
    }

    /// Returns the intensity images of the whole array, one per compensator
    /// setting.
    ///
    /// * `volume` - The volume.
    /// * `mode`   - Execution mode.
    pub fn intensity_images(&self, volume: &BirefringentVolume, mode: ExecutionMode) -> Result<Vec<Image>> {
        self.ray_trace_through_volume(volume, mode, ImageKind::Intensity)
    }

    /// Returns the images of a single lenslet, `pixels_per_ml` on each side.
    /// Nonzero pixel grids are honoured when installed.
    ///
    /// * `volume`  - The volume.
    /// * `lenslet` - The lenslet.
    /// * `kind`    - Images to produce.
    pub fn lenslet_images(
        &self,
        volume: &BirefringentVolume,
        lenslet: LensletIndex,
        kind: ImageKind,
    ) -> Result<Vec<Image>> {
        self.check_volume(volume)?;
        self.trace_lenslet(volume, lenslet, kind)
    }

    /// Fails if the volume does not have the configured shape.
    fn check_volume(&self, volume: &BirefringentVolume) -> Result<()> {
        if *volume.shape() != self.config.volume_shape {
            return Err(RaytraceError::ShapeMismatch {
                expected: self.config.volume_shape.to_vec(),
                found: volume.shape().to_vec(),
            });
        }
        Ok(())
    }

    /// Trace one lenslet and record the time spent.
    fn trace_lenslet(&self, volume: &BirefringentVolume, lenslet: LensletIndex, kind: ImageKind) -> Result<Vec<Image>> {
        let start = Instant::now();

        let voxels = self.mla.shifted_voxels(lenslet)?;
        let view = self.mla.geometry().view(&voxels);
        let filtered;
        let view = match self.nonzero_grid(lenslet)? {
            Some(grid) => {
                let mask: Vec<bool> = view
                    .pixels
                    .iter()
                    .map(|&(row, col)| grid.get(row, col).unwrap_or(false))
                    .collect();
                filtered = view.filter(&mask)?;
                filtered.view()
            }
            None => view,
        };

        let jones = accumulate::<Float>(volume, &view, self.config.wavelength)?;
        let p = self.config.pixels_per_ml;
        let images = self.images_from_rays(p, view.pixels, &jones, kind)?;

        let elapsed = start.elapsed();
        stat_dist!(LENSLET_TIME, elapsed.as_secs_f64() * 1000.0);
        self.record_execution_time(lenslet, elapsed);
        debug!("Lenslet {:?}: {} rays in {:?}", lenslet, view.len(), elapsed);

        Ok(images)
    }

    /// Trace lenslets row by row on the calling thread, joining tiles into rows
    /// and rows into the sensor image.
    fn trace_lenslets(&self, volume: &BirefringentVolume, kind: ImageKind) -> Result<Vec<Image>> {
        let n = self.config.n_micro_lenses;
        let progress = create_progress_reporter(n as u64, self.config.verbose);
        progress.set_message("Tracing microlens rows");

        let mut rows: Vec<Vec<Image>> = vec![Vec::with_capacity(n); kind.n_images()];
        for row in 0..n {
            let mut tiles: Vec<Vec<Image>> = vec![Vec::with_capacity(n); kind.n_images()];
            for col in 0..n {
                let lenslet_images = self.trace_lenslet(volume, LensletIndex::new(row, col), kind)?;
                for (k, image) in lenslet_images.into_iter().enumerate() {
                    tiles[k].push(image);
                }
            }
            for (k, row_tiles) in tiles.iter().enumerate() {
                rows[k].push(Image::concat_horizontal(row_tiles)?);
            }
            progress.inc(1);
        }
        progress.finish_with_message("Tracing complete");

        rows.iter().map(|r| Image::concat_vertical(r)).collect()
    }

    /// Trace lenslets on worker threads and place each tile at its pixel offset.
    fn trace_lenslets_parallel(&self, volume: &BirefringentVolume, kind: ImageKind) -> Result<Vec<Image>> {
        let n_threads = self.config.threads();
        let size = self.config.pixels_per_mla();
        let lenslets: Vec<LensletIndex> = self.mla.lenslets().collect();

        let progress = create_progress_reporter(lenslets.len() as u64, self.config.verbose);
        progress.set_message("Tracing microlenses");

        let mut images = vec![Image::new(size, size); kind.n_images()];
        let mut failure: Option<RaytraceError> = None;

        thread::scope(|scope| {
            let (tx_collector, rx_collector) =
                crossbeam_channel::bounded::<(LensletIndex, Result<Vec<Image>>)>(n_threads);
            let (tx_worker, rx_worker) = crossbeam_channel::bounded::<LensletIndex>(n_threads);

            // Spawn collector thread.
            let images = &mut images;
            let failure = &mut failure;
            let progress = &progress;
            scope.spawn(move || {
                for (lenslet, result) in rx_collector.iter() {
                    let origin = self.mla.pixel_offset(lenslet);
                    let placed = result.and_then(|tiles| {
                        images
                            .iter_mut()
                            .zip(tiles.iter())
                            .try_for_each(|(image, tile)| image.place_tile(tile, origin))
                    });
                    if let Err(e) = placed {
                        if failure.is_none() {
                            *failure = Some(e);
                        }
                    }
                    progress.inc(1);
                }
            });

            // Spawn worker threads.
            for _ in 0..n_threads {
                let rx_worker = rx_worker.clone();
                let tx_collector = tx_collector.clone();
                scope.spawn(move || {
                    for lenslet in rx_worker.iter() {
                        let result = self.trace_lenslet(volume, lenslet, kind);
                        if tx_collector.send((lenslet, result)).is_err() {
                            break;
                        }
                    }
                    report_stats!();
                });
            }
            drop(rx_worker); // Drop extra since we've cloned one for each worker.
            drop(tx_collector);

            // Send work.
            for lenslet in lenslets.iter() {
                if tx_worker.send(*lenslet).is_err() {
                    break;
                }
            }
        });

        if let Some(e) = failure {
            return Err(e);
        }
        progress.finish_with_message("Tracing complete");
        Ok(images)
    }

    /// Trace all rays of the array in one batch.
    fn trace_whole_array(&self, volume: &BirefringentVolume, kind: ImageKind) -> Result<Vec<Image>> {
        let batch = self.whole_array.as_ref().ok_or_else(|| {
            RaytraceError::Configuration(
                "whole-array evaluation requires prepare_for_all_rays_at_once()".to_string(),
            )
        })?;

        let view = batch.view();
        let jones = accumulate_parallel::<Float>(volume, &view, self.config.wavelength, self.config.threads())?;
        self.images_from_rays(self.config.pixels_per_mla(), view.pixels, &jones, kind)
    }

    /// Convert accumulated Jones matrices to square images.
    ///
    /// * `size`   - Pixels along each side of the images.
    /// * `pixels` - Pixel of each ray.
    /// * `jones`  - Accumulated Jones matrix of each ray.
    /// * `kind`   - Images to produce.
    fn images_from_rays(
        &self,
        size: usize,
        pixels: &[PixelIndex],
        jones: &[JonesMatrixf],
        kind: ImageKind,
    ) -> Result<Vec<Image>> {
        match kind {
            ImageKind::RetardanceAzimuth => {
                let (retardance, azimuth): (Vec<Float>, Vec<Float>) =
                    jones.iter().map(retardance_azimuth_from_matrix).unzip();
                Ok(vec![
                    Image::scatter(size, size, pixels, &retardance)?,
                    Image::scatter(size, size, pixels, &azimuth)?,
                ])
            }
            ImageKind::Intensity => (0..N_POLARIZATION_SETTINGS)
                .map(|setting| {
                    let compensator = universal_compensator_modes(setting, self.config.polarizer_swing)?;
                    let intensity: Vec<Float> = jones
                        .iter()
                        .map(|j| detected_intensity(&self.config.analyzer, j, &compensator))
                        .collect();
                    Image::scatter(size, size, pixels, &intensity)
                })
                .collect(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;
    use float_cmp::*;
    use lfm_core::geometry::*;

    fn raytracer(config: OpticalConfig) -> BirefringentRaytracer {
        let depth = config.volume_shape[0];
        let p = config.pixels_per_ml;
        BirefringentRaytracer::new(config, synthetic_geometry(p, depth)).unwrap()
    }

    fn single_voxel_volume() -> BirefringentVolume {
        let mut volume = BirefringentVolume::zeros([1, 6, 6]).unwrap();
        volume.set_voxel([0, 3, 3], 0.1, Vector3f::new(1.0, 0.0, 0.0)).unwrap();
        volume
    }

    /// Distance between two azimuths modulo π.
    fn azimuth_distance(a: Float, b: Float) -> Float {
        let d = (a - b).abs() % PI;
        min(d, PI - d)
    }

    #[test]
    fn single_voxel_lights_central_neighbourhood() {
        let _ = env_logger::builder().is_test(true).try_init();
        let rt = raytracer(synthetic_config([1, 6, 6], 1, 1, 5));
        let [retardance, azimuth] = rt
            .ret_and_azim_images(&single_voxel_volume(), ExecutionMode::PerLenslet)
            .unwrap();

        assert_eq!((retardance.rows(), retardance.cols()), (5, 5));
        for row in 0..5 {
            for col in 0..5 {
                let ret = retardance.get(row, col).unwrap();
                let azim = azimuth.get(row, col).unwrap();
                let di = row as isize - 2;
                let dj = col as isize - 2;
                if max(di.abs(), dj.abs()) == 1 {
                    assert!(ret > 0.0, "pixel ({row}, {col}) should see the voxel");
                    assert!((0.0..PI).contains(&azim));
                } else {
                    // The axial ray runs along the optic axis; the rest miss the voxel.
                    assert_eq!(ret, 0.0, "pixel ({row}, {col})");
                    assert_eq!(azim, 0.0, "pixel ({row}, {col})");
                }
            }
        }
    }

    #[test]
    fn whole_array_matches_per_lenslet() {
        let mut rt = raytracer(synthetic_config([2, 16, 16], 3, 2, 5));
        rt.prepare_for_all_rays_at_once().unwrap();
        let volume = patterned_volume([2, 16, 16]);

        for kind in [ImageKind::RetardanceAzimuth, ImageKind::Intensity] {
            let lazy = rt
                .ray_trace_through_volume(&volume, ExecutionMode::PerLenslet, kind)
                .unwrap();
            let eager = rt
                .ray_trace_through_volume(&volume, ExecutionMode::WholeArray, kind)
                .unwrap();
            assert_eq!(lazy.len(), kind.n_images());
            for (a, b) in lazy.iter().zip(eager.iter()) {
                assert_eq!((a.rows(), a.cols()), (15, 15));
                assert!(a.max_abs_diff(b) < 1e-5);
            }
        }
    }

    #[test]
    fn parallel_lenslets_match_sequential() {
        let volume = patterned_volume([2, 16, 16]);
        let sequential = raytracer(synthetic_config([2, 16, 16], 3, 2, 5));
        let parallel = raytracer(OpticalConfig {
            n_threads: 3,
            ..synthetic_config([2, 16, 16], 3, 2, 5)
        });
        let a = sequential
            .ret_and_azim_images(&volume, ExecutionMode::PerLenslet)
            .unwrap();
        let b = parallel
            .ret_and_azim_images(&volume, ExecutionMode::PerLenslet)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn central_lenslet_matches_single_lenslet() {
        // With 3x3 lenses of 2 voxels the central lenslet is shifted to y, x = 5;
        // a single lens sits at 7. Shift the volume by 2 to line them up.
        let array_volume = patterned_volume([1, 16, 16]);
        let mut single_volume = BirefringentVolume::zeros([1, 16, 16]).unwrap();
        for y in 2..16 {
            for x in 2..16 {
                let flat = ravel_index([0, y - 2, x - 2], &[1, 16, 16]);
                let (dn, axis) = array_volume.get_vox_params(flat).unwrap();
                single_volume.set_voxel([0, y, x], dn, axis).unwrap();
            }
        }

        let mut array = raytracer(synthetic_config([1, 16, 16], 3, 2, 5));
        array.prepare_for_all_rays_at_once().unwrap();
        let single = raytracer(synthetic_config([1, 16, 16], 1, 2, 5));
        assert_eq!(array.mla().volume_offset(LensletIndex::new(1, 1)), [5, 5]);
        assert_eq!(single.mla().volume_offset(LensletIndex::new(0, 0)), [7, 7]);

        let [array_ret, array_azim] = array
            .ret_and_azim_images(&array_volume, ExecutionMode::WholeArray)
            .unwrap();
        let [single_ret, single_azim] = single
            .ret_and_azim_images(&single_volume, ExecutionMode::PerLenslet)
            .unwrap();

        let center_ret = array_ret.sub_image((5, 5), 5, 5).unwrap();
        let center_azim = array_azim.sub_image((5, 5), 5, 5).unwrap();
        assert!(center_ret.max_abs_diff(&single_ret) < 1e-5);
        for (a, b) in center_azim.data().iter().zip(single_azim.data().iter()) {
            assert!(azimuth_distance(*a, *b) < 1e-5);
        }
    }

    #[test]
    fn radiometry_all_dark_and_all_bright() {
        let volume = patterned_volume([2, 16, 16]);
        let mut rt = raytracer(synthetic_config([2, 16, 16], 3, 2, 5));
        rt.prepare_for_all_rays_at_once().unwrap();
        let unfiltered = rt
            .ret_and_azim_images(&volume, ExecutionMode::WholeArray)
            .unwrap();

        let bright = Image::from_vec(15, 15, vec![1.0; 225]).unwrap();
        rt.filter_from_radiometry(&bright).unwrap();
        let all_true = rt
            .ret_and_azim_images(&volume, ExecutionMode::WholeArray)
            .unwrap();
        assert_eq!(all_true, unfiltered);

        rt.filter_from_radiometry(&Image::new(15, 15)).unwrap();
        assert!(rt.whole_array().unwrap().is_empty());
        let all_false = rt
            .ret_and_azim_images(&volume, ExecutionMode::WholeArray)
            .unwrap();
        for image in all_false.iter() {
            assert!(image.data().iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn dark_lenslet_grid_blanks_its_tile() {
        let volume = patterned_volume([2, 16, 16]);
        let mut rt = raytracer(synthetic_config([2, 16, 16], 3, 2, 5));
        let unfiltered = rt
            .ret_and_azim_images(&volume, ExecutionMode::PerLenslet)
            .unwrap();

        let mut grids = HashMap::new();
        for lenslet in rt.mla().lenslets() {
            let lit = lenslet != LensletIndex::new(0, 1);
            grids.insert(lenslet, PixelMask::from_vec(5, 5, vec![lit; 25]).unwrap());
        }
        rt.set_nonzero_pixels(grids).unwrap();
        let filtered = rt
            .ret_and_azim_images(&volume, ExecutionMode::PerLenslet)
            .unwrap();

        let dark = filtered[0].sub_image((0, 5), 5, 5).unwrap();
        assert!(dark.data().iter().all(|&v| v == 0.0));
        let lit = filtered[0].sub_image((5, 5), 5, 5).unwrap();
        assert_eq!(lit, unfiltered[0].sub_image((5, 5), 5, 5).unwrap());
    }

    #[test]
    fn intensity_of_missing_rays_is_zero() {
        let rt = raytracer(synthetic_config([1, 6, 6], 1, 1, 5));
        let images = rt
            .intensity_images(&single_voxel_volume(), ExecutionMode::PerLenslet)
            .unwrap();
        assert_eq!(images.len(), N_POLARIZATION_SETTINGS);

        for (setting, image) in images.iter().enumerate() {
            // Corner rays miss the volume.
            assert_eq!(image.get(0, 0), Some(0.0));

            // The ray at (0, 2) crosses only empty voxels.
            let compensator = universal_compensator_modes(setting, rt.config().polarizer_swing).unwrap();
            let expected = detected_intensity(&rt.config().analyzer, &JonesMatrixf::identity(), &compensator);
            let found = image.get(0, 2).unwrap();
            assert!(approx_eq!(Float, found, expected, epsilon = 1e-12));
        }
    }

    #[test]
    fn whole_array_requires_prepared_geometry() {
        let rt = raytracer(synthetic_config([1, 6, 6], 1, 1, 5));
        assert!(matches!(
            rt.ret_and_azim_images(&single_voxel_volume(), ExecutionMode::WholeArray),
            Err(RaytraceError::Configuration(_))
        ));
    }

    #[test]
    fn volume_shape_must_match() {
        let rt = raytracer(synthetic_config([1, 6, 6], 1, 1, 5));
        let volume = BirefringentVolume::zeros([1, 7, 7]).unwrap();
        assert!(matches!(
            rt.ret_and_azim_images(&volume, ExecutionMode::PerLenslet),
            Err(RaytraceError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn lenslet_images_match_array_tile() {
        let volume = patterned_volume([2, 16, 16]);
        let rt = raytracer(synthetic_config([2, 16, 16], 3, 2, 5));
        let full = rt
            .ray_trace_through_volume(&volume, ExecutionMode::PerLenslet, ImageKind::RetardanceAzimuth)
            .unwrap();
        let lenslet = LensletIndex::new(2, 0);
        let tiles = rt
            .lenslet_images(&volume, lenslet, ImageKind::RetardanceAzimuth)
            .unwrap();
        let origin = rt.mla().pixel_offset(lenslet);
        for (image, tile) in full.iter().zip(tiles.iter()) {
            assert_eq!(&image.sub_image(origin, 5, 5).unwrap(), tile);
        }
    }
}
