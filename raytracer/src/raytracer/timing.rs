//! Lenslet Timing

use super::*;
use std::sync::PoisonError;

impl BirefringentRaytracer {
    /// Returns the time spent on each lenslet by the most recent per-lenslet
    /// evaluations.
    pub fn mla_execution_times(&self) -> HashMap<LensletIndex, Duration> {
        self.execution_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the total time spent on lenslets.
    pub fn total_mla_execution_time(&self) -> Duration {
        self.execution_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    /// Clear the recorded lenslet times.
    pub fn reset_timing_info(&self) {
        self.execution_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Log the recorded lenslet times.
    pub fn print_timing_info(&self) {
        let times = self.mla_execution_times();
        let mut lenslets: Vec<_> = times.keys().copied().collect();
        lenslets.sort();
        for lenslet in lenslets.iter() {
            debug!("Lenslet ({}, {}): {:?}", lenslet.row, lenslet.col, times[lenslet]);
        }
        info!(
            "{} lenslets traced in {:?}",
            times.len(),
            times.values().sum::<Duration>()
        );
    }

    /// Store the time spent on a lenslet.
    pub(super) fn record_execution_time(&self, lenslet: LensletIndex, elapsed: Duration) {
        self.execution_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(lenslet, elapsed);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;

    #[test]
    fn per_lenslet_pass_records_every_lenslet() {
        let rt = BirefringentRaytracer::new(synthetic_config([1, 16, 16], 2, 2, 5), synthetic_geometry(5, 1)).unwrap();
        let volume = patterned_volume([1, 16, 16]);
        rt.ret_and_azim_images(&volume, ExecutionMode::PerLenslet).unwrap();

        let times = rt.mla_execution_times();
        assert_eq!(times.len(), 4);
        assert_eq!(rt.total_mla_execution_time(), times.values().sum());
        rt.print_timing_info();

        rt.reset_timing_info();
        assert!(rt.mla_execution_times().is_empty());
        assert_eq!(rt.total_mla_execution_time(), Duration::ZERO);
    }
}
