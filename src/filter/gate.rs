// Gate filter: bin-relative single-pass outlier removal
//
// Per bin, the window is [mean - limit, mean + limit] with the mean taken over
// the valid samples of that bin. Every sample outside the window is erased in
// one pass; unlike despiking, the length of the excursion does not matter.

use super::ChannelStage;
use crate::bins::BinLayout;
use crate::channel::MISSING;
use crate::error::{EddyError, Result};
use crate::report::Reporter;
use crate::stats::nan_mean;

/// Erase samples further than `limit` from their bin mean
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateFilter {
    limit: f64,
}

impl GateFilter {
    /// # Errors
    /// `Configuration` when `limit` is negative or NaN
    pub fn new(limit: f64) -> Result<Self> {
        if limit.is_nan() || limit < 0.0 {
            return Err(EddyError::config(format!(
                "gate limit must be non-negative, got {}",
                limit
            )));
        }
        Ok(Self { limit })
    }

    pub fn limit(&self) -> f64 {
        self.limit
    }

    /// Filter one bin, returning the number of erased samples
    fn filter_bin(&self, bin: &mut [f64]) -> usize {
        let mean = nan_mean(bin);
        if mean.is_nan() {
            return 0;
        }
        let (lo, hi) = (mean - self.limit, mean + self.limit);

        let mut removed = 0;
        for v in bin.iter_mut() {
            // NaN compares false on both sides and is left alone
            if *v < lo || *v > hi {
                *v = MISSING;
                removed += 1;
            }
        }
        removed
    }
}

impl ChannelStage for GateFilter {
    fn stage_name(&self) -> &'static str {
        "gate"
    }

    fn process_channel(
        &self,
        channel: &str,
        values: &mut [f64],
        layout: &BinLayout,
        reporter: &dyn Reporter,
    ) -> usize {
        let mut total = 0;
        for (i, bin) in layout.bins().iter().enumerate() {
            let slice = layout.slice_mut(i, values);
            let len = slice.len();
            let removed = self.filter_bin(slice);
            if removed > 0 {
                let percent = removed as f64 / len as f64 * 100.0;
                reporter.gate_removed(channel, *bin, removed, percent);
            }
            total += removed;
        }
        total
    }
}
