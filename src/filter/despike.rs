// Iterative sigma despiking with a run-length noise/event discriminator
//
// Each pass recomputes, per bin, the mean and sample std of the samples that
// are still valid, flags everything outside [mean - nsig·std, mean + nsig·std]
// and scans the flags for runs. A run no longer than `max_run` samples is
// sensor noise and is erased; a longer one is a physical event and is kept.
//
// Erasing spikes tightens the next pass's window, so the process iterates to
// a fixed point. The valid-sample count never increases, which bounds the
// loop; it stops early on the first pass that erases nothing.

use super::ChannelStage;
use crate::bins::BinLayout;
use crate::channel::MISSING;
use crate::error::{EddyError, Result};
use crate::report::Reporter;
use crate::runs::scan_runs;
use crate::stats::{nan_mean, nan_std};
use serde::Serialize;

/// Iterative per-bin mean/std outlier removal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SigmaDespiker {
    nsig: f64,
    max_run: usize,
    iterations: usize,
}

/// Result of despiking one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DespikeOutcome {
    /// Samples erased over all passes
    pub removed: usize,
    /// Passes executed, including the final no-op pass when converged
    pub passes: usize,
    /// Whether a pass erased nothing before the iteration cap was reached
    pub converged: bool,
}

impl SigmaDespiker {
    /// # Arguments
    /// * `nsig` - half-width of the window in standard deviations
    /// * `max_run` - longest excursion (in samples) still treated as noise
    /// * `iterations` - maximum number of passes
    ///
    /// # Errors
    /// `Configuration` when `nsig` is not positive or `iterations` is zero
    pub fn new(nsig: f64, max_run: usize, iterations: usize) -> Result<Self> {
        if !nsig.is_finite() || nsig <= 0.0 {
            return Err(EddyError::config(format!(
                "nsig must be positive, got {}",
                nsig
            )));
        }
        if iterations == 0 {
            return Err(EddyError::config("despiking needs at least one iteration"));
        }
        Ok(Self {
            nsig,
            max_run,
            iterations,
        })
    }

    pub fn nsig(&self) -> f64 {
        self.nsig
    }

    pub fn max_run(&self) -> usize {
        self.max_run
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// One pass over one bin, returning the number of erased samples
    fn pass_bin(&self, bin: &mut [f64]) -> usize {
        let mean = nan_mean(bin);
        let std = nan_std(bin);
        if mean.is_nan() || std.is_nan() {
            return 0;
        }
        let lo = mean - self.nsig * std;
        let hi = mean + self.nsig * std;

        let mask: Vec<bool> = bin.iter().map(|v| *v < lo || *v > hi).collect();

        let mut removed = 0;
        for run in scan_runs(&mask).into_iter().filter(|r| r.len <= self.max_run) {
            for v in &mut bin[run.start..run.end()] {
                *v = MISSING;
            }
            removed += run.len;
        }
        removed
    }

    /// Despike one channel in place
    pub fn despike(
        &self,
        channel: &str,
        values: &mut [f64],
        layout: &BinLayout,
        reporter: &dyn Reporter,
    ) -> DespikeOutcome {
        let mut outcome = DespikeOutcome::default();

        for iteration in 1..=self.iterations {
            outcome.passes = iteration;
            let mut removed_this_pass = 0;

            for (i, bin) in layout.bins().iter().enumerate() {
                let removed = self.pass_bin(layout.slice_mut(i, values));
                if removed > 0 {
                    reporter.despike_removed(channel, *bin, iteration, removed);
                    removed_this_pass += removed;
                }
            }

            outcome.removed += removed_this_pass;
            if removed_this_pass == 0 {
                outcome.converged = true;
                break;
            }
        }

        outcome
    }
}

impl ChannelStage for SigmaDespiker {
    fn stage_name(&self) -> &'static str {
        "despike"
    }

    fn process_channel(
        &self,
        channel: &str,
        values: &mut [f64],
        layout: &BinLayout,
        reporter: &dyn Reporter,
    ) -> usize {
        self.despike(channel, values, layout, reporter).removed
    }
}
