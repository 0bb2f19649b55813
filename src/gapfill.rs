//! Gap filling between despiking and axis rotation
//!
//! Rotation combines velocity components sample by sample and cannot work
//! through missing values, so gaps left by the filters are bridged first:
//! - interior gaps: linear interpolation by sample position between the
//!   nearest valid neighbours
//! - trailing gap: the last valid value is held
//! - leading gap: left missing (nothing to interpolate from)
//!
//! Gap filling ignores bins entirely.

use crate::bins::BinLayout;
use crate::channel::is_missing;
use crate::filter::ChannelStage;
use crate::report::Reporter;

/// Linear interpolation across missing samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GapFiller;

impl GapFiller {
    pub fn new() -> Self {
        Self
    }

    /// Fill gaps in place, returning the number of samples filled
    pub fn fill(&self, values: &mut [f64]) -> usize {
        let Some(first) = values.iter().position(|v| !is_missing(*v)) else {
            return 0;
        };

        let mut filled = 0;
        let mut last_valid = first;
        for i in first + 1..values.len() {
            if is_missing(values[i]) {
                continue;
            }
            let gap = i - last_valid - 1;
            if gap > 0 {
                let (y0, y1) = (values[last_valid], values[i]);
                let span = (i - last_valid) as f64;
                for (k, slot) in values[last_valid + 1..i].iter_mut().enumerate() {
                    *slot = y0 + (y1 - y0) * (k + 1) as f64 / span;
                }
                filled += gap;
            }
            last_valid = i;
        }

        let hold = values[last_valid];
        for slot in &mut values[last_valid + 1..] {
            *slot = hold;
            filled += 1;
        }
        filled
    }
}

impl ChannelStage for GapFiller {
    fn stage_name(&self) -> &'static str {
        "gapfill"
    }

    fn process_channel(
        &self,
        channel: &str,
        values: &mut [f64],
        _layout: &BinLayout,
        reporter: &dyn Reporter,
    ) -> usize {
        let filled = self.fill(values);
        if filled > 0 {
            reporter.gaps_filled(channel, filled);
        }
        filled
    }
}
