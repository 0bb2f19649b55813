// Absolute range filter
//
// Physically impossible readings (e.g. |w| > 5 m/s near the surface, sonic
// temperature outside ±40 °C) are erased before any statistics are taken.

use super::ChannelStage;
use crate::bins::BinLayout;
use crate::channel::{is_missing, valid_count, MISSING};
use crate::error::{EddyError, Result};
use crate::report::Reporter;

/// Erase samples below `lower` or above `upper`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeFilter {
    lower: f64,
    upper: f64,
}

impl RangeFilter {
    /// # Errors
    /// `Configuration` when a bound is NaN or `lower > upper`
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        if lower.is_nan() || upper.is_nan() || lower > upper {
            return Err(EddyError::config(format!(
                "range filter needs lower <= upper, got [{}, {}]",
                lower, upper
            )));
        }
        Ok(Self { lower, upper })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Erase out-of-range samples, returning how many were erased
    pub fn filter(&self, values: &mut [f64]) -> usize {
        let mut removed = 0;
        for v in values.iter_mut() {
            if !is_missing(*v) && (*v < self.lower || *v > self.upper) {
                *v = MISSING;
                removed += 1;
            }
        }
        removed
    }
}

impl ChannelStage for RangeFilter {
    fn stage_name(&self) -> &'static str {
        "range"
    }

    fn process_channel(
        &self,
        channel: &str,
        values: &mut [f64],
        _layout: &BinLayout,
        reporter: &dyn Reporter,
    ) -> usize {
        let before = valid_count(values);
        let removed = self.filter(values);
        let percent = if before > 0 {
            removed as f64 / before as f64 * 100.0
        } else {
            0.0
        };
        reporter.range_removed(channel, removed, percent);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erases_out_of_range() {
        let filter = RangeFilter::new(-5.0, 5.0).unwrap();
        let mut values = vec![-6.0, -5.0, 0.0, 5.0, 5.1, MISSING];
        assert_eq!(filter.filter(&mut values), 2);
        assert!(values[0].is_nan());
        assert_eq!(values[1], -5.0);
        assert_eq!(values[3], 5.0);
        assert!(values[4].is_nan());
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        assert!(RangeFilter::new(5.0, -5.0).is_err());
        assert!(RangeFilter::new(f64::NAN, 1.0).is_err());
    }
}
