//! Per-bin linear detrending
//!
//! Within every bin an ordinary-least-squares line is fitted against sample
//! position `0..len`, using only the valid samples (missing samples are
//! excluded from the fit, never imputed). The bin is then replaced according
//! to [`DetrendMode`]:
//!
//! | Mode             | Output                     | Missing samples        |
//! |------------------|----------------------------|------------------------|
//! | `Trend`          | fitted line                | filled by the line     |
//! | `Residual`       | value − fit                | stay missing           |
//! | `MeanPreserving` | value − fit + bin mean     | stay missing           |
//!
//! Bins with fewer than `min_val` valid samples cannot support a fit and are
//! blanked entirely.
//!
//! # Example
//! ```
//! use remolino::bins::{BinLayout, BinSet};
//! use remolino::detrend::{DetrendMode, Detrender};
//! use remolino::report::NoopReporter;
//!
//! let index: Vec<f64> = (0..4).map(|i| i as f64).collect();
//! let layout = BinLayout::resolve(&BinSet::new(0.0, 4.0, 4.0).unwrap(), &index);
//! let mut values = vec![1.0, 3.0, 5.0, 7.0];
//!
//! let detrender = Detrender::new(DetrendMode::MeanPreserving, 3).unwrap();
//! detrender.detrend("t", &mut values, &layout, &NoopReporter);
//! assert!(values.iter().all(|v| (v - 4.0).abs() < 1e-12));
//! ```

use crate::bins::BinLayout;
use crate::channel::{is_missing, MISSING};
use crate::error::{EddyError, Result};
use crate::filter::ChannelStage;
use crate::report::Reporter;
use serde::{Deserialize, Serialize};

/// Default minimum number of valid samples per bin
pub const DEFAULT_MIN_VAL: usize = 3;

/// What replaces the bin after the fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetrendMode {
    /// The fitted line only
    Trend,
    /// Value minus the fitted line
    Residual,
    /// Value minus the fitted line plus the bin mean
    MeanPreserving,
}

/// OLS line `y = slope·x + intercept` over sample position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Mean of the valid samples used in the fit
    pub mean: f64,
    /// Number of valid samples used in the fit
    pub count: usize,
}

impl LinearFit {
    /// Fit `values` against their positions, skipping missing samples
    ///
    /// Returns `None` with fewer than two valid samples.
    pub fn of(values: &[f64]) -> Option<Self> {
        let mut n = 0usize;
        let (mut sx, mut sy) = (0.0, 0.0);
        for (x, y) in values.iter().enumerate().filter(|(_, y)| !is_missing(**y)) {
            n += 1;
            sx += x as f64;
            sy += *y;
        }
        if n < 2 {
            return None;
        }

        let mx = sx / n as f64;
        let my = sy / n as f64;
        let (mut sxx, mut sxy) = (0.0, 0.0);
        for (x, y) in values.iter().enumerate().filter(|(_, y)| !is_missing(**y)) {
            let dx = x as f64 - mx;
            sxx += dx * dx;
            sxy += dx * (*y - my);
        }

        // Distinct integer positions: sxx > 0 whenever n >= 2
        let slope = sxy / sxx;
        Some(Self {
            slope,
            intercept: my - slope * mx,
            mean: my,
            count: n,
        })
    }

    pub fn at(&self, x: usize) -> f64 {
        self.slope * x as f64 + self.intercept
    }
}

/// Per-bin linear detrending
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detrender {
    mode: DetrendMode,
    min_val: usize,
}

impl Detrender {
    /// # Errors
    /// `Configuration` when `min_val < 2` (a line needs two points)
    pub fn new(mode: DetrendMode, min_val: usize) -> Result<Self> {
        if min_val < 2 {
            return Err(EddyError::config(format!(
                "detrending needs min_val >= 2, got {}",
                min_val
            )));
        }
        Ok(Self { mode, min_val })
    }

    pub fn mode(&self) -> DetrendMode {
        self.mode
    }

    pub fn min_val(&self) -> usize {
        self.min_val
    }

    /// Detrend one bin in place
    ///
    /// Returns the fit, or `None` when the bin was blanked.
    pub fn detrend_bin(&self, bin: &mut [f64]) -> Option<LinearFit> {
        let fit = LinearFit::of(bin).filter(|f| f.count >= self.min_val);
        let Some(fit) = fit else {
            bin.fill(MISSING);
            return None;
        };

        for (x, v) in bin.iter_mut().enumerate() {
            *v = match self.mode {
                DetrendMode::Trend => fit.at(x),
                DetrendMode::Residual => *v - fit.at(x),
                DetrendMode::MeanPreserving => *v - fit.at(x) + fit.mean,
            };
        }
        Some(fit)
    }

    /// Detrend every bin of one channel
    ///
    /// Returns the number of samples blanked in bins below `min_val`.
    /// Samples outside every bin are left untouched.
    pub fn detrend(
        &self,
        channel: &str,
        values: &mut [f64],
        layout: &BinLayout,
        reporter: &dyn Reporter,
    ) -> usize {
        let mut blanked = 0;
        for (i, bin) in layout.bins().iter().enumerate() {
            let slice = layout.slice_mut(i, values);
            let len = slice.len();
            match self.detrend_bin(slice) {
                Some(fit) => reporter.fit_parameters(channel, *bin, fit.slope, fit.intercept),
                None => blanked += len,
            }
        }
        blanked
    }
}

impl ChannelStage for Detrender {
    fn stage_name(&self) -> &'static str {
        "detrend"
    }

    fn process_channel(
        &self,
        channel: &str,
        values: &mut [f64],
        layout: &BinLayout,
        reporter: &dyn Reporter,
    ) -> usize {
        self.detrend(channel, values, layout, reporter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bins::BinSet;
    use crate::report::{CollectingReporter, NoopReporter, ReportEvent};
    use crate::stats::{bin_means, nan_mean};

    fn layout(n: usize, step: f64) -> BinLayout {
        let index: Vec<f64> = (0..n).map(|i| i as f64).collect();
        BinLayout::resolve(&BinSet::new(0.0, n as f64, step).unwrap(), &index)
    }

    #[test]
    fn test_fit_recovers_line() {
        let values: Vec<f64> = (0..10).map(|x| 2.0 * x as f64 - 1.0).collect();
        let fit = LinearFit::of(&values).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept + 1.0).abs() < 1e-12);
        assert_eq!(fit.count, 10);
    }

    #[test]
    fn test_fit_skips_missing() {
        let values = vec![0.0, MISSING, 2.0, 3.0, MISSING];
        let fit = LinearFit::of(&values).unwrap();
        assert!((fit.slope - 1.0).abs() < 1e-12);
        assert!(fit.intercept.abs() < 1e-12);
        assert_eq!(fit.count, 3);
    }

    #[test]
    fn test_fit_needs_two_points() {
        assert!(LinearFit::of(&[MISSING, 4.0, MISSING]).is_none());
        assert!(LinearFit::of(&[]).is_none());
    }

    #[test]
    fn test_trend_mode_fills_missing_positions() {
        let mut values = vec![0.0, 1.0, MISSING, 3.0];
        let detrender = Detrender::new(DetrendMode::Trend, 3).unwrap();
        detrender.detrend("t", &mut values, &layout(4, 4.0), &NoopReporter);
        for (x, v) in values.iter().enumerate() {
            assert!((v - x as f64).abs() < 1e-12);
        }
    }

    #[test]
    fn test_residual_mode_keeps_missing() {
        let mut values = vec![1.0, 2.5, MISSING, 4.0, 5.0];
        let detrender = Detrender::new(DetrendMode::Residual, 3).unwrap();
        detrender.detrend("t", &mut values, &layout(5, 5.0), &NoopReporter);
        assert!(values[2].is_nan());
        assert!(nan_mean(&values).abs() < 1e-12);
    }

    #[test]
    fn test_mean_preserving_keeps_bin_means() {
        let n = 60;
        let original: Vec<f64> = (0..n)
            .map(|i| {
                let x = i as f64;
                0.05 * x + (x * 0.9).sin() + if i >= 30 { 4.0 } else { 0.0 }
            })
            .collect();
        let layout = layout(n, 30.0);
        let mut values = original.clone();
        values[7] = MISSING;

        let before = bin_means(&values, &layout);
        Detrender::new(DetrendMode::MeanPreserving, 3)
            .unwrap()
            .detrend("u", &mut values, &layout, &NoopReporter);
        let after = bin_means(&values, &layout);

        for (a, b) in before.iter().zip(&after) {
            assert!((a - b).abs() < 1e-9, "{} vs {}", a, b);
        }
        assert!(values[7].is_nan());
    }

    #[test]
    fn test_sparse_bin_is_blanked() {
        // bin 0 has two valid samples, bin 1 is full
        let mut values = vec![1.0, MISSING, MISSING, 2.0, 5.0, 6.0, 7.0, 8.0];
        let reporter = CollectingReporter::new();
        let blanked = Detrender::new(DetrendMode::MeanPreserving, 3)
            .unwrap()
            .detrend("w", &mut values, &layout(8, 4.0), &reporter);

        assert_eq!(blanked, 4);
        assert!(values[..4].iter().all(|v| v.is_nan()));
        assert!(values[4..].iter().all(|v| (v - 6.5).abs() < 1e-12));

        let fits: Vec<_> = reporter
            .events()
            .into_iter()
            .filter(|e| matches!(e, ReportEvent::FitParameters { .. }))
            .collect();
        assert_eq!(fits.len(), 1);
    }

    #[test]
    fn test_rejects_min_val_below_two() {
        assert!(Detrender::new(DetrendMode::Trend, 1).is_err());
        assert!(Detrender::new(DetrendMode::Trend, 2).is_ok());
    }
}
