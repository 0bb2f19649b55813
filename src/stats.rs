//! Missing-aware descriptive statistics
//!
//! All functions skip missing samples. Standard deviation is the sample
//! estimate (n − 1); skewness and kurtosis are the bias-corrected G1/G2
//! estimators, kurtosis reported as excess kurtosis.

use crate::bins::BinLayout;
use crate::channel::is_missing;
use serde::{Deserialize, Serialize};

/// Per-bin aggregates of one channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinStatistics {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub skewness: f64,
    pub kurtosis: f64,
}

impl BinStatistics {
    /// Compute every aggregate over the valid samples of `values`
    pub fn compute(values: &[f64]) -> Self {
        let m = Moments::of(values);
        Self {
            count: m.n,
            mean: m.mean(),
            std: m.std(),
            skewness: m.skewness(),
            kurtosis: m.kurtosis(),
        }
    }

    /// One entry per bin of `layout`
    pub fn per_bin(values: &[f64], layout: &BinLayout) -> Vec<Self> {
        (0..layout.len())
            .map(|i| Self::compute(layout.slice(i, values)))
            .collect()
    }
}

/// Central sums over valid samples
#[derive(Debug, Clone, Copy)]
struct Moments {
    n: usize,
    mean: f64,
    m2: f64,
    m3: f64,
    m4: f64,
}

impl Moments {
    fn of(values: &[f64]) -> Self {
        let mut n = 0usize;
        let mut sum = 0.0;
        for v in values.iter().filter(|v| !is_missing(**v)) {
            n += 1;
            sum += *v;
        }
        if n == 0 {
            return Self {
                n,
                mean: f64::NAN,
                m2: f64::NAN,
                m3: f64::NAN,
                m4: f64::NAN,
            };
        }

        let mean = sum / n as f64;
        let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
        for v in values.iter().filter(|v| !is_missing(**v)) {
            let d = *v - mean;
            let d2 = d * d;
            m2 += d2;
            m3 += d2 * d;
            m4 += d2 * d2;
        }
        Self { n, mean, m2, m3, m4 }
    }

    fn mean(&self) -> f64 {
        self.mean
    }

    fn std(&self) -> f64 {
        if self.n < 2 {
            return f64::NAN;
        }
        (self.m2 / (self.n - 1) as f64).sqrt()
    }

    fn skewness(&self) -> f64 {
        if self.n < 3 {
            return f64::NAN;
        }
        if self.m2 == 0.0 {
            return 0.0;
        }
        let n = self.n as f64;
        let g1 = (self.m3 / n) / (self.m2 / n).powf(1.5);
        g1 * (n * (n - 1.0)).sqrt() / (n - 2.0)
    }

    fn kurtosis(&self) -> f64 {
        if self.n < 4 {
            return f64::NAN;
        }
        if self.m2 == 0.0 {
            return 0.0;
        }
        let n = self.n as f64;
        let numerator = (n + 1.0) * n * (n - 1.0) * self.m4;
        let denominator = (n - 2.0) * (n - 3.0) * self.m2 * self.m2;
        let adjustment = 3.0 * (n - 1.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0));
        numerator / denominator - adjustment
    }
}

/// Mean of valid samples (NaN when there are none)
pub fn nan_mean(values: &[f64]) -> f64 {
    Moments::of(values).mean()
}

/// Sample standard deviation of valid samples (NaN below two samples)
pub fn nan_std(values: &[f64]) -> f64 {
    Moments::of(values).std()
}

/// Bias-corrected sample skewness
pub fn skewness(values: &[f64]) -> f64 {
    Moments::of(values).skewness()
}

/// Bias-corrected excess kurtosis
pub fn kurtosis(values: &[f64]) -> f64 {
    Moments::of(values).kurtosis()
}

/// Per-bin means of one channel
pub fn bin_means(values: &[f64], layout: &BinLayout) -> Vec<f64> {
    (0..layout.len())
        .map(|i| nan_mean(layout.slice(i, values)))
        .collect()
}

/// Per-bin valid-sample counts of one channel
pub fn bin_counts(values: &[f64], layout: &BinLayout) -> Vec<usize> {
    (0..layout.len())
        .map(|i| crate::channel::valid_count(layout.slice(i, values)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MISSING;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_mean_and_std_skip_missing() {
        let values = [2.0, 4.0, MISSING, 6.0, 8.0];
        assert!(close(nan_mean(&values), 5.0));
        // sample variance of [2,4,6,8] = 20/3
        assert!(close(nan_std(&values), (20.0f64 / 3.0).sqrt()));
    }

    #[test]
    fn test_empty_and_all_missing() {
        assert!(nan_mean(&[]).is_nan());
        assert!(nan_mean(&[MISSING, MISSING]).is_nan());
        assert!(nan_std(&[1.0]).is_nan());
    }

    #[test]
    fn test_skewness_symmetric_is_zero() {
        assert!(close(skewness(&[1.0, 2.0, 3.0, 4.0, 5.0]), 0.0));
    }

    #[test]
    fn test_skewness_known_value() {
        let values = [1.0f64, 2.0, 3.0, 10.0];
        let n = 4.0f64;
        let mean = 4.0f64;
        let m2: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        let m3: f64 = values.iter().map(|v| (v - mean).powi(3)).sum();
        let g1 = (m3 / n) / (m2 / n).powf(1.5);
        let expected = g1 * (n * (n - 1.0)).sqrt() / (n - 2.0);
        assert!(close(skewness(&values), expected));
        assert!(skewness(&values) > 0.0);
    }

    #[test]
    fn test_kurtosis_uniform_is_negative() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let k = kurtosis(&values);
        // excess kurtosis of a discrete uniform tends to -1.2
        assert!((k + 1.2).abs() < 0.05, "kurtosis = {}", k);
    }

    #[test]
    fn test_constant_sample_shape_is_zero() {
        let values = [3.0; 6];
        assert_eq!(skewness(&values), 0.0);
        assert_eq!(kurtosis(&values), 0.0);
        assert_eq!(nan_std(&values), 0.0);
    }

    #[test]
    fn test_too_few_samples_for_shape() {
        assert!(skewness(&[1.0, 2.0]).is_nan());
        assert!(kurtosis(&[1.0, 2.0, 3.0]).is_nan());
    }

    #[test]
    fn test_bin_statistics_compute() {
        let stats = BinStatistics::compute(&[1.0, MISSING, 3.0]);
        assert_eq!(stats.count, 2);
        assert!(close(stats.mean, 2.0));
        assert!(close(stats.std, 2.0f64.sqrt()));
        assert!(stats.skewness.is_nan());
    }
}
