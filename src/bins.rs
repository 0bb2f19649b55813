//! Averaging-interval partition of the time domain
//!
//! A [`BinSet`] is an ordered, disjoint, step-uniform cover of `[start, stop)`
//! made of half-open bins `[left, right)`. Bins are generated as
//! `left = start + k·step` while `left + step <= stop`; a trailing partial
//! interval that would extend past `stop` is dropped, and samples falling in
//! it belong to no bin. To keep a final bin ending exactly at `stop`, pass a
//! `stop` that is step-aligned.
//!
//! A [`BinLayout`] resolves a `BinSet` against a concrete time index once,
//! producing one contiguous sample range per bin. Every bin-aware stage
//! (gate filter, despiker, detrender, rotator, aggregator) slices channels
//! through the same layout, so all stages share one membership convention.

use crate::error::{EddyError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Relative tolerance used when deciding whether the last bin fits
const EDGE_TOLERANCE: f64 = 1e-9;

/// Upper bound on the number of bins in one partition
pub const MAX_BINS: usize = 10_000_000;

/// Half-open interval `[left, right)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub left: f64,
    pub right: f64,
}

impl Bin {
    pub fn contains(&self, t: f64) -> bool {
        t >= self.left && t < self.right
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }
}

impl std::fmt::Display for Bin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.left, self.right)
    }
}

/// Ordered, disjoint, uniform-width bins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinSet {
    start: f64,
    step: f64,
    bins: Vec<Bin>,
}

impl BinSet {
    /// Partition `[start, stop)` into bins of width `step`
    ///
    /// # Errors
    /// `Configuration` when `step <= 0`, `start >= stop`, or any bound is not
    /// finite.
    ///
    /// # Example
    /// ```
    /// use remolino::bins::BinSet;
    ///
    /// let bins = BinSet::new(0.0, 25.0, 10.0).unwrap();
    /// // [20, 30) would extend past stop and is dropped
    /// assert_eq!(bins.len(), 2);
    /// assert_eq!(bins.bins()[1].right, 20.0);
    /// ```
    pub fn new(start: f64, stop: f64, step: f64) -> Result<Self> {
        if !step.is_finite() || step <= 0.0 {
            return Err(EddyError::config(format!(
                "bin width must be positive and finite, got {}",
                step
            )));
        }
        if !start.is_finite() || !stop.is_finite() {
            return Err(EddyError::config(format!(
                "bin bounds must be finite, got start={} stop={}",
                start, stop
            )));
        }
        if start >= stop {
            return Err(EddyError::config(format!(
                "start must precede stop, got start={} stop={}",
                start, stop
            )));
        }

        let ratio = ((stop - start) / step + EDGE_TOLERANCE).floor();
        if !ratio.is_finite() || ratio > MAX_BINS as f64 {
            return Err(EddyError::config(format!(
                "bin width {} splits [{}, {}) into more than {} bins",
                step, start, stop, MAX_BINS
            )));
        }
        let count = ratio as usize;
        let bins = (0..count)
            .map(|k| Bin {
                left: start + k as f64 * step,
                right: start + (k + 1) as f64 * step,
            })
            .collect();

        Ok(Self { start, step, bins })
    }

    /// Partition using the bounds of `index` where `start`/`stop` are omitted
    ///
    /// Auto-detected bounds are discouraged: the last index value is used as
    /// `stop`, so the final bin is usually dropped.
    pub fn from_index(index: &[f64], step: f64, start: Option<f64>, stop: Option<f64>) -> Result<Self> {
        let start = match start.or_else(|| index.first().copied()) {
            Some(start) => start,
            None => return Err(EddyError::input("cannot derive bin start from an empty index")),
        };
        let stop = match stop.or_else(|| index.last().copied()) {
            Some(stop) => stop,
            None => return Err(EddyError::input("cannot derive bin stop from an empty index")),
        };
        Self::new(start, stop, step)
    }

    /// Accept a pre-built partition after checking it is sorted, contiguous
    /// and uniform
    ///
    /// Each bin must start where the previous one ends (within `1e-6·step`),
    /// so the set covers `[first.left, last.right)` without gaps.
    pub fn from_bins(bins: Vec<Bin>) -> Result<Self> {
        let Some(first) = bins.first().copied() else {
            return Err(EddyError::config("a pre-built bin set must contain at least one bin"));
        };
        let step = first.width();
        if !step.is_finite() || step <= 0.0 {
            return Err(EddyError::config(format!(
                "bin {} has non-positive width",
                first
            )));
        }

        let tolerance = step * 1e-6;
        for (i, bin) in bins.iter().enumerate() {
            if !(bin.left < bin.right) {
                return Err(EddyError::config(format!("bin {} is empty or inverted", bin)));
            }
            if (bin.width() - step).abs() > tolerance {
                return Err(EddyError::config(format!(
                    "bin {} has width {} but the first bin has width {}",
                    bin,
                    bin.width(),
                    step
                )));
            }
            if i > 0 && (bin.left - bins[i - 1].right).abs() > tolerance {
                return Err(EddyError::config(format!(
                    "bin {} does not start where bin {} ends",
                    bin,
                    bins[i - 1]
                )));
            }
        }

        Ok(Self {
            start: first.left,
            step,
            bins,
        })
    }

    /// Use `prebuilt` when given, otherwise partition from `step`
    ///
    /// Fails with `Configuration` when neither is provided.
    pub fn resolve(
        prebuilt: Option<BinSet>,
        index: &[f64],
        step: Option<f64>,
        start: Option<f64>,
        stop: Option<f64>,
    ) -> Result<Self> {
        match (prebuilt, step) {
            (Some(bins), _) => Ok(bins),
            (None, Some(step)) => Self::from_index(index, step, start, stop),
            (None, None) => Err(EddyError::config(
                "either a bin set or an averaging step is required",
            )),
        }
    }

    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    /// End of the last bin (equals `start` for an empty set)
    pub fn end(&self) -> f64 {
        self.bins.last().map_or(self.start, |b| b.right)
    }

    /// Left edges, used as table keys
    pub fn lefts(&self) -> Vec<f64> {
        self.bins.iter().map(|b| b.left).collect()
    }

    /// Bin containing `t`, in O(1)
    pub fn bin_of(&self, t: f64) -> Option<usize> {
        if self.bins.is_empty() || !t.is_finite() {
            return None;
        }
        let k = ((t - self.start) / self.step).floor();
        if k < 0.0 {
            // Rounding can put a sample sitting on the first edge at k = -1
            return self.bins[0].contains(t).then_some(0);
        }

        let mut k = (k as usize).min(self.bins.len() - 1);
        // The floor estimate can be off by one at an edge; settle on the
        // bin whose generated bounds hold `t`.
        if t < self.bins[k].left && k > 0 {
            k -= 1;
        } else if t >= self.bins[k].right && k + 1 < self.bins.len() {
            k += 1;
        }
        self.bins[k].contains(t).then_some(k)
    }
}

/// A [`BinSet`] resolved against one time index
#[derive(Debug, Clone, PartialEq)]
pub struct BinLayout {
    bins: BinSet,
    ranges: Vec<Range<usize>>,
    samples: usize,
}

impl BinLayout {
    /// Map every bin to the contiguous index range it covers
    ///
    /// `index` must be monotonic non-decreasing (as guaranteed by
    /// [`crate::channel::ChannelSet`]).
    pub fn resolve(bins: &BinSet, index: &[f64]) -> Self {
        let ranges = bins
            .bins()
            .iter()
            .map(|bin| {
                let lo = index.partition_point(|t| *t < bin.left);
                let hi = index.partition_point(|t| *t < bin.right);
                lo..hi.max(lo)
            })
            .collect();

        Self {
            bins: bins.clone(),
            ranges,
            samples: index.len(),
        }
    }

    pub fn bin_set(&self) -> &BinSet {
        &self.bins
    }

    pub fn bins(&self) -> &[Bin] {
        self.bins.bins()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Length of the index the layout was resolved against
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// `(offset, length)` of bin `i`
    pub fn span(&self, i: usize) -> (usize, usize) {
        let r = &self.ranges[i];
        (r.start, r.end - r.start)
    }

    /// Range of bin `i` clamped to a slice of length `len`
    pub fn clamped(&self, i: usize, len: usize) -> Range<usize> {
        let r = &self.ranges[i];
        r.start.min(len)..r.end.min(len)
    }

    /// Bin `i` of `values`
    pub fn slice<'a>(&self, i: usize, values: &'a [f64]) -> &'a [f64] {
        &values[self.clamped(i, values.len())]
    }

    /// Bin `i` of `values`, mutably
    pub fn slice_mut<'a>(&self, i: usize, values: &'a mut [f64]) -> &'a mut [f64] {
        let range = self.clamped(i, values.len());
        &mut values[range]
    }

    /// Index just past the last sample of the last non-empty bin
    pub fn covered_end(&self) -> Option<usize> {
        self.ranges
            .iter()
            .rev()
            .find(|r| !r.is_empty())
            .map(|r| r.end)
    }

    /// Per-sample bin assignment (`None` outside every bin)
    pub fn membership(&self) -> Vec<Option<usize>> {
        let mut out = vec![None; self.samples];
        for (i, r) in self.ranges.iter().enumerate() {
            for slot in &mut out[r.clone()] {
                *slot = Some(i);
            }
        }
        out
    }
}
