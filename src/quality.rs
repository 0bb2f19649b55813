//! Data-quality tables and hard flags
//!
//! Quality is judged per channel and per bin from four indicators:
//! - availability: share of samples that survived filtering, in percent of
//!   the samples present before processing
//! - angle of attack: share of samples whose inflow angle
//!   `deg(atan(w / √(u² + v²)))` lies outside the accepted limits
//! - skewness and excess kurtosis of the rotated series
//!
//! Each indicator beyond its hard limit raises one flag. The hard-flag table
//! counts the raised flags, so 0 means a clean bin.

use crate::bins::BinLayout;
use crate::channel::ChannelSet;
use crate::error::{EddyError, Result};
use crate::stats::{bin_counts, bin_means, BinStatistics};
use crate::table::BinTable;
use serde::{Deserialize, Serialize};

/// Hard limits for the quality flags
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityLimits {
    /// Minimum availability in percent
    pub min_availability: f64,
    /// Lower angle-of-attack limit in degrees
    pub min_angle: f64,
    /// Upper angle-of-attack limit in degrees
    pub max_angle: f64,
    /// Maximum share of bad angles in percent
    pub max_bad_angles: f64,
    /// Skewness is flagged outside `[-skew_limit, skew_limit]`
    pub skew_limit: f64,
    /// Kurtosis is flagged above this value
    pub kurtosis_limit: f64,
}

impl Default for QualityLimits {
    fn default() -> Self {
        Self {
            min_availability: 80.0,
            min_angle: -30.0,
            max_angle: 30.0,
            max_bad_angles: 10.0,
            skew_limit: 2.0,
            kurtosis_limit: 8.0,
        }
    }
}

impl QualityLimits {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.min_availability) {
            return Err(EddyError::config(format!(
                "min_availability must be within 0..=100, got {}",
                self.min_availability
            )));
        }
        if self.min_angle.is_nan() || self.max_angle.is_nan() || self.min_angle >= self.max_angle {
            return Err(EddyError::config(format!(
                "angle-of-attack limits must satisfy min < max, got [{}, {}]",
                self.min_angle, self.max_angle
            )));
        }
        if !(0.0..=100.0).contains(&self.max_bad_angles) {
            return Err(EddyError::config(format!(
                "max_bad_angles must be within 0..=100, got {}",
                self.max_bad_angles
            )));
        }
        if self.skew_limit.is_nan() || self.skew_limit < 0.0 {
            return Err(EddyError::config(format!(
                "skew_limit must be non-negative, got {}",
                self.skew_limit
            )));
        }
        if self.kurtosis_limit.is_nan() {
            return Err(EddyError::config("kurtosis_limit must be a number"));
        }
        Ok(())
    }
}

/// Valid-sample count per bin, one column per channel
pub fn counts(set: &ChannelSet, layout: &BinLayout) -> Result<BinTable> {
    let mut table = BinTable::for_layout(layout);
    for channel in set.channels() {
        table.push_counts(channel.name.clone(), &bin_counts(&channel.values, layout))?;
    }
    Ok(table)
}

fn statistic_table(
    set: &ChannelSet,
    layout: &BinLayout,
    pick: fn(&BinStatistics) -> f64,
) -> Result<BinTable> {
    let mut table = BinTable::for_layout(layout);
    for channel in set.channels() {
        let stats = BinStatistics::per_bin(&channel.values, layout);
        table.push_column(channel.name.clone(), stats.iter().map(pick).collect())?;
    }
    Ok(table)
}

/// Per-bin skewness, one column per channel
pub fn skewness_table(set: &ChannelSet, layout: &BinLayout) -> Result<BinTable> {
    statistic_table(set, layout, |s| s.skewness)
}

/// Per-bin excess kurtosis, one column per channel
pub fn kurtosis_table(set: &ChannelSet, layout: &BinLayout) -> Result<BinTable> {
    statistic_table(set, layout, |s| s.kurtosis)
}

/// Instantaneous angles of attack with per-bin summaries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AngleOfAttack {
    /// Per-sample angle in degrees
    pub angles: Vec<f64>,
    /// Per-bin count of angles outside the limits
    pub bad_counts: Vec<usize>,
    /// Per-bin mean angle
    pub means: Vec<f64>,
}

impl AngleOfAttack {
    /// Compute angles from the named velocity channels
    ///
    /// A zero horizontal speed gives ±90° (or NaN when `w` is zero too).
    pub fn compute(
        set: &ChannelSet,
        layout: &BinLayout,
        (u, v, w): (&str, &str, &str),
        limits: &QualityLimits,
    ) -> Result<Self> {
        let (u, v, w) = (set.values(u)?, set.values(v)?, set.values(w)?);
        let angles: Vec<f64> = u
            .iter()
            .zip(v)
            .zip(w)
            .map(|((u, v), w)| (w / (u * u + v * v).sqrt()).atan().to_degrees())
            .collect();

        let bad_counts = (0..layout.len())
            .map(|i| {
                layout
                    .slice(i, &angles)
                    .iter()
                    .filter(|a| **a < limits.min_angle || **a > limits.max_angle)
                    .count()
            })
            .collect();
        let means = bin_means(&angles, layout);

        Ok(Self {
            angles,
            bad_counts,
            means,
        })
    }

    /// Per-bin table with `bad_counts` and `mean` columns
    pub fn to_table(&self, layout: &BinLayout) -> Result<BinTable> {
        let mut table = BinTable::for_layout(layout);
        table.push_counts("bad_counts", &self.bad_counts)?;
        table.push_column("mean", self.means.clone())?;
        Ok(table)
    }
}

/// Everything the flags are computed from
#[derive(Debug, Clone, Copy)]
pub struct QualityInputs<'a> {
    pub counts_before_processing: &'a BinTable,
    pub counts_before_gapfilling: &'a BinTable,
    pub counts_after_gapfilling: &'a BinTable,
    pub bad_angle_counts: &'a [usize],
    pub skewness: &'a BinTable,
    pub kurtosis: &'a BinTable,
    /// Channels the angle-of-attack flag applies to
    ///
    /// The pipeline passes `u v w`, as the light processing script does. The
    /// full script adds the flag to every column, temperature included;
    /// list every channel here to reproduce that.
    pub velocity_channels: &'a [&'a str],
    /// Channel whose post-gap-filling count is the bad-angle denominator
    pub vertical: &'a str,
}

/// Per-bin quality indicators and flags
#[derive(Debug, Clone, PartialEq)]
pub struct QualityFlags {
    /// Availability in percent, per channel
    pub availability: BinTable,
    /// Bad angles in percent of the gap-filled vertical samples
    pub bad_angle_percent: Vec<f64>,
    /// Number of raised hard flags, per channel
    pub hard_flags: BinTable,
}

fn flag(raised: bool) -> f64 {
    if raised {
        1.0
    } else {
        0.0
    }
}

impl QualityFlags {
    /// Evaluate every flag against `limits`
    ///
    /// A bin with no samples before processing has 0 % availability and is
    /// flagged. NaN skewness or kurtosis (too few samples) raises no flag.
    /// The bad-angle flag is added only to `inputs.velocity_channels`.
    pub fn evaluate(inputs: &QualityInputs<'_>, limits: &QualityLimits) -> Result<Self> {
        let lefts = inputs.counts_before_processing.lefts().to_vec();

        let after = inputs.counts_after_gapfilling.require(inputs.vertical)?;
        let bad_angle_percent: Vec<f64> = inputs
            .bad_angle_counts
            .iter()
            .zip(after)
            .map(|(bad, n)| *bad as f64 / n * 100.0)
            .collect();
        if bad_angle_percent.len() != lefts.len() {
            return Err(EddyError::input(format!(
                "bad-angle counts have {} bins but the tables have {}",
                bad_angle_percent.len(),
                lefts.len()
            )));
        }

        let mut availability = BinTable::new(lefts.clone());
        let mut hard_flags = BinTable::new(lefts);

        for column in inputs.counts_before_processing.columns() {
            let name = column.name.as_str();
            let before = &column.values;
            let remaining = inputs.counts_before_gapfilling.require(name)?;
            let skew = inputs.skewness.require(name)?;
            let kurt = inputs.kurtosis.require(name)?;
            let velocity = inputs.velocity_channels.contains(&name);

            let percent: Vec<f64> = before
                .iter()
                .zip(remaining)
                .map(|(b, r)| if *b > 0.0 { r / b * 100.0 } else { 0.0 })
                .collect();

            let flags = (0..percent.len())
                .map(|i| {
                    let mut raised = flag(percent[i] < limits.min_availability);
                    raised += flag(skew[i] < -limits.skew_limit || skew[i] > limits.skew_limit);
                    raised += flag(kurt[i] > limits.kurtosis_limit);
                    if velocity {
                        raised += flag(bad_angle_percent[i] > limits.max_bad_angles);
                    }
                    raised
                })
                .collect();

            availability.push_column(name, percent)?;
            hard_flags.push_column(name, flags)?;
        }

        Ok(Self {
            availability,
            bad_angle_percent,
            hard_flags,
        })
    }
}
