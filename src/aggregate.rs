//! Bin aggregation: means, pulsations and statistical moments
//!
//! - [`means`]: per-bin mean of every channel
//! - [`pulsations`]: fluctuation of every sample around its own bin mean
//! - [`stat_moments`]: per-bin mean of the product of fluctuation channels,
//!   e.g. `["w", "u"]` gives the kinematic momentum flux `wu` and
//!   `["w", "u", "u"]` the third-order co-moment `wuu`
//!
//! Means skip missing samples. Moments do not: a single missing value in a
//! bin's product makes that bin's moment missing.

use crate::bins::BinLayout;
use crate::channel::{ChannelSet, MISSING};
use crate::error::{EddyError, Result};
use crate::stats::bin_means;
use crate::table::{BinTable, MomentTable};

/// Per-bin means, one column per channel in set order
pub fn means(set: &ChannelSet, layout: &BinLayout) -> Result<BinTable> {
    let mut table = BinTable::for_layout(layout);
    for channel in set.channels() {
        table.push_column(channel.name.clone(), bin_means(&channel.values, layout))?;
    }
    Ok(table)
}

/// Fluctuations around the bin mean
///
/// Samples before the first bin (or between non-adjacent bins) have no bin
/// mean and become missing. The output ends with the last sample of the last
/// non-empty bin, so it may be shorter than `set`.
pub fn pulsations(set: &ChannelSet, layout: &BinLayout) -> ChannelSet {
    let membership = layout.membership();
    let end = layout.covered_end().unwrap_or(0);

    let mut out = set.clone();
    out.for_each_channel_mut(|_, values| {
        let bin_mean = bin_means(values, layout);
        for (v, bin) in values.iter_mut().zip(&membership) {
            *v = match bin {
                Some(i) => *v - bin_mean[*i],
                None => MISSING,
            };
        }
    });
    out.truncate(end);
    out
}

/// Moment name: the channel names concatenated (`["w","u","u"]` → `"wuu"`)
pub fn moment_name(names: &[&str]) -> String {
    names.concat()
}

/// Per-bin mean of the product of the named channels
///
/// Repeated names are allowed. Missing values propagate strictly.
///
/// # Errors
/// `UnsupportedInput` for an empty name list or an unknown channel
///
/// # Example
/// ```
/// use remolino::aggregate::stat_moments;
/// use remolino::bins::{BinLayout, BinSet};
/// use remolino::channel::ChannelSet;
///
/// let index = vec![0.0, 1.0, 2.0, 3.0];
/// let puls = ChannelSet::from_columns(
///     index.clone(),
///     [("w", vec![1.0, -1.0, 2.0, -2.0]), ("u", vec![2.0, -2.0, -1.0, 1.0])],
/// )
/// .unwrap();
/// let layout = BinLayout::resolve(&BinSet::new(0.0, 4.0, 2.0).unwrap(), &index);
///
/// let (name, wu) = stat_moments(&puls, &layout, &["w", "u"]).unwrap();
/// assert_eq!(name, "wu");
/// assert_eq!(wu, vec![2.0, -2.0]);
/// ```
pub fn stat_moments(
    pulsations: &ChannelSet,
    layout: &BinLayout,
    names: &[&str],
) -> Result<(String, Vec<f64>)> {
    if names.is_empty() {
        return Err(EddyError::input("a moment needs at least one channel"));
    }
    let columns = names
        .iter()
        .map(|name| pulsations.values(name))
        .collect::<Result<Vec<_>>>()?;

    let len = pulsations.len();
    let moments = (0..layout.len())
        .map(|i| {
            let range = layout.clamped(i, len);
            if range.is_empty() {
                return MISSING;
            }
            let count = range.len();
            let mut sum = 0.0;
            for k in range {
                sum += columns.iter().map(|c| c[k]).product::<f64>();
            }
            // NaN in any product poisons the sum
            sum / count as f64
        })
        .collect();

    Ok((moment_name(names), moments))
}

/// Table of several moments, one column each
pub fn moment_table<S: AsRef<str>>(
    pulsations: &ChannelSet,
    layout: &BinLayout,
    moments: &[Vec<S>],
) -> Result<MomentTable> {
    let mut table = BinTable::for_layout(layout);
    for moment in moments {
        let names: Vec<&str> = moment.iter().map(AsRef::as_ref).collect();
        let (name, values) = stat_moments(pulsations, layout, &names)?;
        table.push_column(name, values)?;
    }
    Ok(table)
}

/// Second- and third-order moments used by the flux calculation
///
/// `uu vv ww tt wu wv wt wuu wvv wtt wwt uuu vvv www ttt`, expressed over the
/// given channel names.
pub fn default_moments(u: &str, v: &str, w: &str, t: &str) -> Vec<Vec<String>> {
    [
        vec![u, u],
        vec![v, v],
        vec![w, w],
        vec![t, t],
        vec![w, u],
        vec![w, v],
        vec![w, t],
        vec![w, u, u],
        vec![w, v, v],
        vec![w, t, t],
        vec![w, w, t],
        vec![u, u, u],
        vec![v, v, v],
        vec![w, w, w],
        vec![t, t, t],
    ]
    .into_iter()
    .map(|m| m.into_iter().map(str::to_string).collect())
    .collect()
}
