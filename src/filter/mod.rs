// Quality-control filters for sonic-anemometer channels
//
// Every filter erases suspect samples by replacing them with the missing
// sentinel, never by clamping or imputing:
// - RangeFilter: static absolute bounds, no bin awareness
// - GateFilter: bin mean ± fixed limit, whole excursion erased in one pass
// - SigmaDespiker: iterative bin mean ± nsig·std with a run-length guard that
//   keeps long excursions (physical events) and erases short ones (noise)
//
// All of them, together with the detrender and the gap filler, are written
// as single-channel primitives behind the `ChannelStage` trait. Fan-out over
// a ChannelSet is provided once, by the trait, in three ownership flavours.

mod despike;
mod gate;
mod range;

pub use despike::{DespikeOutcome, SigmaDespiker};
pub use gate::GateFilter;
pub use range::RangeFilter;

use crate::bins::BinLayout;
use crate::channel::ChannelSet;
use crate::error::Result;
use crate::report::Reporter;
use serde::Serialize;

/// A single-channel processing primitive
///
/// Implementors only describe how to process one channel. The provided
/// methods apply the primitive to a [`ChannelSet`]:
/// - [`apply`](ChannelStage::apply): mutate every channel in place
/// - [`apply_parallel`](ChannelStage::apply_parallel): same, one scoped
///   worker per channel (identical results)
/// - [`apply_to`](ChannelStage::apply_to): mutate only the named channels
/// - [`applied`](ChannelStage::applied): leave the input untouched and
///   return a processed copy
pub trait ChannelStage: Sync {
    /// Short stage name used in summaries
    fn stage_name(&self) -> &'static str;

    /// Process one channel in place, returning the number of samples affected
    fn process_channel(
        &self,
        channel: &str,
        values: &mut [f64],
        layout: &BinLayout,
        reporter: &dyn Reporter,
    ) -> usize;

    fn apply(&self, set: &mut ChannelSet, layout: &BinLayout, reporter: &dyn Reporter) -> StageSummary {
        let per_channel = set.for_each_channel_mut(|name, values| {
            self.process_channel(name, values, layout, reporter)
        });
        StageSummary::new(self.stage_name(), per_channel)
    }

    fn apply_parallel(
        &self,
        set: &mut ChannelSet,
        layout: &BinLayout,
        reporter: &dyn Reporter,
    ) -> StageSummary {
        let per_channel = set.par_for_each_channel_mut(|name, values| {
            self.process_channel(name, values, layout, reporter)
        });
        StageSummary::new(self.stage_name(), per_channel)
    }

    fn apply_to(
        &self,
        set: &mut ChannelSet,
        names: &[&str],
        layout: &BinLayout,
        reporter: &dyn Reporter,
    ) -> Result<StageSummary> {
        let mut per_channel = Vec::with_capacity(names.len());
        for name in names {
            let values = set.values_mut(name)?;
            let affected = self.process_channel(name, values, layout, reporter);
            per_channel.push((name.to_string(), affected));
        }
        Ok(StageSummary::new(self.stage_name(), per_channel))
    }

    fn applied(
        &self,
        set: &ChannelSet,
        layout: &BinLayout,
        reporter: &dyn Reporter,
    ) -> (ChannelSet, StageSummary) {
        let mut copy = set.clone();
        let summary = self.apply(&mut copy, layout, reporter);
        (copy, summary)
    }
}

/// Samples affected by one stage, per channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageSummary {
    pub stage: &'static str,
    pub per_channel: Vec<(String, usize)>,
}

impl StageSummary {
    pub fn new(stage: &'static str, per_channel: Vec<(String, usize)>) -> Self {
        Self { stage, per_channel }
    }

    pub fn total(&self) -> usize {
        self.per_channel.iter().map(|(_, n)| n).sum()
    }

    pub fn for_channel(&self, name: &str) -> Option<usize> {
        self.per_channel
            .iter()
            .find(|(c, _)| c == name)
            .map(|(_, n)| *n)
    }
}

#[cfg(test)]
mod tests;
