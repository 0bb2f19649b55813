//! End-to-end processing of one sonic-anemometer record
//!
//! `process` runs the quality-control chain:
//!
//! ```text
//! bins → counts → range → gate → detrend (mean-preserving) → despike
//!      → counts → gap fill → counts → angle of attack → rotation
//!      → skewness/kurtosis → quality flags
//! ```
//!
//! `calculate` turns the rotated series into per-bin means, moments and
//! derived fluxes.

use crate::aggregate::{means, moment_table, pulsations};
use crate::bins::{BinLayout, BinSet};
use crate::channel::ChannelSet;
use crate::config::{ChannelLimits, PipelineConfig};
use crate::detrend::{DetrendMode, Detrender};
use crate::error::{EddyError, Result};
use crate::filter::{ChannelStage, GateFilter, RangeFilter, SigmaDespiker, StageSummary};
use crate::fluxes::{flux_table, FluxConstants};
use crate::gapfill::GapFiller;
use crate::quality::{
    counts, kurtosis_table, skewness_table, AngleOfAttack, QualityFlags, QualityInputs,
};
use crate::report::Reporter;
use crate::rotation::{AxisRotator, RotationAngles};
use crate::table::{BinTable, MomentTable};

/// Everything `process` produces
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub layout: BinLayout,
    /// Filtered, detrended and gap-filled series, instrument frame
    pub cleaned: ChannelSet,
    /// `cleaned` rotated into the mean-flow frame
    pub rotated: ChannelSet,
    pub rotation_angles: RotationAngles,
    pub angle_of_attack: AngleOfAttack,
    pub counts_before_processing: BinTable,
    pub counts_before_gapfilling: BinTable,
    pub counts_after_gapfilling: BinTable,
    pub skewness: BinTable,
    pub kurtosis: BinTable,
    pub flags: QualityFlags,
    /// Samples affected by each stage, in execution order
    pub summaries: Vec<StageSummary>,
}

/// Everything `calculate` produces
#[derive(Debug, Clone)]
pub struct CalculateOutput {
    /// Per-bin means of the rotated series
    pub means: BinTable,
    pub moments: MomentTable,
    pub fluxes: BinTable,
}

/// Configured processing chain
pub struct Pipeline<'a> {
    config: PipelineConfig,
    reporter: &'a dyn Reporter,
}

impl<'a> Pipeline<'a> {
    /// # Errors
    /// `Configuration` when `config` does not validate
    pub fn new(config: PipelineConfig, reporter: &'a dyn Reporter) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, reporter })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Bins for `index` from the configured period and bounds
    pub fn bins_for(&self, index: &[f64]) -> Result<BinSet> {
        BinSet::resolve(
            None,
            index,
            self.config.avg_period,
            self.config.start,
            self.config.stop,
        )
    }

    /// Run a stage with per-channel parameters over every channel in `stages`
    fn run_per_channel<S: ChannelStage>(
        &self,
        set: &mut ChannelSet,
        layout: &BinLayout,
        stages: &[(String, S)],
        stage_name: &'static str,
    ) -> StageSummary {
        let reporter = self.reporter;
        let process = |name: &str, values: &mut [f64]| {
            stages
                .iter()
                .find(|(n, _)| n == name)
                .map_or(0, |(_, stage)| stage.process_channel(name, values, layout, reporter))
        };
        let per_channel = if self.config.parallel {
            set.par_for_each_channel_mut(process)
        } else {
            set.for_each_channel_mut(process)
        };
        StageSummary::new(stage_name, per_channel)
    }

    /// Run a stage with shared parameters over every channel
    fn run_shared<S: ChannelStage>(
        &self,
        stage: &S,
        set: &mut ChannelSet,
        layout: &BinLayout,
    ) -> StageSummary {
        if self.config.parallel {
            stage.apply_parallel(set, layout, self.reporter)
        } else {
            stage.apply(set, layout, self.reporter)
        }
    }

    fn per_channel<S, F>(&self, build: F) -> Result<Vec<(String, S)>>
    where
        F: Fn(&ChannelLimits) -> Result<S>,
    {
        self.config
            .channels
            .all()
            .iter()
            .map(|name| -> Result<(String, S)> {
                let limits = self.config.limits_for(name).ok_or_else(|| {
                    EddyError::config(format!("no limits configured for channel '{}'", name))
                })?;
                Ok((name.to_string(), build(&limits)?))
            })
            .collect()
    }

    /// Quality-control chain from raw samples to rotated series and flags
    ///
    /// # Errors
    /// `UnsupportedInput` when a configured channel is missing from `raw`;
    /// `Configuration` when the bins cannot be built
    pub fn process(&self, raw: &ChannelSet) -> Result<ProcessOutput> {
        let names = self.config.channels.clone();
        let bins = self.bins_for(raw.index())?;
        let layout = BinLayout::resolve(&bins, raw.index());
        tracing::info!(
            bins = layout.len(),
            samples = raw.len(),
            step = bins.step(),
            "averaging intervals created"
        );
        if let Some(covered) = layout.covered_end() {
            if covered < raw.len() {
                tracing::warn!(
                    dropped = raw.len() - covered,
                    "samples past the last bin are outside every averaging interval"
                );
            }
        }

        let mut set = raw.select(&names.all())?;
        let counts_before_processing = counts(&set, &layout)?;
        let mut summaries = Vec::new();

        tracing::info!("absolute limits filtering");
        let ranges = self.per_channel(|l| RangeFilter::new(l.lower, l.upper))?;
        summaries.push(self.run_per_channel(&mut set, &layout, &ranges, "range"));

        tracing::info!("gate filtering");
        let gates = self.per_channel(|l| GateFilter::new(l.gate))?;
        summaries.push(self.run_per_channel(&mut set, &layout, &gates, "gate"));

        tracing::info!("detrending");
        let detrender = Detrender::new(DetrendMode::MeanPreserving, self.config.min_val)?;
        summaries.push(self.run_shared(&detrender, &mut set, &layout));

        tracing::info!("despiking");
        let (max_run, iterations) = (self.config.max_run(), self.config.iterations);
        let despikers = self.per_channel(|l| SigmaDespiker::new(l.nsig, max_run, iterations))?;
        summaries.push(self.run_per_channel(&mut set, &layout, &despikers, "despike"));

        let counts_before_gapfilling = counts(&set, &layout)?;
        tracing::info!("gap filling");
        summaries.push(self.run_shared(&GapFiller::new(), &mut set, &layout));
        let counts_after_gapfilling = counts(&set, &layout)?;

        tracing::info!("angle of attack");
        let angle_of_attack = AngleOfAttack::compute(
            &set,
            &layout,
            (names.u.as_str(), names.v.as_str(), names.w.as_str()),
            &self.config.quality,
        )?;

        tracing::info!(stages = self.config.rotations, "axis rotation");
        let rotator =
            AxisRotator::with_channels(self.config.rotation_stages()?, &names.u, &names.v, &names.w);
        let (rotated, rotation_angles) = rotator.rotated(&set, &layout, self.reporter)?;

        tracing::info!("data quality");
        let skewness = skewness_table(&rotated, &layout)?;
        let kurtosis = kurtosis_table(&rotated, &layout)?;
        let flags = QualityFlags::evaluate(
            &QualityInputs {
                counts_before_processing: &counts_before_processing,
                counts_before_gapfilling: &counts_before_gapfilling,
                counts_after_gapfilling: &counts_after_gapfilling,
                bad_angle_counts: &angle_of_attack.bad_counts,
                skewness: &skewness,
                kurtosis: &kurtosis,
                velocity_channels: &names.velocity(),
                vertical: &names.w,
            },
            &self.config.quality,
        )?;

        for summary in &summaries {
            tracing::debug!(stage = summary.stage, affected = summary.total(), "stage summary");
        }

        Ok(ProcessOutput {
            layout,
            cleaned: set,
            rotated,
            rotation_angles,
            angle_of_attack,
            counts_before_processing,
            counts_before_gapfilling,
            counts_after_gapfilling,
            skewness,
            kurtosis,
            flags,
            summaries,
        })
    }

    /// Means, moments and fluxes of a processed record
    pub fn calculate(&self, processed: &ProcessOutput) -> Result<CalculateOutput> {
        let layout = &processed.layout;

        tracing::info!("means");
        let means = means(&processed.rotated, layout)?;

        tracing::info!("pulsations and moments");
        let puls = pulsations(&processed.rotated, layout);
        let moments = moment_table(&puls, layout, &self.config.moment_list())?;

        tracing::info!("fluxes");
        let fluxes = flux_table(
            &means,
            &moments,
            &self.config.channels,
            self.config.height,
            &FluxConstants::default(),
        )?;

        Ok(CalculateOutput {
            means,
            moments,
            fluxes,
        })
    }

    /// `process` followed by `calculate`
    pub fn run(&self, raw: &ChannelSet) -> Result<(ProcessOutput, CalculateOutput)> {
        let processed = self.process(raw)?;
        let calculated = self.calculate(&processed)?;
        Ok((processed, calculated))
    }
}
