//! Remolino - quality control and turbulence statistics for eddy-covariance records
//!
//! This library takes high-frequency sonic-anemometer series (three wind
//! components and sonic temperature), cleans them per averaging bin
//! (range and gate filters, detrending, iterative despiking, gap filling),
//! rotates them into the mean-flow frame and derives per-bin quality flags,
//! statistical moments and turbulent fluxes.
//!
//! # Example
//!
//! ```
//! use remolino::{ChannelSet, NoopReporter, Pipeline, PipelineConfig};
//!
//! let index: Vec<f64> = (0..400).map(|i| i as f64 * 0.5).collect();
//! let wave = |k: f64| -> Vec<f64> {
//!     (0..400).map(|i| (i as f64 * k).sin()).collect()
//! };
//! let set = ChannelSet::from_columns(
//!     index,
//!     [
//!         ("u", wave(0.3).iter().map(|x| 3.0 + x).collect::<Vec<_>>()),
//!         ("v", wave(0.7).iter().map(|x| 1.0 + 0.5 * x).collect()),
//!         ("w", wave(1.1).iter().map(|x| 0.2 * x).collect()),
//!         ("t", wave(0.2).iter().map(|x| 15.0 + x).collect()),
//!     ],
//! )
//! .unwrap();
//!
//! let config = PipelineConfig {
//!     avg_period: Some(50.0),
//!     stop: Some(200.0),
//!     frequency: 2,
//!     ..PipelineConfig::default()
//! };
//! let pipeline = Pipeline::new(config, &NoopReporter).unwrap();
//! let (processed, calculated) = pipeline.run(&set).unwrap();
//! assert_eq!(processed.layout.len(), 4);
//! assert_eq!(calculated.fluxes.rows(), 4);
//! ```

pub mod aggregate;
pub mod bins;
pub mod channel;
pub mod cli;
pub mod config;
pub mod detrend;
pub mod error;
pub mod filter;
pub mod fluxes;
pub mod gapfill;
pub mod io;
pub mod pipeline;
pub mod quality;
pub mod report;
pub mod rotation;
pub mod runs;
pub mod stats;
pub mod table;

pub use bins::{Bin, BinLayout, BinSet};
pub use channel::{Channel, ChannelSet, MISSING};
pub use config::{ChannelLimits, ChannelNames, LimitTable, PipelineConfig};
pub use error::{EddyError, Result};
pub use filter::{ChannelStage, GateFilter, RangeFilter, SigmaDespiker, StageSummary};
pub use pipeline::{CalculateOutput, Pipeline, ProcessOutput};
pub use report::{CollectingReporter, NoopReporter, Reporter, TracingReporter};
pub use table::{BinTable, MomentTable};
