//! Pipeline configuration
//!
//! Every parameter of the processing chain, with defaults for a 20 Hz sonic
//! anemometer averaged over 30 minutes. Loaded from TOML; omitted keys keep
//! their defaults.
//!
//! # Example remolino.toml
//!
//! ```toml
//! avg_period = 1800.0
//! start = 0.0
//! stop = 86400.0
//! frequency = 20
//! rotations = 2
//! height = 40.0
//!
//! [limits.w]
//! lower = -5.0
//! upper = 5.0
//! gate = 5.0
//! nsig = 5.0
//!
//! [quality]
//! min_availability = 80.0
//! ```

use crate::aggregate::default_moments;
use crate::error::{EddyError, Result};
use crate::quality::QualityLimits;
use crate::rotation::RotationStages;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Names of the velocity and temperature channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelNames {
    /// Longitudinal wind component
    pub u: String,
    /// Lateral wind component
    pub v: String,
    /// Vertical wind component
    pub w: String,
    /// Sonic temperature (°C)
    pub t: String,
}

impl Default for ChannelNames {
    fn default() -> Self {
        Self {
            u: "u".to_string(),
            v: "v".to_string(),
            w: "w".to_string(),
            t: "t".to_string(),
        }
    }
}

impl ChannelNames {
    /// All four names in `u, v, w, t` order
    pub fn all(&self) -> [&str; 4] {
        [
            self.u.as_str(),
            self.v.as_str(),
            self.w.as_str(),
            self.t.as_str(),
        ]
    }

    pub fn velocity(&self) -> [&str; 3] {
        [self.u.as_str(), self.v.as_str(), self.w.as_str()]
    }

    fn validate(&self) -> Result<()> {
        let names = self.all();
        if names.iter().any(|n| n.is_empty()) {
            return Err(EddyError::config("channel names must not be empty"));
        }
        for (i, a) in names.iter().enumerate() {
            if names[i + 1..].contains(a) {
                return Err(EddyError::config(format!(
                    "channel name '{}' is used for more than one quantity",
                    a
                )));
            }
        }
        Ok(())
    }
}

/// Filter limits for one channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelLimits {
    /// Absolute lower bound
    pub lower: f64,
    /// Absolute upper bound
    pub upper: f64,
    /// Gate half-width around the bin mean
    pub gate: f64,
    /// Despiking window in standard deviations
    pub nsig: f64,
}

impl ChannelLimits {
    fn validate(&self, channel: &str) -> Result<()> {
        if self.lower.is_nan() || self.upper.is_nan() || self.lower > self.upper {
            return Err(EddyError::config(format!(
                "{}: lower must not exceed upper, got [{}, {}]",
                channel, self.lower, self.upper
            )));
        }
        if self.gate.is_nan() || self.gate < 0.0 {
            return Err(EddyError::config(format!(
                "{}: gate must be non-negative, got {}",
                channel, self.gate
            )));
        }
        if !self.nsig.is_finite() || self.nsig <= 0.0 {
            return Err(EddyError::config(format!(
                "{}: nsig must be positive, got {}",
                channel, self.nsig
            )));
        }
        Ok(())
    }
}

/// Per-channel limits for the four processed quantities
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitTable {
    pub u: ChannelLimits,
    pub v: ChannelLimits,
    pub w: ChannelLimits,
    pub t: ChannelLimits,
}

impl Default for LimitTable {
    fn default() -> Self {
        let horizontal = ChannelLimits {
            lower: -30.0,
            upper: 30.0,
            gate: 20.0,
            nsig: 3.5,
        };
        Self {
            u: horizontal,
            v: horizontal,
            w: ChannelLimits {
                lower: -5.0,
                upper: 5.0,
                gate: 5.0,
                nsig: 5.0,
            },
            t: ChannelLimits {
                lower: -40.0,
                upper: 40.0,
                gate: 5.0,
                nsig: 3.5,
            },
        }
    }
}

/// Full configuration of `process` and `calculate`
///
/// # Example
/// ```
/// use remolino::config::PipelineConfig;
///
/// let config = PipelineConfig::default();
/// assert_eq!(config.avg_period, Some(1800.0));
/// assert_eq!(config.max_run(), 20);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Averaging period in seconds
    pub avg_period: Option<f64>,
    /// Start of the processed period (first index value when omitted)
    pub start: Option<f64>,
    /// End of the processed period (last index value when omitted)
    ///
    /// Give a step-aligned stop: a trailing partial bin is dropped.
    pub stop: Option<f64>,
    /// Sampling frequency in Hz; also the longest excursion, in samples,
    /// still treated as a spike
    pub frequency: usize,
    /// Maximum despiking passes
    pub iterations: usize,
    /// Number of axis rotations (1 = yaw, 2 = yaw + pitch)
    pub rotations: u8,
    /// Minimum valid samples per bin for detrending
    pub min_val: usize,
    /// Measurement height in meters
    pub height: f64,
    /// Process channels on scoped worker threads
    pub parallel: bool,
    pub channels: ChannelNames,
    pub limits: LimitTable,
    pub quality: QualityLimits,
    /// Moments to compute, as channel-name tuples; the standard second- and
    /// third-order set when omitted
    pub moments: Option<Vec<Vec<String>>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            avg_period: Some(1800.0),
            start: None,
            stop: None,
            frequency: 20,
            iterations: 10,
            rotations: 2,
            min_val: crate::detrend::DEFAULT_MIN_VAL,
            height: 40.0,
            parallel: false,
            channels: ChannelNames::default(),
            limits: LimitTable::default(),
            quality: QualityLimits::default(),
            moments: None,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Load configuration from a TOML string
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Longest excursion (in samples) removed by despiking
    pub fn max_run(&self) -> usize {
        self.frequency
    }

    pub fn rotation_stages(&self) -> Result<RotationStages> {
        RotationStages::try_from(self.rotations)
    }

    /// Limits for one of the configured channel names
    pub fn limits_for(&self, channel: &str) -> Option<ChannelLimits> {
        let names = &self.channels;
        if channel == names.u {
            Some(self.limits.u)
        } else if channel == names.v {
            Some(self.limits.v)
        } else if channel == names.w {
            Some(self.limits.w)
        } else if channel == names.t {
            Some(self.limits.t)
        } else {
            None
        }
    }

    /// Configured moments, or the standard set over the channel names
    pub fn moment_list(&self) -> Vec<Vec<String>> {
        match &self.moments {
            Some(moments) => moments.clone(),
            None => {
                let c = &self.channels;
                default_moments(&c.u, &c.v, &c.w, &c.t)
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        match self.avg_period {
            None => return Err(EddyError::config("an averaging period is required")),
            Some(p) if !p.is_finite() || p <= 0.0 => {
                return Err(EddyError::config(format!(
                    "avg_period must be positive, got {}",
                    p
                )));
            }
            Some(_) => {}
        }

        if let (Some(start), Some(stop)) = (self.start, self.stop) {
            if stop <= start {
                return Err(EddyError::config(format!(
                    "stop must be after start, got start={} stop={}",
                    start, stop
                )));
            }
        }

        if self.iterations == 0 {
            return Err(EddyError::config("iterations must be at least 1"));
        }

        self.rotation_stages()?;

        if self.min_val < 2 {
            return Err(EddyError::config(format!(
                "min_val must be >= 2 for a linear fit, got {}",
                self.min_val
            )));
        }

        if !self.height.is_finite() || self.height <= 0.0 {
            return Err(EddyError::config(format!(
                "height must be positive, got {}",
                self.height
            )));
        }

        self.channels.validate()?;
        self.limits.u.validate(&self.channels.u)?;
        self.limits.v.validate(&self.channels.v)?;
        self.limits.w.validate(&self.channels.w)?;
        self.limits.t.validate(&self.channels.t)?;
        self.quality.validate()?;

        if let Some(moments) = &self.moments {
            if moments.iter().any(Vec::is_empty) {
                return Err(EddyError::config("a moment needs at least one channel"));
            }
        }

        Ok(())
    }
}
