//! Per-bin axis rotation into the mean-flow frame
//!
//! Sonic anemometers are never perfectly aligned with the mean wind. Each bin
//! is rotated so its mean lateral and vertical components vanish:
//!
//! 1. yaw (about z): `θ = atan(mean(v) / mean(u))`, then
//!    `u' = u·cosθ + v·sinθ`, `v' = −u·sinθ + v·cosθ`
//! 2. pitch (about y): `φ = atan(mean(w) / mean(u'))`, the same transform on
//!    `(u', w)`
//!
//! Every rotation is an orthonormal 2D transform, so per-sample vector
//! magnitude is preserved. Angles use `atan` rather than `atan2`: a bin whose
//! mean wind blows "backwards" is rotated by the acute angle and keeps a
//! negative mean longitudinal component. A zero mean longitudinal component
//! gives ±π/2 (or NaN for 0/0), following IEEE semantics.
//!
//! The third (roll) rotation is not supported and rejected at configuration.
//!
//! Samples outside every bin are not rotated; rotate a gap-filled set so no
//! missing value poisons a bin mean.

use crate::bins::BinLayout;
use crate::channel::ChannelSet;
use crate::error::{EddyError, Result};
use crate::report::Reporter;
use crate::stats::nan_mean;
use crate::table::BinTable;
use serde::{Deserialize, Serialize};

/// Number of sequential rotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RotationStages {
    /// Yaw only
    Yaw,
    /// Yaw then pitch
    YawPitch,
}

impl TryFrom<u8> for RotationStages {
    type Error = EddyError;

    fn try_from(stages: u8) -> Result<Self> {
        match stages {
            1 => Ok(Self::Yaw),
            2 => Ok(Self::YawPitch),
            3 => Err(EddyError::config("roll rotation is not supported")),
            other => Err(EddyError::config(format!(
                "rotation stage count must be 1, 2 or 3, got {}",
                other
            ))),
        }
    }
}

impl From<RotationStages> for u8 {
    fn from(stages: RotationStages) -> u8 {
        match stages {
            RotationStages::Yaw => 1,
            RotationStages::YawPitch => 2,
        }
    }
}

/// Rotate `(a, b)` by `angle` in place
///
/// `a' = a·cos + b·sin`, `b' = −a·sin + b·cos`
pub fn rotate_pair(a: &mut [f64], b: &mut [f64], angle: f64) {
    let (sin, cos) = angle.sin_cos();
    for (x, y) in a.iter_mut().zip(b.iter_mut()) {
        let (x0, y0) = (*x, *y);
        *x = x0 * cos + y0 * sin;
        *y = -x0 * sin + y0 * cos;
    }
}

/// Per-bin rotation angles, in radians
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RotationAngles {
    pub lefts: Vec<f64>,
    pub yaw: Vec<f64>,
    pub pitch: Option<Vec<f64>>,
}

impl RotationAngles {
    /// Angles in degrees, one row per bin
    pub fn to_table(&self) -> Result<BinTable> {
        let mut table = BinTable::new(self.lefts.clone());
        table.push_column("yaw", self.yaw.iter().map(|a| a.to_degrees()).collect())?;
        if let Some(pitch) = &self.pitch {
            table.push_column("pitch", pitch.iter().map(|a| a.to_degrees()).collect())?;
        }
        Ok(table)
    }
}

/// Rotates velocity channels bin by bin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisRotator {
    stages: RotationStages,
    longitudinal: String,
    lateral: String,
    vertical: String,
}

impl AxisRotator {
    /// Rotator over channels `u`, `v`, `w`
    pub fn new(stages: RotationStages) -> Self {
        Self::with_channels(stages, "u", "v", "w")
    }

    /// Rotator over custom channel names
    pub fn with_channels(
        stages: RotationStages,
        longitudinal: impl Into<String>,
        lateral: impl Into<String>,
        vertical: impl Into<String>,
    ) -> Self {
        Self {
            stages,
            longitudinal: longitudinal.into(),
            lateral: lateral.into(),
            vertical: vertical.into(),
        }
    }

    /// Build from a raw stage count
    pub fn from_stage_count(stages: u8) -> Result<Self> {
        Ok(Self::new(RotationStages::try_from(stages)?))
    }

    pub fn stages(&self) -> RotationStages {
        self.stages
    }

    /// One stage: rotate `(first, second)` so `second` has zero bin mean
    fn rotate_stage(
        set: &mut ChannelSet,
        first: &str,
        second: &str,
        layout: &BinLayout,
    ) -> Result<Vec<f64>> {
        let (a, b) = set.pair_mut(first, second)?;
        let mut angles = Vec::with_capacity(layout.len());
        for i in 0..layout.len() {
            let range = layout.clamped(i, a.len());
            let (a, b) = (&mut a[range.clone()], &mut b[range]);
            let angle = (nan_mean(b) / nan_mean(a)).atan();
            rotate_pair(a, b, angle);
            angles.push(angle);
        }
        Ok(angles)
    }

    /// Rotate in place, returning the per-bin angles
    ///
    /// # Errors
    /// `UnsupportedInput` when a velocity channel is missing from `set`
    pub fn rotate(
        &self,
        set: &mut ChannelSet,
        layout: &BinLayout,
        reporter: &dyn Reporter,
    ) -> Result<RotationAngles> {
        let required = match self.stages {
            RotationStages::Yaw => vec![self.longitudinal.as_str(), self.lateral.as_str()],
            RotationStages::YawPitch => vec![
                self.longitudinal.as_str(),
                self.lateral.as_str(),
                self.vertical.as_str(),
            ],
        };
        for name in &required {
            set.values(name)?;
        }

        let yaw = Self::rotate_stage(set, &self.longitudinal, &self.lateral, layout)?;
        reporter.rotation_applied(1);

        let pitch = match self.stages {
            RotationStages::Yaw => None,
            RotationStages::YawPitch => {
                let pitch = Self::rotate_stage(set, &self.longitudinal, &self.vertical, layout)?;
                reporter.rotation_applied(2);
                Some(pitch)
            }
        };

        Ok(RotationAngles {
            lefts: layout.bin_set().lefts(),
            yaw,
            pitch,
        })
    }

    /// Rotate a copy, leaving `set` untouched
    pub fn rotated(
        &self,
        set: &ChannelSet,
        layout: &BinLayout,
        reporter: &dyn Reporter,
    ) -> Result<(ChannelSet, RotationAngles)> {
        let mut copy = set.clone();
        let angles = self.rotate(&mut copy, layout, reporter)?;
        Ok((copy, angles))
    }
}
