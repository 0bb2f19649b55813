//! Diagnostic reporting for the processing stages
//!
//! Stages describe what they did through a [`Reporter`]: one method per event
//! kind, all with no-op defaults. Algorithms never format messages
//! themselves; a sink decides what to do with the numbers.
//!
//! - [`NoopReporter`]: reporting disabled
//! - [`TracingReporter`]: structured `tracing` events
//! - [`CollectingReporter`]: in-memory event log

use crate::bins::Bin;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Receiver of per-stage diagnostic events
///
/// Reporters are shared across channel workers, so they must be `Sync`.
pub trait Reporter: Send + Sync {
    /// Samples erased by the absolute range filter
    fn range_removed(&self, _channel: &str, _removed: usize, _percent: f64) {}

    /// Samples erased by the gate filter in one bin
    fn gate_removed(&self, _channel: &str, _bin: Bin, _removed: usize, _percent: f64) {}

    /// Samples erased by one despiking pass in one bin
    fn despike_removed(&self, _channel: &str, _bin: Bin, _iteration: usize, _removed: usize) {}

    /// Linear trend fitted in one bin
    fn fit_parameters(&self, _channel: &str, _bin: Bin, _slope: f64, _intercept: f64) {}

    /// Samples filled by gap interpolation
    fn gaps_filled(&self, _channel: &str, _filled: usize) {}

    /// Rotation stage completed (1 = yaw, 2 = pitch)
    fn rotation_applied(&self, _stage: u8) {}
}

/// Reporter that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl Reporter for NoopReporter {}

/// Reporter that emits structured `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn range_removed(&self, channel: &str, removed: usize, percent: f64) {
        tracing::info!(channel, removed, percent, "range filter removed samples");
    }

    fn gate_removed(&self, channel: &str, bin: Bin, removed: usize, percent: f64) {
        tracing::info!(
            channel,
            bin_left = bin.left,
            bin_right = bin.right,
            removed,
            percent,
            "gate filter removed outliers"
        );
    }

    fn despike_removed(&self, channel: &str, bin: Bin, iteration: usize, removed: usize) {
        tracing::info!(
            channel,
            bin_left = bin.left,
            bin_right = bin.right,
            iteration,
            removed,
            "despiking removed spikes"
        );
    }

    fn fit_parameters(&self, channel: &str, bin: Bin, slope: f64, intercept: f64) {
        tracing::debug!(
            channel,
            bin_left = bin.left,
            bin_right = bin.right,
            slope,
            intercept,
            "linear trend fitted"
        );
    }

    fn gaps_filled(&self, channel: &str, filled: usize) {
        tracing::info!(channel, filled, "gaps filled by interpolation");
    }

    fn rotation_applied(&self, stage: u8) {
        let axis = match stage {
            1 => "z",
            2 => "y",
            _ => "x",
        };
        tracing::info!(stage, axis, "axis rotation applied");
    }
}

/// One recorded diagnostic event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportEvent {
    RangeRemoved {
        channel: String,
        removed: usize,
        percent: f64,
    },
    GateRemoved {
        channel: String,
        bin: Bin,
        removed: usize,
        percent: f64,
    },
    DespikeRemoved {
        channel: String,
        bin: Bin,
        iteration: usize,
        removed: usize,
    },
    FitParameters {
        channel: String,
        bin: Bin,
        slope: f64,
        intercept: f64,
    },
    GapsFilled {
        channel: String,
        filled: usize,
    },
    RotationApplied {
        stage: u8,
    },
}

/// Reporter that keeps every event in memory
///
/// Events from parallel channel workers interleave in arrival order.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: ReportEvent) {
        // A poisoned lock only means another worker panicked mid-push
        let mut events = match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event);
    }

    /// Snapshot of recorded events
    pub fn events(&self) -> Vec<ReportEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Total samples erased by despiking for `channel`
    pub fn despiked(&self, channel: &str) -> usize {
        self.events()
            .iter()
            .filter_map(|e| match e {
                ReportEvent::DespikeRemoved {
                    channel: c,
                    removed,
                    ..
                } if c == channel => Some(*removed),
                _ => None,
            })
            .sum()
    }
}

impl Reporter for CollectingReporter {
    fn range_removed(&self, channel: &str, removed: usize, percent: f64) {
        self.push(ReportEvent::RangeRemoved {
            channel: channel.to_string(),
            removed,
            percent,
        });
    }

    fn gate_removed(&self, channel: &str, bin: Bin, removed: usize, percent: f64) {
        self.push(ReportEvent::GateRemoved {
            channel: channel.to_string(),
            bin,
            removed,
            percent,
        });
    }

    fn despike_removed(&self, channel: &str, bin: Bin, iteration: usize, removed: usize) {
        self.push(ReportEvent::DespikeRemoved {
            channel: channel.to_string(),
            bin,
            iteration,
            removed,
        });
    }

    fn fit_parameters(&self, channel: &str, bin: Bin, slope: f64, intercept: f64) {
        self.push(ReportEvent::FitParameters {
            channel: channel.to_string(),
            bin,
            slope,
            intercept,
        });
    }

    fn gaps_filled(&self, channel: &str, filled: usize) {
        self.push(ReportEvent::GapsFilled {
            channel: channel.to_string(),
            filled,
        });
    }

    fn rotation_applied(&self, stage: u8) {
        self.push(ReportEvent::RotationApplied { stage });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_reporter_records_in_order() {
        let reporter = CollectingReporter::new();
        let bin = Bin {
            left: 0.0,
            right: 10.0,
        };
        reporter.range_removed("u", 3, 1.5);
        reporter.despike_removed("u", bin, 1, 2);
        reporter.despike_removed("u", bin, 2, 1);
        reporter.despike_removed("w", bin, 1, 4);

        let events = reporter.events();
        assert_eq!(events.len(), 4);
        assert_eq!(
            events[0],
            ReportEvent::RangeRemoved {
                channel: "u".to_string(),
                removed: 3,
                percent: 1.5
            }
        );
        assert_eq!(reporter.despiked("u"), 3);
        assert_eq!(reporter.despiked("w"), 4);
    }

    #[test]
    fn test_noop_reporter_accepts_everything() {
        let reporter = NoopReporter;
        reporter.gaps_filled("t", 10);
        reporter.rotation_applied(2);
    }

    #[test]
    fn test_event_serializes_with_kind_tag() {
        let event = ReportEvent::GapsFilled {
            channel: "t".to_string(),
            filled: 7,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"gaps_filled\""));
        assert!(json.contains("\"filled\":7"));
    }
}
