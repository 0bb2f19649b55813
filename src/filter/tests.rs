// Scenario tests for the quality-control filters
//
// Realistic shapes: isolated spikes, sustained excursions (physical events),
// multi-bin series with different offsets per bin.

use super::*;
use crate::bins::BinSet;
use crate::channel::{valid_count, ChannelSet, MISSING};
use crate::report::{CollectingReporter, NoopReporter, ReportEvent};
use crate::stats::nan_mean;

fn layout_for(index: &[f64], start: f64, stop: f64, step: f64) -> BinLayout {
    let bins = BinSet::new(start, stop, step).unwrap();
    BinLayout::resolve(&bins, index)
}

fn seconds(n: usize) -> Vec<f64> {
    (0..n).map(|i| i as f64).collect()
}

/// Single isolated spike in a ten-sample bin
///
/// Expected: the spike at index 4 is erased on the first pass and the bin
/// mean over the remaining nine values is 50/9
#[test]
fn test_isolated_spike_is_removed() {
    let index = seconds(10);
    let layout = layout_for(&index, 0.0, 10.0, 10.0);
    let mut values = vec![1.0, 2.0, 3.0, 4.0, 100.0, 6.0, 7.0, 8.0, 9.0, 10.0];

    let despiker = SigmaDespiker::new(2.0, 1, 3).unwrap();
    let outcome = despiker.despike("u", &mut values, &layout, &NoopReporter);

    assert!(values[4].is_nan());
    assert_eq!(valid_count(&values), 9);
    assert_eq!(outcome.removed, 1);
    assert!(outcome.converged);
    assert_eq!(outcome.passes, 2);

    let mean = nan_mean(&values);
    assert!((mean - 50.0 / 9.0).abs() < 1e-12);
    assert!((mean - 5.56).abs() < 0.01);
}

/// Sustained excursion longer than the run guard
///
/// Expected: treated as a physical event, nothing erased
#[test]
fn test_long_excursion_is_kept() {
    let index = seconds(40);
    let layout = layout_for(&index, 0.0, 40.0, 40.0);
    let mut values: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 0.1 } else { -0.1 }).collect();
    for v in &mut values[20..24] {
        *v = 10.0;
    }
    let before = values.clone();

    let despiker = SigmaDespiker::new(1.5, 2, 10).unwrap();
    let outcome = despiker.despike("w", &mut values, &layout, &NoopReporter);

    assert_eq!(outcome.removed, 0);
    assert!(outcome.converged);
    assert_eq!(outcome.passes, 1);
    assert_eq!(values, before);
}

/// Same excursion with a run guard at least as long as the excursion
///
/// Expected: erased as noise
#[test]
fn test_short_excursion_within_guard_is_removed() {
    let index = seconds(40);
    let layout = layout_for(&index, 0.0, 40.0, 40.0);
    let mut values: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 0.1 } else { -0.1 }).collect();
    for v in &mut values[20..24] {
        *v = 10.0;
    }

    let despiker = SigmaDespiker::new(1.5, 4, 10).unwrap();
    let outcome = despiker.despike("w", &mut values, &layout, &NoopReporter);

    assert_eq!(outcome.removed, 4);
    assert!(values[20..24].iter().all(|v| v.is_nan()));
}

#[test]
fn test_despike_is_idempotent_after_convergence() {
    let index = seconds(200);
    let layout = layout_for(&index, 0.0, 200.0, 50.0);
    let mut values: Vec<f64> = (0..200).map(|i| ((i * 37) % 11) as f64 * 0.1).collect();
    values[13] = 40.0;
    values[77] = -35.0;
    values[150] = 25.0;

    let despiker = SigmaDespiker::new(3.0, 3, 20).unwrap();
    let first = despiker.despike("t", &mut values, &layout, &NoopReporter);
    assert!(first.converged);
    assert!(first.removed >= 3);

    let snapshot = values.clone();
    let single = SigmaDespiker::new(3.0, 3, 1).unwrap();
    let second = single.despike("t", &mut values, &layout, &NoopReporter);

    assert_eq!(second.removed, 0);
    assert_eq!(
        values.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
        snapshot.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
    );
}

#[test]
fn test_despike_valid_count_non_increasing() {
    let index = seconds(120);
    let layout = layout_for(&index, 0.0, 120.0, 60.0);
    let mut values: Vec<f64> = (0..120).map(|i| (i as f64 * 0.3).sin()).collect();
    values[5] = 9.0;
    values[6] = 8.5;
    values[90] = -7.0;

    let mut previous = valid_count(&values);
    for _ in 0..5 {
        SigmaDespiker::new(2.5, 2, 1)
            .unwrap()
            .despike("u", &mut values, &layout, &NoopReporter);
        let now = valid_count(&values);
        assert!(now <= previous);
        previous = now;
    }
}

#[test]
fn test_despike_reports_per_bin_and_iteration() {
    let index = seconds(20);
    let layout = layout_for(&index, 0.0, 20.0, 10.0);
    let mut values = vec![
        1.0, 2.0, 3.0, 4.0, 100.0, 6.0, 7.0, 8.0, 9.0, 10.0, // spike in bin 0
        5.0, 5.1, 4.9, 5.0, 5.2, 4.8, 5.0, 5.1, 4.9, 5.0, // clean bin 1
    ];
    let reporter = CollectingReporter::new();
    SigmaDespiker::new(2.0, 1, 3)
        .unwrap()
        .despike("u", &mut values, &layout, &reporter);

    let events = reporter.events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        ReportEvent::DespikeRemoved {
            channel,
            bin,
            iteration,
            removed,
        } => {
            assert_eq!(channel, "u");
            assert_eq!(bin.left, 0.0);
            assert_eq!(bin.right, 10.0);
            assert_eq!(*iteration, 1);
            assert_eq!(*removed, 1);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_despiker_rejects_bad_configuration() {
    assert!(SigmaDespiker::new(0.0, 3, 3).is_err());
    assert!(SigmaDespiker::new(-1.0, 3, 3).is_err());
    assert!(SigmaDespiker::new(3.5, 3, 0).is_err());
}

/// Gate filter erases the whole excursion regardless of its length
#[test]
fn test_gate_erases_whole_excursion() {
    let index = seconds(20);
    let layout = layout_for(&index, 0.0, 20.0, 20.0);
    let mut values = vec![0.0; 20];
    for v in &mut values[5..15] {
        *v = 50.0;
    }
    // mean = 25, window [5, 45]: every sample lies outside
    let gate = GateFilter::new(20.0).unwrap();
    let removed = gate.process_channel("u", &mut values, &layout, &NoopReporter);

    assert_eq!(removed, 20);
    assert!(values.iter().all(|v| v.is_nan()));
}

#[test]
fn test_gate_uses_each_bins_own_mean() {
    let index = seconds(8);
    let layout = layout_for(&index, 0.0, 8.0, 4.0);
    // bin 0 around 0, bin 1 around 100; a global window would wipe one bin
    let mut values = vec![0.0, 1.0, -1.0, 9.0, 100.0, 101.0, 99.0, 100.0];
    let gate = GateFilter::new(5.0).unwrap();
    let reporter = CollectingReporter::new();
    let removed = gate.process_channel("t", &mut values, &layout, &reporter);

    // bin 0 mean = 2.25, window [-2.75, 7.25] -> 9.0 erased
    assert_eq!(removed, 1);
    assert!(values[3].is_nan());
    assert_eq!(&values[4..], &[100.0, 101.0, 99.0, 100.0]);

    match &reporter.events()[0] {
        ReportEvent::GateRemoved { removed, percent, .. } => {
            assert_eq!(*removed, 1);
            assert!((percent - 25.0).abs() < 1e-12);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_gate_leaves_samples_outside_bins() {
    let index = seconds(10);
    // bins cover [0, 8); samples 8 and 9 belong to no bin
    let layout = layout_for(&index, 0.0, 9.0, 4.0);
    let mut values = vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 500.0, -500.0];
    GateFilter::new(1.0)
        .unwrap()
        .process_channel("u", &mut values, &layout, &NoopReporter);
    assert_eq!(values[8], 500.0);
    assert_eq!(values[9], -500.0);
}

#[test]
fn test_range_filter_reports_percent() {
    let filter = RangeFilter::new(-30.0, 30.0).unwrap();
    let index = seconds(4);
    let layout = layout_for(&index, 0.0, 4.0, 4.0);
    let mut values = vec![0.0, 31.0, -31.0, 2.0];
    let reporter = CollectingReporter::new();

    let removed = filter.process_channel("u", &mut values, &layout, &reporter);
    assert_eq!(removed, 2);
    assert_eq!(
        reporter.events(),
        vec![ReportEvent::RangeRemoved {
            channel: "u".to_string(),
            removed: 2,
            percent: 50.0
        }]
    );
}

fn noisy_set() -> ChannelSet {
    let index = seconds(100);
    let u: Vec<f64> = (0..100)
        .map(|i| if i == 42 { 30.0 } else { (i as f64 * 0.7).cos() })
        .collect();
    let w: Vec<f64> = (0..100)
        .map(|i| if i == 7 || i == 66 { -12.0 } else { (i as f64 * 1.3).sin() * 0.2 })
        .collect();
    ChannelSet::from_columns(index, [("u", u), ("w", w)]).unwrap()
}

#[test]
fn test_parallel_and_sequential_fan_out_agree() {
    let set = noisy_set();
    let layout = layout_for(set.index(), 0.0, 100.0, 25.0);
    let despiker = SigmaDespiker::new(3.0, 2, 10).unwrap();

    let mut sequential = set.clone();
    let mut parallel = set.clone();
    let a = despiker.apply(&mut sequential, &layout, &NoopReporter);
    let b = despiker.apply_parallel(&mut parallel, &layout, &NoopReporter);

    assert_eq!(a, b);
    for name in ["u", "w"] {
        let x: Vec<u64> = sequential.values(name).unwrap().iter().map(|v| v.to_bits()).collect();
        let y: Vec<u64> = parallel.values(name).unwrap().iter().map(|v| v.to_bits()).collect();
        assert_eq!(x, y);
    }
    assert_eq!(a.for_channel("u"), Some(1));
    assert_eq!(a.for_channel("w"), Some(2));
    assert_eq!(a.total(), 3);
}

#[test]
fn test_applied_leaves_input_untouched() {
    let set = noisy_set();
    let layout = layout_for(set.index(), 0.0, 100.0, 25.0);
    let (filtered, summary) =
        RangeFilter::new(-10.0, 10.0)
            .unwrap()
            .applied(&set, &layout, &NoopReporter);

    assert_eq!(summary.total(), 3);
    assert_eq!(set.values("u").unwrap()[42], 30.0);
    assert!(filtered.values("u").unwrap()[42].is_nan());
}

#[test]
fn test_apply_to_named_channels_only() {
    let mut set = noisy_set();
    let layout = layout_for(set.index(), 0.0, 100.0, 25.0);
    let summary = RangeFilter::new(-10.0, 10.0)
        .unwrap()
        .apply_to(&mut set, &["w"], &layout, &NoopReporter)
        .unwrap();

    assert_eq!(summary.for_channel("w"), Some(2));
    assert_eq!(set.values("u").unwrap()[42], 30.0);

    let missing = RangeFilter::new(-1.0, 1.0)
        .unwrap()
        .apply_to(&mut set, &["q"], &layout, &NoopReporter);
    assert!(missing.is_err());
}

#[test]
fn test_missing_samples_are_ignored_by_statistics() {
    let index = seconds(10);
    let layout = layout_for(&index, 0.0, 10.0, 10.0);
    let mut values = vec![1.0, 2.0, MISSING, 4.0, 100.0, 6.0, MISSING, 8.0, 9.0, 10.0];
    let outcome = SigmaDespiker::new(2.0, 1, 5)
        .unwrap()
        .despike("u", &mut values, &layout, &NoopReporter);
    assert_eq!(outcome.removed, 1);
    assert!(values[4].is_nan());
}
