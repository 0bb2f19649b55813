//! Run-length scanning of boolean masks
//!
//! The despiker needs to know how long each excursion outside its threshold
//! window lasts: short runs are sensor noise, long runs are physical events.
//! [`scan_runs`] turns a mask into its maximal `true` runs in one O(n) pass.
//!
//! ```text
//! mask:  [T, T, F, T]
//! runs:  Run { start: 0, len: 2 }, Run { start: 3, len: 1 }
//! ```
//!
//! Runs touching either end of the mask are reported like any other run, and
//! [`reconstruct_mask`] is the exact inverse of [`scan_runs`].

use serde::{Deserialize, Serialize};

/// Maximal contiguous span of `true` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    /// Index of the first flagged sample
    pub start: usize,
    /// Number of consecutive flagged samples
    pub len: usize,
}

impl Run {
    /// One past the last flagged sample
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Find every maximal run of `true` values, in ascending order
///
/// # Example
/// ```
/// use remolino::runs::{scan_runs, Run};
///
/// let runs = scan_runs(&[true, true, false, true]);
/// assert_eq!(runs, vec![Run { start: 0, len: 2 }, Run { start: 3, len: 1 }]);
/// ```
pub fn scan_runs(mask: &[bool]) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut open: Option<usize> = None;

    for (i, &flagged) in mask.iter().enumerate() {
        match (flagged, open) {
            (true, None) => open = Some(i),
            (false, Some(start)) => {
                runs.push(Run {
                    start,
                    len: i - start,
                });
                open = None;
            }
            _ => {}
        }
    }

    // Run reaching the end of the mask
    if let Some(start) = open {
        runs.push(Run {
            start,
            len: mask.len() - start,
        });
    }

    runs
}

/// Split runs into parallel `(starts, lengths)` vectors
pub fn starts_and_lengths(runs: &[Run]) -> (Vec<usize>, Vec<usize>) {
    runs.iter().map(|r| (r.start, r.len)).unzip()
}

/// Rebuild a mask of length `len` from its runs
pub fn reconstruct_mask(runs: &[Run], len: usize) -> Vec<bool> {
    let mut mask = vec![false; len];
    for run in runs {
        for slot in &mut mask[run.start.min(len)..run.end().min(len)] {
            *slot = true;
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_false_has_no_runs() {
        let runs = scan_runs(&[false, false, false]);
        let (starts, lengths) = starts_and_lengths(&runs);
        assert!(starts.is_empty());
        assert!(lengths.is_empty());
    }

    #[test]
    fn test_run_at_start_and_end() {
        let runs = scan_runs(&[true, true, false, true]);
        let (starts, lengths) = starts_and_lengths(&runs);
        assert_eq!(starts, vec![0, 3]);
        assert_eq!(lengths, vec![2, 1]);
    }

    #[test]
    fn test_all_true_is_one_run() {
        assert_eq!(scan_runs(&[true; 5]), vec![Run { start: 0, len: 5 }]);
    }

    #[test]
    fn test_empty_mask() {
        assert!(scan_runs(&[]).is_empty());
        assert!(reconstruct_mask(&[], 0).is_empty());
    }

    #[test]
    fn test_interior_runs() {
        let mask = [false, true, true, true, false, false, true, false];
        assert_eq!(
            scan_runs(&mask),
            vec![Run { start: 1, len: 3 }, Run { start: 6, len: 1 }]
        );
    }

    #[test]
    fn test_round_trip() {
        let masks: [&[bool]; 5] = [
            &[true, true, true],
            &[false, false, false],
            &[false, true, true, false],
            &[true, false, false, true],
            &[true, false, true, false, true],
        ];
        for mask in masks {
            let runs = scan_runs(mask);
            assert_eq!(reconstruct_mask(&runs, mask.len()), mask);
        }
    }

    #[test]
    fn test_reconstruct_clips_runs_past_len() {
        let runs = [Run { start: 2, len: 4 }, Run { start: 9, len: 2 }];
        assert_eq!(reconstruct_mask(&runs, 4), vec![false, false, true, true]);
        assert!(reconstruct_mask(&runs, 0).is_empty());
    }
}
