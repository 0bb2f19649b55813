//! Channels and channel sets sharing one time index
//!
//! A `Channel` holds the samples of one physical quantity (a wind component,
//! sonic temperature). Missing samples are stored as [`MISSING`] (NaN) so every
//! channel stays one contiguous `Vec<f64>` that bin ranges can slice into.
//!
//! Filters are written against a single channel (`&mut [f64]`); a
//! `ChannelSet` fans a single-channel primitive out over its channels either
//! sequentially or with one scoped worker per channel.

use crate::error::{EddyError, Result};
use serde::{Deserialize, Serialize};

/// Missing-value sentinel
pub const MISSING: f64 = f64::NAN;

/// Check whether a sample is missing
#[inline]
pub fn is_missing(value: f64) -> bool {
    value.is_nan()
}

/// Number of non-missing samples
pub fn valid_count(values: &[f64]) -> usize {
    values.iter().filter(|v| !is_missing(**v)).count()
}

/// One physical quantity sampled on the set's time index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub values: Vec<f64>,
}

impl Channel {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn valid_count(&self) -> usize {
        valid_count(&self.values)
    }
}

/// Channels sharing one monotonic time index (seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSet {
    index: Vec<f64>,
    channels: Vec<Channel>,
}

impl ChannelSet {
    /// Create an empty set over `index`
    ///
    /// The index must be monotonic non-decreasing and free of NaN.
    pub fn new(index: Vec<f64>) -> Result<Self> {
        if let Some(pos) = index.iter().position(|t| t.is_nan()) {
            return Err(EddyError::input(format!(
                "time index contains NaN at position {}",
                pos
            )));
        }
        if let Some(pos) = index.windows(2).position(|w| w[1] < w[0]) {
            return Err(EddyError::input(format!(
                "time index is not monotonic at position {} ({} < {})",
                pos + 1,
                index[pos + 1],
                index[pos]
            )));
        }
        Ok(Self {
            index,
            channels: Vec::new(),
        })
    }

    /// Build a set from an index and `(name, values)` columns
    pub fn from_columns<I, S>(index: Vec<f64>, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let mut set = Self::new(index)?;
        for (name, values) in columns {
            set.insert(Channel::new(name, values))?;
        }
        Ok(set)
    }

    /// Add or replace a channel
    pub fn insert(&mut self, channel: Channel) -> Result<()> {
        if channel.len() != self.index.len() {
            return Err(EddyError::input(format!(
                "channel '{}' has {} samples but the index has {}",
                channel.name,
                channel.len(),
                self.index.len()
            )));
        }
        match self.position(&channel.name) {
            Some(pos) => self.channels[pos] = channel,
            None => self.channels.push(channel),
        }
        Ok(())
    }

    pub fn index(&self) -> &[f64] {
        &self.index
    }

    /// Number of samples per channel
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|c| c.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    /// Values of a channel, or `UnsupportedInput` when it does not exist
    pub fn values(&self, name: &str) -> Result<&[f64]> {
        self.get(name)
            .map(|c| c.values.as_slice())
            .ok_or_else(|| EddyError::input(format!("channel '{}' not found", name)))
    }

    pub fn values_mut(&mut self, name: &str) -> Result<&mut [f64]> {
        self.channels
            .iter_mut()
            .find(|c| c.name == name)
            .map(|c| c.values.as_mut_slice())
            .ok_or_else(|| EddyError::input(format!("channel '{}' not found", name)))
    }

    /// Mutable access to two distinct channels at once
    pub fn pair_mut(&mut self, first: &str, second: &str) -> Result<(&mut [f64], &mut [f64])> {
        let a = self
            .position(first)
            .ok_or_else(|| EddyError::input(format!("channel '{}' not found", first)))?;
        let b = self
            .position(second)
            .ok_or_else(|| EddyError::input(format!("channel '{}' not found", second)))?;
        if a == b {
            return Err(EddyError::input(format!(
                "channel '{}' requested twice for a pairwise operation",
                first
            )));
        }

        if a < b {
            let (head, tail) = self.channels.split_at_mut(b);
            Ok((head[a].values.as_mut_slice(), tail[0].values.as_mut_slice()))
        } else {
            let (head, tail) = self.channels.split_at_mut(a);
            Ok((tail[0].values.as_mut_slice(), head[b].values.as_mut_slice()))
        }
    }

    /// Keep only the named channels, in the given order
    pub fn select(&self, names: &[&str]) -> Result<ChannelSet> {
        let mut out = ChannelSet {
            index: self.index.clone(),
            channels: Vec::with_capacity(names.len()),
        };
        for name in names {
            out.channels
                .push(Channel::new(*name, self.values(name)?.to_vec()));
        }
        Ok(out)
    }

    /// Drop every sample from `len` onwards
    pub fn truncate(&mut self, len: usize) {
        self.index.truncate(len);
        for channel in &mut self.channels {
            channel.values.truncate(len);
        }
    }

    /// Non-missing sample count per channel
    pub fn valid_counts(&self) -> Vec<(String, usize)> {
        self.channels
            .iter()
            .map(|c| (c.name.clone(), c.valid_count()))
            .collect()
    }

    /// Apply `f` to every channel in order
    pub fn for_each_channel_mut<R, F>(&mut self, mut f: F) -> Vec<(String, R)>
    where
        F: FnMut(&str, &mut [f64]) -> R,
    {
        self.channels
            .iter_mut()
            .map(|c| {
                let result = f(&c.name, &mut c.values);
                (c.name.clone(), result)
            })
            .collect()
    }

    /// Apply `f` to every channel, one scoped worker per channel
    ///
    /// Each worker owns its channel exclusively; results come back in channel
    /// order, so the outcome is identical to [`ChannelSet::for_each_channel_mut`].
    pub fn par_for_each_channel_mut<R, F>(&mut self, f: F) -> Vec<(String, R)>
    where
        F: Fn(&str, &mut [f64]) -> R + Sync,
        R: Send,
    {
        let f = &f;
        let scoped = crossbeam::thread::scope(|scope| {
            let handles: Vec<_> = self
                .channels
                .iter_mut()
                .map(|channel| {
                    scope.spawn(move |_| {
                        let result = f(&channel.name, &mut channel.values);
                        (channel.name.clone(), result)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect::<Vec<_>>()
        });

        match scoped {
            Ok(results) => results,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}
