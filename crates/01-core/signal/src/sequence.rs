//! Time-indexed sample store.
//!
//! A [`Sequence`] is an ordered list of `(time, value)` pairs with strictly
//! increasing times. All read operations are total: they return `None`, an
//! empty vector, or an empty sequence when no data qualifies.

use serde::{Deserialize, Serialize};

use crate::time::Time;
use crate::value::Value;

/// Placement policy applied when resampling a recorded sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InterpolationKind {
    /// Keep samples where they were recorded.
    Start,
    /// Move each sample (after the first) to the midpoint between it and its
    /// predecessor.
    Mid,
    /// Drop the first sample and re-key the rest to the preceding time.
    End,
    /// Emit equally spaced, linearly interpolated samples at a fixed
    /// resolution.
    Linear,
}

/// One slice of an interval profile: a value (or `None` for the undefined
/// region before the first sample) and the fraction of the interval it covers.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileEntry<T> {
    pub value: Option<T>,
    pub fraction: f64,
}

/// Ordered `(time, value)` store with strictly increasing unique times.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sequence<T> {
    times: Vec<Time>,
    values: Vec<T>,
}

impl<T> Default for Sequence<T> {
    fn default() -> Self {
        Self {
            times: Vec::new(),
            values: Vec::new(),
        }
    }
}

impl<T> Sequence<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a sequence from parallel time/value vectors.
    ///
    /// Times must already be strictly increasing; callers construct these
    /// from sources that guarantee order (logs, other sequences).
    pub fn from_parts(times: Vec<Time>, values: Vec<T>) -> Self {
        debug_assert_eq!(times.len(), values.len());
        debug_assert!(times.windows(2).all(|w| w[0] < w[1]));
        Self { times, values }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn first_time(&self) -> Option<Time> {
        self.times.first().copied()
    }

    pub fn last_time(&self) -> Option<Time> {
        self.times.last().copied()
    }

    pub fn times(&self) -> &[Time] {
        &self.times
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (Time, &T)> {
        self.times.iter().copied().zip(self.values.iter())
    }

    pub fn get(&self, index: usize) -> Option<(Time, &T)> {
        Some((*self.times.get(index)?, self.values.get(index)?))
    }

    /// Appends a point. The caller only appends non-decreasing times; equal
    /// times replace the previous sample to keep times unique.
    pub fn push(&mut self, time: Time, value: T) {
        if let Some(&last) = self.times.last() {
            debug_assert!(time >= last);
            if time == last {
                if let Some(slot) = self.values.last_mut() {
                    *slot = value;
                }
                return;
            }
        }
        self.times.push(time);
        self.values.push(value);
    }

    /// Inserts a point at its sorted position (after any equal time).
    pub fn insert_at(&mut self, time: Time, value: T) {
        let index = self.times.partition_point(|&t| t <= time);
        self.times.insert(index, time);
        self.values.insert(index, value);
    }

    /// Shifts every time by `delta`.
    pub fn shift(&mut self, delta: Time) {
        for t in &mut self.times {
            *t += delta;
        }
    }

    /// Index of the latest point with `time <= t`.
    fn index_at(&self, t: Time) -> Option<usize> {
        let idx = self.times.partition_point(|&time| time <= t);
        idx.checked_sub(1)
    }

    /// The value of the latest point with `time <= t`.
    pub fn sample_at(&self, t: Time) -> Option<&T> {
        self.index_at(t).map(|i| &self.values[i])
    }

    /// Rebuilds the sequence through `f`, dropping points mapped to `None`.
    pub fn filter_map<U>(self, mut f: impl FnMut(T) -> Option<U>) -> Sequence<U> {
        let mut out = Sequence::new();
        for (time, value) in self.times.into_iter().zip(self.values) {
            if let Some(mapped) = f(value) {
                out.times.push(time);
                out.values.push(mapped);
            }
        }
        out
    }
}

impl<T: Clone> Sequence<T> {
    /// `n` samples starting at `t0`, advancing by `p`, each taken with
    /// most-recent-sample semantics. `None` when nothing precedes `t0`.
    pub fn sample_series(&self, t0: Time, n: usize, p: Time) -> Option<Vec<T>> {
        let mut index = self.index_at(t0)?;
        let mut samples = Vec::with_capacity(n);
        let mut t = t0;
        for _ in 0..n {
            samples.push(self.values[index].clone());
            t += p;
            while index + 1 < self.times.len() && self.times[index + 1] <= t {
                index += 1;
            }
        }
        Some(samples)
    }

    /// Points with time in `[start, end)`. With `lead_in`, a point strictly
    /// before `start` (when one exists and no point sits exactly at `start`)
    /// is included with its time clamped to `start`.
    pub fn subsequence(&self, start: Time, end: Time, lead_in: bool) -> Sequence<T> {
        let lo = self.times.partition_point(|&t| t < start);
        let hi = self.times.partition_point(|&t| t < end);
        let mut out = Sequence {
            times: self.times[lo..hi].to_vec(),
            values: self.values[lo..hi].to_vec(),
        };
        if lead_in && lo > 0 && out.first_time() != Some(start) && start < end {
            out.times.insert(0, start);
            out.values.insert(0, self.values[lo - 1].clone());
        }
        out
    }
}

impl<T: Clone + PartialEq> Sequence<T> {
    /// Drops every point whose value equals its predecessor's.
    pub fn dedup(&mut self) {
        if self.len() < 2 {
            return;
        }
        let mut times = Vec::with_capacity(self.len());
        let mut values = Vec::with_capacity(self.len());
        times.push(self.times[0]);
        values.push(self.values[0].clone());
        for i in 1..self.len() {
            if self.values[i] != self.values[i - 1] {
                times.push(self.times[i]);
                values.push(self.values[i].clone());
            }
        }
        self.times = times;
        self.values = values;
    }

    /// Coverage profile of the closed interval `[start, end]`.
    ///
    /// Returns `(value, fraction)` entries with equal values merged, sorted
    /// by fraction descending. Fractions sum to 1 over a non-empty interval;
    /// the region before the first sample reports a `None` value. A
    /// zero-length interval profiles the single governing sample.
    pub fn profile(&self, start: Time, end: Time) -> Vec<ProfileEntry<T>> {
        if end <= start {
            return vec![ProfileEntry {
                value: self.sample_at(start).cloned(),
                fraction: 1.0,
            }];
        }

        let total = (end - start) as f64;
        let mut segments: Vec<(Option<&T>, Time)> = Vec::new();
        let mut cursor = start;
        let mut index = match self.index_at(start) {
            Some(i) => i,
            None => {
                let undefined_until = self.first_time().map_or(end, |t| t.min(end));
                if undefined_until > cursor {
                    segments.push((None, undefined_until - cursor));
                    cursor = undefined_until;
                }
                0
            }
        };
        while cursor < end && index < self.len() {
            let segment_end = match self.times.get(index + 1) {
                Some(&next) => next.min(end),
                None => end,
            };
            if segment_end > cursor {
                segments.push((Some(&self.values[index]), segment_end - cursor));
                cursor = segment_end;
            }
            index += 1;
        }

        let mut merged: Vec<(Option<T>, Time)> = Vec::new();
        for (value, duration) in segments {
            match merged.iter_mut().find(|(v, _)| v.as_ref() == value) {
                Some((_, d)) => *d += duration,
                None => merged.push((value.cloned(), duration)),
            }
        }

        let mut entries: Vec<ProfileEntry<T>> = merged
            .into_iter()
            .map(|(value, duration)| ProfileEntry {
                value,
                fraction: duration as f64 / total,
            })
            .collect();
        entries.sort_by(|a, b| b.fraction.total_cmp(&a.fraction));
        entries
    }
}

impl Sequence<Value> {
    /// Resamples the sequence according to `kind`.
    ///
    /// `Linear` emits `ceil((ti − ti-1) / res)` samples between each pair of
    /// points, linearly interpolated in value (interpolated samples are
    /// `Real`; the terminal point keeps its recorded value). Pairs without a
    /// numeric reading are carried over unchanged.
    pub fn interpolate(&self, kind: InterpolationKind, res: Time) -> Sequence<Value> {
        if self.is_empty() {
            return Sequence::new();
        }
        match kind {
            InterpolationKind::Start => self.clone(),
            InterpolationKind::Mid => {
                let mut times = Vec::with_capacity(self.len());
                times.push(self.times[0]);
                for i in 1..self.len() {
                    times.push((self.times[i - 1] + self.times[i]) / 2);
                }
                Sequence {
                    times,
                    values: self.values.clone(),
                }
            }
            InterpolationKind::End => Sequence {
                times: self.times[..self.len() - 1].to_vec(),
                values: self.values[1..].to_vec(),
            },
            InterpolationKind::Linear => {
                debug_assert!(res > 0);
                let mut out = Sequence::new();
                for i in 1..self.len() {
                    let (t0, v0) = (self.times[i - 1], &self.values[i - 1]);
                    let (t1, v1) = (self.times[i], &self.values[i]);
                    match (v0.as_real(), v1.as_real()) {
                        (Some(a), Some(b)) => {
                            let mut t = t0;
                            while t < t1 {
                                let frac = (t - t0) as f64 / (t1 - t0) as f64;
                                out.push(t, Value::Real(frac * (b - a) + a));
                                t += res;
                            }
                        }
                        _ => out.push(t0, v0.clone()),
                    }
                }
                let last = self.len() - 1;
                out.push(self.times[last], self.values[last].clone());
                out
            }
        }
    }
}
