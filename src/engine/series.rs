//! Per-source signal series and point resolution.
//!
//! Each source is resolved on its own: a missing or rejected source never
//! affects another one.

use super::types::{Event, MS_PER_SECOND};

/// A single `(timestamp, value)` reading of one signal source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalSample {
    pub timestamp_ms: i64,
    pub value: f64,
}

/// All readings of one signal source, sorted by timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalSeries {
    samples: Vec<SignalSample>,
}

impl SignalSeries {
    /// Collects every reading of `source` from `events`.
    pub fn from_events(events: &[Event], source: &str) -> Self {
        let samples = events
            .iter()
            .filter_map(|e| {
                e.rssi.get(source).map(|&value| SignalSample {
                    timestamp_ms: e.sample_at_ms,
                    value,
                })
            })
            .collect();
        Self::from_samples(samples)
    }

    pub fn from_samples(mut samples: Vec<SignalSample>) -> Self {
        // stable: equal timestamps keep event order
        samples.sort_by_key(|s| s.timestamp_ms);
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[SignalSample] {
        &self.samples
    }

    /// Resolves the value of this source at `timestamp_ms`.
    ///
    /// A sample inside the same whole second wins outright. Otherwise a
    /// lone or boundary sample is carried only within `limit_ms`, and two
    /// bracketing samples are interpolated only when they are less than
    /// `limit_ms` apart.
    pub fn value_at(&self, timestamp_ms: i64, limit_ms: i64) -> Option<f64> {
        let samples = &self.samples;
        if samples.is_empty() {
            return None;
        }

        let second_start = timestamp_ms.div_euclid(MS_PER_SECOND) * MS_PER_SECOND;
        let first_in_second = samples.partition_point(|s| s.timestamp_ms < second_start);
        if let Some(s) = samples.get(first_in_second) {
            if s.timestamp_ms < second_start + MS_PER_SECOND {
                return Some(s.value);
            }
        }

        if let [only] = samples.as_slice() {
            return within_limit(only, timestamp_ms, limit_ms).then_some(only.value);
        }

        let split = samples.partition_point(|s| s.timestamp_ms <= timestamp_ms);
        let before = split.checked_sub(1).map(|i| &samples[i]);
        let after = samples.get(split);

        match (before, after) {
            (None, Some(after)) => within_limit(after, timestamp_ms, limit_ms).then_some(after.value),
            (Some(before), None) => {
                within_limit(before, timestamp_ms, limit_ms).then_some(before.value)
            }
            (Some(before), Some(after)) => {
                if after.timestamp_ms - before.timestamp_ms >= limit_ms {
                    return None;
                }
                Some(interpolate(before, after, timestamp_ms))
            }
            (None, None) => None,
        }
    }
}

fn within_limit(sample: &SignalSample, timestamp_ms: i64, limit_ms: i64) -> bool {
    (sample.timestamp_ms - timestamp_ms).abs() <= limit_ms
}

/// Linear interpolation between two samples; equal timestamps yield the first value.
pub fn interpolate(a: &SignalSample, b: &SignalSample, timestamp_ms: i64) -> f64 {
    if a.timestamp_ms == b.timestamp_ms {
        return a.value;
    }
    let ratio = (timestamp_ms - a.timestamp_ms) as f64 / (b.timestamp_ms - a.timestamp_ms) as f64;
    a.value + ratio * (b.value - a.value)
}
