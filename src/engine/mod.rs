//! Resampling engine.
//!
//! Walks a fixed 1-second grid from the first to the last event and, for
//! every grid second, either produces a [`ResampledPoint`] or leaves a hole
//! for the formatter to pad.

pub mod segment;
pub mod series;
pub mod types;

pub use segment::SegmentState;
pub use series::{SignalSample, SignalSeries};
pub use types::{DeviceIdentity, Event, MS_PER_SECOND, ResampledPoint, round2};

use std::collections::HashMap;
use tracing::debug;

use crate::config::ResampleConfig;
use crate::error::Result;

/// Resamples one device's events onto a 1 Hz grid.
#[derive(Debug, Clone)]
pub struct Resampler {
    signal_columns: Vec<String>,
    config: ResampleConfig,
}

impl Resampler {
    /// Creates a resampler for the given signal columns.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the rssi limit is below the gap limit.
    pub fn new(signal_columns: Vec<String>, config: ResampleConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            signal_columns,
            config,
        })
    }

    pub fn signal_columns(&self) -> &[String] {
        &self.signal_columns
    }

    pub fn config(&self) -> &ResampleConfig {
        &self.config
    }

    /// Produces every resolvable grid point, in ascending grid order.
    ///
    /// Events are expected in non-decreasing timestamp order; unresolvable
    /// seconds are simply absent from the result.
    #[tracing::instrument(skip_all, fields(events = events.len()))]
    pub fn resample(&self, events: &[Event]) -> Vec<ResampledPoint> {
        let (Some(first), Some(last)) = (events.first(), events.last()) else {
            return Vec::new();
        };

        let series: Vec<(&str, SignalSeries)> = self
            .signal_columns
            .iter()
            .map(|name| (name.as_str(), SignalSeries::from_events(events, name)))
            .collect();

        let start_ms = first.sample_at_ms.div_euclid(MS_PER_SECOND) * MS_PER_SECOND;
        let end_ms = (last.sample_at_ms.div_euclid(MS_PER_SECOND) + 1) * MS_PER_SECOND;
        debug!(
            start_ms,
            end_ms,
            signals = series.len(),
            "Walking resampling grid"
        );

        let mut points = Vec::new();
        let mut state = SegmentState::default();
        let mut timestamp_ms = start_ms;

        while timestamp_ms <= end_ms {
            if let Some((point, next)) = self.resolve(events, &series, timestamp_ms, state) {
                points.push(point);
                state = next;
            }
            timestamp_ms += MS_PER_SECOND;
        }

        debug!(points = points.len(), "Grid walk complete");
        points
    }

    /// Resolves a single grid second against the bracketing events.
    fn resolve(
        &self,
        events: &[Event],
        series: &[(&str, SignalSeries)],
        timestamp_ms: i64,
        state: SegmentState,
    ) -> Option<(ResampledPoint, SegmentState)> {
        let split = events.partition_point(|e| e.sample_at_ms <= timestamp_ms);
        let before = &events[split.checked_sub(1)?];
        let resample_at = timestamp_ms.div_euclid(MS_PER_SECOND);

        if before.sample_at_ms == timestamp_ms {
            let value = before.acvl as f64;
            let (increment, next) = state.advance(resample_at, value, value);
            let signals = before
                .rssi
                .iter()
                .filter(|(name, _)| self.signal_columns.contains(*name))
                .map(|(name, value)| (name.clone(), *value))
                .collect();

            let point = ResampledPoint {
                resample_at,
                device: before.device.clone(),
                event_seq: before.event_seq,
                attributed_acvl: before.acvl,
                interpolated_acvl: value,
                increment,
                signals,
            };
            return Some((point, next));
        }

        let after = events.get(split)?;
        if after.sample_at_ms - before.sample_at_ms > self.config.gap_limit_ms {
            return None;
        }
        // a decreasing counter invalidates the whole pair
        if after.acvl < before.acvl {
            return None;
        }

        let ratio = (timestamp_ms - before.sample_at_ms) as f64
            / (after.sample_at_ms - before.sample_at_ms) as f64;
        let interpolated = before.acvl as f64 + ratio * (after.acvl - before.acvl) as f64;

        let attributed = if timestamp_ms - before.sample_at_ms <= after.sample_at_ms - timestamp_ms
        {
            before
        } else {
            after
        };

        let (increment, next) = state.advance(resample_at, interpolated, round2(interpolated));

        let signals: HashMap<String, f64> = series
            .iter()
            .filter_map(|(name, s)| {
                s.value_at(timestamp_ms, self.config.rssi_limit_ms)
                    .map(|v| (name.to_string(), v))
            })
            .collect();

        let point = ResampledPoint {
            resample_at,
            device: before.device.clone(),
            event_seq: attributed.event_seq,
            attributed_acvl: attributed.acvl,
            interpolated_acvl: interpolated,
            increment,
            signals,
        };
        Some((point, next))
    }
}
