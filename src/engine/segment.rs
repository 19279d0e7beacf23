//! Contiguous-segment bookkeeping for counter increments.

/// Counter value carried from the last produced grid point.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Carry {
    resample_at: i64,
    value: f64,
}

/// Running state threaded through the grid walk.
///
/// A point continues the current segment only when it lands exactly one
/// second after the previously produced point.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SegmentState {
    last: Option<Carry>,
}

impl SegmentState {
    /// Returns `true` if a point at `resample_at` would open a new segment.
    pub fn starts_segment(&self, resample_at: i64) -> bool {
        !matches!(self.last, Some(c) if c.resample_at + 1 == resample_at)
    }

    /// Computes the increment of `value` at `resample_at` and returns it
    /// with the state that carries `carry` forward.
    pub fn advance(self, resample_at: i64, value: f64, carry: f64) -> (f64, SegmentState) {
        let increment = match self.last {
            Some(c) if c.resample_at + 1 == resample_at => value - c.value,
            _ => 0.0,
        };
        let next = SegmentState {
            last: Some(Carry {
                resample_at,
                value: carry,
            }),
        };
        (increment, next)
    }

    pub fn last_resample_at(&self) -> Option<i64> {
        self.last.map(|c| c.resample_at)
    }
}
