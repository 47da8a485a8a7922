//! Beacon period estimation.
//!
//! Every beacon arrival is timestamped by the capture timer and appended to a
//! [`PeriodRingBuffer`]. From those timestamps the MAC derives the TDMA cycle
//! period in two stages:
//!
//! - **Coarse** (while locking, [`LogicalMacState::ActivePll`]): the span of the
//!   whole averaging window divided by its power-of-two interval count.
//! - **Smoothed** (afterwards): an exponential moving average of the latest beacon
//!   interval, `0.95 * old + 0.05 * latest`.
//!
//! The moving average rejects single-beacon jitter at the cost of lagging genuine
//! period changes. All differences use wrapping arithmetic so counter rollover
//! between two captures is harmless.

use heapless::HistoryBuffer;
use libm::roundf;

use crate::consts::{NUM_PERIODS_BASE, PERIOD_BUFFER_LENGTH};
use crate::mac::LogicalMacState;

/// Weight of the previous estimate in the moving average.
pub const PERIOD_SMOOTHING: f32 = 0.95;

/// Capture ring used by the MAC.
pub type CaptureBuffer = PeriodRingBuffer<PERIOD_BUFFER_LENGTH>;

/// Fixed-capacity ring of capture timestamps.
///
/// Once full, every insertion evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct PeriodRingBuffer<const N: usize> {
    buf: HistoryBuffer<u32, N>,
}

impl<const N: usize> Default for PeriodRingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> PeriodRingBuffer<N> {
    /// An empty ring.
    pub const fn new() -> Self {
        Self {
            buf: HistoryBuffer::new(),
        }
    }

    /// Appends a timestamp, overwriting the oldest one when full.
    pub fn push(&mut self, value: u32) {
        self.buf.write(value);
    }

    /// Number of stored timestamps.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether no timestamp is stored.
    pub fn is_empty(&self) -> bool {
        self.buf.len() == 0
    }

    /// Whether the ring holds `N` timestamps.
    pub fn is_full(&self) -> bool {
        self.buf.len() == self.buf.capacity()
    }

    /// Drops every timestamp.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// The `age`-th most recent timestamp; `0` is the newest.
    pub fn nth_latest(&self, age: usize) -> Option<u32> {
        let oldest_first = self.len().checked_sub(age + 1)?;
        self.buf.oldest_ordered().nth(oldest_first).copied()
    }

    /// The newest timestamp.
    pub fn latest(&self) -> Option<u32> {
        self.buf.recent().copied()
    }

    /// Ticks between the newest timestamp and the one `intervals` captures before it.
    pub fn span(&self, intervals: usize) -> Option<u32> {
        let newest = self.latest()?;
        let older = self.nth_latest(intervals)?;
        Some(newest.wrapping_sub(older))
    }

    /// Ticks between the two most recent timestamps.
    pub fn latest_diff(&self) -> Option<u32> {
        self.span(1)
    }

    /// Timestamps from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.buf.oldest_ordered().copied()
    }
}

/// Averages the whole window: `span(2^BASE) >> BASE`.
///
/// Before the window has filled, the latest single interval is used.
pub fn coarse_period<const N: usize>(captures: &PeriodRingBuffer<N>) -> Option<u32> {
    let window = 1usize << NUM_PERIODS_BASE;
    match captures.span(window) {
        Some(span) => Some(span >> NUM_PERIODS_BASE),
        None => captures.latest_diff(),
    }
}

/// Moves `previous` 5 % of the way towards the latest beacon interval.
pub fn smoothed_period<const N: usize>(
    previous: u32,
    captures: &PeriodRingBuffer<N>,
) -> Option<u32> {
    let latest = captures.latest_diff()?;
    let blended = PERIOD_SMOOTHING * previous as f32 + (1.0 - PERIOD_SMOOTHING) * latest as f32;
    Some(roundf(blended) as u32)
}

/// New period estimate for the given MAC state, or `None` with fewer than two captures.
pub fn estimate_period<const N: usize>(
    state: LogicalMacState,
    previous: u32,
    captures: &PeriodRingBuffer<N>,
) -> Option<u32> {
    if state == LogicalMacState::ActivePll {
        coarse_period(captures)
    } else {
        smoothed_period(previous, captures)
    }
}
