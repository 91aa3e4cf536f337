//! Windowed threshold trackers.
//!
//! One tracker exists per (sensor, threshold, operator, duration) tuple.
//! Each holds a time-ordered buffer of samples with a fixed capacity;
//! samples are appended at the back and evicted from the front as they age
//! out of the window or the buffer fills.

use std::collections::{BTreeMap, VecDeque};

use pulsar_core::{Value, compare_values};
use pulsar_lang::ast::{CmpOp, TemporalMode};

use crate::truth::Truth;

pub const DEFAULT_BUFFER_CAPACITY: usize = 100;

/// Tracker identity. The threshold is keyed by its bit pattern so the key
/// stays `Ord` without imposing an ordering on NaN.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TrackerKey {
    pub sensor: String,
    pub op: CmpOp,
    pub threshold_bits: u64,
    pub duration_ms: u64,
}

impl TrackerKey {
    pub fn new(sensor: &str, op: CmpOp, threshold: f64, duration_ms: u64) -> Self {
        Self {
            sensor: sensor.to_string(),
            op,
            threshold_bits: threshold.to_bits(),
            duration_ms,
        }
    }
}

/// One sensor's sample window for one threshold condition.
#[derive(Debug, Clone)]
pub struct WindowTracker {
    samples: VecDeque<(f64, i64)>,
    /// Most recent sample that aged out of the window; consulted in
    /// Extended mode as a guard value.
    guard: Option<(f64, i64)>,
    capacity: usize,
}

impl WindowTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            guard: None,
            capacity,
        }
    }

    /// Record a sample (when the sensor reported one) and age out
    /// everything before `now_ms - duration_ms`.
    pub fn observe(&mut self, sample: Option<f64>, now_ms: i64, duration_ms: u64) {
        if let Some(value) = sample {
            self.samples.push_back((value, now_ms));
            while self.samples.len() > self.capacity {
                self.samples.pop_front();
            }
        }
        let window_start = now_ms.saturating_sub(duration_ms as i64);
        while let Some(&(value, at_ms)) = self.samples.front() {
            if at_ms < window_start {
                self.guard = Some((value, at_ms));
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Decide the threshold over the current window. True iff every
    /// considered sample satisfies the operator, False iff any falsifies,
    /// Indeterminate when nothing can be considered. Extended mode also
    /// considers the guard sample.
    pub fn decide(&self, op: CmpOp, threshold: f64, mode: TemporalMode) -> Truth {
        let guard = match mode {
            TemporalMode::Strict => None,
            TemporalMode::Extended => self.guard,
        };
        let mut considered = 0usize;
        for &(value, _) in guard.iter().chain(self.samples.iter()) {
            considered += 1;
            let holds = compare_values(op, &Value::Number(value), &Value::Number(threshold));
            match holds {
                Some(true) => {}
                Some(false) | None => return Truth::False,
            }
        }
        if considered == 0 {
            Truth::Indeterminate
        } else {
            Truth::True
        }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

/// All window trackers, keyed deterministically.
#[derive(Debug, Clone)]
pub struct TemporalStore {
    trackers: BTreeMap<TrackerKey, WindowTracker>,
    capacity: usize,
}

impl Default for TemporalStore {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}

impl TemporalStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            trackers: BTreeMap::new(),
            capacity,
        }
    }

    /// Feed `sample` into the tracker for this condition and re-decide.
    #[allow(clippy::too_many_arguments)]
    pub fn evaluate(
        &mut self,
        sensor: &str,
        op: CmpOp,
        threshold: f64,
        duration_ms: u64,
        mode: TemporalMode,
        sample: Option<f64>,
        now_ms: i64,
    ) -> Truth {
        let key = TrackerKey::new(sensor, op, threshold, duration_ms);
        let capacity = self.capacity;
        let tracker = self
            .trackers
            .entry(key)
            .or_insert_with(|| WindowTracker::new(capacity));
        tracker.observe(sample, now_ms, duration_ms);
        tracker.decide(op, threshold, mode)
    }

    pub fn tracker(&self, key: &TrackerKey) -> Option<&WindowTracker> {
        self.trackers.get(key)
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strict_eval(store: &mut TemporalStore, sample: Option<f64>, now_ms: i64) -> Truth {
        store.evaluate(
            "input:temp",
            CmpOp::Gt,
            75.0,
            10_000,
            TemporalMode::Strict,
            sample,
            now_ms,
        )
    }

    #[test]
    fn empty_window_is_indeterminate_in_strict_mode() {
        let mut store = TemporalStore::default();
        assert_eq!(strict_eval(&mut store, None, 0), Truth::Indeterminate);
    }

    #[test]
    fn all_samples_above_threshold_is_true() {
        let mut store = TemporalStore::default();
        for i in 0..5 {
            strict_eval(&mut store, Some(80.0 + i as f64), i * 1_000);
        }
        assert_eq!(strict_eval(&mut store, Some(90.0), 5_000), Truth::True);
    }

    #[test]
    fn one_falsifying_sample_is_false() {
        let mut store = TemporalStore::default();
        strict_eval(&mut store, Some(80.0), 0);
        strict_eval(&mut store, Some(70.0), 1_000);
        assert_eq!(strict_eval(&mut store, Some(90.0), 2_000), Truth::False);
    }

    #[test]
    fn falsifying_sample_ages_out_of_the_window() {
        let mut store = TemporalStore::default();
        strict_eval(&mut store, Some(70.0), 0);
        // 11 s later the low sample has left the 10 s window.
        assert_eq!(strict_eval(&mut store, Some(90.0), 11_000), Truth::True);
    }

    #[test]
    fn strict_mode_goes_indeterminate_when_reports_stop() {
        let mut store = TemporalStore::default();
        strict_eval(&mut store, Some(90.0), 0);
        // No samples for 20 s: window empties.
        assert_eq!(strict_eval(&mut store, None, 20_000), Truth::Indeterminate);
    }

    #[test]
    fn extended_mode_keeps_a_guard_sample() {
        let mut store = TemporalStore::default();
        let mut eval = |sample, now| {
            store.evaluate(
                "input:temp",
                CmpOp::Gt,
                75.0,
                10_000,
                TemporalMode::Extended,
                sample,
                now,
            )
        };
        eval(Some(90.0), 0);
        // Sensor stops reporting; the pre-window sample still guards True.
        assert_eq!(eval(None, 20_000), Truth::True);
    }

    #[test]
    fn extended_guard_below_threshold_is_false() {
        let mut store = TemporalStore::default();
        let mut eval = |sample, now| {
            store.evaluate(
                "input:temp",
                CmpOp::Gt,
                75.0,
                10_000,
                TemporalMode::Extended,
                sample,
                now,
            )
        };
        eval(Some(50.0), 0);
        assert_eq!(eval(None, 20_000), Truth::False);
    }

    #[test]
    fn trackers_are_keyed_per_condition() {
        let mut store = TemporalStore::default();
        strict_eval(&mut store, Some(80.0), 0);
        store.evaluate(
            "input:temp",
            CmpOp::Lt,
            10.0,
            5_000,
            TemporalMode::Strict,
            Some(3.0),
            0,
        );
        assert_eq!(store.len(), 2);
        let key = TrackerKey::new("input:temp", CmpOp::Gt, 75.0, 10_000);
        assert_eq!(store.tracker(&key).unwrap().sample_count(), 1);
    }

    #[test]
    fn capacity_bounds_the_buffer() {
        let mut store = TemporalStore::new(3);
        for i in 0..10 {
            strict_eval(&mut store, Some(80.0), i * 10);
        }
        let key = TrackerKey::new("input:temp", CmpOp::Gt, 75.0, 10_000);
        assert_eq!(store.tracker(&key).unwrap().sample_count(), 3);
    }
}
