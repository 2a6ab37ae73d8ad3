//! Latency Recorder: the fixed-budget array of per-request latencies that
//! every Reporter pass and ambient summary reads from.
//!
//! The array is filled by index order of pipeline completion (nondeterministic
//! across clients, per the concurrency model), never by request-issue order.
//! Alongside it, an [`hdrhistogram`] collector accumulates the same samples
//! for optional, ambient machine-readable output; it never replaces the
//! documented sort-and-walk percentile algorithm in [`crate::reporter`].

use hdrhistogram::Histogram;

pub struct LatencyRecorder {
    budget: u64,
    samples: Vec<i64>,
    hist: Histogram<u64>,
}

impl LatencyRecorder {
    pub fn new(budget: u64) -> Self {
        Self {
            budget,
            samples: Vec::with_capacity(budget as usize),
            // 3 significant figures matches the precision this codebase's
            // prior latency collector used for the same class of data.
            hist: Histogram::new(3).expect("valid histogram precision"),
        }
    }

    /// Appends one latency sample (microseconds). No-op once the budget is
    /// already satisfied — callers gate on `requests_finished < N` before
    /// calling this, per the read-path contract.
    pub fn record(&mut self, latency_us: i64) {
        if self.samples.len() as u64 >= self.budget {
            return;
        }
        self.samples.push(latency_us);
        let _ = self.hist.record(latency_us.max(0) as u64);
    }

    pub fn finished(&self) -> u64 {
        self.samples.len() as u64
    }

    pub fn is_complete(&self) -> bool {
        self.finished() >= self.budget
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    /// Ascending-sorted copy of every recorded sample.
    pub fn sorted(&self) -> Vec<i64> {
        let mut s = self.samples.clone();
        s.sort_unstable();
        s
    }

    pub fn sum_us(&self) -> i64 {
        self.samples.iter().sum()
    }

    pub fn count_beyond_ms(&self, threshold_ms: u64) -> u64 {
        if threshold_ms == 0 {
            return 0;
        }
        let threshold_us = (threshold_ms * 1000) as i64;
        self.samples.iter().filter(|&&us| us > threshold_us).count() as u64
    }

    /// Ambient percentile read via the hdrhistogram collector, independent of
    /// the documented sort-and-walk report.
    pub fn hdr_percentile_us(&self, pct: f64) -> u64 {
        self.hist.value_at_percentile(pct)
    }
}
