//! Reporter: sorts the latency array, walks it into cumulative percentile
//! lines, and prints the periodic and final benchmark report.
//!
//! This output is a documented wire-like contract (carriage-return progress
//! updates, an exact CSV line) and is therefore written directly to stdout,
//! never routed through the `tracing` diagnostics layer.

use std::io::Write;
use std::time::Instant;

use crate::cli::OutputMode;
use crate::latency::LatencyRecorder;

/// One cumulative percentile line: `P% <= Mms`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentileLine {
    pub pct: f64,
    pub ms: i64,
}

/// Walks the ascending-sorted latency array and emits one line per
/// millisecond bucket boundary.
pub fn percentile_lines(sorted_us: &[i64]) -> Vec<PercentileLine> {
    let n = sorted_us.len();
    if n == 0 {
        return Vec::new();
    }
    let mut lines = Vec::new();
    let mut prev_ms: Option<i64> = None;
    for (i, &us) in sorted_us.iter().enumerate() {
        let ms = us / 1000;
        let is_last = i == n - 1;
        if prev_ms != Some(ms) || is_last {
            let pct = 100.0 * (i as f64 + 1.0) / n as f64;
            lines.push(PercentileLine { pct, ms });
            prev_ms = Some(ms);
        }
    }
    lines
}

/// `N / (sum_of_latency_us / 1e6)`, preserved verbatim from the original
/// definition: throughput is derived from summed request time, not
/// wall-clock elapsed.
pub fn throughput_rps(requests: u64, sum_latency_us: i64) -> f64 {
    if sum_latency_us <= 0 {
        return 0.0;
    }
    requests as f64 / (sum_latency_us as f64 / 1_000_000.0)
}

/// Drives the periodic (250ms) and final report for one benchmark title.
pub struct Reporter {
    title: String,
    mode: OutputMode,
    idle: bool,
    max_latency_ms: u64,
    clients: usize,
    data_size: usize,
    keepalive: bool,
    started_at: Instant,
}

impl Reporter {
    pub fn new(
        title: impl Into<String>,
        mode: OutputMode,
        idle: bool,
        max_latency_ms: u64,
        clients: usize,
        data_size: usize,
        keepalive: bool,
    ) -> Self {
        Self {
            title: title.into(),
            mode,
            idle,
            max_latency_ms,
            clients,
            data_size,
            keepalive,
            started_at: Instant::now(),
        }
    }

    /// Called on the loop thread every 250ms. `live_clients` and
    /// `requests_finished` are read from the shared run state.
    pub fn tick(&self, live_clients: usize, requests_finished: u64) {
        if self.mode == OutputMode::Csv {
            return;
        }
        let mut out = std::io::stdout();
        if self.idle {
            let _ = write!(out, "\rclients: {}", live_clients);
        } else {
            let elapsed = self.started_at.elapsed().as_secs_f64().max(1e-9);
            let rps = requests_finished as f64 / elapsed;
            let _ = write!(out, "\r{}: {:.2}", self.title, rps);
        }
        let _ = out.flush();
    }

    /// Prints the final report for a completed (non-idle) benchmark.
    pub fn finish(&self, recorder: &LatencyRecorder) {
        let elapsed = self.started_at.elapsed();
        match self.mode {
            OutputMode::Csv => {
                let rps = throughput_rps(recorder.budget(), recorder.sum_us());
                println!("\"{}\",\"{:.2}\"", self.title, rps);
            }
            OutputMode::Quiet => {
                let rps = throughput_rps(recorder.budget(), recorder.sum_us());
                println!("{}: {:.2} requests per second", self.title, rps);
            }
            OutputMode::Default => {
                println!();
                for line in percentile_lines(&recorder.sorted()) {
                    println!("{:.2}% <= {} milliseconds", line.pct, line.ms);
                }
                let beyond = recorder.count_beyond_ms(self.max_latency_ms);
                if self.max_latency_ms > 0 {
                    println!(
                        "{} requests exceeded the {}ms latency threshold",
                        beyond, self.max_latency_ms
                    );
                }
                let rps = throughput_rps(recorder.budget(), recorder.sum_us());
                println!("{}: {:.2} requests per second", self.title, rps);
                println!("  {} parallel clients", self.clients);
                println!("  {} bytes payload", self.data_size);
                println!("  keep alive: {}", self.keepalive as u8);
                println!("  {:.3} seconds elapsed", elapsed.as_secs_f64());
            }
        }
    }

    /// Prints the idle-mode progress line once and returns without a
    /// latency report, per the `-I` contract (no requests are ever issued).
    pub fn finish_idle(&self, live_clients: usize) {
        if self.mode != OutputMode::Csv {
            println!("\nclients: {}", live_clients);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_lines_are_monotonic_and_end_at_100_percent() {
        let sorted = vec![1_000, 1_200, 1_200, 2_500, 3_000];
        let lines = percentile_lines(&sorted);
        assert!(lines.windows(2).all(|w| w[0].pct <= w[1].pct));
        let last = lines.last().unwrap();
        assert!(last.pct >= 99.99);
    }

    #[test]
    fn percentile_lines_collapse_same_millisecond_bucket() {
        let sorted = vec![1_000, 1_050, 1_099];
        let lines = percentile_lines(&sorted);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].pct, 100.0);
    }

    #[test]
    fn empty_array_yields_no_lines() {
        assert!(percentile_lines(&[]).is_empty());
    }

    #[test]
    fn throughput_uses_summed_latency_not_wallclock() {
        // 10 requests, 1ms average latency -> 10_000us total -> 1000 rps.
        let rps = throughput_rps(10, 10_000);
        assert!((rps - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn throughput_is_zero_when_no_latency_was_recorded() {
        assert_eq!(throughput_rps(10, 0), 0.0);
    }
}
