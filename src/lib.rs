//! # RESP Benchmark
//!
//! A pipelined load-generating benchmark client for RESP-speaking
//! (length-prefixed multi-bulk, CRLF-terminated) key-value servers. Spawns a
//! pool of connections driven by a single-threaded readiness loop, issues a
//! fixed total number of requests of a chosen command template, and reports
//! per-request latency distribution and throughput.

pub mod cli;
pub mod client;
pub mod connection;
pub mod error;
pub mod latency;
pub mod reporter;
pub mod resp;
pub mod runner;
pub mod templates;
pub mod utils;

pub use cli::{Args, RunConfig};
pub use error::{RunError, RunResult};
pub use runner::BenchmarkRunner;

/// The current version of the benchmark tool.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values, mirrored from the CLI's `#[arg(default_value...)]`
/// attributes so library consumers can reference them without constructing `Args`.
pub mod defaults {
    pub const CLIENTS: usize = 50;
    pub const REQUESTS: u64 = 100_000;
    pub const DATA_SIZE: usize = 3;
    pub const PIPELINE: usize = 1;
    pub const PORT: u16 = 6379;
    pub const KEY_PREFIX: &str = "__rand_int__";
    pub const SUBKEY_COUNT: usize = 10;
}
