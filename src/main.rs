//! # RESP Benchmark — Main Entry Point
//!
//! Parses the command line, wires up diagnostics logging, builds the
//! immutable run configuration, and drives the benchmark runner to
//! completion, converting any failure into the documented exit code.
//!
//! ## Concurrency model
//!
//! Unlike most of this tool's ambient setup (logging, CLI parsing), the
//! benchmark core itself runs entirely on a single thread: one readiness
//! loop per benchmark, with no task spawning.

use std::process::ExitCode;

use clap::Parser;
use resp_bench::cli::{Args, RunConfig};
use resp_bench::runner::BenchmarkRunner;
use resp_bench::RunError;
use tracing::{error, info};
use tracing_subscriber::{filter::LevelFilter, prelude::*, Layer};

mod logging;
use logging::DiagnosticsFormatter;

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    ExitCode::SUCCESS
                }
                _ => ExitCode::FAILURE,
            };
        }
    };

    let _log_guard = init_logging(&args);

    let config = match RunConfig::from_args(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("starting benchmark run against {}", endpoint_summary(&config));

    let runner = BenchmarkRunner::new(config);
    match runner.run() {
        Ok(()) => {
            info!("benchmark run completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("benchmark run failed: {}", e);
            eprintln!("{}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

fn exit_code_for(e: &RunError) -> u8 {
    e.exit_code() as u8
}

fn endpoint_summary(cfg: &RunConfig) -> String {
    match &cfg.endpoint {
        resp_bench::cli::Endpoint::Tcp { host, port } => format!("{}:{}", host, port),
        resp_bench::cli::Endpoint::Unix(path) => path.clone(),
    }
}

/// Sets up the diagnostics layer: a detailed sink (file or stderr) gated by
/// `--verbose` count, plus a clean colorized stdout mirror that is
/// suppressed whenever the benchmark report itself owns stdout (`-q`/`--csv`).
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = match args.verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let guard;
    let detailed_layer;

    if let Some("stderr") = args.log_file.as_deref() {
        detailed_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(log_level)
            .boxed();
        guard = None;
    } else {
        let file_appender = match args.log_file.as_deref() {
            Some(path_str) => {
                let log_path = std::path::Path::new(path_str);
                let log_dir = log_path.parent().unwrap_or_else(|| std::path::Path::new("."));
                let log_filename = log_path
                    .file_name()
                    .unwrap_or_else(|| std::ffi::OsStr::new("resp-bench.log"));
                tracing_appender::rolling::daily(log_dir, log_filename)
            }
            None => tracing_appender::rolling::daily(".", "resp-bench.log"),
        };
        let (non_blocking_writer, file_guard) = tracing_appender::non_blocking(file_appender);
        detailed_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_writer)
            .with_ansi(false)
            .with_filter(log_level)
            .boxed();
        guard = Some(file_guard);
    }

    let quiet_stdout = args.quiet || args.csv;
    let stdout_log = if !quiet_stdout {
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .event_format(DiagnosticsFormatter)
                .with_filter(log_level),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(detailed_layer)
        .with(stdout_log)
        .init();

    guard
}
