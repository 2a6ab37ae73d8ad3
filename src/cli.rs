//! Command-line surface and the immutable [`RunConfig`] it is converted into.
//!
//! `Args` maps directly onto the documented flag table; `RunConfig::from_args`
//! performs every clamp/coercion/validation so the rest of the crate only
//! ever sees already-valid, already-resolved values.

use std::collections::HashSet;

use clap::Parser;
use clap::builder::styling::{AnsiColor, Styles};

use crate::error::RunError;
use crate::templates::{TestFilter, CATALOG};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Yellow.on_default())
        .usage(AnsiColor::Yellow.on_default())
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Cyan.on_default())
}

/// Command-line arguments for the benchmark tool.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "resp-bench",
    about = "Load-generating benchmark client for RESP-speaking key-value servers",
    styles = styles(),
    disable_help_flag = true
)]
pub struct Args {
    /// Server hostname.
    #[arg(short = 'h', long = "host", default_value = "127.0.0.1")]
    pub host: String,

    /// Print help and exit.
    #[arg(long = "help", action = clap::ArgAction::Help)]
    help: Option<bool>,

    /// TCP port.
    #[arg(short = 'p', long = "port", default_value_t = 6379)]
    pub port: u16,

    /// Local socket path; overrides host/port when present.
    #[arg(short = 's', long = "socket")]
    pub socket: Option<String>,

    /// Parallel connections.
    #[arg(short = 'c', long = "clients", default_value_t = 50)]
    pub clients: usize,

    /// Total number of requests.
    #[arg(short = 'n', long = "requests", default_value_t = 100_000)]
    pub requests: u64,

    /// Payload size in bytes.
    #[arg(short = 'd', long = "data-size", default_value_t = 3)]
    pub data_size: usize,

    /// Keep-alive: 0 or 1.
    #[arg(short = 'k', long = "keepalive", default_value_t = 1)]
    pub keepalive: u8,

    /// Pipeline depth.
    #[arg(short = 'P', long = "pipeline", default_value_t = 1)]
    pub pipeline: usize,

    /// Random-keys keyspace bound; presence enables randomization.
    #[arg(short = 'r', long = "random-keys")]
    pub random_keys: Option<u64>,

    /// Quiet: one line per benchmark.
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// CSV output.
    #[arg(long = "csv")]
    pub csv: bool,

    /// Loop the suite forever.
    #[arg(short = 'l', long = "loop")]
    pub loop_forever: bool,

    /// Idle: open connections, issue no requests.
    #[arg(short = 'I', long = "idle")]
    pub idle: bool,

    /// Show server errors, rate-limited to one per second.
    #[arg(short = 'e', long = "show-errors")]
    pub show_errors: bool,

    /// Comma-separated test-name filter.
    #[arg(short = 't', long = "tests")]
    pub tests: Option<String>,

    /// Max-latency threshold in milliseconds for the beyond-threshold counter.
    #[arg(short = 'm', long = "max-latency-ms", default_value_t = 0)]
    pub max_latency_ms: u64,

    /// INCRBY/HINCRBY increment (and ZRANGEBYSCORE LIMIT count).
    #[arg(short = 'v', long = "increment", default_value_t = 1)]
    pub increment: i64,

    /// SELECT <N> at connect time.
    #[arg(long = "dbnum", default_value_t = 0)]
    pub dbnum: u64,

    /// Custom key-prefix token.
    #[arg(long = "kp", default_value = "__rand_int__")]
    pub key_prefix: String,

    /// Subkey count for multi-field tests.
    #[arg(long = "sk", default_value_t = 10)]
    pub subkey_count: usize,

    /// Diagnostics verbosity; repeatable. Independent of `-q`/`--csv`, which
    /// govern the benchmark report, not the diagnostics layer.
    #[arg(long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Diagnostics sink: a file path, or the literal "stderr".
    #[arg(long = "log-file")]
    pub log_file: Option<String>,

    /// Trailing tokens: when present, the first is the command selector and
    /// the rest are its literal argv, replacing the built-in catalog.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<String>,
}

/// Either a TCP host/port pair or a local (Unix domain) socket path.
#[derive(Debug, Clone)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Unix(String),
}

/// Output mode for the benchmark report. Independent of the
/// diagnostics layer's verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Default,
    Quiet,
    Csv,
}

/// The fully-resolved, immutable configuration every component below the
/// CLI boundary reads from.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub endpoint: Endpoint,
    pub clients: usize,
    pub requests: u64,
    pub data_size: usize,
    pub keepalive: bool,
    pub pipeline: usize,
    pub random_keys: bool,
    pub random_keyspace: u64,
    pub output_mode: OutputMode,
    pub loop_forever: bool,
    pub idle: bool,
    pub show_errors: bool,
    pub test_filter: TestFilter,
    pub max_latency_ms: u64,
    pub increment: i64,
    pub dbnum: u64,
    pub key_prefix: String,
    pub subkey_count: usize,
    pub verbose: u8,
    pub log_file: Option<String>,
    pub literal_template: Option<(String, Vec<Vec<u8>>)>,
}

const MAX_DATA_SIZE: usize = 1 << 30;

impl RunConfig {
    pub fn from_args(args: &Args) -> Result<Self, RunError> {
        if args.key_prefix.is_empty() {
            return Err(RunError::Usage("--kp key-prefix must not be empty".into()));
        }

        let endpoint = match &args.socket {
            Some(path) => Endpoint::Unix(path.clone()),
            None => Endpoint::Tcp {
                host: args.host.clone(),
                port: args.port,
            },
        };

        let data_size = args.data_size.clamp(1, MAX_DATA_SIZE);
        let pipeline = args.pipeline.max(1);
        let subkey_count = if args.subkey_count < 1 {
            10
        } else {
            args.subkey_count
        };
        let keepalive = args.keepalive != 0;

        let (random_keys, random_keyspace) = match args.random_keys {
            Some(l) => (true, l),
            None => (false, 0),
        };

        let output_mode = if args.csv {
            OutputMode::Csv
        } else if args.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Default
        };

        let test_filter = match &args.tests {
            None => TestFilter::All,
            Some(list) => {
                let mut names = HashSet::new();
                for raw in list.split(',') {
                    let name = raw.trim().to_lowercase();
                    if name.is_empty() {
                        continue;
                    }
                    if !CATALOG.iter().any(|e| e.name == name) {
                        return Err(RunError::Usage(format!("unknown test name '{}'", name)));
                    }
                    names.insert(name);
                }
                if names.is_empty() {
                    TestFilter::All
                } else {
                    TestFilter::Named(names)
                }
            }
        };

        let literal_template = if args.rest.is_empty() {
            None
        } else {
            let title = args.rest[0].to_uppercase();
            let argv = args.rest.iter().map(|s| s.clone().into_bytes()).collect();
            Some((title, argv))
        };

        Ok(RunConfig {
            endpoint,
            clients: args.clients.max(1),
            requests: args.requests,
            data_size,
            keepalive,
            pipeline,
            random_keys,
            random_keyspace,
            output_mode,
            loop_forever: args.loop_forever,
            idle: args.idle,
            show_errors: args.show_errors,
            test_filter,
            max_latency_ms: args.max_latency_ms,
            increment: args.increment,
            dbnum: args.dbnum,
            key_prefix: args.key_prefix.clone(),
            subkey_count,
            verbose: args.verbose,
            log_file: args.log_file.clone(),
            literal_template,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        let mut full = vec!["resp-bench"];
        full.extend_from_slice(argv);
        Args::parse_from(full)
    }

    #[test]
    fn data_size_clamps_to_the_documented_bounds() {
        let cfg = RunConfig::from_args(&parse(&["-d", "0"])).unwrap();
        assert_eq!(cfg.data_size, 1);

        let cfg = RunConfig::from_args(&parse(&["-d", "4294967296"])).unwrap();
        assert_eq!(cfg.data_size, 1 << 30);
    }

    #[test]
    fn pipeline_is_coerced_to_at_least_one() {
        let cfg = RunConfig::from_args(&parse(&["-P", "0"])).unwrap();
        assert_eq!(cfg.pipeline, 1);
    }

    #[test]
    fn random_keys_zero_is_a_no_op_window_not_a_usage_error() {
        let cfg = RunConfig::from_args(&parse(&["-r", "0"])).unwrap();
        assert!(cfg.random_keys);
        assert_eq!(cfg.random_keyspace, 0);
    }

    #[test]
    fn empty_key_prefix_is_a_usage_error() {
        let err = RunConfig::from_args(&parse(&["--kp", ""])).unwrap_err();
        assert!(matches!(err, RunError::Usage(_)));
    }

    #[test]
    fn socket_path_overrides_host_and_port() {
        let cfg = RunConfig::from_args(&parse(&["-s", "/tmp/x.sock", "-h", "example"])).unwrap();
        assert!(matches!(cfg.endpoint, Endpoint::Unix(ref p) if p == "/tmp/x.sock"));
    }

    #[test]
    fn csv_takes_precedence_over_quiet() {
        let cfg = RunConfig::from_args(&parse(&["--csv", "-q"])).unwrap();
        assert_eq!(cfg.output_mode, OutputMode::Csv);
    }

    #[test]
    fn trailing_tokens_become_a_literal_template() {
        let cfg =
            RunConfig::from_args(&parse(&["-r", "100", "-n", "10", "lpush", "mylist", "__rand_int__"]))
                .unwrap();
        let (title, argv) = cfg.literal_template.expect("literal template");
        assert_eq!(title, "LPUSH");
        assert_eq!(argv[1], b"mylist");
    }

    #[test]
    fn unknown_test_name_is_a_usage_error() {
        let err = RunConfig::from_args(&parse(&["-t", "nonexistent"])).unwrap_err();
        assert!(matches!(err, RunError::Usage(_)));
    }
}
