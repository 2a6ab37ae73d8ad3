//! Readiness Loop + Benchmark Runner: drives every open connection through
//! the write→read cycle on a single `mio` event loop, and implements the
//! Lifecycle Controller that keeps the client pool full as the
//! global request budget is drained.
//!
//! This is built directly on `mio`'s `Poll`/`Token`/`Interest` rather than an
//! async executor: the benchmark core runs on a single thread with no
//! suspension point other than the readiness wait itself, which a
//! task-per-connection runtime cannot express.

use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

use mio::{Events, Interest, Poll, Token};

use crate::cli::RunConfig;
use crate::client::{BenchmarkClient, ReadEvent, WriteOutcome};
use crate::error::{RunError, RunResult};
use crate::latency::LatencyRecorder;
use crate::reporter::Reporter;
use crate::templates::{self, TemplateSource};

const TICK: Duration = Duration::from_millis(250);
const REPLACEMENT_YIELD_EVERY: u32 = 64;

pub struct BenchmarkRunner {
    cfg: RunConfig,
}

impl BenchmarkRunner {
    pub fn new(cfg: RunConfig) -> Self {
        Self { cfg }
    }

    pub fn run(&self) -> RunResult<()> {
        crate::utils::ignore_disruptive_signals();
        loop {
            if self.cfg.idle {
                self.run_idle()?;
            } else {
                for template in templates::resolve(&self.cfg) {
                    let recorder = self.run_benchmark(&template)?;
                    let reporter = Reporter::new(
                        template.title(),
                        self.cfg.output_mode,
                        false,
                        self.cfg.max_latency_ms,
                        self.cfg.clients,
                        self.cfg.data_size,
                        self.cfg.keepalive,
                    );
                    reporter.finish(&recorder);
                }
            }
            if !self.cfg.loop_forever {
                break;
            }
        }
        Ok(())
    }

    /// `-I`: open the client pool and wait without ever issuing a request.
    fn run_idle(&self) -> RunResult<()> {
        let mut poll = Poll::new().map_err(io_err)?;
        let mut events = Events::with_capacity(256);
        let mut clients: HashMap<usize, BenchmarkClient> = HashMap::new();
        let mut next_token = 0usize;

        let probe = b"PING\r\n".to_vec();
        let seed = BenchmarkClient::new_seed(&self.cfg, &probe).map_err(connect_err(&self.cfg))?;
        register(&mut poll, &mut clients, &mut next_token, seed, Interest::READABLE)?;

        while clients.len() < self.cfg.clients {
            let new_client = {
                let seed = clients.get(&0).expect("seed client present");
                BenchmarkClient::new_clone(&self.cfg, seed).map_err(connect_err(&self.cfg))?
            };
            register(&mut poll, &mut clients, &mut next_token, new_client, Interest::READABLE)?;
        }

        let reporter = Reporter::new(
            "idle",
            self.cfg.output_mode,
            true,
            self.cfg.max_latency_ms,
            self.cfg.clients,
            self.cfg.data_size,
            self.cfg.keepalive,
        );
        // Wait out one readiness tick so the progress line has something to
        // report against, then stop: idle mode never issues requests, so
        // there is no completion condition to wait for beyond that.
        let _ = poll.poll(&mut events, Some(TICK));
        reporter.tick(clients.len(), 0);
        reporter.finish_idle(clients.len());
        Ok(())
    }

    /// Runs one benchmark to completion and returns its populated latency
    /// recorder, without printing a report — callers decide how (or
    /// whether) to report the result. [`BenchmarkRunner::run`] wraps this
    /// with the default stdout report.
    pub fn run_benchmark(&self, template: &TemplateSource) -> RunResult<LatencyRecorder> {
        let cfg = &self.cfg;
        let title = template.title().to_string();
        let frame = template.build_frame(cfg);

        let mut poll = Poll::new().map_err(io_err)?;
        let mut events = Events::with_capacity(1024);
        let mut rng = rand::thread_rng();
        let mut clients: HashMap<usize, BenchmarkClient> = HashMap::new();
        let mut next_token = 0usize;
        let mut requests_issued: u64 = 0;
        let mut recorder = LatencyRecorder::new(cfg.requests);
        let mut last_error_print = Instant::now() - Duration::from_secs(2);
        let mut last_tick = Instant::now();

        let seed = BenchmarkClient::new_seed(cfg, &frame).map_err(connect_err(cfg))?;
        register(&mut poll, &mut clients, &mut next_token, seed, Interest::WRITABLE)?;

        while clients.len() < cfg.clients {
            let new_client = {
                let seed = clients.get(&0).expect("seed client present");
                BenchmarkClient::new_clone(cfg, seed).map_err(connect_err(cfg))?
            };
            register(&mut poll, &mut clients, &mut next_token, new_client, Interest::WRITABLE)?;
        }

        let reporter = Reporter::new(
            &title,
            cfg.output_mode,
            false,
            cfg.max_latency_ms,
            cfg.clients,
            cfg.data_size,
            cfg.keepalive,
        );

        'outer: loop {
            poll.poll(&mut events, Some(TICK)).map_err(io_err)?;

            let mut to_destroy: Vec<usize> = Vec::new();

            for event in events.iter() {
                let token = event.token().0;
                let mut err: Option<io::Error> = None;
                let mut epipe = false;
                let mut budget_exhausted = false;

                if let Some(client) = clients.get_mut(&token) {
                    if event.is_writable() && !client.write_complete() {
                        match client.on_writable(cfg, &mut requests_issued, &mut rng) {
                            WriteOutcome::Progressed => {
                                if client.write_complete() {
                                    let _ = poll.registry().reregister(
                                        &mut client.stream,
                                        Token(token),
                                        Interest::READABLE,
                                    );
                                }
                            }
                            WriteOutcome::BudgetExhausted => budget_exhausted = true,
                            WriteOutcome::Epipe => epipe = true,
                            WriteOutcome::Fatal(e) => err = Some(e),
                        }
                    }

                    if err.is_none() && !epipe && !budget_exhausted && event.is_readable() {
                        match client.on_readable() {
                            Ok(read_events) => {
                                for ev in read_events {
                                    match ev {
                                        ReadEvent::PrefixConsumed => {}
                                        ReadEvent::Sample(latency) => recorder.record(latency),
                                        ReadEvent::ServerError(msg) => {
                                            if cfg.show_errors {
                                                if last_error_print.elapsed() >= Duration::from_secs(1)
                                                {
                                                    eprintln!("server error: {}", msg);
                                                    last_error_print = Instant::now();
                                                }
                                            } else {
                                                return Err(RunError::ServerError(msg));
                                            }
                                        }
                                    }
                                }
                            }
                            // A read/parse failure is fatal to the whole run, not just this
                            // connection: it signals the byte stream can no longer be trusted.
                            Err(e) => return Err(RunError::Io(e.to_string())),
                        }
                    }
                }

                // Write errors, EPIPE, and budget exhaustion destroy only this
                // connection; none of them spawns a replacement, matching the C
                // source's EPIPE handling in its write callback (replacements are
                // only created on ordinary pipeline completion, handled below).
                if let Some(e) = err {
                    tracing::warn!("connection {} failed: {}", token, e);
                    to_destroy.push(token);
                } else if epipe || budget_exhausted {
                    to_destroy.push(token);
                }
            }

            for token in to_destroy {
                if let Some(mut c) = clients.remove(&token) {
                    let _ = poll.registry().deregister(&mut c.stream);
                }
            }

            let finished: Vec<usize> = clients
                .iter()
                .filter(|(_, c)| c.pipeline_complete())
                .map(|(t, _)| *t)
                .collect();

            for token in finished {
                if recorder.is_complete() {
                    if let Some(mut c) = clients.remove(&token) {
                        let _ = poll.registry().deregister(&mut c.stream);
                    }
                    continue;
                }

                if cfg.keepalive {
                    if let Some(client) = clients.get_mut(&token) {
                        client.reset_for_reuse();
                        let _ = poll.registry().reregister(
                            &mut client.stream,
                            Token(token),
                            Interest::WRITABLE,
                        );
                    }
                } else {
                    // Spawn replacements before destroying the finished client
                    // (decided ordering for the keep-alive-off case).
                    self.spawn_replacements(&mut poll, &mut clients, &mut next_token, token)?;
                    if let Some(mut c) = clients.remove(&token) {
                        let _ = poll.registry().deregister(&mut c.stream);
                    }
                }
            }

            if recorder.is_complete() {
                break 'outer;
            }

            if clients.is_empty() {
                return Err(RunError::Io(format!(
                    "{}: all clients disconnected before the request budget was satisfied",
                    title
                )));
            }

            if last_tick.elapsed() >= TICK {
                reporter.tick(clients.len(), recorder.finished());
                last_tick = Instant::now();
            }
        }

        Ok(recorder)
    }

    /// Spawns enough clones of `seed_token` to restore `live_clients` to `C`,
    /// yielding briefly every 64 spawns to avoid overrunning the listen
    /// backlog.
    fn spawn_replacements(
        &self,
        poll: &mut Poll,
        clients: &mut HashMap<usize, BenchmarkClient>,
        next_token: &mut usize,
        seed_token: usize,
    ) -> RunResult<()> {
        let cfg = &self.cfg;
        let deficit = cfg.clients.saturating_sub(clients.len());
        let mut spawned = 0u32;
        for _ in 0..deficit {
            let new_client = {
                let seed = match clients.get(&seed_token) {
                    Some(c) => c,
                    None => break,
                };
                BenchmarkClient::new_clone(cfg, seed).map_err(connect_err(cfg))?
            };
            register(poll, clients, next_token, new_client, Interest::WRITABLE)?;
            spawned += 1;
            if spawned % REPLACEMENT_YIELD_EVERY == 0 {
                std::thread::yield_now();
            }
        }
        Ok(())
    }
}

fn register(
    poll: &mut Poll,
    clients: &mut HashMap<usize, BenchmarkClient>,
    next_token: &mut usize,
    mut client: BenchmarkClient,
    interest: Interest,
) -> RunResult<()> {
    let token = *next_token;
    *next_token += 1;
    poll.registry()
        .register(&mut client.stream, Token(token), interest)
        .map_err(io_err)?;
    clients.insert(token, client);
    Ok(())
}

fn io_err(e: io::Error) -> RunError {
    RunError::Io(e.to_string())
}

fn connect_err(cfg: &RunConfig) -> impl Fn(io::Error) -> RunError + '_ {
    move |e| RunError::Connect {
        endpoint: endpoint_desc(cfg),
        source: e,
    }
}

fn endpoint_desc(cfg: &RunConfig) -> String {
    match &cfg.endpoint {
        crate::cli::Endpoint::Tcp { host, port } => format!("{}:{}", host, port),
        crate::cli::Endpoint::Unix(path) => path.clone(),
    }
}
