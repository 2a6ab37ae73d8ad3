//! Benchmark Client: one per live connection. Owns the prepared output
//! buffer, the randomization offsets into it, write/read progress, and the
//! in-flight pipeline's timing state.

use std::io::{self, ErrorKind, Read, Write};

use crate::cli::RunConfig;
use crate::connection::StreamHandle;
use crate::resp::{Reply, ReplyParser};
use crate::utils::{fill_random, now_us};

/// Outcome of a single write-readiness callback, for the Runner to act on.
pub enum WriteOutcome {
    /// Write is incomplete or complete; client stays alive.
    Progressed,
    /// This client's share of the global request budget is exhausted.
    BudgetExhausted,
    /// `EPIPE` — silent; client must be destroyed without logging
    /// it as a fatal error.
    Epipe,
    /// Any other write error; fatal to this connection.
    Fatal(io::Error),
}

/// One reply accepted into the latency array, or a prefix reply consumed
/// and discarded, or the signal that the pipeline just completed.
pub enum ReadEvent {
    PrefixConsumed,
    Sample(i64),
    ServerError(String),
}

pub struct BenchmarkClient {
    pub stream: StreamHandle,
    pub obuf: Vec<u8>,
    pub prefixlen: usize,
    pub prefix_pending: u32,
    pub randptr: Vec<usize>,
    pub written: usize,
    pub pending: u32,
    pub start_us: i64,
    pub latency_us: i64,
    parser: ReplyParser,
    pipeline: usize,
}

impl BenchmarkClient {
    /// Builds the seed client: opens the connection, prepends the SELECT
    /// prefix if `dbnum != 0`, repeats `frame` `pipeline` times, and scans
    /// for every key-prefix occurrence.
    pub fn new_seed(cfg: &RunConfig, frame: &[u8]) -> io::Result<Self> {
        let stream = StreamHandle::connect(&cfg.endpoint)?;
        set_nonblocking(&stream)?;

        let mut obuf = Vec::new();
        let (prefixlen, prefix_pending) = if cfg.dbnum != 0 {
            let select = crate::resp::format_argv(&[b"SELECT", cfg.dbnum.to_string().as_bytes()]);
            obuf.extend_from_slice(&select);
            (select.len(), 1)
        } else {
            (0, 0)
        };

        for _ in 0..cfg.pipeline {
            obuf.extend_from_slice(frame);
        }

        let randptr = if cfg.random_keys {
            find_key_prefix_offsets(&obuf, cfg.key_prefix.as_bytes())
        } else {
            Vec::new()
        };

        Ok(Self {
            stream,
            obuf,
            prefixlen,
            prefix_pending,
            randptr,
            written: 0,
            pending: cfg.pipeline as u32 + prefix_pending,
            start_us: -1,
            latency_us: -1,
            parser: ReplyParser::new(),
            pipeline: cfg.pipeline,
        })
    }

    /// Builds a clone from `seed`: a fresh connection, the seed's prefix
    /// handling repeated against this connection, the seed's post-prefix
    /// bytes copied verbatim, and `randptr` translated for any prefix-length
    /// difference.
    pub fn new_clone(cfg: &RunConfig, seed: &BenchmarkClient) -> io::Result<Self> {
        let stream = StreamHandle::connect(&cfg.endpoint)?;
        set_nonblocking(&stream)?;

        let mut obuf = Vec::new();
        let (prefixlen, prefix_pending) = if cfg.dbnum != 0 {
            let select = crate::resp::format_argv(&[b"SELECT", cfg.dbnum.to_string().as_bytes()]);
            obuf.extend_from_slice(&select);
            (select.len(), 1)
        } else {
            (0, 0)
        };

        obuf.extend_from_slice(&seed.obuf[seed.prefixlen..]);

        let offset_delta = prefixlen as isize - seed.prefixlen as isize;
        let randptr = seed
            .randptr
            .iter()
            .map(|&o| (o as isize + offset_delta) as usize)
            .collect();

        Ok(Self {
            stream,
            obuf,
            prefixlen,
            prefix_pending,
            randptr,
            written: 0,
            pending: cfg.pipeline as u32 + prefix_pending,
            start_us: -1,
            latency_us: -1,
            parser: ReplyParser::new(),
            pipeline: cfg.pipeline,
        })
    }

    /// Resets this client for another pipeline after a keep-alive reuse
    /// Does not touch the connection or buffer contents.
    pub fn reset_for_reuse(&mut self) {
        self.written = 0;
        self.pending = self.pipeline as u32;
    }

    /// The write-readiness callback.
    pub fn on_writable(
        &mut self,
        cfg: &RunConfig,
        requests_issued: &mut u64,
        rng: &mut impl rand::Rng,
    ) -> WriteOutcome {
        if self.written == 0 {
            let before = *requests_issued;
            *requests_issued += 1;
            if before >= cfg.requests {
                return WriteOutcome::BudgetExhausted;
            }
            if cfg.random_keys {
                for &offset in &self.randptr {
                    let len = cfg
                        .random_keyspace
                        .min(crate::templates::KEY_WINDOW_LEN as u64) as usize;
                    if len > 0 {
                        let window = offset + cfg.key_prefix.len();
                        fill_random(&mut self.obuf, window, len, rng);
                    }
                }
            }
            self.start_us = now_us();
            self.latency_us = -1;
        }

        loop {
            match self.stream.write(&self.obuf[self.written..]) {
                Ok(0) => return WriteOutcome::Fatal(io::Error::new(ErrorKind::WriteZero, "wrote zero bytes")),
                Ok(n) => {
                    self.written += n;
                    if self.written == self.obuf.len() {
                        return WriteOutcome::Progressed;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return WriteOutcome::Progressed,
                Err(e) if e.kind() == ErrorKind::BrokenPipe => return WriteOutcome::Epipe,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return WriteOutcome::Fatal(e),
            }
        }
    }

    pub fn write_complete(&self) -> bool {
        self.written == self.obuf.len()
    }

    /// The read-readiness callback. Reads all available bytes and
    /// drains as many complete replies as the parser yields, recording one
    /// `ReadEvent` per reply.
    pub fn on_readable(&mut self) -> io::Result<Vec<ReadEvent>> {
        if self.latency_us < 0 {
            self.latency_us = now_us() - self.start_us;
        }

        let mut buf = [0u8; 16 * 1024];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => self.parser.feed(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        let mut events = Vec::new();
        loop {
            let reply = self
                .parser
                .next_reply()
                .map_err(|e| io::Error::new(ErrorKind::InvalidData, e.to_string()))?;
            let reply = match reply {
                Some(r) => r,
                None => break,
            };

            if let Reply::Error(msg) = &reply {
                events.push(ReadEvent::ServerError(msg.clone()));
            }

            if self.prefix_pending > 0 {
                self.prefix_pending -= 1;
                self.pending -= 1;
                events.push(ReadEvent::PrefixConsumed);
                if self.prefix_pending == 0 {
                    self.excise_prefix();
                }
            } else {
                events.push(ReadEvent::Sample(self.latency_us));
                self.pending -= 1;
            }
        }

        Ok(events)
    }

    pub fn pipeline_complete(&self) -> bool {
        self.pending == 0
    }

    fn excise_prefix(&mut self) {
        self.obuf.drain(0..self.prefixlen);
        for offset in &mut self.randptr {
            *offset -= self.prefixlen;
        }
        self.written = self.written.saturating_sub(self.prefixlen);
        self.prefixlen = 0;
    }
}

fn set_nonblocking(stream: &StreamHandle) -> io::Result<()> {
    // mio's TcpStream/UnixStream are already nonblocking from connect(); this
    // exists purely as a documented seam so a future endpoint kind can't
    // silently skip the nonblocking requirement the rest of this module assumes.
    let _ = stream;
    Ok(())
}

fn find_key_prefix_offsets(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    if needle.is_empty() {
        return Vec::new();
    }
    let mut offsets = Vec::new();
    let mut start = 0;
    while start + needle.len() <= haystack.len() {
        if &haystack[start..start + needle.len()] == needle {
            offsets.push(start);
            start += needle.len() + crate::templates::KEY_WINDOW_LEN;
        } else {
            start += 1;
        }
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_every_key_prefix_occurrence() {
        let buf = b"SET __rand_int__000000000000 __rand_int__000000000000";
        let offsets = find_key_prefix_offsets(buf, b"__rand_int__");
        assert_eq!(offsets.len(), 2);
        assert_eq!(offsets[0], 4);
    }

    #[test]
    fn empty_needle_yields_no_offsets() {
        assert!(find_key_prefix_offsets(b"anything", b"").is_empty());
    }

    #[test]
    fn on_writable_randomizes_the_padding_not_the_key_prefix_text() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let port = listener.local_addr().unwrap().port();

        let args = <crate::cli::Args as clap::Parser>::parse_from(["resp-bench"]);
        let mut cfg = RunConfig::from_args(&args).unwrap();
        cfg.random_keys = true;
        cfg.random_keyspace = 12;
        cfg.endpoint = crate::cli::Endpoint::Tcp {
            host: "127.0.0.1".into(),
            port,
        };

        let frame = crate::resp::format_argv(&[b"GET", b"__rand_int__000000000000"]);
        let mut client = BenchmarkClient::new_seed(&cfg, &frame).unwrap();
        assert_eq!(client.randptr.len(), 1);
        let offset = client.randptr[0];
        let keyprefixlen = cfg.key_prefix.len();

        let mut requests_issued = 0u64;
        let mut rng = rand::thread_rng();
        client.on_writable(&cfg, &mut requests_issued, &mut rng);

        assert_eq!(
            &client.obuf[offset..offset + keyprefixlen],
            cfg.key_prefix.as_bytes(),
            "the literal key-prefix text must never be overwritten"
        );
        let window = &client.obuf[offset + keyprefixlen..offset + keyprefixlen + 12];
        assert_ne!(window, b"000000000000", "the padding window must be randomized");
    }

    fn test_cfg(dbnum: u64, random_keys: bool) -> RunConfig {
        let args = <crate::cli::Args as clap::Parser>::parse_from(["resp-bench"]);
        let mut cfg = RunConfig::from_args(&args).unwrap();
        cfg.dbnum = dbnum;
        cfg.random_keys = random_keys;
        cfg.random_keyspace = 1000;
        cfg
    }

    fn local_listener() -> std::net::TcpListener {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        listener
    }

    #[test]
    fn prefix_excision_zeros_prefixlen_and_shifts_randptr() {
        let listener = local_listener();
        let port = listener.local_addr().unwrap().port();
        let mut cfg = test_cfg(3, true);
        cfg.endpoint = crate::cli::Endpoint::Tcp {
            host: "127.0.0.1".into(),
            port,
        };

        let frame = crate::resp::format_argv(&[b"GET", b"__rand_int__000000000000"]);
        let mut client = BenchmarkClient::new_seed(&cfg, &frame).unwrap();
        assert!(client.prefixlen > 0);
        let before_offsets = client.randptr.clone();
        let prefixlen = client.prefixlen;

        client.excise_prefix();

        assert_eq!(client.prefixlen, 0);
        for (before, after) in before_offsets.iter().zip(client.randptr.iter()) {
            assert_eq!(*after, before - prefixlen);
        }
    }

    #[test]
    fn clone_keeps_the_same_key_prefix_bytes_as_the_seed() {
        let listener = local_listener();
        let port = listener.local_addr().unwrap().port();
        let mut cfg = test_cfg(0, true);
        cfg.endpoint = crate::cli::Endpoint::Tcp {
            host: "127.0.0.1".into(),
            port,
        };

        let frame = crate::resp::format_argv(&[b"GET", b"__rand_int__000000000000"]);
        let seed = BenchmarkClient::new_seed(&cfg, &frame).unwrap();

        let mut clone_cfg = cfg.clone();
        clone_cfg.dbnum = 7; // different prefix length than the seed's (none)
        let clone = BenchmarkClient::new_clone(&clone_cfg, &seed).unwrap();

        assert_eq!(seed.randptr.len(), clone.randptr.len());
        let keyprefixlen = clone_cfg.key_prefix.len();
        for (&s_off, &c_off) in seed.randptr.iter().zip(clone.randptr.iter()) {
            let s_bytes = &seed.obuf[s_off..s_off + keyprefixlen];
            let c_bytes = &clone.obuf[c_off..c_off + keyprefixlen];
            assert_eq!(s_bytes, c_bytes);
        }
    }
}
