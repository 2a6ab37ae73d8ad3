//! Small ambient helpers: a microsecond clock for latency timestamps and the
//! startup signal disposition the readiness loop relies on.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time in microseconds since the Unix epoch. Used to timestamp
/// pipeline start and freeze pipeline latency on first read.
pub fn now_us() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_micros() as i64,
        Err(_) => 0,
    }
}

/// Alphabet random-key substitution draws from.
pub const RANDOM_ALPHABET: &[u8] = b"0123456789!@#$%^&*ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Overwrites `buf[offset..offset+len]` with bytes drawn uniformly from
/// [`RANDOM_ALPHABET`].
pub fn fill_random(buf: &mut [u8], offset: usize, len: usize, rng: &mut impl rand::Rng) {
    for b in &mut buf[offset..offset + len] {
        *b = RANDOM_ALPHABET[rng.gen_range(0..RANDOM_ALPHABET.len())];
    }
}

/// Ignores `SIGPIPE` and `SIGHUP` for the lifetime of the process, matching
/// the requirement that a broken pipe on one connection never tears down
/// the whole readiness loop.
#[cfg(unix)]
pub fn ignore_disruptive_signals() {
    use nix::sys::signal::{signal, SigHandler, Signal};
    unsafe {
        let _ = signal(Signal::SIGPIPE, SigHandler::SigIgn);
        let _ = signal(Signal::SIGHUP, SigHandler::SigIgn);
    }
}

#[cfg(not(unix))]
pub fn ignore_disruptive_signals() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_us_is_monotonic_enough_for_consecutive_calls() {
        let a = now_us();
        let b = now_us();
        assert!(b >= a);
    }

    #[test]
    fn fill_random_only_touches_the_requested_window() {
        let mut buf = vec![b'.'; 10];
        let mut rng = rand::thread_rng();
        fill_random(&mut buf, 2, 4, &mut rng);
        assert_eq!(&buf[0..2], b"..");
        assert_eq!(&buf[6..10], b"....");
        assert!(buf[2..6].iter().all(|b| RANDOM_ALPHABET.contains(b)));
    }
}
