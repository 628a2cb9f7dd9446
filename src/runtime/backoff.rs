//! Retry policy for "would block" conditions.
//!
//! The reader and writer turn a non-blocking socket into blocking semantics by
//! retrying in place. What happens between two attempts is decided here so the
//! retry loop stays out of the parsing code.

use std::thread;
use std::time::Duration;

/// What to do before retrying an operation that reported `WouldBlock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Busy-spin with a CPU hint.
    Spin,
    /// Give the rest of the time slice back to the scheduler.
    #[default]
    Yield,
    /// Sleep for a fixed interval.
    Sleep(Duration),
}

impl Backoff {
    /// Build a policy from a microsecond interval; zero means yield.
    pub fn from_micros(micros: u64) -> Self {
        if micros == 0 {
            Backoff::Yield
        } else {
            Backoff::Sleep(Duration::from_micros(micros))
        }
    }

    /// Wait once before the next attempt.
    pub fn wait(&self) {
        match self {
            Backoff::Spin => std::hint::spin_loop(),
            Backoff::Yield => thread::yield_now(),
            Backoff::Sleep(interval) => thread::sleep(*interval),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_micros() {
        assert_eq!(Backoff::from_micros(0), Backoff::Yield);
        assert_eq!(
            Backoff::from_micros(250),
            Backoff::Sleep(Duration::from_micros(250))
        );
    }

    #[test]
    fn test_wait_returns() {
        Backoff::Spin.wait();
        Backoff::Yield.wait();
        Backoff::Sleep(Duration::from_micros(1)).wait();
    }
}
