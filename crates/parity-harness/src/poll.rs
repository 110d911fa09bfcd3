//! Deadline-bounded polling.
//!
//! Every wait in the harness (finality, object appearance, congestion
//! backoff) goes through [`poll_until`] with interval/deadline constants
//! taken from `HarnessConfig`.

use std::time::{Duration, Instant};

use anyhow::Result;

/// Call `f` every `interval` until it yields a value or `deadline` of
/// wall-clock time has passed. The first call happens immediately.
///
/// `Ok(None)` from `f` means "not yet"; an `Err` aborts the poll.
/// Returns `Ok(None)` on timeout.
pub fn poll_until<T>(
    interval: Duration,
    deadline: Duration,
    mut f: impl FnMut() -> Result<Option<T>>,
) -> Result<Option<T>> {
    let started = Instant::now();
    loop {
        if let Some(value) = f()? {
            return Ok(Some(value));
        }
        if started.elapsed() + interval > deadline {
            return Ok(None);
        }
        std::thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    #[test]
    fn test_returns_first_success() {
        let mut calls = 0;
        let result = poll_until(Duration::from_millis(1), Duration::from_millis(100), || {
            calls += 1;
            Ok(if calls == 3 { Some(calls) } else { None })
        })
        .unwrap();
        assert_eq!(result, Some(3));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_times_out_to_none() {
        let result: Option<()> =
            poll_until(Duration::from_millis(5), Duration::from_millis(20), || Ok(None)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_error_aborts() {
        let result: Result<Option<()>> =
            poll_until(Duration::from_millis(1), Duration::from_millis(50), || {
                bail!("transport gone")
            });
        assert!(result.is_err());
    }

    #[test]
    fn test_first_call_is_immediate() {
        let started = std::time::Instant::now();
        let result = poll_until(Duration::from_secs(5), Duration::from_secs(10), || {
            Ok(Some(()))
        })
        .unwrap();
        assert!(result.is_some());
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
