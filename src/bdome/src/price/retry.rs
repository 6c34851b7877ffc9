//! Fixed-backoff retries for remote lookups

use std::fmt::Display;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_tries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    /// Three attempts, 500 ms apart
    fn default() -> Self {
        Self {
            max_tries: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_tries: u32, backoff: Duration) -> Self {
        Self { max_tries, backoff }
    }

    /// Run `action` until it succeeds or the attempts run out.
    ///
    /// Returns the last error when every attempt fails. There is no sleep
    /// after the final attempt.
    pub fn execute<T, E, F>(&self, mut action: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Result<T, E>,
    {
        let tries = self.max_tries.max(1);
        let mut attempt = 1;
        loop {
            match action() {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= tries => return Err(e),
                Err(e) => {
                    warn!(
                        "Attempt {}/{} failed: {}; retrying in {} ms",
                        attempt,
                        tries,
                        e,
                        self.backoff.as_millis()
                    );
                    std::thread::sleep(self.backoff);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(tries: u32) -> RetryPolicy {
        RetryPolicy::new(tries, Duration::ZERO)
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_tries, 3);
        assert_eq!(policy.backoff, Duration::from_millis(500));
    }

    #[test]
    fn test_succeeds_after_failures() {
        let mut calls = 0;
        let result: Result<u32, String> = quick(3).execute(|| {
            calls += 1;
            if calls < 3 {
                Err(format!("failure {calls}"))
            } else {
                Ok(42)
            }
        });
        assert_eq!(result, Ok(42));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_gives_up_with_last_error() {
        let mut calls = 0;
        let result: Result<u32, String> = quick(3).execute(|| {
            calls += 1;
            Err(format!("failure {calls}"))
        });
        assert_eq!(result, Err("failure 3".to_string()));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_zero_tries_still_runs_once() {
        let mut calls = 0;
        let _: Result<(), &str> = quick(0).execute(|| {
            calls += 1;
            Err("nope")
        });
        assert_eq!(calls, 1);
    }
}
