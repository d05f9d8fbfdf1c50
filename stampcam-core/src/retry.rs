//! Bounded retry with escalation
//!
//! Peripheral operations that fail transiently (sensor bring-up, flash
//! writes under memory pressure) are retried a fixed number of times.
//! When the budget runs out the caller escalates, which on this device
//! means a restart.

/// Retry budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetryPolicy {
    max_attempts: u8,
}

/// Value produced by a successful attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Success<T> {
    pub value: T,
    /// 1-based attempt number that succeeded
    pub attempt: u8,
}

/// All attempts failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryExhausted<E> {
    /// Error from the final attempt
    pub last_error: E,
    /// Number of attempts made
    pub attempts: u8,
}

impl RetryPolicy {
    /// Create a policy allowing up to `max_attempts` runs (at least one)
    pub const fn new(max_attempts: u8) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
        }
    }

    /// Maximum number of attempts
    pub const fn max_attempts(&self) -> u8 {
        self.max_attempts
    }

    /// Run `op` until it succeeds or the budget is spent
    ///
    /// `op` receives the 1-based attempt number.
    pub fn run<T, E, F>(&self, mut op: F) -> Result<Success<T>, RetryExhausted<E>>
    where
        F: FnMut(u8) -> Result<T, E>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(Success { value, attempt }),
                Err(last_error) if attempt >= self.max_attempts => {
                    return Err(RetryExhausted {
                        last_error,
                        attempts: attempt,
                    })
                }
                Err(_) => attempt += 1,
            }
        }
    }

    /// Run `op`, handing the failure to `on_exhaustion` if every attempt fails
    pub fn run_or_else<T, E, F, X>(&self, op: F, on_exhaustion: X) -> T
    where
        F: FnMut(u8) -> Result<T, E>,
        X: FnOnce(RetryExhausted<E>) -> T,
    {
        match self.run(op) {
            Ok(success) => success.value,
            Err(exhausted) => on_exhaustion(exhausted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_attempt_success() {
        let policy = RetryPolicy::new(20);
        let mut calls = 0;
        let result: Result<_, RetryExhausted<()>> = policy.run(|_| {
            calls += 1;
            Ok(7)
        });
        assert_eq!(result, Ok(Success { value: 7, attempt: 1 }));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_stops_at_first_success() {
        let policy = RetryPolicy::new(20);
        let mut calls = 0;
        let result = policy.run(|attempt| {
            calls += 1;
            if attempt < 3 {
                Err("not yet")
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result, Ok(Success { value: 3, attempt: 3 }));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_exhaustion_reports_last_error() {
        let policy = RetryPolicy::new(20);
        let mut calls = 0u8;
        let result: Result<Success<()>, _> = policy.run(|attempt| {
            calls += 1;
            Err(attempt)
        });
        assert_eq!(
            result,
            Err(RetryExhausted {
                last_error: 20,
                attempts: 20
            })
        );
        assert_eq!(calls, 20);
    }

    #[test]
    fn test_zero_budget_runs_once() {
        let policy = RetryPolicy::new(0);
        assert_eq!(policy.max_attempts(), 1);
        let result: Result<Success<()>, _> = policy.run(|_| Err(()));
        assert_eq!(result.unwrap_err().attempts, 1);
    }

    #[test]
    fn test_run_or_else_escalates() {
        let policy = RetryPolicy::new(3);
        let value = policy.run_or_else(|_| Err::<u8, _>("fail"), |e| 100 + e.attempts);
        assert_eq!(value, 103);
    }
}
