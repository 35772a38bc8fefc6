use crate::prelude::{CoreError, CoreResult};
use log::warn;
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;

/// Bounded retry schedule: up to `max_attempts` tries, `delay_ms` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay_ms: delay.as_millis() as u64,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Pauses between consecutive attempts.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let delay = Duration::from_millis(self.delay_ms);
        (1..self.attempts()).map(move |_| delay)
    }

    /// Calls `attempt` with the 1-based attempt number until it succeeds,
    /// fails fatally, or the budget runs out.
    pub fn run<T, F>(&self, unit: &str, mut attempt: F) -> CoreResult<T>
    where
        F: FnMut(u32) -> CoreResult<T>,
    {
        let attempts = self.attempts();
        let mut delays = self.delays();
        let mut last_error = String::new();
        for number in 1..=attempts {
            match attempt(number) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!("{unit}: attempt {number}/{attempts} failed: {err}");
                    last_error = err.to_string();
                }
            }
            if let Some(delay) = delays.next() {
                thread::sleep(delay);
            }
        }
        Err(CoreError::Incomplete {
            unit: unit.to_string(),
            attempts,
            last_error,
        })
    }
}
