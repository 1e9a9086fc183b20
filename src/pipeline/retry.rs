//! Bounded exponential backoff for store outages
//!
//! The refresh loop tolerates any number of per-entity failures, but when
//! the store itself stops answering (LISTING fails) the engine backs off
//! instead of hammering it, and gives up after a bounded number of retries.

use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug)]
pub struct MaxRetriesExceeded;

impl std::fmt::Display for MaxRetriesExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Maximum retry attempts exceeded")
    }
}

impl std::error::Error for MaxRetriesExceeded {}

#[derive(Debug)]
pub struct ExponentialBackoff {
    initial_delay_secs: u64,
    max_delay_secs: u64,
    max_retries: u32,
    current_attempt: u32,
}

impl ExponentialBackoff {
    pub fn new(initial_secs: u64, max_secs: u64, retries: u32) -> Self {
        Self {
            initial_delay_secs: initial_secs,
            max_delay_secs: max_secs,
            max_retries: retries,
            current_attempt: 0,
        }
    }

    /// Delay the next attempt would wait, capped at the maximum
    fn next_delay_secs(&self) -> u64 {
        self.initial_delay_secs
            .saturating_mul(2_u64.saturating_pow(self.current_attempt))
            .min(self.max_delay_secs)
    }

    /// Sleep before the next retry, or fail once the budget is spent
    pub async fn sleep(&mut self) -> Result<(), MaxRetriesExceeded> {
        if self.current_attempt >= self.max_retries {
            return Err(MaxRetriesExceeded);
        }

        let delay = self.next_delay_secs();
        log::warn!(
            "⏳ Retry attempt {} of {} in {}s",
            self.current_attempt + 1,
            self.max_retries,
            delay
        );

        sleep(Duration::from_secs(delay)).await;
        self.current_attempt += 1;
        Ok(())
    }

    /// Clear the attempt counter after a successful operation
    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }
}
