//! Exponential backoff with jitter, adapted from nika's resilience module
//! for the workflow runtime's per-step retry policy (§4.4's `StepOptions`).

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: 0.1,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }
}

/// Calculate the delay before retry attempt `attempt` (0-indexed), capped
/// at `max_delay` and perturbed by up to `jitter` fraction either way.
pub fn calculate_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let base_delay =
        config.initial_delay.as_millis() as f64 * config.backoff_multiplier.powi(attempt as i32);
    let capped_delay = base_delay.min(config.max_delay.as_millis() as f64);

    let jittered = if config.jitter > 0.0 {
        let jitter_range = capped_delay * config.jitter;
        let offset = rand::random::<f64>() * jitter_range * 2.0 - jitter_range;
        (capped_delay + offset).max(0.0)
    } else {
        capped_delay
    };

    Duration::from_millis(jittered as u64)
}
