use std::time::Duration;

/// Exponential backoff for settings retrieval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub factor: f64,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(100),
            max: Duration::from_secs(5),
            factor: 2.0,
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait before retry number `attempt` (0-based), or `None` once
    /// the attempt budget is spent.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if self.max_attempts.is_some_and(|m| attempt >= m) {
            return None;
        }
        let scaled = self.initial.as_secs_f64() * self.factor.powi(attempt.min(64) as i32);
        let capped = scaled.min(self.max.as_secs_f64());
        Some(Duration::from_secs_f64(capped))
    }
}
