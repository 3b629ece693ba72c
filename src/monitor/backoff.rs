use std::time::Duration;

/// Exponential backoff over the base poll interval.
///
/// After `n` consecutive failures the delay is `base * 2^n`, capped at
/// `base * cap_factor`.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    cap_factor: u32,
    failures: u32,
}

impl Backoff {
    pub fn new(base: Duration, cap_factor: u32) -> Self {
        Self {
            base,
            cap_factor: cap_factor.max(1),
            failures: 0,
        }
    }

    /// Follow a changed poll interval without losing the failure count
    pub fn set_base(&mut self, base: Duration) {
        self.base = base;
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn cap(&self) -> Duration {
        self.base.saturating_mul(self.cap_factor)
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Count one more failure and return the new streak length
    pub fn record_failure(&mut self) -> u32 {
        self.failures = self.failures.saturating_add(1);
        self.failures
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Delay before the next poll
    pub fn delay(&self) -> Duration {
        let factor = 1u32.checked_shl(self.failures).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.cap())
    }
}
